//! Error taxonomy for the store, the index and the combined engine.
//!
//! A missing document is not an error: lookups return `Ok(None)`.

use crate::DocId;
use thiserror::Error;

/// Failures of the persistence layer beneath the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sled::Error),

    #[error("record encoding error: {0}")]
    Codec(#[from] bincode::Error),

    /// A key in the documents tree is not an 8-byte id.
    #[error("corrupt document key of {0} bytes")]
    CorruptKey(usize),

    #[error("store id missing from meta tree")]
    MissingStoreId,
}

/// Violations of the index's internal invariants. Never caused by user input.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("document {0} is already indexed")]
    AlreadyIndexed(DocId),

    #[error("document {id} lists term '{term}' but its posting list has no entry for it")]
    Inconsistent { id: DocId, term: String },
}

#[derive(Debug, Error)]
pub enum MnemoError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Index(#[from] IndexError),
}
