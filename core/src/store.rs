//! Durable document records on top of sled.
//!
//! Records live in the `docs` tree under big-endian ids so iteration is in id order.
//! The id counter lives in the `meta` tree and is advanced in the same transaction as
//! the record write; ids therefore start at 1 and are never handed out twice.
//! `meta` also holds a random store id, generated once, that ties snapshots to this database.

use crate::error::StoreError;
use crate::{DocId, Document};
use serde::{Deserialize, Serialize};
use sled::transaction::{ConflictableTransactionError, ConflictableTransactionResult, TransactionError};
use sled::{IVec, Transactional};
use std::path::Path;
use time::OffsetDateTime;
use uuid::Uuid;

const DOCS_TREE: &str = "docs";
const META_TREE: &str = "meta";
const NEXT_ID_KEY: &[u8] = b"next_id";
const STORE_ID_KEY: &[u8] = b"store_id";

/// Path that selects a throwaway database.
pub const MEMORY_PATH: &str = ":memory:";

#[derive(Serialize, Deserialize)]
struct StoredDoc {
    title: String,
    body: String,
    occurrence: i64,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
}

impl StoredDoc {
    fn into_document(self, id: DocId) -> Document {
        Document { id, title: self.title, body: self.body, occurrence: self.occurrence, created_at: self.created_at }
    }
}

pub struct DocumentStore {
    db: sled::Db,
    docs: sled::Tree,
    meta: sled::Tree,
    store_id: String,
}

impl DocumentStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if path.as_os_str() == MEMORY_PATH {
            return Self::temporary();
        }
        tracing::info!(path = %path.display(), "opening document store");
        Self::from_db(sled::open(path)?)
    }

    /// A store that is deleted when dropped.
    pub fn temporary() -> Result<Self, StoreError> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: sled::Db) -> Result<Self, StoreError> {
        let docs = db.open_tree(DOCS_TREE)?;
        let meta = db.open_tree(META_TREE)?;
        if meta.get(STORE_ID_KEY)?.is_none() {
            let fresh = Uuid::new_v4().to_string();
            // Loses quietly if another handle wrote an id first.
            let _ = meta.compare_and_swap(STORE_ID_KEY, None as Option<&[u8]>, Some(fresh.as_bytes()))?;
        }
        let store_id = match meta.get(STORE_ID_KEY)? {
            Some(raw) => String::from_utf8_lossy(&raw).into_owned(),
            None => return Err(StoreError::MissingStoreId),
        };
        Ok(Self { db, docs, meta, store_id })
    }

    /// Identity of this database, stable across reopen.
    pub fn store_id(&self) -> &str {
        &self.store_id
    }

    /// Persist a new record under the next id.
    pub fn insert(&self, title: &str, body: &str, occurrence: i64) -> Result<Document, StoreError> {
        let record = StoredDoc {
            title: title.to_string(),
            body: body.to_string(),
            occurrence,
            created_at: OffsetDateTime::now_utc(),
        };
        let bytes = bincode::serialize(&record)?;

        let id = (&self.docs, &self.meta)
            .transaction(|(docs, meta)| -> ConflictableTransactionResult<DocId, StoreError> {
                let id = match meta.get(NEXT_ID_KEY)? {
                    Some(raw) => decode_id(&raw).map_err(ConflictableTransactionError::Abort)?,
                    None => 1,
                };
                docs.insert(&id.to_be_bytes()[..], bytes.as_slice())?;
                meta.insert(NEXT_ID_KEY, &(id + 1).to_be_bytes()[..])?;
                Ok(id)
            })
            .map_err(|e| match e {
                TransactionError::Abort(e) => e,
                TransactionError::Storage(e) => StoreError::Database(e),
            })?;
        Ok(record.into_document(id))
    }

    /// Delete a record, returning it if it existed.
    pub fn remove(&self, id: DocId) -> Result<Option<Document>, StoreError> {
        match self.docs.remove(id.to_be_bytes())? {
            Some(raw) => Ok(Some(decode_doc(id, &raw)?)),
            None => Ok(None),
        }
    }

    /// Write a record back under its original id. Used to undo a removal.
    pub fn restore(&self, doc: &Document) -> Result<(), StoreError> {
        let record = StoredDoc {
            title: doc.title.clone(),
            body: doc.body.clone(),
            occurrence: doc.occurrence,
            created_at: doc.created_at,
        };
        self.docs.insert(doc.id.to_be_bytes(), bincode::serialize(&record)?)?;
        Ok(())
    }

    pub fn get(&self, id: DocId) -> Result<Option<Document>, StoreError> {
        match self.docs.get(id.to_be_bytes())? {
            Some(raw) => Ok(Some(decode_doc(id, &raw)?)),
            None => Ok(None),
        }
    }

    /// All records in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = Result<Document, StoreError>> + '_ {
        self.docs.iter().map(|item| {
            let (key, value) = item?;
            decode_doc(decode_id(&key)?, &value)
        })
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Highest id currently stored, if any.
    pub fn last_id(&self) -> Result<Option<DocId>, StoreError> {
        match self.docs.last()? {
            Some((key, _)) => Ok(Some(decode_id(&key)?)),
            None => Ok(None),
        }
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        let bytes = self.db.flush()?;
        tracing::debug!(bytes, "flushed document store");
        Ok(())
    }
}

fn decode_id(raw: &IVec) -> Result<DocId, StoreError> {
    let bytes = <[u8; 8]>::try_from(&raw[..]).map_err(|_| StoreError::CorruptKey(raw.len()))?;
    Ok(DocId::from_be_bytes(bytes))
}

fn decode_doc(id: DocId, raw: &IVec) -> Result<Document, StoreError> {
    let record: StoredDoc = bincode::deserialize(raw)?;
    Ok(record.into_document(id))
}
