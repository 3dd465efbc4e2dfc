//! Document store with an incrementally maintained BM25 full-text index.
//!
//! [`Mnemo`] is the entry point: it owns a sled-backed [`DocumentStore`] and a
//! [`FullTextIndex`] and keeps the two in step on every insert and delete.

pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod persist;
pub mod scorer;
pub mod store;
pub mod tokenizer;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;

pub use config::Config;
pub use engine::Mnemo;
pub use error::{IndexError, MnemoError, StoreError};
pub use index::{FullTextIndex, IndexStats, ScoredDoc};
pub use scorer::Bm25Params;
pub use store::DocumentStore;

pub type DocId = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub title: String,
    pub body: String,
    pub occurrence: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A ranked search result resolved back to its stored record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: DocId,
    pub title: String,
    pub body: String,
    pub occurrence: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub score: f64,
}

impl SearchHit {
    fn from_document(doc: Document, score: f64) -> Self {
        Self {
            id: doc.id,
            title: doc.title,
            body: doc.body,
            occurrence: doc.occurrence,
            created_at: doc.created_at,
            score,
        }
    }
}

/// Stored text field targeted by [`Mnemo::search_exact`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Body,
}

impl Field {
    pub fn select<'a>(&self, doc: &'a Document) -> &'a str {
        match self {
            Field::Title => &doc.title,
            Field::Body => &doc.body,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Title => f.write_str("title"),
            Field::Body => f.write_str("body"),
        }
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "title" => Ok(Field::Title),
            "body" => Ok(Field::Body),
            other => Err(format!("unknown field '{other}', expected 'title' or 'body'")),
        }
    }
}
