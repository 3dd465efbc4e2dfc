//! Keeps the document store and the full-text index in step.
//!
//! Every mutation goes store first, index second. If the index step fails the store
//! write is undone before the error is returned, so callers never see a stored but
//! unindexed document (or an indexed but deleted one).

use crate::config::Config;
use crate::error::{IndexError, MnemoError, StoreError};
use crate::index::FullTextIndex;
use crate::persist::{self, IndexPaths};
use crate::scorer::Bm25Params;
use crate::store::DocumentStore;
use crate::{DocId, Document, Field, SearchHit};
use anyhow::Result;
use parking_lot::Mutex;

pub struct Mnemo {
    store: DocumentStore,
    index: FullTextIndex,
    snapshot: Option<IndexPaths>,
    /// Serializes writers so store and index change as one step.
    write_lock: Mutex<()>,
}

impl Mnemo {
    pub fn open(config: &Config) -> Result<Self, MnemoError> {
        let store = DocumentStore::open(&config.db_path)?;
        let snapshot = config.snapshot_path.as_ref().map(IndexPaths::new);
        Self::from_store(store, config.bm25, snapshot)
    }

    /// Throwaway instance backed by a temporary database.
    pub fn temporary() -> Result<Self, MnemoError> {
        Self::from_store(DocumentStore::temporary()?, Bm25Params::default(), None)
    }

    /// Build the index for `store`, from a matching snapshot when one exists.
    pub fn from_store(store: DocumentStore, params: Bm25Params, snapshot: Option<IndexPaths>) -> Result<Self, MnemoError> {
        let num_docs = store.len() as u64;
        let last_id = store.last_id()?;
        let loaded = match &snapshot {
            Some(paths) => match persist::load_snapshot(paths, store.store_id(), num_docs, last_id) {
                Ok(state) => state,
                Err(err) => {
                    tracing::warn!(error = %err, "ignoring unreadable index snapshot");
                    None
                }
            },
            None => None,
        };

        let index = match loaded {
            Some(state) => {
                tracing::info!(num_docs, "loaded index snapshot");
                FullTextIndex::from_state(params, state)
            }
            None => {
                let index = FullTextIndex::new(params);
                for doc in store.iter() {
                    let doc = doc?;
                    index.index(doc.id, &doc.title, &doc.body)?;
                }
                let stats = index.stats();
                tracing::info!(num_docs = stats.num_docs, num_terms = stats.num_terms, "rebuilt index from store");
                index
            }
        };
        Ok(Self { store, index, snapshot, write_lock: Mutex::new(()) })
    }

    pub fn insert(&self, title: &str, body: &str, occurrence: i64) -> Result<DocId, MnemoError> {
        let _guard = self.write_lock.lock();
        let doc = self.store.insert(title, body, occurrence)?;
        if let Err(err) = self.index.index(doc.id, &doc.title, &doc.body) {
            tracing::error!(id = doc.id, error = %err, "indexing failed, rolling back insert");
            return Err(after_rollback(doc.id, err, self.store.remove(doc.id)));
        }
        tracing::debug!(id = doc.id, "inserted document");
        Ok(doc.id)
    }

    /// Remove a document. Unknown ids are not an error.
    pub fn delete(&self, id: DocId) -> Result<(), MnemoError> {
        let _guard = self.write_lock.lock();
        let Some(doc) = self.store.remove(id)? else {
            return Ok(());
        };
        if let Err(err) = self.index.remove(id) {
            tracing::error!(id, error = %err, "unindexing failed, restoring document");
            return Err(after_rollback(id, err, self.store.restore(&doc)));
        }
        tracing::debug!(id, "deleted document");
        Ok(())
    }

    pub fn get(&self, id: DocId) -> Result<Option<Document>, MnemoError> {
        Ok(self.store.get(id)?)
    }

    /// BM25-ranked documents matching any query token, best first.
    pub fn search(&self, query: &str) -> Result<Vec<SearchHit>, MnemoError> {
        let ranked = self.index.search(query);
        let mut hits = Vec::with_capacity(ranked.len());
        for scored in ranked {
            // A concurrent delete may land between ranking and lookup.
            match self.store.get(scored.id)? {
                Some(doc) => hits.push(SearchHit::from_document(doc, scored.score)),
                None => tracing::debug!(id = scored.id, "ranked document vanished before lookup"),
            }
        }
        Ok(hits)
    }

    /// Case-insensitive substring match over one stored field, in id order. No ranking.
    pub fn search_exact(&self, field: Field, needle: &str) -> Result<Vec<Document>, MnemoError> {
        let needle = needle.to_lowercase();
        let mut matches = Vec::new();
        for doc in self.store.iter() {
            let doc = doc?;
            if field.select(&doc).to_lowercase().contains(&needle) {
                matches.push(doc);
            }
        }
        tracing::trace!(%field, hits = matches.len(), "exact search");
        Ok(matches)
    }

    pub fn index(&self) -> &FullTextIndex {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Flush the store and, when configured, write an index snapshot.
    pub fn checkpoint(&self) -> Result<()> {
        let _guard = self.write_lock.lock();
        self.store.flush()?;
        if let Some(paths) = &self.snapshot {
            persist::save_snapshot(paths, &self.index.snapshot(), self.store.store_id(), self.store.last_id()?)?;
        }
        Ok(())
    }
}

/// The index error is what the caller sees; a failed undo is only logged.
fn after_rollback<T>(id: DocId, err: IndexError, rollback: Result<T, StoreError>) -> MnemoError {
    if let Err(rollback) = rollback {
        tracing::error!(id, error = %err, rollback_error = %rollback, "rollback failed, store and index may disagree");
    }
    MnemoError::Index(err)
}
