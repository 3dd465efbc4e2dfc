use crate::error::IndexError;
use crate::scorer::{idf, term_score, Bm25Params};
use crate::tokenizer::{term_frequencies, tokenize};
use crate::DocId;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Documents containing a term, ordered by id, with the term's frequency in each.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostingList {
    pub entries: BTreeMap<DocId, u32>,
}

impl PostingList {
    /// Document frequency of the term.
    pub fn df(&self) -> u64 {
        self.entries.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Reverse entry: what a single document contributed to the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocEntry {
    pub len: u32,
    pub terms: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexState {
    pub postings: HashMap<String, PostingList>,
    pub doc_terms: HashMap<DocId, DocEntry>,
    pub num_docs: u64,
    pub total_len: u64,
}

impl IndexState {
    pub fn avg_doc_len(&self) -> f64 {
        if self.num_docs == 0 {
            0.0
        } else {
            self.total_len as f64 / self.num_docs as f64
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredDoc {
    pub id: DocId,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndexStats {
    pub num_docs: u64,
    pub num_terms: usize,
    pub avg_doc_len: f64,
}

/// In-memory inverted index ranked with BM25.
///
/// Writers take the lock exclusively so a search never observes a half-applied
/// document (postings and length statistics change together).
#[derive(Debug, Default)]
pub struct FullTextIndex {
    params: Bm25Params,
    state: RwLock<IndexState>,
}

impl FullTextIndex {
    pub fn new(params: Bm25Params) -> Self {
        Self { params, state: RwLock::new(IndexState::default()) }
    }

    pub fn from_state(params: Bm25Params, state: IndexState) -> Self {
        Self { params, state: RwLock::new(state) }
    }

    /// Add a document's title and body tokens. Re-indexing a known id is rejected.
    pub fn index(&self, id: DocId, title: &str, body: &str) -> Result<(), IndexError> {
        let tokens = tokenize(title).into_iter().chain(tokenize(body));
        let (tf, len) = term_frequencies(tokens);

        let mut state = self.state.write();
        if state.doc_terms.contains_key(&id) {
            return Err(IndexError::AlreadyIndexed(id));
        }
        let mut terms = Vec::with_capacity(tf.len());
        for (term, freq) in tf {
            state.postings.entry(term.clone()).or_default().entries.insert(id, freq);
            terms.push(term);
        }
        tracing::debug!(id, len, distinct = terms.len(), "indexed document");
        state.doc_terms.insert(id, DocEntry { len, terms });
        state.num_docs += 1;
        state.total_len += len as u64;
        Ok(())
    }

    /// Drop every posting of `id`. Returns `false` when the id was never indexed.
    pub fn remove(&self, id: DocId) -> Result<bool, IndexError> {
        let mut state = self.state.write();
        let Some(entry) = state.doc_terms.remove(&id) else {
            return Ok(false);
        };
        // A broken reverse map leaves the state as it was.
        let missing = entry
            .terms
            .iter()
            .find(|term| !state.postings.get(*term).is_some_and(|p| p.entries.contains_key(&id)))
            .cloned();
        if let Some(term) = missing {
            state.doc_terms.insert(id, entry);
            return Err(IndexError::Inconsistent { id, term });
        }
        for term in &entry.terms {
            if let Some(list) = state.postings.get_mut(term) {
                list.entries.remove(&id);
                if list.is_empty() {
                    state.postings.remove(term);
                }
            }
        }
        state.num_docs -= 1;
        state.total_len -= entry.len as u64;
        tracing::debug!(id, len = entry.len, "removed document from index");
        Ok(true)
    }

    /// Rank documents against `query`, best first; equal scores fall back to ascending id.
    pub fn search(&self, query: &str) -> Vec<ScoredDoc> {
        let mut seen = HashSet::new();
        let terms: Vec<String> = tokenize(query).into_iter().filter(|t| seen.insert(t.clone())).collect();
        if terms.is_empty() {
            return Vec::new();
        }

        let state = self.state.read();
        if state.num_docs == 0 {
            return Vec::new();
        }
        let avgdl = state.avg_doc_len();
        let mut scores: HashMap<DocId, f64> = HashMap::new();
        for term in &terms {
            let Some(list) = state.postings.get(term) else { continue };
            let w = idf(state.num_docs, list.df());
            for (&id, &tf) in &list.entries {
                let len = state.doc_terms.get(&id).map(|e| e.len).unwrap_or(0);
                *scores.entry(id).or_insert(0.0) += term_score(&self.params, w, tf, len, avgdl);
            }
        }
        drop(state);

        let mut ranked: Vec<ScoredDoc> = scores.into_iter().map(|(id, score)| ScoredDoc { id, score }).collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.id.cmp(&b.id)));
        tracing::trace!(query, hits = ranked.len(), "search");
        ranked
    }

    pub fn contains(&self, id: DocId) -> bool {
        self.state.read().doc_terms.contains_key(&id)
    }

    pub fn doc_freq(&self, term: &str) -> u64 {
        self.state.read().postings.get(term).map(PostingList::df).unwrap_or(0)
    }

    pub fn stats(&self) -> IndexStats {
        let state = self.state.read();
        IndexStats {
            num_docs: state.num_docs,
            num_terms: state.postings.len(),
            avg_doc_len: state.avg_doc_len(),
        }
    }

    /// Copy of the current state, for snapshots.
    pub fn snapshot(&self) -> IndexState {
        self.state.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FullTextIndex {
        let idx = FullTextIndex::default();
        idx.index(1, "Test Title", "Hello world body content").unwrap();
        idx.index(2, "Other", "Goodbye world").unwrap();
        idx
    }

    #[test]
    fn tracks_statistics_incrementally() {
        let idx = sample();
        let stats = idx.stats();
        assert_eq!(stats.num_docs, 2);
        assert!((stats.avg_doc_len - 4.5).abs() < 1e-9);
        assert_eq!(idx.doc_freq("world"), 2);

        idx.remove(1).unwrap();
        let stats = idx.stats();
        assert_eq!(stats.num_docs, 1);
        assert!((stats.avg_doc_len - 3.0).abs() < 1e-9);
        assert_eq!(idx.doc_freq("world"), 1);
    }

    #[test]
    fn prunes_empty_posting_lists() {
        let idx = sample();
        assert_eq!(idx.doc_freq("hello"), 1);
        idx.remove(1).unwrap();
        assert_eq!(idx.doc_freq("hello"), 0);
        assert!(!idx.snapshot().postings.contains_key("hello"));
        idx.remove(2).unwrap();
        assert_eq!(idx.stats().num_terms, 0);
        assert_eq!(idx.stats().avg_doc_len, 0.0);
    }

    #[test]
    fn rejects_reindexing() {
        let idx = sample();
        assert!(matches!(idx.index(1, "again", "again"), Err(IndexError::AlreadyIndexed(1))));
        assert_eq!(idx.doc_freq("again"), 0);
        assert_eq!(idx.stats().num_docs, 2);
    }

    #[test]
    fn remove_unknown_is_noop() {
        let idx = sample();
        assert!(!idx.remove(42).unwrap());
        assert_eq!(idx.stats().num_docs, 2);
    }

    #[test]
    fn detects_broken_reverse_map() {
        let mut state = sample().snapshot();
        state.postings.remove("hello");
        let idx = FullTextIndex::from_state(Bm25Params::default(), state);
        let err = idx.remove(1).unwrap_err();
        assert!(matches!(err, IndexError::Inconsistent { id: 1, .. }));
        assert!(idx.contains(1));
    }

    #[test]
    fn ranks_and_breaks_ties_by_id() {
        let idx = FullTextIndex::default();
        idx.index(3, "", "apple pie").unwrap();
        idx.index(1, "", "apple tart").unwrap();
        idx.index(2, "", "banana").unwrap();
        let hits = idx.search("apple");
        assert_eq!(hits.iter().map(|h| h.id).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(hits[0].score, hits[1].score);
    }

    #[test]
    fn duplicate_query_terms_count_once() {
        let idx = sample();
        assert_eq!(idx.search("hello"), idx.search("hello HELLO hello"));
    }

    #[test]
    fn empty_query_and_empty_index() {
        assert!(FullTextIndex::default().search("anything").is_empty());
        assert!(sample().search("  ?! ").is_empty());
        assert!(sample().search("missing").is_empty());
    }
}
