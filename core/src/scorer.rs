//! BM25 scoring primitives.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_K1: f64 = 1.2;
pub const DEFAULT_B: f64 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25Params {
    /// Term frequency saturation.
    pub k1: f64,
    /// Length normalization strength, in `[0, 1]`.
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: DEFAULT_K1, b: DEFAULT_B }
    }
}

impl Bm25Params {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.k1.is_finite() && self.k1 >= 0.0, "bm25 k1 must be a finite value >= 0, got {}", self.k1);
        ensure!(self.b.is_finite() && (0.0..=1.0).contains(&self.b), "bm25 b must be within [0, 1], got {}", self.b);
        Ok(())
    }
}

/// `ln((N - df + 0.5) / (df + 0.5) + 1)`; always positive for `df <= N`.
pub fn idf(num_docs: u64, df: u64) -> f64 {
    let n = num_docs as f64;
    let df = df as f64;
    ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
}

/// Contribution of one query term to one document's score.
pub fn term_score(params: &Bm25Params, idf: f64, tf: u32, doc_len: u32, avg_doc_len: f64) -> f64 {
    let tf = tf as f64;
    let norm = if avg_doc_len > 0.0 { doc_len as f64 / avg_doc_len } else { 1.0 };
    let denom = tf + params.k1 * (1.0 - params.b + params.b * norm);
    if denom <= 0.0 {
        return 0.0;
    }
    idf * (tf * (params.k1 + 1.0)) / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idf_decreases_with_document_frequency() {
        assert!(idf(10, 1) > idf(10, 5));
        assert!(idf(10, 10) > 0.0);
    }

    #[test]
    fn score_grows_with_term_frequency() {
        let p = Bm25Params::default();
        let w = idf(4, 1);
        let mut prev = 0.0;
        for tf in 1..20 {
            let s = term_score(&p, w, tf, 10, 10.0);
            assert!(s >= prev);
            prev = s;
        }
    }

    #[test]
    fn longer_documents_score_lower() {
        let p = Bm25Params::default();
        let w = idf(4, 1);
        assert!(term_score(&p, w, 2, 5, 10.0) > term_score(&p, w, 2, 20, 10.0));
    }

    #[test]
    fn rejects_out_of_range_params() {
        assert!(Bm25Params { k1: 1.2, b: 1.5 }.validate().is_err());
        assert!(Bm25Params { k1: -1.0, b: 0.5 }.validate().is_err());
        assert!(Bm25Params::default().validate().is_ok());
    }
}
