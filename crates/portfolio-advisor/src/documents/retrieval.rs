//! Term-overlap retrieval over chunks.
//!
//! Score of a chunk = Σ over distinct query terms it contains of
//! `(1 + ln tf) · ln(1 + N / df)`.

use serde::Serialize;
use std::collections::{HashMap, HashSet};

use super::Chunk;

/// Lowercased alphanumeric runs of at least two characters
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() >= 2)
        .map(str::to_lowercase)
}

#[derive(Clone, Debug, Serialize)]
pub struct ScoredChunk<'a> {
    pub chunk: &'a Chunk,
    pub score: f64,
}

#[derive(Debug, Default)]
pub struct TermIndex {
    chunks: Vec<Chunk>,
    term_counts: Vec<HashMap<String, usize>>,
    doc_freq: HashMap<String, usize>,
}

impl TermIndex {
    pub fn new(chunks: Vec<Chunk>) -> Self {
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let term_counts: Vec<HashMap<String, usize>> = chunks
            .iter()
            .map(|chunk| {
                let mut counts = HashMap::new();
                for token in tokenize(&chunk.text) {
                    *counts.entry(token).or_insert(0) += 1;
                }
                for term in counts.keys() {
                    *doc_freq.entry(term.clone()).or_insert(0) += 1;
                }
                counts
            })
            .collect();

        Self {
            chunks,
            term_counts,
            doc_freq,
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    fn score(&self, chunk: usize, query_terms: &HashSet<String>) -> f64 {
        let n = self.chunks.len() as f64;
        query_terms
            .iter()
            .filter_map(|term| {
                let tf = *self.term_counts[chunk].get(term)? as f64;
                let df = *self.doc_freq.get(term)? as f64;
                Some((1.0 + tf.ln()) * (1.0 + n / df).ln())
            })
            .sum()
    }

    /// Best `k` chunks sharing at least one term with the query.
    /// Ties keep document order.
    pub fn top_k(&self, query: &str, k: usize) -> Vec<ScoredChunk<'_>> {
        let query_terms: HashSet<String> = tokenize(query).collect();
        if query_terms.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<ScoredChunk<'_>> = self
            .chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| ScoredChunk {
                chunk,
                score: self.score(i, &query_terms),
            })
            .filter(|hit| hit.score > 0.0)
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        scored
    }
}
