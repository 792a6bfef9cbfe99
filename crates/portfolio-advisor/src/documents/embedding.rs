//! Embedding retrieval over chunks.
//!
//! Chunk vectors are computed once when documents are loaded; a query is
//! embedded per search and ranked by cosine similarity.

use agent_core::LlmProvider;

use crate::error::{AdvisorError, Result};

/// Texts sent to the provider per embedding request
const BATCH_SIZE: usize = 32;

#[derive(Debug, Clone)]
pub struct EmbeddingIndex {
    model: String,
    vectors: Vec<Vec<f32>>,
}

impl EmbeddingIndex {
    /// Embed every text with `model`, in batches
    pub async fn build(provider: &dyn LlmProvider, model: &str, texts: &[String]) -> Result<Self> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH_SIZE) {
            let embedded = provider.embed(batch, model).await?;
            if embedded.len() != batch.len() {
                return Err(AdvisorError::Document(format!(
                    "embedding batch returned {} vectors for {} chunks",
                    embedded.len(),
                    batch.len()
                )));
            }
            vectors.extend(embedded);
        }

        Ok(Self {
            model: model.to_string(),
            vectors,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Embed `query` and rank chunks by cosine similarity.
    ///
    /// Returns `(chunk index, score)` pairs, best first. Ties keep chunk
    /// order.
    pub async fn top_k(
        &self,
        provider: &dyn LlmProvider,
        query: &str,
        k: usize,
    ) -> Result<Vec<(usize, f64)>> {
        let query_vector = provider
            .embed(&[query.to_string()], &self.model)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AdvisorError::Document("empty query embedding".into()))?;

        Ok(rank(&self.vectors, &query_vector, k))
    }
}

fn rank(vectors: &[Vec<f32>], query: &[f32], k: usize) -> Vec<(usize, f64)> {
    let mut scored: Vec<(usize, f64)> = vectors
        .iter()
        .enumerate()
        .filter_map(|(i, v)| cosine(v, query).map(|score| (i, score)))
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(k);
    scored
}

/// `None` for mismatched dimensions or a zero vector
fn cosine(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0_f64, 0.0_f64, 0.0_f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    (denom > 0.0).then(|| dot / denom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine() {
        assert!((cosine(&[1.0, 0.0], &[2.0, 0.0]).unwrap() - 1.0).abs() < 1e-9);
        assert!(cosine(&[1.0, 0.0], &[0.0, 1.0]).unwrap().abs() < 1e-9);
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 0.0]), None);
        assert_eq!(cosine(&[1.0], &[1.0, 0.0]), None);
    }

    #[test]
    fn test_rank_best_first() {
        let vectors = vec![vec![0.0, 1.0], vec![1.0, 0.1], vec![1.0, 0.0], vec![0.0, 0.0]];
        let ranked = rank(&vectors, &[1.0, 0.0], 2);
        let order: Vec<_> = ranked.iter().map(|(i, _)| *i).collect();
        assert_eq!(order, [2, 1]);
    }
}
