use std::cmp::Ordering;
use std::sync::Arc;

use crate::{
    models::{NormalizedScoreEntry, ScoreEntry},
    services::{embeddings::EmbeddingStore, scoring::min_max_normalize},
};

const TFIDF_WEIGHT: f64 = 0.5;
const EMBEDDING_WEIGHT: f64 = 0.5;

/// Content similarity from TF-IDF and dense embeddings
///
/// Brute force over the whole corpus; cost grows linearly with the number
/// of movies.
#[derive(Clone)]
pub struct SemanticScoreProvider {
    store: Arc<EmbeddingStore>,
}

impl SemanticScoreProvider {
    pub fn new(store: Arc<EmbeddingStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &EmbeddingStore {
        &self.store
    }

    /// Blended cosine similarity of `title` against every movie, as a vector
    /// indexed like the embedding matrices
    fn combined_similarity(&self, idx: usize) -> Vec<f64> {
        let tfidf = self.store.tfidf().cosine_with_all(idx);
        let dense = self.store.embeddings().cosine_with_all(idx);

        tfidf
            .into_iter()
            .zip(dense)
            .map(|(t, d)| TFIDF_WEIGHT * t + EMBEDDING_WEIGHT * d)
            .collect()
    }

    /// The `limit` most similar movies to `title`, normalized within that set
    ///
    /// The query movie itself is never returned. Callers check existence
    /// first; an unknown title yields an empty list.
    pub fn semantic_scores(&self, title: &str, limit: usize) -> Vec<NormalizedScoreEntry> {
        let Some(idx) = self.store.index_of(title) else {
            tracing::warn!(title = %title, "Semantic scores requested for unknown title");
            return Vec::new();
        };

        let combined = self.combined_similarity(idx);

        let mut order: Vec<usize> = (0..combined.len()).collect();
        order.sort_by(|&a, &b| {
            combined[b]
                .partial_cmp(&combined[a])
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.cmp(&b))
        });

        let raw: Vec<ScoreEntry> = order
            .into_iter()
            .filter(|&i| i != idx)
            .take(limit)
            .filter_map(|i| {
                self.store
                    .title_at(i)
                    .map(|t| ScoreEntry::new(t, combined[i]))
            })
            .collect();

        tracing::debug!(title = %title, candidates = raw.len(), "Semantic scores computed");

        min_max_normalize(raw)
    }
}
