use std::sync::Arc;

use crate::{
    error::AppResult,
    graph::GraphStore,
    models::{NormalizedScoreEntry, ScoreEntry},
    services::scoring::min_max_normalize,
};

/// Structural scores for one query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphScores {
    pub entries: Vec<NormalizedScoreEntry>,
    /// False when the graph store returned no candidates
    pub has_graph: bool,
    /// Largest raw shared-node count among the returned candidates
    pub raw_max: f64,
}

impl GraphScores {
    /// No structural data for the title
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Scores candidates by how many attribute nodes they share with the query
#[derive(Clone)]
pub struct GraphScoreProvider {
    store: Arc<dyn GraphStore>,
}

impl GraphScoreProvider {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Fetches up to `limit` co-occurring movies and normalizes their counts
    ///
    /// Rows are ordered by shared count and cut to `limit` before
    /// normalization, so the range is that of the kept rows. An isolated or unknown title yields
    /// [`GraphScores::empty`]; store failures are returned as errors.
    pub async fn graph_scores(&self, title: &str, limit: usize) -> AppResult<GraphScores> {
        let mut rows = self.store.query_co_occurrence(title, limit).await?;
        rows.sort_by(|a, b| {
            b.shared_count
                .cmp(&a.shared_count)
                .then_with(|| a.title.cmp(&b.title))
        });
        rows.truncate(limit);

        if rows.is_empty() {
            tracing::debug!(title = %title, store = self.store.name(), "No structural candidates");
            return Ok(GraphScores::empty());
        }

        let raw: Vec<ScoreEntry> = rows
            .into_iter()
            .map(|row| ScoreEntry::new(row.title, row.shared_count as f64))
            .collect();
        let raw_max = raw.iter().map(|e| e.score).fold(f64::NEG_INFINITY, f64::max);

        tracing::debug!(
            title = %title,
            candidates = raw.len(),
            raw_max,
            "Graph scores computed"
        );

        Ok(GraphScores {
            entries: min_max_normalize(raw),
            has_graph: true,
            raw_max,
        })
    }
}
