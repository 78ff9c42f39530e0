/// Hybrid recommendation scoring
///
/// Merges structural scores from the graph store with semantic scores from
/// the embedding store into one ranked list:
///
/// 1. both providers return up to `provider_limit` candidates, each
///    normalized within its own candidate set
/// 2. the graph signal is dropped (fallback) when it is missing or all zero
/// 3. candidates are scored `graph_weight * g + semantic_weight * s`, or just
///    `s` in fallback, with a missing score counting as 0
/// 4. the top `top_k` get a confidence relative to the best result
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    graph::GraphStore,
    models::{HybridResult, NormalizedScoreEntry, RecommendationBundle},
    services::{
        embeddings::EmbeddingStore,
        graph_scores::{GraphScoreProvider, GraphScores},
        scoring::{by_score_then_title, round2},
        semantic::SemanticScoreProvider,
    },
};

const DEFAULT_PROVIDER_LIMIT: usize = 100;
const MIN_CONFIDENCE_BASE: f64 = 1e-8;

/// What to do when the graph store cannot be reached or queried
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphFailurePolicy {
    /// Log the failure and answer from semantic scores alone
    #[default]
    Degrade,
    /// Return the graph store error to the caller
    Fail,
}

/// Relative weight of each signal in non-fallback mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
    pub graph: f64,
    pub semantic: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            graph: 0.5,
            semantic: 0.5,
        }
    }
}

impl FusionWeights {
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [("graph", self.graph), ("semantic", self.semantic)] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{} weight must be a non-negative number", name));
            }
        }
        if self.graph == 0.0 && self.semantic == 0.0 {
            return Err("at least one weight must be positive".to_string());
        }
        Ok(())
    }
}

/// True when the graph signal cannot be used for this query
///
/// Covers "no rows" and "rows whose scores are all zero". Raw counts are
/// checked as well because an all-zero candidate set normalizes to 0.5.
pub fn is_fallback(graph: &GraphScores) -> bool {
    let max_normalized = graph
        .entries
        .iter()
        .map(|e| e.score)
        .fold(0.0_f64, f64::max);

    !graph.has_graph || max_normalized == 0.0 || graph.raw_max == 0.0
}

/// Title → score, later duplicates overwriting earlier ones
fn score_map(entries: &[NormalizedScoreEntry]) -> HashMap<&str, f64> {
    entries
        .iter()
        .map(|e| (e.title.as_str(), e.score))
        .collect()
}

fn sorted_entries(map: &HashMap<&str, f64>) -> Vec<NormalizedScoreEntry> {
    let mut entries: Vec<NormalizedScoreEntry> = map
        .iter()
        .map(|(title, score)| NormalizedScoreEntry::new(*title, *score))
        .collect();
    entries.sort_by(|a, b| by_score_then_title(a.score, &a.title, b.score, &b.title));
    entries
}

/// Ranks the union of both candidate sets and attaches confidences
///
/// Ties on hybrid score are ordered by title ascending.
pub fn fuse_scores(
    graph: &[NormalizedScoreEntry],
    semantic: &[NormalizedScoreEntry],
    fallback: bool,
    weights: FusionWeights,
    top_k: usize,
) -> Vec<HybridResult> {
    let graph_map = score_map(graph);
    let semantic_map = score_map(semantic);

    let candidates: HashSet<&str> = graph_map.keys().chain(semantic_map.keys()).copied().collect();

    let mut scored: Vec<(&str, f64)> = candidates
        .into_iter()
        .map(|title| {
            let g = graph_map.get(title).copied().unwrap_or(0.0);
            let s = semantic_map.get(title).copied().unwrap_or(0.0);
            let score = if fallback {
                s
            } else {
                weights.graph * g + weights.semantic * s
            };
            (title, score)
        })
        .collect();

    scored.sort_by(|a, b| by_score_then_title(a.1, a.0, b.1, b.0));
    scored.truncate(top_k);

    let max_score = scored
        .iter()
        .map(|(_, score)| *score)
        .fold(f64::NEG_INFINITY, f64::max)
        .max(MIN_CONFIDENCE_BASE);

    scored
        .into_iter()
        .map(|(title, score)| HybridResult {
            title: title.to_string(),
            score,
            confidence: round2(score / max_score * 100.0),
        })
        .collect()
}

/// Combines graph and semantic scores into ranked recommendations
///
/// Cheap to clone; share one instance across requests.
#[derive(Clone)]
pub struct ScoreFusionEngine {
    graph: GraphScoreProvider,
    semantic: SemanticScoreProvider,
    weights: FusionWeights,
    provider_limit: usize,
    failure_policy: GraphFailurePolicy,
}

impl ScoreFusionEngine {
    pub fn new(graph_store: Arc<dyn GraphStore>, embeddings: Arc<EmbeddingStore>) -> Self {
        Self {
            graph: GraphScoreProvider::new(graph_store),
            semantic: SemanticScoreProvider::new(embeddings),
            weights: FusionWeights::default(),
            provider_limit: DEFAULT_PROVIDER_LIMIT,
            failure_policy: GraphFailurePolicy::default(),
        }
    }

    pub fn with_weights(mut self, weights: FusionWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_provider_limit(mut self, limit: usize) -> Self {
        self.provider_limit = limit;
        self
    }

    pub fn with_failure_policy(mut self, policy: GraphFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn weights(&self) -> FusionWeights {
        self.weights
    }

    pub fn movie_exists(&self, title: &str) -> bool {
        self.semantic.store().contains(title)
    }

    /// Recommendations for `title` using the configured weights
    pub async fn get_recommendations(
        &self,
        title: &str,
        top_k: usize,
    ) -> AppResult<RecommendationBundle> {
        self.get_recommendations_with_weights(title, top_k, self.weights)
            .await
    }

    /// Recommendations for `title` with per-call weights
    ///
    /// An unknown title is not an error: it yields an empty bundle flagged
    /// as fallback. Graph store failures follow the engine's
    /// [`GraphFailurePolicy`].
    pub async fn get_recommendations_with_weights(
        &self,
        title: &str,
        top_k: usize,
        weights: FusionWeights,
    ) -> AppResult<RecommendationBundle> {
        weights.validate().map_err(AppError::InvalidInput)?;

        if !self.movie_exists(title) {
            tracing::info!(title = %title, "Unknown movie, returning empty recommendations");
            return Ok(RecommendationBundle::unknown_item());
        }

        let limit = self.provider_limit;
        let semantic = self.semantic.clone();
        let owned_title = title.to_string();
        let semantic_task =
            tokio::task::spawn_blocking(move || semantic.semantic_scores(&owned_title, limit));

        let (graph_result, semantic_result) =
            tokio::join!(self.graph.graph_scores(title, limit), semantic_task);

        let semantic_entries = semantic_result
            .map_err(|e| AppError::Internal(format!("Semantic scoring task failed: {}", e)))?;

        let (graph_scores, degraded) = match graph_result {
            Ok(scores) => (scores, false),
            Err(e)
                if e.is_graph_transport() && self.failure_policy == GraphFailurePolicy::Degrade =>
            {
                tracing::warn!(
                    error = %e,
                    title = %title,
                    "Graph store unavailable, degrading to semantic-only scores"
                );
                (GraphScores::empty(), true)
            }
            Err(e) => return Err(e),
        };

        let fallback = is_fallback(&graph_scores);
        let hybrid = fuse_scores(
            &graph_scores.entries,
            &semantic_entries,
            fallback,
            weights,
            top_k,
        );

        tracing::info!(
            title = %title,
            graph_candidates = graph_scores.entries.len(),
            semantic_candidates = semantic_entries.len(),
            results = hybrid.len(),
            fallback,
            degraded,
            "Recommendations computed"
        );

        Ok(RecommendationBundle {
            hybrid,
            graph: sorted_entries(&score_map(&graph_scores.entries)),
            semantic: sorted_entries(&score_map(&semantic_entries)),
            fallback,
            degraded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{CoOccurrence, MockGraphStore};
    use crate::services::embeddings::{DenseMatrix, SparseMatrix};

    fn entries(pairs: &[(&str, f64)]) -> Vec<NormalizedScoreEntry> {
        pairs
            .iter()
            .map(|(t, s)| NormalizedScoreEntry::new(*t, *s))
            .collect()
    }

    fn titles(results: &[HybridResult]) -> Vec<&str> {
        results.iter().map(|r| r.title.as_str()).collect()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    /// Four movies; "Alien" is semantically closest to "Aliens"
    fn embedding_store() -> Arc<EmbeddingStore> {
        let titles = ["Alien", "Aliens", "Prometheus", "Up"]
            .iter()
            .map(|t| t.to_string())
            .collect();
        let tfidf = SparseMatrix::from_rows(&[
            vec![1.0, 1.0, 0.0],
            vec![1.0, 1.0, 0.0],
            vec![1.0, 0.0, 1.0],
            vec![0.0, 0.0, 1.0],
        ])
        .unwrap();
        let embeddings = DenseMatrix::from_rows(vec![
            vec![1.0, 0.0],
            vec![0.9, 0.1],
            vec![0.6, 0.4],
            vec![0.0, 1.0],
        ])
        .unwrap();
        Arc::new(EmbeddingStore::from_parts(titles, tfidf, embeddings).unwrap())
    }

    fn graph_returning(rows: Vec<CoOccurrence>) -> Arc<MockGraphStore> {
        let mut store = MockGraphStore::new();
        store
            .expect_query_co_occurrence()
            .returning(move |_, _| Ok(rows.clone()));
        store.expect_name().return_const("mock");
        Arc::new(store)
    }

    fn failing_graph() -> Arc<MockGraphStore> {
        let mut store = MockGraphStore::new();
        store
            .expect_query_co_occurrence()
            .returning(|_, _| Err(AppError::GraphStore(sqlx::Error::PoolTimedOut)));
        store.expect_name().return_const("mock");
        Arc::new(store)
    }

    #[test]
    fn test_fuse_weighted_scores() {
        let graph = entries(&[("A", 0.8), ("B", 0.2)]);
        let semantic = entries(&[("A", 0.4), ("B", 0.9), ("C", 0.5)]);

        let results = fuse_scores(&graph, &semantic, false, FusionWeights::default(), 10);

        assert_eq!(titles(&results), vec!["A", "B", "C"]);
        assert_close(results[0].score, 0.6);
        assert_close(results[1].score, 0.55);
        assert_close(results[2].score, 0.25);
    }

    #[test]
    fn test_fuse_fallback_uses_semantic_only() {
        let graph = entries(&[("A", 0.8), ("B", 0.2)]);
        let semantic = entries(&[("A", 0.4), ("B", 0.9), ("C", 0.5)]);

        let results = fuse_scores(&graph, &semantic, true, FusionWeights::default(), 10);

        assert_eq!(titles(&results), vec!["B", "C", "A"]);
        assert_eq!(results[0].score, 0.9);
        assert_eq!(results[1].score, 0.5);
        assert_eq!(results[2].score, 0.4);
    }

    #[test]
    fn test_confidence_relative_to_best() {
        let semantic = entries(&[("A", 0.6), ("B", 0.3)]);
        let results = fuse_scores(&[], &semantic, true, FusionWeights::default(), 10);

        let confidences: Vec<f64> = results.iter().map(|r| r.confidence).collect();
        assert_eq!(confidences, vec![100.0, 50.0]);
    }

    #[test]
    fn test_confidence_rounded_to_two_decimals() {
        let semantic = entries(&[("A", 0.9), ("B", 0.3)]);
        let results = fuse_scores(&[], &semantic, true, FusionWeights::default(), 10);
        assert_eq!(results[1].confidence, 33.33);
    }

    #[test]
    fn test_all_zero_scores_do_not_divide_by_zero() {
        let semantic = entries(&[("A", 0.0), ("B", 0.0)]);
        let results = fuse_scores(&[], &semantic, true, FusionWeights::default(), 10);
        assert!(results.iter().all(|r| r.confidence == 0.0));
    }

    #[test]
    fn test_fuse_truncates_to_top_k_and_breaks_ties_by_title() {
        let semantic = entries(&[("C", 0.5), ("A", 0.5), ("B", 0.5), ("D", 0.1)]);
        let results = fuse_scores(&[], &semantic, true, FusionWeights::default(), 2);
        assert_eq!(titles(&results), vec!["A", "B"]);
    }

    #[test]
    fn test_fuse_last_duplicate_wins() {
        let semantic = entries(&[("A", 0.1), ("A", 0.7), ("B", 0.4)]);
        let results = fuse_scores(&[], &semantic, true, FusionWeights::default(), 10);
        assert_eq!(titles(&results), vec!["A", "B"]);
        assert_eq!(results[0].score, 0.7);
    }

    #[test]
    fn test_fuse_respects_custom_weights() {
        let graph = entries(&[("A", 1.0)]);
        let semantic = entries(&[("B", 1.0)]);
        let weights = FusionWeights {
            graph: 0.2,
            semantic: 0.8,
        };
        let results = fuse_scores(&graph, &semantic, false, weights, 10);
        assert_eq!(titles(&results), vec!["B", "A"]);
        assert_close(results[1].score, 0.2);
    }

    #[test]
    fn test_is_fallback_triggers() {
        assert!(is_fallback(&GraphScores::empty()));

        let zero_rows = GraphScores {
            entries: entries(&[("A", 0.0), ("B", 0.0)]),
            has_graph: true,
            raw_max: 1.0,
        };
        assert!(is_fallback(&zero_rows));

        let zero_counts = GraphScores {
            entries: entries(&[("A", 0.5), ("B", 0.5)]),
            has_graph: true,
            raw_max: 0.0,
        };
        assert!(is_fallback(&zero_counts));

        let usable = GraphScores {
            entries: entries(&[("A", 1.0), ("B", 0.0)]),
            has_graph: true,
            raw_max: 4.0,
        };
        assert!(!is_fallback(&usable));
    }

    #[test]
    fn test_weights_validation() {
        assert!(FusionWeights::default().validate().is_ok());
        assert!(FusionWeights {
            graph: -0.1,
            semantic: 0.5
        }
        .validate()
        .is_err());
        assert!(FusionWeights {
            graph: f64::NAN,
            semantic: 0.5
        }
        .validate()
        .is_err());
        assert!(FusionWeights {
            graph: 0.0,
            semantic: 0.0
        }
        .validate()
        .is_err());
    }

    #[tokio::test]
    async fn test_unknown_movie_returns_empty_fallback_bundle() {
        let mut store = MockGraphStore::new();
        store.expect_query_co_occurrence().never();
        let engine = ScoreFusionEngine::new(Arc::new(store), embedding_store());

        let bundle = engine
            .get_recommendations("Nonexistent Title", 10)
            .await
            .unwrap();

        assert!(bundle.hybrid.is_empty());
        assert!(bundle.graph.is_empty());
        assert!(bundle.semantic.is_empty());
        assert!(bundle.fallback);
        assert!(!engine.movie_exists("Nonexistent Title"));
    }

    #[tokio::test]
    async fn test_graph_and_semantic_are_fused() {
        let graph = graph_returning(vec![
            CoOccurrence::new("Prometheus", 6),
            CoOccurrence::new("Aliens", 2),
        ]);
        let engine = ScoreFusionEngine::new(graph, embedding_store());

        let bundle = engine.get_recommendations("Alien", 10).await.unwrap();

        assert!(!bundle.fallback);
        assert!(!bundle.degraded);
        assert_eq!(
            bundle.graph,
            entries(&[("Prometheus", 1.0), ("Aliens", 0.0)])
        );
        assert_eq!(bundle.semantic.len(), 3);
        assert!(bundle.semantic.iter().all(|e| e.title != "Alien"));

        // Prometheus: 0.5 * 1.0 + 0.5 * s, Aliens: 0.5 * 0.0 + 0.5 * 1.0
        let semantic_prometheus = bundle
            .semantic
            .iter()
            .find(|e| e.title == "Prometheus")
            .unwrap()
            .score;
        let prometheus = bundle.hybrid.iter().find(|r| r.title == "Prometheus").unwrap();
        assert_close(prometheus.score, 0.5 + 0.5 * semantic_prometheus);

        assert_eq!(bundle.hybrid[0].confidence, 100.0);
        assert!(bundle.hybrid.iter().all(|r| r.title != "Alien"));
    }

    #[tokio::test]
    async fn test_no_graph_rows_falls_back() {
        let engine = ScoreFusionEngine::new(graph_returning(Vec::new()), embedding_store());

        let bundle = engine.get_recommendations("Alien", 10).await.unwrap();

        assert!(bundle.fallback);
        assert!(bundle.graph.is_empty());
        let hybrid: Vec<(String, f64)> = bundle
            .hybrid
            .iter()
            .map(|r| (r.title.clone(), r.score))
            .collect();
        let semantic: Vec<(String, f64)> = bundle
            .semantic
            .iter()
            .map(|e| (e.title.clone(), e.score))
            .collect();
        assert_eq!(hybrid, semantic);
    }

    #[tokio::test]
    async fn test_zero_count_graph_rows_fall_back() {
        let graph = graph_returning(vec![
            CoOccurrence::new("Aliens", 0),
            CoOccurrence::new("Up", 0),
        ]);
        let engine = ScoreFusionEngine::new(graph, embedding_store());

        let bundle = engine.get_recommendations("Alien", 10).await.unwrap();

        assert!(bundle.fallback);
        assert_eq!(bundle.graph.len(), 2);
        assert_eq!(bundle.hybrid[0].title, "Aliens");
    }

    #[tokio::test]
    async fn test_top_k_truncates_hybrid_but_not_signal_lists() {
        let graph = graph_returning(vec![
            CoOccurrence::new("Prometheus", 6),
            CoOccurrence::new("Aliens", 2),
            CoOccurrence::new("Up", 1),
        ]);
        let engine = ScoreFusionEngine::new(graph, embedding_store());

        let bundle = engine.get_recommendations("Alien", 1).await.unwrap();

        assert_eq!(bundle.hybrid.len(), 1);
        assert_eq!(bundle.graph.len(), 3);
        assert_eq!(bundle.semantic.len(), 3);
    }

    #[tokio::test]
    async fn test_zero_top_k_returns_empty_hybrid_with_signals() {
        let graph = graph_returning(vec![CoOccurrence::new("Aliens", 2)]);
        let engine = ScoreFusionEngine::new(graph, embedding_store());

        let bundle = engine.get_recommendations("Alien", 0).await.unwrap();

        assert!(bundle.hybrid.is_empty());
        assert_eq!(bundle.graph.len(), 1);
        assert!(!bundle.semantic.is_empty());
    }

    #[tokio::test]
    async fn test_graph_failure_degrades_by_default() {
        let engine = ScoreFusionEngine::new(failing_graph(), embedding_store());

        let bundle = engine.get_recommendations("Alien", 10).await.unwrap();

        assert!(bundle.degraded);
        assert!(bundle.fallback);
        assert!(bundle.graph.is_empty());
        assert_eq!(bundle.hybrid.len(), 3);
    }

    #[tokio::test]
    async fn test_graph_failure_propagates_with_fail_policy() {
        let engine = ScoreFusionEngine::new(failing_graph(), embedding_store())
            .with_failure_policy(GraphFailurePolicy::Fail);

        let err = engine.get_recommendations("Alien", 10).await.unwrap_err();
        assert!(err.is_graph_transport());
    }

    #[tokio::test]
    async fn test_invalid_weights_rejected() {
        let engine = ScoreFusionEngine::new(graph_returning(Vec::new()), embedding_store());
        let weights = FusionWeights {
            graph: -1.0,
            semantic: 0.5,
        };

        let result = engine
            .get_recommendations_with_weights("Alien", 10, weights)
            .await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_engine() {
        let graph = graph_returning(vec![CoOccurrence::new("Aliens", 3)]);
        let engine = ScoreFusionEngine::new(graph, embedding_store()).with_provider_limit(2);

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let engine = engine.clone();
            tasks.push(tokio::spawn(async move {
                engine.get_recommendations("Alien", 5).await
            }));
        }

        let mut bundles = Vec::new();
        for task in tasks {
            bundles.push(task.await.unwrap().unwrap());
        }

        assert!(bundles.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(bundles[0].semantic.len(), 2);
    }
}
