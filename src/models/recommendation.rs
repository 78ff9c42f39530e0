use serde::{Deserialize, Serialize};

/// Raw provider score for one candidate, before normalization
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreEntry {
    pub title: String,
    pub score: f64,
}

impl ScoreEntry {
    pub fn new(title: impl Into<String>, score: f64) -> Self {
        Self {
            title: title.into(),
            score,
        }
    }
}

/// Candidate score rescaled to [0, 1] within its own candidate set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedScoreEntry {
    pub title: String,
    pub score: f64,
}

impl NormalizedScoreEntry {
    pub fn new(title: impl Into<String>, score: f64) -> Self {
        Self {
            title: title.into(),
            score,
        }
    }
}

/// One ranked recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridResult {
    pub title: String,
    pub score: f64,
    /// Score as a percentage of the best score in the same response
    pub confidence: f64,
}

/// Everything the scoring engine knows about one query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationBundle {
    pub hybrid: Vec<HybridResult>,
    pub graph: Vec<NormalizedScoreEntry>,
    pub semantic: Vec<NormalizedScoreEntry>,
    pub fallback: bool,
    /// Set when the graph store failed and the graph signal was skipped
    #[serde(default)]
    pub degraded: bool,
}

impl RecommendationBundle {
    /// Bundle returned for a title the embedding store does not know
    pub fn unknown_item() -> Self {
        Self {
            fallback: true,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hybrid.is_empty()
    }
}
