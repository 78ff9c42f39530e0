pub mod movie;
pub mod recommendation;

pub use movie::{
    GraphData, GraphEdge, GraphNode, Movie, MovieId, MovieRecord, RecommendationResponse,
    RecommendedMovie, SearchResponse, SearchSuggestion,
};
pub use recommendation::{
    HybridResult, NormalizedScoreEntry, RecommendationBundle, ScoreEntry,
};
