pub mod embeddings;
pub mod graph_scores;
pub mod hybrid;
pub mod movie_search;
pub mod recommendations;
pub mod scoring;
pub mod semantic;

pub use embeddings::EmbeddingStore;
pub use hybrid::{FusionWeights, GraphFailurePolicy, ScoreFusionEngine};
