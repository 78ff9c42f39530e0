/// Movie graph store abstraction
///
/// The graph store holds movies plus their links to shared attribute nodes
/// (keywords, genres, production companies and countries, spoken languages).
/// Structural similarity between two movies is the number of attribute nodes
/// they both link to.
use std::fmt::Display;

use crate::{
    error::AppResult,
    models::{MovieId, MovieRecord},
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryGraphStore;
pub use postgres::PgGraphStore;

/// Relationship kinds that count towards structural similarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    HasKeyword,
    InGenre,
    ProducedBy,
    ProducedIn,
    SpokenIn,
}

impl RelationKind {
    pub const ALL: [RelationKind; 5] = [
        RelationKind::HasKeyword,
        RelationKind::InGenre,
        RelationKind::ProducedBy,
        RelationKind::ProducedIn,
        RelationKind::SpokenIn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::HasKeyword => "HAS_KEYWORD",
            RelationKind::InGenre => "IN_GENRE",
            RelationKind::ProducedBy => "PRODUCED_BY",
            RelationKind::ProducedIn => "PRODUCED_IN",
            RelationKind::SpokenIn => "SPOKEN_IN",
        }
    }
}

impl Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A movie sharing attribute nodes with the queried one
#[derive(Debug, Clone, PartialEq)]
pub struct CoOccurrence {
    pub title: String,
    pub shared_count: i64,
}

impl CoOccurrence {
    pub fn new(title: impl Into<String>, shared_count: i64) -> Self {
        Self {
            title: title.into(),
            shared_count,
        }
    }
}

/// Read-only access to the movie graph
///
/// Implementations must be safe to share across concurrent requests. Any
/// failure to reach or query the store is reported as an error; an empty
/// result is not a failure.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait GraphStore: Send + Sync {
    /// Movies sharing at least one attribute node with `title`
    ///
    /// Excludes the movie itself, ordered by shared count descending and
    /// capped at `limit` rows.
    async fn query_co_occurrence(&self, title: &str, limit: usize)
        -> AppResult<Vec<CoOccurrence>>;

    async fn find_movie_by_id(&self, id: MovieId) -> AppResult<Option<MovieRecord>>;

    /// Exact, case-sensitive title match
    async fn find_movie_by_title(&self, title: &str) -> AppResult<Option<MovieRecord>>;

    async fn movie_genres(&self, id: MovieId) -> AppResult<Vec<String>>;

    /// Case-insensitive substring search on titles
    async fn search_titles(&self, query: &str, limit: usize) -> AppResult<Vec<MovieRecord>>;

    /// Store name for logging
    fn name(&self) -> &'static str;
}
