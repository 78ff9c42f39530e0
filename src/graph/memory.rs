/// In-process movie graph
///
/// Mirrors the co-occurrence semantics of the PostgreSQL store over data held
/// in memory. Used for local runs without a database and in tests.
use std::collections::{BTreeMap, HashMap};

use crate::{
    error::{AppError, AppResult},
    graph::{CoOccurrence, GraphStore, RelationKind},
    models::{MovieId, MovieRecord},
};

#[derive(Debug, Clone, Default)]
pub struct InMemoryGraphStore {
    movies: BTreeMap<MovieId, MovieRecord>,
    links: HashMap<MovieId, Vec<(RelationKind, String)>>,
    unavailable: bool,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_movie(mut self, movie: MovieRecord) -> Self {
        self.movies.insert(movie.id, movie);
        self
    }

    /// Links a movie to the attribute node `target` of the given kind
    pub fn with_link(mut self, id: MovieId, kind: RelationKind, target: &str) -> Self {
        self.links
            .entry(id)
            .or_default()
            .push((kind, target.to_string()));
        self
    }

    /// Makes every query fail as if the store could not be reached
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    fn check_available(&self) -> AppResult<()> {
        if self.unavailable {
            return Err(AppError::GraphStore(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn links_of(&self, id: MovieId) -> &[(RelationKind, String)] {
        self.links.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[async_trait::async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn query_co_occurrence(
        &self,
        title: &str,
        limit: usize,
    ) -> AppResult<Vec<CoOccurrence>> {
        self.check_available()?;

        let mut counts: HashMap<&str, i64> = HashMap::new();

        for source in self.movies.values().filter(|m| m.title == title) {
            for (kind, target) in self.links_of(source.id) {
                for other in self.movies.values().filter(|m| m.id != source.id) {
                    let shared = self
                        .links_of(other.id)
                        .iter()
                        .filter(|(k, t)| k == kind && t == target)
                        .count() as i64;
                    if shared > 0 {
                        *counts.entry(other.title.as_str()).or_insert(0) += shared;
                    }
                }
            }
        }

        let mut rows: Vec<CoOccurrence> = counts
            .into_iter()
            .map(|(title, shared_count)| CoOccurrence::new(title, shared_count))
            .collect();
        rows.sort_by(|a, b| {
            b.shared_count
                .cmp(&a.shared_count)
                .then_with(|| a.title.cmp(&b.title))
        });
        rows.truncate(limit);

        Ok(rows)
    }

    async fn find_movie_by_id(&self, id: MovieId) -> AppResult<Option<MovieRecord>> {
        self.check_available()?;
        Ok(self.movies.get(&id).cloned())
    }

    async fn find_movie_by_title(&self, title: &str) -> AppResult<Option<MovieRecord>> {
        self.check_available()?;
        Ok(self.movies.values().find(|m| m.title == title).cloned())
    }

    async fn movie_genres(&self, id: MovieId) -> AppResult<Vec<String>> {
        self.check_available()?;
        let mut genres: Vec<String> = self
            .links_of(id)
            .iter()
            .filter(|(kind, _)| *kind == RelationKind::InGenre)
            .map(|(_, target)| target.clone())
            .collect();
        genres.sort();
        Ok(genres)
    }

    async fn search_titles(&self, query: &str, limit: usize) -> AppResult<Vec<MovieRecord>> {
        self.check_available()?;
        let needle = query.to_lowercase();
        Ok(self
            .movies
            .values()
            .filter(|m| m.title.to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
