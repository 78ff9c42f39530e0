/// PostgreSQL-backed movie graph
///
/// Movies live in `movies`; every edge to an attribute node is a row in
/// `movie_links(movie_id, relation, target)`. Two movies share an attribute
/// node when they both have a link with the same `(relation, target)`.
use sqlx::PgPool;

use crate::{
    error::AppResult,
    graph::{CoOccurrence, GraphStore, RelationKind},
    models::{MovieId, MovieRecord},
};

const CO_OCCURRENCE_QUERY: &str = r#"
    SELECT other.title AS title, COUNT(*) AS shared_count
    FROM movies m
    JOIN movie_links ml
        ON ml.movie_id = m.id AND ml.relation = ANY($2)
    JOIN movie_links ol
        ON ol.relation = ml.relation AND ol.target = ml.target AND ol.movie_id <> m.id
    JOIN movies other
        ON other.id = ol.movie_id
    WHERE m.title = $1
    GROUP BY other.title
    ORDER BY shared_count DESC, other.title
    LIMIT $3
"#;

const MOVIE_COLUMNS: &str =
    "id, title, overview, language, release_date, vote_average, poster_url";

#[derive(Clone)]
pub struct PgGraphStore {
    pool: PgPool,
}

impl PgGraphStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn relation_labels() -> Vec<String> {
        RelationKind::ALL
            .iter()
            .map(|kind| kind.as_str().to_string())
            .collect()
    }
}

#[async_trait::async_trait]
impl GraphStore for PgGraphStore {
    async fn query_co_occurrence(
        &self,
        title: &str,
        limit: usize,
    ) -> AppResult<Vec<CoOccurrence>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(CO_OCCURRENCE_QUERY)
            .bind(title)
            .bind(Self::relation_labels())
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, title = %title, "Co-occurrence query failed");
                e
            })?;

        tracing::debug!(title = %title, rows = rows.len(), "Co-occurrence query completed");

        Ok(rows
            .into_iter()
            .map(|(title, shared_count)| CoOccurrence {
                title,
                shared_count,
            })
            .collect())
    }

    async fn find_movie_by_id(&self, id: MovieId) -> AppResult<Option<MovieRecord>> {
        let query = format!("SELECT {} FROM movies WHERE id = $1 LIMIT 1", MOVIE_COLUMNS);
        let movie = sqlx::query_as::<_, MovieRecord>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(movie)
    }

    async fn find_movie_by_title(&self, title: &str) -> AppResult<Option<MovieRecord>> {
        let query = format!(
            "SELECT {} FROM movies WHERE title = $1 ORDER BY id LIMIT 1",
            MOVIE_COLUMNS
        );
        let movie = sqlx::query_as::<_, MovieRecord>(&query)
            .bind(title)
            .fetch_optional(&self.pool)
            .await?;
        Ok(movie)
    }

    async fn movie_genres(&self, id: MovieId) -> AppResult<Vec<String>> {
        let genres: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT target
            FROM movie_links
            WHERE movie_id = $1 AND relation = $2
            ORDER BY target
            "#,
        )
        .bind(id)
        .bind(RelationKind::InGenre.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(genres)
    }

    async fn search_titles(&self, query: &str, limit: usize) -> AppResult<Vec<MovieRecord>> {
        let sql = format!(
            "SELECT {} FROM movies WHERE strpos(lower(title), lower($1)) > 0 ORDER BY id LIMIT $2",
            MOVIE_COLUMNS
        );
        let movies = sqlx::query_as::<_, MovieRecord>(&sql)
            .bind(query)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        Ok(movies)
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
