use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::{
    cached,
    db::CacheKey,
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{Movie, MovieId, SearchResponse},
    routes::AppState,
    services::movie_search,
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    query: String,
}

/// Handler for movie autosuggest
pub async fn search(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<SearchResponse>> {
    tracing::debug!(request_id = %request_id, query = %params.query, "Searching movies");

    let key = CacheKey::MovieSearch(params.query.clone());
    let graph = state.graph.clone();

    let response: SearchResponse = cached!(
        state.cache.as_ref(),
        key,
        state.config.result_cache_ttl_secs,
        async { movie_search::search_movies(graph.as_ref(), &params.query).await }
    )?;

    Ok(Json(response))
}

/// Handler for movie details
pub async fn detail(
    State(state): State<AppState>,
    Path(movie_id): Path<MovieId>,
) -> AppResult<Json<Movie>> {
    let key = CacheKey::MovieDetail(movie_id);
    let graph = state.graph.clone();

    let movie: Movie = cached!(
        state.cache.as_ref(),
        key,
        state.config.result_cache_ttl_secs,
        async {
            let record = graph
                .find_movie_by_id(movie_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Movie {} not found", movie_id)))?;
            let genres = graph.movie_genres(record.id).await?;
            Ok::<_, AppError>(record.into_movie(genres))
        }
    )?;

    Ok(Json(movie))
}
