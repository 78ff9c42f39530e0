use axum::{
    extract::{Path, State},
    Extension, Json,
};

use crate::{
    cached,
    db::CacheKey,
    error::AppResult,
    middleware::RequestId,
    models::{MovieId, RecommendationResponse},
    routes::AppState,
    services::recommendations,
};

/// Handler for hybrid recommendations of one movie
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(movie_id): Path<MovieId>,
) -> AppResult<Json<RecommendationResponse>> {
    tracing::info!(
        request_id = %request_id,
        movie_id,
        "Processing recommendation request"
    );

    let key = CacheKey::Recommendations(movie_id);
    let config = state.config.clone();

    let response: RecommendationResponse = cached!(
        state.cache.as_ref(),
        key,
        config.result_cache_ttl_secs,
        recommendations::recommend_for_movie(
            &state.engine,
            state.graph.as_ref(),
            movie_id,
            config.top_k,
            config.request_timeout(),
        ),
        RecommendationResponse::is_cacheable
    )?;

    tracing::info!(
        request_id = %request_id,
        movie_id,
        results = response.recommendations.len(),
        fallback = response.fallback,
        degraded = response.degraded,
        "Recommendation request completed"
    );

    Ok(Json(response))
}
