use std::time::Duration;

use crate::{
    error::{AppError, AppResult},
    graph::GraphStore,
    models::{
        GraphData, GraphEdge, GraphNode, Movie, MovieId, RecommendationBundle,
        RecommendationResponse, RecommendedMovie,
    },
    services::hybrid::ScoreFusionEngine,
};

/// Builds the full recommendation response for a movie id
///
/// Resolves the movie in the graph store, scores candidates with the fusion
/// engine under `timeout`, then enriches every ranked title with its graph
/// store details. Titles the graph store cannot resolve are skipped.
pub async fn recommend_for_movie(
    engine: &ScoreFusionEngine,
    graph: &dyn GraphStore,
    movie_id: MovieId,
    top_k: usize,
    timeout: Duration,
) -> AppResult<RecommendationResponse> {
    let Some(record) = graph.find_movie_by_id(movie_id).await? else {
        tracing::info!(movie_id, "Movie not found in graph store");
        return Ok(RecommendationResponse::empty());
    };

    let bundle = tokio::time::timeout(timeout, engine.get_recommendations(&record.title, top_k))
        .await
        .map_err(|_| {
            tracing::error!(
                movie_id,
                timeout_ms = timeout.as_millis() as u64,
                "Recommendation computation timed out"
            );
            AppError::Timeout(format!("recommendations for movie {}", movie_id))
        })??;

    let genres = graph.movie_genres(record.id).await?;
    let selected = record.into_movie(genres);

    let recommendations = enrich(graph, &bundle).await?;
    let graph_data = build_graph_data(&selected, &bundle, &recommendations);

    tracing::info!(
        movie_id,
        title = %selected.title,
        recommendations = recommendations.len(),
        fallback = bundle.fallback,
        degraded = bundle.degraded,
        "Recommendation response built"
    );

    Ok(RecommendationResponse {
        query: selected.title.clone(),
        selected_movie: Some(selected),
        recommendations,
        graph_data,
        fallback: bundle.fallback,
        degraded: bundle.degraded,
    })
}

/// Looks up details for every hybrid result, keeping rank order
async fn enrich(
    graph: &dyn GraphStore,
    bundle: &RecommendationBundle,
) -> AppResult<Vec<RecommendedMovie>> {
    let mut recommendations = Vec::with_capacity(bundle.hybrid.len());

    for result in &bundle.hybrid {
        let Some(record) = graph.find_movie_by_title(&result.title).await? else {
            tracing::debug!(title = %result.title, "Recommended title missing from graph store");
            continue;
        };

        let genres = graph.movie_genres(record.id).await?;
        recommendations.push(RecommendedMovie {
            movie: record.into_movie(genres),
            confidence: result.confidence / 100.0,
        });
    }

    Ok(recommendations)
}

fn build_graph_data(
    selected: &Movie,
    bundle: &RecommendationBundle,
    recommendations: &[RecommendedMovie],
) -> GraphData {
    let source = selected.id.to_string();
    let mut nodes = vec![GraphNode {
        id: source.clone(),
        label: selected.title.clone(),
        score: 1.0,
    }];
    let mut edges = Vec::with_capacity(recommendations.len());

    for rec in recommendations {
        let target = rec.movie.id.to_string();
        let weight = bundle
            .hybrid
            .iter()
            .find(|r| r.title == rec.movie.title)
            .map(|r| r.score)
            .unwrap_or(0.0);

        nodes.push(GraphNode {
            id: target.clone(),
            label: rec.movie.title.clone(),
            score: rec.confidence,
        });
        edges.push(GraphEdge {
            source: source.clone(),
            target,
            weight,
        });
    }

    GraphData { nodes, edges }
}
