use crate::{
    error::{AppError, AppResult},
    graph::GraphStore,
    models::{SearchResponse, SearchSuggestion},
};

/// Titles fetched from the graph store per search
const SEARCH_CANDIDATES: usize = 10;
/// Suggestions returned to the client
const MAX_SUGGESTIONS: usize = 5;

/// Autosuggest over movie titles
///
/// Candidates are substring matches; each is scored by how much of the
/// title the query covers, so shorter titles that contain the query rank
/// first.
pub async fn search_movies(graph: &dyn GraphStore, query: &str) -> AppResult<SearchResponse> {
    let query = query.trim();
    if query.is_empty() {
        return Err(AppError::InvalidInput(
            "Search query must not be empty".to_string(),
        ));
    }

    let movies = graph.search_titles(query, SEARCH_CANDIDATES).await?;
    let query_len = query.chars().count() as f64;

    let mut suggestions: Vec<SearchSuggestion> = movies
        .into_iter()
        .map(|movie| {
            let title_len = movie.title.chars().count().max(1) as f64;
            SearchSuggestion {
                id: movie.id,
                score: round3(query_len / title_len),
                title: movie.title,
            }
        })
        .collect();

    // Stable sort keeps store order among equal scores
    suggestions.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    suggestions.truncate(MAX_SUGGESTIONS);

    tracing::debug!(query = %query, suggestions = suggestions.len(), "Movie search completed");

    Ok(SearchResponse { suggestions })
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
