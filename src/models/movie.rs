use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Surrogate identifier of a movie node in the graph store
pub type MovieId = i64;

/// Movie row as stored in the graph store
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct MovieRecord {
    pub id: MovieId,
    pub title: String,
    pub overview: Option<String>,
    pub language: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub vote_average: Option<f64>,
    pub poster_url: Option<String>,
}

impl MovieRecord {
    /// Creates a record with only the identity fields set
    pub fn new(id: MovieId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            overview: None,
            language: None,
            release_date: None,
            vote_average: None,
            poster_url: None,
        }
    }

    pub fn release_year(&self) -> Option<i32> {
        self.release_date.map(|d| d.year())
    }

    /// Builds the client-facing movie using the genres fetched separately
    pub fn into_movie(self, genres: Vec<String>) -> Movie {
        let release_year = self.release_year();
        Movie {
            id: self.id,
            title: self.title,
            overview: self.overview.unwrap_or_default(),
            genres,
            language: self.language.unwrap_or_else(|| "en".to_string()),
            release_year,
            score: self.vote_average.unwrap_or(0.0),
            poster_url: self.poster_url,
        }
    }
}

/// Movie returned to the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    pub overview: String,
    pub genres: Vec<String>,
    pub language: String,
    pub release_year: Option<i32>,
    /// Average audience vote
    pub score: f64,
    pub poster_url: Option<String>,
}

/// A recommended movie with its confidence in [0, 1]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendedMovie {
    #[serde(flatten)]
    pub movie: Movie,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub weight: f64,
}

/// Node/edge view of a recommendation for graph visualisation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Response for GET /api/recommendations/{id}
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResponse {
    pub query: String,
    pub selected_movie: Option<Movie>,
    pub recommendations: Vec<RecommendedMovie>,
    pub graph_data: GraphData,
    /// True when only the semantic signal contributed
    pub fallback: bool,
    /// True when the graph store failed and the answer is semantic-only
    #[serde(default)]
    pub degraded: bool,
}

impl RecommendationResponse {
    /// Response for a movie id the graph store does not know
    pub fn empty() -> Self {
        Self {
            query: String::new(),
            selected_movie: None,
            recommendations: Vec::new(),
            graph_data: GraphData::default(),
            fallback: true,
            degraded: false,
        }
    }

    /// Degraded answers reflect a transient store failure and must not be cached
    pub fn is_cacheable(&self) -> bool {
        !self.degraded
    }
}

/// Autosuggest entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchSuggestion {
    pub id: MovieId,
    pub title: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResponse {
    pub suggestions: Vec<SearchSuggestion>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_movie_fills_defaults() {
        let record = MovieRecord::new(19995, "Avatar");
        let movie = record.into_movie(vec!["Action".to_string()]);

        assert_eq!(movie.id, 19995);
        assert_eq!(movie.overview, "");
        assert_eq!(movie.language, "en");
        assert_eq!(movie.release_year, None);
        assert_eq!(movie.score, 0.0);
        assert_eq!(movie.genres, vec!["Action".to_string()]);
    }

    #[test]
    fn test_release_year_from_date() {
        let mut record = MovieRecord::new(1, "Heat");
        record.release_date = NaiveDate::from_ymd_opt(1995, 12, 15);
        assert_eq!(record.release_year(), Some(1995));
    }

    #[test]
    fn test_recommended_movie_serializes_flat_camel_case() {
        let mut record = MovieRecord::new(7, "Alien");
        record.poster_url = Some("https://img/alien.jpg".to_string());
        let rec = RecommendedMovie {
            movie: record.into_movie(vec![]),
            confidence: 0.5,
        };

        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["title"], "Alien");
        assert_eq!(json["posterUrl"], "https://img/alien.jpg");
        assert_eq!(json["releaseYear"], serde_json::Value::Null);
        assert_eq!(json["confidence"], 0.5);
    }

    #[test]
    fn test_empty_response_shape() {
        let json = serde_json::to_value(RecommendationResponse::empty()).unwrap();
        assert_eq!(json["query"], "");
        assert_eq!(json["selectedMovie"], serde_json::Value::Null);
        assert_eq!(json["recommendations"].as_array().unwrap().len(), 0);
        assert_eq!(json["graphData"]["nodes"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_degraded_response_is_not_cacheable() {
        let mut response = RecommendationResponse::empty();
        assert!(response.is_cacheable());

        response.degraded = true;
        assert!(!response.is_cacheable());

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["degraded"], true);
        assert_eq!(json["fallback"], true);
    }
}
