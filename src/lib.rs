//! Hybrid movie recommendation service.
//!
//! Recommends movies similar to a queried one by fusing a structural signal
//! (attribute nodes shared in a movie graph) with a semantic signal
//! (precomputed TF-IDF and dense text embeddings).

pub mod config;
pub mod db;
pub mod error;
pub mod graph;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
