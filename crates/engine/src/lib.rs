//! Cinematch item-based collaborative filtering engine
//!
//! This crate turns MovieLens-style rating and movie files into an
//! item-user matrix, correlates every item pair with Pearson similarity and
//! answers "more like this", personalized and per-genre ranking queries.

pub mod config;
pub mod dataset;
pub mod engine;
pub mod matrix;
pub mod recommendation;
pub mod server;
pub mod similarity;
pub mod storage;
pub mod types;

// Re-export key types
pub use config::{
    DatasetConfig, EngineConfig, RecommendationConfig, ServerConfig, SimilarityConfig,
};
pub use dataset::{load_dataset, normalize_title, Dataset, DatasetCache, RawRating};
pub use engine::CinematchEngine;
pub use matrix::{build_item_user_matrix, ItemUserMatrix};
pub use recommendation::{
    recommend_items_for_user, similar_by_shared_genres, similar_items, top_by_genre,
};
pub use server::configure_routes;
pub use similarity::{
    build_similarity_matrix, pearson_similarity, PearsonSimilarity, SimilarityModel,
    SimilarityTable,
};
pub use storage::{RecommendationStore, Snapshot, StoreState, StoreStats};
pub use types::*;

#[cfg(test)]
mod tests;
