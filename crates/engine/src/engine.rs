//! Engine facade
//!
//! `CinematchEngine` ties the dataset handle to the rating store and exposes
//! the full query surface used by the HTTP layer and embedding callers.

use crate::config::EngineConfig;
use crate::dataset::{Dataset, DatasetCache};
use crate::recommendation;
use crate::similarity::PearsonSimilarity;
use crate::storage::{RecommendationStore, StoreStats};
use crate::types::{Genre, Rating, Recommendation, UserId};
use cinematch_core::{CinematchError, Result};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Cinematch engine instance
pub struct CinematchEngine {
    config: EngineConfig,
    dataset: DatasetCache,
    store: Arc<RecommendationStore>,
}

impl CinematchEngine {
    pub fn new(config: EngineConfig) -> Self {
        let model = PearsonSimilarity::from(&config.similarity);
        Self {
            dataset: DatasetCache::new(config.dataset.clone()),
            store: Arc::new(RecommendationStore::new(Arc::new(model))),
            config,
        }
    }

    pub fn with_default_config() -> Self {
        Self::new(EngineConfig::default())
    }

    /// Engine over an already parsed dataset
    pub fn with_dataset(config: EngineConfig, dataset: Dataset) -> Self {
        let mut engine = Self::new(config);
        engine.dataset = DatasetCache::preloaded(engine.config.dataset.clone(), dataset);
        engine
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<RecommendationStore> {
        &self.store
    }

    /// Loaded dataset, reading the source files on first use
    pub fn dataset(&self) -> Result<Arc<Dataset>> {
        self.dataset.get()
    }

    /// Load the dataset, fill the store and build the similarity table
    ///
    /// # Errors
    ///
    /// Fails if a source file is missing or unreadable, or if the catalog
    /// exceeds the configured size guard.
    #[instrument(skip(self))]
    pub fn bootstrap(&self) -> Result<StoreStats> {
        let dataset = self.dataset.get()?;
        self.store.replace_all(dataset.ratings_by_title());
        self.store.recompute_similarity()?;

        let stats = self.store.stats();
        info!(
            movies = dataset.movies().len(),
            items = stats.items,
            users = stats.users,
            ratings = stats.ratings,
            skipped_rows = dataset.skipped_rows(),
            "Engine bootstrapped"
        );
        Ok(stats)
    }

    /// Bootstrap for serving
    ///
    /// A non-fatal failure (the catalog size guard) is logged and the engine
    /// keeps its loaded ratings, so dataset-backed queries such as genre
    /// charts and title search still work.
    pub fn start(&self) -> Result<StoreStats> {
        match self.bootstrap() {
            Ok(stats) => Ok(stats),
            Err(e) if !e.is_fatal() => {
                let stats = self.store.stats();
                warn!(
                    error = %e,
                    items = stats.items,
                    "Similarity unavailable, serving dataset queries only"
                );
                Ok(stats)
            }
            Err(e) => Err(e),
        }
    }

    /// Re-read the source files and rebuild from scratch
    pub fn reload(&self) -> Result<StoreStats> {
        self.dataset.reset();
        self.bootstrap()
    }

    /// Merge ratings into the store (last write wins); similarity goes stale
    pub fn load_ratings(&self, ratings: impl IntoIterator<Item = Rating>) -> usize {
        self.store.load_bulk(ratings)
    }

    pub fn add_rating(&self, rating: Rating) {
        self.store.add_rating(rating);
    }

    /// Full similarity rebuild on the calling thread
    pub fn recompute_similarity(&self) -> Result<()> {
        self.store.recompute_similarity().map(|_| ())
    }

    /// Full similarity rebuild on tokio's blocking pool
    pub async fn spawn_recompute(&self) -> Result<()> {
        self.store
            .spawn_recompute()
            .await
            .map_err(|e| CinematchError::Internal(format!("similarity rebuild task failed: {e}")))?
    }

    pub fn similar_items(&self, item_id: &str, top_n: usize) -> Result<Vec<Recommendation>> {
        self.store.similar_items(item_id, top_n)
    }

    pub fn recommend_for_user(
        &self,
        user_id: UserId,
        k_neighbors: usize,
        top_n: usize,
    ) -> Result<Vec<Recommendation>> {
        self.store.recommend_for_user(user_id, k_neighbors, top_n)
    }

    pub fn top_by_genre(&self, genre: &str, top_n: usize) -> Result<Vec<Recommendation>> {
        let dataset = self.dataset.get()?;
        Ok(recommendation::top_by_genre(&dataset, genre, top_n))
    }

    pub fn similar_by_shared_genres(
        &self,
        item_id: &str,
        min_shared_genres: usize,
        top_n: usize,
    ) -> Result<Vec<Recommendation>> {
        let dataset = self.dataset.get()?;
        let matrix = self.store.matrix();
        Ok(recommendation::similar_by_shared_genres(
            &dataset,
            &matrix,
            item_id,
            min_shared_genres,
            top_n,
        ))
    }

    pub fn find_item_by_name(&self, query: &str) -> Result<Option<String>> {
        Ok(self.dataset.get()?.find_item_by_name(query))
    }

    pub fn display_title(&self, item_id: &str) -> Result<String> {
        Ok(self.dataset.get()?.display_title(item_id))
    }

    pub fn list_genres(&self) -> &'static [Genre] {
        Dataset::list_genres()
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }
}

impl std::fmt::Debug for CinematchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CinematchEngine")
            .field("dataset_loaded", &self.dataset.is_loaded())
            .field("store", &self.store)
            .finish()
    }
}
