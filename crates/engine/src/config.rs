use cinematch_core::{layered_source, CinematchError, ConfigLoader, LogConfig, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Cinematch engine configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Dataset source files
    pub dataset: DatasetConfig,

    /// Similarity build configuration
    pub similarity: SimilarityConfig,

    /// Query defaults
    pub recommendation: RecommendationConfig,

    /// HTTP server configuration
    pub server: ServerConfig,

    /// Logging configuration
    pub logging: LogConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Tab-separated ratings: user_id, item_id, rating, timestamp
    pub ratings_path: PathBuf,

    /// Pipe-separated movie metadata with 19 genre flags
    pub items_path: PathBuf,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            ratings_path: PathBuf::from("data/u.data"),
            items_path: PathBuf::from("data/u.item"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Minimum common raters for a pair to get a table entry (>= 2)
    pub min_common_raters: usize,

    /// Refuse to rebuild above this many items (0 disables the guard)
    pub max_items: usize,

    /// Run the pair loop on the rayon pool
    pub parallel: bool,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            min_common_raters: 2,
            max_items: 5000,
            parallel: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RecommendationConfig {
    /// Neighbours considered per rated item (default: 50)
    pub k_neighbors: usize,

    /// Default result size for personalized and genre queries
    pub top_n: usize,

    /// Default result size for "more like this" queries
    pub similar_top_n: usize,

    /// Genres an item must share with the anchor in genre-constrained mode
    pub min_shared_genres: usize,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            k_neighbors: 50,
            top_n: 10,
            similar_top_n: 30,
            min_shared_genres: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host
    pub host: String,

    /// Server port (default: 8083)
    pub port: u16,

    /// Worker threads
    pub workers: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8083,
            workers: None,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl SimilarityConfig {
    /// Catalog size limit, `None` when the guard is disabled
    pub fn item_limit(&self) -> Option<usize> {
        (self.max_items > 0).then_some(self.max_items)
    }
}

impl ConfigLoader for EngineConfig {
    /// Load from `config/cinematch.*` and `CINEMATCH__*` environment variables
    fn load() -> Result<Self> {
        let settings = layered_source("config/cinematch", "CINEMATCH")?;
        let config: EngineConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.similarity.min_common_raters < 2 {
            return Err(CinematchError::config_key(
                format!(
                    "min_common_raters must be at least 2, got {}",
                    self.similarity.min_common_raters
                ),
                "similarity.min_common_raters",
            ));
        }

        if self.recommendation.k_neighbors == 0 {
            return Err(CinematchError::config_key(
                "k_neighbors must be greater than 0",
                "recommendation.k_neighbors",
            ));
        }

        if self.recommendation.top_n == 0 || self.recommendation.similar_top_n == 0 {
            return Err(CinematchError::config_key(
                "top_n and similar_top_n must be greater than 0",
                "recommendation.top_n",
            ));
        }

        if self.server.port == 0 {
            return Err(CinematchError::config_key(
                "port must be greater than 0",
                "server.port",
            ));
        }

        Ok(())
    }
}
