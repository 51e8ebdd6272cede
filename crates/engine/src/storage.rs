//! In-memory rating store and similarity lifecycle
//!
//! The store is the single owner of the item-user matrix and the similarity
//! table. It moves through three states:
//!
//! - `Empty`: no ratings
//! - `Loaded`: ratings present, similarity stale
//! - `Ready`: similarity consistent with the current matrix
//!
//! Every mutation drops the similarity table. Queries rebuild it lazily, so
//! answers always reflect the latest ratings.
//!
//! Both structures are shared as `Arc` snapshots. Writers mutate the matrix
//! copy-on-write under the state lock. Rebuilds read an immutable matrix
//! snapshot outside the lock, are serialised by a dedicated mutex, and are
//! installed only if no write happened in the meantime. A reader therefore
//! always sees a matching `(matrix, similarity)` pair, never a half-built
//! table.

use crate::matrix::ItemUserMatrix;
use crate::recommendation;
use crate::similarity::{PearsonSimilarity, SimilarityModel, SimilarityTable};
use crate::types::{Rating, Recommendation, UserId};
use cinematch_core::Result;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Lifecycle state of the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreState {
    Empty,
    Loaded,
    Ready,
}

/// Consistent view of the matrix and the table built from it
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub matrix: Arc<ItemUserMatrix>,
    pub similarity: Arc<SimilarityTable>,
    /// Matrix generation the table was built from
    pub generation: u64,
}

/// Store statistics
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub state: StoreState,
    pub items: usize,
    pub users: usize,
    pub ratings: usize,
    /// Pairs in the current table, `None` while stale
    pub similarity_pairs: Option<usize>,
    pub generation: u64,
}

struct Inner {
    matrix: Arc<ItemUserMatrix>,
    similarity: Option<Arc<SimilarityTable>>,
    /// Bumped on every matrix mutation
    generation: u64,
}

impl Inner {
    fn invalidate(&mut self) {
        self.similarity = None;
        self.generation += 1;
    }

    fn state(&self) -> StoreState {
        if self.matrix.is_empty() {
            StoreState::Empty
        } else if self.similarity.is_some() {
            StoreState::Ready
        } else {
            StoreState::Loaded
        }
    }
}

/// Ratings plus cached item similarity
pub struct RecommendationStore {
    inner: RwLock<Inner>,
    rebuild_lock: Mutex<()>,
    model: Arc<dyn SimilarityModel>,
}

impl RecommendationStore {
    pub fn new(model: Arc<dyn SimilarityModel>) -> Self {
        Self {
            inner: RwLock::new(Inner {
                matrix: Arc::new(ItemUserMatrix::new()),
                similarity: None,
                generation: 0,
            }),
            rebuild_lock: Mutex::new(()),
            model,
        }
    }

    /// Store backed by exhaustive Pearson similarity
    pub fn with_default_model() -> Self {
        Self::new(Arc::new(PearsonSimilarity::default()))
    }

    pub fn state(&self) -> StoreState {
        self.inner.read().state()
    }

    /// Current matrix snapshot
    pub fn matrix(&self) -> Arc<ItemUserMatrix> {
        Arc::clone(&self.inner.read().matrix)
    }

    /// Record one rating (last write wins) and mark similarity stale
    pub fn add_rating(&self, rating: Rating) {
        let mut inner = self.inner.write();
        Arc::make_mut(&mut inner.matrix).insert_rating(&rating);
        inner.invalidate();
        debug!(
            user_id = rating.user_id,
            item_id = %rating.item_id,
            generation = inner.generation,
            "Rating added"
        );
    }

    /// Merge a batch of ratings into the matrix and mark similarity stale
    ///
    /// Returns the number of records applied.
    pub fn load_bulk(&self, ratings: impl IntoIterator<Item = Rating>) -> usize {
        let mut inner = self.inner.write();
        let matrix = Arc::make_mut(&mut inner.matrix);
        let mut applied = 0;
        for rating in ratings {
            matrix.insert_rating(&rating);
            applied += 1;
        }
        inner.invalidate();
        info!(
            applied,
            items = inner.matrix.item_count(),
            ratings = inner.matrix.rating_count(),
            "Bulk ratings loaded"
        );
        applied
    }

    /// Replace every rating with a new set
    pub fn replace_all(&self, ratings: impl IntoIterator<Item = Rating>) -> usize {
        let mut matrix = ItemUserMatrix::new();
        let mut applied = 0;
        for rating in ratings {
            matrix.insert_rating(&rating);
            applied += 1;
        }
        let mut inner = self.inner.write();
        inner.matrix = Arc::new(matrix);
        inner.invalidate();
        info!(applied, "Ratings replaced");
        applied
    }

    /// Drop all ratings
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.matrix = Arc::new(ItemUserMatrix::new());
        inner.invalidate();
    }

    /// Full similarity rebuild from the current matrix
    ///
    /// # Errors
    ///
    /// Propagates the model's error, e.g. `CatalogTooLarge`.
    #[instrument(skip(self), fields(model = self.model.name()))]
    pub fn recompute_similarity(&self) -> Result<Snapshot> {
        self.rebuild(true)
    }

    /// Matrix and similarity, rebuilding first if the table is stale
    pub fn snapshot(&self) -> Result<Snapshot> {
        {
            let inner = self.inner.read();
            if let Some(similarity) = &inner.similarity {
                return Ok(Snapshot {
                    matrix: Arc::clone(&inner.matrix),
                    similarity: Arc::clone(similarity),
                    generation: inner.generation,
                });
            }
        }
        self.rebuild(false)
    }

    fn rebuild(&self, force: bool) -> Result<Snapshot> {
        let _rebuild = self.rebuild_lock.lock();

        let (matrix, generation) = {
            let inner = self.inner.read();
            if !force {
                // Another caller may have finished a rebuild while we waited.
                if let Some(similarity) = &inner.similarity {
                    return Ok(Snapshot {
                        matrix: Arc::clone(&inner.matrix),
                        similarity: Arc::clone(similarity),
                        generation: inner.generation,
                    });
                }
            }
            (Arc::clone(&inner.matrix), inner.generation)
        };

        let similarity = Arc::new(self.model.build(&matrix)?);

        let mut inner = self.inner.write();
        if inner.generation == generation {
            inner.similarity = Some(Arc::clone(&similarity));
        } else {
            debug!(
                built_for = generation,
                current = inner.generation,
                "Ratings changed during rebuild, table not installed"
            );
        }

        Ok(Snapshot {
            matrix,
            similarity,
            generation,
        })
    }

    /// Run a full rebuild on tokio's blocking pool
    ///
    /// Queries issued meanwhile wait for the rebuild instead of observing a
    /// partial table.
    pub fn spawn_recompute(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let store = Arc::clone(self);
        tokio::task::spawn_blocking(move || store.recompute_similarity().map(|_| ()))
    }

    /// Top `top_n` neighbours of an item
    pub fn similar_items(&self, item_id: &str, top_n: usize) -> Result<Vec<Recommendation>> {
        let snapshot = self.snapshot()?;
        Ok(recommendation::similar_items(
            &snapshot.similarity,
            item_id,
            top_n,
        ))
    }

    /// Personalized item-based CF for one user
    pub fn recommend_for_user(
        &self,
        user_id: UserId,
        k_neighbors: usize,
        top_n: usize,
    ) -> Result<Vec<Recommendation>> {
        if self.matrix().user_ratings(user_id).is_empty() {
            return Ok(Vec::new());
        }
        let snapshot = self.snapshot()?;
        Ok(recommendation::recommend_items_for_user(
            user_id,
            &snapshot.matrix,
            &snapshot.similarity,
            k_neighbors,
            top_n,
        ))
    }

    pub fn stats(&self) -> StoreStats {
        let inner = self.inner.read();
        StoreStats {
            state: inner.state(),
            items: inner.matrix.item_count(),
            users: inner.matrix.user_count(),
            ratings: inner.matrix.rating_count(),
            similarity_pairs: inner.similarity.as_ref().map(|s| s.pair_count()),
            generation: inner.generation,
        }
    }
}

impl Default for RecommendationStore {
    fn default() -> Self {
        Self::with_default_model()
    }
}

impl std::fmt::Debug for RecommendationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecommendationStore")
            .field("model", &self.model.name())
            .field("stats", &self.stats())
            .finish()
    }
}
