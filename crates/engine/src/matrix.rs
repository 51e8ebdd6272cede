//! Sparse item-user rating matrix
//!
//! Rows are keyed by item (normalized title), columns by user. An absent
//! entry means "unrated", never an implicit zero. Items keep their
//! first-appearance order, which is also the tie-break order for every
//! ranked query.

use crate::types::{ItemId, Rating, UserId};
use std::collections::{HashMap, HashSet};

/// item -> (user -> score)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemUserMatrix {
    /// Item keys in first-appearance order
    items: Vec<ItemId>,
    /// Item key to row index
    item_index: HashMap<ItemId, usize>,
    /// Per-item ratings, parallel to `items`
    rows: Vec<HashMap<UserId, f64>>,
    /// Number of (item, user) entries
    rating_count: usize,
}

impl ItemUserMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `matrix[item][user] = score`, returning the overwritten score
    pub fn insert(&mut self, item_id: &str, user_id: UserId, score: f64) -> Option<f64> {
        let idx = match self.item_index.get(item_id) {
            Some(&idx) => idx,
            None => {
                let idx = self.items.len();
                self.items.push(item_id.to_string());
                self.item_index.insert(item_id.to_string(), idx);
                self.rows.push(HashMap::new());
                idx
            }
        };

        let previous = self.rows[idx].insert(user_id, score);
        if previous.is_none() {
            self.rating_count += 1;
        }
        previous
    }

    pub fn insert_rating(&mut self, rating: &Rating) -> Option<f64> {
        self.insert(&rating.item_id, rating.user_id, rating.score)
    }

    /// Rating vector for an item
    pub fn get(&self, item_id: &str) -> Option<&HashMap<UserId, f64>> {
        self.item_index.get(item_id).map(|&idx| &self.rows[idx])
    }

    pub fn score(&self, item_id: &str, user_id: UserId) -> Option<f64> {
        self.get(item_id).and_then(|row| row.get(&user_id).copied())
    }

    pub fn has_rated(&self, user_id: UserId, item_id: &str) -> bool {
        self.score(item_id, user_id).is_some()
    }

    pub fn contains_item(&self, item_id: &str) -> bool {
        self.item_index.contains_key(item_id)
    }

    pub fn index_of(&self, item_id: &str) -> Option<usize> {
        self.item_index.get(item_id).copied()
    }

    /// Item keys in first-appearance order
    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    /// `(item, ratings)` rows in first-appearance order
    pub fn rows(&self) -> impl Iterator<Item = (&str, &HashMap<UserId, f64>)> {
        self.items.iter().map(String::as_str).zip(self.rows.iter())
    }

    /// Everything one user rated, in item order
    pub fn user_ratings(&self, user_id: UserId) -> Vec<(&str, f64)> {
        self.rows()
            .filter_map(|(item, row)| row.get(&user_id).map(|&score| (item, score)))
            .collect()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn rating_count(&self) -> usize {
        self.rating_count
    }

    pub fn user_count(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|row| row.keys())
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.item_index.clear();
        self.rows.clear();
        self.rating_count = 0;
    }
}

/// Build the matrix from a full rating set (last write wins per pair)
pub fn build_item_user_matrix<'a>(ratings: impl IntoIterator<Item = &'a Rating>) -> ItemUserMatrix {
    let mut matrix = ItemUserMatrix::new();
    for rating in ratings {
        matrix.insert_rating(rating);
    }
    tracing::debug!(
        items = matrix.item_count(),
        ratings = matrix.rating_count(),
        "Built item-user matrix"
    );
    matrix
}
