//! Item-item Pearson similarity
//!
//! `pearson_similarity` correlates two item rating vectors over their common
//! raters. `PearsonSimilarity` builds the full symmetric table by visiting
//! every unordered item pair once; the pair loop is quadratic in the item
//! count and runs on the rayon pool over sorted `(user, score)` vectors.
//!
//! The builder sits behind `SimilarityModel` so a different neighbourhood
//! method can be swapped in without touching the store or the queries.

use crate::config::SimilarityConfig;
use crate::matrix::ItemUserMatrix;
use crate::types::{ItemId, UserId};
use cinematch_core::{CinematchError, Result};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{info, warn};

/// Fewest common raters for which a correlation is defined
pub const MIN_COMMON_RATERS: usize = 2;

/// Pearson correlation of two rating vectors over their common raters
///
/// Returns 0.0 when fewer than two users rated both items or when either
/// side has zero variance over the common raters.
pub fn pearson_similarity(a: &HashMap<UserId, f64>, b: &HashMap<UserId, f64>) -> f64 {
    pearson_with_support(a, b).0
}

/// Pearson correlation together with the number of common raters
pub fn pearson_with_support(a: &HashMap<UserId, f64>, b: &HashMap<UserId, f64>) -> (f64, usize) {
    pearson_sorted(&sorted_vector(a), &sorted_vector(b))
}

/// Rating vector sorted by user id
fn sorted_vector(row: &HashMap<UserId, f64>) -> Vec<(UserId, f64)> {
    let mut vector: Vec<(UserId, f64)> = row.iter().map(|(&u, &s)| (u, s)).collect();
    vector.sort_unstable_by_key(|&(user, _)| user);
    vector
}

/// Visit `(a_score, b_score)` for every user present in both sorted vectors
fn for_each_common(a: &[(UserId, f64)], b: &[(UserId, f64)], mut f: impl FnMut(f64, f64)) {
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                f(a[i].1, b[j].1);
                i += 1;
                j += 1;
            }
        }
    }
}

/// Correlation and common-rater count for two sorted vectors
fn pearson_sorted(a: &[(UserId, f64)], b: &[(UserId, f64)]) -> (f64, usize) {
    let mut n = 0usize;
    let (mut sum_a, mut sum_b) = (0.0, 0.0);
    for_each_common(a, b, |x, y| {
        n += 1;
        sum_a += x;
        sum_b += y;
    });

    if n < MIN_COMMON_RATERS {
        return (0.0, n);
    }

    let mean_a = sum_a / n as f64;
    let mean_b = sum_b / n as f64;
    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for_each_common(a, b, |x, y| {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    });

    if var_a == 0.0 || var_b == 0.0 {
        return (0.0, n);
    }

    ((cov / (var_a * var_b).sqrt()).clamp(-1.0, 1.0), n)
}

/// Symmetric item-item similarity table
///
/// Each item's neighbours are kept sorted by coefficient, highest first;
/// equal coefficients keep item first-appearance order. There are no
/// self-entries and no entries for pairs below the common-rater minimum.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimilarityTable {
    items: Vec<ItemId>,
    index: HashMap<ItemId, usize>,
    neighbors: Vec<Vec<(usize, f64)>>,
}

impl SimilarityTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Coefficient for a pair, `None` when the pair has no entry
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let ia = *self.index.get(a)?;
        let ib = *self.index.get(b)?;
        self.neighbors[ia]
            .iter()
            .find(|(j, _)| *j == ib)
            .map(|&(_, sim)| sim)
    }

    /// Neighbours of an item, highest coefficient first
    pub fn neighbors<'a>(&'a self, item_id: &str) -> impl Iterator<Item = (&'a str, f64)> + 'a {
        let row: &'a [(usize, f64)] = match self.index.get(item_id) {
            Some(&idx) => &self.neighbors[idx],
            None => &[],
        };
        row.iter().map(move |&(j, sim)| (self.items[j].as_str(), sim))
    }

    pub fn neighbor_count(&self, item_id: &str) -> usize {
        self.index
            .get(item_id)
            .map(|&idx| self.neighbors[idx].len())
            .unwrap_or(0)
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Number of unordered pairs with an entry
    pub fn pair_count(&self) -> usize {
        self.neighbors.iter().map(Vec::len).sum::<usize>() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.iter().all(Vec::is_empty)
    }

    pub fn items(&self) -> &[ItemId] {
        &self.items
    }
}

/// Builds a similarity table from a rating matrix
pub trait SimilarityModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Full rebuild from the current matrix
    fn build(&self, matrix: &ItemUserMatrix) -> Result<SimilarityTable>;
}

/// Exhaustive pairwise Pearson correlation
#[derive(Debug, Clone)]
pub struct PearsonSimilarity {
    /// Pairs with fewer common raters get no entry
    pub min_common_raters: usize,
    /// Catalog size guard for the quadratic loop
    pub max_items: Option<usize>,
    /// Run the pair loop on the rayon pool
    pub parallel: bool,
}

impl Default for PearsonSimilarity {
    fn default() -> Self {
        Self {
            min_common_raters: MIN_COMMON_RATERS,
            max_items: None,
            parallel: true,
        }
    }
}

impl From<&SimilarityConfig> for PearsonSimilarity {
    fn from(config: &SimilarityConfig) -> Self {
        Self {
            min_common_raters: config.min_common_raters.max(MIN_COMMON_RATERS),
            max_items: config.item_limit(),
            parallel: config.parallel,
        }
    }
}

impl SimilarityModel for PearsonSimilarity {
    fn name(&self) -> &'static str {
        "pearson"
    }

    fn build(&self, matrix: &ItemUserMatrix) -> Result<SimilarityTable> {
        let n = matrix.item_count();
        if let Some(limit) = self.max_items {
            if n > limit {
                warn!(items = n, limit, "Refusing quadratic similarity rebuild");
                return Err(CinematchError::CatalogTooLarge { items: n, limit });
            }
        }

        let start = Instant::now();
        let vectors: Vec<Vec<(UserId, f64)>> =
            matrix.rows().map(|(_, row)| sorted_vector(row)).collect();
        let min_common = self.min_common_raters.max(MIN_COMMON_RATERS);

        // Upper triangle only: row i holds pairs (i, j) with j > i.
        let upper = |i: usize| -> Vec<(usize, f64)> {
            ((i + 1)..n)
                .filter_map(|j| {
                    let (sim, common) = pearson_sorted(&vectors[i], &vectors[j]);
                    (common >= min_common).then_some((j, sim))
                })
                .collect()
        };
        let upper_rows: Vec<Vec<(usize, f64)>> = if self.parallel {
            (0..n).into_par_iter().map(upper).collect()
        } else {
            (0..n).map(upper).collect()
        };

        // Mirroring in ascending i leaves every row in ascending index order,
        // so the stable sort below breaks ties by first appearance.
        let mut neighbors: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        for (i, row) in upper_rows.into_iter().enumerate() {
            for (j, sim) in row {
                neighbors[i].push((j, sim));
                neighbors[j].push((i, sim));
            }
        }
        neighbors
            .par_iter_mut()
            .for_each(|row| row.sort_by(|a, b| b.1.total_cmp(&a.1)));

        let items = matrix.items().to_vec();
        let index = items
            .iter()
            .enumerate()
            .map(|(idx, item)| (item.clone(), idx))
            .collect();
        let table = SimilarityTable {
            items,
            index,
            neighbors,
        };

        info!(
            model = self.name(),
            items = n,
            pairs = table.pair_count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Similarity table rebuilt"
        );

        Ok(table)
    }
}

/// Build the full table with default Pearson settings and no size guard
pub fn build_similarity_matrix(matrix: &ItemUserMatrix) -> SimilarityTable {
    PearsonSimilarity::default()
        .build(matrix)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::build_item_user_matrix;
    use crate::types::Rating;

    fn vector(pairs: &[(UserId, f64)]) -> HashMap<UserId, f64> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_identical_vectors_correlate_perfectly() {
        let a = vector(&[(1, 5.0), (2, 3.0), (3, 1.0)]);
        assert!((pearson_similarity(&a, &a) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fewer_than_two_common_raters() {
        let a = vector(&[(1, 5.0), (2, 3.0)]);
        let b = vector(&[(2, 4.0), (3, 1.0)]);
        assert_eq!(pearson_similarity(&a, &b), 0.0);
        assert_eq!(pearson_similarity(&a, &HashMap::new()), 0.0);
    }

    #[test]
    fn test_zero_variance_is_zero() {
        let a = vector(&[(1, 4.0), (2, 4.0), (3, 4.0)]);
        let b = vector(&[(1, 1.0), (2, 3.0), (3, 5.0)]);
        assert_eq!(pearson_similarity(&a, &b), 0.0);
        assert_eq!(pearson_similarity(&b, &a), 0.0);
    }

    #[test]
    fn test_shift_invariance() {
        let a = vector(&[(1, 5.0), (2, 2.0), (3, 4.0), (4, 1.0)]);
        let b = vector(&[(1, 4.0), (2, 1.0), (3, 5.0), (4, 2.0)]);
        let shifted: HashMap<UserId, f64> = b.iter().map(|(&u, &s)| (u, s + 3.0)).collect();
        assert!((pearson_similarity(&a, &b) - pearson_similarity(&a, &shifted)).abs() < 1e-12);
    }

    #[test]
    fn test_negation_flips_sign() {
        let a = vector(&[(1, 5.0), (2, 2.0), (3, 4.0), (4, 1.0)]);
        let b = vector(&[(1, 4.0), (2, 1.0), (3, 5.0), (4, 2.0)]);
        let negated: HashMap<UserId, f64> = b.iter().map(|(&u, &s)| (u, -s)).collect();
        let sim = pearson_similarity(&a, &b);
        assert!(sim > 0.0);
        assert!((pearson_similarity(&a, &negated) + sim).abs() < 1e-12);
    }

    #[test]
    fn test_only_common_raters_count() {
        // User 9 rated only `a`; it must not influence the coefficient.
        let a = vector(&[(1, 1.0), (2, 2.0), (3, 3.0), (9, 100.0)]);
        let b = vector(&[(1, 2.0), (2, 4.0), (3, 6.0)]);
        assert!((pearson_similarity(&a, &b) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_perfectly_correlated_scenario() {
        let ratings = vec![
            Rating::new(1, "a", 5.0),
            Rating::new(1, "b", 4.0),
            Rating::new(2, "a", 5.0),
            Rating::new(2, "b", 4.0),
            Rating::new(3, "a", 1.0),
            Rating::new(3, "b", 1.0),
        ];
        let matrix = build_item_user_matrix(&ratings);
        let sim = pearson_similarity(matrix.get("a").unwrap(), matrix.get("b").unwrap());
        assert!((sim - 1.0).abs() < 1e-9);
    }

    fn sample_matrix() -> ItemUserMatrix {
        build_item_user_matrix(&[
            Rating::new(1, "a", 5.0),
            Rating::new(2, "a", 3.0),
            Rating::new(3, "a", 1.0),
            Rating::new(1, "b", 4.0),
            Rating::new(2, "b", 3.0),
            Rating::new(3, "b", 2.0),
            Rating::new(1, "c", 1.0),
            Rating::new(2, "c", 3.0),
            Rating::new(3, "c", 5.0),
            Rating::new(4, "d", 2.0),
            Rating::new(1, "d", 4.0),
        ])
    }

    #[test]
    fn test_table_is_symmetric_without_self_entries() {
        let matrix = sample_matrix();
        let table = build_similarity_matrix(&matrix);
        for a in matrix.items() {
            assert_eq!(table.get(a, a), None);
            for (b, sim) in table.neighbors(a) {
                assert_ne!(a.as_str(), b);
                assert_eq!(table.get(b, a), Some(sim));
            }
        }
    }

    #[test]
    fn test_pairs_below_common_minimum_are_absent() {
        let table = build_similarity_matrix(&sample_matrix());
        // `d` shares only user 1 with the other items.
        assert_eq!(table.neighbor_count("d"), 0);
        assert_eq!(table.get("a", "d"), None);
        assert_eq!(table.pair_count(), 3);
        assert!((table.get("a", "c").unwrap() + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_neighbors_sorted_descending() {
        let table = build_similarity_matrix(&sample_matrix());
        let sims: Vec<f64> = table.neighbors("a").map(|(_, s)| s).collect();
        assert!(sims.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(table.neighbors("a").next().map(|(b, _)| b), Some("b"));
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let matrix = sample_matrix();
        let sequential = PearsonSimilarity {
            parallel: false,
            ..Default::default()
        }
        .build(&matrix)
        .unwrap();
        let parallel = PearsonSimilarity::default().build(&matrix).unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_size_guard() {
        let model = PearsonSimilarity {
            max_items: Some(2),
            ..Default::default()
        };
        let err = model.build(&sample_matrix()).unwrap_err();
        assert!(matches!(
            err,
            CinematchError::CatalogTooLarge { items: 4, limit: 2 }
        ));
    }

    #[test]
    fn test_unknown_item_has_no_neighbors() {
        let table = build_similarity_matrix(&sample_matrix());
        assert_eq!(table.neighbors("x").count(), 0);
        assert!(SimilarityTable::empty().is_empty());
    }
}
