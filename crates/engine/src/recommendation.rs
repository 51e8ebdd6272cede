//! Ranking queries over the rating matrix and similarity table
//!
//! Three independent modes:
//! - "more like this": an item's nearest neighbours in the similarity table
//! - personalized item-based CF: similarity-weighted average of the user's
//!   own ratings over the neighbours of every item they rated
//! - genre charts: movies of one genre ranked by average rating
//!
//! plus a genre-constrained "more like this" that correlates the anchor only
//! against movies sharing enough genres with it.
//!
//! All sorts are stable and descending, so equal scores keep item
//! first-appearance order. Missing data yields an empty list, never an error.

use crate::dataset::Dataset;
use crate::matrix::ItemUserMatrix;
use crate::similarity::{pearson_with_support, SimilarityTable, MIN_COMMON_RATERS};
use crate::types::{Genre, Recommendation, UserId};
use std::collections::{HashMap, HashSet};
use tracing::debug;

fn sort_descending(recs: &mut [Recommendation]) {
    recs.sort_by(|a, b| b.score.total_cmp(&a.score));
}

/// Top `top_n` neighbours of an item by similarity coefficient
///
/// Unknown items and items without neighbours return an empty list.
pub fn similar_items(table: &SimilarityTable, item_id: &str, top_n: usize) -> Vec<Recommendation> {
    table
        .neighbors(item_id)
        .take(top_n)
        .map(|(other, sim)| Recommendation::new(other, sim))
        .collect()
}

/// Accumulated contribution for one candidate item
struct Candidate<'a> {
    item_id: &'a str,
    score: f64,
    weight: f64,
}

/// Personalized item-based collaborative filtering
///
/// For every item the user rated, its `k_neighbors` most similar items are
/// considered. Neighbours the user already rated and neighbours with a
/// non-positive coefficient are skipped. Each remaining neighbour's
/// predicted rating is `sum(sim * rating) / sum(|sim|)` over all the rated
/// items that reached it.
pub fn recommend_items_for_user(
    user_id: UserId,
    matrix: &ItemUserMatrix,
    table: &SimilarityTable,
    k_neighbors: usize,
    top_n: usize,
) -> Vec<Recommendation> {
    let user_ratings = matrix.user_ratings(user_id);
    if user_ratings.is_empty() {
        debug!(user_id, "No ratings for user");
        return Vec::new();
    }

    let mut candidates: Vec<Candidate<'_>> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for (item, rating) in &user_ratings {
        for (other, sim) in table.neighbors(item).take(k_neighbors) {
            if matrix.has_rated(user_id, other) || sim <= 0.0 {
                continue;
            }
            let pos = *positions.entry(other).or_insert_with(|| {
                candidates.push(Candidate {
                    item_id: other,
                    score: 0.0,
                    weight: 0.0,
                });
                candidates.len() - 1
            });
            candidates[pos].score += sim * rating;
            candidates[pos].weight += sim.abs();
        }
    }

    let mut recs: Vec<Recommendation> = candidates
        .into_iter()
        .filter(|c| c.weight != 0.0)
        .map(|c| Recommendation::new(c.item_id, c.score / c.weight))
        .collect();

    sort_descending(&mut recs);
    recs.truncate(top_n);

    debug!(
        user_id,
        rated = user_ratings.len(),
        returned = recs.len(),
        "Generated personalized recommendations"
    );
    recs
}

/// Movies of one genre ranked by average rating
///
/// The genre name is matched case-insensitively against the fixed
/// vocabulary; an unknown genre returns an empty list. Unrated movies score
/// 0.0.
pub fn top_by_genre(dataset: &Dataset, genre: &str, top_n: usize) -> Vec<Recommendation> {
    let Some(genre) = Genre::from_name(genre) else {
        debug!(genre, "Unknown genre");
        return Vec::new();
    };

    let mut recs: Vec<Recommendation> = dataset
        .movies()
        .iter()
        .filter(|m| m.has_genre(genre) && !m.normalized_title.is_empty())
        .map(|m| {
            Recommendation::new(
                m.normalized_title.clone(),
                dataset.average_rating(m.movie_id).unwrap_or(0.0),
            )
        })
        .collect();

    sort_descending(&mut recs);
    recs.truncate(top_n);
    recs
}

/// "More like this" restricted to movies sharing genres with the anchor
///
/// Candidates share at least `min_shared_genres` genres with the anchor and
/// at least two raters with it; each is scored by its Pearson correlation
/// with the anchor, computed directly from the matrix.
pub fn similar_by_shared_genres(
    dataset: &Dataset,
    matrix: &ItemUserMatrix,
    item_id: &str,
    min_shared_genres: usize,
    top_n: usize,
) -> Vec<Recommendation> {
    let (Some(anchor), Some(anchor_ratings)) = (dataset.movie_by_title(item_id), matrix.get(item_id))
    else {
        return Vec::new();
    };

    let mut seen: HashSet<&str> = HashSet::new();
    let mut recs: Vec<Recommendation> = Vec::new();

    for movie in dataset.movies() {
        let title = movie.normalized_title.as_str();
        if title.is_empty() || title == item_id || !seen.insert(title) {
            continue;
        }
        if anchor.shared_genres(movie) < min_shared_genres {
            continue;
        }
        let Some(ratings) = matrix.get(title) else {
            continue;
        };
        let (sim, common) = pearson_with_support(anchor_ratings, ratings);
        if common >= MIN_COMMON_RATERS {
            recs.push(Recommendation::new(title, sim));
        }
    }

    sort_descending(&mut recs);
    recs.truncate(top_n);
    recs
}
