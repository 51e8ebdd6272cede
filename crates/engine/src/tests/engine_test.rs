//! Query surface tests against the fixture dataset

use super::fixtures;
use crate::storage::StoreState;

#[test]
fn test_bootstrap_fills_store() {
    let engine = fixtures::engine();
    let stats = engine.stats();
    assert_eq!(stats.state, StoreState::Ready);
    assert_eq!(stats.items, 6);
    assert_eq!(stats.users, 5);
    assert_eq!(stats.ratings, 21);
}

#[test]
fn test_similar_items_ranks_identical_raters_first() {
    let engine = fixtures::engine();
    let recs = engine.similar_items("toy story", 30).unwrap();

    assert_eq!(recs.len(), 5);
    assert_eq!(recs[0].item_id, "babe");
    assert!((recs[0].score - 1.0).abs() < 1e-9);
    assert!(recs.windows(2).all(|w| w[0].score >= w[1].score));
    assert!(recs.iter().all(|r| r.item_id != "toy story"));
}

#[test]
fn test_recommend_for_user() {
    let engine = fixtures::engine();
    let recs = engine.recommend_for_user(5, 50, 10).unwrap();

    let ids: Vec<&str> = recs.iter().map(|r| r.item_id.as_str()).collect();
    assert_eq!(ids, vec!["get shorty", "goldeneye"]);
    assert!((recs[0].score - 5.0).abs() < 1e-9);
    assert!((recs[1].score - 2.0).abs() < 1e-9);
}

#[test]
fn test_recommend_neighbor_budget_includes_rated_items() {
    // The nearest neighbours of "toy story" and "babe" are each other, so
    // with one neighbour per rated item only "copycat" contributes.
    let engine = fixtures::engine();
    let recs = engine.recommend_for_user(5, 1, 10).unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].item_id, "goldeneye");
}

#[test]
fn test_recommend_unknown_user() {
    let engine = fixtures::engine();
    assert!(engine.recommend_for_user(404, 50, 10).unwrap().is_empty());
}

#[test]
fn test_top_by_genre_breaks_ties_by_file_order() {
    let engine = fixtures::engine();
    let recs = engine.top_by_genre("Comedy", 10).unwrap();

    let ids: Vec<&str> = recs.iter().map(|r| r.item_id.as_str()).collect();
    assert_eq!(ids, vec!["toy story", "babe", "get shorty"]);
    assert!((recs[0].score - 3.75).abs() < 1e-9);
    assert!((recs[2].score - 10.0 / 3.0).abs() < 1e-9);
}

#[test]
fn test_top_by_genre_without_matches() {
    let engine = fixtures::engine();
    assert!(engine.top_by_genre("Western", 10).unwrap().is_empty());
    assert!(engine.top_by_genre("Space Opera", 10).unwrap().is_empty());
    assert_eq!(engine.top_by_genre("comedy", 1).unwrap().len(), 1);
}

#[test]
fn test_similar_by_shared_genres() {
    let engine = fixtures::engine();

    let strict = engine.similar_by_shared_genres("toy story", 2, 10).unwrap();
    assert_eq!(strict.len(), 1);
    assert_eq!(strict[0].item_id, "babe");

    let loose = engine.similar_by_shared_genres("toy story", 1, 10).unwrap();
    let ids: Vec<&str> = loose.iter().map(|r| r.item_id.as_str()).collect();
    assert_eq!(ids, vec!["babe", "get shorty"]);
    assert_eq!(loose[1].score, 0.0);

    assert!(engine
        .similar_by_shared_genres("unknown film", 1, 10)
        .unwrap()
        .is_empty());
}

#[test]
fn test_lookup_helpers() {
    let engine = fixtures::engine();
    assert_eq!(
        engine.find_item_by_name("four").unwrap(),
        Some("four rooms".to_string())
    );
    assert_eq!(engine.find_item_by_name("   ").unwrap(), None);
    assert_eq!(
        engine.display_title("get shorty").unwrap(),
        "Get Shorty (1995)"
    );
    assert_eq!(engine.list_genres().len(), 19);
}
