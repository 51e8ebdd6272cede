//! HTTP query surface
//!
//! Serves the engine's call surface as JSON under `/api/v1`. Anything that may
//! read the dataset files, copy the matrix or rebuild similarity runs on
//! actix's blocking pool.

use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::engine::CinematchEngine;
use crate::types::{Rating, Recommendation, UserId};
use cinematch_core::Result;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    service: String,
    version: String,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// One ranked item with its display title
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedItem {
    pub item_id: String,
    pub title: String,
    pub score: f64,
}

/// Search hit
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub item_id: String,
    pub title: String,
}

/// Ratings accepted by `POST /ratings`
#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub accepted: usize,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct GenreMatchQuery {
    pub min_shared: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub k: Option<usize>,
    pub limit: Option<usize>,
}

fn internal_error(context: &str, err: impl std::fmt::Display) -> HttpResponse {
    error!(error = %err, "{}", context);
    HttpResponse::InternalServerError().json(ErrorResponse {
        error: format!("{}: {}", context, err),
    })
}

fn with_titles(engine: &CinematchEngine, recs: Vec<Recommendation>) -> Vec<RankedItem> {
    let dataset = engine.dataset().ok();
    recs.into_iter()
        .map(|rec| RankedItem {
            title: dataset
                .as_ref()
                .map(|d| d.display_title(&rec.item_id))
                .unwrap_or_else(|| rec.item_id.clone()),
            item_id: rec.item_id,
            score: rec.score,
        })
        .collect()
}

/// Run a query on the blocking pool and render it as a ranked list
async fn ranked<F>(engine: web::Data<CinematchEngine>, context: &str, query: F) -> HttpResponse
where
    F: FnOnce(&CinematchEngine) -> Result<Vec<Recommendation>> + Send + 'static,
{
    match web::block(move || query(&engine).map(|recs| with_titles(&engine, recs))).await {
        Ok(Ok(items)) => HttpResponse::Ok().json(items),
        Ok(Err(e)) => internal_error(context, e),
        Err(e) => internal_error(context, e),
    }
}

/// Health check endpoint
async fn health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        service: "cinematch-engine".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /api/v1/items/search?q= - Resolve free text to an item key
async fn search_items(
    engine: web::Data<CinematchEngine>,
    params: web::Query<SearchQuery>,
) -> impl Responder {
    let query = params.into_inner().q;
    debug!(query = %query, "Searching items");

    let needle = query.clone();
    let lookup = web::block(move || -> Result<Option<SearchResponse>> {
        let Some(item_id) = engine.find_item_by_name(&needle)? else {
            return Ok(None);
        };
        let title = engine.display_title(&item_id)?;
        Ok(Some(SearchResponse { item_id, title }))
    })
    .await;

    match lookup {
        Ok(Ok(Some(hit))) => HttpResponse::Ok().json(hit),
        Ok(Ok(None)) => HttpResponse::NotFound().json(ErrorResponse {
            error: format!("No item matches '{}'", query),
        }),
        Ok(Err(e)) => internal_error("Failed to search items", e),
        Err(e) => internal_error("Failed to search items", e),
    }
}

/// GET /api/v1/items/{id}/similar - "More like this"
async fn similar_items(
    engine: web::Data<CinematchEngine>,
    path: web::Path<String>,
    params: web::Query<LimitQuery>,
) -> impl Responder {
    let item_id = path.into_inner();
    let limit = params
        .limit
        .unwrap_or(engine.config().recommendation.similar_top_n);
    ranked(engine, "Failed to get similar items", move |e| {
        e.similar_items(&item_id, limit)
    })
    .await
}

/// GET /api/v1/items/{id}/similar-by-genre - "More like this" within shared genres
async fn similar_by_genre(
    engine: web::Data<CinematchEngine>,
    path: web::Path<String>,
    params: web::Query<GenreMatchQuery>,
) -> impl Responder {
    let item_id = path.into_inner();
    let defaults = &engine.config().recommendation;
    let min_shared = params.min_shared.unwrap_or(defaults.min_shared_genres);
    let limit = params.limit.unwrap_or(defaults.similar_top_n);
    ranked(engine, "Failed to get genre matches", move |e| {
        e.similar_by_shared_genres(&item_id, min_shared, limit)
    })
    .await
}

/// GET /api/v1/users/{id}/recommendations - Personalized recommendations
async fn user_recommendations(
    engine: web::Data<CinematchEngine>,
    path: web::Path<UserId>,
    params: web::Query<UserQuery>,
) -> impl Responder {
    let user_id = path.into_inner();
    let defaults = &engine.config().recommendation;
    let k = params.k.unwrap_or(defaults.k_neighbors);
    let limit = params.limit.unwrap_or(defaults.top_n);
    ranked(engine, "Failed to get recommendations", move |e| {
        e.recommend_for_user(user_id, k, limit)
    })
    .await
}

/// POST /api/v1/ratings - Merge ratings into the store
async fn ingest_ratings(
    engine: web::Data<CinematchEngine>,
    body: web::Json<Vec<Rating>>,
) -> impl Responder {
    let ratings = body.into_inner();
    match web::block(move || engine.load_ratings(ratings)).await {
        Ok(accepted) => {
            info!(accepted, "Ratings ingested");
            HttpResponse::Accepted().json(IngestResponse { accepted })
        }
        Err(e) => internal_error("Failed to ingest ratings", e),
    }
}

/// GET /api/v1/genres - Genre vocabulary
async fn list_genres(engine: web::Data<CinematchEngine>) -> impl Responder {
    let names: Vec<&str> = engine.list_genres().iter().map(|g| g.name()).collect();
    HttpResponse::Ok().json(names)
}

/// GET /api/v1/genres/{genre}/top - Genre chart by average rating
async fn top_by_genre(
    engine: web::Data<CinematchEngine>,
    path: web::Path<String>,
    params: web::Query<LimitQuery>,
) -> impl Responder {
    let genre = path.into_inner();
    let limit = params.limit.unwrap_or(engine.config().recommendation.top_n);
    ranked(engine, "Failed to get genre chart", move |e| {
        e.top_by_genre(&genre, limit)
    })
    .await
}

/// GET /api/v1/stats - Store statistics
async fn stats(engine: web::Data<CinematchEngine>) -> impl Responder {
    HttpResponse::Ok().json(engine.stats())
}

/// Configure application routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(health))
            // Item routes
            .route("/items/search", web::get().to(search_items))
            .route("/items/{id}/similar", web::get().to(similar_items))
            .route(
                "/items/{id}/similar-by-genre",
                web::get().to(similar_by_genre),
            )
            // User routes
            .route(
                "/users/{id}/recommendations",
                web::get().to(user_recommendations),
            )
            .route("/ratings", web::post().to(ingest_ratings))
            // Genre routes
            .route("/genres", web::get().to(list_genres))
            .route("/genres/{genre}/top", web::get().to(top_by_genre))
            .route("/stats", web::get().to(stats)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_health_endpoint() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(fixtures::engine()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/health").to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
    }

    #[actix_web::test]
    async fn test_similar_items_endpoint() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(fixtures::engine()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/v1/items/toy%20story/similar?limit=1")
            .to_request();
        let items: Vec<RankedItem> = test::call_and_read_body_json(&app, req).await;

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].item_id, "babe");
        assert_eq!(items[0].title, "Babe (1995)");
        assert!((items[0].score - 1.0).abs() < 1e-9);
    }

    #[actix_web::test]
    async fn test_unknown_item_is_empty_list() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(fixtures::engine()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/v1/items/nothing/similar")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        let items: Vec<RankedItem> = test::read_body_json(resp).await;
        assert!(items.is_empty());
    }

    #[actix_web::test]
    async fn test_search_endpoint() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(fixtures::engine()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/v1/items/search?q=Golden")
            .to_request();
        let hit: SearchResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(hit.item_id, "goldeneye");
        assert_eq!(hit.title, "Goldeneye (1995)");

        let req = test::TestRequest::get()
            .uri("/api/v1/items/search?q=zzz")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
    }

    #[actix_web::test]
    async fn test_user_recommendations_endpoint() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(fixtures::engine()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/v1/users/5/recommendations?limit=5")
            .to_request();
        let items: Vec<RankedItem> = test::call_and_read_body_json(&app, req).await;
        let ids: Vec<&str> = items.iter().map(|i| i.item_id.as_str()).collect();
        assert_eq!(ids, vec!["get shorty", "goldeneye"]);
    }

    #[actix_web::test]
    async fn test_ingest_then_query() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(fixtures::engine()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/ratings")
            .set_json(vec![Rating::new(42, "toy story", 5.0)])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 202);

        let req = test::TestRequest::get().uri("/api/v1/stats").to_request();
        let stats: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(stats["state"], "loaded");
        assert_eq!(stats["users"], 6);
    }

    #[actix_web::test]
    async fn test_genre_routes() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(fixtures::engine()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/genres").to_request();
        let genres: Vec<String> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(genres.len(), 19);
        assert_eq!(genres[0], "unknown");

        let req = test::TestRequest::get()
            .uri("/api/v1/genres/comedy/top?limit=2")
            .to_request();
        let items: Vec<RankedItem> = test::call_and_read_body_json(&app, req).await;
        let ids: Vec<&str> = items.iter().map(|i| i.item_id.as_str()).collect();
        assert_eq!(ids, vec!["toy story", "babe"]);
    }
}
