pub mod envelope;
pub mod error;
pub mod extract;
pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::db::Repository;

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub api_key: Option<String>,
    pub require_api_key: bool,
}

impl AppState {
    pub fn new(repo: Repository, config: &ServerConfig) -> Self {
        Self {
            repo: Arc::new(repo),
            api_key: config.api_key.clone(),
            require_api_key: config.requires_api_key(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/healthz", get(handlers::healthz))
        .route(
            "/api/news",
            get(handlers::list_news).post(handlers::ingest_news),
        )
        .route("/api/news/bulk", post(handlers::ingest_news_bulk))
        .route("/api/news/{id}", get(handlers::get_news))
        .route("/api/categories", get(handlers::list_categories))
        .route("/api/agencies", get(handlers::list_agencies))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}
