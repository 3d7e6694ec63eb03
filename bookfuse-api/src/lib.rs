//! bookfuse-api library interface
//!
//! Read-only HTTP API over the catalog database the ingest pipeline
//! builds. Exposed as a library so integration tests can drive the
//! router without binding a port.

pub mod error;
pub mod routes;

pub use crate::error::{ApiError, ApiResult};

use axum::routing::get;
use axum::Router;
use sqlx::SqlitePool;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Catalog database connection pool
    pub db: SqlitePool,
}

impl AppState {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

/// Build the API router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::welcome))
        .route("/health", get(routes::health))
        .route("/books", get(routes::list_books))
        .route("/books/:row_id", get(routes::get_book))
        .route("/search/title", get(routes::search_title))
        .route("/search/author", get(routes::search_author))
        .route("/search/subjects", get(routes::search_subjects))
        .route("/search/description", get(routes::search_description))
        .route("/search/isbn", get(routes::search_isbn))
        .route("/search/all", get(routes::search_all))
        .with_state(state)
}
