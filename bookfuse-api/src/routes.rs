//! Read-only catalog routes
//!
//! Serves the `books` table built by the ingest pipeline. Every search
//! route shares the same row shape and limit handling; text searches
//! are case-insensitive substring matches, ISBN search is exact.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::FromRow;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Maximum rows any route will return
const MAX_LIMIT: i64 = 5000;
const DEFAULT_LIMIT: i64 = 100;

/// One catalog row, as stored
#[derive(Debug, Serialize, FromRow)]
pub struct BookRow {
    pub row_id: i64,
    pub isbn: Option<String>,
    pub title: String,
    pub author: Option<String>,
    pub year: Option<i64>,
    pub publisher: Option<String>,
    pub description: Option<String>,
    pub subjects: Option<String>,
    pub description_source: Option<String>,
    pub subjects_source: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
    pub limit: Option<i64>,
}

fn effective_limit(limit: Option<i64>) -> ApiResult<i64> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT);
    if limit < 1 || limit > MAX_LIMIT {
        return Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {}",
            MAX_LIMIT
        )));
    }
    Ok(limit)
}

/// GET / - welcome
pub async fn welcome() -> Json<Value> {
    Json(json!({
        "service": "bookfuse-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    sqlx::query("SELECT 1").execute(&state.db).await?;
    Ok(Json(json!({ "status": "ok" })))
}

/// GET /books?limit=
pub async fn list_books(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<BookRow>>> {
    let limit = effective_limit(params.limit)?;
    let rows = sqlx::query_as::<_, BookRow>("SELECT * FROM books ORDER BY row_id LIMIT ?")
        .bind(limit)
        .fetch_all(&state.db)
        .await?;
    Ok(Json(rows))
}

/// GET /books/:row_id
pub async fn get_book(
    State(state): State<AppState>,
    Path(row_id): Path<i64>,
) -> ApiResult<Json<BookRow>> {
    let row = sqlx::query_as::<_, BookRow>("SELECT * FROM books WHERE row_id = ?")
        .bind(row_id)
        .fetch_optional(&state.db)
        .await?;

    row.map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No book with row_id {}", row_id)))
}

async fn search_column(
    state: &AppState,
    column: &str,
    params: SearchParams,
) -> ApiResult<Json<Vec<BookRow>>> {
    let limit = effective_limit(params.limit)?;
    // Column name comes from the route table, never the client
    let sql = format!(
        "SELECT * FROM books WHERE {} LIKE ? ORDER BY row_id LIMIT ?",
        column
    );
    let rows = sqlx::query_as::<_, BookRow>(&sql)
        .bind(format!("%{}%", params.q))
        .bind(limit)
        .fetch_all(&state.db)
        .await?;

    if rows.is_empty() {
        return Err(ApiError::NotFound(format!(
            "No books matching {} ~ {:?}",
            column, params.q
        )));
    }
    Ok(Json(rows))
}

/// GET /search/title?q=
pub async fn search_title(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<BookRow>>> {
    search_column(&state, "title", params).await
}

/// GET /search/author?q=
pub async fn search_author(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<BookRow>>> {
    search_column(&state, "author", params).await
}

/// GET /search/subjects?q=
pub async fn search_subjects(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<BookRow>>> {
    search_column(&state, "subjects", params).await
}

/// GET /search/description?q=
pub async fn search_description(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<BookRow>>> {
    search_column(&state, "description", params).await
}

/// GET /search/isbn?q= (exact match)
pub async fn search_isbn(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<BookRow>>> {
    let limit = effective_limit(params.limit)?;
    let rows = sqlx::query_as::<_, BookRow>(
        "SELECT * FROM books WHERE isbn = ? ORDER BY row_id LIMIT ?",
    )
    .bind(&params.q)
    .bind(limit)
    .fetch_all(&state.db)
    .await?;

    if rows.is_empty() {
        return Err(ApiError::NotFound(format!("No books with ISBN {}", params.q)));
    }
    Ok(Json(rows))
}

/// GET /search/all?q= (OR across text fields)
pub async fn search_all(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<BookRow>>> {
    let limit = effective_limit(params.limit)?;
    let pattern = format!("%{}%", params.q);
    let rows = sqlx::query_as::<_, BookRow>(
        r#"
        SELECT * FROM books
        WHERE title LIKE ?1
           OR author LIKE ?1
           OR subjects LIKE ?1
           OR description LIKE ?1
        ORDER BY row_id LIMIT ?2
        "#,
    )
    .bind(&pattern)
    .bind(limit)
    .fetch_all(&state.db)
    .await?;

    if rows.is_empty() {
        return Err(ApiError::NotFound(format!("No books matching {:?}", params.q)));
    }
    Ok(Json(rows))
}
