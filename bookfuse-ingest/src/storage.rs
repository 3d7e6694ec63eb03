//! Catalog database loader
//!
//! Loads the final artifact into the SQLite `books` table the read API
//! serves from. The table is keyed by `row_id` and the load is an
//! upsert, so re-running after a rebuilt artifact refreshes rows in
//! place.

use crate::fusion::FinalRecord;
use bookfuse_common::Result;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::{debug, info};

/// Fallback stored when a row has no usable title
pub const UNKNOWN_TITLE: &str = "UNKNOWN_TITLE";

/// Years outside this range are treated as data errors and stored NULL
const YEAR_RANGE: std::ops::RangeInclusive<i64> = 1800..=2026;

/// Open the catalog database, creating file and tables as needed
pub async fn init_catalog_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA journal_mode=WAL")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS books (
            row_id INTEGER PRIMARY KEY,
            isbn TEXT,
            title TEXT NOT NULL,
            author TEXT,
            year INTEGER,
            publisher TEXT,
            description TEXT,
            subjects TEXT,
            description_source TEXT,
            subjects_source TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    debug!("Database tables initialized (books)");
    Ok(())
}

/// Upsert the final artifact into the `books` table
pub async fn load_final_catalog(pool: &SqlitePool, records: &[FinalRecord]) -> Result<usize> {
    let mut loaded = 0usize;

    for record in records {
        let title = if record.title.trim().is_empty() {
            UNKNOWN_TITLE.to_string()
        } else {
            record.title.clone()
        };

        sqlx::query(
            r#"
            INSERT INTO books (
                row_id, isbn, title, author, year, publisher,
                description, subjects, description_source, subjects_source
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(row_id) DO UPDATE SET
                isbn = excluded.isbn,
                title = excluded.title,
                author = excluded.author,
                year = excluded.year,
                publisher = excluded.publisher,
                description = excluded.description,
                subjects = excluded.subjects,
                description_source = excluded.description_source,
                subjects_source = excluded.subjects_source
            "#,
        )
        .bind(record.row_id)
        .bind(&record.isbn)
        .bind(&title)
        .bind(&record.author)
        .bind(coerce_year(record.year.as_deref()))
        .bind(&record.publisher)
        .bind(&record.final_description)
        .bind(&record.final_subjects)
        .bind(&record.final_description_source)
        .bind(&record.final_subjects_source)
        .execute(pool)
        .await?;

        loaded += 1;
    }

    info!(rows = loaded, "Loaded final catalog into database");
    Ok(loaded)
}

/// Parse a raw year, rejecting values outside the plausible range
///
/// Accepts float-formatted years ("1925.0") from older artifacts.
fn coerce_year(raw: Option<&str>) -> Option<i64> {
    let trimmed = raw?.trim();
    let year = trimmed
        .parse::<i64>()
        .ok()
        .or_else(|| trimmed.parse::<f64>().ok().map(|y| y as i64))?;
    YEAR_RANGE.contains(&year).then_some(year)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_coercion_rejects_out_of_range() {
        assert_eq!(coerce_year(Some("1925")), Some(1925));
        assert_eq!(coerce_year(Some(" 2020 ")), Some(2020));
        assert_eq!(coerce_year(Some("1925.0")), Some(1925));
        assert_eq!(coerce_year(Some("1799")), None);
        assert_eq!(coerce_year(Some("2027")), None);
        assert_eq!(coerce_year(Some("circa 1900")), None);
        assert_eq!(coerce_year(None), None);
    }
}
