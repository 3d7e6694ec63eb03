//! Pipeline orchestration
//!
//! Ties the stages together: base inventory loading, the per-source
//! enrichment drivers, merge, fusion, and the final CSV artifact.
//! `build_catalog` is pure given the checkpoint files on disk and can
//! be rerun at any time.

use crate::fusion::{fuse_record, FinalRecord};
use crate::merge::{merge_sources, SourceTables};
use crate::state::checkpoint::load_records;
use crate::types::CatalogItem;
use bookfuse_common::config::CatalogPaths;
use bookfuse_common::{Error, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

/// Raw base inventory row before row_id assignment
#[derive(Debug, Deserialize)]
struct BaseRow {
    row_id: Option<i64>,
    isbn: Option<String>,
    title: Option<String>,
    author: Option<String>,
    year: Option<String>,
    publisher: Option<String>,
    pages: Option<String>,
}

/// Load and clean the base inventory snapshot
///
/// Physical duplicates (same title, pages, year, author, and ISBN) are
/// collapsed to the first occurrence. Rows without a usable title are
/// dropped. Rows missing a persisted `row_id` get one from their file
/// position, so ids are stable as long as the snapshot is.
pub fn load_base_inventory(path: &Path) -> Result<Vec<CatalogItem>> {
    if !path.exists() {
        return Err(Error::NotFound(format!(
            "base inventory not found: {}",
            path.display()
        )));
    }

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut items = Vec::new();
    let mut seen = HashSet::new();
    let mut duplicates = 0usize;
    let mut untitled = 0usize;

    for (position, row) in reader.deserialize::<BaseRow>().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping malformed inventory row");
                continue;
            }
        };

        let item = CatalogItem {
            row_id: row.row_id.unwrap_or(position as i64),
            isbn: row.isbn,
            title: row.title.unwrap_or_default(),
            author: row.author,
            year: row.year,
            publisher: row.publisher,
            pages: row.pages,
        };

        if item.title_key().is_none() {
            untitled += 1;
            continue;
        }

        let fingerprint = (
            item.title.clone(),
            item.pages.clone(),
            item.year.clone(),
            item.author.clone(),
            item.isbn.clone(),
        );
        if !seen.insert(fingerprint) {
            duplicates += 1;
            continue;
        }

        items.push(item);
    }

    info!(
        path = %path.display(),
        rows = items.len(),
        duplicates_dropped = duplicates,
        untitled_dropped = untitled,
        "Loaded base inventory"
    );

    Ok(items)
}

/// Build the final catalog artifact from the checkpointed source state
pub fn build_catalog(paths: &CatalogPaths) -> Result<Vec<FinalRecord>> {
    let items = load_base_inventory(&paths.base_inventory_csv())?;
    let tables = SourceTables::load(paths)?;

    let merged = merge_sources(&items, &tables);
    let records: Vec<FinalRecord> = merged.iter().map(fuse_record).collect();

    let described = records.iter().filter(|r| r.final_description.is_some()).count();
    let subjected = records.iter().filter(|r| r.final_subjects.is_some()).count();

    write_final_catalog(&records, &paths.final_catalog_csv())?;

    info!(
        rows = records.len(),
        with_description = described,
        with_subjects = subjected,
        artifact = %paths.final_catalog_csv().display(),
        "Built final catalog"
    );

    Ok(records)
}

/// Atomically write the final artifact CSV
pub fn write_final_catalog(records: &[FinalRecord], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("csv.tmp");
    {
        let mut writer = csv::Writer::from_path(&tmp_path)?;
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
    }
    std::fs::rename(&tmp_path, path)?;

    Ok(())
}

/// Read the final artifact back, tolerating malformed rows
pub fn read_final_catalog(path: &Path) -> Result<Vec<FinalRecord>> {
    if !path.exists() {
        return Err(Error::NotFound(format!(
            "final catalog not found: {}",
            path.display()
        )));
    }
    load_records(path)
}
