//! Checkpoint I/O for enrichment tables
//!
//! Two persistence strategies, matching how each source is keyed:
//!
//! - **Merge-on-write** (small tables keyed by a domain identifier):
//!   the whole table is rewritten atomically, one row per key, and
//!   loading re-derives keys and folds duplicates through `upgrade`.
//! - **Append-only** (row_id-keyed tables with large text payloads):
//!   new rows are appended and completeness is recovered at load time
//!   by scanning the key column (resume-by-skip, not resume-by-merge).
//!
//! Neither layout is safe under concurrent writers; single-writer
//! access per checkpoint file is assumed.

use crate::state::EnrichmentTable;
use crate::types::{KeyedRecord, QualityScore};
use bookfuse_common::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::path::Path;
use tracing::{debug, warn};

/// Load a merge-on-write checkpoint into an enrichment table
///
/// Keys are re-derived from each persisted row (defensive
/// re-normalization); rows whose key fails to normalize are dropped,
/// and duplicate keys are folded through the best-of rule.
pub fn load_best_table<R>(path: &Path) -> Result<EnrichmentTable<R>>
where
    R: DeserializeOwned + KeyedRecord + QualityScore,
{
    let mut table = EnrichmentTable::new();

    if !path.exists() {
        debug!(path = %path.display(), "No checkpoint yet, starting empty");
        return Ok(table);
    }

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut dropped = 0usize;

    for row in reader.deserialize::<R>() {
        let record = match row {
            Ok(record) => record,
            Err(e) => {
                // Tolerate malformed rows; a checkpoint must never
                // refuse to load because one line was truncated.
                warn!(path = %path.display(), error = %e, "Skipping malformed checkpoint row");
                continue;
            }
        };

        match record.canonical_key() {
            Some(key) => table.upgrade(key, record),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        warn!(
            path = %path.display(),
            dropped,
            "Dropped checkpoint rows with unnormalizable keys"
        );
    }

    debug!(
        path = %path.display(),
        keys = table.len(),
        "Loaded merge-on-write checkpoint"
    );

    Ok(table)
}

/// Atomically overwrite a merge-on-write checkpoint
///
/// Writes one row per key, sorted by key, to a temp file and renames
/// it into place so an interrupted flush never truncates the previous
/// snapshot.
pub fn flush_table<R>(table: &EnrichmentTable<R>, path: &Path) -> Result<()>
where
    R: Serialize + QualityScore,
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("csv.tmp");
    {
        let mut writer = csv::Writer::from_path(&tmp_path)?;
        for (_, record) in table.sorted_records() {
            writer.serialize(record)?;
        }
        writer.flush()?;
    }
    std::fs::rename(&tmp_path, path)?;

    debug!(path = %path.display(), keys = table.len(), "Flushed checkpoint");
    Ok(())
}

/// Scan an append-only checkpoint for the set of row_ids already done
///
/// Completeness is recovered from the key column alone; payload
/// columns are not re-validated. Malformed rows are skipped.
pub fn load_done_ids(path: &Path) -> Result<HashSet<i64>> {
    let mut done = HashSet::new();

    if !path.exists() {
        return Ok(done);
    }

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let key_index = reader
        .headers()?
        .iter()
        .position(|h| h.trim() == "row_id");

    let Some(key_index) = key_index else {
        warn!(path = %path.display(), "Append log has no row_id column, treating as empty");
        return Ok(done);
    };

    for row in reader.records() {
        let Ok(row) = row else { continue };
        if let Some(raw) = row.get(key_index) {
            if let Ok(id) = raw.trim().parse::<i64>() {
                done.insert(id);
            }
        }
    }

    debug!(path = %path.display(), done = done.len(), "Scanned append log");
    Ok(done)
}

/// Load every parseable row from an append-only checkpoint
///
/// Malformed rows are skipped with a warning, like `load_best_table`;
/// duplicate keys are preserved in file order for the caller to
/// resolve.
pub fn load_records<R: DeserializeOwned>(path: &Path) -> Result<Vec<R>> {
    let mut records = Vec::new();

    if !path.exists() {
        return Ok(records);
    }

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    for row in reader.deserialize::<R>() {
        match row {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping malformed checkpoint row");
            }
        }
    }

    debug!(path = %path.display(), rows = records.len(), "Loaded append log");
    Ok(records)
}

/// Append newly computed rows to an append-only checkpoint
///
/// The header is written only when the file is created.
pub fn append_records<R: Serialize>(path: &Path, rows: &[R]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let exists = path.exists();
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(!exists)
        .from_writer(file);

    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    debug!(path = %path.display(), appended = rows.len(), "Appended checkpoint rows");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LibraryCatalogRecord, LibraryCatalogStatus, OpenLibraryRecord, OpenLibraryStatus};
    use tempfile::TempDir;

    fn lc_record(isbn: &str, status: &str, summary: Option<&str>) -> LibraryCatalogRecord {
        LibraryCatalogRecord {
            isbn: isbn.to_string(),
            detail_url: None,
            subjects: None,
            summary: summary.map(str::to_string),
            status: LibraryCatalogStatus::from(status.to_string()),
        }
    }

    fn ol_record(row_id: i64) -> OpenLibraryRecord {
        OpenLibraryRecord {
            row_id,
            isbn: Some("0306406152".to_string()),
            status: OpenLibraryStatus::Ok,
            title: Some("Title".to_string()),
            authors: None,
            publisher: None,
            publish_date: None,
            number_of_pages: None,
            work_key: None,
            description: None,
            subjects: None,
        }
    }

    #[test]
    fn flush_then_load_roundtrips_best_records() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("library_catalog.csv");

        let mut table = EnrichmentTable::new();
        table.upgrade("0306406152", lc_record("0306406152", "ok", Some("A summary.")));
        table.upgrade("0000123456", lc_record("0000123456", "timeout", None));

        flush_table(&table, &path).unwrap();
        let loaded: EnrichmentTable<LibraryCatalogRecord> = load_best_table(&path).unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(
            loaded.get("0306406152").unwrap().summary.as_deref(),
            Some("A summary.")
        );
        assert_eq!(
            loaded.get("0000123456").unwrap().status,
            LibraryCatalogStatus::Timeout
        );
    }

    #[test]
    fn load_renormalizes_keys_and_drops_bad_rows() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("library_catalog.csv");

        // Hyphenated and unnormalizable keys straight from a raw file
        std::fs::write(
            &path,
            "isbn,detail_url,subjects,summary,status\n\
             0-306-40615-2,,Physics,,ok\n\
             nan,,,,ok\n",
        )
        .unwrap();

        let loaded: EnrichmentTable<LibraryCatalogRecord> = load_best_table(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.get("0306406152").is_some());
    }

    #[test]
    fn load_folds_duplicate_keys_through_upgrade() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("library_catalog.csv");

        std::fs::write(
            &path,
            "isbn,detail_url,subjects,summary,status\n\
             0306406152,,,,timeout\n\
             0-306-40615-2,,,A summary.,ok\n",
        )
        .unwrap();

        let loaded: EnrichmentTable<LibraryCatalogRecord> = load_best_table(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(
            loaded.get("0306406152").unwrap().status,
            LibraryCatalogStatus::Ok
        );
    }

    #[test]
    fn missing_checkpoint_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("absent.csv");
        let loaded: EnrichmentTable<LibraryCatalogRecord> = load_best_table(&path).unwrap();
        assert!(loaded.is_empty());
        assert!(load_done_ids(&path).unwrap().is_empty());
    }

    #[test]
    fn append_log_accumulates_and_reports_done_ids() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("openlibrary.csv");

        append_records(&path, &[ol_record(0), ol_record(1)]).unwrap();
        append_records(&path, &[ol_record(2)]).unwrap();

        let done = load_done_ids(&path).unwrap();
        assert_eq!(done.len(), 3);
        assert!(done.contains(&0) && done.contains(&1) && done.contains(&2));

        let rows: Vec<OpenLibraryRecord> = load_records(&path).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].row_id, 2);

        // Header written exactly once
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("row_id").count(), 1);
    }

    #[test]
    fn done_ids_tolerate_malformed_rows() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("openlibrary.csv");

        std::fs::write(
            &path,
            "row_id,isbn,status\n7,0306406152,ok\nnot_a_number,x,ok\n9,0306406152,ok\n",
        )
        .unwrap();

        let done = load_done_ids(&path).unwrap();
        assert_eq!(done, HashSet::from([7, 9]));
    }
}
