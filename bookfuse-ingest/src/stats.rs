//! Catalog statistics reporting
//!
//! Summarizes the checkpoint files and the final artifact for the
//! operator: status distribution per source, fused-field coverage, and
//! which source each fused field came from.

use bookfuse_common::config::CatalogPaths;
use bookfuse_common::Result;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

use crate::pipeline::read_final_catalog;

/// Everything the `stats` subcommand reports
#[derive(Debug, Default)]
pub struct CatalogStats {
    /// source name -> (status -> count)
    pub source_status_counts: BTreeMap<String, BTreeMap<String, usize>>,
    pub final_rows: usize,
    pub with_description: usize,
    pub with_subjects: usize,
    /// provenance label -> count, for fused descriptions
    pub description_sources: BTreeMap<String, usize>,
    /// provenance label -> count, for fused subjects
    pub subjects_sources: BTreeMap<String, usize>,
}

/// Gather stats from whichever files exist; missing files count zero
pub fn gather_stats(paths: &CatalogPaths) -> Result<CatalogStats> {
    let mut stats = CatalogStats::default();

    for (source, path) in [
        ("library_catalog", paths.library_catalog_checkpoint()),
        ("openlibrary", paths.openlibrary_checkpoint()),
        ("openalex", paths.openalex_checkpoint()),
    ] {
        stats
            .source_status_counts
            .insert(source.to_string(), status_counts(&path)?);
    }

    match read_final_catalog(&paths.final_catalog_csv()) {
        Ok(records) => {
            stats.final_rows = records.len();
            for record in &records {
                if record.final_description.is_some() {
                    stats.with_description += 1;
                }
                if record.final_subjects.is_some() {
                    stats.with_subjects += 1;
                }
                if let Some(source) = &record.final_description_source {
                    *stats.description_sources.entry(source.clone()).or_insert(0) += 1;
                }
                if let Some(source) = &record.final_subjects_source {
                    *stats.subjects_sources.entry(source.clone()).or_insert(0) += 1;
                }
            }
        }
        Err(e) => {
            warn!(error = %e, "No final artifact yet, skipping coverage stats");
        }
    }

    Ok(stats)
}

/// Count values in a checkpoint's `status` column
fn status_counts(path: &Path) -> Result<BTreeMap<String, usize>> {
    let mut counts = BTreeMap::new();

    if !path.exists() {
        return Ok(counts);
    }

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let status_index = reader
        .headers()?
        .iter()
        .position(|h| h.trim() == "status");

    let Some(status_index) = status_index else {
        warn!(path = %path.display(), "Checkpoint has no status column");
        return Ok(counts);
    };

    for row in reader.records() {
        let Ok(row) = row else { continue };
        if let Some(status) = row.get(status_index) {
            *counts.entry(status.trim().to_string()).or_insert(0) += 1;
        }
    }

    Ok(counts)
}

/// Render the report the way the CLI prints it
pub fn format_stats(stats: &CatalogStats) -> String {
    let mut out = String::new();

    for (source, counts) in &stats.source_status_counts {
        out.push_str(&format!("=== {} ===\n", source));
        if counts.is_empty() {
            out.push_str("  (no checkpoint)\n");
        }
        for (status, count) in counts {
            out.push_str(&format!("  {}: {}\n", status, count));
        }
    }

    out.push_str("=== final catalog ===\n");
    out.push_str(&format!("  rows: {}\n", stats.final_rows));
    out.push_str(&format!("  with description: {}\n", stats.with_description));
    out.push_str(&format!("  with subjects: {}\n", stats.with_subjects));

    out.push_str("  description sources:\n");
    for (source, count) in &stats.description_sources {
        out.push_str(&format!("    {}: {}\n", source, count));
    }
    out.push_str("  subjects sources:\n");
    for (source, count) in &stats.subjects_sources {
        out.push_str(&format!("    {}: {}\n", source, count));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn status_counts_from_checkpoint() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("library_catalog.csv");
        std::fs::write(
            &path,
            "isbn,detail_url,subjects,summary,status\n\
             1111111111,,,,ok\n\
             2222222222,,,,ok\n\
             3333333333,,,,timeout\n",
        )
        .unwrap();

        let counts = status_counts(&path).unwrap();
        assert_eq!(counts.get("ok"), Some(&2));
        assert_eq!(counts.get("timeout"), Some(&1));
    }

    #[test]
    fn missing_checkpoint_counts_nothing() {
        let tmp = TempDir::new().unwrap();
        let counts = status_counts(&tmp.path().join("absent.csv")).unwrap();
        assert!(counts.is_empty());
    }
}
