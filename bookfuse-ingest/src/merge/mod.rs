//! Cross-source join
//!
//! Attaches each source's best record to every base inventory row.
//! Library catalog and OpenLibrary join exactly on the normalized ISBN;
//! OpenAlex joins on the normalized title, with multiple attempts for
//! the same title pre-resolved to a single winner before the join so
//! two rows sharing a title see the same match.

use crate::state::checkpoint::{load_best_table, load_records};
use crate::state::EnrichmentTable;
use crate::types::{CatalogItem, LibraryCatalogRecord, OpenAlexRecord, OpenLibraryRecord};
use bookfuse_common::config::CatalogPaths;
use bookfuse_common::Result;
use std::collections::HashMap;
use tracing::{debug, info};

/// Every source's checkpointed state, keyed for joining
pub struct SourceTables {
    pub library_catalog: EnrichmentTable<LibraryCatalogRecord>,
    pub openlibrary: EnrichmentTable<OpenLibraryRecord>,
    pub openalex_by_title: HashMap<String, OpenAlexRecord>,
}

impl SourceTables {
    /// Load all three checkpoints; a missing checkpoint is an empty table
    pub fn load(paths: &CatalogPaths) -> Result<Self> {
        let library_catalog = load_best_table(&paths.library_catalog_checkpoint())?;
        let openlibrary = load_best_table(&paths.openlibrary_checkpoint())?;
        let openalex_by_title =
            resolve_openalex_by_title(load_records(&paths.openalex_checkpoint())?);

        info!(
            library_catalog = library_catalog.len(),
            openlibrary = openlibrary.len(),
            openalex = openalex_by_title.len(),
            "Loaded source tables"
        );

        Ok(Self {
            library_catalog,
            openlibrary,
            openalex_by_title,
        })
    }
}

/// One base row with whatever each source knows about it
#[derive(Debug, Clone)]
pub struct MergedRecord {
    pub item: CatalogItem,
    pub library_catalog: Option<LibraryCatalogRecord>,
    pub openlibrary: Option<OpenLibraryRecord>,
    pub openalex: Option<OpenAlexRecord>,
}

/// Left-join every base row against the three source tables
pub fn merge_sources(items: &[CatalogItem], tables: &SourceTables) -> Vec<MergedRecord> {
    let mut merged = Vec::with_capacity(items.len());
    let mut lc_hits = 0usize;
    let mut ol_hits = 0usize;
    let mut oa_hits = 0usize;

    for item in items {
        let isbn_key = item.isbn_key();
        let title_key = item.title_key();

        let library_catalog = isbn_key
            .as_deref()
            .and_then(|k| tables.library_catalog.get(k))
            .cloned();
        let openlibrary = isbn_key
            .as_deref()
            .and_then(|k| tables.openlibrary.get(k))
            .cloned();
        let openalex = title_key
            .as_deref()
            .and_then(|k| tables.openalex_by_title.get(k))
            .cloned();

        lc_hits += library_catalog.is_some() as usize;
        ol_hits += openlibrary.is_some() as usize;
        oa_hits += openalex.is_some() as usize;

        merged.push(MergedRecord {
            item: item.clone(),
            library_catalog,
            openlibrary,
            openalex,
        });
    }

    info!(
        rows = merged.len(),
        library_catalog_matched = lc_hits,
        openlibrary_matched = ol_hits,
        openalex_matched = oa_hits,
        "Merged source tables"
    );

    merged
}

/// Collapse the OpenAlex append log to one record per title key
///
/// Highest similarity wins; equal similarities fall back to the
/// lexically smallest work id, then to the earlier row. Records whose
/// title fails to normalize are dropped.
pub fn resolve_openalex_by_title(records: Vec<OpenAlexRecord>) -> HashMap<String, OpenAlexRecord> {
    use crate::types::KeyedRecord;

    let mut by_title: HashMap<String, OpenAlexRecord> = HashMap::new();
    let mut dropped = 0usize;

    for record in records {
        let Some(key) = record.canonical_key() else {
            dropped += 1;
            continue;
        };

        match by_title.get(&key) {
            Some(incumbent) if !beats(&record, incumbent) => {}
            _ => {
                by_title.insert(key, record);
            }
        }
    }

    if dropped > 0 {
        debug!(dropped, "Dropped title-less rows during resolution");
    }

    by_title
}

fn beats(candidate: &OpenAlexRecord, incumbent: &OpenAlexRecord) -> bool {
    let c_sim = candidate.similarity.unwrap_or(-1.0);
    let i_sim = incumbent.similarity.unwrap_or(-1.0);

    if c_sim != i_sim {
        return c_sim > i_sim;
    }

    match (&candidate.work_id, &incumbent.work_id) {
        (Some(c), Some(i)) => c < i,
        (Some(_), None) => true,
        _ => false,
    }
}
