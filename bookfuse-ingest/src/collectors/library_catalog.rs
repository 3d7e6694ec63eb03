//! Library catalog (OPAC) enrichment driver
//!
//! ISBN-keyed, merge-on-write persistence. The driver owns the
//! should-re-fetch decision and the best-of selection; the collector
//! behind the boundary only performs one search attempt and encodes
//! every outcome, including blocks and timeouts, as a status.

use super::{EnricherConfig, EnrichmentSummary};
use crate::state::checkpoint::{flush_table, load_best_table};
use crate::state::EnrichmentTable;
use crate::types::{CatalogItem, LibraryCatalogRecord, RetryPolicy, SourceCollector};
use bookfuse_common::Result;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

/// Driver for the library catalog source
pub struct LibraryCatalogEnricher<C> {
    collector: C,
    config: EnricherConfig,
}

impl<C> LibraryCatalogEnricher<C>
where
    C: SourceCollector<Query = str, Output = LibraryCatalogRecord>,
{
    pub fn new(collector: C, config: EnricherConfig) -> Self {
        Self { collector, config }
    }

    /// Enrich every distinct normalized ISBN in the base inventory
    ///
    /// Resumes from the checkpoint: keys whose best record is terminal
    /// are skipped, everything else is re-fetched and folded in through
    /// the best-of rule. The table is flushed wholesale every
    /// `save_every` updates and once at the end.
    pub async fn run(
        &self,
        items: &[CatalogItem],
        checkpoint: &Path,
    ) -> Result<EnrichmentSummary> {
        let keys = distinct_isbn_keys(items);
        let mut table: EnrichmentTable<LibraryCatalogRecord> = load_best_table(checkpoint)?;

        info!(
            source = self.collector.name(),
            keys = keys.len(),
            resumed = table.len(),
            "Starting library catalog enrichment"
        );

        let mut summary = EnrichmentSummary::new(self.collector.name());
        let mut updates_since_save = 0usize;

        for (i, key) in keys.iter().enumerate() {
            if let Some(existing) = table.get(key) {
                if !existing.should_retry() {
                    debug!(key = %key, "Skipping (already terminal)");
                    summary.skipped += 1;
                    continue;
                }
            }

            debug!(key = %key, progress = format!("{}/{}", i + 1, keys.len()), "Fetching");
            let record = self.collector.fetch(key).await;
            summary.attempted += 1;

            table.upgrade(key.clone(), record);
            updates_since_save += 1;

            if updates_since_save >= self.config.save_every {
                flush_table(&table, checkpoint)?;
                updates_since_save = 0;
            }

            tokio::time::sleep(self.config.request_delay).await;
        }

        flush_table(&table, checkpoint)?;

        // Report the best-known status per considered key
        for key in &keys {
            if let Some(record) = table.get(key) {
                summary.record_status(record.status.as_str());
            }
        }

        info!(
            source = self.collector.name(),
            attempted = summary.attempted,
            skipped = summary.skipped,
            "Library catalog enrichment complete"
        );

        Ok(summary)
    }
}

/// Distinct normalized ISBNs in base-inventory order
fn distinct_isbn_keys(items: &[CatalogItem]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut keys = Vec::new();

    for item in items {
        if let Some(key) = item.isbn_key() {
            if seen.insert(key.clone()) {
                keys.push(key);
            }
        }
    }

    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_keys_preserve_order_and_dedupe() {
        let item = |row_id: i64, isbn: &str| CatalogItem {
            row_id,
            isbn: Some(isbn.to_string()),
            title: "T".to_string(),
            author: None,
            year: None,
            publisher: None,
            pages: None,
        };

        let items = vec![
            item(0, "0-306-40615-2"),
            item(1, "0306406152"),
            item(2, "9780134685991"),
            CatalogItem {
                row_id: 3,
                isbn: None,
                title: "No ISBN".to_string(),
                author: None,
                year: None,
                publisher: None,
                pages: None,
            },
        ];

        assert_eq!(
            distinct_isbn_keys(&items),
            vec!["0306406152".to_string(), "9780134685991".to_string()]
        );
    }
}
