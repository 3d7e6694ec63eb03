//! OpenLibrary enrichment driver
//!
//! Row-keyed, append-only persistence: description payloads are large,
//! so completed rows are appended and resumption skips row_ids already
//! present in the log rather than re-ranking them (resume-by-skip).

use super::{EnricherConfig, EnrichmentSummary};
use crate::state::checkpoint::{append_records, load_done_ids};
use crate::types::{
    CatalogItem, EditionLookup, OpenLibraryRecord, OpenLibraryStatus, SourceCollector,
};
use bookfuse_common::normalize::normalize_isbn;
use bookfuse_common::Result;
use std::path::Path;
use tracing::{debug, info};

/// Driver for the OpenLibrary bibliographic source
pub struct OpenLibraryEnricher<C> {
    collector: C,
    config: EnricherConfig,
}

impl<C> OpenLibraryEnricher<C>
where
    C: SourceCollector<Query = str, Output = EditionLookup>,
{
    pub fn new(collector: C, config: EnricherConfig) -> Self {
        Self { collector, config }
    }

    /// Enrich every base inventory row not already in the append log
    pub async fn run(
        &self,
        items: &[CatalogItem],
        checkpoint: &Path,
    ) -> Result<EnrichmentSummary> {
        let done = load_done_ids(checkpoint)?;

        info!(
            source = self.collector.name(),
            rows = items.len(),
            already_done = done.len(),
            "Starting OpenLibrary enrichment"
        );

        let mut summary = EnrichmentSummary::new(self.collector.name());
        let mut buffer: Vec<OpenLibraryRecord> = Vec::new();

        for (i, item) in items.iter().enumerate() {
            if done.contains(&item.row_id) {
                summary.skipped += 1;
                continue;
            }

            debug!(
                row_id = item.row_id,
                progress = format!("{}/{}", i + 1, items.len()),
                "Fetching edition"
            );

            let record = match item.isbn.as_deref().and_then(normalize_isbn) {
                // Malformed key: recorded, never sent to the source
                None => empty_record(item.row_id, None, OpenLibraryStatus::InvalidIsbn),
                Some(isbn) => {
                    let lookup = self.collector.fetch(&isbn).await;
                    summary.attempted += 1;
                    record_from_lookup(item.row_id, isbn, lookup)
                }
            };

            summary.record_status(record.status.as_str());
            buffer.push(record);

            if buffer.len() >= self.config.save_every {
                append_records(checkpoint, &buffer)?;
                buffer.clear();
            }

            tokio::time::sleep(self.config.request_delay).await;
        }

        append_records(checkpoint, &buffer)?;

        info!(
            source = self.collector.name(),
            attempted = summary.attempted,
            skipped = summary.skipped,
            "OpenLibrary enrichment complete"
        );

        Ok(summary)
    }
}

fn empty_record(row_id: i64, isbn: Option<String>, status: OpenLibraryStatus) -> OpenLibraryRecord {
    OpenLibraryRecord {
        row_id,
        isbn,
        status,
        title: None,
        authors: None,
        publisher: None,
        publish_date: None,
        number_of_pages: None,
        work_key: None,
        description: None,
        subjects: None,
    }
}

/// Map a boundary outcome onto the checkpointed record shape
fn record_from_lookup(row_id: i64, isbn: String, lookup: EditionLookup) -> OpenLibraryRecord {
    match lookup {
        EditionLookup::Found(payload) => OpenLibraryRecord {
            row_id,
            isbn: Some(isbn),
            status: OpenLibraryStatus::Ok,
            title: payload.title,
            authors: payload.authors,
            publisher: payload.publisher,
            publish_date: payload.publish_date,
            number_of_pages: payload.number_of_pages,
            work_key: payload.work_key,
            description: payload.description,
            subjects: payload.subjects,
        },
        EditionLookup::NotFound => {
            empty_record(row_id, Some(isbn), OpenLibraryStatus::EditionNotFound)
        }
        EditionLookup::FetchFailed => {
            empty_record(row_id, Some(isbn), OpenLibraryStatus::ErrorFetchEdition)
        }
        EditionLookup::Error(kind) => {
            empty_record(row_id, Some(isbn), OpenLibraryStatus::Error(kind))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EditionPayload;

    #[test]
    fn lookup_outcomes_map_to_statuses() {
        let found = record_from_lookup(
            1,
            "0306406152".to_string(),
            EditionLookup::Found(EditionPayload {
                title: Some("Title".to_string()),
                description: Some("A description.".to_string()),
                ..Default::default()
            }),
        );
        assert_eq!(found.status, OpenLibraryStatus::Ok);
        assert_eq!(found.description.as_deref(), Some("A description."));

        let missing = record_from_lookup(2, "0306406152".to_string(), EditionLookup::NotFound);
        assert_eq!(missing.status, OpenLibraryStatus::EditionNotFound);
        assert!(missing.title.is_none());

        let failed = record_from_lookup(
            3,
            "0306406152".to_string(),
            EditionLookup::Error("Timeout".to_string()),
        );
        assert_eq!(failed.status.as_str(), "error:Timeout");
    }
}
