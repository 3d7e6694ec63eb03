//! OpenAlex enrichment driver
//!
//! Row-keyed, append-only persistence like OpenLibrary, but the join is
//! fuzzy: the source is searched by title and the best candidate is
//! accepted only when its normalized title is identical or similar
//! enough. Rejected matches are checkpointed with their similarity so
//! the near-misses remain auditable.

use super::{EnricherConfig, EnrichmentSummary};
use crate::state::checkpoint::{append_records, load_done_ids};
use crate::types::{
    CandidateLookup, CatalogItem, ConceptTag, OpenAlexRecord, OpenAlexStatus, SourceCollector,
    WorkCandidate,
};
use bookfuse_common::normalize::{normalize_title, title_similarity};
use bookfuse_common::Result;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Minimum similarity for accepting a non-identical title match
pub const MATCH_THRESHOLD: f64 = 0.92;

/// How many concept tags to keep per accepted work
const MAX_CONCEPTS: usize = 10;

/// Driver for the OpenAlex scholarly-works source
pub struct OpenAlexEnricher<C> {
    collector: C,
    config: EnricherConfig,
}

impl<C> OpenAlexEnricher<C>
where
    C: SourceCollector<Query = str, Output = CandidateLookup>,
{
    pub fn new(collector: C, config: EnricherConfig) -> Self {
        Self { collector, config }
    }

    /// Match every base inventory row not already in the append log
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
            "Starting OpenAlex enrichment"
        );

        let mut summary = EnrichmentSummary::new(self.collector.name());
        let mut buffer: Vec<OpenAlexRecord> = Vec::new();

        for (i, item) in items.iter().enumerate() {
            if done.contains(&item.row_id) {
                summary.skipped += 1;
                continue;
            }

            debug!(
                row_id = item.row_id,
                progress = format!("{}/{}", i + 1, items.len()),
                "Searching works"
            );

            let record = match item.title_key() {
                // Unusable title: recorded, never sent to the source
                None => empty_record(item.row_id, &item.title, OpenAlexStatus::EmptyTitle),
                Some(title_key) => {
                    let lookup = self.collector.fetch(&item.title).await;
                    summary.attempted += 1;

                    match lookup {
                        CandidateLookup::Candidates(candidates) => {
                            match_candidates(item.row_id, &item.title, &title_key, candidates)
                        }
                        CandidateLookup::Error(kind) => {
                            empty_record(item.row_id, &item.title, OpenAlexStatus::Error(kind))
                        }
                    }
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
            "OpenAlex enrichment complete"
        );

        Ok(summary)
    }
}

fn empty_record(row_id: i64, title: &str, status: OpenAlexStatus) -> OpenAlexRecord {
    OpenAlexRecord {
        row_id,
        title: title.to_string(),
        work_id: None,
        matched_title: None,
        doi: None,
        work_type: None,
        year: None,
        cited_by_count: None,
        similarity: None,
        concept_tags: None,
        abstract_text: None,
        status,
    }
}

/// Pick the best candidate for one row and decide acceptance
///
/// An identical normalized title short-circuits the scan with
/// similarity 1.0. Otherwise the highest-similarity candidate wins,
/// with equal scores broken by lexically smallest work id so the
/// outcome never depends on result order. Below the threshold the
/// identifying payload is withheld but the audited match fields stay.
pub fn match_candidates(
    row_id: i64,
    raw_title: &str,
    title_key: &str,
    candidates: Vec<WorkCandidate>,
) -> OpenAlexRecord {
    if candidates.is_empty() {
        return empty_record(row_id, raw_title, OpenAlexStatus::NoCandidates);
    }

    let mut best: Option<(f64, String, WorkCandidate)> = None;

    for candidate in candidates {
        let Some(display_name) = candidate.display_name.clone() else {
            continue;
        };
        let Some(candidate_key) = normalize_title(&display_name) else {
            continue;
        };

        if candidate_key == title_key {
            return accepted_record(
                row_id,
                raw_title,
                display_name,
                1.0,
                OpenAlexStatus::OkExactTitle,
                candidate,
            );
        }

        let similarity = title_similarity(title_key, &candidate_key);
        let replace = match &best {
            None => true,
            Some((best_sim, best_id, _)) => {
                similarity > *best_sim
                    || (similarity == *best_sim
                        && candidate.id.as_deref().unwrap_or("") < best_id.as_str())
            }
        };
        if replace {
            let id = candidate.id.clone().unwrap_or_default();
            best = Some((similarity, id, candidate));
        }
    }

    let Some((similarity, _, candidate)) = best else {
        return empty_record(row_id, raw_title, OpenAlexStatus::NoValidCandidate);
    };

    let matched_title = candidate
        .display_name
        .clone()
        .unwrap_or_default();

    if similarity >= MATCH_THRESHOLD {
        accepted_record(
            row_id,
            raw_title,
            matched_title,
            similarity,
            OpenAlexStatus::OkHighConfidence,
            candidate,
        )
    } else {
        let mut record = empty_record(row_id, raw_title, OpenAlexStatus::RejectedLowConfidence);
        record.matched_title = Some(matched_title);
        record.similarity = Some(similarity);
        record
    }
}

fn accepted_record(
    row_id: i64,
    raw_title: &str,
    matched_title: String,
    similarity: f64,
    status: OpenAlexStatus,
    candidate: WorkCandidate,
) -> OpenAlexRecord {
    OpenAlexRecord {
        row_id,
        title: raw_title.to_string(),
        work_id: candidate.id,
        matched_title: Some(matched_title),
        doi: candidate.doi,
        work_type: candidate.work_type,
        year: candidate.publication_year,
        cited_by_count: candidate.cited_by_count,
        similarity: Some(similarity),
        concept_tags: extract_concepts(&candidate.concepts),
        abstract_text: candidate
            .abstract_inverted_index
            .as_ref()
            .and_then(reconstruct_abstract),
        status,
    }
}

/// Top concept names by score, joined with "; "
pub fn extract_concepts(concepts: &[ConceptTag]) -> Option<String> {
    if concepts.is_empty() {
        return None;
    }

    let mut ranked: Vec<&ConceptTag> = concepts.iter().collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));

    let joined = ranked
        .iter()
        .take(MAX_CONCEPTS)
        .map(|c| c.display_name.as_str())
        .collect::<Vec<_>>()
        .join("; ");

    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

/// Rebuild abstract text from a `word -> positions` inverted index
pub fn reconstruct_abstract(index: &HashMap<String, Vec<usize>>) -> Option<String> {
    let mut positioned: Vec<(usize, &str)> = Vec::new();
    for (word, positions) in index {
        for &pos in positions {
            positioned.push((pos, word.as_str()));
        }
    }

    if positioned.is_empty() {
        return None;
    }

    positioned.sort_by_key(|(pos, _)| *pos);
    let text = positioned
        .into_iter()
        .map(|(_, word)| word)
        .collect::<Vec<_>>()
        .join(" ");

    Some(text)
}
