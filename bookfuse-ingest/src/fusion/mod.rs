//! Field fusion with provenance
//!
//! Turns one merged row into the flat final-artifact record: every
//! per-source column is carried through for auditability, and the two
//! fused fields (description, subjects) are chosen by fixed source
//! precedence with the winning source recorded alongside the value.

pub mod text_clean;

pub use text_clean::clean_text;

use crate::merge::MergedRecord;
use serde::{Deserialize, Serialize};

/// Provenance labels written next to each fused field
pub const SOURCE_LIBRARY_CATALOG: &str = "library_catalog";
pub const SOURCE_OPENLIBRARY: &str = "openlibrary";
pub const SOURCE_OPENALEX: &str = "openalex";

/// One row of the final catalog artifact
///
/// Flat on purpose: the artifact is a plain CSV consumed outside this
/// pipeline, so nesting and enums stop here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalRecord {
    pub row_id: i64,
    pub isbn: Option<String>,
    pub title: String,
    pub author: Option<String>,
    pub year: Option<String>,
    pub publisher: Option<String>,
    pub pages: Option<String>,

    pub lc_status: Option<String>,
    pub lc_detail_url: Option<String>,
    pub lc_subjects: Option<String>,
    pub lc_summary: Option<String>,

    pub ol_status: Option<String>,
    pub ol_title: Option<String>,
    pub ol_authors: Option<String>,
    pub ol_publisher: Option<String>,
    pub ol_publish_date: Option<String>,
    pub ol_number_of_pages: Option<i64>,
    pub ol_work_key: Option<String>,
    pub ol_description: Option<String>,
    pub ol_subjects: Option<String>,

    pub oa_status: Option<String>,
    pub oa_work_id: Option<String>,
    pub oa_matched_title: Option<String>,
    pub oa_doi: Option<String>,
    pub oa_work_type: Option<String>,
    pub oa_year: Option<i64>,
    pub oa_cited_by_count: Option<i64>,
    pub oa_similarity: Option<f64>,
    pub oa_concept_tags: Option<String>,
    pub oa_abstract: Option<String>,

    pub final_description: Option<String>,
    pub final_description_source: Option<String>,
    pub final_subjects: Option<String>,
    pub final_subjects_source: Option<String>,
}

/// Fuse one merged row into a final record
///
/// Precedence is fixed: the curated catalog summary beats the
/// OpenLibrary description, which beats the OpenAlex abstract; likewise
/// for subjects. A source whose value cleans to nothing yields to the
/// next source rather than winning with an empty string.
pub fn fuse_record(merged: &MergedRecord) -> FinalRecord {
    let item = &merged.item;
    let lc = merged.library_catalog.as_ref();
    let ol = merged.openlibrary.as_ref();
    let oa = merged.openalex.as_ref();

    let description_candidates = [
        (SOURCE_LIBRARY_CATALOG, lc.and_then(|r| r.summary.as_deref())),
        (SOURCE_OPENLIBRARY, ol.and_then(|r| r.description.as_deref())),
        (SOURCE_OPENALEX, oa.and_then(|r| r.abstract_text.as_deref())),
    ];
    let subjects_candidates = [
        (SOURCE_LIBRARY_CATALOG, lc.and_then(|r| r.subjects.as_deref())),
        (SOURCE_OPENLIBRARY, ol.and_then(|r| r.subjects.as_deref())),
        (SOURCE_OPENALEX, oa.and_then(|r| r.concept_tags.as_deref())),
    ];

    let (final_description, final_description_source) = first_usable(&description_candidates);
    let (final_subjects, final_subjects_source) = first_usable(&subjects_candidates);

    FinalRecord {
        row_id: item.row_id,
        isbn: item.isbn.clone(),
        title: item.title.clone(),
        author: item.author.clone(),
        year: item.year.clone(),
        publisher: item.publisher.clone(),
        pages: item.pages.clone(),

        lc_status: lc.map(|r| r.status.as_str()),
        lc_detail_url: lc.and_then(|r| r.detail_url.clone()),
        lc_subjects: lc.and_then(|r| r.subjects.clone()),
        lc_summary: lc.and_then(|r| r.summary.clone()),

        ol_status: ol.map(|r| r.status.as_str()),
        ol_title: ol.and_then(|r| r.title.clone()),
        ol_authors: ol.and_then(|r| r.authors.clone()),
        ol_publisher: ol.and_then(|r| r.publisher.clone()),
        ol_publish_date: ol.and_then(|r| r.publish_date.clone()),
        ol_number_of_pages: ol.and_then(|r| r.number_of_pages),
        ol_work_key: ol.and_then(|r| r.work_key.clone()),
        ol_description: ol.and_then(|r| r.description.clone()),
        ol_subjects: ol.and_then(|r| r.subjects.clone()),

        oa_status: oa.map(|r| r.status.as_str()),
        oa_work_id: oa.and_then(|r| r.work_id.clone()),
        oa_matched_title: oa.and_then(|r| r.matched_title.clone()),
        oa_doi: oa.and_then(|r| r.doi.clone()),
        oa_work_type: oa.and_then(|r| r.work_type.clone()),
        oa_year: oa.and_then(|r| r.year),
        oa_cited_by_count: oa.and_then(|r| r.cited_by_count),
        oa_similarity: oa.and_then(|r| r.similarity),
        oa_concept_tags: oa.and_then(|r| r.concept_tags.clone()),
        oa_abstract: oa.and_then(|r| r.abstract_text.clone()),

        final_description,
        final_description_source,
        final_subjects,
        final_subjects_source,
    }
}

/// First candidate that cleans to usable text, with its source label
fn first_usable(candidates: &[(&'static str, Option<&str>)]) -> (Option<String>, Option<String>) {
    for (source, raw) in candidates {
        if let Some(raw) = raw {
            if let Some(cleaned) = clean_text(raw) {
                return (Some(cleaned), Some(source.to_string()));
            }
        }
    }
    (None, None)
}
