//! Core types and trait definitions for the ingest pipeline
//!
//! Defines the base inventory item, the per-source enrichment records
//! with their closed status vocabularies, and the traits the state
//! store and collector drivers are built on:
//! - `KeyedRecord` - canonical key derivation for checkpointed rows
//! - `QualityScore` / `RetryPolicy` - best-of selection and re-fetch gating
//! - `SourceCollector` - the boundary behind which network fetching lives

use async_trait::async_trait;
use bookfuse_common::normalize::{normalize_isbn, normalize_title};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Base inventory
// ============================================================================

/// One physical record from the base inventory snapshot
///
/// `row_id` is assigned once when the snapshot is loaded and never
/// reused; every append-only checkpoint keys on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    pub row_id: i64,
    pub isbn: Option<String>,
    pub title: String,
    pub author: Option<String>,
    pub year: Option<String>,
    pub publisher: Option<String>,
    pub pages: Option<String>,
}

impl CatalogItem {
    /// Canonical ISBN key, when one can be derived
    pub fn isbn_key(&self) -> Option<String> {
        self.isbn.as_deref().and_then(normalize_isbn)
    }

    /// Canonical title key, when one can be derived
    pub fn title_key(&self) -> Option<String> {
        normalize_title(&self.title)
    }
}

// ============================================================================
// Record traits
// ============================================================================

/// Checkpointed row whose canonical key is re-derived on load
///
/// Rows whose key fails to normalize are dropped at the load boundary.
pub trait KeyedRecord {
    fn canonical_key(&self) -> Option<String>;
}

/// Deterministic ranking used to choose between two candidate records
/// for the same key. Never surfaced to users.
pub trait QualityScore {
    fn quality_score(&self) -> i32;
}

/// Classifies a prior attempt as worth re-fetching or terminal
///
/// The sole gate deciding whether a collector is invoked again for a
/// key on a subsequent run.
pub trait RetryPolicy {
    fn should_retry(&self) -> bool;
}

// ============================================================================
// Library catalog (OPAC) source - merge-on-write, keyed by ISBN
// ============================================================================

/// Status vocabulary for library catalog search attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryCatalogStatus {
    /// Matched with usable payload
    Ok,
    /// Detail page found but no subjects or summary on it
    FoundButEmpty,
    /// Search or navigation timed out
    Timeout,
    /// Anti-bot interstitial could not be cleared this run
    SecurityCheckFailed,
    /// Source affirmatively reported no match
    NoResults,
    /// Unexpected fault, kind preserved for the operator
    Error(String),
    /// Unrecognized status from an older checkpoint
    Other(String),
}

impl LibraryCatalogStatus {
    pub fn as_str(&self) -> String {
        match self {
            Self::Ok => "ok".to_string(),
            Self::FoundButEmpty => "found_but_empty".to_string(),
            Self::Timeout => "timeout".to_string(),
            Self::SecurityCheckFailed => "security_check_failed".to_string(),
            Self::NoResults => "no_results".to_string(),
            Self::Error(kind) => format!("error:{}", kind),
            Self::Other(raw) => raw.clone(),
        }
    }
}

impl From<String> for LibraryCatalogStatus {
    fn from(raw: String) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_lowercase().as_str() {
            "ok" => Self::Ok,
            "found_but_empty" => Self::FoundButEmpty,
            "timeout" => Self::Timeout,
            "security_check_failed" => Self::SecurityCheckFailed,
            "no_results" => Self::NoResults,
            // Keep the error kind's original casing
            s if s.starts_with("error:") => Self::Error(trimmed["error:".len()..].to_string()),
            _ => Self::Other(trimmed.to_lowercase()),
        }
    }
}

impl From<LibraryCatalogStatus> for String {
    fn from(status: LibraryCatalogStatus) -> String {
        status.as_str()
    }
}

/// One library catalog enrichment attempt for one ISBN
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryCatalogRecord {
    pub isbn: String,
    pub detail_url: Option<String>,
    pub subjects: Option<String>,
    pub summary: Option<String>,
    #[serde(with = "status_string")]
    pub status: LibraryCatalogStatus,
}

fn has_text(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|s| !s.trim().is_empty())
}

impl KeyedRecord for LibraryCatalogRecord {
    fn canonical_key(&self) -> Option<String> {
        normalize_isbn(&self.isbn)
    }
}

impl QualityScore for LibraryCatalogRecord {
    fn quality_score(&self) -> i32 {
        let base = match &self.status {
            LibraryCatalogStatus::Ok => 50,
            LibraryCatalogStatus::FoundButEmpty => 30,
            LibraryCatalogStatus::Timeout => 10,
            LibraryCatalogStatus::SecurityCheckFailed => 5,
            LibraryCatalogStatus::NoResults => 0,
            LibraryCatalogStatus::Error(_) | LibraryCatalogStatus::Other(_) => 8,
        };

        let mut bonus = 0;
        if has_text(&self.subjects) {
            bonus += 20;
        }
        if has_text(&self.summary) {
            bonus += 20;
        }

        base + bonus
    }
}

impl RetryPolicy for LibraryCatalogRecord {
    fn should_retry(&self) -> bool {
        match &self.status {
            // Confirmed absent: terminal-negative
            LibraryCatalogStatus::NoResults => false,
            // Transient or blocked: worth another run
            LibraryCatalogStatus::Timeout
            | LibraryCatalogStatus::SecurityCheckFailed
            | LibraryCatalogStatus::FoundButEmpty
            | LibraryCatalogStatus::Error(_) => true,
            // Success without payload might yield richer data later
            LibraryCatalogStatus::Ok => !(has_text(&self.subjects) || has_text(&self.summary)),
            LibraryCatalogStatus::Other(_) => false,
        }
    }
}

// ============================================================================
// OpenLibrary source - append-only, keyed by row_id
// ============================================================================

/// Status vocabulary for OpenLibrary edition lookups
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenLibraryStatus {
    Ok,
    /// No usable ISBN could be derived; never sent to the source
    InvalidIsbn,
    /// Source affirmatively reported no edition for this ISBN
    EditionNotFound,
    /// Edition fetch failed after retries inside the client
    ErrorFetchEdition,
    Error(String),
    Other(String),
}

impl OpenLibraryStatus {
    pub fn as_str(&self) -> String {
        match self {
            Self::Ok => "ok".to_string(),
            Self::InvalidIsbn => "invalid_isbn".to_string(),
            Self::EditionNotFound => "edition_not_found".to_string(),
            Self::ErrorFetchEdition => "error_fetch_edition".to_string(),
            Self::Error(kind) => format!("error:{}", kind),
            Self::Other(raw) => raw.clone(),
        }
    }
}

impl From<String> for OpenLibraryStatus {
    fn from(raw: String) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_lowercase().as_str() {
            "ok" => Self::Ok,
            "invalid_isbn" => Self::InvalidIsbn,
            "edition_not_found" => Self::EditionNotFound,
            "error_fetch_edition" => Self::ErrorFetchEdition,
            s if s.starts_with("error:") => Self::Error(trimmed["error:".len()..].to_string()),
            _ => Self::Other(trimmed.to_lowercase()),
        }
    }
}

impl From<OpenLibraryStatus> for String {
    fn from(status: OpenLibraryStatus) -> String {
        status.as_str()
    }
}

/// One OpenLibrary enrichment attempt for one inventory row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenLibraryRecord {
    pub row_id: i64,
    pub isbn: Option<String>,
    #[serde(with = "status_string")]
    pub status: OpenLibraryStatus,
    pub title: Option<String>,
    pub authors: Option<String>,
    pub publisher: Option<String>,
    pub publish_date: Option<String>,
    pub number_of_pages: Option<i64>,
    pub work_key: Option<String>,
    pub description: Option<String>,
    pub subjects: Option<String>,
}

impl KeyedRecord for OpenLibraryRecord {
    fn canonical_key(&self) -> Option<String> {
        self.isbn.as_deref().and_then(normalize_isbn)
    }
}

impl QualityScore for OpenLibraryRecord {
    fn quality_score(&self) -> i32 {
        let base = match &self.status {
            OpenLibraryStatus::Ok => 100,
            OpenLibraryStatus::ErrorFetchEdition => 10,
            OpenLibraryStatus::Error(_) | OpenLibraryStatus::Other(_) => 8,
            OpenLibraryStatus::EditionNotFound | OpenLibraryStatus::InvalidIsbn => 0,
        };

        // Free text outweighs identifiers when ranking duplicates
        let mut bonus = 0;
        if has_text(&self.description) {
            bonus += 40;
        }
        if has_text(&self.subjects) {
            bonus += 20;
        }
        if has_text(&self.title) {
            bonus += 10;
        }

        base + bonus
    }
}

// ============================================================================
// OpenAlex source - append-only, keyed by row_id, fuzzy title match
// ============================================================================

/// Status vocabulary for OpenAlex title matches
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenAlexStatus {
    /// Normalized titles were identical
    OkExactTitle,
    /// Similarity at or above the acceptance threshold
    OkHighConfidence,
    /// Best candidate below threshold; payload withheld, match audited
    RejectedLowConfidence,
    /// Search returned nothing
    NoCandidates,
    /// Candidates existed but none had a usable title
    NoValidCandidate,
    /// Item title itself failed to normalize
    EmptyTitle,
    Error(String),
    Other(String),
}

impl OpenAlexStatus {
    pub fn as_str(&self) -> String {
        match self {
            Self::OkExactTitle => "ok_exact_title".to_string(),
            Self::OkHighConfidence => "ok_high_confidence".to_string(),
            Self::RejectedLowConfidence => "rejected_low_confidence".to_string(),
            Self::NoCandidates => "no_candidates".to_string(),
            Self::NoValidCandidate => "no_valid_candidate".to_string(),
            Self::EmptyTitle => "empty_title".to_string(),
            Self::Error(kind) => format!("error:{}", kind),
            Self::Other(raw) => raw.clone(),
        }
    }

    /// Whether the match was accepted and the payload is trustworthy
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::OkExactTitle | Self::OkHighConfidence)
    }
}

impl From<String> for OpenAlexStatus {
    fn from(raw: String) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_lowercase().as_str() {
            "ok_exact_title" => Self::OkExactTitle,
            "ok_high_confidence" => Self::OkHighConfidence,
            "rejected_low_confidence" => Self::RejectedLowConfidence,
            "no_candidates" => Self::NoCandidates,
            "no_valid_candidate" => Self::NoValidCandidate,
            "empty_title" => Self::EmptyTitle,
            s if s.starts_with("error:") => Self::Error(trimmed["error:".len()..].to_string()),
            _ => Self::Other(trimmed.to_lowercase()),
        }
    }
}

impl From<OpenAlexStatus> for String {
    fn from(status: OpenAlexStatus) -> String {
        status.as_str()
    }
}

/// One OpenAlex enrichment attempt for one inventory row
///
/// On rejection the identifying payload (`work_id`, `doi`, concepts,
/// abstract) is withheld but the matched title, similarity, and status
/// are kept so the rejected join never silently disappears.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAlexRecord {
    pub row_id: i64,
    pub title: String,
    pub work_id: Option<String>,
    pub matched_title: Option<String>,
    pub doi: Option<String>,
    pub work_type: Option<String>,
    pub year: Option<i64>,
    pub cited_by_count: Option<i64>,
    pub similarity: Option<f64>,
    pub concept_tags: Option<String>,
    pub abstract_text: Option<String>,
    #[serde(with = "status_string")]
    pub status: OpenAlexStatus,
}

impl KeyedRecord for OpenAlexRecord {
    fn canonical_key(&self) -> Option<String> {
        normalize_title(&self.title)
    }
}

// ============================================================================
// Collector boundary
// ============================================================================

/// The boundary behind which the actual network fetch lives
///
/// Implementations must never fail for "not found" or "blocked" - those
/// outcomes are encoded in the output type. Retrying across runs is the
/// driver's job (via `RetryPolicy` or the append-only done-set), never
/// the collector's.
#[async_trait]
pub trait SourceCollector: Send + Sync {
    /// Key or query handed to the source
    type Query: Send + Sync + ?Sized;
    /// Outcome of one attempt; encodes failure as data
    type Output: Send;

    /// Collector name for provenance and logging
    fn name(&self) -> &'static str;

    /// Perform one enrichment attempt
    async fn fetch(&self, query: &Self::Query) -> Self::Output;
}

/// Outcome of an OpenLibrary edition lookup, failures encoded as data
#[derive(Debug, Clone)]
pub enum EditionLookup {
    Found(EditionPayload),
    NotFound,
    FetchFailed,
    Error(String),
}

/// Fields the OpenLibrary boundary can return for an edition
#[derive(Debug, Clone, Default)]
pub struct EditionPayload {
    pub title: Option<String>,
    pub authors: Option<String>,
    pub publisher: Option<String>,
    pub publish_date: Option<String>,
    pub number_of_pages: Option<i64>,
    pub work_key: Option<String>,
    pub description: Option<String>,
    pub subjects: Option<String>,
}

/// Outcome of an OpenAlex work search, failures encoded as data
#[derive(Debug, Clone)]
pub enum CandidateLookup {
    Candidates(Vec<WorkCandidate>),
    Error(String),
}

/// One scholarly-work candidate returned by the search boundary
#[derive(Debug, Clone, Default)]
pub struct WorkCandidate {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub doi: Option<String>,
    pub work_type: Option<String>,
    pub publication_year: Option<i64>,
    pub cited_by_count: Option<i64>,
    pub concepts: Vec<ConceptTag>,
    /// Abstract as `word -> positions` inverted index
    pub abstract_inverted_index: Option<HashMap<String, Vec<usize>>>,
}

/// Concept annotation on a work candidate
#[derive(Debug, Clone)]
pub struct ConceptTag {
    pub display_name: String,
    pub score: f64,
}

// ============================================================================
// Status serde helper
// ============================================================================

/// Serialize status enums through their string form in checkpoints
mod status_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S, T>(status: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Clone + Into<String>,
    {
        serializer.serialize_str(&status.clone().into())
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: From<String>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(T::from(raw))
    }
}

// ============================================================================
// Tests
// ============================================================================
