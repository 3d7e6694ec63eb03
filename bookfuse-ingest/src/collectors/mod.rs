//! Per-source enrichment drivers
//!
//! Each driver wraps one external collector with the decision logic the
//! collector itself must not contain: skip keys whose prior attempt is
//! terminal, catch per-key failures into status records, checkpoint
//! partial progress every few attempts, and pace requests with a fixed
//! inter-request delay. A single key's failure never halts the batch.

pub mod library_catalog;
pub mod openalex;
pub mod openlibrary;

pub use library_catalog::LibraryCatalogEnricher;
pub use openalex::OpenAlexEnricher;
pub use openlibrary::OpenLibraryEnricher;

use std::collections::BTreeMap;
use std::time::Duration;

/// Driver tunables shared by all sources
#[derive(Debug, Clone)]
pub struct EnricherConfig {
    /// Flush or append a checkpoint after this many completed attempts
    pub save_every: usize,
    /// Fixed delay between requests (source rate limit)
    pub request_delay: Duration,
}

impl Default for EnricherConfig {
    fn default() -> Self {
        Self {
            save_every: 5,
            request_delay: Duration::from_millis(400),
        }
    }
}

impl EnricherConfig {
    /// Zero-delay config for tests and offline replays
    pub fn immediate(save_every: usize) -> Self {
        Self {
            save_every,
            request_delay: Duration::ZERO,
        }
    }
}

/// Per-source outcome counts reported to the operator
///
/// The only failure surface a run exposes: how many keys ended in each
/// status, plus how many were skipped as already terminal.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentSummary {
    pub source: String,
    pub attempted: usize,
    pub skipped: usize,
    pub status_counts: BTreeMap<String, usize>,
}

impl EnrichmentSummary {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    pub fn record_status(&mut self, status: String) {
        *self.status_counts.entry(status).or_insert(0) += 1;
    }
}
