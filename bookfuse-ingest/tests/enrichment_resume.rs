//! Enrichment driver resume behavior
//!
//! Exercises the drivers end to end with scripted collectors: terminal
//! statuses are skipped on the next run, retryable ones are re-fetched
//! and upgraded, and append-only logs resume by skipping done row_ids.

use async_trait::async_trait;
use bookfuse_ingest::collectors::{
    EnricherConfig, LibraryCatalogEnricher, OpenAlexEnricher, OpenLibraryEnricher,
};
use bookfuse_ingest::state::checkpoint::{load_best_table, load_done_ids};
use bookfuse_ingest::state::EnrichmentTable;
use bookfuse_ingest::types::{
    CandidateLookup, CatalogItem, EditionLookup, EditionPayload, LibraryCatalogRecord,
    LibraryCatalogStatus, SourceCollector, WorkCandidate,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

fn item(row_id: i64, isbn: Option<&str>, title: &str) -> CatalogItem {
    CatalogItem {
        row_id,
        isbn: isbn.map(str::to_string),
        title: title.to_string(),
        author: None,
        year: None,
        publisher: None,
        pages: None,
    }
}

/// Library catalog collector that replays a scripted status per ISBN
/// and counts every fetch
struct ScriptedCatalog {
    responses: HashMap<String, LibraryCatalogRecord>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl SourceCollector for ScriptedCatalog {
    type Query = str;
    type Output = LibraryCatalogRecord;

    fn name(&self) -> &'static str {
        "library_catalog"
    }

    async fn fetch(&self, query: &str) -> LibraryCatalogRecord {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .get(query)
            .cloned()
            .unwrap_or(LibraryCatalogRecord {
                isbn: query.to_string(),
                detail_url: None,
                subjects: None,
                summary: None,
                status: LibraryCatalogStatus::NoResults,
            })
    }
}

fn catalog_response(isbn: &str, status: LibraryCatalogStatus, summary: Option<&str>) -> LibraryCatalogRecord {
    LibraryCatalogRecord {
        isbn: isbn.to_string(),
        detail_url: None,
        subjects: None,
        summary: summary.map(str::to_string),
        status,
    }
}

#[tokio::test]
async fn timeout_is_retried_next_run_and_upgraded() {
    let tmp = TempDir::new().unwrap();
    let checkpoint = tmp.path().join("library_catalog.csv");
    let items = vec![
        item(0, Some("0306406152"), "Physics Text"),
        item(1, Some("9780134685991"), "Effective Java"),
    ];

    // First run: one timeout, one affirmative no-match
    let calls = Arc::new(AtomicUsize::new(0));
    let first = ScriptedCatalog {
        responses: HashMap::from([
            (
                "0306406152".to_string(),
                catalog_response("0306406152", LibraryCatalogStatus::Timeout, None),
            ),
            (
                "9780134685991".to_string(),
                catalog_response("9780134685991", LibraryCatalogStatus::NoResults, None),
            ),
        ]),
        calls: calls.clone(),
    };
    let summary = LibraryCatalogEnricher::new(first, EnricherConfig::immediate(1))
        .run(&items, &checkpoint)
        .await
        .unwrap();
    assert_eq!(summary.attempted, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // Second run: the timeout key succeeds, the no_results key is
    // terminal and never re-fetched
    let calls = Arc::new(AtomicUsize::new(0));
    let second = ScriptedCatalog {
        responses: HashMap::from([(
            "0306406152".to_string(),
            catalog_response("0306406152", LibraryCatalogStatus::Ok, Some("A summary.")),
        )]),
        calls: calls.clone(),
    };
    let summary = LibraryCatalogEnricher::new(second, EnricherConfig::immediate(1))
        .run(&items, &checkpoint)
        .await
        .unwrap();

    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let table: EnrichmentTable<LibraryCatalogRecord> = load_best_table(&checkpoint).unwrap();
    assert_eq!(
        table.get("0306406152").unwrap().status,
        LibraryCatalogStatus::Ok
    );
    assert_eq!(
        table.get("9780134685991").unwrap().status,
        LibraryCatalogStatus::NoResults
    );
}

#[tokio::test]
async fn worse_rerun_outcome_never_replaces_better_checkpoint() {
    let tmp = TempDir::new().unwrap();
    let checkpoint = tmp.path().join("library_catalog.csv");
    let items = vec![item(0, Some("0306406152"), "Physics Text")];

    // A found_but_empty record is retryable but already better than a
    // timeout; the rerun's timeout must not regress it
    let first = ScriptedCatalog {
        responses: HashMap::from([(
            "0306406152".to_string(),
            catalog_response("0306406152", LibraryCatalogStatus::FoundButEmpty, None),
        )]),
        calls: Arc::new(AtomicUsize::new(0)),
    };
    LibraryCatalogEnricher::new(first, EnricherConfig::immediate(1))
        .run(&items, &checkpoint)
        .await
        .unwrap();

    let second = ScriptedCatalog {
        responses: HashMap::from([(
            "0306406152".to_string(),
            catalog_response("0306406152", LibraryCatalogStatus::Timeout, None),
        )]),
        calls: Arc::new(AtomicUsize::new(0)),
    };
    LibraryCatalogEnricher::new(second, EnricherConfig::immediate(1))
        .run(&items, &checkpoint)
        .await
        .unwrap();

    let table: EnrichmentTable<LibraryCatalogRecord> = load_best_table(&checkpoint).unwrap();
    assert_eq!(
        table.get("0306406152").unwrap().status,
        LibraryCatalogStatus::FoundButEmpty
    );
}

/// OpenLibrary collector that always finds an edition and counts calls
struct AlwaysFoundEditions {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl SourceCollector for AlwaysFoundEditions {
    type Query = str;
    type Output = EditionLookup;

    fn name(&self) -> &'static str {
        "openlibrary"
    }

    async fn fetch(&self, _query: &str) -> EditionLookup {
        self.calls.fetch_add(1, Ordering::SeqCst);
        EditionLookup::Found(EditionPayload {
            title: Some("A Title".to_string()),
            description: Some("A description.".to_string()),
            ..Default::default()
        })
    }
}

#[tokio::test]
async fn append_log_resume_skips_done_rows() {
    let tmp = TempDir::new().unwrap();
    let checkpoint = tmp.path().join("openlibrary.csv");
    let items: Vec<CatalogItem> = (0..4)
        .map(|i| item(i, Some("0306406152"), "A Title"))
        .collect();

    let calls = Arc::new(AtomicUsize::new(0));
    let enricher = OpenLibraryEnricher::new(
        AlwaysFoundEditions { calls: calls.clone() },
        EnricherConfig::immediate(2),
    );
    enricher.run(&items, &checkpoint).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(load_done_ids(&checkpoint).unwrap().len(), 4);

    // Rerun touches nothing
    let calls = Arc::new(AtomicUsize::new(0));
    let enricher = OpenLibraryEnricher::new(
        AlwaysFoundEditions { calls: calls.clone() },
        EnricherConfig::immediate(2),
    );
    let summary = enricher.run(&items, &checkpoint).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(summary.skipped, 4);
    assert_eq!(load_done_ids(&checkpoint).unwrap().len(), 4);
}

#[tokio::test]
async fn invalid_isbn_is_recorded_without_fetching() {
    let tmp = TempDir::new().unwrap();
    let checkpoint = tmp.path().join("openlibrary.csv");
    let items = vec![item(0, Some("nan"), "A Title"), item(1, None, "Another")];

    let calls = Arc::new(AtomicUsize::new(0));
    let enricher = OpenLibraryEnricher::new(
        AlwaysFoundEditions { calls: calls.clone() },
        EnricherConfig::immediate(1),
    );
    let summary = enricher.run(&items, &checkpoint).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(summary.attempted, 0);
    assert_eq!(summary.status_counts.get("invalid_isbn"), Some(&2));
    // Still marked done so reruns skip them
    assert_eq!(load_done_ids(&checkpoint).unwrap().len(), 2);
}

/// OpenAlex collector returning one near-miss candidate per title
struct OneCandidate {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl SourceCollector for OneCandidate {
    type Query = str;
    type Output = CandidateLookup;

    fn name(&self) -> &'static str {
        "openalex"
    }

    async fn fetch(&self, query: &str) -> CandidateLookup {
        self.calls.fetch_add(1, Ordering::SeqCst);
        CandidateLookup::Candidates(vec![WorkCandidate {
            id: Some("W1".to_string()),
            display_name: Some(format!("{}.", query)),
            ..Default::default()
        }])
    }
}

#[tokio::test]
async fn openalex_driver_checkpoints_and_resumes() {
    let tmp = TempDir::new().unwrap();
    let checkpoint = tmp.path().join("openalex.csv");
    let items = vec![
        item(0, None, "The Great Gatsby"),
        item(1, None, "..."),
    ];

    let calls = Arc::new(AtomicUsize::new(0));
    let enricher = OpenAlexEnricher::new(
        OneCandidate { calls: calls.clone() },
        EnricherConfig::immediate(1),
    );
    let summary = enricher.run(&items, &checkpoint).await.unwrap();

    // The punctuation-only title never reaches the collector
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(summary.status_counts.get("empty_title"), Some(&1));
    assert_eq!(summary.status_counts.get("ok_exact_title"), Some(&1));

    let calls = Arc::new(AtomicUsize::new(0));
    let enricher = OpenAlexEnricher::new(
        OneCandidate { calls: calls.clone() },
        EnricherConfig::immediate(1),
    );
    let summary = enricher.run(&items, &checkpoint).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(summary.skipped, 2);
}
