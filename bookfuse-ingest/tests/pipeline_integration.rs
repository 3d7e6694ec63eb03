//! End-to-end pipeline tests
//!
//! Seeds a data directory with a base inventory and handwritten source
//! checkpoints, runs the build, and checks the fused artifact.

use bookfuse_common::config::CatalogPaths;
use bookfuse_ingest::pipeline::{build_catalog, read_final_catalog};
use tempfile::TempDir;

fn seed_data_dir() -> (TempDir, CatalogPaths) {
    let tmp = TempDir::new().unwrap();
    let paths = CatalogPaths::new(tmp.path().join("data"));
    paths.ensure_directories().unwrap();

    std::fs::write(
        paths.base_inventory_csv(),
        "row_id,isbn,title,author,year,publisher,pages\n\
         ,978-0-13-468599-1,Effective Java,\"Bloch, Joshua\",2018,Addison-Wesley,416\n\
         ,0-306-40615-2,The Great Gatsby,\"Fitzgerald, F. Scott\",1925,Scribner,180\n\
         ,,An Obscure Pamphlet,,1999,,12\n",
    )
    .unwrap();

    // Library catalog checkpoint: one hit with a marked-up summary,
    // stored under the already-normalized key
    std::fs::write(
        paths.library_catalog_checkpoint(),
        "isbn,detail_url,subjects,summary,status\n\
         9780134685991,https://opac.example/record/9,Computer science,<p>Best practices  for Java.</p>,ok\n",
    )
    .unwrap();

    // OpenLibrary append log: matches Gatsby's ISBN
    std::fs::write(
        paths.openlibrary_checkpoint(),
        "row_id,isbn,status,title,authors,publisher,publish_date,number_of_pages,work_key,description,subjects\n\
         1,0306406152,ok,The Great Gatsby,F. Scott Fitzgerald,Scribner,1925,180,/works/OL468431W,A portrait of the Jazz Age.,Fiction\n",
    )
    .unwrap();

    // OpenAlex append log: exact title match for Gatsby, low-confidence
    // rejection for the pamphlet
    std::fs::write(
        paths.openalex_checkpoint(),
        "row_id,title,work_id,matched_title,doi,work_type,year,cited_by_count,similarity,concept_tags,abstract_text,status\n\
         1,The Great Gatsby,W100,The Great Gatsby,,book,1925,500,1.0,Literature; Jazz Age,An abstract about Gatsby.,ok_exact_title\n\
         2,An Obscure Pamphlet,,Another Pamphlet Entirely,,,,,0.55,,,rejected_low_confidence\n",
    )
    .unwrap();

    (tmp, paths)
}

#[test]
fn build_produces_fused_artifact() {
    let (_tmp, paths) = seed_data_dir();

    let records = build_catalog(&paths).unwrap();
    assert_eq!(records.len(), 3);

    // Row 0: library catalog summary wins, cleaned of markup
    let java = &records[0];
    assert_eq!(java.title, "Effective Java");
    assert_eq!(java.lc_status.as_deref(), Some("ok"));
    assert_eq!(
        java.final_description.as_deref(),
        Some("Best practices for Java.")
    );
    assert_eq!(java.final_description_source.as_deref(), Some("library_catalog"));
    assert_eq!(java.final_subjects.as_deref(), Some("Computer science"));

    // Row 1: no catalog hit, OpenLibrary description wins over the
    // OpenAlex abstract; subjects also come from OpenLibrary
    let gatsby = &records[1];
    assert_eq!(gatsby.title, "The Great Gatsby");
    assert!(gatsby.lc_status.is_none());
    assert_eq!(
        gatsby.final_description.as_deref(),
        Some("A portrait of the Jazz Age.")
    );
    assert_eq!(gatsby.final_description_source.as_deref(), Some("openlibrary"));
    assert_eq!(gatsby.oa_work_id.as_deref(), Some("W100"));
    assert_eq!(gatsby.oa_similarity, Some(1.0));

    // Row 2: only a rejected fuzzy match; audited but nothing fused
    let pamphlet = &records[2];
    assert_eq!(pamphlet.oa_status.as_deref(), Some("rejected_low_confidence"));
    assert_eq!(
        pamphlet.oa_matched_title.as_deref(),
        Some("Another Pamphlet Entirely")
    );
    assert!(pamphlet.oa_work_id.is_none());
    assert!(pamphlet.final_description.is_none());
    assert!(pamphlet.final_description_source.is_none());

    // Artifact on disk round-trips
    let reread = read_final_catalog(&paths.final_catalog_csv()).unwrap();
    assert_eq!(reread.len(), 3);
    assert_eq!(reread[1].final_description_source.as_deref(), Some("openlibrary"));
}

#[test]
fn rebuild_is_idempotent() {
    let (_tmp, paths) = seed_data_dir();

    let first = build_catalog(&paths).unwrap();
    let second = build_catalog(&paths).unwrap();

    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a.row_id, b.row_id);
        assert_eq!(a.final_description, b.final_description);
        assert_eq!(a.final_description_source, b.final_description_source);
        assert_eq!(a.final_subjects, b.final_subjects);
    }
}

#[test]
fn missing_checkpoints_still_build() {
    let tmp = TempDir::new().unwrap();
    let paths = CatalogPaths::new(tmp.path().join("data"));
    paths.ensure_directories().unwrap();

    std::fs::write(
        paths.base_inventory_csv(),
        "row_id,isbn,title,author,year,publisher,pages\n\
         ,1111111111,Lonely Book,,2001,,\n",
    )
    .unwrap();

    let records = build_catalog(&paths).unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].lc_status.is_none());
    assert!(records[0].final_description.is_none());
}
