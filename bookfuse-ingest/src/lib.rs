//! bookfuse-ingest library interface
//!
//! Exposes the pipeline stages for integration testing: base inventory
//! loading, per-source enrichment drivers, merge, fusion, the final
//! artifact, and the catalog database loader.

pub mod collectors;
pub mod fusion;
pub mod merge;
pub mod pipeline;
pub mod state;
pub mod stats;
pub mod storage;
pub mod types;
