pub mod graph;
pub mod ingest;
pub mod store;
