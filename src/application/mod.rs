// Application layer - Ingest and projection use cases
pub mod dashboard_service;
pub mod ingest_service;
pub mod sample_source;
