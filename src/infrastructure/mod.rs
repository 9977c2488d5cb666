// Infrastructure layer - Configuration and the bench wire format
pub mod bench_frame;
pub mod config;
