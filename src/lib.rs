// Battery bench telemetry - Rolling per-port history and chart projections
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
