// Domain layer - Samples, per-port history and the projections built from it
pub mod dashboard;
pub mod sample;
pub mod series;
pub mod window;
