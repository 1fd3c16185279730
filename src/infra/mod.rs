// ============================================================
// Infrastructure Layer
// ============================================================
// Cross-cutting concerns that belong to no single business
// layer. Currently just the metrics CSV logger; anything a
// training driver wants to keep across runs goes here.

/// Step-level metrics CSV logger
pub mod metrics;
