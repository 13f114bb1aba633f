// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer talks to data sources and metric
// computation only through these traits, so evaluation can be
// driven by a fake metric in tests and a TSV directory can be
// swapped for another source without touching the drivers.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use crate::domain::example::GlueExample;

// ─── ExampleSource ────────────────────────────────────────────────────────────
/// Any component that can produce the raw examples of a named split.
///
/// Implementations:
///   - GlueTsvLoader → reads the official GLUE TSV files
pub trait ExampleSource {
    fn load_split(&self, split: &str) -> Result<Vec<GlueExample>>;
}

// ─── MetricAccumulator ────────────────────────────────────────────────────────
/// Collects predictions and references, then turns them into named scores.
///
/// `compute` returns the scores in a stable order and clears whatever was
/// accumulated, so one accumulator can serve several splits in a row.
pub trait MetricAccumulator {
    fn add_batch(&mut self, predictions: &[usize], references: &[usize]);

    fn compute(&mut self) -> Vec<(String, f64)>;
}
