// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types describing GLUE tasks and their examples.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Wang et al. (2018) GLUE benchmark

/// One labelled sentence or sentence pair
pub mod example;

/// The GLUE task registry: label tables, TSV layouts, splits, metrics
pub mod task;

/// Core abstractions (traits) that other layers implement
pub mod traits;
