// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// This layer handles everything from GLUE TSV files all the
// way to device-ready tensor batches.
//
// The pipeline flows in this order:
//
//   <data_dir>/glue/<Task>/{train,dev}.tsv
//       │
//       ▼
//   GlueTsvLoader     → parses rows into GlueExamples per split
//       │
//       ▼
//   Tokenizer         → converts text (pairs) to token ids
//       │
//       ▼
//   GlueDataset       → implements Burn's Dataset trait
//       │
//       ▼
//   GlueBatcher       → pads and stacks items into tensor batches
//       │
//       ▼
//   InputPipeline     → get_inputs(split, batch_size, training)
//
// Reference: Burn Book §4 (Datasets and Dataloaders)
//            Rust Book §13 (Iterators and Closures)

/// Reads GLUE TSV splits from disk
pub mod loader;

/// Burn Dataset over encoded examples
pub mod dataset;

/// Stacks encoded examples into padded tensor batches
pub mod batcher;

/// Lazy training / evaluation batch streams
pub mod pipeline;
