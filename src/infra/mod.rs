// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns that don't belong to any single
// business layer:
//
//   model_repo.rs      — resolves a model identifier to a local
//                        HuggingFace-layout directory
//
//   tokenizer_store.rs — loads/saves `tokenizer.json`, applies
//                        truncation, sets TOKENIZERS_PARALLELISM
//
//   checkpoint.rs      — saves and restores fine-tuned weights
//                        (CompactRecorder), the RunConfig and
//                        the tokenizer
//
//   metrics.rs         — GLUE metrics plus CSV logs of training
//                        progress and evaluation scores
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Local pretrained-model directory resolution
pub mod model_repo;

/// Tokenizer loading and saving
pub mod tokenizer_store;

/// Model checkpoint saving and loading
pub mod checkpoint;

/// GLUE metrics and CSV loggers
pub mod metrics;
