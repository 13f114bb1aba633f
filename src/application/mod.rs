// ============================================================
// Layer 2 — Application Layer
// ============================================================
// This layer orchestrates all the other layers to accomplish
// a specific goal (fine-tuning, evaluating or predicting).
//
// Rules for this layer:
//   - No ML math or model code here
//   - No direct file parsing (that's Layer 4 and 6)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

/// Run configuration: defaults, overrides, derived fields
pub mod run_config;

/// The fine-tuning workflow (train, save, evaluate)
pub mod train_use_case;

/// Evaluation of a saved checkpoint
pub mod eval_use_case;

/// Single-input classification with a saved checkpoint
pub mod predict_use_case;
