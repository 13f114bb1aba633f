// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All tensor code lives in this layer. Other layers hand it
// configs and batches and get back models, losses and class ids.
//
//   model.rs      — BERT encoder + pooled classification head
//   pretrained.rs — HuggingFace config.json / safetensors loading
//   schedule.rs   — learning-rate schedule as a pure function of step
//   trainer.rs    — pure train step + step-count loop driver
//   evaluator.rs  — eval step + per-split metric driver
//   inferencer.rs — single-input prediction from a checkpoint
//
// Training runs on the autodiff backend; `model.valid()` moves
// the trained model onto the inner backend for evaluation.
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Devlin et al. (2019) BERT

/// Backend with gradient tracking, used for fine-tuning
pub type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// Inner backend, used for evaluation and prediction
pub type EvalBackend = burn::backend::Wgpu;

/// BERT sequence classifier architecture
pub mod model;

/// Pretrained weight and config loading
pub mod pretrained;

/// Learning-rate schedules
pub mod schedule;

/// State-threading training loop
pub mod trainer;

/// Evaluation over held-out splits
pub mod evaluator;

/// Inference engine — loads checkpoint and classifies input
pub mod inferencer;
