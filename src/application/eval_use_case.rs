// ============================================================
// Layer 2 — EvalUseCase
// ============================================================
// Re-runs evaluation from a saved checkpoint:
//
//   Step 1: Restore RunConfig + weights      (Layer 6 - infra)
//   Step 2: Load saved tokenizer             (Layer 6 - infra)
//   Step 3: Load validation splits           (Layer 4 - data)
//   Step 4: Evaluate every validation split  (Layer 5 - ml)

use anyhow::Result;
use burn::prelude::*;

use crate::data::{loader::load_validation, pipeline::InputPipeline};
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger, tokenizer_store::{check_vocab, configure_parallelism}};
use crate::ml::{
    evaluator::{run_evaluation, SplitScores},
    EvalBackend,
};

pub struct EvalUseCase {
    checkpoint_dir: String,
    data_dir:       Option<String>,
}

impl EvalUseCase {
    /// `data_dir` overrides the one recorded in the checkpoint's config.
    pub fn new(checkpoint_dir: String, data_dir: Option<String>) -> Self {
        Self { checkpoint_dir, data_dir }
    }

    pub fn execute(&self) -> Result<Vec<SplitScores>> {
        let device = burn::backend::wgpu::WgpuDevice::default();
        self.run::<EvalBackend>(&device)
    }

    pub fn run<B: Backend>(&self, device: &B::Device) -> Result<Vec<SplitScores>> {
        // ── Step 1: Model + config ────────────────────────────────────────────
        let ckpt         = CheckpointManager::open(&self.checkpoint_dir)?;
        let (cfg, model) = ckpt.restore::<B>(device)?;

        // ── Step 2: Tokenizer ─────────────────────────────────────────────────
        configure_parallelism(cfg.tokenizers_parallelism);
        let tokenizer = ckpt.load_tokenizer(cfg.max_seq_len)?;
        check_vocab(&tokenizer, cfg.model.vocab_size)?;

        // ── Step 3: Validation data ───────────────────────────────────────────
        let data_dir = self.data_dir.as_deref().unwrap_or(&cfg.paths.data_dir);
        let dataset  = load_validation(data_dir, &cfg.dataset_path, &cfg.dataset_name)?;
        let pipeline = InputPipeline::new(&dataset, &tokenizer, cfg.seed)?;

        // ── Step 4: Metrics ───────────────────────────────────────────────────
        let logger = MetricsLogger::new(ckpt.dir())?;
        run_evaluation(&cfg, &model, &pipeline, &logger, device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::{
        tests::{tiny_overrides, write_tiny_run},
        TrainUseCase,
    };

    #[test]
    fn test_evaluates_saved_checkpoint() {
        let dir    = tempfile::tempdir().unwrap();
        let paths  = write_tiny_run(dir.path());
        let device = Default::default();

        let trained = TrainUseCase::new(paths.clone(), tiny_overrides())
            .run::<burn::backend::Autodiff<burn::backend::NdArray>>(&device)
            .unwrap();

        let evaluated = EvalUseCase::new(paths.output_dir.clone(), None)
            .run::<burn::backend::NdArray>(&device)
            .unwrap();

        assert_eq!(evaluated.len(), trained.len());
        assert_eq!(evaluated[0].examples, 10);
        assert_eq!(evaluated[0].lines().len(), 2);
    }

    #[test]
    fn test_missing_checkpoint_dir() {
        let dir = tempfile::tempdir().unwrap();
        let use_case = EvalUseCase::new(dir.path().join("none").display().to_string(), None);
        assert!(use_case.run::<burn::backend::NdArray>(&Default::default()).is_err());
    }
}
