// ============================================================
// Layer 2 — Predict Use Case
// ============================================================
// Classifies one sentence or sentence pair with a fine-tuned
// checkpoint and returns the winning label.

use anyhow::Result;

use crate::infra::{checkpoint::CheckpointManager, tokenizer_store::configure_parallelism};
use crate::ml::{
    inferencer::{Inferencer, Prediction},
    EvalBackend,
};

pub struct PredictUseCase {
    inferencer: Inferencer<EvalBackend>,
}

impl PredictUseCase {
    pub fn new(checkpoint_dir: &str) -> Result<Self> {
        let device     = burn::backend::wgpu::WgpuDevice::default();
        let ckpt       = CheckpointManager::open(checkpoint_dir)?;
        let inferencer = Inferencer::from_checkpoint(&ckpt, &device)?;
        configure_parallelism(inferencer.config().tokenizers_parallelism);
        Ok(Self { inferencer })
    }

    pub fn task_name(&self) -> &str {
        &self.inferencer.config().dataset_name
    }

    pub fn predict(&self, text_a: &str, text_b: Option<&str>) -> Result<Prediction> {
        self.inferencer.predict(text_a, text_b)
    }
}
