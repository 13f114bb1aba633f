// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores a fine-tuned classifier using Burn's
// CompactRecorder.
//
// What gets saved in the output directory:
//   1. model.mpk        — all learned parameters
//   2. run_config.json  — the assembled RunConfig, including the
//                         model architecture
//   3. tokenizer.json   — the tokenizer used during training
//
// Loading rebuilds the model from run_config.json first, then
// loads the weights into it; the recorder refuses weights whose
// shapes don't match the rebuilt architecture.
//
//   checkpoints/
//     model.mpk
//     run_config.json
//     tokenizer.json
//     metrics.csv
//     eval_results.csv
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tokenizers::Tokenizer;

use crate::application::run_config::RunConfig;
use crate::infra::tokenizer_store::TokenizerStore;
use crate::ml::model::GlueClassifier;

pub const MODEL_FILE:      &str = "model";
pub const RUN_CONFIG_FILE: &str = "run_config.json";

/// Manages the files of one fine-tuning output directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create the manager, creating the directory if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create output directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Open an existing checkpoint directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            anyhow::bail!("Checkpoint directory '{}' does not exist", dir.display());
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save model weights. The recorder appends its own extension.
    pub fn save_model<B: Backend>(&self, model: &GlueClassifier<B>) -> Result<()> {
        let path = self.dir.join(MODEL_FILE);
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        tracing::debug!("Saved model weights to '{}'", path.display());
        Ok(())
    }

    /// Load saved weights into `model`, which must have the saved architecture.
    pub fn load_model<B: Backend>(
        &self,
        model:  GlueClassifier<B>,
        device: &B::Device,
    ) -> Result<GlueClassifier<B>> {
        let path = self.dir.join(MODEL_FILE);
        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Has 'train' been run first?", path.display())
            })?;
        Ok(model.load_record(record))
    }

    pub fn save_config(&self, cfg: &RunConfig) -> Result<()> {
        let path = self.dir.join(RUN_CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved run config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<RunConfig> {
        let path = self.dir.join(RUN_CONFIG_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!("Cannot read config from '{}'. Has 'train' been run first?", path.display())
        })?;
        serde_json::from_str(&json).with_context(|| format!("Invalid run config '{}'", path.display()))
    }

    pub fn save_tokenizer(&self, tokenizer: &Tokenizer) -> Result<()> {
        TokenizerStore::new(&self.dir).save(tokenizer)
    }

    pub fn load_tokenizer(&self, max_seq_len: usize) -> Result<Tokenizer> {
        TokenizerStore::new(&self.dir).load(max_seq_len)
    }

    /// Rebuild the saved classifier on `device`.
    pub fn restore<B: Backend>(&self, device: &B::Device) -> Result<(RunConfig, GlueClassifier<B>)> {
        let cfg   = self.load_config()?;
        let model = self.load_model(cfg.model.init::<B>(device), device)?;
        tracing::info!("Model restored from '{}'", self.dir.display());
        Ok((cfg, model))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::run_config::{Overrides, RunPaths};
    use crate::ml::model::tests::{tiny_batch, tiny_config};
    use crate::ml::pretrained::PretrainedConfig;

    type TestBackend = burn::backend::NdArray;

    fn run_config() -> RunConfig {
        let mut cfg = RunConfig::assemble(RunPaths::default(), &PretrainedConfig::default(), &Overrides::new()).unwrap();
        cfg.model = tiny_config();
        cfg
    }

    #[test]
    fn test_config_round_trip() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let cfg  = run_config();
        ckpt.save_config(&cfg).unwrap();

        let back = ckpt.load_config().unwrap();
        assert_eq!(back.paths, cfg.paths);
        assert_eq!(back.label_names, cfg.label_names);
        assert_eq!(back.model.hidden_size, 8);
        assert_eq!(back.lr_schedule, cfg.lr_schedule);
    }

    #[test]
    fn test_restore_reproduces_logits() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let ckpt   = CheckpointManager::new(dir.path()).unwrap();
        let cfg    = run_config();

        let model: GlueClassifier<TestBackend> = cfg.model.init(&device);
        ckpt.save_config(&cfg).unwrap();
        ckpt.save_model(&model).unwrap();

        let (_, restored) = ckpt.restore::<TestBackend>(&device).unwrap();

        let logits = |m: &GlueClassifier<TestBackend>| -> Vec<f32> {
            let b = tiny_batch::<TestBackend>(&device);
            m.forward(b.input_ids, b.token_type_ids, b.attention_mask)
                .into_data()
                .iter::<f32>()
                .collect()
        };
        let (a, b) = (logits(&model), logits(&restored));
        // CompactRecorder stores half precision
        assert!(a.iter().zip(&b).all(|(x, y)| (x - y).abs() < 1e-2));
    }

    #[test]
    fn test_missing_checkpoint_errors() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        assert!(ckpt.load_config().is_err());
        assert!(CheckpointManager::open(dir.path().join("nope")).is_err());
    }
}
