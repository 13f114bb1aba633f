// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Loads a fine-tuned checkpoint and classifies a single
// sentence or sentence pair:
//
//   text_a [, text_b] → tokenizer → GlueBatch of 1
//                     → softmax(logits) → (label, probability)

use anyhow::Result;
use burn::{data::dataloader::batcher::Batcher, prelude::*};
use tokenizers::Tokenizer;

use crate::application::run_config::RunConfig;
use crate::data::{batcher::GlueBatcher, pipeline::encode_example};
use crate::domain::example::GlueExample;
use crate::infra::{checkpoint::CheckpointManager, tokenizer_store::check_vocab};
use crate::ml::model::GlueClassifier;

/// The winning class for one input.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label_id:    usize,
    pub label:       String,
    pub probability: f32,
}

pub struct Inferencer<B: Backend> {
    model:     GlueClassifier<B>,
    tokenizer: Tokenizer,
    config:    RunConfig,
    batcher:   GlueBatcher<B>,
}

impl<B: Backend> Inferencer<B> {
    pub fn from_checkpoint(ckpt: &CheckpointManager, device: &B::Device) -> Result<Self> {
        let (config, model) = ckpt.restore::<B>(device)?;
        let tokenizer       = ckpt.load_tokenizer(config.max_seq_len)?;
        check_vocab(&tokenizer, config.model.vocab_size)?;
        Ok(Self { model, tokenizer, config, batcher: GlueBatcher::new(device.clone()) })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn predict(&self, text_a: &str, text_b: Option<&str>) -> Result<Prediction> {
        if self.config.text_b_field.is_some() && text_b.is_none() {
            tracing::warn!(
                "Task '{}' expects a sentence pair; classifying text_a alone",
                self.config.dataset_name
            );
        }

        let example = match text_b {
            Some(b) => GlueExample::pair(0, text_a, b, 0),
            None    => GlueExample::single(0, text_a, 0),
        };
        let item  = encode_example(&self.tokenizer, &example)?;
        let batch = self.batcher.batch(vec![item]);

        let probs: Vec<f32> = self
            .model
            .probabilities(batch)
            .into_data()
            .iter::<f32>()
            .collect();

        let (label_id, probability) = probs
            .iter()
            .copied()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |best, (i, p)| if p > best.1 { (i, p) } else { best });

        tracing::debug!("Class probabilities: {probs:?}");
        Ok(Prediction {
            label_id,
            label: self.config.label_name(label_id).to_string(),
            probability,
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::run_config::{Overrides, RunPaths};
    use crate::infra::tokenizer_store::test_support::write_word_level_tokenizer;
    use crate::ml::model::tests::tiny_config;
    use crate::ml::pretrained::PretrainedConfig;

    type TestBackend = burn::backend::NdArray;

    fn write_checkpoint(dir: &std::path::Path, vocab_size: usize) -> CheckpointManager {
        let mut cfg = RunConfig::assemble(RunPaths::default(), &PretrainedConfig::default(), &Overrides::new()).unwrap();
        cfg.max_seq_len      = 16;
        cfg.model            = tiny_config();
        cfg.model.vocab_size = vocab_size;

        let tokenizer = write_word_level_tokenizer(dir, &["the", "cat", "sat"]);
        let ckpt      = CheckpointManager::new(dir).unwrap();
        let model: GlueClassifier<TestBackend> = cfg.model.init(&Default::default());
        ckpt.save_config(&cfg).unwrap();
        ckpt.save_model(&model).unwrap();
        ckpt.save_tokenizer(&tokenizer).unwrap();
        ckpt
    }

    #[test]
    fn test_predicts_a_known_label() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let ckpt   = write_checkpoint(dir.path(), 128);

        let inferencer = Inferencer::<TestBackend>::from_checkpoint(&ckpt, &device).unwrap();
        let prediction = inferencer.predict("the cat", Some("sat")).unwrap();

        assert!(prediction.label_id < 2);
        assert!(["not_equivalent", "equivalent"].contains(&prediction.label.as_str()));
        assert!(prediction.probability >= 0.5 && prediction.probability <= 1.0);
    }

    #[test]
    fn test_mismatched_tokenizer_is_error() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = write_checkpoint(dir.path(), 64);
        assert!(Inferencer::<TestBackend>::from_checkpoint(&ckpt, &Default::default()).is_err());
    }
}
