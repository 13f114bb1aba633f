// ============================================================
// Layer 4 — Input Pipeline
// ============================================================
// Binds the raw splits to the tokenizer and hands out lazy
// batch streams:
//
//   get_inputs("train", 32, true)        → endless, reshuffled
//   get_inputs("validation", 8, false)   → one ordered pass
//
// Every split is tokenised once, up front. Streams wrap Burn's
// DataLoader, which builds tensors on demand, so a stream that
// is never pulled costs nothing.

use anyhow::{anyhow, Result};
use burn::{
    data::{
        dataloader::{DataLoader, DataLoaderBuilder},
        dataset::Dataset,
    },
    prelude::*,
};
use std::{collections::BTreeMap, sync::Arc};
use tokenizers::Tokenizer;

use crate::data::batcher::{GlueBatch, GlueBatcher};
use crate::data::dataset::{GlueDataset, GlueItem};
use crate::data::loader::GlueDatasetDict;
use crate::domain::example::GlueExample;

/// Tokenise one example into model inputs (no padding).
pub fn encode_example(tokenizer: &Tokenizer, example: &GlueExample) -> Result<GlueItem> {
    let encoding = match &example.text_b {
        Some(text_b) => tokenizer.encode((example.text_a.as_str(), text_b.as_str()), true),
        None         => tokenizer.encode(example.text_a.as_str(), true),
    }
    .map_err(|e| anyhow!("Tokenisation error on example {}: {e}", example.idx))?;

    Ok(GlueItem {
        input_ids:      encoding.get_ids().to_vec(),
        token_type_ids: encoding.get_type_ids().to_vec(),
        attention_mask: encoding.get_attention_mask().to_vec(),
        label:          example.label,
    })
}

pub struct InputPipeline {
    splits: BTreeMap<String, Arc<GlueDataset>>,
    seed:   u64,
}

impl InputPipeline {
    /// Tokenise every loaded split of `dict`.
    pub fn new(dict: &GlueDatasetDict, tokenizer: &Tokenizer, seed: u64) -> Result<Self> {
        let mut splits = BTreeMap::new();
        for name in dict.split_names() {
            let items = dict
                .split(name)?
                .iter()
                .map(|ex| encode_example(tokenizer, ex))
                .collect::<Result<Vec<_>>>()?;
            tracing::debug!("Encoded split '{name}' ({} items)", items.len());
            splits.insert(name.to_string(), Arc::new(GlueDataset::new(items)));
        }
        Ok(Self { splits, seed })
    }

    /// Build a pipeline from already encoded items.
    #[cfg(test)]
    pub fn from_items(splits: BTreeMap<String, Vec<GlueItem>>, seed: u64) -> Self {
        let splits = splits
            .into_iter()
            .map(|(name, items)| (name, Arc::new(GlueDataset::new(items))))
            .collect();
        Self { splits, seed }
    }

    pub fn num_examples(&self, split: &str) -> usize {
        self.splits.get(split).map_or(0, |d| d.len())
    }

    /// Lazy batch sequence over `split`.
    ///
    /// `training = true`: seeded shuffle, repeats forever with a fresh
    /// shuffle per pass. `training = false`: dataset order, exactly one
    /// pass. Either way the last batch of a pass may be short.
    pub fn get_inputs<B: Backend>(
        &self,
        split:      &str,
        batch_size: usize,
        training:   bool,
        device:     &B::Device,
    ) -> Result<BatchStream<B>> {
        let dataset = self
            .splits
            .get(split)
            .cloned()
            .ok_or_else(|| anyhow!("Split '{split}' is not part of the input pipeline"))?;

        Ok(BatchStream::new(
            dataset,
            GlueBatcher::new(device.clone()),
            batch_size,
            training,
            self.seed,
        ))
    }
}

// ─── BatchStream ──────────────────────────────────────────────────────────────
/// A Burn data loader plus the pass policy for one split.
pub struct BatchStream<B: Backend> {
    loader:   Option<Arc<dyn DataLoader<GlueBatch<B>>>>,
    training: bool,
}

impl<B: Backend> BatchStream<B> {
    fn new(dataset: Arc<GlueDataset>, batcher: GlueBatcher<B>, batch_size: usize, training: bool, seed: u64) -> Self {
        if batch_size == 0 || dataset.is_empty() {
            return Self { loader: None, training };
        }

        let builder = DataLoaderBuilder::<GlueItem, GlueBatch<B>>::new(batcher).batch_size(batch_size);
        let builder = if training { builder.shuffle(seed) } else { builder };
        Self { loader: Some(builder.build(dataset)), training }
    }

    /// Pull batches lazily. Each training pass reshuffles, and the
    /// last batch of a pass may be short.
    pub fn iter(&self) -> Box<dyn Iterator<Item = GlueBatch<B>> + '_> {
        match (&self.loader, self.training) {
            (None, _)             => Box::new(std::iter::empty()),
            (Some(loader), false) => Box::new(loader.iter()),
            (Some(loader), true)  => Box::new(std::iter::repeat_with(move || loader.iter()).flatten()),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::tokenizer_store::test_support::write_word_level_tokenizer;

    type TestBackend = burn::backend::NdArray;

    fn items(n: usize) -> Vec<GlueItem> {
        (0..n)
            .map(|i| GlueItem {
                input_ids:      vec![101, 200 + i as u32, 102],
                token_type_ids: vec![0, 0, 0],
                attention_mask: vec![1, 1, 1],
                label:          i % 2,
            })
            .collect()
    }

    fn pipeline(n: usize) -> InputPipeline {
        let mut splits = BTreeMap::new();
        splits.insert("train".to_string(), items(n));
        splits.insert("validation".to_string(), items(n));
        InputPipeline::from_items(splits, 42)
    }

    #[test]
    fn test_eval_stream_is_one_finite_pass() {
        let p      = pipeline(10);
        let device = Default::default();
        let sizes: Vec<usize> = p
            .get_inputs::<TestBackend>("validation", 4, false, &device)
            .unwrap()
            .iter()
            .map(|b| b.batch_size())
            .collect();
        assert_eq!(sizes, vec![4, 4, 2]);
    }

    #[test]
    fn test_eval_stream_keeps_dataset_order() {
        let p      = pipeline(5);
        let device = Default::default();
        let labels: Vec<i64> = p
            .get_inputs::<TestBackend>("validation", 5, false, &device)
            .unwrap()
            .iter()
            .flat_map(|b| b.labels.into_data().iter::<i64>().collect::<Vec<_>>())
            .collect();
        assert_eq!(labels, vec![0, 1, 0, 1, 0]);
    }

    #[test]
    fn test_training_stream_repeats_pass_after_pass() {
        let p      = pipeline(10);
        let device = Default::default();
        let sizes: Vec<usize> = p
            .get_inputs::<TestBackend>("train", 4, true, &device)
            .unwrap()
            .iter()
            .take(7)
            .map(|b| b.batch_size())
            .collect();
        assert_eq!(sizes, vec![4, 4, 2, 4, 4, 2, 4]);
    }

    #[test]
    fn test_training_stream_reshuffles_each_pass() {
        let p      = pipeline(32);
        let device = Default::default();
        let stream = p.get_inputs::<TestBackend>("train", 32, true, &device).unwrap();
        let passes: Vec<Vec<i64>> = stream
            .iter()
            .take(2)
            .map(|b| b.input_ids.slice([0..32, 1..2]).reshape([32]).into_data().iter::<i64>().collect())
            .collect();

        assert_ne!(passes[0], passes[1]);
        let (mut a, mut b) = (passes[0].clone(), passes[1].clone());
        a.sort_unstable();
        b.sort_unstable();
        assert_eq!(a, b);
    }

    #[test]
    fn test_training_stream_covers_every_example_per_pass() {
        let p      = pipeline(6);
        let device = Default::default();
        let mut ids: Vec<i64> = p
            .get_inputs::<TestBackend>("train", 3, true, &device)
            .unwrap()
            .iter()
            .take(2)
            .flat_map(|b| {
                let [n, s] = b.input_ids.dims();
                b.input_ids.reshape([n * s]).into_data().iter::<i64>().collect::<Vec<_>>()
            })
            .filter(|id| *id >= 200)
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![200, 201, 202, 203, 204, 205]);
    }

    #[test]
    fn test_empty_or_zero_batch_streams_are_exhausted() {
        let p      = pipeline(0);
        let device = Default::default();
        assert!(p.get_inputs::<TestBackend>("train", 4, true, &device).unwrap().iter().next().is_none());

        let p = pipeline(3);
        assert!(p.get_inputs::<TestBackend>("train", 0, true, &device).unwrap().iter().next().is_none());
        assert!(p.get_inputs::<TestBackend>("test", 2, false, &device).is_err());
    }

    #[test]
    fn test_encode_pair_example() {
        let dir       = tempfile::tempdir().unwrap();
        let tokenizer = write_word_level_tokenizer(dir.path(), &["the", "cat", "sat", "dog"]);

        let item = encode_example(&tokenizer, &GlueExample::pair(0, "The cat", "dog sat", 1)).unwrap();
        assert_eq!(item.input_ids.len(), 7);
        assert_eq!(item.input_ids[0], 101);
        assert_eq!(item.input_ids[6], 102);
        assert_eq!(item.token_type_ids, vec![0, 0, 0, 0, 1, 1, 1]);
        assert_eq!(item.label, 1);
    }
}
