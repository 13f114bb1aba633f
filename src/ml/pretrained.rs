// ============================================================
// Layer 5 — Pretrained BERT Weights
// ============================================================
// Reads a HuggingFace BERT checkpoint (`config.json` +
// `model.safetensors`) and copies its tensors into a freshly
// initialised GlueClassifier.
//
// Tensor naming (prefix `bert.` optional):
//   embeddings.{word,position,token_type}_embeddings.weight
//   embeddings.LayerNorm.{weight,bias}
//   encoder.layer.{i}.attention.self.{query,key,value}.{weight,bias}
//   encoder.layer.{i}.attention.output.dense.{weight,bias}
//   encoder.layer.{i}.attention.output.LayerNorm.{weight,bias}
//   encoder.layer.{i}.intermediate.dense.{weight,bias}
//   encoder.layer.{i}.output.dense.{weight,bias}
//   encoder.layer.{i}.output.LayerNorm.{weight,bias}
//   pooler.dense.{weight,bias}
//   classifier.{weight,bias}              (optional)
//
// PyTorch stores linear weights as [out, in]; Burn's Linear
// expects [in, out], so every dense weight is transposed.
// Older checkpoints call LayerNorm parameters gamma/beta.

use anyhow::{anyhow, bail, Context, Result};
use burn::{
    module::Param,
    nn::{Embedding, LayerNorm, Linear},
    prelude::*,
};
use safetensors::{Dtype, SafeTensors};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::Path};

use crate::ml::model::{BertLayer, GlueClassifier, GlueClassifierConfig};

// ─── config.json ──────────────────────────────────────────────────────────────
/// The fields of a HuggingFace BERT `config.json` this crate uses.
/// Missing fields fall back to bert-base values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PretrainedConfig {
    pub vocab_size:                   usize,
    pub hidden_size:                  usize,
    pub num_hidden_layers:            usize,
    pub num_attention_heads:          usize,
    pub intermediate_size:            usize,
    pub hidden_dropout_prob:          f64,
    pub attention_probs_dropout_prob: f64,
    pub max_position_embeddings:      usize,
    pub type_vocab_size:              usize,
    pub layer_norm_eps:               f64,
}

impl Default for PretrainedConfig {
    fn default() -> Self {
        Self {
            vocab_size:                   30522,
            hidden_size:                  768,
            num_hidden_layers:            12,
            num_attention_heads:          12,
            intermediate_size:            3072,
            hidden_dropout_prob:          0.1,
            attention_probs_dropout_prob: 0.1,
            max_position_embeddings:      512,
            type_vocab_size:              2,
            layer_norm_eps:               1e-12,
        }
    }
}

impl PretrainedConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read model config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_str(&json)
            .with_context(|| format!("Invalid model config '{}'", path.display()))?;

        if cfg.num_attention_heads == 0 || cfg.hidden_size % cfg.num_attention_heads != 0 {
            bail!(
                "hidden_size ({}) must be divisible by num_attention_heads ({})",
                cfg.hidden_size,
                cfg.num_attention_heads
            );
        }
        Ok(cfg)
    }

    pub fn to_model_config(&self, num_labels: usize) -> GlueClassifierConfig {
        GlueClassifierConfig::new(
            self.vocab_size,
            self.hidden_size,
            self.num_hidden_layers,
            self.num_attention_heads,
            self.intermediate_size,
            self.max_position_embeddings,
            self.type_vocab_size,
            num_labels,
        )
        .with_hidden_dropout_prob(self.hidden_dropout_prob)
        .with_attention_dropout_prob(self.attention_probs_dropout_prob)
        .with_layer_norm_eps(self.layer_norm_eps)
    }
}

// ─── Weights ──────────────────────────────────────────────────────────────────
/// One pretrained tensor, decoded to f32.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightTensor {
    /// Dimensions as stored, PyTorch `[out, in]` for linear weights
    pub shape:  Vec<usize>,
    /// Row-major values
    pub values: Vec<f32>,
}

/// Pretrained tensors by name. Read once, never modified.
#[derive(Debug, Clone, Default)]
pub struct PretrainedWeights {
    tensors: HashMap<String, WeightTensor>,
}

impl PretrainedWeights {
    pub fn from_tensors(tensors: HashMap<String, WeightTensor>) -> Self {
        Self { tensors }
    }

    /// Read every tensor of a `.safetensors` file as f32.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .with_context(|| format!("Cannot read pretrained weights '{}'", path.display()))?;
        let st = SafeTensors::deserialize(&bytes)
            .map_err(|e| anyhow!("Invalid safetensors file '{}': {e}", path.display()))?;

        let mut tensors = HashMap::new();
        for (name, view) in st.tensors() {
            let values = decode_f32(view.dtype(), view.data())
                .with_context(|| format!("Tensor '{name}'"))?;
            tensors.insert(name, WeightTensor { shape: view.shape().to_vec(), values });
        }

        tracing::info!("Read {} pretrained tensors from '{}'", tensors.len(), path.display());
        Ok(Self { tensors })
    }

    fn find(&self, name: &str) -> Option<&WeightTensor> {
        let mut candidates = vec![name.to_string(), format!("bert.{name}")];
        if let Some(stem) = name.strip_suffix("LayerNorm.weight") {
            candidates.push(format!("{stem}LayerNorm.gamma"));
            candidates.push(format!("bert.{stem}LayerNorm.gamma"));
        }
        if let Some(stem) = name.strip_suffix("LayerNorm.bias") {
            candidates.push(format!("{stem}LayerNorm.beta"));
            candidates.push(format!("bert.{stem}LayerNorm.beta"));
        }
        candidates.iter().find_map(|c| self.tensors.get(c))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    fn tensor<B: Backend, const D: usize>(
        &self,
        name:     &str,
        expected: [usize; D],
        device:   &B::Device,
    ) -> Result<Tensor<B, D>> {
        let weight = self
            .find(name)
            .ok_or_else(|| anyhow!("Pretrained tensor '{name}' is missing"))?;

        if weight.shape.as_slice() != expected.as_slice() {
            bail!(
                "Pretrained tensor '{name}' has shape {:?}, expected {:?}",
                weight.shape,
                expected
            );
        }
        Ok(Tensor::from_data(TensorData::new(weight.values.clone(), expected), device))
    }

    fn embedding<B: Backend>(
        &self,
        mut emb: Embedding<B>,
        name:    &str,
        device:  &B::Device,
    ) -> Result<Embedding<B>> {
        let dims = emb.weight.val().dims();
        emb.weight = Param::from_tensor(self.tensor(&format!("{name}.weight"), dims, device)?);
        Ok(emb)
    }

    fn linear<B: Backend>(
        &self,
        mut layer: Linear<B>,
        name:      &str,
        device:    &B::Device,
    ) -> Result<Linear<B>> {
        let [d_in, d_out] = layer.weight.val().dims();
        let weight = self
            .tensor::<B, 2>(&format!("{name}.weight"), [d_out, d_in], device)?
            .transpose();
        let bias = self.tensor::<B, 1>(&format!("{name}.bias"), [d_out], device)?;

        layer.weight = Param::from_tensor(weight);
        layer.bias   = Some(Param::from_tensor(bias));
        Ok(layer)
    }

    fn layer_norm<B: Backend>(
        &self,
        mut norm: LayerNorm<B>,
        name:     &str,
        device:   &B::Device,
    ) -> Result<LayerNorm<B>> {
        let dims = norm.gamma.val().dims();
        norm.gamma = Param::from_tensor(self.tensor(&format!("{name}.weight"), dims, device)?);
        norm.beta  = Param::from_tensor(self.tensor(&format!("{name}.bias"), dims, device)?);
        Ok(norm)
    }

    /// Copy the pretrained tensors into `model`, returning the initialised model.
    pub fn apply<B: Backend>(
        &self,
        model:  GlueClassifier<B>,
        device: &B::Device,
    ) -> Result<GlueClassifier<B>> {
        let GlueClassifier { mut embeddings, layers, pooler, classifier, dropout } = model;

        embeddings.word_embeddings       = self.embedding(embeddings.word_embeddings, "embeddings.word_embeddings", device)?;
        embeddings.position_embeddings   = self.embedding(embeddings.position_embeddings, "embeddings.position_embeddings", device)?;
        embeddings.token_type_embeddings = self.embedding(embeddings.token_type_embeddings, "embeddings.token_type_embeddings", device)?;
        embeddings.norm                  = self.layer_norm(embeddings.norm, "embeddings.LayerNorm", device)?;

        let layers = layers
            .into_iter()
            .enumerate()
            .map(|(i, mut layer)| -> Result<BertLayer<B>> {
                let p = format!("encoder.layer.{i}");
                let a = &mut layer.attention;
                a.query  = self.linear(a.query.clone(), &format!("{p}.attention.self.query"), device)?;
                a.key    = self.linear(a.key.clone(), &format!("{p}.attention.self.key"), device)?;
                a.value  = self.linear(a.value.clone(), &format!("{p}.attention.self.value"), device)?;
                a.output = self.linear(a.output.clone(), &format!("{p}.attention.output.dense"), device)?;
                a.norm   = self.layer_norm(a.norm.clone(), &format!("{p}.attention.output.LayerNorm"), device)?;

                layer.intermediate = self.linear(layer.intermediate, &format!("{p}.intermediate.dense"), device)?;
                layer.output       = self.linear(layer.output, &format!("{p}.output.dense"), device)?;
                layer.norm         = self.layer_norm(layer.norm, &format!("{p}.output.LayerNorm"), device)?;
                Ok(layer)
            })
            .collect::<Result<Vec<_>>>()?;

        let pooler = self.linear(pooler, "pooler.dense", device)?;

        let classifier = if self.contains("classifier.weight") {
            self.linear(classifier, "classifier", device)?
        } else {
            tracing::info!("No pretrained classifier head; keeping random initialisation");
            classifier
        };

        Ok(GlueClassifier { embeddings, layers, pooler, classifier, dropout })
    }
}

fn decode_f32(dtype: Dtype, data: &[u8]) -> Result<Vec<f32>> {
    let values = match dtype {
        Dtype::F32 => data
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
        Dtype::F16 => data
            .chunks_exact(2)
            .map(|b| half::f16::from_le_bytes([b[0], b[1]]).to_f32())
            .collect(),
        Dtype::BF16 => data
            .chunks_exact(2)
            .map(|b| half::bf16::from_le_bytes([b[0], b[1]]).to_f32())
            .collect(),
        other => bail!("unsupported dtype {other:?}"),
    };
    Ok(values)
}
