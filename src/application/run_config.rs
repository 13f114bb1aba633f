// ============================================================
// Layer 2 — Run Configuration
// ============================================================
// One immutable record per run, assembled in three passes:
//
//   1. built-in defaults          (batch sizes, lr, epochs, …)
//   2. flat `key=value` overrides  (CLI flags and --set pairs)
//   3. task + pretrained defaults  (labels, fields, model shape)
//
// The result is saved with the checkpoint so `evaluate` and
// `predict` can rebuild the exact same model later.

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, str::FromStr};

use crate::domain::task::{GlueTask, GLUE_PATH};
use crate::ml::model::GlueClassifierConfig;
use crate::ml::pretrained::PretrainedConfig;
use crate::ml::schedule::{LearningRateSchedule, ScheduleKind};

/// Flat override map, keyed by configuration field name.
pub type Overrides = BTreeMap<String, String>;

/// Recognised override keys
pub const OVERRIDE_KEYS: &[&str] = &[
    "train_batch_size",
    "eval_batch_size",
    "learning_rate",
    "num_train_epochs",
    "dataset_path",
    "dataset_name",
    "max_seq_len",
    "warmup_steps",
    "lr_schedule",
    "weight_decay",
    "max_grad_norm",
    "seed",
    "log_every",
    "tokenizers_parallelism",
];

/// Locations a run reads from and writes to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunPaths {
    pub model_name: String,
    pub models_dir: String,
    pub data_dir:   String,
    pub output_dir: String,
}

impl Default for RunPaths {
    fn default() -> Self {
        Self {
            model_name: "bert-base-uncased".to_string(),
            models_dir: "models".to_string(),
            data_dir:   "data".to_string(),
            output_dir: "checkpoints".to_string(),
        }
    }
}

/// Everything one fine-tuning run needs, fixed once assembled.
/// Saved as `run_config.json` next to the checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(flatten)]
    pub paths: RunPaths,

    // ── Dataset ──
    /// Dataset collection, always `glue`
    pub dataset_path: String,
    /// GLUE task name, e.g. `mrpc`
    pub dataset_name: String,
    /// Token cap per (pair) input, never above the model's position limit
    pub max_seq_len:  usize,

    // ── Optimisation ──
    /// Examples per training step
    pub train_batch_size: usize,
    /// Examples per evaluation batch
    pub eval_batch_size:  usize,
    /// Peak learning rate, reached after warmup
    pub learning_rate:    f64,
    /// Passes over the training split, used to size the step budget
    pub num_train_epochs: usize,
    /// Steps of linear warmup from 0 to `learning_rate`
    pub warmup_steps:     usize,
    /// Decay shape after warmup
    pub lr_schedule:      ScheduleKind,
    /// AdamW decoupled weight decay
    pub weight_decay:     f64,
    /// Gradient norm clipping threshold
    pub max_grad_norm:    f64,
    /// Seeds the backend and the training shuffle
    pub seed:             u64,

    // ── Runtime ──
    /// Print a progress line every this many steps
    pub log_every:              usize,
    /// Value written to `TOKENIZERS_PARALLELISM`
    pub tokenizers_parallelism: bool,

    // ── Derived from task + pretrained model ──
    /// Size of the classification head
    pub num_labels:   usize,
    /// Human-readable name of each class id
    pub label_names:  Vec<String>,
    /// Column name of the first input sentence
    pub text_a_field: String,
    /// Column name of the second sentence, for pair tasks
    pub text_b_field: Option<String>,
    /// Encoder architecture plus `num_labels`
    pub model:        GlueClassifierConfig,
}

impl RunConfig {
    /// Defaults → overrides → task and model derived fields.
    pub fn assemble(paths: RunPaths, pretrained: &PretrainedConfig, overrides: &Overrides) -> Result<Self> {
        let mut cfg = Self::with_defaults(paths, pretrained);
        for (key, value) in overrides {
            cfg.set(key, value)?;
        }

        let task = cfg.task()?;
        cfg.num_labels   = task.num_labels();
        cfg.label_names  = task.label_names().iter().map(|s| s.to_string()).collect();
        let (a, b)       = task.input_fields();
        cfg.text_a_field = a.to_string();
        cfg.text_b_field = b.map(str::to_string);
        cfg.model        = pretrained.to_model_config(cfg.num_labels);

        if cfg.max_seq_len > pretrained.max_position_embeddings {
            tracing::warn!(
                "max_seq_len {} exceeds max_position_embeddings {}, capping",
                cfg.max_seq_len,
                pretrained.max_position_embeddings
            );
            cfg.max_seq_len = pretrained.max_position_embeddings;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    fn with_defaults(paths: RunPaths, pretrained: &PretrainedConfig) -> Self {
        Self {
            paths,
            dataset_path:           GLUE_PATH.to_string(),
            dataset_name:           "mrpc".to_string(),
            max_seq_len:            128,
            train_batch_size:       32,
            eval_batch_size:        8,
            learning_rate:          2e-5,
            num_train_epochs:       3,
            warmup_steps:           0,
            lr_schedule:            ScheduleKind::Linear,
            weight_decay:           0.01,
            max_grad_norm:          1.0,
            seed:                   42,
            log_every:              10,
            tokenizers_parallelism: false,
            num_labels:             0,
            label_names:            Vec::new(),
            text_a_field:           String::new(),
            text_b_field:           None,
            model:                  pretrained.to_model_config(0),
        }
    }

    /// Apply a single `key=value` override.
    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "train_batch_size"       => self.train_batch_size       = parse(key, value)?,
            "eval_batch_size"        => self.eval_batch_size        = parse(key, value)?,
            "learning_rate"          => self.learning_rate          = parse(key, value)?,
            "num_train_epochs"       => self.num_train_epochs       = parse(key, value)?,
            "dataset_path"           => self.dataset_path           = value.to_string(),
            "dataset_name"           => self.dataset_name           = value.to_string(),
            "max_seq_len"            => self.max_seq_len            = parse(key, value)?,
            "warmup_steps"           => self.warmup_steps           = parse(key, value)?,
            "lr_schedule"            => self.lr_schedule            = parse(key, value)?,
            "weight_decay"           => self.weight_decay           = parse(key, value)?,
            "max_grad_norm"          => self.max_grad_norm          = parse(key, value)?,
            "seed"                   => self.seed                   = parse(key, value)?,
            "log_every"              => self.log_every              = parse(key, value)?,
            "tokenizers_parallelism" => self.tokenizers_parallelism = parse(key, value)?,
            other => bail!(
                "Unknown configuration key '{other}' (known: {})",
                OVERRIDE_KEYS.join(", ")
            ),
        }
        tracing::debug!("Override {key} = {value}");
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.train_batch_size == 0 || self.eval_batch_size == 0 {
            bail!("Batch sizes must be positive");
        }
        if self.log_every == 0 {
            bail!("log_every must be positive");
        }
        if !(self.learning_rate > 0.0) {
            bail!("learning_rate must be positive, got {}", self.learning_rate);
        }
        if self.max_seq_len == 0 {
            bail!("max_seq_len must be positive");
        }
        Ok(())
    }

    pub fn task(&self) -> Result<GlueTask> {
        GlueTask::lookup(&self.dataset_path, &self.dataset_name)
    }

    pub fn schedule(&self, total_steps: usize) -> LearningRateSchedule {
        LearningRateSchedule::new(self.lr_schedule, self.learning_rate, self.warmup_steps, total_steps)
    }

    pub fn label_name(&self, id: usize) -> &str {
        self.label_names.get(id).map_or("unknown", String::as_str)
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| anyhow!("Invalid value '{value}' for '{key}': {e}"))
}

/// Split `key=value` strings into an override map. Later pairs win.
pub fn parse_overrides<'a>(pairs: impl IntoIterator<Item = &'a str>) -> Result<Overrides> {
    let mut map = Overrides::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("Expected key=value, got '{pair}'"))?;
        map.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(map)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn overrides(pairs: &[(&str, &str)]) -> Overrides {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_defaults_for_mrpc() {
        let cfg = RunConfig::assemble(RunPaths::default(), &PretrainedConfig::default(), &Overrides::new()).unwrap();

        assert_eq!(cfg.task().unwrap(), GlueTask::Mrpc);
        assert_eq!(cfg.train_batch_size, 32);
        assert_eq!(cfg.eval_batch_size, 8);
        assert_eq!(cfg.learning_rate, 2e-5);
        assert_eq!(cfg.num_train_epochs, 3);
        assert_eq!(cfg.num_labels, 2);
        assert_eq!(cfg.model.num_labels, 2);
        assert_eq!(cfg.text_a_field, "sentence1");
        assert_eq!(cfg.text_b_field.as_deref(), Some("sentence2"));
    }

    #[test]
    fn test_overrides_apply() {
        let ov = overrides(&[
            ("train_batch_size", "16"),
            ("learning_rate", "3e-5"),
            ("num_train_epochs", "1"),
            ("dataset_name", "mnli"),
            ("lr_schedule", "cosine"),
        ]);
        let cfg = RunConfig::assemble(RunPaths::default(), &PretrainedConfig::default(), &ov).unwrap();

        assert_eq!(cfg.train_batch_size, 16);
        assert_eq!(cfg.learning_rate, 3e-5);
        assert_eq!(cfg.num_train_epochs, 1);
        assert_eq!(cfg.num_labels, 3);
        assert_eq!(cfg.label_names, vec!["entailment", "neutral", "contradiction"]);
        assert_eq!(cfg.lr_schedule, ScheduleKind::Cosine);
    }

    #[test]
    fn test_rejects_bad_overrides() {
        let base = PretrainedConfig::default();
        for ov in [
            overrides(&[("batch", "8")]),
            overrides(&[("train_batch_size", "eight")]),
            overrides(&[("train_batch_size", "0")]),
            overrides(&[("log_every", "0")]),
            overrides(&[("learning_rate", "-1e-5")]),
            overrides(&[("dataset_name", "stsb")]),
            overrides(&[("dataset_path", "super_glue")]),
        ] {
            assert!(RunConfig::assemble(RunPaths::default(), &base, &ov).is_err(), "{ov:?}");
        }
    }

    #[test]
    fn test_max_seq_len_is_capped() {
        let pretrained = PretrainedConfig { max_position_embeddings: 64, ..Default::default() };
        let cfg = RunConfig::assemble(RunPaths::default(), &pretrained, &Overrides::new()).unwrap();
        assert_eq!(cfg.max_seq_len, 64);
    }

    #[test]
    fn test_parse_overrides() {
        let map = parse_overrides(["seed=7", "seed = 9", "lr_schedule=constant"]).unwrap();
        assert_eq!(map["seed"], "9");
        assert_eq!(map["lr_schedule"], "constant");
        assert!(parse_overrides(["no_equals"]).is_err());
    }
}
