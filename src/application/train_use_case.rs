// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a full fine-tuning run in order:
//
//   Step 1: Assemble the RunConfig          (Layer 2 - application)
//   Step 2: Load dataset splits             (Layer 4 - data)
//   Step 3: Load tokenizer + weights        (Layer 6 / 5)
//   Step 4: Build the input pipeline        (Layer 4 - data)
//   Step 5: Build model from pretrained     (Layer 5 - ml)
//   Step 6: Save config + tokenizer         (Layer 6 - infra)
//   Step 7: Run the training loop           (Layer 5 - ml)
//   Step 8: Save weights                    (Layer 6 - infra)
//   Step 9: Evaluate validation splits      (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::Result;
use burn::{module::AutodiffModule, tensor::backend::AutodiffBackend};
use tokenizers::Tokenizer;

use crate::application::run_config::{Overrides, RunConfig, RunPaths};
use crate::data::{loader::load_dataset, pipeline::InputPipeline};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::MetricsLogger,
    model_repo::{ModelRepository, CONFIG_FILE, WEIGHTS_FILE},
    tokenizer_store::{check_vocab, configure_parallelism, load_tokenizer, TOKENIZER_FILE},
};
use crate::ml::{
    evaluator::{run_evaluation, SplitScores},
    pretrained::{PretrainedConfig, PretrainedWeights},
    trainer::run_training,
    TrainBackend,
};

// ─── Resources ────────────────────────────────────────────────────────────────
/// Everything a run needs besides the config, loaded once up front.
pub struct Resources {
    pub tokenizer: Tokenizer,
    pub weights:   PretrainedWeights,
    pub pipeline:  InputPipeline,
}

impl Resources {
    pub fn load(cfg: &RunConfig, repo: &ModelRepository) -> Result<Self> {
        configure_parallelism(cfg.tokenizers_parallelism);

        // ── Step 2: Dataset splits ────────────────────────────────────────────
        let dataset = load_dataset(&cfg.paths.data_dir, &cfg.dataset_path, &cfg.dataset_name)?;

        // ── Step 3: Tokenizer + pretrained weights ────────────────────────────
        let model_name = &cfg.paths.model_name;
        let tokenizer  = load_tokenizer(&repo.file(model_name, TOKENIZER_FILE)?, cfg.max_seq_len)?;
        check_vocab(&tokenizer, cfg.model.vocab_size)?;
        let weights    = PretrainedWeights::from_file(&repo.file(model_name, WEIGHTS_FILE)?)?;

        // ── Step 4: Input pipeline ────────────────────────────────────────────
        let pipeline = InputPipeline::new(&dataset, &tokenizer, cfg.seed)?;

        Ok(Self { tokenizer, weights, pipeline })
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    paths:     RunPaths,
    overrides: Overrides,
}

impl TrainUseCase {
    pub fn new(paths: RunPaths, overrides: Overrides) -> Self {
        Self { paths, overrides }
    }

    /// Execute the full run on the default WGPU device.
    pub fn execute(&self) -> Result<Vec<SplitScores>> {
        let device = burn::backend::wgpu::WgpuDevice::default();
        tracing::info!("Using WGPU device: {:?}", device);
        self.run::<TrainBackend>(&device)
    }

    /// Step 1: defaults, overrides, task and pretrained config.
    pub fn assemble_config(&self, repo: &ModelRepository) -> Result<RunConfig> {
        let config_path = repo.file(&self.paths.model_name, CONFIG_FILE)?;
        let pretrained  = PretrainedConfig::from_file(&config_path)?;
        let cfg         = RunConfig::assemble(self.paths.clone(), &pretrained, &self.overrides)?;

        tracing::info!(
            "Run: {} on {}/{} (lr={}, batch={}, epochs={}, max_seq_len={})",
            cfg.paths.model_name, cfg.dataset_path, cfg.dataset_name,
            cfg.learning_rate, cfg.train_batch_size, cfg.num_train_epochs, cfg.max_seq_len,
        );
        Ok(cfg)
    }

    pub fn run<B: AutodiffBackend>(&self, device: &B::Device) -> Result<Vec<SplitScores>> {
        let repo      = ModelRepository::new(&self.paths.models_dir);
        let cfg       = self.assemble_config(&repo)?;
        let resources = Resources::load(&cfg, &repo)?;

        // ── Step 5: Model from pretrained weights ─────────────────────────────
        B::seed(cfg.seed);
        let model = resources.weights.apply(cfg.model.init::<B>(device), device)?;
        tracing::info!(
            "Model ready: {} layers, hidden={}, labels={}",
            cfg.model.num_hidden_layers, cfg.model.hidden_size, cfg.num_labels,
        );

        // ── Step 6: Output directory ──────────────────────────────────────────
        let ckpt = CheckpointManager::new(&cfg.paths.output_dir)?;
        ckpt.save_config(&cfg)?;
        ckpt.save_tokenizer(&resources.tokenizer)?;
        let logger = MetricsLogger::new(ckpt.dir())?;

        // ── Step 7: Training loop ─────────────────────────────────────────────
        let model = run_training(&cfg, model, &resources.pipeline, &logger, device)?;

        // ── Step 8: Save weights ──────────────────────────────────────────────
        ckpt.save_model(&model)?;
        tracing::info!("Checkpoint saved to '{}'", ckpt.dir().display());

        // ── Step 9: Evaluation (dropout off, no autodiff) ─────────────────────
        let model = model.valid();
        run_evaluation(&cfg, &model, &resources.pipeline, &logger, device)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::infra::tokenizer_store::test_support::write_word_level_tokenizer;
    use crate::ml::model::tests::tiny_config;
    use crate::ml::pretrained::tests::synthetic_weights;
    use safetensors::{tensor::TensorView, Dtype};
    use std::{fs, path::Path};

    type TestBackend = burn::backend::Autodiff<burn::backend::NdArray>;

    const WORDS: &[&str] = &["the", "cat", "sat", "on", "mat", "a", "dog", "ran", "away", "home"];

    /// A tiny model directory plus an MRPC-shaped dataset under `root`.
    pub(crate) fn write_tiny_run(root: &Path) -> RunPaths {
        let model_cfg = tiny_config();

        // ── models/tiny-bert ──
        let model_dir = root.join("models").join("tiny-bert");
        fs::create_dir_all(&model_dir).unwrap();
        let config = serde_json::json!({
            "vocab_size": model_cfg.vocab_size,
            "hidden_size": model_cfg.hidden_size,
            "num_hidden_layers": model_cfg.num_hidden_layers,
            "num_attention_heads": model_cfg.num_attention_heads,
            "intermediate_size": model_cfg.intermediate_size,
            "max_position_embeddings": model_cfg.max_position_embeddings,
            "type_vocab_size": model_cfg.type_vocab_size,
            "hidden_dropout_prob": 0.0,
            "attention_probs_dropout_prob": 0.0,
        });
        fs::write(model_dir.join(CONFIG_FILE), config.to_string()).unwrap();
        write_word_level_tokenizer(&model_dir, WORDS);

        let tensors = synthetic_weights(&model_cfg, "bert.");
        let bytes: Vec<(String, Vec<usize>, Vec<u8>)> = tensors
            .into_iter()
            .map(|(name, t)| (name, t.shape, t.values.iter().flat_map(|v| v.to_le_bytes()).collect()))
            .collect();
        let views: Vec<(String, TensorView)> = bytes
            .iter()
            .map(|(name, shape, data)| (name.clone(), TensorView::new(Dtype::F32, shape.clone(), data).unwrap()))
            .collect();
        fs::write(model_dir.join(WEIGHTS_FILE), safetensors::serialize(views, &None).unwrap()).unwrap();

        // ── data/glue/MRPC ──
        let task_dir = root.join("data").join("glue").join("MRPC");
        fs::create_dir_all(&task_dir).unwrap();
        let mut tsv = String::from("Quality\t#1 ID\t#2 ID\t#1 String\t#2 String\n");
        for i in 0..10 {
            let (a, b) = if i % 2 == 0 { ("the cat sat", "a cat sat on the mat") } else { ("the dog ran", "a cat went home") };
            tsv.push_str(&format!("{}\t{i}\t{}\t{a}\t{b}\n", i % 2, i + 100));
        }
        fs::write(task_dir.join("train.tsv"), &tsv).unwrap();
        fs::write(task_dir.join("dev.tsv"), &tsv).unwrap();

        RunPaths {
            model_name: "tiny-bert".to_string(),
            models_dir: root.join("models").display().to_string(),
            data_dir:   root.join("data").display().to_string(),
            output_dir: root.join("out").display().to_string(),
        }
    }

    pub(crate) fn tiny_overrides() -> Overrides {
        [("train_batch_size", "4"), ("eval_batch_size", "3"), ("num_train_epochs", "2"), ("max_seq_len", "16"), ("log_every", "2")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_end_to_end_run() {
        let dir    = tempfile::tempdir().unwrap();
        let paths  = write_tiny_run(dir.path());
        let device = Default::default();

        let results = TrainUseCase::new(paths.clone(), tiny_overrides())
            .run::<TestBackend>(&device)
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].examples, 10);
        let names: Vec<&str> = results[0].scores.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["accuracy", "f1"]);

        let out = Path::new(&paths.output_dir);
        assert!(out.join("run_config.json").is_file());
        assert!(out.join("tokenizer.json").is_file());
        assert!(out.join("model.mpk").is_file());

        // 10 examples × 2 epochs / 4 = 5 steps, progress after steps 0, 2, 4
        let metrics = fs::read_to_string(out.join("metrics.csv")).unwrap();
        assert_eq!(metrics.lines().count(), 4);
    }

    #[test]
    fn test_missing_model_is_error() {
        let dir       = tempfile::tempdir().unwrap();
        let mut paths = write_tiny_run(dir.path());
        paths.model_name = "missing-bert".to_string();

        let result = TrainUseCase::new(paths, Overrides::new()).run::<TestBackend>(&Default::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_override_is_error() {
        let dir   = tempfile::tempdir().unwrap();
        let paths = write_tiny_run(dir.path());
        let mut overrides = tiny_overrides();
        overrides.insert("batch".to_string(), "8".to_string());

        let use_case = TrainUseCase::new(paths.clone(), overrides);
        assert!(use_case.assemble_config(&ModelRepository::new(&paths.models_dir)).is_err());
    }

    #[test]
    fn test_tokenizer_outside_model_vocab_is_error() {
        let dir   = tempfile::tempdir().unwrap();
        let paths = write_tiny_run(dir.path());

        let config_path = Path::new(&paths.models_dir).join("tiny-bert").join(CONFIG_FILE);
        let mut config: serde_json::Value = serde_json::from_str(&fs::read_to_string(&config_path).unwrap()).unwrap();
        config["vocab_size"] = serde_json::json!(32);
        fs::write(&config_path, config.to_string()).unwrap();

        let err = TrainUseCase::new(paths, tiny_overrides())
            .run::<TestBackend>(&Default::default())
            .unwrap_err();
        assert!(err.to_string().contains("vocabulary"));
    }
}
