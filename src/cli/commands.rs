// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `train`, `evaluate` and
// `predict`, and all their configurable flags.
//
// Hyperparameter flags are optional: only the ones actually
// given become overrides, everything else keeps the defaults
// assembled in the application layer. Any recognised key can
// also be passed as a repeatable `--set key=value`.
//
// Reference: Rust Book §12 (Building a CLI Program)

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::application::run_config::{parse_overrides, Overrides, RunPaths};

/// The top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fine-tune a pretrained encoder on a GLUE task, then evaluate it
    Train(TrainArgs),

    /// Evaluate a saved checkpoint on the task's validation splits
    Evaluate(EvaluateArgs),

    /// Classify a sentence (or sentence pair) with a saved checkpoint
    Predict(PredictArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Pretrained model identifier or directory
    #[arg(long, default_value = "bert-base-uncased")]
    pub model: String,

    /// Directory holding pretrained model directories
    #[arg(long, default_value = "models")]
    pub models_dir: String,

    /// Root of the GLUE data (expects <data_dir>/glue/<TASK>/*.tsv)
    #[arg(long, default_value = "data")]
    pub data_dir: String,

    /// Where weights, config, tokenizer and CSV logs are written
    #[arg(long, default_value = "checkpoints")]
    pub output_dir: String,

    /// Dataset collection (only `glue`)
    #[arg(long)]
    pub dataset_path: Option<String>,

    /// GLUE task: cola, sst2, mrpc, qqp, mnli, qnli, rte, wnli
    #[arg(long)]
    pub dataset_name: Option<String>,

    #[arg(long)]
    pub train_batch_size: Option<usize>,

    #[arg(long)]
    pub eval_batch_size: Option<usize>,

    /// Peak learning rate
    #[arg(long)]
    pub learning_rate: Option<f64>,

    #[arg(long)]
    pub num_train_epochs: Option<usize>,

    /// Maximum tokens per (pair) input, capped at the model's position limit
    #[arg(long)]
    pub max_seq_len: Option<usize>,

    /// constant, linear or cosine
    #[arg(long)]
    pub lr_schedule: Option<String>,

    #[arg(long)]
    pub warmup_steps: Option<usize>,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Extra overrides, e.g. `--set weight_decay=0.0`
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,
}

impl TrainArgs {
    /// Split the arguments into paths and a flat override map.
    /// Explicit flags win over `--set` pairs for the same key.
    pub fn into_request(self) -> Result<(RunPaths, Overrides)> {
        let mut overrides = parse_overrides(self.set.iter().map(String::as_str))?;

        let flags: [(&str, Option<String>); 10] = [
            ("dataset_path",     self.dataset_path),
            ("dataset_name",     self.dataset_name),
            ("train_batch_size", self.train_batch_size.map(|v| v.to_string())),
            ("eval_batch_size",  self.eval_batch_size.map(|v| v.to_string())),
            ("learning_rate",    self.learning_rate.map(|v| v.to_string())),
            ("num_train_epochs", self.num_train_epochs.map(|v| v.to_string())),
            ("max_seq_len",      self.max_seq_len.map(|v| v.to_string())),
            ("lr_schedule",      self.lr_schedule),
            ("warmup_steps",     self.warmup_steps.map(|v| v.to_string())),
            ("seed",             self.seed.map(|v| v.to_string())),
        ];
        for (key, value) in flags {
            if let Some(value) = value {
                overrides.insert(key.to_string(), value);
            }
        }

        let paths = RunPaths {
            model_name: self.model,
            models_dir: self.models_dir,
            data_dir:   self.data_dir,
            output_dir: self.output_dir,
        };
        Ok((paths, overrides))
    }
}

/// All arguments for the `evaluate` command
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Directory written by `train`
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// GLUE data root; defaults to the one used for training
    #[arg(long)]
    pub data_dir: Option<String>,
}

/// All arguments for the `predict` command
#[derive(Args, Debug)]
pub struct PredictArgs {
    /// First (or only) sentence
    #[arg(long)]
    pub text_a: String,

    /// Second sentence, for pair tasks
    #[arg(long)]
    pub text_b: Option<String>,

    /// Directory written by `train`
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn train_args(argv: &[&str]) -> TrainArgs {
        let cli = Cli::try_parse_from(std::iter::once("glue-finetune").chain(argv.iter().copied())).unwrap();
        match cli.command {
            Commands::Train(args) => args,
            other => panic!("expected train, got {other:?}"),
        }
    }

    #[test]
    fn test_only_given_flags_become_overrides() {
        let (paths, overrides) = train_args(&["train", "--dataset-name", "rte", "--learning-rate", "3e-5"])
            .into_request()
            .unwrap();

        assert_eq!(paths.model_name, "bert-base-uncased");
        assert_eq!(overrides.len(), 2);
        assert_eq!(overrides["dataset_name"], "rte");
        assert_eq!(overrides["learning_rate"].parse::<f64>().unwrap(), 3e-5);
    }

    #[test]
    fn test_flags_win_over_set_pairs() {
        let (_, overrides) = train_args(&[
            "train", "--set", "seed=1", "--set", "weight_decay=0.0", "--seed", "7",
        ])
        .into_request()
        .unwrap();

        assert_eq!(overrides["seed"], "7");
        assert_eq!(overrides["weight_decay"], "0.0");
    }

    #[test]
    fn test_malformed_set_is_error() {
        assert!(train_args(&["train", "--set", "seed"]).into_request().is_err());
    }

    #[test]
    fn test_predict_args() {
        let cli = Cli::try_parse_from(["glue-finetune", "predict", "--text-a", "A man walks.", "--text-b", "Someone moves."]).unwrap();
        match cli.command {
            Commands::Predict(args) => {
                assert_eq!(args.text_b.as_deref(), Some("Someone moves."));
                assert_eq!(args.checkpoint_dir, "checkpoints");
            }
            other => panic!("expected predict, got {other:?}"),
        }
    }
}
