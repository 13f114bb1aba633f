// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `train`    — fine-tunes a pretrained encoder, then evaluates
//   2. `evaluate` — re-evaluates a saved checkpoint
//   3. `predict`  — classifies one input with a saved checkpoint
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, PredictArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "glue-finetune",
    version,
    about = "Fine-tune a pretrained BERT encoder on a GLUE task and report its metrics."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
            Commands::Predict(args)  => run_predict(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let (paths, overrides) = args.into_request()?;
    tracing::info!("Fine-tuning '{}' (models in '{}')", paths.model_name, paths.models_dir);

    let output_dir = paths.output_dir.clone();
    TrainUseCase::new(paths, overrides).execute()?;

    println!("Training complete. Checkpoint saved to '{output_dir}'.");
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::eval_use_case::EvalUseCase;

    tracing::info!("Evaluating checkpoint in '{}'", args.checkpoint_dir);
    EvalUseCase::new(args.checkpoint_dir, args.data_dir).execute()?;
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    use crate::application::predict_use_case::PredictUseCase;

    let use_case   = PredictUseCase::new(&args.checkpoint_dir)?;
    let prediction = use_case.predict(&args.text_a, args.text_b.as_deref())?;

    println!(
        "\n[{}] {} (class {}, p={:.4})",
        use_case.task_name(),
        prediction.label,
        prediction.label_id,
        prediction.probability
    );
    Ok(())
}
