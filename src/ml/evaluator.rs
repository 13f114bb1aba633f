// ============================================================
// Layer 5 — Evaluation
// ============================================================
// Runs the fine-tuned classifier over every held-out split and
// reports GLUE metrics:
//
//   for split in task.validation_splits():
//       stats  = evaluate_batches(model, fresh one-pass stream)
//       metric.add_batch(stats.predictions, stats.labels)
//       scores = metric.compute()
//       print  "<prefix>_<metric> = <value>"
//
// The model passed in lives on the inner (non-autodiff) backend,
// obtained with `AutodiffModule::valid()`, so dropout is off.

use anyhow::Result;
use burn::prelude::*;

use crate::application::run_config::RunConfig;
use crate::data::{batcher::GlueBatch, pipeline::InputPipeline};
use crate::domain::traits::MetricAccumulator;
use crate::infra::metrics::{GlueMetric, MetricsLogger};
use crate::ml::model::GlueClassifier;

/// Predicted and gold class ids, one entry per evaluated example.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvalStats {
    pub predictions: Vec<usize>,
    pub labels:      Vec<usize>,
}

impl EvalStats {
    pub fn len(&self) -> usize {
        self.labels.len()
    }
}

/// Predictions and labels for a single batch.
pub fn eval_step<B: Backend>(model: &GlueClassifier<B>, batch: GlueBatch<B>) -> EvalStats {
    let batch_size = batch.batch_size();
    let labels     = batch.labels.clone();
    let logits     = model.forward(batch.input_ids, batch.token_type_ids, batch.attention_mask);

    // argmax(1) returns [batch, 1]
    let predicted = logits.argmax(1).reshape([batch_size]);

    EvalStats {
        predictions: to_class_ids(predicted),
        labels:      to_class_ids(labels),
    }
}

fn to_class_ids<B: Backend>(t: Tensor<B, 1, Int>) -> Vec<usize> {
    t.into_data()
        .iter::<i64>()
        .map(|v| v.max(0) as usize)
        .collect()
}

/// Fold `eval_step` over a whole batch sequence.
pub fn evaluate_batches<B, I>(model: &GlueClassifier<B>, batches: I) -> EvalStats
where
    B: Backend,
    I: IntoIterator<Item = GlueBatch<B>>,
{
    batches.into_iter().fold(EvalStats::default(), |mut acc, batch| {
        let step = eval_step(model, batch);
        acc.predictions.extend(step.predictions);
        acc.labels.extend(step.labels);
        acc
    })
}

// ─── Split driver ─────────────────────────────────────────────────────────────
/// `validation` → `eval`, `validation_matched` → `eval_matched`
pub fn split_prefix(split: &str) -> String {
    match split.strip_prefix("validation") {
        Some(rest) => format!("eval{rest}"),
        None       => split.to_string(),
    }
}

/// Scores computed for one split.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitScores {
    pub split:    String,
    pub prefix:   String,
    pub examples: usize,
    pub scores:   Vec<(String, f64)>,
}

impl SplitScores {
    /// Console lines: `eval_accuracy = 0.877451`
    pub fn lines(&self) -> Vec<String> {
        self.scores
            .iter()
            .map(|(name, value)| format!("{}_{} = {:.6}", self.prefix, name, value))
            .collect()
    }
}

/// Evaluate each split in turn; the metric is fed and read exactly
/// once per split.
pub fn evaluate_splits<F, M>(splits: &[&str], mut run_split: F, metric: &mut M) -> Result<Vec<SplitScores>>
where
    F: FnMut(&str) -> Result<EvalStats>,
    M: MetricAccumulator + ?Sized,
{
    let mut results = Vec::with_capacity(splits.len());
    for &split in splits {
        let stats = run_split(split)?;

        metric.add_batch(&stats.predictions, &stats.labels);
        results.push(SplitScores {
            split:    split.to_string(),
            prefix:   split_prefix(split),
            examples: stats.len(),
            scores:   metric.compute(),
        });
    }
    Ok(results)
}

/// Evaluate `model` on every validation split of the configured task,
/// printing `<prefix>_<metric>` lines and appending them to the eval CSV.
pub fn run_evaluation<B: Backend>(
    cfg:      &RunConfig,
    model:    &GlueClassifier<B>,
    pipeline: &InputPipeline,
    logger:   &MetricsLogger,
    device:   &B::Device,
) -> Result<Vec<SplitScores>> {
    let task       = cfg.task()?;
    let mut metric = GlueMetric::for_task(task);

    let results = evaluate_splits(
        task.validation_splits(),
        |split| {
            let stream = pipeline.get_inputs::<B>(split, cfg.eval_batch_size, false, device)?;
            Ok(evaluate_batches(model, stream.iter()))
        },
        &mut metric,
    )?;

    for split in &results {
        tracing::info!("Evaluated split '{}' ({} examples)", split.split, split.examples);
        for line in split.lines() {
            println!("{line}");
        }
        for (name, value) in &split.scores {
            logger.log_eval(&split.prefix, name, *value)?;
        }
    }
    Ok(results)
}
