// ============================================================
// Layer 6 — Metrics
// ============================================================
// Two concerns live here:
//
//   GlueMetric    — turns predictions + gold labels into the
//                   scores GLUE reports for each task
//                   (accuracy, binary F1, Matthews correlation)
//
//   MetricsLogger — appends training progress and evaluation
//                   scores to CSV files in the output directory
//
// Output files:
//   checkpoints/metrics.csv       step,learning_rate,loss
//   checkpoints/eval_results.csv  split,metric,value
//
// Reference: Matthews (1975); Wang et al. (2018) GLUE benchmark

use anyhow::Result;
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

use crate::domain::task::{GlueTask, MetricKind};
use crate::domain::traits::MetricAccumulator;

// ─── GlueMetric ───────────────────────────────────────────────────────────────
/// Accumulates predictions for one task and computes its GLUE scores.
#[derive(Debug, Clone)]
pub struct GlueMetric {
    kind:        MetricKind,
    predictions: Vec<usize>,
    references:  Vec<usize>,
}

impl GlueMetric {
    pub fn for_task(task: GlueTask) -> Self {
        Self::new(task.metric_kind())
    }

    pub fn new(kind: MetricKind) -> Self {
        Self { kind, predictions: Vec::new(), references: Vec::new() }
    }
}

impl MetricAccumulator for GlueMetric {
    fn add_batch(&mut self, predictions: &[usize], references: &[usize]) {
        self.predictions.extend_from_slice(predictions);
        self.references.extend_from_slice(references);
    }

    fn compute(&mut self) -> Vec<(String, f64)> {
        let preds = std::mem::take(&mut self.predictions);
        let refs  = std::mem::take(&mut self.references);

        match self.kind {
            MetricKind::Accuracy => vec![("accuracy".to_string(), accuracy(&preds, &refs))],
            MetricKind::AccuracyAndF1 => vec![
                ("accuracy".to_string(), accuracy(&preds, &refs)),
                ("f1".to_string(), binary_f1(&preds, &refs)),
            ],
            MetricKind::MatthewsCorrelation => vec![
                ("matthews_correlation".to_string(), matthews_correlation(&preds, &refs)),
            ],
        }
    }
}

/// Binary confusion counts with class 1 as the positive class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Confusion {
    pub tp: usize,
    pub tn: usize,
    pub fp: usize,
    pub fn_: usize,
}

impl Confusion {
    pub fn from_pairs(preds: &[usize], refs: &[usize]) -> Self {
        preds.iter().zip(refs).fold(Self::default(), |mut c, (&p, &r)| {
            match (p == 1, r == 1) {
                (true, true)   => c.tp += 1,
                (false, false) => c.tn += 1,
                (true, false)  => c.fp += 1,
                (false, true)  => c.fn_ += 1,
            }
            c
        })
    }
}

pub fn accuracy(preds: &[usize], refs: &[usize]) -> f64 {
    let total = preds.len().min(refs.len());
    if total == 0 {
        return 0.0;
    }
    let correct = preds.iter().zip(refs).filter(|(p, r)| p == r).count();
    correct as f64 / total as f64
}

/// F1 of the positive class; 0 when nothing is positive in either list.
pub fn binary_f1(preds: &[usize], refs: &[usize]) -> f64 {
    let c     = Confusion::from_pairs(preds, refs);
    let denom = 2 * c.tp + c.fp + c.fn_;
    if denom == 0 {
        return 0.0;
    }
    (2 * c.tp) as f64 / denom as f64
}

/// Matthews correlation coefficient; 0 when any marginal is empty.
pub fn matthews_correlation(preds: &[usize], refs: &[usize]) -> f64 {
    let c = Confusion::from_pairs(preds, refs);
    let (tp, tn, fp, fn_) = (c.tp as f64, c.tn as f64, c.fp as f64, c.fn_ as f64);

    let denom = ((tp + fp) * (tp + fn_) * (tn + fp) * (tn + fn_)).sqrt();
    if denom == 0.0 {
        return 0.0;
    }
    (tp * tn - fp * fn_) / denom
}

// ─── MetricsLogger ────────────────────────────────────────────────────────────
/// One progress row of the training loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepMetrics {
    /// Zero-based optimiser step
    pub step:          usize,
    /// Learning rate the step was taken with
    pub learning_rate: f64,
    /// Training loss of the step's batch
    pub loss:          f64,
}

impl StepMetrics {
    pub fn new(step: usize, learning_rate: f64, loss: f64) -> Self {
        Self { step, learning_rate, loss }
    }
}

/// Appends progress and evaluation rows to CSV files.
pub struct MetricsLogger {
    steps_path: PathBuf,
    eval_path:  PathBuf,
}

impl MetricsLogger {
    /// Create the directory and write CSV headers for files that don't exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let steps_path = dir.join("metrics.csv");
        let eval_path  = dir.join("eval_results.csv");

        write_header(&steps_path, "step,learning_rate,loss")?;
        write_header(&eval_path, "split,metric,value")?;

        Ok(Self { steps_path, eval_path })
    }

    pub fn log(&self, m: &StepMetrics) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.steps_path)?;
        writeln!(f, "{},{:.8e},{:.6}", m.step, m.learning_rate, m.loss)?;
        Ok(())
    }

    pub fn log_eval(&self, split: &str, metric: &str, value: f64) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.eval_path)?;
        writeln!(f, "{split},{metric},{value:.6}")?;
        Ok(())
    }

    #[cfg(test)]
    pub fn csv_path(&self) -> &Path {
        &self.steps_path
    }
}

fn write_header(path: &Path, header: &str) -> Result<()> {
    if !path.exists() {
        let mut f = fs::File::create(path)?;
        writeln!(f, "{header}")?;
        tracing::debug!("Created metrics CSV: '{}'", path.display());
    }
    Ok(())
}
