// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Fine-tunes the classifier for a fixed number of optimiser
// steps drawn from an endless, reshuffled batch stream.
//
// State is threaded through the loop by value:
//
//   (OptimizerState, batch, TrainState)
//        ── train_step ──▶ (OptimizerState', TrainState', loss)
//
//   OptimizerState = model parameters + AdamW moments
//   TrainState     = step counter + learning-rate schedule
//
// The previous states are consumed, so no stale copy of the
// parameters can leak into a later step.
//
// Reference: Burn Book §5, Loshchilov & Hutter (2019) AdamW

use anyhow::{anyhow, Result};
use burn::{
    grad_clipping::GradientClippingConfig,
    optim::{AdamWConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::run_config::RunConfig;
use crate::data::{batcher::GlueBatch, pipeline::InputPipeline};
use crate::infra::metrics::{MetricsLogger, StepMetrics};
use crate::ml::model::GlueClassifier;
use crate::ml::schedule::LearningRateSchedule;

/// Total optimiser steps: every epoch's examples, in whole batches.
pub fn num_train_steps(num_examples: usize, batch_size: usize, num_epochs: usize) -> Result<usize> {
    if batch_size == 0 {
        return Ok(0);
    }
    let total_examples = num_examples.checked_mul(num_epochs).ok_or_else(|| {
        anyhow!("{num_epochs} epochs over {num_examples} examples overflows the step counter")
    })?;
    Ok(total_examples / batch_size)
}

/// The user-facing progress line for one logged step.
pub fn progress_line(metrics: &StepMetrics, total: usize) -> String {
    format!(
        "Step {:>5}/{} | lr={:.3e} | loss={:.4}",
        metrics.step, total, metrics.learning_rate, metrics.loss
    )
}

// ─── State bundles ────────────────────────────────────────────────────────────
/// Model parameters together with the optimiser's internal moments.
pub struct OptimizerState<B: AutodiffBackend, O> {
    pub model: GlueClassifier<B>,
    pub optim: O,
}

/// Step counter plus the schedule it indexes into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainState {
    pub step:     usize,
    pub schedule: LearningRateSchedule,
}

impl TrainState {
    pub fn new(schedule: LearningRateSchedule) -> Self {
        Self { step: 0, schedule }
    }

    pub fn learning_rate(&self) -> f64 {
        self.schedule.rate(self.step)
    }

    pub fn advance(self) -> Self {
        Self { step: self.step + 1, ..self }
    }
}

/// AdamW with weight decay, configured to clip the global gradient norm.
pub fn build_optimizer<B: AutodiffBackend>(
    weight_decay:  f64,
    max_grad_norm: f64,
) -> impl Optimizer<GlueClassifier<B>, B> {
    AdamWConfig::new()
        .with_weight_decay(weight_decay as f32)
        .with_epsilon(1e-8)
        .with_grad_clipping(Some(GradientClippingConfig::Norm(max_grad_norm as f32)))
        .init::<B, GlueClassifier<B>>()
}

/// One forward/backward/update cycle.
pub fn train_step<B, O>(
    state: OptimizerState<B, O>,
    batch: GlueBatch<B>,
    train: TrainState,
) -> (OptimizerState<B, O>, TrainState, f64)
where
    B: AutodiffBackend,
    O: Optimizer<GlueClassifier<B>, B>,
{
    let OptimizerState { model, mut optim } = state;
    let lr = train.learning_rate();

    let (loss, _) = model.forward_classification(batch);
    let loss_value: f64 = loss.clone().into_scalar().elem::<f64>();

    // Backward pass + clipped AdamW update
    let grads = GradientsParams::from_grads(loss.backward(), &model);
    let model = optim.step(lr, model, grads);

    (OptimizerState { model, optim }, train.advance(), loss_value)
}

/// Run at most `num_steps` steps, one batch each.
///
/// Stops silently when `batches` runs dry. `on_progress` fires after
/// steps 0, `log_every`, 2·`log_every`, …  Returns the final state and
/// the number of steps actually taken.
pub fn drive_steps<S, I, F, P>(
    mut state:       S,
    batches:         I,
    num_steps:       usize,
    log_every:       usize,
    mut step_fn:     F,
    mut on_progress: P,
) -> Result<(S, usize)>
where
    I: IntoIterator,
    F: FnMut(S, I::Item) -> (S, StepMetrics),
    P: FnMut(&StepMetrics) -> Result<()>,
{
    let mut taken = 0;
    for batch in batches.into_iter().take(num_steps) {
        let (next, metrics) = step_fn(state, batch);
        state = next;

        if log_every > 0 && metrics.step % log_every == 0 {
            on_progress(&metrics)?;
        }
        taken += 1;
    }
    Ok((state, taken))
}

/// Fine-tune `model` on the pipeline's `train` split.
pub fn run_training<B: AutodiffBackend>(
    cfg:      &RunConfig,
    model:    GlueClassifier<B>,
    pipeline: &InputPipeline,
    logger:   &MetricsLogger,
    device:   &B::Device,
) -> Result<GlueClassifier<B>> {
    let num_examples = pipeline.num_examples("train");
    let total        = num_train_steps(num_examples, cfg.train_batch_size, cfg.num_train_epochs)?;
    tracing::info!(
        "Training on {} examples: {} steps (batch={}, epochs={})",
        num_examples, total, cfg.train_batch_size, cfg.num_train_epochs,
    );

    // ── Initial states ────────────────────────────────────────────────────────
    let schedule = cfg.schedule(total);
    let optim    = build_optimizer::<B>(cfg.weight_decay, cfg.max_grad_norm);
    let state    = (OptimizerState { model, optim }, TrainState::new(schedule));

    let stream = pipeline.get_inputs::<B>("train", cfg.train_batch_size, true, device)?;

    // ── Step loop ─────────────────────────────────────────────────────────────
    let ((state, _), taken) = drive_steps(
        state,
        stream.iter(),
        total,
        cfg.log_every,
        |(opt, train), batch| {
            let step = train.step;
            let lr   = train.learning_rate();
            let (opt, train, loss) = train_step(opt, batch, train);
            ((opt, train), StepMetrics::new(step, lr, loss))
        },
        |m| {
            println!("{}", progress_line(m, total));
            logger.log(m)
        },
    )?;

    if taken < total {
        tracing::warn!("Training stream ended after {taken} of {total} steps");
    }
    tracing::info!("Training complete ({taken} steps)");
    Ok(state.model)
}
