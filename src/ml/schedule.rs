// ============================================================
// Layer 5 — Learning-Rate Schedule
// ============================================================
// A schedule is a plain value: the rate at step t depends only
// on t, never on how many times the schedule was queried.
//
//   warmup:  lr · t / warmup_steps             for t < warmup_steps
//   then:    constant | linear → 0 | cosine → 0   over the rest

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleKind {
    Constant,
    Linear,
    Cosine,
}

impl FromStr for ScheduleKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "constant" => Ok(ScheduleKind::Constant),
            "linear"   => Ok(ScheduleKind::Linear),
            "cosine"   => Ok(ScheduleKind::Cosine),
            other      => bail!("Unknown lr_schedule '{other}' (constant, linear, cosine)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LearningRateSchedule {
    pub kind:         ScheduleKind,
    pub base_rate:    f64,
    pub warmup_steps: usize,
    pub total_steps:  usize,
}

impl LearningRateSchedule {
    pub fn new(kind: ScheduleKind, base_rate: f64, warmup_steps: usize, total_steps: usize) -> Self {
        Self { kind, base_rate, warmup_steps, total_steps }
    }

    pub fn rate(&self, step: usize) -> f64 {
        if step < self.warmup_steps {
            return self.base_rate * (step + 1) as f64 / self.warmup_steps as f64;
        }

        let decay_steps = self.total_steps.saturating_sub(self.warmup_steps);
        if decay_steps == 0 {
            return match self.kind {
                ScheduleKind::Constant => self.base_rate,
                _ => 0.0,
            };
        }

        let progress = ((step - self.warmup_steps) as f64 / decay_steps as f64).min(1.0);
        match self.kind {
            ScheduleKind::Constant => self.base_rate,
            ScheduleKind::Linear   => self.base_rate * (1.0 - progress),
            ScheduleKind::Cosine   => self.base_rate * 0.5 * (1.0 + (PI * progress).cos()),
        }
    }
}
