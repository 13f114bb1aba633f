// ============================================================
// Layer 3 — GlueExample Domain Type
// ============================================================
// A single raw example as it appears in a GLUE split.
// Single-sentence tasks (CoLA, SST-2) leave `text_b` empty;
// every other task classifies a sentence pair.

use serde::{Deserialize, Serialize};

/// A labelled classification example before tokenisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlueExample {
    /// Position of the example inside its split file
    pub idx: usize,

    /// First (or only) sentence
    pub text_a: String,

    /// Second sentence for pair tasks
    pub text_b: Option<String>,

    /// Class id, already mapped through the task's label table
    pub label: usize,
}

impl GlueExample {
    pub fn single(idx: usize, text_a: impl Into<String>, label: usize) -> Self {
        Self { idx, text_a: text_a.into(), text_b: None, label }
    }

    pub fn pair(
        idx:    usize,
        text_a: impl Into<String>,
        text_b: impl Into<String>,
        label:  usize,
    ) -> Self {
        Self {
            idx,
            text_a: text_a.into(),
            text_b: Some(text_b.into()),
            label,
        }
    }
}
