// ============================================================
// Layer 3 — GLUE Task Registry
// ============================================================
// Everything the rest of the system needs to know about a task
// without touching the disk:
//
//   - which (path, name) identifiers are known
//   - how the official TSV files are laid out
//   - how raw label strings map to class ids
//   - which validation splits exist
//   - which metrics are reported
//
// Reference: Wang et al. (2018) GLUE benchmark

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// The only dataset collection this registry knows about
pub const GLUE_PATH: &str = "glue";

const KNOWN_NAMES: &str = "cola, sst2, mrpc, qqp, mnli, qnli, rte, wnli";

/// A GLUE classification task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlueTask {
    Cola,
    Sst2,
    Mrpc,
    Qqp,
    Mnli,
    Qnli,
    Rte,
    Wnli,
}

/// Metrics reported for a task, following GLUE conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Accuracy,
    AccuracyAndF1,
    MatthewsCorrelation,
}

/// A column reference inside a TSV row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Index(usize),
    Last,
}

impl Column {
    pub fn pick<'a>(&self, fields: &[&'a str]) -> Option<&'a str> {
        match self {
            Column::Index(i) => fields.get(*i).copied(),
            Column::Last     => fields.last().copied(),
        }
    }
}

/// Where the interesting columns of a task's TSV files live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TsvLayout {
    pub has_header: bool,
    pub text_a:     Column,
    pub text_b:     Option<Column>,
    pub label:      Column,
}

impl GlueTask {
    /// Resolve a `(dataset_path, dataset_name)` pair against the registry.
    pub fn lookup(path: &str, name: &str) -> Result<Self> {
        if !path.eq_ignore_ascii_case(GLUE_PATH) {
            bail!("Unknown dataset path '{path}' (only '{GLUE_PATH}' is available)");
        }
        Self::from_name(name)
    }

    pub fn from_name(name: &str) -> Result<Self> {
        let task = match name.to_ascii_lowercase().replace('-', "").as_str() {
            "cola" => GlueTask::Cola,
            "sst2" => GlueTask::Sst2,
            "mrpc" => GlueTask::Mrpc,
            "qqp"  => GlueTask::Qqp,
            "mnli" => GlueTask::Mnli,
            "qnli" => GlueTask::Qnli,
            "rte"  => GlueTask::Rte,
            "wnli" => GlueTask::Wnli,
            other  => bail!("Unknown GLUE task '{other}' (known: {KNOWN_NAMES})"),
        };
        Ok(task)
    }

    pub fn name(&self) -> &'static str {
        match self {
            GlueTask::Cola => "cola",
            GlueTask::Sst2 => "sst2",
            GlueTask::Mrpc => "mrpc",
            GlueTask::Qqp  => "qqp",
            GlueTask::Mnli => "mnli",
            GlueTask::Qnli => "qnli",
            GlueTask::Rte  => "rte",
            GlueTask::Wnli => "wnli",
        }
    }

    /// Directory name used by the official GLUE download
    pub fn dir_name(&self) -> &'static str {
        match self {
            GlueTask::Cola => "CoLA",
            GlueTask::Sst2 => "SST-2",
            GlueTask::Mrpc => "MRPC",
            GlueTask::Qqp  => "QQP",
            GlueTask::Mnli => "MNLI",
            GlueTask::Qnli => "QNLI",
            GlueTask::Rte  => "RTE",
            GlueTask::Wnli => "WNLI",
        }
    }

    /// Raw label strings as written in the TSV files, indexed by class id.
    pub fn raw_labels(&self) -> &'static [&'static str] {
        match self {
            GlueTask::Mnli => &["entailment", "neutral", "contradiction"],
            GlueTask::Qnli | GlueTask::Rte => &["entailment", "not_entailment"],
            _ => &["0", "1"],
        }
    }

    /// Human-readable label names, indexed by class id.
    pub fn label_names(&self) -> &'static [&'static str] {
        match self {
            GlueTask::Cola => &["unacceptable", "acceptable"],
            GlueTask::Sst2 => &["negative", "positive"],
            GlueTask::Mrpc => &["not_equivalent", "equivalent"],
            GlueTask::Qqp  => &["not_duplicate", "duplicate"],
            GlueTask::Mnli => &["entailment", "neutral", "contradiction"],
            GlueTask::Qnli | GlueTask::Rte => &["entailment", "not_entailment"],
            GlueTask::Wnli => &["not_entailment", "entailment"],
        }
    }

    pub fn num_labels(&self) -> usize {
        self.raw_labels().len()
    }

    pub fn label_id(&self, raw: &str) -> Option<usize> {
        let raw = raw.trim();
        self.raw_labels().iter().position(|l| *l == raw)
    }

    /// Names of the input fields, matching the HuggingFace `glue` schema
    pub fn input_fields(&self) -> (&'static str, Option<&'static str>) {
        match self {
            GlueTask::Cola | GlueTask::Sst2 => ("sentence", None),
            GlueTask::Mrpc | GlueTask::Rte | GlueTask::Wnli => ("sentence1", Some("sentence2")),
            GlueTask::Qqp  => ("question1", Some("question2")),
            GlueTask::Mnli => ("premise", Some("hypothesis")),
            GlueTask::Qnli => ("question", Some("sentence")),
        }
    }

    pub fn tsv_layout(&self) -> TsvLayout {
        use Column::{Index, Last};
        match self {
            GlueTask::Cola => TsvLayout { has_header: false, text_a: Index(3), text_b: None,           label: Index(1) },
            GlueTask::Sst2 => TsvLayout { has_header: true,  text_a: Index(0), text_b: None,           label: Index(1) },
            GlueTask::Mrpc => TsvLayout { has_header: true,  text_a: Index(3), text_b: Some(Index(4)), label: Index(0) },
            GlueTask::Qqp  => TsvLayout { has_header: true,  text_a: Index(3), text_b: Some(Index(4)), label: Index(5) },
            GlueTask::Mnli => TsvLayout { has_header: true,  text_a: Index(8), text_b: Some(Index(9)), label: Last },
            GlueTask::Qnli | GlueTask::Rte | GlueTask::Wnli =>
                TsvLayout { has_header: true, text_a: Index(1), text_b: Some(Index(2)), label: Last },
        }
    }

    /// The split-enumeration helper: held-out splits evaluated after training.
    pub fn validation_splits(&self) -> &'static [&'static str] {
        match self {
            GlueTask::Mnli => &["validation_matched", "validation_mismatched"],
            _ => &["validation"],
        }
    }

    pub fn metric_kind(&self) -> MetricKind {
        match self {
            GlueTask::Cola => MetricKind::MatthewsCorrelation,
            GlueTask::Mrpc | GlueTask::Qqp => MetricKind::AccuracyAndF1,
            _ => MetricKind::Accuracy,
        }
    }
}

/// File name of a split inside the task directory.
pub fn split_file_name(split: &str) -> Result<&'static str> {
    let file = match split {
        "train"                 => "train.tsv",
        "validation"            => "dev.tsv",
        "validation_matched"    => "dev_matched.tsv",
        "validation_mismatched" => "dev_mismatched.tsv",
        other => bail!("Unknown split '{other}'"),
    };
    Ok(file)
}
