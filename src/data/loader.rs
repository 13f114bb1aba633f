// ============================================================
// Layer 4 — GLUE TSV Loader
// ============================================================
// Loads the splits of one GLUE task from the official
// distribution layout:
//
//   data/
//     glue/
//       MRPC/
//         train.tsv
//         dev.tsv
//       MNLI/
//         train.tsv
//         dev_matched.tsv
//         dev_mismatched.tsv
//
// GLUE files are written without quoting, so each line is split
// on tab characters only. A malformed row aborts the load with
// the file name and line number.

use anyhow::{anyhow, Context, Result};
use std::{collections::BTreeMap, fs, path::{Path, PathBuf}};

use crate::domain::example::GlueExample;
use crate::domain::task::{split_file_name, GlueTask, GLUE_PATH};
use crate::domain::traits::ExampleSource;

/// Reads one task's TSV files from `<root>/glue/<TaskDir>/`.
pub struct GlueTsvLoader {
    task_dir: PathBuf,
    task:     GlueTask,
}

impl GlueTsvLoader {
    pub fn new(data_dir: impl AsRef<Path>, task: GlueTask) -> Self {
        let task_dir = data_dir.as_ref().join(GLUE_PATH).join(task.dir_name());
        Self { task_dir, task }
    }

    pub fn task_dir(&self) -> &Path {
        &self.task_dir
    }
}

impl ExampleSource for GlueTsvLoader {
    fn load_split(&self, split: &str) -> Result<Vec<GlueExample>> {
        let path = self.task_dir.join(split_file_name(split)?);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read split '{split}' from '{}'", path.display()))?;

        let examples = parse_tsv(self.task, &text)
            .with_context(|| format!("Malformed GLUE file '{}'", path.display()))?;

        tracing::debug!("Loaded {} examples from '{}'", examples.len(), path.display());
        Ok(examples)
    }
}

/// Parse the contents of one GLUE TSV file.
pub fn parse_tsv(task: GlueTask, text: &str) -> Result<Vec<GlueExample>> {
    let layout = task.tsv_layout();
    let skip   = usize::from(layout.has_header);

    let mut examples = Vec::new();

    for (line_no, line) in text.lines().enumerate().skip(skip) {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        let line_no = line_no + 1;

        let text_a = layout.text_a.pick(&fields)
            .ok_or_else(|| anyhow!("line {line_no}: missing first sentence column"))?;

        let text_b = match layout.text_b {
            Some(col) => Some(
                col.pick(&fields)
                    .ok_or_else(|| anyhow!("line {line_no}: missing second sentence column"))?
                    .to_string(),
            ),
            None => None,
        };

        let raw_label = layout.label.pick(&fields)
            .ok_or_else(|| anyhow!("line {line_no}: missing label column"))?;
        let label = task.label_id(raw_label)
            .ok_or_else(|| anyhow!("line {line_no}: unknown label '{raw_label}' for {}", task.name()))?;

        examples.push(GlueExample {
            idx: examples.len(),
            text_a: text_a.to_string(),
            text_b,
            label,
        });
    }

    Ok(examples)
}

// ─── GlueDatasetDict ──────────────────────────────────────────────────────────
/// The raw splits of a task, keyed by split name.
#[derive(Debug, Clone)]
pub struct GlueDatasetDict {
    pub task: GlueTask,
    splits:   BTreeMap<String, Vec<GlueExample>>,
}

impl GlueDatasetDict {
    pub fn new(task: GlueTask, splits: BTreeMap<String, Vec<GlueExample>>) -> Self {
        Self { task, splits }
    }

    pub fn split(&self, name: &str) -> Result<&[GlueExample]> {
        self.splits
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| anyhow!("Split '{name}' was not loaded for {}", self.task.name()))
    }

    pub fn split_names(&self) -> impl Iterator<Item = &str> {
        self.splits.keys().map(String::as_str)
    }

    #[cfg(test)]
    pub fn num_examples(&self, name: &str) -> usize {
        self.splits.get(name).map_or(0, Vec::len)
    }
}

/// Load a dataset by `(path, name)`: `train` plus every validation split.
pub fn load_dataset(
    data_dir:     impl AsRef<Path>,
    dataset_path: &str,
    dataset_name: &str,
) -> Result<GlueDatasetDict> {
    let task   = GlueTask::lookup(dataset_path, dataset_name)?;
    let loader = GlueTsvLoader::new(data_dir, task);
    tracing::info!("Loading {} from '{}'", task.name(), loader.task_dir().display());
    load_splits(task, &loader, &["train"])
}

/// Load only the validation splits of a task (used by `evaluate`).
pub fn load_validation(
    data_dir:     impl AsRef<Path>,
    dataset_path: &str,
    dataset_name: &str,
) -> Result<GlueDatasetDict> {
    let task   = GlueTask::lookup(dataset_path, dataset_name)?;
    let loader = GlueTsvLoader::new(data_dir, task);
    load_splits(task, &loader, &[])
}

fn load_splits(
    task:   GlueTask,
    source: &impl ExampleSource,
    extra:  &[&str],
) -> Result<GlueDatasetDict> {
    let mut splits = BTreeMap::new();
    for split in extra.iter().chain(task.validation_splits()) {
        let examples = source.load_split(split)?;
        tracing::info!("  {split}: {} examples", examples.len());
        splits.insert(split.to_string(), examples);
    }
    Ok(GlueDatasetDict::new(task, splits))
}
