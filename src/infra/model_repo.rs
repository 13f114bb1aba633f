// ============================================================
// Layer 6 — Model Repository
// ============================================================
// Resolves a model identifier ("bert-base-uncased") to a local
// directory in HuggingFace layout:
//
//   models/
//     bert-base-uncased/
//       config.json
//       tokenizer.json
//       model.safetensors
//
// An identifier that is already a directory path is used as-is.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE:  &str = "config.json";
pub const WEIGHTS_FILE: &str = "model.safetensors";

#[derive(Debug, Clone)]
pub struct ModelRepository {
    root: PathBuf,
}

impl ModelRepository {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    /// Find the directory holding `identifier`'s files.
    pub fn resolve(&self, identifier: &str) -> Result<PathBuf> {
        let direct = PathBuf::from(identifier);
        if direct.is_dir() {
            return Ok(direct);
        }

        let nested = self.root.join(identifier);
        if nested.is_dir() {
            return Ok(nested);
        }

        bail!(
            "Pretrained model '{identifier}' not found (looked in '{}' and '{}')",
            direct.display(),
            nested.display()
        )
    }

    /// Path of a required file inside the resolved model directory.
    pub fn file(&self, identifier: &str, name: &str) -> Result<PathBuf> {
        let path = self.resolve(identifier)?.join(name);
        if !path.is_file() {
            bail!("Pretrained model '{identifier}' has no '{}'", path.display());
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_nested_identifier() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("tiny-bert")).unwrap();
        std::fs::write(dir.path().join("tiny-bert").join(CONFIG_FILE), "{}").unwrap();

        let repo = ModelRepository::new(dir.path());
        assert!(repo.resolve("tiny-bert").unwrap().ends_with("tiny-bert"));
        assert!(repo.file("tiny-bert", CONFIG_FILE).is_ok());
        assert!(repo.file("tiny-bert", WEIGHTS_FILE).is_err());
        assert!(repo.resolve("missing-model").is_err());
    }
}
