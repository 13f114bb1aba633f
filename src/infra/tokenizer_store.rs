// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Loads the pretrained tokenizer that ships next to the model
// weights (HuggingFace `tokenizer.json`) and bounds its output
// length after construction.
//
// Pair inputs are truncated longest-first, so both sentences
// keep as many tokens as possible.
//
// Reference: tokenizers crate documentation

use anyhow::{anyhow, bail, Result};
use std::path::{Path, PathBuf};
use tokenizers::{Tokenizer, TruncationParams};

pub const TOKENIZER_FILE: &str = "tokenizer.json";

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(TOKENIZER_FILE)
    }

    /// Load `tokenizer.json` and cap every encoding at `max_seq_len` tokens.
    pub fn load(&self, max_seq_len: usize) -> Result<Tokenizer> {
        load_tokenizer(&self.path(), max_seq_len)
    }

    /// Write `tokenizer` (including its truncation setting) into this directory.
    pub fn save(&self, tokenizer: &Tokenizer) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path();
        tokenizer
            .save(&path, true)
            .map_err(|e| anyhow!("Cannot write tokenizer to '{}': {e}", path.display()))
    }
}

/// Load a `tokenizer.json` file and cap every encoding at `max_seq_len` tokens.
pub fn load_tokenizer(path: &Path, max_seq_len: usize) -> Result<Tokenizer> {
    let mut tokenizer = Tokenizer::from_file(path)
        .map_err(|e| anyhow!("Cannot load tokenizer from '{}': {e}", path.display()))?;

    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length: max_seq_len,
            ..Default::default()
        }))
        .map_err(|e| anyhow!("Cannot set truncation to {max_seq_len}: {e}"))?;

    tracing::info!(
        "Tokenizer loaded from '{}' (vocab={}, max_seq_len={})",
        path.display(),
        tokenizer.get_vocab_size(true),
        max_seq_len,
    );
    Ok(tokenizer)
}

/// Every id the tokenizer can emit must have a row in the embedding table.
pub fn check_vocab(tokenizer: &Tokenizer, vocab_size: usize) -> Result<()> {
    let Some(max_id) = tokenizer.get_vocab(true).into_values().max() else {
        return Ok(());
    };
    if max_id as usize >= vocab_size {
        bail!(
            "Tokenizer emits ids up to {max_id} but the model vocabulary has {vocab_size} entries; \
             tokenizer.json and config.json do not belong together"
        );
    }
    Ok(())
}

/// Set the tokenizer thread-pool switch before any encoding happens.
pub fn configure_parallelism(enabled: bool) {
    std::env::set_var("TOKENIZERS_PARALLELISM", parallelism_value(enabled));
}

fn parallelism_value(enabled: bool) -> &'static str {
    if enabled { "true" } else { "false" }
}

// ─── Test Support ─────────────────────────────────────────────────────────────
// A tiny BERT-style WordLevel tokenizer written straight to JSON,
// with the usual special-token ids ([CLS]=101, [SEP]=102).
#[cfg(test)]
pub mod test_support {
    use super::*;

    pub fn write_word_level_tokenizer(dir: &Path, words: &[&str]) -> Tokenizer {
        let mut vocab = serde_json::json!({
            "[PAD]":  0,
            "[UNK]":  1,
            "[CLS]":  101,
            "[SEP]":  102,
            "[MASK]": 103,
        });
        for (i, word) in words.iter().enumerate() {
            vocab[*word] = serde_json::json!(104 + i);
        }

        let special = |id: usize, content: &str| serde_json::json!({
            "id": id, "content": content, "single_word": false, "lstrip": false,
            "rstrip": false, "normalized": false, "special": true
        });

        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [
                special(0, "[PAD]"), special(1, "[UNK]"), special(101, "[CLS]"),
                special(102, "[SEP]"), special(103, "[MASK]")
            ],
            "normalizer": {
                "type": "BertNormalizer",
                "clean_text": true,
                "handle_chinese_chars": true,
                "strip_accents": null,
                "lowercase": true
            },
            "pre_tokenizer": { "type": "Whitespace" },
            "post_processor": {
                "type": "BertProcessing",
                "sep": ["[SEP]", 102],
                "cls": ["[CLS]", 101]
            },
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": "[UNK]"
            }
        });

        std::fs::write(
            dir.join(TOKENIZER_FILE),
            serde_json::to_string_pretty(&tokenizer_json).unwrap(),
        )
        .unwrap();

        Tokenizer::from_file(dir.join(TOKENIZER_FILE)).unwrap()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use super::test_support::write_word_level_tokenizer;

    #[test]
    fn test_load_applies_truncation() {
        let dir = tempfile::tempdir().unwrap();
        write_word_level_tokenizer(dir.path(), &["a", "b", "c", "d", "e"]);

        let tokenizer = TokenizerStore::new(dir.path()).load(5).unwrap();
        let encoding  = tokenizer.encode(("a b c d", "e d c b"), true).unwrap();
        assert_eq!(encoding.get_ids().len(), 5);
        assert_eq!(encoding.get_ids()[0], 101);
    }

    #[test]
    fn test_missing_tokenizer_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(TokenizerStore::new(dir.path()).load(128).is_err());
    }

    #[test]
    fn test_save_round_trips_truncation() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write_word_level_tokenizer(src.path(), &["x", "y"]);

        let tokenizer = TokenizerStore::new(src.path()).load(4).unwrap();
        TokenizerStore::new(dst.path()).save(&tokenizer).unwrap();

        let reloaded = Tokenizer::from_file(dst.path().join(TOKENIZER_FILE)).unwrap();
        assert_eq!(reloaded.get_truncation().map(|t| t.max_length), Some(4));
    }

    #[test]
    fn test_vocab_must_fit_the_model() {
        let dir       = tempfile::tempdir().unwrap();
        let tokenizer = write_word_level_tokenizer(dir.path(), &["a", "b"]);

        // ids run up to 105
        assert!(check_vocab(&tokenizer, 106).is_ok());
        let err = check_vocab(&tokenizer, 32).unwrap_err();
        assert!(err.to_string().contains("105"));
    }

    #[test]
    fn test_parallelism_flag_follows_config() {
        assert_eq!(parallelism_value(true), "true");

        // tests only ever switch it off, so reading it back is race-free
        configure_parallelism(false);
        assert_eq!(std::env::var("TOKENIZERS_PARALLELISM").unwrap(), "false");
    }
}
