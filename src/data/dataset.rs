use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

/// One tokenised example, not yet padded.
/// Sequence format: [CLS] text_a [SEP] (text_b [SEP])
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlueItem {
    /// Token ids including [CLS] and [SEP]
    pub input_ids:      Vec<u32>,
    /// 0 for the first segment, 1 for the second
    pub token_type_ids: Vec<u32>,
    /// 1 for every real token
    pub attention_mask: Vec<u32>,
    /// Gold class id
    pub label:          usize,
}

impl GlueItem {
    pub fn seq_len(&self) -> usize {
        self.input_ids.len()
    }
}

pub struct GlueDataset {
    items: Vec<GlueItem>,
}

impl GlueDataset {
    pub fn new(items: Vec<GlueItem>) -> Self { Self { items } }
}

impl Dataset<GlueItem> for GlueDataset {
    fn get(&self, index: usize) -> Option<GlueItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}
