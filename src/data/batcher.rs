// ============================================================
// Layer 4 — GLUE Batcher
// ============================================================
// Implements Burn's Batcher trait to convert a Vec<GlueItem>
// into device tensors.
//
// Items arrive unpadded, so padding happens here: every row is
// extended with zeros up to the longest sequence in the batch.
// Padding positions get attention_mask = 0 and are ignored by
// self-attention.
//
//   Input:  N items with lengths l1..lN
//   Output: GlueBatch with [N, max(l)] tensors + [N] labels
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::GlueItem;

/// Token id used for padding (BERT's [PAD])
pub const PAD_TOKEN_ID: u32 = 0;

// ─── GlueBatch ────────────────────────────────────────────────────────────────
/// A batch of encoded examples ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct GlueBatch<B: Backend> {
    /// Token ids — shape: [batch_size, seq_len]
    pub input_ids: Tensor<B, 2, Int>,

    /// Segment ids (0 = first sentence, 1 = second) — shape: [batch_size, seq_len]
    pub token_type_ids: Tensor<B, 2, Int>,

    /// 1 = real token, 0 = padding — shape: [batch_size, seq_len]
    pub attention_mask: Tensor<B, 2, Int>,

    /// Gold class ids — shape: [batch_size]
    pub labels: Tensor<B, 1, Int>,
}

impl<B: Backend> GlueBatch<B> {
    pub fn batch_size(&self) -> usize {
        self.labels.dims()[0]
    }
}

// ─── GlueBatcher ──────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct GlueBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> GlueBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<GlueItem, GlueBatch<B>> for GlueBatcher<B> {
    fn batch(&self, items: Vec<GlueItem>) -> GlueBatch<B> {
        let batch_size = items.len();
        let seq_len    = items.iter().map(GlueItem::seq_len).max().unwrap_or(0).max(1);

        // Flatten each row, padding on the right up to seq_len
        let input_flat: Vec<i64> = items
            .iter()
            .flat_map(|i| padded(&i.input_ids, seq_len, PAD_TOKEN_ID))
            .collect();
        let types_flat: Vec<i64> = items
            .iter()
            .flat_map(|i| padded(&i.token_type_ids, seq_len, 0))
            .collect();
        let mask_flat: Vec<i64> = items
            .iter()
            .flat_map(|i| padded(&i.attention_mask, seq_len, 0))
            .collect();

        let labels: Vec<i64> = items.iter().map(|i| i.label as i64).collect();

        let matrix = |values: Vec<i64>| {
            Tensor::<B, 2, Int>::from_data(
                TensorData::new(values, [batch_size, seq_len]),
                &self.device,
            )
        };

        GlueBatch {
            input_ids:      matrix(input_flat),
            token_type_ids: matrix(types_flat),
            attention_mask: matrix(mask_flat),
            labels:         Tensor::<B, 1, Int>::from_data(
                TensorData::new(labels, [batch_size]),
                &self.device,
            ),
        }
    }
}

fn padded(row: &[u32], seq_len: usize, pad: u32) -> impl Iterator<Item = i64> + '_ {
    row.iter()
        .copied()
        .chain(std::iter::repeat(pad).take(seq_len.saturating_sub(row.len())))
        .map(i64::from)
}
