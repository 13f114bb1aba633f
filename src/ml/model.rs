// ============================================================
// Layer 5 — BERT Sequence Classifier
// ============================================================
// A post-LayerNorm BERT encoder with a pooled classification
// head, laid out so pretrained HuggingFace weights map onto it
// one tensor at a time:
//
//   embeddings:  word + position + token_type → LayerNorm → dropout
//   layer × N:   self-attention → add & norm
//                GELU feed-forward → add & norm
//   pooler:      tanh(W · h[CLS])
//   classifier:  dropout → W · pooled → logits [batch, num_labels]
//
// Reference: Devlin et al. (2019) BERT
//            Vaswani et al. (2017) Attention Is All You Need

use burn::{
    nn::{
        loss::CrossEntropyLossConfig,
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::{gelu, softmax, tanh},
};

use crate::data::batcher::GlueBatch;

/// Added to attention scores of padded key positions
const MASK_BIAS: f64 = -10_000.0;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct GlueClassifierConfig {
    pub vocab_size:              usize,
    pub hidden_size:             usize,
    pub num_hidden_layers:       usize,
    pub num_attention_heads:     usize,
    pub intermediate_size:       usize,
    pub max_position_embeddings: usize,
    pub type_vocab_size:         usize,
    pub num_labels:              usize,
    #[config(default = 0.1)]
    pub hidden_dropout_prob:     f64,
    #[config(default = 0.1)]
    pub attention_dropout_prob:  f64,
    #[config(default = 1e-12)]
    pub layer_norm_eps:          f64,
}

impl GlueClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> GlueClassifier<B> {
        let layers = (0..self.num_hidden_layers)
            .map(|_| self.build_layer(device))
            .collect();

        GlueClassifier {
            embeddings: BertEmbeddings {
                word_embeddings:       EmbeddingConfig::new(self.vocab_size, self.hidden_size).init(device),
                position_embeddings:   EmbeddingConfig::new(self.max_position_embeddings, self.hidden_size).init(device),
                token_type_embeddings: EmbeddingConfig::new(self.type_vocab_size, self.hidden_size).init(device),
                norm:                  self.layer_norm(device),
                dropout:               DropoutConfig::new(self.hidden_dropout_prob).init(),
            },
            layers,
            pooler:     LinearConfig::new(self.hidden_size, self.hidden_size).init(device),
            classifier: LinearConfig::new(self.hidden_size, self.num_labels).init(device),
            dropout:    DropoutConfig::new(self.hidden_dropout_prob).init(),
        }
    }

    fn layer_norm<B: Backend>(&self, device: &B::Device) -> LayerNorm<B> {
        LayerNormConfig::new(self.hidden_size)
            .with_epsilon(self.layer_norm_eps)
            .init(device)
    }

    fn build_layer<B: Backend>(&self, device: &B::Device) -> BertLayer<B> {
        let h = self.hidden_size;
        BertLayer {
            attention: BertSelfAttention {
                query:        LinearConfig::new(h, h).init(device),
                key:          LinearConfig::new(h, h).init(device),
                value:        LinearConfig::new(h, h).init(device),
                output:       LinearConfig::new(h, h).init(device),
                norm:         self.layer_norm(device),
                attn_dropout: DropoutConfig::new(self.attention_dropout_prob).init(),
                dropout:      DropoutConfig::new(self.hidden_dropout_prob).init(),
                num_heads:    self.num_attention_heads,
            },
            intermediate: LinearConfig::new(h, self.intermediate_size).init(device),
            output:       LinearConfig::new(self.intermediate_size, h).init(device),
            norm:         self.layer_norm(device),
            dropout:      DropoutConfig::new(self.hidden_dropout_prob).init(),
        }
    }
}

// ─── Embeddings ───────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct BertEmbeddings<B: Backend> {
    pub word_embeddings:       Embedding<B>,
    pub position_embeddings:   Embedding<B>,
    pub token_type_embeddings: Embedding<B>,
    pub norm:                  LayerNorm<B>,
    pub dropout:               Dropout,
}

impl<B: Backend> BertEmbeddings<B> {
    pub fn forward(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        token_type_ids: Tensor<B, 2, Int>,
    ) -> Tensor<B, 3> {
        let [batch_size, seq_len] = input_ids.dims();
        let device = input_ids.device();

        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &device)
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);

        let x = self.word_embeddings.forward(input_ids)
            + self.position_embeddings.forward(positions)
            + self.token_type_embeddings.forward(token_type_ids);

        self.dropout.forward(self.norm.forward(x))
    }
}

// ─── Self-attention block ─────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct BertSelfAttention<B: Backend> {
    pub query:        Linear<B>,
    pub key:          Linear<B>,
    pub value:        Linear<B>,
    pub output:       Linear<B>,
    pub norm:         LayerNorm<B>,
    pub attn_dropout: Dropout,
    pub dropout:      Dropout,
    pub num_heads:    usize,
}

impl<B: Backend> BertSelfAttention<B> {
    /// x: [batch, seq, hidden], mask_bias: [batch, 1, 1, seq]
    pub fn forward(&self, x: Tensor<B, 3>, mask_bias: Tensor<B, 4>) -> Tensor<B, 3> {
        let [batch_size, seq_len, hidden] = x.dims();
        let head_dim = hidden / self.num_heads;

        let split_heads = |t: Tensor<B, 3>| {
            t.reshape([batch_size, seq_len, self.num_heads, head_dim])
                .swap_dims(1, 2)
        };

        let q = split_heads(self.query.forward(x.clone()));
        let k = split_heads(self.key.forward(x.clone()));
        let v = split_heads(self.value.forward(x.clone()));

        // [batch, heads, seq, seq]
        let scores = q.matmul(k.swap_dims(2, 3)) / (head_dim as f64).sqrt();
        let probs  = softmax(scores + mask_bias, 3);
        let probs  = self.attn_dropout.forward(probs);

        let context = probs
            .matmul(v)
            .swap_dims(1, 2)
            .reshape([batch_size, seq_len, hidden]);

        let out = self.dropout.forward(self.output.forward(context));
        self.norm.forward(x + out)
    }
}

// ─── Encoder layer ────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct BertLayer<B: Backend> {
    pub attention:    BertSelfAttention<B>,
    pub intermediate: Linear<B>,
    pub output:       Linear<B>,
    pub norm:         LayerNorm<B>,
    pub dropout:      Dropout,
}

impl<B: Backend> BertLayer<B> {
    pub fn forward(&self, x: Tensor<B, 3>, mask_bias: Tensor<B, 4>) -> Tensor<B, 3> {
        let x   = self.attention.forward(x, mask_bias);
        let ffn = self.output.forward(gelu(self.intermediate.forward(x.clone())));
        self.norm.forward(x + self.dropout.forward(ffn))
    }
}

// ─── Full classifier ──────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct GlueClassifier<B: Backend> {
    pub embeddings: BertEmbeddings<B>,
    pub layers:     Vec<BertLayer<B>>,
    pub pooler:     Linear<B>,
    pub classifier: Linear<B>,
    pub dropout:    Dropout,
}

impl<B: Backend> GlueClassifier<B> {
    /// All inputs: [batch, seq_len] → logits: [batch, num_labels]
    pub fn forward(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        token_type_ids: Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
    ) -> Tensor<B, 2> {
        let [batch_size, seq_len] = input_ids.dims();

        // 1 → 0.0, 0 → MASK_BIAS, broadcast over heads and query positions
        let mask_bias = (attention_mask.float().neg() + 1.0)
            .mul_scalar(MASK_BIAS)
            .reshape([batch_size, 1, 1, seq_len]);

        let mut x = self.embeddings.forward(input_ids, token_type_ids);
        for layer in &self.layers {
            x = layer.forward(x, mask_bias.clone());
        }

        let [_, _, hidden] = x.dims();
        let cls    = x.slice([0..batch_size, 0..1, 0..hidden]).reshape([batch_size, hidden]);
        let pooled = tanh(self.pooler.forward(cls));

        self.classifier.forward(self.dropout.forward(pooled))
    }

    /// Cross-entropy loss and logits for a batch.
    pub fn forward_classification(&self, batch: GlueBatch<B>) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(batch.input_ids, batch.token_type_ids, batch.attention_mask);
        let loss   = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), batch.labels);
        (loss, logits)
    }

    /// Class probabilities for a batch: [batch, num_labels]
    pub fn probabilities(&self, batch: GlueBatch<B>) -> Tensor<B, 2> {
        softmax(self.forward(batch.input_ids, batch.token_type_ids, batch.attention_mask), 1)
    }
}
