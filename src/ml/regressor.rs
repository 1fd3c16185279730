use burn::prelude::*;

use crate::error::{ModelError, ModelResult};
use crate::ml::embedding::EmbeddingLayer;
use crate::ml::head::PredictionHead;
use crate::ml::recurrent::{CellKind, RecurrentEncoder};

#[derive(Config, Debug)]
pub struct RnnRegConfig {
    pub vocab_size: usize,
    pub cell:       CellKind,
    #[config(default = 200)]
    pub emb_dim:    usize,
    #[config(default = 128)]
    pub hid_dim:    usize,
    #[config(default = 1)]
    pub nclass:     usize,
    /// Maximum (padded) sequence length.
    #[config(default = 40)]
    pub seq_len:    usize,
    #[config(default = 0)]
    pub pad_id:     u32,
    /// Identity-matrix embedding; forces emb_dim to vocab_size.
    #[config(default = false)]
    pub one_hot:    bool,
    #[config(default = 1)]
    pub nlayer:     usize,
    #[config(default = 0.0)]
    pub reg_lambda: f64,
    #[config(default = 1e-3)]
    pub lr:         f64,
    /// Pretrained embedding rows, `vocab_size` of them, `emb_dim` wide.
    pub init_embed: Option<Vec<Vec<f32>>>,
    #[config(default = true)]
    pub emb_trainable: bool,
    /// Dropout keep-probability on encoder input/output during training.
    #[config(default = 1.0)]
    pub keep_prob:  f64,
    /// Symmetric range for the uniform embedding init (random mode).
    #[config(default = 0.2)]
    pub emb_init_range: f64,
}

impl RnnRegConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ModelResult<RnnRegModel<B>> {
        if self.seq_len == 0 || self.nclass == 0 {
            return Err(ModelError::ConfigurationError(
                "seq_len and nclass must be positive".into(),
            ));
        }
        if self.pad_id as usize >= self.vocab_size {
            // padded rows are looked up like any other id, so the pad id
            // must be a valid table row
            return Err(ModelError::ConfigurationError(format!(
                "pad id {} outside vocabulary of size {}",
                self.pad_id, self.vocab_size
            )));
        }
        if self.reg_lambda < 0.0 {
            return Err(ModelError::ConfigurationError(format!(
                "reg_lambda must be non-negative, got {}",
                self.reg_lambda
            )));
        }
        if self.lr <= 0.0 {
            return Err(ModelError::ConfigurationError(format!(
                "learning rate must be positive, got {}",
                self.lr
            )));
        }

        let embedding = if self.one_hot {
            EmbeddingLayer::one_hot(self.vocab_size, device)?
        } else if let Some(rows) = &self.init_embed {
            EmbeddingLayer::from_pretrained(
                rows,
                self.vocab_size,
                self.emb_dim,
                self.emb_trainable,
                device,
            )?
        } else {
            EmbeddingLayer::trainable(
                self.vocab_size,
                self.emb_dim,
                self.emb_init_range,
                device,
            )?
        };

        let encoder = RecurrentEncoder::new(
            self.cell,
            embedding.emb_dim(),
            self.hid_dim,
            self.nlayer,
            self.keep_prob,
            device,
        )?;
        // final-layer hidden width matches the head by construction
        let head = PredictionHead::new(encoder.hid_dim(), self.nclass, device)?;

        tracing::info!(
            "RnnReg ready: {:?} x {} layers, hid_dim={}, emb_dim={}",
            self.cell,
            self.nlayer,
            self.hid_dim,
            embedding.emb_dim(),
        );
        Ok(RnnRegModel { embedding, encoder, head, pad_id: self.pad_id as usize })
    }
}

/// Recurrent sequence regressor: embed → masked unroll with last-valid-step
/// extraction → affine head, no output activation.
#[derive(Module, Debug)]
pub struct RnnRegModel<B: Backend> {
    pub embedding: EmbeddingLayer<B>,
    pub encoder:   RecurrentEncoder<B>,
    pub head:      PredictionHead<B>,
    pad_id:        usize,
}

pub struct RegressorOutput<B: Backend> {
    /// RMSE plus the weighted L2 term — what the optimizer sees.
    pub total_loss: Tensor<B, 1>,
    /// Root-mean-square error alone — what evaluation reports.
    pub data_loss:  Tensor<B, 1>,
    pub preds:      Tensor<B, 2>,
}

impl<B: Backend> RnnRegModel<B> {
    /// input_ids: [batch, seq_len] → predictions: [batch, nclass]
    pub fn forward(&self, input_ids: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let [batch, _seq_len] = input_ids.dims();
        // true length = count of non-pad ids per row
        let lengths = input_ids
            .clone()
            .not_equal_elem(self.pad_id as i32)
            .int()
            .sum_dim(1)
            .reshape([batch]);
        let embedded = self.embedding.forward(input_ids);
        let extracted = self.encoder.forward(embedded, lengths);
        self.head.forward(extracted)
    }

    /// Forward pass plus loss terms. The L2 penalty covers the head
    /// parameters only.
    pub fn forward_loss(
        &self,
        input_ids: Tensor<B, 2, Int>,
        targets: Tensor<B, 2>,
        reg_lambda: f64,
    ) -> RegressorOutput<B> {
        let preds = self.forward(input_ids);
        let data_loss = rmse(preds.clone(), targets);
        let total_loss = data_loss.clone() + self.head.l2_penalty().mul_scalar(reg_lambda);
        RegressorOutput { total_loss, data_loss, preds }
    }
}

/// Root-mean-square error over every (row, output) entry.
pub fn rmse<B: Backend>(preds: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
    (targets - preds).powf_scalar(2.0).mean().sqrt()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn config() -> RnnRegConfig {
        RnnRegConfig::new(10, CellKind::Lstm)
            .with_emb_dim(4)
            .with_hid_dim(16)
            .with_seq_len(12)
    }

    #[test]
    fn test_forward_shape() {
        let device = Default::default();
        let model: RnnRegModel<TestBackend> = config().init(&device).unwrap();
        let ids = Tensor::<TestBackend, 1, Int>::from_ints(
            [1, 3, 4, 5, 8, 0, 0, 0, 0, 0, 0, 0].as_slice(),
            &device,
        )
        .reshape([1, 12]);
        assert_eq!(model.forward(ids).dims(), [1, 1]);
    }

    #[test]
    fn test_rmse_zero_on_perfect_prediction() {
        let device = Default::default();
        let preds =
            Tensor::<TestBackend, 1>::from_floats([0.05].as_slice(), &device).reshape([1, 1]);
        let targets =
            Tensor::<TestBackend, 1>::from_floats([0.05].as_slice(), &device).reshape([1, 1]);
        let loss = rmse(preds, targets).into_scalar().elem::<f64>();
        assert_eq!(loss, 0.0);
    }

    #[test]
    fn test_rmse_known_value() {
        // errors (1, -1) → mean square 1 → rmse 1
        let device = Default::default();
        let preds = Tensor::<TestBackend, 1>::from_floats([1.0, 2.0].as_slice(), &device)
            .reshape([2, 1]);
        let targets = Tensor::<TestBackend, 1>::from_floats([2.0, 1.0].as_slice(), &device)
            .reshape([2, 1]);
        let loss = rmse(preds, targets).into_scalar().elem::<f64>();
        assert!((loss - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_one_hot_forces_emb_dim() {
        let device = Default::default();
        let model: RnnRegModel<TestBackend> =
            config().with_one_hot(true).init(&device).unwrap();
        assert_eq!(model.embedding.emb_dim(), 10);
    }

    #[test]
    fn test_pad_id_outside_vocab_rejected() {
        let device: <TestBackend as Backend>::Device = Default::default();
        let cfg = config().with_pad_id(10);
        assert!(matches!(
            cfg.init::<TestBackend>(&device),
            Err(ModelError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_pretrained_embeddings_used() {
        let device = Default::default();
        let rows: Vec<Vec<f32>> = (0..10).map(|i| vec![i as f32; 4]).collect();
        let cfg = config().with_init_embed(Some(rows)).with_emb_trainable(false);
        let model: RnnRegModel<TestBackend> = cfg.init(&device).unwrap();
        assert_eq!(model.embedding.emb_dim(), 4);
    }
}
