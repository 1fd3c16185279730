use burn::{
    nn::{Dropout, DropoutConfig},
    prelude::*,
    tensor::activation::log_softmax,
};

use crate::error::{ModelError, ModelResult};
use crate::ml::conv_pool::ConvPoolStack;
use crate::ml::embedding::EmbeddingLayer;
use crate::ml::head::PredictionHead;

#[derive(Config, Debug)]
pub struct TextCnnConfig {
    pub seq_len:       usize,
    pub emb_dim:       usize,
    pub nclass:        usize,
    pub vocab_size:    usize,
    pub filter_widths: Vec<usize>,
    pub nfilters:      usize,
    #[config(default = 0.0)]
    pub reg_lambda:    f64,
    #[config(default = 1e-3)]
    pub lr:            f64,
    /// Dropout keep-probability on the pooled features during training.
    #[config(default = 0.5)]
    pub keep_prob:     f64,
    /// Symmetric range for the uniform embedding init.
    #[config(default = 1.0)]
    pub emb_init_range: f64,
}

impl TextCnnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ModelResult<TextCnnModel<B>> {
        if self.seq_len == 0 || self.nclass == 0 {
            return Err(ModelError::ConfigurationError(
                "seq_len and nclass must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.keep_prob) || self.keep_prob == 0.0 {
            return Err(ModelError::ConfigurationError(format!(
                "dropout keep-probability must be in (0, 1], got {}",
                self.keep_prob
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

        let embedding = EmbeddingLayer::trainable(
            self.vocab_size,
            self.emb_dim,
            self.emb_init_range,
            device,
        )?;
        let conv_pool = ConvPoolStack::new(
            &self.filter_widths,
            self.emb_dim,
            self.nfilters,
            self.seq_len,
            device,
        )?;
        // feature width nfilters * num_widths matches the head by construction
        let head = PredictionHead::new(conv_pool.feature_dim(), self.nclass, device)?;
        let dropout = DropoutConfig::new(1.0 - self.keep_prob).init();

        tracing::info!(
            "TextCnn ready: {} widths x {} filters -> {} features, {} classes",
            self.filter_widths.len(),
            self.nfilters,
            conv_pool.feature_dim(),
            self.nclass,
        );
        Ok(TextCnnModel { embedding, conv_pool, dropout, head })
    }
}

/// Convolutional text classifier: embed → parallel conv/pool banks →
/// dropout → affine head.
#[derive(Module, Debug)]
pub struct TextCnnModel<B: Backend> {
    pub embedding: EmbeddingLayer<B>,
    pub conv_pool: ConvPoolStack<B>,
    pub dropout:   Dropout,
    pub head:      PredictionHead<B>,
}

pub struct ClassifierOutput<B: Backend> {
    /// Cross-entropy plus the weighted L2 term — what the optimizer sees.
    pub total_loss: Tensor<B, 1>,
    /// Mean softmax cross-entropy alone — what evaluation reports.
    pub data_loss:  Tensor<B, 1>,
    pub scores:     Tensor<B, 2>,
}

impl<B: Backend> TextCnnModel<B> {
    /// input_ids: [batch, seq_len] → class scores: [batch, nclass]
    pub fn forward(&self, input_ids: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let embedded = self.embedding.forward(input_ids);
        let features = self.conv_pool.forward(embedded);
        let features = self.dropout.forward(features);
        self.head.forward(features)
    }

    /// Forward pass plus loss terms. The L2 penalty covers the head
    /// parameters only.
    pub fn forward_loss(
        &self,
        input_ids: Tensor<B, 2, Int>,
        targets: Tensor<B, 2>,
        reg_lambda: f64,
    ) -> ClassifierOutput<B> {
        let scores = self.forward(input_ids);
        let data_loss = cross_entropy(scores.clone(), targets);
        let total_loss = data_loss.clone() + self.head.l2_penalty().mul_scalar(reg_lambda);
        ClassifierOutput { total_loss, data_loss, scores }
    }

    /// Discrete predictions: argmax over the class axis, shape [batch].
    pub fn predictions(scores: Tensor<B, 2>) -> Tensor<B, 1, Int> {
        scores.argmax(1).flatten::<1>(0, 1)
    }
}

/// Mean softmax cross-entropy against one-hot (or multi-label) float
/// indicators, in the numerically stable log-softmax form.
pub fn cross_entropy<B: Backend>(scores: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
    let log_probs = log_softmax(scores, 1);
    (targets * log_probs).sum_dim(1).neg().mean()
}

/// Fraction of rows whose argmax matches the target argmax.
pub fn accuracy<B: Backend>(scores: Tensor<B, 2>, targets: Tensor<B, 2>) -> f64 {
    let batch = scores.dims()[0];
    let preds = TextCnnModel::predictions(scores);
    let truth = targets.argmax(1).flatten::<1>(0, 1);
    let correct: i64 = preds.equal(truth).int().sum().into_scalar().elem::<i64>();
    correct as f64 / batch as f64
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn config() -> TextCnnConfig {
        TextCnnConfig::new(20, 8, 2, 30, vec![3, 4, 5], 3)
    }

    #[test]
    fn test_forward_shape() {
        let device = Default::default();
        let model: TextCnnModel<TestBackend> = config().init(&device).unwrap();
        let ids = Tensor::<TestBackend, 2, Int>::zeros([4, 20], &device);
        assert_eq!(model.forward(ids).dims(), [4, 2]);
    }

    #[test]
    fn test_head_width_follows_filter_geometry() {
        let device = Default::default();
        let model: TextCnnModel<TestBackend> = config().init(&device).unwrap();
        assert_eq!(model.head.d_in(), 9);
    }

    #[test]
    fn test_empty_filter_widths_fail_construction() {
        let device: <TestBackend as Backend>::Device = Default::default();
        let cfg = TextCnnConfig::new(20, 8, 2, 30, vec![], 3);
        assert!(matches!(
            cfg.init::<TestBackend>(&device),
            Err(ModelError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_cross_entropy_uniform_scores() {
        // equal scores → loss = ln(nclass)
        let device = Default::default();
        let scores = Tensor::<TestBackend, 2>::zeros([2, 4], &device);
        let targets = Tensor::<TestBackend, 1>::from_floats(
            [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0].as_slice(),
            &device,
        )
        .reshape([2, 4]);
        let loss = cross_entropy(scores, targets).into_scalar().elem::<f64>();
        assert!((loss - (4.0f64).ln()).abs() < 1e-6);
    }

    #[test]
    fn test_accuracy_counts_argmax_agreement() {
        let device = Default::default();
        let scores = Tensor::<TestBackend, 1>::from_floats(
            [5.0, 0.0, 0.0, 9.0].as_slice(),
            &device,
        )
        .reshape([2, 2]);
        let targets = Tensor::<TestBackend, 1>::from_floats(
            [1.0, 0.0, 1.0, 0.0].as_slice(),
            &device,
        )
        .reshape([2, 2]);
        assert!((accuracy(scores, targets) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_l2_term_raises_total_loss() {
        let device = Default::default();
        let model: TextCnnModel<TestBackend> = config().init(&device).unwrap();
        let ids = Tensor::<TestBackend, 2, Int>::zeros([2, 20], &device);
        let targets = Tensor::<TestBackend, 1>::from_floats(
            [1.0, 0.0, 0.0, 1.0].as_slice(),
            &device,
        )
        .reshape([2, 2]);
        let out = model.forward_loss(ids, targets, 0.1);
        let total = out.total_loss.into_scalar().elem::<f64>();
        let data = out.data_loss.into_scalar().elem::<f64>();
        assert!(total > data);
    }
}
