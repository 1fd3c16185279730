use burn::{
    module::{Param, ParamId},
    nn::Initializer,
    prelude::*,
    tensor::module::embedding,
};

use crate::domain::batch::PaddedBatch;
use crate::error::{ModelError, ModelResult};

/// Token-id → dense-vector lookup table.
///
/// Three construction modes:
///   - `trainable`: uniform init over a symmetric range, updated by the
///     optimizer like any other parameter.
///   - `from_pretrained`: caller-supplied rows (e.g. word vectors), either
///     fine-tuned or frozen.
///   - `one_hot`: the identity matrix — emb_dim is forced to vocab_size and
///     nothing is trainable.
#[derive(Module, Debug)]
pub struct EmbeddingLayer<B: Backend> {
    table:      Param<Tensor<B, 2>>,
    vocab_size: usize,
    emb_dim:    usize,
}

impl<B: Backend> EmbeddingLayer<B> {
    /// Random table, uniform over `[-init_range, init_range]`.
    pub fn trainable(
        vocab_size: usize,
        emb_dim: usize,
        init_range: f64,
        device: &B::Device,
    ) -> ModelResult<Self> {
        if vocab_size == 0 || emb_dim == 0 {
            return Err(ModelError::ConfigurationError(
                "vocab_size and emb_dim must be positive".into(),
            ));
        }
        if init_range <= 0.0 {
            return Err(ModelError::ConfigurationError(format!(
                "embedding init range must be positive, got {init_range}"
            )));
        }
        let table = Initializer::Uniform { min: -init_range, max: init_range }
            .init([vocab_size, emb_dim], device);
        Ok(Self { table, vocab_size, emb_dim })
    }

    /// Caller-supplied rows, one per vocabulary entry. `trainable: false`
    /// keeps the table out of gradient tracking entirely.
    pub fn from_pretrained(
        rows: &[Vec<f32>],
        expected_vocab: usize,
        expected_dim: usize,
        trainable: bool,
        device: &B::Device,
    ) -> ModelResult<Self> {
        if rows.len() != expected_vocab {
            return Err(ModelError::ShapeMismatch {
                expected: format!("{expected_vocab} pretrained rows"),
                actual:   format!("{} pretrained rows", rows.len()),
            });
        }
        if let Some(bad) = rows.iter().find(|r| r.len() != expected_dim) {
            return Err(ModelError::ShapeMismatch {
                expected: format!("pretrained row of width {expected_dim}"),
                actual:   format!("pretrained row of width {}", bad.len()),
            });
        }
        let flat: Vec<f32> = rows.iter().flatten().copied().collect();
        let tensor = Tensor::<B, 1>::from_floats(flat.as_slice(), device)
            .reshape([expected_vocab, expected_dim]);
        let table = if trainable {
            Param::from_tensor(tensor)
        } else {
            Param::initialized(ParamId::new(), tensor)
        };
        Ok(Self { table, vocab_size: expected_vocab, emb_dim: expected_dim })
    }

    /// Identity table: token `i` maps to unit vector `e_i`. Frozen.
    pub fn one_hot(vocab_size: usize, device: &B::Device) -> ModelResult<Self> {
        if vocab_size == 0 {
            return Err(ModelError::ConfigurationError("vocab_size must be positive".into()));
        }
        let mut flat = vec![0.0f32; vocab_size * vocab_size];
        for i in 0..vocab_size {
            flat[i * vocab_size + i] = 1.0;
        }
        let tensor =
            Tensor::<B, 1>::from_floats(flat.as_slice(), device).reshape([vocab_size, vocab_size]);
        Ok(Self {
            table:      Param::initialized(ParamId::new(), tensor),
            vocab_size,
            emb_dim:    vocab_size,
        })
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    pub fn emb_dim(&self) -> usize {
        self.emb_dim
    }

    /// Every id in the batch must be `< vocab_size`. Out-of-range ids are a
    /// hard error, never clamped.
    pub fn check_ids(&self, batch: &PaddedBatch) -> ModelResult<()> {
        for row in batch.rows() {
            if let Some(&id) = row.iter().find(|&&id| id as usize >= self.vocab_size) {
                return Err(ModelError::IndexOutOfRange { id, vocab_size: self.vocab_size });
            }
        }
        Ok(())
    }

    /// `[batch, seq_len]` ids → `[batch, seq_len, emb_dim]` by row lookup.
    pub fn forward(&self, ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        embedding(self.table.val(), ids)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_lookup_shape() {
        let device = Default::default();
        let layer = EmbeddingLayer::<TestBackend>::trainable(10, 4, 1.0, &device).unwrap();
        let ids = Tensor::<TestBackend, 1, Int>::from_ints([1, 3, 4, 5, 8, 0].as_slice(), &device)
            .reshape([1, 6]);
        assert_eq!(layer.forward(ids).dims(), [1, 6, 4]);
    }

    #[test]
    fn test_one_hot_is_identity() {
        let device = Default::default();
        let layer = EmbeddingLayer::<TestBackend>::one_hot(4, &device).unwrap();
        assert_eq!(layer.emb_dim(), 4);

        let ids =
            Tensor::<TestBackend, 1, Int>::from_ints([2, 0].as_slice(), &device).reshape([1, 2]);
        let out: Vec<f32> = layer.forward(ids).into_data().iter::<f32>().collect();
        assert_eq!(out, vec![0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_pretrained_rows_looked_up() {
        let device = Default::default();
        let rows = vec![vec![0.0, 0.0], vec![1.0, 2.0], vec![3.0, 4.0]];
        let layer =
            EmbeddingLayer::<TestBackend>::from_pretrained(&rows, 3, 2, false, &device).unwrap();
        let ids =
            Tensor::<TestBackend, 1, Int>::from_ints([2, 1].as_slice(), &device).reshape([1, 2]);
        let out: Vec<f32> = layer.forward(ids).into_data().iter::<f32>().collect();
        assert_eq!(out, vec![3.0, 4.0, 1.0, 2.0]);
    }

    #[test]
    fn test_pretrained_shape_mismatch() {
        let device = Default::default();
        let rows = vec![vec![1.0, 2.0]];
        let err = EmbeddingLayer::<TestBackend>::from_pretrained(&rows, 3, 2, true, &device)
            .unwrap_err();
        assert!(matches!(err, ModelError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_out_of_range_id_rejected() {
        let device = Default::default();
        let layer = EmbeddingLayer::<TestBackend>::trainable(5, 3, 1.0, &device).unwrap();
        let batch = PaddedBatch::new(vec![vec![1, 5, 0]]).unwrap();
        let err = layer.check_ids(&batch).unwrap_err();
        assert!(matches!(err, ModelError::IndexOutOfRange { id: 5, vocab_size: 5 }));
    }
}
