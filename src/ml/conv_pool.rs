use burn::{
    module::Param,
    nn::Initializer,
    prelude::*,
    tensor::{activation::relu, module::conv2d, ops::ConvOptions},
};

use crate::error::{ModelError, ModelResult};

/// One bank of convolution filters sharing a single width.
///
/// Weights are `[nfilters, 1, width, emb_dim]`: each filter spans `width`
/// consecutive sequence positions and the full embedding depth, so a valid
/// convolution slides along the position axis only.
#[derive(Module, Debug)]
pub struct ConvFilterGroup<B: Backend> {
    weight: Param<Tensor<B, 4>>,
    bias:   Param<Tensor<B, 1>>,
    width:  usize,
}

impl<B: Backend> ConvFilterGroup<B> {
    fn new(width: usize, emb_dim: usize, nfilters: usize, device: &B::Device) -> Self {
        let weight = Initializer::Normal { mean: 0.0, std: 0.1 }
            .init([nfilters, 1, width, emb_dim], device);
        let bias = Initializer::Constant { value: 0.1 }.init([nfilters], device);
        Self { weight, bias, width }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// `[batch, 1, seq_len, emb_dim]` → `[batch, nfilters]`.
    ///
    /// Valid-only convolution leaves `seq_len - width + 1` positions; after
    /// bias and ReLU, a global max over that axis collapses each filter to
    /// its single most salient activation.
    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let conv = conv2d(
            x,
            self.weight.val(),
            Some(self.bias.val()),
            ConvOptions::new([1, 1], [0, 0], [1, 1], 1),
        );
        // conv: [batch, nfilters, seq_len - width + 1, 1]
        let pooled = relu(conv).max_dim(2);
        let [batch, nfilters, _, _] = pooled.dims();
        pooled.reshape([batch, nfilters])
    }
}

/// Parallel filter banks of differing widths over the embedded sequence.
///
/// The concatenated output has one entry per (width, filter) pair:
/// `nfilters * filter_widths.len()` features per example, independent of
/// `seq_len` and `emb_dim`. Multiple widths capture n-gram-like patterns of
/// varying span; the global max-pool makes the features position-invariant.
#[derive(Module, Debug)]
pub struct ConvPoolStack<B: Backend> {
    groups:   Vec<ConvFilterGroup<B>>,
    nfilters: usize,
}

impl<B: Backend> ConvPoolStack<B> {
    pub fn new(
        filter_widths: &[usize],
        emb_dim: usize,
        nfilters: usize,
        seq_len: usize,
        device: &B::Device,
    ) -> ModelResult<Self> {
        if filter_widths.is_empty() {
            return Err(ModelError::ConfigurationError(
                "at least one filter width is required".into(),
            ));
        }
        if nfilters == 0 {
            return Err(ModelError::ConfigurationError("filter count must be positive".into()));
        }
        for &width in filter_widths {
            if width == 0 || width > seq_len {
                return Err(ModelError::ConfigurationError(format!(
                    "filter width {width} outside the valid range 1..={seq_len}"
                )));
            }
        }
        let groups = filter_widths
            .iter()
            .map(|&w| ConvFilterGroup::new(w, emb_dim, nfilters, device))
            .collect();
        Ok(Self { groups, nfilters })
    }

    /// Length of the concatenated feature vector per example.
    pub fn feature_dim(&self) -> usize {
        self.nfilters * self.groups.len()
    }

    /// `[batch, seq_len, emb_dim]` → `[batch, nfilters * num_widths]`.
    pub fn forward(&self, embedded: Tensor<B, 3>) -> Tensor<B, 2> {
        let [batch, seq_len, emb_dim] = embedded.dims();
        // channel depth 1: each example is one seq_len × emb_dim feature map
        let x = embedded.reshape([batch, 1, seq_len, emb_dim]);
        let pooled: Vec<Tensor<B, 2>> =
            self.groups.iter().map(|g| g.forward(x.clone())).collect();
        Tensor::cat(pooled, 1)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_feature_vector_length() {
        // widths {3,4,5} x 3 filters → 9 features, whatever emb_dim/seq_len
        let device = Default::default();
        let stack =
            ConvPoolStack::<TestBackend>::new(&[3, 4, 5], 8, 3, 20, &device).unwrap();
        assert_eq!(stack.feature_dim(), 9);

        let embedded = Tensor::<TestBackend, 3>::zeros([2, 20, 8], &device);
        assert_eq!(stack.forward(embedded).dims(), [2, 9]);
    }

    #[test]
    fn test_single_width_shape() {
        let device = Default::default();
        let stack = ConvPoolStack::<TestBackend>::new(&[2], 4, 5, 6, &device).unwrap();
        let embedded = Tensor::<TestBackend, 3>::zeros([3, 6, 4], &device);
        assert_eq!(stack.forward(embedded).dims(), [3, 5]);
    }

    #[test]
    fn test_empty_width_set_rejected() {
        let device: <TestBackend as Backend>::Device = Default::default();
        assert!(matches!(
            ConvPoolStack::<TestBackend>::new(&[], 8, 3, 20, &device),
            Err(ModelError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_width_beyond_seq_len_rejected() {
        let device: <TestBackend as Backend>::Device = Default::default();
        assert!(matches!(
            ConvPoolStack::<TestBackend>::new(&[7], 8, 3, 6, &device),
            Err(ModelError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_zero_input_pools_to_bias_activation() {
        // all-zero input → conv output is the bias (0.1), ReLU keeps it,
        // max-pool returns it for every filter
        let device = Default::default();
        let stack = ConvPoolStack::<TestBackend>::new(&[2, 3], 4, 2, 5, &device).unwrap();
        let embedded = Tensor::<TestBackend, 3>::zeros([1, 5, 4], &device);
        let out: Vec<f32> = stack.forward(embedded).into_data().iter::<f32>().collect();
        assert_eq!(out.len(), 4);
        for v in out {
            assert!((v - 0.1).abs() < 1e-6);
        }
    }
}
