use burn::{module::Param, nn::Initializer, prelude::*};

use crate::error::{ModelError, ModelResult};

/// Affine projection from pooled/extracted features to output scores:
/// `scores = features @ W + b`.
///
/// `W` is Xavier-uniform initialised; `b` starts at a small positive
/// constant. The L2 penalty used for regularisation covers exactly these
/// two parameters and nothing else in the model.
#[derive(Module, Debug)]
pub struct PredictionHead<B: Backend> {
    weight: Param<Tensor<B, 2>>,
    bias:   Param<Tensor<B, 1>>,
    d_in:   usize,
    d_out:  usize,
}

impl<B: Backend> PredictionHead<B> {
    pub fn new(d_in: usize, d_out: usize, device: &B::Device) -> ModelResult<Self> {
        if d_in == 0 || d_out == 0 {
            return Err(ModelError::ConfigurationError(format!(
                "prediction head dimensions must be positive, got {d_in}x{d_out}"
            )));
        }
        let weight = Initializer::XavierUniform { gain: 1.0 }.init_with(
            [d_in, d_out],
            Some(d_in),
            Some(d_out),
            device,
        );
        let bias = Initializer::Constant { value: 0.1 }.init([d_out], device);
        Ok(Self { weight, bias, d_in, d_out })
    }

    pub fn d_in(&self) -> usize {
        self.d_in
    }

    pub fn d_out(&self) -> usize {
        self.d_out
    }

    /// `[batch, d_in]` → `[batch, d_out]`, no activation.
    pub fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        features.matmul(self.weight.val()) + self.bias.val().unsqueeze()
    }

    /// Squared norm of the head parameters: `‖W‖² + ‖b‖²`.
    pub fn l2_penalty(&self) -> Tensor<B, 1> {
        self.weight.val().powf_scalar(2.0).sum() + self.bias.val().powf_scalar(2.0).sum()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_projection_shape() {
        let device = Default::default();
        let head = PredictionHead::<TestBackend>::new(9, 2, &device).unwrap();
        let features = Tensor::<TestBackend, 2>::zeros([3, 9], &device);
        assert_eq!(head.forward(features).dims(), [3, 2]);
    }

    #[test]
    fn test_zero_features_give_bias() {
        // with x = 0 the projection reduces to the bias constant
        let device = Default::default();
        let head = PredictionHead::<TestBackend>::new(4, 3, &device).unwrap();
        let scores = head.forward(Tensor::zeros([1, 4], &device));
        let out: Vec<f32> = scores.into_data().iter::<f32>().collect();
        for v in out {
            assert!((v - 0.1).abs() < 1e-6);
        }
    }

    #[test]
    fn test_zero_dims_rejected() {
        let device: <TestBackend as Backend>::Device = Default::default();
        assert!(matches!(
            PredictionHead::<TestBackend>::new(0, 2, &device),
            Err(ModelError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_l2_penalty_positive() {
        // bias alone contributes d_out * 0.1^2
        let device = Default::default();
        let head = PredictionHead::<TestBackend>::new(2, 2, &device).unwrap();
        let l2 = head.l2_penalty().into_scalar().elem::<f64>();
        assert!(l2 >= 2.0 * 0.01 - 1e-6);
    }
}
