// ============================================================
// ML — Learners (one optimizer transaction per call)
// ============================================================
// A learner owns the only long-lived mutable state in the system:
// the model parameters, the Adam optimizer moments, and the step
// counter. `train_step` is the single writer; `eval_step` and
// `predict` run on the inner backend via model.valid(), which
// also disables dropout.
//
//   m = β1*m + (1-β1)*g        (mean)
//   v = β2*v + (1-β2)*g²       (variance)
//   θ = θ - lr * m / (√v + ε)  (update)

use burn::{
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use rand::Rng;

use crate::data::batcher::{input_tensor, target_tensor};
use crate::domain::batch::{LabelBatch, PaddedBatch};
use crate::domain::traits::SupervisedModel;
use crate::error::{ModelError, ModelResult};
use crate::ml::classifier::{accuracy, TextCnnConfig, TextCnnModel};
use crate::ml::regressor::{RnnRegConfig, RnnRegModel};

/// CPU execution context used by the tests and as a sensible default.
pub type CpuBackend = burn::backend::NdArray;
pub type CpuAutodiffBackend = burn::backend::Autodiff<CpuBackend>;

// ─── Periodic evaluation hook ─────────────────────────────────────────────────
/// A named held-out set evaluated with probability `prob` after a
/// training step.
pub struct EvalSet<'a> {
    pub name:    &'a str,
    pub prob:    f64,
    pub inputs:  &'a PaddedBatch,
    pub targets: &'a LabelBatch,
}

/// Result of one scheduled evaluation.
#[derive(Debug, Clone)]
pub struct EvalOutcome {
    pub name:   String,
    pub loss:   f64,
    pub metric: f64,
}

/// One training step followed by randomly scheduled evaluations of the
/// given named sets. Skipped sets produce no outcome.
pub fn train_step_with_evals<M: SupervisedModel>(
    model: &mut M,
    inputs: &PaddedBatch,
    targets: &LabelBatch,
    evals: &[EvalSet<'_>],
) -> ModelResult<Vec<EvalOutcome>> {
    model.train_step(inputs, targets)?;

    let mut rng = rand::thread_rng();
    let mut outcomes = Vec::new();
    for set in evals {
        if rng.gen::<f64>() < set.prob {
            let (loss, metric) = model.eval_step(set.inputs, set.targets)?;
            tracing::info!(
                "step {}: {} loss={:.6} metric={:.6}",
                model.global_step(),
                set.name,
                loss,
                metric,
            );
            outcomes.push(EvalOutcome { name: set.name.to_string(), loss, metric });
        }
    }
    Ok(outcomes)
}

// ─── Classifier learner ───────────────────────────────────────────────────────
pub struct TextCnnLearner<B: AutodiffBackend, O> {
    model:  TextCnnModel<B>,
    optim:  O,
    config: TextCnnConfig,
    device: B::Device,
    step:   usize,
}

impl TextCnnConfig {
    /// Build the model and its optimizer on the given device.
    pub fn init_learner<B: AutodiffBackend>(
        &self,
        device: &B::Device,
    ) -> ModelResult<TextCnnLearner<B, impl Optimizer<TextCnnModel<B>, B>>> {
        let model = self.init::<B>(device)?;
        let optim = AdamConfig::new()
            .with_epsilon(1e-8)
            .init::<B, TextCnnModel<B>>();
        Ok(TextCnnLearner {
            model,
            optim,
            config: self.clone(),
            device: device.clone(),
            step: 0,
        })
    }
}

impl<B: AutodiffBackend, O: Optimizer<TextCnnModel<B>, B>> TextCnnLearner<B, O> {
    pub fn model(&self) -> &TextCnnModel<B> {
        &self.model
    }

    pub fn config(&self) -> &TextCnnConfig {
        &self.config
    }

    fn check_inputs(&self, inputs: &PaddedBatch) -> ModelResult<()> {
        if inputs.seq_len() != self.config.seq_len {
            return Err(ModelError::ShapeMismatch {
                expected: format!("sequence length {}", self.config.seq_len),
                actual:   format!("sequence length {}", inputs.seq_len()),
            });
        }
        self.model.embedding.check_ids(inputs)
    }

    fn check_batch(&self, inputs: &PaddedBatch, targets: &LabelBatch) -> ModelResult<()> {
        self.check_inputs(inputs)?;
        if targets.nclass() != self.config.nclass {
            return Err(ModelError::ShapeMismatch {
                expected: format!("label arity {}", self.config.nclass),
                actual:   format!("label arity {}", targets.nclass()),
            });
        }
        if inputs.batch_size() != targets.batch_size() {
            return Err(ModelError::ShapeMismatch {
                expected: format!("{} label rows", inputs.batch_size()),
                actual:   format!("{} label rows", targets.batch_size()),
            });
        }
        Ok(())
    }
}

impl<B: AutodiffBackend, O: Optimizer<TextCnnModel<B>, B>> SupervisedModel
    for TextCnnLearner<B, O>
{
    type Prediction = Vec<i64>;

    fn train_step(&mut self, inputs: &PaddedBatch, targets: &LabelBatch) -> ModelResult<()> {
        self.check_batch(inputs, targets)?;
        let inputs_t = input_tensor::<B>(inputs, &self.device);
        let targets_t = target_tensor::<B>(targets, &self.device);

        let model = self.model.clone();
        let out = model.forward_loss(inputs_t, targets_t, self.config.reg_lambda);
        let loss_val: f64 = out.data_loss.into_scalar().elem::<f64>();

        let grads = GradientsParams::from_grads(out.total_loss.backward(), &model);
        self.model = self.optim.step(self.config.lr, model, grads);
        self.step += 1;

        tracing::debug!("classifier step {}: train_loss={:.6}", self.step, loss_val);
        Ok(())
    }

    fn eval_step(&self, inputs: &PaddedBatch, targets: &LabelBatch) -> ModelResult<(f64, f64)> {
        self.check_batch(inputs, targets)?;
        let model = self.model.valid();
        let inputs_t = input_tensor::<B::InnerBackend>(inputs, &self.device);
        let targets_t = target_tensor::<B::InnerBackend>(targets, &self.device);

        let out = model.forward_loss(inputs_t, targets_t.clone(), 0.0);
        let loss = out.data_loss.into_scalar().elem::<f64>();
        let acc = accuracy(out.scores, targets_t);
        Ok((loss, acc))
    }

    fn predict(&self, inputs: &PaddedBatch) -> ModelResult<Vec<i64>> {
        self.check_inputs(inputs)?;
        let model = self.model.valid();
        let scores = model.forward(input_tensor::<B::InnerBackend>(inputs, &self.device));
        let preds = TextCnnModel::<B::InnerBackend>::predictions(scores);
        Ok(preds.into_data().iter::<i64>().collect())
    }

    fn global_step(&self) -> usize {
        self.step
    }
}

// ─── Regressor learner ────────────────────────────────────────────────────────
pub struct RnnRegLearner<B: AutodiffBackend, O> {
    model:  RnnRegModel<B>,
    optim:  O,
    config: RnnRegConfig,
    device: B::Device,
    step:   usize,
}

impl RnnRegConfig {
    /// Build the model and its optimizer on the given device.
    pub fn init_learner<B: AutodiffBackend>(
        &self,
        device: &B::Device,
    ) -> ModelResult<RnnRegLearner<B, impl Optimizer<RnnRegModel<B>, B>>> {
        let model = self.init::<B>(device)?;
        let optim = AdamConfig::new()
            .with_epsilon(1e-8)
            .init::<B, RnnRegModel<B>>();
        Ok(RnnRegLearner {
            model,
            optim,
            config: self.clone(),
            device: device.clone(),
            step: 0,
        })
    }
}

impl<B: AutodiffBackend, O: Optimizer<RnnRegModel<B>, B>> RnnRegLearner<B, O> {
    pub fn model(&self) -> &RnnRegModel<B> {
        &self.model
    }

    pub fn config(&self) -> &RnnRegConfig {
        &self.config
    }

    fn check_inputs(&self, inputs: &PaddedBatch) -> ModelResult<()> {
        if inputs.seq_len() != self.config.seq_len {
            return Err(ModelError::ShapeMismatch {
                expected: format!("sequence length {}", self.config.seq_len),
                actual:   format!("sequence length {}", inputs.seq_len()),
            });
        }
        self.model.embedding.check_ids(inputs)?;
        // a row of only pad ids has no last valid timestep to extract
        if inputs
            .true_lengths(self.config.pad_id)
            .iter()
            .any(|&len| len == 0)
        {
            return Err(ModelError::InvalidInput(
                "sequence with true length 0 (all padding)".into(),
            ));
        }
        Ok(())
    }

    fn check_batch(&self, inputs: &PaddedBatch, targets: &LabelBatch) -> ModelResult<()> {
        self.check_inputs(inputs)?;
        if targets.nclass() != self.config.nclass {
            return Err(ModelError::ShapeMismatch {
                expected: format!("label arity {}", self.config.nclass),
                actual:   format!("label arity {}", targets.nclass()),
            });
        }
        if inputs.batch_size() != targets.batch_size() {
            return Err(ModelError::ShapeMismatch {
                expected: format!("{} label rows", inputs.batch_size()),
                actual:   format!("{} label rows", targets.batch_size()),
            });
        }
        Ok(())
    }
}

impl<B: AutodiffBackend, O: Optimizer<RnnRegModel<B>, B>> SupervisedModel for RnnRegLearner<B, O> {
    type Prediction = Vec<Vec<f32>>;

    fn train_step(&mut self, inputs: &PaddedBatch, targets: &LabelBatch) -> ModelResult<()> {
        self.check_batch(inputs, targets)?;
        let inputs_t = input_tensor::<B>(inputs, &self.device);
        let targets_t = target_tensor::<B>(targets, &self.device);

        let model = self.model.clone();
        let out = model.forward_loss(inputs_t, targets_t, self.config.reg_lambda);
        let loss_val: f64 = out.data_loss.into_scalar().elem::<f64>();

        let grads = GradientsParams::from_grads(out.total_loss.backward(), &model);
        self.model = self.optim.step(self.config.lr, model, grads);
        self.step += 1;

        tracing::debug!("regressor step {}: train_loss={:.6}", self.step, loss_val);
        Ok(())
    }

    fn eval_step(&self, inputs: &PaddedBatch, targets: &LabelBatch) -> ModelResult<(f64, f64)> {
        self.check_batch(inputs, targets)?;
        let model = self.model.valid();
        let inputs_t = input_tensor::<B::InnerBackend>(inputs, &self.device);
        let targets_t = target_tensor::<B::InnerBackend>(targets, &self.device);

        let out = model.forward_loss(inputs_t, targets_t, 0.0);
        let loss = out.data_loss.into_scalar().elem::<f64>();
        // for the regressor the task metric and the loss are both the RMSE
        Ok((loss, loss))
    }

    fn predict(&self, inputs: &PaddedBatch) -> ModelResult<Vec<Vec<f32>>> {
        self.check_inputs(inputs)?;
        let model = self.model.valid();
        let preds = model.forward(input_tensor::<B::InnerBackend>(inputs, &self.device));
        let flat: Vec<f32> = preds.into_data().iter::<f32>().collect();
        Ok(flat
            .chunks(self.config.nclass)
            .map(|row| row.to_vec())
            .collect())
    }

    fn global_step(&self) -> usize {
        self.step
    }
}
