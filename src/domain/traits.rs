// ============================================================
// Domain — Core Traits (Abstractions)
// ============================================================
// The shared contract both learners fulfil. Callers that drive
// training/evaluation program against this trait and can swap
// the classifier for the regressor without touching their loop.
//
// Implementations:
//   - TextCnnLearner → convolutional text classifier
//   - RnnRegLearner  → recurrent sequence regressor

use crate::domain::batch::{LabelBatch, PaddedBatch};
use crate::error::ModelResult;

/// A supervised model with one-transaction-per-call semantics.
///
/// `train_step` is the only operation that mutates model parameters; callers
/// must serialise concurrent use of one instance externally, since gradient
/// application is not commutative across overlapping updates.
pub trait SupervisedModel {
    /// What `predict` returns: class ids for the classifier,
    /// raw output vectors for the regressor.
    type Prediction;

    /// One forward/backward/update transaction over the batch.
    fn train_step(&mut self, inputs: &PaddedBatch, targets: &LabelBatch) -> ModelResult<()>;

    /// Loss and task metric (accuracy or RMSE) with dropout disabled.
    /// Never mutates parameters.
    fn eval_step(&self, inputs: &PaddedBatch, targets: &LabelBatch) -> ModelResult<(f64, f64)>;

    /// Inference without labels, dropout disabled.
    fn predict(&self, inputs: &PaddedBatch) -> ModelResult<Self::Prediction>;

    /// Number of optimizer updates applied so far. Monotonic.
    fn global_step(&self) -> usize;
}
