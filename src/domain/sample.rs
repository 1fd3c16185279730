// ============================================================
// Domain — Labeled Sequence Sample
// ============================================================
// One supervised example: an ordered list of integer token ids
// and its target vector. The same shape serves both models —
// the classifier reads the target as one-hot (or multi-label)
// class indicators, the regressor as real-valued outputs.

use serde::{Deserialize, Serialize};

/// A labelled training example before padding.
///
/// Token ids are non-negative and the natural length may be anything;
/// truncation/padding to a fixed length happens in the batcher, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceSample {
    /// Target vector, one entry per output unit.
    /// Classifier: one-hot / multi-label indicators. Regressor: real targets.
    pub label: Vec<f32>,

    /// Ordered token ids, natural (un-padded) length.
    pub tokens: Vec<u32>,
}

impl SequenceSample {
    pub fn new(label: Vec<f32>, tokens: Vec<u32>) -> Self {
        Self { label, tokens }
    }

    /// Natural length of the sequence before any padding.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
