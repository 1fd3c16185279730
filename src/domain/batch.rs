// ============================================================
// Domain — Padded Batch Types
// ============================================================
// Fixed-shape views of a mini-batch, constructed fresh per call
// and discarded afterwards. These are plain Rust — tensor
// materialisation happens in the data layer so the domain stays
// free of framework types.

use crate::error::{ModelError, ModelResult};

/// A `[batch_size, seq_len]` block of token ids.
///
/// Invariant: every row has length exactly `seq_len`. Rows are sequences
/// right-padded with the pad id (or truncated) by the batcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaddedBatch {
    rows:    Vec<Vec<u32>>,
    seq_len: usize,
}

impl PaddedBatch {
    /// Build from pre-padded rows. Fails unless all rows share one length.
    pub fn new(rows: Vec<Vec<u32>>) -> ModelResult<Self> {
        let Some(first) = rows.first() else {
            return Err(ModelError::InvalidInput("empty batch".into()));
        };
        let seq_len = first.len();
        if seq_len == 0 {
            return Err(ModelError::InvalidInput("zero-length rows".into()));
        }
        if let Some(bad) = rows.iter().find(|r| r.len() != seq_len) {
            return Err(ModelError::ShapeMismatch {
                expected: format!("row of length {seq_len}"),
                actual:   format!("row of length {}", bad.len()),
            });
        }
        Ok(Self { rows, seq_len })
    }

    pub fn batch_size(&self) -> usize {
        self.rows.len()
    }

    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    pub fn rows(&self) -> &[Vec<u32>] {
        &self.rows
    }

    /// Per-row count of non-pad tokens — the "true length" of each
    /// sequence before padding was applied. Padding is always a suffix,
    /// but counting occurrences is exact even so, because the batcher
    /// rejects sequences that carry the pad id as a real token.
    pub fn true_lengths(&self, pad_id: u32) -> Vec<usize> {
        self.rows
            .iter()
            .map(|r| r.iter().filter(|&&t| t != pad_id).count())
            .collect()
    }

    /// Largest token id in the batch, for vocabulary-range checks.
    pub fn max_id(&self) -> u32 {
        self.rows
            .iter()
            .flat_map(|r| r.iter().copied())
            .max()
            .unwrap_or(0)
    }
}

/// A `[batch_size, nclass]` block of float targets.
///
/// Invariant: every row has length exactly `nclass`.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelBatch {
    rows:   Vec<Vec<f32>>,
    nclass: usize,
}

impl LabelBatch {
    pub fn new(rows: Vec<Vec<f32>>) -> ModelResult<Self> {
        let Some(first) = rows.first() else {
            return Err(ModelError::InvalidInput("empty label batch".into()));
        };
        let nclass = first.len();
        if nclass == 0 {
            return Err(ModelError::InvalidInput("zero-width labels".into()));
        }
        if let Some(bad) = rows.iter().find(|r| r.len() != nclass) {
            return Err(ModelError::ShapeMismatch {
                expected: format!("label of arity {nclass}"),
                actual:   format!("label of arity {}", bad.len()),
            });
        }
        Ok(Self { rows, nclass })
    }

    pub fn batch_size(&self) -> usize {
        self.rows.len()
    }

    pub fn nclass(&self) -> usize {
        self.nclass
    }

    pub fn rows(&self) -> &[Vec<f32>] {
        &self.rows
    }
}
