// ============================================================
// Data — Sequence Batcher
// ============================================================
// Maps irregular-length token sequences into fixed-shape tensors:
//
//   pad          → one row, truncated or right-padded to seq_len
//   sample_batch → batch_size rows drawn uniformly with replacement,
//                  stacked with their label rows
//   to_tensors   → flatten all rows into one Vec, then reshape
//                  [s1_t1 ... s1_tS, s2_t1 ... sN_tS] → [N, S]
//
// The batcher also implements Burn's Batcher trait so it plugs
// into a DataLoader for epoch-style iteration.

use burn::{data::dataloader::batcher::Batcher, prelude::*};
use rand::Rng;

use crate::data::dataset::SequenceDataset;
use crate::domain::batch::{LabelBatch, PaddedBatch};
use crate::domain::sample::SequenceSample;
use crate::error::{ModelError, ModelResult};

// ─── SequenceBatch ────────────────────────────────────────────────────────────
/// A batch materialised on the execution backend, ready for a forward pass.
#[derive(Debug, Clone)]
pub struct SequenceBatch<B: Backend> {
    /// Token ids — shape `[batch_size, seq_len]`.
    pub inputs: Tensor<B, 2, Int>,

    /// Float targets — shape `[batch_size, nclass]`.
    pub targets: Tensor<B, 2>,
}

// ─── SequenceBatcher ──────────────────────────────────────────────────────────
/// Pads, samples, and stacks sequences for one model configuration.
///
/// Holds the target device so tensors land on the right backend device,
/// plus the padding geometry (`seq_len`, `pad_id`) and expected label
/// arity (`nclass`).
#[derive(Clone, Debug)]
pub struct SequenceBatcher<B: Backend> {
    device:  B::Device,
    seq_len: usize,
    pad_id:  u32,
    nclass:  usize,
}

impl<B: Backend> SequenceBatcher<B> {
    /// A zero fixed length can never hold a token, so it is rejected here
    /// rather than surfacing as a shape error on every later call.
    pub fn new(device: B::Device, seq_len: usize, pad_id: u32, nclass: usize) -> ModelResult<Self> {
        if seq_len == 0 {
            return Err(ModelError::InvalidInput(
                "fixed sequence length must be positive".into(),
            ));
        }
        if nclass == 0 {
            return Err(ModelError::InvalidInput("label arity must be positive".into()));
        }
        Ok(Self { device, seq_len, pad_id, nclass })
    }

    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    pub fn pad_id(&self) -> u32 {
        self.pad_id
    }

    /// Truncate to the first `seq_len` tokens, or append `pad_id` until the
    /// row reaches `seq_len`.
    ///
    /// Empty sequences are rejected (their "last valid timestep" does not
    /// exist), and so are sequences that already contain `pad_id` as a real
    /// token — the pad id is reserved, and admitting it would silently
    /// corrupt true-length computation downstream.
    pub fn pad(&self, tokens: &[u32]) -> ModelResult<Vec<u32>> {
        if tokens.is_empty() {
            return Err(ModelError::InvalidInput("empty sequence".into()));
        }
        if tokens.contains(&self.pad_id) {
            return Err(ModelError::InvalidInput(format!(
                "sequence contains reserved pad id {}",
                self.pad_id
            )));
        }
        let mut row: Vec<u32> = tokens.iter().take(self.seq_len).copied().collect();
        row.resize(self.seq_len, self.pad_id);
        Ok(row)
    }

    /// Pad every sequence and stack into a `[n, seq_len]` block.
    pub fn pad_batch(&self, sequences: &[Vec<u32>]) -> ModelResult<PaddedBatch> {
        let rows = sequences
            .iter()
            .map(|s| self.pad(s))
            .collect::<ModelResult<Vec<_>>>()?;
        PaddedBatch::new(rows)
    }

    /// Draw `batch_size` samples uniformly at random **with replacement**,
    /// pad each sequence, and stack inputs and labels.
    pub fn sample_batch(
        &self,
        dataset: &SequenceDataset,
        batch_size: usize,
    ) -> ModelResult<(PaddedBatch, LabelBatch)> {
        if batch_size == 0 {
            return Err(ModelError::InvalidInput("batch size must be positive".into()));
        }
        let n = dataset.sample_count();
        if n == 0 {
            return Err(ModelError::InvalidInput("cannot sample from an empty dataset".into()));
        }

        let mut rng = rand::thread_rng();
        let mut input_rows = Vec::with_capacity(batch_size);
        let mut label_rows = Vec::with_capacity(batch_size);
        for _ in 0..batch_size {
            let idx = rng.gen_range(0..n);
            // get() cannot miss for idx < n; treat a miss as a malformed pair
            let sample = burn::data::dataset::Dataset::get(dataset, idx)
                .ok_or_else(|| ModelError::InvalidInput(format!("unreadable sample {idx}")))?;
            self.check_label(&sample)?;
            input_rows.push(self.pad(&sample.tokens)?);
            label_rows.push(sample.label);
        }

        let inputs = PaddedBatch::new(input_rows)?;
        let labels = LabelBatch::new(label_rows)?;
        tracing::debug!(
            "Sampled batch: [{}, {}] inputs, [{}, {}] labels",
            inputs.batch_size(),
            inputs.seq_len(),
            labels.batch_size(),
            labels.nclass(),
        );
        Ok((inputs, labels))
    }

    /// Materialise a padded batch and its labels on the backend.
    pub fn to_tensors(
        &self,
        inputs: &PaddedBatch,
        labels: &LabelBatch,
    ) -> ModelResult<SequenceBatch<B>> {
        if inputs.batch_size() != labels.batch_size() {
            return Err(ModelError::ShapeMismatch {
                expected: format!("{} label rows", inputs.batch_size()),
                actual:   format!("{} label rows", labels.batch_size()),
            });
        }
        Ok(SequenceBatch {
            inputs:  input_tensor::<B>(inputs, &self.device),
            targets: target_tensor::<B>(labels, &self.device),
        })
    }

    fn check_label(&self, sample: &SequenceSample) -> ModelResult<()> {
        if sample.label.len() != self.nclass {
            return Err(ModelError::InvalidInput(format!(
                "label arity {} does not match configured class count {}",
                sample.label.len(),
                self.nclass
            )));
        }
        if sample.label.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::InvalidInput("non-finite label value".into()));
        }
        Ok(())
    }
}

/// `[batch, seq_len]` Int tensor from a padded batch — flatten then reshape.
pub fn input_tensor<B: Backend>(batch: &PaddedBatch, device: &B::Device) -> Tensor<B, 2, Int> {
    let flat: Vec<i32> = batch
        .rows()
        .iter()
        .flat_map(|r| r.iter().map(|&t| t as i32))
        .collect();
    Tensor::<B, 1, Int>::from_ints(flat.as_slice(), device)
        .reshape([batch.batch_size(), batch.seq_len()])
}

/// `[batch, nclass]` float tensor from a label batch.
pub fn target_tensor<B: Backend>(labels: &LabelBatch, device: &B::Device) -> Tensor<B, 2> {
    let flat: Vec<f32> = labels.rows().iter().flatten().copied().collect();
    Tensor::<B, 1>::from_floats(flat.as_slice(), device)
        .reshape([labels.batch_size(), labels.nclass()])
}

// ─── Burn Batcher Trait Implementation ────────────────────────────────────────
// The DataLoader seam. The trait has no error channel, so samples must be
// validated when the dataset is built; a malformed sample here is a
// programming error and panics with the underlying message.
impl<B: Backend> Batcher<SequenceSample, SequenceBatch<B>> for SequenceBatcher<B> {
    fn batch(&self, items: Vec<SequenceSample>) -> SequenceBatch<B> {
        let input_rows: Vec<Vec<u32>> = items
            .iter()
            .map(|s| match self.pad(&s.tokens) {
                Ok(row) => row,
                Err(e) => panic!("unvalidated sample reached the dataloader: {e}"),
            })
            .collect();
        let label_rows: Vec<Vec<f32>> = items.into_iter().map(|s| s.label).collect();

        let inputs = match PaddedBatch::new(input_rows) {
            Ok(b) => b,
            Err(e) => panic!("unvalidated batch reached the dataloader: {e}"),
        };
        let labels = match LabelBatch::new(label_rows) {
            Ok(b) => b,
            Err(e) => panic!("unvalidated batch reached the dataloader: {e}"),
        };

        SequenceBatch {
            inputs:  input_tensor::<B>(&inputs, &self.device),
            targets: target_tensor::<B>(&labels, &self.device),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn batcher(seq_len: usize, nclass: usize) -> SequenceBatcher<TestBackend> {
        SequenceBatcher::new(Default::default(), seq_len, 0, nclass).unwrap()
    }

    #[test]
    fn test_pad_short_sequence() {
        // prefix is the original sequence, suffix is all pad id
        let b = batcher(40, 1);
        let row = b.pad(&[1, 3, 4, 5, 8]).unwrap();
        assert_eq!(row.len(), 40);
        assert_eq!(&row[..5], &[1, 3, 4, 5, 8]);
        assert!(row[5..].iter().all(|&t| t == 0));
    }

    #[test]
    fn test_pad_long_sequence_truncates() {
        let b = batcher(3, 1);
        let row = b.pad(&[9, 8, 7, 6, 5]).unwrap();
        assert_eq!(row, vec![9, 8, 7]);
    }

    #[test]
    fn test_pad_exact_length_unchanged() {
        let b = batcher(4, 1);
        assert_eq!(b.pad(&[4, 3, 2, 1]).unwrap(), vec![4, 3, 2, 1]);
    }

    #[test]
    fn test_pad_rejects_empty_sequence() {
        let b = batcher(8, 1);
        assert!(matches!(b.pad(&[]), Err(ModelError::InvalidInput(_))));
    }

    #[test]
    fn test_pad_rejects_reserved_pad_id() {
        let b = batcher(8, 1);
        assert!(matches!(b.pad(&[1, 0, 2]), Err(ModelError::InvalidInput(_))));
    }

    #[test]
    fn test_zero_fixed_length_rejected() {
        let r = SequenceBatcher::<TestBackend>::new(Default::default(), 0, 0, 1);
        assert!(matches!(r, Err(ModelError::InvalidInput(_))));
    }

    #[test]
    fn test_sample_batch_shapes() {
        let b = batcher(10, 1);
        let ds = SequenceDataset::from_pairs(vec![
            (vec![0.033], vec![1, 3, 4, 5, 8]),
            (vec![0.092], vec![2, 6, 3, 4, 8, 6]),
            (vec![0.047], vec![5, 5, 7, 1, 6]),
        ]);
        let (inputs, labels) = b.sample_batch(&ds, 7).unwrap();
        assert_eq!((inputs.batch_size(), inputs.seq_len()), (7, 10));
        assert_eq!((labels.batch_size(), labels.nclass()), (7, 1));
    }

    #[test]
    fn test_sample_batch_label_arity_checked() {
        let b = batcher(10, 2);
        let ds = SequenceDataset::from_pairs(vec![(vec![0.5], vec![1, 2, 3])]);
        assert!(matches!(
            b.sample_batch(&ds, 1),
            Err(ModelError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_tensor_shapes() {
        let b = batcher(6, 2);
        let inputs = b.pad_batch(&[vec![1, 2], vec![3, 4, 5]]).unwrap();
        let labels = LabelBatch::new(vec![vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        let batch = b.to_tensors(&inputs, &labels).unwrap();
        assert_eq!(batch.inputs.dims(), [2, 6]);
        assert_eq!(batch.targets.dims(), [2, 2]);
    }

    #[test]
    fn test_batcher_trait_stacks_items() {
        let b = batcher(5, 1);
        let batch: SequenceBatch<TestBackend> = Batcher::batch(
            &b,
            vec![
                SequenceSample::new(vec![0.1], vec![1, 2, 3]),
                SequenceSample::new(vec![0.2], vec![4]),
            ],
        );
        assert_eq!(batch.inputs.dims(), [2, 5]);
        assert_eq!(batch.targets.dims(), [2, 1]);
    }
}
