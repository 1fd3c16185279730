use burn::data::dataset::Dataset;

use crate::domain::sample::SequenceSample;

/// In-memory store of labelled sequences — what the batcher samples from.
pub struct SequenceDataset {
    samples: Vec<SequenceSample>,
}

impl SequenceDataset {
    pub fn new(samples: Vec<SequenceSample>) -> Self {
        Self { samples }
    }

    /// Convenience for the common (label vector, token sequence) pair form.
    pub fn from_pairs(pairs: Vec<(Vec<f32>, Vec<u32>)>) -> Self {
        Self {
            samples: pairs
                .into_iter()
                .map(|(label, tokens)| SequenceSample::new(label, tokens))
                .collect(),
        }
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

impl Dataset<SequenceSample> for SequenceDataset {
    fn get(&self, index: usize) -> Option<SequenceSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
