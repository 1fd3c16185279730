// ============================================================
// Data Layer
// ============================================================
// Everything between plain labelled sequences and backend-ready
// tensor batches:
//
//   SequenceDataset  → sample storage (Burn Dataset trait)
//   SequenceBatcher  → pad/truncate rows, draw random batches,
//                      stack into [batch, seq_len] tensors
//   splitter         → shuffle + train/validation split
//
// Each module is one step and independently testable.

/// Implements Burn's Dataset trait for labelled sequences
pub mod dataset;

/// Padding, random batch sampling, and tensor materialisation
pub mod batcher;

/// Shuffles and splits data into train/validation sets
pub mod splitter;
