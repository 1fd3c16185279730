//! Supervised learning models for integer-token sequence data, built on
//! [burn](https://burn.dev):
//!
//!   - a **convolutional text classifier** (parallel conv filter banks of
//!     differing widths, global max-pooling, softmax cross-entropy + L2), and
//!   - a **recurrent sequence regressor** (selectable LSTM/GRU/basic cell,
//!     sequence-length-aware unroll with last-valid-timestep extraction,
//!     RMSE + L2),
//!
//! plus the batching/padding pipeline that maps irregular-length sequences
//! into fixed-shape tensors, and learners that run one Adam transaction per
//! `train_step` call.
//!
//! Models are generic over the burn `Backend`, which acts as the numeric
//! execution context; `CpuAutodiffBackend` is the ready-made CPU default.
//!
//! ```no_run
//! use seq_models::data::batcher::SequenceBatcher;
//! use seq_models::data::dataset::SequenceDataset;
//! use seq_models::domain::traits::SupervisedModel;
//! use seq_models::ml::recurrent::CellKind;
//! use seq_models::ml::regressor::RnnRegConfig;
//! use seq_models::ml::trainer::{CpuAutodiffBackend, CpuBackend};
//!
//! # fn main() -> Result<(), seq_models::error::ModelError> {
//! let device = Default::default();
//! let config = RnnRegConfig::new(10, CellKind::Lstm)
//!     .with_emb_dim(4)
//!     .with_hid_dim(100);
//! let mut learner = config.init_learner::<CpuAutodiffBackend>(&device)?;
//!
//! let dataset = SequenceDataset::from_pairs(vec![
//!     (vec![0.033], vec![1, 3, 4, 5, 8]),
//!     (vec![0.092], vec![2, 6, 3, 4, 8, 6]),
//!     (vec![0.047], vec![5, 5, 7, 1, 6]),
//! ]);
//! let batcher = SequenceBatcher::<CpuBackend>::new(Default::default(), 40, 0, 1)?;
//!
//! for _ in 0..50 {
//!     let (inputs, targets) = batcher.sample_batch(&dataset, 3)?;
//!     learner.train_step(&inputs, &targets)?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod data;
pub mod domain;
pub mod error;
pub mod infra;
pub mod ml;

pub use error::{ModelError, ModelResult};
