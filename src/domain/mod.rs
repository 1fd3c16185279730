// ============================================================
// Domain Layer
// ============================================================
// Pure Rust structs and traits that define the core concepts of
// the system. No framework types, no I/O — the tensor side of
// these concepts lives in the data and ml layers.

// A labelled (target vector, token sequence) example
pub mod sample;

// Fixed-shape batch views: PaddedBatch and LabelBatch
pub mod batch;

// The SupervisedModel contract both learners implement
pub mod traits;
