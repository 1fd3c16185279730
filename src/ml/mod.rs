// ============================================================
// ML / Model Layer (Burn)
// ============================================================
// All Burn-specific code lives here; no other layer imports
// burn tensors directly (the data layer only materialises
// batches). The two model graphs share the embedding and head
// building blocks:
//
//   embedding.rs  — id → dense vector lookup
//                   (trainable / pretrained-frozen / one-hot)
//   conv_pool.rs  — parallel valid-conv banks + global max-pool
//   recurrent.rs  — LSTM/GRU/basic cells, masked unroll,
//                   last-valid-timestep extraction
//   head.rs       — Xavier affine projection, L2 penalty
//   classifier.rs — TextCnn: embed → conv/pool → dropout → head,
//                   softmax cross-entropy + L2
//   regressor.rs  — RnnReg: embed → masked unroll → head,
//                   RMSE + L2
//   trainer.rs    — learners: Adam step, eval, predict,
//                   periodic eval hook

/// Embedding table lookup with three construction modes
pub mod embedding;

/// Parallel conv filter banks with global max-pooling
pub mod conv_pool;

/// Recurrent cells and the sequence-length-aware encoder
pub mod recurrent;

/// Affine prediction head shared by both models
pub mod head;

/// Convolutional text classifier model and losses
pub mod classifier;

/// Recurrent sequence regressor model and losses
pub mod regressor;

/// Learners: optimizer transactions, evaluation, inference
pub mod trainer;
