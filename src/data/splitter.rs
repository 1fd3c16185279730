// ============================================================
// Data — Train/Validation Splitter
// ============================================================
// Shuffles samples and splits them into a training set and a
// held-out validation set. Shuffling first keeps both sets
// representative when the source data arrives grouped.

use rand::seq::SliceRandom;

/// Randomly shuffle `samples` and split into (train, validation).
///
/// `train_fraction` is the proportion kept for training, e.g. 0.8.
/// The split index is rounded and clamped, so tiny datasets never panic.
pub fn split_train_val<T>(mut samples: Vec<T>, train_fraction: f64) -> (Vec<T>, Vec<T>) {
    let mut rng = rand::thread_rng();
    samples.shuffle(&mut rng);

    let total    = samples.len();
    let split_at = ((total as f64) * train_fraction).round() as usize;
    let split_at = split_at.min(total);

    let val = samples.split_off(split_at);

    tracing::debug!("Dataset split: {} training, {} validation", samples.len(), val.len());

    (samples, val)
}
