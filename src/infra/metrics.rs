// ============================================================
// Infra — Metrics Logger
// ============================================================
// Records step-level training metrics to a CSV file so learning
// curves can be plotted and runs compared after the fact.
//
// Example CSV output:
//   step,train_loss,eval_loss,metric
//   50,0.412873,0.455210,0.750000
//   100,0.281002,0.334119,0.812500

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};

/// One row of metrics for a single recorded training step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepMetrics {
    /// The optimizer step count at recording time.
    pub step: usize,

    /// Loss on the most recent training batch.
    pub train_loss: f64,

    /// Loss on the held-out evaluation set.
    pub eval_loss: f64,

    /// Task metric: accuracy for the classifier, RMSE for the regressor.
    pub metric: f64,
}

impl StepMetrics {
    pub fn new(step: usize, train_loss: f64, eval_loss: f64, metric: f64) -> Self {
        Self { step, train_loss, eval_loss, metric }
    }

    /// Whether this row improves on the previous best eval loss.
    pub fn is_improvement(&self, best_eval_loss: f64) -> bool {
        self.eval_loss < best_eval_loss
    }
}

/// Appends metric rows to `<dir>/metrics.csv`, creating the header once.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    pub fn new(dir: impl Into<String>) -> Result<Self> {
        let dir = PathBuf::from(dir.into());
        fs::create_dir_all(&dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "step,train_loss,eval_loss,metric")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one row. Opens in append mode so earlier rows survive.
    pub fn log(&self, m: &StepMetrics) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;
        writeln!(
            f,
            "{},{:.6},{:.6},{:.6}",
            m.step, m.train_loss, m.eval_loss, m.metric,
        )?;
        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}
