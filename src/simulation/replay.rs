//! Sliding-window replay of the model over a standardized series

use indicatif::{ProgressBar, ProgressStyle};
use ndarray::Array2;
use tracing::{debug, info};

use crate::data::{window_count, SlidingWindows};
use crate::error::{Result, SimError};
use crate::model::TransformerPredictor;

/// Actual and predicted values of a replay, step by step
#[derive(Debug, Clone, PartialEq)]
pub struct Replay {
    actual: Vec<f64>,
    predicted: Vec<f64>,
}

impl Replay {
    /// Pairs two series; they must have the same length.
    pub fn new(actual: Vec<f64>, predicted: Vec<f64>) -> Result<Self> {
        if actual.len() != predicted.len() {
            return Err(SimError::shape(
                "replay series",
                &[actual.len()],
                &[predicted.len()],
            ));
        }
        Ok(Self { actual, predicted })
    }

    pub fn len(&self) -> usize {
        self.actual.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actual.is_empty()
    }

    pub fn actual(&self) -> &[f64] {
        &self.actual
    }

    pub fn predicted(&self) -> &[f64] {
        &self.predicted
    }
}

/// Predicts every window of `data` and records the value that followed it.
///
/// `data` must already be standardized; `target_column` selects the actual
/// value to compare against (the first feature in practice).
pub fn replay(
    model: &TransformerPredictor,
    data: &Array2<f64>,
    target_column: usize,
    show_progress: bool,
) -> Result<Replay> {
    let seq_len = model.config().seq_len;
    let count = window_count(data.nrows(), seq_len);

    if count == 0 {
        return Err(SimError::InsufficientData(format!(
            "{} rows is not enough for a window of {} (need at least {})",
            data.nrows(),
            seq_len,
            seq_len + 2
        )));
    }
    if target_column >= data.ncols() {
        return Err(SimError::Config(format!(
            "target column {} out of range for {} features",
            target_column,
            data.ncols()
        )));
    }

    info!("Replaying {} windows of length {}", count, seq_len);

    let pb = if show_progress {
        let pb = ProgressBar::new(count as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                .map_err(|e| SimError::Config(e.to_string()))?
                .progress_chars("#>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut actual = Vec::with_capacity(count);
    let mut predicted = Vec::with_capacity(count);

    for (window, target) in SlidingWindows::new(data, seq_len) {
        predicted.push(model.forward(&window)?);
        actual.push(target[target_column]);
        pb.inc(1);
    }

    pb.finish_and_clear();
    debug!(steps = actual.len(), "Replay finished");

    Replay::new(actual, predicted)
}
