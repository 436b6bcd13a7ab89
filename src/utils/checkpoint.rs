//! Model checkpointing.
//!
//! A checkpoint is a JSON document holding the epoch counter, the named model
//! parameters and, optionally, the optimizer state of the training run:
//!
//! ```json
//! {
//!   "epoch": 41,
//!   "best_loss": 0.0123,
//!   "model_state_dict": {
//!     "fc.bias": { "shape": [1], "data": [0.01] },
//!     "fc.weight": { "shape": [1, 64], "data": [ ... ] }
//!   },
//!   "optimizer_state_dict": { ... }
//! }
//! ```

use ndarray::{Array, Dimension, IxDyn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{Result, SimError};

/// Named model parameters, ordered by name
pub type StateDict = BTreeMap<String, TensorData>;

/// A flat row-major tensor with its shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorData {
    pub shape: Vec<usize>,
    pub data: Vec<f64>,
}

impl TensorData {
    /// Creates a tensor, checking that the data fills the shape exactly.
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> Result<Self> {
        let tensor = Self { shape, data };
        tensor.check()?;
        Ok(tensor)
    }

    /// Copies an ndarray array in logical (row-major) order.
    pub fn from_array<D: Dimension>(array: &Array<f64, D>) -> Self {
        Self {
            shape: array.shape().to_vec(),
            data: array.iter().cloned().collect(),
        }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn check(&self) -> Result<()> {
        let expected: usize = self.shape.iter().product();
        if expected != self.data.len() {
            return Err(SimError::Checkpoint(format!(
                "tensor of shape {:?} needs {} values, found {}",
                self.shape,
                expected,
                self.data.len()
            )));
        }
        Ok(())
    }

    /// Converts to an array of fixed rank after checking the shape.
    ///
    /// `name` is only used for the error message.
    pub fn to_array<D: Dimension>(&self, name: &str, expected: &[usize]) -> Result<Array<f64, D>> {
        if self.shape != expected {
            return Err(SimError::shape(name, expected, &self.shape));
        }
        let array = Array::from_shape_vec(IxDyn(&self.shape), self.data.clone())
            .map_err(|e| SimError::Checkpoint(format!("{}: {}", name, e)))?;
        array
            .into_dimensionality::<D>()
            .map_err(|e| SimError::Checkpoint(format!("{}: {}", name, e)))
    }
}

/// Checkpoint of a training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Last completed training epoch
    pub epoch: u64,
    /// Best validation loss, if the trainer recorded it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_loss: Option<f64>,
    /// Model parameters
    pub model_state_dict: StateDict,
    /// Optimizer state, kept as-is
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimizer_state_dict: Option<serde_json::Value>,
}

impl Checkpoint {
    /// Create a new checkpoint.
    pub fn new(epoch: u64, model_state_dict: StateDict) -> Self {
        Self {
            epoch,
            best_loss: None,
            model_state_dict,
            optimizer_state_dict: None,
        }
    }

    /// Load a checkpoint and check every tensor is well formed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let checkpoint: Checkpoint = serde_json::from_str(&content)?;

        for (name, tensor) in &checkpoint.model_state_dict {
            tensor
                .check()
                .map_err(|e| SimError::Checkpoint(format!("{}: {}", name, e)))?;
        }

        Ok(checkpoint)
    }

    /// Save the checkpoint as pretty JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Epoch a resumed run would start with; used to name outputs.
    pub fn start_epoch(&self) -> u64 {
        self.epoch + 1
    }

    /// Total number of scalar parameters stored
    pub fn num_parameters(&self) -> usize {
        self.model_state_dict.values().map(TensorData::len).sum()
    }

    /// Number of optimizer parameter groups, if the state follows the usual
    /// `{"state": ..., "param_groups": [...]}` layout.
    pub fn optimizer_param_groups(&self) -> Option<usize> {
        self.optimizer_state_dict
            .as_ref()?
            .get("param_groups")?
            .as_array()
            .map(Vec::len)
    }
}
