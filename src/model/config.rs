//! Transformer predictor configuration
//!
//! Architecture hyperparameters. These must match the values the checkpoint
//! was trained with.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Default feed-forward width of an encoder layer
pub const DEFAULT_DIM_FEEDFORWARD: usize = 2048;

/// Default LayerNorm epsilon
pub const DEFAULT_LAYER_NORM_EPS: f64 = 1e-5;

/// Configuration of the transformer predictor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Number of input features per time step
    pub input_dim: usize,

    /// Window length the positional parameters were trained for
    pub seq_len: usize,

    /// Number of attention heads
    pub num_heads: usize,

    /// Number of encoder layers
    pub num_layers: usize,

    /// Model width (d_model)
    pub hidden_dim: usize,

    /// Width of the encoder feed-forward block
    pub dim_feedforward: usize,

    /// LayerNorm epsilon
    pub layer_norm_eps: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            input_dim: 1,
            seq_len: 60,
            num_heads: 4,
            num_layers: 2,
            hidden_dim: 64,
            dim_feedforward: DEFAULT_DIM_FEEDFORWARD,
            layer_norm_eps: DEFAULT_LAYER_NORM_EPS,
        }
    }
}

impl ModelConfig {
    /// Checks that the configuration describes a buildable model
    pub fn validate(&self) -> Result<()> {
        if self.input_dim == 0 {
            return Err(SimError::Config("input_dim must be > 0".to_string()));
        }
        if self.seq_len == 0 {
            return Err(SimError::Config("seq_len must be > 0".to_string()));
        }
        if self.num_heads == 0 {
            return Err(SimError::Config("nhead must be > 0".to_string()));
        }
        if self.num_layers == 0 {
            return Err(SimError::Config("num_layers must be > 0".to_string()));
        }
        if self.hidden_dim == 0 {
            return Err(SimError::Config("hidden_dim must be > 0".to_string()));
        }
        if self.hidden_dim % self.num_heads != 0 {
            return Err(SimError::Config(format!(
                "hidden_dim ({}) must be divisible by nhead ({})",
                self.hidden_dim, self.num_heads
            )));
        }
        if self.dim_feedforward == 0 {
            return Err(SimError::Config("dim_feedforward must be > 0".to_string()));
        }
        if self.layer_norm_eps <= 0.0 {
            return Err(SimError::Config("layer_norm_eps must be > 0".to_string()));
        }
        Ok(())
    }

    /// Width of a single attention head
    pub fn head_dim(&self) -> usize {
        self.hidden_dim / self.num_heads
    }
}
