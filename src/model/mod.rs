//! Transformer predictor model
//!
//! Contains:
//! - Linear and LayerNorm layers
//! - Multi-head self-attention
//! - Post-norm encoder layers
//! - The predictor that maps a price window to the next value

pub mod attention;
pub mod config;
mod encoder;
mod layers;
mod predictor;

pub use attention::MultiHeadAttention;
pub use config::ModelConfig;
pub use encoder::EncoderLayer;
pub use layers::{LayerNorm, Linear, ParamReader};
pub use predictor::{check_pos_encoder, pos_encoder_shape, TransformerPredictor};
