//! # Transformer Price Replay
//!
//! Replays a pretrained transformer price predictor over a historical price
//! series, one sliding window at a time, and compares every one-step-ahead
//! prediction with the value that actually followed.
//!
//! ## Features
//!
//! - JSON configuration shared with the training run
//! - Encoder-only transformer (embedding, learned positions, post-norm layers)
//! - Strict loading of JSON checkpoints with named parameters
//! - Standard score normalization and sliding-window replay
//! - CSV report, SVG chart and prediction metrics
//!
//! ## Example
//!
//! ```rust,no_run
//! use transformer_sim::{RunOptions, SimConfig, Simulator};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = SimConfig::from_file("config.json")?;
//!     let simulator = Simulator::new(config)?;
//!     let result = simulator.run(RunOptions::default())?;
//!
//!     println!("RMSE: {:.4}", result.metrics.rmse);
//!     Ok(())
//! }
//! ```

pub mod data;
pub mod error;
pub mod model;
pub mod simulation;
pub mod utils;

pub use data::{PriceSeries, StandardScaler};
pub use error::{Result, SimError};
pub use model::{ModelConfig, TransformerPredictor};
pub use simulation::{RunOptions, SimulationResult, Simulator};
pub use utils::{Checkpoint, Metrics, SimConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
