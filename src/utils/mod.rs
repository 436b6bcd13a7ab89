//! Configuration, checkpointing, logging and metrics.

pub mod checkpoint;
pub mod config;
pub mod logging;
pub mod metrics;

pub use checkpoint::{Checkpoint, StateDict, TensorData};
pub use config::{PlotConfig, SimConfig};
pub use logging::setup_logging;
pub use metrics::Metrics;
