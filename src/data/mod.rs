//! Data loading and preprocessing
//!
//! - `loader` - reading price columns from CSV
//! - `scaler` - standard score normalization
//! - `window` - sliding windows for one-step-ahead replay

mod loader;
mod scaler;
mod window;

pub use loader::PriceSeries;
pub use scaler::StandardScaler;
pub use window::{window_count, SlidingWindows};
