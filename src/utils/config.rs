//! Configuration handling
//!
//! The simulator reads the same JSON file the training run used. Keys the
//! training config never had are optional and fall back to defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, SimError};
use crate::model::config::{ModelConfig, DEFAULT_DIM_FEEDFORWARD, DEFAULT_LAYER_NORM_EPS};
use crate::simulation::plot::{MIN_CHART_HEIGHT, MIN_CHART_WIDTH};

/// Chart settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    /// Chart width in pixels
    pub width: u32,
    /// Chart height in pixels
    pub height: u32,
    /// Plot unscaled prices instead of standardized values
    pub unscaled: bool,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
            unscaled: false,
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Path to the model checkpoint
    pub model_save_path: PathBuf,
    /// Path to the historical price CSV
    pub file_path: PathBuf,
    /// Window length
    pub seq_len: usize,
    /// Number of attention heads
    pub nhead: usize,
    /// Number of encoder layers
    pub num_layers: usize,
    /// Model width
    pub hidden_dim: usize,
    /// Learning rate of the training run (informational)
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    /// CSV columns fed to the model; the first one is the prediction target
    #[serde(default = "default_features")]
    pub features: Vec<String>,
    #[serde(default = "default_dim_feedforward")]
    pub dim_feedforward: usize,
    #[serde(default = "default_layer_norm_eps")]
    pub layer_norm_eps: f64,
    /// Directory for the CSV and chart
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Output file name prefix, the start epoch is appended
    #[serde(default = "default_output_prefix")]
    pub output_prefix: String,
    #[serde(default)]
    pub plot: PlotConfig,
    /// Seed for initialising an untrained model
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_learning_rate() -> f64 {
    0.001
}

fn default_features() -> Vec<String> {
    vec!["close".to_string()]
}

fn default_dim_feedforward() -> usize {
    DEFAULT_DIM_FEEDFORWARD
}

fn default_layer_norm_eps() -> f64 {
    DEFAULT_LAYER_NORM_EPS
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_output_prefix() -> String {
    "btcTSim".to_string()
}

fn default_seed() -> u64 {
    42
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            model_save_path: PathBuf::from("models/btc_transformer.json"),
            file_path: PathBuf::from("data/btc_prices.csv"),
            seq_len: 60,
            nhead: 4,
            num_layers: 2,
            hidden_dim: 64,
            learning_rate: default_learning_rate(),
            features: default_features(),
            dim_feedforward: default_dim_feedforward(),
            layer_norm_eps: default_layer_norm_eps(),
            output_dir: default_output_dir(),
            output_prefix: default_output_prefix(),
            plot: PlotConfig::default(),
            seed: default_seed(),
        }
    }
}

impl SimConfig {
    /// Load configuration from file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: SimConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file, creating the parent directory if needed.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Checks the configuration before any file is touched
    pub fn validate(&self) -> Result<()> {
        if self.features.is_empty() {
            return Err(SimError::Config("features must not be empty".to_string()));
        }
        if self.output_prefix.is_empty() {
            return Err(SimError::Config("output_prefix must not be empty".to_string()));
        }
        if self.plot.width < MIN_CHART_WIDTH || self.plot.height < MIN_CHART_HEIGHT {
            return Err(SimError::Config(format!(
                "plot must be at least {}x{} pixels, got {}x{}",
                MIN_CHART_WIDTH, MIN_CHART_HEIGHT, self.plot.width, self.plot.height
            )));
        }
        self.model_config().validate()
    }

    /// Architecture derived from the configuration
    pub fn model_config(&self) -> ModelConfig {
        ModelConfig {
            input_dim: self.features.len(),
            seq_len: self.seq_len,
            num_heads: self.nhead,
            num_layers: self.num_layers,
            hidden_dim: self.hidden_dim,
            dim_feedforward: self.dim_feedforward,
            layer_norm_eps: self.layer_norm_eps,
        }
    }

    /// Output file stem for a given start epoch, e.g. `btcTSim12`
    pub fn output_stem(&self, epoch: u64) -> String {
        format!("{}{}", self.output_prefix, epoch)
    }

    /// Path of the CSV report for a given start epoch
    pub fn csv_path(&self, epoch: u64) -> PathBuf {
        self.output_dir.join(format!("{}.csv", self.output_stem(epoch)))
    }

    /// Path of the chart for a given start epoch
    pub fn svg_path(&self, epoch: u64) -> PathBuf {
        self.output_dir.join(format!("{}.svg", self.output_stem(epoch)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = SimConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.features, vec!["close".to_string()]);
        assert_eq!(config.model_config().input_dim, 1);
    }

    #[test]
    fn test_training_config_keys_only() {
        // A config written for training, without any simulator extensions
        let json = r#"{
            "model_save_path": "model.json",
            "file_path": "prices.csv",
            "seq_len": 30,
            "nhead": 2,
            "num_layers": 1,
            "hidden_dim": 16,
            "learning_rate": 0.0005,
            "batch_size": 64,
            "num_epochs": 100
        }"#;

        let config: SimConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.seq_len, 30);
        assert_eq!(config.learning_rate, 0.0005);
        assert_eq!(config.dim_feedforward, 2048);
        assert_eq!(config.output_prefix, "btcTSim");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_heads() {
        let config = SimConfig {
            hidden_dim: 10,
            nhead: 4,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(SimError::Config(_))));
    }

    #[test]
    fn test_empty_features() {
        let config = SimConfig {
            features: vec![],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_plot_size_limits() {
        let at_limit = SimConfig {
            plot: PlotConfig {
                width: MIN_CHART_WIDTH,
                height: MIN_CHART_HEIGHT,
                unscaled: false,
            },
            ..Default::default()
        };
        assert!(at_limit.validate().is_ok());

        let too_narrow = SimConfig {
            plot: PlotConfig {
                width: MIN_CHART_WIDTH - 1,
                ..at_limit.plot.clone()
            },
            ..Default::default()
        };
        assert!(matches!(too_narrow.validate(), Err(SimError::Config(_))));

        let too_short = SimConfig {
            plot: PlotConfig {
                height: MIN_CHART_HEIGHT - 1,
                ..at_limit.plot.clone()
            },
            ..Default::default()
        };
        assert!(too_short.validate().is_err());

        // 100x100 leaves no room between the chart margins
        let tiny = SimConfig {
            plot: PlotConfig {
                width: 100,
                height: 100,
                unscaled: false,
            },
            ..Default::default()
        };
        assert!(tiny.validate().is_err());
    }

    #[test]
    fn test_output_paths() {
        let config = SimConfig {
            output_dir: PathBuf::from("out"),
            ..Default::default()
        };
        assert_eq!(config.output_stem(7), "btcTSim7");
        assert_eq!(config.csv_path(7), PathBuf::from("out").join("btcTSim7.csv"));
        assert_eq!(config.svg_path(7), PathBuf::from("out").join("btcTSim7.svg"));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = SimConfig {
            seq_len: 24,
            ..Default::default()
        };
        config.to_file(&path).unwrap();

        let loaded = SimConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_to_file_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new").join("dir").join("config.json");

        SimConfig::default().to_file(&path).unwrap();
        assert_eq!(SimConfig::from_file(&path).unwrap(), SimConfig::default());
    }
}
