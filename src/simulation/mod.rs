//! Replay orchestration
//!
//! Ties the stages together: model and checkpoint, price data, scaling,
//! the sliding-window replay and the CSV/SVG outputs.

pub mod plot;
pub mod replay;
pub mod report;

pub use plot::{render_svg, write_svg, ChartOptions};
pub use replay::{replay, Replay};
pub use report::{read_csv, write_csv, ReportRow};

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::data::{PriceSeries, StandardScaler};
use crate::error::{Result, SimError};
use crate::model::TransformerPredictor;
use crate::utils::{Checkpoint, Metrics, SimConfig};

/// Column of the feature matrix that is predicted
const TARGET_COLUMN: usize = 0;

/// Switches for a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Use a randomly initialised model when no checkpoint exists
    pub allow_untrained: bool,
    /// Write the SVG chart next to the CSV
    pub write_plot: bool,
    /// Show a progress bar during the replay
    pub show_progress: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            allow_untrained: false,
            write_plot: true,
            show_progress: true,
        }
    }
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct SimulationResult {
    /// Standardized actual and predicted values
    pub replay: Replay,
    pub actual_unscaled: Vec<f64>,
    pub predicted_unscaled: Vec<f64>,
    /// Metrics on standardized values
    pub metrics: Metrics,
    /// Metrics in price units
    pub metrics_unscaled: Metrics,
    /// Epoch used to name the outputs
    pub start_epoch: u64,
    pub csv_path: PathBuf,
    pub svg_path: Option<PathBuf>,
}

pub struct Simulator {
    config: SimConfig,
}

impl Simulator {
    /// Create a simulator after validating the configuration.
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Builds the model and restores the checkpoint.
    ///
    /// Returns the model together with the start epoch used for output
    /// names: the checkpoint epoch plus one, or 0 for an untrained model.
    pub fn load_model(&self, allow_untrained: bool) -> Result<(TransformerPredictor, u64)> {
        let model_config = self.config.model_config();
        let path = &self.config.model_save_path;

        if path.exists() {
            let checkpoint = Checkpoint::load(path)?;
            let model =
                TransformerPredictor::from_state_dict(model_config, &checkpoint.model_state_dict)?;
            let start_epoch = checkpoint.start_epoch();

            info!("Resuming from epoch {}", start_epoch);
            if let Some(groups) = checkpoint.optimizer_param_groups() {
                info!("Optimizer state present ({} parameter groups)", groups);
            }
            if let Some(loss) = checkpoint.best_loss {
                info!("Best recorded loss: {:.6}", loss);
            }
            info!("Model has {} parameters", model.num_parameters());

            return Ok((model, start_epoch));
        }

        if !allow_untrained {
            return Err(SimError::Checkpoint(format!(
                "no checkpoint found at {}",
                path.display()
            )));
        }

        warn!(
            "No checkpoint found at {}, using an untrained model (seed {})",
            path.display(),
            self.config.seed
        );
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let model = TransformerPredictor::new(model_config, &mut rng)?;
        Ok((model, 0))
    }

    /// Loads the configured feature columns.
    pub fn load_data(&self) -> Result<PriceSeries> {
        PriceSeries::from_csv(&self.config.file_path, &self.config.features)
    }

    /// Runs the full pipeline.
    pub fn run(&self, options: RunOptions) -> Result<SimulationResult> {
        let (model, start_epoch) = self.load_model(options.allow_untrained)?;
        let series = self.load_data()?;
        self.simulate(&model, &series, start_epoch, options)
    }

    /// Replays `model` over `series` and writes the outputs.
    pub fn simulate(
        &self,
        model: &TransformerPredictor,
        series: &PriceSeries,
        start_epoch: u64,
        options: RunOptions,
    ) -> Result<SimulationResult> {
        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&series.values)?;

        let replay = replay::replay(model, &scaled, TARGET_COLUMN, options.show_progress)?;

        let actual_unscaled = scaler.inverse_transform_column(replay.actual(), TARGET_COLUMN)?;
        let predicted_unscaled =
            scaler.inverse_transform_column(replay.predicted(), TARGET_COLUMN)?;

        let metrics = Metrics::compute(replay.actual(), replay.predicted());
        let metrics_unscaled = Metrics::compute(&actual_unscaled, &predicted_unscaled);
        info!(
            "Replay done: {} steps, RMSE {:.4} (standardized), MAE {:.2} (unscaled)",
            metrics.samples, metrics.rmse, metrics_unscaled.mae
        );

        let csv_path = self.config.csv_path(start_epoch);
        report::write_csv(&csv_path, &replay, &actual_unscaled, &predicted_unscaled)?;

        let svg_path = if options.write_plot {
            let path = self.config.svg_path(start_epoch);
            let plot = &self.config.plot;
            let mut chart = ChartOptions {
                width: plot.width,
                height: plot.height,
                ..Default::default()
            };
            if plot.unscaled {
                chart.y_label = "Price".to_string();
                plot::write_svg(&path, &actual_unscaled, &predicted_unscaled, &chart)?;
            } else {
                plot::write_svg(&path, replay.actual(), replay.predicted(), &chart)?;
            }
            Some(path)
        } else {
            None
        };

        Ok(SimulationResult {
            replay,
            actual_unscaled,
            predicted_unscaled,
            metrics,
            metrics_unscaled,
            start_epoch,
            csv_path,
            svg_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;
    use std::path::Path;

    fn config(dir: &Path) -> SimConfig {
        SimConfig {
            model_save_path: dir.join("missing.json"),
            file_path: dir.join("prices.csv"),
            seq_len: 4,
            nhead: 2,
            num_layers: 1,
            hidden_dim: 8,
            dim_feedforward: 16,
            output_dir: dir.join("out"),
            ..Default::default()
        }
    }

    fn series(n: usize) -> PriceSeries {
        PriceSeries {
            columns: vec!["close".to_string()],
            values: Array2::from_shape_fn((n, 1), |(i, _)| 100.0 + (i as f64 * 0.4).sin() * 5.0),
        }
    }

    #[test]
    fn test_missing_checkpoint_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let sim = Simulator::new(config(dir.path())).unwrap();
        let err = sim.load_model(false).unwrap_err();
        assert!(matches!(err, SimError::Checkpoint(_)));
    }

    #[test]
    fn test_untrained_model_starts_at_zero() {
        let dir = tempfile::tempdir().unwrap();
        let sim = Simulator::new(config(dir.path())).unwrap();
        let (_, epoch) = sim.load_model(true).unwrap();
        assert_eq!(epoch, 0);
    }

    #[test]
    fn test_simulate_writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let sim = Simulator::new(config(dir.path())).unwrap();
        let (model, epoch) = sim.load_model(true).unwrap();

        let options = RunOptions {
            show_progress: false,
            ..Default::default()
        };
        let result = sim.simulate(&model, &series(20), epoch, options).unwrap();

        assert_eq!(result.replay.len(), 15);
        assert_eq!(result.csv_path, dir.path().join("out").join("btcTSim0.csv"));
        assert!(result.csv_path.exists());
        assert!(result.svg_path.as_ref().unwrap().exists());

        // Unscaled actuals are the raw prices that followed each window
        let raw = series(20);
        assert_abs_diff_eq!(result.actual_unscaled[0], raw.values[[4, 0]], epsilon = 1e-9);
    }

    #[test]
    fn test_simulate_without_plot() {
        let dir = tempfile::tempdir().unwrap();
        let sim = Simulator::new(config(dir.path())).unwrap();
        let (model, epoch) = sim.load_model(true).unwrap();

        let options = RunOptions {
            allow_untrained: true,
            write_plot: false,
            show_progress: false,
        };
        let result = sim.simulate(&model, &series(12), epoch, options).unwrap();
        assert!(result.svg_path.is_none());
        assert!(!sim.config().svg_path(epoch).exists());
    }

    #[test]
    fn test_unscaled_plot_uses_prices() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.plot.unscaled = true;
        let sim = Simulator::new(cfg).unwrap();
        let (model, epoch) = sim.load_model(true).unwrap();

        let options = RunOptions {
            show_progress: false,
            ..Default::default()
        };
        let result = sim.simulate(&model, &series(20), epoch, options).unwrap();
        let svg = std::fs::read_to_string(result.svg_path.unwrap()).unwrap();

        assert!(svg.contains(">Price<"));
        assert!(!svg.contains("Price (Standardized)"));

        // y tick labels follow the actual prices (around 100 +/- 5)
        let ticks: Vec<f64> = svg
            .lines()
            .filter(|l| l.contains("text-anchor=\"end\""))
            .map(|l| {
                let start = l.find('>').unwrap() + 1;
                let end = l.rfind("</text>").unwrap();
                l[start..end].parse().unwrap()
            })
            .collect();
        assert_eq!(ticks.len(), 6);
        let lowest = ticks.iter().cloned().fold(f64::INFINITY, f64::min);
        let highest = ticks.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert!(lowest < 96.0 && highest > 104.0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = SimConfig {
            nhead: 3,
            ..config(dir.path())
        };
        assert!(Simulator::new(cfg).is_err());
    }
}
