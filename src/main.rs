//! Transformer replay CLI
//!
//! Command-line interface for replaying a trained price predictor

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::info;

use transformer_sim::{
    model::check_pos_encoder,
    utils::setup_logging,
    Checkpoint, Metrics, RunOptions, SimConfig, SimulationResult, Simulator, TransformerPredictor,
};

#[derive(Parser)]
#[command(name = "transformer-sim")]
#[command(version, about = "Replay a trained transformer price predictor over historical data")]
struct Cli {
    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sliding-window replay
    Run {
        /// Configuration file
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,

        /// Override the output directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Skip the SVG chart
        #[arg(long)]
        no_plot: bool,

        /// Plot prices instead of standardized values
        #[arg(long)]
        plot_unscaled: bool,

        /// Use a random model if the checkpoint is missing
        #[arg(long)]
        allow_untrained: bool,

        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Initialize configuration file
    Init {
        /// Output path for config file
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,
    },

    /// Show what a checkpoint contains
    Inspect {
        /// Checkpoint file
        #[arg(long)]
        checkpoint: PathBuf,

        /// Also check the checkpoint against this configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    match cli.command {
        Commands::Run {
            config,
            output_dir,
            no_plot,
            plot_unscaled,
            allow_untrained,
            no_progress,
        } => {
            let mut cfg = SimConfig::from_file(&config)
                .with_context(|| format!("failed to read config {}", config.display()))?;
            if let Some(dir) = output_dir {
                cfg.output_dir = dir;
            }
            if plot_unscaled {
                cfg.plot.unscaled = true;
            }

            let options = RunOptions {
                allow_untrained,
                write_plot: !no_plot,
                show_progress: !no_progress,
            };
            run(cfg, options)?;
        }

        Commands::Init { output } => {
            info!("Creating default configuration...");
            SimConfig::default()
                .to_file(&output)
                .with_context(|| format!("failed to write {}", output.display()))?;
            println!("{}", format!("Configuration saved to {}", output.display()).green());
        }

        Commands::Inspect { checkpoint, config } => {
            inspect(&checkpoint, config.as_deref())?;
        }
    }

    Ok(())
}

fn run(config: SimConfig, options: RunOptions) -> Result<()> {
    println!("{}", "Loading model and data...".cyan());
    let simulator = Simulator::new(config).context("invalid configuration")?;
    let result = simulator.run(options).context("simulation failed")?;
    print_summary(&result);
    Ok(())
}

fn print_metrics(title: &str, m: &Metrics, with_mape: bool) {
    println!("\n{}", title.bold());
    for (label, value) in m.report_rows(with_mape) {
        let value = match label {
            "R2" if m.r2 >= 0.0 => value.green(),
            "R2" => value.red(),
            _ => value.normal(),
        };
        println!("  {:<22}{}", format!("{}:", label), value);
    }
}

fn print_summary(result: &SimulationResult) {
    println!("\n{}", "=== Replay Results ===".bold().green());
    println!("  Start epoch: {}", result.start_epoch);
    println!("  Steps:       {}", result.replay.len());

    print_metrics("Standardized", &result.metrics, false);
    print_metrics("Price units", &result.metrics_unscaled, true);

    println!();
    println!(
        "{}",
        format!("Predictions saved to {}", result.csv_path.display()).green()
    );
    if let Some(path) = &result.svg_path {
        println!("{}", format!("Chart saved to {}", path.display()).green());
    }
}

fn inspect(path: &std::path::Path, config: Option<&std::path::Path>) -> Result<()> {
    let checkpoint = Checkpoint::load(path)
        .with_context(|| format!("failed to load checkpoint {}", path.display()))?;

    println!("\n{}", "=== Checkpoint ===".bold());
    println!("  Epoch:       {}", checkpoint.epoch);
    println!("  Start epoch: {}", checkpoint.start_epoch());
    if let Some(loss) = checkpoint.best_loss {
        println!("  Best loss:   {:.6}", loss);
    }
    match checkpoint.optimizer_param_groups() {
        Some(groups) => println!("  Optimizer:   {} parameter groups", groups),
        None => println!("  Optimizer:   {}", "none".dimmed()),
    }
    println!("  Parameters:  {}", checkpoint.num_parameters());

    println!("\n{}", "Tensors:".bold());
    for (name, tensor) in &checkpoint.model_state_dict {
        println!("  {:<45} {:?}", name, tensor.shape);
    }

    if let Some(config_path) = config {
        let cfg = SimConfig::from_file(config_path)
            .with_context(|| format!("failed to read config {}", config_path.display()))?;
        cfg.validate()?;
        let model_config = cfg.model_config();

        println!();
        if let Err(e) = check_pos_encoder(&model_config, &checkpoint.model_state_dict) {
            println!("{}", format!("Positional encoder mismatch: {}", e).yellow());
        }
        match TransformerPredictor::from_state_dict(model_config, &checkpoint.model_state_dict) {
            Ok(model) => println!(
                "{}",
                format!(
                    "Checkpoint matches configuration ({} parameters)",
                    model.num_parameters()
                )
                .green()
            ),
            Err(e) => {
                println!("{}", format!("Checkpoint does not match: {}", e).red());
                anyhow::bail!("checkpoint incompatible with {}", config_path.display());
            }
        }
    }

    Ok(())
}
