//! CSV report of a replay

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::{Result, SimError};
use crate::simulation::replay::Replay;

/// One row of the report. The first two columns are standardized values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub actual_prices: f64,
    pub predicted_prices: f64,
    pub actual_prices_unscaled: f64,
    pub predicted_prices_unscaled: f64,
}

/// Writes the replay to `path`, creating the parent directory if needed.
pub fn write_csv<P: AsRef<Path>>(
    path: P,
    replay: &Replay,
    actual_unscaled: &[f64],
    predicted_unscaled: &[f64],
) -> Result<()> {
    let path = path.as_ref();
    if actual_unscaled.len() != replay.len() || predicted_unscaled.len() != replay.len() {
        return Err(SimError::shape(
            "unscaled series",
            &[replay.len(), replay.len()],
            &[actual_unscaled.len(), predicted_unscaled.len()],
        ));
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(path)?;
    for i in 0..replay.len() {
        writer.serialize(ReportRow {
            actual_prices: replay.actual()[i],
            predicted_prices: replay.predicted()[i],
            actual_prices_unscaled: actual_unscaled[i],
            predicted_prices_unscaled: predicted_unscaled[i],
        })?;
    }
    writer.flush()?;

    info!("Wrote {} rows to {}", replay.len(), path.display());
    Ok(())
}

/// Reads a report written by [`write_csv`].
pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Vec<ReportRow>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}
