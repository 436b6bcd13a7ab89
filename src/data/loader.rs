//! CSV loading of historical prices

use ndarray::{Array1, Array2};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{Result, SimError};

/// Selected feature columns of a price file, one row per time step
#[derive(Debug, Clone)]
pub struct PriceSeries {
    /// Feature names, in model input order
    pub columns: Vec<String>,
    /// Values `[n_rows, n_features]`
    pub values: Array2<f64>,
}

impl PriceSeries {
    /// Load the named columns from a CSV file with a header row.
    pub fn from_csv<P: AsRef<Path>>(path: P, features: &[String]) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading price data from {}", path.display());
        let file = std::fs::File::open(path)?;
        let series = Self::from_reader(file, features)?;
        info!("Loaded {} rows x {} features", series.len(), series.num_features());
        Ok(series)
    }

    /// Load the named columns from any CSV source with a header row.
    pub fn from_reader<R: Read>(source: R, features: &[String]) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(source);

        let headers = reader.headers()?.clone();
        let indices = features
            .iter()
            .map(|name| {
                headers
                    .iter()
                    .position(|h| h == name.as_str())
                    .ok_or_else(|| SimError::MissingColumn(name.clone()))
            })
            .collect::<Result<Vec<usize>>>()?;
        debug!(?indices, "Resolved feature columns");

        let mut flat = Vec::new();
        let mut rows = 0;

        for (row, record) in reader.records().enumerate() {
            let record = record?;
            for (&idx, name) in indices.iter().zip(features) {
                let raw = record.get(idx).unwrap_or("");
                let value: f64 = raw.parse().map_err(|_| SimError::Parse {
                    row: row + 1,
                    column: name.clone(),
                    value: raw.to_string(),
                })?;
                flat.push(value);
            }
            rows += 1;
        }

        if rows == 0 {
            return Err(SimError::InsufficientData("data file has no rows".to_string()));
        }

        let values = Array2::from_shape_vec((rows, features.len()), flat)
            .map_err(|e| SimError::InsufficientData(e.to_string()))?;

        Ok(Self {
            columns: features.to_vec(),
            values,
        })
    }

    /// Number of time steps
    pub fn len(&self) -> usize {
        self.values.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn num_features(&self) -> usize {
        self.values.ncols()
    }

    /// Values of one named column
    pub fn column(&self, name: &str) -> Option<Array1<f64>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.values.column(idx).to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "timestamp,open,high,low,close,volume
1700000000000,100.0,101.0,99.0,100.5,10
1700003600000,100.5,102.0,100.0,101.5,12
1700007200000,101.5,103.0,101.0,102.5,9
";

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_load_close_column() {
        let series = PriceSeries::from_reader(SAMPLE.as_bytes(), &names(&["close"])).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.num_features(), 1);
        assert_eq!(series.values[[2, 0]], 102.5);
    }

    #[test]
    fn test_feature_order_follows_request() {
        let series =
            PriceSeries::from_reader(SAMPLE.as_bytes(), &names(&["volume", "close"])).unwrap();
        assert_eq!(series.values.row(0).to_vec(), vec![10.0, 100.5]);
        assert_eq!(series.column("close").unwrap().to_vec(), vec![100.5, 101.5, 102.5]);
        assert!(series.column("open").is_none());
    }

    #[test]
    fn test_missing_column() {
        let err = PriceSeries::from_reader(SAMPLE.as_bytes(), &names(&["vwap"])).unwrap_err();
        assert!(matches!(err, SimError::MissingColumn(ref c) if c == "vwap"));
    }

    #[test]
    fn test_unparsable_value() {
        let data = "close\n1.0\nabc\n";
        let err = PriceSeries::from_reader(data.as_bytes(), &names(&["close"])).unwrap_err();
        match err {
            SimError::Parse { row, column, value } => {
                assert_eq!(row, 2);
                assert_eq!(column, "close");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_file() {
        let err = PriceSeries::from_reader("close\n".as_bytes(), &names(&["close"])).unwrap_err();
        assert!(matches!(err, SimError::InsufficientData(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = PriceSeries::from_csv("/nonexistent/prices.csv", &names(&["close"])).unwrap_err();
        assert!(matches!(err, SimError::Io(_)));
    }
}
