//! Standard score normalization
//!
//! Each column is shifted by its mean and divided by its population standard
//! deviation. Constant columns keep a scale of 1.0 so they map to zero
//! instead of NaN.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Option<Array1<f64>>,
    scale: Option<Array1<f64>>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes column means and standard deviations.
    pub fn fit(&mut self, data: &Array2<f64>) -> Result<()> {
        if data.nrows() == 0 {
            return Err(SimError::InsufficientData(
                "cannot fit scaler on empty data".to_string(),
            ));
        }

        let mean = data
            .mean_axis(Axis(0))
            .ok_or_else(|| SimError::InsufficientData("empty data".to_string()))?;
        let scale = data
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > f64::EPSILON { s } else { 1.0 });

        self.mean = Some(mean);
        self.scale = Some(scale);
        Ok(())
    }

    pub fn is_fitted(&self) -> bool {
        self.mean.is_some()
    }

    pub fn mean(&self) -> Option<&Array1<f64>> {
        self.mean.as_ref()
    }

    pub fn scale(&self) -> Option<&Array1<f64>> {
        self.scale.as_ref()
    }

    fn params(&self) -> Result<(&Array1<f64>, &Array1<f64>)> {
        match (&self.mean, &self.scale) {
            (Some(mean), Some(scale)) => Ok((mean, scale)),
            _ => Err(SimError::Config("scaler is not fitted".to_string())),
        }
    }

    fn check_width(&self, width: usize) -> Result<()> {
        let (mean, _) = self.params()?;
        if width != mean.len() {
            return Err(SimError::shape("scaler input", &[mean.len()], &[width]));
        }
        Ok(())
    }

    pub fn transform(&self, data: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_width(data.ncols())?;
        let (mean, scale) = self.params()?;
        Ok((data - mean) / scale)
    }

    pub fn fit_transform(&mut self, data: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(data)?;
        self.transform(data)
    }

    pub fn inverse_transform(&self, data: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_width(data.ncols())?;
        let (mean, scale) = self.params()?;
        Ok(data * scale + mean)
    }

    /// Unscales a single series as column `column`.
    ///
    /// Equivalent to inverse-transforming a matrix holding `values` in that
    /// column and zeros elsewhere, then reading the column back.
    pub fn inverse_transform_column(&self, values: &[f64], column: usize) -> Result<Vec<f64>> {
        let (mean, scale) = self.params()?;
        if column >= mean.len() {
            return Err(SimError::Config(format!(
                "column {} out of range for scaler with {} columns",
                column,
                mean.len()
            )));
        }
        let (m, s) = (mean[column], scale[column]);
        Ok(values.iter().map(|v| v * s + m).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_fit_transform_standardizes() {
        let data = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, 40.0]];
        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&data).unwrap();

        for col in scaled.columns() {
            let mean = col.sum() / col.len() as f64;
            let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / col.len() as f64;
            assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(var, 1.0, epsilon = 1e-12);
        }

        // Population std of 1..4 is sqrt(1.25)
        assert_abs_diff_eq!(scaler.scale().unwrap()[0], 1.25_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_inverse_transform_restores() {
        let data = array![[100.0], [105.0], [95.0], [110.0]];
        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&data).unwrap();
        let restored = scaler.inverse_transform(&scaled).unwrap();

        for (a, b) in data.iter().zip(restored.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_inverse_transform_column_matches_padded_matrix() {
        let data = array![[1.0, 5.0], [3.0, 7.0], [8.0, 2.0]];
        let mut scaler = StandardScaler::new();
        scaler.fit(&data).unwrap();

        let series = vec![-1.0, 0.0, 0.5];
        let padded = Array2::from_shape_fn((3, 2), |(i, j)| if j == 0 { series[i] } else { 0.0 });
        let expected = scaler.inverse_transform(&padded).unwrap();

        let unscaled = scaler.inverse_transform_column(&series, 0).unwrap();
        for (i, v) in unscaled.iter().enumerate() {
            assert_abs_diff_eq!(*v, expected[[i, 0]], epsilon = 1e-12);
        }
        assert!(scaler.inverse_transform_column(&series, 2).is_err());
    }

    #[test]
    fn test_constant_column() {
        let data = array![[5.0], [5.0], [5.0]];
        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&data).unwrap();
        assert!(scaled.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_unfitted_and_wrong_width() {
        let scaler = StandardScaler::new();
        assert!(!scaler.is_fitted());
        assert!(scaler.transform(&array![[1.0]]).is_err());

        let mut scaler = StandardScaler::new();
        scaler.fit(&array![[1.0], [2.0]]).unwrap();
        assert!(scaler.transform(&array![[1.0, 2.0]]).is_err());
    }
}
