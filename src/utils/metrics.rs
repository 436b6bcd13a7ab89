//! Metrics for comparing predicted and actual series

use serde::Serialize;

/// Mean Squared Error
pub fn mse(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>()
        / y_true.len() as f64
}

/// Root Mean Squared Error
pub fn rmse(y_true: &[f64], y_pred: &[f64]) -> f64 {
    mse(y_true, y_pred).sqrt()
}

/// Mean Absolute Error
pub fn mae(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).abs())
        .sum::<f64>()
        / y_true.len() as f64
}

/// Mean Absolute Percentage Error, in percent. Zero actuals are skipped.
pub fn mape(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let n = y_true.len() as f64;
    if n == 0.0 {
        return 0.0;
    }

    let mut sum = 0.0;
    for (t, p) in y_true.iter().zip(y_pred) {
        if *t != 0.0 {
            sum += ((t - p) / t).abs();
        }
    }

    (sum / n) * 100.0
}

/// Coefficient of determination
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;

    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum();

    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        0.0
    } else {
        1.0 - (ss_res / ss_tot)
    }
}

/// Share of steps where the predicted move has the same sign as the actual move
pub fn directional_accuracy(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.len() < 2 {
        return 0.0;
    }

    let n = y_true.len() - 1;
    let mut correct = 0;

    for i in 1..y_true.len() {
        let true_direction = y_true[i] > y_true[i - 1];
        let pred_direction = y_pred[i] > y_pred[i - 1];

        if true_direction == pred_direction {
            correct += 1;
        }
    }

    correct as f64 / n as f64
}

/// Summary of prediction quality
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Metrics {
    pub samples: usize,
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub mape: f64,
    pub r2: f64,
    pub directional_accuracy: f64,
}

impl Metrics {
    pub fn compute(actual: &[f64], predicted: &[f64]) -> Self {
        Self {
            samples: actual.len(),
            mse: mse(actual, predicted),
            rmse: rmse(actual, predicted),
            mae: mae(actual, predicted),
            mape: mape(actual, predicted),
            r2: r2_score(actual, predicted),
            directional_accuracy: directional_accuracy(actual, predicted),
        }
    }

    /// Labelled, formatted values for a summary table.
    ///
    /// Standardized series sit around zero, where MAPE is meaningless;
    /// leave `with_mape` off for them.
    pub fn report_rows(&self, with_mape: bool) -> Vec<(&'static str, String)> {
        let mut rows = vec![
            ("MSE", format!("{:.6}", self.mse)),
            ("RMSE", format!("{:.6}", self.rmse)),
            ("MAE", format!("{:.6}", self.mae)),
        ];
        if with_mape {
            rows.push(("MAPE", format!("{:.2}%", self.mape)));
        }
        rows.push(("R2", format!("{:.4}", self.r2)));
        rows.push((
            "Directional accuracy",
            format!("{:.1}%", self.directional_accuracy * 100.0),
        ));
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_mse() {
        let y_true = [1.0, 2.0, 3.0];
        let y_pred = [1.1, 2.0, 2.9];

        let error = mse(&y_true, &y_pred);
        assert_abs_diff_eq!(error, 0.006666666666666667, epsilon = 1e-10);
        assert_abs_diff_eq!(rmse(&y_true, &y_pred), error.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_mae_and_mape() {
        let y_true = [100.0, 200.0];
        let y_pred = [110.0, 180.0];

        assert_abs_diff_eq!(mae(&y_true, &y_pred), 15.0, epsilon = 1e-12);
        assert_abs_diff_eq!(mape(&y_true, &y_pred), 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_r2_score() {
        let y_true = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y_pred = [1.1, 2.1, 2.9, 4.0, 5.1];

        let r2 = r2_score(&y_true, &y_pred);
        assert!(r2 > 0.95);
        assert_eq!(r2_score(&[2.0, 2.0], &[1.0, 3.0]), 0.0);
    }

    #[test]
    fn test_directional_accuracy() {
        let y_true = [1.0, 2.0, 1.5, 3.0];
        let y_pred = [1.0, 1.5, 1.6, 2.0];
        // up/up, down/up, up/up
        assert_abs_diff_eq!(directional_accuracy(&y_true, &y_pred), 2.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_inputs() {
        let m = Metrics::compute(&[], &[]);
        assert_eq!(m.samples, 0);
        assert_eq!(m.mse, 0.0);
        assert_eq!(m.directional_accuracy, 0.0);
    }

    #[test]
    fn test_report_rows_mape_only_on_request() {
        let m = Metrics::compute(&[100.0, 102.0, 101.0], &[101.0, 101.5, 100.0]);

        let standardized = m.report_rows(false);
        assert!(standardized.iter().all(|(label, _)| *label != "MAPE"));
        assert_eq!(standardized.len(), 5);

        let prices = m.report_rows(true);
        let mape = prices.iter().find(|(label, _)| *label == "MAPE").unwrap();
        assert!(mape.1.ends_with('%'));
        assert_eq!(prices.len(), 6);
    }
}
