//! Regression metrics and held-out prediction output.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Root mean squared error. NaN for empty or mismatched input.
pub fn rmse(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() || y_true.len() != y_pred.len() {
        return f64::NAN;
    }
    let mse = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>()
        / y_true.len() as f64;
    mse.sqrt()
}

/// Mean absolute error. NaN for empty or mismatched input.
pub fn mae(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() || y_true.len() != y_pred.len() {
        return f64::NAN;
    }
    y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).abs())
        .sum::<f64>()
        / y_true.len() as f64
}

/// Coefficient of determination. A constant target scores 1 when predicted
/// exactly and 0 otherwise.
pub fn r2(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() || y_true.len() != y_pred.len() {
        return f64::NAN;
    }
    let mean_true = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean_true).powi(2)).sum();
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();

    if ss_tot == 0.0 {
        if ss_res == 0.0 { 1.0 } else { 0.0 }
    } else {
        1.0 - ss_res / ss_tot
    }
}

/// Held-out accuracy of the refitted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub rmse: f64,
    pub r2: f64,
    pub mae: f64,
    pub n_samples: usize,
}

impl ModelMetrics {
    pub fn regression(y_true: &[f64], y_pred: &[f64]) -> Self {
        Self {
            rmse: rmse(y_true, y_pred),
            r2: r2(y_true, y_pred),
            mae: mae(y_true, y_pred),
            n_samples: y_true.len(),
        }
    }

    pub fn print_summary(&self) {
        println!("\nHeld-out evaluation ({} rows)", self.n_samples);
        println!("==============================");
        println!("RMSE: {:.4}", self.rmse);
        println!("R2:   {:.4}", self.r2);
        println!("MAE:  {:.4}", self.mae);
    }
}

/// One held-out day: observed and predicted price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub date: NaiveDate,
    pub actual: f64,
    pub predicted: f64,
}

/// Write prediction records as CSV with a `date,actual,predicted` header,
/// creating parent directories as needed.
pub fn write_predictions_csv<P: AsRef<Path>>(path: P, records: &[PredictionRecord]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read prediction records written by `write_predictions_csv`.
pub fn read_predictions_csv<P: AsRef<Path>>(path: P) -> Result<Vec<PredictionRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let records: Vec<PredictionRecord> = reader
        .deserialize()
        .collect::<std::result::Result<_, csv::Error>>()?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_metrics() {
        let y_true = vec![1.0, 2.0, 3.0, 4.0];
        let y_pred = vec![1.0, 2.0, 3.0, 6.0];

        assert!((rmse(&y_true, &y_pred) - 1.0).abs() < 1e-12);
        assert!((mae(&y_true, &y_pred) - 0.5).abs() < 1e-12);
        // ss_tot = 5, ss_res = 4
        assert!((r2(&y_true, &y_pred) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_r2_constant_target() {
        let y = vec![5.0, 5.0, 5.0];
        assert_eq!(r2(&y, &y), 1.0);
        assert_eq!(r2(&y, &[5.0, 5.0, 6.0]), 0.0);
    }

    #[test]
    fn test_empty_input_is_nan() {
        assert!(rmse(&[], &[]).is_nan());
        assert!(r2(&[1.0], &[]).is_nan());
    }

    #[test]
    fn test_predictions_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/predictions.csv");
        let records = vec![
            PredictionRecord {
                date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                actual: 2085.4,
                predicted: 2079.9,
            },
            PredictionRecord {
                date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
                actual: 2126.3,
                predicted: 2101.0,
            },
        ];

        write_predictions_csv(&path, &records).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("date,actual,predicted\n2024-03-01,2085.4,2079.9\n"));
        assert_eq!(read_predictions_csv(&path).unwrap(), records);
    }
}
