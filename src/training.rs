//! Trainer: grid search over forward-chaining folds, refit on the last
//! fold, held-out evaluation and the persisted model artifact.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cv::{GridSearchResult, TimeSeriesSplit, grid_search};
use crate::error::{PipelineError, Result};
use crate::evaluation::{ModelMetrics, PredictionRecord};
use crate::features::{FEATURE_NAMES, FeatureRow};
use crate::model::{GradientBoostedModel, HyperParams, ModelFamily, Regressor, param_grid};

/// Fitted regressor plus everything needed to reuse it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModel {
    pub family: ModelFamily,
    pub params: HyperParams,
    pub feature_names: Vec<String>,
    pub booster: GradientBoostedModel,
    pub cv_results: GridSearchResult,
    pub trained_at: DateTime<Utc>,
}

impl TrainedModel {
    /// Score feature rows with the fitted booster.
    pub fn predict_rows(&self, rows: &[FeatureRow]) -> Vec<f64> {
        rows.iter()
            .map(|row| self.booster.predict_row(&row.features()))
            .collect()
    }

    /// Serialize as pretty JSON, creating parent directories as needed.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            PipelineError::DataUnavailable(format!("cannot open model {}: {}", path.display(), e))
        })?;
        let model: TrainedModel = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            PipelineError::DataUnavailable(format!("cannot parse model {}: {}", path.display(), e))
        })?;

        if model.feature_names.len() != FEATURE_NAMES.len()
            || model.feature_names.iter().zip(FEATURE_NAMES.iter()).any(|(a, b)| a != b)
        {
            return Err(PipelineError::DataUnavailable(format!(
                "model {} was trained on different features",
                path.display()
            )));
        }
        Ok(model)
    }
}

/// Everything a training run produces.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: TrainedModel,
    pub predictions: Vec<PredictionRecord>,
    pub metrics: ModelMetrics,
}

/// Select hyperparameters by forward-chaining CV, refit the best on the last
/// fold's training rows and evaluate on its validation rows.
pub fn train(rows: &[FeatureRow], family: ModelFamily, n_folds: usize) -> Result<TrainingOutcome> {
    if rows.is_empty() {
        return Err(PipelineError::TrainingFailure("feature table is empty".into()));
    }

    let x: Vec<Vec<f64>> = rows.iter().map(|r| r.features().to_vec()).collect();
    let y: Vec<f64> = rows.iter().map(FeatureRow::target).collect();

    let folds = TimeSeriesSplit::new(n_folds).split(rows.len())?;
    let grid = param_grid(family);
    let cv_results = grid_search(family, &grid, &x, &y, &folds)?;
    let params = cv_results.best().params;

    let Some(last) = folds.last() else {
        return Err(PipelineError::TrainingFailure("no cross-validation folds".into()));
    };
    info!(
        "Refitting {} on rows {}..{} ({} .. {}), holding out {}..{}",
        family,
        last.train.start,
        last.train.end,
        rows[last.train.start].date,
        rows[last.train.end - 1].date,
        last.validation.start,
        last.validation.end
    );

    let mut booster = GradientBoostedModel::new(family, &params);
    booster.fit(&x[last.train.clone()], &y[last.train.clone()])?;

    let held_out = &rows[last.validation.clone()];
    let predicted = booster.predict(&x[last.validation.clone()]);
    let actual: Vec<f64> = held_out.iter().map(FeatureRow::target).collect();
    let metrics = ModelMetrics::regression(&actual, &predicted);
    info!(
        "Held-out RMSE {:.4}, R2 {:.4}, MAE {:.4} over {} rows",
        metrics.rmse, metrics.r2, metrics.mae, metrics.n_samples
    );

    let predictions = held_out
        .iter()
        .zip(predicted.iter())
        .map(|(row, &p)| PredictionRecord {
            date: row.date,
            actual: row.target(),
            predicted: p,
        })
        .collect();

    let model = TrainedModel {
        family,
        params,
        feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        booster,
        cv_results,
        trained_at: Utc::now(),
    };

    Ok(TrainingOutcome {
        model,
        predictions,
        metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use tempfile::tempdir;

    fn synthetic_rows(n: usize) -> Vec<FeatureRow> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        (0..n)
            .map(|i| {
                let t = i as f64;
                let price = 1800.0 + 2.0 * t + 15.0 * (t * 0.2).sin();
                FeatureRow {
                    date: start + Duration::days(i as i64),
                    adjusted_close: price,
                    volume: 1000.0 + (i % 11) as f64 * 50.0,
                    daily_return: 0.001 * (t * 0.5).cos(),
                    sentiment: 0.1 * (t * 0.3).sin(),
                    sma10: price - 3.0,
                    rsi14: 50.0 + 20.0 * (t * 0.2).cos(),
                    macd: (t * 0.2).cos(),
                    macd_signal: (t * 0.15).cos(),
                    return_lag1: 0.001 * ((t - 1.0) * 0.5).cos(),
                    return_lag2: 0.001 * ((t - 2.0) * 0.5).cos(),
                    return_lag3: 0.001 * ((t - 3.0) * 0.5).cos(),
                    sentiment_lag1: 0.1 * ((t - 1.0) * 0.3).sin(),
                    sentiment_lag2: 0.1 * ((t - 2.0) * 0.3).sin(),
                    sentiment_lag3: 0.1 * ((t - 3.0) * 0.3).sin(),
                }
            })
            .collect()
    }

    #[test]
    fn test_held_out_window_is_last_fold() {
        let rows = synthetic_rows(30);
        let outcome = train(&rows, ModelFamily::Lgbm, 5).unwrap();

        assert_eq!(outcome.predictions.len(), 5);
        let held_out_dates: Vec<NaiveDate> = outcome.predictions.iter().map(|p| p.date).collect();
        let expected: Vec<NaiveDate> = rows[25..].iter().map(|r| r.date).collect();
        assert_eq!(held_out_dates, expected);
        assert_eq!(outcome.metrics.n_samples, 5);
        assert!(outcome.metrics.rmse.is_finite());
        assert_eq!(outcome.model.cv_results.candidates.len(), 4);
    }

    #[test]
    fn test_fewer_rows_than_folds_fails() {
        let rows = synthetic_rows(4);
        let err = train(&rows, ModelFamily::Xgb, 5).unwrap_err();
        assert!(matches!(err, PipelineError::TrainingFailure(_)));

        assert!(matches!(
            train(&[], ModelFamily::Xgb, 5),
            Err(PipelineError::TrainingFailure(_))
        ));
    }

    #[test]
    fn test_training_is_idempotent() {
        let rows = synthetic_rows(60);
        let a = train(&rows, ModelFamily::Xgb, 5).unwrap();
        let b = train(&rows, ModelFamily::Xgb, 5).unwrap();
        assert_eq!(a.predictions, b.predictions);
        assert_eq!(a.model.params, b.model.params);
        assert!(a.model.params.max_depth.is_some());
    }

    #[test]
    fn test_saved_model_reloads() {
        let rows = synthetic_rows(48);
        let outcome = train(&rows, ModelFamily::Xgb, 3).unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("models/gold.json");
        outcome.model.save(&path).unwrap();

        let loaded = TrainedModel::load(&path).unwrap();
        assert_eq!(loaded.family, ModelFamily::Xgb);
        assert_eq!(loaded.params, outcome.model.params);

        let held_out = &rows[rows.len() - outcome.predictions.len()..];
        let reloaded: Vec<f64> = loaded.predict_rows(held_out);
        let original: Vec<f64> = outcome.predictions.iter().map(|p| p.predicted).collect();
        for (r, o) in reloaded.iter().zip(original.iter()) {
            assert!((r - o).abs() < 1e-9);
        }
    }

    #[test]
    fn test_load_missing_model() {
        let dir = tempdir().unwrap();
        assert!(TrainedModel::load(dir.path().join("absent.json")).is_err());
    }
}
