//! Gradient-boosted regression trees.
//!
//! Two families share one `Regressor` interface:
//!
//! - `xgb`: depth-wise growth with exact greedy splits
//! - `lgbm`: leaf-wise growth over histogram bins
//!
//! Both fit the squared-error objective, start from the target mean and are
//! fully deterministic.

pub mod lgb;
pub mod tree;
pub mod xgb;

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
pub use lgb::{LgbmParams, LgbmRegressor};
pub use tree::{RegressionTree, TreeNode};
pub use xgb::{XgbParams, XgbRegressor};

/// Splits gaining less than this are not taken.
pub(crate) const MIN_SPLIT_GAIN: f64 = 1e-10;

/// Model family selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    /// Depth-wise booster
    Xgb,
    /// Leaf-wise histogram booster
    Lgbm,
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelFamily::Xgb => write!(f, "xgb"),
            ModelFamily::Lgbm => write!(f, "lgbm"),
        }
    }
}

/// The tunable subset of a family's parameters searched by the grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HyperParams {
    pub learning_rate: f64,
    /// Only searched for `xgb`
    pub max_depth: Option<usize>,
    pub n_estimators: usize,
}

impl fmt::Display for HyperParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "learning_rate={}", self.learning_rate)?;
        if let Some(depth) = self.max_depth {
            write!(f, ", max_depth={}", depth)?;
        }
        write!(f, ", n_estimators={}", self.n_estimators)
    }
}

const GRID_LEARNING_RATES: [f64; 2] = [0.01, 0.1];
const GRID_MAX_DEPTHS: [usize; 2] = [3, 5];
const GRID_N_ESTIMATORS: [usize; 2] = [100, 200];

/// Hyperparameter grid of a family.
///
/// Keys are iterated in name order with the last key varying fastest, so
/// grid position is also the tie-break order.
pub fn param_grid(family: ModelFamily) -> Vec<HyperParams> {
    let depths: Vec<Option<usize>> = match family {
        ModelFamily::Xgb => GRID_MAX_DEPTHS.iter().map(|&d| Some(d)).collect(),
        ModelFamily::Lgbm => vec![None],
    };

    let mut grid = Vec::new();
    for &learning_rate in &GRID_LEARNING_RATES {
        for &max_depth in &depths {
            for &n_estimators in &GRID_N_ESTIMATORS {
                grid.push(HyperParams {
                    learning_rate,
                    max_depth,
                    n_estimators,
                });
            }
        }
    }
    grid
}

/// Fit/predict capability shared by both families.
pub trait Regressor {
    /// Fit on row-major `x` (one inner vector per sample) against `y`.
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()>;

    fn predict_row(&self, row: &[f64]) -> f64;

    fn predict(&self, x: &[Vec<f64>]) -> Vec<f64> {
        x.iter().map(|row| self.predict_row(row)).collect()
    }
}

/// A booster of either family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "lowercase")]
pub enum GradientBoostedModel {
    Xgb(XgbRegressor),
    Lgbm(LgbmRegressor),
}

impl GradientBoostedModel {
    /// Unfitted model of `family` configured with `params`.
    pub fn new(family: ModelFamily, params: &HyperParams) -> Self {
        match family {
            ModelFamily::Xgb => GradientBoostedModel::Xgb(XgbRegressor::new(XgbParams::from(params))),
            ModelFamily::Lgbm => {
                GradientBoostedModel::Lgbm(LgbmRegressor::new(LgbmParams::from(params)))
            }
        }
    }

    pub fn family(&self) -> ModelFamily {
        match self {
            GradientBoostedModel::Xgb(_) => ModelFamily::Xgb,
            GradientBoostedModel::Lgbm(_) => ModelFamily::Lgbm,
        }
    }

    pub fn n_trees(&self) -> usize {
        match self {
            GradientBoostedModel::Xgb(m) => m.trees().len(),
            GradientBoostedModel::Lgbm(m) => m.trees().len(),
        }
    }
}

impl Regressor for GradientBoostedModel {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        match self {
            GradientBoostedModel::Xgb(m) => m.fit(x, y),
            GradientBoostedModel::Lgbm(m) => m.fit(x, y),
        }
    }

    fn predict_row(&self, row: &[f64]) -> f64 {
        match self {
            GradientBoostedModel::Xgb(m) => m.predict_row(row),
            GradientBoostedModel::Lgbm(m) => m.predict_row(row),
        }
    }
}

/// Check shape and finiteness of a training set and return it column-major.
pub(crate) fn to_columns(x: &[Vec<f64>], y: &[f64]) -> Result<Vec<Vec<f64>>> {
    if x.is_empty() {
        return Err(PipelineError::TrainingFailure("no training rows".into()));
    }
    if x.len() != y.len() {
        return Err(PipelineError::TrainingFailure(format!(
            "{} feature rows but {} targets",
            x.len(),
            y.len()
        )));
    }

    let n_features = x[0].len();
    if n_features == 0 {
        return Err(PipelineError::TrainingFailure("no feature columns".into()));
    }
    if x.iter().any(|row| row.len() != n_features) {
        return Err(PipelineError::TrainingFailure("ragged feature rows".into()));
    }
    if x.iter().flatten().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(PipelineError::TrainingFailure(
            "non-finite value in training data".into(),
        ));
    }

    let columns = (0..n_features)
        .map(|f| x.iter().map(|row| row[f]).collect())
        .collect();
    Ok(columns)
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
