//! Forward-chaining cross-validation and hyperparameter grid search.

use std::ops::Range;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::evaluation::rmse;
use crate::model::{GradientBoostedModel, HyperParams, ModelFamily, Regressor};

/// One train/validation split, as row ranges of a date-ordered table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Range<usize>,
    pub validation: Range<usize>,
}

/// Forward-chaining splitter: validation blocks of equal size at the end of
/// the table, each trained on every row before it.
#[derive(Debug, Clone, Copy)]
pub struct TimeSeriesSplit {
    pub n_splits: usize,
}

impl TimeSeriesSplit {
    pub fn new(n_splits: usize) -> Self {
        Self { n_splits }
    }

    pub fn split(&self, n_samples: usize) -> Result<Vec<Fold>> {
        if self.n_splits < 2 {
            return Err(PipelineError::TrainingFailure(format!(
                "need at least 2 folds, got {}",
                self.n_splits
            )));
        }
        let n_blocks = self.n_splits + 1;
        if n_blocks > n_samples {
            return Err(PipelineError::TrainingFailure(format!(
                "cannot split {} rows into {} folds",
                n_samples, self.n_splits
            )));
        }

        let test_size = n_samples / n_blocks;
        let first_test = n_samples - self.n_splits * test_size;
        let folds = (0..self.n_splits)
            .map(|k| {
                let start = first_test + k * test_size;
                Fold {
                    train: 0..start,
                    validation: start..start + test_size,
                }
            })
            .collect();
        Ok(folds)
    }
}

/// Cross-validated score of one grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub params: HyperParams,
    /// Negative RMSE per fold
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSearchResult {
    pub candidates: Vec<CandidateScore>,
    pub best_index: usize,
}

impl GridSearchResult {
    pub fn best(&self) -> &CandidateScore {
        &self.candidates[self.best_index]
    }
}

fn score_candidate(
    family: ModelFamily,
    params: &HyperParams,
    x: &[Vec<f64>],
    y: &[f64],
    folds: &[Fold],
) -> Result<CandidateScore> {
    let mut fold_scores = Vec::with_capacity(folds.len());
    for fold in folds {
        let mut model = GradientBoostedModel::new(family, params);
        model.fit(&x[fold.train.clone()], &y[fold.train.clone()])?;
        let predicted = model.predict(&x[fold.validation.clone()]);
        fold_scores.push(-rmse(&y[fold.validation.clone()], &predicted));
    }

    let mean_score = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
    if !mean_score.is_finite() {
        return Err(PipelineError::TrainingFailure(format!(
            "non-finite CV score for {}",
            params
        )));
    }
    Ok(CandidateScore {
        params: *params,
        fold_scores,
        mean_score,
    })
}

/// Score every grid point over `folds` and pick the highest mean score.
/// Candidates run in parallel; ties go to the earlier grid point.
pub fn grid_search(
    family: ModelFamily,
    grid: &[HyperParams],
    x: &[Vec<f64>],
    y: &[f64],
    folds: &[Fold],
) -> Result<GridSearchResult> {
    if grid.is_empty() {
        return Err(PipelineError::TrainingFailure("empty hyperparameter grid".into()));
    }
    if folds.is_empty() {
        return Err(PipelineError::TrainingFailure("no cross-validation folds".into()));
    }

    info!(
        "Grid search: {} {} candidates x {} folds",
        grid.len(),
        family,
        folds.len()
    );

    let candidates: Vec<CandidateScore> = grid
        .par_iter()
        .map(|params| score_candidate(family, params, x, y, folds))
        .collect::<Result<Vec<_>>>()?;

    let mut best_index = 0;
    for (i, c) in candidates.iter().enumerate() {
        info!("  [{}] {} -> mean score {:.4}", i, c.params, c.mean_score);
        if c.mean_score > candidates[best_index].mean_score {
            best_index = i;
        }
    }

    let result = GridSearchResult {
        candidates,
        best_index,
    };
    info!(
        "Best parameters: {} (mean score {:.4})",
        result.best().params,
        result.best().mean_score
    );
    Ok(result)
}
