//! Run configuration: command line, compiled-in defaults, optional TOML
//! overrides and the news API secret.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::model::ModelFamily;

/// Environment variable naming an optional TOML settings file.
pub const CONFIG_PATH_ENV: &str = "GOLD_FORECAST_CONFIG";

/// Environment variable holding the news-search API key.
pub const NEWS_API_KEY_ENV: &str = "NEWS_API_KEY";

/// Command line interface.
#[derive(Debug, Clone, Parser)]
#[command(name = "gold_forecast")]
#[command(about = "Train a gold price model from futures prices and news sentiment")]
pub struct Cli {
    /// Gradient-boosted tree family to train
    #[arg(long, value_enum, default_value_t = ModelFamily::Xgb)]
    pub model: ModelFamily,
}

/// Pipeline settings. Every field has a compiled-in default; a TOML file may
/// override any subset of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Market-data ticker for gold futures
    pub symbol: String,

    /// First calendar day of the history window
    pub start_date: NaiveDate,

    /// Last calendar day of the history window (today when unset)
    pub end_date: Option<NaiveDate>,

    /// Query sent to the news-search API
    pub news_query: String,

    /// Articles requested per news page
    pub news_page_size: u32,

    /// Number of forward-chaining cross-validation folds
    pub n_folds: usize,

    /// Serialized model artifact
    pub model_path: PathBuf,

    /// CSV of held-out actual vs predicted prices
    pub predictions_path: PathBuf,

    /// PNG chart of held-out actual vs predicted prices
    pub plot_path: PathBuf,

    /// Base URL of the market-data provider
    pub market_data_url: String,

    /// Base URL of the news-search provider
    pub news_api_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            symbol: "GC=F".to_string(),
            start_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            end_date: None,
            news_query: "gold price".to_string(),
            news_page_size: 100,
            n_folds: 5,
            model_path: PathBuf::from("output/gold_model.json"),
            predictions_path: PathBuf::from("output/predictions.csv"),
            plot_path: PathBuf::from("output/actual_vs_predicted.png"),
            market_data_url: "https://query1.finance.yahoo.com".to_string(),
            news_api_url: "https://newsapi.org".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file, falling back to defaults for missing keys.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            PipelineError::Configuration(format!("cannot parse {}: {}", path.display(), e))
        })
    }

    /// Defaults, overridden by the file named in `GOLD_FORECAST_CONFIG` if set.
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// End of the history window, resolved against today's local date.
    pub fn resolved_end_date(&self) -> NaiveDate {
        self.end_date.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(PipelineError::Configuration("symbol must not be empty".into()));
        }

        if self.news_query.trim().is_empty() {
            return Err(PipelineError::Configuration("news_query must not be empty".into()));
        }

        if self.news_page_size == 0 {
            return Err(PipelineError::Configuration(
                "news_page_size must be greater than 0".into(),
            ));
        }

        if self.n_folds < 2 {
            return Err(PipelineError::Configuration("n_folds must be at least 2".into()));
        }

        let end = self.resolved_end_date();
        if self.start_date >= end {
            return Err(PipelineError::Configuration(format!(
                "start_date {} must precede end_date {}",
                self.start_date, end
            )));
        }

        Ok(())
    }
}

/// Read the news API key through `lookup` and reject a missing or blank value.
pub fn news_api_key_from<F>(lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(NEWS_API_KEY_ENV) {
        Some(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        _ => Err(PipelineError::Configuration(format!(
            "{} is not set; export the news API key before running",
            NEWS_API_KEY_ENV
        ))),
    }
}

/// Read the news API key from the process environment.
pub fn news_api_key() -> Result<String> {
    news_api_key_from(|name| std::env::var(name).ok())
}
