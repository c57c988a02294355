//! Per-run state shared by the pipeline stages.

use crate::config::Settings;
use crate::error::{PipelineError, Result};
use crate::sentiment::SentimentAnalyzer;

const USER_AGENT: &str = concat!("gold_forecast/", env!("CARGO_PKG_VERSION"));

/// Settings, HTTP client and sentiment analyzer for one run. Built once in
/// `main` and passed to each stage by reference.
pub struct RunContext {
    pub settings: Settings,
    pub http: reqwest::Client,
    pub analyzer: SentimentAnalyzer,
}

impl RunContext {
    pub fn new(settings: Settings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| PipelineError::Configuration(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            settings,
            http,
            analyzer: SentimentAnalyzer::new(),
        })
    }
}
