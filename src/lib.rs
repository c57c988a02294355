//! Gold price forecasting from futures prices and news sentiment.
//!
//! One batch run loads daily prices, collects headlines, scores their
//! sentiment, builds indicator/lag features and trains a gradient-boosted
//! regressor with forward-chaining cross-validation.

pub mod config;
pub mod context;
pub mod cv;
pub mod error;
pub mod evaluation;
pub mod features;
pub mod indicators;
pub mod model;
pub mod news;
pub mod pipeline;
pub mod prices;
pub mod sentiment;
pub mod training;
pub mod visualization;

pub use config::{Cli, Settings};
pub use context::RunContext;
pub use error::{PipelineError, Result};
pub use features::{FeatureRow, build_features};
pub use model::ModelFamily;
pub use training::{TrainedModel, TrainingOutcome, train};
