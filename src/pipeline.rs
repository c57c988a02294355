//! Stage orchestration: prices, headlines, sentiment, features, training
//! and outputs, strictly in that order.

use tracing::info;

use crate::config::Settings;
use crate::context::RunContext;
use crate::error::Result;
use crate::evaluation::write_predictions_csv;
use crate::features::build_features;
use crate::model::ModelFamily;
use crate::news::{Headline, NewsApiClient, collect_headlines};
use crate::prices::{MarketDataClient, PricePoint, load_price_series};
use crate::sentiment::{SentimentAnalyzer, daily_sentiment};
use crate::training::{TrainingOutcome, train};
use crate::visualization::plot_predictions;

/// Score headlines, build features and train. No I/O.
pub fn train_from_sources(
    prices: &[PricePoint],
    headlines: &[Headline],
    analyzer: &SentimentAnalyzer,
    family: ModelFamily,
    n_folds: usize,
) -> Result<TrainingOutcome> {
    let daily = daily_sentiment(headlines, analyzer);
    let rows = build_features(prices, &daily);
    train(&rows, family, n_folds)
}

/// Fetch both sources and train. `api_key` must already be validated.
pub async fn run(ctx: &RunContext, family: ModelFamily, api_key: String) -> Result<TrainingOutcome> {
    let settings = &ctx.settings;
    let start = settings.start_date;
    let end = settings.resolved_end_date();

    let market = MarketDataClient::new(ctx.http.clone(), &settings.market_data_url);
    let prices = load_price_series(&market, &settings.symbol, start, end).await?;

    info!("Collecting headlines for \"{}\"", settings.news_query);
    let news = NewsApiClient::new(
        ctx.http.clone(),
        &settings.news_api_url,
        api_key,
        &settings.news_query,
        start,
        end,
    );
    let headlines = collect_headlines(&news, settings.news_page_size).await?;

    train_from_sources(&prices, &headlines, &ctx.analyzer, family, settings.n_folds)
}

/// Write model, predictions CSV and chart, in that order.
pub fn write_outputs(outcome: &TrainingOutcome, settings: &Settings) -> Result<()> {
    outcome.model.save(&settings.model_path)?;
    info!("Model written to {}", settings.model_path.display());

    write_predictions_csv(&settings.predictions_path, &outcome.predictions)?;
    info!("Predictions written to {}", settings.predictions_path.display());

    plot_predictions(&outcome.predictions, &settings.plot_path)?;
    info!("Chart written to {}", settings.plot_path.display());
    Ok(())
}
