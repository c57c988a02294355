use anyhow::{Context, Result};
use clap::Parser;
use gold_forecast::config::news_api_key;
use gold_forecast::pipeline::{run, write_outputs};
use gold_forecast::{Cli, RunContext, Settings};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    // Load configuration
    let settings = Settings::from_env().context("loading settings")?;
    settings.validate()?;
    let api_key = news_api_key()?;

    info!(
        "Gold forecast: {} model, {} from {} to {}",
        cli.model,
        settings.symbol,
        settings.start_date,
        settings.resolved_end_date()
    );

    let ctx = RunContext::new(settings)?;
    let outcome = run(&ctx, cli.model, api_key).await.context("pipeline run failed")?;

    write_outputs(&outcome, &ctx.settings).context("writing outputs")?;

    println!("\n{}", "=".repeat(60));
    println!("Summary");
    println!("{}", "=".repeat(60));
    println!("Model family: {}", outcome.model.family);
    println!("Best parameters: {}", outcome.model.params);
    println!("Mean CV score (neg. RMSE): {:.4}", outcome.model.cv_results.best().mean_score);
    outcome.metrics.print_summary();

    Ok(())
}
