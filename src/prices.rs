//! Price series loader: daily adjusted close and volume for one symbol.

use chrono::{DateTime, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};

/// One trading day of the loaded series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub adjusted_close: f64,
    pub volume: u64,
    /// Simple return versus the previous retained row
    pub daily_return: f64,
}

/// A raw observation before returns are derived.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawBar {
    pub date: NaiveDate,
    pub adjusted_close: f64,
    pub volume: u64,
}

#[derive(Debug, Deserialize)]
pub struct ChartResponse {
    pub chart: Chart,
}

#[derive(Debug, Deserialize)]
pub struct Chart {
    pub result: Option<Vec<ChartResult>>,
    pub error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
pub struct ChartError {
    pub code: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChartResult {
    pub meta: Option<ChartMeta>,
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
pub struct ChartMeta {
    #[serde(default)]
    pub gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
pub struct ChartIndicators {
    #[serde(default)]
    pub quote: Vec<Quote>,
    #[serde(default)]
    pub adjclose: Vec<AdjClose>,
}

#[derive(Debug, Deserialize)]
pub struct Quote {
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
pub struct AdjClose {
    #[serde(default)]
    pub adjclose: Vec<Option<f64>>,
}

/// Client for the Yahoo Finance chart endpoint.
pub struct MarketDataClient {
    client: reqwest::Client,
    base_url: String,
}

impl MarketDataClient {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch the daily chart for `symbol` covering `start..=end`.
    pub async fn get_daily_chart(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ChartResponse> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        let period1 = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        // period2 is exclusive upstream; extend by one day so `end` is included
        let period2 = end.and_time(NaiveTime::MIN).and_utc().timestamp() + 86_400;

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
                ("includeAdjustedClose", "true".to_string()),
            ])
            .send()
            .await
            .map_err(|e| PipelineError::DataUnavailable(format!("price request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(PipelineError::DataUnavailable(format!(
                "price request for {} returned HTTP {}",
                symbol,
                response.status()
            )));
        }

        response
            .json::<ChartResponse>()
            .await
            .map_err(|e| PipelineError::DataUnavailable(format!("malformed price response: {}", e)))
    }
}

/// Turn a chart response into ascending raw bars.
///
/// Days whose close or volume is missing are dropped, not interpolated.
/// Dates come from the exchange-local calendar via `gmtoffset`; when a date
/// repeats, the later observation wins.
pub fn series_from_chart(response: ChartResponse) -> Result<Vec<RawBar>> {
    if let Some(err) = response.chart.error {
        return Err(PipelineError::DataUnavailable(format!(
            "market data error {}: {}",
            err.code.unwrap_or_default(),
            err.description.unwrap_or_default()
        )));
    }

    let result = response
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| PipelineError::DataUnavailable("empty chart result".into()))?;

    let offset = result.meta.as_ref().map_or(0, |m| m.gmtoffset);
    let quote = result.indicators.quote.first();
    let closes: &[Option<f64>] = match result.indicators.adjclose.first() {
        Some(adj) if !adj.adjclose.is_empty() => &adj.adjclose,
        _ => quote.map(|q| q.close.as_slice()).unwrap_or(&[]),
    };
    let volumes: &[Option<f64>] = quote.map(|q| q.volume.as_slice()).unwrap_or(&[]);

    let mut bars: Vec<RawBar> = Vec::with_capacity(result.timestamp.len());
    for (i, &ts) in result.timestamp.iter().enumerate() {
        let close = closes.get(i).copied().flatten();
        let volume = volumes.get(i).copied().flatten();
        let (Some(close), Some(volume)) = (close, volume) else {
            debug!("Dropping bar {} with missing values", ts);
            continue;
        };
        if !close.is_finite() || close <= 0.0 || !volume.is_finite() || volume < 0.0 {
            debug!("Dropping bar {} with invalid values", ts);
            continue;
        }
        let Some(dt) = DateTime::from_timestamp(ts + offset, 0) else {
            continue;
        };
        bars.push(RawBar {
            date: dt.date_naive(),
            adjusted_close: close,
            volume: volume.round() as u64,
        });
    }

    bars.sort_by_key(|b| b.date);
    bars.dedup_by(|later, earlier| {
        if later.date == earlier.date {
            *earlier = *later;
            true
        } else {
            false
        }
    });

    Ok(bars)
}

/// Derive simple returns and drop the first bar, whose return is undefined.
pub fn derive_returns(bars: &[RawBar]) -> Vec<PricePoint> {
    bars.windows(2)
        .map(|w| PricePoint {
            date: w[1].date,
            adjusted_close: w[1].adjusted_close,
            volume: w[1].volume,
            daily_return: w[1].adjusted_close / w[0].adjusted_close - 1.0,
        })
        .collect()
}

/// Fetch, clean and derive the price series for `symbol`.
pub async fn load_price_series(
    client: &MarketDataClient,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<PricePoint>> {
    info!("Loading {} prices from {} to {}", symbol, start, end);

    let response = client.get_daily_chart(symbol, start, end).await?;
    let bars = series_from_chart(response)?;
    if bars.len() < 2 {
        return Err(PipelineError::DataUnavailable(format!(
            "{} usable price rows for {}, need at least 2",
            bars.len(),
            symbol
        )));
    }

    let series = derive_returns(&bars);
    info!(
        "Loaded {} price points ({} .. {})",
        series.len(),
        series[0].date,
        series[series.len() - 1].date
    );
    Ok(series)
}
