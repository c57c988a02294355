//! Feature builder: joins daily sentiment onto the price series and adds
//! indicator and lag columns.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::indicators::{MACD_SPANS, macd, rsi, sma};
use crate::prices::PricePoint;
use crate::sentiment::DailySentiment;

pub const SMA_PERIOD: usize = 10;
pub const RSI_PERIOD: usize = 14;
pub const MAX_LAG: usize = 3;

/// Model input columns, in the order `FeatureRow::features` emits them.
pub const FEATURE_NAMES: [&str; 11] = [
    "return_lag1",
    "return_lag2",
    "return_lag3",
    "sentiment_lag1",
    "sentiment_lag2",
    "sentiment_lag3",
    "sma10",
    "rsi14",
    "macd",
    "macd_signal",
    "volume",
];

/// One fully-defined row of the feature table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub adjusted_close: f64,
    pub volume: f64,
    pub daily_return: f64,
    pub sentiment: f64,
    pub sma10: f64,
    pub rsi14: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub return_lag1: f64,
    pub return_lag2: f64,
    pub return_lag3: f64,
    pub sentiment_lag1: f64,
    pub sentiment_lag2: f64,
    pub sentiment_lag3: f64,
}

impl FeatureRow {
    /// Model inputs in `FEATURE_NAMES` order.
    pub fn features(&self) -> [f64; 11] {
        [
            self.return_lag1,
            self.return_lag2,
            self.return_lag3,
            self.sentiment_lag1,
            self.sentiment_lag2,
            self.sentiment_lag3,
            self.sma10,
            self.rsi14,
            self.macd,
            self.macd_signal,
            self.volume,
        ]
    }

    /// Regression label: the price level of the same day.
    pub fn target(&self) -> f64 {
        self.adjusted_close
    }
}

/// Sentiment per price date; dates absent from `daily` get exactly 0.
pub fn join_sentiment(prices: &[PricePoint], daily: &[DailySentiment]) -> Vec<f64> {
    let by_date: HashMap<NaiveDate, f64> = daily.iter().map(|d| (d.date, d.score)).collect();
    prices
        .iter()
        .map(|p| by_date.get(&p.date).copied().unwrap_or(0.0))
        .collect()
}

/// Value `lag` rows back, NaN while there is no such row.
fn lagged(values: &[f64], i: usize, lag: usize) -> f64 {
    if i >= lag { values[i - lag] } else { f64::NAN }
}

/// Build the feature table. Rows with any undefined indicator or lag are
/// dropped, so the result starts after the longest warm-up.
pub fn build_features(prices: &[PricePoint], daily: &[DailySentiment]) -> Vec<FeatureRow> {
    let closes: Vec<f64> = prices.iter().map(|p| p.adjusted_close).collect();
    let returns: Vec<f64> = prices.iter().map(|p| p.daily_return).collect();
    let sentiment = join_sentiment(prices, daily);

    let sma10 = sma(&closes, SMA_PERIOD);
    let rsi_values = rsi(&closes, RSI_PERIOD);
    let (macd_line, signal_line) = macd(&closes, MACD_SPANS);

    let rows: Vec<FeatureRow> = prices
        .iter()
        .enumerate()
        .map(|(i, p)| FeatureRow {
            date: p.date,
            adjusted_close: p.adjusted_close,
            volume: p.volume as f64,
            daily_return: p.daily_return,
            sentiment: sentiment[i],
            sma10: sma10[i],
            rsi14: rsi_values[i],
            macd: macd_line[i],
            macd_signal: signal_line[i],
            return_lag1: lagged(&returns, i, 1),
            return_lag2: lagged(&returns, i, 2),
            return_lag3: lagged(&returns, i, MAX_LAG),
            sentiment_lag1: lagged(&sentiment, i, 1),
            sentiment_lag2: lagged(&sentiment, i, 2),
            sentiment_lag3: lagged(&sentiment, i, MAX_LAG),
        })
        .filter(|row| row.features().iter().all(|v| v.is_finite()) && row.sentiment.is_finite())
        .collect();

    match (rows.first(), rows.last()) {
        (Some(first), Some(last)) => info!(
            "Built {} feature rows ({} .. {}) from {} price points",
            rows.len(),
            first.date,
            last.date,
            prices.len()
        ),
        _ => info!("No complete feature rows from {} price points", prices.len()),
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn price_series(n: usize) -> Vec<PricePoint> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut prev = 1800.0;
        (0..n)
            .map(|i| {
                let close = 1800.0 + 20.0 * (i as f64 * 0.3).sin() + i as f64;
                let point = PricePoint {
                    date: start + Duration::days(i as i64),
                    adjusted_close: close,
                    volume: 1000 + i as u64,
                    daily_return: close / prev - 1.0,
                };
                prev = close;
                point
            })
            .collect()
    }

    #[test]
    fn test_missing_sentiment_is_zero() {
        let prices = price_series(5);
        let daily = vec![DailySentiment {
            date: prices[2].date,
            score: 0.4,
            headline_count: 3,
        }];
        let joined = join_sentiment(&prices, &daily);
        assert_eq!(joined, vec![0.0, 0.0, 0.4, 0.0, 0.0]);
    }

    #[test]
    fn test_no_undefined_values() {
        let prices = price_series(80);
        let rows = build_features(&prices, &[]);

        assert!(!rows.is_empty());
        for row in &rows {
            assert!(row.features().iter().all(|v| v.is_finite()));
            assert!(row.sentiment.is_finite());
        }
        // MACD signal warm-up is the longest: 26 + 9 - 2
        assert_eq!(rows.len(), 80 - 33);
        assert_eq!(rows[0].date, prices[33].date);
        assert!(rows.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn test_lags_follow_previous_rows() {
        let prices = price_series(60);
        let daily: Vec<DailySentiment> = prices
            .iter()
            .enumerate()
            .filter(|(i, _)| i % 2 == 0)
            .map(|(i, p)| DailySentiment {
                date: p.date,
                score: i as f64 / 100.0,
                headline_count: 1,
            })
            .collect();
        let rows = build_features(&prices, &daily);

        let row = &rows[0];
        let idx = prices.iter().position(|p| p.date == row.date).unwrap();
        assert_eq!(row.return_lag1, prices[idx - 1].daily_return);
        assert_eq!(row.return_lag3, prices[idx - 3].daily_return);

        let expected_lag1 = if (idx - 1) % 2 == 0 { (idx - 1) as f64 / 100.0 } else { 0.0 };
        assert_eq!(row.sentiment_lag1, expected_lag1);
    }

    #[test]
    fn test_short_series_yields_no_rows() {
        let prices = price_series(20);
        assert!(build_features(&prices, &[]).is_empty());
    }

    #[test]
    fn test_feature_vector_matches_names() {
        let rows = build_features(&price_series(50), &[]);
        let row = &rows[0];
        let values = row.features();
        assert_eq!(values.len(), FEATURE_NAMES.len());
        assert_eq!(values[6], row.sma10);
        assert_eq!(values[10], row.volume);
    }
}
