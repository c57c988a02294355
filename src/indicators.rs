//! Technical indicators over a close-price series.
//!
//! Every function returns a vector aligned with its input; positions without
//! enough history hold `NaN`.

/// Fast, slow and signal spans of the MACD used by the feature table.
pub const MACD_SPANS: (usize, usize, usize) = (12, 26, 9);

fn padded(len: usize, warmup: usize, tail: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut out = Vec::with_capacity(len);
    out.extend(std::iter::repeat_n(f64::NAN, warmup));
    out.extend(tail);
    out
}

/// Trailing mean over `window` closes.
pub fn sma(closes: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || window > closes.len() {
        return vec![f64::NAN; closes.len()];
    }
    let means = closes
        .windows(window)
        .map(|w| w.iter().sum::<f64>() / window as f64);
    padded(closes.len(), window - 1, means)
}

/// Exponential average with smoothing `2 / (span + 1)`, seeded by the mean
/// of the first `span` values.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    if span == 0 || span > values.len() {
        return vec![f64::NAN; values.len()];
    }
    let k = 2.0 / (span as f64 + 1.0);
    let seed = values[..span].iter().sum::<f64>() / span as f64;
    let smoothed = std::iter::once(seed).chain(values[span..].iter().scan(seed, |prev, &v| {
        *prev += k * (v - *prev);
        Some(*prev)
    }));
    padded(values.len(), span - 1, smoothed)
}

/// Relative Strength Index with Wilder smoothing, on the 0..100 scale.
///
/// The first `period` changes seed the average gain and loss, so the first
/// defined value sits at index `period`.
pub fn rsi(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.len() <= period {
        return vec![f64::NAN; closes.len()];
    }

    let changes: Vec<(f64, f64)> = closes
        .windows(2)
        .map(|w| {
            let d = w[1] - w[0];
            (d.max(0.0), (-d).max(0.0))
        })
        .collect();

    let n = period as f64;
    let (mut gain, mut loss) = changes[..period]
        .iter()
        .fold((0.0, 0.0), |(g, l), &(up, down)| (g + up / n, l + down / n));

    let mut out = vec![f64::NAN; period];
    out.push(rsi_from_averages(gain, loss));
    for &(up, down) in &changes[period..] {
        gain = (gain * (n - 1.0) + up) / n;
        loss = (loss * (n - 1.0) + down) / n;
        out.push(rsi_from_averages(gain, loss));
    }
    out
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain < 1e-10 && avg_loss < 1e-10 {
        // no movement at all
        50.0
    } else if avg_loss < 1e-10 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

/// MACD line (fast EMA minus slow EMA) and its signal line, the EMA of the
/// defined part of the MACD line.
pub fn macd(closes: &[f64], (fast, slow, signal): (usize, usize, usize)) -> (Vec<f64>, Vec<f64>) {
    let line: Vec<f64> = ema(closes, fast)
        .into_iter()
        .zip(ema(closes, slow))
        .map(|(f, s)| f - s)
        .collect();

    let signal_line = match line.iter().position(|v| !v.is_nan()) {
        Some(start) => padded(closes.len(), start, ema(&line[start..], signal).into_iter()),
        None => vec![f64::NAN; closes.len()],
    };
    (line, signal_line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma() {
        let sma3 = sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);

        assert_eq!(sma3.len(), 5);
        assert!(sma3[0].is_nan());
        assert!(sma3[1].is_nan());
        assert!((sma3[2] - 2.0).abs() < 1e-10);
        assert!((sma3[3] - 3.0).abs() < 1e-10);
        assert!((sma3[4] - 4.0).abs() < 1e-10);
    }

    #[test]
    fn test_sma_short_input() {
        let short = sma(&[1.0, 2.0], 3);
        assert_eq!(short.len(), 2);
        assert!(short.iter().all(|v| v.is_nan()));
        assert!(sma(&[1.0, 2.0], 0)[0].is_nan());
    }

    #[test]
    fn test_ema_seed_is_mean() {
        let values = ema(&[2.0, 4.0, 6.0, 8.0], 3);
        assert!(values[1].is_nan());
        assert!((values[2] - 4.0).abs() < 1e-10);
        // k = 0.5: 4 + 0.5 * (8 - 4)
        assert!((values[3] - 6.0).abs() < 1e-10);
    }

    #[test]
    fn test_rsi_uptrend_and_downtrend() {
        let up: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let down: Vec<f64> = up.iter().rev().copied().collect();

        let rsi_up = rsi(&up, 14);
        let rsi_down = rsi(&down, 14);

        assert!(rsi_up[13].is_nan());
        assert!(!rsi_up[14].is_nan());
        assert!(rsi_up[14..].iter().all(|&v| (v - 100.0).abs() < 1e-9));
        assert!(rsi_down[14..].iter().all(|&v| v.abs() < 1e-9));
    }

    #[test]
    fn test_rsi_flat_is_neutral() {
        let flat = vec![1800.0; 30];
        let values = rsi(&flat, 14);
        assert!(values[14..].iter().all(|&v| (v - 50.0).abs() < 1e-9));
    }

    #[test]
    fn test_rsi_bounded() {
        let prices: Vec<f64> = (0..60)
            .map(|i| 1900.0 + 25.0 * (i as f64 * 0.7).sin())
            .collect();
        for v in rsi(&prices, 14).into_iter().filter(|v| !v.is_nan()) {
            assert!((0.0..=100.0).contains(&v));
        }
    }

    #[test]
    fn test_macd_warmup() {
        let closes: Vec<f64> = (1..=30).map(|i| i as f64).collect();
        let (line, signal) = macd(&closes, (3, 5, 3));

        assert_eq!(line.len(), 30);
        assert_eq!(signal.len(), 30);
        assert!(line[3].is_nan());
        assert!(!line[4].is_nan());
        assert!(signal[5].is_nan());
        assert!(!signal[6].is_nan());
    }

    #[test]
    fn test_macd_feature_spans_need_33_closes() {
        let closes: Vec<f64> = (0..40).map(|i| 1800.0 + i as f64).collect();
        let (line, signal) = macd(&closes, MACD_SPANS);
        assert!(line[24].is_nan());
        assert!(!line[25].is_nan());
        assert!(signal[32].is_nan());
        assert!(!signal[33].is_nan());
    }

    #[test]
    fn test_macd_of_linear_trend_is_constant() {
        // both EMAs lag a straight line by a fixed amount once seeded
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + 2.0 * i as f64).collect();
        let (line, _) = macd(&closes, MACD_SPANS);
        let tail = &line[25..];
        assert!(tail.iter().all(|v| (v - tail[0]).abs() < 1e-9));
        assert!(tail[0] > 0.0);
    }
}
