//! Line chart of held-out actual vs predicted prices.

use std::fs;
use std::path::Path;

use plotters::prelude::*;

use crate::error::{PipelineError, Result};
use crate::evaluation::PredictionRecord;

fn plot_error<E: std::fmt::Display>(e: E) -> PipelineError {
    PipelineError::Output(format!("chart: {}", e))
}

/// Price range of the chart with a small margin. A flat series is widened
/// so the axis is never empty.
pub fn value_range(records: &[PredictionRecord]) -> (f64, f64) {
    let values = records.iter().flat_map(|r| [r.actual, r.predicted]);
    let min = values.clone().fold(f64::INFINITY, f64::min);
    let max = values.fold(f64::NEG_INFINITY, f64::max);

    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    let pad = if max > min { (max - min) * 0.05 } else { min.abs().max(1.0) * 0.01 };
    (min - pad, max + pad)
}

/// Draw actual and predicted prices over the held-out dates as a PNG.
pub fn plot_predictions<P: AsRef<Path>>(records: &[PredictionRecord], output_path: P) -> Result<()> {
    if records.is_empty() {
        return Err(PipelineError::Output("no predictions to plot".into()));
    }
    let output_path = output_path.as_ref();
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let root = BitMapBackend::new(output_path, (1280, 720)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    let (y_min, y_max) = value_range(records);
    let n = records.len();

    let mut chart = ChartBuilder::on(&root)
        .caption("Gold price: actual vs predicted", ("sans-serif", 30).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(0usize..n.max(2) - 1, y_min..y_max)
        .map_err(plot_error)?;

    chart
        .configure_mesh()
        .x_labels(n.min(10))
        .x_label_formatter(&|i| {
            records
                .get(*i)
                .map(|r| r.date.format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        })
        .y_desc("Price")
        .draw()
        .map_err(plot_error)?;

    chart
        .draw_series(LineSeries::new(
            records.iter().enumerate().map(|(i, r)| (i, r.actual)),
            &BLUE,
        ))
        .map_err(plot_error)?
        .label("Actual")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));

    chart
        .draw_series(LineSeries::new(
            records.iter().enumerate().map(|(i, r)| (i, r.predicted)),
            &RED,
        ))
        .map_err(plot_error)?
        .label("Predicted")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(plot_error)?;

    root.present().map_err(plot_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(day: u32, actual: f64, predicted: f64) -> PredictionRecord {
        PredictionRecord {
            date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            actual,
            predicted,
        }
    }

    #[test]
    fn test_value_range_pads_both_series() {
        let records = vec![record(1, 2000.0, 1990.0), record(2, 2010.0, 2040.0)];
        let (lo, hi) = value_range(&records);
        assert!(lo < 1990.0);
        assert!(hi > 2040.0);
    }

    #[test]
    fn test_value_range_flat_series() {
        let records = vec![record(1, 2000.0, 2000.0)];
        let (lo, hi) = value_range(&records);
        assert!(lo < 2000.0 && hi > 2000.0);
        assert_eq!(value_range(&[]), (0.0, 1.0));
    }

    #[test]
    fn test_empty_predictions_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = plot_predictions(&[], dir.path().join("chart.png")).unwrap_err();
        assert!(matches!(err, PipelineError::Output(_)));
    }
}
