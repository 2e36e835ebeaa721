//! Series shaping
//!
//! Turns readings and forecasts into the label/value vectors a chart needs.
//! Nothing here touches a renderer.

use serde_json::Value;

use crate::reading::{parse_timestamp, SensorReading};

/// Numeric value at `path`; missing, null or non-numeric values count as 0
pub fn extract_value(reading: &SensorReading, path: &str) -> f64 {
    reading.lookup(path).map(coerce).unwrap_or(0.0)
}

/// Numbers and numeric strings parse; everything else (and non-finite) is 0
pub fn coerce(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}

pub fn extract_series(readings: &[SensorReading], path: &str) -> Vec<f64> {
    readings.iter().map(|r| extract_value(r, path)).collect()
}

/// Point labels for a single series: `HH:MM` when the reading carries a
/// timestamp, otherwise the 1-based position.
pub fn series_labels(readings: &[SensorReading]) -> Vec<String> {
    readings
        .iter()
        .enumerate()
        .map(|(i, r)| match r.timestamp() {
            Some(ts) => ts.format("%H:%M").to_string(),
            None => (i + 1).to_string(),
        })
        .collect()
}

/// Labels for the historical half of a comparison chart: `DD Mon`, or `H-i`
pub fn history_labels(readings: &[SensorReading]) -> Vec<String> {
    readings
        .iter()
        .enumerate()
        .map(|(i, r)| match r.timestamp() {
            Some(ts) => ts.format("%d %b").to_string(),
            None => format!("H-{}", i),
        })
        .collect()
}

/// Labels for the forecast half, exactly `count` of them.
///
/// Unparseable timestamps are shown verbatim; missing ones become `P-i`.
pub fn forecast_labels(timestamps: &[String], count: usize) -> Vec<String> {
    (0..count)
        .map(|i| match timestamps.get(i) {
            Some(raw) => parse_timestamp(raw)
                .map(|ts| ts.format("%d %b").to_string())
                .unwrap_or_else(|| raw.clone()),
            None => format!("P-{}", i + 1),
        })
        .collect()
}

/// Place historical and predicted values on one shared axis.
///
/// Both returned series have length `historical.len() + prediction.len()`:
/// the historical series is followed by nulls, the prediction series is
/// preceded by nulls, so the two never overlap.
pub fn align_comparison(
    historical: &[f64],
    prediction: &[Option<f64>],
) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let total = historical.len() + prediction.len();

    let mut hist = Vec::with_capacity(total);
    hist.extend(historical.iter().copied().map(Some));
    hist.resize(total, None);

    let mut pred = vec![None; historical.len()];
    pred.extend_from_slice(prediction);

    (hist, pred)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reading(value: Value) -> SensorReading {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_coercion() {
        assert_eq!(coerce(&json!(3.5)), 3.5);
        assert_eq!(coerce(&json!(-2)), -2.0);
        assert_eq!(coerce(&json!(" 41.2 ")), 41.2);
        assert_eq!(coerce(&json!("n/a")), 0.0);
        assert_eq!(coerce(&json!("NaN")), 0.0);
        assert_eq!(coerce(&json!(null)), 0.0);
        assert_eq!(coerce(&json!(true)), 0.0);
        assert_eq!(coerce(&json!({"v": 1})), 0.0);
    }

    #[test]
    fn test_extract_missing_field_is_zero() {
        let readings = vec![
            reading(json!({"object": {"co2": 400}})),
            reading(json!({"object": {}})),
            reading(json!({"object": {"co2": "420.5"}})),
        ];
        assert_eq!(extract_series(&readings, "object.co2"), vec![400.0, 0.0, 420.5]);
    }

    #[test]
    fn test_series_labels() {
        let readings = vec![
            reading(json!({"time": "2024-03-01T08:05:00Z", "object": {}})),
            reading(json!({"object": {}})),
        ];
        assert_eq!(series_labels(&readings), vec!["08:05", "2"]);
        assert_eq!(history_labels(&readings), vec!["01 Mar", "H-1"]);
    }

    #[test]
    fn test_forecast_labels_match_count() {
        let ts = vec!["2024-03-02 00:00:00".to_string(), "mañana".to_string()];
        assert_eq!(forecast_labels(&ts, 3), vec!["02 Mar", "mañana", "P-3"]);
        assert_eq!(forecast_labels(&ts, 1).len(), 1);
    }

    #[test]
    fn test_alignment() {
        let (hist, pred) = align_comparison(&[1.0, 2.0, 3.0], &[Some(4.0), None]);

        assert_eq!(hist.len(), 5);
        assert_eq!(pred.len(), 5);
        assert_eq!(hist, vec![Some(1.0), Some(2.0), Some(3.0), None, None]);
        assert_eq!(pred, vec![None, None, None, Some(4.0), None]);

        for (h, p) in hist.iter().zip(&pred).take(3) {
            assert!(h.is_some() && p.is_none());
        }
    }

    #[test]
    fn test_alignment_empty_sides() {
        let (hist, pred) = align_comparison(&[], &[Some(1.0)]);
        assert_eq!(hist, vec![None]);
        assert_eq!(pred, vec![Some(1.0)]);

        let (hist, pred) = align_comparison(&[7.0], &[]);
        assert_eq!(hist, vec![Some(7.0)]);
        assert_eq!(pred, vec![None]);
    }
}
