//! CSV export of sensor readings
//!
//! One row per reading: `time` followed by every `object.*` field seen in
//! any of the readings, in sorted order. Missing and null values are left
//! empty.

use serde_json::Value;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

use crate::reading::SensorReading;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("No readings to export")]
    Empty,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Header row for `readings`
pub fn columns(readings: &[SensorReading]) -> Vec<String> {
    let fields: BTreeSet<&String> = readings.iter().flat_map(|r| r.object.keys()).collect();

    std::iter::once("time".to_string())
        .chain(fields.into_iter().map(|f| format!("object.{}", f)))
        .collect()
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Write `readings` as CSV, returning the number of data rows
pub fn write_csv<W: Write>(readings: &[SensorReading], writer: W) -> Result<usize, ExportError> {
    if readings.is_empty() {
        return Err(ExportError::Empty);
    }

    let header = columns(readings);
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(&header)?;

    for reading in readings {
        let row: Vec<String> = header
            .iter()
            .map(|column| match column.as_str() {
                "time" => reading.time.clone().unwrap_or_default(),
                path => cell(reading.lookup(path)),
            })
            .collect();
        csv.write_record(&row)?;
    }

    csv.flush()?;
    Ok(readings.len())
}

/// Write `readings` to a CSV file at `path`
pub fn export_to_path(readings: &[SensorReading], path: &Path) -> Result<usize, ExportError> {
    if readings.is_empty() {
        return Err(ExportError::Empty);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::File::create(path)?;
    let rows = write_csv(readings, file)?;
    tracing::info!(path = %path.display(), rows, "Readings exported");
    Ok(rows)
}
