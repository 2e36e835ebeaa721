//! Sensor readings
//!
//! A reading is whatever document the platform stored for one uplink: a
//! `time`, an `object` with the decoded measurements, and assorted metadata
//! (`_id`, `deviceInfo`, `processed_at`, ...). Only `time` and `object` are
//! interpreted; the rest is kept so field paths can reach it.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One stored sensor document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SensorReading {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,

    #[serde(default)]
    pub object: Map<String, Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SensorReading {
    /// Resolve a field path against this reading.
    ///
    /// A top-level key matching the whole path wins (some documents store
    /// flattened `"object.co2"` keys); otherwise the path is walked segment
    /// by segment.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        if let Some(v) = self.extra.get(path) {
            return Some(v);
        }

        let mut segments = path.split('.');
        let first = segments.next()?;
        let rest: Vec<&str> = segments.collect();

        if first == "object" {
            let (head, tail) = rest.split_first()?;
            if let Some(v) = self.object.get(rest.join(".").as_str()) {
                return Some(v);
            }
            return walk(self.object.get(*head)?, tail);
        }

        walk(self.extra.get(first)?, &rest)
    }

    /// Parsed timestamp, if `time` holds one of the formats the platform emits
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.time.as_deref().and_then(parse_timestamp)
    }
}

fn walk<'a>(mut value: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    for segment in segments {
        value = value.as_object()?.get(*segment)?;
    }
    Some(value)
}

/// Parse RFC 3339 or the naive `YYYY-MM-DD[T ]HH:MM:SS[.fff]` forms (taken as UTC)
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}
