//! Sensor catalogue
//!
//! The platform knows three sensor families. Each one tracks a fixed set of
//! fields, and each field has a chart label and color.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Sensor family, as used in API paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorType {
    /// Air quality: CO2, temperature, humidity, pressure
    Aire,
    /// Sound level
    Sonido,
    /// Buried liquid-level sensor (distance)
    Soterrado,
}

/// One chartable field of a sensor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldConfig {
    /// Dotted path into a reading, e.g. `object.co2`
    pub path: &'static str,
    pub label: &'static str,
    pub color: &'static str,
}

const AIRE_FIELDS: &[FieldConfig] = &[
    FieldConfig { path: "object.co2", label: "CO2 (ppm)", color: "#3b82f6" },
    FieldConfig { path: "object.temperature", label: "Temperatura (°C)", color: "#ef4444" },
    FieldConfig { path: "object.humidity", label: "Humedad (%)", color: "#10b981" },
    FieldConfig { path: "object.pressure", label: "Presión (hPa)", color: "#8b5cf6" },
];

const SONIDO_FIELDS: &[FieldConfig] = &[
    FieldConfig { path: "object.LAeq", label: "LAeq (dB)", color: "#f59e0b" },
    FieldConfig { path: "object.LAI", label: "LAI (dB)", color: "#06b6d4" },
    FieldConfig { path: "object.LAImax", label: "LAImax (dB)", color: "#ec4899" },
];

const SOTERRADO_FIELDS: &[FieldConfig] = &[
    FieldConfig { path: "object.distance", label: "Distancia (cm)", color: "#6366f1" },
];

impl SensorType {
    pub fn all() -> &'static [SensorType] {
        &[SensorType::Aire, SensorType::Sonido, SensorType::Soterrado]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SensorType::Aire => "aire",
            SensorType::Sonido => "sonido",
            SensorType::Soterrado => "soterrado",
        }
    }

    /// Fields charted on the sensor tab and in predictions
    pub fn fields(&self) -> &'static [FieldConfig] {
        match self {
            SensorType::Aire => AIRE_FIELDS,
            SensorType::Sonido => SONIDO_FIELDS,
            SensorType::Soterrado => SOTERRADO_FIELDS,
        }
    }

    /// Look up a field config by path
    pub fn field(&self, path: &str) -> Option<&'static FieldConfig> {
        self.fields().iter().find(|f| f.path == path)
    }

    /// Mount id of the sensor-tab chart for a field
    pub fn chart_mount(&self, field: &FieldConfig) -> String {
        let short = field.path.rsplit('.').next().unwrap_or(field.path);
        format!("{}-{}-chart", self.as_str(), short.to_lowercase())
    }
}

impl std::fmt::Display for SensorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown sensor name
#[derive(Debug, thiserror::Error)]
#[error("Unknown sensor type '{0}' (expected aire, sonido or soterrado)")]
pub struct UnknownSensor(pub String);

impl FromStr for SensorType {
    type Err = UnknownSensor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "aire" => Ok(SensorType::Aire),
            "sonido" => Ok(SensorType::Sonido),
            "soterrado" => Ok(SensorType::Soterrado),
            _ => Err(UnknownSensor(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("aire".parse::<SensorType>().unwrap(), SensorType::Aire);
        assert_eq!(" Sonido ".parse::<SensorType>().unwrap(), SensorType::Sonido);
        assert!("agua".parse::<SensorType>().is_err());
    }

    #[test]
    fn test_fields() {
        assert_eq!(SensorType::Aire.fields().len(), 4);
        assert_eq!(SensorType::Sonido.fields().len(), 3);
        assert_eq!(SensorType::Soterrado.fields()[0].path, "object.distance");
        assert_eq!(SensorType::Sonido.field("object.LAI").unwrap().label, "LAI (dB)");
    }

    #[test]
    fn test_chart_mounts_are_unique() {
        let mut mounts: Vec<String> = SensorType::all()
            .iter()
            .flat_map(|s| s.fields().iter().map(move |f| s.chart_mount(f)))
            .collect();
        let total = mounts.len();
        mounts.sort();
        mounts.dedup();
        assert_eq!(mounts.len(), total);
        assert_eq!(SensorType::Aire.chart_mount(&AIRE_FIELDS[0]), "aire-co2-chart");
    }
}
