//! Descriptive statistics shown in chart overlays

use serde::Serialize;

/// Mean, extremes and population standard deviation of a series
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SummaryStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Population standard deviation (divides by N)
    pub std: f64,
    /// Number of finite values the figures were computed over
    pub count: usize,
}

impl SummaryStats {
    /// Compute over the finite values; no finite values gives all zeros.
    pub fn compute<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let valid: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
        if valid.is_empty() {
            return Self::default();
        }

        let n = valid.len() as f64;
        let min = valid.iter().copied().fold(f64::INFINITY, f64::min);
        let max = valid.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        // Summation rounding can push the mean just past an extreme.
        let mean = (valid.iter().sum::<f64>() / n).clamp(min, max);
        let variance = valid.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        Self {
            mean,
            min,
            max,
            std: variance.sqrt(),
            count: valid.len(),
        }
    }

    /// Compute over a nullable series, skipping the gaps
    pub fn from_optional(values: &[Option<f64>]) -> Self {
        Self::compute(values.iter().flatten().copied())
    }

    /// Copy with every figure rounded to 2 decimals, for display
    pub fn rounded(&self) -> Self {
        Self {
            mean: round2(self.mean),
            min: round2(self.min),
            max: round2(self.max),
            std: round2(self.std),
            count: self.count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl std::fmt::Display for SummaryStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Promedio: {:.2} | Min: {:.2} | Max: {:.2} | Desv. Est.: {:.2}",
            self.mean, self.min, self.max, self.std
        )
    }
}

/// Round to 2 decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
