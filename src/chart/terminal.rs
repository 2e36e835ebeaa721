//! Sparkline backend for terminal output

use std::io::Write;
use std::sync::Mutex;

use super::registry::ChartHandle;
use super::renderer::{ChartBackend, RenderError};
use super::ChartSpec;

const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

pub struct TerminalBackend {
    out: Mutex<Box<dyn Write + Send>>,
    width: usize,
}

impl TerminalBackend {
    pub fn stdout(width: usize) -> Self {
        Self::with_writer(Box::new(std::io::stdout()), width)
    }

    pub fn with_writer(out: Box<dyn Write + Send>, width: usize) -> Self {
        Self {
            out: Mutex::new(out),
            width: width.max(1),
        }
    }
}

impl ChartBackend for TerminalBackend {
    fn draw(&self, _handle: &ChartHandle, spec: &ChartSpec) -> Result<(), RenderError> {
        let text = render_text(spec, self.width);
        let mut out = self
            .out
            .lock()
            .map_err(|_| std::io::Error::other("terminal writer poisoned"))?;
        out.write_all(text.as_bytes())?;
        out.flush()?;
        Ok(())
    }

    fn release(&self, handle: &ChartHandle) {
        // Printed output cannot be taken back; nothing else is held.
        tracing::trace!(mount = %handle.mount_id, "Terminal chart released");
    }
}

/// Text rendering of a chart: title, stats overlay, one sparkline per
/// dataset and the first/last x labels.
pub fn render_text(spec: &ChartSpec, width: usize) -> String {
    let mut text = format!("── {} ──\n", spec.title);

    if let Some(stats) = &spec.stats {
        text.push_str(&format!("   {}\n", stats));
    }

    if spec.is_empty() {
        text.push_str("   (sin datos)\n");
        return text;
    }

    let columns = width.clamp(1, spec.len());
    let (lo, hi) = value_range(spec);

    for dataset in &spec.datasets {
        let marker = if dataset.dashed { '┄' } else { '━' };
        let line: String = resample(&dataset.values, columns)
            .into_iter()
            .map(|v| v.map_or(' ', |v| bar(v, lo, hi)))
            .collect();
        text.push_str(&format!(" {} {:<18} │{}│\n", marker, dataset.label, line));
    }

    let first = spec.labels.first().map(String::as_str).unwrap_or("");
    let last = spec.labels.last().map(String::as_str).unwrap_or("");
    let gap = columns.saturating_sub(first.chars().count() + last.chars().count());
    text.push_str(&format!(
        "   {:<18}  {}{}{}   [{:.2} .. {:.2}]\n",
        "",
        first,
        " ".repeat(gap),
        if spec.len() > 1 { last } else { "" },
        lo,
        hi
    ));

    text
}

fn value_range(spec: &ChartSpec) -> (f64, f64) {
    let mut values = spec
        .datasets
        .iter()
        .flat_map(|d| d.values.iter().flatten().copied())
        .filter(|v| v.is_finite())
        .peekable();

    if values.peek().is_none() {
        return (0.0, 0.0);
    }
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

fn bar(value: f64, lo: f64, hi: f64) -> char {
    if hi <= lo {
        return BARS[BARS.len() / 2];
    }
    let scaled = ((value - lo) / (hi - lo) * (BARS.len() - 1) as f64).round();
    BARS[(scaled.max(0.0) as usize).min(BARS.len() - 1)]
}

/// Average `values` into `columns` buckets; a bucket with no values is a gap
fn resample(values: &[Option<f64>], columns: usize) -> Vec<Option<f64>> {
    let n = values.len();
    if n == 0 || columns == 0 {
        return Vec::new();
    }

    (0..columns)
        .map(|c| {
            let start = c * n / columns;
            let end = ((c + 1) * n / columns).max(start + 1).min(n);
            let bucket: Vec<f64> = values[start..end].iter().flatten().copied().collect();
            if bucket.is_empty() {
                None
            } else {
                Some(bucket.iter().sum::<f64>() / bucket.len() as f64)
            }
        })
        .collect()
}
