//! SVG file backend
//!
//! Each mount id maps to one `<mount>.svg` file in the output directory.
//! Releasing a chart deletes its file.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use super::registry::ChartHandle;
use super::renderer::{ChartBackend, RenderError};
use super::ChartSpec;

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 320.0;
const MARGIN: f64 = 40.0;

pub struct SvgBackend {
    dir: PathBuf,
}

impl SvgBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File a mount id is written to
    pub fn path_for(&self, mount_id: &str) -> PathBuf {
        let name: String = mount_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.svg", name))
    }
}

impl ChartBackend for SvgBackend {
    fn draw(&self, _handle: &ChartHandle, spec: &ChartSpec) -> Result<(), RenderError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&spec.mount_id);
        std::fs::write(&path, render_svg(spec))?;
        tracing::info!(path = %path.display(), "Chart written");
        Ok(())
    }

    fn release(&self, handle: &ChartHandle) {
        let path = self.path_for(&handle.mount_id);
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove chart file")
            }
        }
    }
}

/// Standalone SVG document for a chart
pub fn render_svg(spec: &ChartSpec) -> String {
    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = WIDTH,
        h = HEIGHT
    );
    let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="20" font-family="sans-serif" font-size="14">{}</text>"#,
        MARGIN,
        escape(&spec.title)
    );
    if let Some(stats) = &spec.stats {
        let _ = writeln!(
            svg,
            r##"<text x="{}" y="36" font-family="sans-serif" font-size="11" fill="#555">{}</text>"##,
            MARGIN,
            escape(&stats.to_string())
        );
    }

    let (lo, hi) = range(spec);
    let n = spec.len();
    let plot_w = WIDTH - 2.0 * MARGIN;
    let plot_h = HEIGHT - 3.0 * MARGIN;
    let x = |i: usize| {
        let offset = if n > 1 {
            i as f64 * plot_w / (n - 1) as f64
        } else {
            plot_w / 2.0
        };
        MARGIN + offset
    };
    let y = |v: f64| {
        let t = if hi > lo { (v - lo) / (hi - lo) } else { 0.5 };
        HEIGHT - MARGIN - t * plot_h
    };

    for dataset in &spec.datasets {
        let dash = if dataset.dashed { r#" stroke-dasharray="6 4""# } else { "" };
        for run in runs(&dataset.values) {
            let points: Vec<String> = run
                .iter()
                .map(|&(i, v)| format!("{:.1},{:.1}", x(i), y(v)))
                .collect();
            let _ = writeln!(
                svg,
                r#"<polyline fill="none" stroke="{}" stroke-width="2"{} points="{}"/>"#,
                escape(&dataset.color),
                dash,
                points.join(" ")
            );
        }
    }

    if let (Some(first), Some(last)) = (spec.labels.first(), spec.labels.last()) {
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" font-family="sans-serif" font-size="10">{}</text>"#,
            MARGIN,
            HEIGHT - 10.0,
            escape(first)
        );
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" font-family="sans-serif" font-size="10" text-anchor="end">{}</text>"#,
            WIDTH - MARGIN,
            HEIGHT - 10.0,
            escape(last)
        );
    }

    svg.push_str("</svg>\n");
    svg
}

fn range(spec: &ChartSpec) -> (f64, f64) {
    spec.datasets
        .iter()
        .flat_map(|d| d.values.iter().flatten().copied())
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            None => Some((v, v)),
        })
        .unwrap_or((0.0, 0.0))
}

/// Contiguous non-null stretches of a series, with their x indices
fn runs(values: &[Option<f64>]) -> Vec<Vec<(usize, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for (i, v) in values.iter().enumerate() {
        match v {
            Some(v) => current.push((i, *v)),
            None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartRenderer;
    use crate::sensors::SensorType;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn test_runs_split_on_gaps() {
        let runs = runs(&[Some(1.0), None, None, Some(2.0), Some(3.0)]);
        assert_eq!(runs, vec![vec![(0, 1.0)], vec![(3, 2.0), (4, 3.0)]]);
    }

    #[test]
    fn test_path_is_sanitized() {
        let backend = SvgBackend::new("/tmp/charts");
        assert_eq!(
            backend.path_for("pred-aire-0"),
            PathBuf::from("/tmp/charts/pred-aire-0.svg")
        );
        assert_eq!(
            backend.path_for("../x y"),
            PathBuf::from("/tmp/charts/___x_y.svg")
        );
    }

    #[tokio::test]
    async fn test_file_lifecycle() {
        let dir = tempdir().unwrap();
        let backend = Arc::new(SvgBackend::new(dir.path()));
        let renderer = ChartRenderer::new(backend.clone());
        let field = SensorType::Sonido.field("object.LAeq").unwrap();
        let readings: Vec<crate::reading::SensorReading> =
            serde_json::from_value(crate::testing::readings_json("LAeq", &[50.0, 61.5])).unwrap();

        renderer
            .render_series("sonido-laeq-chart", &readings, field)
            .await
            .unwrap();

        let path = backend.path_for("sonido-laeq-chart");
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("LAeq (dB) - Últimas lecturas"));
        assert!(svg.contains("#f59e0b"));

        renderer.release_all().await;
        assert!(!path.exists());
    }

    #[test]
    fn test_dashed_dataset() {
        let mut spec = ChartSpec {
            mount_id: "m".to_string(),
            title: "a < b".to_string(),
            labels: vec!["1".into(), "2".into()],
            datasets: vec![],
            stats: None,
        };
        spec.datasets.push(crate::chart::Dataset {
            label: "Predicción ML".into(),
            color: "#f59e0b".into(),
            values: vec![Some(1.0), Some(2.0)],
            dashed: true,
            filled: false,
        });

        let svg = render_svg(&spec);
        assert!(svg.contains(r#"stroke-dasharray="6 4""#));
        assert!(svg.contains("a &lt; b"));
    }
}
