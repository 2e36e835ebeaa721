//! Chart Renderer
//!
//! Owns the chart registry. Rendering into a mount that already holds a
//! chart releases the old one first, so re-renders never leak backend
//! resources.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use super::registry::{ChartHandle, ChartRegistry};
use super::ChartSpec;
use crate::api::PredictionResult;
use crate::reading::SensorReading;
use crate::sensors::FieldConfig;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Something that can put a chart on screen (or on disk)
pub trait ChartBackend: Send + Sync {
    /// Draw `spec`; `handle` identifies the resources to release later
    fn draw(&self, handle: &ChartHandle, spec: &ChartSpec) -> Result<(), RenderError>;

    /// Free whatever `draw` allocated for `handle`
    fn release(&self, handle: &ChartHandle);
}

pub struct ChartRenderer {
    backend: Arc<dyn ChartBackend>,
    registry: Mutex<ChartRegistry>,
}

impl ChartRenderer {
    pub fn new(backend: Arc<dyn ChartBackend>) -> Self {
        Self {
            backend,
            registry: Mutex::new(ChartRegistry::new()),
        }
    }

    /// Create or replace the chart at `spec.mount_id`
    pub async fn render(&self, spec: &ChartSpec) -> Result<ChartHandle, RenderError> {
        let mut registry = self.registry.lock().await;

        if let Some(old) = registry.remove(&spec.mount_id) {
            debug!(mount = %old.mount_id, id = %old.id, "Releasing replaced chart");
            self.backend.release(&old);
        }

        let handle = ChartHandle::new(&spec.mount_id);
        self.backend.draw(&handle, spec)?;
        registry.insert(handle.clone());

        debug!(mount = %handle.mount_id, id = %handle.id, points = spec.len(), "Chart rendered");
        Ok(handle)
    }

    /// Line chart of one field over `readings` (oldest first)
    pub async fn render_series(
        &self,
        mount_id: &str,
        readings: &[SensorReading],
        field: &FieldConfig,
    ) -> Result<ChartHandle, RenderError> {
        self.render(&ChartSpec::series(mount_id, readings, field))
            .await
    }

    /// Historical readings followed by the forecast for one field
    pub async fn render_comparison(
        &self,
        mount_id: &str,
        historical: &[SensorReading],
        prediction: &PredictionResult,
        field: &FieldConfig,
    ) -> Result<ChartHandle, RenderError> {
        self.render(&ChartSpec::comparison(mount_id, historical, prediction, field))
            .await
    }

    /// Release the chart at one mount, if any
    pub async fn release(&self, mount_id: &str) -> bool {
        let removed = self.registry.lock().await.remove(mount_id);
        match removed {
            Some(handle) => {
                self.backend.release(&handle);
                true
            }
            None => false,
        }
    }

    /// Release every live chart
    pub async fn release_all(&self) -> usize {
        let handles = self.registry.lock().await.drain();
        for handle in &handles {
            self.backend.release(handle);
        }
        if !handles.is_empty() {
            debug!(count = handles.len(), "Released all charts");
        }
        handles.len()
    }

    pub async fn live_count(&self) -> usize {
        self.registry.lock().await.len()
    }

    pub async fn handle(&self, mount_id: &str) -> Option<ChartHandle> {
        self.registry.lock().await.get(mount_id).cloned()
    }

    pub async fn mounts(&self) -> Vec<String> {
        self.registry.lock().await.mounts()
    }
}

impl std::fmt::Debug for ChartRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChartRenderer").finish_non_exhaustive()
    }
}
