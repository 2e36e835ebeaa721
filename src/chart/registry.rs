//! Live chart bookkeeping, keyed by mount id

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// A drawn chart that still holds backend resources
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartHandle {
    pub id: Uuid,
    pub mount_id: String,
    pub created_at: DateTime<Utc>,
}

impl ChartHandle {
    pub fn new(mount_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            mount_id: mount_id.into(),
            created_at: Utc::now(),
        }
    }
}

/// At most one handle per mount id
#[derive(Debug, Default)]
pub struct ChartRegistry {
    handles: HashMap<String, ChartHandle>,
}

impl ChartRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle, returning the one it displaced
    pub fn insert(&mut self, handle: ChartHandle) -> Option<ChartHandle> {
        self.handles.insert(handle.mount_id.clone(), handle)
    }

    pub fn get(&self, mount_id: &str) -> Option<&ChartHandle> {
        self.handles.get(mount_id)
    }

    pub fn remove(&mut self, mount_id: &str) -> Option<ChartHandle> {
        self.handles.remove(mount_id)
    }

    /// Take every handle out of the registry
    pub fn drain(&mut self) -> Vec<ChartHandle> {
        self.handles.drain().map(|(_, h)| h).collect()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Mount ids with a live chart, sorted
    pub fn mounts(&self) -> Vec<String> {
        let mut mounts: Vec<String> = self.handles.keys().cloned().collect();
        mounts.sort();
        mounts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_displaces_same_mount() {
        let mut registry = ChartRegistry::new();
        let first = ChartHandle::new("aire-co2-chart");
        let second = ChartHandle::new("aire-co2-chart");

        assert!(registry.insert(first.clone()).is_none());
        assert_eq!(registry.insert(second.clone()), Some(first));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("aire-co2-chart"), Some(&second));
    }

    #[test]
    fn test_drain() {
        let mut registry = ChartRegistry::new();
        registry.insert(ChartHandle::new("b"));
        registry.insert(ChartHandle::new("a"));
        assert_eq!(registry.mounts(), vec!["a", "b"]);

        assert_eq!(registry.drain().len(), 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_handle_serializes_with_string_id() {
        let handle = ChartHandle::new("pred-aire-0");
        let json = serde_json::to_value(&handle).unwrap();

        assert_eq!(json["id"], handle.id.to_string());
        assert_eq!(json["mount_id"], "pred-aire-0");
        assert!(json["created_at"].is_string());
    }
}
