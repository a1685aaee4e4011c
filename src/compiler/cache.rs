use crate::error::ConfigError;
use crate::flow::StateMachineConfig;
use ahash::AHashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

struct CacheEntry {
    version: u32,
    config: Arc<StateMachineConfig>,
}

/// Compiled configurations keyed by flow id and field-list version.
///
/// A lookup for a version other than the cached one recompiles and replaces
/// the entry, so an edited field list never serves a stale machine. Entries
/// are shared as `Arc`s; a session holding one keeps working even after the
/// entry is replaced.
#[derive(Default)]
pub struct ConfigCache {
    entries: RwLock<AHashMap<String, CacheEntry>>,
}

impl ConfigCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached configuration for `flow_id` if it was built from `version`.
    pub fn get(&self, flow_id: &str, version: u32) -> Option<Arc<StateMachineConfig>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(flow_id)
            .filter(|entry| entry.version == version)
            .map(|entry| Arc::clone(&entry.config))
    }

    /// Returns the cached configuration, or compiles and caches a new one.
    pub fn get_or_compile<F>(
        &self,
        flow_id: &str,
        version: u32,
        compile: F,
    ) -> Result<Arc<StateMachineConfig>, ConfigError>
    where
        F: FnOnce() -> Result<StateMachineConfig, ConfigError>,
    {
        if let Some(config) = self.get(flow_id, version) {
            return Ok(config);
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have compiled while we waited for the write lock.
        if let Some(entry) = entries.get(flow_id).filter(|e| e.version == version) {
            return Ok(Arc::clone(&entry.config));
        }

        info!(flow_id, version, "Compiling configuration for cache");
        let config = Arc::new(compile()?);
        entries.insert(
            flow_id.to_string(),
            CacheEntry {
                version,
                config: Arc::clone(&config),
            },
        );
        Ok(config)
    }

    pub fn invalidate(&self, flow_id: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(flow_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
