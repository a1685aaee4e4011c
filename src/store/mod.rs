//! In-process and file-backed implementations of the collaborator traits.

use crate::advice::AdviceItem;
use crate::backend::{AdviceSource, SessionStore};
use crate::error::StoreError;
use crate::session::SessionState;
use ahash::AHashMap;
use std::sync::{PoisonError, RwLock};

mod file;

pub use file::FileSessionStore;

/// Sessions kept in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<AHashMap<String, SessionState>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, session_id: &str) -> Result<Option<SessionState>, StoreError> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        Ok(sessions.get(session_id).cloned())
    }

    fn save(&self, session_id: &str, session: &SessionState) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.insert(session_id.to_string(), session.clone());
        Ok(())
    }
}

/// A fixed advice snapshot, optionally scoped per flow.
#[derive(Debug, Clone, Default)]
pub struct StaticAdviceSource {
    shared: Vec<AdviceItem>,
    by_flow: AHashMap<String, Vec<AdviceItem>>,
}

impl StaticAdviceSource {
    /// Items offered to every flow.
    pub fn new(items: Vec<AdviceItem>) -> Self {
        Self {
            shared: items,
            by_flow: AHashMap::new(),
        }
    }

    /// Adds items offered only to `flow_id`, on top of the shared ones.
    pub fn with_flow_items(mut self, flow_id: impl Into<String>, items: Vec<AdviceItem>) -> Self {
        self.by_flow.entry(flow_id.into()).or_default().extend(items);
        self
    }
}

impl AdviceSource for StaticAdviceSource {
    fn snapshot(&self, flow_id: &str, _session: &SessionState) -> Result<Vec<AdviceItem>, StoreError> {
        let mut items = self.shared.clone();
        if let Some(scoped) = self.by_flow.get(flow_id) {
            items.extend(scoped.iter().cloned());
        }
        Ok(items)
    }
}
