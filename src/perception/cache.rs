// Session-scoped store of the last successful detection.
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::errors::{DeskError, DeskResult};
use crate::perception::types::DetectionResult;

pub const DEFAULT_SESSION: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self(DEFAULT_SESSION.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One slot per session. A slot only ever holds a successful result and is
/// replaced wholesale, never merged.
#[derive(Default)]
pub struct DetectionCache {
    slots: RwLock<HashMap<SessionId, Arc<DetectionResult>>>,
}

impl DetectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `result` for `session` if it succeeded. A failed result leaves
    /// any earlier success in place. Returns whether the slot was replaced.
    pub fn store(&self, session: &SessionId, result: Arc<DetectionResult>) -> bool {
        if !result.success {
            tracing::debug!(session = %session, "failed detection not cached");
            return false;
        }
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots.insert(session.clone(), result);
        true
    }

    pub fn latest(&self, session: &SessionId) -> DeskResult<Arc<DetectionResult>> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.get(session).cloned().ok_or(DeskError::NoDetectionResult)
    }
}
