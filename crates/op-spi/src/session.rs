//! Caller session handle.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

/// A reference to the caller's server-side session.
///
/// Cheap to clone; all clones share the same session. Identity is the
/// session id, which is what user-session managers key on.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    id: Uuid,
    started_at: DateTime<Utc>,
    attributes: RwLock<HashMap<String, String>>,
}

impl SessionHandle {
    /// Creates a fresh session.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SessionInner {
                id: Uuid::now_v7(),
                started_at: Utc::now(),
                attributes: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// The session id.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// When the session was created.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.inner.started_at
    }

    /// Sets a session attribute.
    pub fn set_attribute(&self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.attributes.write().insert(key.into(), value.into());
    }

    /// Gets a session attribute.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<String> {
        self.inner.attributes.read().get(key).cloned()
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for SessionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for SessionHandle {}

impl std::hash::Hash for SessionHandle {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}
