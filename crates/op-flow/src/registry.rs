//! Pending-login registry.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use op_crypto::random::random_base64url;
use op_spi::SessionHandle;

/// Number of random bytes in a correlation id (256 bits).
const CORRELATION_ID_BYTES: usize = 32;

/// A login waiting for its out-of-band completion.
#[derive(Debug, Clone)]
pub struct PendingLogin {
    /// The caller's session, to be logged in on completion.
    pub session: SessionHandle,
    /// When the flow was started.
    pub created_at: DateTime<Utc>,
}

/// Maps correlation ids to pending logins.
///
/// Ids are random and unguessable; uniqueness across all currently
/// pending logins is enforced at registration. Removal is the
/// at-most-once gate for notification: whoever removes the entry owns
/// delivery.
#[derive(Debug, Default)]
pub struct PendingLoginRegistry {
    entries: DashMap<String, PendingLogin>,
}

impl PendingLoginRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pending login under a fresh correlation id,
    /// regenerating on the (astronomically unlikely) collision.
    pub fn register(&self, session: SessionHandle) -> String {
        loop {
            let id = random_base64url(CORRELATION_ID_BYTES);
            match self.entries.entry(id.clone()) {
                dashmap::mapref::entry::Entry::Vacant(slot) => {
                    slot.insert(PendingLogin {
                        session: session.clone(),
                        created_at: Utc::now(),
                    });
                    return id;
                }
                dashmap::mapref::entry::Entry::Occupied(_) => {}
            }
        }
    }

    /// Looks a pending login up without consuming it.
    #[must_use]
    pub fn get(&self, correlation_id: &str) -> Option<PendingLogin> {
        self.entries.get(correlation_id).map(|e| e.value().clone())
    }

    /// Removes and returns a pending login. The first caller wins;
    /// later callers get `None`.
    pub fn remove(&self, correlation_id: &str) -> Option<PendingLogin> {
        self.entries.remove(correlation_id).map(|(_, entry)| entry)
    }

    /// Whether the id is still pending.
    #[must_use]
    pub fn contains(&self, correlation_id: &str) -> bool {
        self.entries.contains_key(correlation_id)
    }

    /// Number of pending logins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The currently pending correlation ids.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }
}
