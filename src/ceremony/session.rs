//! Session-scoped storage for the password-login device hash

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};

/// Device hash returned by a password login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDevice {
    pub email: String,
    pub device_id_hash: String,
    pub stored_at: DateTime<Utc>,
}

/// Session-scoped holder for the password-login device hash
///
/// Lives in memory only and is gone when the client is dropped; nothing is
/// written to disk. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    current: Arc<RwLock<Option<SessionDevice>>>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored device hash
    pub fn store(&self, email: &str, device_id_hash: &str) {
        let device = SessionDevice {
            email: email.to_string(),
            device_id_hash: device_id_hash.to_string(),
            stored_at: Utc::now(),
        };
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(device);
    }

    #[must_use]
    pub fn current(&self) -> Option<SessionDevice> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn device_id_hash(&self) -> Option<String> {
        self.current().map(|device| device.device_id_hash)
    }

    pub fn clear(&self) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
