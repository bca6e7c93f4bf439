//! Account model representing a connected mail account

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A connected mail account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Local account ID (database primary key)
    pub id: i64,
    /// Email address of the account
    pub email: String,
    /// Display name from the provider profile
    pub display_name: Option<String>,
    /// When the account was added
    pub created_at: DateTime<Utc>,
    /// When the account last completed a sync
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl Account {
    pub fn new(id: i64, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            display_name: None,
            created_at: Utc::now(),
            last_synced_at: None,
        }
    }

    /// Short label for UI display: the display name if set, otherwise the
    /// local part of the email address.
    pub fn short_label(&self) -> String {
        if let Some(name) = &self.display_name {
            return name.clone();
        }
        self.email
            .split('@')
            .next()
            .unwrap_or(&self.email)
            .to_string()
    }

    /// Deterministic avatar color index for this account (0..=7),
    /// derived from the email so it is stable across restarts.
    pub fn avatar_color_index(&self) -> u8 {
        let mut hash: u32 = 0;
        for b in self.email.bytes() {
            hash = hash.wrapping_mul(31).wrapping_add(b as u32);
        }
        (hash % 8) as u8
    }
}
