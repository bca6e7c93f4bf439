//! Sync state tracking per account

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persistent sync state for a single account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncState {
    /// Account this state belongs to
    pub account_id: i64,
    /// Provider history ID from the last completed sync, used for
    /// incremental catch-up
    pub history_id: Option<String>,
    /// When the last sync completed
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl SyncState {
    pub fn new(account_id: i64) -> Self {
        Self {
            account_id,
            history_id: None,
            last_synced_at: None,
        }
    }

    /// Record a completed sync
    pub fn mark_synced(&mut self, history_id: Option<String>) {
        self.history_id = history_id;
        self.last_synced_at = Some(Utc::now());
    }
}
