//! Mailbox sync engine
//!
//! Pulls message metadata and bodies from Gmail into local storage.
//! Sync is idempotent: messages already stored are skipped.

mod mailbox;
mod timing;

pub use mailbox::{SYNCED_LABELS, SyncStats, sync_account, sync_mailbox};
pub use timing::cooldown_elapsed;
