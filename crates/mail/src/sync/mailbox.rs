//! Mailbox sync implementation

use anyhow::Result;
use chrono::Utc;

use crate::gmail::{GmailClient, normalize_message};
use crate::models::{Contact, EmailAddress, Message, MessageId, SyncState};
use crate::storage::MailStore;

/// Labels synced by a full account sync
pub const SYNCED_LABELS: &[&str] = &["INBOX", "SENT"];

/// Statistics from a sync operation
#[derive(Debug, Default, Clone)]
pub struct SyncStats {
    /// Number of message IDs listed from Gmail
    pub messages_listed: usize,
    /// Number of new messages stored
    pub messages_stored: usize,
    /// Number of messages skipped (already synced)
    pub messages_skipped: usize,
    /// Number of contacts added or updated from message headers
    pub contacts_updated: usize,
    /// Number of errors encountered
    pub errors: usize,
    /// Duration of the sync operation
    pub duration_ms: u64,
}

impl SyncStats {
    fn merge(&mut self, other: SyncStats) {
        self.messages_listed += other.messages_listed;
        self.messages_stored += other.messages_stored;
        self.messages_skipped += other.messages_skipped;
        self.contacts_updated += other.contacts_updated;
        self.errors += other.errors;
    }
}

/// Sync one mailbox (label) from Gmail to local storage
///
/// This operation is idempotent - running it multiple times will not
/// create duplicate messages or contacts.
///
/// # Arguments
/// * `gmail` - Gmail API client
/// * `store` - Storage backend
/// * `account_id` - Local account the messages belong to
/// * `label_id` - The label to sync (e.g., "INBOX")
/// * `max_messages` - Maximum number of messages to sync
pub fn sync_mailbox(
    gmail: &GmailClient,
    store: &dyn MailStore,
    account_id: i64,
    label_id: &str,
    max_messages: usize,
) -> Result<SyncStats> {
    let start = std::time::Instant::now();
    let mut stats = SyncStats::default();

    // 1. List message IDs carrying the label
    let list_response = gmail.list_messages(label_id, max_messages, None)?;
    let message_refs = list_response.messages.unwrap_or_default();
    stats.messages_listed = message_refs.len();

    // 2. Filter out already-synced messages
    let mut to_fetch: Vec<MessageId> = Vec::new();
    for msg_ref in &message_refs {
        let msg_id = MessageId::new(&msg_ref.id);
        if !store.has_message(&msg_id)? {
            to_fetch.push(msg_id);
        } else {
            stats.messages_skipped += 1;
        }
    }

    if to_fetch.is_empty() {
        stats.duration_ms = start.elapsed().as_millis() as u64;
        return Ok(stats);
    }

    // 3. Fetch full message details in parallel
    let results = gmail.get_messages_batch(&to_fetch);

    // 4. Normalize and store
    for result in results {
        match result {
            Ok(gmail_msg) => match normalize_message(gmail_msg, account_id) {
                Ok(message) => {
                    if let Err(e) = store_message(store, message, &mut stats) {
                        log::error!("[SYNC] Failed to store message: {}", e);
                        stats.errors += 1;
                    }
                }
                Err(e) => {
                    log::error!("[SYNC] Failed to normalize message: {}", e);
                    stats.errors += 1;
                }
            },
            Err(e) => {
                log::error!("[SYNC] Failed to fetch message: {}", e);
                stats.errors += 1;
            }
        }
    }

    stats.duration_ms = start.elapsed().as_millis() as u64;
    Ok(stats)
}

/// Sync all standard mailboxes for an account and record the sync state
pub fn sync_account(
    gmail: &GmailClient,
    store: &dyn MailStore,
    account_id: i64,
    max_messages_per_label: usize,
) -> Result<SyncStats> {
    let start = std::time::Instant::now();
    let mut stats = SyncStats::default();

    for label_id in SYNCED_LABELS {
        let label_stats = sync_mailbox(gmail, store, account_id, label_id, max_messages_per_label)?;
        log::info!(
            "[SYNC] {} for account {}: {} stored, {} skipped, {} errors",
            label_id,
            account_id,
            label_stats.messages_stored,
            label_stats.messages_skipped,
            label_stats.errors
        );
        stats.merge(label_stats);
    }

    // Record the server history position for future incremental catch-up
    let history_id = match gmail.get_profile() {
        Ok(profile) => profile.history_id,
        Err(e) => {
            log::warn!("[SYNC] Failed to fetch profile: {}", e);
            None
        }
    };

    let mut state = store
        .get_sync_state(account_id)?
        .unwrap_or_else(|| SyncState::new(account_id));
    state.mark_synced(history_id);
    store.save_sync_state(state)?;

    if let Some(mut account) = store.get_account(account_id)? {
        account.last_synced_at = Some(Utc::now());
        store.upsert_account(account)?;
    }

    stats.duration_ms = start.elapsed().as_millis() as u64;
    Ok(stats)
}

/// Store a message and harvest its correspondents as contacts
fn store_message(store: &dyn MailStore, message: Message, stats: &mut SyncStats) -> Result<()> {
    let account_id = message.account_id;

    let correspondents: Vec<&EmailAddress> = std::iter::once(&message.from)
        .chain(message.to.iter())
        .chain(message.cc.iter())
        .collect();

    for addr in correspondents {
        if addr.email.is_empty() || addr.email == "unknown@unknown.com" {
            continue;
        }
        let mut contact = Contact::new(0, account_id, &addr.email);
        contact.name = addr.name.clone();
        store.upsert_contact(contact)?;
        stats.contacts_updated += 1;
    }

    store.upsert_message(message)?;
    stats.messages_stored += 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryMailStore;

    fn make_message(id: &str, from: &str, to: &[&str]) -> Message {
        Message::builder(MessageId::new(id))
            .account_id(1)
            .from(EmailAddress::with_name("Sender", from))
            .to(to.iter().map(|e| EmailAddress::new(*e)).collect())
            .subject("Test")
            .body_preview("preview")
            .internal_date(100)
            .label_ids(vec!["INBOX".to_string()])
            .build()
    }

    #[test]
    fn test_store_message_harvests_contacts() {
        let store = InMemoryMailStore::new();
        let mut stats = SyncStats::default();

        let message = make_message("m1", "alice@example.com", &["bob@example.com"]);
        store_message(&store, message, &mut stats).unwrap();

        assert_eq!(stats.messages_stored, 1);
        assert_eq!(stats.contacts_updated, 2);

        let alice = store
            .find_contact_by_email(1, "alice@example.com")
            .unwrap()
            .unwrap();
        assert_eq!(alice.name.as_deref(), Some("Sender"));
        assert!(
            store
                .find_contact_by_email(1, "bob@example.com")
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn test_store_message_dedupes_contacts() {
        let store = InMemoryMailStore::new();
        let mut stats = SyncStats::default();

        store_message(
            &store,
            make_message("m1", "alice@example.com", &[]),
            &mut stats,
        )
        .unwrap();
        store_message(
            &store,
            make_message("m2", "alice@example.com", &[]),
            &mut stats,
        )
        .unwrap();

        assert_eq!(store.list_contacts(1).unwrap().len(), 1);
    }

    #[test]
    fn test_store_message_skips_unknown_sender() {
        let store = InMemoryMailStore::new();
        let mut stats = SyncStats::default();

        store_message(
            &store,
            make_message("m1", "unknown@unknown.com", &[]),
            &mut stats,
        )
        .unwrap();

        assert!(store.list_contacts(1).unwrap().is_empty());
        assert_eq!(stats.contacts_updated, 0);
    }
}
