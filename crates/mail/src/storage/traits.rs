//! Storage trait definitions

use crate::models::{Account, Contact, ContactGroup, Message, MessageId, SyncState};
use anyhow::Result;

/// Trait for mail storage operations
///
/// This trait abstracts over different storage backends (in-memory, database, etc.)
/// and provides the core CRUD operations needed for mail entities.
pub trait MailStore: Send + Sync {
    // === Accounts ===

    /// Insert or update an account. Accounts are keyed by email; an id of 0
    /// means "allocate one". Returns the account's id.
    fn upsert_account(&self, account: Account) -> Result<i64>;

    /// Get an account by ID
    fn get_account(&self, id: i64) -> Result<Option<Account>>;

    /// Get an account by email address
    fn get_account_by_email(&self, email: &str) -> Result<Option<Account>>;

    /// List all accounts
    fn list_accounts(&self) -> Result<Vec<Account>>;

    /// Delete an account and all its data
    fn delete_account(&self, id: i64) -> Result<()>;

    // === Messages ===

    /// Insert or update a message
    fn upsert_message(&self, message: Message) -> Result<()>;

    /// Get a message by ID, including bodies
    fn get_message(&self, id: &MessageId) -> Result<Option<Message>>;

    /// Check if a message exists
    fn has_message(&self, id: &MessageId) -> Result<bool>;

    /// List messages carrying a label, newest first
    fn list_messages_by_label(
        &self,
        account_id: i64,
        label: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Message>>;

    /// Count messages carrying a label
    fn count_messages_by_label(&self, account_id: i64, label: &str) -> Result<usize>;

    /// Replace the label set on a message
    fn update_message_labels(&self, id: &MessageId, label_ids: Vec<String>) -> Result<()>;

    /// Delete a message
    fn delete_message(&self, id: &MessageId) -> Result<()>;

    // === Contacts ===

    /// Insert or update a contact, keyed by (account_id, email).
    /// Returns the contact's id.
    fn upsert_contact(&self, contact: Contact) -> Result<i64>;

    /// List contacts for an account, ordered by email
    fn list_contacts(&self, account_id: i64) -> Result<Vec<Contact>>;

    /// Find a contact by email
    fn find_contact_by_email(&self, account_id: i64, email: &str) -> Result<Option<Contact>>;

    /// Delete a contact
    fn delete_contact(&self, id: i64) -> Result<()>;

    // === Contact groups ===

    /// Insert or update a contact group, including its membership.
    /// Returns the group's id.
    fn upsert_group(&self, group: ContactGroup) -> Result<i64>;

    /// List contact groups for an account
    fn list_groups(&self, account_id: i64) -> Result<Vec<ContactGroup>>;

    /// Delete a contact group (membership only, not the contacts)
    fn delete_group(&self, id: i64) -> Result<()>;

    // === Sync state ===

    /// Get sync state for an account
    fn get_sync_state(&self, account_id: i64) -> Result<Option<SyncState>>;

    /// Save sync state (upsert)
    fn save_sync_state(&self, state: SyncState) -> Result<()>;

    /// Delete sync state for an account
    fn delete_sync_state(&self, account_id: i64) -> Result<()>;

    /// Clear all data (for testing)
    fn clear(&self) -> Result<()>;
}
