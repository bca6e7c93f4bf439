//! In-memory mail storage for tests and ephemeral use

use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;
use std::sync::atomic::{AtomicI64, Ordering};

use anyhow::Result;

use super::traits::MailStore;
use crate::models::{Account, Contact, ContactGroup, Message, MessageId, SyncState};

/// In-memory mail storage
///
/// Thread-safe via RwLocks. Label listing is backed by an ordered index
/// keyed by (account, label) so listing does not scan every message.
#[derive(Default)]
pub struct InMemoryMailStore {
    accounts: RwLock<HashMap<i64, Account>>,
    messages: RwLock<HashMap<String, Message>>,
    contacts: RwLock<HashMap<i64, Contact>>,
    groups: RwLock<HashMap<i64, ContactGroup>>,
    sync_states: RwLock<HashMap<i64, SyncState>>,
    /// (account_id, label) -> set of (Reverse(internal_date), message_id),
    /// iterating newest first
    label_index: RwLock<HashMap<(i64, String), BTreeSet<(Reverse<i64>, String)>>>,
    next_id: AtomicI64,
}

impl InMemoryMailStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            ..Default::default()
        }
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn index_remove(&self, message: &Message) {
        let mut index = self.label_index.write().unwrap();
        for label in &message.label_ids {
            if let Some(set) = index.get_mut(&(message.account_id, label.clone())) {
                set.remove(&(Reverse(message.internal_date), message.id.as_str().to_string()));
            }
        }
    }

    fn index_insert(&self, message: &Message) {
        let mut index = self.label_index.write().unwrap();
        for label in &message.label_ids {
            index
                .entry((message.account_id, label.clone()))
                .or_default()
                .insert((Reverse(message.internal_date), message.id.as_str().to_string()));
        }
    }
}

impl MailStore for InMemoryMailStore {
    fn upsert_account(&self, mut account: Account) -> Result<i64> {
        let mut accounts = self.accounts.write().unwrap();

        if account.id == 0 {
            // Reuse the existing id if we've seen this email before
            if let Some(existing) = accounts.values().find(|a| a.email == account.email) {
                account.id = existing.id;
            } else {
                account.id = self.allocate_id();
            }
        }

        let id = account.id;
        accounts.insert(id, account);
        Ok(id)
    }

    fn get_account(&self, id: i64) -> Result<Option<Account>> {
        Ok(self.accounts.read().unwrap().get(&id).cloned())
    }

    fn get_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        Ok(self
            .accounts
            .read()
            .unwrap()
            .values()
            .find(|a| a.email == email)
            .cloned())
    }

    fn list_accounts(&self) -> Result<Vec<Account>> {
        let mut accounts: Vec<Account> = self.accounts.read().unwrap().values().cloned().collect();
        accounts.sort_by_key(|a| a.id);
        Ok(accounts)
    }

    fn delete_account(&self, id: i64) -> Result<()> {
        self.accounts.write().unwrap().remove(&id);

        let message_ids: Vec<MessageId> = self
            .messages
            .read()
            .unwrap()
            .values()
            .filter(|m| m.account_id == id)
            .map(|m| m.id.clone())
            .collect();
        for msg_id in message_ids {
            self.delete_message(&msg_id)?;
        }

        self.contacts
            .write()
            .unwrap()
            .retain(|_, c| c.account_id != id);
        self.groups
            .write()
            .unwrap()
            .retain(|_, g| g.account_id != id);
        self.sync_states.write().unwrap().remove(&id);
        Ok(())
    }

    fn upsert_message(&self, message: Message) -> Result<()> {
        // Drop old index entries if the message already exists
        if let Some(old) = self
            .messages
            .read()
            .unwrap()
            .get(message.id.as_str())
            .cloned()
        {
            self.index_remove(&old);
        }

        self.index_insert(&message);
        self.messages
            .write()
            .unwrap()
            .insert(message.id.as_str().to_string(), message);
        Ok(())
    }

    fn get_message(&self, id: &MessageId) -> Result<Option<Message>> {
        Ok(self.messages.read().unwrap().get(id.as_str()).cloned())
    }

    fn has_message(&self, id: &MessageId) -> Result<bool> {
        Ok(self.messages.read().unwrap().contains_key(id.as_str()))
    }

    fn list_messages_by_label(
        &self,
        account_id: i64,
        label: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Message>> {
        let index = self.label_index.read().unwrap();
        let messages = self.messages.read().unwrap();

        let Some(set) = index.get(&(account_id, label.to_string())) else {
            return Ok(Vec::new());
        };

        Ok(set
            .iter()
            .skip(offset)
            .take(limit)
            .filter_map(|(_, id)| messages.get(id).cloned())
            .collect())
    }

    fn count_messages_by_label(&self, account_id: i64, label: &str) -> Result<usize> {
        Ok(self
            .label_index
            .read()
            .unwrap()
            .get(&(account_id, label.to_string()))
            .map_or(0, |set| set.len()))
    }

    fn update_message_labels(&self, id: &MessageId, label_ids: Vec<String>) -> Result<()> {
        let Some(mut message) = self.messages.read().unwrap().get(id.as_str()).cloned() else {
            return Ok(());
        };

        self.index_remove(&message);
        message.label_ids = label_ids;
        self.index_insert(&message);
        self.messages
            .write()
            .unwrap()
            .insert(id.as_str().to_string(), message);
        Ok(())
    }

    fn delete_message(&self, id: &MessageId) -> Result<()> {
        if let Some(message) = self.messages.write().unwrap().remove(id.as_str()) {
            self.index_remove(&message);
        }
        Ok(())
    }

    fn upsert_contact(&self, mut contact: Contact) -> Result<i64> {
        let mut contacts = self.contacts.write().unwrap();

        if contact.id == 0 {
            if let Some(existing) = contacts
                .values()
                .find(|c| c.account_id == contact.account_id && c.email == contact.email)
            {
                contact.id = existing.id;
                // First-seen timestamp wins
                contact.created_at = existing.created_at;
            } else {
                contact.id = self.allocate_id();
            }
        }

        let id = contact.id;
        contacts.insert(id, contact);
        Ok(id)
    }

    fn list_contacts(&self, account_id: i64) -> Result<Vec<Contact>> {
        let mut contacts: Vec<Contact> = self
            .contacts
            .read()
            .unwrap()
            .values()
            .filter(|c| c.account_id == account_id)
            .cloned()
            .collect();
        contacts.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(contacts)
    }

    fn find_contact_by_email(&self, account_id: i64, email: &str) -> Result<Option<Contact>> {
        Ok(self
            .contacts
            .read()
            .unwrap()
            .values()
            .find(|c| c.account_id == account_id && c.email == email)
            .cloned())
    }

    fn delete_contact(&self, id: i64) -> Result<()> {
        self.contacts.write().unwrap().remove(&id);
        for group in self.groups.write().unwrap().values_mut() {
            group.member_ids.retain(|&m| m != id);
        }
        Ok(())
    }

    fn upsert_group(&self, mut group: ContactGroup) -> Result<i64> {
        if group.id == 0 {
            group.id = self.allocate_id();
        }
        let id = group.id;
        self.groups.write().unwrap().insert(id, group);
        Ok(id)
    }

    fn list_groups(&self, account_id: i64) -> Result<Vec<ContactGroup>> {
        let mut groups: Vec<ContactGroup> = self
            .groups
            .read()
            .unwrap()
            .values()
            .filter(|g| g.account_id == account_id)
            .cloned()
            .collect();
        groups.sort_by_key(|g| g.id);
        Ok(groups)
    }

    fn delete_group(&self, id: i64) -> Result<()> {
        self.groups.write().unwrap().remove(&id);
        Ok(())
    }

    fn get_sync_state(&self, account_id: i64) -> Result<Option<SyncState>> {
        Ok(self.sync_states.read().unwrap().get(&account_id).cloned())
    }

    fn save_sync_state(&self, state: SyncState) -> Result<()> {
        self.sync_states
            .write()
            .unwrap()
            .insert(state.account_id, state);
        Ok(())
    }

    fn delete_sync_state(&self, account_id: i64) -> Result<()> {
        self.sync_states.write().unwrap().remove(&account_id);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.accounts.write().unwrap().clear();
        self.messages.write().unwrap().clear();
        self.contacts.write().unwrap().clear();
        self.groups.write().unwrap().clear();
        self.sync_states.write().unwrap().clear();
        self.label_index.write().unwrap().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EmailAddress;

    fn make_message(id: &str, account_id: i64, internal_date: i64, labels: &[&str]) -> Message {
        Message::builder(MessageId::new(id))
            .account_id(account_id)
            .from(EmailAddress::new("sender@example.com"))
            .subject(format!("Subject {}", id))
            .body_preview("preview")
            .internal_date(internal_date)
            .label_ids(labels.iter().map(|l| l.to_string()).collect())
            .build()
    }

    #[test]
    fn test_account_upsert_reuses_id_for_same_email() {
        let store = InMemoryMailStore::new();
        let id1 = store
            .upsert_account(Account::new(0, "alice@example.com"))
            .unwrap();
        let id2 = store
            .upsert_account(Account::new(0, "alice@example.com"))
            .unwrap();
        assert_eq!(id1, id2);
        assert_eq!(store.list_accounts().unwrap().len(), 1);
    }

    #[test]
    fn test_list_messages_newest_first() {
        let store = InMemoryMailStore::new();
        store
            .upsert_message(make_message("old", 1, 100, &["INBOX"]))
            .unwrap();
        store
            .upsert_message(make_message("new", 1, 300, &["INBOX"]))
            .unwrap();
        store
            .upsert_message(make_message("mid", 1, 200, &["INBOX"]))
            .unwrap();

        let messages = store.list_messages_by_label(1, "INBOX", 10, 0).unwrap();
        let ids: Vec<&str> = messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_label_index_tracks_updates() {
        let store = InMemoryMailStore::new();
        store
            .upsert_message(make_message("m1", 1, 100, &["INBOX", "UNREAD"]))
            .unwrap();

        assert_eq!(store.count_messages_by_label(1, "UNREAD").unwrap(), 1);

        store
            .update_message_labels(&MessageId::new("m1"), vec!["INBOX".to_string()])
            .unwrap();

        assert_eq!(store.count_messages_by_label(1, "UNREAD").unwrap(), 0);
        assert_eq!(store.count_messages_by_label(1, "INBOX").unwrap(), 1);
    }

    #[test]
    fn test_messages_scoped_to_account() {
        let store = InMemoryMailStore::new();
        store
            .upsert_message(make_message("m1", 1, 100, &["INBOX"]))
            .unwrap();
        store
            .upsert_message(make_message("m2", 2, 100, &["INBOX"]))
            .unwrap();

        assert_eq!(store.list_messages_by_label(1, "INBOX", 10, 0).unwrap().len(), 1);
        assert_eq!(store.list_messages_by_label(2, "INBOX", 10, 0).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_account_removes_data() {
        let store = InMemoryMailStore::new();
        let account_id = store
            .upsert_account(Account::new(0, "alice@example.com"))
            .unwrap();
        store
            .upsert_message(make_message("m1", account_id, 100, &["INBOX"]))
            .unwrap();
        store
            .upsert_contact(Contact::new(0, account_id, "bob@example.com"))
            .unwrap();

        store.delete_account(account_id).unwrap();

        assert!(!store.has_message(&MessageId::new("m1")).unwrap());
        assert!(store.list_contacts(account_id).unwrap().is_empty());
    }

    #[test]
    fn test_contact_upsert_dedupes_by_email() {
        let store = InMemoryMailStore::new();
        let id1 = store
            .upsert_contact(Contact::new(0, 1, "bob@example.com"))
            .unwrap();
        let mut updated = Contact::new(0, 1, "bob@example.com");
        updated.name = Some("Bob".to_string());
        let id2 = store.upsert_contact(updated).unwrap();

        assert_eq!(id1, id2);
        let contacts = store.list_contacts(1).unwrap();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].name.as_deref(), Some("Bob"));
    }

    #[test]
    fn test_group_membership() {
        let store = InMemoryMailStore::new();
        let c1 = store
            .upsert_contact(Contact::new(0, 1, "a@example.com"))
            .unwrap();
        let c2 = store
            .upsert_contact(Contact::new(0, 1, "b@example.com"))
            .unwrap();

        let group_id = store
            .upsert_group(ContactGroup {
                id: 0,
                account_id: 1,
                name: "Team".to_string(),
                member_ids: vec![c1, c2],
            })
            .unwrap();

        // Deleting a contact removes it from groups
        store.delete_contact(c1).unwrap();
        let groups = store.list_groups(1).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].id, group_id);
        assert_eq!(groups[0].member_ids, vec![c2]);
    }

    #[test]
    fn test_sync_state_round_trip() {
        let store = InMemoryMailStore::new();
        assert!(store.get_sync_state(1).unwrap().is_none());

        let mut state = SyncState::new(1);
        state.mark_synced(Some("h123".to_string()));
        store.save_sync_state(state).unwrap();

        let retrieved = store.get_sync_state(1).unwrap().unwrap();
        assert_eq!(retrieved.history_id.as_deref(), Some("h123"));

        store.delete_sync_state(1).unwrap();
        assert!(store.get_sync_state(1).unwrap().is_none());
    }
}
