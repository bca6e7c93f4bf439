//! Message query functions

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Message, MessageId};
use crate::storage::MailStore;

/// Summary information for displaying a message in a mailbox list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageSummary {
    /// Message ID
    pub id: MessageId,
    /// Account ID this message belongs to
    pub account_id: i64,
    /// Display name of the sender
    pub sender_name: Option<String>,
    /// Email address of the sender
    pub sender_email: String,
    /// Subject line
    pub subject: String,
    /// Preview snippet
    pub snippet: String,
    /// When the message was received
    pub received_at: DateTime<Utc>,
    /// Whether the message is unread
    pub is_unread: bool,
}

impl From<Message> for MessageSummary {
    fn from(message: Message) -> Self {
        let is_unread = message.is_unread();
        Self {
            id: message.id,
            account_id: message.account_id,
            sender_name: message.from.name,
            sender_email: message.from.email,
            subject: message.subject,
            snippet: message.body_preview,
            received_at: message.received_at,
            is_unread,
        }
    }
}

/// Detailed message information including full bodies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDetail {
    pub message: Message,
}

/// List a mailbox (messages carrying a label) with pagination
///
/// Returns messages sorted newest first.
///
/// # Arguments
/// * `store` - The storage backend
/// * `account_id` - The account to query
/// * `label` - The label ID to filter by (e.g., "INBOX", "SENT")
/// * `limit` - Maximum number of messages to return
/// * `offset` - Number of messages to skip
pub fn list_mailbox(
    store: &dyn MailStore,
    account_id: i64,
    label: &str,
    limit: usize,
    offset: usize,
) -> Result<Vec<MessageSummary>> {
    let messages = store.list_messages_by_label(account_id, label, limit, offset)?;
    Ok(messages.into_iter().map(MessageSummary::from).collect())
}

/// Count messages in a mailbox
pub fn count_mailbox(store: &dyn MailStore, account_id: i64, label: &str) -> Result<usize> {
    store.count_messages_by_label(account_id, label)
}

/// Get a full message including bodies, for the reading pane
pub fn get_message_detail(
    store: &dyn MailStore,
    id: &MessageId,
) -> Result<Option<MessageDetail>> {
    let message = match store.get_message(id)? {
        Some(m) => m,
        None => return Ok(None),
    };

    Ok(Some(MessageDetail { message }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EmailAddress;
    use crate::storage::InMemoryMailStore;

    fn setup_test_store() -> InMemoryMailStore {
        let store = InMemoryMailStore::new();

        for i in 0..5 {
            let msg = Message::builder(MessageId::new(format!("m{}", i)))
                .account_id(1)
                .from(EmailAddress::with_name(
                    format!("User {}", i),
                    format!("user{}@example.com", i),
                ))
                .subject(format!("Message {}", i))
                .body_preview(format!("Preview {}", i))
                .body_text(Some(format!("Body {}", i)))
                .received_at(Utc::now() - chrono::Duration::hours(i as i64))
                .internal_date(1000 - i as i64)
                .label_ids(if i % 2 == 0 {
                    vec!["INBOX".to_string(), "UNREAD".to_string()]
                } else {
                    vec!["INBOX".to_string()]
                })
                .build();
            store.upsert_message(msg).unwrap();
        }

        store
    }

    #[test]
    fn test_list_mailbox_newest_first() {
        let store = setup_test_store();

        let summaries = list_mailbox(&store, 1, "INBOX", 3, 0).unwrap();
        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[0].id.as_str(), "m0");
        assert_eq!(summaries[1].id.as_str(), "m1");
        assert_eq!(summaries[2].id.as_str(), "m2");
        assert!(summaries[0].is_unread);
        assert!(!summaries[1].is_unread);
    }

    #[test]
    fn test_list_mailbox_pagination() {
        let store = setup_test_store();

        let page1 = list_mailbox(&store, 1, "INBOX", 2, 0).unwrap();
        let page2 = list_mailbox(&store, 1, "INBOX", 2, 2).unwrap();

        assert_eq!(page1.len(), 2);
        assert_eq!(page2.len(), 2);
        assert_ne!(page1[0].id, page2[0].id);
    }

    #[test]
    fn test_count_mailbox() {
        let store = setup_test_store();
        assert_eq!(count_mailbox(&store, 1, "INBOX").unwrap(), 5);
        assert_eq!(count_mailbox(&store, 1, "UNREAD").unwrap(), 3);
        assert_eq!(count_mailbox(&store, 1, "SENT").unwrap(), 0);
        assert_eq!(count_mailbox(&store, 2, "INBOX").unwrap(), 0);
    }

    #[test]
    fn test_get_message_detail() {
        let store = setup_test_store();

        let detail = get_message_detail(&store, &MessageId::new("m0")).unwrap();
        assert!(detail.is_some());
        let detail = detail.unwrap();
        assert_eq!(detail.message.body_text.as_deref(), Some("Body 0"));

        let missing = get_message_detail(&store, &MessageId::new("nope")).unwrap();
        assert!(missing.is_none());
    }
}
