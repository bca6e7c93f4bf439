//! Action handler for email operations
//!
//! Coordinates between Gmail API and local storage for mutations.

use anyhow::Result;
use chrono::Utc;
use log::info;
use std::sync::Arc;

use crate::gmail::GmailClient;
use crate::models::{EmailAddress, LabelId, Message, MessageId};
use crate::storage::MailStore;

/// An outgoing message to send
#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub from: EmailAddress,
    pub to: Vec<EmailAddress>,
    pub cc: Vec<EmailAddress>,
    pub subject: String,
    pub body: String,
}

/// Compose an RFC 2822 message from its parts
pub fn compose_rfc2822(mail: &OutgoingMail) -> String {
    let mut out = String::new();
    out.push_str(&format!("From: {}\r\n", mail.from.display()));
    out.push_str(&format!("To: {}\r\n", address_list(&mail.to)));
    if !mail.cc.is_empty() {
        out.push_str(&format!("Cc: {}\r\n", address_list(&mail.cc)));
    }
    out.push_str(&format!("Subject: {}\r\n", mail.subject));
    out.push_str("MIME-Version: 1.0\r\n");
    out.push_str("Content-Type: text/plain; charset=\"UTF-8\"\r\n");
    out.push_str("\r\n");
    out.push_str(&mail.body);
    out
}

fn address_list(addrs: &[EmailAddress]) -> String {
    addrs
        .iter()
        .map(|a| a.display())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Handler for mail actions like send, archive, read/unread
///
/// Actions are performed in two steps:
/// 1. Call Gmail API to update server state
/// 2. Update local storage to reflect the change
///
/// This ensures the server is the source of truth, and local state
/// is kept in sync.
pub struct ActionHandler {
    gmail: Arc<GmailClient>,
    store: Arc<dyn MailStore>,
}

impl ActionHandler {
    /// Create a new action handler
    pub fn new(gmail: Arc<GmailClient>, store: Arc<dyn MailStore>) -> Self {
        Self { gmail, store }
    }

    /// Send a message and record the sent copy locally.
    ///
    /// Returns the server-assigned message ID.
    pub fn send_mail(&self, account_id: i64, mail: OutgoingMail) -> Result<MessageId> {
        let raw = compose_rfc2822(&mail);
        let sent = self.gmail.send_message(raw.as_bytes())?;
        let id = MessageId::new(&sent.id);

        info!("Sent message {} ({})", id.as_str(), mail.subject);

        let now = Utc::now();
        let local = Message::builder(id.clone())
            .account_id(account_id)
            .from(mail.from)
            .to(mail.to)
            .cc(mail.cc)
            .subject(mail.subject)
            .body_preview(preview_of(&mail.body))
            .body_text(Some(mail.body))
            .received_at(now)
            .internal_date(now.timestamp_millis())
            .label_ids(
                sent.label_ids
                    .unwrap_or_else(|| vec![LabelId::SENT.to_string()]),
            )
            .build();
        self.store.upsert_message(local)?;

        Ok(id)
    }

    /// Set the read status for a message
    pub fn set_read(&self, id: &MessageId, is_read: bool) -> Result<()> {
        info!(
            "Marking message {} as {}",
            id.as_str(),
            if is_read { "read" } else { "unread" }
        );

        if is_read {
            self.gmail
                .modify_message(id, vec![], vec![LabelId::UNREAD.to_string()])?;
        } else {
            self.gmail
                .modify_message(id, vec![LabelId::UNREAD.to_string()], vec![])?;
        }

        self.apply_local_labels(id, |labels| {
            if is_read {
                labels.retain(|l| l != LabelId::UNREAD);
            } else if !labels.contains(&LabelId::UNREAD.to_string()) {
                labels.push(LabelId::UNREAD.to_string());
            }
        })
    }

    /// Toggle read status for a message.
    ///
    /// Returns the new read state (true = read, false = unread).
    pub fn toggle_read(&self, id: &MessageId) -> Result<bool> {
        let is_unread = self
            .store
            .get_message(id)?
            .map(|m| m.is_unread())
            .unwrap_or(false);

        let new_is_read = is_unread;
        self.set_read(id, new_is_read)?;
        Ok(new_is_read)
    }

    /// Toggle star status for a message.
    ///
    /// Returns the new starred state.
    pub fn toggle_star(&self, id: &MessageId) -> Result<bool> {
        let is_starred = self
            .store
            .get_message(id)?
            .map(|m| m.label_ids.iter().any(|l| l == LabelId::STARRED))
            .unwrap_or(false);

        let new_starred = !is_starred;
        if new_starred {
            self.gmail
                .modify_message(id, vec![LabelId::STARRED.to_string()], vec![])?;
        } else {
            self.gmail
                .modify_message(id, vec![], vec![LabelId::STARRED.to_string()])?;
        }

        self.apply_local_labels(id, |labels| {
            if new_starred {
                if !labels.contains(&LabelId::STARRED.to_string()) {
                    labels.push(LabelId::STARRED.to_string());
                }
            } else {
                labels.retain(|l| l != LabelId::STARRED);
            }
        })?;

        Ok(new_starred)
    }

    /// Archive a message (remove from INBOX)
    pub fn archive_message(&self, id: &MessageId) -> Result<()> {
        info!("Archiving message {}", id.as_str());

        self.gmail
            .modify_message(id, vec![], vec![LabelId::INBOX.to_string()])?;

        self.apply_local_labels(id, |labels| {
            labels.retain(|l| l != LabelId::INBOX);
        })
    }

    /// Move a message to trash
    pub fn trash_message(&self, id: &MessageId) -> Result<()> {
        info!("Trashing message {}", id.as_str());

        self.gmail.modify_message(
            id,
            vec![LabelId::TRASH.to_string()],
            vec![LabelId::INBOX.to_string()],
        )?;

        self.apply_local_labels(id, |labels| {
            labels.retain(|l| l != LabelId::INBOX);
            if !labels.contains(&LabelId::TRASH.to_string()) {
                labels.push(LabelId::TRASH.to_string());
            }
        })
    }

    fn apply_local_labels(
        &self,
        id: &MessageId,
        mutate: impl FnOnce(&mut Vec<String>),
    ) -> Result<()> {
        if let Some(message) = self.store.get_message(id)? {
            let mut labels = message.label_ids.clone();
            mutate(&mut labels);
            self.store.update_message_labels(id, labels)?;
        }
        Ok(())
    }
}

/// First ~100 characters of a body, single line, for list display
fn preview_of(body: &str) -> String {
    let line = body.lines().next().unwrap_or("");
    line.chars().take(100).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_mail() -> OutgoingMail {
        OutgoingMail {
            from: EmailAddress::with_name("Alice", "alice@example.com"),
            to: vec![EmailAddress::new("bob@example.com")],
            cc: vec![],
            subject: "Lunch".to_string(),
            body: "How about noon?\nWorks for me.".to_string(),
        }
    }

    #[test]
    fn test_compose_rfc2822() {
        let raw = compose_rfc2822(&make_mail());
        assert!(raw.starts_with("From: Alice <alice@example.com>\r\n"));
        assert!(raw.contains("To: bob@example.com\r\n"));
        assert!(!raw.contains("Cc:"));
        assert!(raw.contains("Subject: Lunch\r\n"));
        assert!(raw.ends_with("\r\nHow about noon?\nWorks for me."));
    }

    #[test]
    fn test_compose_rfc2822_with_cc() {
        let mut mail = make_mail();
        mail.cc = vec![
            EmailAddress::new("carol@example.com"),
            EmailAddress::with_name("Dan", "dan@example.com"),
        ];
        let raw = compose_rfc2822(&mail);
        assert!(raw.contains("Cc: carol@example.com, Dan <dan@example.com>\r\n"));
    }

    #[test]
    fn test_preview_is_single_line_and_bounded() {
        assert_eq!(preview_of("first line\nsecond"), "first line");
        let long = "x".repeat(500);
        assert_eq!(preview_of(&long).chars().count(), 100);
    }
}
