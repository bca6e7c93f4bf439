//! Contact models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A contact harvested from message headers or added by the user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    /// Local contact ID (database primary key)
    pub id: i64,
    /// Account this contact belongs to
    pub account_id: i64,
    /// Display name, if known
    pub name: Option<String>,
    /// Email address
    pub email: String,
    /// When the contact was first seen
    pub created_at: DateTime<Utc>,
}

impl Contact {
    pub fn new(id: i64, account_id: i64, email: impl Into<String>) -> Self {
        Self {
            id,
            account_id,
            name: None,
            email: email.into(),
            created_at: Utc::now(),
        }
    }

    /// Display string: name if known, otherwise the email
    pub fn display(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}

/// A named group of contacts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactGroup {
    pub id: i64,
    pub account_id: i64,
    pub name: String,
    /// Contact IDs belonging to this group
    pub member_ids: Vec<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_falls_back_to_email() {
        let mut contact = Contact::new(1, 1, "bob@example.com");
        assert_eq!(contact.display(), "bob@example.com");
        contact.name = Some("Bob".to_string());
        assert_eq!(contact.display(), "Bob");
    }
}
