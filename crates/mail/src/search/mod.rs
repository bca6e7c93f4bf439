//! Full-text search over cached messages using Tantivy
//!
//! Supports Gmail-style operators like `from:`, `to:`, `subject:`,
//! `is:unread`, `in:inbox`, `before:`, `after:`.

mod index;
mod query_parser;
mod schema;

pub use index::SearchIndex;
pub use query_parser::{ParsedQuery, parse_query};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::MessageId;

/// A single search hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Message ID
    pub message_id: MessageId,
    /// Account the message belongs to
    pub account_id: i64,
    /// Subject line
    pub subject: String,
    /// Body preview
    pub snippet: String,
    /// Sender display name (if available)
    pub sender_name: Option<String>,
    /// Sender email address
    pub sender_email: String,
    /// When the message was received
    pub received_at: DateTime<Utc>,
    /// Whether the message is unread
    pub is_unread: bool,
    /// Relevance score from Tantivy
    pub score: f32,
}

/// Search messages by query string
///
/// Parses the query string and executes it against the index. Pass an
/// `account_id` to scope results to one account.
///
/// # Example
/// ```ignore
/// let results = search_messages(&index, "from:alice is:unread", 50, Some(1))?;
/// ```
pub fn search_messages(
    index: &SearchIndex,
    query: &str,
    limit: usize,
    account_id: Option<i64>,
) -> anyhow::Result<Vec<SearchResult>> {
    let parsed = parse_query(query);
    index.search(&parsed, limit, account_id)
}
