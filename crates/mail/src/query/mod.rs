//! Query API for UI consumption
//!
//! Provides high-level query functions that return data formatted
//! for display in the UI.

mod messages;

pub use messages::{MessageDetail, MessageSummary, count_mailbox, get_message_detail, list_mailbox};
