//! Mail crate - Business logic for the Xend mail client
//!
//! This crate provides platform-independent mail functionality including:
//! - Domain models (Account, Message, Contact, EmailAddress)
//! - Gmail API client and OAuth authentication
//! - Storage trait abstractions (SQLite and in-memory)
//! - Idempotent mailbox sync engine
//! - Full-text search over cached messages
//! - Query API for UI consumption
//! - Action handlers for mutations (send, archive, star, read/unread)
//! - Streaming reply suggestions from the assist service
//!
//! This crate has zero UI dependencies and is exported to the Android app
//! via UniFFI (see the `ffi` module and the `xend-mail-ffi` crate).

pub mod actions;
pub mod assist;
pub mod config;
pub mod ffi;
pub mod gmail;
pub mod models;
pub mod query;
pub mod search;
pub mod storage;
pub mod sync;

pub use actions::{ActionHandler, OutgoingMail, compose_rfc2822};
pub use assist::{
    AssistConfig, ReplyAccumulator, ReplyEvent, ReplyOption, ReplyRequest, ReplySession,
    TokenProvider,
};
pub use config::GmailCredentials;
pub use gmail::{GmailAuth, GmailClient, normalize_message};
pub use models::{
    Account, Contact, ContactGroup, EmailAddress, Label, LabelId, Message, MessageId, SyncState,
    label_icon, label_sort_order,
};
pub use query::{MessageDetail, MessageSummary, count_mailbox, get_message_detail, list_mailbox};
pub use search::{ParsedQuery, SearchIndex, SearchResult, parse_query, search_messages};
pub use storage::{InMemoryMailStore, MailStore, SqliteMailStore};
pub use sync::{SYNCED_LABELS, SyncStats, cooldown_elapsed, sync_account, sync_mailbox};

uniffi::setup_scaffolding!();
