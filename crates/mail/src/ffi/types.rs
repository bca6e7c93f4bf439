//! FFI-friendly type wrappers for UniFFI export
//!
//! These types convert internal Rust types to FFI-compatible versions:
//! - `DateTime<Utc>` → `i64` (Unix timestamp)
//! - `MessageId` → `String`
//! - Complex enums → simpler representations

use crate::assist::{ReplyEvent, ReplyOption};
use crate::models::{Account, Contact, ContactGroup, EmailAddress, Message};
use crate::query::MessageSummary;
use crate::search::SearchResult;
use crate::sync::SyncStats;

// ============================================================================
// Error Types
// ============================================================================

/// FFI-friendly error type
#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum MailError {
    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Authentication required")]
    AuthRequired,

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Sync error: {message}")]
    Sync { message: String },
}

impl From<anyhow::Error> for MailError {
    fn from(e: anyhow::Error) -> Self {
        let msg = e.to_string();
        if msg.contains("database") || msg.contains("sqlite") || msg.contains("SQL") {
            MailError::Database { message: msg }
        } else if msg.contains("network") || msg.contains("connection") || msg.contains("HTTP") {
            MailError::Network { message: msg }
        } else {
            MailError::Database { message: msg }
        }
    }
}

// ============================================================================
// Account Types
// ============================================================================

/// FFI-friendly account representation
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAccount {
    pub id: i64,
    pub email: String,
    pub display_name: Option<String>,
    pub avatar_color_index: u8,
    /// Unix timestamp (seconds since epoch)
    pub created_at: i64,
    /// Unix timestamp of the last completed sync, if any
    pub last_synced_at: Option<i64>,
}

impl From<Account> for FfiAccount {
    fn from(a: Account) -> Self {
        let avatar_color_index = a.avatar_color_index();
        Self {
            id: a.id,
            email: a.email,
            display_name: a.display_name,
            avatar_color_index,
            created_at: a.created_at.timestamp(),
            last_synced_at: a.last_synced_at.map(|t| t.timestamp()),
        }
    }
}

// ============================================================================
// Email Address
// ============================================================================

/// FFI-friendly email address
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiEmailAddress {
    pub name: Option<String>,
    pub email: String,
}

impl From<EmailAddress> for FfiEmailAddress {
    fn from(e: EmailAddress) -> Self {
        Self {
            name: e.name,
            email: e.email,
        }
    }
}

impl From<FfiEmailAddress> for EmailAddress {
    fn from(e: FfiEmailAddress) -> Self {
        match e.name {
            Some(name) => EmailAddress::with_name(name, e.email),
            None => EmailAddress::new(e.email),
        }
    }
}

// ============================================================================
// Message Types
// ============================================================================

/// FFI-friendly message summary for list views
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMessageSummary {
    pub id: String,
    pub account_id: i64,
    pub sender_name: Option<String>,
    pub sender_email: String,
    pub subject: String,
    pub snippet: String,
    /// Unix timestamp (seconds since epoch)
    pub received_at: i64,
    pub is_unread: bool,
}

impl From<MessageSummary> for FfiMessageSummary {
    fn from(s: MessageSummary) -> Self {
        Self {
            id: s.id.0,
            account_id: s.account_id,
            sender_name: s.sender_name,
            sender_email: s.sender_email,
            subject: s.subject,
            snippet: s.snippet,
            received_at: s.received_at.timestamp(),
            is_unread: s.is_unread,
        }
    }
}

/// FFI-friendly full message representation
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMessage {
    pub id: String,
    pub account_id: i64,
    pub from: FfiEmailAddress,
    pub to: Vec<FfiEmailAddress>,
    pub cc: Vec<FfiEmailAddress>,
    pub subject: String,
    pub body_preview: String,
    pub body_text: Option<String>,
    pub body_html: Option<String>,
    /// Unix timestamp (seconds since epoch)
    pub received_at: i64,
    pub internal_date: i64,
    pub label_ids: Vec<String>,
}

impl From<Message> for FfiMessage {
    fn from(m: Message) -> Self {
        Self {
            id: m.id.0,
            account_id: m.account_id,
            from: m.from.into(),
            to: m.to.into_iter().map(FfiEmailAddress::from).collect(),
            cc: m.cc.into_iter().map(FfiEmailAddress::from).collect(),
            subject: m.subject,
            body_preview: m.body_preview,
            body_text: m.body_text,
            body_html: m.body_html,
            received_at: m.received_at.timestamp(),
            internal_date: m.internal_date,
            label_ids: m.label_ids,
        }
    }
}

// ============================================================================
// Contact Types
// ============================================================================

/// FFI-friendly contact representation
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiContact {
    pub id: i64,
    pub account_id: i64,
    pub name: Option<String>,
    pub email: String,
}

impl From<Contact> for FfiContact {
    fn from(c: Contact) -> Self {
        Self {
            id: c.id,
            account_id: c.account_id,
            name: c.name,
            email: c.email,
        }
    }
}

/// FFI-friendly contact group representation
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiContactGroup {
    pub id: i64,
    pub account_id: i64,
    pub name: String,
    pub member_ids: Vec<i64>,
}

impl From<ContactGroup> for FfiContactGroup {
    fn from(g: ContactGroup) -> Self {
        Self {
            id: g.id,
            account_id: g.account_id,
            name: g.name,
            member_ids: g.member_ids,
        }
    }
}

// ============================================================================
// Sync Types
// ============================================================================

/// FFI-friendly sync statistics
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSyncStats {
    pub messages_listed: u32,
    pub messages_stored: u32,
    pub messages_skipped: u32,
    pub contacts_updated: u32,
    pub errors: u32,
    pub duration_ms: u64,
}

impl From<SyncStats> for FfiSyncStats {
    fn from(s: SyncStats) -> Self {
        Self {
            messages_listed: s.messages_listed as u32,
            messages_stored: s.messages_stored as u32,
            messages_skipped: s.messages_skipped as u32,
            contacts_updated: s.contacts_updated as u32,
            errors: s.errors as u32,
            duration_ms: s.duration_ms,
        }
    }
}

/// Callback interface for sync progress updates
#[uniffi::export(callback_interface)]
pub trait SyncProgressCallback: Send + Sync {
    /// Called when sync progress updates
    fn on_progress(&self, fetched: u32, total: Option<u32>, phase: String);
    /// Called when an error occurs during sync
    fn on_error(&self, message: String);
}

// ============================================================================
// Search Types
// ============================================================================

/// FFI-friendly search result
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSearchResult {
    pub message_id: String,
    pub account_id: i64,
    pub subject: String,
    pub snippet: String,
    pub sender_name: Option<String>,
    pub sender_email: String,
    /// Unix timestamp (seconds since epoch)
    pub received_at: i64,
    pub is_unread: bool,
    pub score: f32,
}

impl From<SearchResult> for FfiSearchResult {
    fn from(r: SearchResult) -> Self {
        Self {
            message_id: r.message_id.0,
            account_id: r.account_id,
            subject: r.subject,
            snippet: r.snippet,
            sender_name: r.sender_name,
            sender_email: r.sender_email,
            received_at: r.received_at.timestamp(),
            is_unread: r.is_unread,
            score: r.score,
        }
    }
}

// ============================================================================
// Reply Streaming Types
// ============================================================================

/// FFI-friendly reply request
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiReplyRequest {
    pub message_id: String,
    pub subject: String,
    pub body: String,
    pub tone: Option<String>,
}

/// FFI-friendly reply option
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiReplyOption {
    pub id: i64,
    pub kind: String,
    pub title: String,
}

impl From<ReplyOption> for FfiReplyOption {
    fn from(o: ReplyOption) -> Self {
        Self {
            id: o.id,
            kind: o.kind,
            title: o.title,
        }
    }
}

/// Callback interface for receiving reply stream events
///
/// One method per event kind; the UI layer applies deltas to its own
/// draft state as they arrive.
#[uniffi::export(callback_interface)]
pub trait ReplyStreamCallback: Send + Sync {
    /// The server accepted the request and will start streaming
    fn on_ready(&self);
    /// The set of options that will be streamed
    fn on_options(&self, options: Vec<FfiReplyOption>);
    /// A chunk of generated text for one option
    fn on_option_delta(&self, id: i64, seq: i64, text: String);
    /// One option finished generating
    fn on_option_done(&self, id: i64, total_seq: i64);
    /// One option failed; the rest of the stream continues
    fn on_option_error(&self, id: i64, message: String);
    /// The whole stream completed
    fn on_done(&self, reason: String);
    /// A stream-level error
    fn on_error(&self, message: String);
}

/// Forward one reply event to the callback
pub(crate) fn forward_reply_event(callback: &dyn ReplyStreamCallback, event: ReplyEvent) {
    match event {
        ReplyEvent::Ready => callback.on_ready(),
        ReplyEvent::Options(options) => {
            callback.on_options(options.into_iter().map(FfiReplyOption::from).collect())
        }
        ReplyEvent::OptionDelta { id, seq, text } => callback.on_option_delta(id, seq, text),
        ReplyEvent::OptionDone { id, total_seq } => callback.on_option_done(id, total_seq),
        ReplyEvent::OptionError { id, message } => callback.on_option_error(id, message),
        ReplyEvent::Done { reason } => callback.on_done(reason),
        ReplyEvent::Error { message } => callback.on_error(message),
    }
}

// ============================================================================
// Log Callback
// ============================================================================

/// Log level for FFI callback
#[derive(Debug, Clone, Copy, uniffi::Enum)]
pub enum FfiLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<log::Level> for FfiLogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => FfiLogLevel::Error,
            log::Level::Warn => FfiLogLevel::Warn,
            log::Level::Info => FfiLogLevel::Info,
            log::Level::Debug => FfiLogLevel::Debug,
            log::Level::Trace => FfiLogLevel::Trace,
        }
    }
}

/// Callback interface for receiving log messages from Rust
///
/// Kotlin should implement this using android.util.Log or a logging
/// facade so Rust logs appear in logcat.
#[uniffi::export(callback_interface)]
pub trait LogCallback: Send + Sync {
    /// Called when a log message is emitted
    ///
    /// # Arguments
    /// * `level` - The log level (error, warn, info, debug, trace)
    /// * `target` - The logging target (typically module path, e.g., "mail::sync")
    /// * `message` - The log message
    fn on_log(&self, level: FfiLogLevel, target: String, message: String);
}
