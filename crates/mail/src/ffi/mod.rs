//! FFI bindings for UniFFI export
//!
//! This module provides Kotlin/Swift bindings for the mail crate via UniFFI.
//!
//! ## Usage from Kotlin
//!
//! ```kotlin
//! // Initialize logging first
//! initializeLogging(callback = myLogCallback, maxLevel = 2u)
//!
//! // Initialize the mail service
//! val service = MailService(
//!     dbPath = "/data/mail.db",
//!     searchIndexPath = "/data/mail.search.idx",
//! )
//!
//! // List accounts and mailboxes
//! val accounts = service.listAccounts()
//! val inbox = service.listMailbox(accountId = 1, label = "INBOX", limit = 50u, offset = 0u)
//!
//! // Stream reply suggestions
//! val tokenJson = createTokenJson(accessToken, refreshToken, expiresAt)
//! service.startReplyStream(request, tokenJson, clientId, clientSecret, callback)
//! ```

mod logging;
mod service;
mod types;

// Re-export all FFI types and the MailService
pub use logging::{init_ffi_logger, set_log_callback, set_log_level};
pub use service::*;
pub use types::*;
