//! MailService facade for UniFFI export
//!
//! This provides a high-level, FFI-friendly API that wraps the internal
//! storage, sync, search, action, and assist functionality.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::actions::{ActionHandler, OutgoingMail};
use crate::assist::{AssistConfig, ReplyRequest, ReplySession};
use crate::ffi::types::*;
use crate::gmail::{GmailAuth, GmailClient};
use crate::models::{Account, ContactGroup, MessageId};
use crate::search::SearchIndex;
use crate::storage::{MailStore, SqliteMailStore};

/// Main service object for mail operations
///
/// This is the primary entry point for Kotlin/Swift code to interact with
/// the mail crate. It wraps storage, search, sync, and reply streaming.
#[derive(uniffi::Object)]
pub struct MailService {
    store: Arc<SqliteMailStore>,
    search_index: Arc<SearchIndex>,
    /// Currently active reply stream, if any
    reply_session: Mutex<Option<ReplySession>>,
}

#[uniffi::export]
impl MailService {
    /// Create a new MailService with the given paths
    ///
    /// # Arguments
    /// * `db_path` - Path to the SQLite database file
    /// * `search_index_path` - Path to the Tantivy search index directory
    #[uniffi::constructor]
    pub fn new(db_path: String, search_index_path: String) -> Result<Arc<Self>, MailError> {
        if let Some(parent) = PathBuf::from(&db_path).parent() {
            std::fs::create_dir_all(parent).map_err(|e| MailError::Database {
                message: format!("Failed to create database directory: {}", e),
            })?;
        }

        let store = SqliteMailStore::new(&db_path).map_err(|e| MailError::Database {
            message: format!("Failed to open database: {}", e),
        })?;

        let search_index =
            SearchIndex::open(&search_index_path).map_err(|e| MailError::Database {
                message: format!("Failed to open search index: {}", e),
            })?;

        Ok(Arc::new(Self {
            store: Arc::new(store),
            search_index: Arc::new(search_index),
            reply_session: Mutex::new(None),
        }))
    }

    // ========================================================================
    // Account Management
    // ========================================================================

    /// List all registered accounts
    pub fn list_accounts(&self) -> Result<Vec<FfiAccount>, MailError> {
        let accounts = self.store.list_accounts()?;
        Ok(accounts.into_iter().map(FfiAccount::from).collect())
    }

    /// Register a new account with the given email
    ///
    /// Returns the created account with its assigned ID. Registering an
    /// email that already exists returns the existing account.
    pub fn register_account(&self, email: String) -> Result<FfiAccount, MailError> {
        let id = self.store.upsert_account(Account::new(0, &email))?;
        let account = self.store.get_account(id)?.ok_or(MailError::NotFound {
            resource: format!("account {}", id),
        })?;
        Ok(FfiAccount::from(account))
    }

    /// Get an account by ID
    pub fn get_account(&self, account_id: i64) -> Result<Option<FfiAccount>, MailError> {
        let account = self.store.get_account(account_id)?;
        Ok(account.map(FfiAccount::from))
    }

    /// Get an account by email address
    pub fn get_account_by_email(&self, email: String) -> Result<Option<FfiAccount>, MailError> {
        let account = self.store.get_account_by_email(&email)?;
        Ok(account.map(FfiAccount::from))
    }

    /// Delete an account and all its data
    pub fn delete_account(&self, account_id: i64) -> Result<(), MailError> {
        self.store.delete_account(account_id)?;
        Ok(())
    }

    // ========================================================================
    // Message Queries
    // ========================================================================

    /// List messages in a mailbox with pagination
    ///
    /// Returns messages sorted by internal date descending (newest first).
    pub fn list_mailbox(
        &self,
        account_id: i64,
        label: String,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<FfiMessageSummary>, MailError> {
        let summaries = crate::query::list_mailbox(
            self.store.as_ref(),
            account_id,
            &label,
            limit as usize,
            offset as usize,
        )?;
        Ok(summaries.into_iter().map(FfiMessageSummary::from).collect())
    }

    /// Count messages in a mailbox
    pub fn count_mailbox(&self, account_id: i64, label: String) -> Result<u32, MailError> {
        let count = crate::query::count_mailbox(self.store.as_ref(), account_id, &label)?;
        Ok(count as u32)
    }

    /// Get a full message including bodies
    pub fn get_message(&self, message_id: String) -> Result<Option<FfiMessage>, MailError> {
        let detail =
            crate::query::get_message_detail(self.store.as_ref(), &MessageId::new(message_id))?;
        Ok(detail.map(|d| FfiMessage::from(d.message)))
    }

    /// List contacts for an account
    pub fn list_contacts(&self, account_id: i64) -> Result<Vec<FfiContact>, MailError> {
        let contacts = self.store.list_contacts(account_id)?;
        Ok(contacts.into_iter().map(FfiContact::from).collect())
    }

    /// Delete a contact; its group memberships go with it
    pub fn delete_contact(&self, contact_id: i64) -> Result<(), MailError> {
        self.store.delete_contact(contact_id)?;
        Ok(())
    }

    /// List contact groups for an account, including member contact IDs
    pub fn list_contact_groups(&self, account_id: i64) -> Result<Vec<FfiContactGroup>, MailError> {
        let groups = self.store.list_groups(account_id)?;
        Ok(groups.into_iter().map(FfiContactGroup::from).collect())
    }

    /// Create or update a contact group
    ///
    /// Pass `group_id = 0` to create a new group. The member list replaces
    /// the group's previous membership. Returns the group's ID.
    pub fn save_contact_group(
        &self,
        group_id: i64,
        account_id: i64,
        name: String,
        member_ids: Vec<i64>,
    ) -> Result<i64, MailError> {
        let id = self.store.upsert_group(ContactGroup {
            id: group_id,
            account_id,
            name,
            member_ids,
        })?;
        Ok(id)
    }

    /// Delete a contact group (the contacts themselves are kept)
    pub fn delete_contact_group(&self, group_id: i64) -> Result<(), MailError> {
        self.store.delete_group(group_id)?;
        Ok(())
    }

    // ========================================================================
    // Search
    // ========================================================================

    /// Search messages by query string
    ///
    /// Supports Gmail-style operators like `from:`, `to:`, `subject:`,
    /// `is:unread`, `in:inbox`, `before:`, `after:`.
    pub fn search(
        &self,
        query: String,
        limit: u32,
        account_id: Option<i64>,
    ) -> Result<Vec<FfiSearchResult>, MailError> {
        let results = crate::search::search_messages(
            &self.search_index,
            &query,
            limit as usize,
            account_id,
        )?;
        Ok(results.into_iter().map(FfiSearchResult::from).collect())
    }

    /// Rebuild the search index from storage
    ///
    /// Returns the number of messages indexed.
    pub fn rebuild_search_index(&self) -> Result<u32, MailError> {
        let count = self.search_index.rebuild(self.store.as_ref())?;
        Ok(count as u32)
    }

    // ========================================================================
    // Sync
    // ========================================================================

    /// Sync an account's mailboxes from Gmail
    ///
    /// # Arguments
    /// * `account_id` - The account to sync
    /// * `token_json` - JSON-serialized token with access_token, refresh_token, expires_at
    /// * `client_id` - OAuth client ID
    /// * `client_secret` - OAuth client secret
    /// * `max_messages_per_label` - Cap on messages fetched per mailbox
    /// * `callback` - Progress callback for UI updates
    pub fn sync_account(
        &self,
        account_id: i64,
        token_json: String,
        client_id: String,
        client_secret: String,
        max_messages_per_label: u32,
        callback: Box<dyn SyncProgressCallback>,
    ) -> Result<FfiSyncStats, MailError> {
        let gmail = self.gmail_client(token_json, client_id, client_secret)?;

        callback.on_progress(0, None, "Starting sync...".to_string());

        let stats = crate::sync::sync_account(
            &gmail,
            self.store.as_ref(),
            account_id,
            max_messages_per_label as usize,
        )
        .map_err(|e| {
            callback.on_error(e.to_string());
            MailError::Sync {
                message: e.to_string(),
            }
        })?;

        // Fold new messages into the search index
        if stats.messages_stored > 0 {
            callback.on_progress(
                stats.messages_stored as u32,
                Some(stats.messages_listed as u32),
                "Indexing...".to_string(),
            );
            self.search_index.rebuild(self.store.as_ref())?;
        }

        callback.on_progress(
            stats.messages_stored as u32,
            Some(stats.messages_listed as u32),
            "Sync complete".to_string(),
        );

        Ok(FfiSyncStats::from(stats))
    }

    // ========================================================================
    // Actions
    // ========================================================================

    /// Send a message
    ///
    /// Returns the server-assigned message ID.
    #[allow(clippy::too_many_arguments)]
    pub fn send_mail(
        &self,
        account_id: i64,
        from: FfiEmailAddress,
        to: Vec<FfiEmailAddress>,
        cc: Vec<FfiEmailAddress>,
        subject: String,
        body: String,
        token_json: String,
        client_id: String,
        client_secret: String,
    ) -> Result<String, MailError> {
        let handler = self.action_handler(token_json, client_id, client_secret)?;
        let mail = OutgoingMail {
            from: from.into(),
            to: to.into_iter().map(Into::into).collect(),
            cc: cc.into_iter().map(Into::into).collect(),
            subject,
            body,
        };
        let id = handler
            .send_mail(account_id, mail)
            .map_err(|e| MailError::Network {
                message: e.to_string(),
            })?;
        Ok(id.0)
    }

    /// Set the read state of a message
    pub fn set_read(
        &self,
        message_id: String,
        is_read: bool,
        token_json: String,
        client_id: String,
        client_secret: String,
    ) -> Result<(), MailError> {
        let handler = self.action_handler(token_json, client_id, client_secret)?;
        handler
            .set_read(&MessageId::new(message_id), is_read)
            .map_err(|e| MailError::Network {
                message: e.to_string(),
            })
    }

    /// Toggle star on a message
    ///
    /// Returns the new starred state (true = starred, false = unstarred).
    pub fn toggle_star(
        &self,
        message_id: String,
        token_json: String,
        client_id: String,
        client_secret: String,
    ) -> Result<bool, MailError> {
        let handler = self.action_handler(token_json, client_id, client_secret)?;
        handler
            .toggle_star(&MessageId::new(message_id))
            .map_err(|e| MailError::Network {
                message: e.to_string(),
            })
    }

    /// Archive a message (remove INBOX label)
    pub fn archive_message(
        &self,
        message_id: String,
        token_json: String,
        client_id: String,
        client_secret: String,
    ) -> Result<(), MailError> {
        let handler = self.action_handler(token_json, client_id, client_secret)?;
        handler
            .archive_message(&MessageId::new(message_id))
            .map_err(|e| MailError::Network {
                message: e.to_string(),
            })
    }

    /// Move a message to trash
    pub fn trash_message(
        &self,
        message_id: String,
        token_json: String,
        client_id: String,
        client_secret: String,
    ) -> Result<(), MailError> {
        let handler = self.action_handler(token_json, client_id, client_secret)?;
        handler
            .trash_message(&MessageId::new(message_id))
            .map_err(|e| MailError::Network {
                message: e.to_string(),
            })
    }

    // ========================================================================
    // Reply Streaming
    // ========================================================================

    /// Start streaming reply suggestions for a message
    ///
    /// Events are delivered to the callback on a background thread. Starting
    /// a new stream cancels any stream already in flight; only the newest
    /// stream's events reach the callback.
    pub fn start_reply_stream(
        &self,
        request: FfiReplyRequest,
        token_json: String,
        client_id: String,
        client_secret: String,
        callback: Box<dyn ReplyStreamCallback>,
    ) -> Result<(), MailError> {
        let auth =
            GmailAuth::with_token_data(client_id, client_secret, &token_json).map_err(|e| {
                MailError::InvalidArgument {
                    message: e.to_string(),
                }
            })?;

        // Cancel any previous stream before the new one connects
        if let Some(prev) = self.reply_session.lock().unwrap().take() {
            prev.stop();
        }

        let session = ReplySession::new(AssistConfig::load(), Arc::new(auth));
        let rx = session.start(ReplyRequest {
            message_id: request.message_id,
            subject: request.subject,
            body: request.body,
            tone: request.tone,
        });

        *self.reply_session.lock().unwrap() = Some(session);

        std::thread::spawn(move || {
            for event in rx {
                forward_reply_event(callback.as_ref(), event);
            }
        });

        Ok(())
    }

    /// Stop the active reply stream, if any
    ///
    /// Safe to call when no stream is running. Events already decoded but
    /// not yet delivered are dropped.
    pub fn stop_reply_stream(&self) {
        if let Some(session) = self.reply_session.lock().unwrap().take() {
            session.stop();
        }
    }
}

impl MailService {
    fn gmail_client(
        &self,
        token_json: String,
        client_id: String,
        client_secret: String,
    ) -> Result<GmailClient, MailError> {
        let auth =
            GmailAuth::with_token_data(client_id, client_secret, &token_json).map_err(|e| {
                MailError::InvalidArgument {
                    message: e.to_string(),
                }
            })?;
        Ok(GmailClient::new(auth))
    }

    fn action_handler(
        &self,
        token_json: String,
        client_id: String,
        client_secret: String,
    ) -> Result<ActionHandler, MailError> {
        let gmail = self.gmail_client(token_json, client_id, client_secret)?;
        Ok(ActionHandler::new(
            Arc::new(gmail),
            self.store.clone() as Arc<dyn MailStore>,
        ))
    }
}

// ============================================================================
// Free Functions
// ============================================================================

/// Parse a search query and return the parsed structure
///
/// This is useful for validating queries before executing them.
#[uniffi::export]
pub fn parse_search_query(query: String) -> String {
    let parsed = crate::search::parse_query(&query);
    format!("{:?}", parsed)
}

/// Get the icon emoji for a label
#[uniffi::export]
pub fn get_label_icon(label_id: String) -> String {
    crate::models::label_icon(&label_id).to_string()
}

/// Get the sort order for a label (lower = higher priority)
#[uniffi::export]
pub fn get_label_sort_order(label_id: String) -> u32 {
    crate::models::label_sort_order(&label_id)
}

/// Create a token JSON string from OAuth response components
///
/// This helper creates the JSON format expected by the sync, action, and
/// reply stream methods. The host should call this after completing OAuth
/// to create the token string.
///
/// # Arguments
/// * `access_token` - The OAuth access token
/// * `refresh_token` - The OAuth refresh token (optional but recommended)
/// * `expires_at` - Unix timestamp when the token expires (optional)
#[uniffi::export]
pub fn create_token_json(
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
) -> String {
    serde_json::json!({
        "access_token": access_token,
        "refresh_token": refresh_token,
        "expires_at": expires_at,
    })
    .to_string()
}
