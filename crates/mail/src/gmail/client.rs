//! Gmail API HTTP client
//!
//! Provides methods for fetching, sending, and labeling messages.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rayon::prelude::*;
use std::time::Duration;

use super::GmailAuth;
use super::api::{
    GmailMessage, ListMessagesResponse, ModifyMessageRequest, Profile, SendMessageRequest,
    SendMessageResponse,
};
use crate::models::MessageId;

/// Gmail API client
pub struct GmailClient {
    auth: GmailAuth,
}

impl GmailClient {
    /// Gmail API base URL
    const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1";

    /// Create a new Gmail client
    pub fn new(auth: GmailAuth) -> Self {
        Self { auth }
    }

    pub fn auth(&self) -> &GmailAuth {
        &self.auth
    }

    /// Run a request closure with a bearer token, retrying once with a
    /// fresh token if the server answers 401. Covers tokens revoked
    /// before their recorded expiry.
    fn with_auth_retry<T>(
        &self,
        f: impl Fn(&str) -> std::result::Result<T, ureq::Error>,
    ) -> Result<T> {
        let token = self.auth.get_access_token()?;
        match f(&token) {
            Ok(v) => Ok(v),
            Err(ureq::Error::StatusCode(401)) => {
                log::info!("Gmail API returned 401, refreshing token and retrying");
                let token = self.auth.force_refresh()?;
                f(&token).context("Request failed after token refresh")
            }
            Err(e) => Err(e).context("Gmail API request failed"),
        }
    }

    /// List message IDs carrying a label (e.g. INBOX, SENT)
    ///
    /// # Arguments
    /// * `label_id` - Label to filter by
    /// * `max_results` - Maximum number of messages to return per page (1-500)
    /// * `page_token` - Optional page token for pagination
    pub fn list_messages(
        &self,
        label_id: &str,
        max_results: usize,
        page_token: Option<&str>,
    ) -> Result<ListMessagesResponse> {
        let mut url = format!(
            "{}/users/me/messages?labelIds={}&maxResults={}",
            Self::BASE_URL,
            urlencoding::encode(label_id),
            max_results.min(500)
        );

        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={}", token));
        }

        let mut response = self.with_auth_retry(|token| {
            ureq::get(&url)
                .header("Authorization", &format!("Bearer {}", token))
                .call()
        })?;

        let list: ListMessagesResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse list messages response")?;

        Ok(list)
    }

    /// List ALL message IDs carrying a label
    ///
    /// Automatically handles pagination.
    ///
    /// # Arguments
    /// * `label_id` - Label to filter by
    /// * `max_messages` - Optional maximum total messages to fetch (None = all)
    /// * `progress_callback` - Called with (fetched_count, total_estimate)
    pub fn list_messages_all<F>(
        &self,
        label_id: &str,
        max_messages: Option<usize>,
        mut progress_callback: F,
    ) -> Result<ListMessagesResponse>
    where
        F: FnMut(usize, Option<u32>),
    {
        use super::api::MessageRef;

        let mut all_messages: Vec<MessageRef> = Vec::new();
        let mut page_token = None;
        let mut result_size_estimate = None;

        loop {
            if let Some(max) = max_messages
                && all_messages.len() >= max
            {
                break;
            }

            let response = self.list_messages(label_id, 500, page_token.as_deref())?;

            if response.result_size_estimate.is_some() {
                result_size_estimate = response.result_size_estimate;
            }

            if let Some(messages) = response.messages {
                all_messages.extend(messages);
            }

            progress_callback(all_messages.len(), result_size_estimate);

            match response.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        if let Some(max) = max_messages {
            all_messages.truncate(max);
        }

        Ok(ListMessagesResponse {
            messages: if all_messages.is_empty() {
                None
            } else {
                Some(all_messages)
            },
            next_page_token: None,
            result_size_estimate,
        })
    }

    /// Get full message details by ID
    pub fn get_message(&self, id: &MessageId) -> Result<GmailMessage> {
        let url = format!(
            "{}/users/me/messages/{}?format=full",
            Self::BASE_URL,
            id.as_str()
        );

        let mut response = self.with_auth_retry(|token| {
            ureq::get(&url)
                .header("Authorization", &format!("Bearer {}", token))
                .call()
        })?;

        let message: GmailMessage = response
            .body_mut()
            .read_json()
            .context("Failed to parse message response")?;

        Ok(message)
    }

    /// Get multiple messages in parallel, with retry per message
    pub fn get_messages_batch(&self, ids: &[MessageId]) -> Vec<Result<GmailMessage>> {
        ids.par_iter()
            .map(|id| self.get_message_with_retry(id, 3))
            .collect()
    }

    /// Get a message with exponential backoff retry
    fn get_message_with_retry(&self, id: &MessageId, max_retries: u32) -> Result<GmailMessage> {
        let mut last_error = None;
        let mut delay = Duration::from_millis(100);

        for attempt in 0..max_retries {
            match self.get_message(id) {
                Ok(msg) => return Ok(msg),
                Err(e) => {
                    last_error = Some(e);
                    if attempt < max_retries - 1 {
                        // Add jitter to delay
                        let jitter = Duration::from_millis(rand_jitter());
                        std::thread::sleep(delay + jitter);
                        delay *= 2;
                    }
                }
            }
        }

        Err(last_error.unwrap())
    }

    /// Get the authenticated user's profile
    pub fn get_profile(&self) -> Result<Profile> {
        let url = format!("{}/users/me/profile", Self::BASE_URL);

        let mut response = self.with_auth_retry(|token| {
            ureq::get(&url)
                .header("Authorization", &format!("Bearer {}", token))
                .call()
        })?;

        let profile: Profile = response
            .body_mut()
            .read_json()
            .context("Failed to parse profile response")?;

        Ok(profile)
    }

    /// Send an RFC 2822 message. The raw bytes are base64url-encoded as
    /// the Gmail API requires.
    pub fn send_message(&self, rfc2822: &[u8]) -> Result<SendMessageResponse> {
        let url = format!("{}/users/me/messages/send", Self::BASE_URL);
        let request = SendMessageRequest {
            raw: URL_SAFE_NO_PAD.encode(rfc2822),
        };

        let mut response = self.with_auth_retry(|token| {
            ureq::post(&url)
                .header("Authorization", &format!("Bearer {}", token))
                .send_json(&request)
        })?;

        let sent: SendMessageResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse send message response")?;

        Ok(sent)
    }

    /// Add and remove labels on a message
    pub fn modify_message(
        &self,
        id: &MessageId,
        add_label_ids: Vec<String>,
        remove_label_ids: Vec<String>,
    ) -> Result<GmailMessage> {
        let url = format!(
            "{}/users/me/messages/{}/modify",
            Self::BASE_URL,
            id.as_str()
        );
        let request = ModifyMessageRequest {
            add_label_ids,
            remove_label_ids,
        };

        let mut response = self.with_auth_retry(|token| {
            ureq::post(&url)
                .header("Authorization", &format!("Bearer {}", token))
                .send_json(&request)
        })?;

        let message: GmailMessage = response
            .body_mut()
            .read_json()
            .context("Failed to parse modify message response")?;

        Ok(message)
    }

    /// Check if the client is authenticated
    pub fn is_authenticated(&self) -> bool {
        self.auth.is_authenticated()
    }

    /// Trigger authentication flow
    pub fn authenticate(&self) -> Result<()> {
        self.auth.get_access_token()?;
        Ok(())
    }
}

/// Generate a random jitter value (0-100ms)
fn rand_jitter() -> u64 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let hasher = RandomState::new().build_hasher();
    hasher.finish() % 100
}
