//! Reply suggestion streaming session
//!
//! Owns the HTTP connection to the assist backend and delivers decoded
//! reply events over a channel. The caller reads events off the receiver;
//! dropping the receiver or calling `stop()` ends the stream. At most one
//! stream is active per session: starting a new one cancels the previous.

use std::io::BufRead;
use std::io::BufReader;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use ureq::Agent;

use super::events::{ReplyEvent, dispatch_frame, truncate_chars};
use super::sse::FrameReader;
use super::AssistConfig;
use crate::gmail::GmailAuth;

/// How much of an error response body is quoted in the error event
pub const ERROR_BODY_PREVIEW_LEN: usize = 500;

/// Supplies bearer tokens for assist requests.
///
/// `refresh_token` is called when the server rejects a token with 401,
/// which means it went bad before its recorded expiry.
pub trait TokenProvider: Send + Sync {
    fn bearer_token(&self) -> Result<String>;
    fn refresh_token(&self) -> Result<String>;
}

impl TokenProvider for GmailAuth {
    fn bearer_token(&self) -> Result<String> {
        self.get_access_token()
    }

    fn refresh_token(&self) -> Result<String> {
        self.force_refresh()
    }
}

/// Request for reply suggestions for one message
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRequest {
    pub message_id: String,
    pub subject: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
}

/// A reply suggestion streaming session
pub struct ReplySession {
    agent: Agent,
    config: AssistConfig,
    tokens: Arc<dyn TokenProvider>,
    /// Cancel flag of the currently active stream, if any
    active: Mutex<Option<Arc<AtomicBool>>>,
}

impl ReplySession {
    pub fn new(config: AssistConfig, tokens: Arc<dyn TokenProvider>) -> Self {
        // Non-2xx responses must come back as responses, not errors, so
        // their bodies can be quoted in the error event. No global timeout:
        // the stream is long-lived by design.
        let agent: Agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(Some(Duration::from_secs(config.connect_timeout_secs)))
            .build()
            .into();

        Self {
            agent,
            config,
            tokens,
            active: Mutex::new(None),
        }
    }

    /// Start streaming reply suggestions.
    ///
    /// Any previously active stream is cancelled first. Events arrive on
    /// the returned receiver; the channel disconnects when the stream
    /// ends, fails, or is stopped.
    pub fn start(&self, request: ReplyRequest) -> mpsc::Receiver<ReplyEvent> {
        let cancel = Arc::new(AtomicBool::new(false));
        if let Some(prev) = self.active.lock().unwrap().replace(cancel.clone()) {
            prev.store(true, Ordering::SeqCst);
        }

        let (tx, rx) = mpsc::channel();
        let agent = self.agent.clone();
        let config = self.config.clone();
        let tokens = self.tokens.clone();

        std::thread::spawn(move || {
            stream_reply(&agent, &config, tokens.as_ref(), &request, &cancel, &tx);
        });

        rx
    }

    /// Stop the active stream, if any.
    ///
    /// Safe to call repeatedly or without a stream running. No events are
    /// delivered after this returns, including late transport errors from
    /// the torn-down connection.
    pub fn stop(&self) {
        if let Some(cancel) = self.active.lock().unwrap().take() {
            cancel.store(true, Ordering::SeqCst);
        }
    }
}

/// Worker: connect, then pump frames into the channel until EOF,
/// error, cancellation, or a dropped receiver.
fn stream_reply(
    agent: &Agent,
    config: &AssistConfig,
    tokens: &dyn TokenProvider,
    request: &ReplyRequest,
    cancel: &AtomicBool,
    tx: &mpsc::Sender<ReplyEvent>,
) {
    // Returns false when the stream should end: cancelled or receiver gone
    let emit = |event: ReplyEvent| -> bool {
        if cancel.load(Ordering::SeqCst) {
            return false;
        }
        tx.send(event).is_ok()
    };

    let url = format!(
        "{}/v1/reply/stream",
        config.base_url.trim_end_matches('/')
    );

    let token = match tokens.bearer_token() {
        Ok(token) => token,
        Err(e) => {
            emit(ReplyEvent::Error {
                message: format!("Failed to get access token: {}", e),
            });
            return;
        }
    };

    let mut response = match send_request(agent, &url, &token, request) {
        Ok(response) => response,
        Err(e) => {
            emit(ReplyEvent::Error {
                message: format!("Assist request failed: {}", e),
            });
            return;
        }
    };

    // One retry with a fresh token on 401
    if response.status().as_u16() == 401 {
        log::info!("[ASSIST] Got 401, refreshing token and retrying");
        let fresh = match tokens.refresh_token() {
            Ok(token) => token,
            Err(e) => {
                emit(ReplyEvent::Error {
                    message: format!("Token refresh failed: {}", e),
                });
                return;
            }
        };
        response = match send_request(agent, &url, &fresh, request) {
            Ok(response) => response,
            Err(e) => {
                emit(ReplyEvent::Error {
                    message: format!("Assist request failed after token refresh: {}", e),
                });
                return;
            }
        };
    }

    let status = response.status();
    if !status.is_success() {
        let body = response
            .into_body()
            .read_to_string()
            .unwrap_or_default();
        emit(ReplyEvent::Error {
            message: format!(
                "Assist request failed with status {}: {}",
                status.as_u16(),
                truncate_chars(&body, ERROR_BODY_PREVIEW_LEN)
            ),
        });
        return;
    }

    let reader = BufReader::new(response.into_body().into_reader());
    pump_frames(reader, config.max_line_len, cancel, &emit);
}

fn send_request(
    agent: &Agent,
    url: &str,
    token: &str,
    request: &ReplyRequest,
) -> std::result::Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    agent
        .post(url)
        .header("Authorization", &format!("Bearer {}", token))
        .header("Accept", "text/event-stream")
        .send_json(request)
}

fn pump_frames<R: BufRead>(
    reader: R,
    max_line_len: usize,
    cancel: &AtomicBool,
    emit: &dyn Fn(ReplyEvent) -> bool,
) {
    let mut frames = FrameReader::with_max_line_len(reader, max_line_len);
    loop {
        if cancel.load(Ordering::SeqCst) {
            return;
        }
        match frames.next_frame() {
            Ok(Some(frame)) => {
                if let Some(event) = dispatch_frame(&frame)
                    && !emit(event)
                {
                    return;
                }
            }
            Ok(None) => return,
            Err(e) => {
                // Read errors after cancellation are expected teardown
                // noise and are swallowed by emit's cancel check
                emit(ReplyEvent::Error {
                    message: format!("Reply stream failed: {}", e),
                });
                return;
            }
        }
    }
}
