//! Xend assist service integration
//!
//! Streams AI reply suggestions from the assist backend over Server-Sent
//! Events. The module is layered:
//! - `sse` reads raw SSE frames off a byte stream
//! - `events` turns frames into typed reply events
//! - `session` owns the HTTP connection and delivers events on a channel

mod events;
mod session;
mod sse;

pub use events::{
    OptionDraft, PARSE_ERROR_PREVIEW_LEN, ReplyAccumulator, ReplyEvent, ReplyOption,
    dispatch_frame,
};
pub use session::{ERROR_BODY_PREVIEW_LEN, ReplyRequest, ReplySession, TokenProvider};
pub use sse::{DEFAULT_MAX_LINE_LEN, FrameReader, SseError, SseFrame};

use serde::{Deserialize, Serialize};

/// Configuration for the assist service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistConfig {
    /// Base URL of the assist backend
    pub base_url: String,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Maximum accepted length of a single SSE line, in bytes
    pub max_line_len: usize,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            base_url: "https://assist.xend.app".to_string(),
            connect_timeout_secs: 10,
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }
}

impl AssistConfig {
    /// Load from ~/.config/xend/assist.json, falling back to defaults if
    /// the file doesn't exist.
    pub fn load() -> Self {
        if config::config_exists("assist.json") {
            config::load_json("assist.json").unwrap_or_else(|e| {
                log::warn!("[ASSIST] Failed to load assist.json, using defaults: {}", e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }
}
