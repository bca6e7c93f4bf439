//! Typed reply events decoded from SSE frames

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::sse::SseFrame;

/// How much of a malformed payload is quoted in a parse error message
pub const PARSE_ERROR_PREVIEW_LEN: usize = 200;

/// A reply suggestion offered by the assist service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyOption {
    pub id: i64,
    /// Option kind, e.g. "short", "detailed" (serialized as "type")
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
}

/// A single event in a reply suggestion stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyEvent {
    /// The server accepted the request and will start streaming
    Ready,
    /// The set of options that will be streamed
    Options(Vec<ReplyOption>),
    /// A chunk of generated text for one option
    OptionDelta { id: i64, seq: i64, text: String },
    /// One option finished generating
    OptionDone { id: i64, total_seq: i64 },
    /// One option failed; the rest of the stream continues
    OptionError { id: i64, message: String },
    /// The whole stream completed
    Done { reason: String },
    /// A stream-level error (bad payload, transport failure, bad status)
    Error { message: String },
}

/// Wire shape of the `options` payload: `{"count":N,"items":[...]}`.
/// The count is advisory; the item list is what matters.
#[derive(Deserialize)]
struct OptionsPayload {
    items: Vec<ReplyOption>,
}

#[derive(Deserialize)]
struct DeltaPayload {
    id: i64,
    seq: i64,
    text: String,
}

#[derive(Deserialize)]
struct DonePayload {
    id: i64,
    total_seq: i64,
}

#[derive(Deserialize)]
struct OptionErrorPayload {
    id: i64,
    message: Option<String>,
}

#[derive(Deserialize)]
struct StreamDonePayload {
    reason: Option<String>,
}

/// Decode a frame into a typed event.
///
/// Returns `None` for frames that carry nothing for the consumer:
/// keep-alive pings and event names this client doesn't know. A frame
/// whose payload fails to parse yields an `Error` event quoting a bounded
/// preview of the payload, so one bad frame never kills the stream.
pub fn dispatch_frame(frame: &SseFrame) -> Option<ReplyEvent> {
    match frame.event.as_str() {
        "ready" => Some(ReplyEvent::Ready),
        "options" => match serde_json::from_str::<OptionsPayload>(&frame.data) {
            Ok(payload) => Some(ReplyEvent::Options(payload.items)),
            Err(e) => Some(parse_error(frame, &e)),
        },
        "option.delta" => match serde_json::from_str::<DeltaPayload>(&frame.data) {
            Ok(p) => Some(ReplyEvent::OptionDelta {
                id: p.id,
                seq: p.seq,
                text: p.text,
            }),
            Err(e) => Some(parse_error(frame, &e)),
        },
        "option.done" => match serde_json::from_str::<DonePayload>(&frame.data) {
            Ok(p) => Some(ReplyEvent::OptionDone {
                id: p.id,
                total_seq: p.total_seq,
            }),
            Err(e) => Some(parse_error(frame, &e)),
        },
        "option.error" => match serde_json::from_str::<OptionErrorPayload>(&frame.data) {
            Ok(p) => Some(ReplyEvent::OptionError {
                id: p.id,
                message: p.message.unwrap_or_else(|| "Unknown error".to_string()),
            }),
            Err(e) => Some(parse_error(frame, &e)),
        },
        "done" => match serde_json::from_str::<StreamDonePayload>(&frame.data) {
            Ok(p) => Some(ReplyEvent::Done {
                reason: p.reason.unwrap_or_else(|| "finished".to_string()),
            }),
            Err(e) => Some(parse_error(frame, &e)),
        },
        // Keep-alives carry nothing
        "ping" => None,
        // Unknown event names are skipped so old clients survive new
        // server features
        other => {
            log::debug!("[ASSIST] Ignoring unknown SSE event: {}", other);
            None
        }
    }
}

fn parse_error(frame: &SseFrame, error: &serde_json::Error) -> ReplyEvent {
    ReplyEvent::Error {
        message: format!(
            "Failed to parse '{}' payload: {} (payload: {})",
            frame.event,
            error,
            truncate_chars(&frame.data, PARSE_ERROR_PREVIEW_LEN)
        ),
    }
}

/// Truncate to at most `max` characters, marking the cut with an ellipsis
pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max).collect();
        out.push('…');
        out
    }
}

/// State of one option while its text streams in
#[derive(Debug, Clone, Default)]
pub struct OptionDraft {
    pub kind: String,
    pub title: String,
    pub text: String,
    pub last_seq: Option<i64>,
    pub done: bool,
    pub error: Option<String>,
}

/// Assembles streamed deltas into complete option texts.
///
/// Deltas are appended in arrival order; `last_seq` records the most
/// recent chunk so a consumer can detect gaps if it cares to.
#[derive(Debug, Default)]
pub struct ReplyAccumulator {
    drafts: HashMap<i64, OptionDraft>,
    done: bool,
}

impl ReplyAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the accumulated state
    pub fn apply(&mut self, event: &ReplyEvent) {
        match event {
            ReplyEvent::Ready | ReplyEvent::Error { .. } => {}
            ReplyEvent::Options(options) => {
                for option in options {
                    self.drafts.insert(
                        option.id,
                        OptionDraft {
                            kind: option.kind.clone(),
                            title: option.title.clone(),
                            ..Default::default()
                        },
                    );
                }
            }
            ReplyEvent::OptionDelta { id, seq, text } => {
                let draft = self.drafts.entry(*id).or_default();
                draft.text.push_str(text);
                draft.last_seq = Some(*seq);
            }
            ReplyEvent::OptionDone { id, .. } => {
                self.drafts.entry(*id).or_default().done = true;
            }
            ReplyEvent::OptionError { id, message } => {
                self.drafts.entry(*id).or_default().error = Some(message.clone());
            }
            ReplyEvent::Done { .. } => self.done = true,
        }
    }

    /// Whether the stream signalled completion
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Get the draft for an option, if any
    pub fn draft(&self, id: i64) -> Option<&OptionDraft> {
        self.drafts.get(&id)
    }

    /// All drafts, ordered by option id
    pub fn drafts(&self) -> Vec<(i64, &OptionDraft)> {
        let mut drafts: Vec<_> = self.drafts.iter().map(|(&id, d)| (id, d)).collect();
        drafts.sort_by_key(|(id, _)| *id);
        drafts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(event: &str, data: &str) -> SseFrame {
        SseFrame {
            event: event.to_string(),
            data: data.to_string(),
        }
    }

    #[test]
    fn test_dispatch_ready() {
        assert_eq!(dispatch_frame(&frame("ready", "{}")), Some(ReplyEvent::Ready));
    }

    #[test]
    fn test_dispatch_options() {
        let data = r#"{"count":1,"items":[{"id":1,"type":"short","title":"Quick reply"}]}"#;
        let event = dispatch_frame(&frame("options", data)).unwrap();
        match event {
            ReplyEvent::Options(options) => {
                assert_eq!(options.len(), 1);
                assert_eq!(options[0].id, 1);
                assert_eq!(options[0].kind, "short");
                assert_eq!(options[0].title, "Quick reply");
            }
            other => panic!("expected Options, got {:?}", other),
        }
    }

    #[test]
    fn test_dispatch_options_preserves_all_items() {
        let data = concat!(
            r#"{"count":2,"items":["#,
            r#"{"id":1,"type":"formal","title":"Formal Reply"},"#,
            r#"{"id":2,"type":"casual","title":"Casual Reply"}]}"#,
        );
        let event = dispatch_frame(&frame("options", data)).unwrap();
        let ReplyEvent::Options(options) = event else {
            panic!("expected Options, got {:?}", event);
        };
        assert_eq!(
            options,
            vec![
                ReplyOption {
                    id: 1,
                    kind: "formal".to_string(),
                    title: "Formal Reply".to_string(),
                },
                ReplyOption {
                    id: 2,
                    kind: "casual".to_string(),
                    title: "Casual Reply".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_dispatch_delta_and_done() {
        let delta = dispatch_frame(&frame("option.delta", r#"{"id":1,"seq":0,"text":"Hi"}"#));
        assert_eq!(
            delta,
            Some(ReplyEvent::OptionDelta {
                id: 1,
                seq: 0,
                text: "Hi".to_string()
            })
        );

        let done = dispatch_frame(&frame("option.done", r#"{"id":1,"total_seq":3}"#));
        assert_eq!(done, Some(ReplyEvent::OptionDone { id: 1, total_seq: 3 }));
    }

    #[test]
    fn test_option_error_default_message() {
        let event = dispatch_frame(&frame("option.error", r#"{"id":2}"#));
        assert_eq!(
            event,
            Some(ReplyEvent::OptionError {
                id: 2,
                message: "Unknown error".to_string()
            })
        );
    }

    #[test]
    fn test_done_default_reason() {
        let event = dispatch_frame(&frame("done", "{}"));
        assert_eq!(
            event,
            Some(ReplyEvent::Done {
                reason: "finished".to_string()
            })
        );

        let event = dispatch_frame(&frame("done", r#"{"reason":"cancelled"}"#));
        assert_eq!(
            event,
            Some(ReplyEvent::Done {
                reason: "cancelled".to_string()
            })
        );
    }

    #[test]
    fn test_ping_and_unknown_ignored() {
        assert_eq!(dispatch_frame(&frame("ping", "{}")), None);
        assert_eq!(dispatch_frame(&frame("shiny.new.event", "{}")), None);
    }

    #[test]
    fn test_malformed_payload_yields_error_event() {
        let event = dispatch_frame(&frame("option.delta", "not json")).unwrap();
        match event {
            ReplyEvent::Error { message } => {
                assert!(message.contains("option.delta"));
                assert!(message.contains("not json"));
            }
            other => panic!("expected Error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_error_preview_is_bounded() {
        let big = "x".repeat(5000);
        let event = dispatch_frame(&frame("options", &big)).unwrap();
        match event {
            ReplyEvent::Error { message } => {
                // Preview plus framing text stays well under the raw size
                assert!(message.len() < 400, "message too long: {}", message.len());
                assert!(message.contains('…'));
            }
            other => panic!("expected Error, got {:?}", other),
        }
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        let s = "héllo wörld".repeat(40);
        let truncated = truncate_chars(&s, 200);
        assert_eq!(truncated.chars().count(), 201); // 200 + ellipsis
    }

    #[test]
    fn test_accumulator_assembles_text() {
        let mut acc = ReplyAccumulator::new();
        acc.apply(&ReplyEvent::Options(vec![ReplyOption {
            id: 1,
            kind: "short".to_string(),
            title: "Quick".to_string(),
        }]));
        acc.apply(&ReplyEvent::OptionDelta {
            id: 1,
            seq: 0,
            text: "Hello ".to_string(),
        });
        acc.apply(&ReplyEvent::OptionDelta {
            id: 1,
            seq: 1,
            text: "there".to_string(),
        });
        acc.apply(&ReplyEvent::OptionDone { id: 1, total_seq: 2 });
        acc.apply(&ReplyEvent::Done {
            reason: "finished".to_string(),
        });

        let draft = acc.draft(1).unwrap();
        assert_eq!(draft.text, "Hello there");
        assert!(draft.done);
        assert!(acc.is_done());
    }

    #[test]
    fn test_accumulator_records_option_error() {
        let mut acc = ReplyAccumulator::new();
        acc.apply(&ReplyEvent::OptionError {
            id: 7,
            message: "model overloaded".to_string(),
        });
        assert_eq!(
            acc.draft(7).unwrap().error.as_deref(),
            Some("model overloaded")
        );
    }
}
