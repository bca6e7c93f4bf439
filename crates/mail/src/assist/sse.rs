//! Server-Sent Events frame reading
//!
//! Reads `event:`/`data:` lines off a byte stream and assembles them into
//! frames. A blank line flushes the pending frame; whatever is pending at
//! EOF is flushed as a final frame so a stream that ends without a
//! trailing blank line still delivers its last event.

use std::io::BufRead;

/// Default cap on a single SSE line (256 KiB). A line longer than this is
/// treated as a protocol violation rather than buffered without bound.
pub const DEFAULT_MAX_LINE_LEN: usize = 256 * 1024;

/// Event name used when a frame has no `event:` line, per the SSE spec.
const DEFAULT_EVENT: &str = "message";

/// A single assembled SSE frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// Event name (`message` if the frame carried no `event:` line)
    pub event: String,
    /// Data payload; multiple `data:` lines are joined with newlines
    pub data: String,
}

/// Errors from SSE frame reading
#[derive(Debug, thiserror::Error)]
pub enum SseError {
    #[error("SSE line exceeds maximum length of {limit} bytes")]
    LineTooLong { limit: usize },

    #[error("SSE stream read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Reads SSE frames from a buffered byte stream.
///
/// Lines may end in `\n` or `\r\n`. A UTF-8 BOM at the very start of the
/// stream is stripped. Invalid UTF-8 is replaced rather than rejected.
pub struct FrameReader<R: BufRead> {
    reader: R,
    max_line_len: usize,
    at_start: bool,
    event: Option<String>,
    data_lines: Vec<String>,
}

impl<R: BufRead> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_max_line_len(reader, DEFAULT_MAX_LINE_LEN)
    }

    pub fn with_max_line_len(reader: R, max_line_len: usize) -> Self {
        Self {
            reader,
            max_line_len,
            at_start: true,
            event: None,
            data_lines: Vec::new(),
        }
    }

    /// Read the next frame, or `None` at end of stream.
    pub fn next_frame(&mut self) -> Result<Option<SseFrame>, SseError> {
        loop {
            let Some(line) = self.read_line()? else {
                // EOF: flush whatever is pending
                return Ok(self.flush());
            };

            if line.is_empty() {
                if let Some(frame) = self.flush() {
                    return Ok(Some(frame));
                }
                continue;
            }

            if let Some(value) = field_value(&line, "event") {
                self.event = Some(value.to_string());
            } else if let Some(value) = field_value(&line, "data") {
                self.data_lines.push(value.to_string());
            }
            // Comments (leading colon) and unknown fields are ignored
        }
    }

    /// Flush the pending frame, if it has any data
    fn flush(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        if self.data_lines.is_empty() {
            // An event name with no data does not form a frame, but the
            // blank line still resets it
            return None;
        }
        let data = self.data_lines.join("\n");
        self.data_lines.clear();
        Some(SseFrame {
            event: event.unwrap_or_else(|| DEFAULT_EVENT.to_string()),
            data,
        })
    }

    /// Read one line, without its terminator. Returns `None` at EOF.
    ///
    /// Reads incrementally so an oversized line is rejected as soon as it
    /// crosses the cap instead of being buffered whole.
    fn read_line(&mut self) -> Result<Option<String>, SseError> {
        let mut buf: Vec<u8> = Vec::new();

        loop {
            let chunk = self.reader.fill_buf()?;
            if chunk.is_empty() {
                // EOF; a partial line without terminator still counts
                if buf.is_empty() {
                    return Ok(None);
                }
                break;
            }

            match chunk.iter().position(|&b| b == b'\n') {
                Some(pos) => {
                    buf.extend_from_slice(&chunk[..pos]);
                    self.reader.consume(pos + 1);
                    break;
                }
                None => {
                    buf.extend_from_slice(chunk);
                    let len = chunk.len();
                    self.reader.consume(len);
                }
            }

            if buf.len() > self.max_line_len {
                return Err(SseError::LineTooLong {
                    limit: self.max_line_len,
                });
            }
        }

        if buf.len() > self.max_line_len {
            return Err(SseError::LineTooLong {
                limit: self.max_line_len,
            });
        }

        // CRLF line endings
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }

        // Strip a UTF-8 BOM from the first line of the stream
        if self.at_start {
            self.at_start = false;
            if buf.starts_with(&[0xEF, 0xBB, 0xBF]) {
                buf.drain(..3);
            }
        }

        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }
}

/// Extract a field value from a line, e.g. `field_value("data: x", "data")`.
///
/// A single space after the colon is optional and trimmed.
fn field_value<'a>(line: &'a str, field: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(field)?;
    let value = rest.strip_prefix(':')?;
    Some(value.strip_prefix(' ').unwrap_or(value))
}
