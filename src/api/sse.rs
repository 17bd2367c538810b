//! Incremental `text/event-stream` decoding.

use tracing::warn;

use crate::dto::events::{PLAY_EVENT, PlayEvent, RawPlayEvent};

/// Upper bound on buffered bytes for one unterminated line or one undispatched frame.
pub const MAX_FRAME_BYTES: usize = 1 << 20;

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// Event name, `message` when the frame carried none.
    pub event: String,
    /// Data lines joined with `\n`.
    pub data: String,
}

/// Line-oriented SSE parser fed with arbitrary byte chunks.
///
/// Chunks may split lines (and UTF-8 sequences) anywhere; only complete lines are interpreted.
/// Lines end with `\r\n`, `\n` or a bare `\r`. Input that exceeds [`MAX_FRAME_BYTES`] without
/// completing is discarded along with the frame it belonged to.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    /// The previous line ended with `\r`; a leading `\n` belongs to it.
    skip_lf: bool,
    event: Option<String>,
    data: Vec<String>,
    data_len: usize,
}

impl SseDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and collect every frame it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.pending.extend_from_slice(chunk);
        let mut frames = Vec::new();

        loop {
            if self.skip_lf && !self.pending.is_empty() {
                if self.pending[0] == b'\n' {
                    self.pending.drain(..1);
                }
                self.skip_lf = false;
            }
            let Some(pos) = self.pending.iter().position(|b| matches!(b, b'\n' | b'\r')) else {
                break;
            };
            let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
            if line.pop() == Some(b'\r') {
                self.skip_lf = true;
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(frame) = self.handle_line(&line) {
                frames.push(frame);
            }
        }

        if self.pending.len() > MAX_FRAME_BYTES {
            warn!(bytes = self.pending.len(), "event stream line too long; discarded");
            self.pending.clear();
            self.reset_frame();
        }

        frames
    }

    fn handle_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => {
                self.data_len += value.len() + 1;
                if self.data_len > MAX_FRAME_BYTES {
                    warn!(bytes = self.data_len, "event stream frame too large; discarded");
                    self.reset_frame();
                } else {
                    self.data.push(value.to_string());
                }
            }
            _ => {}
        }
        None
    }

    fn reset_frame(&mut self) {
        self.event = None;
        self.data.clear();
        self.data_len = 0;
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        self.data_len = 0;
        Some(SseFrame {
            event: event.unwrap_or_else(|| "message".into()),
            data,
        })
    }
}

/// Decode a frame into a play event when it carries one.
///
/// Frames for other event names, and ignored play event types, yield `Ok(None)`.
pub fn decode_play_event(frame: &SseFrame) -> serde_json::Result<Option<PlayEvent>> {
    if frame.event != PLAY_EVENT {
        return Ok(None);
    }
    let raw: RawPlayEvent = serde_json::from_str(&frame.data)?;
    raw.decode()
}
