//! Incremental decoder for the `text/event-stream` wire format.
//!
//! Chunks arrive from the network with arbitrary boundaries, so a frame (or
//! a multi-byte character) may be split across several calls to
//! [`FrameDecoder::push`]. Only complete lines are interpreted.

use bytes::BytesMut;

use crate::broker::message::Event;
use crate::transport::message::DEFAULT_EVENT_NAME;
use crate::utils::RelayError;

/// Longest line the decoder will hold, in bytes.
pub const MAX_LINE_LEN: usize = 1024 * 1024;

/// One dispatched SSE frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub event: Option<String>,
    pub data: String,
}

impl From<Frame> for Event {
    fn from(frame: Frame) -> Self {
        let topic = frame
            .event
            .unwrap_or_else(|| DEFAULT_EVENT_NAME.to_string());
        Event::new(topic, frame.data)
    }
}

#[derive(Debug)]
pub struct FrameDecoder {
    buffer: BytesMut,
    event: Option<String>,
    data: Vec<String>,
    max_line: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_LEN)
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            event: None,
            data: Vec::new(),
            max_line,
        }
    }

    /// Feeds a chunk and returns every frame it completed.
    ///
    /// Fails with [`RelayError::LineTooLong`] once a line grows past the
    /// limit, terminated or not. The decoder is unusable afterwards.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Frame>, RelayError> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            if pos > self.max_line {
                return Err(self.overflow());
            }
            let raw = self.buffer.split_to(pos + 1);
            let mut line = &raw[..pos];
            if let Some(stripped) = line.strip_suffix(b"\r") {
                line = stripped;
            }
            let line = String::from_utf8_lossy(line);
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
        }

        if self.buffer.len() > self.max_line {
            return Err(self.overflow());
        }
        Ok(frames)
    }

    /// Bytes held back waiting for a line terminator.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    fn overflow(&mut self) -> RelayError {
        self.buffer.clear();
        self.event = None;
        self.data.clear();
        RelayError::LineTooLong {
            limit: self.max_line,
        }
    }

    fn process_line(&mut self, line: &str) -> Option<Frame> {
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
            "data" => self.data.push(value.to_string()),
            // id and retry only matter for reconnection, which this client does not do
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<Frame> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(Frame { event, data })
    }
}
