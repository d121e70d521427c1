//! Incremental SSE line framing.
//!
//! Network reads arrive at arbitrary byte boundaries: a line, a JSON payload,
//! or even a multi-byte UTF-8 character may span two chunks. Bytes are held
//! until a newline completes the line, and only complete lines are decoded.

use serde_json::Value;

/// Buffers raw bytes and hands out complete, non-empty lines.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    pending: Vec<u8>,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and drain every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            if let Some(line) = decode_line(&raw[..raw.len() - 1]) {
                lines.push(line);
            }
        }
        lines
    }

    /// Take whatever is left once the stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        decode_line(&rest)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

fn decode_line(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let line = text.strip_suffix('\r').unwrap_or(&text);
    if line.trim().is_empty() {
        None
    } else {
        Some(line.to_string())
    }
}

/// What one complete line means.
#[derive(Debug, Clone, PartialEq)]
pub enum SseLine {
    /// `data: <json>` that parsed.
    Data(Value),
    /// `data: [DONE]`.
    Done,
    /// `data: <payload>` that is not valid JSON.
    Malformed(String),
    /// Anything without the `data: ` prefix (`event:`, comments).
    Ignored,
}

pub fn classify_line(line: &str) -> SseLine {
    let Some(payload) = line.strip_prefix("data: ") else {
        return SseLine::Ignored;
    };
    if payload.trim() == "[DONE]" {
        return SseLine::Done;
    }
    match serde_json::from_str(payload) {
        Ok(value) => SseLine::Data(value),
        Err(_) => SseLine::Malformed(payload.to_string()),
    }
}
