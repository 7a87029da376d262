//! Server-sent event framing for OpenAI-style streaming replies.
//!
//! Bytes arrive in arbitrary chunks; a line (and a multi-byte character)
//! can be split across two of them. `SseParser` buffers raw bytes and only
//! decodes complete lines.

use serde_json::Value;

/// Terminal payload of an OpenAI stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Incremental `data:` line extractor.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes; returns the `data:` payloads of every line completed
    /// by this chunk.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(payload) = data_payload(&line) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Payload of a trailing line that never got its newline.
    pub fn flush(&mut self) -> Vec<String> {
        let rest = std::mem::take(&mut self.buffer);
        data_payload(&rest).into_iter().collect()
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim_end_matches(['\r', '\n']);
    let payload = line.strip_prefix("data:")?;
    let payload = payload.strip_prefix(' ').unwrap_or(payload);
    if payload.is_empty() {
        return None;
    }
    Some(payload.to_string())
}

/// Meaning of one `data:` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamAction {
    /// `choices[0].delta.content`
    TextDelta(String),
    /// `[DONE]`
    Done,
    /// `{"error": {...}}` sent mid-stream.
    Error(String),
    /// Role-only deltas, keep-alives and anything unrecognized.
    Ignore,
}

pub fn parse_chunk(payload: &str) -> StreamAction {
    if payload.trim() == DONE_SENTINEL {
        return StreamAction::Done;
    }

    let Ok(value) = serde_json::from_str::<Value>(payload) else {
        return StreamAction::Ignore;
    };

    if let Some(error) = value.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(String::from)
            .unwrap_or_else(|| error.to_string());
        return StreamAction::Error(message);
    }

    match value
        .pointer("/choices/0/delta/content")
        .and_then(Value::as_str)
    {
        Some(text) if !text.is_empty() => StreamAction::TextDelta(text.to_string()),
        _ => StreamAction::Ignore,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_splits_complete_lines() {
        let mut parser = SseParser::new();
        let payloads = parser.feed(b"data: {\"a\":1}\n\ndata: [DONE]\n\n");
        assert_eq!(payloads, vec!["{\"a\":1}", "[DONE]"]);
    }

    #[test]
    fn test_partial_line_waits_for_newline() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"data: {\"choices\":").is_empty());
        let payloads = parser.feed(b"[]}\r\n");
        assert_eq!(payloads, vec!["{\"choices\":[]}"]);
    }

    #[test]
    fn test_multibyte_char_split_across_chunks() {
        let line = "data: café\n".as_bytes();
        // split inside the two-byte 'é'
        let split = line.len() - 2;
        let mut parser = SseParser::new();
        assert!(parser.feed(&line[..split]).is_empty());
        assert_eq!(parser.feed(&line[split..]), vec!["café"]);
    }

    #[test]
    fn test_non_data_lines_ignored() {
        let mut parser = SseParser::new();
        let payloads = parser.feed(b": keep-alive\nevent: ping\ndata:\n\n");
        assert!(payloads.is_empty());
    }

    #[test]
    fn test_flush_returns_unterminated_line() {
        let mut parser = SseParser::new();
        parser.feed(b"data: tail");
        assert_eq!(parser.flush(), vec!["tail"]);
        assert!(parser.flush().is_empty());
    }

    #[test]
    fn test_parse_chunk_actions() {
        assert_eq!(
            parse_chunk(r#"{"choices":[{"delta":{"content":"Golden"}}]}"#),
            StreamAction::TextDelta("Golden".into())
        );
        assert_eq!(
            parse_chunk(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#),
            StreamAction::Ignore
        );
        assert_eq!(parse_chunk("[DONE]"), StreamAction::Done);
        assert_eq!(
            parse_chunk(r#"{"error":{"message":"overloaded"}}"#),
            StreamAction::Error("overloaded".into())
        );
        assert_eq!(parse_chunk("not json"), StreamAction::Ignore);
    }
}
