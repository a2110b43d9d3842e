// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

//! Incremental decoder for `text/event-stream` chat completion bodies.
//!
//! Each read from the network is decoded as UTF-8 (an incomplete trailing
//! character waits for the next read), split into lines, and every `data:`
//! line is parsed on its own. A line that fails to parse is dropped and the
//! stream keeps going, so a corrupt frame costs at most its own delta.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use log::debug;
use serde::Deserialize;
use thiserror::Error;

use crate::document::DocumentSink;
use crate::llm::error::ChatResult;

const DONE_SENTINEL: &str = "[DONE]";

/// Text contributed by one stream event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    pub text: Option<String>,
}

/// A single stream line that is not a valid event payload.
#[derive(Debug, Error)]
#[error("Failed to parse stream frame `{line}`: {source}")]
pub struct ParseError {
    pub line: String,
    #[source]
    pub source: serde_json::Error,
}

#[derive(Debug, Deserialize)]
struct StreamFrame {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

/// Parse one SSE line.
///
/// Returns `Ok(None)` for lines that carry no event: blank lines, `:` comments
/// and the `[DONE]` sentinel.
pub fn parse_line(line: &str) -> Result<Option<Delta>, ParseError> {
    let line = line.trim_start();
    if line.starts_with(':') {
        return Ok(None);
    }

    let payload = line.strip_prefix("data:").unwrap_or(line).trim();
    if payload.is_empty() || payload == DONE_SENTINEL {
        return Ok(None);
    }

    let frame: StreamFrame = serde_json::from_str(payload).map_err(|source| ParseError {
        line: payload.to_string(),
        source,
    })?;

    let text = frame
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta)
        .and_then(|delta| delta.content);

    Ok(Some(Delta { text }))
}

/// Accumulates the text of a streamed completion.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    text: String,
    pending_bytes: Vec<u8>,
    pending_line: String,
    skipped: usize,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text accumulated so far. Only ever grows.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of lines dropped because they failed to parse.
    pub fn skipped_frames(&self) -> usize {
        self.skipped
    }

    /// Consume one read from the underlying source.
    pub fn feed(&mut self, chunk: &[u8]) {
        self.pending_bytes.extend_from_slice(chunk);
        let decoded = decode_utf8(&mut self.pending_bytes);

        let mut buffer = std::mem::take(&mut self.pending_line);
        buffer.push_str(&decoded);

        let mut segments: Vec<&str> = buffer.split('\n').collect();
        // split always yields a last segment; it is empty when the read ended on a newline
        let tail = segments.pop().unwrap_or_default();

        for line in segments {
            let parsed = parse_line(line);
            self.fold(parsed);
        }

        // Only an unterminated tail that already yields an event is taken now;
        // anything else may be a frame, comment or prefix cut by the read boundary.
        match parse_line(tail) {
            Ok(Some(delta)) => self.fold(Ok(Some(delta))),
            _ => self.pending_line = tail.to_string(),
        }
    }

    /// Flush whatever is still buffered and return the final text.
    pub fn finish(mut self) -> String {
        if !self.pending_bytes.is_empty() {
            let rest = String::from_utf8_lossy(&self.pending_bytes).into_owned();
            self.pending_bytes.clear();
            self.pending_line.push_str(&rest);
        }

        let tail = std::mem::take(&mut self.pending_line);
        if !tail.trim().is_empty() {
            let parsed = parse_line(&tail);
            self.fold(parsed);
        }

        if self.skipped > 0 {
            debug!("Stream finished with {} malformed frame(s) skipped", self.skipped);
        }
        self.text
    }

    fn fold(&mut self, parsed: Result<Option<Delta>, ParseError>) {
        match parsed {
            Ok(Some(Delta { text: Some(text) })) => self.text.push_str(&text),
            Ok(_) => {}
            Err(e) => {
                self.skipped += 1;
                debug!("Skipping malformed stream frame: {}", e);
            }
        }
    }
}

/// Decode the complete UTF-8 prefix of `pending`, leaving an incomplete trailing sequence behind.
fn decode_utf8(pending: &mut Vec<u8>) -> String {
    let mut out = String::new();
    let mut start = 0;

    while start < pending.len() {
        match std::str::from_utf8(&pending[start..]) {
            Ok(valid) => {
                out.push_str(valid);
                start = pending.len();
            }
            Err(e) => {
                let valid_end = start + e.valid_up_to();
                out.push_str(std::str::from_utf8(&pending[start..valid_end]).unwrap_or_default());
                match e.error_len() {
                    Some(len) => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        start = valid_end + len;
                    }
                    None => {
                        start = valid_end;
                        break;
                    }
                }
            }
        }
    }

    pending.drain(..start);
    out
}

/// Read `stream` to its end, writing the accumulated text to `node_id` after every read.
///
/// The loop stops when the source is exhausted, not at `[DONE]`: a server that
/// keeps the connection open after the sentinel keeps this future pending.
pub async fn decode_stream<S, K>(
    mut stream: S,
    sink: &K,
    node_id: Option<&str>,
) -> ChatResult<String>
where
    S: Stream<Item = ChatResult<Bytes>> + Unpin,
    K: DocumentSink + ?Sized,
{
    let mut decoder = StreamDecoder::new();
    let mut reads = 0usize;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        reads += 1;
        decoder.feed(&chunk);

        if let Some(id) = node_id {
            sink.update_node(id, decoder.text()).await?;
        }
    }

    let streamed_len = decoder.text().len();
    let text = decoder.finish();
    if text.len() != streamed_len {
        if let Some(id) = node_id {
            sink.update_node(id, &text).await?;
        }
    }

    debug!("Stream closed after {} read(s), {} bytes of text", reads, text.len());
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryDocument;
    use crate::llm::ChatError;
    use futures::stream;

    fn frame(content: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [{"index": 0, "delta": {"content": content}}]})
        )
    }

    fn decode_all(chunks: &[&[u8]]) -> String {
        let mut decoder = StreamDecoder::new();
        for chunk in chunks {
            decoder.feed(chunk);
        }
        decoder.finish()
    }

    #[test]
    fn test_parse_line() {
        let delta = parse_line(r#"data: {"choices":[{"delta":{"content":"Hello"}}]}"#).unwrap();
        assert_eq!(delta, Some(Delta { text: Some("Hello".to_string()) }));

        let delta = parse_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}  "#).unwrap();
        assert_eq!(delta, Some(Delta { text: None }));

        assert_eq!(parse_line("data: [DONE]").unwrap(), None);
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("   \r").unwrap(), None);
        assert_eq!(parse_line(": keep-alive").unwrap(), None);

        let err = parse_line("data: {invalid json}").unwrap_err();
        assert_eq!(err.line, "{invalid json}");
    }

    #[test]
    fn test_parse_line_without_choices() {
        let delta = parse_line(r#"data: {"choices":[],"usage":{"total_tokens":3}}"#).unwrap();
        assert_eq!(delta, Some(Delta { text: None }));
    }

    #[test]
    fn test_concatenates_deltas_in_order() {
        let first = format!("{}{}", frame("Hel"), frame("lo"));
        let second = format!("{}data: [DONE]\n\n", frame(", world"));

        let text = decode_all(&[first.as_bytes(), second.as_bytes()]);
        assert_eq!(text, "Hello, world");
    }

    #[test]
    fn test_corrupt_line_costs_only_its_own_delta() {
        let chunk = format!(
            "{}data: {{\"choices\":[{{\"delta\":{{\"content\":\"lost\"\n\n{}",
            frame("a"),
            frame("b")
        );
        let mut decoder = StreamDecoder::new();
        decoder.feed(chunk.as_bytes());
        decoder.feed(frame("c").as_bytes());

        assert_eq!(decoder.skipped_frames(), 1);
        assert_eq!(decoder.finish(), "abc");
    }

    #[test]
    fn test_frame_split_across_reads() {
        let whole = frame("split");
        let (left, right) = whole.as_bytes().split_at(20);

        let mut decoder = StreamDecoder::new();
        decoder.feed(left);
        assert_eq!(decoder.text(), "");
        decoder.feed(right);
        assert_eq!(decoder.text(), "split");
        assert_eq!(decoder.skipped_frames(), 0);
    }

    #[test]
    fn test_multibyte_character_split_across_reads() {
        let whole = frame("héllo 世界");
        let bytes = whole.as_bytes();
        let cut = whole.find('世').unwrap() + 1;

        let text = decode_all(&[&bytes[..cut], &bytes[cut..]]);
        assert_eq!(text, "héllo 世界");
    }

    #[test]
    fn test_unterminated_last_frame() {
        let chunk = r#"data: {"choices":[{"delta":{"content":"tail"}}]}"#;
        let mut decoder = StreamDecoder::new();
        decoder.feed(chunk.as_bytes());
        assert_eq!(decoder.text(), "tail");
        assert_eq!(decoder.finish(), "tail");
    }

    #[test]
    fn test_comment_split_across_reads_is_not_a_skipped_frame() {
        let whole = format!(": ping\n\n{}{}data: [DONE]\n\n", frame("Hel"), frame("lo"));

        for size in 1..=7 {
            let mut decoder = StreamDecoder::new();
            for chunk in whole.as_bytes().chunks(size) {
                decoder.feed(chunk);
            }
            assert_eq!(decoder.skipped_frames(), 0, "chunk size {}", size);
            assert_eq!(decoder.finish(), "Hello", "chunk size {}", size);
        }
    }

    #[test]
    fn test_split_data_prefix_is_carried() {
        let mut decoder = StreamDecoder::new();
        decoder.feed(b"data:");
        decoder.feed(br#" {"choices":[{"delta":{"content":"x"}}]}"#);
        decoder.feed(b"\n\n");

        assert_eq!(decoder.skipped_frames(), 0);
        assert_eq!(decoder.finish(), "x");
    }

    #[test]
    fn test_done_is_not_a_stop_signal() {
        let chunk = format!("{}data: [DONE]\n\n{}", frame("x"), frame("y"));
        assert_eq!(decode_all(&[chunk.as_bytes()]), "xy");
    }

    #[test]
    fn test_truncated_stream_drops_partial_frame() {
        let whole = frame("never");
        let text = decode_all(&[frame("ok").as_bytes(), &whole.as_bytes()[..15]]);
        assert_eq!(text, "ok");
    }

    #[tokio::test]
    async fn test_decode_stream_writes_once_per_read() {
        let doc = MemoryDocument::new();
        let root = doc.add_root("page");
        let node = doc.add_child(&root, "loading...").unwrap();

        let chunks = vec![
            Ok(Bytes::from(format!("{}{}", frame("one "), frame("two ")))),
            Ok(Bytes::from(frame("three"))),
            Ok(Bytes::from("data: [DONE]\n\n")),
        ];

        let text = decode_stream(stream::iter(chunks), &doc, Some(node.as_str()))
            .await
            .unwrap();

        assert_eq!(text, "one two three");
        let writes: Vec<String> = doc
            .updates()
            .into_iter()
            .filter(|(id, _)| *id == node)
            .map(|(_, text)| text)
            .collect();
        assert_eq!(
            writes,
            vec![
                "one two ".to_string(),
                "one two three".to_string(),
                "one two three".to_string()
            ]
        );
        assert_eq!(doc.content(&node).as_deref(), Some("one two three"));
    }

    #[tokio::test]
    async fn test_decode_stream_propagates_read_errors() {
        let doc = MemoryDocument::new();
        let chunks = vec![
            Ok(Bytes::from(frame("partial"))),
            Err(ChatError::api(None, "Network request failed: reset")),
        ];

        let err = decode_stream(stream::iter(chunks), &doc, None).await.unwrap_err();
        assert!(err.to_string().contains("reset"));
        assert!(doc.updates().is_empty());
    }
}
