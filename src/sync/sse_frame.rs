//! Incremental decoder for `text/event-stream` bodies as delivered by the relay.

use tracing::warn;

/// Longest unterminated line kept before the pending input is discarded.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseFrame {
    /// Value of the last `event:` field, if any.
    pub event: Option<String>,
    /// `data:` lines joined with `\n`.
    pub data: String,
}

/// Accumulates body chunks and yields complete frames.
///
/// Chunks may split lines (and UTF-8 sequences) anywhere; only complete lines are
/// interpreted. Comment lines (`:` prefix, used for keep-alives) are skipped and
/// `id:`/`retry:` fields are ignored.
#[derive(Debug, Default)]
pub struct SseFrameDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseFrameDecoder {
    /// Fresh decoder with no pending input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one body chunk, returning every frame it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(end) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=end).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
        }

        if self.buffer.len() > MAX_LINE_BYTES {
            warn!(pending = self.buffer.len(), "event stream line too long; dropping pending frame");
            self.buffer.clear();
            self.event = None;
            self.data.clear();
        }
        frames
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
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
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseFrame { event, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_named_event() {
        let mut decoder = SseFrameDecoder::new();
        let frames = decoder.push(b"event: match.state\ndata: {\"score1\":3}\n\n");
        assert_eq!(
            frames,
            vec![SseFrame {
                event: Some("match.state".into()),
                data: "{\"score1\":3}".into(),
            }]
        );
    }

    #[test]
    fn frames_split_across_chunks() {
        let mut decoder = SseFrameDecoder::new();
        assert!(decoder.push(b"event: match.st").is_empty());
        assert!(decoder.push(b"ate\r\ndata: {\"na").is_empty());
        let frames = decoder.push(b"me1\":\"Ana\"}\r\n\r\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event.as_deref(), Some("match.state"));
        assert_eq!(frames[0].data, "{\"name1\":\"Ana\"}");
    }

    #[test]
    fn keep_alive_comments_are_skipped() {
        let mut decoder = SseFrameDecoder::new();
        assert!(decoder.push(b":keep-alive\n\n").is_empty());
        let frames = decoder.push(b"data: one\ndata: two\n\n");
        assert_eq!(frames[0].event, None);
        assert_eq!(frames[0].data, "one\ntwo");
    }

    #[test]
    fn event_name_does_not_leak_into_next_frame() {
        let mut decoder = SseFrameDecoder::new();
        let frames = decoder.push(b"event: match.state\ndata: a\n\ndata: b\n\n");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].event, None);
    }

    #[test]
    fn oversized_line_is_discarded_and_decoding_recovers() {
        let mut decoder = SseFrameDecoder::new();
        assert!(decoder.push(b"event: match.state\n").is_empty());
        assert!(decoder.push(&vec![b'x'; MAX_LINE_BYTES + 1]).is_empty());
        assert!(decoder.buffer.is_empty());

        let frames = decoder.push(b"\ndata: ok\n\n");
        assert_eq!(
            frames,
            vec![SseFrame {
                event: None,
                data: "ok".into(),
            }]
        );
    }
}
