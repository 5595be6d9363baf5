//! Line framing for streamed response bodies
//!
//! Network chunks split lines (and multi-byte characters) at arbitrary
//! points, so bytes are buffered until a full line is available and only then
//! decoded. A line that is not valid UTF-8 is dropped whole, like any other
//! malformed event.

use std::collections::VecDeque;

/// Incremental `\n`-delimited line decoder
#[derive(Debug, Default)]
pub struct LineDecoder {
    partial: Vec<u8>,
    ready: VecDeque<String>,
}

impl LineDecoder {
    /// Create an empty decoder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes
    pub fn push(&mut self, chunk: &[u8]) {
        let mut rest = chunk;
        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            self.partial.extend_from_slice(&rest[..pos]);
            let line = std::mem::take(&mut self.partial);
            self.ready.extend(decode(&line));
            rest = &rest[pos + 1..];
        }
        self.partial.extend_from_slice(rest);
    }

    /// Next complete line, without its terminator
    pub fn next_line(&mut self) -> Option<String> {
        self.ready.pop_front()
    }

    /// Treat buffered bytes as a final unterminated line
    pub fn finish(&mut self) {
        if !self.partial.is_empty() {
            let line = std::mem::take(&mut self.partial);
            self.ready.extend(decode(&line));
        }
    }
}

fn decode(line: &[u8]) -> Option<String> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    match std::str::from_utf8(line) {
        Ok(text) => Some(text.to_string()),
        Err(err) => {
            tracing::trace!(error = %err, len = line.len(), "Skipping line that is not UTF-8");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_across_chunks() {
        let mut decoder = LineDecoder::new();
        decoder.push(b"data: one\r\nda");
        assert_eq!(decoder.next_line().as_deref(), Some("data: one"));
        assert_eq!(decoder.next_line(), None);

        decoder.push(b"ta: two\n\n");
        assert_eq!(decoder.next_line().as_deref(), Some("data: two"));
        assert_eq!(decoder.next_line().as_deref(), Some(""));
    }

    #[test]
    fn test_multibyte_split_between_chunks() {
        let mut decoder = LineDecoder::new();
        let text = "héllo\n".as_bytes();
        decoder.push(&text[..2]);
        decoder.push(&text[2..]);
        assert_eq!(decoder.next_line().as_deref(), Some("héllo"));
    }

    #[test]
    fn test_invalid_utf8_line_is_dropped() {
        let mut decoder = LineDecoder::new();
        decoder.push(b"data: a\xff\ndata: ok\n");
        assert_eq!(decoder.next_line().as_deref(), Some("data: ok"));
        assert_eq!(decoder.next_line(), None);

        decoder.push(b"\xc3");
        decoder.finish();
        assert_eq!(decoder.next_line(), None);
    }

    #[test]
    fn test_finish_flushes_partial() {
        let mut decoder = LineDecoder::new();
        decoder.push(b"{\"done\":true}");
        assert_eq!(decoder.next_line(), None);
        decoder.finish();
        assert_eq!(decoder.next_line().as_deref(), Some("{\"done\":true}"));
        decoder.finish();
        assert_eq!(decoder.next_line(), None);
    }
}
