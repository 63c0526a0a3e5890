//! Incremental splitting of a byte stream into text lines.

use std::mem;

const BYTE_ORDER_MARK: char = '\u{FEFF}';

/// Turns arbitrarily chunked bytes into complete lines.
///
/// UTF-8 sequences split across chunks are reassembled before decoding;
/// invalid sequences decode to U+FFFD. One byte order mark at the very start
/// of the stream is dropped. Lines end at `\n` and lose a trailing `\r`.
/// Text after the last `\n` waits for more input and is never emitted on its
/// own.
#[derive(Debug, Default)]
pub struct ChunkDecoder {
    /// Undecoded tail of an incomplete UTF-8 sequence.
    pending: Vec<u8>,
    /// Decoded text of the current, unterminated line.
    line: String,
    /// Set once the first character of the stream has been decoded.
    started: bool,
}

impl ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one chunk and returns every line it completes, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut text = self.decode(chunk);
        if !self.started && !text.is_empty() {
            self.started = true;
            if let Some(rest) = text.strip_prefix(BYTE_ORDER_MARK) {
                text = rest.to_string();
            }
        }
        let mut lines = Vec::new();
        for piece in text.split_inclusive('\n') {
            self.line.push_str(piece);
            if self.line.ends_with('\n') {
                let mut line = mem::take(&mut self.line);
                line.pop();
                if line.ends_with('\r') {
                    line.pop();
                }
                lines.push(line);
            }
        }
        lines
    }

    /// Ends decoding and returns the unterminated remainder, if any.
    ///
    /// The remainder is not a line; callers report it and drop it.
    pub fn finish(self) -> Option<String> {
        let mut rest = self.line;
        if !self.pending.is_empty() {
            rest.push_str(&String::from_utf8_lossy(&self.pending));
        }
        (!rest.is_empty()).then_some(rest)
    }

    fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let bytes = mem::take(&mut self.pending);
        let mut text = String::with_capacity(bytes.len());
        let mut rest = bytes.as_slice();

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    break;
                }
                Err(error) => {
                    let (valid, after) = rest.split_at(error.valid_up_to());
                    text.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match error.error_len() {
                        Some(invalid_len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[invalid_len..];
                        }
                        None => {
                            self.pending = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        text
    }
}
