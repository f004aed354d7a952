//! Incremental UTF-8 decoding for byte streams that arrive in chunks.
//!
//! Multi-byte characters split across chunk boundaries are carried over to
//! the next chunk. Invalid sequences are replaced with U+FFFD so decoding
//! always makes forward progress. No transcoding from other encodings.

use std::io::{self, Read};

const READ_CHUNK: usize = 8 * 1024;

/// Accumulates decoded text from byte chunks.
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    text: String,
    // Incomplete trailing sequence from the previous chunk (at most 3 bytes).
    carry: Vec<u8>,
}

impl Utf8ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            text: String::with_capacity(capacity),
            carry: Vec::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn pending(&self) -> &[u8] {
        &self.carry
    }

    pub fn push(&mut self, bytes: &[u8]) {
        let mut remaining = bytes;
        while !self.carry.is_empty() && !remaining.is_empty() {
            let expected = sequence_len(self.carry[0]);
            if expected == 0 {
                self.text.push('\u{FFFD}');
                self.carry.clear();
                break;
            }
            let needed = expected.saturating_sub(self.carry.len());
            if remaining.len() < needed {
                self.carry.extend_from_slice(remaining);
                return;
            }
            let mut scratch = [0u8; 4];
            let held = self.carry.len();
            scratch[..held].copy_from_slice(&self.carry);
            scratch[held..held + needed].copy_from_slice(&remaining[..needed]);
            self.carry.clear();
            self.decode(&scratch[..held + needed]);
            remaining = &remaining[needed..];
        }
        if !remaining.is_empty() {
            self.decode(remaining);
        }
    }

    /// Flushes any carried bytes (lossy) and returns the decoded text.
    pub fn finish(mut self) -> String {
        if !self.carry.is_empty() {
            self.text.push_str(&String::from_utf8_lossy(&self.carry));
            self.carry.clear();
        }
        self.text
    }

    fn decode(&mut self, mut bytes: &[u8]) {
        while !bytes.is_empty() {
            match std::str::from_utf8(bytes) {
                Ok(s) => {
                    self.text.push_str(s);
                    return;
                }
                Err(err) => {
                    let (valid, rest) = bytes.split_at(err.valid_up_to());
                    self.text.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(len) => {
                            self.text.push('\u{FFFD}');
                            bytes = &rest[len..];
                        }
                        None => {
                            self.carry.extend_from_slice(rest);
                            return;
                        }
                    }
                }
            }
        }
    }
}

fn sequence_len(first: u8) -> usize {
    match first {
        0x00..=0x7F => 1,
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => 0,
    }
}

/// Reads `reader` to the end in fixed-size chunks and decodes it.
///
/// The reader is consumed; callers that open a file hand ownership over so
/// the handle is dropped when this returns, on success or error.
pub fn decode_reader<R: Read>(mut reader: R) -> io::Result<String> {
    let mut decoder = Utf8ChunkDecoder::new();
    let mut buf = [0u8; READ_CHUNK];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        decoder.push(&buf[..n]);
    }
    Ok(decoder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn character_split_across_chunks_is_joined() {
        let mut decoder = Utf8ChunkDecoder::new();
        decoder.push(&[0xC3]);
        assert_eq!(decoder.text(), "");
        assert_eq!(decoder.pending(), &[0xC3]);

        decoder.push(&[0x97, b'x']);
        assert_eq!(decoder.text(), "\u{D7}x");
        assert!(decoder.pending().is_empty());
    }

    #[test]
    fn four_byte_sequence_across_three_chunks() {
        let mut decoder = Utf8ChunkDecoder::new();
        decoder.push(&[0xF0]);
        decoder.push(&[0x9F, 0x98]);
        assert_eq!(decoder.pending(), &[0xF0, 0x9F, 0x98]);
        decoder.push(&[0x80, b'!']);
        assert_eq!(decoder.finish(), "\u{1F600}!");
    }

    #[test]
    fn trailing_partial_sequence_is_carried_again() {
        let mut decoder = Utf8ChunkDecoder::new();
        decoder.push(&[0xE2]);
        decoder.push(&[0x82, 0xAC, 0xE2]);
        assert_eq!(decoder.text(), "\u{20AC}");
        assert_eq!(decoder.pending(), &[0xE2]);
    }

    #[test]
    fn invalid_bytes_become_replacement_characters() {
        let mut decoder = Utf8ChunkDecoder::new();
        decoder.push(&[b'<', 0xFF, b'p', b'>']);
        assert_eq!(decoder.finish(), "<\u{FFFD}p>");
    }

    #[test]
    fn unfinished_sequence_is_flushed_lossily() {
        let mut decoder = Utf8ChunkDecoder::new();
        decoder.push(&[b'a', 0xE2, 0x82]);
        assert_eq!(decoder.finish(), "a\u{FFFD}");
    }

    #[test]
    fn decode_reader_reads_everything() {
        let input = "<p>caf\u{E9}</p>".repeat(2000);
        let text = decode_reader(input.as_bytes()).expect("in-memory read");
        assert_eq!(text, input);
    }
}
