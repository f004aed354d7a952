//! Random-access view over fully decoded markup text.
//!
//! All offsets are byte offsets that fall on UTF-8 boundaries. The structural
//! bytes searched for (`<`, `>`, quotes) are ASCII, so any offset found by a
//! search is a valid boundary.

use crate::error::SourceError;
use crate::span::Span;
use memchr::{memchr, memchr3, memmem};
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct CharSource {
    text: String,
    // Byte offset of the first character of every line.
    line_starts: Vec<usize>,
}

impl CharSource {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut line_starts = vec![0];
        line_starts.extend(memchr::memchr_iter(b'\n', text.as_bytes()).map(|i| i + 1));
        Self { text, line_starts }
    }

    /// Decodes a byte stream chunk by chunk. Invalid UTF-8 is replaced, not
    /// transcoded.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SourceError> {
        let text = tools::decode_reader(reader).map_err(SourceError::Read)?;
        Ok(Self::new(text))
    }

    /// Opens and decodes `path`. The file handle lives only for the duration
    /// of this call.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path).map_err(|source| SourceError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!(target: "markup.source", "reading {}", path.display());
        Self::from_reader(file)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn slice(&self, start: usize, end: usize) -> &str {
        debug_assert!(self.text.is_char_boundary(start));
        debug_assert!(self.text.is_char_boundary(end));
        &self.text[start..end]
    }

    pub fn byte_at(&self, pos: usize) -> Option<u8> {
        self.text.as_bytes().get(pos).copied()
    }

    pub fn find_byte(&self, needle: u8, from: usize) -> Option<usize> {
        let hay = self.text.as_bytes().get(from..)?;
        memchr(needle, hay).map(|i| from + i)
    }

    pub fn find_str(&self, needle: &str, from: usize) -> Option<usize> {
        let hay = self.text.as_bytes().get(from..)?;
        memmem::find(hay, needle.as_bytes()).map(|i| from + i)
    }

    /// Finds `needle` at or after `from`, skipping over anything enclosed in
    /// single or double quotes. An unterminated quote hides the rest of the
    /// input.
    pub fn find_out_of_quotes(&self, needle: u8, from: usize) -> Option<usize> {
        debug_assert!(needle != b'"' && needle != b'\'');
        let bytes = self.text.as_bytes();
        let mut i = from;
        while i < bytes.len() {
            let rel = memchr3(needle, b'"', b'\'', &bytes[i..])?;
            let at = i + rel;
            let b = bytes[at];
            if b == needle {
                return Some(at);
            }
            let close = memchr(b, &bytes[at + 1..])?;
            i = at + 1 + close + 1;
        }
        None
    }

    /// 1-based line and column of `offset`; the column counts characters.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.text.len());
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        let line_start = self.line_starts[line_idx];
        let column = self.text[line_start..offset].chars().count() + 1;
        (line_idx + 1, column)
    }

    pub fn span(&self, start: usize, end: usize) -> Span {
        let (line, column) = self.line_col(start);
        Span::new(start, end, line, column)
    }
}
