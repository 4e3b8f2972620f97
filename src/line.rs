//! Line abstraction consumed by the engines.
//!
//! Engines only need equality and hashing to align sequences. Whitespace-insensitive keys are
//! built from the raw bytes, so undecodable content keeps its identity; the lossy text view
//! is only used for interesting-line matching.

use std::{borrow::Cow, hash::Hash};

use bstr::ByteSlice;

/// An element of a diffed sequence.
pub trait DiffLine: Eq + Hash {
    /// Raw content of the line.
    fn content(&self) -> &[u8];

    /// Text view of the line.
    fn text(&self) -> Cow<'_, str>;
}

impl DiffLine for str {
    fn content(&self) -> &[u8] {
        self.as_bytes()
    }

    fn text(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

impl DiffLine for String {
    fn content(&self) -> &[u8] {
        self.as_bytes()
    }

    fn text(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.as_str())
    }
}

impl DiffLine for [u8] {
    fn content(&self) -> &[u8] {
        self
    }

    fn text(&self) -> Cow<'_, str> {
        self.to_str_lossy()
    }
}

impl DiffLine for Vec<u8> {
    fn content(&self) -> &[u8] {
        self.as_slice()
    }

    fn text(&self) -> Cow<'_, str> {
        self.as_slice().to_str_lossy()
    }
}

impl<T: DiffLine + ?Sized> DiffLine for &T {
    fn content(&self) -> &[u8] {
        (**self).content()
    }

    fn text(&self) -> Cow<'_, str> {
        (**self).text()
    }
}

/// File content already split into lines, as handed over by the storage layer.
///
/// Both sides of a comparison must hold the same kind; see
/// [`get_lines_differ`](crate::differ::get_lines_differ).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lines {
    /// Decoded text lines.
    Text(Vec<String>),
    /// Raw byte lines, for content whose encoding is unknown.
    Bytes(Vec<Vec<u8>>),
}

impl Lines {
    /// Split decoded content into lines, dropping `\n` / `\r\n` terminators.
    pub fn from_text(content: &str) -> Self {
        Lines::Text(content.lines().map(str::to_owned).collect())
    }

    /// Split raw content into lines, dropping `\n` / `\r\n` terminators.
    pub fn from_bytes(content: &[u8]) -> Self {
        Lines::Bytes(content.lines().map(<[u8]>::to_vec).collect())
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Lines::Text(_) => "text",
            Lines::Bytes(_) => "bytes",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Lines::Text(lines) => lines.len(),
            Lines::Bytes(lines) => lines.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_views() {
        assert_eq!("foo".text(), "foo");
        assert_eq!(String::from("bar").text(), "bar");
        assert_eq!(b"baz".to_vec().text(), "baz");
        assert_eq!(b"\xffx".as_slice().text(), "\u{FFFD}x");
        assert_eq!(b"\xffx".to_vec().content(), b"\xffx");
        assert_eq!("foo".content(), b"foo");
    }

    #[test]
    fn test_lines_split() {
        let text = Lines::from_text("a\r\nb\nc");
        assert_eq!(
            text,
            Lines::Text(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );

        let bytes = Lines::from_bytes(b"a\nb\n");
        assert_eq!(bytes, Lines::Bytes(vec![b"a".to_vec(), b"b".to_vec()]));
        assert_eq!(bytes.kind(), "bytes");
        assert_eq!(bytes.len(), 2);
        assert!(Lines::from_text("").is_empty());
    }
}
