//! Digest: raw text to a handful of key points.
//!
//! The only strategy today is [`FirstLines`]: keep the first few non-blank
//! lines. It is a placeholder. Anything implementing [`Digester`] can replace
//! it without the ingestion pipeline noticing.

use thiserror::Error;

/// Points kept by the default strategy.
pub const DEFAULT_POINTS: usize = 5;

#[derive(Debug, Error, PartialEq)]
pub enum DigestError {
    #[error("input is empty or whitespace only")]
    EmptyInput,
}

/// Strategy that turns raw text into an ordered list of key points.
pub trait Digester {
    fn digest(&self, text: &str) -> Result<Vec<String>, DigestError>;
}

/// Crude digest: first `limit` non-blank lines, trimmed, in original order.
#[derive(Debug, Clone, Copy)]
pub struct FirstLines {
    pub limit: usize,
}

impl Default for FirstLines {
    fn default() -> Self {
        Self {
            limit: DEFAULT_POINTS,
        }
    }
}

impl Digester for FirstLines {
    fn digest(&self, text: &str) -> Result<Vec<String>, DigestError> {
        if text.trim().is_empty() {
            return Err(DigestError::EmptyInput);
        }
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .take(self.limit)
            .map(str::to_string)
            .collect())
    }
}

/// Digest with the default strategy.
pub fn digest(text: &str) -> Result<Vec<String>, DigestError> {
    FirstLines::default().digest(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_first_five_non_blank_lines() {
        let points = digest("Hello\n\nWorld\nFoo\nBar\nBaz\nQux").unwrap();
        assert_eq!(points, vec!["Hello", "World", "Foo", "Bar", "Baz"]);
    }

    #[test]
    fn whitespace_only_is_empty_input() {
        assert_eq!(digest(""), Err(DigestError::EmptyInput));
        assert_eq!(digest("  \n\t\n  "), Err(DigestError::EmptyInput));
    }

    #[test]
    fn trims_lines_and_handles_crlf() {
        let points = digest("  one  \r\n\r\n two\r\n").unwrap();
        assert_eq!(points, vec!["one", "two"]);
    }

    #[test]
    fn custom_limit() {
        let d = FirstLines { limit: 2 };
        assert_eq!(d.digest("a\nb\nc").unwrap(), vec!["a", "b"]);
    }
}
