//! Header field collection and field-line parsing.
//!
//! # Responsibilities
//! - Store header fields under lower-cased keys
//! - Merge repeated fields into one comma-separated value
//! - Parse one `Key: Value` field line at a time from wire bytes
//!
//! # Design Decisions
//! - The underlying map is never exposed, so key normalization cannot be bypassed
//! - Parsing consumes at most one line per call; the caller drives the loop
//! - Keys must be RFC 9110 tokens; values are kept as opaque text

use std::collections::hash_map;
use std::collections::HashMap;

use thiserror::Error;

/// Line terminator used throughout the protocol text framing.
pub const CRLF: &[u8] = b"\r\n";

/// Errors produced while parsing a header field line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeaderError {
    /// The line has no colon separating key and value.
    #[error("field line does not consist of a key and a value: {0}")]
    Malformed(String),

    /// The key is empty once leading spaces are removed.
    #[error("field line has an empty key: {0}")]
    EmptyKey(String),

    /// Whitespace between the key and the colon.
    #[error("header key cannot have whitespace before ':': {0:?}")]
    WhitespaceBeforeColon(String),

    /// The key contains a byte outside the token alphabet.
    #[error("header key contains illegal character {byte:#04x}: {key}")]
    InvalidKey { key: String, byte: u8 },

    /// The value is not valid UTF-8.
    #[error("header value for {0} is not valid UTF-8")]
    InvalidValue(String),
}

/// Case-insensitive header collection with merge-on-duplicate semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    fields: HashMap<String, String>,
}

impl HeaderMap {
    /// Create an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a field, ignoring the case of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(&key.to_ascii_lowercase()).map(String::as_str)
    }

    /// Whether a field is present, ignoring case.
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(&key.to_ascii_lowercase())
    }

    /// Insert a field. A field that is already present gets `", " + value`
    /// appended instead of being replaced.
    pub fn set(&mut self, key: &str, value: &str) {
        match self.fields.entry(key.to_ascii_lowercase()) {
            hash_map::Entry::Occupied(mut entry) => {
                let current = entry.get_mut();
                current.push_str(", ");
                current.push_str(value);
            }
            hash_map::Entry::Vacant(entry) => {
                entry.insert(value.to_string());
            }
        }
    }

    /// Insert a field, overwriting any existing value.
    pub fn update(&mut self, key: &str, value: &str) {
        self.fields.insert(key.to_ascii_lowercase(), value.to_string());
    }

    /// Remove a field, returning its value if it was present.
    pub fn delete(&mut self, key: &str) -> Option<String> {
        self.fields.remove(&key.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over `(key, value)` pairs. Keys are lower-case; order is unspecified.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Consume at most one field line from `data`.
    ///
    /// Returns `(consumed, done)`:
    /// - `(0, false)` when no complete line is buffered yet,
    /// - `(2, true)` when `data` starts with the blank line ending the section,
    /// - `(line_len + 2, false)` after storing one field.
    pub fn parse(&mut self, data: &[u8]) -> Result<(usize, bool), HeaderError> {
        let Some(idx) = find_crlf(data) else {
            return Ok((0, false));
        };

        if idx == 0 {
            return Ok((CRLF.len(), true));
        }

        let (key, value) = parse_field_line(&data[..idx])?;
        self.set(&key, &value);

        Ok((idx + CRLF.len(), false))
    }

    /// Serialize every field as `key: value\r\n` into `out`.
    pub(crate) fn write_field_lines(&self, out: &mut Vec<u8>) {
        for (key, value) in self.iter() {
            out.extend_from_slice(key.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(CRLF);
        }
    }
}

/// Position of the first CRLF in `data`, if any.
pub(crate) fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(CRLF.len()).position(|window| window == CRLF)
}

/// Check if a byte is a valid token character per RFC 9110.
pub(crate) fn is_tchar(b: u8) -> bool {
    matches!(b,
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' |
        b'^' | b'_' | b'`' | b'|' | b'~' | b'0'..=b'9' | b'A'..=b'Z' | b'a'..=b'z'
    )
}

/// Split a field line (without its terminator) into a validated key and a trimmed value.
fn parse_field_line(line: &[u8]) -> Result<(String, String), HeaderError> {
    let lossy = || String::from_utf8_lossy(line).into_owned();

    let Some(colon) = line.iter().position(|&b| b == b':') else {
        return Err(HeaderError::Malformed(lossy()));
    };
    let (raw_key, raw_value) = (&line[..colon], &line[colon + 1..]);

    let start = raw_key.iter().position(|&b| b != b' ').unwrap_or(raw_key.len());
    let key = &raw_key[start..];

    match key.last() {
        None => return Err(HeaderError::EmptyKey(lossy())),
        Some(b' ' | b'\t') => {
            return Err(HeaderError::WhitespaceBeforeColon(
                String::from_utf8_lossy(key).into_owned(),
            ))
        }
        Some(_) => {}
    }

    if let Some(&byte) = key.iter().find(|&&b| !is_tchar(b)) {
        return Err(HeaderError::InvalidKey {
            key: String::from_utf8_lossy(key).into_owned(),
            byte,
        });
    }
    // All token characters are ASCII.
    let key = String::from_utf8_lossy(key).into_owned();

    let value = std::str::from_utf8(raw_value)
        .map_err(|_| HeaderError::InvalidValue(key.clone()))?
        .trim_matches(' ')
        .to_string();

    Ok((key, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_single_header() {
        let mut headers = HeaderMap::new();
        let data = b"Host: localhost:42069\r\n\r\n";
        let (n, done) = headers.parse(data).unwrap();
        assert_eq!(headers.get("host"), Some("localhost:42069"));
        assert_eq!(n, 23);
        assert!(!done);
    }

    #[test]
    fn test_extra_whitespace_is_trimmed() {
        let mut headers = HeaderMap::new();
        let data = b"     Host:      localhost:42069       \r\n\r\n";
        let (n, done) = headers.parse(data).unwrap();
        assert_eq!(headers.get("host"), Some("localhost:42069"));
        assert_eq!(n, 40);
        assert!(!done);
    }

    #[test]
    fn test_existing_headers_are_kept() {
        let mut headers = HeaderMap::new();
        headers.set("User-Agent", "boots");
        let (n, _) = headers.parse(b"Host: localhost:42069\r\n\r\n").unwrap();
        assert_eq!(n, 23);
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("user-agent"), Some("boots"));
    }

    #[test]
    fn test_blank_line_ends_section() {
        let mut headers = HeaderMap::new();
        let data = b"Host: localhost:42069\r\n\r\n";
        let (n, done) = headers.parse(data).unwrap();
        assert!(!done);

        let (n2, done) = headers.parse(&data[n..]).unwrap();
        assert_eq!(n2, 2);
        assert!(done);
    }

    #[test]
    fn test_incomplete_line_needs_more_bytes() {
        let mut headers = HeaderMap::new();
        assert_eq!(headers.parse(b"Host: local").unwrap(), (0, false));
        assert_eq!(headers.parse(b"Host: localhost\r").unwrap(), (0, false));
        assert!(headers.is_empty());
    }

    #[test]
    fn test_whitespace_before_colon_rejected() {
        let mut headers = HeaderMap::new();
        let err = headers
            .parse(b"       Host : localhost:42069       \r\n\r\n")
            .unwrap_err();
        assert!(matches!(err, HeaderError::WhitespaceBeforeColon(_)));
        assert!(headers.is_empty());
    }

    #[test]
    fn test_invalid_key_character_rejected() {
        let mut headers = HeaderMap::new();
        let err = headers
            .parse("H©st: localhost:42069\r\n\r\n".as_bytes())
            .unwrap_err();
        assert!(matches!(err, HeaderError::InvalidKey { .. }));
    }

    #[test]
    fn test_line_without_colon_rejected() {
        let mut headers = HeaderMap::new();
        let err = headers.parse(b"no separator here\r\n").unwrap_err();
        assert!(matches!(err, HeaderError::Malformed(_)));
    }

    #[test]
    fn test_empty_key_rejected() {
        let mut headers = HeaderMap::new();
        let err = headers.parse(b"  : value\r\n").unwrap_err();
        assert!(matches!(err, HeaderError::EmptyKey(_)));
    }

    #[test]
    fn test_repeated_header_merges() {
        let mut headers = HeaderMap::new();
        let (n, _) = headers.parse(b"Set-Person: lane loves go\r\n").unwrap();
        assert_eq!(n, 27);
        headers.parse(b"Set-Person: prime loves zig\r\n").unwrap();
        assert_eq!(
            headers.get("set-person"),
            Some("lane loves go, prime loves zig")
        );
    }

    #[test]
    fn test_lookup_ignores_case() {
        let mut headers = HeaderMap::new();
        headers.set("Content-TYPE", "text/plain");
        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("text/plain"));
        assert!(headers.contains("Content-Type"));
    }

    #[test]
    fn test_update_overwrites_and_delete_removes() {
        let mut headers = HeaderMap::new();
        headers.set("content-type", "text/plain");
        headers.update("Content-Type", "text/html");
        assert_eq!(headers.get("content-type"), Some("text/html"));

        assert_eq!(headers.delete("CONTENT-type").as_deref(), Some("text/html"));
        assert_eq!(headers.get("content-type"), None);
        assert_eq!(headers.delete("content-type"), None);
    }

    #[test]
    fn test_colon_in_value_is_kept() {
        let mut headers = HeaderMap::new();
        headers.parse(b"Referer: http://example.com:80/x\r\n").unwrap();
        assert_eq!(headers.get("referer"), Some("http://example.com:80/x"));
    }

    #[test]
    fn test_field_line_serialization() {
        let mut headers = HeaderMap::new();
        headers.set("X-Checksum", "deadbeef");
        let mut out = Vec::new();
        headers.write_field_lines(&mut out);
        assert_eq!(out, b"x-checksum: deadbeef\r\n");
    }

    #[test]
    fn test_is_tchar() {
        for b in b"!#$%&'*+-.^_`|~09azAZ" {
            assert!(is_tchar(*b), "{} should be a tchar", *b as char);
        }
        for b in b" \t:()<>@,;\\\"/[]?={}" {
            assert!(!is_tchar(*b), "{} should not be a tchar", *b as char);
        }
    }
}
