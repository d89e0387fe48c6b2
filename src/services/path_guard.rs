//! Request path screening and percent-coding helpers.
//!
//! Paths are screened for traversal patterns both as received and after
//! decoding, so `%2e%2e` and `%2f%2f` are caught as well as the literal forms.

use percent_encoding::percent_decode_str;
use thiserror::Error;

const TRAVERSAL_PATTERNS: [&str; 2] = ["..", "//"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid percent escape at byte {0}")]
    InvalidEscape(usize),
    #[error("decoded path is not valid UTF-8")]
    InvalidUtf8,
}

/// Whether `path` contains `..` or `//`.
pub fn is_suspicious(path: &str) -> bool {
    TRAVERSAL_PATTERNS.iter().any(|p| path.contains(p))
}

/// Query-unescape `raw`: `+` becomes a space and every `%` must start a
/// two-digit hex escape.
pub fn decode_path(raw: &str) -> Result<String, DecodeError> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return Err(DecodeError::InvalidEscape(i));
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| DecodeError::InvalidUtf8)
}

/// Form-encode a key for use as a single URL path segment (`/` -> `%2F`,
/// space -> `+`). Inverse of [`decode_path`].
pub fn encode_key(key: &str) -> String {
    form_urlencoded::byte_serialize(key.as_bytes()).collect()
}
