//! Base64 helpers for strings, byte buffers and file contents

use std::path::Path;

use base64::{Engine as _, engine::general_purpose};
use tracing::error;

use crate::error::Result;

/// Encode the UTF-8 bytes of `s`.
pub fn encode_base64_string(s: &str) -> String {
    encode_base64_bytes(s.as_bytes())
}

pub fn encode_base64_bytes(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

/// Encode a file's full contents.
///
/// An unreadable file is logged and encoded as empty content, so callers get an
/// empty string rather than an error.
pub fn encode_base64_file(path: impl AsRef<Path>) -> String {
    let path = path.as_ref();
    let data = std::fs::read(path).unwrap_or_else(|e| {
        error!(path = %path.display(), error = %e, "Failed to read file for Base64 encoding");
        Vec::new()
    });
    encode_base64_bytes(&data)
}

/// Decode Base64 back to UTF-8 text. Malformed input is an error.
pub fn decode_base64_string(s: &str) -> Result<String> {
    let bytes = general_purpose::STANDARD.decode(s)?;
    Ok(String::from_utf8(bytes)?)
}
