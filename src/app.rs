//! Application key and secret generation

use ring::digest::{SHA1_FOR_LEGACY_USE_ONLY, digest};
use uuid::Uuid;

const KEY_ALPHABET: &[u8; 62] = b"abcdefghijklmnopqrstuvwxyz0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generate an 8-character application key.
///
/// The 32 hex digits of a random UUID are split into eight groups of four; each
/// group's value modulo 62 picks one alphanumeric character.
pub fn app_key() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    hex.as_bytes()
        .chunks(4)
        .map(|group| {
            let value = group
                .iter()
                .fold(0usize, |acc, &digit| acc * 16 + hex_value(digit));
            KEY_ALPHABET[value % KEY_ALPHABET.len()] as char
        })
        .collect()
}

/// Derive the secret for an application: SHA-1 over the two inputs sorted and
/// concatenated, as lowercase hex.
pub fn app_secret(app_id: &str, server_name: &str) -> String {
    let mut parts = [app_id, server_name];
    parts.sort_unstable();

    digest(&SHA1_FOR_LEGACY_USE_ONLY, parts.concat().as_bytes())
        .as_ref()
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
}

fn hex_value(digit: u8) -> usize {
    match digit {
        b'0'..=b'9' => (digit - b'0') as usize,
        b'a'..=b'f' => (digit - b'a' + 10) as usize,
        b'A'..=b'F' => (digit - b'A' + 10) as usize,
        _ => 0,
    }
}
