use base64::Engine as _;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Number of random bytes behind every code and token.
pub const TOKEN_BYTES: usize = 32;

/// Random URL-safe token (unpadded base64 of `bytes` random bytes).
pub fn generate_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}

/// Tokens are looked up by their SHA-256 so the store never holds plaintext.
pub fn hash_token(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn credentials_match(expected: &str, provided: &str) -> bool {
    constant_time_eq::constant_time_eq(expected.as_bytes(), provided.as_bytes())
}

/// Splits an `Authorization: Basic ...` value into client id and secret.
pub fn decode_basic_credentials(header_value: &str) -> Option<(String, String)> {
    let b64 = header_value.strip_prefix("Basic ")?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(b64.trim().as_bytes())
        .ok()?;
    let pair = String::from_utf8(decoded).ok()?;
    let (id, secret) = pair.split_once(':')?;
    if id.is_empty() {
        return None;
    }
    Some((id.to_string(), secret.to_string()))
}
