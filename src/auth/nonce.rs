use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

/// Number of random bytes behind each CSRF state value
pub const STATE_ENTROPY_BYTES: usize = 32;

/// Generates a fresh CSRF `state` value for an authorization request.
///
/// 32 bytes from the OS random source, base64url without padding (43 chars).
pub fn generate_state() -> String {
    let mut bytes = [0u8; STATE_ENTROPY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compares a returned state against the expected one, byte for byte.
///
/// A missing returned state never matches.
pub fn state_matches(expected: &str, returned: Option<&str>) -> bool {
    match returned {
        Some(returned) => !expected.is_empty() && expected.as_bytes() == returned.as_bytes(),
        None => false,
    }
}
