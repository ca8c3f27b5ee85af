use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;

/// Random bytes per nonce (192 bits)
pub const NONCE_BYTES: usize = 24;

/// Generate a fresh server nonce, URL-safe base64 without padding.
///
/// Nonces are never stored, so any nonce the client echoes back is accepted
/// as long as the response hash over it is correct.
pub fn generate() -> String {
    let mut rng = rand::thread_rng();
    let nonce_bytes: [u8; NONCE_BYTES] = rng.gen();
    URL_SAFE_NO_PAD.encode(nonce_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_nonce_shape() {
        let nonce = generate();
        assert_eq!(nonce.len(), 32);
        assert!(nonce
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_nonces_differ() {
        let seen: HashSet<String> = (0..256).map(|_| generate()).collect();
        assert_eq!(seen.len(), 256);
    }
}
