//! PKCE (Proof Key for Code Exchange) implementation.
//!
//! This implements RFC 7636 for a public client with no client secret.
//!
//! SECURITY: Only the S256 challenge method is supported.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::Rng;
use sha2::{Digest, Sha256};

/// PKCE challenge method sent with the authorization request.
pub const CHALLENGE_METHOD: &str = "S256";

/// Number of random bytes behind a verifier (43 base64url characters).
const VERIFIER_BYTES: usize = 32;

/// PKCE code verifier and challenge pair.
#[derive(Clone)]
pub struct PkceChallenge {
    /// The code verifier (secret, kept client-side).
    pub verifier: String,
    /// The code challenge (SHA-256 hash of verifier, sent to authorization server).
    pub challenge: String,
}

impl PkceChallenge {
    /// Generate a fresh verifier and its S256 challenge.
    pub fn new() -> Self {
        Self::from_verifier(create_code_verifier())
    }

    /// Create a PKCE challenge from an existing verifier.
    pub fn from_verifier(verifier: String) -> Self {
        let challenge = create_code_challenge(&verifier);
        Self {
            verifier,
            challenge,
        }
    }
}

impl Default for PkceChallenge {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PkceChallenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkceChallenge")
            .field("verifier", &"***")
            .field("challenge", &self.challenge)
            .finish()
    }
}

/// Base64url without padding: `+` becomes `-`, `/` becomes `_`, no `=`.
pub fn base64_url_encode(bytes: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// 32 cryptographically random bytes, base64url-encoded.
pub fn create_code_verifier() -> String {
    base64_url_encode(random_bytes::<VERIFIER_BYTES>())
}

/// S256: BASE64URL(SHA256(ASCII(code_verifier)))
pub fn create_code_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    base64_url_encode(hasher.finalize())
}

pub(crate) fn random_bytes<const N: usize>() -> [u8; N] {
    let mut rng = rand::rng();
    let mut bytes = [0u8; N];
    for byte in bytes.iter_mut() {
        *byte = rng.random();
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pkce_generation() {
        let pkce = PkceChallenge::new();

        // 32 bytes base64url encoded
        assert_eq!(pkce.verifier.len(), 43);
        // SHA-256 digest base64url encoded
        assert_eq!(pkce.challenge.len(), 43);
        assert_ne!(pkce.verifier, pkce.challenge);
    }

    #[test]
    fn test_base64_url_encode_known_value() {
        assert_eq!(base64_url_encode(b"thisisatest"), "dGhpc2lzYXRlc3Q");
    }

    #[test]
    fn test_base64_url_encode_replaces_unsafe_characters() {
        // 0xfb 0xff encodes to "+/8=" in standard base64
        assert_eq!(base64_url_encode([0xfb, 0xff]), "-_8");

        for len in 0..64u8 {
            let bytes: Vec<u8> = (0..len).map(|i| i.wrapping_mul(37).wrapping_add(251)).collect();
            let encoded = base64_url_encode(&bytes);
            assert!(
                !encoded.contains(['+', '/', '=']),
                "unsafe character in {encoded}"
            );
        }
    }

    #[test]
    fn test_rfc7636_appendix_b_vector() {
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        assert_eq!(
            create_code_challenge(verifier),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_pkce_deterministic() {
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        let pkce1 = PkceChallenge::from_verifier(verifier.to_string());
        let pkce2 = PkceChallenge::from_verifier(verifier.to_string());

        assert_eq!(pkce1.challenge, pkce2.challenge);
    }

    #[test]
    fn test_verifier_character_set() {
        for _ in 0..100 {
            let verifier = create_code_verifier();
            for c in verifier.chars() {
                assert!(
                    c.is_ascii_alphanumeric() || c == '-' || c == '_',
                    "Invalid character in verifier: {c}"
                );
            }
        }
    }

    #[test]
    fn test_debug_hides_verifier() {
        let pkce = PkceChallenge::from_verifier("super-secret-verifier".to_string());
        assert!(!format!("{pkce:?}").contains("super-secret-verifier"));
    }
}
