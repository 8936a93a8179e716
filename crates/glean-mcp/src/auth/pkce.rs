//! PKCE (Proof Key for Code Exchange) for the device flow.
//!
//! Implements S256 code challenges per RFC 7636.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use sha2::{Digest, Sha256};

/// The only challenge method we send.
pub const S256: &str = "S256";

/// Characters allowed in a verifier (RFC 7636 unreserved characters).
const VERIFIER_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

/// Verifier length (RFC 7636 allows 43..=128).
const VERIFIER_LENGTH: usize = 64;

/// A verifier and its S256 challenge.
#[derive(Clone, PartialEq, Eq)]
pub struct Pkce {
    /// Secret sent with the token request.
    pub verifier: String,
    /// `BASE64URL(SHA256(verifier))`, sent with the device authorization request.
    pub challenge: String,
}

impl Pkce {
    /// Generate a random verifier/challenge pair.
    #[must_use]
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let verifier: String = (0..VERIFIER_LENGTH)
            .map(|_| VERIFIER_CHARS[rng.random_range(0..VERIFIER_CHARS.len())] as char)
            .collect();
        Self::from_verifier(verifier)
    }

    /// Derive the challenge for a known verifier.
    #[must_use]
    pub fn from_verifier(verifier: impl Into<String>) -> Self {
        let verifier = verifier.into();
        let challenge = challenge_s256(&verifier);
        Self { verifier, challenge }
    }

    /// Challenge method sent alongside the challenge.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        S256
    }
}

impl std::fmt::Debug for Pkce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pkce").field("challenge", &self.challenge).finish()
    }
}

/// Compute `BASE64URL(SHA256(code_verifier))`.
#[must_use]
pub fn challenge_s256(code_verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(code_verifier.as_bytes()))
}

/// Verify a PKCE S256 code challenge.
#[must_use]
pub fn verify_s256(code_verifier: &str, code_challenge: &str) -> bool {
    challenge_s256(code_verifier) == code_challenge
}
