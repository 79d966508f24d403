//! PKCE verifier and S256 challenge for the authorisation code flow.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Verifier kept locally plus the challenge sent to the provider.
pub(super) struct PkcePair {
    verifier: Zeroizing<String>,
    challenge: String,
}

impl PkcePair {
    /// Fresh random pair. The verifier is 64 URL-safe characters.
    pub(super) fn generate() -> Self {
        let mut random_bytes = [0_u8; 48];
        rand::thread_rng().fill_bytes(&mut random_bytes);
        let verifier = Zeroizing::new(URL_SAFE_NO_PAD.encode(random_bytes));
        let challenge = code_challenge(&verifier);
        Self {
            verifier,
            challenge,
        }
    }

    pub(super) fn verifier(&self) -> &str {
        &self.verifier
    }

    pub(super) fn challenge(&self) -> &str {
        &self.challenge
    }
}

/// `BASE64URL(SHA256(verifier))`
fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}
