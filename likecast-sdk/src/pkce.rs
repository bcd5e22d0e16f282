//! PKCE (RFC 7636) helpers for the OAuth2 authorization-code flow.
//!
//! The verifier is 32 random bytes encoded as unpadded base64url (43
//! characters). The challenge is `BASE64URL(SHA256(verifier))`.

use rand::Rng;

/// The only challenge method we emit.
pub const CHALLENGE_METHOD: &str = "S256";

/// A PKCE code verifier. Kept server-side until the callback arrives.
#[derive(Clone, PartialEq, Eq)]
pub struct PkceVerifier(String);

impl PkceVerifier {
    /// Generate a fresh verifier from the thread-local CSPRNG.
    pub fn generate() -> Self {
        Self(random_token::<32>())
    }

    /// Wrap an existing verifier string.
    pub fn from_string(verifier: impl Into<String>) -> Self {
        Self(verifier.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `code_challenge` value for [`CHALLENGE_METHOD`].
    pub fn challenge(&self) -> String {
        let digest = ring::digest::digest(&ring::digest::SHA256, self.0.as_bytes());
        fast32::base64::RFC4648_URL_NOPAD.encode(digest.as_ref())
    }
}

impl std::fmt::Debug for PkceVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PkceVerifier(..)")
    }
}

/// Generate an opaque `state` value binding a login to its callback.
pub fn random_state() -> String {
    random_token::<16>()
}

fn random_token<const N: usize>() -> String {
    let mut bytes = [0u8; N];
    rand::rng().fill(&mut bytes);
    fast32::base64::RFC4648_URL_NOPAD.encode(&bytes)
}
