//! HMAC signature generation and verification.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Signs outbound payloads so the receiving endpoint can authenticate the
/// sender.
///
/// The signature is the lowercase hex HMAC-SHA256 digest of the exact body
/// bytes that go over the wire, so the receiver can recompute it from the
/// raw request body, byte for byte. When no secret is configured the engine
/// constructs no signer and omits the signature header entirely -
/// unauthenticated mode, not an error.
pub struct PayloadSigner {
    secret: String,
}

impl PayloadSigner {
    /// Creates a new signer with the given secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Creates a signer only when the secret is present and non-empty.
    pub fn from_secret(secret: Option<&str>) -> Option<Self> {
        match secret {
            Some(s) if !s.is_empty() => Some(Self::new(s)),
            _ => None,
        }
    }

    /// Generates a signature over the payload bytes.
    pub fn sign(&self, payload: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    /// Verifies a signature against the payload.
    pub fn verify(&self, payload: &[u8], signature: &str) -> bool {
        let expected = self.sign(payload);
        constant_time_compare(&expected, signature)
    }
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
