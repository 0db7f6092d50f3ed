//! HMAC-SHA256 signing for Connect SSO payloads.
//!
//! The forum and this service share a symmetric secret. Every payload that
//! crosses the boundary is a Base64 blob signed with HMAC-SHA256 over the
//! blob's UTF-8 bytes, hex-encoded lowercase.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// The symmetric key shared with the forum.
///
/// SECURITY: the key material must never reach logs or HTTP responses.
/// `Debug` is implemented manually and redacts the bytes.
#[derive(Clone)]
pub struct SharedSecret(Vec<u8>);

impl SharedSecret {
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Key bytes, for the signer only.
    #[must_use]
    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for SharedSecret {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret(..)")
    }
}

/// Signs and verifies Connect payload blobs with an explicitly injected
/// secret. No ambient configuration is consulted.
#[derive(Debug, Clone)]
pub struct PayloadSigner {
    secret: SharedSecret,
}

impl PayloadSigner {
    #[must_use]
    pub fn new(secret: SharedSecret) -> Self {
        Self { secret }
    }

    /// Compute the hex-encoded HMAC-SHA256 signature of a Base64 blob.
    #[must_use]
    pub fn sign(&self, blob: &str) -> String {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(blob.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Verify a supplied signature against the blob.
    ///
    /// SECURITY: comparison is constant-time via the `subtle` crate; the
    /// result carries no information about where the mismatch occurred.
    #[must_use]
    pub fn verify(&self, blob: &str, signature: &str) -> bool {
        let computed = self.sign(blob);
        constant_time_eq(computed.as_bytes(), signature.as_bytes())
    }
}

/// Constant-time byte comparison to prevent timing attacks.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    use subtle::ConstantTimeEq;
    a.ct_eq(b).into()
}
