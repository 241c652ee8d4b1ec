//! Payment tokens attached to every outgoing request.
//!
//! A [`PayToken`] identifies one payment intent. It travels in the
//! `Pay-Token` header as unpadded URL-safe base64, so the receiver can match
//! incoming STREAM money to the HTTP request that asked for it.

use std::fmt::{self, Display, Formatter};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as b64url;
use rand::RngExt;
use rand::rng;

/// Length in bytes of a randomly generated [`PayToken`].
pub const PAY_TOKEN_LEN: usize = 16;

/// An opaque payment token.
///
/// Created once per fetch call and never mutated. Use [`PayToken::random`]
/// unless the caller needs to correlate payments with an identifier of its
/// own choosing.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PayToken(Vec<u8>);

impl PayToken {
    /// Wraps caller-supplied token bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Generates a fresh token of [`PAY_TOKEN_LEN`] random bytes.
    #[must_use]
    pub fn random() -> Self {
        let bytes: [u8; PAY_TOKEN_LEN] = rng().random();
        Self(bytes.to_vec())
    }

    /// Parses a token from its unpadded URL-safe base64 form.
    ///
    /// # Errors
    ///
    /// Returns an error if `encoded` is not valid unpadded base64url.
    pub fn decode(encoded: &str) -> Result<Self, base64::DecodeError> {
        b64url.decode(encoded.trim()).map(Self)
    }

    /// Encodes the token as unpadded URL-safe base64.
    ///
    /// The result never contains `=`, `+` or `/`.
    #[must_use]
    pub fn encode(&self) -> String {
        b64url.encode(&self.0)
    }

    /// Returns the raw token bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for PayToken {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for PayToken {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for PayToken {
    fn from(slice: &[u8]) -> Self {
        Self(slice.to_vec())
    }
}

impl Display for PayToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

// Tokens act as bearer identifiers, keep them out of debug output.
impl fmt::Debug for PayToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PayToken").field(&"<redacted>").finish()
    }
}
