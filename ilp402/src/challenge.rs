//! Parsing of the `Pay` challenge carried by `402 Payment Required` responses.
//!
//! The header is a space-separated list: the payment method followed by its
//! parameters. For `interledger-stream` the parameters are the receiver's ILP
//! address and the base64-encoded STREAM shared secret:
//!
//! ```text
//! Pay: interledger-stream g.example.receiver c2VjcmV0
//! ```

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

use crate::error::PaymentError;

const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

/// A payment method named in a `Pay` header.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PaymentMethod {
    /// `interledger-stream`, the only supported method.
    Stream,
    /// `interledger-psk`, retired.
    Psk,
    /// `interledger-psk2`, retired.
    Psk2,
    /// Any other identifier.
    Other(String),
}

impl PaymentMethod {
    /// Identifier of the STREAM method.
    pub const STREAM: &'static str = "interledger-stream";
    /// Identifier of the retired PSK method.
    pub const PSK: &'static str = "interledger-psk";
    /// Identifier of the retired PSK2 method.
    pub const PSK2: &'static str = "interledger-psk2";

    /// Returns the wire identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Stream => Self::STREAM,
            Self::Psk => Self::PSK,
            Self::Psk2 => Self::PSK2,
            Self::Other(s) => s,
        }
    }

    /// Returns `true` for methods that were once supported and have been dropped.
    #[must_use]
    pub const fn is_retired(&self) -> bool {
        matches!(self, Self::Psk | Self::Psk2)
    }
}

impl From<&str> for PaymentMethod {
    fn from(s: &str) -> Self {
        match s {
            Self::STREAM => Self::Stream,
            Self::PSK => Self::Psk,
            Self::PSK2 => Self::Psk2,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed `Pay` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentChallenge {
    /// The payment method.
    pub method: PaymentMethod,
    /// Method-specific parameters, in header order.
    pub params: Vec<String>,
}

impl PaymentChallenge {
    /// Splits a raw `Pay` header value into method and parameters.
    ///
    /// Never fails: a header with a single token yields empty `params`, and
    /// an empty header yields an empty [`PaymentMethod::Other`].
    #[must_use]
    pub fn parse(header: &str) -> Self {
        let mut tokens = header.split_whitespace();
        let method = PaymentMethod::from(tokens.next().unwrap_or_default());
        Self {
            method,
            params: tokens.map(str::to_owned).collect(),
        }
    }

    /// Extracts the STREAM destination and shared secret.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::UnsupportedPaymentMethod`] if the method is not
    /// `interledger-stream`, and [`PaymentError::InvalidChallenge`] if the
    /// destination or secret is missing or the secret is not base64.
    pub fn stream_params(&self) -> Result<StreamParams, PaymentError> {
        if self.method != PaymentMethod::Stream {
            return Err(PaymentError::UnsupportedPaymentMethod {
                header: self.to_string(),
            });
        }
        let destination = self.params.first().ok_or_else(|| {
            PaymentError::InvalidChallenge("missing destination address".to_owned())
        })?;
        let secret = self
            .params
            .get(1)
            .ok_or_else(|| PaymentError::InvalidChallenge("missing shared secret".to_owned()))?;
        let shared_secret = decode_secret(secret).ok_or_else(|| {
            PaymentError::InvalidChallenge("shared secret is not valid base64".to_owned())
        })?;
        Ok(StreamParams {
            destination: destination.clone(),
            shared_secret,
        })
    }
}

impl Display for PaymentChallenge {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.method.as_str())?;
        for param in &self.params {
            write!(f, " {param}")?;
        }
        Ok(())
    }
}

/// STREAM connection parameters taken from an `interledger-stream` challenge.
#[derive(Clone, PartialEq, Eq)]
pub struct StreamParams {
    /// ILP address of the receiver.
    pub destination: String,
    /// Decoded shared secret authenticating the connection.
    pub shared_secret: Vec<u8>,
}

impl fmt::Debug for StreamParams {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamParams")
            .field("destination", &self.destination)
            .field("shared_secret", &"<redacted>")
            .finish()
    }
}

/// Decodes base64 in either alphabet, with or without padding.
fn decode_secret(encoded: &str) -> Option<Vec<u8>> {
    STANDARD_LENIENT
        .decode(encoded)
        .or_else(|_| URL_SAFE_LENIENT.decode(encoded))
        .ok()
}
