//! Serializable client configuration.
//!
//! A [`ClientConfig`] holds the per-call settings of a fetch in a form that
//! can live in a JSON file, and converts into [`FetchOptions`].

use std::collections::BTreeMap;
use std::time::Duration;

use http::{HeaderName, HeaderValue};
use ilp402::{MaxPrice, PayToken};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::options::FetchOptions;

/// Fetch settings loadable from JSON.
///
/// # Example
///
/// ```rust
/// use ilp402_http::config::ClientConfig;
///
/// let config = ClientConfig::from_json(r#"{
///     "maxPrice": "1000",
///     "payToken": "-_8",
///     "paymentTimeoutSecs": 30,
///     "headers": { "accept": "text/plain" }
/// }"#).unwrap();
/// let options = config.to_options().unwrap();
/// assert!(options.max_price.is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Most a request may pay, as a decimal string in source units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<MaxPrice>,

    /// Fixed payment token, unpadded base64url. Random per request if unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pay_token: Option<String>,

    /// Bound on the wait for the receiver's first acknowledgement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_timeout_secs: Option<u64>,

    /// Timeout for each HTTP exchange.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Headers added to every request.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl ClientConfig {
    /// Parses a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] if `json` is malformed or `maxPrice` is
    /// not a non-negative decimal.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builds the [`FetchOptions`] this configuration describes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the token or a header does not parse.
    pub fn to_options(&self) -> Result<FetchOptions, ConfigError> {
        let mut options = FetchOptions::new();
        for (name, value) in &self.headers {
            options = options.header(
                HeaderName::try_from(name.as_str())?,
                HeaderValue::from_str(value)?,
            );
        }
        options.max_price = self.max_price;
        options.pay_token = self.pay_token.as_deref().map(PayToken::decode).transpose()?;
        options.payment_timeout = self.payment_timeout_secs.map(Duration::from_secs);
        options.timeout = self.timeout_secs.map(Duration::from_secs);
        Ok(options)
    }
}
