//! Payment metadata returned alongside the HTTP response.

use serde::{Deserialize, Serialize};

/// An asset as reported by one end of a STREAM connection.
///
/// Either field may be unset if the counterparty never disclosed it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDetails {
    /// Asset code, e.g. `"XRP"` or `"USD"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_code: Option<String>,
    /// Number of decimal places between base units and the asset's standard unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_scale: Option<u8>,
}

impl AssetDetails {
    /// Creates asset details with both fields known.
    #[must_use]
    pub fn new(asset_code: impl Into<String>, asset_scale: u8) -> Self {
        Self {
            asset_code: Some(asset_code.into()),
            asset_scale: Some(asset_scale),
        }
    }
}

/// What a fetch call paid.
///
/// Unpaid requests carry `price == "0"` and no asset details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    /// Total amount sent over the stream, as a decimal string in source units.
    pub price: String,
    /// Asset of the receiving end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<AssetDetails>,
    /// Asset of the sending end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<AssetDetails>,
}

impl PaymentReceipt {
    /// Receipt for a request that needed no payment.
    #[must_use]
    pub fn unpaid() -> Self {
        Self {
            price: "0".to_owned(),
            destination: None,
            source: None,
        }
    }
}
