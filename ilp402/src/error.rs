//! Error types for paying HTTP 402 responses over STREAM.

use std::time::Duration;

/// Boxed error used at the transport seams.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while paying for a `402 Payment Required` response.
///
/// Every variant rejects the whole call; there is no partial success.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// The server asked for payment but the caller set no price ceiling.
    #[error("max price must be specified on paid request")]
    MissingCeiling,

    /// The 402 response carried no `Pay` header.
    #[error("payment required but the response has no `Pay` header")]
    MissingChallenge,

    /// The `Pay` header names a method other than `interledger-stream`.
    #[error("unsupported payment method in `Pay`. header={header}")]
    UnsupportedPaymentMethod {
        /// The full `Pay` header value.
        header: String,
    },

    /// The `Pay` header is missing STREAM parameters or they are malformed.
    #[error("invalid `Pay` header: {0}")]
    InvalidChallenge(String),

    /// No ledger plugin was supplied and none can be created.
    #[error("no ledger plugin supplied and no plugin factory configured")]
    NoLedgerPlugin,

    /// Connecting or disconnecting the ledger plugin failed.
    #[error(transparent)]
    Plugin(#[from] PluginError),

    /// The STREAM connection to the receiver could not be established.
    #[error("failed to establish STREAM connection to {destination}")]
    StreamConnection {
        /// The receiver's ILP address.
        destination: String,
        /// The underlying transport error.
        #[source]
        source: BoxError,
    },

    /// The receiver did not acknowledge any money within the configured window.
    #[error("no payment acknowledged by receiver within {0:?}")]
    PaymentTimeout(Duration),

    /// The paid retry failed at the HTTP transport level.
    #[error("paid request failed: {0}")]
    Http(#[source] BoxError),
}

/// Errors reported by a ledger plugin.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// The plugin could not connect to the payment network.
    #[error("ledger plugin failed to connect: {0}")]
    Connect(#[source] BoxError),

    /// The plugin could not disconnect cleanly.
    #[error("ledger plugin failed to disconnect: {0}")]
    Disconnect(#[source] BoxError),
}
