//! The STREAM transport seam.
//!
//! Framing, congestion control and encryption of Interledger STREAM live
//! behind these traits. The session only orchestrates: it opens a
//! connection, creates one money stream, caps it, and listens for the
//! stream's `data` and `end` events.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::error::BoxError;
use crate::plugin::LedgerPlugin;
use crate::receipt::AssetDetails;

/// Opens STREAM connections over a ledger plugin.
#[async_trait::async_trait]
pub trait StreamTransport: Send + Sync {
    /// Connects to `destination`, authenticated by `shared_secret`.
    ///
    /// # Errors
    ///
    /// Returns an error if the handshake with the receiver fails.
    async fn connect(
        &self,
        plugin: Arc<dyn LedgerPlugin>,
        destination: &str,
        shared_secret: &[u8],
    ) -> Result<Box<dyn StreamConnection>, BoxError>;
}

/// An established STREAM connection.
///
/// Asset details are filled in as the connection negotiates; until then
/// their fields are unset.
#[async_trait::async_trait]
pub trait StreamConnection: Send + Sync {
    /// Opens a new outbound money stream.
    fn create_stream(&self) -> Box<dyn MoneyStream>;

    /// Asset of the sending end.
    fn source_asset(&self) -> AssetDetails;

    /// Asset of the receiving end.
    fn destination_asset(&self) -> AssetDetails;

    /// Closes the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be closed cleanly.
    async fn close(&self) -> Result<(), BoxError>;
}

/// One money stream on a [`StreamConnection`].
///
/// Once a send max is set the transport keeps sending on its own until the
/// total reaches it or the stream is ended.
#[async_trait::async_trait]
pub trait MoneyStream: Send + Sync {
    /// Caps the total amount this stream may ever send.
    fn set_send_max(&self, amount: Decimal);

    /// Total amount sent so far, in source units.
    fn total_sent(&self) -> Decimal;

    /// Returns `true` until the stream has been ended or closed remotely.
    fn is_open(&self) -> bool;

    /// Starts a graceful close; in-flight money keeps settling until `end` fires.
    fn end(&self);

    /// Resolves once the first `data` event has fired.
    async fn data_received(&self);

    /// Resolves once the `end` event has fired and the stream has drained.
    async fn ended(&self);
}
