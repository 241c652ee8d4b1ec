//! The STREAM payment session: pay first, then fetch.
//!
//! One [`StreamSession`] covers one paid retry. It opens a STREAM connection
//! to the receiver named in the `Pay` challenge, caps a single money stream
//! at the caller's [`MaxPrice`], and waits for the receiver to acknowledge the
//! first packet of money before it lets the HTTP retry run. The stream keeps
//! sending on the transport's own task while the retry is in flight. Once the
//! retry settles, successfully or not, the stream is ended and drained and
//! the connection closed, so the reported total is final.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::challenge::StreamParams;
use crate::error::{BoxError, PaymentError};
use crate::plugin::LedgerPlugin;
use crate::price::MaxPrice;
use crate::receipt::PaymentReceipt;
use crate::stream::{MoneyStream, StreamTransport};

/// A response obtained after paying for it.
#[derive(Debug, Clone)]
pub struct PaidResponse<T> {
    /// Output of the paid retry.
    pub response: T,
    /// What was paid and in which assets.
    pub receipt: PaymentReceipt,
}

/// A single pay-and-retry cycle against one STREAM receiver.
#[derive(Debug, Clone)]
pub struct StreamSession {
    params: StreamParams,
    max_price: MaxPrice,
    payment_timeout: Option<Duration>,
}

impl StreamSession {
    /// Creates a session for the given receiver and ceiling.
    #[must_use]
    pub const fn new(params: StreamParams, max_price: MaxPrice) -> Self {
        Self {
            params,
            max_price,
            payment_timeout: None,
        }
    }

    /// Bounds the wait for the receiver's first acknowledgement.
    ///
    /// Without a bound, a receiver that never acknowledges money suspends
    /// the session indefinitely.
    #[must_use]
    pub const fn with_payment_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.payment_timeout = timeout;
        self
    }

    /// Streams money to the receiver and runs `retry` once it has been paid.
    ///
    /// `retry` must not have started: it is polled only after the receiver
    /// has acknowledged money on the stream.
    ///
    /// # Errors
    ///
    /// - [`PaymentError::StreamConnection`] if the connection cannot be
    ///   established; nothing is sent and `retry` never runs.
    /// - [`PaymentError::PaymentTimeout`] if a payment timeout is set and
    ///   expires before the first acknowledgement.
    /// - [`PaymentError::Http`] if `retry` fails.
    ///
    /// The stream is drained and the connection closed before any error
    /// after connecting is returned. A payment timeout also bounds the wait
    /// for the stream to drain.
    #[cfg_attr(
        feature = "telemetry",
        tracing::instrument(
            name = "ilp402.session.pay",
            skip_all,
            fields(destination = %self.params.destination, max_price = %self.max_price),
            err
        )
    )]
    pub async fn pay<Fut, T, E>(
        &self,
        transport: &dyn StreamTransport,
        plugin: Arc<dyn LedgerPlugin>,
        retry: Fut,
    ) -> Result<PaidResponse<T>, PaymentError>
    where
        Fut: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: Into<BoxError>,
    {
        let connection = transport
            .connect(
                plugin,
                &self.params.destination,
                &self.params.shared_secret,
            )
            .await
            .map_err(|source| PaymentError::StreamConnection {
                destination: self.params.destination.clone(),
                source,
            })?;

        let stream = connection.create_stream();
        stream.set_send_max(self.max_price.amount());

        let outcome = self.exchange(stream.as_ref(), retry).await;
        drain(stream.as_ref(), self.payment_timeout).await;

        let receipt = PaymentReceipt {
            price: stream.total_sent().to_string(),
            destination: Some(connection.destination_asset()),
            source: Some(connection.source_asset()),
        };

        if let Err(_err) = connection.close().await {
            #[cfg(feature = "telemetry")]
            tracing::warn!(error = %_err, "failed to close STREAM connection");
        }

        #[cfg(feature = "telemetry")]
        tracing::info!(price = %receipt.price, "STREAM payment finished");

        outcome.map(|response| PaidResponse { response, receipt })
    }

    /// Waits for the first acknowledgement, then runs the retry.
    async fn exchange<Fut, T, E>(
        &self,
        stream: &dyn MoneyStream,
        retry: Fut,
    ) -> Result<T, PaymentError>
    where
        Fut: Future<Output = Result<T, E>> + Send,
        E: Into<BoxError>,
    {
        match self.payment_timeout {
            Some(limit) => tokio::time::timeout(limit, stream.data_received())
                .await
                .map_err(|_| PaymentError::PaymentTimeout(limit))?,
            None => stream.data_received().await,
        }

        #[cfg(feature = "telemetry")]
        tracing::debug!(
            sent = %stream.total_sent(),
            "receiver acknowledged payment, retrying request"
        );

        retry.await.map_err(|err| PaymentError::Http(err.into()))
    }
}

/// Ends an open stream and waits until it has drained.
///
/// With a `limit`, a stream that does not drain in time is abandoned.
async fn drain(stream: &dyn MoneyStream, limit: Option<Duration>) {
    if !stream.is_open() {
        return;
    }
    #[cfg(feature = "telemetry")]
    tracing::trace!("ending stream");
    stream.end();
    match limit {
        Some(limit) => {
            if tokio::time::timeout(limit, stream.ended()).await.is_err() {
                #[cfg(feature = "telemetry")]
                tracing::warn!(?limit, "STREAM did not drain in time, closing connection");
            }
        }
        None => stream.ended().await,
    }
}
