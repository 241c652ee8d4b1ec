//! Turning a `402 Payment Required` into a paid retry.
//!
//! [`Payer`] is the transport-agnostic half of a paid fetch. Given the `Pay`
//! header of a 402 response and a not-yet-started retry, it checks the
//! caller's ceiling, validates the challenge, obtains a ledger plugin, runs a
//! [`StreamSession`] and releases the plugin again.

use std::fmt::{self, Debug, Formatter};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::challenge::{PaymentChallenge, PaymentMethod};
use crate::error::{BoxError, PaymentError};
use crate::plugin::{LedgerHandle, LedgerPlugin, PluginFactory};
use crate::price::MaxPrice;
use crate::session::{PaidResponse, StreamSession};
use crate::stream::StreamTransport;

/// Per-request payment settings.
#[derive(Clone, Default)]
pub struct PaymentContext {
    /// Most the request may pay. Required once a 402 is seen.
    pub max_price: Option<MaxPrice>,
    /// Caller-owned plugin; when unset the payer's factory creates one.
    pub plugin: Option<Arc<dyn LedgerPlugin>>,
    /// Bound on the wait for the receiver's first acknowledgement.
    pub payment_timeout: Option<Duration>,
}

impl Debug for PaymentContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentContext")
            .field("max_price", &self.max_price)
            .field("plugin", &self.plugin.as_ref().map(|_| "<LedgerPlugin>"))
            .field("payment_timeout", &self.payment_timeout)
            .finish()
    }
}

/// Pays `interledger-stream` challenges.
#[derive(Clone)]
pub struct Payer {
    transport: Arc<dyn StreamTransport>,
    plugin_factory: Option<Arc<dyn PluginFactory>>,
}

impl Payer {
    /// Creates a payer that opens connections through `transport`.
    ///
    /// Without a plugin factory every paid request must bring its own plugin.
    #[must_use]
    pub fn new(transport: Arc<dyn StreamTransport>) -> Self {
        Self {
            transport,
            plugin_factory: None,
        }
    }

    /// Sets the factory used when a request supplies no plugin.
    #[must_use]
    pub fn with_plugin_factory(mut self, factory: impl PluginFactory + 'static) -> Self {
        self.plugin_factory = Some(Arc::new(factory));
        self
    }

    /// Pays the challenge in `pay_header` and runs `retry` once paid.
    ///
    /// Checks happen in this order, and the first failing one is returned
    /// before any plugin or STREAM work starts: ceiling present, `Pay` header
    /// present, method supported, parameters well-formed.
    ///
    /// # Errors
    ///
    /// - [`PaymentError::MissingCeiling`] if `ctx.max_price` is unset.
    /// - [`PaymentError::MissingChallenge`] if there is no `Pay` header.
    /// - [`PaymentError::UnsupportedPaymentMethod`] for any method other than
    ///   `interledger-stream`, retired ones included.
    /// - [`PaymentError::InvalidChallenge`] for malformed STREAM parameters.
    /// - [`PaymentError::NoLedgerPlugin`] or [`PaymentError::Plugin`] if no
    ///   plugin can be obtained, or an owned one fails to disconnect.
    /// - Any error of [`StreamSession::pay`].
    #[cfg_attr(
        feature = "telemetry",
        tracing::instrument(name = "ilp402.payer.pay", skip_all, err)
    )]
    pub async fn pay<Fut, T, E>(
        &self,
        pay_header: Option<&str>,
        ctx: PaymentContext,
        retry: Fut,
    ) -> Result<PaidResponse<T>, PaymentError>
    where
        Fut: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: Into<BoxError>,
    {
        let max_price = ctx.max_price.ok_or(PaymentError::MissingCeiling)?;
        let header = pay_header.ok_or(PaymentError::MissingChallenge)?;

        let challenge = PaymentChallenge::parse(header);
        #[cfg(feature = "telemetry")]
        tracing::trace!(
            method = %challenge.method,
            params = challenge.params.len(),
            "parsed `Pay` header"
        );

        if challenge.method != PaymentMethod::Stream {
            #[cfg(feature = "telemetry")]
            log_unsupported(&challenge.method);
            return Err(PaymentError::UnsupportedPaymentMethod {
                header: header.to_owned(),
            });
        }
        let params = challenge.stream_params()?;

        let ledger = LedgerHandle::acquire(ctx.plugin, self.plugin_factory.as_deref()).await?;
        let session =
            StreamSession::new(params, max_price).with_payment_timeout(ctx.payment_timeout);
        let result = session
            .pay(self.transport.as_ref(), ledger.plugin(), retry)
            .await;
        let released = ledger.release().await;

        match (result, released) {
            (Ok(paid), Ok(())) => Ok(paid),
            (Ok(_), Err(err)) => Err(err.into()),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(_release_err)) => {
                #[cfg(feature = "telemetry")]
                tracing::warn!(error = %_release_err, "failed to disconnect ledger plugin");
                Err(err)
            }
        }
    }
}

impl Debug for Payer {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payer")
            .field("transport", &"<StreamTransport>")
            .field("plugin_factory", &self.plugin_factory.is_some())
            .finish()
    }
}

#[cfg(feature = "telemetry")]
fn log_unsupported(method: &PaymentMethod) {
    if method.is_retired() {
        tracing::warn!(
            %method,
            "payment method is no longer supported. use a legacy client instead"
        );
    }
    tracing::error!(%method, "no handler exists for payment method");
}
