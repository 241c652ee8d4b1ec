//! Reqwest middleware that pays for `402 Payment Required` responses.

use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

use http::{Extensions, HeaderValue, StatusCode};
use ilp402::{
    LedgerPlugin, MaxPrice, PayToken, Payer, PaymentContext, PaymentReceipt, PluginFactory,
};
use reqwest::{Request, Response};
use reqwest_middleware as rqm;
#[cfg(feature = "telemetry")]
use tracing::{info, instrument, trace};

use crate::constants::PAY_TOKEN_HEADER;
use crate::error::MiddlewareError;
use crate::fetch::pay_header;

/// Per-request ledger plugin, passed as a request extension.
///
/// Like [`FetchOptions::plugin`](crate::options::FetchOptions::plugin), the
/// plugin is caller-owned and never connected or disconnected by the
/// middleware.
#[derive(Clone)]
pub struct RequestPlugin(pub Arc<dyn LedgerPlugin>);

impl Debug for RequestPlugin {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("RequestPlugin(<LedgerPlugin>)")
    }
}

/// Middleware that stamps every request with a `Pay-Token` and pays for
/// 402 responses over STREAM.
///
/// Defaults set here apply to every request; a [`MaxPrice`], [`PayToken`] or
/// [`RequestPlugin`] request extension overrides them for one request. The
/// [`PaymentReceipt`] is stored in the response extensions, see
/// [`payment_receipt`].
pub struct IlpPayments {
    payer: Payer,
    max_price: Option<MaxPrice>,
    plugin: Option<Arc<dyn LedgerPlugin>>,
    payment_timeout: Option<Duration>,
}

impl IlpPayments {
    /// Creates the middleware with no default ceiling.
    #[must_use]
    pub const fn new(payer: Payer) -> Self {
        Self {
            payer,
            max_price: None,
            plugin: None,
            payment_timeout: None,
        }
    }

    /// Sets the ceiling used when a request carries none.
    #[must_use]
    pub const fn with_max_price(mut self, max_price: MaxPrice) -> Self {
        self.max_price = Some(max_price);
        self
    }

    /// Pays through a caller-owned plugin unless a request brings its own.
    #[must_use]
    pub fn with_plugin(mut self, plugin: Arc<dyn LedgerPlugin>) -> Self {
        self.plugin = Some(plugin);
        self
    }

    /// Sets the factory for plugins created per payment.
    #[must_use]
    pub fn with_plugin_factory(mut self, factory: impl PluginFactory + 'static) -> Self {
        self.payer = self.payer.with_plugin_factory(factory);
        self
    }

    /// Bounds the wait for the receiver's first acknowledgement.
    #[must_use]
    pub const fn with_payment_timeout(mut self, timeout: Duration) -> Self {
        self.payment_timeout = Some(timeout);
        self
    }

    fn payment_context(&self, extensions: &Extensions) -> PaymentContext {
        PaymentContext {
            max_price: extensions.get::<MaxPrice>().copied().or(self.max_price),
            plugin: extensions
                .get::<RequestPlugin>()
                .map(|p| Arc::clone(&p.0))
                .or_else(|| self.plugin.clone()),
            payment_timeout: self.payment_timeout,
        }
    }
}

impl Debug for IlpPayments {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("IlpPayments")
            .field("payer", &self.payer)
            .field("max_price", &self.max_price)
            .field("plugin", &self.plugin.as_ref().map(|_| "<LedgerPlugin>"))
            .field("payment_timeout", &self.payment_timeout)
            .finish()
    }
}

/// Returns the receipt [`IlpPayments`] attached to `response`.
#[must_use]
pub fn payment_receipt(response: &Response) -> Option<&PaymentReceipt> {
    response.extensions().get::<PaymentReceipt>()
}

/// Runs the next middleware or HTTP client with optional telemetry instrumentation.
#[cfg_attr(
    feature = "telemetry",
    instrument(name = "ilp402.reqwest.next", skip_all)
)]
async fn run_next(
    next: rqm::Next<'_>,
    req: Request,
    extensions: &mut Extensions,
) -> rqm::Result<Response> {
    next.run(req, extensions).await
}

#[async_trait::async_trait]
impl rqm::Middleware for IlpPayments {
    /// Handles a request, paying for it if the server answers 402.
    ///
    /// On a 402 response the middleware:
    /// 1. Reads the `Pay` challenge
    /// 2. Streams money to the receiver, up to the ceiling
    /// 3. Replays the request with the same `Pay-Token` once money has arrived
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "ilp402.reqwest.handle", skip_all, err)
    )]
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: rqm::Next<'_>,
    ) -> rqm::Result<Response> {
        let token = extensions
            .get::<PayToken>()
            .cloned()
            .unwrap_or_else(PayToken::random);
        let token = HeaderValue::from_str(&token.encode())
            .map_err(|e| rqm::Error::Middleware(e.into()))?;
        req.headers_mut().insert(PAY_TOKEN_HEADER, token);

        let retry_req = req.try_clone();
        let mut res = run_next(next.clone(), req, extensions).await?;

        if res.status() != StatusCode::PAYMENT_REQUIRED {
            #[cfg(feature = "telemetry")]
            trace!(status = ?res.status(), "No payment required, returning response");
            res.extensions_mut().insert(PaymentReceipt::unpaid());
            return Ok(res);
        }

        #[cfg(feature = "telemetry")]
        info!(url = ?res.url(), "Received 402 Payment Required, paying over STREAM");

        let retry_req = retry_req
            .ok_or_else(|| rqm::Error::Middleware(MiddlewareError::RequestNotCloneable.into()))?;
        let pay_header =
            pay_header(res.headers()).map_err(|e| rqm::Error::Middleware(e.into()))?;
        drop(res);

        let ctx = self.payment_context(extensions);
        let retry = run_next(next, retry_req, extensions);
        let paid = self
            .payer
            .pay(pay_header.as_deref(), ctx, retry)
            .await
            .map_err(|e| rqm::Error::Middleware(e.into()))?;

        let mut response = paid.response;
        response.extensions_mut().insert(paid.receipt);
        Ok(response)
    }
}
