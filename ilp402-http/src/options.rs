//! Per-call request and payment options.

use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

use http::{HeaderMap, HeaderName, HeaderValue, Method};
use ilp402::{LedgerPlugin, MaxPrice, PayToken, PaymentContext};
use reqwest::{Body, Request};
use url::Url;

use crate::constants::PAY_TOKEN_HEADER;

/// Options for a single [`IlpFetch::fetch`](crate::fetch::IlpFetch::fetch) call.
///
/// The request part (method, headers, body, timeout) is replayed verbatim on
/// the paid retry. The payment part is only consulted once the server asks
/// for money.
#[derive(Clone, Default)]
pub struct FetchOptions {
    /// HTTP method; `GET` by default.
    pub method: Method,
    /// Extra request headers.
    pub headers: HeaderMap,
    /// Request body, sent on both the probe and the retry.
    pub body: Option<Vec<u8>>,
    /// Per-request timeout applied to each HTTP exchange.
    pub timeout: Option<Duration>,
    /// Most this call may pay. Required if the server answers 402.
    pub max_price: Option<MaxPrice>,
    /// Payment token; a random one is generated when unset.
    pub pay_token: Option<PayToken>,
    /// Caller-owned ledger plugin. Never connected or disconnected by the fetch.
    pub plugin: Option<Arc<dyn LedgerPlugin>>,
    /// Bound on the wait for the receiver's first acknowledgement.
    pub payment_timeout: Option<Duration>,
}

impl FetchOptions {
    /// Default options: `GET`, no body, no ceiling.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the HTTP method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Adds a request header.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the price ceiling.
    #[must_use]
    pub const fn max_price(mut self, max_price: MaxPrice) -> Self {
        self.max_price = Some(max_price);
        self
    }

    /// Uses `token` instead of a random payment token.
    #[must_use]
    pub fn pay_token(mut self, token: PayToken) -> Self {
        self.pay_token = Some(token);
        self
    }

    /// Pays through a caller-owned plugin.
    #[must_use]
    pub fn plugin(mut self, plugin: Arc<dyn LedgerPlugin>) -> Self {
        self.plugin = Some(plugin);
        self
    }

    /// Bounds the wait for the receiver's first acknowledgement.
    #[must_use]
    pub const fn payment_timeout(mut self, timeout: Duration) -> Self {
        self.payment_timeout = Some(timeout);
        self
    }

    /// Builds the request these options describe, stamped with `pay_token`.
    pub(crate) fn request(&self, url: &Url, pay_token: &HeaderValue) -> Request {
        let mut request = Request::new(self.method.clone(), url.clone());
        *request.headers_mut() = self.headers.clone();
        request
            .headers_mut()
            .insert(PAY_TOKEN_HEADER, pay_token.clone());
        *request.body_mut() = self.body.clone().map(Body::from);
        *request.timeout_mut() = self.timeout;
        request
    }

    /// The payment half of these options.
    pub(crate) fn payment_context(&self) -> PaymentContext {
        PaymentContext {
            max_price: self.max_price,
            plugin: self.plugin.clone(),
            payment_timeout: self.payment_timeout,
        }
    }
}

impl Debug for FetchOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchOptions")
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("body", &self.body.as_ref().map(Vec::len))
            .field("timeout", &self.timeout)
            .field("max_price", &self.max_price)
            .field("pay_token", &self.pay_token)
            .field("plugin", &self.plugin.as_ref().map(|_| "<LedgerPlugin>"))
            .field("payment_timeout", &self.payment_timeout)
            .finish()
    }
}
