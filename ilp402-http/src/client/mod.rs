//! Reqwest middleware for automatic Interledger payment handling.
//!
//! [`IlpPayments`] plugs into a `reqwest-middleware` stack and handles
//! `402 Payment Required` responses the same way
//! [`IlpFetch`](crate::fetch::IlpFetch) does: it streams money to the
//! receiver named in the `Pay` header and replays the request once the
//! receiver has acknowledged payment.
//!
//! ```ignore
//! use ilp402::{MaxPrice, Payer};
//! use ilp402_http::client::{IlpPayments, ReqwestWithPayments, ReqwestWithPaymentsBuild};
//!
//! let payments = IlpPayments::new(Payer::new(stream_transport))
//!     .with_plugin_factory(make_plugin)
//!     .with_max_price(MaxPrice::from(1000));
//! let client = reqwest::Client::new().with_payments(payments).build();
//! let res = client.get("https://example.com/paid").send().await?;
//! let receipt = ilp402_http::client::payment_receipt(&res);
//! ```

mod middleware;

pub use middleware::*;

use reqwest::{Client, ClientBuilder};
use reqwest_middleware as rqm;

/// Trait for adding Interledger payment handling to reqwest clients.
///
/// This trait is implemented on [`Client`] and [`ClientBuilder`], allowing
/// you to create a reqwest client with automatic payment handling.
pub trait ReqwestWithPayments<A> {
    /// Adds the payment middleware to the client or builder.
    fn with_payments(self, payments: IlpPayments) -> ReqwestWithPaymentsBuilder<A>;
}

impl ReqwestWithPayments<Self> for Client {
    fn with_payments(self, payments: IlpPayments) -> ReqwestWithPaymentsBuilder<Self> {
        ReqwestWithPaymentsBuilder {
            inner: self,
            payments,
        }
    }
}

impl ReqwestWithPayments<Self> for ClientBuilder {
    fn with_payments(self, payments: IlpPayments) -> ReqwestWithPaymentsBuilder<Self> {
        ReqwestWithPaymentsBuilder {
            inner: self,
            payments,
        }
    }
}

/// Builder for creating a reqwest client with the payment middleware.
#[allow(missing_debug_implementations)] // generic A may not implement Debug
pub struct ReqwestWithPaymentsBuilder<A> {
    inner: A,
    payments: IlpPayments,
}

/// Trait for building the final client from a [`ReqwestWithPaymentsBuilder`].
pub trait ReqwestWithPaymentsBuild {
    /// The type returned by [`build`](Self::build)
    type BuildResult;
    /// The type returned by [`builder`](Self::builder)
    type BuilderResult;

    /// Builds the client, consuming the builder.
    fn build(self) -> Self::BuildResult;

    /// Returns the underlying reqwest client builder with middleware added.
    fn builder(self) -> Self::BuilderResult;
}

impl ReqwestWithPaymentsBuild for ReqwestWithPaymentsBuilder<Client> {
    type BuildResult = rqm::ClientWithMiddleware;
    type BuilderResult = rqm::ClientBuilder;

    fn build(self) -> Self::BuildResult {
        self.builder().build()
    }

    fn builder(self) -> Self::BuilderResult {
        rqm::ClientBuilder::new(self.inner).with(self.payments)
    }
}

impl ReqwestWithPaymentsBuild for ReqwestWithPaymentsBuilder<ClientBuilder> {
    type BuildResult = Result<rqm::ClientWithMiddleware, reqwest::Error>;
    type BuilderResult = Result<rqm::ClientBuilder, reqwest::Error>;

    fn build(self) -> Self::BuildResult {
        let builder = self.builder()?;
        Ok(builder.build())
    }

    fn builder(self) -> Self::BuilderResult {
        let client = self.inner.build()?;
        Ok(rqm::ClientBuilder::new(client).with(self.payments))
    }
}
