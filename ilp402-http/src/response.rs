//! The response of a fetch, with what was paid for it.

use std::ops::{Deref, DerefMut};

use ilp402::{AssetDetails, PaymentReceipt};
use reqwest::Response;

/// An HTTP response together with its [`PaymentReceipt`].
///
/// Dereferences to the underlying [`reqwest::Response`] for status and
/// headers; use [`FetchResponse::into_response`] to consume the body.
#[derive(Debug)]
pub struct FetchResponse {
    response: Response,
    receipt: PaymentReceipt,
}

impl FetchResponse {
    /// Wraps a response with its receipt.
    #[must_use]
    pub const fn new(response: Response, receipt: PaymentReceipt) -> Self {
        Self { response, receipt }
    }

    /// Wraps a response that needed no payment.
    #[must_use]
    pub fn unpaid(response: Response) -> Self {
        Self::new(response, PaymentReceipt::unpaid())
    }

    /// Amount paid, as a decimal string; `"0"` if unpaid.
    #[must_use]
    pub fn price(&self) -> &str {
        &self.receipt.price
    }

    /// Asset of the receiving end, if the request was paid.
    #[must_use]
    pub const fn destination(&self) -> Option<&AssetDetails> {
        self.receipt.destination.as_ref()
    }

    /// Asset of the sending end, if the request was paid.
    #[must_use]
    pub const fn source(&self) -> Option<&AssetDetails> {
        self.receipt.source.as_ref()
    }

    /// The payment receipt.
    #[must_use]
    pub const fn receipt(&self) -> &PaymentReceipt {
        &self.receipt
    }

    /// Returns the underlying response, dropping the receipt.
    #[must_use]
    pub fn into_response(self) -> Response {
        self.response
    }

    /// Splits into response and receipt.
    #[must_use]
    pub fn into_parts(self) -> (Response, PaymentReceipt) {
        (self.response, self.receipt)
    }
}

impl Deref for FetchResponse {
    type Target = Response;

    fn deref(&self) -> &Self::Target {
        &self.response
    }
}

impl DerefMut for FetchResponse {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.response
    }
}
