//! The HTTP transport seam.

use reqwest::{Request, Response};
use reqwest_middleware as rqm;

/// Performs one HTTP exchange.
///
/// Implemented for [`reqwest::Client`] and for
/// [`reqwest_middleware::ClientWithMiddleware`], so an existing middleware
/// stack (tracing, auth, retries of other kinds) can sit underneath a fetch.
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends `request` and returns the response, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be completed.
    async fn perform(&self, request: Request) -> rqm::Result<Response>;
}

#[async_trait::async_trait]
impl HttpTransport for reqwest::Client {
    async fn perform(&self, request: Request) -> rqm::Result<Response> {
        Ok(self.execute(request).await?)
    }
}

#[async_trait::async_trait]
impl HttpTransport for rqm::ClientWithMiddleware {
    async fn perform(&self, request: Request) -> rqm::Result<Response> {
        self.execute(request).await
    }
}
