//! `fetch` that pays for `402 Payment Required` responses.
//!
//! [`IlpFetch`] sends the request once with a `Pay-Token` header. If the
//! server answers anything but 402 the response is returned as-is with a
//! price of `"0"`. On 402 the `Pay` challenge is handed to a [`Payer`], which
//! streams money to the server and, once the server has acknowledged it,
//! replays the same request with the same token.

use std::sync::Arc;

use http::{HeaderMap, HeaderValue};
use ilp402::{PayToken, Payer, PaymentError, PluginFactory, StreamTransport};
use url::Url;

use crate::constants::{HTTP_STATUS_PAYMENT_REQUIRED, PAY_HEADER};
use crate::error::FetchError;
use crate::options::FetchOptions;
use crate::response::FetchResponse;
use crate::transport::HttpTransport;

/// An HTTP client that pays for resources over Interledger STREAM.
///
/// # Example
///
/// ```ignore
/// use ilp402::MaxPrice;
/// use ilp402_http::{FetchOptions, IlpFetch};
///
/// let client = IlpFetch::new(stream_transport).with_plugin_factory(make_plugin);
/// let response = client
///     .fetch("https://example.com/paid", FetchOptions::new().max_price(MaxPrice::from(1000)))
///     .await?;
/// println!("paid {}", response.price());
/// ```
#[allow(missing_debug_implementations)] // generic T may not implement Debug
pub struct IlpFetch<T = reqwest::Client> {
    transport: T,
    payer: Payer,
}

impl IlpFetch<reqwest::Client> {
    /// Creates a client over a default [`reqwest::Client`].
    #[must_use]
    pub fn new(stream: Arc<dyn StreamTransport>) -> Self {
        Self::with_transport(reqwest::Client::new(), Payer::new(stream))
    }
}

impl<T> IlpFetch<T>
where
    T: HttpTransport,
{
    /// Creates a client over any [`HttpTransport`].
    #[must_use]
    pub const fn with_transport(transport: T, payer: Payer) -> Self {
        Self { transport, payer }
    }

    /// Sets the factory that creates a plugin for requests that bring none.
    #[must_use]
    pub fn with_plugin_factory(mut self, factory: impl PluginFactory + 'static) -> Self {
        self.payer = self.payer.with_plugin_factory(factory);
        self
    }

    /// Fetches `url`, paying for it if the server asks.
    ///
    /// # Errors
    ///
    /// - [`FetchError::InvalidUrl`] if `url` does not parse.
    /// - [`FetchError::Http`] if the first request fails.
    /// - [`FetchError::Payment`] if the server asks for payment and paying
    ///   or the paid retry fails.
    #[cfg_attr(
        feature = "telemetry",
        tracing::instrument(name = "ilp402.fetch", skip(self, options), err)
    )]
    pub async fn fetch(
        &self,
        url: &str,
        options: FetchOptions,
    ) -> Result<FetchResponse, FetchError> {
        let url = Url::parse(url)?;
        let token = options.pay_token.clone().unwrap_or_else(PayToken::random);
        let token_header = HeaderValue::from_str(&token.encode())?;

        #[cfg(feature = "telemetry")]
        tracing::info!(?options, "attempting http request");
        let first_try = self
            .transport
            .perform(options.request(&url, &token_header))
            .await?;

        if first_try.status().as_u16() != HTTP_STATUS_PAYMENT_REQUIRED {
            #[cfg(feature = "telemetry")]
            tracing::info!(status = %first_try.status(), "request is not paid. returning result");
            return Ok(FetchResponse::unpaid(first_try));
        }

        #[cfg(feature = "telemetry")]
        tracing::info!("received 402 Payment Required, paying over STREAM");

        let pay_header = pay_header(first_try.headers())?;
        drop(first_try);
        let retry_request = options.request(&url, &token_header);
        let retry = async { self.transport.perform(retry_request).await };

        let paid = self
            .payer
            .pay(pay_header.as_deref(), options.payment_context(), retry)
            .await?;
        Ok(FetchResponse::new(paid.response, paid.receipt))
    }
}

/// Reads the `Pay` challenge of a 402 response.
///
/// A header that is present but not visible ASCII is an invalid challenge,
/// not a missing one.
pub(crate) fn pay_header(headers: &HeaderMap) -> Result<Option<String>, PaymentError> {
    headers
        .get(PAY_HEADER)
        .map(|value| {
            value.to_str().map(str::to_owned).map_err(|_| {
                PaymentError::InvalidChallenge("`Pay` header is not visible ASCII".to_owned())
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use http::StatusCode;
    use ilp402::testing::{EventLog, FakePlugin, FakeStreamTransport};
    use ilp402::{AssetDetails, LedgerPlugin, MaxPrice};
    use reqwest::{Request, Response};
    use reqwest_middleware as rqm;
    use rust_decimal::Decimal;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::constants::PAY_TOKEN_HEADER;

    const STREAM_PAY: &str = "interledger-stream dest.address c2VjcmV0";

    /// reqwest client that records each exchange in the event log.
    struct LoggingTransport {
        client: reqwest::Client,
        log: EventLog,
    }

    #[async_trait::async_trait]
    impl HttpTransport for LoggingTransport {
        async fn perform(&self, request: Request) -> rqm::Result<Response> {
            self.log.push("http:request");
            self.client.perform(request).await
        }
    }

    struct Harness {
        log: EventLog,
        stream: FakeStreamTransport,
        owned: Arc<FakePlugin>,
        client: IlpFetch<LoggingTransport>,
    }

    fn harness(stream: impl FnOnce(FakeStreamTransport) -> FakeStreamTransport) -> Harness {
        let log = EventLog::default();
        let stream = stream(FakeStreamTransport::new(log.clone()));
        let owned = FakePlugin::new(log.clone());
        let factory_plugin = Arc::clone(&owned);
        let transport = LoggingTransport {
            client: reqwest::Client::new(),
            log: log.clone(),
        };
        let client = IlpFetch::with_transport(transport, Payer::new(Arc::new(stream.clone())))
            .with_plugin_factory(move || -> Arc<dyn LedgerPlugin> { factory_plugin.clone() });
        Harness {
            log,
            stream,
            owned,
            client,
        }
    }

    async fn mount_paid_resource(server: &MockServer, pay: &str) {
        Mock::given(method("GET"))
            .and(path("/paid"))
            .respond_with(ResponseTemplate::new(402).insert_header(PAY_HEADER, pay))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/paid"))
            .respond_with(ResponseTemplate::new(200).set_body_string("paid content"))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_unpaid_resource_returns_price_zero() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/free"))
            .and(header_exists(PAY_TOKEN_HEADER))
            .respond_with(ResponseTemplate::new(200).set_body_string("free content"))
            .expect(1)
            .mount(&server)
            .await;
        let h = harness(|s| s);

        let response = h
            .client
            .fetch(&format!("{}/free", server.uri()), FetchOptions::new())
            .await
            .unwrap();

        assert_eq!(response.price(), "0");
        assert!(response.destination().is_none());
        assert!(response.source().is_none());
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.into_response().text().await.unwrap(), "free content");
        assert_eq!(h.log.events(), vec!["http:request"]);
        assert!(h.stream.last_connect().is_none());
        assert_eq!(h.owned.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unpaid_error_status_is_passed_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let h = harness(|s| s);

        let response = h
            .client
            .fetch(&server.uri(), FetchOptions::new())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.price(), "0");
    }

    #[tokio::test]
    async fn test_paid_resource_end_to_end() {
        let server = MockServer::start().await;
        mount_paid_resource(&server, STREAM_PAY).await;
        let h = harness(|s| s.with_chunk(Decimal::from(30)));
        let token = PayToken::new(vec![0xfb, 0xff, 0x01]);

        let response = h
            .client
            .fetch(
                &format!("{}/paid", server.uri()),
                FetchOptions::new()
                    .max_price(MaxPrice::from(100))
                    .pay_token(token.clone()),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            h.stream.last_connect(),
            Some(("dest.address".to_owned(), b"secret".to_vec()))
        );
        assert_eq!(h.stream.last_send_max(), Some(Decimal::from(100)));
        assert_eq!(response.price(), h.stream.total_sent().to_string());
        assert!(h.stream.total_sent() <= Decimal::from(100));
        assert_eq!(response.destination(), Some(&AssetDetails::new("USD", 2)));
        assert_eq!(response.source(), Some(&AssetDetails::new("XRP", 9)));
        assert!(!h.stream.stream_open());
        assert_eq!(response.into_response().text().await.unwrap(), "paid content");

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        for request in &requests {
            assert_eq!(request.headers[PAY_TOKEN_HEADER], token.encode().as_str());
        }
    }

    #[tokio::test]
    async fn test_retry_waits_for_first_payment() {
        let server = MockServer::start().await;
        mount_paid_resource(&server, STREAM_PAY).await;
        let h = harness(|s| s);

        h.client
            .fetch(
                &format!("{}/paid", server.uri()),
                FetchOptions::new().max_price(MaxPrice::from(100)),
            )
            .await
            .unwrap();

        let events = h.log.events();
        let requests: Vec<usize> = events
            .iter()
            .enumerate()
            .filter(|(_, e)| *e == "http:request")
            .map(|(i, _)| i)
            .collect();
        assert_eq!(requests.len(), 2, "{events:?}");
        let data = h.log.position("stream:data").unwrap();
        assert!(requests[0] < data, "{events:?}");
        assert!(data < requests[1], "{events:?}");
        assert!(requests[1] < h.log.position("stream:drained").unwrap(), "{events:?}");
    }

    #[tokio::test]
    async fn test_missing_max_price_makes_no_further_calls() {
        let server = MockServer::start().await;
        mount_paid_resource(&server, STREAM_PAY).await;
        let h = harness(|s| s);

        let err = h
            .client
            .fetch(&format!("{}/paid", server.uri()), FetchOptions::new())
            .await
            .unwrap_err();

        assert!(matches!(err.as_payment(), Some(PaymentError::MissingCeiling)));
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
        assert_eq!(h.log.events(), vec!["http:request"]);
    }

    #[tokio::test]
    async fn test_retired_methods_are_unsupported() {
        for pay in [
            "interledger-psk g.receiver c2VjcmV0",
            "interledger-psk2 g.receiver c2VjcmV0",
        ] {
            let server = MockServer::start().await;
            mount_paid_resource(&server, pay).await;
            let h = harness(|s| s);

            let err = h
                .client
                .fetch(
                    &format!("{}/paid", server.uri()),
                    FetchOptions::new().max_price(MaxPrice::from(100)),
                )
                .await
                .unwrap_err();

            assert!(matches!(
                err.as_payment(),
                Some(PaymentError::UnsupportedPaymentMethod { header }) if header == pay
            ));
            assert_eq!(server.received_requests().await.unwrap().len(), 1);
            assert!(h.stream.last_connect().is_none());
        }
    }

    #[tokio::test]
    async fn test_402_without_pay_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(402))
            .mount(&server)
            .await;
        let h = harness(|s| s);

        let err = h
            .client
            .fetch(&server.uri(), FetchOptions::new().max_price(MaxPrice::from(1)))
            .await
            .unwrap_err();

        assert!(matches!(err.as_payment(), Some(PaymentError::MissingChallenge)));
    }

    #[test]
    fn test_pay_header_presence_and_encoding() {
        let mut headers = HeaderMap::new();
        assert!(pay_header(&headers).unwrap().is_none());

        headers.insert(PAY_HEADER, HeaderValue::from_static(STREAM_PAY));
        assert_eq!(pay_header(&headers).unwrap().as_deref(), Some(STREAM_PAY));

        headers.insert(
            PAY_HEADER,
            HeaderValue::from_bytes(b"interledger-stream g.x \xffsecret").unwrap(),
        );
        assert!(matches!(
            pay_header(&headers),
            Err(PaymentError::InvalidChallenge(_))
        ));
    }

    #[tokio::test]
    async fn test_non_ascii_pay_header_is_invalid_challenge() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(402).insert_header(
                PAY_HEADER,
                HeaderValue::from_bytes(b"interledger-stream g.x \xffsecret").unwrap(),
            ))
            .mount(&server)
            .await;
        let h = harness(|s| s);

        let err = h
            .client
            .fetch(&server.uri(), FetchOptions::new().max_price(MaxPrice::from(1)))
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_payment(),
            Some(PaymentError::InvalidChallenge(_))
        ));
        assert!(h.stream.last_connect().is_none());
        assert_eq!(h.owned.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_owned_plugin_disconnected_once_after_success() {
        let server = MockServer::start().await;
        mount_paid_resource(&server, STREAM_PAY).await;
        let h = harness(|s| s);

        h.client
            .fetch(
                &format!("{}/paid", server.uri()),
                FetchOptions::new().max_price(MaxPrice::from(100)),
            )
            .await
            .unwrap();

        assert_eq!(h.owned.connects.load(Ordering::SeqCst), 1);
        assert_eq!(h.owned.disconnects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stream_connection_failure_cleans_up_plugin() {
        let server = MockServer::start().await;
        mount_paid_resource(&server, STREAM_PAY).await;
        let h = harness(FakeStreamTransport::failing_connect);

        let err = h
            .client
            .fetch(
                &format!("{}/paid", server.uri()),
                FetchOptions::new().max_price(MaxPrice::from(100)),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_payment(),
            Some(PaymentError::StreamConnection { .. })
        ));
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
        assert_eq!(h.owned.disconnects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_retry_drains_stream_and_disconnects() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(402).insert_header(PAY_HEADER, STREAM_PAY))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;
        let h = harness(|s| s);

        let err = h
            .client
            .fetch(
                &server.uri(),
                FetchOptions::new()
                    .max_price(MaxPrice::from(100))
                    .timeout(Duration::from_millis(200)),
            )
            .await
            .unwrap_err();

        assert!(matches!(err.as_payment(), Some(PaymentError::Http(_))));
        assert!(!h.stream.stream_open());
        assert!(h.log.position("stream:drained").is_some());
        assert_eq!(h.owned.disconnects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_caller_plugin_is_not_managed() {
        let server = MockServer::start().await;
        mount_paid_resource(&server, STREAM_PAY).await;
        let h = harness(|s| s);
        let caller = FakePlugin::new(h.log.clone());

        h.client
            .fetch(
                &format!("{}/paid", server.uri()),
                FetchOptions::new()
                    .max_price(MaxPrice::from(100))
                    .plugin(caller.clone()),
            )
            .await
            .unwrap();

        assert_eq!(caller.connects.load(Ordering::SeqCst), 0);
        assert_eq!(caller.disconnects.load(Ordering::SeqCst), 0);
        assert_eq!(h.owned.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_post_body_is_replayed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(402).insert_header(PAY_HEADER, STREAM_PAY))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(header("content-type", "text/plain"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;
        let h = harness(|s| s);

        let response = h
            .client
            .fetch(
                &server.uri(),
                FetchOptions::new()
                    .method(http::Method::POST)
                    .header(
                        http::header::CONTENT_TYPE,
                        HeaderValue::from_static("text/plain"),
                    )
                    .body("order")
                    .max_price(MaxPrice::from(5)),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.body == b"order"));
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let h = harness(|s| s);
        let err = h
            .client
            .fetch("not a url", FetchOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
        assert!(h.log.events().is_empty());
    }
}
