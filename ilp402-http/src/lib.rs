#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! HTTP layer for paying `402 Payment Required` responses over Interledger.
//!
//! [`IlpFetch`] is a `fetch`-style client: it sends a request with a
//! `Pay-Token`, and if the server answers 402 with a `Pay:
//! interledger-stream` challenge it streams up to the caller's ceiling to the
//! receiver, then replays the request and returns the response with a
//! [`PaymentReceipt`](ilp402::PaymentReceipt).
//!
//! # Modules
//!
//! - [`constants`] - HTTP header names and status codes
//! - [`error`] - fetch and configuration error types
//! - [`options`] - per-call request and payment options
//! - [`response`] - response plus receipt
//! - [`transport`] - the HTTP transport seam
//! - [`fetch`] - the paying fetch orchestrator
//! - [`config`] - JSON-loadable client configuration
//! - [`client`] - `reqwest-middleware` integration

pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod fetch;
pub mod options;
pub mod response;
pub mod transport;

pub use config::ClientConfig;
pub use error::{ConfigError, FetchError, MiddlewareError};
pub use fetch::IlpFetch;
pub use options::FetchOptions;
pub use response::FetchResponse;
pub use transport::HttpTransport;
