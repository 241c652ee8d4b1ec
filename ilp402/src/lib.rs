#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for paying HTTP 402 responses over Interledger STREAM.
//!
//! A server that wants to be paid answers `402 Payment Required` with a
//! `Pay` header naming the `interledger-stream` method, its ILP address and
//! a STREAM shared secret. This crate turns such a challenge into money:
//! it opens a STREAM connection, sends up to the caller's ceiling, and only
//! lets the retried request run once the receiver has acknowledged payment.
//!
//! HTTP itself lives in `ilp402-http`; the ledger plugin and the STREAM
//! protocol are supplied by the caller through [`plugin::LedgerPlugin`] and
//! [`stream::StreamTransport`].
//!
//! # Modules
//!
//! - [`challenge`] - Parsing of the `Pay` header
//! - [`error`] - Payment and plugin errors
//! - [`payer`] - Ceiling, challenge and plugin handling around a session
//! - [`plugin`] - Ledger plugins and their ownership
//! - [`price`] - The caller's price ceiling
//! - [`receipt`] - Amount paid and asset details
//! - [`session`] - The STREAM pay-then-retry session
//! - [`signal`] - Single-fire signals for STREAM events
//! - [`stream`] - STREAM transport traits
//! - [`token`] - `Pay-Token` generation and encoding
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation (on by default)
//! - `test-util` - In-memory plugin and STREAM fakes under `testing`

pub mod challenge;
pub mod error;
pub mod payer;
pub mod plugin;
pub mod price;
pub mod receipt;
pub mod session;
pub mod signal;
pub mod stream;
pub mod token;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use challenge::{PaymentChallenge, PaymentMethod, StreamParams};
pub use error::{BoxError, PaymentError, PluginError};
pub use payer::{Payer, PaymentContext};
pub use plugin::{LedgerHandle, LedgerPlugin, PluginFactory};
pub use price::{MaxPrice, MaxPriceError};
pub use receipt::{AssetDetails, PaymentReceipt};
pub use session::{PaidResponse, StreamSession};
pub use stream::{MoneyStream, StreamConnection, StreamTransport};
pub use token::PayToken;
