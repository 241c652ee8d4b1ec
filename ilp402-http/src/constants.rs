//! HTTP-specific constants for paying over Interledger STREAM.

/// Request header carrying the base64url payment token (client → server).
pub const PAY_TOKEN_HEADER: &str = "Pay-Token";

/// Response header carrying the payment challenge (server → client).
pub const PAY_HEADER: &str = "Pay";

/// HTTP 402 Payment Required status code.
pub const HTTP_STATUS_PAYMENT_REQUIRED: u16 = 402;
