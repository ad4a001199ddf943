//! Structural decode errors for protocol wire types.

use thiserror::Error;

/// Failure decoding a proof, a requirements document, or a facilitator body.
///
/// `ProtocolError` covers only *structural* failures — malformed JSON,
/// missing fields, unrecognized enum values. Semantic validation (does the
/// transfer actually satisfy the requirement) lives one layer up.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The input was not valid base64.
    #[error("not valid base64: {0}")]
    InvalidBase64(String),
    /// The decoded bytes were not valid UTF-8.
    #[error("not valid utf-8")]
    InvalidUtf8,
    /// The JSON payload could not be parsed.
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
    /// A required field was absent.
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    /// `scheme` was present but not one this crate recognizes.
    #[error("unrecognized scheme: {0}")]
    UnrecognizedScheme(String),
    /// `network` was present but not one this crate recognizes.
    #[error("unrecognized network: {0}")]
    UnrecognizedNetwork(String),
    /// `x402Version` did not equal the supported version.
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u32),
}
