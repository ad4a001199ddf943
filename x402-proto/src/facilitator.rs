//! Request/response bodies for the facilitator HTTP surface (§4.8).

use serde::{Deserialize, Serialize};

use crate::requirement::{Network, PaymentRequirement, Scheme};

/// Body shared by `POST /verify` and `POST /settle`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    /// Protocol version the caller constructed this request under.
    pub x402_version: u32,
    /// The raw, still-encoded `X-PAYMENT` header value.
    pub payment_header: String,
    /// The requirement the header is claimed to satisfy.
    pub payment_requirements: PaymentRequirement,
}

/// `settle` takes the same shape as `verify`.
pub type SettleRequest = VerifyRequest;

/// Response to `POST /verify`. Never contacts the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    /// Whether the proof's structure, scheme, and network are acceptable.
    pub is_valid: bool,
    /// Stable error-kind identifier when `is_valid` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_reason: Option<String>,
}

impl VerifyResponse {
    /// A successful lightweight check.
    #[must_use]
    pub const fn valid() -> Self {
        Self { is_valid: true, invalid_reason: None }
    }

    /// A failed lightweight check, carrying the stable error-kind string.
    #[must_use]
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self { is_valid: false, invalid_reason: Some(reason.into()) }
    }
}

/// Response to `POST /settle`. Reflects a full on-chain verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleResponse {
    /// Whether the transfer or claim was verified and consumed.
    pub success: bool,
    /// Stable error-kind identifier when `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Base58 transaction signature, when one was involved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    /// Network the settlement happened on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_id: Option<String>,
}

impl SettleResponse {
    /// A successful settlement.
    #[must_use]
    pub fn success(tx_hash: impl Into<String>, network_id: impl Into<String>) -> Self {
        Self { success: true, error: None, tx_hash: Some(tx_hash.into()), network_id: Some(network_id.into()) }
    }

    /// A failed settlement, carrying the stable error-kind string.
    #[must_use]
    pub fn error(reason: impl Into<String>) -> Self {
        Self { success: false, error: Some(reason.into()), tx_hash: None, network_id: None }
    }
}

/// One supported scheme/network pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedPair {
    /// Scheme supported for `network`.
    pub scheme: Scheme,
    /// Network `scheme` is supported on.
    pub network: Network,
}

/// Response to `GET /supported`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedResponse {
    /// Cartesian product of configured schemes and networks.
    pub supported: Vec<SupportedPair>,
}
