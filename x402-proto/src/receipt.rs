//! `PaymentReceipt` — the `X-PAYMENT-RESPONSE` header.

use serde::{Deserialize, Serialize};

/// Proof-of-verification attached to a successfully served response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    /// Base58 signature of the settlement transaction, or the channel's
    /// claim signature for channel-scheme payments.
    pub signature: String,
    /// Network the payment was verified on.
    pub network: String,
    /// Amount verified, in asset base units.
    pub amount: u64,
    /// Milliseconds since the Unix epoch, at the time the receipt was
    /// issued.
    pub timestamp: u64,
    /// Always `"verified"`; reserved for future receipt states.
    pub status: String,
    /// Ledger block time of the settlement transaction, seconds since the
    /// Unix epoch. Absent for channel-scheme payments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_time: Option<i64>,
    /// Ledger slot of the settlement transaction. Absent for channel-scheme
    /// payments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<u64>,
}

impl PaymentReceipt {
    /// Status value used for every receipt this crate emits.
    pub const VERIFIED: &'static str = "verified";
}
