//! Shared verification-outcome types produced by the transfer and channel
//! verifiers and consumed by the HTTP middleware and the facilitator façade.

/// One token transfer extracted from a ledger transaction (§3 `TransferRecord`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    /// Source token account.
    pub source: String,
    /// Destination token account.
    pub destination: String,
    /// Owner of the source account — the party who authorized the
    /// transfer.
    pub authority: String,
    /// Amount moved, in asset base units.
    pub amount: u64,
    /// Base58 mint address of the transferred asset.
    pub mint: String,
}

/// The outcome of a successful `exact` or `channel` verification.
///
/// A failure is represented as `Err(PaymentError)` rather than as a field on
/// this struct — see the design note on why a `Result` was chosen over the
/// boolean-flag shape a non-Rust rendition would use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationOutcome {
    /// The matched transfer, for `exact`-scheme verifications.
    pub transfer: Option<TransferRecord>,
    /// The settlement signature (`exact`) or claim signature (`channel`).
    pub signature: Option<String>,
    /// Ledger block time of the settlement transaction. Absent for
    /// `channel`.
    pub block_time: Option<i64>,
    /// Ledger slot of the settlement transaction. Absent for `channel`.
    pub slot: Option<u64>,
    /// The account that authorized payment.
    pub payer: Option<String>,
    /// Amount verified: the full transfer amount for `exact`, the
    /// incremental claim amount for `channel`.
    pub amount: u64,
}
