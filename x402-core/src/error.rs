//! The error taxonomy shared by every verification path.
//!
//! Every failure a proof can produce has a stable, lowerCamelCase identifier
//! (`kind()`) that is surfaced verbatim as `invalidReason` in a facilitator
//! response or as the `error` field of a 402 body. Protocol-level failures
//! (everything except [`PaymentError::Rpc`] and [`PaymentError::Internal`])
//! never escalate past a 402; only transport or programming errors produce a
//! 5xx.

use thiserror::Error;

/// A structured debug payload attached to [`PaymentError::TransferMismatch`],
/// enumerating what was actually found on-chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferMismatchDetail {
    /// Transfers the parser actually extracted, rendered for diagnostics.
    pub found: Vec<String>,
}

/// Every way a proof can fail verification or settlement.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Structural failure decoding the proof (§4.1).
    #[error("invalid X-PAYMENT header: {0}")]
    InvalidHeader(String),
    /// The requirement names a scheme this deployment does not serve.
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),
    /// The requirement names a network this deployment does not serve.
    #[error("unsupported network: {0}")]
    UnsupportedNetwork(String),
    /// The proof's `x402Version` is not one this deployment understands.
    #[error("unsupported protocol version: {0}")]
    UnsupportedProtocolVersion(u32),
    /// The ledger RPC returned no record for the cited signature.
    #[error("transaction not found")]
    TxNotFound,
    /// The cited transaction exists but reverted on-chain.
    #[error("transaction failed on-chain")]
    TxFailed,
    /// The parser found no transfer for the required mint.
    #[error("no matching token transfer in transaction")]
    NoTokenTransfer,
    /// A transfer was found but its destination, mint, or amount disagrees
    /// with the requirement.
    #[error("transfer does not satisfy requirement")]
    TransferMismatch(TransferMismatchDetail),
    /// The cited transaction is older than `maxTimeoutSeconds` allows.
    #[error("transaction too old")]
    TxExpired,
    /// The signature (or channel claim) has already been consumed.
    #[error("signature already consumed")]
    ReplayAttack,
    /// The channel account does not exist or is shorter than the fixed
    /// layout.
    #[error("channel not found")]
    ChannelNotFound,
    /// The channel is not in the `Open` state.
    #[error("channel is not open")]
    ChannelNotOpen,
    /// The channel's server does not match the requirement's `payTo`.
    #[error("channel server does not match requirement")]
    ChannelWrongServer,
    /// The claim's nonce does not exceed the channel's recorded nonce.
    #[error("claim nonce is not greater than channel nonce")]
    ChannelInvalidNonce,
    /// The claim's amount is less than what the channel already recorded as
    /// claimed.
    #[error("claim amount is less than previously claimed amount")]
    ChannelAmountBackwards,
    /// The claim's amount exceeds the channel's deposit plus credit limit.
    #[error("claim amount exceeds channel balance")]
    ChannelInsufficientBalance,
    /// The claim's expiry has passed.
    #[error("claim has expired")]
    ChannelClaimExpired,
    /// The claim's Ed25519 signature does not verify under the channel's
    /// client key.
    #[error("claim signature is invalid")]
    ChannelInvalidSignature,
    /// The claim payload was structurally malformed (non-integer fields,
    /// wrong signature length, etc).
    #[error("invalid channel claim payload: {0}")]
    ChannelInvalidPayload(String),
    /// Transport failure talking to the ledger RPC.
    #[error("ledger rpc error: {0}")]
    Rpc(String),
    /// A configured resource price is non-positive or overflows a `u64`
    /// base-unit amount (§4.6).
    #[error("invalid resource price: {0}")]
    InvalidAmount(#[from] crate::amount::AmountError),
    /// A bug, not a protocol-level failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PaymentError {
    /// The stable identifier surfaced as `code` / `invalidReason` on the
    /// wire.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidHeader(_) => "InvalidHeader",
            Self::UnsupportedScheme(_) => "UnsupportedScheme",
            Self::UnsupportedNetwork(_) => "UnsupportedNetwork",
            Self::UnsupportedProtocolVersion(_) => "UnsupportedProtocolVersion",
            Self::TxNotFound => "TxNotFound",
            Self::TxFailed => "TxFailed",
            Self::NoTokenTransfer => "NoTokenTransfer",
            Self::TransferMismatch(_) => "TransferMismatch",
            Self::TxExpired => "TxExpired",
            Self::ReplayAttack => "ReplayAttack",
            Self::ChannelNotFound => "ChannelNotFound",
            Self::ChannelNotOpen => "ChannelNotOpen",
            Self::ChannelWrongServer => "ChannelWrongServer",
            Self::ChannelInvalidNonce => "ChannelInvalidNonce",
            Self::ChannelAmountBackwards => "ChannelAmountBackwards",
            Self::ChannelInsufficientBalance => "ChannelInsufficientBalance",
            Self::ChannelClaimExpired => "ChannelClaimExpired",
            Self::ChannelInvalidSignature => "ChannelInvalidSignature",
            Self::ChannelInvalidPayload(_) => "ChannelInvalidPayload",
            Self::Rpc(_) => "RpcError",
            Self::InvalidAmount(_) => "InvalidAmount",
            Self::Internal(_) => "Internal",
        }
    }

    /// Whether this error should surface as a 402 (protocol-level) rather
    /// than a 5xx (transport or programming failure).
    #[must_use]
    pub const fn is_protocol_level(&self) -> bool {
        !matches!(self, Self::Rpc(_) | Self::Internal(_))
    }
}

impl From<x402_proto::ProtocolError> for PaymentError {
    fn from(e: x402_proto::ProtocolError) -> Self {
        match e {
            x402_proto::ProtocolError::UnsupportedVersion(v) => Self::UnsupportedProtocolVersion(v),
            other => Self::InvalidHeader(other.to_string()),
        }
    }
}
