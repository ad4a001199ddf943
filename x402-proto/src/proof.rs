//! `PaymentProof` — the decoded `X-PAYMENT` header.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::requirement::{Network, Scheme};

/// The decoded `X-PAYMENT` header: a protocol version, a scheme/network
/// pair, and a scheme-specific payload.
///
/// The payload is kept as a [`serde_json::Value`] here because its shape
/// depends on the sibling `scheme` field rather than on an internal tag;
/// call [`PaymentProof::parse_payload`] to get a typed [`ProofPayload`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentProof {
    /// Protocol version the proof was constructed under.
    pub x402_version: u32,
    /// Which scheme this proof targets.
    pub scheme: Scheme,
    /// Which ledger network the proof's signature lives on.
    pub network: Network,
    /// Scheme-specific payload; see [`ExactProofPayload`] / [`ChannelProofPayload`].
    pub payload: serde_json::Value,
}

/// A typed, scheme-dispatched proof payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofPayload {
    /// A single on-chain settlement transaction.
    Exact(ExactProofPayload),
    /// An incremental signed claim against an on-chain channel.
    Channel(ChannelProofPayload),
}

/// Payload of an `exact`-scheme proof: the signature of the settlement
/// transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactProofPayload {
    /// Base58 ledger transaction signature.
    pub signature: String,
}

/// Payload of a `channel`-scheme proof: an incremental signed claim.
///
/// `amount`, `nonce`, and `expiry` are decimal strings on the wire (so large
/// `u64` values survive JSON's float-backed number type unscathed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProofPayload {
    /// Base58 channel account address.
    pub channel_id: String,
    /// Cumulative claimed amount, as a decimal string.
    pub amount: String,
    /// Claim nonce, as a decimal string.
    pub nonce: String,
    /// Optional claim expiry (unix seconds), as a decimal string. Absent or
    /// `"0"` means no expiry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
    /// Base64-encoded 64-byte Ed25519 signature over the canonical claim
    /// message.
    pub signature: String,
}

impl PaymentProof {
    /// Dispatches `payload` to the typed variant matching `scheme`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnsupportedVersion`] if `x402_version` does
    /// not match [`crate::X402_VERSION`], or [`ProtocolError::Json`] if
    /// `payload` does not match the shape required by `scheme`.
    pub fn parse_payload(&self) -> Result<ProofPayload, ProtocolError> {
        if self.x402_version != crate::X402_VERSION {
            return Err(ProtocolError::UnsupportedVersion(self.x402_version));
        }
        match self.scheme {
            Scheme::Exact => Ok(ProofPayload::Exact(serde_json::from_value(self.payload.clone())?)),
            Scheme::Channel => Ok(ProofPayload::Channel(serde_json::from_value(self.payload.clone())?)),
        }
    }
}
