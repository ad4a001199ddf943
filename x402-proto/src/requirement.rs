//! `PaymentRequirement` and the 402 response body that carries it.

use serde::{Deserialize, Serialize};

/// Which payment scheme a requirement accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// A single settlement transaction for the stated amount.
    Exact,
    /// An incremental off-chain claim against an on-chain channel.
    Channel,
}

impl Scheme {
    /// The stable wire identifier for this scheme.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Channel => "channel",
        }
    }
}

/// The ledger network a requirement is denominated on.
///
/// The underlying ledger is Solana; the two supported clusters are the ones
/// a production facilitator actually serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Network {
    /// Solana devnet, used for testing.
    #[serde(rename = "solana-devnet")]
    SolanaDevnet,
    /// Solana mainnet-beta.
    #[serde(rename = "solana-mainnet")]
    SolanaMainnet,
}

impl Network {
    /// The stable wire identifier for this network.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SolanaDevnet => "solana-devnet",
            Self::SolanaMainnet => "solana-mainnet",
        }
    }
}

/// Default age limit, in seconds, for the ledger transaction a proof cites.
pub const DEFAULT_MAX_TIMEOUT_SECONDS: u64 = 300;

/// What an origin demands in order to serve a protected resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirement {
    /// Which scheme satisfies this requirement.
    pub scheme: Scheme,
    /// Which ledger network the transfer or channel must live on.
    pub network: Network,
    /// Minimum transfer amount, in asset base units (micro-units for a
    /// 6-decimal stablecoin).
    pub max_amount_required: u64,
    /// Opaque identifier the payment binds to — typically a request path.
    pub resource: String,
    /// Base58 ledger account that must receive the transfer (`exact`) or
    /// that must be the channel's authorized server (`channel`).
    pub pay_to: String,
    /// Base58 mint identifier of the required asset.
    pub asset: String,
    /// Maximum age, in seconds, of the cited ledger transaction at
    /// verification time.
    #[serde(default = "default_max_timeout_seconds")]
    pub max_timeout_seconds: u64,
    /// Human-readable description of the resource. Not verified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// MIME type of the protected response. Not verified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// JSON schema describing the response body. Not verified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<serde_json::Value>,
    /// Scheme-specific descriptive metadata. Not verified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

const fn default_max_timeout_seconds() -> u64 {
    DEFAULT_MAX_TIMEOUT_SECONDS
}

impl PaymentRequirement {
    /// Starts building an `exact`-scheme requirement with the given
    /// recipient, asset, amount, and resource.
    #[must_use]
    pub fn exact(network: Network, pay_to: impl Into<String>, asset: impl Into<String>, max_amount_required: u64, resource: impl Into<String>) -> Self {
        Self {
            scheme: Scheme::Exact,
            network,
            max_amount_required,
            resource: resource.into(),
            pay_to: pay_to.into(),
            asset: asset.into(),
            max_timeout_seconds: DEFAULT_MAX_TIMEOUT_SECONDS,
            description: None,
            mime_type: None,
            output_schema: None,
            extra: None,
        }
    }
}

/// The 402 response body: one or more acceptable requirements, the first
/// matching one of which is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirementsDocument {
    /// Protocol version this document was produced under; always 1.
    pub x402_version: u32,
    /// Acceptable requirements, in preference order (tiered pricing).
    pub accepts: Vec<PaymentRequirement>,
    /// Human-readable explanation of why payment is required, or of a prior
    /// proof's failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PaymentRequirementsDocument {
    /// Wraps a list of requirements with no error message.
    #[must_use]
    pub fn new(accepts: Vec<PaymentRequirement>) -> Self {
        Self { x402_version: crate::X402_VERSION, accepts, error: None }
    }

    /// Wraps a list of requirements alongside an explanation of a failed
    /// proof.
    #[must_use]
    pub fn with_error(accepts: Vec<PaymentRequirement>, error: impl Into<String>) -> Self {
        Self { x402_version: crate::X402_VERSION, accepts, error: Some(error.into()) }
    }
}
