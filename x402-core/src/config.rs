//! Per-resource pricing configuration, as an origin would declare it.
//!
//! # Example
//!
//! ```
//! use x402_core::config::ResourceConfig;
//! use x402_proto::Network;
//!
//! let cfg: ResourceConfig = serde_json::from_value(serde_json::json!({
//!     "priceUsd": "0.01",
//!     "network": "solana-devnet",
//! }))
//! .unwrap();
//! assert_eq!(cfg.network, Network::SolanaDevnet);
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use x402_proto::Network;

/// What a resource owner declares about a single protected route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceConfig {
    /// Price in display-unit USD, e.g. `"0.01"`.
    pub price_usd: Decimal,
    /// Network the generated requirement targets.
    pub network: Network,
    /// Overrides [`x402_proto::requirement::DEFAULT_MAX_TIMEOUT_SECONDS`]
    /// when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_timeout_seconds: Option<u64>,
    /// Human-readable description surfaced in the generated requirement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn deserializes_from_camel_case_json() {
        let cfg: ResourceConfig = serde_json::from_value(serde_json::json!({
            "priceUsd": "0.05",
            "network": "solana-mainnet",
            "maxTimeoutSeconds": 120,
        }))
        .unwrap();
        assert_eq!(cfg.price_usd, Decimal::from_str("0.05").unwrap());
        assert_eq!(cfg.network, Network::SolanaMainnet);
        assert_eq!(cfg.max_timeout_seconds, Some(120));
    }
}
