//! Registry of which stablecoin mint backs payments on each network (C1).

use std::collections::HashMap;

use x402_proto::Network;

/// Metadata for the stablecoin asset accepted on a network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetInfo {
    /// Base58 mint address.
    pub mint: String,
    /// Number of decimal places the mint's smallest unit represents.
    pub decimals: u8,
}

/// Maps a network to the single stablecoin asset this deployment accepts on
/// it.
///
/// A deployment only ever accepts one asset per network (minting new asset
/// types is explicitly out of scope), so this is a small fixed map rather
/// than a general-purpose registry.
#[derive(Debug, Clone, Default)]
pub struct AssetRegistry {
    assets: HashMap<Network, AssetInfo>,
}

impl AssetRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { assets: HashMap::new() }
    }

    /// Registers the asset accepted on `network`, replacing any prior entry.
    pub fn register(&mut self, network: Network, info: AssetInfo) {
        self.assets.insert(network, info);
    }

    /// Looks up the asset accepted on `network`.
    #[must_use]
    pub fn get(&self, network: Network) -> Option<&AssetInfo> {
        self.assets.get(&network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_and_looks_up_by_network() {
        let mut registry = AssetRegistry::new();
        registry.register(Network::SolanaDevnet, AssetInfo { mint: "A".to_string(), decimals: 6 });
        assert_eq!(registry.get(Network::SolanaDevnet).unwrap().mint, "A");
        assert!(registry.get(Network::SolanaMainnet).is_none());
    }
}
