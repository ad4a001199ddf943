//! Builds [`PaymentRequirement`] documents from a resource's price (C7).

use solana_pubkey::Pubkey;
use x402_core::PaymentError;
use x402_core::amount::UsdAmount;
use x402_core::asset::AssetInfo;
use x402_core::config::ResourceConfig;
use x402_proto::{PaymentRequirement, Scheme};

use crate::address::derive_ata;

/// Produces [`PaymentRequirement`] documents for a fixed recipient wallet and
/// asset.
///
/// `pay_to` is derived once, at construction, from the recipient wallet and
/// the asset mint — per §5's invariant that a requirement's `payTo` never
/// changes mid-flight, the generator resolves it eagerly rather than on each
/// call.
#[derive(Debug, Clone)]
pub struct RequirementsGenerator {
    pay_to: String,
    asset: AssetInfo,
}

impl RequirementsGenerator {
    /// Derives the recipient's associated token account for `asset.mint` and
    /// builds a generator around it.
    #[must_use]
    pub fn new(recipient_wallet: &Pubkey, asset: AssetInfo) -> Self {
        let mint = asset.mint.parse::<Pubkey>().expect("asset mint is a valid pubkey");
        let pay_to = derive_ata(recipient_wallet, &mint).to_string();
        Self { pay_to, asset }
    }

    /// Builds a single `exact`-scheme requirement for `config`'s price and
    /// resource path.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::InvalidAmount`] if `config.price_usd` is
    /// non-positive or overflows a `u64` base-unit amount (§4.6).
    pub fn generate(&self, config: &ResourceConfig, resource: impl Into<String>) -> Result<PaymentRequirement, PaymentError> {
        let max_amount_required = self.max_amount_required(config.price_usd)?;
        let mut requirement = PaymentRequirement::exact(config.network, self.pay_to.clone(), self.asset.mint.clone(), max_amount_required, resource);
        requirement.scheme = Scheme::Exact;
        requirement.max_timeout_seconds = config.max_timeout_seconds.unwrap_or(requirement.max_timeout_seconds);
        requirement.description = config.description.clone();
        Ok(requirement)
    }

    /// Builds one requirement per tier in `configs`, preserving order —
    /// tiered pricing is expressed as multiple `accepts` entries, the first
    /// of which a client satisfies wins.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::InvalidAmount`] if any tier's `price_usd` is
    /// non-positive or overflows a `u64` base-unit amount (§4.6).
    pub fn generate_multiple(&self, configs: &[ResourceConfig], resource: &str) -> Result<Vec<PaymentRequirement>, PaymentError> {
        configs.iter().map(|config| self.generate(config, resource.to_string())).collect()
    }

    fn max_amount_required(&self, price_usd: rust_decimal::Decimal) -> Result<u64, PaymentError> {
        Ok(UsdAmount::new(price_usd)?.to_micro_units(self.asset.decimals)?)
    }
}
