//! Associated-token-account derivation (C1, Solana-specific half).

use solana_pubkey::{Pubkey, pubkey};
use thiserror::Error;

/// The Associated Token Account program.
pub const ATA_PROGRAM_ID: Pubkey = pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");

/// A base58 string that failed to parse as a 32-byte public key.
#[derive(Debug, Error)]
#[error("invalid base58 address: {0}")]
pub struct InvalidAddress(pub String);

/// Parses a base58-encoded Solana address.
///
/// # Errors
///
/// Returns [`InvalidAddress`] if `s` is not valid base58 or does not decode
/// to exactly 32 bytes.
pub fn parse_pubkey(s: &str) -> Result<Pubkey, InvalidAddress> {
    s.parse().map_err(|_| InvalidAddress(s.to_string()))
}

/// Derives the associated token account for `owner` holding `mint`, under
/// the SPL Token program.
#[must_use]
pub fn derive_ata(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    let seeds = [owner.as_ref(), spl_token::ID.as_ref(), mint.as_ref()];
    Pubkey::find_program_address(&seeds, &ATA_PROGRAM_ID).0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let owner = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        assert_eq!(derive_ata(&owner, &mint), derive_ata(&owner, &mint));
    }

    #[test]
    fn different_owners_derive_different_atas() {
        let mint = Pubkey::new_unique();
        let a = derive_ata(&Pubkey::new_unique(), &mint);
        let b = derive_ata(&Pubkey::new_unique(), &mint);
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_invalid_base58() {
        assert!(parse_pubkey("not-base58!!!").is_err());
    }
}
