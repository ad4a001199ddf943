//! The settlement-channel claim verifier (C6).
//!
//! A channel account is a fixed 170-byte layout (no Borsh/Anchor reflection —
//! offsets are read directly, matching how the facilitator's on-chain program
//! lays the account out):
//!
//! ```text
//! 0..8    discriminator
//! 8..40   channel_id   (32 bytes)
//! 40..72  client       (32 bytes, pubkey)
//! 72..104 server       (32 bytes, pubkey)
//! 104..112 client_deposit  (u64 LE)
//! 112..120 server_claimed  (u64 LE)
//! 120..128 nonce           (u64 LE)
//! 128..136 expiry          (i64 LE, 0 = none)
//! 136     status       (0=Open, 1=Closed, 2=Disputed)
//! 137..145 created_at      (i64 LE)
//! 145..153 last_update     (i64 LE)
//! 153..161 debt_owed       (u64 LE)
//! 161..169 credit_limit    (u64 LE)
//! 169     bump
//! ```

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use x402_core::PaymentError;
use x402_core::result::VerificationOutcome;
use x402_proto::PaymentRequirement;
use x402_proto::proof::ChannelProofPayload;

use crate::address::parse_pubkey;
use crate::client::LedgerClient;

/// Decodes a claim's raw base64 Ed25519 signature bytes (not JSON-wrapped —
/// unlike [`x402_core::encoding`], this is a bare binary payload).
fn decode_signature_bytes(value: &str) -> Result<Vec<u8>, PaymentError> {
    let trimmed = value.trim();
    STANDARD.decode(trimmed).or_else(|_| URL_SAFE.decode(trimmed)).map_err(|e| PaymentError::ChannelInvalidPayload(format!("signature is not valid base64: {e}")))
}

/// Minimum byte length of a channel account.
pub const CHANNEL_ACCOUNT_LEN: usize = 170;

/// Domain separator prefixed to every canonical claim message, preventing a
/// signature over one message type from being replayed as another.
const CLAIM_DOMAIN: &[u8; 21] = b"x402-channel-claim-v1";

/// A channel's lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    /// Accepting claims.
    Open,
    /// Cooperatively closed; no further claims accepted.
    Closed,
    /// Under on-chain dispute; no further claims accepted.
    Disputed,
}

impl ChannelStatus {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Self::Open),
            1 => Some(Self::Closed),
            2 => Some(Self::Disputed),
            _ => None,
        }
    }
}

/// A decoded channel account.
#[derive(Debug, Clone)]
pub struct ChannelRecord {
    /// Base58 channel account address (the seed the claim names).
    pub channel_id: String,
    /// Base58 client (payer) pubkey; the claim's signing key.
    pub client: String,
    /// Base58 server (payee) pubkey; must equal the requirement's `payTo`.
    pub server: String,
    /// Total deposited by the client, in asset base units.
    pub client_deposit: u64,
    /// Cumulative amount the server has already claimed.
    pub server_claimed: u64,
    /// Last claim nonce recorded on-chain.
    pub nonce: u64,
    /// Unix-seconds channel expiry, or `0` for none.
    pub expiry: i64,
    /// Lifecycle state.
    pub status: ChannelStatus,
    /// Credit extended to the client beyond their deposit.
    pub credit_limit: u64,
}

impl ChannelRecord {
    /// Decodes a channel account's raw data.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::ChannelNotFound`] if `data` is shorter than
    /// [`CHANNEL_ACCOUNT_LEN`], or [`PaymentError::ChannelInvalidPayload`] if
    /// the status byte is out of range.
    pub fn decode(channel_id: &str, data: &[u8]) -> Result<Self, PaymentError> {
        if data.len() < CHANNEL_ACCOUNT_LEN {
            return Err(PaymentError::ChannelNotFound);
        }
        let u64_at = |range: std::ops::Range<usize>| u64::from_le_bytes(data[range].try_into().expect("8-byte slice"));
        let i64_at = |range: std::ops::Range<usize>| i64::from_le_bytes(data[range].try_into().expect("8-byte slice"));

        let status = ChannelStatus::from_byte(data[136]).ok_or_else(|| PaymentError::ChannelInvalidPayload(format!("unknown channel status byte {}", data[136])))?;

        Ok(Self {
            channel_id: channel_id.to_string(),
            client: bs58::encode(&data[40..72]).into_string(),
            server: bs58::encode(&data[72..104]).into_string(),
            client_deposit: u64_at(104..112),
            server_claimed: u64_at(112..120),
            nonce: u64_at(120..128),
            expiry: i64_at(128..136),
            status,
            credit_limit: u64_at(161..169),
        })
    }
}

/// Tuning knobs for [`ChannelVerifier::verify_claim`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelVerifyOptions {
    /// Minimum incremental amount a claim must add over the channel's
    /// previously recorded `server_claimed`, below which the claim is
    /// rejected as not worth settling. `None` disables the check.
    pub min_claim_increment: Option<u64>,
}

/// Validates incremental claims against an on-chain channel (§4.5).
pub struct ChannelVerifier {
    client: Arc<dyn LedgerClient>,
}

impl std::fmt::Debug for ChannelVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelVerifier").finish_non_exhaustive()
    }
}

impl ChannelVerifier {
    /// Builds a verifier over the given ledger client.
    #[must_use]
    pub fn new(client: Arc<dyn LedgerClient>) -> Self {
        Self { client }
    }

    /// Validates `claim` against the on-chain channel it names, in the
    /// ordered procedure of §4.5.
    ///
    /// # Errors
    ///
    /// Returns the first applicable `Channel*` [`PaymentError`] variant.
    pub async fn verify_claim(&self, claim: &ChannelProofPayload, requirement: &PaymentRequirement, now_secs: i64, opts: ChannelVerifyOptions) -> Result<VerificationOutcome, PaymentError> {
        let amount: u64 = claim.amount.parse().map_err(|_| PaymentError::ChannelInvalidPayload(format!("amount {:?} is not a u64", claim.amount)))?;
        let nonce: u64 = claim.nonce.parse().map_err(|_| PaymentError::ChannelInvalidPayload(format!("nonce {:?} is not a u64", claim.nonce)))?;
        let expiry: u64 = match &claim.expiry {
            Some(raw) => raw.parse().map_err(|_| PaymentError::ChannelInvalidPayload(format!("expiry {raw:?} is not a u64")))?,
            None => 0,
        };
        let signature_bytes = decode_signature_bytes(&claim.signature)?;

        let account = self.client.get_account_info(&claim.channel_id).await?.ok_or(PaymentError::ChannelNotFound)?;
        let channel = ChannelRecord::decode(&claim.channel_id, &account.data)?;

        if channel.status != ChannelStatus::Open {
            return Err(PaymentError::ChannelNotOpen);
        }
        if channel.server != requirement.pay_to {
            return Err(PaymentError::ChannelWrongServer);
        }
        if nonce <= channel.nonce {
            return Err(PaymentError::ChannelInvalidNonce);
        }
        if amount < channel.server_claimed {
            return Err(PaymentError::ChannelAmountBackwards);
        }
        if amount > channel.client_deposit.saturating_add(channel.credit_limit) {
            return Err(PaymentError::ChannelInsufficientBalance);
        }
        let incremental = amount - channel.server_claimed;
        if let Some(min) = opts.min_claim_increment {
            if incremental < min {
                return Err(PaymentError::ChannelInsufficientBalance);
            }
        }
        if channel.expiry != 0 && now_secs > channel.expiry {
            return Err(PaymentError::ChannelClaimExpired);
        }

        let message = canonical_claim_message(&claim.channel_id, &channel.server, amount, nonce, expiry)?;
        let verifying_key = verifying_key_for(&channel.client)?;
        let signature = Signature::from_slice(&signature_bytes).map_err(|e| PaymentError::ChannelInvalidPayload(e.to_string()))?;
        verifying_key.verify(&message, &signature).map_err(|_| PaymentError::ChannelInvalidSignature)?;

        Ok(VerificationOutcome { transfer: None, signature: None, block_time: Some(now_secs), slot: None, payer: Some(channel.client.clone()), amount: incremental })
    }
}

fn canonical_claim_message(channel_id: &str, server: &str, amount: u64, nonce: u64, expiry: u64) -> Result<[u8; 109], PaymentError> {
    let channel_bytes = parse_pubkey(channel_id).map_err(|e| PaymentError::ChannelInvalidPayload(e.to_string()))?;
    let server_bytes = parse_pubkey(server).map_err(|e| PaymentError::ChannelInvalidPayload(e.to_string()))?;

    let mut message = [0u8; 109];
    message[0..21].copy_from_slice(CLAIM_DOMAIN);
    message[21..53].copy_from_slice(channel_bytes.as_ref());
    message[53..85].copy_from_slice(server_bytes.as_ref());
    message[85..93].copy_from_slice(&amount.to_le_bytes());
    message[93..101].copy_from_slice(&nonce.to_le_bytes());
    message[101..109].copy_from_slice(&expiry.to_le_bytes());
    Ok(message)
}

fn verifying_key_for(base58_pubkey: &str) -> Result<VerifyingKey, PaymentError> {
    let pubkey = parse_pubkey(base58_pubkey).map_err(|e| PaymentError::ChannelInvalidPayload(e.to_string()))?;
    VerifyingKey::from_bytes(&pubkey.to_bytes()).map_err(|e| PaymentError::ChannelInvalidPayload(e.to_string()))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use ed25519_dalek::{Signer, SigningKey};
    use x402_proto::Network;

    use crate::client::{AccountInfoRecord, TransactionRecord};

    use super::*;

    fn pack_channel(client: &str, server: &str, client_deposit: u64, server_claimed: u64, nonce: u64, expiry: i64, status: u8, credit_limit: u64) -> Vec<u8> {
        let mut data = vec![0u8; CHANNEL_ACCOUNT_LEN];
        data[40..72].copy_from_slice(&bs58::decode(client).into_vec().unwrap());
        data[72..104].copy_from_slice(&bs58::decode(server).into_vec().unwrap());
        data[104..112].copy_from_slice(&client_deposit.to_le_bytes());
        data[112..120].copy_from_slice(&server_claimed.to_le_bytes());
        data[120..128].copy_from_slice(&nonce.to_le_bytes());
        data[128..136].copy_from_slice(&expiry.to_le_bytes());
        data[136] = status;
        data[161..169].copy_from_slice(&credit_limit.to_le_bytes());
        data
    }

    struct FakeClient {
        data: Vec<u8>,
    }

    #[async_trait]
    impl LedgerClient for FakeClient {
        async fn get_transaction(&self, _signature: &str) -> Result<Option<TransactionRecord>, PaymentError> {
            Ok(None)
        }

        async fn get_account_info(&self, _address: &str) -> Result<Option<AccountInfoRecord>, PaymentError> {
            Ok(Some(AccountInfoRecord { data: self.data.clone(), owner: "program".to_string(), lamports: 1 }))
        }
    }

    fn keypair() -> (SigningKey, String) {
        let signing_key = SigningKey::from_bytes(&[7u8; 32]);
        let pubkey = bs58::encode(signing_key.verifying_key().to_bytes()).into_string();
        (signing_key, pubkey)
    }

    fn channel_id() -> String {
        bs58::encode([9u8; 32]).into_string()
    }

    fn sign_claim(signing_key: &SigningKey, channel_id: &str, server: &str, amount: u64, nonce: u64, expiry: u64) -> String {
        let message = canonical_claim_message(channel_id, server, amount, nonce, expiry).unwrap();
        let signature = signing_key.sign(&message);
        STANDARD.encode(signature.to_bytes())
    }

    fn requirement(server: &str) -> PaymentRequirement {
        PaymentRequirement::exact(Network::SolanaDevnet, server, "A", 1, "/paid")
    }

    #[tokio::test]
    async fn accepts_a_valid_incremental_claim() {
        let (signing_key, client_pk) = keypair();
        let (_, server_pk) = keypair();
        let channel_id = channel_id();
        let data = pack_channel(&client_pk, &server_pk, 10_000, 1000, 5, 0, 0, 0);
        let verifier = ChannelVerifier::new(Arc::new(FakeClient { data }));
        let claim = ChannelProofPayload {
            channel_id: channel_id.clone(),
            amount: "2000".to_string(),
            nonce: "6".to_string(),
            expiry: Some("0".to_string()),
            signature: sign_claim(&signing_key, &channel_id, &server_pk, 2000, 6, 0),
        };
        let outcome = verifier.verify_claim(&claim, &requirement(&server_pk), 100, ChannelVerifyOptions::default()).await.unwrap();
        assert_eq!(outcome.amount, 1000);
    }

    #[tokio::test]
    async fn stale_nonce_is_rejected() {
        let (signing_key, client_pk) = keypair();
        let (_, server_pk) = keypair();
        let channel_id = channel_id();
        let data = pack_channel(&client_pk, &server_pk, 10_000, 1000, 5, 0, 0, 0);
        let verifier = ChannelVerifier::new(Arc::new(FakeClient { data }));
        let claim = ChannelProofPayload {
            channel_id: channel_id.clone(),
            amount: "2000".to_string(),
            nonce: "5".to_string(),
            expiry: Some("0".to_string()),
            signature: sign_claim(&signing_key, &channel_id, &server_pk, 2000, 5, 0),
        };
        let err = verifier.verify_claim(&claim, &requirement(&server_pk), 100, ChannelVerifyOptions::default()).await.unwrap_err();
        assert_eq!(err.kind(), "ChannelInvalidNonce");
    }

    #[tokio::test]
    async fn amount_exceeding_balance_is_rejected() {
        let (signing_key, client_pk) = keypair();
        let (_, server_pk) = keypair();
        let channel_id = channel_id();
        let data = pack_channel(&client_pk, &server_pk, 1000, 0, 0, 0, 0, 0);
        let verifier = ChannelVerifier::new(Arc::new(FakeClient { data }));
        let claim = ChannelProofPayload {
            channel_id: channel_id.clone(),
            amount: "5000".to_string(),
            nonce: "1".to_string(),
            expiry: Some("0".to_string()),
            signature: sign_claim(&signing_key, &channel_id, &server_pk, 5000, 1, 0),
        };
        let err = verifier.verify_claim(&claim, &requirement(&server_pk), 100, ChannelVerifyOptions::default()).await.unwrap_err();
        assert_eq!(err.kind(), "ChannelInsufficientBalance");
    }

    #[tokio::test]
    async fn tampered_amount_fails_signature_check() {
        let (signing_key, client_pk) = keypair();
        let (_, server_pk) = keypair();
        let channel_id = channel_id();
        let data = pack_channel(&client_pk, &server_pk, 10_000, 0, 0, 0, 0, 0);
        let verifier = ChannelVerifier::new(Arc::new(FakeClient { data }));
        let claim = ChannelProofPayload {
            channel_id: channel_id.clone(),
            amount: "2000".to_string(),
            nonce: "1".to_string(),
            expiry: Some("0".to_string()),
            signature: sign_claim(&signing_key, &channel_id, &server_pk, 1999, 1, 0),
        };
        let err = verifier.verify_claim(&claim, &requirement(&server_pk), 100, ChannelVerifyOptions::default()).await.unwrap_err();
        assert_eq!(err.kind(), "ChannelInvalidSignature");
    }

    #[tokio::test]
    async fn closed_channel_is_rejected() {
        let (signing_key, client_pk) = keypair();
        let (_, server_pk) = keypair();
        let channel_id = channel_id();
        let data = pack_channel(&client_pk, &server_pk, 10_000, 0, 0, 0, 1, 0);
        let verifier = ChannelVerifier::new(Arc::new(FakeClient { data }));
        let claim = ChannelProofPayload {
            channel_id: channel_id.clone(),
            amount: "2000".to_string(),
            nonce: "1".to_string(),
            expiry: Some("0".to_string()),
            signature: sign_claim(&signing_key, &channel_id, &server_pk, 2000, 1, 0),
        };
        let err = verifier.verify_claim(&claim, &requirement(&server_pk), 100, ChannelVerifyOptions::default()).await.unwrap_err();
        assert_eq!(err.kind(), "ChannelNotOpen");
    }

    #[tokio::test]
    async fn expired_claim_is_rejected() {
        let (signing_key, client_pk) = keypair();
        let (_, server_pk) = keypair();
        let channel_id = channel_id();
        let data = pack_channel(&client_pk, &server_pk, 10_000, 0, 0, 0, 0, 0);
        let verifier = ChannelVerifier::new(Arc::new(FakeClient { data }));
        let claim = ChannelProofPayload {
            channel_id: channel_id.clone(),
            amount: "2000".to_string(),
            nonce: "1".to_string(),
            expiry: Some("50".to_string()),
            signature: sign_claim(&signing_key, &channel_id, &server_pk, 2000, 1, 50),
        };
        let err = verifier.verify_claim(&claim, &requirement(&server_pk), 100, ChannelVerifyOptions::default()).await.unwrap_err();
        assert_eq!(err.kind(), "ChannelClaimExpired");
    }
}
