//! The transfer verifier (C5).

use std::sync::Arc;
use std::time::Duration;

use x402_core::clock::Clock;
use x402_core::error::{PaymentError, TransferMismatchDetail};
use x402_core::result::{TransferRecord, VerificationOutcome};
use x402_proto::proof::ProofPayload;
use x402_proto::{PaymentProof, PaymentRequirement};

use crate::client::LedgerClient;
use crate::parser::parse_transfers;
use crate::replay::{ConsumeOutcome, ReplayCache, ReplayMetadata, ttl_for};

/// Tuning knobs for [`TransferVerifier::verify_proof`].
#[derive(Debug, Clone, Copy)]
pub struct VerifyOptions {
    /// Bypass the replay check — only ever set by a caller that has already
    /// confirmed uniqueness itself (e.g. a dry-run `verify` call that never
    /// reaches settlement).
    pub skip_replay_check: bool,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self { skip_replay_check: false }
    }
}

/// Validates that an on-chain transfer satisfies a declared requirement
/// (§4.3).
pub struct TransferVerifier {
    client: Arc<dyn LedgerClient>,
    replay: Arc<dyn ReplayCache>,
    clock: Arc<dyn Clock>,
    min_replay_ttl: Duration,
}

impl std::fmt::Debug for TransferVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferVerifier").field("min_replay_ttl", &self.min_replay_ttl).finish_non_exhaustive()
    }
}

impl TransferVerifier {
    /// Builds a verifier over the given ledger client and replay cache.
    #[must_use]
    pub fn new(client: Arc<dyn LedgerClient>, replay: Arc<dyn ReplayCache>, clock: Arc<dyn Clock>, min_replay_ttl: Duration) -> Self {
        Self { client, replay, clock, min_replay_ttl }
    }

    /// Verifies a decoded `exact`-scheme proof against `requirement`.
    ///
    /// # Errors
    ///
    /// Returns the first [`PaymentError`] variant from §4.3's ordered
    /// procedure that applies.
    pub async fn verify_proof(&self, proof: &PaymentProof, requirement: &PaymentRequirement, opts: VerifyOptions) -> Result<VerificationOutcome, PaymentError> {
        let ProofPayload::Exact(payload) = proof.parse_payload()? else {
            return Err(PaymentError::InvalidHeader("proof payload does not match exact scheme".to_string()));
        };
        self.verify(&payload.signature, requirement, opts).await
    }

    /// Verifies a settlement `signature` directly against an ad hoc
    /// requirement, without a decoded proof — useful for callers settling a
    /// transfer outside the `X-PAYMENT` header flow (e.g. a reconciliation
    /// job replaying a known signature).
    ///
    /// # Errors
    ///
    /// Returns the first applicable [`PaymentError`] from §4.3's ordered
    /// procedure.
    pub async fn verify_signature(&self, signature: &str, requirement: &PaymentRequirement, opts: VerifyOptions) -> Result<VerificationOutcome, PaymentError> {
        self.verify(signature, requirement, opts).await
    }

    /// Verifies a settlement `signature` against `requirement`, in the
    /// ordered procedure of §4.3.
    ///
    /// # Errors
    ///
    /// Returns the first applicable [`PaymentError`] from that procedure.
    async fn verify(&self, signature: &str, requirement: &PaymentRequirement, opts: VerifyOptions) -> Result<VerificationOutcome, PaymentError> {
        // Step 2: consult the replay cache before doing any chain work.
        if !opts.skip_replay_check {
            if let Some(existing) = self.replay.peek(signature).await? {
                tracing::debug!(signature, resource = %existing.metadata.resource, "rejecting replayed signature");
                return Err(PaymentError::ReplayAttack);
            }
        }

        // Step 3: fetch at "confirmed" commitment.
        let tx = self.client.get_transaction(signature).await?.ok_or(PaymentError::TxNotFound)?;
        if tx.error.is_some() {
            return Err(PaymentError::TxFailed);
        }

        // Step 4: parse and select a qualifying transfer.
        let candidates = parse_transfers(&tx);
        if candidates.is_empty() {
            return Err(PaymentError::NoTokenTransfer);
        }
        let transfer = candidates
            .into_iter()
            .find(|t| t.destination == requirement.pay_to && t.mint == requirement.asset && t.amount >= requirement.max_amount_required && t.destination != t.source)
            .ok_or_else(|| self.mismatch_detail(&tx))?;

        // Step 5: age check.
        let block_time = tx.block_time.ok_or_else(|| PaymentError::Rpc("transaction missing blockTime".to_string()))?;
        let now = self.clock.now();
        let age = now.as_secs().saturating_sub(u64::try_from(block_time).unwrap_or(0));
        if age > requirement.max_timeout_seconds {
            return Err(PaymentError::TxExpired);
        }

        // Step 6: the one serializing write. A race loser here still burns
        // nothing extra — it returns ReplayAttack just like a pre-existing
        // replay would.
        let metadata = ReplayMetadata { resource: requirement.resource.clone(), amount: transfer.amount, payer: transfer.authority.clone() };
        let ttl = ttl_for(requirement, self.min_replay_ttl);
        match self.replay.try_consume(signature, metadata, ttl).await? {
            ConsumeOutcome::FirstTime => {}
            ConsumeOutcome::AlreadyConsumed(_) => return Err(PaymentError::ReplayAttack),
        }

        Ok(VerificationOutcome {
            payer: Some(transfer.authority.clone()),
            signature: Some(signature.to_string()),
            block_time: Some(block_time),
            slot: Some(tx.slot),
            amount: transfer.amount,
            transfer: Some(transfer),
        })
    }

    fn mismatch_detail(&self, tx: &crate::client::TransactionRecord) -> PaymentError {
        let found: Vec<String> = parse_transfers(tx).into_iter().map(|t: TransferRecord| format!("{t:?}")).collect();
        PaymentError::TransferMismatch(TransferMismatchDetail { found })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use x402_core::clock::FixedClock;
    use x402_proto::{Network, Scheme};

    use crate::client::{AccountInfoRecord, TokenBalanceRecord, TransactionRecord};
    use crate::replay::InMemoryReplayCache;

    use super::*;

    struct FakeClient {
        tx: Option<TransactionRecord>,
    }

    #[async_trait]
    impl LedgerClient for FakeClient {
        async fn get_transaction(&self, _signature: &str) -> Result<Option<TransactionRecord>, PaymentError> {
            Ok(self.tx.clone())
        }

        async fn get_account_info(&self, _address: &str) -> Result<Option<AccountInfoRecord>, PaymentError> {
            Ok(None)
        }
    }

    fn happy_path_tx(amount: u64, block_time: i64) -> TransactionRecord {
        TransactionRecord {
            account_keys: vec!["W".to_string(), "R".to_string()],
            error: None,
            pre_token_balances: vec![TokenBalanceRecord { account_index: 0, mint: "A".to_string(), owner: Some("W".to_string()), amount: 10_000 }],
            post_token_balances: vec![
                TokenBalanceRecord { account_index: 0, mint: "A".to_string(), owner: Some("W".to_string()), amount: 10_000 - amount },
                TokenBalanceRecord { account_index: 1, mint: "A".to_string(), owner: Some("R".to_string()), amount },
            ],
            block_time: Some(block_time),
            slot: 42,
        }
    }

    fn requirement(max_amount: u64) -> PaymentRequirement {
        let mut req = PaymentRequirement::exact(Network::SolanaDevnet, "R", "A", max_amount, "/paid");
        req.max_timeout_seconds = 300;
        req
    }

    fn proof(signature: &str) -> PaymentProof {
        PaymentProof { x402_version: 1, scheme: Scheme::Exact, network: Network::SolanaDevnet, payload: serde_json::json!({ "signature": signature }) }
    }

    fn verifier(tx: Option<TransactionRecord>, now_secs: u64) -> TransferVerifier {
        TransferVerifier::new(
            Arc::new(FakeClient { tx }),
            Arc::new(InMemoryReplayCache::new(Arc::new(FixedClock::new(now_secs)))),
            Arc::new(FixedClock::new(now_secs)),
            Duration::from_secs(600),
        )
    }

    #[tokio::test]
    async fn happy_path_verifies_and_consumes_replay() {
        let v = verifier(Some(happy_path_tx(1000, 990)), 1000);
        let outcome = v.verify_proof(&proof("S1"), &requirement(1000), VerifyOptions::default()).await.unwrap();
        assert_eq!(outcome.amount, 1000);
        assert_eq!(outcome.payer.as_deref(), Some("W"));
    }

    #[tokio::test]
    async fn replayed_signature_is_rejected() {
        let v = verifier(Some(happy_path_tx(1000, 990)), 1000);
        v.verify_proof(&proof("S1"), &requirement(1000), VerifyOptions::default()).await.unwrap();
        let err = v.verify_proof(&proof("S1"), &requirement(1000), VerifyOptions::default()).await.unwrap_err();
        assert_eq!(err.kind(), "ReplayAttack");
    }

    #[tokio::test]
    async fn underpayment_is_transfer_mismatch() {
        let v = verifier(Some(happy_path_tx(999, 990)), 1000);
        let err = v.verify_proof(&proof("S1"), &requirement(1000), VerifyOptions::default()).await.unwrap_err();
        assert_eq!(err.kind(), "TransferMismatch");
    }

    #[tokio::test]
    async fn missing_transaction_is_tx_not_found() {
        let v = verifier(None, 1000);
        let err = v.verify_proof(&proof("S1"), &requirement(1000), VerifyOptions::default()).await.unwrap_err();
        assert_eq!(err.kind(), "TxNotFound");
    }

    #[tokio::test]
    async fn failed_transaction_is_tx_failed() {
        let mut tx = happy_path_tx(1000, 990);
        tx.error = Some("InstructionError".to_string());
        let v = verifier(Some(tx), 1000);
        let err = v.verify_proof(&proof("S1"), &requirement(1000), VerifyOptions::default()).await.unwrap_err();
        assert_eq!(err.kind(), "TxFailed");
    }

    #[tokio::test]
    async fn transaction_older_than_timeout_is_expired() {
        // now=1000, blockTime=690 -> age=310 > maxTimeoutSeconds=300
        let v = verifier(Some(happy_path_tx(1000, 690)), 1000);
        let err = v.verify_proof(&proof("S1"), &requirement(1000), VerifyOptions::default()).await.unwrap_err();
        assert_eq!(err.kind(), "TxExpired");
    }

    #[tokio::test]
    async fn transaction_at_exactly_the_timeout_boundary_is_accepted() {
        // now=1000, blockTime=700 -> age=300 == maxTimeoutSeconds
        let v = verifier(Some(happy_path_tx(1000, 700)), 1000);
        let outcome = v.verify_proof(&proof("S1"), &requirement(1000), VerifyOptions::default()).await.unwrap();
        assert_eq!(outcome.amount, 1000);
    }
}
