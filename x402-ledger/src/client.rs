//! The RPC collaborator interface expected from the ledger client (§6).
//!
//! `LedgerClient` is deliberately narrow — `getTransaction` and
//! `getAccountInfo` are the only two calls the verifiers make. Both are
//! assumed idempotent and safe to cache negatively for the lifetime of a
//! request.

use std::time::Duration;

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcTransactionConfig;
use solana_commitment_config::CommitmentConfig;
use solana_transaction_status_client_types::option_serializer::OptionSerializer;
use solana_transaction_status_client_types::{UiTransactionEncoding, UiTransactionTokenBalance};

use x402_core::PaymentError;

/// One entry of a transaction's pre/post token-balance snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBalanceRecord {
    /// Index into the transaction's static account keys.
    pub account_index: u8,
    /// Base58 mint address.
    pub mint: String,
    /// Base58 owner of the token account, when the RPC node reports it.
    pub owner: Option<String>,
    /// Raw token amount, in base units.
    pub amount: u64,
}

/// A transaction record as returned by the ledger RPC for a given signature.
#[derive(Debug, Clone)]
pub struct TransactionRecord {
    /// Account keys in the order instructions reference them, base58.
    pub account_keys: Vec<String>,
    /// `Some(reason)` if the transaction reverted on-chain.
    pub error: Option<String>,
    /// Token balances before the transaction's instructions ran.
    pub pre_token_balances: Vec<TokenBalanceRecord>,
    /// Token balances after the transaction's instructions ran.
    pub post_token_balances: Vec<TokenBalanceRecord>,
    /// Seconds since the Unix epoch the block was produced, when known.
    pub block_time: Option<i64>,
    /// Slot the transaction was confirmed in.
    pub slot: u64,
}

/// Raw on-chain account data as returned by `getAccountInfo`.
#[derive(Debug, Clone)]
pub struct AccountInfoRecord {
    /// Raw account data.
    pub data: Vec<u8>,
    /// Base58 owning program.
    pub owner: String,
    /// Account balance in lamports.
    pub lamports: u64,
}

/// The RPC surface the verifiers require from the ledger.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Fetches the transaction for `signature` at the given commitment.
    /// Returns `Ok(None)` if the RPC has no record of it.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Rpc`] on transport failure or timeout.
    async fn get_transaction(&self, signature: &str) -> Result<Option<TransactionRecord>, PaymentError>;

    /// Fetches account data for `address`. Returns `Ok(None)` if the account
    /// does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Rpc`] on transport failure or timeout.
    async fn get_account_info(&self, address: &str) -> Result<Option<AccountInfoRecord>, PaymentError>;
}

/// A [`LedgerClient`] backed by a real Solana JSON-RPC endpoint.
pub struct RpcLedgerClient {
    inner: RpcClient,
    timeout: Duration,
}

impl std::fmt::Debug for RpcLedgerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcLedgerClient").field("timeout", &self.timeout).finish_non_exhaustive()
    }
}

impl RpcLedgerClient {
    /// Connects to `url`, bounding every RPC call with `timeout` (default
    /// 10s per the concurrency model's deadline policy).
    #[must_use]
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self { inner: RpcClient::new(url.into()), timeout }
    }
}

fn to_option<T>(value: OptionSerializer<T>) -> Option<T> {
    match value {
        OptionSerializer::Some(v) => Some(v),
        OptionSerializer::None | OptionSerializer::Skip => None,
    }
}

fn convert_balance(balance: &UiTransactionTokenBalance) -> Option<TokenBalanceRecord> {
    let amount: u64 = balance.ui_token_amount.amount.parse().ok()?;
    Some(TokenBalanceRecord {
        account_index: balance.account_index,
        mint: balance.mint.clone(),
        owner: to_option(balance.owner.clone()),
        amount,
    })
}

#[async_trait]
impl LedgerClient for RpcLedgerClient {
    async fn get_transaction(&self, signature: &str) -> Result<Option<TransactionRecord>, PaymentError> {
        let sig = signature.parse().map_err(|e| PaymentError::Rpc(format!("invalid signature: {e}")))?;
        let config = RpcTransactionConfig { encoding: Some(UiTransactionEncoding::Json), commitment: Some(CommitmentConfig::confirmed()), max_supported_transaction_version: Some(0) };

        let fetch = self.inner.get_transaction_with_config(&sig, config);
        let response = match tokio::time::timeout(self.timeout, fetch).await {
            Ok(Ok(tx)) => tx,
            // getTransaction returns a `null` JSON-RPC result for an unknown
            // signature, which fails to deserialize into the non-`Option`
            // response type; that's the only case that means "not found".
            Ok(Err(e)) if matches!(e.kind(), solana_client::client_error::ClientErrorKind::SerdeJson(_)) => return Ok(None),
            Ok(Err(e)) => return Err(PaymentError::Rpc(e.to_string())),
            Err(_) => return Err(PaymentError::Rpc("getTransaction timed out".to_string())),
        };

        let Some(meta) = response.transaction.meta else {
            return Err(PaymentError::Rpc("transaction response missing metadata".to_string()));
        };

        let account_keys = response
            .transaction
            .transaction
            .decode()
            .map(|tx| tx.message.static_account_keys().iter().map(ToString::to_string).collect())
            .unwrap_or_default();

        let error = meta.err.map(|e| e.to_string());
        let pre_token_balances = to_option(meta.pre_token_balances).unwrap_or_default().iter().filter_map(convert_balance).collect();
        let post_token_balances = to_option(meta.post_token_balances).unwrap_or_default().iter().filter_map(convert_balance).collect();

        Ok(Some(TransactionRecord { account_keys, error, pre_token_balances, post_token_balances, block_time: response.block_time, slot: response.slot }))
    }

    async fn get_account_info(&self, address: &str) -> Result<Option<AccountInfoRecord>, PaymentError> {
        let pubkey = address.parse().map_err(|e| PaymentError::Rpc(format!("invalid address: {e}")))?;
        let fetch = self.inner.get_account_with_commitment(&pubkey, CommitmentConfig::confirmed());
        let response = tokio::time::timeout(self.timeout, fetch).await.map_err(|_| PaymentError::Rpc("getAccountInfo timed out".to_string()))?;
        let response = response.map_err(|e| PaymentError::Rpc(e.to_string()))?;
        Ok(response.value.map(|account| AccountInfoRecord { data: account.data, owner: account.owner.to_string(), lamports: account.lamports }))
    }
}
