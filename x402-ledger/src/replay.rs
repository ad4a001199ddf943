//! The replay-prevention cache (C4).
//!
//! `tryConsume` is the one serializing operation in the whole verification
//! pipeline (§5): at most one caller may ever see [`ConsumeOutcome::FirstTime`]
//! for a given signature. Everything else here exists to make that one
//! guarantee hold under a fleet of concurrent verifiers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;

use x402_core::PaymentError;
use x402_core::clock::Clock;
use x402_core::timestamp::UnixTimestamp;
use x402_proto::PaymentRequirement;

/// Never drop below this floor regardless of a requirement's declared
/// timeout, so clock skew between origin, client, and ledger can't shrink
/// the replay window (§4.4).
pub const MIN_REPLAY_TTL_SECONDS: u64 = 600;

/// What gets recorded alongside a consumed signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayMetadata {
    /// The resource path the payment was made against.
    pub resource: String,
    /// Amount consumed, in asset base units.
    pub amount: u64,
    /// The account that authorized the payment.
    pub payer: String,
}

/// A stored replay-cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayEntry {
    /// The signature this entry guards.
    pub signature: String,
    /// When this signature was first consumed.
    pub first_consumed_at: UnixTimestamp,
    /// When this entry may be purged.
    pub ttl_expires_at: UnixTimestamp,
    /// Caller-supplied metadata from the first consumption.
    pub metadata: ReplayMetadata,
}

/// Result of a `tryConsume` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// This call is the first to consume the signature.
    FirstTime,
    /// The signature was already consumed; carries the original metadata.
    AlreadyConsumed(ReplayEntry),
}

/// The "consume-once" contract a replay-cache backend must satisfy (§4.4).
#[async_trait]
pub trait ReplayCache: Send + Sync {
    /// Atomically marks `signature` as consumed, unless it already was.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Rpc`] on backend transport failure.
    async fn try_consume(&self, signature: &str, metadata: ReplayMetadata, ttl: Duration) -> Result<ConsumeOutcome, PaymentError>;

    /// Reads an entry without consuming it.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Rpc`] on backend transport failure.
    async fn peek(&self, signature: &str) -> Result<Option<ReplayEntry>, PaymentError>;

    /// Proactively evicts expired entries. Optional — a backend with native
    /// expiry (e.g. Redis `EX`) may no-op.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Rpc`] on backend transport failure.
    async fn purge_expired(&self) -> Result<(), PaymentError> {
        Ok(())
    }

    /// Releases any backend resources (connections, background tasks).
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Rpc`] on backend transport failure.
    async fn close(&self) -> Result<(), PaymentError> {
        Ok(())
    }
}

/// `ttl = max(requirement.maxTimeoutSeconds, minReplayTtl)` — never below
/// [`MIN_REPLAY_TTL_SECONDS`] in default deployments.
#[must_use]
pub fn ttl_for(requirement: &PaymentRequirement, min_replay_ttl: Duration) -> Duration {
    Duration::from_secs(requirement.max_timeout_seconds.max(min_replay_ttl.as_secs()))
}

/// A process-local replay cache, safe under true concurrent access via
/// [`DashMap`]'s per-shard locking.
pub struct InMemoryReplayCache {
    entries: DashMap<String, ReplayEntry>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for InMemoryReplayCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryReplayCache").field("entries", &self.entries.len()).finish()
    }
}

impl InMemoryReplayCache {
    /// An empty cache using the given clock.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { entries: DashMap::new(), clock }
    }

    /// Spawns a background task that sweeps expired entries every `period`.
    /// The period should be at most a quarter of the shortest TTL this
    /// cache is expected to serve, so expired entries never linger for
    /// more than `period`.
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration) {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let _ = cache.purge_expired().await;
            }
        });
    }
}

#[async_trait]
impl ReplayCache for InMemoryReplayCache {
    async fn try_consume(&self, signature: &str, metadata: ReplayMetadata, ttl: Duration) -> Result<ConsumeOutcome, PaymentError> {
        let now = self.clock.now();
        let fresh = ReplayEntry { signature: signature.to_string(), first_consumed_at: now, ttl_expires_at: now + ttl.as_secs(), metadata };

        // Single critical section: an occupied, unexpired entry wins; an
        // absent or expired one is replaced and reports FirstTime.
        match self.entries.entry(signature.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) if occupied.get().ttl_expires_at > now => {
                Ok(ConsumeOutcome::AlreadyConsumed(occupied.get().clone()))
            }
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                occupied.insert(fresh);
                Ok(ConsumeOutcome::FirstTime)
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(fresh);
                Ok(ConsumeOutcome::FirstTime)
            }
        }
    }

    async fn peek(&self, signature: &str) -> Result<Option<ReplayEntry>, PaymentError> {
        let now = self.clock.now();
        Ok(self.entries.get(signature).filter(|e| e.ttl_expires_at > now).map(|e| e.clone()))
    }

    async fn purge_expired(&self) -> Result<(), PaymentError> {
        let now = self.clock.now();
        self.entries.retain(|_, entry| entry.ttl_expires_at > now);
        Ok(())
    }
}

/// The `SET IF NOT EXISTS` + `GET` contract an external key-value store must
/// satisfy to back [`ExternalKvReplayCache`].
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Sets `key` to `value` with the given TTL, only if `key` is absent.
    /// Returns `true` if the set happened (this call was first).
    async fn set_nx_ex(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool, PaymentError>;

    /// Reads the current value of `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PaymentError>;
}

/// A replay cache delegating to an external KV store. Assumes, at minimum,
/// single-key linearizability per region — cross-region replay during
/// replication lag is an acknowledged gap, not solved here (see the design
/// notes).
pub struct ExternalKvReplayCache {
    backend: Arc<dyn KvBackend>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ExternalKvReplayCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalKvReplayCache").finish_non_exhaustive()
    }
}

impl ExternalKvReplayCache {
    /// Wraps `backend`, using `clock` to stamp entry metadata.
    #[must_use]
    pub fn new(backend: Arc<dyn KvBackend>, clock: Arc<dyn Clock>) -> Self {
        Self { backend, clock }
    }

    fn encode(entry: &ReplayEntry) -> Vec<u8> {
        serde_json::json!({
            "firstConsumedAt": entry.first_consumed_at.as_secs(),
            "ttlExpiresAt": entry.ttl_expires_at.as_secs(),
            "resource": entry.metadata.resource,
            "amount": entry.metadata.amount,
            "payer": entry.metadata.payer,
        })
        .to_string()
        .into_bytes()
    }

    fn decode(signature: &str, bytes: &[u8]) -> Option<ReplayEntry> {
        let value: serde_json::Value = serde_json::from_slice(bytes).ok()?;
        Some(ReplayEntry {
            signature: signature.to_string(),
            first_consumed_at: UnixTimestamp::from_secs(value.get("firstConsumedAt")?.as_u64()?),
            ttl_expires_at: UnixTimestamp::from_secs(value.get("ttlExpiresAt")?.as_u64()?),
            metadata: ReplayMetadata {
                resource: value.get("resource")?.as_str()?.to_string(),
                amount: value.get("amount")?.as_u64()?,
                payer: value.get("payer")?.as_str()?.to_string(),
            },
        })
    }
}

#[async_trait]
impl ReplayCache for ExternalKvReplayCache {
    async fn try_consume(&self, signature: &str, metadata: ReplayMetadata, ttl: Duration) -> Result<ConsumeOutcome, PaymentError> {
        let now = self.clock.now();
        let entry = ReplayEntry { signature: signature.to_string(), first_consumed_at: now, ttl_expires_at: now + ttl.as_secs(), metadata };
        let first_time = self.backend.set_nx_ex(signature, &Self::encode(&entry), ttl).await?;
        if first_time {
            return Ok(ConsumeOutcome::FirstTime);
        }
        let bytes = self.backend.get(signature).await?;
        bytes.as_deref().and_then(|b| Self::decode(signature, b)).map_or(Ok(ConsumeOutcome::FirstTime), |existing| Ok(ConsumeOutcome::AlreadyConsumed(existing)))
    }

    async fn peek(&self, signature: &str) -> Result<Option<ReplayEntry>, PaymentError> {
        let bytes = self.backend.get(signature).await?;
        Ok(bytes.as_deref().and_then(|b| Self::decode(signature, b)))
    }
}

/// An in-process [`KvBackend`] fake for exercising [`ExternalKvReplayCache`]
/// without a real external store.
#[derive(Debug, Default)]
pub struct InProcessKvBackend {
    store: DashMap<String, Vec<u8>>,
}

#[async_trait]
impl KvBackend for InProcessKvBackend {
    async fn set_nx_ex(&self, key: &str, value: &[u8], _ttl: Duration) -> Result<bool, PaymentError> {
        match self.store.entry(key.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Ok(false),
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(value.to_vec());
                Ok(true)
            }
        }
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PaymentError> {
        Ok(self.store.get(key).map(|v| v.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use x402_core::clock::FixedClock;

    use super::*;

    fn metadata() -> ReplayMetadata {
        ReplayMetadata { resource: "/paid".to_string(), amount: 1000, payer: "W".to_string() }
    }

    #[tokio::test]
    async fn first_consume_wins_second_sees_already_consumed() {
        let cache = InMemoryReplayCache::new(Arc::new(FixedClock::new(1000)));
        let first = cache.try_consume("S1", metadata(), Duration::from_secs(600)).await.unwrap();
        assert_eq!(first, ConsumeOutcome::FirstTime);
        let second = cache.try_consume("S1", metadata(), Duration::from_secs(600)).await.unwrap();
        assert!(matches!(second, ConsumeOutcome::AlreadyConsumed(_)));
    }

    #[tokio::test]
    async fn concurrent_consumes_see_exactly_one_first_time() {
        let cache = Arc::new(InMemoryReplayCache::new(Arc::new(FixedClock::new(1000))));
        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move { cache.try_consume("S1", metadata(), Duration::from_secs(600)).await.unwrap() }));
        }
        let mut first_time_count = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), ConsumeOutcome::FirstTime) {
                first_time_count += 1;
            }
        }
        assert_eq!(first_time_count, 1);
    }

    #[tokio::test]
    async fn expired_entry_can_be_reconsumed() {
        let clock = Arc::new(FixedClock::new(1000));
        let cache = InMemoryReplayCache::new(clock.clone());
        cache.try_consume("S1", metadata(), Duration::from_secs(600)).await.unwrap();
        clock.advance(601);
        let outcome = cache.try_consume("S1", metadata(), Duration::from_secs(600)).await.unwrap();
        assert_eq!(outcome, ConsumeOutcome::FirstTime);
    }

    #[tokio::test]
    async fn external_backend_reports_already_consumed_with_metadata() {
        let cache = ExternalKvReplayCache::new(Arc::new(InProcessKvBackend::default()), Arc::new(FixedClock::new(1000)));
        cache.try_consume("S1", metadata(), Duration::from_secs(600)).await.unwrap();
        let second = cache.try_consume("S1", metadata(), Duration::from_secs(600)).await.unwrap();
        let ConsumeOutcome::AlreadyConsumed(entry) = second else {
            panic!("expected already-consumed");
        };
        assert_eq!(entry.metadata.payer, "W");
    }

    #[test]
    fn ttl_for_floors_at_minimum() {
        let requirement = PaymentRequirement::exact(x402_proto::Network::SolanaDevnet, "R", "A", 1, "/x");
        let ttl = ttl_for(&requirement, Duration::from_secs(MIN_REPLAY_TTL_SECONDS));
        assert_eq!(ttl.as_secs(), MIN_REPLAY_TTL_SECONDS);
    }
}
