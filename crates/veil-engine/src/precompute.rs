//! # Witness Precomputation Pool
//!
//! Best-effort latency optimization: after a successful proof, the engine
//! schedules a fresh witness for the same (circuit, credential) pair so
//! the next request can skip preparation. Witnesses wait in a bounded
//! FIFO pool per pair and are claimed oldest-first.
//!
//! Nothing here is a correctness path. A full pool drops the offer
//! instead of queueing, preparation failures are logged and swallowed,
//! and stale witnesses vanish on claim or sweep. Proof callers never see
//! a pool error.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use veil_core::{CircuitId, CredentialRef, WitnessError};
use veil_zkp::Witness;

type PoolKey = (CircuitId, CredentialRef);

struct PooledWitness {
    witness: Witness,
    pooled_at: Instant,
}

impl PooledWitness {
    fn is_fresh(&self, now: Instant, retention: Duration) -> bool {
        now.duration_since(self.pooled_at) < retention
    }
}

/// Bounded FIFO pool of precomputed witnesses per (circuit, credential).
pub struct WitnessPrecomputer {
    pools: RwLock<HashMap<PoolKey, VecDeque<PooledWitness>>>,
    capacity: usize,
    retention: Duration,
}

impl WitnessPrecomputer {
    /// At most this many witnesses wait per (circuit, credential) pair.
    pub const DEFAULT_CAPACITY: usize = 3;
    /// Witnesses older than this are discarded unclaimed.
    pub const DEFAULT_RETENTION: Duration = Duration::from_secs(600);

    /// Create a pool holding up to `capacity` witnesses per pair, each
    /// claimable for `retention` after being offered.
    pub fn new(capacity: usize, retention: Duration) -> Self {
        Self {
            pools: RwLock::new(HashMap::new()),
            capacity,
            retention,
        }
    }

    /// Claim the oldest fresh witness for the pair, if any.
    ///
    /// Ownership transfers to the caller; a witness is claimed at most
    /// once. Stale entries encountered on the way are discarded.
    pub fn claim(&self, circuit_id: &CircuitId, credential: &CredentialRef) -> Option<Witness> {
        let key = (circuit_id.clone(), credential.clone());
        let now = Instant::now();
        let mut pools = self.pools.write();
        let pool = pools.get_mut(&key)?;
        let claimed = loop {
            match pool.pop_front() {
                Some(entry) if entry.is_fresh(now, self.retention) => break Some(entry.witness),
                Some(_) => continue,
                None => break None,
            }
        };
        if pool.is_empty() {
            pools.remove(&key);
        }
        claimed
    }

    /// Offer a freshly prepared witness to the pair's pool.
    ///
    /// Returns `false` when the pool is already at capacity; the offer is
    /// dropped, never queued.
    pub fn offer(
        &self,
        circuit_id: &CircuitId,
        credential: &CredentialRef,
        witness: Witness,
    ) -> bool {
        let key = (circuit_id.clone(), credential.clone());
        let mut pools = self.pools.write();
        let pool = pools.entry(key).or_default();
        if pool.len() >= self.capacity {
            tracing::debug!(
                circuit = %circuit_id,
                capacity = self.capacity,
                "witness pool full, dropping precomputed witness"
            );
            return false;
        }
        pool.push_back(PooledWitness {
            witness,
            pooled_at: Instant::now(),
        });
        true
    }

    /// Spawn a fire-and-forget task that runs `prepare` and offers the
    /// result to the pair's pool.
    ///
    /// `prepare` must be the circuit's pure preparation; failures are
    /// logged at warn level and dropped.
    pub fn schedule(
        self: &Arc<Self>,
        circuit_id: CircuitId,
        credential: CredentialRef,
        prepare: impl FnOnce() -> Result<Witness, WitnessError> + Send + 'static,
    ) {
        let pool = Arc::clone(self);
        tokio::spawn(async move {
            match prepare() {
                Ok(witness) => {
                    pool.offer(&circuit_id, &credential, witness);
                }
                Err(e) => {
                    tracing::warn!(circuit = %circuit_id, "witness precomputation failed: {e}");
                }
            }
        });
    }

    /// Discard every witness older than the retention window, returning
    /// how many were dropped.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut pools = self.pools.write();
        let mut dropped = 0;
        pools.retain(|_, pool| {
            let before = pool.len();
            pool.retain(|entry| entry.is_fresh(now, self.retention));
            dropped += before - pool.len();
            !pool.is_empty()
        });
        if dropped > 0 {
            tracing::debug!(dropped, "witness pool swept");
        }
        dropped
    }

    /// Total witnesses currently pooled across all pairs.
    pub fn len(&self) -> usize {
        self.pools.read().values().map(VecDeque::len).sum()
    }

    /// Whether no witness is pooled.
    pub fn is_empty(&self) -> bool {
        self.pools.read().is_empty()
    }

    /// Witnesses currently pooled for one pair.
    pub fn pool_len(&self, circuit_id: &CircuitId, credential: &CredentialRef) -> usize {
        let key = (circuit_id.clone(), credential.clone());
        self.pools.read().get(&key).map_or(0, VecDeque::len)
    }
}

impl Default for WitnessPrecomputer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY, Self::DEFAULT_RETENTION)
    }
}

impl std::fmt::Debug for WitnessPrecomputer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WitnessPrecomputer")
            .field("pooled", &self.len())
            .field("capacity", &self.capacity)
            .field("retention", &self.retention)
            .finish()
    }
}
