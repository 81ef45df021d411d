//! # Proof Cache
//!
//! TTL-bounded cache of generated proof artifacts keyed by request
//! fingerprint. Identical requests inside the TTL window reuse the cached
//! artifact instead of re-proving.
//!
//! ## Privacy Invariant
//!
//! Every entry is bound to the credential hash it was generated for, and
//! the hash comparison on lookup runs in constant time (the
//! [`CredentialHash`] equality impl). A fingerprint collision across
//! credentials therefore yields a miss, never another holder's proof, and
//! the comparison leaks no timing signal about stored credentials.
//!
//! Expired entries are evicted lazily on access and in bulk by [`sweep`],
//! which the engine runs on its maintenance interval.
//!
//! The lock is a synchronous `parking_lot::RwLock` and is never held
//! across `.await` points.
//!
//! [`sweep`]: ProofCache::sweep

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use veil_core::{CredentialHash, Fingerprint};
use veil_zkp::ProofArtifact;

struct CacheEntry {
    artifact: Arc<ProofArtifact>,
    credential: CredentialHash,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Live entries, including any not yet swept past expiry.
    pub entries: usize,
    /// Lookups that returned an artifact.
    pub hits: u64,
    /// Lookups that returned nothing.
    pub misses: u64,
    /// Entries removed by expiry or credential mismatch.
    pub evictions: u64,
}

/// Fingerprint-keyed proof cache with per-entry TTL.
pub struct ProofCache {
    entries: RwLock<HashMap<Fingerprint, CacheEntry>>,
    default_ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ProofCache {
    /// Cache entries live one hour unless a put overrides the TTL.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

    /// Create a cache whose entries expire after `default_ttl`.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Look up the artifact for `fingerprint`, bound to `credential`.
    ///
    /// An expired entry, or one stored for a different credential, is
    /// evicted and reported as a miss.
    pub fn get(
        &self,
        fingerprint: &Fingerprint,
        credential: &CredentialHash,
    ) -> Option<Arc<ProofArtifact>> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(fingerprint) {
                Some(entry) if entry.is_fresh(now) && entry.credential == *credential => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(Arc::clone(&entry.artifact));
                }
                Some(_) => {}
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    return None;
                }
            }
        }

        // Stale or foreign-credential entry: evict under the write lock,
        // re-checking in case it was replaced since the read.
        let mut entries = self.entries.write();
        if let Some(entry) = entries.get(fingerprint) {
            if entry.is_fresh(now) && entry.credential == *credential {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(Arc::clone(&entry.artifact));
            }
            entries.remove(fingerprint);
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store `artifact` under `fingerprint` for `credential`.
    ///
    /// `ttl` defaults to the cache-wide TTL. An existing entry for the
    /// fingerprint is replaced.
    pub fn put(
        &self,
        fingerprint: Fingerprint,
        credential: CredentialHash,
        artifact: Arc<ProofArtifact>,
        ttl: Option<Duration>,
    ) {
        let expires_at = Instant::now() + ttl.unwrap_or(self.default_ttl);
        self.entries.write().insert(
            fingerprint,
            CacheEntry {
                artifact,
                credential,
                expires_at,
            },
        );
    }

    /// Remove every expired entry, returning how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh(now));
        let removed = before - entries.len();
        if removed > 0 {
            self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
            tracing::debug!(removed, remaining = entries.len(), "proof cache swept");
        }
        removed
    }

    /// Drop every entry, returning how many were removed.
    ///
    /// Administrative flush; the removed entries are not counted as
    /// evictions.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.write();
        let removed = entries.len();
        entries.clear();
        removed
    }

    /// Number of entries currently held, expired or not.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Current counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

impl Default for ProofCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TTL)
    }
}

impl std::fmt::Debug for ProofCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProofCache")
            .field("entries", &self.len())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}
