//! # Single-Flight Execution
//!
//! Deduplicates concurrent work by key. While a flight for a key is in
//! progress, every caller for that key awaits the same result instead of
//! starting its own; once the flight completes, the key is free again and
//! the cache layer takes over deduplication.
//!
//! The winning caller spawns the work as an independent Tokio task and
//! publishes its result over a `tokio::sync::watch` channel that all
//! callers (the winner included) await. Because the work runs detached, a
//! caller that stops waiting (a timeout, a dropped request) does not
//! cancel it: the flight completes and its result still reaches whoever
//! is left, and the generator's cache write inside the work still happens.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use veil_core::{CircuitId, EngineError};

type FlightReceiver<T> = watch::Receiver<Option<Result<T, EngineError>>>;

/// Keyed single-flight group.
///
/// `K` is the deduplication key (the engine uses request fingerprints),
/// `T` the shared result. Results must be cheap to clone; the engine
/// shares proof artifacts as `Arc<ProofArtifact>`.
pub struct SingleFlight<K, T> {
    inflight: Arc<Mutex<HashMap<K, FlightReceiver<T>>>>,
}

impl<K, T> SingleFlight<K, T>
where
    K: Eq + Hash + Clone + Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    /// Create an empty group.
    pub fn new() -> Self {
        Self {
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of flights currently in progress.
    pub fn len(&self) -> usize {
        self.inflight.lock().len()
    }

    /// Whether no flight is in progress.
    pub fn is_empty(&self) -> bool {
        self.inflight.lock().is_empty()
    }

    /// Whether a flight for `key` is in progress.
    pub fn contains(&self, key: &K) -> bool {
        self.inflight.lock().contains_key(key)
    }

    /// Run `work` for `key`, or join the flight already running for it.
    ///
    /// The first caller for a key spawns `work` as a detached task; later
    /// callers' `work` futures are dropped unexecuted. Every caller
    /// receives a clone of the one published result.
    ///
    /// `circuit_id` attributes the failure if the winning task exits
    /// without publishing (a panic in the work), which surfaces to every
    /// waiter as [`EngineError::ProofGeneration`].
    pub async fn run<F>(&self, key: K, circuit_id: &CircuitId, work: F) -> Result<T, EngineError>
    where
        F: Future<Output = Result<T, EngineError>> + Send + 'static,
    {
        let mut rx = {
            let mut inflight = self.inflight.lock();
            if let Some(rx) = inflight.get(&key) {
                rx.clone()
            } else {
                let (tx, rx) = watch::channel(None);
                inflight.insert(key.clone(), rx.clone());
                let registry = Arc::clone(&self.inflight);
                tokio::spawn(async move {
                    // The guard removes the key when the task ends,
                    // published result or panic alike, so a failed flight
                    // never wedges its key.
                    let _guard = KeyGuard { registry, key };
                    let result = work.await;
                    // Publish before the guard's removal so no caller can
                    // observe the key absent without a result available.
                    let _ = tx.send(Some(result));
                });
                rx
            }
        };

        loop {
            if let Some(result) = rx.borrow_and_update().as_ref() {
                return result.clone();
            }
            if rx.changed().await.is_err() {
                return Err(EngineError::ProofGeneration {
                    circuit_id: circuit_id.to_string(),
                    reason: "generation task terminated without a result".to_string(),
                });
            }
        }
    }
}

impl<K, T> Default for SingleFlight<K, T>
where
    K: Eq + Hash + Clone + Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Removes its key from the flight registry when dropped.
struct KeyGuard<K: Eq + Hash, T> {
    registry: Arc<Mutex<HashMap<K, FlightReceiver<T>>>>,
    key: K,
}

impl<K: Eq + Hash, T> Drop for KeyGuard<K, T> {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.key);
    }
}

impl<K, T> std::fmt::Debug for SingleFlight<K, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleFlight")
            .field("inflight", &self.inflight.lock().len())
            .finish()
    }
}
