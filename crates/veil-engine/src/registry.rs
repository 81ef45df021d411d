//! # Circuit Registry
//!
//! Owns every registered circuit descriptor and lazily loads the three
//! artifacts (program, proving key, verification key) through the injected
//! [`ArtifactResolver`] on first use. Loaded circuits are cached as
//! `Arc<LoadedCircuit>` for the life of the registry.
//!
//! ## Concurrency
//!
//! Loading is single-flight per circuit: each registration carries a
//! `tokio::sync::OnceCell`, so concurrent first requests share one in-flight
//! load instead of fetching the same artifacts repeatedly. A failed load
//! leaves the cell unset and the next request starts over.
//!
//! ## Security Invariant
//!
//! A descriptor may pin an expected digest per artifact. Fetched bytes that
//! do not hash to the pinned digest are discarded and the load fails; a
//! compromised artifact store cannot substitute circuit programs or keys
//! without detection.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::OnceCell;

use veil_circuits::CircuitDescriptor;
use veil_core::{sha256_raw, ArtifactKind, CircuitId, EngineError};
use veil_zkp::CircuitArtifacts;

use crate::resolver::{ArtifactResolver, ResolveError};

/// A circuit with its artifacts fetched and verified.
#[derive(Debug)]
pub struct LoadedCircuit {
    /// The circuit's static descriptor.
    pub descriptor: Arc<CircuitDescriptor>,
    /// The fetched artifact bytes.
    pub artifacts: CircuitArtifacts,
}

struct Registration {
    descriptor: Arc<CircuitDescriptor>,
    loaded: OnceCell<Arc<LoadedCircuit>>,
}

/// Registry of circuit descriptors with lazy, single-flight artifact
/// loading.
///
/// The descriptor set is fixed at construction; registering happens by
/// building a new registry, never by mutating a running one.
pub struct CircuitRegistry {
    circuits: HashMap<CircuitId, Registration>,
    resolver: Arc<dyn ArtifactResolver>,
    retries: u32,
    base_delay: Duration,
}

impl CircuitRegistry {
    /// Build a registry over `descriptors`, fetching artifacts through
    /// `resolver` with `retries` bounded-backoff attempts (`base_delay`
    /// doubling per attempt) on transient failures.
    ///
    /// A duplicate circuit id keeps the later descriptor.
    pub fn new(
        descriptors: impl IntoIterator<Item = CircuitDescriptor>,
        resolver: Arc<dyn ArtifactResolver>,
        retries: u32,
        base_delay: Duration,
    ) -> Self {
        let circuits = descriptors
            .into_iter()
            .map(|descriptor| {
                (
                    descriptor.id.clone(),
                    Registration {
                        descriptor: Arc::new(descriptor),
                        loaded: OnceCell::new(),
                    },
                )
            })
            .collect();
        Self {
            circuits,
            resolver,
            retries,
            base_delay,
        }
    }

    /// The descriptor for `circuit_id`, without loading artifacts.
    pub fn descriptor(&self, circuit_id: &CircuitId) -> Result<Arc<CircuitDescriptor>, EngineError> {
        self.circuits
            .get(circuit_id)
            .map(|registration| Arc::clone(&registration.descriptor))
            .ok_or_else(|| EngineError::CircuitNotFound {
                circuit_id: circuit_id.to_string(),
            })
    }

    /// Whether `circuit_id` is registered.
    pub fn contains(&self, circuit_id: &CircuitId) -> bool {
        self.circuits.contains_key(circuit_id)
    }

    /// Whether `circuit_id` has its artifacts loaded already.
    pub fn is_loaded(&self, circuit_id: &CircuitId) -> bool {
        self.circuits
            .get(circuit_id)
            .is_some_and(|registration| registration.loaded.initialized())
    }

    /// All registered circuit ids, sorted.
    pub fn circuit_ids(&self) -> Vec<CircuitId> {
        let mut ids: Vec<CircuitId> = self.circuits.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// The loaded circuit for `circuit_id`, fetching and verifying its
    /// artifacts on first use.
    pub async fn get_circuit(
        &self,
        circuit_id: &CircuitId,
    ) -> Result<Arc<LoadedCircuit>, EngineError> {
        let registration =
            self.circuits
                .get(circuit_id)
                .ok_or_else(|| EngineError::CircuitNotFound {
                    circuit_id: circuit_id.to_string(),
                })?;
        registration
            .loaded
            .get_or_try_init(|| self.load(&registration.descriptor))
            .await
            .cloned()
    }

    /// Warm the given circuits best-effort, returning how many loaded.
    ///
    /// Failures are logged and skipped; preloading never takes the engine
    /// down over one bad artifact store entry.
    pub async fn preload(&self, circuit_ids: &[CircuitId]) -> usize {
        let mut warmed = 0;
        for circuit_id in circuit_ids {
            match self.get_circuit(circuit_id).await {
                Ok(_) => warmed += 1,
                Err(e) => {
                    tracing::warn!(circuit = %circuit_id, "preload failed: {e}");
                }
            }
        }
        warmed
    }

    async fn load(
        &self,
        descriptor: &Arc<CircuitDescriptor>,
    ) -> Result<Arc<LoadedCircuit>, EngineError> {
        let started = Instant::now();
        let (program, proving_key, verification_key) = tokio::try_join!(
            self.fetch_artifact(descriptor, ArtifactKind::Program),
            self.fetch_artifact(descriptor, ArtifactKind::ProvingKey),
            self.fetch_artifact(descriptor, ArtifactKind::VerificationKey),
        )?;
        tracing::info!(
            circuit = %descriptor.id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "circuit artifacts loaded"
        );
        Ok(Arc::new(LoadedCircuit {
            descriptor: Arc::clone(descriptor),
            artifacts: CircuitArtifacts {
                program,
                proving_key,
                verification_key,
            },
        }))
    }

    async fn fetch_artifact(
        &self,
        descriptor: &CircuitDescriptor,
        kind: ArtifactKind,
    ) -> Result<Vec<u8>, EngineError> {
        let location = descriptor.artifacts.location(kind);
        let bytes = self
            .fetch_with_backoff(&descriptor.id, kind, &location.uri)
            .await?;
        if let Some(expected) = &location.digest {
            let actual = sha256_raw(&bytes);
            if actual != *expected {
                return Err(EngineError::ArtifactLoad {
                    circuit_id: descriptor.id.to_string(),
                    artifact: kind,
                    reason: format!("digest mismatch: expected {expected}, got {actual}"),
                });
            }
        }
        Ok(bytes)
    }

    /// Fetch with bounded exponential backoff on transient failures, then
    /// one final attempt.
    async fn fetch_with_backoff(
        &self,
        circuit_id: &CircuitId,
        kind: ArtifactKind,
        uri: &str,
    ) -> Result<Vec<u8>, EngineError> {
        for attempt in 0..self.retries {
            match self.resolver.fetch(uri).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) if e.is_transient() => {
                    let delay = self.base_delay * 2u32.pow(attempt);
                    tracing::warn!(
                        circuit = %circuit_id,
                        artifact = kind.as_str(),
                        attempt = attempt + 1,
                        max_retries = self.retries,
                        "artifact fetch failed, retrying in {delay:?}: {e}"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(artifact_load(circuit_id, kind, e)),
            }
        }
        self.resolver
            .fetch(uri)
            .await
            .map_err(|e| artifact_load(circuit_id, kind, e))
    }
}

impl std::fmt::Debug for CircuitRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitRegistry")
            .field("circuits", &self.circuits.len())
            .field("retries", &self.retries)
            .finish()
    }
}

fn artifact_load(circuit_id: &CircuitId, kind: ArtifactKind, err: ResolveError) -> EngineError {
    EngineError::ArtifactLoad {
        circuit_id: circuit_id.to_string(),
        artifact: kind,
        reason: err.to_string(),
    }
}
