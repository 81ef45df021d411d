//! # Proof Generator
//!
//! Orchestrates one proof request end to end: resolve the descriptor,
//! fingerprint the request, probe the cache, deduplicate concurrent
//! identical requests through a single flight, acquire a witness
//! (precomputed or fresh), prove on a blocking thread, cache the artifact,
//! and schedule the next precomputation.
//!
//! ## Timeouts
//!
//! A caller-supplied timeout bounds the *wait*, not the work. The backend
//! is not assumed preemptible, so an elapsed deadline returns
//! [`EngineError::Timeout`] while the detached generation task runs to
//! completion and still populates the cache for later callers.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use veil_circuits::{CircuitDescriptor, PreparerRegistry};
use veil_core::{
    CircuitId, CredentialHash, EngineError, Fingerprint, ProofInput, Timestamp,
};
use veil_zkp::{ProofArtifact, ProofBackend, ProofMetadata, Witness};

use crate::cache::ProofCache;
use crate::precompute::WitnessPrecomputer;
use crate::registry::CircuitRegistry;
use crate::singleflight::SingleFlight;

/// Per-request generation options.
#[derive(Debug, Clone)]
pub struct ProofOptions {
    /// Read and write the proof cache for this request. On by default.
    ///
    /// Concurrent identical requests still share one in-flight generation;
    /// disabling the cache only stops the artifact from being stored or
    /// served later.
    pub use_cache: bool,
    /// Explicit cache key replacing the computed request fingerprint.
    pub cache_key: Option<Fingerprint>,
    /// Stop waiting after this long. See the module docs: the generation
    /// itself is not cancelled.
    pub timeout: Option<Duration>,
}

impl Default for ProofOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            cache_key: None,
            timeout: None,
        }
    }
}

/// One proof request: the circuit, the inputs, and how to run it.
#[derive(Debug, Clone)]
pub struct ProofRequest {
    /// The circuit to prove against.
    pub circuit_id: CircuitId,
    /// The credential-derived inputs.
    pub input: ProofInput,
    /// Generation options.
    pub options: ProofOptions,
}

impl ProofRequest {
    /// A request with default options (cached, no timeout).
    pub fn new(circuit_id: CircuitId, input: ProofInput) -> Self {
        Self {
            circuit_id,
            input,
            options: ProofOptions::default(),
        }
    }

    /// Replace the request options.
    pub fn with_options(mut self, options: ProofOptions) -> Self {
        self.options = options;
        self
    }
}

/// Generates proofs for registered circuits.
///
/// All collaborators are injected; the generator owns only the
/// single-flight table.
pub struct ProofGenerator {
    registry: Arc<CircuitRegistry>,
    preparer: Arc<PreparerRegistry>,
    backend: Arc<dyn ProofBackend>,
    cache: Arc<ProofCache>,
    precompute: Arc<WitnessPrecomputer>,
    flights: SingleFlight<Fingerprint, Arc<ProofArtifact>>,
}

impl ProofGenerator {
    /// Wire a generator from its collaborators.
    pub fn new(
        registry: Arc<CircuitRegistry>,
        preparer: Arc<PreparerRegistry>,
        backend: Arc<dyn ProofBackend>,
        cache: Arc<ProofCache>,
        precompute: Arc<WitnessPrecomputer>,
    ) -> Self {
        Self {
            registry,
            preparer,
            backend,
            cache,
            precompute,
            flights: SingleFlight::new(),
        }
    }

    /// Generate a proof for `request`.
    ///
    /// # Errors
    ///
    /// - [`EngineError::CircuitNotFound`] for an unregistered circuit.
    /// - [`EngineError::WitnessPreparation`] for invalid inputs; not
    ///   retryable with the same inputs.
    /// - [`EngineError::ArtifactLoad`] when circuit artifacts cannot be
    ///   fetched or fail their integrity check.
    /// - [`EngineError::ProofGeneration`] when the backend fails; may be
    ///   retried.
    /// - [`EngineError::Timeout`] when the caller's deadline elapses first.
    pub async fn generate(
        &self,
        request: &ProofRequest,
    ) -> Result<Arc<ProofArtifact>, EngineError> {
        match request.options.timeout {
            Some(limit) => {
                let started = Instant::now();
                match tokio::time::timeout(limit, self.generate_unbounded(request)).await {
                    Ok(result) => result,
                    Err(_) => {
                        let elapsed_ms = started.elapsed().as_millis() as u64;
                        tracing::warn!(
                            circuit = %request.circuit_id,
                            elapsed_ms,
                            "caller abandoned proof generation; the in-flight \
                             generation continues and will populate the cache"
                        );
                        Err(EngineError::Timeout { elapsed_ms })
                    }
                }
            }
            None => self.generate_unbounded(request).await,
        }
    }

    async fn generate_unbounded(
        &self,
        request: &ProofRequest,
    ) -> Result<Arc<ProofArtifact>, EngineError> {
        let descriptor = self.registry.descriptor(&request.circuit_id)?;

        let fingerprint = match &request.options.cache_key {
            Some(key) => key.clone(),
            None => Fingerprint::for_request(
                &request.circuit_id,
                &request.input.credential,
                &request.input.public,
            )?,
        };
        let credential_hash = CredentialHash::of(&request.input.credential);

        if request.options.use_cache {
            if let Some(artifact) = self.cache.get(&fingerprint, &credential_hash) {
                tracing::debug!(circuit = %request.circuit_id, "proof cache hit");
                return Ok(artifact);
            }
        }

        let work = self.generation_work(descriptor, fingerprint.clone(), credential_hash, request);
        self.flights.run(fingerprint, &request.circuit_id, work).await
    }

    /// Build the owned future the single flight spawns for this request.
    fn generation_work(
        &self,
        descriptor: Arc<CircuitDescriptor>,
        fingerprint: Fingerprint,
        credential_hash: CredentialHash,
        request: &ProofRequest,
    ) -> impl Future<Output = Result<Arc<ProofArtifact>, EngineError>> + Send + 'static {
        let registry = Arc::clone(&self.registry);
        let preparer = Arc::clone(&self.preparer);
        let backend = Arc::clone(&self.backend);
        let cache = Arc::clone(&self.cache);
        let precompute = Arc::clone(&self.precompute);
        let circuit_id = request.circuit_id.clone();
        let input = request.input.clone();
        let use_cache = request.options.use_cache;

        async move {
            let started = Instant::now();

            let witness = match claim_matching(&precompute, &circuit_id, &input) {
                Some(witness) => {
                    tracing::debug!(circuit = %circuit_id, "using precomputed witness");
                    witness
                }
                None => preparer.prepare(&descriptor, &input)?,
            };

            let loaded = registry.get_circuit(&circuit_id).await?;

            let output = {
                let backend = Arc::clone(&backend);
                let loaded = Arc::clone(&loaded);
                let circuit = circuit_id.clone();
                tokio::task::spawn_blocking(move || {
                    backend.prove(&circuit, &loaded.artifacts, &witness)
                })
                .await
                .map_err(|e| EngineError::ProofGeneration {
                    circuit_id: circuit_id.to_string(),
                    reason: format!("prover task failed: {e}"),
                })?
                .map_err(|e| EngineError::ProofGeneration {
                    circuit_id: circuit_id.to_string(),
                    reason: e.to_string(),
                })?
            };

            let generation_time_ms = started.elapsed().as_millis() as u64;
            let artifact = Arc::new(ProofArtifact {
                proof: output.proof,
                public_signals: output.public_signals,
                metadata: ProofMetadata {
                    circuit_id: circuit_id.clone(),
                    proof_type: descriptor.proof_type.clone(),
                    generated_at: Timestamp::now(),
                    constraint_count: descriptor.constraint_count,
                    generation_time_ms,
                },
            });
            tracing::info!(
                circuit = %circuit_id,
                backend = backend.name(),
                generation_time_ms,
                "proof generated"
            );

            if use_cache {
                cache.put(fingerprint, credential_hash, Arc::clone(&artifact), None);
            }

            let next_preparer = Arc::clone(&preparer);
            let next_descriptor = Arc::clone(&descriptor);
            let next_input = input.clone();
            precompute.schedule(circuit_id, input.credential.clone(), move || {
                next_preparer.prepare(&next_descriptor, &next_input)
            });

            Ok(artifact)
        }
    }
}

impl std::fmt::Debug for ProofGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProofGenerator")
            .field("backend", &self.backend.name())
            .field("flights", &self.flights)
            .finish()
    }
}

/// Claim a precomputed witness only if its assignments agree with the
/// request's public inputs.
///
/// The pool is keyed by (circuit, credential); a witness pooled for one
/// request can be claimed by a later request whose public inputs differ.
/// Using it would hand the caller signals for the old inputs, so a
/// divergent witness is discarded and the request prepares fresh. Only
/// scalar inputs are comparable; list inputs are skipped.
fn claim_matching(
    pool: &WitnessPrecomputer,
    circuit_id: &CircuitId,
    input: &ProofInput,
) -> Option<Witness> {
    let witness = pool.claim(circuit_id, &input.credential)?;
    for (name, value) in &input.public {
        let Some(expected) = value.to_field_string() else {
            continue;
        };
        match witness.value_of(name) {
            Some(actual) if actual != expected => {
                tracing::debug!(
                    circuit = %circuit_id,
                    field = name.as_str(),
                    "discarding precomputed witness prepared for different inputs"
                );
                return None;
            }
            _ => {}
        }
    }
    Some(witness)
}
