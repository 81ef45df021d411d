//! # Proof Engine Facade
//!
//! One object wiring the whole pipeline: registry, preparer, cache,
//! witness pool, generator, verifier, and batch coordinator. Every
//! collaborator is constructor-injected through [`ProofEngineBuilder`];
//! there are no process-wide singletons, so tests and multi-tenant hosts
//! can run engines side by side with different backends and stores.
//!
//! The builder defaults are for development: the built-in circuit
//! catalog, the deterministic backend, and a synthetic in-memory artifact
//! resolver, checked against [`ProofPolicy::from_environment`]. A
//! production deployment injects its cryptographic backend and real
//! resolver, and the policy refuses to assemble an engine whose backend
//! cannot back its proofs.

use std::sync::Arc;

use tokio::time::MissedTickBehavior;

use veil_circuits::{builtin_circuits, CircuitDescriptor, PreparerRegistry, WitnessStrategy};
use veil_core::{CircuitId, EngineError, ProofInput};
use veil_zkp::{
    DeterministicBackend, Groth16Proof, PolicyError, ProofArtifact, ProofBackend, ProofPolicy,
    VerificationOutcome,
};

use crate::batch::{BatchConfig, BatchCoordinator, BatchResult};
use crate::cache::{CacheStats, ProofCache};
use crate::config::EngineConfig;
use crate::generator::{ProofGenerator, ProofRequest};
use crate::precompute::WitnessPrecomputer;
use crate::registry::CircuitRegistry;
use crate::resolver::{ArtifactResolver, MemoryResolver};
use crate::verifier::ProofVerifier;

/// The assembled proof engine.
///
/// Cheap to share behind `Arc`; all internal state is already shared and
/// synchronized.
pub struct ProofEngine {
    config: EngineConfig,
    registry: Arc<CircuitRegistry>,
    generator: Arc<ProofGenerator>,
    verifier: ProofVerifier,
    batch: BatchCoordinator,
    cache: Arc<ProofCache>,
    precompute: Arc<WitnessPrecomputer>,
}

impl ProofEngine {
    /// Start building an engine.
    pub fn builder() -> ProofEngineBuilder {
        ProofEngineBuilder::new()
    }

    /// The configuration the engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Generate a proof. See [`ProofGenerator::generate`].
    pub async fn generate_proof(
        &self,
        request: &ProofRequest,
    ) -> Result<Arc<ProofArtifact>, EngineError> {
        self.generator.generate(request).await
    }

    /// Verify a proof. See [`ProofVerifier::verify`].
    pub async fn verify_proof(
        &self,
        circuit_id: &CircuitId,
        proof: &Groth16Proof,
        public_signals: &[String],
    ) -> Result<VerificationOutcome, EngineError> {
        self.verifier.verify(circuit_id, proof, public_signals).await
    }

    /// Generate proofs for a batch of inputs against one circuit. See
    /// [`BatchCoordinator::generate_batch`].
    pub async fn generate_batch(
        &self,
        circuit_id: &CircuitId,
        inputs: Vec<ProofInput>,
        config: &BatchConfig,
    ) -> BatchResult {
        self.batch.generate_batch(circuit_id, inputs, config).await
    }

    /// A batch configuration seeded from the engine's configured batch
    /// size.
    pub fn default_batch_config(&self) -> BatchConfig {
        BatchConfig {
            max_batch_size: self.config.max_batch_size,
            ..BatchConfig::default()
        }
    }

    /// Eagerly load artifacts for the given circuits, returning how many
    /// loaded. Failures are logged and skipped.
    pub async fn preload(&self, circuit_ids: &[CircuitId]) -> usize {
        self.registry.preload(circuit_ids).await
    }

    /// All registered circuit ids, sorted.
    pub fn circuit_ids(&self) -> Vec<CircuitId> {
        self.registry.circuit_ids()
    }

    /// The descriptor for a registered circuit.
    pub fn descriptor(
        &self,
        circuit_id: &CircuitId,
    ) -> Result<Arc<CircuitDescriptor>, EngineError> {
        self.registry.descriptor(circuit_id)
    }

    /// Current proof-cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop every cached proof, returning how many were removed.
    pub fn clear_cache(&self) -> usize {
        self.cache.clear()
    }

    /// Spawn the periodic maintenance task: cache and witness-pool sweeps
    /// on the configured interval.
    ///
    /// The task holds only `Weak` handles, so dropping the engine ends it
    /// at the next tick. Call once per engine; extra calls just sweep more
    /// often.
    pub fn start_maintenance(&self) -> tokio::task::JoinHandle<()> {
        let cache = Arc::downgrade(&self.cache);
        let pool = Arc::downgrade(&self.precompute);
        let period = self.config.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let (Some(cache), Some(pool)) = (cache.upgrade(), pool.upgrade()) else {
                    break;
                };
                cache.sweep();
                pool.sweep();
            }
        })
    }
}

impl std::fmt::Debug for ProofEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProofEngine")
            .field("circuits", &self.registry.circuit_ids().len())
            .field("cache", &self.cache)
            .finish()
    }
}

/// Builds a [`ProofEngine`] from injected collaborators.
pub struct ProofEngineBuilder {
    config: EngineConfig,
    catalog: Option<Vec<(CircuitDescriptor, Arc<dyn WitnessStrategy>)>>,
    extra: Vec<(CircuitDescriptor, Arc<dyn WitnessStrategy>)>,
    backend: Option<Arc<dyn ProofBackend>>,
    resolver: Option<Arc<dyn ArtifactResolver>>,
    policy: Option<ProofPolicy>,
}

impl ProofEngineBuilder {
    fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            catalog: None,
            extra: Vec::new(),
            backend: None,
            resolver: None,
            policy: None,
        }
    }

    /// Use `config` instead of the defaults.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the circuit catalog. Without this the built-in circuits
    /// are registered against the configured artifact base.
    pub fn circuits(
        mut self,
        circuits: impl IntoIterator<Item = (CircuitDescriptor, Arc<dyn WitnessStrategy>)>,
    ) -> Self {
        self.catalog = Some(circuits.into_iter().collect());
        self
    }

    /// Register an additional circuit on top of the catalog.
    pub fn circuit(
        mut self,
        descriptor: CircuitDescriptor,
        strategy: Arc<dyn WitnessStrategy>,
    ) -> Self {
        self.extra.push((descriptor, strategy));
        self
    }

    /// Use `backend` for proving and verification. Defaults to the
    /// deterministic development backend.
    pub fn backend(mut self, backend: Arc<dyn ProofBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Fetch circuit artifacts through `resolver`. Defaults to a
    /// synthetic in-memory resolver that serves placeholder bytes, which
    /// is enough for the deterministic backend.
    pub fn resolver(mut self, resolver: Arc<dyn ArtifactResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Enforce `policy` instead of [`ProofPolicy::from_environment`].
    pub fn policy(mut self, policy: ProofPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Assemble the engine.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the policy rejects the backend, e.g.
    /// a production policy with the deterministic development backend.
    pub fn build(self) -> Result<ProofEngine, PolicyError> {
        let config = self.config;
        let backend = self
            .backend
            .unwrap_or_else(|| Arc::new(DeterministicBackend::new()));
        let policy = self.policy.unwrap_or_else(ProofPolicy::from_environment);
        policy.validate(backend.as_ref())?;

        let resolver = self
            .resolver
            .unwrap_or_else(|| Arc::new(MemoryResolver::synthetic()));

        let mut circuits = self.catalog.unwrap_or_else(|| {
            builtin_circuits(&config.artifact_base)
                .into_iter()
                .map(|builtin| (builtin.descriptor, builtin.strategy))
                .collect()
        });
        circuits.extend(self.extra);

        let mut preparer = PreparerRegistry::new();
        let mut descriptors = Vec::with_capacity(circuits.len());
        for (descriptor, strategy) in circuits {
            preparer.register(descriptor.id.clone(), strategy);
            descriptors.push(descriptor);
        }

        let registry = Arc::new(CircuitRegistry::new(
            descriptors,
            resolver,
            config.artifact_retries,
            config.artifact_retry_base_delay,
        ));
        let cache = Arc::new(ProofCache::new(config.cache_ttl));
        let precompute = Arc::new(WitnessPrecomputer::new(
            config.precompute_pool_size,
            config.precompute_retention,
        ));
        let generator = Arc::new(ProofGenerator::new(
            Arc::clone(&registry),
            Arc::new(preparer),
            Arc::clone(&backend),
            Arc::clone(&cache),
            Arc::clone(&precompute),
        ));
        let verifier = ProofVerifier::new(Arc::clone(&registry), Arc::clone(&backend));
        let batch = BatchCoordinator::new(Arc::clone(&generator), config.max_concurrent_ops);

        tracing::info!(
            backend = backend.name(),
            circuits = registry.circuit_ids().len(),
            policy = ?policy.mode(),
            "proof engine assembled"
        );
        Ok(ProofEngine {
            config,
            registry,
            generator,
            verifier,
            batch,
            cache,
            precompute,
        })
    }
}

impl Default for ProofEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProofEngineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProofEngineBuilder")
            .field("config", &self.config)
            .field("extra_circuits", &self.extra.len())
            .finish()
    }
}
