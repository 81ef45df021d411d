//! # Batch Proof Coordination
//!
//! Runs many proof requests for one circuit as a unit: inputs are split
//! into bounded chunks and executed either concurrently under a semaphore
//! or strictly in order. One failed request never takes its siblings
//! down; the result carries a per-index `Result` in input order so the
//! caller can retry exactly the inputs that failed.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;

use veil_core::{
    sha256_digest, BatchId, CanonicalBytes, CircuitId, ContentDigest, EngineError, ProofInput,
};
use veil_zkp::ProofArtifact;

use crate::generator::{ProofGenerator, ProofRequest};

/// How a batch is executed.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Largest chunk of requests in flight at once. Values below 1 are
    /// treated as 1.
    pub max_batch_size: usize,
    /// Run each chunk's requests concurrently instead of one at a time.
    pub use_parallel_proof: bool,
    /// Attach a commitment digest over the successful proofs.
    pub aggregate_proofs: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 10,
            use_parallel_proof: true,
            aggregate_proofs: false,
        }
    }
}

/// The outcome of one batch run.
#[derive(Debug)]
pub struct BatchResult {
    /// Identifier assigned to this run, for correlating logs.
    pub batch_id: BatchId,
    /// Per-request outcomes, in input order.
    pub results: Vec<Result<Arc<ProofArtifact>, EngineError>>,
    /// Wall-clock time for the whole batch.
    pub total_time_ms: u64,
    /// Mean generation time across successful proofs; zero when none
    /// succeeded.
    pub average_time_ms: u64,
    /// Commitment over the successful proofs, when requested and at least
    /// one request succeeded.
    pub batch_commitment: Option<ContentDigest>,
}

impl BatchResult {
    /// How many requests succeeded.
    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    /// How many requests failed.
    pub fn failure_count(&self) -> usize {
        self.results.len() - self.success_count()
    }
}

/// Executes proof batches through a shared [`ProofGenerator`].
pub struct BatchCoordinator {
    generator: Arc<ProofGenerator>,
    max_concurrent_ops: usize,
}

impl BatchCoordinator {
    /// Wire a coordinator. `max_concurrent_ops` caps concurrent proof
    /// generations in parallel mode.
    pub fn new(generator: Arc<ProofGenerator>, max_concurrent_ops: usize) -> Self {
        Self {
            generator,
            max_concurrent_ops: max_concurrent_ops.max(1),
        }
    }

    /// Generate proofs for every input against `circuit_id`.
    ///
    /// Infallible at the batch level: per-request failures are recorded in
    /// [`BatchResult::results`] at the failing input's index.
    pub async fn generate_batch(
        &self,
        circuit_id: &CircuitId,
        inputs: Vec<ProofInput>,
        config: &BatchConfig,
    ) -> BatchResult {
        let batch_id = BatchId::new();
        let started = Instant::now();
        let chunk_size = config.max_batch_size.max(1);
        tracing::info!(
            batch = %batch_id,
            circuit = %circuit_id,
            requests = inputs.len(),
            parallel = config.use_parallel_proof,
            "starting proof batch"
        );

        let results = if config.use_parallel_proof {
            self.run_parallel(circuit_id, inputs, chunk_size).await
        } else {
            self.run_sequential(circuit_id, inputs).await
        };

        let total_time_ms = started.elapsed().as_millis() as u64;
        let successes: Vec<&Arc<ProofArtifact>> =
            results.iter().filter_map(|r| r.as_ref().ok()).collect();
        let average_time_ms = if successes.is_empty() {
            0
        } else {
            let total: u64 = successes
                .iter()
                .map(|a| a.metadata.generation_time_ms)
                .sum();
            total / successes.len() as u64
        };
        let batch_commitment = if config.aggregate_proofs {
            commitment_over(&successes)
        } else {
            None
        };

        tracing::info!(
            batch = %batch_id,
            succeeded = successes.len(),
            failed = results.len() - successes.len(),
            total_time_ms,
            "proof batch finished"
        );
        BatchResult {
            batch_id,
            results,
            total_time_ms,
            average_time_ms,
            batch_commitment,
        }
    }

    /// Spawn each chunk's requests concurrently, bounded by the semaphore,
    /// and collect them in spawn order so results keep input order.
    async fn run_parallel(
        &self,
        circuit_id: &CircuitId,
        inputs: Vec<ProofInput>,
        chunk_size: usize,
    ) -> Vec<Result<Arc<ProofArtifact>, EngineError>> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_ops));
        let mut results = Vec::with_capacity(inputs.len());
        let mut remaining = inputs.into_iter();

        loop {
            let chunk: Vec<ProofInput> = remaining.by_ref().take(chunk_size).collect();
            if chunk.is_empty() {
                break;
            }
            let mut handles = Vec::with_capacity(chunk.len());
            for input in chunk {
                let generator = Arc::clone(&self.generator);
                let semaphore = Arc::clone(&semaphore);
                let request = ProofRequest::new(circuit_id.clone(), input);
                handles.push(tokio::spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .expect("batch semaphore is never closed");
                    generator.generate(&request).await
                }));
            }
            for handle in handles {
                results.push(match handle.await {
                    Ok(result) => result,
                    Err(e) => Err(EngineError::ProofGeneration {
                        circuit_id: circuit_id.to_string(),
                        reason: format!("batch task failed: {e}"),
                    }),
                });
            }
        }
        results
    }

    async fn run_sequential(
        &self,
        circuit_id: &CircuitId,
        inputs: Vec<ProofInput>,
    ) -> Vec<Result<Arc<ProofArtifact>, EngineError>> {
        let mut results = Vec::with_capacity(inputs.len());
        for input in inputs {
            let request = ProofRequest::new(circuit_id.clone(), input);
            results.push(self.generator.generate(&request).await);
        }
        results
    }
}

impl std::fmt::Debug for BatchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchCoordinator")
            .field("max_concurrent_ops", &self.max_concurrent_ops)
            .finish()
    }
}

/// SHA-256 over the canonical ordered list of successful proofs and their
/// signals. Metadata is excluded so the commitment depends only on what a
/// verifier would check.
fn commitment_over(successes: &[&Arc<ProofArtifact>]) -> Option<ContentDigest> {
    if successes.is_empty() {
        return None;
    }
    let entries: Vec<serde_json::Value> = successes
        .iter()
        .map(|artifact| {
            serde_json::json!({
                "proof": artifact.proof,
                "publicSignals": artifact.public_signals,
            })
        })
        .collect();
    match CanonicalBytes::new(&entries) {
        Ok(canonical) => Some(sha256_digest(&canonical)),
        Err(e) => {
            tracing::warn!("batch commitment canonicalization failed: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ProofCache;
    use crate::precompute::WitnessPrecomputer;
    use crate::registry::CircuitRegistry;
    use crate::resolver::MemoryResolver;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use veil_circuits::{age, builtin_circuits, PreparerRegistry};
    use veil_core::CredentialRef;
    use veil_zkp::{
        CircuitArtifacts, DeterministicBackend, Groth16Proof, ProofBackend, ProofError,
        ProveOutput, VerifyError, Witness,
    };

    /// Tracks how many proves run at once.
    struct GaugedBackend {
        inner: DeterministicBackend,
        active: AtomicU32,
        peak: AtomicU32,
        delay: Duration,
    }

    impl GaugedBackend {
        fn new(delay: Duration) -> Self {
            Self {
                inner: DeterministicBackend::new(),
                active: AtomicU32::new(0),
                peak: AtomicU32::new(0),
                delay,
            }
        }

        fn peak(&self) -> u32 {
            self.peak.load(Ordering::SeqCst)
        }
    }

    impl ProofBackend for GaugedBackend {
        fn name(&self) -> &'static str {
            "gauged"
        }

        fn is_cryptographic(&self) -> bool {
            false
        }

        fn prove(
            &self,
            circuit_id: &CircuitId,
            artifacts: &CircuitArtifacts,
            witness: &Witness,
        ) -> Result<ProveOutput, ProofError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            if !self.delay.is_zero() {
                std::thread::sleep(self.delay);
            }
            let result = self.inner.prove(circuit_id, artifacts, witness);
            self.active.fetch_sub(1, Ordering::SeqCst);
            result
        }

        fn verify(
            &self,
            circuit_id: &CircuitId,
            verification_key: &[u8],
            proof: &Groth16Proof,
            public_signals: &[String],
        ) -> Result<bool, VerifyError> {
            self.inner
                .verify(circuit_id, verification_key, proof, public_signals)
        }
    }

    fn coordinator(backend: Arc<dyn ProofBackend>, max_concurrent_ops: usize) -> BatchCoordinator {
        let mut preparer = PreparerRegistry::new();
        let mut descriptors = Vec::new();
        for builtin in builtin_circuits("circuits") {
            preparer.register(builtin.descriptor.id.clone(), builtin.strategy);
            descriptors.push(builtin.descriptor);
        }
        let registry = Arc::new(CircuitRegistry::new(
            descriptors,
            Arc::new(MemoryResolver::synthetic()),
            3,
            Duration::from_millis(1),
        ));
        let generator = Arc::new(ProofGenerator::new(
            registry,
            Arc::new(preparer),
            backend,
            Arc::new(ProofCache::new(Duration::from_secs(60))),
            Arc::new(WitnessPrecomputer::default()),
        ));
        BatchCoordinator::new(generator, max_concurrent_ops)
    }

    fn age_circuit() -> CircuitId {
        CircuitId::new(age::CIRCUIT_ID).unwrap()
    }

    fn age_input(subject: &str, min_age: i64) -> ProofInput {
        ProofInput::new(CredentialRef::new(subject).unwrap())
            .with_private("birthYear", 1990)
            .with_public("currentYear", 2024)
            .with_public("minAge", min_age)
    }

    // -- Ordering and partial failure --

    #[tokio::test]
    async fn results_keep_input_order_across_a_failure() {
        let coordinator = coordinator(Arc::new(DeterministicBackend::new()), 4);

        // Index 2 is invalid: birthYear is missing.
        let inputs = vec![
            age_input("alice", 11),
            age_input("alice", 12),
            ProofInput::new(CredentialRef::new("alice").unwrap())
                .with_public("currentYear", 2024)
                .with_public("minAge", 13),
            age_input("alice", 14),
            age_input("alice", 15),
        ];

        let batch = coordinator
            .generate_batch(&age_circuit(), inputs, &BatchConfig::default())
            .await;

        assert_eq!(batch.results.len(), 5);
        assert_eq!(batch.success_count(), 4);
        assert_eq!(batch.failure_count(), 1);

        let err = batch.results[2].as_ref().unwrap_err();
        assert!(matches!(err, EngineError::WitnessPreparation(_)));

        for (index, min_age) in [(0, "11"), (1, "12"), (3, "14"), (4, "15")] {
            let artifact = batch.results[index].as_ref().unwrap();
            assert_eq!(artifact.public_signals[2], min_age);
        }
    }

    #[tokio::test]
    async fn an_empty_batch_finishes_immediately() {
        let coordinator = coordinator(Arc::new(DeterministicBackend::new()), 4);
        let config = BatchConfig {
            aggregate_proofs: true,
            ..BatchConfig::default()
        };

        let batch = coordinator
            .generate_batch(&age_circuit(), Vec::new(), &config)
            .await;

        assert!(batch.results.is_empty());
        assert_eq!(batch.average_time_ms, 0);
        assert!(batch.batch_commitment.is_none());
    }

    #[tokio::test]
    async fn batches_get_distinct_ids() {
        let coordinator = coordinator(Arc::new(DeterministicBackend::new()), 4);
        let a = coordinator
            .generate_batch(&age_circuit(), Vec::new(), &BatchConfig::default())
            .await;
        let b = coordinator
            .generate_batch(&age_circuit(), Vec::new(), &BatchConfig::default())
            .await;
        assert_ne!(a.batch_id, b.batch_id);
    }

    // -- Concurrency policy --

    #[tokio::test]
    async fn parallel_mode_is_bounded_by_the_semaphore() {
        let backend = Arc::new(GaugedBackend::new(Duration::from_millis(25)));
        let coordinator = coordinator(Arc::clone(&backend) as Arc<dyn ProofBackend>, 2);

        let inputs: Vec<ProofInput> = (0..6)
            .map(|i| age_input(&format!("subject{i}"), 18))
            .collect();
        let batch = coordinator
            .generate_batch(&age_circuit(), inputs, &BatchConfig::default())
            .await;

        assert_eq!(batch.success_count(), 6);
        assert!(backend.peak() <= 2, "peak concurrency was {}", backend.peak());
        assert!(backend.peak() >= 1);
    }

    #[tokio::test]
    async fn chunking_caps_parallelism_even_with_spare_permits() {
        let backend = Arc::new(GaugedBackend::new(Duration::from_millis(25)));
        let coordinator = coordinator(Arc::clone(&backend) as Arc<dyn ProofBackend>, 16);

        let inputs: Vec<ProofInput> = (0..6)
            .map(|i| age_input(&format!("subject{i}"), 18))
            .collect();
        let config = BatchConfig {
            max_batch_size: 2,
            ..BatchConfig::default()
        };
        let batch = coordinator
            .generate_batch(&age_circuit(), inputs, &config)
            .await;

        assert_eq!(batch.success_count(), 6);
        assert!(backend.peak() <= 2, "peak concurrency was {}", backend.peak());
    }

    #[tokio::test]
    async fn sequential_mode_runs_one_at_a_time() {
        let backend = Arc::new(GaugedBackend::new(Duration::from_millis(10)));
        let coordinator = coordinator(Arc::clone(&backend) as Arc<dyn ProofBackend>, 8);

        let inputs: Vec<ProofInput> = (0..4)
            .map(|i| age_input(&format!("subject{i}"), 18))
            .collect();
        let config = BatchConfig {
            use_parallel_proof: false,
            ..BatchConfig::default()
        };
        let batch = coordinator
            .generate_batch(&age_circuit(), inputs, &config)
            .await;

        assert_eq!(batch.success_count(), 4);
        assert_eq!(backend.peak(), 1);
    }

    // -- Aggregation --

    #[tokio::test]
    async fn aggregation_commits_to_the_successful_proofs() {
        let coordinator = coordinator(Arc::new(DeterministicBackend::new()), 4);
        let config = BatchConfig {
            aggregate_proofs: true,
            ..BatchConfig::default()
        };

        let inputs = vec![age_input("alice", 18), age_input("bob", 21)];
        let batch = coordinator
            .generate_batch(&age_circuit(), inputs.clone(), &config)
            .await;
        let commitment = batch.batch_commitment.clone().unwrap();

        // The same proofs commit to the same digest.
        let again = coordinator
            .generate_batch(&age_circuit(), inputs, &config)
            .await;
        assert_eq!(again.batch_commitment.unwrap(), commitment);
    }

    #[tokio::test]
    async fn aggregation_is_off_by_default() {
        let coordinator = coordinator(Arc::new(DeterministicBackend::new()), 4);
        let batch = coordinator
            .generate_batch(
                &age_circuit(),
                vec![age_input("alice", 18)],
                &BatchConfig::default(),
            )
            .await;
        assert!(batch.batch_commitment.is_none());
    }

    #[tokio::test]
    async fn all_failures_yield_no_commitment() {
        let coordinator = coordinator(Arc::new(DeterministicBackend::new()), 4);
        let config = BatchConfig {
            aggregate_proofs: true,
            ..BatchConfig::default()
        };

        let bad = ProofInput::new(CredentialRef::new("alice").unwrap())
            .with_public("currentYear", 2024)
            .with_public("minAge", 18);
        let batch = coordinator
            .generate_batch(&age_circuit(), vec![bad], &config)
            .await;

        assert_eq!(batch.failure_count(), 1);
        assert!(batch.batch_commitment.is_none());
    }
}
