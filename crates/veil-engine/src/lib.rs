#![deny(missing_docs)]

//! # veil-engine — Proof Generation Pipeline
//!
//! The operational layer of the Veil engine: everything between a caller's
//! [`ProofRequest`] and a verified [`ProofArtifact`](veil_zkp::ProofArtifact).
//! Circuits describe themselves (`veil-circuits`), backends prove
//! (`veil-zkp`); this crate loads, schedules, dedupes, caches, and sweeps.
//!
//! ## Architecture
//!
//! - [`engine::ProofEngine`] is the constructor-injected facade. No
//!   singletons: every collaborator arrives through the builder.
//! - [`registry::CircuitRegistry`] loads circuit artifacts once per
//!   process through an [`resolver::ArtifactResolver`], with retry and
//!   digest pinning.
//! - [`generator::ProofGenerator`] runs the request pipeline: witness
//!   preparation, in-flight deduplication ([`singleflight`]), proving on
//!   the blocking pool, caching ([`cache`]), and witness pre-computation
//!   for the follow-up request ([`precompute`]).
//! - [`verifier::ProofVerifier`] checks proofs, reporting forgery as a
//!   normal `is_valid: false` outcome rather than an error.
//! - [`batch::BatchCoordinator`] fans a list of inputs out over the
//!   generator with bounded concurrency and input-order results.
//! - [`config::EngineConfig`] carries the tunables, overridable from
//!   `VEIL_*` environment variables.

pub mod batch;
pub mod cache;
pub mod config;
pub mod engine;
pub mod generator;
pub mod precompute;
pub mod registry;
pub mod resolver;
pub mod singleflight;
pub mod verifier;

// Re-export primary types.
pub use batch::{BatchConfig, BatchCoordinator, BatchResult};
pub use cache::{CacheStats, ProofCache};
pub use config::EngineConfig;
pub use engine::{ProofEngine, ProofEngineBuilder};
pub use generator::{ProofGenerator, ProofOptions, ProofRequest};
pub use precompute::WitnessPrecomputer;
pub use registry::{CircuitRegistry, LoadedCircuit};
pub use resolver::{
    ArtifactResolver, FsResolver, HttpResolver, MemoryResolver, ResolveError, ResolveFuture,
};
pub use singleflight::SingleFlight;
pub use verifier::ProofVerifier;
