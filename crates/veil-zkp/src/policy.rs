//! # Proof Backend Policy
//!
//! Enforces production-mode backend requirements at runtime.
//!
//! ## Problem
//!
//! The deterministic development backend produces hash-derived "proofs"
//! with zero cryptographic security. If a deployment accepts them as
//! authoritative, anyone holding a verification key can mint proofs
//! without possessing the underlying credential.
//!
//! ## Solution
//!
//! A [`ProofPolicy`] checked when the engine is assembled. In production
//! mode, any backend reporting `is_cryptographic() == false` is rejected
//! before the engine exists.
//!
//! ## Configuration
//!
//! The policy mode is determined by:
//! 1. Explicit `ProofPolicy::new()` construction
//! 2. Runtime environment variable (`VEIL_PROOF_POLICY`)
//! 3. Compile-time default: release builds are `Production`, debug builds
//!    are `Development`

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::ProofBackend;

/// Errors from proof policy enforcement.
#[derive(Error, Debug)]
pub enum PolicyError {
    /// Non-cryptographic backend rejected in production mode.
    #[error("backend \"{backend}\" rejected: production mode requires a cryptographic proof backend")]
    SimulatedBackendRejected {
        /// The backend that was rejected.
        backend: String,
    },
}

/// Proof policy mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyMode {
    /// Production: reject non-cryptographic backends unconditionally.
    Production,
    /// Development: accept any backend (local dev and tests only).
    Development,
}

/// Runtime policy that validates whether a proof backend is acceptable for
/// the current deployment context.
///
/// ## Usage
///
/// ```rust
/// use veil_zkp::policy::ProofPolicy;
/// use veil_zkp::DeterministicBackend;
///
/// let policy = ProofPolicy::production();
/// assert!(policy.validate(&DeterministicBackend::new()).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ProofPolicy {
    mode: PolicyMode,
}

impl ProofPolicy {
    /// Create a policy with the given mode.
    pub fn new(mode: PolicyMode) -> Self {
        Self { mode }
    }

    /// Create a production policy (rejects non-cryptographic backends).
    pub fn production() -> Self {
        Self {
            mode: PolicyMode::Production,
        }
    }

    /// Create a development policy (accepts any backend).
    pub fn development() -> Self {
        Self {
            mode: PolicyMode::Development,
        }
    }

    /// Create a policy based on the environment.
    ///
    /// Checks (in order):
    /// 1. `VEIL_PROOF_POLICY` env var (`production` or `development`)
    /// 2. Compile-time: release builds default to `Production`
    /// 3. Compile-time: debug builds default to `Development`
    pub fn from_environment() -> Self {
        if let Ok(val) = std::env::var("VEIL_PROOF_POLICY") {
            match val.to_lowercase().as_str() {
                "production" | "prod" => return Self::production(),
                "development" | "dev" => return Self::development(),
                _ => {} // Fall through to compile-time default.
            }
        }

        if cfg!(not(debug_assertions)) {
            Self::production()
        } else {
            Self::development()
        }
    }

    /// Validate whether a backend is acceptable under this policy.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::SimulatedBackendRejected`] if the policy is
    /// production and the backend is not cryptographic.
    pub fn validate(&self, backend: &dyn ProofBackend) -> Result<(), PolicyError> {
        match self.mode {
            PolicyMode::Production => {
                if backend.is_cryptographic() {
                    Ok(())
                } else {
                    Err(PolicyError::SimulatedBackendRejected {
                        backend: backend.name().to_string(),
                    })
                }
            }
            PolicyMode::Development => Ok(()),
        }
    }

    /// Current policy mode.
    pub fn mode(&self) -> PolicyMode {
        self.mode
    }
}
