//! # Artifact Resolvers
//!
//! A [`CircuitDescriptor`](veil_circuits::CircuitDescriptor) names its
//! artifacts by opaque URI; an [`ArtifactResolver`] turns a URI into bytes.
//! The engine injects exactly one resolver, so where artifacts live (a CDN,
//! a mounted volume, test memory) is a deployment decision, not engine code.
//!
//! Integrity is not this layer's job: the registry checks declared digests
//! after fetching. Resolvers report transport truthfully and nothing more.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use thiserror::Error;

/// Failure fetching artifact bytes from a URI.
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    /// The URI does not name a fetchable artifact.
    #[error("artifact not found at {0}")]
    NotFound(String),

    /// Transport-level failure reaching the artifact store.
    #[error("transport failure fetching {uri}: {reason}")]
    Transport {
        /// The URI that failed to fetch.
        uri: String,
        /// The underlying transport error.
        reason: String,
    },

    /// The store answered with a non-success HTTP status.
    #[error("unexpected status {status} fetching {uri}")]
    Status {
        /// The URI that failed to fetch.
        uri: String,
        /// The HTTP status code received.
        status: u16,
    },

    /// The URI itself could not be interpreted.
    #[error("invalid artifact uri {uri}: {reason}")]
    InvalidUri {
        /// The rejected URI.
        uri: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl ResolveError {
    /// Whether retrying the fetch could plausibly succeed.
    ///
    /// Connection failures and server-side 5xx responses are transient;
    /// missing artifacts and malformed URIs are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ResolveError::Transport { .. } | ResolveError::Status { status: 500..=599, .. }
        )
    }
}

/// Boxed future alias keeping [`ArtifactResolver`] object-safe.
pub type ResolveFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<u8>, ResolveError>> + Send + 'a>>;

/// Fetches raw artifact bytes by opaque URI.
pub trait ArtifactResolver: Send + Sync {
    /// Fetch the bytes at `uri`.
    fn fetch<'a>(&'a self, uri: &'a str) -> ResolveFuture<'a>;
}

/// Resolver for `http://` and `https://` artifact stores.
#[derive(Debug, Clone)]
pub struct HttpResolver {
    client: reqwest::Client,
}

impl HttpResolver {
    /// A resolver with a default client.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// A resolver reusing an existing client (connection pools, proxies,
    /// timeouts configured by the caller).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactResolver for HttpResolver {
    fn fetch<'a>(&'a self, uri: &'a str) -> ResolveFuture<'a> {
        Box::pin(async move {
            let url = url::Url::parse(uri).map_err(|e| ResolveError::InvalidUri {
                uri: uri.to_string(),
                reason: e.to_string(),
            })?;
            let response =
                self.client
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| ResolveError::Transport {
                        uri: uri.to_string(),
                        reason: e.to_string(),
                    })?;
            let status = response.status();
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(ResolveError::NotFound(uri.to_string()));
            }
            if !status.is_success() {
                return Err(ResolveError::Status {
                    uri: uri.to_string(),
                    status: status.as_u16(),
                });
            }
            let bytes = response.bytes().await.map_err(|e| ResolveError::Transport {
                uri: uri.to_string(),
                reason: e.to_string(),
            })?;
            Ok(bytes.to_vec())
        })
    }
}

/// Resolver for `file://` URIs and bare filesystem paths.
#[derive(Debug, Clone, Default)]
pub struct FsResolver {
    root: Option<PathBuf>,
}

impl FsResolver {
    /// A resolver interpreting URIs as paths from the process working
    /// directory.
    pub fn new() -> Self {
        Self { root: None }
    }

    /// A resolver joining every URI under `root`.
    pub fn rooted(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn path_for(&self, uri: &str) -> PathBuf {
        let raw = uri.strip_prefix("file://").unwrap_or(uri);
        match &self.root {
            Some(root) => root.join(raw),
            None => PathBuf::from(raw),
        }
    }
}

impl ArtifactResolver for FsResolver {
    fn fetch<'a>(&'a self, uri: &'a str) -> ResolveFuture<'a> {
        let path = self.path_for(uri);
        Box::pin(async move {
            tokio::fs::read(&path).await.map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ResolveError::NotFound(uri.to_string())
                } else {
                    ResolveError::Transport {
                        uri: uri.to_string(),
                        reason: e.to_string(),
                    }
                }
            })
        })
    }
}

/// In-memory resolver for tests and local development.
///
/// Explicit mode serves only inserted blobs and reports anything else as
/// [`ResolveError::NotFound`]. Synthetic mode answers every URI with a
/// deterministic per-URI blob, which is sufficient for backends that treat
/// artifact bytes as opaque identity.
#[derive(Debug, Default)]
pub struct MemoryResolver {
    artifacts: parking_lot::RwLock<HashMap<String, Vec<u8>>>,
    synthetic: bool,
}

impl MemoryResolver {
    /// An empty explicit-mode resolver.
    pub fn new() -> Self {
        Self {
            artifacts: parking_lot::RwLock::new(HashMap::new()),
            synthetic: false,
        }
    }

    /// A synthetic-mode resolver answering every URI deterministically.
    pub fn synthetic() -> Self {
        Self {
            artifacts: parking_lot::RwLock::new(HashMap::new()),
            synthetic: true,
        }
    }

    /// Serve `bytes` for `uri`. Explicit entries win over synthesis.
    pub fn insert(&self, uri: impl Into<String>, bytes: Vec<u8>) {
        self.artifacts.write().insert(uri.into(), bytes);
    }
}

impl ArtifactResolver for MemoryResolver {
    fn fetch<'a>(&'a self, uri: &'a str) -> ResolveFuture<'a> {
        let stored = self.artifacts.read().get(uri).cloned();
        let synthetic = self.synthetic;
        Box::pin(async move {
            match stored {
                Some(bytes) => Ok(bytes),
                None if synthetic => Ok(format!("veil-dev-artifact:{uri}").into_bytes()),
                None => Err(ResolveError::NotFound(uri.to_string())),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // -- MemoryResolver --

    #[tokio::test]
    async fn memory_resolver_serves_inserted_bytes() {
        let resolver = MemoryResolver::new();
        resolver.insert("circuits/age/program.wasm", b"wasm bytes".to_vec());
        let bytes = resolver.fetch("circuits/age/program.wasm").await.unwrap();
        assert_eq!(bytes, b"wasm bytes");
    }

    #[tokio::test]
    async fn memory_resolver_explicit_mode_reports_missing() {
        let resolver = MemoryResolver::new();
        let err = resolver.fetch("circuits/missing").await.unwrap_err();
        assert!(matches!(err, ResolveError::NotFound(_)));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn memory_resolver_synthetic_mode_answers_everything() {
        let resolver = MemoryResolver::synthetic();
        let a = resolver.fetch("circuits/a/vk.json").await.unwrap();
        let b = resolver.fetch("circuits/b/vk.json").await.unwrap();
        assert_ne!(a, b);
        assert_eq!(a, resolver.fetch("circuits/a/vk.json").await.unwrap());
    }

    // -- FsResolver --

    #[tokio::test]
    async fn fs_resolver_reads_files_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("verification_key.json");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"{\"vk\": true}").unwrap();

        let resolver = FsResolver::rooted(dir.path());
        let bytes = resolver.fetch("verification_key.json").await.unwrap();
        assert_eq!(bytes, b"{\"vk\": true}");
    }

    #[tokio::test]
    async fn fs_resolver_strips_file_scheme() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proving.zkey");
        std::fs::write(&path, b"zkey").unwrap();

        let resolver = FsResolver::new();
        let uri = format!("file://{}", path.display());
        assert_eq!(resolver.fetch(&uri).await.unwrap(), b"zkey");
    }

    #[tokio::test]
    async fn fs_resolver_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = FsResolver::rooted(dir.path());
        let err = resolver.fetch("absent.wasm").await.unwrap_err();
        assert!(matches!(err, ResolveError::NotFound(_)));
    }

    // -- HttpResolver --

    #[tokio::test]
    async fn http_resolver_reports_connection_failure_as_transient() {
        // Port 1 is never listening.
        let resolver = HttpResolver::new();
        let err = resolver.fetch("http://127.0.0.1:1/vk.json").await.unwrap_err();
        assert!(matches!(err, ResolveError::Transport { .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn http_resolver_rejects_malformed_uri() {
        let resolver = HttpResolver::new();
        let err = resolver.fetch("not a uri").await.unwrap_err();
        assert!(matches!(err, ResolveError::InvalidUri { .. }));
    }

    #[test]
    fn transience_classification() {
        assert!(ResolveError::Status {
            uri: "u".into(),
            status: 503
        }
        .is_transient());
        assert!(!ResolveError::Status {
            uri: "u".into(),
            status: 403
        }
        .is_transient());
        assert!(!ResolveError::InvalidUri {
            uri: "u".into(),
            reason: "r".into()
        }
        .is_transient());
    }
}
