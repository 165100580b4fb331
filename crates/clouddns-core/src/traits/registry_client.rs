// # Registry Client Trait
//
// Defines the interface to a container registry and the local image store
// used to move images between registries.
//
// ## Implementations
//
// - docker CLI: `clouddns-registry-docker` crate

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Registry-assigned content digest of a pushed image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDigest {
    /// Digest in `algorithm:hex` form, e.g. `sha256:0a1b...`
    pub digest: String,
}

/// Trait for container registry adapters
///
/// Each method performs exactly one blocking external operation and
/// reports success or failure. Pushing an image the registry already holds
/// must succeed, which keeps repeated publishes idempotent.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Pull `reference` into the local image store
    async fn pull(&self, reference: &str) -> Result<(), crate::Error>;

    /// Give the local image `from` the additional name `to`
    async fn tag(&self, from: &str, to: &str) -> Result<(), crate::Error>;

    /// Push `reference` to its registry
    async fn push(&self, reference: &str) -> Result<(), crate::Error>;

    /// Look up the registry digest of a pushed `reference`
    async fn inspect(&self, reference: &str) -> Result<ImageDigest, crate::Error>;

    /// Adapter name (for logging)
    fn client_name(&self) -> &'static str;
}

/// Helper trait for constructing registry clients from configuration
pub trait RegistryClientFactory: Send + Sync {
    /// Create a registry client from configuration
    fn create(
        &self,
        config: &crate::config::RegistryConfig,
    ) -> Result<Box<dyn RegistryClient>, crate::Error>;
}

#[async_trait]
impl<T: RegistryClient + ?Sized> RegistryClient for Box<T> {
    async fn pull(&self, reference: &str) -> Result<(), crate::Error> {
        (**self).pull(reference).await
    }

    async fn tag(&self, from: &str, to: &str) -> Result<(), crate::Error> {
        (**self).tag(from, to).await
    }

    async fn push(&self, reference: &str) -> Result<(), crate::Error> {
        (**self).push(reference).await
    }

    async fn inspect(&self, reference: &str) -> Result<ImageDigest, crate::Error> {
        (**self).inspect(reference).await
    }

    fn client_name(&self) -> &'static str {
        (**self).client_name()
    }
}

#[async_trait]
impl<T: RegistryClient + ?Sized> RegistryClient for std::sync::Arc<T> {
    async fn pull(&self, reference: &str) -> Result<(), crate::Error> {
        (**self).pull(reference).await
    }

    async fn tag(&self, from: &str, to: &str) -> Result<(), crate::Error> {
        (**self).tag(from, to).await
    }

    async fn push(&self, reference: &str) -> Result<(), crate::Error> {
        (**self).push(reference).await
    }

    async fn inspect(&self, reference: &str) -> Result<ImageDigest, crate::Error> {
        (**self).inspect(reference).await
    }

    fn client_name(&self) -> &'static str {
        (**self).client_name()
    }
}
