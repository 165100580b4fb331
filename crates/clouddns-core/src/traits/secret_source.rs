// # Secret Source Trait
//
// Supplies the shared value an update request must present. The reconciler
// never sees it; the HTTP front end compares it before calling `reconcile`.

use async_trait::async_trait;

/// Trait for secret readers
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Read the current secret value
    async fn read_secret(&self) -> Result<String, crate::Error>;
}

/// A secret held in process memory
///
/// The Debug implementation does not expose the value.
#[derive(Clone)]
pub struct StaticSecret {
    value: String,
}

impl StaticSecret {
    /// Wrap a literal secret value
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl std::fmt::Debug for StaticSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticSecret")
            .field("value", &"<REDACTED>")
            .finish()
    }
}

#[async_trait]
impl SecretSource for StaticSecret {
    async fn read_secret(&self) -> Result<String, crate::Error> {
        Ok(self.value.clone())
    }
}
