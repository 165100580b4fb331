// # Google credentials
//
// Bearer tokens and project discovery through the compute metadata server.

use crate::{Endpoints, ensure_success, http_client};
use clouddns_core::{Error, Result};
use serde::Deserialize;

const METADATA: &str = "metadata";

#[derive(Deserialize)]
struct MetadataToken {
    access_token: String,
}

/// Token source plus the shared HTTP client
///
/// Cloning shares the client's connection pool.
#[derive(Clone)]
pub struct GcpAuth {
    client: reqwest::Client,
    metadata_base: String,
    /// Static bearer token; the metadata server is asked when absent
    /// ⚠️ NEVER log this value
    static_token: Option<String>,
}

impl std::fmt::Debug for GcpAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcpAuth")
            .field("metadata_base", &self.metadata_base)
            .field(
                "static_token",
                &self.static_token.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

impl GcpAuth {
    /// Build a token source; an empty static token counts as absent
    pub fn new(endpoints: &Endpoints, static_token: Option<String>) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            metadata_base: endpoints.metadata.clone(),
            static_token: static_token.filter(|t| !t.is_empty()),
        })
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Current bearer token
    ///
    /// ```http
    /// GET /computeMetadata/v1/instance/service-accounts/default/token
    /// Metadata-Flavor: Google
    /// ```
    pub async fn bearer(&self) -> Result<String> {
        if let Some(token) = &self.static_token {
            return Ok(token.clone());
        }

        let response = self
            .metadata_get("instance/service-accounts/default/token")
            .await?;
        let token: MetadataToken = response
            .json()
            .await
            .map_err(|e| Error::auth(format!("Invalid metadata token response: {}", e)))?;
        Ok(token.access_token)
    }

    /// Project id of the environment the process runs in
    pub async fn project_id(&self) -> Result<String> {
        let response = self.metadata_get("project/project-id").await?;
        let project = response
            .text()
            .await
            .map_err(|e| Error::provider(METADATA, format!("Failed to read project id: {}", e)))?;

        let project = project.trim();
        if project.is_empty() {
            return Err(Error::config("Metadata server reported an empty project id"));
        }
        Ok(project.to_string())
    }

    async fn metadata_get(&self, resource: &str) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(format!("{}/{}", self.metadata_base, resource))
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| {
                Error::provider(
                    METADATA,
                    format!("Metadata server unreachable (not running on Google Cloud?): {}", e),
                )
            })?;

        ensure_success(response, METADATA, "Metadata lookup").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token_wins() {
        let auth = GcpAuth::new(&Endpoints::single("http://127.0.0.1:9"), Some("t1".to_string())).unwrap();
        assert_eq!(auth.bearer().await.unwrap(), "t1");
    }

    #[test]
    fn test_empty_static_token_ignored() {
        let auth = GcpAuth::new(&Endpoints::default(), Some(String::new())).unwrap();
        assert!(auth.static_token.is_none());
        assert!(format!("{:?}", auth).contains("None"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let auth = GcpAuth::new(&Endpoints::default(), Some("secret_token_12345".to_string())).unwrap();
        assert!(!format!("{:?}", auth).contains("secret_token_12345"));
    }
}
