// # Secret Manager secret source
//
// Reads the shared update secret from a Secret Manager secret version on
// every call, so rotating the secret needs no restart.

use crate::{Endpoints, GcpAuth, ensure_success};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clouddns_core::traits::SecretSource;
use clouddns_core::{Error, Result};
use serde::Deserialize;

const PROVIDER: &str = "secret_manager";

#[derive(Deserialize)]
struct AccessResponse {
    payload: Option<Payload>,
}

#[derive(Deserialize)]
struct Payload {
    data: Option<String>,
}

/// Secret Manager secret version
#[derive(Debug, Clone)]
pub struct SecretManagerSecret {
    /// Resource name, e.g. `projects/p/secrets/s/versions/latest`
    name: String,
    api_base: String,
    auth: GcpAuth,
}

impl SecretManagerSecret {
    /// Read `name` through the production Secret Manager API
    pub fn new(name: impl Into<String>, access_token: Option<String>) -> Result<Self> {
        Self::with_endpoints(Endpoints::default(), name, access_token)
    }

    /// Read `name` through explicit endpoints
    pub fn with_endpoints(
        endpoints: Endpoints,
        name: impl Into<String>,
        access_token: Option<String>,
    ) -> Result<Self> {
        let auth = GcpAuth::new(&endpoints, access_token)?;
        Ok(Self {
            name: name.into(),
            api_base: endpoints.secret_manager,
            auth,
        })
    }
}

#[async_trait]
impl SecretSource for SecretManagerSecret {
    /// ```http
    /// GET /v1/:name:access
    /// Authorization: Bearer <token>
    /// ```
    async fn read_secret(&self) -> Result<String> {
        let token = self.auth.bearer().await?;
        let response = self
            .auth
            .client()
            .get(format!("{}/v1/{}:access", self.api_base, self.name))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("HTTP request failed: {}", e)))?;

        let response = ensure_success(response, PROVIDER, "Access secret version").await?;
        let access: AccessResponse = response
            .json()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("Failed to parse response: {}", e)))?;

        let encoded = access
            .payload
            .and_then(|p| p.data)
            .ok_or_else(|| Error::secret(format!("Secret {} has no payload data", self.name)))?;
        let bytes = STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| Error::secret(format!("Secret {} payload is not base64: {}", self.name, e)))?;

        String::from_utf8(bytes)
            .map_err(|_| Error::secret(format!("Secret {} payload is not UTF-8 text", self.name)))
    }
}
