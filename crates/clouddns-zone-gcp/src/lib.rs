// # Google Cloud DNS Zone Client
//
// This crate provides the Google Cloud adapters for the dynamic Cloud DNS
// system: a `ZoneClient` over the Cloud DNS v1 REST API and a `SecretSource`
// over the Secret Manager v1 REST API.
//
// ## Behavior
//
// - One HTTP request per trait call (plus a metadata-server token request
//   when no static token is configured)
// - HTTP timeout configured (30 seconds)
// - Status codes mapped to specific errors (401/403, 404, 409, 429, 5xx)
// - No retries, no caching, no background tasks
//
// ## Credentials
//
// A static OAuth2 bearer token may be configured. Otherwise every request
// asks the GCE metadata server for the default service account's token,
// which is what Cloud Run provides. Tokens never appear in logs or Debug
// output.
//
// ## API Reference
//
// - List record sets: GET `/dns/v1/projects/:project/managedZones/:zone/rrsets`
// - Create change: POST `/dns/v1/projects/:project/managedZones/:zone/changes`
// - Access secret version: GET `/v1/:name:access`
// - Metadata token: GET `/instance/service-accounts/default/token`

mod auth;
mod secret;

pub use auth::GcpAuth;
pub use secret::SecretManagerSecret;

use async_trait::async_trait;
use clouddns_core::config::ZoneConfig;
use clouddns_core::traits::{ChangeBatch, ChangeReceipt, RecordSet, ZoneClient, ZoneClientFactory};
use clouddns_core::{Error, Result};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Adapter name used in errors and logs
const PROVIDER: &str = "cloud_dns";

/// Base URLs of the Google APIs this crate talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Cloud DNS API root
    pub cloud_dns: String,
    /// Secret Manager API root
    pub secret_manager: String,
    /// Compute metadata server root
    pub metadata: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            cloud_dns: "https://dns.googleapis.com".to_string(),
            secret_manager: "https://secretmanager.googleapis.com".to_string(),
            metadata: "http://metadata.google.internal/computeMetadata/v1".to_string(),
        }
    }
}

impl Endpoints {
    /// Point every API at one base URL (mock servers)
    pub fn single(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            cloud_dns: base.clone(),
            secret_manager: base.clone(),
            metadata: format!("{}/computeMetadata/v1", base),
        }
    }
}

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(DEFAULT_HTTP_TIMEOUT)
        .build()
        .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))
}

/// Turn a non-success response into a descriptive error
///
/// `what` names the operation, e.g. "List record sets".
pub(crate) async fn ensure_success(
    response: reqwest::Response,
    provider: &str,
    what: &str,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());

    Err(match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "{} failed: invalid credentials or insufficient permissions. Status: {}",
            what, status
        )),
        404 => Error::not_found(format!("{} failed: {}", what, error_text)),
        409 => Error::provider(
            provider,
            format!("{} failed: conflicting change. Status: {} - {}", what, status, error_text),
        ),
        429 => Error::provider(
            provider,
            format!("{} failed: rate limit exceeded. Status: {}", what, status),
        ),
        500..=599 => Error::provider(
            provider,
            format!("{} failed: server error (transient): {} - {}", what, status, error_text),
        ),
        _ => Error::provider(provider, format!("{} failed: {} - {}", what, status, error_text)),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordSetList {
    #[serde(default)]
    rrsets: Vec<RecordSet>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Change {
    #[serde(default)]
    id: String,
    #[serde(default)]
    status: String,
    start_time: Option<chrono::DateTime<chrono::Utc>>,
}

/// Cloud DNS managed zone
///
/// Project and managed zone are bound at construction; `connect` resolves
/// the project from the metadata server when it is not configured.
pub struct CloudDnsZone {
    /// GCP project id
    project: String,

    /// Managed zone name (not its DNS name)
    managed_zone: String,

    /// Cloud DNS API root
    api_base: String,

    /// Token source and HTTP client
    auth: GcpAuth,
}

// Custom Debug implementation that hides credentials
impl std::fmt::Debug for CloudDnsZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudDnsZone")
            .field("project", &self.project)
            .field("managed_zone", &self.managed_zone)
            .field("api_base", &self.api_base)
            .field("auth", &self.auth)
            .finish()
    }
}

impl CloudDnsZone {
    /// Connect to a managed zone on the production Google APIs
    pub async fn connect(
        project: Option<String>,
        managed_zone: impl Into<String>,
        access_token: Option<String>,
    ) -> Result<Self> {
        Self::connect_with(Endpoints::default(), project, managed_zone, access_token).await
    }

    /// Connect to a managed zone through explicit endpoints
    pub async fn connect_with(
        endpoints: Endpoints,
        project: Option<String>,
        managed_zone: impl Into<String>,
        access_token: Option<String>,
    ) -> Result<Self> {
        let managed_zone = managed_zone.into();
        if managed_zone.is_empty() {
            return Err(Error::config("Cloud DNS managed zone is required"));
        }

        let auth = GcpAuth::new(&endpoints, access_token)?;
        let project = match project.filter(|p| !p.is_empty()) {
            Some(project) => project,
            None => {
                let discovered = auth.project_id().await?;
                tracing::info!("Discovered GCP project {} from metadata server", discovered);
                discovered
            }
        };

        tracing::debug!("Bound to Cloud DNS zone {}/{}", project, managed_zone);
        Ok(Self {
            project,
            managed_zone,
            api_base: endpoints.cloud_dns,
            auth,
        })
    }

    /// The project this zone lives in
    pub fn project(&self) -> &str {
        &self.project
    }

    fn zone_url(&self, resource: &str) -> String {
        format!(
            "{}/dns/v1/projects/{}/managedZones/{}/{}",
            self.api_base, self.project, self.managed_zone, resource
        )
    }
}

#[async_trait]
impl ZoneClient for CloudDnsZone {
    /// List the zone's record sets
    ///
    /// Only the first page is read. Zones managed by this system stay far
    /// below the API's default page size; a continuation token is logged.
    ///
    /// ```http
    /// GET /dns/v1/projects/:project/managedZones/:zone/rrsets
    /// Authorization: Bearer <token>
    /// ```
    async fn list_records(&self) -> Result<Vec<RecordSet>> {
        let token = self.auth.bearer().await?;
        let response = self
            .auth
            .client()
            .get(self.zone_url("rrsets"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("HTTP request failed: {}", e)))?;

        let response = ensure_success(response, PROVIDER, "List record sets").await?;
        let list: RecordSetList = response
            .json()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("Failed to parse response: {}", e)))?;

        if list.next_page_token.is_some() {
            tracing::warn!(
                "Zone {} has more record sets than one page; only the first page was read",
                self.managed_zone
            );
        }

        Ok(list.rrsets)
    }

    /// Submit an atomic change
    ///
    /// ```http
    /// POST /dns/v1/projects/:project/managedZones/:zone/changes
    /// Authorization: Bearer <token>
    /// {"additions": [...], "deletions": [...]}
    /// ```
    async fn submit_change(&self, batch: &ChangeBatch) -> Result<ChangeReceipt> {
        let token = self.auth.bearer().await?;
        let response = self
            .auth
            .client()
            .post(self.zone_url("changes"))
            .bearer_auth(token)
            .json(batch)
            .send()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("HTTP request failed: {}", e)))?;

        let response = ensure_success(response, PROVIDER, "Create change").await?;
        let change: Change = response
            .json()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("Failed to parse response: {}", e)))?;

        Ok(ChangeReceipt {
            id: change.id,
            status: change.status,
            started_at: change.start_time,
        })
    }

    fn zone_name(&self) -> &str {
        &self.managed_zone
    }
}

/// Factory for creating Cloud DNS zones
#[derive(Debug, Clone, Default)]
pub struct CloudDnsFactory {
    endpoints: Endpoints,
}

impl CloudDnsFactory {
    /// Factory that connects through explicit endpoints
    pub fn with_endpoints(endpoints: Endpoints) -> Self {
        Self { endpoints }
    }
}

#[async_trait]
impl ZoneClientFactory for CloudDnsFactory {
    async fn create(&self, config: &ZoneConfig) -> Result<Arc<dyn ZoneClient>> {
        match config {
            ZoneConfig::CloudDns {
                project,
                managed_zone,
                access_token,
            } => {
                let zone = CloudDnsZone::connect_with(
                    self.endpoints.clone(),
                    project.clone(),
                    managed_zone.clone(),
                    access_token.clone(),
                )
                .await?;
                Ok(Arc::new(zone))
            }
            _ => Err(Error::config("Invalid config for Cloud DNS zone")),
        }
    }
}

/// Register the Cloud DNS zone with a registry
///
/// # Example
///
/// ```rust
/// use clouddns_core::AdapterRegistry;
///
/// let registry = AdapterRegistry::with_builtin();
/// clouddns_zone_gcp::register(&registry);
/// assert!(registry.has_zone_client("cloud_dns"));
/// ```
pub fn register(registry: &clouddns_core::AdapterRegistry) {
    registry.register_zone_client(PROVIDER, Box::new(CloudDnsFactory::default()));
}
