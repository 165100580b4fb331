//! Configuration types for the dynamic Cloud DNS system
//!
//! This module defines all configuration structures used throughout the workspace.
//! Binaries build these from environment variables; library users can build
//! them directly or deserialize them.

use serde::{Deserialize, Serialize};

/// Main daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Managed zone configuration
    pub zone: ZoneConfig,

    /// Where the shared update secret comes from
    pub secret: SecretConfig,

    /// HTTP listener settings
    #[serde(default)]
    pub server: ServerConfig,
}

impl ServiceConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.zone.validate()?;
        self.secret.validate()?;
        self.server.validate()?;
        Ok(())
    }
}

/// Managed zone configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ZoneConfig {
    /// Google Cloud DNS managed zone
    CloudDns {
        /// GCP project id (discovered from the metadata server when absent)
        project: Option<String>,
        /// Managed zone name (not the DNS name)
        managed_zone: String,
        /// Static OAuth2 bearer token (metadata server is used when absent)
        access_token: Option<String>,
    },

    /// In-process zone (not persistent)
    Memory,

    /// Custom zone adapter
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ZoneConfig {
    /// Validate the zone configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ZoneConfig::CloudDns {
                project,
                managed_zone,
                ..
            } => {
                if managed_zone.is_empty() {
                    return Err(crate::Error::config(
                        "Managed zone id not found (check ZONE env var)",
                    ));
                }
                if project.as_ref().is_some_and(|p| p.is_empty()) {
                    return Err(crate::Error::config("Cloud DNS project cannot be empty"));
                }
                Ok(())
            }
            ZoneConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom zone factory cannot be empty"));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom zone config cannot be null"));
                }
                Ok(())
            }
            ZoneConfig::Memory => Ok(()),
        }
    }

    /// Get the zone adapter type name
    pub fn type_name(&self) -> &str {
        match self {
            ZoneConfig::CloudDns { .. } => "cloud_dns",
            ZoneConfig::Memory => "memory",
            ZoneConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for ZoneConfig {
    fn default() -> Self {
        ZoneConfig::Memory
    }
}

/// Source of the shared update secret
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SecretConfig {
    /// Secret Manager resource name, e.g. `projects/p/secrets/s/versions/1`
    SecretManager {
        /// Full resource name
        name: String,
    },

    /// Literal value from the environment (explicitly allowed as insecure)
    Literal {
        /// The secret value
        value: String,
    },
}

impl SecretConfig {
    /// Decide where the secret comes from
    ///
    /// `secret` is the configured value (`SECRET`), `use_insecure` the raw
    /// opt-in flag for literal secrets (`USE_INSECURE_SECRET`). A value shaped
    /// like a Secret Manager resource name always wins; a literal value is
    /// accepted only with the opt-in set to `1`, `true` or `yes`.
    pub fn resolve(secret: Option<&str>, use_insecure: Option<&str>) -> Result<Self, crate::Error> {
        let secret = match secret {
            Some(s) if !s.is_empty() => s,
            _ => {
                return Err(crate::Error::config(
                    "No SECRET environment variable defined",
                ));
            }
        };

        if is_secret_manager_name(secret) {
            return Ok(SecretConfig::SecretManager {
                name: secret.to_string(),
            });
        }

        let opt_in = use_insecure
            .map(|v| v.trim().to_lowercase())
            .unwrap_or_default();
        if matches!(opt_in.as_str(), "1" | "true" | "yes") {
            Ok(SecretConfig::Literal {
                value: secret.to_string(),
            })
        } else {
            Err(crate::Error::config("Invalid secret setup"))
        }
    }

    /// Validate the secret configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            SecretConfig::SecretManager { name } if !is_secret_manager_name(name) => Err(
                crate::Error::config(format!("Not a Secret Manager resource name: {}", name)),
            ),
            SecretConfig::Literal { value } if value.is_empty() => {
                Err(crate::Error::config("Secret value cannot be empty"))
            }
            _ => Ok(()),
        }
    }
}

// Literal secrets must never reach logs
impl std::fmt::Debug for SecretConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretConfig::SecretManager { name } => f
                .debug_struct("SecretManager")
                .field("name", name)
                .finish(),
            SecretConfig::Literal { .. } => f
                .debug_struct("Literal")
                .field("value", &"<REDACTED>")
                .finish(),
        }
    }
}

/// Whether `value` looks like `projects/<project>/secrets/<secret>...`
pub fn is_secret_manager_name(value: &str) -> bool {
    value
        .find("projects/")
        .is_some_and(|start| value[start + "projects/".len()..].contains("/secrets/"))
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// TCP port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    /// Validate the listener configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.port == 0 {
            return Err(crate::Error::config("Invalid port"));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

fn default_port() -> u16 {
    8080
}

/// Registry client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegistryConfig {
    /// Local docker CLI
    Docker {
        /// Path to the docker binary (`docker` on PATH when absent)
        binary: Option<String>,
    },

    /// Custom registry adapter
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl RegistryConfig {
    /// Get the registry adapter type name
    pub fn type_name(&self) -> &str {
        match self {
            RegistryConfig::Docker { .. } => "docker",
            RegistryConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig::Docker { binary: None }
    }
}
