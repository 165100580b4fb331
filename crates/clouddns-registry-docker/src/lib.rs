// # Docker CLI Registry Client
//
// This crate provides a `RegistryClient` that drives the local `docker`
// binary. The docker daemon's credential helpers handle registry
// authentication, so this crate never sees credentials.
//
// ## Behavior
//
// - One docker invocation per trait call, awaited to completion
// - Non-zero exit codes become `Error::Registry` carrying the command and stderr
// - Command output is logged at info (pull/tag/push) or debug (inspect)
// - `inspect` selects the digest for the target's own repository from
//   `RepoDigests`, falling back to the first entry

use async_trait::async_trait;
use clouddns_core::config::RegistryConfig;
use clouddns_core::reference;
use clouddns_core::traits::{ImageDigest, RegistryClient, RegistryClientFactory};
use clouddns_core::{Error, Result};
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info};

/// Default docker binary, resolved through PATH
pub const DEFAULT_DOCKER: &str = "docker";

/// One element of `docker inspect` output
#[derive(Debug, Deserialize)]
struct InspectEntry {
    #[serde(rename = "Id")]
    id: Option<String>,
    #[serde(rename = "RepoDigests")]
    repo_digests: Option<Vec<String>>,
}

/// Registry client backed by the docker CLI
#[derive(Debug, Clone)]
pub struct DockerCli {
    /// Program to execute
    binary: String,
    /// Arguments placed before every docker subcommand
    base_args: Vec<String>,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new(DEFAULT_DOCKER)
    }
}

impl DockerCli {
    /// Use `binary` as the docker executable
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            base_args: Vec::new(),
        }
    }

    /// Run `program base_args... ` in front of every subcommand
    ///
    /// e.g. `DockerCli::wrapped("sudo", ["docker"])`.
    pub fn wrapped<I, S>(program: impl Into<String>, base_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            binary: program.into(),
            base_args: base_args.into_iter().map(Into::into).collect(),
        }
    }

    /// Run one docker subcommand and return its stdout
    async fn run(&self, args: &[&str], verbose: bool) -> Result<String> {
        let command_line = format!("docker {}", args.join(" "));
        let output = Command::new(&self.binary)
            .args(&self.base_args)
            .args(args)
            .output()
            .await
            .map_err(|e| Error::registry(format!("Failed to run {}: {}", command_line, e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(Error::registry(match output.status.code() {
                Some(code) => format!(
                    "{} exited with code {}: {}",
                    command_line,
                    code,
                    stderr.trim()
                ),
                None => format!("{} was terminated by a signal: {}", command_line, stderr.trim()),
            }));
        }

        for line in stdout.lines().chain(stderr.lines()).filter(|l| !l.trim().is_empty()) {
            if verbose {
                info!("{}", line);
            } else {
                debug!("{}", line);
            }
        }
        info!("Successfully ran {}", command_line);

        Ok(stdout)
    }
}

#[async_trait]
impl RegistryClient for DockerCli {
    async fn pull(&self, reference: &str) -> Result<()> {
        self.run(&["pull", reference], true).await.map(|_| ())
    }

    async fn tag(&self, from: &str, to: &str) -> Result<()> {
        self.run(&["tag", from, to], true).await.map(|_| ())
    }

    async fn push(&self, reference: &str) -> Result<()> {
        self.run(&["push", reference], true).await.map(|_| ())
    }

    async fn inspect(&self, image: &str) -> Result<ImageDigest> {
        let stdout = self.run(&["inspect", image], false).await?;
        let unusual = || {
            Error::registry(format!(
                "docker inspect returned something unusual for {}: {}",
                image,
                stdout.trim()
            ))
        };

        let entries: Vec<InspectEntry> = serde_json::from_str(&stdout).map_err(|_| unusual())?;
        let entry = entries.first().ok_or_else(unusual)?;
        let repo_digests = entry.repo_digests.as_deref().unwrap_or_default();

        let digest = reference::select_digest(image, repo_digests).ok_or_else(unusual)?;
        debug!(
            "{} (image {}) has digest {}",
            image,
            entry.id.as_deref().unwrap_or("?"),
            digest
        );

        Ok(ImageDigest { digest })
    }

    fn client_name(&self) -> &'static str {
        "docker"
    }
}

/// Factory for creating docker CLI clients
pub struct DockerFactory;

impl RegistryClientFactory for DockerFactory {
    fn create(&self, config: &RegistryConfig) -> Result<Box<dyn RegistryClient>> {
        match config {
            RegistryConfig::Docker { binary } => match binary.as_deref() {
                Some("") => Err(Error::config("Docker binary path cannot be empty")),
                Some(path) => Ok(Box::new(DockerCli::new(path))),
                None => Ok(Box::new(DockerCli::default())),
            },
            _ => Err(Error::config("Invalid config for docker registry client")),
        }
    }
}

/// Register the docker CLI client with a registry
///
/// # Example
///
/// ```rust
/// use clouddns_core::AdapterRegistry;
///
/// let registry = AdapterRegistry::new();
/// clouddns_registry_docker::register(&registry);
/// assert!(registry.has_registry_client("docker"));
/// ```
pub fn register(registry: &clouddns_core::AdapterRegistry) {
    registry.register_registry_client("docker", Box::new(DockerFactory));
}
