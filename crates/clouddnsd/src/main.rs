// # clouddnsd - Dynamic Cloud DNS daemon
//
// Thin integration layer: reads configuration from the environment, builds
// the zone client and secret source once, and serves the HTTP front end.
// All record logic lives in clouddns-core.
//
// ## Configuration
//
// - `PORT`: listen port (default 8080)
// - `PROJECT_ID` / `GCLOUD_PROJECT`: GCP project (metadata server when unset)
// - `ZONE`: Cloud DNS managed zone name
// - `SECRET`: shared secret, or a Secret Manager resource name
//   (`projects/<p>/secrets/<s>/versions/<v>`)
// - `USE_INSECURE_SECRET`: `1`, `true` or `yes` to allow a literal `SECRET`
// - `CLOUDDNS_ZONE_TYPE`: `cloud_dns` (default) or `memory`
// - `GOOGLE_OAUTH_ACCESS_TOKEN`: static bearer token (metadata server when unset)
// - `CLOUDDNS_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export ZONE=home-zone
// export SECRET=projects/my-project/secrets/record-update-secret/versions/latest
//
// clouddnsd
// curl 'http://localhost:8080/update?secret=...&domain=home.example.com.&ip=1.2.3.4'
// ```

use anyhow::{Context, Result};
use clouddns_core::config::{SecretConfig, ServerConfig, ServiceConfig, ZoneConfig};
use clouddns_core::traits::{SecretSource, StaticSecret};
use clouddns_core::{AdapterRegistry, DnsReconciler};
use clouddnsd::{AppState, router};
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DaemonExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DaemonExitCode> for ExitCode {
    fn from(code: DaemonExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    service: ServiceConfig,
    log_level: String,
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let port = match non_empty_var("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| anyhow::anyhow!("Invalid port: {}", raw))?,
            None => ServerConfig::default().port,
        };

        let zone_type = env::var("CLOUDDNS_ZONE_TYPE").unwrap_or_else(|_| "cloud_dns".to_string());
        let zone = match zone_type.as_str() {
            "cloud_dns" => ZoneConfig::CloudDns {
                project: non_empty_var("PROJECT_ID").or_else(|| non_empty_var("GCLOUD_PROJECT")),
                managed_zone: non_empty_var("ZONE")
                    .context("ZONE is required. Set it via: export ZONE=<managed zone name>")?,
                access_token: non_empty_var("GOOGLE_OAUTH_ACCESS_TOKEN"),
            },
            "memory" => ZoneConfig::Memory,
            other => anyhow::bail!(
                "CLOUDDNS_ZONE_TYPE '{}' is not supported. \
                Supported types: cloud_dns, memory",
                other
            ),
        };

        let secret = SecretConfig::resolve(
            env::var("SECRET").ok().as_deref(),
            env::var("USE_INSECURE_SECRET").ok().as_deref(),
        )?;

        Ok(Self {
            service: ServiceConfig {
                zone,
                secret,
                server: ServerConfig { port },
            },
            log_level: env::var("CLOUDDNS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        self.service.validate()?;

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "CLOUDDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DaemonExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return DaemonExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DaemonExitCode::ConfigError.into();
    }

    info!("Starting clouddnsd daemon");
    info!(
        "Zone type: {}, port: {}",
        config.service.zone.type_name(),
        config.service.server.port
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DaemonExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        let state = match build_state(&config.service).await {
            Ok(state) => state,
            Err(e) => {
                error!("Startup error: {:#}", e);
                return DaemonExitCode::ConfigError;
            }
        };

        match serve(state, config.service.server.port).await {
            Ok(()) => DaemonExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                DaemonExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Construct the zone client and secret source once
async fn build_state(service: &ServiceConfig) -> Result<AppState> {
    let registry = AdapterRegistry::with_builtin();

    #[cfg(feature = "gcp")]
    {
        info!("Registering Cloud DNS zone");
        clouddns_zone_gcp::register(&registry);
    }

    let zone = registry
        .create_zone_client(&service.zone)
        .await
        .context("Failed to initialize zone client")?;
    info!("Managing zone {}", zone.zone_name());

    let secret = secret_source(service)?;
    Ok(AppState::new(Arc::new(DnsReconciler::new(zone)), secret))
}

fn secret_source(service: &ServiceConfig) -> Result<Arc<dyn SecretSource>> {
    match &service.secret {
        SecretConfig::Literal { value } => {
            info!("Using literal SECRET (USE_INSECURE_SECRET is set)");
            Ok(Arc::new(StaticSecret::new(value.clone())))
        }
        #[cfg(feature = "gcp")]
        SecretConfig::SecretManager { name } => {
            info!("Reading SECRET from Secret Manager: {}", name);
            let access_token = match &service.zone {
                ZoneConfig::CloudDns { access_token, .. } => access_token.clone(),
                _ => non_empty_var("GOOGLE_OAUTH_ACCESS_TOKEN"),
            };
            Ok(Arc::new(clouddns_zone_gcp::SecretManagerSecret::new(
                name.clone(),
                access_token,
            )?))
        }
        #[cfg(not(feature = "gcp"))]
        SecretConfig::SecretManager { .. } => {
            anyhow::bail!("Secret Manager secrets need the `gcp` feature")
        }
    }
}

/// Serve HTTP until SIGTERM or SIGINT
async fn serve(state: AppState, port: u16) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Listening on {}", port);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            match wait_for_shutdown().await {
                Ok(signal) => info!("Received shutdown signal: {}", signal),
                Err(e) => error!("Shutdown error: {}", e),
            }
            info!("Shutting down daemon");
        })
        .await
        .context("HTTP server failed")
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
