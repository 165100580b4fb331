// # image-publish - image publish lifecycle driver
//
// Exposes the image publish resource provider to an external orchestration
// engine. Each invocation runs one lifecycle operation:
//
// ```bash
// echo '{"name":"service-image","news":{"sourceImage":"img:1","targetImage":"gcr.io/p/img:1"}}' \
//     | image-publish create
// ```
//
// The request is one JSON object on stdin with the fields the operation
// needs (`name`, `id`, `olds`, `news`); the response is one JSON object on
// stdout. Logs go to stderr. Validation failures from `check` are data and
// exit 0; registry or input errors exit 1.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clouddns_core::config::RegistryConfig;
use clouddns_core::publish::{ImagePublisher, PublishInputs, PublishOutputs};
use clouddns_core::traits::RegistryClient;
use clouddns_core::AdapterRegistry;
use clouddns_registry_docker::DEFAULT_DOCKER;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::process::ExitCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{Level, error};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "image-publish")]
#[command(about = "Publish a container image under its content digest", long_about = None)]
struct Cli {
    /// Path to the docker binary
    #[arg(long, default_value = DEFAULT_DOCKER)]
    docker: String,

    /// Log level: trace, debug, info, warn, error
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    operation: Operation,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    /// Validate proposed inputs (`olds`?, `news`)
    Check,
    /// Compare published outputs (`olds`) with proposed inputs (`news`)
    Diff,
    /// Publish a new resource (`name`, `news`)
    Create,
    /// Re-publish in place (`id`, `olds`, `news`)
    Update,
    /// Report known outputs (`id`, `olds`)
    Read,
    /// Retire a resource (`id`, `olds`); the image stays in the registry
    Delete,
}

/// One lifecycle request as read from stdin
#[derive(Debug, Default, Deserialize)]
struct Request {
    name: Option<String>,
    id: Option<String>,
    olds: Option<Value>,
    news: Option<Value>,
}

impl Request {
    fn text(value: &Option<String>, field: &str) -> Result<String> {
        value
            .clone()
            .filter(|v| !v.is_empty())
            .with_context(|| format!("request field `{}` is required", field))
    }

    fn object<T: DeserializeOwned>(value: &Option<Value>, field: &str) -> Result<T> {
        let value = value
            .clone()
            .with_context(|| format!("request field `{}` is required", field))?;
        serde_json::from_value(value).with_context(|| format!("request field `{}` is malformed", field))
    }

    fn optional<T: DeserializeOwned>(value: &Option<Value>, field: &str) -> Result<Option<T>> {
        match value {
            None | Some(Value::Null) => Ok(None),
            Some(_) => Self::object(value, field).map(Some),
        }
    }
}

/// Run one operation and build its JSON response
async fn dispatch<R: RegistryClient>(
    publisher: &ImagePublisher<R>,
    operation: Operation,
    request: Request,
) -> Result<Value> {
    let response = match operation {
        Operation::Check => {
            let olds: Option<PublishInputs> = Request::optional(&request.olds, "olds")?;
            let news: PublishInputs = Request::object(&request.news, "news")?;
            serde_json::to_value(publisher.check(olds.as_ref(), news))?
        }
        Operation::Diff => {
            let olds: PublishOutputs = Request::object(&request.olds, "olds")?;
            let news: PublishInputs = Request::object(&request.news, "news")?;
            serde_json::to_value(publisher.diff(&olds, &news))?
        }
        Operation::Create => {
            let name = Request::text(&request.name, "name")?;
            let news: PublishInputs = Request::object(&request.news, "news")?;
            serde_json::to_value(publisher.create(&name, &news).await?)?
        }
        Operation::Update => {
            let id = Request::text(&request.id, "id")?;
            let olds: PublishOutputs = Request::object(&request.olds, "olds")?;
            let news: PublishInputs = Request::object(&request.news, "news")?;
            json!({ "outputs": publisher.update(&id, &olds, &news).await? })
        }
        Operation::Read => {
            let id = Request::text(&request.id, "id")?;
            let olds: PublishOutputs = Request::object(&request.olds, "olds")?;
            serde_json::to_value(publisher.read(&id, olds))?
        }
        Operation::Delete => {
            let id = Request::text(&request.id, "id")?;
            let olds: PublishOutputs = Request::object(&request.olds, "olds")?;
            publisher.delete(&id, &olds).await?;
            json!({})
        }
    };

    Ok(response)
}

async fn run(cli: Cli) -> Result<Value> {
    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("Failed to read request from stdin")?;

    let request: Request = if input.trim().is_empty() {
        Request::default()
    } else {
        serde_json::from_str(&input).context("Request is not valid JSON")?
    };

    let registry = AdapterRegistry::new();
    clouddns_registry_docker::register(&registry);
    let client = registry.create_registry_client(&RegistryConfig::Docker {
        binary: Some(cli.docker),
    })?;

    dispatch(&ImagePublisher::new(client), cli.operation, request).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ExitCode::FAILURE;
    }

    let operation = cli.operation;
    let response = match run(cli).await {
        Ok(response) => response,
        Err(e) => {
            error!("{:?} failed: {:#}", operation, e);
            return ExitCode::FAILURE;
        }
    };

    let mut stdout = tokio::io::stdout();
    let written = async {
        stdout.write_all(response.to_string().as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await
    };
    if let Err(e) = written.await {
        eprintln!("Failed to write response: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
