// # clouddnsd HTTP front end
//
// Thin HTTP layer over `DnsReconciler`:
//
// - `GET /update?secret=&domain=&ip=`: authorize, then reconcile `domain -> ip`
// - `GET /version`: crate version
//
// Responses are JSON `{"status": <code>, "message": <text>}` except for
// `/version`, which returns the bare version string.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use clouddns_core::{DnsReconciler, Error, SecretSource};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    reconciler: Arc<DnsReconciler>,
    secret: Arc<dyn SecretSource>,
}

impl AppState {
    pub fn new(reconciler: Arc<DnsReconciler>, secret: Arc<dyn SecretSource>) -> Self {
        Self { reconciler, secret }
    }
}

/// Raw `/update` query; every field is required and checked by hand
#[derive(Debug, Default, Deserialize)]
pub struct UpdateQuery {
    secret: Option<String>,
    domain: Option<String>,
    ip: Option<String>,
}

/// Validated `/update` parameters
struct UpdateParams {
    secret: String,
    domain: String,
    ip: Ipv4Addr,
}

impl UpdateQuery {
    fn validate(self) -> Option<UpdateParams> {
        let secret = self.secret.filter(|s| !s.is_empty())?;
        let domain = self.domain.filter(|d| !d.is_empty())?;
        let ip = self.ip?.parse().ok()?;
        Some(UpdateParams { secret, domain, ip })
    }
}

/// JSON body of every `/update` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBody {
    pub status: u16,
    pub message: String,
}

fn reply(status: StatusCode, message: impl Into<String>) -> Response {
    let body = StatusBody {
        status: status.as_u16(),
        message: message.into(),
    };
    (status, Json(body)).into_response()
}

fn internal_error(err: &Error) -> Response {
    error!("Update failed: {}", err);
    reply(StatusCode::INTERNAL_SERVER_ERROR, err.public_message())
}

/// Build the daemon's router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/update", get(update))
        .route("/version", get(version))
        .with_state(state)
}

async fn update(State(state): State<AppState>, Query(query): Query<UpdateQuery>) -> Response {
    let Some(params) = query.validate() else {
        return reply(StatusCode::BAD_REQUEST, "invalid request");
    };

    let expected = match state.secret.read_secret().await {
        Ok(secret) => secret,
        Err(e) => return internal_error(&e),
    };

    if params.secret != expected {
        warn!("Rejected update for {}: wrong secret", params.domain);
        return reply(StatusCode::FORBIDDEN, "unauthorized");
    }

    match state.reconciler.reconcile(&params.domain, params.ip).await {
        Ok(status) => {
            info!("{} -> {}: {}", params.domain, params.ip, status);
            reply(StatusCode::OK, status.as_str())
        }
        Err(e) => internal_error(&e),
    }
}

async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
