// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;

use crate::state::AppState;
use crate::storage::Database;

/// Health check response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall health status ("ok" or "degraded").
    pub status: String,
    /// Individual health checks and their results.
    pub checks: HealthChecks,
}

/// Individual health check results.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Whether the service process is running.
    pub service: String,
    /// Whether a storage transaction can be opened.
    pub storage: String,
    /// Applied schema version, when storage is reachable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<u64>,
}

/// Simple health check response for liveness probes.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Health",
    responses((status = 200, description = "Greeting", body = String, content_type = "text/plain"))
)]
pub async fn hello() -> &'static str {
    "Hello, world!"
}

#[utoipa::path(
    get,
    path = "/v1/ping",
    tag = "Health",
    responses((status = 200, description = "Always `pong`", body = String, content_type = "text/plain"))
)]
pub async fn ping() -> &'static str {
    "pong"
}

/// Liveness probe handler.
///
/// Always returns 200 if the process is running.
/// Does not check dependencies - use readiness for that.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Open and roll back a transaction, then read the schema version.
fn probe_storage(state: &AppState) -> Result<u64, String> {
    let mut conn = state.store.connect();
    conn.begin_transaction().map_err(|e| e.to_string())?;
    conn.rollback_uncommitted_transaction();
    state.store.schema_version().map_err(|e| e.to_string())
}

/// Readiness probe handler.
///
/// Returns 200 only if the storage engine accepts a transaction.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse),
        (status = 503, description = "Service is not ready", body = ReadyResponse)
    )
)]
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let probe = tokio::task::spawn_blocking(move || probe_storage(&state))
        .await
        .unwrap_or_else(|e| Err(e.to_string()));

    let (status, storage, schema_version) = match probe {
        Ok(version) => (StatusCode::OK, "ok", Some(version)),
        Err(e) => {
            warn!(error = %e, "Readiness probe failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable", None)
        }
    };

    let response = ReadyResponse {
        status: if status == StatusCode::OK { "ok" } else { "degraded" }.to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            storage: storage.to_string(),
            schema_version,
        },
    };

    (status, Json(response))
}
