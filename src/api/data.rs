// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Readings ingestion (agents) and series queries (users).

use axum::{
    extract::{rejection::JsonRejection, Path, RawQuery, State},
    http::StatusCode,
    response::Response,
    Json,
};
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, info};
use utoipa::IntoParams;

use super::agents::parse_agent_id;
use super::parse_body;
use crate::{
    auth::{AgentAuth, UserAuth},
    error::ApiError,
    executor::{run_in_transaction, HandlerResult, Outcome},
    models::{GetDataResult, GetDataResultVariable, PostDataPoints},
    state::AppState,
    storage::{ownership::OwnershipCheck, DataPoint, Database, User},
};

/// Parsed `GET /v1/agents/{agent_id}/data` query.
#[derive(Debug, Clone, PartialEq, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DataQuery {
    /// Variable ids; repeat the parameter to request several.
    #[param(rename = "variable")]
    pub variables: Vec<u64>,
    /// Inclusive lower bound, RFC 3339.
    pub date_from: DateTime<Utc>,
    /// Inclusive upper bound, RFC 3339.
    pub date_to: DateTime<Utc>,
}

impl DataQuery {
    /// Parse a raw query string. `variable` may repeat; the dates must appear.
    pub fn parse(raw: Option<&str>) -> Result<Self, ApiError> {
        let mut variables = Vec::new();
        let mut date_from = None;
        let mut date_to = None;

        for (key, value) in url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
            match key.as_ref() {
                "variable" => {
                    let id = value.parse().map_err(|_| {
                        ApiError::bad_request(format!("Variable ID '{value}' is not valid."))
                    })?;
                    variables.push(id);
                }
                "date_from" => date_from = Some(parse_time("date_from", &value)?),
                "date_to" => date_to = Some(parse_time("date_to", &value)?),
                _ => {}
            }
        }

        if variables.is_empty() {
            return Err(ApiError::bad_request("Must specify at least one variable."));
        }
        let date_from = date_from.ok_or_else(|| ApiError::bad_request("Must specify date_from."))?;
        let date_to = date_to.ok_or_else(|| ApiError::bad_request("Must specify date_to."))?;
        if date_to < date_from {
            return Err(ApiError::bad_request("date_to must not be before date_from."));
        }

        Ok(Self {
            variables,
            date_from,
            date_to,
        })
    }
}

fn parse_time(name: &str, value: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| ApiError::bad_request(format!("{name} is not a valid RFC 3339 time.")))
}

fn validate(points: &PostDataPoints) -> Result<(), ApiError> {
    if points.data.is_empty() {
        return Err(ApiError::bad_request("Must specify at least one data point."));
    }
    if points.data.iter().any(|p| p.variable.is_empty()) {
        return Err(ApiError::bad_request("Must specify variable name for each data point."));
    }
    Ok(())
}

/// Store a batch of readings for one agent.
///
/// Every variable must already exist; one unknown name rejects the whole
/// batch and nothing is stored.
pub fn store_data_points<D: Database + ?Sized>(
    db: &mut D,
    agent_id: u64,
    points: PostDataPoints,
) -> HandlerResult {
    for point in &points.data {
        let variable = db.get_variable_by_name(&point.variable)?.ok_or_else(|| {
            ApiError::bad_request(format!("Variable '{}' does not exist.", point.variable))
        })?;

        db.add_data_point(&DataPoint {
            agent_id,
            variable_id: variable.id,
            time: points.time,
            value: point.value,
        })?;
    }

    info!(agent_id, count = points.data.len(), "Stored data points");
    Ok(Outcome::commit(StatusCode::CREATED))
}

/// Look up the requested series for an agent the user owns.
pub fn query_data<D: Database + ?Sized>(
    db: &mut D,
    user: &User,
    agent_id: u64,
    query: &DataQuery,
) -> HandlerResult {
    let agent = db.get_agent_by_id(agent_id)?.verify_owner(user, "Agent")?;

    let mut data = Vec::with_capacity(query.variables.len());
    for &variable_id in &query.variables {
        let variable = db.get_variable_by_id(variable_id)?.ok_or_else(|| {
            ApiError::bad_request(format!("Variable {variable_id} does not exist."))
        })?;

        let points = db
            .get_data(agent.id, variable.id, query.date_from, query.date_to)?
            .into_iter()
            .map(|(time, value)| (time.to_rfc3339_opts(SecondsFormat::AutoSi, true), value))
            .collect();

        data.push(GetDataResultVariable {
            id: variable.id,
            name: variable.name,
            units: variable.units,
            display_decimal_places: variable.display_decimal_places,
            points,
        });
    }

    debug!(agent_id, variables = data.len(), "Served data query");
    Ok(Outcome::commit(Json(GetDataResult { data })))
}

#[utoipa::path(
    post,
    path = "/v1/agents/{agent_id}/data",
    params(("agent_id" = u64, Path, description = "Agent identifier")),
    request_body = PostDataPoints,
    tag = "Data",
    security(("agent_token" = [])),
    responses(
        (status = 201, description = "Readings stored"),
        (status = 400, description = "Empty batch, missing variable name or unknown variable"),
        (status = 401, description = "Agent id or token invalid")
    )
)]
pub async fn post_data(
    AgentAuth(agent): AgentAuth,
    State(state): State<AppState>,
    body: Result<Json<PostDataPoints>, JsonRejection>,
) -> Result<Response, ApiError> {
    let points = parse_body(body)?;
    validate(&points)?;

    let agent_id = agent.id;
    Ok(run_in_transaction(&state.store, move |db| store_data_points(db, agent_id, points)).await)
}

#[utoipa::path(
    get,
    path = "/v1/agents/{agent_id}/data",
    params(
        ("agent_id" = u64, Path, description = "Agent identifier"),
        DataQuery
    ),
    tag = "Data",
    security(("basic_auth" = [])),
    responses(
        (status = 200, body = GetDataResult),
        (status = 400, description = "Missing or invalid query parameters"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Agent belongs to another user"),
        (status = 404, description = "No such agent")
    )
)]
pub async fn get_data(
    UserAuth(user): UserAuth,
    State(state): State<AppState>,
    Path(raw_agent_id): Path<String>,
    RawQuery(raw_query): RawQuery,
) -> Result<Response, ApiError> {
    let agent_id = parse_agent_id(&raw_agent_id)?;
    let query = DataQuery::parse(raw_query.as_deref())?;

    Ok(run_in_transaction(&state.store, move |db| query_data(db, &user, agent_id, &query)).await)
}
