// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Response,
    Json,
};
use tracing::info;

use super::parse_body;
use crate::{
    auth::UserAuth,
    error::ApiError,
    executor::{blocking, run_in_transaction, HandlerResult, Outcome},
    models::{AgentResponse, CreateAgentRequest, CreatedAgentResponse},
    state::AppState,
    storage::{ownership::OwnershipCheck, Agent, Database, User},
};

/// Parse an `{agent_id}` path segment. Anything that is not an integer can
/// never name an agent, so it is reported as not found.
pub(crate) fn parse_agent_id(raw: &str) -> Result<u64, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::not_found("Agent not found."))
}

/// Persist a freshly issued agent and return its one-time token.
pub fn register_agent<D: Database + ?Sized>(
    db: &mut D,
    mut agent: Agent,
    token: String,
) -> HandlerResult {
    db.create_agent(&mut agent)?;
    info!(agent_id = agent.id, owner_user_id = agent.owner_user_id, "Created agent");
    Ok(Outcome::commit((
        StatusCode::CREATED,
        Json(CreatedAgentResponse { id: agent.id, token }),
    )))
}

pub fn agents_for_owner<D: Database + ?Sized>(db: &mut D, owner: &User) -> HandlerResult {
    let agents: Vec<AgentResponse> = db
        .get_agents_by_owner(owner.id)?
        .into_iter()
        .map(AgentResponse::from)
        .collect();
    Ok(Outcome::commit(Json(agents)))
}

pub fn owned_agent<D: Database + ?Sized>(db: &mut D, owner: &User, agent_id: u64) -> HandlerResult {
    let agent = db
        .get_agent_by_id(agent_id)?
        .verify_owner(owner, "Agent")?;
    Ok(Outcome::commit(Json(AgentResponse::from(agent))))
}

#[utoipa::path(
    post,
    path = "/v1/agents",
    request_body = CreateAgentRequest,
    tag = "Agents",
    security(("basic_auth" = [])),
    responses(
        (status = 201, body = CreatedAgentResponse),
        (status = 400, description = "Missing name"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn create_agent(
    UserAuth(user): UserAuth,
    State(state): State<AppState>,
    body: Result<Json<CreateAgentRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = parse_body(body)?;
    if request.name.is_empty() {
        return Err(ApiError::bad_request("Must specify name."));
    }

    let (agent, token) = blocking(move || Ok(Agent::issue(user.id, request.name)?)).await?;

    Ok(run_in_transaction(&state.store, move |db| register_agent(db, agent, token)).await)
}

#[utoipa::path(
    get,
    path = "/v1/agents",
    tag = "Agents",
    security(("basic_auth" = [])),
    responses(
        (status = 200, body = [AgentResponse]),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_agents(UserAuth(user): UserAuth, State(state): State<AppState>) -> Response {
    run_in_transaction(&state.store, move |db| agents_for_owner(db, &user)).await
}

#[utoipa::path(
    get,
    path = "/v1/agents/{agent_id}",
    params(("agent_id" = u64, Path, description = "Agent identifier")),
    tag = "Agents",
    security(("basic_auth" = [])),
    responses(
        (status = 200, body = AgentResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Agent belongs to another user"),
        (status = 404, description = "No such agent")
    )
)]
pub async fn get_agent(
    UserAuth(user): UserAuth,
    State(state): State<AppState>,
    Path(raw_agent_id): Path<String>,
) -> Result<Response, ApiError> {
    let agent_id = parse_agent_id(&raw_agent_id)?;
    Ok(run_in_transaction(&state.store, move |db| owned_agent(db, &user, agent_id)).await)
}
