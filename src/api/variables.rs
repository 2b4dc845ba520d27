// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Response,
    Json,
};
use chrono::Utc;
use tracing::info;

use super::parse_body;
use crate::{
    auth::{AdminAuth, UserAuth},
    error::ApiError,
    executor::{run_in_transaction, HandlerResult, Outcome},
    models::{CreateVariableRequest, CreatedResponse, VariableResponse},
    state::AppState,
    storage::{Database, Variable},
};

fn validate(request: CreateVariableRequest) -> Result<Variable, ApiError> {
    if request.name.is_empty() {
        return Err(ApiError::bad_request("Must specify name."));
    }
    if request.units.is_empty() {
        return Err(ApiError::bad_request("Must specify units."));
    }
    let display_decimal_places = u32::try_from(request.display_decimal_places)
        .map_err(|_| ApiError::bad_request("displayDecimalPlaces must be between 0 and 4294967295."))?;

    Ok(Variable {
        id: 0,
        name: request.name,
        units: request.units,
        display_decimal_places,
        created: Utc::now(),
    })
}

pub fn register_variable<D: Database + ?Sized>(db: &mut D, mut variable: Variable) -> HandlerResult {
    db.create_variable(&mut variable)?;
    info!(variable_id = variable.id, name = %variable.name, "Created variable");
    Ok(Outcome::commit((
        StatusCode::CREATED,
        Json(CreatedResponse { id: variable.id }),
    )))
}

pub fn all_variables<D: Database + ?Sized>(db: &mut D) -> HandlerResult {
    let variables: Vec<VariableResponse> = db
        .get_all_variables()?
        .into_iter()
        .map(VariableResponse::from)
        .collect();
    Ok(Outcome::commit(Json(variables)))
}

#[utoipa::path(
    post,
    path = "/v1/variables",
    request_body = CreateVariableRequest,
    tag = "Variables",
    security(("basic_auth" = [])),
    responses(
        (status = 201, body = CreatedResponse),
        (status = 400, description = "Missing name or units, or negative decimal places"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Caller is not an administrator"),
        (status = 409, description = "Variable name already taken")
    )
)]
pub async fn create_variable(
    AdminAuth(_admin): AdminAuth,
    State(state): State<AppState>,
    body: Result<Json<CreateVariableRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let variable = validate(parse_body(body)?)?;
    Ok(run_in_transaction(&state.store, move |db| register_variable(db, variable)).await)
}

#[utoipa::path(
    get,
    path = "/v1/variables",
    tag = "Variables",
    security(("basic_auth" = [])),
    responses(
        (status = 200, body = [VariableResponse]),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_variables(UserAuth(_user): UserAuth, State(state): State<AppState>) -> Response {
    run_in_transaction(&state.store, all_variables).await
}
