// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    body::Body,
    extract::rejection::JsonRejection,
    http::Request,
    routing::get,
    Json, Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    error::ApiError,
    models::{
        AgentResponse, CreateAgentRequest, CreateUserRequest, CreateVariableRequest,
        CreatedAgentResponse, CreatedResponse, GetDataResult, GetDataResultVariable,
        PostDataPoint, PostDataPoints, VariableResponse,
    },
    state::AppState,
};

pub mod agents;
pub mod data;
pub mod health;
pub mod users;
pub mod variables;

#[cfg(test)]
pub(crate) mod test_support;

/// Security scheme names referenced by `#[utoipa::path(security(...))]`.
pub const BASIC_AUTH_SCHEME: &str = "basic_auth";
pub const AGENT_TOKEN_SCHEME: &str = "agent_token";

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Unwrap a JSON body, turning any parse failure into a 400.
pub(crate) fn parse_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/ping", get(health::ping))
        .route("/users", axum::routing::post(users::create_user))
        .route(
            "/agents",
            get(agents::list_agents).post(agents::create_agent),
        )
        .route("/agents/{agent_id}", get(agents::get_agent))
        .route(
            "/agents/{agent_id}/data",
            get(data::get_data).post(data::post_data),
        )
        .route(
            "/variables",
            get(variables::list_variables).post(variables::create_variable),
        );

    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(CorsLayer::permissive());

    Router::new()
        .route("/", get(health::hello))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/v1", v1_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(middleware)
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            BASIC_AUTH_SCHEME,
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Basic).build()),
        );
        components.add_security_scheme(
            AGENT_TOKEN_SCHEME,
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                "Authorization",
                "weather-thingy-agent-token <token>",
            ))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::hello,
        health::ping,
        health::liveness,
        health::readiness,
        users::create_user,
        agents::create_agent,
        agents::list_agents,
        agents::get_agent,
        data::post_data,
        data::get_data,
        variables::create_variable,
        variables::list_variables
    ),
    components(
        schemas(
            CreatedResponse,
            CreateUserRequest,
            CreateAgentRequest,
            CreatedAgentResponse,
            AgentResponse,
            CreateVariableRequest,
            VariableResponse,
            PostDataPoints,
            PostDataPoint,
            GetDataResult,
            GetDataResultVariable
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness"),
        (name = "Users", description = "Account registration"),
        (name = "Agents", description = "Reporting devices"),
        (name = "Data", description = "Readings ingestion and queries"),
        (name = "Variables", description = "Measurement series definitions")
    )
)]
struct ApiDoc;
