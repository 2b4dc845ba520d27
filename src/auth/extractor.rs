// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated principals.
//!
//! Handlers declare the principal they need as a parameter:
//!
//! ```rust,ignore
//! async fn list_agents(
//!     UserAuth(user): UserAuth,
//!     State(state): State<AppState>,
//! ) -> Response {
//!     // user is the verified storage::User
//! }
//! ```
//!
//! A failed extraction short-circuits the request with the matching 401 or
//! 403 before the handler's own transaction is opened.

use std::collections::HashMap;

use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use tracing::error;

use super::principal::{authenticate, Credentials, Principal};
use super::AuthError;
use crate::state::AppState;
use crate::storage::{ownership::require_admin, Agent, Store, User};

/// Path parameter carrying the agent id on agent-authenticated routes.
pub const AGENT_ID_PARAM: &str = "agent_id";

/// Extractor for users authenticated with HTTP Basic.
pub struct UserAuth(pub User);

/// Extractor for agents authenticated with a token. The agent id comes from
/// the `{agent_id}` path segment.
pub struct AgentAuth(pub Agent);

/// Extractor that requires an authenticated administrator.
pub struct AdminAuth(pub User);

/// Verify credentials on the blocking pool with a fresh connection.
async fn authenticate_with(store: &Store, credentials: Credentials) -> Result<Principal, AuthError> {
    let store = store.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = store.connect();
        authenticate(&mut conn, &credentials)
    })
    .await
    .map_err(|e| {
        error!(error = %e, "Authentication task failed");
        AuthError::Internal("authentication task failed".to_string())
    })?
}

impl FromRequestParts<AppState> for UserAuth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let credentials = Credentials::from_basic_header(&parts.headers)?;

        match authenticate_with(&state.store, credentials).await? {
            Principal::User(user) => Ok(UserAuth(user)),
            Principal::Agent(_) => Err(AuthError::UserAuthenticationRequired),
        }
    }
}

impl FromRequestParts<AppState> for AgentAuth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let raw_agent_id = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .ok()
            .and_then(|Path(params)| params.get(AGENT_ID_PARAM).cloned())
            .unwrap_or_default();

        let credentials = Credentials::from_agent_header(&parts.headers, &raw_agent_id)?;

        match authenticate_with(&state.store, credentials).await? {
            Principal::Agent(agent) => Ok(AgentAuth(agent)),
            Principal::User(_) => Err(AuthError::AgentAuthenticationRequired),
        }
    }
}

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let UserAuth(user) = UserAuth::from_request_parts(parts, state).await?;
        require_admin(&user)?;
        Ok(AdminAuth(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::seeded_state;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        routing::post,
        Router,
    };
    use base64::{engine::general_purpose::STANDARD, Engine};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn create_test_state() -> (AppState, TempDir) {
        seeded_state()
    }

    fn parts_with(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/test");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn basic(raw: &str) -> String {
        format!("Basic {}", STANDARD.encode(raw))
    }

    #[tokio::test]
    async fn user_auth_accepts_valid_credentials() {
        let (state, _dir) = create_test_state();
        let mut parts = parts_with(Some(&basic("user@test.com:password123")));

        let UserAuth(user) = UserAuth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(user.email, "user@test.com");
    }

    #[tokio::test]
    async fn user_auth_rejects_wrong_password() {
        let (state, _dir) = create_test_state();
        let mut parts = parts_with(Some(&basic("user@test.com:wrong")));

        let result = UserAuth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::InvalidUserCredentials)));
    }

    #[tokio::test]
    async fn user_auth_requires_a_basic_header() {
        let (state, _dir) = create_test_state();

        for header in [None, Some("Bearer abc"), Some("Basic %%%")] {
            let mut parts = parts_with(header);
            let result = UserAuth::from_request_parts(&mut parts, &state).await;
            assert!(matches!(result, Err(AuthError::UserAuthenticationRequired)));
        }
    }

    #[tokio::test]
    async fn admin_auth_rejects_non_admin() {
        let (state, _dir) = create_test_state();
        let mut parts = parts_with(Some(&basic("user@test.com:password123")));

        let result = AdminAuth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::Forbidden)));
    }

    #[tokio::test]
    async fn admin_auth_accepts_admin() {
        let (state, _dir) = create_test_state();
        let mut parts = parts_with(Some(&basic("admin@test.com:adminpass")));

        let AdminAuth(user) = AdminAuth::from_request_parts(&mut parts, &state).await.unwrap();
        assert!(user.is_admin);
    }

    async fn agent_echo(AgentAuth(agent): AgentAuth) -> String {
        agent.id.to_string()
    }

    async fn call_agent_route(state: AppState, path: &str, authorization: Option<&str>) -> (StatusCode, Option<String>) {
        let app = Router::new()
            .route("/agents/{agent_id}/data", post(agent_echo))
            .with_state(state);

        let mut request = Request::builder().method("POST").uri(path);
        if let Some(value) = authorization {
            request = request.header(header::AUTHORIZATION, value);
        }
        let response = app.oneshot(request.body(Body::empty()).unwrap()).await.unwrap();

        let challenge = response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .map(|v| v.to_str().unwrap().to_string());
        (response.status(), challenge)
    }

    #[tokio::test]
    async fn agent_auth_accepts_matching_token() {
        let (state, _dir) = create_test_state();
        let (status, _) = call_agent_route(
            state,
            "/agents/1/data",
            Some("weather-thingy-agent-token thetoken"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn agent_auth_rejects_wrong_token_unknown_agent_and_bad_id_alike() {
        let (state, _dir) = create_test_state();

        for (path, token) in [
            ("/agents/1/data", "weather-thingy-agent-token wrong"),
            ("/agents/99/data", "weather-thingy-agent-token thetoken"),
            ("/agents/abc/data", "weather-thingy-agent-token thetoken"),
        ] {
            let (status, challenge) = call_agent_route(state.clone(), path, Some(token)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{path}");
            assert_eq!(challenge.as_deref(), Some("weather-thingy-agent-token"));
        }
    }

    #[tokio::test]
    async fn agent_auth_requires_the_token_scheme() {
        let (state, _dir) = create_test_state();
        let (status, challenge) =
            call_agent_route(state, "/agents/1/data", Some(&basic("user@test.com:password123"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(challenge.as_deref(), Some("weather-thingy-agent-token"));
    }
}
