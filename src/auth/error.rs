// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use crate::error::ApiError;

/// Realm advertised in the Basic challenge.
pub const BASIC_REALM: &str = "weather-thingy-data-service";

/// Authorization scheme used by agents.
pub const AGENT_TOKEN_SCHEME: &str = "weather-thingy-agent-token";

/// Authentication error type.
///
/// Malformed input and unknown identities are deliberately folded into the
/// same variants as wrong secrets, so a client cannot tell them apart.
#[derive(Debug)]
pub enum AuthError {
    /// No usable Basic credentials on a user route
    UserAuthenticationRequired,
    /// Email unknown or password wrong
    InvalidUserCredentials,
    /// No usable agent token on an agent route
    AgentAuthenticationRequired,
    /// Agent id unknown or malformed, or token wrong
    InvalidAgentCredentials,
    /// Authenticated, but not allowed to touch this resource
    Forbidden,
    /// Storage or runtime failure while authenticating
    Internal(String),
}

impl AuthError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::UserAuthenticationRequired
            | AuthError::InvalidUserCredentials
            | AuthError::AgentAuthenticationRequired
            | AuthError::InvalidAgentCredentials => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// `WWW-Authenticate` challenge for 401 variants.
    pub fn challenge(&self) -> Option<String> {
        match self {
            AuthError::UserAuthenticationRequired | AuthError::InvalidUserCredentials => {
                Some(format!("Basic realm=\"{BASIC_REALM}\""))
            }
            AuthError::AgentAuthenticationRequired | AuthError::InvalidAgentCredentials => {
                Some(AGENT_TOKEN_SCHEME.to_string())
            }
            AuthError::Forbidden | AuthError::Internal(_) => None,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::UserAuthenticationRequired => write!(
                f,
                "You must authenticate with a HTTP basic authentication header to access this resource."
            ),
            AuthError::InvalidUserCredentials => {
                write!(f, "Email address or password do not match any known user.")
            }
            AuthError::AgentAuthenticationRequired => write!(
                f,
                "You must authenticate with a HTTP Authorization: {AGENT_TOKEN_SCHEME} header to access this resource."
            ),
            AuthError::InvalidAgentCredentials => {
                write!(f, "Agent ID or token are invalid or incorrect.")
            }
            AuthError::Forbidden => write!(f, "You do not have access to this resource."),
            AuthError::Internal(msg) => write!(f, "Internal authentication error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if let Some(challenge) = self.challenge() {
            let mut response = (status, self.to_string()).into_response();
            if let Ok(value) = HeaderValue::from_str(&challenge) {
                response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
            }
            return response;
        }

        // 403 and 500 share the `{"error": ...}` body of every other API error.
        ApiError::from(self).into_response()
    }
}
