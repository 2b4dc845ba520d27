// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authorization header parsing and the authenticated principal.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use base64ct::{Base64, Encoding};

use super::error::AGENT_TOKEN_SCHEME;
use super::verifier;
use super::AuthError;
use crate::storage::{Agent, Database, User};

/// Who a request is acting as. Exactly one per authenticated request.
#[derive(Debug, Clone)]
pub enum Principal {
    User(User),
    Agent(Agent),
}

/// Credentials presented by a client, before verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Basic { email: String, password: String },
    AgentToken { agent_id: u64, token: String },
}

impl Credentials {
    /// Parse `Authorization: Basic <base64(email:password)>`.
    ///
    /// Only the first `:` separates the two parts, so passwords may contain
    /// colons. Any malformation is reported as a missing header.
    pub fn from_basic_header(headers: &HeaderMap) -> Result<Self, AuthError> {
        let encoded = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Basic "))
            .ok_or(AuthError::UserAuthenticationRequired)?;

        let decoded =
            Base64::decode_vec(encoded.trim()).map_err(|_| AuthError::UserAuthenticationRequired)?;
        let decoded =
            String::from_utf8(decoded).map_err(|_| AuthError::UserAuthenticationRequired)?;

        let (email, password) = decoded
            .split_once(':')
            .ok_or(AuthError::UserAuthenticationRequired)?;

        Ok(Credentials::Basic {
            email: email.to_string(),
            password: password.to_string(),
        })
    }

    /// Parse `Authorization: weather-thingy-agent-token <token>` together with
    /// the agent id taken from the request path.
    ///
    /// The scheme is checked first. A path id that is not an integer is then
    /// reported exactly like an unknown agent.
    pub fn from_agent_header(headers: &HeaderMap, raw_agent_id: &str) -> Result<Self, AuthError> {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix(AGENT_TOKEN_SCHEME))
            .and_then(|v| v.strip_prefix(' '))
            .ok_or(AuthError::AgentAuthenticationRequired)?;

        let agent_id = raw_agent_id
            .parse::<u64>()
            .map_err(|_| AuthError::InvalidAgentCredentials)?;

        Ok(Credentials::AgentToken {
            agent_id,
            token: token.to_string(),
        })
    }
}

/// Verify presented credentials against the store.
pub fn authenticate<D: Database + ?Sized>(
    db: &mut D,
    credentials: &Credentials,
) -> Result<Principal, AuthError> {
    match credentials {
        Credentials::Basic { email, password } => {
            verifier::verify_password(db, email, password).map(Principal::User)
        }
        Credentials::AgentToken { agent_id, token } => {
            verifier::verify_token(db, *agent_id, token).map(Principal::Agent)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use base64::{engine::general_purpose::STANDARD, Engine};

    fn headers(authorization: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(authorization).unwrap());
        headers
    }

    fn basic(raw: &str) -> HeaderMap {
        headers(&format!("Basic {}", STANDARD.encode(raw)))
    }

    #[test]
    fn basic_header_is_split_on_the_first_colon() {
        let parsed = Credentials::from_basic_header(&basic("user@test.com:pass:word")).unwrap();
        assert_eq!(
            parsed,
            Credentials::Basic {
                email: "user@test.com".into(),
                password: "pass:word".into(),
            }
        );
    }

    #[test]
    fn basic_header_allows_an_empty_password() {
        let parsed = Credentials::from_basic_header(&basic("user@test.com:")).unwrap();
        assert!(matches!(parsed, Credentials::Basic { password, .. } if password.is_empty()));
    }

    #[test]
    fn malformed_basic_headers_are_rejected() {
        for bad in [
            HeaderMap::new(),
            headers("Bearer abc"),
            headers("Basic !!!not-base64!!!"),
            basic("no-colon-here"),
        ] {
            assert!(matches!(
                Credentials::from_basic_header(&bad),
                Err(AuthError::UserAuthenticationRequired)
            ));
        }
    }

    #[test]
    fn agent_header_parses_token_and_path_id() {
        let parsed =
            Credentials::from_agent_header(&headers("weather-thingy-agent-token thetoken"), "123")
                .unwrap();
        assert_eq!(
            parsed,
            Credentials::AgentToken {
                agent_id: 123,
                token: "thetoken".into(),
            }
        );
    }

    #[test]
    fn agent_header_with_wrong_scheme_requires_authentication() {
        for bad in [
            HeaderMap::new(),
            headers("Basic dXNlcjpwYXNz"),
            headers("weather-thingy-agent-tokenthetoken"),
        ] {
            assert!(matches!(
                Credentials::from_agent_header(&bad, "123"),
                Err(AuthError::AgentAuthenticationRequired)
            ));
        }
    }

    #[test]
    fn non_integer_agent_id_is_an_invalid_credential() {
        let result =
            Credentials::from_agent_header(&headers("weather-thingy-agent-token thetoken"), "abc");
        assert!(matches!(result, Err(AuthError::InvalidAgentCredentials)));
    }
}
