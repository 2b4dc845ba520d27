// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures for router-level tests.
//!
//! [`seeded_state`] opens a temporary store containing:
//!
//! | Kind | Id | Identity | Secret |
//! |------|----|----------|--------|
//! | user | 1 | `user@test.com` | `password123` |
//! | user (admin) | 2 | `admin@test.com` | `adminpass` |
//! | user | 3 | `other@test.com` | `otherpass` |
//! | agent (owner 1) | 1 | `Roof` | `thetoken` |
//! | variable | 1 | `temperature` (°C, 1 dp) | |
//! | variable | 2 | `humidity` (%, 0 dp) | |

use axum::{
    body::{to_bytes, Body},
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use tempfile::TempDir;
use tower::ServiceExt;

use crate::auth::password::Credential;
use crate::state::AppState;
use crate::storage::mock::temp_store;
use crate::storage::{Agent, Database, User, Variable};

const FAST: u32 = 1_000;

pub const AGENT_TOKEN: &str = "thetoken";

pub fn seeded_state() -> (AppState, TempDir) {
    let (store, dir) = temp_store();
    let mut conn = store.connect();
    conn.begin_transaction().unwrap();

    for (email, password, is_admin) in [
        ("user@test.com", "password123", false),
        ("admin@test.com", "adminpass", true),
        ("other@test.com", "otherpass", false),
    ] {
        let mut user = User {
            id: 0,
            email: email.to_string(),
            password: Credential::derive_with_iterations(password, FAST).unwrap(),
            is_admin,
            created: Utc::now(),
        };
        conn.create_user(&mut user).unwrap();
    }

    let mut agent = Agent {
        id: 0,
        owner_user_id: 1,
        name: "Roof".to_string(),
        token: Credential::derive_with_iterations(AGENT_TOKEN, FAST).unwrap(),
        created: Utc::now(),
    };
    conn.create_agent(&mut agent).unwrap();

    for (name, units, places) in [("temperature", "°C", 1), ("humidity", "%", 0)] {
        let mut variable = Variable {
            id: 0,
            name: name.to_string(),
            units: units.to_string(),
            display_decimal_places: places,
            created: Utc::now(),
        };
        conn.create_variable(&mut variable).unwrap();
    }

    conn.commit_transaction().unwrap();
    (AppState::new(store), dir)
}

pub fn basic(email: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{email}:{password}")))
}

pub fn agent_token(token: &str) -> String {
    format!("weather-thingy-agent-token {token}")
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).unwrap()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

pub async fn call(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec();
    TestResponse {
        status,
        headers,
        body,
    }
}

/// Build a request with an optional `Authorization` header and JSON body.
pub fn request(
    method: &str,
    uri: &str,
    authorization: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(value) = authorization {
        builder = builder.header("authorization", value);
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}
