// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Response,
    Json,
};
use tracing::info;

use super::parse_body;
use crate::{
    error::ApiError,
    executor::{blocking, run_in_transaction, HandlerResult, Outcome},
    models::{CreateUserRequest, CreatedResponse},
    state::AppState,
    storage::{Database, User},
};

fn validate(request: &CreateUserRequest) -> Result<(), ApiError> {
    if request.email.is_empty() {
        return Err(ApiError::bad_request("Must specify email."));
    }
    if !request.email.contains('@') {
        return Err(ApiError::bad_request("Email address is not valid."));
    }
    if request.password.is_empty() {
        return Err(ApiError::bad_request("Must specify password."));
    }
    Ok(())
}

/// Persist a prepared user. Runs inside the request transaction.
pub fn register_user<D: Database + ?Sized>(db: &mut D, mut user: User) -> HandlerResult {
    db.create_user(&mut user)?;
    info!(user_id = user.id, "Created user");
    Ok(Outcome::commit((
        StatusCode::CREATED,
        Json(CreatedResponse { id: user.id }),
    )))
}

#[utoipa::path(
    post,
    path = "/v1/users",
    request_body = CreateUserRequest,
    tag = "Users",
    responses(
        (status = 201, body = CreatedResponse),
        (status = 400, description = "Missing or invalid email or password"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = parse_body(body)?;
    validate(&request)?;

    // Hash before the transaction opens so the write lock is not held while
    // deriving the credential.
    let user = blocking(move || Ok(User::new(request.email, &request.password)?)).await?;

    Ok(run_in_transaction(&state.store, move |db| register_user(db, user)).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::router;
    use crate::api::test_support::{basic, call, request, seeded_state};
    use crate::storage::mock::MockDatabase;
    use serde_json::json;

    #[tokio::test]
    async fn created_user_can_authenticate() {
        let (state, _dir) = seeded_state();
        let app = router(state);

        let created = call(
            &app,
            request(
                "POST",
                "/v1/users",
                None,
                Some(json!({"email": "new@test.com", "password": "s3cret:with:colons"})),
            ),
        )
        .await;
        assert_eq!(created.status, StatusCode::CREATED);
        assert_eq!(created.json(), json!({"id": 4}));

        let agents = call(
            &app,
            request(
                "GET",
                "/v1/agents",
                Some(&basic("new@test.com", "s3cret:with:colons")),
                None,
            ),
        )
        .await;
        assert_eq!(agents.status, StatusCode::OK);
        assert_eq!(agents.json(), json!([]));
    }

    #[tokio::test]
    async fn invalid_bodies_are_rejected() {
        let (state, _dir) = seeded_state();
        let app = router(state);

        for body in [
            json!({"email": "no-at-sign", "password": "pw"}),
            json!({"email": "", "password": "pw"}),
            json!({"email": "a@b.c", "password": ""}),
            json!({"email": "a@b.c"}),
            json!("not an object"),
        ] {
            let response = call(&app, request("POST", "/v1/users", None, Some(body.clone()))).await;
            assert_eq!(response.status, StatusCode::BAD_REQUEST, "{body}");
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let (state, _dir) = seeded_state();
        let app = router(state);

        let response = call(
            &app,
            request(
                "POST",
                "/v1/users",
                None,
                Some(json!({"email": "user@test.com", "password": "again"})),
            ),
        )
        .await;
        assert_eq!(response.status, StatusCode::CONFLICT);
        assert!(response.json()["error"].is_string());
    }

    #[test]
    fn register_user_creates_through_the_database_capability() {
        let mut db = MockDatabase::new();
        let user = User::new("mock@test.com", "pw").unwrap();

        let response = crate::executor::execute(&mut db, |db| register_user(db, user));
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(db.committed_users(), 1);
    }
}
