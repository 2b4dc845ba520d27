// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transactional request execution.
//!
//! Every business handler runs inside exactly one storage transaction:
//!
//! 1. begin (failure: 500, the handler never runs)
//! 2. run the handler against the transaction-bound connection; it produces
//!    an [`Outcome`] holding the commit decision and a buffered response
//! 3. commit or roll back; a failure here replaces the buffered response
//!    with a 500
//! 4. release the response
//!
//! Handler errors and panics roll back. A final
//! `rollback_uncommitted_transaction` runs on every path.

use std::panic::{self, AssertUnwindSafe};

use axum::response::{IntoResponse, Response};
use tracing::{debug, error};

use crate::error::ApiError;
use crate::storage::{Connection, Database, Store};

/// What a handler decided, plus the response it wants sent.
///
/// The response is only released once the transaction outcome is known.
pub struct Outcome {
    commit: bool,
    response: Response,
}

impl Outcome {
    /// Commit the transaction, then send `response`.
    pub fn commit(response: impl IntoResponse) -> Self {
        Self {
            commit: true,
            response: response.into_response(),
        }
    }

    /// Roll back the transaction, then send `response`.
    pub fn rollback(response: impl IntoResponse) -> Self {
        Self {
            commit: false,
            response: response.into_response(),
        }
    }
}

pub type HandlerResult = Result<Outcome, ApiError>;

/// Run `handler` inside a transaction on `db` and return the response that
/// should reach the client.
pub fn execute<D, F>(db: &mut D, handler: F) -> Response
where
    D: Database + ?Sized,
    F: FnOnce(&mut D) -> HandlerResult,
{
    if let Err(e) = db.begin_transaction() {
        error!(error = %e, "Could not begin database transaction");
        return ApiError::internal().into_response();
    }

    let result = panic::catch_unwind(AssertUnwindSafe(|| handler(&mut *db)));

    let response = match result {
        Ok(Ok(outcome)) if outcome.commit => match db.commit_transaction() {
            Ok(()) => {
                debug!("Transaction committed");
                outcome.response
            }
            Err(e) => {
                error!(error = %e, "Could not commit database transaction");
                ApiError::internal().into_response()
            }
        },
        Ok(Ok(outcome)) => rollback_then(db, outcome.response),
        Ok(Err(api_error)) => rollback_then(db, api_error.into_response()),
        Err(_) => {
            error!("Request handler panicked, rolling back");
            rollback_then(db, ApiError::internal().into_response())
        }
    };

    db.rollback_uncommitted_transaction();
    response
}

fn rollback_then<D: Database + ?Sized>(db: &mut D, response: Response) -> Response {
    match db.rollback_transaction() {
        Ok(()) => {
            debug!("Transaction rolled back");
            response
        }
        Err(e) => {
            error!(error = %e, "Could not roll back database transaction");
            ApiError::internal().into_response()
        }
    }
}

/// Run `handler` in a transaction on a fresh connection, off the async
/// runtime.
pub async fn run_in_transaction<F>(store: &Store, handler: F) -> Response
where
    F: FnOnce(&mut Connection) -> HandlerResult + Send + 'static,
{
    let store = store.clone();
    let task = tokio::task::spawn_blocking(move || {
        let mut conn = store.connect();
        execute(&mut conn, handler)
    });

    match task.await {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, "Transaction task failed");
            ApiError::internal().into_response()
        }
    }
}

/// Run CPU-heavy work (credential hashing) on the blocking pool.
pub async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|e| {
        error!(error = %e, "Blocking task failed");
        ApiError::internal()
    })?
}
