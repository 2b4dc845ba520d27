// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential verification against the store.
//!
//! Each verification looks the identity up in its own short transaction,
//! which is always rolled back, then compares digests after the transaction
//! is released so hashing never holds the write lock.
//!
//! An unknown identity and a wrong secret produce the same error, and both
//! paths derive a digest, so response timing does not reveal which one
//! happened.

use tracing::{debug, error, warn};

use super::password::{Credential, DEFAULT_ITERATIONS, HASH_LEN, SALT_LEN};
use super::AuthError;
use crate::storage::{Agent, Database, StorageError, User};

/// Stand-in compared against when the identity does not exist.
fn dummy_credential() -> Credential {
    Credential {
        hash: vec![0u8; HASH_LEN],
        salt: vec![0u8; SALT_LEN],
        iterations: DEFAULT_ITERATIONS,
    }
}

fn storage_failure(operation: &'static str) -> impl FnOnce(StorageError) -> AuthError {
    move |e| {
        error!(error = %e, operation, "Storage failure during authentication");
        AuthError::Internal(format!("{operation} failed"))
    }
}

/// Run `lookup` inside a transaction that is rolled back whatever happens.
fn in_read_scope<D, T, F>(db: &mut D, lookup: F) -> Result<T, AuthError>
where
    D: Database + ?Sized,
    F: FnOnce(&D) -> Result<T, StorageError>,
{
    db.begin_transaction()
        .map_err(storage_failure("begin transaction"))?;
    let result = lookup(&*db).map_err(storage_failure("credential lookup"));
    db.rollback_uncommitted_transaction();
    result
}

/// Verify an email and password pair.
pub fn verify_password<D: Database + ?Sized>(
    db: &mut D,
    email: &str,
    password: &str,
) -> Result<User, AuthError> {
    let user = in_read_scope(db, |db| db.get_user_by_email(email))?;

    match user {
        Some(user) if user.password.verify(password) => {
            debug!(user_id = user.id, "User authenticated");
            Ok(user)
        }
        Some(user) => {
            warn!(user_id = user.id, "Password mismatch");
            Err(AuthError::InvalidUserCredentials)
        }
        None => {
            dummy_credential().verify(password);
            warn!("Authentication attempted for unknown email");
            Err(AuthError::InvalidUserCredentials)
        }
    }
}

/// Verify an agent id and token pair.
pub fn verify_token<D: Database + ?Sized>(
    db: &mut D,
    agent_id: u64,
    token: &str,
) -> Result<Agent, AuthError> {
    let agent = in_read_scope(db, |db| db.get_agent_by_id(agent_id))?;

    match agent {
        Some(agent) if agent.token.verify(token) => {
            debug!(agent_id, "Agent authenticated");
            Ok(agent)
        }
        Some(_) => {
            warn!(agent_id, "Token does not match agent");
            Err(AuthError::InvalidAgentCredentials)
        }
        None => {
            dummy_credential().verify(token);
            warn!(agent_id, "Authentication attempted for unknown agent");
            Err(AuthError::InvalidAgentCredentials)
        }
    }
}
