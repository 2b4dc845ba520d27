// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Records persisted by the storage engine.
//!
//! These types carry credential material and are never returned from the
//! API directly; handlers map them onto the response types in `models`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::password::{self, Credential, CredentialError};

/// A human account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Assigned by the store on creation (0 until then)
    pub id: u64,
    /// Login key, unique across users
    pub email: String,
    pub password: Credential,
    pub is_admin: bool,
    pub created: DateTime<Utc>,
}

impl User {
    /// Build a new, non-admin user with a freshly derived password credential.
    pub fn new(email: impl Into<String>, password: &str) -> Result<Self, CredentialError> {
        Ok(Self {
            id: 0,
            email: email.into(),
            password: Credential::derive(password)?,
            is_admin: false,
            created: Utc::now(),
        })
    }
}

/// A data-reporting device owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Assigned by the store on creation (0 until then)
    pub id: u64,
    pub owner_user_id: u64,
    pub name: String,
    pub token: Credential,
    pub created: DateTime<Utc>,
}

impl Agent {
    /// Build a new agent and issue its token.
    ///
    /// Returns the agent together with the plaintext token. The token is not
    /// kept anywhere else: the caller must hand it to the client in the
    /// creation response or it is lost.
    pub fn issue(owner_user_id: u64, name: impl Into<String>) -> Result<(Self, String), CredentialError> {
        let token = password::generate_token()?;
        let mut agent = Self {
            id: 0,
            owner_user_id,
            name: name.into(),
            token: Credential::default(),
            created: Utc::now(),
        };
        agent.set_token(&token)?;
        Ok((agent, token))
    }

    /// Replace the token credential with one derived from `token`.
    pub fn set_token(&mut self, token: &str) -> Result<(), CredentialError> {
        self.token = Credential::derive(token)?;
        Ok(())
    }
}

/// A named, typed series that agents report values for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub id: u64,
    pub name: String,
    pub units: String,
    pub display_decimal_places: u32,
    pub created: DateTime<Utc>,
}

/// One reading of one variable by one agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataPoint {
    pub agent_id: u64,
    pub variable_id: u64,
    pub time: DateTime<Utc>,
    pub value: f64,
}
