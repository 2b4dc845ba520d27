// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent storage for users, agents, variables and data points, backed by
//! an embedded redb database (pure Rust, ACID).
//!
//! ## Transaction Model
//!
//! Every data access goes through a [`Database`] handle that owns at most one
//! open transaction at a time:
//!
//! ```text
//! Idle --begin--> Open --commit|rollback--> Idle
//! ```
//!
//! - `begin` while `Open` fails with [`StorageError::TransactionInProgress`]
//! - `commit`/`rollback` while `Idle` fail with [`StorageError::NoTransaction`]
//! - data calls while `Idle` fail with [`StorageError::NoTransaction`]
//! - `rollback_uncommitted_transaction` is a no-op while `Idle`
//!
//! Handlers never drive this state machine themselves; the request executor
//! in [`crate::executor`] owns it.
//!
//! ## Table Layout
//!
//! ```text
//! users               id -> User (JSON)
//! users_by_email      email -> id
//! agents              id -> Agent (JSON)
//! agents_by_owner     (owner_id, agent_id) -> agent_id
//! variables           id -> Variable (JSON)
//! variables_by_name   name -> id
//! data                (agent_id, variable_id, micros) -> f64 bits
//! sequences           name -> last issued id
//! meta                key -> value (schema version)
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

pub mod migrations;
pub mod ownership;
pub mod records;
pub mod tx_database;

#[cfg(test)]
pub mod mock;

pub use ownership::{OwnedResource, OwnershipEnforcer};
pub use records::{Agent, DataPoint, User, Variable};
pub use tx_database::{Connection, Store};

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("cannot begin a transaction while another is in progress")]
    TransactionInProgress,

    #[error("an active transaction is required for this operation")]
    NoTransaction,

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// Database Capability
// =============================================================================

/// The storage operations the service depends on.
///
/// A handle is request-local: one request owns one handle and the single
/// transaction it may have open. Every data operation requires an open
/// transaction.
pub trait Database {
    /// Open a transaction. Fails if one is already open.
    fn begin_transaction(&mut self) -> StorageResult<()>;

    /// Make the open transaction's writes durable. Fails if none is open.
    fn commit_transaction(&mut self) -> StorageResult<()>;

    /// Discard the open transaction's writes. Fails if none is open.
    fn rollback_transaction(&mut self) -> StorageResult<()>;

    /// Roll back if a transaction is still open; otherwise do nothing.
    ///
    /// Never reports "nothing open". A failing rollback is logged.
    fn rollback_uncommitted_transaction(&mut self);

    /// Whether a transaction is currently open.
    fn in_transaction(&self) -> bool;

    /// Persist a new user and assign its id.
    fn create_user(&mut self, user: &mut User) -> StorageResult<()>;

    fn get_user_by_email(&self, email: &str) -> StorageResult<Option<User>>;

    /// Persist a new agent and assign its id.
    fn create_agent(&mut self, agent: &mut Agent) -> StorageResult<()>;

    fn get_agent_by_id(&self, agent_id: u64) -> StorageResult<Option<Agent>>;

    /// Agents owned by `owner_user_id`, in id order.
    fn get_agents_by_owner(&self, owner_user_id: u64) -> StorageResult<Vec<Agent>>;

    /// Persist a new variable and assign its id.
    fn create_variable(&mut self, variable: &mut Variable) -> StorageResult<()>;

    fn get_variable_by_id(&self, variable_id: u64) -> StorageResult<Option<Variable>>;

    fn get_variable_by_name(&self, name: &str) -> StorageResult<Option<Variable>>;

    /// All variables, in id order.
    fn get_all_variables(&self) -> StorageResult<Vec<Variable>>;

    /// Store one reading. A reading with the same agent, variable and time
    /// replaces the previous value.
    fn add_data_point(&mut self, point: &DataPoint) -> StorageResult<()>;

    /// Readings for one agent and variable with `from <= time <= to`.
    fn get_data(
        &self,
        agent_id: u64,
        variable_id: u64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StorageResult<BTreeMap<DateTime<Utc>, f64>>;
}
