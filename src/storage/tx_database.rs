// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded transactional database backed by redb (pure Rust, ACID).
//!
//! [`Store`] is the process-wide handle to the database file and is cheap to
//! clone. [`Connection`] is the request-local handle implementing
//! [`Database`]: it holds at most one open write transaction, and every read
//! or write goes through that transaction.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use tracing::warn;

use super::{
    migrations, Agent, DataPoint, Database, StorageError, StorageResult, User, Variable,
};

// =============================================================================
// Table Definitions
// =============================================================================

pub(super) const USERS: TableDefinition<u64, &[u8]> = TableDefinition::new("users");

pub(super) const USERS_BY_EMAIL: TableDefinition<&str, u64> = TableDefinition::new("users_by_email");

pub(super) const AGENTS: TableDefinition<u64, &[u8]> = TableDefinition::new("agents");

/// Key: `(owner_user_id, agent_id)` so one owner's agents form a contiguous range.
pub(super) const AGENTS_BY_OWNER: TableDefinition<(u64, u64), u64> =
    TableDefinition::new("agents_by_owner");

pub(super) const VARIABLES: TableDefinition<u64, &[u8]> = TableDefinition::new("variables");

pub(super) const VARIABLES_BY_NAME: TableDefinition<&str, u64> =
    TableDefinition::new("variables_by_name");

/// Key: `(agent_id, variable_id, unix_micros)`; value: `f64::to_bits`.
pub(super) const DATA: TableDefinition<(u64, u64, i64), u64> = TableDefinition::new("data");

/// Last issued id per entity kind.
pub(super) const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

pub(super) const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

const USER_SEQUENCE: &str = "users";
const AGENT_SEQUENCE: &str = "agents";
const VARIABLE_SEQUENCE: &str = "variables";

// =============================================================================
// Store
// =============================================================================

/// Shared handle to the database file.
#[derive(Clone)]
pub struct Store {
    db: Arc<redb::Database>,
}

impl Store {
    /// Open (or create) the database at the given path.
    ///
    /// Does not apply migrations; call [`Store::run_migrations`] before
    /// serving requests.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = redb::Database::create(path)?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Apply pending schema migrations. Returns how many were applied.
    pub fn run_migrations(&self) -> StorageResult<usize> {
        migrations::run(&self.db)
    }

    /// Current schema version, read without taking the write lock.
    pub fn schema_version(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let meta = match read_txn.open_table(META) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        let version = meta
            .get(migrations::SCHEMA_VERSION_KEY)?
            .map(|v| v.value())
            .unwrap_or(0);
        Ok(version)
    }

    /// Hand out a new request-local connection with no transaction open.
    pub fn connect(&self) -> Connection {
        Connection {
            db: Arc::clone(&self.db),
            txn: None,
        }
    }
}

// =============================================================================
// Connection
// =============================================================================

/// Request-local database handle.
///
/// Dropping a connection with a transaction still open aborts it.
pub struct Connection {
    db: Arc<redb::Database>,
    txn: Option<WriteTransaction>,
}

impl Connection {
    fn txn(&self) -> StorageResult<&WriteTransaction> {
        self.txn.as_ref().ok_or(StorageError::NoTransaction)
    }
}

/// Increment and return the named sequence.
fn next_id(txn: &WriteTransaction, sequence: &str) -> StorageResult<u64> {
    let mut table = txn.open_table(SEQUENCES)?;
    let next = table.get(sequence)?.map(|v| v.value()).unwrap_or(0) + 1;
    table.insert(sequence, next)?;
    Ok(next)
}

fn read_json<T: serde::de::DeserializeOwned>(
    txn: &WriteTransaction,
    table: TableDefinition<'static, u64, &'static [u8]>,
    id: u64,
) -> StorageResult<Option<T>> {
    let table = txn.open_table(table)?;
    let record = match table.get(id)? {
        Some(value) => Some(serde_json::from_slice(value.value())?),
        None => None,
    };
    Ok(record)
}

fn write_json<T: serde::Serialize>(
    txn: &WriteTransaction,
    table: TableDefinition<'static, u64, &'static [u8]>,
    id: u64,
    record: &T,
) -> StorageResult<()> {
    let json = serde_json::to_vec(record)?;
    let mut table = txn.open_table(table)?;
    table.insert(id, json.as_slice())?;
    Ok(())
}

impl Database for Connection {
    fn begin_transaction(&mut self) -> StorageResult<()> {
        if self.txn.is_some() {
            return Err(StorageError::TransactionInProgress);
        }
        self.txn = Some(self.db.begin_write()?);
        Ok(())
    }

    fn commit_transaction(&mut self) -> StorageResult<()> {
        let txn = self.txn.take().ok_or(StorageError::NoTransaction)?;
        txn.commit()?;
        Ok(())
    }

    fn rollback_transaction(&mut self) -> StorageResult<()> {
        let txn = self.txn.take().ok_or(StorageError::NoTransaction)?;
        txn.abort()?;
        Ok(())
    }

    fn rollback_uncommitted_transaction(&mut self) {
        if let Some(txn) = self.txn.take() {
            if let Err(e) = txn.abort() {
                warn!(error = %e, "Failed to roll back uncommitted transaction");
            }
        }
    }

    fn in_transaction(&self) -> bool {
        self.txn.is_some()
    }

    // =========================================================================
    // Users
    // =========================================================================

    fn create_user(&mut self, user: &mut User) -> StorageResult<()> {
        let txn = self.txn()?;
        {
            let index = txn.open_table(USERS_BY_EMAIL)?;
            if index.get(user.email.as_str())?.is_some() {
                return Err(StorageError::AlreadyExists(format!(
                    "user with email {}",
                    user.email
                )));
            }
        }

        let id = next_id(txn, USER_SEQUENCE)?;
        let mut record = user.clone();
        record.id = id;
        write_json(txn, USERS, id, &record)?;

        let mut index = txn.open_table(USERS_BY_EMAIL)?;
        index.insert(record.email.as_str(), id)?;

        user.id = id;
        Ok(())
    }

    fn get_user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let txn = self.txn()?;
        let id = {
            let index = txn.open_table(USERS_BY_EMAIL)?;
            let id = index.get(email)?.map(|v| v.value());
            id
        };
        match id {
            Some(id) => read_json(txn, USERS, id),
            None => Ok(None),
        }
    }

    // =========================================================================
    // Agents
    // =========================================================================

    fn create_agent(&mut self, agent: &mut Agent) -> StorageResult<()> {
        let txn = self.txn()?;

        let id = next_id(txn, AGENT_SEQUENCE)?;
        let mut record = agent.clone();
        record.id = id;
        write_json(txn, AGENTS, id, &record)?;

        let mut index = txn.open_table(AGENTS_BY_OWNER)?;
        index.insert((record.owner_user_id, id), id)?;

        agent.id = id;
        Ok(())
    }

    fn get_agent_by_id(&self, agent_id: u64) -> StorageResult<Option<Agent>> {
        read_json(self.txn()?, AGENTS, agent_id)
    }

    fn get_agents_by_owner(&self, owner_user_id: u64) -> StorageResult<Vec<Agent>> {
        let txn = self.txn()?;

        let mut ids = Vec::new();
        {
            let index = txn.open_table(AGENTS_BY_OWNER)?;
            for entry in index.range((owner_user_id, 0u64)..=(owner_user_id, u64::MAX))? {
                let (_, agent_id) = entry?;
                ids.push(agent_id.value());
            }
        }

        let mut agents = Vec::with_capacity(ids.len());
        for id in ids {
            match read_json(txn, AGENTS, id)? {
                Some(agent) => agents.push(agent),
                None => warn!(agent_id = id, "Owner index points at a missing agent"),
            }
        }
        Ok(agents)
    }

    // =========================================================================
    // Variables
    // =========================================================================

    fn create_variable(&mut self, variable: &mut Variable) -> StorageResult<()> {
        let txn = self.txn()?;
        {
            let index = txn.open_table(VARIABLES_BY_NAME)?;
            if index.get(variable.name.as_str())?.is_some() {
                return Err(StorageError::AlreadyExists(format!(
                    "variable named {}",
                    variable.name
                )));
            }
        }

        let id = next_id(txn, VARIABLE_SEQUENCE)?;
        let mut record = variable.clone();
        record.id = id;
        write_json(txn, VARIABLES, id, &record)?;

        let mut index = txn.open_table(VARIABLES_BY_NAME)?;
        index.insert(record.name.as_str(), id)?;

        variable.id = id;
        Ok(())
    }

    fn get_variable_by_id(&self, variable_id: u64) -> StorageResult<Option<Variable>> {
        read_json(self.txn()?, VARIABLES, variable_id)
    }

    fn get_variable_by_name(&self, name: &str) -> StorageResult<Option<Variable>> {
        let txn = self.txn()?;
        let id = {
            let index = txn.open_table(VARIABLES_BY_NAME)?;
            let id = index.get(name)?.map(|v| v.value());
            id
        };
        match id {
            Some(id) => read_json(txn, VARIABLES, id),
            None => Ok(None),
        }
    }

    fn get_all_variables(&self) -> StorageResult<Vec<Variable>> {
        let txn = self.txn()?;
        let table = txn.open_table(VARIABLES)?;

        let mut variables = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            variables.push(serde_json::from_slice(value.value())?);
        }
        Ok(variables)
    }

    // =========================================================================
    // Data
    // =========================================================================

    fn add_data_point(&mut self, point: &DataPoint) -> StorageResult<()> {
        let txn = self.txn()?;
        let mut table = txn.open_table(DATA)?;
        table.insert(
            (point.agent_id, point.variable_id, point.time.timestamp_micros()),
            point.value.to_bits(),
        )?;
        Ok(())
    }

    fn get_data(
        &self,
        agent_id: u64,
        variable_id: u64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StorageResult<BTreeMap<DateTime<Utc>, f64>> {
        let txn = self.txn()?;
        let table = txn.open_table(DATA)?;

        // Keys are whole microseconds; round a sub-microsecond lower bound up.
        let from_micros = from.timestamp_micros() + i64::from(from.timestamp_subsec_nanos() % 1_000 != 0);
        let start = (agent_id, variable_id, from_micros);
        let end = (agent_id, variable_id, to.timestamp_micros());

        let mut points = BTreeMap::new();
        if start > end {
            return Ok(points);
        }
        for entry in table.range(start..=end)? {
            let (key, value) = entry?;
            let (_, _, micros) = key.value();
            match DateTime::from_timestamp_micros(micros) {
                Some(time) => {
                    points.insert(time, f64::from_bits(value.value()));
                }
                None => warn!(agent_id, variable_id, micros, "Skipping data point with invalid time"),
            }
        }
        Ok(points)
    }
}

// =============================================================================
// Tests
// =============================================================================
