// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Test doubles for the storage layer.
//!
//! [`MockDatabase`] keeps records in memory, enforces the same transaction
//! state machine as the real connection, records every transaction call and
//! can be told to fail `begin`, `commit` or `rollback`.
//!
//! Writes made inside a transaction are staged and only folded into the
//! committed state on commit, so rollback tests can observe that nothing
//! leaked.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::{
    Agent, DataPoint, Database, StorageError, StorageResult, Store, User, Variable,
};

/// Open a migrated store in a fresh temporary directory.
///
/// Keep the returned `TempDir` alive for as long as the store is used.
pub fn temp_store() -> (Store, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(&dir.path().join("test.redb")).unwrap();
    store.run_migrations().unwrap();
    (store, dir)
}

#[derive(Debug, Clone, Default)]
struct State {
    users: BTreeMap<u64, User>,
    agents: BTreeMap<u64, Agent>,
    variables: BTreeMap<u64, Variable>,
    data: BTreeMap<(u64, u64, DateTime<Utc>), f64>,
    next_id: u64,
}

#[derive(Debug, Default)]
pub struct MockDatabase {
    committed: State,
    staged: Option<State>,

    /// Transaction calls in the order they were made.
    pub calls: Vec<&'static str>,

    pub fail_begin: bool,
    pub fail_commit: bool,
    pub fail_rollback: bool,
}

impl MockDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user directly into committed state.
    pub fn with_user(mut self, user: User) -> Self {
        self.committed.next_id = self.committed.next_id.max(user.id);
        self.committed.users.insert(user.id, user);
        self
    }

    /// Insert an agent directly into committed state.
    pub fn with_agent(mut self, agent: Agent) -> Self {
        self.committed.next_id = self.committed.next_id.max(agent.id);
        self.committed.agents.insert(agent.id, agent);
        self
    }

    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.committed.next_id = self.committed.next_id.max(variable.id);
        self.committed.variables.insert(variable.id, variable);
        self
    }

    pub fn committed_users(&self) -> usize {
        self.committed.users.len()
    }

    pub fn committed_data_points(&self) -> usize {
        self.committed.data.len()
    }

    fn staged(&self) -> StorageResult<&State> {
        self.staged.as_ref().ok_or(StorageError::NoTransaction)
    }

    fn staged_mut(&mut self) -> StorageResult<&mut State> {
        self.staged.as_mut().ok_or(StorageError::NoTransaction)
    }
}

fn injected(operation: &str) -> StorageError {
    StorageError::Io(std::io::Error::other(format!("injected {operation} failure")))
}

impl Database for MockDatabase {
    fn begin_transaction(&mut self) -> StorageResult<()> {
        self.calls.push("begin");
        if self.fail_begin {
            return Err(injected("begin"));
        }
        if self.staged.is_some() {
            return Err(StorageError::TransactionInProgress);
        }
        self.staged = Some(self.committed.clone());
        Ok(())
    }

    fn commit_transaction(&mut self) -> StorageResult<()> {
        self.calls.push("commit");
        let staged = self.staged.take().ok_or(StorageError::NoTransaction)?;
        if self.fail_commit {
            return Err(injected("commit"));
        }
        self.committed = staged;
        Ok(())
    }

    fn rollback_transaction(&mut self) -> StorageResult<()> {
        self.calls.push("rollback");
        if self.staged.take().is_none() {
            return Err(StorageError::NoTransaction);
        }
        if self.fail_rollback {
            return Err(injected("rollback"));
        }
        Ok(())
    }

    fn rollback_uncommitted_transaction(&mut self) {
        self.calls.push("rollback_uncommitted");
        self.staged = None;
    }

    fn in_transaction(&self) -> bool {
        self.staged.is_some()
    }

    fn create_user(&mut self, user: &mut User) -> StorageResult<()> {
        let state = self.staged_mut()?;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(StorageError::AlreadyExists(user.email.clone()));
        }
        state.next_id += 1;
        user.id = state.next_id;
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    fn get_user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let state = self.staged()?;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    fn create_agent(&mut self, agent: &mut Agent) -> StorageResult<()> {
        let state = self.staged_mut()?;
        state.next_id += 1;
        agent.id = state.next_id;
        state.agents.insert(agent.id, agent.clone());
        Ok(())
    }

    fn get_agent_by_id(&self, agent_id: u64) -> StorageResult<Option<Agent>> {
        Ok(self.staged()?.agents.get(&agent_id).cloned())
    }

    fn get_agents_by_owner(&self, owner_user_id: u64) -> StorageResult<Vec<Agent>> {
        let state = self.staged()?;
        Ok(state
            .agents
            .values()
            .filter(|a| a.owner_user_id == owner_user_id)
            .cloned()
            .collect())
    }

    fn create_variable(&mut self, variable: &mut Variable) -> StorageResult<()> {
        let state = self.staged_mut()?;
        if state.variables.values().any(|v| v.name == variable.name) {
            return Err(StorageError::AlreadyExists(variable.name.clone()));
        }
        state.next_id += 1;
        variable.id = state.next_id;
        state.variables.insert(variable.id, variable.clone());
        Ok(())
    }

    fn get_variable_by_id(&self, variable_id: u64) -> StorageResult<Option<Variable>> {
        Ok(self.staged()?.variables.get(&variable_id).cloned())
    }

    fn get_variable_by_name(&self, name: &str) -> StorageResult<Option<Variable>> {
        let state = self.staged()?;
        Ok(state.variables.values().find(|v| v.name == name).cloned())
    }

    fn get_all_variables(&self) -> StorageResult<Vec<Variable>> {
        Ok(self.staged()?.variables.values().cloned().collect())
    }

    fn add_data_point(&mut self, point: &DataPoint) -> StorageResult<()> {
        let state = self.staged_mut()?;
        state
            .data
            .insert((point.agent_id, point.variable_id, point.time), point.value);
        Ok(())
    }

    fn get_data(
        &self,
        agent_id: u64,
        variable_id: u64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StorageResult<BTreeMap<DateTime<Utc>, f64>> {
        let state = self.staged()?;
        Ok(state
            .data
            .range((agent_id, variable_id, from)..=(agent_id, variable_id, to))
            .map(|((_, _, time), value)| (*time, *value))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_follows_the_transaction_state_machine() {
        let mut db = MockDatabase::new();

        assert!(matches!(db.commit_transaction(), Err(StorageError::NoTransaction)));
        db.begin_transaction().unwrap();
        assert!(matches!(
            db.begin_transaction(),
            Err(StorageError::TransactionInProgress)
        ));
        db.rollback_transaction().unwrap();
        db.rollback_uncommitted_transaction();

        assert_eq!(
            db.calls,
            vec!["commit", "begin", "begin", "rollback", "rollback_uncommitted"]
        );
    }

    #[test]
    fn staged_writes_only_survive_commit() {
        let mut db = MockDatabase::new();
        let variable = |name: &str| Variable {
            id: 0,
            name: name.to_string(),
            units: "%".to_string(),
            display_decimal_places: 0,
            created: Utc::now(),
        };

        db.begin_transaction().unwrap();
        db.create_variable(&mut variable("discarded")).unwrap();
        db.rollback_transaction().unwrap();

        db.begin_transaction().unwrap();
        db.create_variable(&mut variable("kept")).unwrap();
        db.commit_transaction().unwrap();

        db.begin_transaction().unwrap();
        let names: Vec<_> = db
            .get_all_variables()
            .unwrap()
            .into_iter()
            .map(|v| v.name)
            .collect();
        assert_eq!(names, vec!["kept".to_string()]);
    }
}
