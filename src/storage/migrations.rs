// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded, versioned schema migrations.
//!
//! Each migration runs at most once. The highest applied version is kept in
//! the `meta` table under [`SCHEMA_VERSION_KEY`]; all pending migrations are
//! applied in a single write transaction, so a failure leaves the schema at
//! its previous version.

use redb::{ReadableTable, WriteTransaction};
use tracing::info;

use super::tx_database::{
    AGENTS, AGENTS_BY_OWNER, DATA, META, SEQUENCES, USERS, USERS_BY_EMAIL, VARIABLES,
    VARIABLES_BY_NAME,
};
use super::StorageResult;

pub(super) const SCHEMA_VERSION_KEY: &str = "schema_version";

struct Migration {
    version: u64,
    description: &'static str,
    apply: fn(&WriteTransaction) -> StorageResult<()>,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create users and agents",
        apply: create_accounts,
    },
    Migration {
        version: 2,
        description: "create variables",
        apply: create_variables,
    },
    Migration {
        version: 3,
        description: "create data points",
        apply: create_data,
    },
];

/// Version of the newest migration shipped with this binary.
pub const LATEST_VERSION: u64 = 3;

fn create_accounts(txn: &WriteTransaction) -> StorageResult<()> {
    txn.open_table(SEQUENCES)?;
    txn.open_table(USERS)?;
    txn.open_table(USERS_BY_EMAIL)?;
    txn.open_table(AGENTS)?;
    txn.open_table(AGENTS_BY_OWNER)?;
    Ok(())
}

fn create_variables(txn: &WriteTransaction) -> StorageResult<()> {
    txn.open_table(VARIABLES)?;
    txn.open_table(VARIABLES_BY_NAME)?;
    Ok(())
}

fn create_data(txn: &WriteTransaction) -> StorageResult<()> {
    txn.open_table(DATA)?;
    Ok(())
}

/// Apply every migration newer than the stored schema version.
///
/// Returns how many were applied (0 when already up to date).
pub(super) fn run(db: &redb::Database) -> StorageResult<usize> {
    let write_txn = db.begin_write()?;
    let mut applied = 0;
    {
        let mut meta = write_txn.open_table(META)?;
        let current = meta
            .get(SCHEMA_VERSION_KEY)?
            .map(|v| v.value())
            .unwrap_or(0);

        let mut version = current;
        for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
            (migration.apply)(&write_txn)?;
            info!(
                version = migration.version,
                description = migration.description,
                "Applied migration"
            );
            version = migration.version;
            applied += 1;
        }

        if version != current {
            meta.insert(SCHEMA_VERSION_KEY, version)?;
        }
    }
    write_txn.commit()?;
    Ok(applied)
}
