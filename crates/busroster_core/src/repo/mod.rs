//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for roster and ledger.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository writes validate records before persistence.
//! - Multi-statement writes run inside `BEGIN IMMEDIATE` transactions so a
//!   concurrent writer either fully precedes or fully follows them.
//! - Repository APIs return semantic errors in addition to DB transport errors.

pub mod error;
pub mod ledger_repo;
pub mod roster_repo;

use crate::db::migrations::{current_version, latest_version};
use crate::db::table_exists;
use error::{RepoError, RepoResult};
use rusqlite::Connection;

/// Rejects connections that were not opened through `db::open_*`.
pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    required_tables: &[&'static str],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &table in required_tables {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }

    Ok(())
}
