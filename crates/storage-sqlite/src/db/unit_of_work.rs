//! Scoped transaction boundary.
//!
//! A [`UnitOfWork`] owns one pooled connection for its whole lifetime. A
//! read-write scope opens an immediate transaction on [`UnitOfWork::begin`];
//! a read-only scope runs in autocommit mode and refuses writes. Whatever
//! happens in between, the scope is released exactly once: explicitly via
//! [`UnitOfWork::complete`] or implicitly when it is dropped.

use diesel::connection::{AnsiTransactionManager, TransactionManager};
use diesel::sqlite::SqliteConnection;
use log::{debug, error};

use super::{get_connection, DbConnection, DbPool};
use crate::errors::IntoCore;
use xm_core::errors::{DatabaseError, Result};

/// Completion state of a [`UnitOfWork`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOfWorkState {
    Pending,
    Committed,
    RolledBack,
}

pub struct UnitOfWork {
    conn: DbConnection,
    read_only: bool,
    state: UnitOfWorkState,
}

impl UnitOfWork {
    /// Starts a scope on a connection taken from `pool`.
    pub fn begin(pool: &DbPool, read_only: bool) -> Result<Self> {
        let mut conn = get_connection(pool)?;
        if !read_only {
            AnsiTransactionManager::begin_transaction_sql(&mut *conn, "BEGIN IMMEDIATE")
                .into_core()?;
        }
        debug!("Unit of work started (read_only={})", read_only);

        Ok(Self {
            conn,
            read_only,
            state: UnitOfWorkState::Pending,
        })
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn state(&self) -> UnitOfWorkState {
        self.state
    }

    /// Connection for queries. Available in every state.
    pub fn reader(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }

    /// Connection for inserts, updates and deletes.
    ///
    /// Fails with `ReadOnly` on a read-only scope and with `TransactionFailed`
    /// once the scope has been completed, so no write can escape the
    /// transaction it was meant to join.
    pub fn writer(&mut self) -> Result<&mut SqliteConnection> {
        if self.read_only {
            return Err(DatabaseError::ReadOnly(
                "write attempted in a read-only unit of work".to_string(),
            )
            .into());
        }
        if self.state != UnitOfWorkState::Pending {
            return Err(DatabaseError::TransactionFailed(format!(
                "write attempted in a unit of work that is already {:?}",
                self.state
            ))
            .into());
        }
        Ok(&mut self.conn)
    }

    /// Durably applies every write made through this scope.
    pub fn commit(&mut self) -> Result<()> {
        if self.state != UnitOfWorkState::Pending {
            return Err(DatabaseError::TransactionFailed(format!(
                "cannot commit a unit of work that is already {:?}",
                self.state
            ))
            .into());
        }

        if self.read_only {
            self.state = UnitOfWorkState::Committed;
            return Ok(());
        }

        match AnsiTransactionManager::commit_transaction(&mut *self.conn) {
            Ok(()) => {
                self.state = UnitOfWorkState::Committed;
                debug!("Unit of work committed");
                Ok(())
            }
            Err(e) => {
                // A failed COMMIT leaves the transaction rolled back by the
                // transaction manager.
                self.state = UnitOfWorkState::RolledBack;
                error!("Unit of work commit failed: {}", e);
                Err(e).into_core()
            }
        }
    }

    /// Releases the scope. Rolls back unless [`commit`](Self::commit) succeeded.
    /// Safe to call any number of times; failures are logged, never returned.
    pub fn complete(&mut self) {
        if self.state != UnitOfWorkState::Pending {
            return;
        }
        self.state = UnitOfWorkState::RolledBack;

        if self.read_only {
            return;
        }

        match AnsiTransactionManager::rollback_transaction(&mut *self.conn) {
            Ok(()) => debug!("Unit of work rolled back"),
            Err(e) => error!("Unit of work rollback failed: {}", e),
        }
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        self.complete();
    }
}

impl std::fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("read_only", &self.read_only)
            .field("state", &self.state)
            .finish()
    }
}
