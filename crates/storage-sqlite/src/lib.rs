//! SQLite storage implementation for the XM company registry.
//!
//! This crate provides all database-related functionality using Diesel ORM with SQLite:
//! - Database initialization, connection pooling and embedded migrations
//! - The [`UnitOfWork`] transaction scope
//! - The generic [`Repository`] contract with composable query processors
//! - Repository implementations and Diesel models for the domain entities
//!
//! # Architecture
//!
//! This crate is the only place in the workspace where Diesel dependencies exist.
//! `xm-core` stays database-agnostic; the server opens a unit of work, calls
//! repositories inside it and commits.
//!
//! ```text
//!      xm-server
//!          │
//!          ▼
//!  storage-sqlite (this crate) ──► xm-core (domain)
//!          │
//!          ▼
//!      SQLite DB
//! ```

pub mod db;
pub mod errors;
pub mod repository;
pub mod schema;

// Repository implementations
pub mod companies;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, init, run_migrations, DbConnection, DbPool,
    DbTransactionExecutor, UnitOfWork, UnitOfWorkState,
};

pub use repository::{apply_processors, QueryProcessor, Repository};

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

// Re-export from xm-core for convenience
pub use xm_core::errors::{DatabaseError, Error, Result};
