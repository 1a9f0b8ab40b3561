//! XM Core - Domain entities, validation rules, domain events and errors.
//!
//! This crate is database- and broker-agnostic. The `storage-sqlite` crate
//! persists the entities defined here and the `messaging` crate ships the
//! domain events to the message broker.

pub mod companies;
pub mod constants;
pub mod entity;
pub mod errors;
pub mod events;

// Re-export error types
pub use errors::Error;
pub use errors::Result;

pub use entity::Entity;
