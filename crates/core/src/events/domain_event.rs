//! Domain event types.

use serde::Serialize;

use crate::companies::Company;
use crate::constants::{
    ROUTING_KEY_COMPANY_CREATED, ROUTING_KEY_COMPANY_DELETED, ROUTING_KEY_COMPANY_UPDATED,
};

/// Domain events emitted after a successful, committed mutation.
///
/// Each event is published under its routing key with the variant's content
/// as the JSON body; the variant itself is not part of the wire format.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum DomainEvent {
    /// A company was created.
    CompanyCreated(Company),

    /// A company was updated; carries the stored state after the merge.
    CompanyUpdated(Company),

    /// A company was deleted.
    CompanyDeleted { id: String },
}

impl DomainEvent {
    /// Creates a CompanyCreated event.
    pub fn company_created(company: Company) -> Self {
        Self::CompanyCreated(company)
    }

    /// Creates a CompanyUpdated event.
    pub fn company_updated(company: Company) -> Self {
        Self::CompanyUpdated(company)
    }

    /// Creates a CompanyDeleted event.
    pub fn company_deleted(id: impl Into<String>) -> Self {
        Self::CompanyDeleted { id: id.into() }
    }

    /// Topic key the event is published under.
    pub fn routing_key(&self) -> &'static str {
        match self {
            DomainEvent::CompanyCreated(_) => ROUTING_KEY_COMPANY_CREATED,
            DomainEvent::CompanyUpdated(_) => ROUTING_KEY_COMPANY_UPDATED,
            DomainEvent::CompanyDeleted { .. } => ROUTING_KEY_COMPANY_DELETED,
        }
    }
}
