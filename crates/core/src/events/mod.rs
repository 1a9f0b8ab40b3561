//! Domain events module.
//!
//! Provides the domain event types published after successful mutations.
//! The messaging crate ships them to the broker; this crate only defines
//! their routing keys and JSON bodies.

mod domain_event;

pub use domain_event::*;
