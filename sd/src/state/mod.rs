//! Case state: transition rules and persistent state access
//!
//! [`machine`] owns every status mutation; [`StateManager`] is an actor
//! that owns the record store and serializes all reads and writes.

pub mod machine;
mod manager;
mod messages;

pub use machine::{TransitionError, advance};
pub use manager::StateManager;
pub use messages::{StateCommand, StateError, StateResponse};
