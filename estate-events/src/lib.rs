//! Estate Events - Mutation Subscribers and Dispatch
//!
//! This crate defines the contract between a System of Record and the code
//! that reacts to its writes. A store publishes a [`MutationEvent`] after a
//! create, update or delete commits; the [`MutationBus`] hands it to every
//! subscriber registered for that entity type before `publish` returns.
//!
//! ```text
//! store.update(..) ──► commit ──► bus.publish(event) ──► subscriber.on_saved(event)
//!                                                    └─► subscriber.on_saved(event)
//!        ◄──────────────────── returns only after all subscribers ran
//! ```
//!
//! # Key Types
//!
//! - [`MutationSubscriber`]: handler trait (saved / deleted)
//! - [`MutationBus`]: in-process registry keyed by [`EntityType`]

mod bus;

pub use bus::{MutationBus, MutationSubscriber};

// Re-export core types for convenience
pub use estate_core::{EntityType, MutationEvent, MutationKind};
