//! The foundational primitives for Lodestar (Layer 1).
//!
//! `lodestar_core` provides the building blocks shared by every layer of the
//! deferred-value runtime:
//!
//! - [`value`] - The dynamic value model, including the unknown sentinel
//! - [`resource`] - Opaque resource identities and immutable identity sets
//! - [`phase`] - The process-wide execution phase (preview vs. apply)
//! - [`error`] - The error taxonomy surfaced by deferred-value operations
//!
//! # Architecture
//!
//! This crate is Layer 1 of the Lodestar architecture:
//!
//! - **Layer 1** (`lodestar_core`): value and resource primitives (this crate)
//! - **Layer 2** (`lodestar_output`): the output algebra built on top of them

/// The error taxonomy surfaced by deferred-value operations.
pub mod error;

/// The process-wide execution phase.
pub mod phase;

/// Opaque resource identities and immutable identity sets.
pub mod resource;

/// The dynamic value model.
pub mod value;

pub use error::OutputError;
pub use phase::{current_phase, is_dry_run, set_phase, Phase};
pub use resource::{ResourceId, ResourceSet};
pub use value::Value;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::error::OutputError;
    pub use crate::phase::{current_phase, is_dry_run, set_phase, Phase};
    pub use crate::resource::{ResourceId, ResourceSet};
    pub use crate::value::Value;
}
