//! The deferred-value output algebra for Lodestar (Layer 2).
//!
//! `lodestar_output` provides the core abstraction of the deferred-value
//! runtime: the [`Output`], a lazy asynchronous container for a value still
//! being computed by a resource provider, carrying knownness, secrecy, and
//! resource-dependency metadata alongside it.
//!
//! # Core Concepts
//!
//! - [`Output`] - The five-field lazy container
//! - [`Input`] - Arbitrary nestings of values, outputs, and pendings
//! - [`output`] - The lifting constructor from [`Input`] to [`Output`]
//! - [`Output::apply`] - The fundamental transformation over eventual values
//! - [`all`], [`concat`], [`interpolate`], [`json_stringify`], [`secret`] -
//!   Combinators built on the same metadata join
//! - [`deferred`] - Late-bound outputs for breaking cyclic wiring
//!
//! # Example
//!
//! ```
//! use lodestar_core::Value;
//! use lodestar_output::{concat, output, Input, Output};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), lodestar_core::OutputError> {
//! let region = Output::new("eu-west-1");
//! let endpoint = concat([
//!     Input::from("https://api."),
//!     Input::from(region),
//!     Input::from(".example.com"),
//! ])?;
//!
//! assert_eq!(
//!     endpoint.value().await?,
//!     Some(Value::from("https://api.eu-west-1.example.com"))
//! );
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! This crate is Layer 2 of the Lodestar architecture:
//!
//! - **Layer 1** (`lodestar_core`): value and resource primitives
//! - **Layer 2** (`lodestar_output`): the output algebra (this crate)

/// Combinators over lifted inputs.
pub mod combine;

/// Deferred (late-bound) outputs.
pub mod deferred;

/// Lifted inputs.
pub mod input;

/// The output container and its algebra.
pub mod output;

pub use combine::{
    all, all_entries, concat, interpolate, is_secret, json_parse, json_stringify,
    json_stringify_pretty, secret, unsecret,
};
pub use deferred::{deferred, DeferredBinder};
pub use input::{Input, InputBinder};
pub use output::{output, Output};

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::combine::{
        all, all_entries, concat, interpolate, is_secret, json_parse, json_stringify,
        json_stringify_pretty, secret, unsecret,
    };
    pub use crate::deferred::{deferred, DeferredBinder};
    pub use crate::input::{Input, InputBinder};
    pub use crate::output::{output, Output};
}
