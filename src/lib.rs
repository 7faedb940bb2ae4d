//! A deferred-value propagation core for infrastructure-as-code programs.
//!

pub use lodestar_core;
pub use lodestar_output;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use lodestar_core::prelude::*;
    pub use lodestar_output::prelude::*;
}
