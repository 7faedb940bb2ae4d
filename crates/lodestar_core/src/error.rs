//! The error taxonomy surfaced by deferred-value operations.
//!
//! Every lazy field of an output resolves to a `Result`, and a single
//! underlying failure may be observed from many derived outputs, so the
//! error type is `Clone` and cheap to duplicate. Sources that are not
//! themselves clonable (`serde_json::Error`) are shared behind `Arc`.

use core::fmt;
use std::sync::Arc;

/// Errors that can occur while constructing or resolving deferred values.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OutputError {
    /// A value being lifted referred back to one of its own ancestors.
    #[error("circular structure detected while lifting a value into an output")]
    CircularStructure,

    /// A deferred output was dropped before a source was bound to it.
    #[error("deferred output was dropped before a source was bound")]
    DeferredDropped,

    /// A user-supplied apply callback reported failure.
    #[error("apply callback failed: {0}")]
    Callback(Arc<str>),

    /// A pending input failed instead of yielding a value.
    #[error("pending input failed: {0}")]
    Pending(Arc<str>),

    /// A JSON conversion failed.
    #[error("json conversion failed: {0}")]
    Json(Arc<serde_json::Error>),
}

impl OutputError {
    /// Wraps a user callback failure.
    pub fn callback(message: impl fmt::Display) -> Self {
        OutputError::Callback(message.to_string().into())
    }

    /// Wraps a pending-input failure.
    pub fn pending(message: impl fmt::Display) -> Self {
        OutputError::Pending(message.to_string().into())
    }

    /// Wraps a JSON conversion failure.
    #[must_use]
    pub fn json(error: serde_json::Error) -> Self {
        OutputError::Json(Arc::new(error))
    }
}
