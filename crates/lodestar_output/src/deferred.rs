//! Deferred outputs.
//!
//! A deferred output stands in for an output that does not exist yet, which
//! is how cyclic wiring between resources is broken: create the deferred,
//! hand it to the first resource, then bind it to the second resource's
//! output once that exists. Every field of the deferred suspends until the
//! bind and then chains to the source's corresponding field.

use std::sync::{Arc, OnceLock};

use futures::channel::oneshot;

use crate::output::{field, Output};
use lodestar_core::OutputError;

/// One-shot binder for a deferred output.
///
/// Binding consumes the binder, so a deferred output cannot be bound to two
/// sources. Dropping the binder without binding fails every field of the
/// deferred output with [`OutputError::DeferredDropped`].
pub struct DeferredBinder {
    slot: Arc<OnceLock<Output>>,
    tx: oneshot::Sender<()>,
}

impl DeferredBinder {
    /// Binds the deferred output to its source.
    ///
    /// Readers suspended on any field of the deferred are woken and observe
    /// the source's fields from this point on.
    pub fn bind(self, source: &Output) {
        tracing::debug!("deferred output bound to its source");
        let _ = self.slot.set(source.clone());
        let _ = self.tx.send(());
    }
}

/// Creates an output whose source is bound later.
///
/// Returns the output together with its one-shot [`DeferredBinder`].
/// Reading any field before the bind suspends until the bind happens; a
/// deferred whose binder is dropped unbound fails every field with
/// [`OutputError::DeferredDropped`] instead of suspending forever.
#[must_use]
pub fn deferred() -> (Output, DeferredBinder) {
    let slot = Arc::new(OnceLock::new());
    let (tx, rx) = oneshot::channel::<()>();

    let bound = slot.clone();
    let core = field(async move {
        rx.await.map_err(|_| OutputError::DeferredDropped)?;
        bound.get().cloned().ok_or(OutputError::DeferredDropped)
    });

    (Output::from_deferred_core(core), DeferredBinder { slot, tx })
}
