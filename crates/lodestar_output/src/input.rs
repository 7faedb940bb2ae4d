//! Lifted inputs.
//!
//! [`Input`] is the argument shape accepted by the lifting constructor: a
//! concrete value, an already-lifted [`Output`], a pending computation, or
//! an array/record mixing all of these at any depth. Input nodes are
//! `Arc`-shared, so the same node may appear at several positions of a
//! structure; node identity (the allocation address) is what the cycle
//! checks key on. Sharing a node twice is fine, referring back to an
//! ancestor is not.
//!
//! Back-references can only be built through late binding: a deferred input
//! created with [`Input::deferred`] and bound after it has been embedded in
//! a larger structure. Already-bound deferreds are visible to the
//! synchronous cycle check; unresolved pendings are re-checked after they
//! resolve.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, OnceLock};

use futures::channel::oneshot;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use hashbrown::HashSet;
use lodestar_core::{OutputError, Value};

use crate::output::Output;

/// A shared, multi-consumer future yielding a lifted input.
pub(crate) type SharedInput = Shared<BoxFuture<'static, Result<Input, OutputError>>>;

/// An arbitrary input to the lifting constructor.
///
/// Cloning an input clones a reference to the same node.
#[derive(Clone)]
pub struct Input {
    repr: Arc<Repr>,
}

pub(crate) enum Repr {
    /// A fully materialized value.
    Concrete(Value),
    /// An already-lifted output; its five fields are preserved as-is.
    Output(Output),
    /// A computation that will later yield another input.
    Pending(Pending),
    /// An array of inputs.
    Array(Vec<Input>),
    /// A string-keyed record of inputs.
    Object(BTreeMap<String, Input>),
}

/// A pending computation wrapped as an input.
#[derive(Clone)]
pub(crate) struct Pending {
    future: SharedInput,
    /// Synchronous view of a deferred-backed pending, populated at bind
    /// time. `None` for future-backed pendings, which have no value to show
    /// before they run.
    slot: Option<Arc<OnceLock<Input>>>,
}

impl Pending {
    /// Returns the bound input if it is already available without awaiting.
    pub(crate) fn peek(&self) -> Option<Input> {
        self.slot.as_ref()?.get().cloned()
    }

    /// Returns the shared future yielding the input.
    pub(crate) fn wait(&self) -> SharedInput {
        self.future.clone()
    }
}

/// One-shot binder for a deferred input.
///
/// Binding consumes the binder, so a deferred input cannot be bound twice.
pub struct InputBinder {
    slot: Arc<OnceLock<Input>>,
    tx: oneshot::Sender<()>,
}

impl InputBinder {
    /// Binds the deferred input to its value.
    ///
    /// Every holder of the deferred input observes the bound value from
    /// this point on; readers suspended on it are woken.
    pub fn bind(self, input: impl Into<Input>) {
        let _ = self.slot.set(input.into());
        let _ = self.tx.send(());
    }
}

impl Input {
    fn from_repr(repr: Repr) -> Self {
        Self { repr: Arc::new(repr) }
    }

    pub(crate) fn repr(&self) -> &Repr {
        &self.repr
    }

    /// Identity of this node, used by the cycle checks.
    pub(crate) fn node_id(&self) -> usize {
        Arc::as_ptr(&self.repr) as usize
    }

    /// Wraps a pending computation as an input.
    ///
    /// The computation runs at most once; every output lifted from this
    /// input chains through the same shared result.
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = Result<Input, OutputError>> + Send + 'static,
    {
        Self::from_repr(Repr::Pending(Pending {
            future: future.boxed().shared(),
            slot: None,
        }))
    }

    /// Creates an input whose value is bound later.
    ///
    /// Returns the input together with its one-shot [`InputBinder`]. Reads
    /// through the input suspend until [`InputBinder::bind`] is called;
    /// dropping the binder unbound fails them with
    /// [`OutputError::DeferredDropped`].
    pub fn deferred() -> (Self, InputBinder) {
        let slot = Arc::new(OnceLock::new());
        let (tx, rx) = oneshot::channel::<()>();

        let bound = slot.clone();
        let future = async move {
            rx.await.map_err(|_| OutputError::DeferredDropped)?;
            bound.get().cloned().ok_or(OutputError::DeferredDropped)
        };

        let input = Self::from_repr(Repr::Pending(Pending {
            future: future.boxed().shared(),
            slot: Some(slot.clone()),
        }));
        (input, InputBinder { slot, tx })
    }

    /// Builds an array input.
    pub fn array(items: impl IntoIterator<Item = impl Into<Input>>) -> Self {
        Self::from_repr(Repr::Array(items.into_iter().map(Into::into).collect()))
    }

    /// Builds a record input from key/value pairs.
    pub fn object<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Input>,
    {
        Self::from_repr(Repr::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ))
    }

    /// Fails with [`OutputError::CircularStructure`] if this input's
    /// synchronously available portion refers back to one of its ancestors.
    ///
    /// Unresolved pendings are skipped here; the post-resolution walk inside
    /// the lifting core covers them.
    pub(crate) fn check_cycles(&self) -> Result<(), OutputError> {
        let mut path = HashSet::new();
        self.check_cycles_at(&mut path)
    }

    fn check_cycles_at(&self, path: &mut HashSet<usize>) -> Result<(), OutputError> {
        match &*self.repr {
            Repr::Concrete(_) | Repr::Output(_) => Ok(()),
            Repr::Pending(pending) => match pending.peek() {
                None => Ok(()),
                Some(inner) => {
                    self.enter(path)?;
                    inner.check_cycles_at(path)?;
                    path.remove(&self.node_id());
                    Ok(())
                }
            },
            Repr::Array(items) => {
                self.enter(path)?;
                for item in items {
                    item.check_cycles_at(path)?;
                }
                path.remove(&self.node_id());
                Ok(())
            }
            Repr::Object(entries) => {
                self.enter(path)?;
                for item in entries.values() {
                    item.check_cycles_at(path)?;
                }
                path.remove(&self.node_id());
                Ok(())
            }
        }
    }

    fn enter(&self, path: &mut HashSet<usize>) -> Result<(), OutputError> {
        if path.insert(self.node_id()) {
            Ok(())
        } else {
            tracing::debug!("input structure refers back to an ancestor node");
            Err(OutputError::CircularStructure)
        }
    }
}

impl From<Value> for Input {
    fn from(value: Value) -> Self {
        Self::from_repr(Repr::Concrete(value))
    }
}

impl From<Output> for Input {
    fn from(output: Output) -> Self {
        Self::from_repr(Repr::Output(output))
    }
}

impl From<&Output> for Input {
    fn from(output: &Output) -> Self {
        Self::from_repr(Repr::Output(output.clone()))
    }
}

impl From<bool> for Input {
    fn from(value: bool) -> Self {
        Value::from(value).into()
    }
}

impl From<i32> for Input {
    fn from(value: i32) -> Self {
        Value::from(value).into()
    }
}

impl From<i64> for Input {
    fn from(value: i64) -> Self {
        Value::from(value).into()
    }
}

impl From<f64> for Input {
    fn from(value: f64) -> Self {
        Value::from(value).into()
    }
}

impl From<&str> for Input {
    fn from(value: &str) -> Self {
        Value::from(value).into()
    }
}

impl From<String> for Input {
    fn from(value: String) -> Self {
        Value::from(value).into()
    }
}

impl From<Vec<Input>> for Input {
    fn from(items: Vec<Input>) -> Self {
        Self::from_repr(Repr::Array(items))
    }
}

impl From<BTreeMap<String, Input>> for Input {
    fn from(entries: BTreeMap<String, Input>) -> Self {
        Self::from_repr(Repr::Object(entries))
    }
}
