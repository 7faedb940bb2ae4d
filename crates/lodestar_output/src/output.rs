//! The output container and its algebra.
//!
//! An [`Output`] is a lazy, asynchronous container for a value that is still
//! being computed by a resource provider, together with the metadata that
//! travels alongside the value: whether it will be materialized in the
//! current phase, whether it is secret, and which resources produced it.
//!
//! Each of the five fields is a shared future that resolves exactly once;
//! cloning an output clones references to the same fields, and deriving a
//! new output (via [`Output::apply`] or the [`output`] constructor) chains
//! new fields onto the old ones. Nothing is mutated after construction.
//!
//! # Example
//!
//! ```
//! use lodestar_core::Value;
//! use lodestar_output::{output, Input};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), lodestar_core::OutputError> {
//! let bucket = output(Input::object([("name", Input::from("site-assets"))]))?;
//! let url = bucket
//!     .get("name")
//!     .apply(|name| Input::from(format!("s3://{}", name.coerce_string())));
//!
//! assert_eq!(url.value().await?, Some(Value::from("s3://site-assets")));
//! # Ok(())
//! # }
//! ```

use core::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture, Shared};
use futures::FutureExt;
use hashbrown::HashSet;
use lodestar_core::{phase, OutputError, ResourceSet, Value};

use crate::input::{Input, Repr};

/// A shared, multi-consumer future backing one lazy field of an output.
pub(crate) type FieldFuture<T> = Shared<BoxFuture<'static, Result<T, OutputError>>>;

/// Wraps a future as a resolve-once, multi-consumer field.
pub(crate) fn field<T, F>(future: F) -> FieldFuture<T>
where
    T: Clone + Send + Sync + 'static,
    F: Future<Output = Result<T, OutputError>> + Send + 'static,
{
    future.boxed().shared()
}

/// Wraps an already-available result as a field.
pub(crate) fn ready_field<T>(result: Result<T, OutputError>) -> FieldFuture<T>
where
    T: Clone + Send + Sync + 'static,
{
    future::ready(result).boxed().shared()
}

struct Fields {
    /// Direct dependencies, when knowable at construction time. `None` only
    /// for deferred outputs whose source is not yet bound.
    deps_now: Option<ResourceSet>,
    deps: FieldFuture<ResourceSet>,
    value: FieldFuture<Value>,
    known: FieldFuture<bool>,
    secret: FieldFuture<bool>,
    all_deps: FieldFuture<ResourceSet>,
}

/// A lazy, asynchronous container for a deferred value and its metadata.
///
/// Outputs are immutable: the five fields set at construction are never
/// replaced. Every transformation produces a new output whose fields chain
/// onto the old ones.
#[derive(Clone)]
pub struct Output {
    fields: Arc<Fields>,
}

impl Output {
    /// Creates an output holding an already known value.
    ///
    /// The value is known (unless it contains the unknown sentinel), not
    /// secret, and carries no resource dependencies.
    pub fn new(value: impl Into<Value>) -> Self {
        Self::resolved(value, true, false, ResourceSet::new())
    }

    /// Creates an output whose value is not known in the current phase.
    #[must_use]
    pub fn unknown() -> Self {
        Self::resolved(Value::Unknown, false, false, ResourceSet::new())
    }

    /// Creates an output with fully settled fields.
    ///
    /// This is the constructor the resource-registration machinery uses once
    /// a provider has answered. A value containing the unknown sentinel is
    /// never reported as known, whatever `known` says.
    pub fn resolved(
        value: impl Into<Value>,
        known: bool,
        secret: bool,
        deps: ResourceSet,
    ) -> Self {
        let value = value.into();
        let known = known && !value.contains_unknown();
        Self {
            fields: Arc::new(Fields {
                deps_now: Some(deps.clone()),
                deps: ready_field(Ok(deps.clone())),
                value: ready_field(Ok(value)),
                known: ready_field(Ok(known)),
                secret: ready_field(Ok(secret)),
                all_deps: ready_field(Ok(deps)),
            }),
        }
    }

    /// Creates an output from externally supplied field futures.
    ///
    /// `deps` must be known at construction time; the transitive set may
    /// resolve later and must be a superset of `deps`.
    pub fn from_parts<V, K, S, A>(
        deps: ResourceSet,
        value: V,
        is_known: K,
        is_secret: S,
        all_deps: A,
    ) -> Self
    where
        V: Future<Output = Result<Value, OutputError>> + Send + 'static,
        K: Future<Output = Result<bool, OutputError>> + Send + 'static,
        S: Future<Output = Result<bool, OutputError>> + Send + 'static,
        A: Future<Output = Result<ResourceSet, OutputError>> + Send + 'static,
    {
        Self {
            fields: Arc::new(Fields {
                deps_now: Some(deps.clone()),
                deps: ready_field(Ok(deps)),
                value: field(value),
                known: field(is_known),
                secret: field(is_secret),
                all_deps: field(all_deps),
            }),
        }
    }

    /// Creates an output whose every field chains through a not-yet-bound
    /// source output.
    pub(crate) fn from_deferred_core(core: FieldFuture<Output>) -> Self {
        let deps = {
            let core = core.clone();
            field(async move { core.await?.deps_future().await })
        };
        let value = {
            let core = core.clone();
            field(async move { core.await?.value_future().await })
        };
        let known = {
            let core = core.clone();
            field(async move { core.await?.known_future().await })
        };
        let secret = {
            let core = core.clone();
            field(async move { core.await?.secret_future().await })
        };
        let all_deps = {
            let core = core.clone();
            field(async move { core.await?.all_deps_future().await })
        };
        Self {
            fields: Arc::new(Fields {
                deps_now: None,
                deps,
                value,
                known,
                secret,
                all_deps,
            }),
        }
    }

    fn from_lift(deps_now: ResourceSet, core: FieldFuture<Lifted>) -> Self {
        let value = {
            let core = core.clone();
            field(async move { Ok(core.await?.value) })
        };
        let known = {
            let core = core.clone();
            field(async move { Ok(core.await?.known) })
        };
        let secret = {
            let core = core.clone();
            field(async move { Ok(core.await?.secret) })
        };
        let all_deps = {
            let core = core.clone();
            let deps = deps_now.clone();
            field(async move { Ok(deps.union(&core.await?.all_deps)) })
        };
        Self {
            fields: Arc::new(Fields {
                deps: ready_field(Ok(deps_now.clone())),
                deps_now: Some(deps_now),
                value,
                known,
                secret,
                all_deps,
            }),
        }
    }

    /// Derives an output identical to this one except for its secrecy.
    pub(crate) fn with_secrecy(&self, secret: bool) -> Self {
        Self {
            fields: Arc::new(Fields {
                deps_now: self.fields.deps_now.clone(),
                deps: self.fields.deps.clone(),
                value: self.fields.value.clone(),
                known: self.fields.known.clone(),
                secret: ready_field(Ok(secret)),
                all_deps: self.fields.all_deps.clone(),
            }),
        }
    }

    /// Resolves the value, coerced to `None` when it is not known in the
    /// current phase.
    ///
    /// # Errors
    ///
    /// Propagates any failure of the underlying computation.
    pub async fn value(&self) -> Result<Option<Value>, OutputError> {
        if !self.fields.known.clone().await? {
            return Ok(None);
        }
        Ok(Some(self.fields.value.clone().await?))
    }

    /// Resolves whether the value is known in the current phase.
    ///
    /// # Errors
    ///
    /// Propagates any failure of the underlying computation.
    pub async fn is_known(&self) -> Result<bool, OutputError> {
        self.fields.known.clone().await
    }

    /// Resolves whether the value must be treated as confidential.
    ///
    /// # Errors
    ///
    /// Propagates any failure of the underlying computation.
    pub async fn is_secret(&self) -> Result<bool, OutputError> {
        self.fields.secret.clone().await
    }

    /// Resolves the direct resource dependencies.
    ///
    /// # Errors
    ///
    /// Fails only for a deferred output whose binder was dropped unbound.
    pub async fn resources(&self) -> Result<ResourceSet, OutputError> {
        self.fields.deps.clone().await
    }

    /// Resolves the transitively reachable resource dependencies, a
    /// superset of [`Output::resources`].
    ///
    /// # Errors
    ///
    /// Propagates any failure of the underlying computation.
    pub async fn all_resources(&self) -> Result<ResourceSet, OutputError> {
        self.fields.all_deps.clone().await
    }

    pub(crate) fn deps_now(&self) -> Option<&ResourceSet> {
        self.fields.deps_now.as_ref()
    }

    pub(crate) fn deps_future(&self) -> FieldFuture<ResourceSet> {
        self.fields.deps.clone()
    }

    pub(crate) fn value_future(&self) -> FieldFuture<Value> {
        self.fields.value.clone()
    }

    pub(crate) fn known_future(&self) -> FieldFuture<bool> {
        self.fields.known.clone()
    }

    pub(crate) fn secret_future(&self) -> FieldFuture<bool> {
        self.fields.secret.clone()
    }

    pub(crate) fn all_deps_future(&self) -> FieldFuture<ResourceSet> {
        self.fields.all_deps.clone()
    }

    /// Transforms the eventual value with a fallible callback.
    ///
    /// The callback receives the resolved value and returns a new input,
    /// which is lifted into the result; the result's metadata follows the
    /// propagation rules:
    ///
    /// - **value** - during a preview, an unknown source short-circuits and
    ///   the callback is not invoked; during an apply the callback runs even
    ///   over an unknown source (so its side effects happen), but the result
    ///   stays unknown. The phase flag is read at resolution time, at the
    ///   moment the source's knownness is known.
    /// - **knownness** - the result is known only if both the source and the
    ///   callback's result are known.
    /// - **secrecy** - a secret source makes the result secret. A known,
    ///   non-secret source lets the callback result's secrecy through. An
    ///   unknown, non-secret source yields a non-secret result: secrecy only
    ///   propagates through values that actually flow.
    /// - **dependencies** - direct dependencies are the source's; transitive
    ///   dependencies are the union of the source's and the callback
    ///   result's.
    ///
    /// A callback failure rejects the result's value and knownness; secrecy
    /// and dependencies still resolve.
    pub fn try_apply<F>(&self, f: F) -> Output
    where
        F: FnOnce(Value) -> Result<Input, OutputError> + Send + 'static,
    {
        let outcome = {
            let src_known = self.fields.known.clone();
            let src_value = self.fields.value.clone();
            field(async move {
                let known = src_known.await?;
                if !known && phase::is_dry_run() {
                    tracing::debug!("source unknown during preview; apply callback skipped");
                    return Ok(ApplyOutcome::Skipped);
                }
                let value = src_value.await?;
                let lifted = f(value).and_then(|inner| {
                    inner.check_cycles()?;
                    Ok(lift_unchecked(inner))
                });
                match lifted {
                    Ok(inner) => Ok(ApplyOutcome::Inner(inner)),
                    Err(err) => Ok(ApplyOutcome::CallbackFailed(err)),
                }
            })
        };

        let value = {
            let outcome = outcome.clone();
            field(async move {
                match outcome.await? {
                    ApplyOutcome::Skipped => Ok(Value::Unknown),
                    ApplyOutcome::Inner(inner) => inner.value_future().await,
                    ApplyOutcome::CallbackFailed(err) => Err(err),
                }
            })
        };

        let known = {
            let src_known = self.fields.known.clone();
            let outcome = outcome.clone();
            field(async move {
                let known = src_known.await?;
                match outcome.await? {
                    ApplyOutcome::Skipped => Ok(false),
                    ApplyOutcome::Inner(inner) => Ok(known && inner.known_future().await?),
                    ApplyOutcome::CallbackFailed(err) => Err(err),
                }
            })
        };

        let secret = {
            let src_secret = self.fields.secret.clone();
            let src_known = self.fields.known.clone();
            let outcome = outcome.clone();
            field(async move {
                if src_secret.await? {
                    return Ok(true);
                }
                if !src_known.await? {
                    // Secrecy only propagates through values that actually flow.
                    return Ok(false);
                }
                match outcome.await? {
                    ApplyOutcome::Skipped | ApplyOutcome::CallbackFailed(_) => Ok(false),
                    ApplyOutcome::Inner(inner) => inner.secret_future().await,
                }
            })
        };

        let all_deps = {
            let src_all_deps = self.fields.all_deps.clone();
            let outcome = outcome.clone();
            field(async move {
                let base = src_all_deps.await?;
                match outcome.await? {
                    ApplyOutcome::Skipped | ApplyOutcome::CallbackFailed(_) => Ok(base),
                    ApplyOutcome::Inner(inner) => Ok(base.union(&inner.all_deps_future().await?)),
                }
            })
        };

        Output {
            fields: Arc::new(Fields {
                deps_now: self.fields.deps_now.clone(),
                deps: self.fields.deps.clone(),
                value,
                known,
                secret,
                all_deps,
            }),
        }
    }

    /// Transforms the eventual value with an infallible callback.
    ///
    /// See [`Output::try_apply`] for the propagation rules.
    pub fn apply<F>(&self, f: F) -> Output
    where
        F: FnOnce(Value) -> Input + Send + 'static,
    {
        self.try_apply(move |value| Ok(f(value)))
    }

    /// Lifts access to a named member of a record value.
    ///
    /// Missing keys and non-record values yield `Null`; unknownness and
    /// secrecy follow the apply rules, so a member that is itself unknown
    /// makes the result unknown. The returned output supports further
    /// access, so chains like `o.get("a").get("b")` reach nested members.
    pub fn get(&self, key: impl Into<String>) -> Output {
        let key = key.into();
        self.apply(move |value| match value {
            Value::Object(mut entries) => entries
                .remove(&key)
                .map_or_else(|| Input::from(Value::Null), Input::from),
            _ => Input::from(Value::Null),
        })
    }

    /// Lifts access to a position of an array value.
    ///
    /// Out-of-range positions and non-array values yield `Null`.
    pub fn index(&self, index: usize) -> Output {
        self.apply(move |value| match value {
            Value::Array(mut items) if index < items.len() => Input::from(items.swap_remove(index)),
            _ => Input::from(Value::Null),
        })
    }
}

impl fmt::Display for Output {
    /// Outputs cannot be rendered directly; this renders a usage hint
    /// instead of the value, so no deferred or secret value ever leaks into
    /// a user-facing string by accident.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(
            "calling to_string on an output is not supported; the value of an output is not \
             available synchronously. To build a string from an output, use apply to transform \
             its resolved value, or concat/interpolate to assemble output strings",
        )
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Output")
            .field("deps", &self.fields.deps_now)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
enum ApplyOutcome {
    /// Unknown source during a preview; the callback never ran.
    Skipped,
    /// The callback ran and its result was lifted.
    Inner(Output),
    /// The callback (or the lift of its result) failed.
    CallbackFailed(OutputError),
}

#[derive(Clone)]
struct Lifted {
    value: Value,
    known: bool,
    secret: bool,
    all_deps: ResourceSet,
}

/// Lifts an arbitrary input into an [`Output`].
///
/// Concrete values lift to known, non-secret outputs; already-lifted
/// outputs pass through with their fields preserved; pendings chain; arrays
/// and records are walked element-wise, their children resolved
/// concurrently, and the result's metadata is the join of the children's
/// (all known, any secret, union of dependencies). A resolved value that
/// contains the unknown sentinel anywhere is not known.
///
/// # Errors
///
/// Fails with [`OutputError::CircularStructure`] if the synchronously
/// available portion of the structure refers back to an ancestor. A cycle
/// that only appears once pendings resolve surfaces through the returned
/// output's value and knownness instead.
pub fn output(input: impl Into<Input>) -> Result<Output, OutputError> {
    let input = input.into();
    input.check_cycles()?;
    Ok(lift_unchecked(input))
}

/// Lifts an input whose synchronous portion has already been cycle-checked.
pub(crate) fn lift_unchecked(input: Input) -> Output {
    if let Repr::Output(existing) = input.repr() {
        return existing.clone();
    }
    let deps_now = visible_deps(&input);
    let core = field(resolve_tree(input, HashSet::new()));
    Output::from_lift(deps_now, core)
}

/// Unions the direct dependencies reachable without awaiting anything.
///
/// Dependencies hidden behind unresolved pendings surface through the
/// transitive set once the structure resolves.
fn visible_deps(input: &Input) -> ResourceSet {
    match input.repr() {
        Repr::Concrete(_) => ResourceSet::new(),
        Repr::Output(output) => output.deps_now().cloned().unwrap_or_default(),
        Repr::Pending(pending) => pending
            .peek()
            .map_or_else(ResourceSet::new, |inner| visible_deps(&inner)),
        Repr::Array(items) => items
            .iter()
            .map(visible_deps)
            .fold(ResourceSet::new(), |acc, set| acc.union(&set)),
        Repr::Object(entries) => entries
            .values()
            .map(visible_deps)
            .fold(ResourceSet::new(), |acc, set| acc.union(&set)),
    }
}

/// Resolves an input tree to its combined value and joined metadata.
///
/// `path` carries the identities of the nodes between the root and this
/// one; revisiting one of them means the resolved structure refers back to
/// an ancestor. Sibling branches resolve concurrently, each with its own
/// copy of the path, so sharing a node across branches stays legal.
fn resolve_tree(
    input: Input,
    mut path: HashSet<usize>,
) -> BoxFuture<'static, Result<Lifted, OutputError>> {
    Box::pin(async move {
        match input.repr() {
            Repr::Concrete(value) => Ok(Lifted {
                known: !value.contains_unknown(),
                value: value.clone(),
                secret: false,
                all_deps: ResourceSet::new(),
            }),
            Repr::Output(output) => {
                let value = output.value_future().await?;
                let known = output.known_future().await? && !value.contains_unknown();
                let secret = output.secret_future().await?;
                let all_deps = output.all_deps_future().await?;
                Ok(Lifted {
                    value,
                    known,
                    secret,
                    all_deps,
                })
            }
            Repr::Pending(pending) => {
                if !path.insert(input.node_id()) {
                    return Err(OutputError::CircularStructure);
                }
                let inner = pending.wait().await?;
                resolve_tree(inner, path).await
            }
            Repr::Array(items) => {
                if !path.insert(input.node_id()) {
                    return Err(OutputError::CircularStructure);
                }
                let children = future::try_join_all(
                    items
                        .iter()
                        .map(|item| resolve_tree(item.clone(), path.clone())),
                )
                .await?;

                let mut values = Vec::with_capacity(children.len());
                let mut known = true;
                let mut secret = false;
                let mut all_deps = ResourceSet::new();
                for child in children {
                    known &= child.known;
                    secret |= child.secret;
                    all_deps = all_deps.union(&child.all_deps);
                    values.push(child.value);
                }
                Ok(Lifted {
                    value: Value::Array(values),
                    known,
                    secret,
                    all_deps,
                })
            }
            Repr::Object(entries) => {
                if !path.insert(input.node_id()) {
                    return Err(OutputError::CircularStructure);
                }
                let children =
                    future::try_join_all(entries.iter().map(|(key, item)| {
                        let key = key.clone();
                        let child = resolve_tree(item.clone(), path.clone());
                        async move { child.await.map(|lifted| (key, lifted)) }
                    }))
                    .await?;

                let mut values = std::collections::BTreeMap::new();
                let mut known = true;
                let mut secret = false;
                let mut all_deps = ResourceSet::new();
                for (key, child) in children {
                    known &= child.known;
                    secret |= child.secret;
                    all_deps = all_deps.union(&child.all_deps);
                    values.insert(key, child.value);
                }
                Ok(Lifted {
                    value: Value::Object(values),
                    known,
                    secret,
                    all_deps,
                })
            }
        }
    })
}
