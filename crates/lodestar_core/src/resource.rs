//! Opaque resource identities and immutable identity sets.
//!
//! The deferred-value core never inspects the resources whose construction
//! produced a value; it only carries their identities in sets so that a
//! downstream consumer can assemble a dependency graph. [`ResourceId`] is
//! the opaque identity and [`ResourceSet`] the immutable, cheaply clonable
//! set of them.

use core::fmt;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Opaque identity of a registered resource.
///
/// Identities are minted by the registration machinery (typically from a
/// URN) and treated as opaque tokens here. Internally uses `Arc<str>` for
/// cheap cloning (reference count bump only).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(Arc<str>);

impl ResourceId {
    /// Mints a fresh, globally unique resource identity.
    ///
    /// This is primarily useful for testing; production identities come from
    /// the registration machinery via [`ResourceId::from_urn`].
    #[must_use]
    pub fn fresh() -> Self {
        Self(nanoid::nanoid!().into())
    }

    /// Creates a resource identity from an externally assigned URN.
    #[must_use]
    pub fn from_urn(urn: impl Into<Arc<str>>) -> Self {
        Self(urn.into())
    }

    /// Returns the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An immutable set of resource identities.
///
/// Sets are shared by reference between outputs; deriving a new set always
/// allocates a new backing store rather than mutating an existing one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSet(Arc<BTreeSet<ResourceId>>);

impl ResourceSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set holding a single identity.
    #[must_use]
    pub fn singleton(id: ResourceId) -> Self {
        Self(Arc::new(BTreeSet::from([id])))
    }

    /// Returns the union of this set and another.
    ///
    /// When either side is empty the other is shared as-is.
    #[must_use]
    pub fn union(&self, other: &ResourceSet) -> ResourceSet {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        Self(Arc::new(self.0.iter().chain(other.0.iter()).cloned().collect()))
    }

    /// Returns the union of every set in the iterator.
    #[must_use]
    pub fn union_all<'a>(sets: impl IntoIterator<Item = &'a ResourceSet>) -> ResourceSet {
        sets.into_iter()
            .fold(ResourceSet::new(), |acc, set| acc.union(set))
    }

    /// Returns `true` if the identity is a member of this set.
    #[must_use]
    pub fn contains(&self, id: &ResourceId) -> bool {
        self.0.contains(id)
    }

    /// Returns `true` if every member of this set is also in `other`.
    #[must_use]
    pub fn is_subset(&self, other: &ResourceSet) -> bool {
        self.0.is_subset(&other.0)
    }

    /// Returns the number of identities in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the set holds no identities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the identities in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &ResourceId> {
        self.0.iter()
    }
}

impl FromIterator<ResourceId> for ResourceSet {
    fn from_iter<I: IntoIterator<Item = ResourceId>>(iter: I) -> Self {
        Self(Arc::new(iter.into_iter().collect()))
    }
}
