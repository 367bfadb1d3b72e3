//! Component types, identifiers, and signatures.
//!
//! A component is a plain data record attached to an entity. Each component
//! type is assigned a dense [`Id`] on first registration, and every entity
//! (and every system) carries a [`Signature`] — a fixed-width bitset with one
//! bit per registered component type. Signature comparison is how entities are
//! routed to the systems interested in them.

mod array;
mod manager;
mod registry;

pub(crate) use array::{Array, Storage};
pub(crate) use manager::Manager;
pub use registry::Registry;

use fixedbitset::FixedBitSet;

/// Upper bound on distinct component types. Signatures are sized to this, so
/// raising it trades a little per-entity memory for more component types.
/// Registration past the cap fails loudly rather than wrapping.
pub const MAX_COMPONENTS: usize = 32;

/// A component type identifier. Dense, assigned at first registration, and
/// stable for the lifetime of the process.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(u32);

impl Id {
    /// Construct a new component Id from a raw u32 value.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the index of this component if it were to live in indexable storage (e.g. Vec)
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// A trait representing a component in the ECS (Entity Component System).
///
/// This only sets the required trait bounds for a type to be used as a
/// component: plain data, cloneable (entity cloning copies component values),
/// and owned. Every such type is a component; no derive is needed.
pub trait Component: Clone + 'static {}

impl<T: Clone + 'static> Component for T {}

/// A fixed-width bitset recording which component types an entity owns, or
/// which types a system requires. Bit `i` corresponds to the component type
/// with [`Id`] `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    bits: FixedBitSet,
}

impl Signature {
    /// An all-zero signature: owns nothing, requires nothing.
    pub fn empty() -> Self {
        Self {
            bits: FixedBitSet::with_capacity(MAX_COMPONENTS),
        }
    }

    /// Build a signature with the given component type bits set.
    pub fn from_ids(ids: impl IntoIterator<Item = Id>) -> Self {
        let mut signature = Self::empty();
        for id in ids {
            signature.set(id);
        }
        signature
    }

    /// Set the bit for a component type.
    #[inline]
    pub fn set(&mut self, id: Id) {
        self.bits.insert(id.index());
    }

    /// Clear the bit for a component type.
    #[inline]
    pub fn clear(&mut self, id: Id) {
        self.bits.set(id.index(), false);
    }

    /// Whether the bit for a component type is set.
    #[inline]
    pub fn contains(&self, id: Id) -> bool {
        self.bits.contains(id.index())
    }

    /// Whether every bit of `required` is also set in `self`. This is the
    /// system-membership test: an entity matches a system iff its signature
    /// contains all of the system's required bits.
    #[inline]
    pub fn contains_all(&self, required: &Signature) -> bool {
        required.bits.is_subset(&self.bits)
    }

    /// Clear every bit.
    #[inline]
    pub fn reset(&mut self) {
        self.bits.clear();
    }

    /// Whether no bits are set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits.is_clear()
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_set_and_clear() {
        // Given
        let mut signature = Signature::empty();
        let position = Id::new(0);
        let velocity = Id::new(3);

        // When
        signature.set(position);
        signature.set(velocity);

        // Then
        assert!(signature.contains(position));
        assert!(signature.contains(velocity));
        assert!(!signature.contains(Id::new(1)));

        // When
        signature.clear(position);

        // Then
        assert!(!signature.contains(position));
        assert!(signature.contains(velocity));
    }

    #[test]
    fn signature_subset_matching() {
        // Given - an entity owning {0, 1, 2} and systems requiring subsets
        let entity = Signature::from_ids([Id::new(0), Id::new(1), Id::new(2)]);
        let movement = Signature::from_ids([Id::new(0), Id::new(1)]);
        let render = Signature::from_ids([Id::new(2), Id::new(5)]);

        // Then
        assert!(entity.contains_all(&movement));
        assert!(!entity.contains_all(&render));

        // Then - the empty signature matches everything
        assert!(entity.contains_all(&Signature::empty()));
        assert!(Signature::empty().contains_all(&Signature::empty()));
    }

    #[test]
    fn signature_reset() {
        // Given
        let mut signature = Signature::from_ids([Id::new(4), Id::new(7)]);
        assert!(!signature.is_empty());

        // When
        signature.reset();

        // Then
        assert!(signature.is_empty());
        assert!(!signature.contains(Id::new(4)));
    }
}
