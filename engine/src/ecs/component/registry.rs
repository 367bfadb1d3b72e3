use std::{
    any::TypeId,
    sync::atomic::{AtomicU32, Ordering},
};

use dashmap::DashMap;

use crate::ecs::{Error, component::Component, component::Id, component::MAX_COMPONENTS};

/// The component type registry. Assigns each component type a dense [`Id`] on
/// first registration and answers `TypeId -> Id` lookups.
///
/// Lookups are lock-free reads via `DashMap`; registration locks only a single
/// shard. Registration is idempotent — registering the same type twice returns
/// the existing identifier — and fails with [`Error::TooManyComponentTypes`]
/// once [`MAX_COMPONENTS`] identifiers have been handed out, since signatures
/// are fixed-width and cannot represent types past the cap.
pub struct Registry {
    /// Map from TypeId to component Id.
    type_map: DashMap<TypeId, Id>,

    /// Next available component identifier.
    next_id: AtomicU32,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create a new component type registry.
    #[inline]
    pub fn new() -> Self {
        Self {
            type_map: DashMap::new(),
            next_id: AtomicU32::new(0),
        }
    }

    /// Register a component type and get its unique identifier.
    ///
    /// If the type is already registered this returns the existing ID.
    /// Otherwise the next dense ID is assigned, unless the type table is full.
    pub fn register<C: Component>(&self) -> Result<Id, Error> {
        let type_id = TypeId::of::<C>();

        // Fast path: already registered (lock-free read)
        if let Some(id) = self.type_map.get(&type_id) {
            return Ok(*id);
        }

        // Slow path: register through the entry API so two callers racing on
        // the same type cannot both allocate an ID.
        self.type_map
            .entry(type_id)
            .or_try_insert_with(|| {
                let value = self.next_id.fetch_add(1, Ordering::Relaxed);
                if value as usize >= MAX_COMPONENTS {
                    return Err(Error::TooManyComponentTypes);
                }
                Ok(Id::new(value))
            })
            .map(|entry| *entry.value())
    }

    /// Get the component ID for type `C`, if registered.
    #[inline]
    pub fn get<C: Component>(&self) -> Option<Id> {
        self.type_map.get(&TypeId::of::<C>()).map(|entry| *entry.value())
    }

    /// Number of registered component types.
    #[inline]
    pub fn len(&self) -> usize {
        self.type_map.len()
    }

    /// Whether no component types are registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.type_map.is_empty()
    }
}
