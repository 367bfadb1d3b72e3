use std::collections::HashMap;

use crate::ecs::component::{Array, Component, Id, Registry, Storage};
use crate::ecs::entity::Entity;
use crate::ecs::Error;

/// Owns one packed [`Array<T>`] per registered component type, behind
/// type-erased [`Storage`] trait objects, and routes typed add/remove/get
/// calls to the right array. Entity destruction and cloning are broadcast to
/// every array through the trait object hooks.
pub(crate) struct Manager {
    registry: Registry,
    storages: HashMap<Id, Box<dyn Storage>>,
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

impl Manager {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            storages: HashMap::new(),
        }
    }

    /// Register a component type, creating its backing array. Idempotent.
    pub fn register<T: Component>(&mut self) -> Result<Id, Error> {
        let id = self.registry.register::<T>()?;
        self.storages
            .entry(id)
            .or_insert_with(|| Box::new(Array::<T>::new()));
        Ok(id)
    }

    /// The component type ID for `T`.
    ///
    /// # Panics
    /// If `T` was never registered.
    pub fn id_of<T: Component>(&self) -> Id {
        self.registry.get::<T>().unwrap_or_else(|| {
            panic!(
                "component type {} not registered before use",
                std::any::type_name::<T>()
            )
        })
    }

    /// Add a component to an entity.
    ///
    /// # Panics
    /// If `T` is unregistered, or the entity already has a `T`.
    pub fn add<T: Component>(&mut self, entity: Entity, value: T) {
        self.array_mut::<T>().insert(entity, value);
    }

    /// Remove and return an entity's component.
    ///
    /// # Panics
    /// If `T` is unregistered or the entity has no `T`. Callers are expected
    /// to know whether the component exists.
    pub fn remove<T: Component>(&mut self, entity: Entity) -> T {
        self.array_mut::<T>().remove(entity)
    }

    /// Borrow an entity's component.
    ///
    /// # Panics
    /// If `T` is unregistered or the entity has no `T`.
    pub fn get<T: Component>(&self, entity: Entity) -> &T {
        self.array::<T>().get(entity)
    }

    /// Mutably borrow an entity's component.
    ///
    /// # Panics
    /// If `T` is unregistered or the entity has no `T`.
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> &mut T {
        self.array_mut::<T>().get_mut(entity)
    }

    /// Whether the entity has a `T`.
    ///
    /// # Panics
    /// If `T` was never registered.
    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.array::<T>().try_get(entity).is_some()
    }

    /// Broadcast an entity's destruction to every registered array so each can
    /// purge it. Each purge is O(1) via the array's index maps.
    pub fn entity_destroyed(&mut self, entity: Entity) {
        for storage in self.storages.values_mut() {
            storage.entity_destroyed(entity);
        }
    }

    /// Copy every component present on `src` onto `dst`. The per-array clone
    /// hook closes this over all registered types, so entity cloning needs no
    /// hand-maintained per-type list.
    pub fn clone_components(&mut self, src: Entity, dst: Entity) {
        for storage in self.storages.values_mut() {
            storage.clone_into(src, dst);
        }
    }

    /// Drop all component data while keeping the registered type table. Used
    /// on scene reload.
    pub fn clear(&mut self) {
        for storage in self.storages.values_mut() {
            storage.clear();
        }
    }

    /// The typed array for `T`.
    fn array<T: Component>(&self) -> &Array<T> {
        let id = self.id_of::<T>();
        self.storages[&id]
            .as_any()
            .downcast_ref::<Array<T>>()
            .expect("storage type mismatch for registered component")
    }

    /// The typed array for `T`, mutable.
    fn array_mut<T: Component>(&mut self) -> &mut Array<T> {
        let id = self.id_of::<T>();
        self.storages
            .get_mut(&id)
            .expect("storage missing for registered component")
            .as_any_mut()
            .downcast_mut::<Array<T>>()
            .expect("storage type mismatch for registered component")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Velocity {
        x: f32,
        y: f32,
    }

    fn entity(id: u32) -> Entity {
        Entity::new(id)
    }

    #[test]
    fn typed_routing() {
        // Given
        let mut manager = Manager::new();
        let pos_id = manager.register::<Position>().unwrap();
        let vel_id = manager.register::<Velocity>().unwrap();
        assert_ne!(pos_id, vel_id);

        // When
        manager.add(entity(0), Position { x: 1.0, y: 2.0 });
        manager.add(entity(0), Velocity { x: 0.5, y: 0.0 });
        manager.add(entity(1), Position { x: 9.0, y: 9.0 });

        // Then - each call lands in its own type's array
        assert_eq!(*manager.get::<Position>(entity(0)), Position { x: 1.0, y: 2.0 });
        assert_eq!(*manager.get::<Velocity>(entity(0)), Velocity { x: 0.5, y: 0.0 });
        assert!(manager.has::<Position>(entity(1)));
        assert!(!manager.has::<Velocity>(entity(1)));

        // When
        let removed = manager.remove::<Position>(entity(0));

        // Then
        assert_eq!(removed, Position { x: 1.0, y: 2.0 });
        assert!(!manager.has::<Position>(entity(0)));
        assert!(manager.has::<Velocity>(entity(0)));
    }

    #[test]
    fn register_is_idempotent() {
        // Given
        let mut manager = Manager::new();
        let first = manager.register::<Position>().unwrap();
        manager.add(entity(0), Position { x: 1.0, y: 1.0 });

        // When - re-registering an in-use type
        let second = manager.register::<Position>().unwrap();

        // Then - same ID, data untouched
        assert_eq!(first, second);
        assert!(manager.has::<Position>(entity(0)));
    }

    #[test]
    fn entity_destroyed_broadcasts_to_all_arrays() {
        // Given
        let mut manager = Manager::new();
        manager.register::<Position>().unwrap();
        manager.register::<Velocity>().unwrap();
        manager.add(entity(3), Position { x: 0.0, y: 0.0 });
        manager.add(entity(3), Velocity { x: 1.0, y: 1.0 });
        manager.add(entity(4), Position { x: 5.0, y: 5.0 });

        // When
        manager.entity_destroyed(entity(3));

        // Then
        assert!(!manager.has::<Position>(entity(3)));
        assert!(!manager.has::<Velocity>(entity(3)));
        assert!(manager.has::<Position>(entity(4)));
    }

    #[test]
    fn clone_components_copies_every_present_type() {
        // Given
        let mut manager = Manager::new();
        manager.register::<Position>().unwrap();
        manager.register::<Velocity>().unwrap();
        manager.add(entity(0), Position { x: 3.0, y: 4.0 });
        // entity 0 has no Velocity

        // When
        manager.clone_components(entity(0), entity(1));

        // Then
        assert_eq!(*manager.get::<Position>(entity(1)), Position { x: 3.0, y: 4.0 });
        assert!(!manager.has::<Velocity>(entity(1)));
    }

    #[test]
    fn clear_keeps_type_table() {
        // Given
        let mut manager = Manager::new();
        let pos_id = manager.register::<Position>().unwrap();
        manager.add(entity(0), Position { x: 1.0, y: 1.0 });

        // When
        manager.clear();

        // Then - data gone, registration (and its ID) intact
        assert!(!manager.has::<Position>(entity(0)));
        assert_eq!(manager.id_of::<Position>(), pos_id);
        manager.add(entity(0), Position { x: 2.0, y: 2.0 });
        assert!(manager.has::<Position>(entity(0)));
    }

    #[test]
    #[should_panic(expected = "not registered before use")]
    fn unregistered_access_panics() {
        let manager = Manager::new();
        manager.get::<Position>(entity(0));
    }
}
