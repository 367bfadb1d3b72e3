use std::any::Any;
use std::collections::HashMap;

use crate::ecs::component::Component;
use crate::ecs::entity::Entity;

/// Type-erased view of a component array, letting the component manager hold
/// one storage per registered type behind a common trait object. The
/// `entity_destroyed` and `clone_into` hooks are how entity destruction and
/// cloning reach every array without knowing its concrete `T`.
pub(crate) trait Storage: Any {
    /// Purge the entity's component if it has one. O(1) via the index maps.
    fn entity_destroyed(&mut self, entity: Entity);

    /// Copy `src`'s component onto `dst`, if `src` has one. `dst` must not
    /// already have one.
    fn clone_into(&mut self, src: Entity, dst: Entity);

    /// Drop every stored component. Used on scene reload.
    fn clear(&mut self);

    /// Whether the entity has a component in this array.
    fn has(&self, entity: Entity) -> bool;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Packed storage for one component type.
///
/// Components live contiguously in `dense`; `entity_to_index` and
/// `index_to_entity` are mutual inverses over exactly the live entries.
/// Removal swaps the last element into the freed slot, so insert, remove, and
/// lookup are all O(1) and the array never holds tombstones. Indices are not
/// stable across removals.
pub(crate) struct Array<T: Component> {
    dense: Vec<T>,
    entity_to_index: HashMap<Entity, usize>,
    index_to_entity: Vec<Entity>,
}

impl<T: Component> Array<T> {
    pub fn new() -> Self {
        Self {
            dense: Vec::new(),
            entity_to_index: HashMap::new(),
            index_to_entity: Vec::new(),
        }
    }

    /// Insert a component for an entity.
    ///
    /// # Panics
    /// If the entity already has a component of this type. A component type is
    /// unique per entity; silently overwriting would hide double-initialization
    /// bugs in calling code.
    pub fn insert(&mut self, entity: Entity, value: T) {
        assert!(
            !self.entity_to_index.contains_key(&entity),
            "component added to entity {entity:?} more than once"
        );
        let index = self.dense.len();
        self.entity_to_index.insert(entity, index);
        self.index_to_entity.push(entity);
        self.dense.push(value);
    }

    /// Remove and return the entity's component, swapping the last element
    /// into the freed slot.
    ///
    /// # Panics
    /// If the entity has no component of this type.
    pub fn remove(&mut self, entity: Entity) -> T {
        let index = self
            .entity_to_index
            .remove(&entity)
            .unwrap_or_else(|| panic!("removing non-existent component from entity {entity:?}"));

        let last = self.dense.len() - 1;
        let value = self.dense.swap_remove(index);
        self.index_to_entity.swap_remove(index);

        // Re-point the moved entry, if the removed slot wasn't the last.
        if index != last {
            let moved = self.index_to_entity[index];
            self.entity_to_index.insert(moved, index);
        }

        value
    }

    /// Get the entity's component.
    ///
    /// # Panics
    /// If the entity has no component of this type. There is no implicit
    /// default construction.
    pub fn get(&self, entity: Entity) -> &T {
        self.try_get(entity)
            .unwrap_or_else(|| panic!("retrieving non-existent component for entity {entity:?}"))
    }

    /// Mutable variant of [`Array::get`].
    ///
    /// # Panics
    /// If the entity has no component of this type.
    pub fn get_mut(&mut self, entity: Entity) -> &mut T {
        match self.entity_to_index.get(&entity) {
            Some(&index) => &mut self.dense[index],
            None => panic!("retrieving non-existent component for entity {entity:?}"),
        }
    }

    /// Get the entity's component, or `None` if absent.
    pub fn try_get(&self, entity: Entity) -> Option<&T> {
        self.entity_to_index
            .get(&entity)
            .map(|&index| &self.dense[index])
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.dense.len()
    }
}

impl<T: Component> Storage for Array<T> {
    fn entity_destroyed(&mut self, entity: Entity) {
        if self.entity_to_index.contains_key(&entity) {
            self.remove(entity);
        }
    }

    fn clone_into(&mut self, src: Entity, dst: Entity) {
        if let Some(value) = self.try_get(src).cloned() {
            self.insert(dst, value);
        }
    }

    fn clear(&mut self) {
        self.dense.clear();
        self.entity_to_index.clear();
        self.index_to_entity.clear();
    }

    fn has(&self, entity: Entity) -> bool {
        self.entity_to_index.contains_key(&entity)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
