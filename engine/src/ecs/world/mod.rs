//! The ECS facade.
//!
//! [`World`] composes the entity, component, and system managers behind one
//! API — the single entry point gameplay code uses to create and destroy
//! entities, attach and query components, and register and drive systems.
//! Every component add/remove flows through here so the entity's signature and
//! each system's membership set stay in sync.

use log::info;

use crate::ecs::{Component, Entity, Error, Signature, System, component, entity, system};

/// The ECS facade. Owned by the application; all mutation is `&mut self` on
/// the main loop — the ECS is single-threaded by contract.
#[derive(Default)]
pub struct World {
    entities: entity::Manager,
    components: component::Manager,
    systems: system::Manager,
}

impl World {
    pub fn new() -> Self {
        Self {
            entities: entity::Manager::new(),
            components: component::Manager::new(),
            systems: system::Manager::new(),
        }
    }

    // --- Entities ---

    /// Create an entity with an all-zero signature.
    pub fn create_entity(&mut self) -> Result<Entity, Error> {
        self.entities.create()
    }

    /// Destroy an entity: its signature is cleared, every component array
    /// purges it, and every system's set drops it — in that order, so no
    /// system can observe a half-destroyed entity. Destroying a dead entity
    /// is rejected with [`Error::EntityNotAlive`].
    pub fn destroy_entity(&mut self, entity: Entity) -> Result<(), Error> {
        self.entities.destroy(entity)?;
        self.components.entity_destroyed(entity);
        self.systems.entity_destroyed(entity);
        Ok(())
    }

    /// Allocate a new entity carrying a copy of every component present on
    /// `entity`, with an identical signature. The copies are independent of
    /// later mutation to the source.
    pub fn clone_entity(&mut self, entity: Entity) -> Result<Entity, Error> {
        if !self.entities.is_alive(entity) {
            return Err(Error::EntityNotAlive(entity));
        }
        let cloned = self.entities.create()?;
        self.components.clone_components(entity, cloned);
        let signature = self.entities.signature(entity).clone();
        self.entities.set_signature(cloned, signature.clone());
        self.systems.entity_signature_changed(cloned, &signature);
        Ok(cloned)
    }

    /// Hard reset, used on scene unload: discards every entity, all component
    /// data, and all system membership — but keeps the registered component
    /// and system type tables.
    pub fn reload_entities(&mut self) {
        info!("reloading world: discarding all entities, keeping registered type tables");
        self.entities.reset();
        self.components.clear();
        self.systems.clear_entities();
    }

    /// Whether the entity is currently alive.
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// The entity's component signature.
    ///
    /// # Panics
    /// If the entity is not alive.
    pub fn entity_signature(&self, entity: Entity) -> &Signature {
        self.entities.signature(entity)
    }

    /// Number of currently live entities.
    pub fn living_entity_count(&self) -> usize {
        self.entities.living_count()
    }

    // --- Components ---

    /// Register a component type. Idempotent; fails once the fixed-width
    /// signature can represent no more types.
    pub fn register_component<T: Component>(&mut self) -> Result<component::Id, Error> {
        self.components.register::<T>()
    }

    /// The dense ID assigned to component type `T`.
    ///
    /// # Panics
    /// If `T` was never registered.
    pub fn component_id<T: Component>(&self) -> component::Id {
        self.components.id_of::<T>()
    }

    /// Attach a component to an entity, set the matching signature bit, and
    /// recompute system membership.
    ///
    /// # Panics
    /// If the entity is not alive, `T` is unregistered, or the entity already
    /// has a `T` (a component type is unique per entity).
    pub fn add_component<T: Component>(&mut self, entity: Entity, value: T) {
        assert!(
            self.entities.is_alive(entity),
            "cannot add component to entity {entity:?} which is not alive"
        );
        self.components.add(entity, value);

        let mut signature = self.entities.signature(entity).clone();
        signature.set(self.components.id_of::<T>());
        self.entities.set_signature(entity, signature.clone());

        self.systems.entity_signature_changed(entity, &signature);
    }

    /// Detach and return an entity's component, clear the signature bit, and
    /// recompute system membership.
    ///
    /// # Panics
    /// If the entity is not alive, `T` is unregistered, or the entity has no
    /// `T`.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> T {
        assert!(
            self.entities.is_alive(entity),
            "cannot remove component from entity {entity:?} which is not alive"
        );
        let value = self.components.remove::<T>(entity);

        let mut signature = self.entities.signature(entity).clone();
        signature.clear(self.components.id_of::<T>());
        self.entities.set_signature(entity, signature.clone());

        self.systems.entity_signature_changed(entity, &signature);
        value
    }

    /// Borrow an entity's component.
    ///
    /// # Panics
    /// If `T` is unregistered or the entity has no `T`.
    pub fn get_component<T: Component>(&self, entity: Entity) -> &T {
        self.components.get::<T>(entity)
    }

    /// Mutably borrow an entity's component.
    ///
    /// # Panics
    /// If `T` is unregistered or the entity has no `T`.
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> &mut T {
        self.components.get_mut::<T>(entity)
    }

    /// Whether the entity is alive and has a `T`.
    ///
    /// # Panics
    /// If `T` was never registered.
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity) && self.components.has::<T>(entity)
    }

    // --- Systems ---

    /// Register a system instance. One per system type.
    ///
    /// # Panics
    /// If a system of this type is already registered.
    pub fn register_system<S: System>(&mut self, system: S) {
        self.systems.register(system);
    }

    /// Declare the component signature a system requires.
    ///
    /// # Panics
    /// If the system is not registered.
    pub fn set_system_signature<S: System>(&mut self, signature: Signature) {
        self.systems.set_signature::<S>(signature);
    }

    /// Borrow a registered system instance.
    ///
    /// # Panics
    /// If the system is not registered.
    pub fn get_system<S: System>(&self) -> &S {
        self.systems.get::<S>()
    }

    /// Mutably borrow a registered system instance.
    ///
    /// # Panics
    /// If the system is not registered.
    pub fn get_system_mut<S: System>(&mut self) -> &mut S {
        self.systems.get_mut::<S>()
    }

    /// The set of entities currently matching a system's signature.
    pub fn system_entities<S: System>(&self) -> &std::collections::BTreeSet<Entity> {
        self.systems.entities_of::<S>()
    }

    /// Drive a system's one-time [`System::init`].
    pub fn init_system<S: System>(&mut self) {
        let mut boxed = self.systems.take::<S>();
        let system = boxed
            .downcast_mut::<S>()
            .expect("system entry type mismatch");
        system.init(self);
        self.systems.restore::<S>(boxed);
    }

    /// Drive one frame of a system's [`System::update`] over a snapshot of its
    /// matching entities. The instance is checked out for the duration so the
    /// system can receive `&mut World` without aliasing itself.
    pub fn run_system<S: System>(&mut self) {
        let mut boxed = self.systems.take::<S>();
        let entities = self.systems.entities_snapshot::<S>();
        let system = boxed
            .downcast_mut::<S>()
            .expect("system entry type mismatch");
        system.update(self, &entities);
        self.systems.restore::<S>(boxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Velocity {
        x: f32,
        y: f32,
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Name(String);

    #[derive(Default)]
    struct MoveSystem {
        frames: u32,
    }

    impl System for MoveSystem {
        fn update(&mut self, world: &mut World, entities: &BTreeSet<Entity>) {
            self.frames += 1;
            for &entity in entities {
                let velocity = *world.get_component::<Velocity>(entity);
                let position = world.get_component_mut::<Position>(entity);
                position.x += velocity.x;
                position.y += velocity.y;
            }
        }
    }

    /// Wire up a world with Position, Velocity, and a MoveSystem requiring
    /// both.
    fn movement_world() -> World {
        let mut world = World::new();
        world.register_component::<Position>().unwrap();
        world.register_component::<Velocity>().unwrap();
        world.register_system(MoveSystem::default());
        let signature = Signature::from_ids([
            world.component_id::<Position>(),
            world.component_id::<Velocity>(),
        ]);
        world.set_system_signature::<MoveSystem>(signature);
        world
    }

    /// The membership invariant: an entity is in MoveSystem's set iff its
    /// signature contains the system's.
    fn assert_membership_consistent(world: &World, entities: &[Entity]) {
        for &entity in entities {
            if !world.is_alive(entity) {
                assert!(!world.system_entities::<MoveSystem>().contains(&entity));
                continue;
            }
            let matches = world.has_component::<Position>(entity)
                && world.has_component::<Velocity>(entity);
            assert_eq!(
                world.system_entities::<MoveSystem>().contains(&entity),
                matches,
                "membership out of sync for {entity:?}"
            );
        }
    }

    #[test]
    fn move_system_scenario() {
        // Given
        let mut world = movement_world();

        // When - A gets both components
        let a = world.create_entity().unwrap();
        world.add_component(a, Position { x: 0.0, y: 0.0 });
        world.add_component(a, Velocity { x: 1.0, y: 1.0 });

        // Then
        assert!(world.system_entities::<MoveSystem>().contains(&a));

        // When - B gets only Position
        let b = world.create_entity().unwrap();
        world.add_component(b, Position { x: 5.0, y: 5.0 });

        // Then
        assert!(!world.system_entities::<MoveSystem>().contains(&b));

        // When - A is destroyed
        world.destroy_entity(a).unwrap();

        // Then
        assert!(!world.system_entities::<MoveSystem>().contains(&a));
        assert!(!world.has_component::<Position>(a));
    }

    #[test]
    #[should_panic(expected = "non-existent component")]
    fn get_component_after_destroy_panics() {
        let mut world = movement_world();
        let a = world.create_entity().unwrap();
        world.add_component(a, Position { x: 0.0, y: 0.0 });
        world.destroy_entity(a).unwrap();
        world.get_component::<Position>(a);
    }

    #[test]
    fn membership_stays_consistent_through_mutation() {
        // Given
        let mut world = movement_world();
        let mut entities = Vec::new();

        // When/Then - the invariant holds after every structural change
        for i in 0..10 {
            let e = world.create_entity().unwrap();
            world.add_component(e, Position { x: i as f32, y: 0.0 });
            if i % 2 == 0 {
                world.add_component(e, Velocity { x: 1.0, y: 0.0 });
            }
            entities.push(e);
            assert_membership_consistent(&world, &entities);
        }

        world.remove_component::<Velocity>(entities[0]);
        assert_membership_consistent(&world, &entities);

        world.add_component(entities[1], Velocity { x: 2.0, y: 2.0 });
        assert_membership_consistent(&world, &entities);

        world.destroy_entity(entities[2]).unwrap();
        assert_membership_consistent(&world, &entities);
    }

    #[test]
    fn run_system_moves_matching_entities() {
        // Given
        let mut world = movement_world();
        let mover = world.create_entity().unwrap();
        world.add_component(mover, Position { x: 0.0, y: 0.0 });
        world.add_component(mover, Velocity { x: 1.0, y: 2.0 });
        let idle = world.create_entity().unwrap();
        world.add_component(idle, Position { x: 9.0, y: 9.0 });

        // When
        world.run_system::<MoveSystem>();
        world.run_system::<MoveSystem>();

        // Then - only the matching entity moved
        assert_eq!(
            *world.get_component::<Position>(mover),
            Position { x: 2.0, y: 4.0 }
        );
        assert_eq!(
            *world.get_component::<Position>(idle),
            Position { x: 9.0, y: 9.0 }
        );
        assert_eq!(world.get_system::<MoveSystem>().frames, 2);
    }

    #[test]
    fn system_may_destroy_entities_during_update() {
        // Given - a system that destroys everything it matches
        struct ReaperSystem;
        impl System for ReaperSystem {
            fn update(&mut self, world: &mut World, entities: &BTreeSet<Entity>) {
                for &entity in entities {
                    world.destroy_entity(entity).unwrap();
                }
            }
        }

        let mut world = World::new();
        world.register_component::<Position>().unwrap();
        world.register_system(ReaperSystem);
        world
            .set_system_signature::<ReaperSystem>(Signature::from_ids([
                world.component_id::<Position>()
            ]));

        for i in 0..5 {
            let e = world.create_entity().unwrap();
            world.add_component(e, Position { x: i as f32, y: 0.0 });
        }

        // When
        world.run_system::<ReaperSystem>();

        // Then - membership and liveness both emptied
        assert_eq!(world.living_entity_count(), 0);
        assert!(world.system_entities::<ReaperSystem>().is_empty());
    }

    #[test]
    fn destroy_cleans_everything() {
        // Given
        let mut world = movement_world();
        world.register_component::<Name>().unwrap();
        let e = world.create_entity().unwrap();
        world.add_component(e, Position { x: 1.0, y: 1.0 });
        world.add_component(e, Velocity { x: 1.0, y: 1.0 });
        world.add_component(e, Name("player".into()));

        // When
        world.destroy_entity(e).unwrap();

        // Then
        assert!(!world.is_alive(e));
        assert!(!world.has_component::<Position>(e));
        assert!(!world.has_component::<Velocity>(e));
        assert!(!world.has_component::<Name>(e));
        assert!(world.system_entities::<MoveSystem>().is_empty());

        // Then - the next entity created is not the destroyed ID resurrected
        let next = world.create_entity().unwrap();
        assert_ne!(next, e);
    }

    #[test]
    fn destroying_dead_entity_is_rejected() {
        // Given
        let mut world = World::new();
        let e = world.create_entity().unwrap();
        world.destroy_entity(e).unwrap();

        // When/Then
        assert_eq!(world.destroy_entity(e), Err(Error::EntityNotAlive(e)));
    }

    #[test]
    fn clone_entity_copies_signature_and_components() {
        // Given
        let mut world = movement_world();
        world.register_component::<Name>().unwrap();
        let original = world.create_entity().unwrap();
        world.add_component(original, Position { x: 3.0, y: 4.0 });
        world.add_component(original, Velocity { x: 1.0, y: 0.0 });
        world.add_component(original, Name("goblin".into()));

        // When
        let cloned = world.clone_entity(original).unwrap();

        // Then - identical signature, equal component values, and membership
        assert_ne!(cloned, original);
        assert_eq!(
            world.entity_signature(cloned),
            world.entity_signature(original)
        );
        assert_eq!(
            world.get_component::<Position>(cloned),
            world.get_component::<Position>(original)
        );
        assert_eq!(*world.get_component::<Name>(cloned), Name("goblin".into()));
        assert!(world.system_entities::<MoveSystem>().contains(&cloned));

        // When - mutating the original afterwards
        world.get_component_mut::<Position>(original).x = 99.0;
        world.remove_component::<Velocity>(original);

        // Then - the clone is independent
        assert_eq!(
            *world.get_component::<Position>(cloned),
            Position { x: 3.0, y: 4.0 }
        );
        assert!(world.has_component::<Velocity>(cloned));
        assert!(world.system_entities::<MoveSystem>().contains(&cloned));
        assert!(!world.system_entities::<MoveSystem>().contains(&original));
    }

    #[test]
    fn clone_of_dead_entity_is_rejected() {
        // Given
        let mut world = movement_world();
        let e = world.create_entity().unwrap();
        world.destroy_entity(e).unwrap();

        // When/Then
        assert_eq!(world.clone_entity(e), Err(Error::EntityNotAlive(e)));
    }

    #[test]
    fn reload_discards_entities_but_keeps_type_tables() {
        // Given
        let mut world = movement_world();
        let pos_id = world.component_id::<Position>();
        let e = world.create_entity().unwrap();
        world.add_component(e, Position { x: 1.0, y: 1.0 });
        world.add_component(e, Velocity { x: 1.0, y: 1.0 });

        // When
        world.reload_entities();

        // Then - no entities, no data, no membership
        assert_eq!(world.living_entity_count(), 0);
        assert!(world.system_entities::<MoveSystem>().is_empty());

        // Then - registered tables survive: same component ID, system intact,
        // and the world is immediately usable again
        assert_eq!(world.component_id::<Position>(), pos_id);
        let fresh = world.create_entity().unwrap();
        world.add_component(fresh, Position { x: 0.0, y: 0.0 });
        world.add_component(fresh, Velocity { x: 1.0, y: 1.0 });
        assert!(world.system_entities::<MoveSystem>().contains(&fresh));
    }

    #[test]
    #[should_panic(expected = "more than once")]
    fn double_add_panics() {
        let mut world = World::new();
        world.register_component::<Position>().unwrap();
        let e = world.create_entity().unwrap();
        world.add_component(e, Position { x: 0.0, y: 0.0 });
        world.add_component(e, Position { x: 1.0, y: 1.0 });
    }

    #[test]
    #[should_panic(expected = "not alive")]
    fn add_component_to_dead_entity_panics() {
        let mut world = World::new();
        world.register_component::<Position>().unwrap();
        let e = world.create_entity().unwrap();
        world.destroy_entity(e).unwrap();
        world.add_component(e, Position { x: 0.0, y: 0.0 });
    }

    #[test]
    fn has_component_is_false_for_dead_entity() {
        // Given
        let mut world = World::new();
        world.register_component::<Position>().unwrap();
        let e = world.create_entity().unwrap();
        world.add_component(e, Position { x: 0.0, y: 0.0 });

        // When
        world.destroy_entity(e).unwrap();

        // Then
        assert!(!world.has_component::<Position>(e));
    }

    #[test]
    fn remove_component_returns_the_value() {
        // Given
        let mut world = movement_world();
        let e = world.create_entity().unwrap();
        world.add_component(e, Position { x: 7.0, y: 8.0 });
        world.add_component(e, Velocity { x: 0.0, y: 0.0 });
        assert!(world.system_entities::<MoveSystem>().contains(&e));

        // When
        let removed = world.remove_component::<Position>(e);

        // Then - value returned, signature bit cleared, membership dropped
        assert_eq!(removed, Position { x: 7.0, y: 8.0 });
        assert!(!world.has_component::<Position>(e));
        assert!(world.has_component::<Velocity>(e));
        assert!(!world.system_entities::<MoveSystem>().contains(&e));
    }
}
