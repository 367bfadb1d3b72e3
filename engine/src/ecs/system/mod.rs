//! System registration and entity-set membership.
//!
//! A system is logic that runs once per frame over every entity matching its
//! declared component [`Signature`]. The [`Manager`] keeps one entry per
//! registered system type: the required signature, the set of currently
//! matching entities, and the boxed system instance itself. Membership is
//! recomputed in one place — [`Manager::entity_signature_changed`] — after
//! every component add/remove, trading some redundant set churn for a single,
//! obviously correct recomputation point.

use std::any::{Any, TypeId, type_name};
use std::collections::{BTreeSet, HashMap};

use crate::ecs::{Entity, Signature, world::World};

/// Per-frame logic over the entities matching a declared signature.
///
/// The owning application loop drives systems through
/// [`World::init_system`](crate::ecs::World::init_system) and
/// [`World::run_system`](crate::ecs::World::run_system), which pass the system
/// a snapshot of its matching-entity set along with the world. Structural
/// changes made during `update` (destroying entities, adding components) take
/// effect in the live membership sets immediately; the snapshot the system is
/// iterating is not retroactively edited.
pub trait System: 'static {
    /// One-time setup, driven by the owning loop before the first frame.
    fn init(&mut self, _world: &mut World) {}

    /// Per-frame work over the entities currently matching this system's
    /// signature.
    fn update(&mut self, world: &mut World, entities: &BTreeSet<Entity>);
}

/// A registered system: its required signature, its matching entities, and
/// the instance. `system` is `None` only while the instance is checked out by
/// a running `World::run_system` call.
struct Entry {
    signature: Signature,
    entities: BTreeSet<Entity>,
    system: Option<Box<dyn Any>>,
}

/// Tracks each registered system's required signature and keeps its membership
/// set in sync with entity signature changes.
#[derive(Default)]
pub(crate) struct Manager {
    entries: HashMap<TypeId, Entry>,
}

impl Manager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a system instance. One instance per system type.
    ///
    /// # Panics
    /// If a system of this type is already registered.
    pub fn register<S: System>(&mut self, system: S) {
        let previous = self.entries.insert(
            TypeId::of::<S>(),
            Entry {
                signature: Signature::empty(),
                entities: BTreeSet::new(),
                system: Some(Box::new(system)),
            },
        );
        assert!(
            previous.is_none(),
            "system {} registered more than once",
            type_name::<S>()
        );
    }

    /// Declare the signature a system requires. An unset signature is
    /// all-zero, which every entity's signature contains, so the system would
    /// match everything.
    ///
    /// # Panics
    /// If the system is not registered.
    pub fn set_signature<S: System>(&mut self, signature: Signature) {
        self.entry_mut::<S>().signature = signature;
    }

    /// Borrow a registered system instance.
    ///
    /// # Panics
    /// If the system is not registered, or is currently running.
    pub fn get<S: System>(&self) -> &S {
        self.entry::<S>()
            .system
            .as_ref()
            .unwrap_or_else(|| panic!("system {} is currently running", type_name::<S>()))
            .downcast_ref::<S>()
            .expect("system entry type mismatch")
    }

    /// Mutably borrow a registered system instance.
    ///
    /// # Panics
    /// If the system is not registered, or is currently running.
    pub fn get_mut<S: System>(&mut self) -> &mut S {
        self.entry_mut::<S>()
            .system
            .as_mut()
            .unwrap_or_else(|| panic!("system {} is currently running", type_name::<S>()))
            .downcast_mut::<S>()
            .expect("system entry type mismatch")
    }

    /// The set of entities currently matching the system's signature.
    ///
    /// # Panics
    /// If the system is not registered.
    pub fn entities_of<S: System>(&self) -> &BTreeSet<Entity> {
        &self.entry::<S>().entities
    }

    /// Clone the system's matching-entity set. `World::run_system` iterates
    /// this snapshot so the live set can keep changing under it.
    pub fn entities_snapshot<S: System>(&self) -> BTreeSet<Entity> {
        self.entry::<S>().entities.clone()
    }

    /// Check the system instance out for a `run_system` call.
    ///
    /// # Panics
    /// If the system is not registered or is already checked out (a system
    /// re-entrantly running itself).
    pub fn take<S: System>(&mut self) -> Box<dyn Any> {
        self.entry_mut::<S>()
            .system
            .take()
            .unwrap_or_else(|| panic!("system {} is already running", type_name::<S>()))
    }

    /// Return a checked-out system instance.
    pub fn restore<S: System>(&mut self, system: Box<dyn Any>) {
        self.entry_mut::<S>().system = Some(system);
    }

    /// The single membership recomputation point: for every registered system,
    /// the entity is in the set iff its new signature contains the system's.
    pub fn entity_signature_changed(&mut self, entity: Entity, signature: &Signature) {
        for entry in self.entries.values_mut() {
            if signature.contains_all(&entry.signature) {
                entry.entities.insert(entity);
            } else {
                entry.entities.remove(&entity);
            }
        }
    }

    /// Erase the entity from every system's set, unconditionally.
    pub fn entity_destroyed(&mut self, entity: Entity) {
        for entry in self.entries.values_mut() {
            entry.entities.remove(&entity);
        }
    }

    /// Empty every membership set while keeping registered systems and their
    /// signatures. Used on scene reload.
    pub fn clear_entities(&mut self) {
        for entry in self.entries.values_mut() {
            entry.entities.clear();
        }
    }

    fn entry<S: System>(&self) -> &Entry {
        self.entries
            .get(&TypeId::of::<S>())
            .unwrap_or_else(|| panic!("system {} used before registered", type_name::<S>()))
    }

    fn entry_mut<S: System>(&mut self) -> &mut Entry {
        self.entries
            .get_mut(&TypeId::of::<S>())
            .unwrap_or_else(|| panic!("system {} used before registered", type_name::<S>()))
    }
}
