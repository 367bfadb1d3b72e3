//! Entity identity and lifecycle.
//!
//! An [`Entity`] is an opaque handle naming a bundle of components; all of its
//! state lives in the component arrays, indexed by the handle. The [`Manager`]
//! hands out fresh IDs first and only recycles destroyed IDs (FIFO, through a
//! dead pool) once the fresh ID space is exhausted, so a destroyed handle does
//! not come straight back with stale meaning attached.

use crossbeam::queue::SegQueue;
use log::warn;

use crate::ecs::{Error, Signature};

/// Maximum number of simultaneously live entities. Creation past this cap
/// fails with [`Error::TooManyEntities`].
pub const MAX_ENTITIES: usize = 2500;

/// An entity identifier. Unique among live entities; recycled after
/// destruction once the fresh ID space has been used up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Entity(u32);

impl Entity {
    /// Construct an entity handle from a raw id value.
    #[inline]
    pub(crate) const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the index of this entity if it were to live in indexable storage (e.g. Vec)
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Allocates and recycles entity IDs and stores each entity's component
/// signature. Destroyed IDs go into a FIFO dead pool and are only reused after
/// all [`MAX_ENTITIES`] fresh IDs have been handed out at least once.
pub(crate) struct Manager {
    /// Pool of destroyed IDs available for reuse.
    dead_pool: SegQueue<Entity>,

    /// Next fresh ID to allocate.
    next_id: u32,

    /// Liveness per entity index. Grows on demand up to `MAX_ENTITIES`.
    alive: Vec<bool>,

    /// Component signature per entity index. Grows alongside `alive`.
    signatures: Vec<Signature>,

    /// Number of currently live entities.
    living_count: usize,
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

impl Manager {
    pub fn new() -> Self {
        Self {
            dead_pool: SegQueue::new(),
            next_id: 0,
            alive: Vec::new(),
            signatures: Vec::new(),
            living_count: 0,
        }
    }

    /// Allocate an entity with an all-zero signature.
    pub fn create(&mut self) -> Result<Entity, Error> {
        if self.living_count >= MAX_ENTITIES {
            return Err(Error::TooManyEntities);
        }

        // Fresh IDs first; the dead pool only feeds allocation once the whole
        // ID space has been handed out, so destroyed IDs stay dead as long as
        // possible.
        let entity = if (self.next_id as usize) < MAX_ENTITIES {
            let entity = Entity::new(self.next_id);
            self.next_id += 1;
            entity
        } else {
            let Some(entity) = self.dead_pool.pop() else {
                return Err(Error::TooManyEntities);
            };
            entity
        };

        self.ensure_capacity(entity.index());
        self.alive[entity.index()] = true;
        self.signatures[entity.index()].reset();
        self.living_count += 1;

        Ok(entity)
    }

    /// Destroy an entity: reset its signature and queue its ID for reuse.
    /// Destroying a dead or never-allocated entity is rejected, not ignored.
    pub fn destroy(&mut self, entity: Entity) -> Result<(), Error> {
        if !self.is_alive(entity) {
            warn!("attempted to destroy entity {entity:?} which is not alive");
            return Err(Error::EntityNotAlive(entity));
        }

        self.signatures[entity.index()].reset();
        self.alive[entity.index()] = false;
        self.living_count -= 1;
        self.dead_pool.push(entity);

        Ok(())
    }

    /// Whether the entity is currently alive.
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.alive.get(entity.index()).copied().unwrap_or(false)
    }

    /// The entity's component signature.
    ///
    /// # Panics
    /// If the entity is not alive.
    pub fn signature(&self, entity: Entity) -> &Signature {
        assert!(
            self.is_alive(entity),
            "requested signature of entity {entity:?} which is not alive"
        );
        &self.signatures[entity.index()]
    }

    /// Overwrite the entity's component signature. Used by the facade's
    /// add/remove paths and by entity cloning.
    ///
    /// # Panics
    /// If the entity is not alive.
    pub fn set_signature(&mut self, entity: Entity, signature: Signature) {
        assert!(
            self.is_alive(entity),
            "set signature of entity {entity:?} which is not alive"
        );
        self.signatures[entity.index()] = signature;
    }

    /// Number of currently live entities.
    pub fn living_count(&self) -> usize {
        self.living_count
    }

    /// Hard reset: every entity is discarded and the ID space starts over.
    pub fn reset(&mut self) {
        self.dead_pool = SegQueue::new();
        self.next_id = 0;
        self.alive.clear();
        self.signatures.clear();
        self.living_count = 0;
    }

    fn ensure_capacity(&mut self, index: usize) {
        if index >= self.alive.len() {
            self.alive.resize(index + 1, false);
            self.signatures.resize_with(index + 1, Signature::empty);
        }
    }
}
