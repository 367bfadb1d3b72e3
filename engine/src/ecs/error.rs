use crate::ecs::entity::Entity;

/// Recoverable ECS failures. These cover resource exhaustion and rejected
/// handle reuse; API misuse (unregistered types, missing components,
/// double-adds) panics instead, since those are programmer errors the caller
/// cannot meaningfully handle at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The live-entity cap was reached.
    #[error("too many entities in existence (limit {})", crate::ecs::MAX_ENTITIES)]
    TooManyEntities,

    /// The component type table is full.
    #[error("too many component types registered (limit {})", crate::ecs::MAX_COMPONENTS)]
    TooManyComponentTypes,

    /// The operation named an entity that is not currently alive.
    #[error("entity {0:?} is not alive")]
    EntityNotAlive(Entity),
}
