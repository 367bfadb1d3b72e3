//! Entity Component System core.
//!
//! The ECS is split into three managers composed behind the [`World`] facade:
//!
//! - [`entity::Manager`] allocates and recycles entity handles and stores each
//!   entity's component [`Signature`].
//! - [`component::Manager`] owns one packed storage array per registered
//!   component type and routes typed access to the right array.
//! - [`system::Manager`] tracks each registered system's required signature and
//!   keeps its matching-entity set in sync as signatures change.
//!
//! All of this is single-threaded by design: every mutation goes through
//! `&mut World` on the main loop. The asynchronous counterpart lives in
//! [`crate::jobs`].

pub mod component;
pub mod entity;
pub mod system;
pub mod world;

mod error;

pub use component::{Component, MAX_COMPONENTS, Signature};
pub use entity::{Entity, MAX_ENTITIES};
pub use error::Error;
pub use system::System;
pub use world::World;
