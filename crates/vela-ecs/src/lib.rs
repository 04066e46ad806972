//! Vela ECS -- sparse-set Entity Component System with edge-detected queries.
//!
//! This crate is the component database of the Vela scene runtime. Entities
//! are generational ids; each component kind lives in its own sparse set; every
//! entity carries a bitmask of its kinds, which is what queries match against.
//! Tracked queries report entities entering and leaving a signature exactly
//! once per transition, which is how the engine pairs external resources
//! (physics bodies, render nodes) with component presence.
//!
//! # Quick Start
//!
//! ```
//! use vela_ecs::prelude::*;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Position { x: f64, y: f64 }
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Velocity { dx: f64, dy: f64 }
//!
//! let mut world = World::new();
//! world.register_component::<Position>("position");
//! world.register_component::<Velocity>("velocity");
//!
//! let entity = world.spawn();
//! world.insert_component(entity, Position { x: 0.0, y: 0.0 }).unwrap();
//! world.insert_component(entity, Velocity { dx: 1.0, dy: 0.0 }).unwrap();
//!
//! let movers = world.signature::<(Position, Velocity)>();
//! assert_eq!(world.query_entered(&movers), vec![entity]);
//! assert!(world.query_entered(&movers).is_empty());
//!
//! world.remove_component::<Velocity>(entity).unwrap();
//! assert_eq!(world.query_exited(&movers), vec![entity]);
//! ```

#![deny(unsafe_code)]

pub mod component;
pub mod entity;
pub mod query;
pub mod storage;
pub mod world;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by ECS operations.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// The entity does not exist (stale generation or never allocated).
    #[error("entity {entity:?} does not exist (stale or never allocated)")]
    StaleEntity { entity: entity::EntityId },

    /// A component type was used that has not been registered.
    #[error("component type '{name}' not registered. Registered components: [{registered}]")]
    UnknownComponent { name: String, registered: String },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::component::{ComponentInfo, ComponentMask, ComponentRegistry, ComponentTypeId};
    pub use crate::entity::EntityId;
    pub use crate::query::{ComponentSet, Signature};
    pub use crate::storage::SparseSet;
    pub use crate::world::World;
    pub use crate::EcsError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------
