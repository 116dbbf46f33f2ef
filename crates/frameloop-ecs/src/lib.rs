//! Frameloop ECS -- entity registry, component store, and query index.
//!
//! This crate provides the data side of the Frameloop runtime. Entities are
//! generational ids owned by an insertion-ordered registry; each entity holds
//! at most one component per Rust type; queries select the entities holding a
//! required set of component types and are kept up to date incrementally.
//!
//! Everything is single-threaded and synchronous. Query results are returned
//! as snapshots, so callers may add and remove entities while walking them.
//!
//! # Quick Start
//!
//! ```
//! use frameloop_ecs::prelude::*;
//!
//! #[derive(Debug, PartialEq)]
//! struct Position { x: f64 }
//!
//! #[derive(Debug, PartialEq)]
//! struct Moving { going_left: bool }
//!
//! let mut world = World::new();
//! let movers = QueryBuilder::new()
//!     .contains::<Position>()
//!     .contains::<Moving>()
//!     .build(&mut world);
//!
//! let entity = world.spawn_bundle(
//!     ComponentBundle::new()
//!         .with(Position { x: 0.0 })
//!         .with(Moving { going_left: true }),
//! );
//!
//! for e in world.evaluate(&movers) {
//!     if let Some(pos) = world.get_mut::<Position>(e) {
//!         pos.x -= 0.5;
//!     }
//! }
//!
//! assert_eq!(world.get::<Position>(entity), Some(&Position { x: -0.5 }));
//! ```

#![deny(unsafe_code)]

pub mod component;
pub mod entity;
pub mod query;
pub mod world;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by ECS operations.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// The entity does not exist (removed, stale generation, or never allocated).
    #[error("entity {entity:?} does not exist (stale or never allocated)")]
    StaleEntity { entity: entity::EntityId },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::component::{ComponentInfo, ComponentRegistry, ComponentSet, ComponentTypeId};
    pub use crate::entity::{EntityAllocator, EntityId, EntityRegistry};
    pub use crate::query::{Query, QueryBuilder, QueryIndex};
    pub use crate::world::{ComponentBundle, World};
    pub use crate::EcsError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Velocity {
        dx: f32,
        dy: f32,
    }

    fn moving(x: f32) -> ComponentBundle {
        ComponentBundle::new()
            .with(Position { x, y: x * 2.0 })
            .with(Velocity { dx: 1.0, dy: -1.0 })
    }

    #[test]
    fn scale_10k_entities() {
        let mut world = World::new();
        let query = QueryBuilder::new()
            .contains::<Position>()
            .contains::<Velocity>()
            .build(&mut world);

        let entities: Vec<_> = (0..10_000u32)
            .map(|i| world.spawn_bundle(moving(i as f32)))
            .collect();
        assert_eq!(world.query_count(&query), 10_000);

        for e in world.evaluate(&query) {
            if let Some(vel) = world.get_mut::<Velocity>(e) {
                vel.dx *= 2.0;
            }
        }
        assert_eq!(world.get::<Velocity>(entities[0]).map(|v| v.dx), Some(2.0));

        // Despawn half.
        for e in entities.iter().take(5_000) {
            world.despawn(*e);
        }
        assert_eq!(world.query_count(&query), 5_000);
        assert_eq!(world.evaluate(&query).first(), Some(&entities[5_000]));
        assert_eq!(world.entity_count(), 5_000);
    }

    #[test]
    fn despawn_during_evaluation_walk() {
        let mut world = World::new();
        let query = QueryBuilder::new().contains::<Position>().build(&mut world);
        let ids: Vec<_> = (0..4).map(|i| world.spawn_bundle(moving(i as f32))).collect();

        let mut visited = Vec::new();
        for e in world.evaluate(&query) {
            if !world.is_alive(e) {
                continue;
            }
            visited.push(e);
            // Every visit also removes the last live entity.
            if let Some(last) = world.entity_ids().last().copied() {
                if last != e {
                    world.despawn(last);
                }
            }
        }
        assert_eq!(visited, vec![ids[0], ids[1]]);
        assert_eq!(world.evaluate(&query), vec![ids[0], ids[1]]);
    }
}
