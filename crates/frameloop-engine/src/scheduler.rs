//! Per-frame system scheduler.
//!
//! The [`Scheduler`] owns the [`World`] and an ordered list of [`System`]s.
//! Each frame, for every system in registration order:
//!
//! 1. The system's query is evaluated into a snapshot of matching entities.
//! 2. `update` runs once per snapshot entity that is still alive and still
//!    matches the query at the moment it is reached.
//!
//! Systems get `&mut World`, so they may spawn, despawn, or change
//! components mid-pass. The snapshot keeps the walk well defined: entities
//! spawned during the pass wait for the next frame, and entities despawned or
//! stripped of a required component before their turn are skipped.
//!
//! # Example
//!
//! ```
//! use frameloop_engine::prelude::*;
//!
//! struct Counter { seen: usize, query: Query }
//!
//! impl System for Counter {
//!     fn name(&self) -> &str { "counter" }
//!     fn query(&self) -> &Query { &self.query }
//!     fn update(&mut self, _world: &mut World, _entity: EntityId, _dt: f64) {
//!         self.seen += 1;
//!     }
//! }
//!
//! let mut world = World::new();
//! let query = QueryBuilder::new().contains::<Position>().build(&mut world);
//! world.spawn_with(Position::default());
//!
//! let mut scheduler = Scheduler::new(world);
//! scheduler.add_system(Box::new(Counter { seen: 0, query }));
//! scheduler.run_frames(3, 0.5);
//!
//! assert_eq!(scheduler.frame_count(), 3);
//! assert_eq!(scheduler.elapsed(), 1.5);
//! ```

use std::time::{Duration, Instant};

use frameloop_ecs::entity::EntityId;
use frameloop_ecs::query::Query;
use frameloop_ecs::world::World;

use crate::clock::sanitize_dt;

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

/// Per-entity logic applied every frame to the entities matching a query.
pub trait System {
    /// Unique name, used in diagnostics and logs.
    fn name(&self) -> &str;

    /// The component set an entity must hold to be updated.
    fn query(&self) -> &Query;

    /// Update one matching entity. `dt` is the frame delta in seconds.
    fn update(&mut self, world: &mut World, entity: EntityId, dt: f64);
}

// ---------------------------------------------------------------------------
// FrameDiagnostics
// ---------------------------------------------------------------------------

/// Timing for one system in the last frame.
#[derive(Debug, Clone)]
pub struct SystemTiming {
    pub name: String,
    pub time: Duration,
    /// Entities `update` was called for.
    pub updated: usize,
}

/// Timing diagnostics for the last frame.
#[derive(Debug, Clone, Default)]
pub struct FrameDiagnostics {
    /// Per-system timings in execution order.
    pub systems: Vec<SystemTiming>,
    /// Total time for the frame.
    pub total_time: Duration,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Runs registered systems over the world once per frame.
pub struct Scheduler {
    world: World,
    systems: Vec<Box<dyn System>>,
    frame_counter: u64,
    /// Sum of sanitized frame deltas.
    elapsed: f64,
    last_diagnostics: FrameDiagnostics,
}

impl Scheduler {
    /// Create a scheduler that owns `world` and has no systems.
    pub fn new(world: World) -> Self {
        Self {
            world,
            systems: Vec::new(),
            frame_counter: 0,
            elapsed: 0.0,
            last_diagnostics: FrameDiagnostics::default(),
        }
    }

    /// Register a system. Systems run in registration order.
    ///
    /// The system's query is indexed immediately so its first evaluation is
    /// already incremental.
    ///
    /// # Panics
    ///
    /// Panics if a system with the same name is already registered.
    pub fn add_system(&mut self, system: Box<dyn System>) {
        let name = system.name().to_owned();
        assert!(
            !self.systems.iter().any(|s| s.name() == name),
            "duplicate system name: {name:?}"
        );
        self.world.index_query(system.query());
        tracing::debug!(system = %name, order = self.systems.len(), "system registered");
        self.systems.push(system);
    }

    /// Run every system once. A NaN `dt` is treated as `0`.
    pub fn run_frame(&mut self, dt: f64) {
        let dt = sanitize_dt(dt);
        let frame_start = Instant::now();
        let mut timings = Vec::with_capacity(self.systems.len());

        for system in &mut self.systems {
            let start = Instant::now();
            let snapshot = self.world.evaluate(system.query());
            let mut updated = 0;
            for entity in snapshot {
                if !self.world.matches(system.query(), entity) {
                    continue;
                }
                system.update(&mut self.world, entity, dt);
                updated += 1;
            }
            timings.push(SystemTiming {
                name: system.name().to_owned(),
                time: start.elapsed(),
                updated,
            });
        }

        self.frame_counter += 1;
        self.elapsed += dt;
        self.last_diagnostics = FrameDiagnostics {
            systems: timings,
            total_time: frame_start.elapsed(),
        };
        tracing::trace!(frame = self.frame_counter, dt, "scheduler frame complete");
    }

    /// Run `count` frames with the same `dt`.
    pub fn run_frames(&mut self, count: u64, dt: f64) {
        for _ in 0..count {
            self.run_frame(dt);
        }
    }

    // -- accessors ----------------------------------------------------------

    /// Number of `run_frame` calls so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_counter
    }

    /// Simulated seconds advanced so far.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Shared access to the world.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable access to the world, for setup and tests.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Number of registered systems.
    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// The names of all registered systems, in execution order.
    pub fn system_names(&self) -> Vec<&str> {
        self.systems.iter().map(|s| s.name()).collect()
    }

    /// Per-system timings of the most recent frame.
    pub fn last_diagnostics(&self) -> &FrameDiagnostics {
        &self.last_diagnostics
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
