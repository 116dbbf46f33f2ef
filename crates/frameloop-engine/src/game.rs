//! The game context: one owner for the renderer, every logic pattern, and
//! the frame clock.
//!
//! A host calls [`Game::frame`] once per rendered frame with the milliseconds
//! since the previous one. Each frame:
//!
//! 1. The delta is converted to seconds (NaN becomes `0`).
//! 2. The [`Scheduler`] runs every system once.
//! 3. The [`LifecycleManager`] emits `tick`, which drives event-driven
//!    entities and attached behaviors, and applies removals.
//!
//! Positions reach the renderer through
//! [`TransformSyncSystem`](crate::systems::TransformSyncSystem), registered
//! last so it sees this frame's movement.

use std::rc::Rc;

use frameloop_ecs::entity::EntityId;
use frameloop_ecs::world::{ComponentBundle, World};

use crate::behavior::{AttachedBehavior, Patrol, Prop};
use crate::clock::FrameClock;
use crate::components::{MeshHandle, Moving, Position};
use crate::config::TickConfig;
use crate::entities::{Expiring, Wanderer};
use crate::lifecycle::LifecycleManager;
use crate::render::{Renderer, VisualHandle, VisualId};
use crate::scheduler::Scheduler;
use crate::systems::{MovementSystem, TransformSyncSystem};
use crate::EngineError;

/// Entities created by [`Game::setup_demo`].
#[derive(Debug, Clone, Copy)]
pub struct DemoEntities {
    /// Static plane, system side.
    pub ground: EntityId,
    /// Moved by [`MovementSystem`].
    pub player: EntityId,
    /// Event-driven, never leaves.
    pub wanderer: EntityId,
    /// Event-driven, leaves after its lifetime.
    pub expiring: EntityId,
    /// Visual of the prop carrying a [`Patrol`] behavior.
    pub patrol: VisualId,
}

/// Owns everything a running scene needs and advances it one host frame at
/// a time.
pub struct Game {
    config: TickConfig,
    renderer: Rc<dyn Renderer>,
    clock: FrameClock,
    scheduler: Scheduler,
    lifecycle: LifecycleManager,
    props: Vec<Rc<Prop>>,
    behaviors: Vec<AttachedBehavior>,
}

impl Game {
    /// Create an empty game with the movement and sync systems registered.
    ///
    /// # Panics
    ///
    /// Panics if `config.fixed_dt` is not positive and finite.
    pub fn new(config: TickConfig, renderer: Rc<dyn Renderer>) -> Self {
        assert!(
            config.fixed_dt > 0.0 && config.fixed_dt.is_finite(),
            "fixed_dt must be positive and finite, got {}",
            config.fixed_dt
        );
        let mut world = World::new();
        let movement = MovementSystem::new(&mut world);
        let sync = TransformSyncSystem::new(&mut world);
        let mut scheduler = Scheduler::new(world);
        scheduler.add_system(Box::new(movement));
        scheduler.add_system(Box::new(sync));

        Self {
            config,
            renderer,
            clock: FrameClock::new(),
            scheduler,
            lifecycle: LifecycleManager::new(),
            props: Vec::new(),
            behaviors: Vec::new(),
        }
    }

    /// Populate the scene: a static ground plane and a moving player on the
    /// system side, one perpetual and one expiring wanderer on the event
    /// side, and a prop whose patrol behavior stops after ten seconds.
    pub fn setup_demo(&mut self) -> Result<DemoEntities, EngineError> {
        let world = self.scheduler.world_mut();
        let ground = world.spawn_bundle(
            ComponentBundle::new()
                .with(MeshHandle(VisualHandle::create(&self.renderer, "ground")))
                .with(Position::new(0.0, -1.0, 0.0)),
        );
        let player = world.spawn_bundle(
            ComponentBundle::new()
                .with(MeshHandle(VisualHandle::create(&self.renderer, "player")))
                .with(Moving { going_left: true })
                .with(Position::default()),
        );

        let renderer = self.renderer.clone();
        let wanderer = self.lifecycle.add_entity(|| Wanderer::new(&renderer))?;
        let expiring = self
            .lifecycle
            .add_entity(|| Expiring::new(Wanderer::new(&renderer).at(3.0)))?;

        let prop = Prop::new(&self.renderer, "patrol");
        let patrol = prop.mesh().id();
        self.behaviors
            .push(self.lifecycle.bus().attach_behavior(&prop, Patrol::new())?);
        self.props.push(prop);

        tracing::info!(%ground, %player, %wanderer, %expiring, %patrol, "demo scene ready");
        Ok(DemoEntities {
            ground,
            player,
            wanderer,
            expiring,
            patrol,
        })
    }

    /// Advance one host frame. Returns the delta used, in seconds.
    pub fn frame(&mut self, host_delta_ms: f64) -> f64 {
        let dt = self.clock.advance(host_delta_ms);
        self.scheduler.run_frame(dt);
        self.lifecycle.run_frame(dt);
        dt
    }

    /// Drive `config.max_frames` frames at `config.fixed_dt`.
    pub fn run(&mut self) {
        let ms = self.config.fixed_dt_ms();
        for _ in 0..self.config.max_frames {
            self.frame(ms);
        }
        tracing::info!(
            frames = self.clock.frames(),
            elapsed = self.clock.elapsed(),
            world_entities = self.scheduler.world().entity_count(),
            lifecycle_entities = self.lifecycle.entity_count(),
            "run finished"
        );
    }

    // -- accessors ----------------------------------------------------------

    /// The configuration this game was created with.
    pub fn config(&self) -> &TickConfig {
        &self.config
    }

    /// The shared renderer every visual is created on.
    pub fn renderer(&self) -> &Rc<dyn Renderer> {
        &self.renderer
    }

    /// Host frame totals.
    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// The system side: world and registered systems.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Mutable access to the system side, for spawning and tests.
    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// The event side: registered entities and the game bus.
    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    /// Mutable access to the event side, for adding and removing entities.
    pub fn lifecycle_mut(&mut self) -> &mut LifecycleManager {
        &mut self.lifecycle
    }

    /// Props in the scene, attached or not.
    pub fn props(&self) -> &[Rc<Prop>] {
        &self.props
    }

    /// Every behavior attached by [`setup_demo`](Self::setup_demo), including
    /// ones that have since detached.
    pub fn behaviors(&self) -> &[AttachedBehavior] {
        &self.behaviors
    }
}
