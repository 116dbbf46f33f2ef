//! Built-in event-driven entities.

use std::rc::Rc;

use frameloop_ecs::entity::EntityId;

use crate::components::Position;
use crate::event::EventBus;
use crate::lifecycle::{EntityEvent, GameEntity};
use crate::render::{Renderer, VisualHandle};
use crate::systems::TRAVEL_BOUND;

// ---------------------------------------------------------------------------
// Wanderer
// ---------------------------------------------------------------------------

/// A sphere that oscillates along x between `-TRAVEL_BOUND` and
/// `TRAVEL_BOUND`.
///
/// Unlike [`MovementSystem`](crate::systems::MovementSystem), the bound is
/// checked against the position *after* this frame's step.
pub struct Wanderer {
    name: String,
    mesh: VisualHandle,
    x: f64,
    going_left: bool,
    events: EventBus<EntityEvent>,
}

impl Wanderer {
    /// Create a wanderer with a freshly named visual, at the origin,
    /// heading right.
    pub fn new(renderer: &Rc<dyn Renderer>) -> Self {
        let name = renderer.name_visual("sphere");
        let mesh = VisualHandle::create(renderer, &name);
        Self {
            name,
            mesh,
            x: 0.0,
            going_left: false,
            events: EventBus::new("entity"),
        }
    }

    /// Start at `x` instead of the origin.
    pub fn at(mut self, x: f64) -> Self {
        self.x = x;
        self.mesh.set_position(self.position());
        self
    }

    /// The generated name, also used for the visual.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current position. Only `x` ever changes.
    pub fn position(&self) -> Position {
        Position::new(self.x, 0.0, 0.0)
    }

    /// Whether the next step moves toward `-x`.
    pub fn going_left(&self) -> bool {
        self.going_left
    }

    /// The visual this wanderer owns.
    pub fn mesh(&self) -> &VisualHandle {
        &self.mesh
    }

    fn step(&mut self, dt: f64) {
        self.x += if self.going_left { -dt } else { dt };
        if self.x > TRAVEL_BOUND {
            self.going_left = true;
        } else if self.x < -TRAVEL_BOUND {
            self.going_left = false;
        }
        self.mesh.set_position(self.position());
    }
}

impl GameEntity for Wanderer {
    fn events(&self) -> &EventBus<EntityEvent> {
        &self.events
    }

    fn tick(&mut self, dt: f64) {
        self.step(dt);
    }

    fn entity_added(&mut self, entity: EntityId) {
        tracing::info!(observer = %self.name, %entity, "entity added");
    }

    fn entity_removed(&mut self, entity: EntityId) {
        tracing::info!(observer = %self.name, %entity, "entity removed");
    }

    fn teardown(&mut self) {
        self.mesh.dispose();
    }
}

// ---------------------------------------------------------------------------
// Expiring
// ---------------------------------------------------------------------------

/// A [`Wanderer`] that asks to be removed once it has lived strictly longer
/// than its lifetime.
pub struct Expiring {
    inner: Wanderer,
    elapsed: f64,
    lifetime: f64,
}

impl Expiring {
    /// Seconds an [`Expiring`] lives when no lifetime is given.
    pub const DEFAULT_LIFETIME: f64 = 5.0;

    /// Wrap `inner` with the default five-second lifetime.
    pub fn new(inner: Wanderer) -> Self {
        Self::with_lifetime(inner, Self::DEFAULT_LIFETIME)
    }

    /// Wrap `inner` with a custom lifetime in seconds.
    pub fn with_lifetime(inner: Wanderer, lifetime: f64) -> Self {
        Self {
            inner,
            elapsed: 0.0,
            lifetime,
        }
    }

    /// Seconds accumulated since registration.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// The wrapped wanderer.
    pub fn wanderer(&self) -> &Wanderer {
        &self.inner
    }
}

impl GameEntity for Expiring {
    fn events(&self) -> &EventBus<EntityEvent> {
        self.inner.events()
    }

    fn tick(&mut self, dt: f64) {
        self.inner.step(dt);
        self.elapsed += dt;
        if self.elapsed > self.lifetime {
            tracing::debug!(name = %self.inner.name, elapsed = self.elapsed, "lifetime exceeded");
            if let Err(err) = self.inner.events.emit(&EntityEvent::Removed) {
                tracing::warn!(%err, "removal request dropped");
            }
        }
    }

    fn entity_added(&mut self, entity: EntityId) {
        self.inner.entity_added(entity);
    }

    fn entity_removed(&mut self, entity: EntityId) {
        self.inner.entity_removed(entity);
    }

    fn teardown(&mut self) {
        self.inner.teardown();
    }
}
