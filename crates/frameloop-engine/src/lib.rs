//! Frameloop Engine -- frame-driven scheduling and event-bus entity lifecycle.
//!
//! This crate builds on [`frameloop_ecs`] to provide the per-frame driver for
//! game object logic. It offers three interchangeable patterns:
//!
//! - **Systems over queries.** A [`Scheduler`](scheduler::Scheduler) owns the
//!   [`World`](frameloop_ecs::world::World) and runs each registered
//!   [`System`](scheduler::System) over the entities matching its query,
//!   once per frame, in registration order.
//! - **Event-driven entities.** A
//!   [`LifecycleManager`](lifecycle::LifecycleManager) owns
//!   [`GameEntity`](lifecycle::GameEntity) objects and fans the global
//!   `tick`, `entityAdded` and `entityRemoved` events out to them over an
//!   [`EventBus`](event::EventBus). Entities leave through their own
//!   `removed` event or through an external removal request.
//! - **Behaviors.** A [`Behavior`](behavior::Behavior) attached to a
//!   [`Prop`](behavior::Prop) runs on every `tick` until it detaches
//!   itself, leaving the prop in the scene.
//!
//! Rendering is reached only through the narrow [`Renderer`](render::Renderer)
//! trait. [`Game`](game::Game) ties the pieces to a host frame callback.
//!
//! # Quick Start
//!
//! ```
//! use std::rc::Rc;
//! use frameloop_engine::prelude::*;
//!
//! let renderer: Rc<dyn Renderer> = Rc::new(HeadlessRenderer::new(7));
//! let mut game = Game::new(TickConfig::default(), renderer);
//! game.setup_demo().unwrap();
//!
//! for _ in 0..10 {
//!     game.frame(16.0);
//! }
//! assert_eq!(game.scheduler().frame_count(), 10);
//! assert_eq!(game.lifecycle().entity_count(), 2);
//! ```

#![deny(unsafe_code)]

pub mod behavior;
pub mod clock;
pub mod components;
pub mod config;
pub mod entities;
pub mod event;
pub mod game;
pub mod lifecycle;
pub mod render;
pub mod scheduler;
pub mod systems;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the ECS crate for convenience.
pub use frameloop_ecs;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by the engine layer.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// An event name was used that the bus never declared.
    #[error("unknown event '{event}' on the {bus} bus (declared: {declared})")]
    UnknownEvent {
        bus: &'static str,
        event: String,
        declared: String,
    },

    /// A configuration value could not be read or is out of range.
    #[error("invalid configuration: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use frameloop_ecs::prelude::*;

    pub use crate::behavior::{AttachedBehavior, Behavior, Flow, Patrol, Prop};
    pub use crate::clock::{sanitize_dt, FrameClock};
    pub use crate::components::{MeshHandle, Moving, Position};
    pub use crate::config::TickConfig;
    pub use crate::entities::{Expiring, Wanderer};
    pub use crate::event::{EventBus, EventSet, Subscription};
    pub use crate::game::Game;
    pub use crate::lifecycle::{EntityEvent, GameEntity, GameEvent, LifecycleManager};
    pub use crate::render::{HeadlessRenderer, Renderer, VisualHandle, VisualId};
    pub use crate::scheduler::{FrameDiagnostics, Scheduler, System};
    pub use crate::systems::{MovementSystem, TransformSyncSystem, TRAVEL_BOUND};
    pub use crate::EngineError;
}
