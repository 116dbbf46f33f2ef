//! Behaviors: per-frame logic attached to a scene object.
//!
//! A [`Prop`] is a renderer-backed object with a position and no lifecycle of
//! its own. [`EventBus::attach_behavior`] subscribes a [`Behavior`] to the
//! game bus's `tick` and hands back an [`AttachedBehavior`].
//!
//! The attachment owns its [`Subscription`]. When [`Behavior::update`]
//! returns [`Flow::Detach`] the behavior unsubscribes itself during the
//! current emit. The rest of that emit still runs, and the prop and its
//! visual stay in the scene.
//!
//! ```
//! use std::rc::Rc;
//! use frameloop_engine::behavior::{Patrol, Prop};
//! use frameloop_engine::prelude::*;
//!
//! let renderer: Rc<dyn Renderer> = Rc::new(HeadlessRenderer::new(0));
//! let mut manager = LifecycleManager::new();
//! let prop = Prop::new(&renderer, "patrol");
//! let patrol = manager
//!     .bus()
//!     .attach_behavior(&prop, Patrol::with_limit(1.0))
//!     .unwrap();
//!
//! manager.run_frame(0.75);
//! manager.run_frame(0.75);
//! assert!(!patrol.is_attached());
//! assert_eq!(prop.position().x, -1.5);
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::components::Position;
use crate::event::{EventBus, Subscription};
use crate::lifecycle::GameEvent;
use crate::render::{Renderer, VisualHandle};
use crate::systems::TRAVEL_BOUND;
use crate::EngineError;

// ---------------------------------------------------------------------------
// Prop
// ---------------------------------------------------------------------------

/// A visual with a position. Outlives any behavior attached to it.
pub struct Prop {
    name: String,
    mesh: VisualHandle,
    position: Cell<Position>,
}

impl Prop {
    /// Create a prop with a new visual called `name`, at the origin.
    pub fn new(renderer: &Rc<dyn Renderer>, name: &str) -> Rc<Self> {
        Rc::new(Self {
            name: name.to_owned(),
            mesh: VisualHandle::create(renderer, name),
            position: Cell::new(Position::default()),
        })
    }

    /// The name the visual was created with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current position.
    pub fn position(&self) -> Position {
        self.position.get()
    }

    /// Move the prop and push the new transform to its visual.
    pub fn set_position(&self, position: Position) {
        self.position.set(position);
        self.mesh.set_position(position);
    }

    /// The visual backing this prop.
    pub fn mesh(&self) -> &VisualHandle {
        &self.mesh
    }
}

impl fmt::Debug for Prop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prop")
            .field("name", &self.name)
            .field("visual", &self.mesh.id())
            .field("position", &self.position.get())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Behavior
// ---------------------------------------------------------------------------

/// What a behavior wants after an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Unsubscribe now. The target is left as it is.
    Detach,
}

/// Per-frame logic for one [`Prop`].
pub trait Behavior: 'static {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Called once, before the first update.
    fn attached(&mut self, _target: &Prop) {}

    /// Advance by `dt` seconds.
    fn update(&mut self, target: &Prop, dt: f64) -> Flow;

    /// Called once, after the subscription is gone.
    fn detached(&mut self) {}
}

struct Attachment<B> {
    behavior: RefCell<B>,
    target: RefCell<Option<Rc<Prop>>>,
    subscription: RefCell<Option<Subscription>>,
}

impl<B: Behavior> Attachment<B> {
    fn on_tick(&self, dt: f64) {
        let Some(target) = self.target.borrow().clone() else {
            return;
        };
        let flow = match self.behavior.try_borrow_mut() {
            Ok(mut behavior) => behavior.update(&target, dt),
            Err(_) => {
                tracing::warn!(prop = %target.name(), "behavior is busy; tick skipped");
                return;
            }
        };
        if flow == Flow::Detach {
            self.detach();
        }
    }
}

/// Type-erased controls for an [`Attachment`].
trait Control {
    fn detach(&self) -> bool;
    fn is_attached(&self) -> bool;
}

impl<B: Behavior> Control for Attachment<B> {
    fn detach(&self) -> bool {
        let Some(mut subscription) = self.subscription.borrow_mut().take() else {
            return false;
        };
        subscription.unsubscribe();
        let target = self.target.borrow_mut().take();
        match self.behavior.try_borrow_mut() {
            Ok(mut behavior) => {
                behavior.detached();
                tracing::debug!(
                    behavior = behavior.name(),
                    prop = target.as_ref().map(|t| t.name()),
                    "behavior detached"
                );
            }
            Err(_) => tracing::warn!("behavior busy while detaching; detached hook skipped"),
        }
        true
    }

    fn is_attached(&self) -> bool {
        self.subscription.borrow().is_some()
    }
}

/// Handle to a behavior attached with [`EventBus::attach_behavior`].
///
/// Dropping the handle does not detach the behavior.
pub struct AttachedBehavior {
    name: &'static str,
    control: Rc<dyn Control>,
}

impl AttachedBehavior {
    /// Detach from outside. Returns `false` if already detached.
    pub fn detach(&self) -> bool {
        self.control.detach()
    }

    /// Whether the behavior still receives ticks.
    pub fn is_attached(&self) -> bool {
        self.control.is_attached()
    }

    /// The behavior's name, as reported by [`Behavior::name`].
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for AttachedBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachedBehavior")
            .field("name", &self.name)
            .field("attached", &self.is_attached())
            .finish()
    }
}

impl EventBus<GameEvent> {
    /// Attach `behavior` to `target`, driven by this bus's `tick`.
    pub fn attach_behavior<B: Behavior>(
        &self,
        target: &Rc<Prop>,
        behavior: B,
    ) -> Result<AttachedBehavior, EngineError> {
        let name = behavior.name();
        let attachment = Rc::new(Attachment {
            behavior: RefCell::new(behavior),
            target: RefCell::new(Some(target.clone())),
            subscription: RefCell::new(None),
        });
        attachment.behavior.borrow_mut().attached(target);

        let inner = attachment.clone();
        let subscription = self.on(GameEvent::TICK, move |event| {
            if let GameEvent::Tick { dt } = *event {
                inner.on_tick(dt);
            }
        })?;
        *attachment.subscription.borrow_mut() = Some(subscription);
        tracing::debug!(behavior = name, prop = %target.name(), "behavior attached");

        Ok(AttachedBehavior {
            name,
            control: attachment,
        })
    }
}

// ---------------------------------------------------------------------------
// Patrol
// ---------------------------------------------------------------------------

/// Moves its target back and forth along x, then detaches once it has run
/// for strictly longer than its limit.
///
/// Starts heading left. The bound is checked after each step.
#[derive(Debug, Clone)]
pub struct Patrol {
    going_left: bool,
    elapsed: f64,
    limit: f64,
}

impl Patrol {
    /// Seconds a patrol runs before detaching.
    pub const DEFAULT_LIMIT: f64 = 10.0;

    /// A patrol that detaches after [`DEFAULT_LIMIT`](Self::DEFAULT_LIMIT) seconds.
    pub fn new() -> Self {
        Self::with_limit(Self::DEFAULT_LIMIT)
    }

    /// A patrol that detaches once it has run for more than `limit` seconds.
    pub fn with_limit(limit: f64) -> Self {
        Self {
            going_left: true,
            elapsed: 0.0,
            limit,
        }
    }
}

impl Default for Patrol {
    fn default() -> Self {
        Self::new()
    }
}

impl Behavior for Patrol {
    fn name(&self) -> &'static str {
        "patrol"
    }

    fn attached(&mut self, target: &Prop) {
        tracing::info!(prop = %target.name(), limit = self.limit, "patrol attached");
    }

    fn update(&mut self, target: &Prop, dt: f64) -> Flow {
        let mut position = target.position();
        position.x += if self.going_left { -dt } else { dt };
        if position.x > TRAVEL_BOUND {
            self.going_left = true;
        } else if position.x < -TRAVEL_BOUND {
            self.going_left = false;
        }
        target.set_position(position);

        self.elapsed += dt;
        if self.elapsed > self.limit {
            Flow::Detach
        } else {
            Flow::Continue
        }
    }

    fn detached(&mut self) {
        tracing::info!(elapsed = self.elapsed, "patrol detached");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::LifecycleManager;
    use crate::render::HeadlessRenderer;

    fn scene() -> (Rc<HeadlessRenderer>, Rc<Prop>, LifecycleManager) {
        let headless = Rc::new(HeadlessRenderer::new(0));
        let shared: Rc<dyn Renderer> = headless.clone();
        let prop = Prop::new(&shared, "patrol");
        (headless, prop, LifecycleManager::new())
    }

    /// Counts updates; detaches on the update numbered `stop_at`.
    struct Countdown {
        updates: Rc<Cell<u32>>,
        detached: Rc<Cell<bool>>,
        stop_at: u32,
    }

    impl Behavior for Countdown {
        fn name(&self) -> &'static str {
            "countdown"
        }

        fn update(&mut self, _target: &Prop, _dt: f64) -> Flow {
            self.updates.set(self.updates.get() + 1);
            if self.updates.get() >= self.stop_at {
                Flow::Detach
            } else {
                Flow::Continue
            }
        }

        fn detached(&mut self) {
            self.detached.set(true);
        }
    }

    #[test]
    fn patrol_stops_after_ten_seconds_and_prop_stays() {
        let (headless, prop, mut manager) = scene();
        let visual = prop.mesh().id();
        let patrol = manager.bus().attach_behavior(&prop, Patrol::new()).unwrap();

        // 20 half-second ticks: exactly 10 s, not yet past the limit.
        for _ in 0..20 {
            manager.run_frame(0.5);
        }
        assert!(patrol.is_attached());

        manager.run_frame(0.5);
        assert!(!patrol.is_attached());
        assert_eq!(manager.bus().listener_count(GameEvent::TICK).unwrap(), 0);

        let frozen = prop.position();
        for _ in 0..10 {
            manager.run_frame(0.5);
        }
        assert!(headless.is_live(visual));
        assert_eq!(prop.position(), frozen);
        assert_eq!(headless.position(visual), Some(frozen));
    }

    #[test]
    fn patrol_heads_left_and_turns_past_the_bound() {
        let (_, prop, mut manager) = scene();
        let _patrol = manager.bus().attach_behavior(&prop, Patrol::new()).unwrap();
        let mut xs = Vec::new();
        for _ in 0..6 {
            manager.run_frame(0.5);
            xs.push(prop.position().x);
        }
        assert_eq!(xs, vec![-0.5, -1.0, -1.5, -2.0, -2.5, -2.0]);
    }

    #[test]
    fn self_detach_lets_the_rest_of_the_tick_run() {
        let (_, prop, mut manager) = scene();
        let updates = Rc::new(Cell::new(0));
        let detached = Rc::new(Cell::new(false));
        let behavior = manager
            .bus()
            .attach_behavior(
                &prop,
                Countdown {
                    updates: updates.clone(),
                    detached: detached.clone(),
                    stop_at: 1,
                },
            )
            .unwrap();

        let later = Rc::new(Cell::new(0));
        let sink = later.clone();
        let _later = manager
            .bus()
            .on(GameEvent::TICK, move |_| sink.set(sink.get() + 1))
            .unwrap();

        manager.run_frame(0.1);
        assert_eq!(updates.get(), 1);
        assert_eq!(later.get(), 1);
        assert!(detached.get());
        assert!(!behavior.is_attached());

        manager.run_frame(0.1);
        assert_eq!(updates.get(), 1);
        assert_eq!(later.get(), 2);
    }

    #[test]
    fn external_detach_is_idempotent() {
        let (headless, prop, mut manager) = scene();
        let patrol = manager.bus().attach_behavior(&prop, Patrol::new()).unwrap();
        manager.run_frame(0.5);

        assert!(patrol.detach());
        assert!(!patrol.detach());
        let x = prop.position().x;
        manager.run_frame(0.5);
        assert_eq!(prop.position().x, x);
        assert!(headless.is_live(prop.mesh().id()));
    }

    #[test]
    fn dropping_the_handle_keeps_the_behavior() {
        let (_, prop, mut manager) = scene();
        let updates = Rc::new(Cell::new(0));
        drop(
            manager
                .bus()
                .attach_behavior(
                    &prop,
                    Countdown {
                        updates: updates.clone(),
                        detached: Rc::default(),
                        stop_at: 3,
                    },
                )
                .unwrap(),
        );

        for _ in 0..5 {
            manager.run_frame(0.1);
        }
        assert_eq!(updates.get(), 3);
    }
}
