//! Event-driven entity lifecycle.
//!
//! A [`LifecycleManager`] owns a registry of [`GameEntity`] objects and a
//! global [`EventBus`] carrying [`GameEvent`]s. An entity moves through three
//! states:
//!
//! ```text
//! Created --add_entity--> Registered --remove_entity / own `removed`--> Detached
//! ```
//!
//! On registration the manager subscribes the entity to `tick`,
//! `entityAdded` and `entityRemoved`, listens on the entity's own `removed`
//! event, and then announces the entity with `entityAdded`. The new entity
//! hears its own announcement.
//!
//! Detaching unsubscribes every binding exactly once, calls
//! [`GameEntity::teardown`], drops the entity from the registry and then
//! announces `entityRemoved`. A detached entity receives no further events.
//! Removal requests raised by an entity from inside a handler are queued and
//! applied after the emit that raised them returns, so the rest of that
//! emit's listeners still run.
//!
//! Handlers only hold [`Weak`] references; the registry is the sole owner of
//! every entity.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use frameloop_ecs::entity::{EntityId, EntityRegistry};

use crate::clock::sanitize_dt;
use crate::event::{EventBus, EventSet, Subscription};
use crate::EngineError;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Events on the global game bus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameEvent {
    /// One frame elapsed. `dt` is in seconds and never NaN.
    Tick { dt: f64 },
    EntityAdded(EntityId),
    EntityRemoved(EntityId),
}

impl GameEvent {
    pub const TICK: &'static str = "tick";
    pub const ENTITY_ADDED: &'static str = "entityAdded";
    pub const ENTITY_REMOVED: &'static str = "entityRemoved";
}

impl EventSet for GameEvent {
    const NAMES: &'static [&'static str] =
        &[Self::TICK, Self::ENTITY_ADDED, Self::ENTITY_REMOVED];

    fn name(&self) -> &'static str {
        match self {
            GameEvent::Tick { .. } => Self::TICK,
            GameEvent::EntityAdded(_) => Self::ENTITY_ADDED,
            GameEvent::EntityRemoved(_) => Self::ENTITY_REMOVED,
        }
    }
}

/// Events on an entity's own bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityEvent {
    /// The entity asks to be removed.
    Removed,
}

impl EntityEvent {
    pub const REMOVED: &'static str = "removed";
}

impl EventSet for EntityEvent {
    const NAMES: &'static [&'static str] = &[Self::REMOVED];

    fn name(&self) -> &'static str {
        match self {
            EntityEvent::Removed => Self::REMOVED,
        }
    }
}

// ---------------------------------------------------------------------------
// GameEntity
// ---------------------------------------------------------------------------

/// An object driven by the global game bus.
///
/// Only [`tick`](Self::tick) and [`events`](Self::events) are required. To
/// leave the game, an entity emits [`EntityEvent::Removed`] on its own bus.
///
/// The request is deferred: the manager queues it and detaches the entity at
/// the end of its next `add_entity`, `remove_entity` or `run_frame` call. A
/// request raised from inside a handler is therefore applied once the
/// current emit returns. One raised outside any manager call, such as from
/// host code, leaves the entity registered and ticking until that next call.
pub trait GameEntity: 'static {
    /// The entity's own bus. The manager listens for `removed` here.
    fn events(&self) -> &EventBus<EntityEvent>;

    /// Advance by `dt` seconds.
    fn tick(&mut self, dt: f64);

    /// Another entity (or this one) was registered.
    fn entity_added(&mut self, _entity: EntityId) {}

    /// Another entity was detached.
    fn entity_removed(&mut self, _entity: EntityId) {}

    /// Release owned resources. Called once, after every binding is gone.
    fn teardown(&mut self) {}
}

type SharedEntity = Rc<RefCell<dyn GameEntity>>;

/// Run `f` against the entity behind `weak`, if it is still alive and not
/// already borrowed.
fn with_entity(
    weak: &Weak<RefCell<dyn GameEntity>>,
    id: EntityId,
    f: impl FnOnce(&mut dyn GameEntity),
) {
    let Some(entity) = weak.upgrade() else {
        return;
    };
    let Ok(mut guard) = entity.try_borrow_mut() else {
        tracing::warn!(entity = %id, "entity is busy in another handler; event skipped");
        return;
    };
    f(&mut *guard);
}

struct Actor {
    entity: SharedEntity,
    bindings: Vec<Subscription>,
}

// ---------------------------------------------------------------------------
// LifecycleManager
// ---------------------------------------------------------------------------

/// Owns event-driven entities and drives them from the global bus.
pub struct LifecycleManager {
    bus: EventBus<GameEvent>,
    actors: EntityRegistry<Actor>,
    /// Self-requested removals waiting for the current emit to finish.
    pending: Rc<RefCell<VecDeque<EntityId>>>,
    frames: u64,
}

impl LifecycleManager {
    /// An empty manager with a fresh game bus.
    pub fn new() -> Self {
        Self {
            bus: EventBus::new("game"),
            actors: EntityRegistry::new(),
            pending: Rc::default(),
            frames: 0,
        }
    }

    /// The global game bus. Outside listeners may subscribe here.
    pub fn bus(&self) -> &EventBus<GameEvent> {
        &self.bus
    }

    /// Construct an entity with `factory` and register it.
    ///
    /// The entity is bound to the global events before `entityAdded` is
    /// announced, so it receives its own announcement.
    pub fn add_entity<E, F>(&mut self, factory: F) -> Result<EntityId, EngineError>
    where
        E: GameEntity,
        F: FnOnce() -> E,
    {
        let entity: SharedEntity = Rc::new(RefCell::new(factory()));
        let id = self.actors.add(Actor {
            entity: entity.clone(),
            bindings: Vec::new(),
        });

        let bindings = match self.bind(id, &entity) {
            Ok(bindings) => bindings,
            Err(err) => {
                self.actors.remove(id);
                return Err(err);
            }
        };
        if let Some(actor) = self.actors.get_mut(id) {
            actor.bindings = bindings;
        }
        tracing::debug!(entity = %id, live = self.actors.len(), "entity registered");

        self.publish(GameEvent::EntityAdded(id));
        self.flush_pending();
        Ok(id)
    }

    /// Subscribe `entity` to the global events and listen on its own bus.
    fn bind(&self, id: EntityId, entity: &SharedEntity) -> Result<Vec<Subscription>, EngineError> {
        let mut bindings = Vec::with_capacity(4);
        let result = self.bind_into(id, entity, &mut bindings);
        if result.is_err() {
            for sub in &mut bindings {
                sub.unsubscribe();
            }
        }
        result.map(|()| bindings)
    }

    fn bind_into(
        &self,
        id: EntityId,
        entity: &SharedEntity,
        bindings: &mut Vec<Subscription>,
    ) -> Result<(), EngineError> {
        let weak = Rc::downgrade(entity);
        bindings.push(self.bus.on(GameEvent::TICK, move |event| {
            if let GameEvent::Tick { dt } = *event {
                with_entity(&weak, id, |e| e.tick(dt));
            }
        })?);

        let weak = Rc::downgrade(entity);
        bindings.push(self.bus.on(GameEvent::ENTITY_ADDED, move |event| {
            if let GameEvent::EntityAdded(added) = *event {
                with_entity(&weak, id, |e| e.entity_added(added));
            }
        })?);

        let weak = Rc::downgrade(entity);
        bindings.push(self.bus.on(GameEvent::ENTITY_REMOVED, move |event| {
            if let GameEvent::EntityRemoved(removed) = *event {
                with_entity(&weak, id, |e| e.entity_removed(removed));
            }
        })?);

        let pending = self.pending.clone();
        let own_bus = entity.borrow().events().clone();
        bindings.push(own_bus.on(EntityEvent::REMOVED, move |_| {
            pending.borrow_mut().push_back(id);
        })?);
        Ok(())
    }

    /// Detach an entity. Returns `false` if it was not registered.
    pub fn remove_entity(&mut self, id: EntityId) -> bool {
        let removed = self.detach(id);
        if !removed {
            tracing::warn!(entity = %id, "remove requested for an entity that is not registered");
        }
        self.flush_pending();
        removed
    }

    /// Emit one `tick`, then apply any removals it requested.
    pub fn run_frame(&mut self, dt: f64) {
        let dt = sanitize_dt(dt);
        self.publish(GameEvent::Tick { dt });
        self.flush_pending();
        self.frames += 1;
        tracing::trace!(
            frame = self.frames,
            dt,
            live = self.actors.len(),
            "lifecycle frame complete"
        );
    }

    fn detach(&mut self, id: EntityId) -> bool {
        let Some(actor) = self.actors.get_mut(id) else {
            return false;
        };
        for sub in &mut actor.bindings {
            sub.unsubscribe();
        }
        let entity = actor.entity.clone();
        match entity.try_borrow_mut() {
            Ok(mut e) => e.teardown(),
            Err(_) => tracing::warn!(entity = %id, "entity busy during teardown; teardown skipped"),
        }
        self.actors.remove(id);
        tracing::debug!(entity = %id, live = self.actors.len(), "entity detached");

        self.publish(GameEvent::EntityRemoved(id));
        true
    }

    /// Apply queued self-removals, including any queued while applying them.
    fn flush_pending(&mut self) {
        loop {
            let next = self.pending.borrow_mut().pop_front();
            let Some(id) = next else {
                break;
            };
            self.detach(id);
        }
    }

    fn publish(&self, event: GameEvent) {
        if let Err(err) = self.bus.emit(&event) {
            tracing::warn!(%err, "game event dropped");
        }
    }

    // -- accessors ----------------------------------------------------------

    /// Number of registered entities.
    pub fn entity_count(&self) -> usize {
        self.actors.len()
    }

    /// Whether `id` is registered and not yet detached.
    pub fn is_registered(&self, id: EntityId) -> bool {
        self.actors.contains(id)
    }

    /// Registered entities in registration order.
    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.actors.ids()
    }

    /// Number of `run_frame` calls so far.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    type Log = Rc<RefCell<Vec<String>>>;

    /// Records every callback; asks for removal after `quit_after` ticks.
    struct Scripted {
        tag: &'static str,
        events: EventBus<EntityEvent>,
        log: Log,
        ticks: u32,
        quit_after: Option<u32>,
        teardowns: Rc<Cell<u32>>,
    }

    impl Scripted {
        fn new(tag: &'static str, log: &Log) -> Self {
            Self {
                tag,
                events: EventBus::new("scripted"),
                log: log.clone(),
                ticks: 0,
                quit_after: None,
                teardowns: Rc::default(),
            }
        }

        fn quitting(mut self, after: u32) -> Self {
            self.quit_after = Some(after);
            self
        }
    }

    impl GameEntity for Scripted {
        fn events(&self) -> &EventBus<EntityEvent> {
            &self.events
        }

        fn tick(&mut self, dt: f64) {
            self.ticks += 1;
            self.log.borrow_mut().push(format!("{}:tick:{dt}", self.tag));
            if self.quit_after.is_some_and(|n| self.ticks >= n) {
                self.events.emit(&EntityEvent::Removed).unwrap();
            }
        }

        fn entity_added(&mut self, entity: EntityId) {
            self.log.borrow_mut().push(format!("{}:added:{entity}", self.tag));
        }

        fn entity_removed(&mut self, entity: EntityId) {
            self.log.borrow_mut().push(format!("{}:removed:{entity}", self.tag));
        }

        fn teardown(&mut self) {
            self.teardowns.set(self.teardowns.get() + 1);
            self.log.borrow_mut().push(format!("{}:teardown", self.tag));
        }
    }

    #[test]
    fn new_entity_hears_its_own_announcement() {
        let log: Log = Rc::default();
        let mut manager = LifecycleManager::new();
        let a = manager.add_entity(|| Scripted::new("a", &log)).unwrap();
        let b = manager.add_entity(|| Scripted::new("b", &log)).unwrap();

        assert_eq!(
            *log.borrow(),
            vec![
                format!("a:added:{a}"),
                format!("a:added:{b}"),
                format!("b:added:{b}"),
            ]
        );
        assert_eq!(manager.entity_ids(), vec![a, b]);
    }

    #[test]
    fn tick_fans_out_in_registration_order() {
        let log: Log = Rc::default();
        let mut manager = LifecycleManager::new();
        manager.add_entity(|| Scripted::new("a", &log)).unwrap();
        manager.add_entity(|| Scripted::new("b", &log)).unwrap();
        log.borrow_mut().clear();

        manager.run_frame(0.5);
        assert_eq!(*log.borrow(), vec!["a:tick:0.5", "b:tick:0.5"]);
        assert_eq!(manager.frame_count(), 1);
    }

    #[test]
    fn external_removal_is_complete() {
        let log: Log = Rc::default();
        let mut manager = LifecycleManager::new();
        let a = manager.add_entity(|| Scripted::new("a", &log)).unwrap();
        let b = manager.add_entity(|| Scripted::new("b", &log)).unwrap();

        let announced = Rc::new(RefCell::new(Vec::new()));
        let sink = announced.clone();
        let _listener = manager
            .bus()
            .on(GameEvent::ENTITY_REMOVED, move |event| {
                if let GameEvent::EntityRemoved(id) = *event {
                    sink.borrow_mut().push(id);
                }
            })
            .unwrap();

        log.borrow_mut().clear();
        assert!(manager.remove_entity(a));
        assert_eq!(
            *log.borrow(),
            vec!["a:teardown".to_owned(), format!("b:removed:{a}")]
        );

        assert!(!manager.remove_entity(a));
        manager.run_frame(1.0);
        assert_eq!(*announced.borrow(), vec![a]);
        assert!(!manager.is_registered(a));
        assert!(manager.is_registered(b));
        assert_eq!(log.borrow().last().map(String::as_str), Some("b:tick:1"));
        assert!(!log.borrow().iter().any(|l| l == "a:tick:1"));

        // Every global binding of `a` is gone.
        let bus = manager.bus();
        assert_eq!(bus.listener_count(GameEvent::TICK).unwrap(), 1);
        assert_eq!(bus.listener_count(GameEvent::ENTITY_ADDED).unwrap(), 1);
        assert_eq!(bus.listener_count(GameEvent::ENTITY_REMOVED).unwrap(), 2);
    }

    #[test]
    fn self_removal_waits_for_tick_to_finish() {
        let log: Log = Rc::default();
        let mut manager = LifecycleManager::new();
        let a = manager
            .add_entity(|| Scripted::new("a", &log).quitting(1))
            .unwrap();
        manager.add_entity(|| Scripted::new("b", &log)).unwrap();
        log.borrow_mut().clear();

        manager.run_frame(1.0);
        assert_eq!(
            *log.borrow(),
            vec![
                "a:tick:1".to_owned(),
                "b:tick:1".to_owned(),
                "a:teardown".to_owned(),
                format!("b:removed:{a}"),
            ]
        );
        assert!(!manager.is_registered(a));
        assert_eq!(manager.entity_count(), 1);
    }

    #[test]
    fn teardown_runs_once_even_with_repeated_requests() {
        let log: Log = Rc::default();
        let scripted = Scripted::new("a", &log);
        let teardowns = scripted.teardowns.clone();
        let own_bus = scripted.events.clone();

        let mut manager = LifecycleManager::new();
        let a = manager.add_entity(move || scripted).unwrap();

        own_bus.emit(&EntityEvent::Removed).unwrap();
        own_bus.emit(&EntityEvent::Removed).unwrap();
        manager.run_frame(0.0);
        assert!(!manager.is_registered(a));
        assert!(!manager.remove_entity(a));
        own_bus.emit(&EntityEvent::Removed).unwrap();
        manager.run_frame(0.0);

        assert_eq!(teardowns.get(), 1);
        assert_eq!(own_bus.listener_count(EntityEvent::REMOVED).unwrap(), 0);
    }

    #[test]
    fn removal_requested_outside_the_manager_waits_for_next_call() {
        let log: Log = Rc::default();
        let scripted = Scripted::new("a", &log);
        let own_bus = scripted.events.clone();
        let mut manager = LifecycleManager::new();
        let a = manager.add_entity(move || scripted).unwrap();

        own_bus.emit(&EntityEvent::Removed).unwrap();
        assert!(manager.is_registered(a));
        assert_eq!(manager.bus().listener_count(GameEvent::TICK).unwrap(), 1);

        log.borrow_mut().clear();
        manager.run_frame(0.5);
        assert!(!manager.is_registered(a));
        assert_eq!(*log.borrow(), vec!["a:tick:0.5", "a:teardown"]);
    }

    #[test]
    fn removal_queued_during_entity_added_is_applied() {
        struct Shy {
            events: EventBus<EntityEvent>,
        }

        impl GameEntity for Shy {
            fn events(&self) -> &EventBus<EntityEvent> {
                &self.events
            }
            fn tick(&mut self, _dt: f64) {}
            fn entity_added(&mut self, _entity: EntityId) {
                self.events.emit(&EntityEvent::Removed).unwrap();
            }
        }

        let mut manager = LifecycleManager::new();
        let shy = manager
            .add_entity(|| Shy {
                events: EventBus::new("shy"),
            })
            .unwrap();
        assert!(!manager.is_registered(shy));
        assert_eq!(manager.entity_count(), 0);
    }

    #[test]
    fn nan_dt_reaches_entities_as_zero() {
        let log: Log = Rc::default();
        let mut manager = LifecycleManager::new();
        manager.add_entity(|| Scripted::new("a", &log)).unwrap();
        log.borrow_mut().clear();
        manager.run_frame(f64::NAN);
        assert_eq!(*log.borrow(), vec!["a:tick:0"]);
    }

    #[test]
    fn entity_is_dropped_after_detach() {
        struct Canary {
            events: EventBus<EntityEvent>,
            dropped: Rc<Cell<bool>>,
        }

        impl GameEntity for Canary {
            fn events(&self) -> &EventBus<EntityEvent> {
                &self.events
            }
            fn tick(&mut self, _dt: f64) {}
        }

        impl Drop for Canary {
            fn drop(&mut self) {
                self.dropped.set(true);
            }
        }

        let dropped = Rc::new(Cell::new(false));
        let flag = dropped.clone();
        let mut manager = LifecycleManager::new();
        let id = manager
            .add_entity(move || Canary {
                events: EventBus::new("canary"),
                dropped: flag,
            })
            .unwrap();
        assert!(!dropped.get());
        manager.remove_entity(id);
        assert!(dropped.get());
    }
}
