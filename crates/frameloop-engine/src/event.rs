//! Synchronous publish/subscribe with a fixed, declared set of event names.
//!
//! An [`EventBus`] is parameterised by an [`EventSet`]: an enum of payloads
//! whose variants map to the event names the bus accepts. The names are fixed
//! when the bus is created. Subscribing to, or emitting, any other name fails
//! with [`EngineError::UnknownEvent`].
//!
//! # Dispatch
//!
//! `emit` runs every handler before returning, in subscription order, over a
//! snapshot of the listener list taken when the emit starts:
//!
//! - handlers subscribed during the emit are not called until the next emit;
//! - a handler that unsubscribes itself finishes normally and the rest of the
//!   snapshot still runs;
//! - a handler unsubscribed by someone else before its turn is skipped.
//!
//! The bus never holds a borrow while a handler runs, so handlers may freely
//! subscribe, unsubscribe, or emit on the same bus.
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use frameloop_engine::event::EventBus;
//! use frameloop_engine::lifecycle::GameEvent;
//!
//! let bus = EventBus::<GameEvent>::new("game");
//! let total = Rc::new(Cell::new(0.0));
//! let sink = total.clone();
//! let mut sub = bus
//!     .on(GameEvent::TICK, move |event| {
//!         if let GameEvent::Tick { dt } = event {
//!             sink.set(sink.get() + dt);
//!         }
//!     })
//!     .unwrap();
//!
//! bus.emit(&GameEvent::Tick { dt: 0.5 }).unwrap();
//! sub.unsubscribe();
//! bus.emit(&GameEvent::Tick { dt: 0.5 }).unwrap();
//! assert_eq!(total.get(), 0.5);
//! ```

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::EngineError;

// ---------------------------------------------------------------------------
// EventSet
// ---------------------------------------------------------------------------

/// The payload type of a bus, and the names it declares.
pub trait EventSet: 'static {
    /// Every event name this set declares.
    const NAMES: &'static [&'static str];

    /// The declared name this payload is published under.
    fn name(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// Listener storage
// ---------------------------------------------------------------------------

type Handler<E> = Rc<dyn Fn(&E)>;

struct Listener<E> {
    id: u64,
    /// Cleared by `Subscription::unsubscribe`; checked right before dispatch.
    active: Rc<Cell<bool>>,
    handler: Handler<E>,
}

struct BusState<E> {
    label: &'static str,
    channels: RefCell<HashMap<&'static str, Vec<Listener<E>>>>,
    next_id: Cell<u64>,
}

impl<E: EventSet> BusState<E> {
    fn remove(&self, event: &'static str, id: u64) {
        if let Some(listeners) = self.channels.borrow_mut().get_mut(event) {
            listeners.retain(|l| l.id != id);
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// A shared handle to one event bus. Cloning the handle does not clone the
/// bus; every clone publishes to the same listeners.
pub struct EventBus<E: EventSet> {
    state: Rc<BusState<E>>,
}

impl<E: EventSet> EventBus<E> {
    /// Create a bus accepting exactly the names in `E::NAMES`. The `label`
    /// only appears in logs and errors.
    pub fn new(label: &'static str) -> Self {
        let channels = E::NAMES.iter().map(|name| (*name, Vec::new())).collect();
        Self {
            state: Rc::new(BusState {
                label,
                channels: RefCell::new(channels),
                next_id: Cell::new(0),
            }),
        }
    }

    /// The event names this bus accepts.
    pub fn declared(&self) -> &'static [&'static str] {
        E::NAMES
    }

    /// The label given at construction.
    pub fn label(&self) -> &'static str {
        self.state.label
    }

    fn resolve(&self, event: &str) -> Result<&'static str, EngineError> {
        E::NAMES
            .iter()
            .copied()
            .find(|name| *name == event)
            .ok_or_else(|| EngineError::UnknownEvent {
                bus: self.state.label,
                event: event.to_owned(),
                declared: E::NAMES.join(", "),
            })
    }

    /// Subscribe `handler` to `event`.
    ///
    /// The handler stays registered until the returned [`Subscription`] is
    /// unsubscribed. Dropping the subscription does *not* unsubscribe.
    pub fn on<F>(&self, event: &str, handler: F) -> Result<Subscription, EngineError>
    where
        F: Fn(&E) + 'static,
    {
        let event = self.resolve(event)?;
        let id = self.state.next_id.get();
        self.state.next_id.set(id + 1);

        let active = Rc::new(Cell::new(true));
        self.state
            .channels
            .borrow_mut()
            .entry(event)
            .or_default()
            .push(Listener {
                id,
                active: active.clone(),
                handler: Rc::new(handler),
            });

        let bus: Weak<BusState<E>> = Rc::downgrade(&self.state);
        Ok(Subscription {
            event,
            active,
            remove: Some(Box::new(move || {
                if let Some(state) = bus.upgrade() {
                    state.remove(event, id);
                }
            })),
        })
    }

    /// Publish `event` to every current subscriber of its name.
    ///
    /// Returns how many handlers ran. Emitting with no subscribers is not an
    /// error.
    pub fn emit(&self, event: &E) -> Result<usize, EngineError> {
        let name = self.resolve(event.name())?;

        let snapshot: Vec<(Rc<Cell<bool>>, Handler<E>)> = self
            .state
            .channels
            .borrow()
            .get(name)
            .map(|listeners| {
                listeners
                    .iter()
                    .map(|l| (l.active.clone(), l.handler.clone()))
                    .collect()
            })
            .unwrap_or_default();

        let mut invoked = 0;
        for (active, handler) in snapshot {
            if active.get() {
                handler(event);
                invoked += 1;
            }
        }
        Ok(invoked)
    }

    /// Number of live subscriptions for `event`.
    pub fn listener_count(&self, event: &str) -> Result<usize, EngineError> {
        let event = self.resolve(event)?;
        Ok(self
            .state
            .channels
            .borrow()
            .get(event)
            .map_or(0, Vec::len))
    }
}

impl<E: EventSet> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<E: EventSet> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channels = self.state.channels.borrow();
        let mut counts: Vec<_> = channels.iter().map(|(k, v)| (*k, v.len())).collect();
        counts.sort();
        f.debug_struct("EventBus")
            .field("label", &self.state.label)
            .field("listeners", &counts)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// Handle returned by [`EventBus::on`]; the only way to remove a handler.
///
/// `unsubscribe` is idempotent and safe to call from inside the handler it
/// belongs to. If the bus has already been dropped it just marks the handle
/// inactive.
pub struct Subscription {
    event: &'static str,
    active: Rc<Cell<bool>>,
    remove: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Remove the handler. Returns `true` the first time, `false` afterwards.
    pub fn unsubscribe(&mut self) -> bool {
        let Some(remove) = self.remove.take() else {
            return false;
        };
        self.active.set(false);
        remove();
        true
    }

    /// Whether the handler is still registered.
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// The event this subscription listens to.
    pub fn event(&self) -> &'static str {
        self.event
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("event", &self.event)
            .field("active", &self.active.get())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
