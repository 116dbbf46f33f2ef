//! In-memory renderer that records what it was asked to draw.

use std::cell::RefCell;
use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::{Renderer, VisualId};
use crate::components::Position;

/// Largest numeric suffix [`Renderer::name_visual`] appends.
const NAME_SUFFIX_MAX: u32 = 1000;

#[derive(Debug, Clone)]
struct Visual {
    name: String,
    position: Position,
}

#[derive(Debug)]
struct State {
    next_id: u64,
    live: BTreeMap<VisualId, Visual>,
    dispose_calls: u64,
    stale_disposes: u64,
    rng: Pcg32,
}

/// A [`Renderer`] with no output. Tracks live visuals and their last
/// position, plus running dispose totals.
///
/// Memory is proportional to the number of live visuals; nothing is kept for
/// a visual once it is disposed.
///
/// Generated names are deterministic for a given seed.
#[derive(Debug)]
pub struct HeadlessRenderer {
    state: RefCell<State>,
}

impl HeadlessRenderer {
    /// Create a renderer whose generated names are drawn from `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            state: RefCell::new(State {
                next_id: 0,
                live: BTreeMap::new(),
                dispose_calls: 0,
                stale_disposes: 0,
                rng: Pcg32::seed_from_u64(seed),
            }),
        }
    }

    /// Number of visuals created and not yet disposed.
    pub fn live_count(&self) -> usize {
        self.state.borrow().live.len()
    }

    /// Whether `visual` was created and not yet disposed.
    pub fn is_live(&self, visual: VisualId) -> bool {
        self.state.borrow().live.contains_key(&visual)
    }

    /// Last position pushed to a live visual.
    pub fn position(&self, visual: VisualId) -> Option<Position> {
        self.state.borrow().live.get(&visual).map(|v| v.position)
    }

    /// Name of a live visual.
    pub fn name(&self, visual: VisualId) -> Option<String> {
        self.state.borrow().live.get(&visual).map(|v| v.name.clone())
    }

    /// Total `dispose` calls, including ignored ones.
    pub fn dispose_calls(&self) -> u64 {
        self.state.borrow().dispose_calls
    }

    /// `dispose` calls for visuals that were not live at the time.
    pub fn stale_disposes(&self) -> u64 {
        self.state.borrow().stale_disposes
    }

    /// Names of live visuals in creation order.
    pub fn live_names(&self) -> Vec<String> {
        self.state
            .borrow()
            .live
            .values()
            .map(|v| v.name.clone())
            .collect()
    }
}

impl Default for HeadlessRenderer {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Renderer for HeadlessRenderer {
    fn create_visual(&self, name: &str) -> VisualId {
        let mut state = self.state.borrow_mut();
        let id = VisualId(state.next_id);
        state.next_id += 1;
        state.live.insert(
            id,
            Visual {
                name: name.to_owned(),
                position: Position::default(),
            },
        );
        id
    }

    fn set_position(&self, visual: VisualId, position: Position) {
        if let Some(v) = self.state.borrow_mut().live.get_mut(&visual) {
            v.position = position;
        }
    }

    fn dispose(&self, visual: VisualId) {
        let mut state = self.state.borrow_mut();
        state.dispose_calls += 1;
        if state.live.remove(&visual).is_none() {
            state.stale_disposes += 1;
            tracing::warn!(%visual, "dispose of a visual that is not live");
        }
    }

    fn name_visual(&self, prefix: &str) -> String {
        let n = self.state.borrow_mut().rng.gen_range(0..=NAME_SUFFIX_MAX);
        format!("{prefix}{n}")
    }
}
