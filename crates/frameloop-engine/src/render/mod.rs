//! The renderer contract.
//!
//! The engine never talks to a graphics API. It needs three things from
//! whatever draws the scene: create a visual, move it, and dispose of it.
//! [`Renderer`] is that surface, and [`VisualHandle`] is the owned token for
//! one visual that guarantees the dispose happens exactly once.
//!
//! [`HeadlessRenderer`] implements the contract in memory for tests, demos
//! and headless runs.

mod headless;

use std::fmt;
use std::rc::Rc;

pub use headless::HeadlessRenderer;

use crate::components::Position;

/// Opaque identity of one renderer resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VisualId(pub(crate) u64);

impl VisualId {
    /// The raw numeric id.
    pub fn to_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for VisualId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "visual#{}", self.0)
    }
}

/// What the engine needs from a rendering backend.
///
/// Methods take `&self`; backends keep their state behind interior
/// mutability so a single renderer can be shared by every handle.
pub trait Renderer {
    /// Create a visual called `name` at the origin.
    fn create_visual(&self, name: &str) -> VisualId;

    /// Move a visual. Unknown or disposed ids are ignored.
    fn set_position(&self, visual: VisualId, position: Position);

    /// Release a visual. Unknown or already disposed ids are ignored.
    fn dispose(&self, visual: VisualId);

    /// Pick a display name starting with `prefix`.
    fn name_visual(&self, prefix: &str) -> String {
        prefix.to_owned()
    }
}

/// Owned token for one visual.
///
/// Disposes its visual exactly once: on the first [`dispose`](Self::dispose)
/// call, or on drop if that never happened.
pub struct VisualHandle {
    id: VisualId,
    renderer: Rc<dyn Renderer>,
    disposed: bool,
}

impl VisualHandle {
    /// Create a new visual on `renderer`.
    pub fn create(renderer: &Rc<dyn Renderer>, name: &str) -> Self {
        let id = renderer.create_visual(name);
        tracing::trace!(%id, name, "visual created");
        Self {
            id,
            renderer: renderer.clone(),
            disposed: false,
        }
    }

    /// The visual this handle owns.
    pub fn id(&self) -> VisualId {
        self.id
    }

    /// Whether the visual has been released.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Push a new transform. Ignored once disposed.
    pub fn set_position(&self, position: Position) {
        if !self.disposed {
            self.renderer.set_position(self.id, position);
        }
    }

    /// Release the visual. Returns `false` if it was already released.
    pub fn dispose(&mut self) -> bool {
        if self.disposed {
            return false;
        }
        self.disposed = true;
        self.renderer.dispose(self.id);
        tracing::trace!(id = %self.id, "visual disposed");
        true
    }
}

impl Drop for VisualHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for VisualHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisualHandle")
            .field("id", &self.id)
            .field("disposed", &self.disposed)
            .finish()
    }
}
