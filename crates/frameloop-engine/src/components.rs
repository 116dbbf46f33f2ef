//! Components shared by the built-in systems and entities.

use serde::{Deserialize, Serialize};

use crate::render::VisualHandle;

/// World-space position of a visual.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    /// Construct a position from its coordinates.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Horizontal travel direction of an oscillating entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Moving {
    pub going_left: bool,
}

/// The renderer resource an entity is drawn with.
///
/// Owns its [`VisualHandle`]; despawning the entity drops the component,
/// which disposes the visual.
#[derive(Debug)]
pub struct MeshHandle(pub VisualHandle);
