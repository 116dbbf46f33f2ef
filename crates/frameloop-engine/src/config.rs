//! Runtime configuration.
//!
//! [`TickConfig`] is plain serde data. Every field has a default, so a JSON
//! file only needs to name what it changes:
//!
//! ```
//! use frameloop_engine::config::TickConfig;
//!
//! let config = TickConfig::from_json_str(r#"{ "seed": 42 }"#).unwrap();
//! assert_eq!(config.seed, 42);
//! assert_eq!(config.max_frames, 600);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Frame and demo settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Seconds per frame when the engine drives itself. Must be positive and finite.
    pub fixed_dt: f64,
    /// Seed for the headless renderer's name generator.
    pub seed: u64,
    /// Frames a self-driven run lasts.
    pub max_frames: u64,
}

impl Default for TickConfig {
    /// 60 Hz, seed 0, ten seconds of frames.
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            seed: 0,
            max_frames: 600,
        }
    }
}

impl TickConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| EngineError::Config(format!("malformed JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    /// Check value ranges. Deserialization alone does not reject a zero `fixed_dt`.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.fixed_dt > 0.0 && self.fixed_dt.is_finite()) {
            return Err(EngineError::Config(format!(
                "fixed_dt must be positive and finite, got {}",
                self.fixed_dt
            )));
        }
        Ok(())
    }

    /// `fixed_dt` in the millisecond unit hosts report.
    pub fn fixed_dt_ms(&self) -> f64 {
        self.fixed_dt * 1000.0
    }
}
