//! Engine configuration.
//!
//! Loaded from a TOML file when the embedder has one; every field has a
//! default so an absent or partial file is fine.

use std::path::Path;

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_EVENT_CAPACITY: usize = 256;
const DEFAULT_ANIM_TICK_MS: u64 = 16;
const DEFAULT_ANIM_SMOOTHING: f32 = 0.2;

/// Progress-bar easing parameters (`[anim]` in engine.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnimConfig {
    /// Milliseconds between easing steps.
    pub tick_ms: u64,
    /// Fraction of the remaining distance covered per step, in (0, 1].
    pub smoothing: f32,
}

impl Default for AnimConfig {
    fn default() -> Self {
        Self {
            tick_ms: DEFAULT_ANIM_TICK_MS,
            smoothing: DEFAULT_ANIM_SMOOTHING,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Broadcast channel capacity for engine events.
    pub event_capacity: usize,
    pub anim: AnimConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_capacity: DEFAULT_EVENT_CAPACITY,
            anim: AnimConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Read configuration from a TOML file, falling back to defaults when
    /// the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading engine config {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("parsing engine config {}", path.display()))
    }
}
