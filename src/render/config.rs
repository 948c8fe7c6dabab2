//! Render configuration.

use serde::{Deserialize, Serialize};

/// Environment variable overriding [`RenderConfig::threads`].
pub const THREADS_ENV: &str = "SCANLINE_THREADS";

/// Default near-plane epsilon: minimum depth a rasterized sample may have.
pub const NEAR_EPSILON: f32 = 0.001;

/// Winding (as seen in a right-handed world from the camera) that counts as
/// front-facing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrontFace {
    #[default]
    CounterClockwise,
    Clockwise,
}

impl FrontFace {
    /// Whether a screen-space signed area (y down, see
    /// `core::math::signed_area`) is front-facing.
    #[inline]
    pub fn is_front(self, signed_area: f32) -> bool {
        match self {
            FrontFace::CounterClockwise => signed_area < 0.0,
            FrontFace::Clockwise => signed_area > 0.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Worker threads per render call; `None` uses the hardware concurrency.
    pub threads: Option<usize>,

    /// Near-plane epsilon: geometry is clipped to depth >= this value and
    /// samples at or below it are never written.
    pub near_epsilon: f32,

    /// Divide x/y by |depth| instead of depth, so vertices behind the camera
    /// stay on their own side of the screen for the frustum-plane test.
    pub divide_by_abs_depth: bool,

    pub front_face: FrontFace,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            threads: None,
            near_epsilon: NEAR_EPSILON,
            divide_by_abs_depth: true,
            front_face: FrontFace::CounterClockwise,
        }
    }
}

impl RenderConfig {
    /// Defaults, with `SCANLINE_THREADS` applied when set to a positive
    /// integer.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(value) = std::env::var(THREADS_ENV) {
            match value.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.threads = Some(n),
                _ => log::warn!("ignoring {THREADS_ENV}={value:?}: expected a positive integer"),
            }
        }
        config
    }

    /// Resolved worker count (at least 1).
    pub fn worker_count(&self) -> usize {
        self.threads
            .or_else(|| std::thread::available_parallelism().ok().map(|n| n.get()))
            .unwrap_or(1)
            .max(1)
    }
}
