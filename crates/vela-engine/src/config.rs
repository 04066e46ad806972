//! Runtime configuration.

use crate::math::Vec3;
use crate::physics::DEFAULT_GRAVITY;

/// Timing and physics parameters for a [`Game3D`](crate::game::Game3D).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameConfig {
    /// Seconds per simulation step. Must be positive and finite.
    pub fixed_dt: f64,
    /// Longest frame delta accepted; longer gaps (a backgrounded tab, a
    /// debugger pause) are clamped to this. `None` accepts any delta.
    pub max_frame_delta: Option<f64>,
    /// Upper bound on steps drained in one frame. Time beyond it is dropped.
    /// `None` drains the whole accumulator, so no simulation time is lost.
    pub max_steps_per_frame: Option<u32>,
    /// Acceleration applied to dynamic bodies, metres per second squared.
    pub gravity: Vec3,
    /// No window; drivers tick as fast as they like.
    pub headless: bool,
}

impl Default for GameConfig {
    /// 60 Hz with Earth gravity. No clamp and no step cap.
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            max_frame_delta: None,
            max_steps_per_frame: None,
            gravity: DEFAULT_GRAVITY,
            headless: false,
        }
    }
}

impl GameConfig {
    /// The default configuration without a window.
    pub fn headless() -> Self {
        Self {
            headless: true,
            ..Self::default()
        }
    }

    /// Bound the work of one frame for interactive drivers: deltas clamp to
    /// `max_frame_delta` and at most `max_steps` steps run per frame. Time
    /// past either limit is dropped, trading determinism for responsiveness.
    pub fn with_frame_limits(mut self, max_frame_delta: f64, max_steps: u32) -> Self {
        self.max_frame_delta = Some(max_frame_delta);
        self.max_steps_per_frame = Some(max_steps);
        self
    }

    /// # Panics
    ///
    /// Panics if `fixed_dt` is not positive and finite, if `max_frame_delta`
    /// is set but negative or not finite, or if `max_steps_per_frame` is set
    /// to zero.
    pub fn validate(&self) {
        assert!(
            self.fixed_dt > 0.0 && self.fixed_dt.is_finite(),
            "fixed_dt must be positive and finite, got {}",
            self.fixed_dt
        );
        if let Some(max) = self.max_frame_delta {
            assert!(
                max >= 0.0 && max.is_finite(),
                "max_frame_delta must be non-negative and finite, got {max}"
            );
        }
        assert!(
            self.max_steps_per_frame != Some(0),
            "max_steps_per_frame must be at least 1"
        );
    }
}
