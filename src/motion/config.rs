//! Motion domain: tunables and the derived constants computed from them.
//!
//! `MotionTuning` holds the human-authored values, in "seconds to reach target
//! speed" / jump-height-and-apex-time semantics. `finalize` validates them and
//! produces an immutable `DerivedMotion` snapshot that all tick logic consumes.
//! Derived constants never change between config changes.

use serde::Deserialize;

/// Vertical world gravity the gravity-scale constants are expressed against.
/// Must match the `Gravity` resource the physics plugin runs with.
pub const WORLD_GRAVITY_Y: f32 = -9.81;

/// A one-dimensional easing curve over normalized time, sampled with linear
/// interpolation between keys and clamped at both ends. `sample` assumes the
/// keys are ascending; every constructor, deserialization included, sorts.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "RawCurve")]
pub struct Curve {
    keys: Vec<(f32, f32)>,
}

#[derive(Deserialize)]
struct RawCurve {
    keys: Vec<(f32, f32)>,
}

impl From<RawCurve> for Curve {
    fn from(raw: RawCurve) -> Self {
        Curve::from_keys(raw.keys)
    }
}

impl Curve {
    pub fn constant(value: f32) -> Self {
        Self {
            keys: vec![(0.0, value), (1.0, value)],
        }
    }

    pub fn from_keys(mut keys: Vec<(f32, f32)>) -> Self {
        keys.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { keys }
    }

    pub fn sample(&self, t: f32) -> f32 {
        let Some(first) = self.keys.first() else {
            return 0.0;
        };
        if t <= first.0 {
            return first.1;
        }
        for pair in self.keys.windows(2) {
            let (t0, v0) = pair[0];
            let (t1, v1) = pair[1];
            if t <= t1 {
                if t1 - t0 <= f32::EPSILON {
                    return v1;
                }
                let s = (t - t0) / (t1 - t0);
                return v0 + (v1 - v0) * s;
            }
        }
        // past the last key
        self.keys[self.keys.len() - 1].1
    }
}

impl Default for Curve {
    fn default() -> Self {
        Self::constant(1.0)
    }
}

/// Raw motion tunables. Loaded from RON or built in code; run through
/// [`MotionTuning::finalize`] before any of it drives a tick.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MotionTuning {
    // Gravity
    /// Maximum downward speed while any gravity applies.
    pub gravity_max_fall: f32,

    // Movement
    pub move_acceleration: f32,
    pub move_deceleration: f32,
    pub move_max_speed: f32,
    /// Acceleration multiplier while airborne, 0..=1.
    pub move_air_acceleration: f32,
    /// Deceleration multiplier while airborne, 0..=1.
    pub move_air_deceleration: f32,

    // Jump
    /// Total jumps available before touching ground again.
    pub jump_count: u32,
    /// Apex height of a full jump, world units.
    pub jump_height: f32,
    /// Time to reach the jump apex, seconds.
    pub jump_time_to_apex: f32,
    /// Gravity multiplier while falling after a full jump.
    pub jump_fall: f32,
    /// Gravity multiplier while falling after a cut jump.
    pub jump_cut_fall: f32,
    /// Lower bound of the jump-progress window in which a release cuts the jump.
    pub min_jump_cut_percent: f32,
    /// Upper bound of the same window.
    pub max_jump_cut_percent: f32,
    /// Grace window after leaving ground during which a jump still counts
    /// as grounded-initiated.
    pub jump_coyote_time: f32,
    /// How long a jump press stays buffered while its condition is false.
    pub jump_input_buffer: f32,
    /// Vertical velocity at or below which the fall gravity kicks in.
    pub velocity_fall_threshold: f32,

    // Dash
    pub dash_cooldown: f32,
    pub dash_speed: f32,
    pub dash_duration: f32,
    pub dash_input_buffer: f32,
    /// Gravity scale while dashing. Zero pins the dash to a horizontal line.
    pub gravity_dash_fall: f32,
    /// Velocity profile over normalized dash time.
    pub dash_curve: Curve,

    // Body / probe
    pub collider_width: f32,
    pub collider_height: f32,
    /// Inflation applied to the probe box on each axis.
    pub probe_size_offset: f32,
    /// Upper bound on contacts considered per probe tick.
    pub probe_max_hits: u32,
    /// Fixed simulation rate in Hz; feeds the accel-rate conversion.
    pub fixed_tick_rate: f32,
}

impl Default for MotionTuning {
    fn default() -> Self {
        Self {
            gravity_max_fall: 30.0,
            move_acceleration: 11.0,
            move_deceleration: 11.0,
            move_max_speed: 11.0,
            move_air_acceleration: 0.4,
            move_air_deceleration: 0.4,
            jump_count: 2,
            jump_height: 3.0,
            jump_time_to_apex: 0.3,
            jump_fall: 1.0,
            jump_cut_fall: 1.25,
            min_jump_cut_percent: 0.0,
            max_jump_cut_percent: 0.8,
            jump_coyote_time: 0.05,
            jump_input_buffer: 0.2,
            velocity_fall_threshold: 0.5,
            dash_cooldown: 0.2,
            dash_speed: 20.0,
            dash_duration: 0.2,
            dash_input_buffer: 0.1,
            gravity_dash_fall: 0.0,
            dash_curve: Curve::default(),
            collider_width: 0.5,
            collider_height: 1.0,
            probe_size_offset: 0.1,
            probe_max_hits: 10,
            fixed_tick_rate: 50.0,
        }
    }
}

/// A tunable combination that would break derived-constant math.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    NonPositive { field: &'static str, value: f32 },
    InvertedJumpCutWindow { min: f32, max: f32 },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NonPositive { field, value } => {
                write!(f, "tunable '{}' must be positive, got {}", field, value)
            }
            ConfigError::InvertedJumpCutWindow { min, max } => {
                write!(f, "jump cut window is inverted: min {} > max {}", min, max)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Constants derived from [`MotionTuning`]. Immutable once computed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedMotion {
    /// Per-tick rate multiplier toward target speed while accelerating.
    pub move_accel: f32,
    /// Same while decelerating.
    pub move_decel: f32,
    /// Downward acceleration implied by jump height and apex time.
    pub gravity_strength: f32,
    /// Base gravity scale relative to world gravity.
    pub gravity_scale: f32,
    pub gravity_jump_fall: f32,
    pub gravity_jump_cut_fall: f32,
    /// Upward impulse magnitude producing the configured jump height.
    pub jump_force: f32,
}

impl MotionTuning {
    /// Validate the raw tunables and compute the derived constants.
    /// Rejects anything that would divide by zero at tick time.
    pub fn finalize(&self) -> Result<DerivedMotion, ConfigError> {
        for (field, value) in [
            ("move_max_speed", self.move_max_speed),
            ("jump_height", self.jump_height),
            ("jump_time_to_apex", self.jump_time_to_apex),
            ("dash_duration", self.dash_duration),
            ("dash_cooldown", self.dash_cooldown),
            ("fixed_tick_rate", self.fixed_tick_rate),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::NonPositive { field, value });
            }
        }
        if self.min_jump_cut_percent > self.max_jump_cut_percent {
            return Err(ConfigError::InvertedJumpCutWindow {
                min: self.min_jump_cut_percent,
                max: self.max_jump_cut_percent,
            });
        }
        Ok(self.derive())
    }

    /// The raw math behind [`finalize`](Self::finalize). Infallible; only the
    /// default tuning and already-validated tunings should reach it directly.
    pub(crate) fn derive(&self) -> DerivedMotion {
        let accel = self.move_acceleration.clamp(0.01, self.move_max_speed);
        let decel = self.move_deceleration.clamp(0.01, self.move_max_speed);
        let move_accel = (self.fixed_tick_rate * accel) / self.move_max_speed;
        let move_decel = (self.fixed_tick_rate * decel) / self.move_max_speed;

        let gravity_strength =
            -(2.0 * self.jump_height) / (self.jump_time_to_apex * self.jump_time_to_apex);
        let gravity_scale = gravity_strength / WORLD_GRAVITY_Y;

        DerivedMotion {
            move_accel,
            move_decel,
            gravity_strength,
            gravity_scale,
            gravity_jump_fall: gravity_scale * self.jump_fall,
            gravity_jump_cut_fall: gravity_scale * self.jump_cut_fall,
            jump_force: (2.0 * self.jump_height * gravity_strength.abs()).sqrt(),
        }
    }
}
