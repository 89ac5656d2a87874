//! Motion domain: the per-character motion state machine.
//!
//! [`MotionController`] owns the tuning snapshot, input state, contact probe,
//! request slots and timer pool for one character. It is a Bevy component but
//! fully tickable without a world: the systems in `systems::movement` stage
//! avian's components into a [`BodyFrame`], call `tick_frame`/`tick_fixed`,
//! and write the frame back. Tests drive the same two methods directly.
//!
//! Within one fixed tick the order is: request slots, then contact probe, then
//! locomotion. Buffered actions firing this tick therefore see last tick's
//! contact state, while locomotion sees the current one.

use bevy::prelude::*;

use crate::motion::config::{ConfigError, DerivedMotion, MotionTuning};
use crate::motion::probe::{ContactEvent, ContactPhase, ContactProbe, ContactSample, ContactState};
use crate::motion::request::{Countdown, Request, RequestSlot, TimedPhase, TimerHandle, TimerPool};

/// Deadzone below which a target speed counts as "no movement input".
const MOVE_DEADZONE: f32 = 0.01;
/// Vertical speeds within this band count as standing still.
const STANDING_EPSILON: f32 = 0.05;
/// Downward input beyond which the character counts as crouching.
const CROUCH_THRESHOLD: f32 = 0.5;

/// Staged view of the physics body for one tick. Velocity and gravity scale
/// are copied in before a tick and written back after it; `force` and
/// `impulse` accumulate and are integrated into velocity by the caller
/// (unit mass).
#[derive(Debug, Clone, Copy)]
pub struct BodyFrame {
    pub velocity: Vec2,
    pub gravity_scale: f32,
    /// Continuous force accumulated this tick.
    pub force: Vec2,
    /// Instantaneous impulse accumulated this tick.
    pub impulse: Vec2,
    /// Facing sign, mirrors the transform's horizontal scale.
    pub facing: f32,
}

impl Default for BodyFrame {
    fn default() -> Self {
        Self {
            velocity: Vec2::ZERO,
            gravity_scale: 0.0,
            force: Vec2::ZERO,
            impulse: Vec2::ZERO,
            facing: 1.0,
        }
    }
}

impl BodyFrame {
    /// Velocity after folding in this tick's impulse and force.
    pub fn resolved_velocity(&self, dt: f32) -> Vec2 {
        self.velocity + self.impulse + self.force * dt
    }
}

/// Latched input state, updated through [`InputUpdate`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InputState {
    pub direction: Vec2,
    pub jump_held: bool,
}

/// Partial input update: fields left `None` keep their previous value.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputUpdate {
    pub direction: Option<Vec2>,
    pub jump_held: Option<bool>,
}

/// Mutable flags and counters of the motion state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionState {
    pub can_move: bool,
    pub dashing: bool,
    /// Dash cooldown has elapsed.
    pub dash_ready: bool,
    /// Dash re-arm condition, independent from the cooldown.
    pub dash_reset: bool,
    pub jump_cut: bool,
    pub crouch: bool,
    pub jump_count: u32,
    pub coyote_timer: f32,
    /// Fraction of time-to-apex elapsed since the last jump, 0..=1.
    pub jump_progress: f32,
    pub input: InputState,
}

impl Default for MotionState {
    fn default() -> Self {
        Self {
            can_move: true,
            dashing: false,
            dash_ready: true,
            dash_reset: true,
            jump_cut: false,
            crouch: false,
            jump_count: 0,
            coyote_timer: 0.0,
            jump_progress: 0.0,
            input: InputState::default(),
        }
    }
}

/// Outward notification drained by `systems::movement` into Bevy messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionEvent {
    JumpPerformed { jump_count: u32 },
}

/// Deferred controller operation queued by an action thunk. Thunks only see
/// the [`MotionCtx`]; anything touching the timer pool goes through here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MotionCommand {
    TrackJumpAscent,
    RestartDashCooldown,
}

/// Everything action thunks, predicates and observers may read or mutate:
/// tuning, derived constants, state flags, the staged body and the contact
/// snapshot of the current tick.
pub struct MotionCtx {
    pub tuning: MotionTuning,
    pub derived: DerivedMotion,
    pub state: MotionState,
    /// Read-only copy of the probe's aggregate state.
    pub contacts: ContactState,
    pub body: BodyFrame,
    events: Vec<MotionEvent>,
    commands: Vec<MotionCommand>,
}

impl MotionCtx {
    pub(crate) fn new(tuning: MotionTuning, derived: DerivedMotion) -> Self {
        Self {
            state: MotionState {
                coyote_timer: tuning.jump_coyote_time,
                ..MotionState::default()
            },
            body: BodyFrame {
                gravity_scale: derived.gravity_scale,
                ..BodyFrame::default()
            },
            contacts: ContactState::default(),
            derived,
            tuning,
            events: Vec::new(),
            commands: Vec::new(),
        }
    }

    pub fn is_jumping(&self) -> bool {
        self.body.velocity.y > 0.0
    }

    pub fn is_falling(&self) -> bool {
        self.body.velocity.y < 0.0 && !self.contacts.grounded
    }

    pub fn is_standing(&self) -> bool {
        self.body.velocity.y.abs() <= STANDING_EPSILON
    }

    /// Grounded-adjacent first jump via the coyote window, or an air jump
    /// while some jump is already spent and the budget allows another.
    pub fn can_jump(&self) -> bool {
        (self.state.coyote_timer > 0.0 && self.state.jump_count == 0)
            || (self.state.jump_count < self.tuning.jump_count && self.state.jump_count != 0)
    }

    pub fn can_dash(&self) -> bool {
        self.state.dash_ready && self.state.dash_reset && !self.state.dashing
    }

    fn cut_jump_ready(&self) -> bool {
        self.state.jump_progress >= self.tuning.min_jump_cut_percent
            && self.state.jump_progress <= self.tuning.max_jump_cut_percent
            && !self.state.input.jump_held
            && !(self.contacts.grounded || self.is_falling())
    }
}

impl std::fmt::Debug for MotionCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MotionCtx")
            .field("state", &self.state)
            .field("contacts", &self.contacts)
            .field("body", &self.body)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Gravity policy
// ----------------------------------------------------------------------------

/// One row of the gravity policy: first rule whose predicate holds supplies
/// the gravity scale for the tick.
pub struct GravityRule {
    pub name: &'static str,
    pub applies: fn(&MotionCtx) -> bool,
    pub scale: fn(&MotionCtx) -> f32,
}

/// The ordered gravity policy. Dashing outranks everything, then the cut-jump
/// fall, then the regular jump fall, then the base scale while grounded or
/// ascending. No match leaves gravity unchanged.
pub fn gravity_rules() -> &'static [GravityRule] {
    const RULES: [GravityRule; 4] = [
        GravityRule {
            name: "dash-fall",
            applies: |ctx| ctx.state.dashing,
            scale: |ctx| ctx.tuning.gravity_dash_fall,
        },
        GravityRule {
            name: "jump-cut-fall",
            applies: |ctx| ctx.is_jumping() && ctx.state.jump_cut && !ctx.contacts.grounded,
            scale: |ctx| ctx.derived.gravity_jump_cut_fall,
        },
        GravityRule {
            name: "jump-fall",
            applies: |ctx| {
                !ctx.contacts.grounded
                    && ctx.body.velocity.y <= ctx.tuning.velocity_fall_threshold
                    && (ctx.body.gravity_scale - ctx.derived.gravity_jump_cut_fall).abs()
                        > f32::EPSILON
            },
            scale: |ctx| ctx.derived.gravity_jump_fall,
        },
        GravityRule {
            name: "base",
            applies: |ctx| ctx.contacts.grounded || ctx.is_jumping(),
            scale: |ctx| ctx.derived.gravity_scale,
        },
    ];
    &RULES
}

/// First-match evaluation of the gravity policy. `None` means keep the
/// current gravity scale.
pub fn select_gravity(ctx: &MotionCtx) -> Option<f32> {
    gravity_rules()
        .iter()
        .find(|rule| (rule.applies)(ctx))
        .map(|rule| (rule.scale)(ctx))
}

// ----------------------------------------------------------------------------
// Controller
// ----------------------------------------------------------------------------

/// The motion core for one character.
#[derive(Component, Debug)]
pub struct MotionController {
    ctx: MotionCtx,
    probe: ContactProbe<MotionCtx>,
    jump_slot: RequestSlot<MotionCtx>,
    jump_cut_slot: RequestSlot<MotionCtx>,
    dash_slot: RequestSlot<MotionCtx>,
    timers: TimerPool<MotionCtx>,
    jump_ascent: Option<TimerHandle>,
    dash_cooldown: Option<TimerHandle>,
}

impl Default for MotionController {
    fn default() -> Self {
        // The default tuning is statically valid; skip validation.
        let tuning = MotionTuning::default();
        let derived = tuning.derive();
        Self::with_derived(tuning, derived)
    }
}

impl MotionController {
    /// Build a controller from raw tunables. Fails if the tuning does not
    /// survive [`MotionTuning::finalize`].
    pub fn new(tuning: MotionTuning) -> Result<Self, ConfigError> {
        let derived = tuning.finalize()?;
        Ok(Self::with_derived(tuning, derived))
    }

    fn with_derived(tuning: MotionTuning, derived: DerivedMotion) -> Self {
        let mut probe = ContactProbe::new(tuning.probe_max_hits as usize);
        probe.observe(on_contact_event);

        let ctx = MotionCtx::new(tuning, derived);

        Self {
            ctx,
            probe,
            jump_slot: RequestSlot::new(),
            jump_cut_slot: RequestSlot::new(),
            dash_slot: RequestSlot::new(),
            timers: TimerPool::default(),
            jump_ascent: None,
            dash_cooldown: None,
        }
    }

    pub fn tuning(&self) -> &MotionTuning {
        &self.ctx.tuning
    }

    pub fn derived(&self) -> &DerivedMotion {
        &self.ctx.derived
    }

    pub fn state(&self) -> &MotionState {
        &self.ctx.state
    }

    pub fn contacts(&self) -> &ContactState {
        &self.ctx.contacts
    }

    pub fn body(&self) -> &BodyFrame {
        &self.ctx.body
    }

    /// Samples of the most recent probe tick, for the dev overlay.
    pub fn contact_samples(&self) -> &[ContactSample] {
        self.probe.samples()
    }

    pub fn can_dash(&self) -> bool {
        self.ctx.can_dash()
    }

    pub fn can_jump(&self) -> bool {
        self.ctx.can_jump()
    }

    // ------------------------------------------------------------------
    // Input and external control
    // ------------------------------------------------------------------

    /// Partial input update; unspecified fields keep their previous value.
    pub fn apply_input(&mut self, update: InputUpdate) {
        let input = &mut self.ctx.state.input;
        input.direction = update.direction.unwrap_or(input.direction);
        input.jump_held = update.jump_held.unwrap_or(input.jump_held);
        self.ctx.state.crouch = input.direction.y < -CROUCH_THRESHOLD;
    }

    pub fn block_movement(&mut self) {
        self.ctx.state.can_move = false;
    }

    pub fn unlock_movement(&mut self) {
        self.ctx.state.can_move = true;
    }

    /// Copy the physics body into the staged frame before a tick.
    pub fn stage_body(&mut self, velocity: Vec2, gravity_scale: f32) {
        self.ctx.body.velocity = velocity;
        self.ctx.body.gravity_scale = gravity_scale;
        self.ctx.body.force = Vec2::ZERO;
        self.ctx.body.impulse = Vec2::ZERO;
    }

    pub fn drain_events(&mut self) -> Vec<MotionEvent> {
        std::mem::take(&mut self.ctx.events)
    }

    // ------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------

    /// Buffer a jump. Fires as soon as a jump is available within the input
    /// buffer window; silently expires otherwise.
    pub fn request_jump(&mut self) {
        self.jump_slot.force(Request {
            action: Box::new(jump_action),
            ready: Box::new(MotionCtx::can_jump),
            buffer: self.ctx.tuning.jump_input_buffer,
            phase: None,
        });
    }

    /// Buffer a jump cut. Only meaningful while ascending; the request waits
    /// for the jump-progress window and expires after a full apex time.
    pub fn request_cut_jump(&mut self) {
        if !self.ctx.is_jumping() {
            return;
        }
        self.jump_cut_slot.force(Request {
            action: Box::new(|ctx: &mut MotionCtx| ctx.state.jump_cut = true),
            ready: Box::new(MotionCtx::cut_jump_ready),
            buffer: self.ctx.tuning.jump_time_to_apex,
            phase: None,
        });
    }

    /// Buffer a dash. Firing pre-empts any in-flight cooldown, enters the
    /// dash state and plays the velocity profile for the dash duration.
    /// Presses while a dash is already playing are dropped; forcing the slot
    /// here would discard the playback phase and its completion, leaving the
    /// dash flags stuck.
    pub fn request_dash(&mut self) {
        if self.ctx.state.dashing {
            return;
        }
        let duration = self.ctx.tuning.dash_duration;
        self.dash_slot.force(Request {
            action: Box::new(|ctx: &mut MotionCtx| {
                ctx.commands.push(MotionCommand::RestartDashCooldown);
                ctx.state.dashing = true;
                ctx.state.dash_reset = false;
                ctx.state.can_move = false;
                ctx.body.velocity.y = 0.0;
            }),
            ready: Box::new(MotionCtx::can_dash),
            buffer: self.ctx.tuning.dash_input_buffer,
            phase: Some(TimedPhase {
                duration,
                on_tick: Box::new(|ctx: &mut MotionCtx, progress| {
                    let shaped = ctx.tuning.dash_curve.sample(progress).clamp(0.0, 1.0);
                    let vx = (shaped * ctx.tuning.dash_speed * ctx.body.facing)
                        .clamp(-ctx.tuning.dash_speed, ctx.tuning.dash_speed);
                    ctx.body.velocity = Vec2::new(vx, 0.0);
                }),
                on_complete: Box::new(|ctx: &mut MotionCtx| {
                    ctx.state.can_move = true;
                    ctx.state.dashing = false;
                }),
            }),
        });
    }

    // ------------------------------------------------------------------
    // Ticks
    // ------------------------------------------------------------------

    /// Variable-step tick: countdowns, coyote decay, facing, frame-phase of
    /// the request slots, then the gravity policy and fall-speed clamp.
    pub fn tick_frame(&mut self, dt: f32) {
        self.timers.tick(dt, &mut self.ctx);
        self.run_commands();

        if !self.ctx.contacts.is_colliding() && self.ctx.state.coyote_timer > 0.0 {
            self.ctx.state.coyote_timer = (self.ctx.state.coyote_timer - dt).max(0.0);
        }

        self.flip();

        self.jump_slot.tick_frame(dt, &mut self.ctx);
        self.jump_cut_slot.tick_frame(dt, &mut self.ctx);
        self.dash_slot.tick_frame(dt, &mut self.ctx);
        self.run_commands();

        if let Some(scale) = select_gravity(&self.ctx) {
            self.ctx.body.gravity_scale = scale;
        }
        // Not falling faster than the cap whenever gravity applies at all.
        if self.ctx.body.gravity_scale != 0.0 {
            self.ctx.body.velocity.y = self
                .ctx
                .body
                .velocity
                .y
                .max(-self.ctx.tuning.gravity_max_fall);
        }
    }

    /// Fixed-step tick: fixed-phase of the request slots, then the contact
    /// probe, then locomotion. This order is load-bearing, see module docs.
    pub fn tick_fixed(&mut self, dt: f32, samples: Vec<ContactSample>) {
        self.jump_slot.tick_fixed(dt, &mut self.ctx);
        self.jump_cut_slot.tick_fixed(dt, &mut self.ctx);
        self.dash_slot.tick_fixed(dt, &mut self.ctx);
        self.run_commands();

        self.probe.tick(samples, &mut self.ctx);
        self.ctx.contacts = *self.probe.state();

        if self.ctx.state.can_move {
            self.apply_locomotion();
        }
    }

    fn flip(&mut self) {
        let dir = self.ctx.state.input.direction.x;
        if dir == 0.0 {
            return;
        }
        let sign = if dir > 0.0 { 1.0 } else { -1.0 };
        if (self.ctx.body.facing - sign).abs() > f32::EPSILON {
            self.ctx.body.facing = sign;
        }
    }

    /// Blend horizontal velocity toward the input-directed target speed and
    /// apply the difference as a continuous force.
    fn apply_locomotion(&mut self) {
        let ctx = &mut self.ctx;
        let mut target = ctx.state.input.direction.x * ctx.tuning.move_max_speed;
        if ctx.is_standing() && ctx.state.crouch {
            // Crouch braking: only close half the gap while planted.
            target = ctx.body.velocity.x + (target - ctx.body.velocity.x) * 0.5;
        }

        let moving = target.abs() > MOVE_DEADZONE;
        let mut rate = if moving {
            ctx.derived.move_accel
        } else {
            ctx.derived.move_decel
        };
        if ctx.is_falling() || ctx.is_jumping() {
            rate *= if moving {
                ctx.tuning.move_air_acceleration
            } else {
                ctx.tuning.move_air_deceleration
            };
        }

        ctx.body.force.x += (target - ctx.body.velocity.x) * rate;
    }

    fn run_commands(&mut self) {
        let commands = std::mem::take(&mut self.ctx.commands);
        for command in commands {
            match command {
                MotionCommand::TrackJumpAscent => self.track_jump_ascent(),
                MotionCommand::RestartDashCooldown => self.restart_dash_cooldown(),
            }
        }
    }

    /// Count jump progress up to 1 over time-to-apex; a jump cut abandons the
    /// countdown, completion resets the fraction.
    fn track_jump_ascent(&mut self) {
        if let Some(handle) = self.jump_ascent.take() {
            self.timers.abort(handle);
        }
        let countdown = Countdown::new(self.ctx.tuning.jump_time_to_apex)
            .on_tick(|ctx: &mut MotionCtx, progress| ctx.state.jump_progress = progress)
            .on_complete(|ctx: &mut MotionCtx| ctx.state.jump_progress = 0.0)
            .abort_when(|ctx: &MotionCtx| ctx.state.jump_cut);
        self.jump_ascent = Some(self.timers.start(countdown));
    }

    /// Replace any in-flight cooldown with a fresh one. Dash readiness comes
    /// back when the cooldown completes; the reset flag only re-arms with it
    /// if the character is grounded at that moment.
    fn restart_dash_cooldown(&mut self) {
        if let Some(handle) = self.dash_cooldown.take() {
            self.timers.abort(handle);
        }
        self.ctx.state.dash_ready = false;
        let countdown =
            Countdown::new(self.ctx.tuning.dash_cooldown).on_complete(|ctx: &mut MotionCtx| {
                ctx.state.dash_ready = true;
                if ctx.contacts.grounded {
                    ctx.state.dash_reset = true;
                }
            });
        self.dash_cooldown = Some(self.timers.start(countdown));
    }
}

/// Firing a jump: reset the cut flag, spend a jump, zero vertical velocity
/// and launch with the derived impulse.
fn jump_action(ctx: &mut MotionCtx) {
    ctx.state.jump_cut = false;
    ctx.state.jump_count += 1;
    ctx.commands.push(MotionCommand::TrackJumpAscent);
    ctx.body.velocity.y = 0.0;
    ctx.body.impulse.y += ctx.derived.jump_force;
    ctx.events.push(MotionEvent::JumpPerformed {
        jump_count: ctx.state.jump_count,
    });
}

/// The controller's contact observer: a fresh ground or wall contact clears
/// the jump cut, restores the jump budget (one jump stays spent when only a
/// wall was touched), rewinds the coyote window and re-arms the dash.
fn on_contact_event(ctx: &mut MotionCtx, event: &ContactEvent) {
    if event.phase != ContactPhase::Entry {
        return;
    }
    if event.surface.grounded || event.surface.wall_dir != 0 {
        ctx.state.jump_cut = false;
        ctx.state.jump_count = if event.contacts.grounded { 0 } else { 1 };
        ctx.state.coyote_timer = ctx.tuning.jump_coyote_time;
        ctx.state.dash_reset = true;
    }
}
