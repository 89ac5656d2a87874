//! Motion domain: unit tests for probing, buffered requests and the
//! controller state machine.

use bevy::prelude::{Entity, Vec2, World};

use super::config::{ConfigError, Curve, MotionTuning};
use super::controller::{
    gravity_rules, select_gravity, MotionController, MotionCtx, MotionEvent,
};
use super::probe::{classify_normal, ContactEvent, ContactPhase, ContactProbe, ContactSample};
use super::request::{Countdown, Request, RequestSlot, TimerPool};
use super::InputUpdate;

const DT: f32 = 0.02;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1.0e-3
}

fn entities(count: usize) -> Vec<Entity> {
    let mut world = World::new();
    (0..count).map(|_| world.spawn_empty().id()).collect()
}

fn sample(entity: Entity, normal: Vec2) -> ContactSample {
    ContactSample {
        entity,
        normal,
        point: Vec2::ZERO,
    }
}

// -----------------------------------------------------------------------------
// Surface classification
// -----------------------------------------------------------------------------

#[test]
fn test_classify_normal_thresholds() {
    assert!(classify_normal(Vec2::Y).grounded);
    assert!(classify_normal(Vec2::NEG_Y).ceiling);

    // Normal pointing right means the wall sits on the left.
    assert_eq!(classify_normal(Vec2::X).wall_dir, -1);
    assert_eq!(classify_normal(Vec2::NEG_X).wall_dir, 1);

    // Steeper than 45 degrees counts as ground.
    let diagonal = Vec2::new(0.6, 0.8);
    assert!(classify_normal(diagonal).grounded);

    // Shallower than 45 degrees is a wall.
    let shallow = Vec2::new(0.8, 0.6);
    let contacts = classify_normal(shallow);
    assert!(!contacts.grounded);
    assert_eq!(contacts.wall_dir, -1);
}

// -----------------------------------------------------------------------------
// Contact probe
// -----------------------------------------------------------------------------

#[test]
fn test_probe_or_aggregation() {
    let ids = entities(3);
    let mut probe: ContactProbe<()> = ContactProbe::new(10);

    probe.tick(
        vec![
            sample(ids[0], Vec2::Y),
            sample(ids[1], Vec2::X),
            sample(ids[2], Vec2::NEG_Y),
        ],
        &mut (),
    );

    let state = probe.state();
    assert!(state.grounded);
    assert!(state.ceiling);
    assert_eq!(state.wall_dir, -1);
    assert_eq!(state.hit_count, 3);
}

#[test]
fn test_probe_wall_dir_keeps_first_nonzero() {
    let ids = entities(2);
    let mut probe: ContactProbe<()> = ContactProbe::new(10);

    // Opposite walls in one tick: whichever is scanned first wins.
    probe.tick(
        vec![sample(ids[0], Vec2::NEG_X), sample(ids[1], Vec2::X)],
        &mut (),
    );
    assert_eq!(probe.state().wall_dir, 1);
}

#[test]
fn test_probe_flags_do_not_persist() {
    let ids = entities(1);
    let mut probe: ContactProbe<()> = ContactProbe::new(10);

    probe.tick(vec![sample(ids[0], Vec2::Y)], &mut ());
    assert!(probe.state().grounded);

    probe.tick(Vec::new(), &mut ());
    let state = probe.state();
    assert!(!state.grounded);
    assert!(!state.ceiling);
    assert_eq!(state.wall_dir, 0);
    assert_eq!(state.hit_count, 0);
}

#[test]
fn test_probe_entry_stay_exit_order() {
    let ids = entities(2);
    let mut probe: ContactProbe<Vec<(ContactPhase, Entity)>> = ContactProbe::new(10);
    probe.observe(|log: &mut Vec<(ContactPhase, Entity)>, event: &ContactEvent| {
        log.push((event.phase, event.sample.entity));
    });

    let mut log = Vec::new();
    probe.tick(vec![sample(ids[0], Vec2::Y)], &mut log);
    assert_eq!(
        log,
        vec![(ContactPhase::Stay, ids[0]), (ContactPhase::Entry, ids[0])]
    );

    log.clear();
    probe.tick(
        vec![sample(ids[0], Vec2::Y), sample(ids[1], Vec2::X)],
        &mut log,
    );
    assert_eq!(
        log,
        vec![
            (ContactPhase::Stay, ids[0]),
            (ContactPhase::Stay, ids[1]),
            (ContactPhase::Entry, ids[1]),
        ]
    );

    log.clear();
    probe.tick(vec![sample(ids[1], Vec2::X)], &mut log);
    assert_eq!(
        log,
        vec![(ContactPhase::Exit, ids[0]), (ContactPhase::Stay, ids[1])]
    );
}

#[test]
fn test_probe_identity_includes_normal() {
    // A collider rotating in place changes its contact normal; identity is
    // the (entity, normal) pair, so this reads as an exit plus an entry.
    let ids = entities(1);
    let mut probe: ContactProbe<Vec<(ContactPhase, Entity)>> = ContactProbe::new(10);
    probe.observe(|log: &mut Vec<(ContactPhase, Entity)>, event: &ContactEvent| {
        log.push((event.phase, event.sample.entity));
    });

    let mut log = Vec::new();
    probe.tick(vec![sample(ids[0], Vec2::Y)], &mut log);

    log.clear();
    probe.tick(vec![sample(ids[0], Vec2::X)], &mut log);
    assert_eq!(
        log,
        vec![
            (ContactPhase::Exit, ids[0]),
            (ContactPhase::Stay, ids[0]),
            (ContactPhase::Entry, ids[0]),
        ]
    );
}

#[test]
fn test_probe_event_carries_tick_aggregate() {
    let ids = entities(1);
    let mut probe: ContactProbe<Vec<bool>> = ContactProbe::new(10);
    probe.observe(|log: &mut Vec<bool>, event: &ContactEvent| {
        if event.phase == ContactPhase::Entry {
            log.push(event.contacts.grounded);
        }
    });

    let mut log = Vec::new();
    probe.tick(vec![sample(ids[0], Vec2::Y)], &mut log);
    assert_eq!(log, vec![true]);
}

#[test]
fn test_probe_truncates_to_max_hits() {
    let ids = entities(3);
    let mut probe: ContactProbe<()> = ContactProbe::new(2);

    probe.tick(
        vec![
            sample(ids[0], Vec2::Y),
            sample(ids[1], Vec2::X),
            sample(ids[2], Vec2::NEG_X),
        ],
        &mut (),
    );
    assert_eq!(probe.state().hit_count, 2);
}

// -----------------------------------------------------------------------------
// Request slot
// -----------------------------------------------------------------------------

#[derive(Debug, Default)]
struct SlotCtx {
    ready: bool,
    fired: Vec<&'static str>,
    progress: Vec<f32>,
    completed: u32,
}

fn slot_request(name: &'static str, buffer: f32) -> Request<SlotCtx> {
    Request {
        action: Box::new(move |ctx: &mut SlotCtx| ctx.fired.push(name)),
        ready: Box::new(|ctx: &SlotCtx| ctx.ready),
        buffer,
        phase: None,
    }
}

fn phased_request(name: &'static str, buffer: f32, duration: f32) -> Request<SlotCtx> {
    Request {
        phase: Some(super::request::TimedPhase {
            duration,
            on_tick: Box::new(|ctx: &mut SlotCtx, progress| ctx.progress.push(progress)),
            on_complete: Box::new(|ctx: &mut SlotCtx| ctx.completed += 1),
        }),
        ..slot_request(name, buffer)
    }
}

#[test]
fn test_request_fires_immediately_when_ready() {
    let mut slot = RequestSlot::new();
    let mut ctx = SlotCtx {
        ready: true,
        ..SlotCtx::default()
    };

    slot.force(slot_request("a", 0.2));
    slot.tick_fixed(DT, &mut ctx);
    assert_eq!(ctx.fired, vec!["a"]);
    assert!(!slot.has_pending());
}

#[test]
fn test_request_waits_for_readiness() {
    let mut slot = RequestSlot::new();
    let mut ctx = SlotCtx::default();

    slot.force(slot_request("a", 0.2));
    for _ in 0..3 {
        slot.tick_frame(DT, &mut ctx);
        slot.tick_fixed(DT, &mut ctx);
    }
    assert!(ctx.fired.is_empty());
    assert!(slot.has_pending());

    ctx.ready = true;
    slot.tick_fixed(DT, &mut ctx);
    assert_eq!(ctx.fired, vec!["a"]);
}

#[test]
fn test_request_expires_silently() {
    let mut slot = RequestSlot::new();
    let mut ctx = SlotCtx::default();

    slot.force(slot_request("a", 0.1));
    for _ in 0..8 {
        slot.tick_frame(DT, &mut ctx);
    }
    assert!(ctx.fired.is_empty());
    assert!(!slot.has_pending());

    // Readiness arriving after expiry changes nothing.
    ctx.ready = true;
    slot.tick_frame(DT, &mut ctx);
    assert!(ctx.fired.is_empty());
}

#[test]
fn test_force_replaces_pending() {
    let mut slot = RequestSlot::new();
    let mut ctx = SlotCtx::default();

    slot.force(slot_request("first", 0.2));
    slot.force(slot_request("second", 0.2));
    ctx.ready = true;
    slot.tick_fixed(DT, &mut ctx);
    assert_eq!(ctx.fired, vec!["second"]);
}

#[test]
fn test_phase_progress_and_completion() {
    let mut slot = RequestSlot::new();
    let mut ctx = SlotCtx {
        ready: true,
        ..SlotCtx::default()
    };

    slot.force(phased_request("a", 0.2, 0.1));
    slot.tick_fixed(DT, &mut ctx);
    assert!(slot.phase_active());

    for _ in 0..8 {
        slot.tick_fixed(DT, &mut ctx);
    }
    assert!(!slot.phase_active());
    assert_eq!(ctx.completed, 1);

    // Monotonically increasing progress, ending at 1.
    for pair in ctx.progress.windows(2) {
        assert!(pair[1] >= pair[0]);
    }
    assert!(approx(*ctx.progress.last().unwrap(), 1.0));
}

#[test]
fn test_force_aborts_phase_without_completion() {
    let mut slot = RequestSlot::new();
    let mut ctx = SlotCtx {
        ready: true,
        ..SlotCtx::default()
    };

    slot.force(phased_request("a", 0.2, 0.2));
    slot.tick_fixed(DT, &mut ctx);
    slot.tick_fixed(DT, &mut ctx);
    assert!(slot.phase_active());

    // Pre-emption discards the in-flight phase silently.
    ctx.ready = false;
    slot.force(slot_request("b", 0.2));
    assert!(!slot.phase_active());
    assert_eq!(ctx.completed, 0);
}

#[test]
fn test_slot_abort_discards_everything() {
    let mut slot = RequestSlot::new();
    let mut ctx = SlotCtx::default();

    slot.force(phased_request("a", 0.2, 0.2));
    slot.abort();
    ctx.ready = true;
    slot.tick_fixed(DT, &mut ctx);
    assert!(ctx.fired.is_empty());
    assert_eq!(ctx.completed, 0);
}

// -----------------------------------------------------------------------------
// Countdowns
// -----------------------------------------------------------------------------

#[derive(Debug, Default)]
struct TimerCtx {
    ticks: Vec<f32>,
    completed: u32,
    abort: bool,
}

#[test]
fn test_countdown_progress_and_completion() {
    let mut pool: TimerPool<TimerCtx> = TimerPool::default();
    let mut ctx = TimerCtx::default();

    let handle = pool.start(
        Countdown::new(0.1)
            .on_tick(|ctx: &mut TimerCtx, progress| ctx.ticks.push(progress))
            .on_complete(|ctx: &mut TimerCtx| ctx.completed += 1),
    );

    for _ in 0..8 {
        pool.tick(DT, &mut ctx);
    }
    assert_eq!(ctx.completed, 1);
    assert!(!pool.is_running(handle));
    assert!(approx(*ctx.ticks.last().unwrap(), 1.0));
}

#[test]
fn test_countdown_abort_condition_skips_completion() {
    let mut pool: TimerPool<TimerCtx> = TimerPool::default();
    let mut ctx = TimerCtx::default();

    pool.start(
        Countdown::new(0.1)
            .on_tick(|ctx: &mut TimerCtx, progress| ctx.ticks.push(progress))
            .on_complete(|ctx: &mut TimerCtx| ctx.completed += 1)
            .abort_when(|ctx: &TimerCtx| ctx.abort),
    );

    pool.tick(DT, &mut ctx);
    ctx.abort = true;
    for _ in 0..8 {
        pool.tick(DT, &mut ctx);
    }
    assert_eq!(ctx.completed, 0);
    assert_eq!(ctx.ticks.len(), 1);
}

#[test]
fn test_timer_pool_abort_handle() {
    let mut pool: TimerPool<TimerCtx> = TimerPool::default();
    let mut ctx = TimerCtx::default();

    let handle = pool.start(
        Countdown::new(0.1).on_complete(|ctx: &mut TimerCtx| ctx.completed += 1),
    );
    pool.abort(handle);
    for _ in 0..8 {
        pool.tick(DT, &mut ctx);
    }
    assert_eq!(ctx.completed, 0);
    assert!(!pool.is_running(handle));
}

// -----------------------------------------------------------------------------
// Config finalize
// -----------------------------------------------------------------------------

#[test]
fn test_finalize_derived_math() {
    let tuning = MotionTuning::default();
    let derived = tuning.finalize().unwrap();

    // (tick_rate * accel) / max_speed with the defaults.
    assert!(approx(derived.move_accel, 50.0));
    assert!(approx(derived.move_decel, 50.0));

    // -(2h)/t^2 and the scale against world gravity.
    assert!(approx(derived.gravity_strength, -66.6667));
    assert!(approx(derived.gravity_scale, 66.6667 / 9.81));
    assert!(approx(
        derived.gravity_jump_cut_fall,
        derived.gravity_scale * 1.25
    ));

    // sqrt(2 h g): lands exactly back at the configured jump height.
    assert!(approx(derived.jump_force, 20.0));
}

#[test]
fn test_finalize_rejects_degenerate_tunables() {
    let zero_speed = MotionTuning {
        move_max_speed: 0.0,
        ..MotionTuning::default()
    };
    assert_eq!(
        zero_speed.finalize(),
        Err(ConfigError::NonPositive {
            field: "move_max_speed",
            value: 0.0
        })
    );

    let zero_apex = MotionTuning {
        jump_time_to_apex: 0.0,
        ..MotionTuning::default()
    };
    assert!(matches!(
        zero_apex.finalize(),
        Err(ConfigError::NonPositive {
            field: "jump_time_to_apex",
            ..
        })
    ));

    let inverted = MotionTuning {
        min_jump_cut_percent: 0.9,
        max_jump_cut_percent: 0.2,
        ..MotionTuning::default()
    };
    assert!(matches!(
        inverted.finalize(),
        Err(ConfigError::InvertedJumpCutWindow { .. })
    ));
}

#[test]
fn test_curve_sampling() {
    let curve = Curve::from_keys(vec![(0.0, 0.0), (1.0, 1.0)]);
    assert!(approx(curve.sample(0.5), 0.5));
    assert!(approx(curve.sample(-1.0), 0.0));
    assert!(approx(curve.sample(2.0), 1.0));

    assert!(approx(Curve::constant(0.7).sample(0.3), 0.7));
}

#[test]
fn test_curve_sorts_keys_on_deserialize() {
    // Authoring order in the data file must not matter.
    let curve: Curve = ron::from_str("(keys: [(1.0, 0.4), (0.0, 1.0)])").unwrap();
    assert!(approx(curve.sample(0.0), 1.0));
    assert!(approx(curve.sample(0.5), 0.7));
    assert!(approx(curve.sample(1.0), 0.4));
}

// -----------------------------------------------------------------------------
// Gravity policy
// -----------------------------------------------------------------------------

fn policy_ctx() -> MotionCtx {
    let tuning = MotionTuning::default();
    let derived = tuning.derive();
    MotionCtx::new(tuning, derived)
}

#[test]
fn test_gravity_rule_order_is_fixed() {
    let names: Vec<&str> = gravity_rules().iter().map(|rule| rule.name).collect();
    assert_eq!(names, vec!["dash-fall", "jump-cut-fall", "jump-fall", "base"]);
}

#[test]
fn test_gravity_dash_outranks_jump_cut() {
    let mut ctx = policy_ctx();
    ctx.state.dashing = true;
    ctx.state.jump_cut = true;
    ctx.body.velocity.y = 5.0;

    assert_eq!(select_gravity(&ctx), Some(ctx.tuning.gravity_dash_fall));
}

#[test]
fn test_gravity_jump_cut_fall() {
    let mut ctx = policy_ctx();
    ctx.state.jump_cut = true;
    ctx.body.velocity.y = 5.0;

    assert_eq!(select_gravity(&ctx), Some(ctx.derived.gravity_jump_cut_fall));
}

#[test]
fn test_gravity_fall_rule_respects_existing_cut_gravity() {
    let mut ctx = policy_ctx();
    ctx.body.velocity.y = -2.0;

    assert_eq!(select_gravity(&ctx), Some(ctx.derived.gravity_jump_fall));

    // Already at the jump-cut scale: the fall rule must not downgrade it,
    // and with no other rule matching, gravity stays unchanged.
    ctx.body.gravity_scale = ctx.derived.gravity_jump_cut_fall;
    assert_eq!(select_gravity(&ctx), None);
}

#[test]
fn test_gravity_base_when_grounded() {
    let mut ctx = policy_ctx();
    ctx.contacts.grounded = true;
    ctx.body.velocity.y = 0.0;

    assert_eq!(select_gravity(&ctx), Some(ctx.derived.gravity_scale));
}

// -----------------------------------------------------------------------------
// Controller integration
// -----------------------------------------------------------------------------

/// Drives a controller the way the schedules do: fixed tick, then frame tick,
/// folding force and impulse into a locally tracked velocity (unit mass,
/// no solver).
struct Harness {
    controller: MotionController,
    velocity: Vec2,
    gravity: f32,
    ground: Entity,
    wall: Entity,
}

impl Harness {
    fn new() -> Self {
        let controller = MotionController::default();
        let gravity = controller.derived().gravity_scale;
        let ids = entities(2);
        Self {
            controller,
            velocity: Vec2::ZERO,
            gravity,
            ground: ids[0],
            wall: ids[1],
        }
    }

    fn ground_sample(&self) -> ContactSample {
        sample(self.ground, Vec2::Y)
    }

    fn wall_sample(&self) -> ContactSample {
        sample(self.wall, Vec2::X)
    }

    fn step(&mut self, samples: Vec<ContactSample>) {
        self.controller.stage_body(self.velocity, self.gravity);
        self.controller.tick_fixed(DT, samples);
        let body = *self.controller.body();
        self.velocity = body.resolved_velocity(DT);
        self.gravity = body.gravity_scale;

        self.controller.stage_body(self.velocity, self.gravity);
        self.controller.tick_frame(DT);
        let body = *self.controller.body();
        self.velocity = body.resolved_velocity(DT);
        self.gravity = body.gravity_scale;
    }

    fn step_grounded(&mut self) {
        let s = self.ground_sample();
        self.step(vec![s]);
    }

    fn step_airborne(&mut self) {
        self.step(Vec::new());
    }
}

#[test]
fn test_grounded_jump_fires_same_tick() {
    let mut h = Harness::new();
    h.step_grounded();

    h.controller.request_jump();
    h.step_grounded();

    assert_eq!(h.controller.state().jump_count, 1);
    assert!(approx(h.velocity.y, h.controller.derived().jump_force));
    assert_eq!(
        h.controller.drain_events(),
        vec![MotionEvent::JumpPerformed { jump_count: 1 }]
    );
}

#[test]
fn test_jump_buffered_before_landing_fires_on_landing_tick() {
    let mut h = Harness::new();
    // Airborne long enough to burn the coyote window.
    for _ in 0..4 {
        h.step_airborne();
    }
    assert!(!h.controller.can_jump());

    h.controller.request_jump();
    h.step_airborne();
    h.step_airborne();
    assert_eq!(h.controller.state().jump_count, 0);

    // Landing tick: the probe entry rewinds the coyote window and the
    // buffered request fires within the same tick.
    h.step_grounded();
    assert_eq!(h.controller.state().jump_count, 1);
}

#[test]
fn test_coyote_window_allows_late_jump() {
    let mut h = Harness::new();
    h.step_grounded();

    // 0.02s after leaving the ground: still inside the 0.05s window.
    h.step_airborne();
    h.controller.request_jump();
    h.step_airborne();
    assert_eq!(h.controller.state().jump_count, 1);
}

#[test]
fn test_coyote_window_expires() {
    let mut h = Harness::new();
    h.step_grounded();

    // 0.06s airborne: the window is gone and no jump was ever spent, so
    // the air-jump clause cannot apply either.
    for _ in 0..3 {
        h.step_airborne();
    }
    h.controller.request_jump();
    h.step_airborne();
    assert_eq!(h.controller.state().jump_count, 0);
}

#[test]
fn test_double_jump_from_air() {
    let mut h = Harness::new();
    h.step_grounded();
    h.controller.request_jump();
    h.step_grounded();
    assert_eq!(h.controller.state().jump_count, 1);

    for _ in 0..4 {
        h.step_airborne();
    }
    h.controller.request_jump();
    h.step_airborne();
    assert_eq!(h.controller.state().jump_count, 2);

    // Jump budget exhausted.
    h.controller.request_jump();
    for _ in 0..3 {
        h.step_airborne();
    }
    assert_eq!(h.controller.state().jump_count, 2);
}

#[test]
fn test_jump_cut_sets_flag_and_gravity() {
    let mut h = Harness::new();
    h.step_grounded();
    h.controller.request_jump();
    h.step_grounded();

    // Ascending; let some jump progress accrue.
    h.step_airborne();
    h.step_airborne();
    assert!(h.controller.state().jump_progress > 0.0);

    h.controller.apply_input(InputUpdate {
        jump_held: Some(false),
        ..InputUpdate::default()
    });
    h.controller.request_cut_jump();
    h.step_airborne();

    assert!(h.controller.state().jump_cut);
    assert!(approx(
        h.gravity,
        h.controller.derived().gravity_jump_cut_fall
    ));
}

#[test]
fn test_cut_jump_ignored_when_not_ascending() {
    let mut h = Harness::new();
    h.step_grounded();

    h.controller.request_cut_jump();
    h.step_grounded();
    assert!(!h.controller.state().jump_cut);
}

#[test]
fn test_dash_forces_velocity_and_blocks_locomotion() {
    let mut h = Harness::new();
    h.step_grounded();

    h.controller.request_dash();
    h.step_grounded();
    assert!(h.controller.state().dashing);
    assert!(!h.controller.state().can_move);
    assert!(approx(h.gravity, h.controller.tuning().gravity_dash_fall));

    // Full speed in the facing direction while the profile plays, even with
    // opposing input; never above the dash speed.
    h.controller.apply_input(InputUpdate {
        direction: Some(Vec2::new(-1.0, 0.0)),
        ..InputUpdate::default()
    });
    for _ in 0..8 {
        h.step_grounded();
        if !h.controller.state().dashing {
            break;
        }
        assert!(h.velocity.x.abs() <= h.controller.tuning().dash_speed + 1.0e-3);
        assert!(approx(h.velocity.y, 0.0));
    }

    // Playback ends and locomotion resumes.
    for _ in 0..5 {
        if !h.controller.state().dashing {
            break;
        }
        h.step_grounded();
    }
    assert!(!h.controller.state().dashing);
    assert!(h.controller.state().can_move);
}

#[test]
fn test_dash_repress_during_playback_is_ignored() {
    let mut h = Harness::new();
    h.step_grounded();
    h.controller.request_dash();
    h.step_grounded();
    assert!(h.controller.state().dashing);

    // A second press mid-playback must not cancel the follow-through; the
    // dash still runs to completion and hands movement back.
    h.controller.request_dash();
    for _ in 0..60 {
        h.step_grounded();
    }
    assert!(!h.controller.state().dashing);
    assert!(h.controller.state().can_move);
    assert!(approx(h.gravity, h.controller.derived().gravity_scale));

    // And the cooldown ran down grounded, so a fresh dash is available.
    assert!(h.controller.can_dash());
}

#[test]
fn test_dash_rearms_when_cooldown_elapses_grounded() {
    let mut h = Harness::new();
    h.step_grounded();
    h.controller.request_dash();
    h.step_grounded();
    assert!(!h.controller.can_dash());

    // Stay grounded past both the playback and the cooldown.
    for _ in 0..15 {
        h.step_grounded();
    }
    assert!(h.controller.can_dash());
}

#[test]
fn test_dash_rearms_on_new_contact_after_airborne_cooldown() {
    let mut h = Harness::new();
    h.step_grounded();
    h.controller.request_dash();
    h.step_grounded();

    // Cooldown elapses airborne: ready again, but not reset.
    for _ in 0..15 {
        h.step_airborne();
    }
    assert!(!h.controller.state().dashing);
    assert!(h.controller.state().dash_ready);
    assert!(!h.controller.can_dash());

    // First new ground contact re-arms it.
    h.step_grounded();
    assert!(h.controller.can_dash());
}

#[test]
fn test_expired_request_leaves_state_unchanged() {
    let mut h = Harness::new();
    for _ in 0..4 {
        h.step_airborne();
    }
    let before = h.controller.state().clone();

    h.controller.request_jump();
    for _ in 0..12 {
        h.step_airborne();
    }

    assert_eq!(h.controller.state(), &before);
    assert!(h.controller.drain_events().is_empty());
}

#[test]
fn test_wall_contact_restores_single_jump() {
    let mut h = Harness::new();
    h.step_grounded();
    h.controller.request_jump();
    h.step_grounded();
    for _ in 0..4 {
        h.step_airborne();
    }
    h.controller.request_jump();
    h.step_airborne();
    assert_eq!(h.controller.state().jump_count, 2);

    // Wall-only contact: one jump stays spent.
    let wall = h.wall_sample();
    h.step(vec![wall]);
    assert_eq!(h.controller.state().jump_count, 1);
    assert!(h.controller.can_jump());
    assert_eq!(h.controller.contacts().wall_dir, -1);
}

#[test]
fn test_fall_speed_clamped_to_max_fall() {
    let mut h = Harness::new();
    h.velocity.y = -100.0;
    h.step_airborne();

    assert!(approx(h.velocity.y, -h.controller.tuning().gravity_max_fall));
    assert!(approx(h.gravity, h.controller.derived().gravity_jump_fall));
}

#[test]
fn test_locomotion_accelerates_to_target() {
    let mut h = Harness::new();
    h.step_grounded();

    h.controller.apply_input(InputUpdate {
        direction: Some(Vec2::new(1.0, 0.0)),
        ..InputUpdate::default()
    });
    h.step_grounded();
    assert!(approx(h.velocity.x, h.controller.tuning().move_max_speed));

    // Releasing input decelerates back to rest.
    h.controller.apply_input(InputUpdate {
        direction: Some(Vec2::ZERO),
        ..InputUpdate::default()
    });
    h.step_grounded();
    assert!(approx(h.velocity.x, 0.0));
}

#[test]
fn test_air_acceleration_is_scaled() {
    let mut h = Harness::new();
    h.velocity.y = 3.0; // ascending
    h.controller.apply_input(InputUpdate {
        direction: Some(Vec2::new(1.0, 0.0)),
        ..InputUpdate::default()
    });
    h.step_airborne();

    let tuning = h.controller.tuning();
    let expected = tuning.move_max_speed
        * h.controller.derived().move_accel
        * tuning.move_air_acceleration
        * DT;
    assert!(approx(h.velocity.x, expected));
}

#[test]
fn test_crouch_brake_halves_target_blend() {
    let mut h = Harness::new();
    h.step_grounded();

    h.controller.apply_input(InputUpdate {
        direction: Some(Vec2::new(1.0, -1.0)),
        ..InputUpdate::default()
    });
    assert!(h.controller.state().crouch);
    h.step_grounded();
    assert!(approx(h.velocity.x, h.controller.tuning().move_max_speed * 0.5));
}

#[test]
fn test_blocked_movement_skips_locomotion() {
    let mut h = Harness::new();
    h.step_grounded();
    h.controller.block_movement();

    h.controller.apply_input(InputUpdate {
        direction: Some(Vec2::new(1.0, 0.0)),
        ..InputUpdate::default()
    });
    h.step_grounded();
    assert!(approx(h.velocity.x, 0.0));

    h.controller.unlock_movement();
    h.step_grounded();
    assert!(h.velocity.x > 0.0);
}

#[test]
fn test_partial_input_update_keeps_previous_fields() {
    let mut h = Harness::new();
    h.controller.apply_input(InputUpdate {
        direction: Some(Vec2::new(1.0, 0.0)),
        jump_held: Some(true),
    });

    h.controller.apply_input(InputUpdate {
        direction: None,
        jump_held: Some(false),
    });
    assert_eq!(h.controller.state().input.direction, Vec2::new(1.0, 0.0));
    assert!(!h.controller.state().input.jump_held);

    h.controller.apply_input(InputUpdate {
        direction: Some(Vec2::ZERO),
        jump_held: None,
    });
    assert_eq!(h.controller.state().input.direction, Vec2::ZERO);
    assert!(!h.controller.state().input.jump_held);
}

#[test]
fn test_facing_flips_only_on_nonzero_input() {
    let mut h = Harness::new();
    assert!(approx(h.controller.body().facing, 1.0));

    h.controller.apply_input(InputUpdate {
        direction: Some(Vec2::new(-1.0, 0.0)),
        ..InputUpdate::default()
    });
    h.step_grounded();
    assert!(approx(h.controller.body().facing, -1.0));

    h.controller.apply_input(InputUpdate {
        direction: Some(Vec2::ZERO),
        ..InputUpdate::default()
    });
    h.step_grounded();
    assert!(approx(h.controller.body().facing, -1.0));
}
