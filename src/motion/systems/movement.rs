//! Motion domain: frame and fixed ticks bridging the controller to avian.
//!
//! Both systems stage `LinearVelocity`/`GravityScale` into the controller's
//! body frame, run the tick, and write the resolved frame back. Force and
//! impulse accumulators are integrated here against a unit-mass body.

use avian2d::prelude::*;
use bevy::ecs::message::{MessageReader, MessageWriter};
use bevy::prelude::*;

use crate::motion::events::{JumpPerformedEvent, MovementConditionEvent};
use crate::motion::systems::collisions::probe_contacts;
use crate::motion::{MotionController, MotionEvent, Player};

pub(crate) fn frame_tick(
    time: Res<Time>,
    mut jump_events: MessageWriter<JumpPerformedEvent>,
    mut query: Query<
        (
            &mut MotionController,
            &mut LinearVelocity,
            &mut GravityScale,
            &mut Transform,
        ),
        With<Player>,
    >,
) {
    let dt = time.delta_secs();

    for (mut controller, mut velocity, mut gravity, mut transform) in &mut query {
        controller.stage_body(velocity.0, gravity.0);
        controller.tick_frame(dt);

        let body = *controller.body();
        velocity.0 = body.resolved_velocity(dt);
        gravity.0 = body.gravity_scale;
        transform.scale.x = body.facing * transform.scale.x.abs();

        for event in controller.drain_events() {
            match event {
                MotionEvent::JumpPerformed { jump_count } => {
                    debug!("Jump performed: count={}", jump_count);
                    jump_events.write(JumpPerformedEvent { jump_count });
                }
            }
        }
    }
}

pub(crate) fn fixed_tick(
    time: Res<Time>,
    spatial_query: SpatialQuery,
    mut query: Query<
        (
            Entity,
            &Transform,
            &mut MotionController,
            &mut LinearVelocity,
            &mut GravityScale,
        ),
        With<Player>,
    >,
) {
    let dt = time.delta_secs();

    for (entity, transform, mut controller, mut velocity, mut gravity) in &mut query {
        let samples = probe_contacts(&spatial_query, entity, transform, controller.tuning());

        controller.stage_body(velocity.0, gravity.0);
        controller.tick_fixed(dt, samples);

        let body = *controller.body();
        velocity.0 = body.resolved_velocity(dt);
        gravity.0 = body.gravity_scale;
    }
}

pub(crate) fn apply_movement_condition(
    mut events: MessageReader<MovementConditionEvent>,
    mut query: Query<&mut MotionController, With<Player>>,
) {
    for event in events.read() {
        for mut controller in &mut query {
            if event.allowed {
                controller.unlock_movement();
            } else {
                controller.block_movement();
            }
        }
    }
}
