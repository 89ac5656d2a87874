//! Motion domain: the real-time motion core of the platformer character.
//!
//! Three pieces drive the character each tick: the contact probe classifies
//! geometric contact with the environment, the request slots buffer player
//! intents until their readiness conditions hold, and the controller's state
//! machine turns both into gravity, forces and impulses on the physics body.

mod bootstrap;
mod components;
mod config;
mod controller;
mod dev;
mod events;
mod probe;
mod request;
mod systems;

#[cfg(test)]
mod tests;

pub use components::{GameLayer, Ground, Player, Wall};
pub use config::{ConfigError, Curve, DerivedMotion, MotionTuning, WORLD_GRAVITY_Y};
pub use controller::{
    gravity_rules, select_gravity, BodyFrame, GravityRule, InputState, InputUpdate,
    MotionController, MotionCtx, MotionEvent, MotionState,
};
pub use events::{JumpPerformedEvent, MovementConditionEvent};
pub use probe::{
    classify_normal, ContactEvent, ContactPhase, ContactProbe, ContactSample, ContactState,
    SurfaceContacts,
};
pub use request::{Countdown, Request, RequestSlot, TimedPhase, TimerHandle, TimerPool};

use bevy::prelude::*;

use crate::motion::bootstrap::spawn_player;
use crate::motion::dev::spawn_demo_room;
use crate::motion::systems::{apply_movement_condition, fixed_tick, frame_tick, read_input};

pub struct MotionPlugin;

impl Plugin for MotionPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<JumpPerformedEvent>()
            .add_message::<MovementConditionEvent>()
            .add_systems(Startup, (spawn_player, spawn_demo_room))
            // Within one frame: sample input, apply external movement toggles,
            // then run the variable-step tick.
            .add_systems(
                Update,
                (read_input, apply_movement_condition, frame_tick).chain(),
            )
            // The fixed tick runs before avian steps the simulation in
            // FixedPostUpdate, so forces land on the same physics step.
            .add_systems(FixedUpdate, fixed_tick);
    }
}
