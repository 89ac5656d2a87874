//! Motion domain: outward notifications and external control messages.

use bevy::ecs::message::Message;

/// Fired once per executed jump, for unrelated listeners (animation, audio).
/// The core does not depend on any subscriber's behavior.
#[derive(Debug)]
pub struct JumpPerformedEvent {
    pub jump_count: u32,
}

impl Message for JumpPerformedEvent {}

/// External toggle for locomotion force application (cutscenes, knockback).
#[derive(Debug)]
pub struct MovementConditionEvent {
    pub allowed: bool,
}

impl Message for MovementConditionEvent {}
