//! Motion domain: system modules for the per-frame and per-fixed-step loop.

pub(crate) mod collisions;
pub(crate) mod input;
pub(crate) mod movement;

pub(crate) use input::read_input;
pub(crate) use movement::{apply_movement_condition, fixed_tick, frame_tick};
