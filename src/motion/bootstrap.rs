//! Motion domain: data-driven player setup.

use avian2d::prelude::*;
use bevy::prelude::*;
use ron::Options;
use std::fs;
use std::path::Path;

use crate::motion::config::MotionTuning;
use crate::motion::{GameLayer, MotionController, Player};

const TUNING_PATH: &str = "assets/data/motion.ron";

/// Error type for tuning load failures.
#[derive(Debug)]
pub struct TuningLoadError {
    pub file: String,
    pub message: String,
}

impl std::fmt::Display for TuningLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to load {}: {}", self.file, self.message)
    }
}

/// Load motion tuning from a RON file. Unspecified fields fall back to the
/// built-in defaults.
pub fn load_tuning(path: &Path) -> Result<MotionTuning, TuningLoadError> {
    let file_name = path.display().to_string();
    let contents = fs::read_to_string(path).map_err(|e| TuningLoadError {
        file: file_name.clone(),
        message: format!("IO error: {}", e),
    })?;

    Options::default()
        .with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME)
        .from_str(&contents)
        .map_err(|e| TuningLoadError {
            file: file_name,
            message: format!("Parse error: {}", e),
        })
}

/// Spawn the player from the tuning file, falling back to defaults when the
/// file is missing or the tunables do not validate.
pub(crate) fn spawn_player(mut commands: Commands) {
    let tuning = match load_tuning(Path::new(TUNING_PATH)) {
        Ok(tuning) => tuning,
        Err(e) => {
            warn!("{}, using default motion tuning", e);
            MotionTuning::default()
        }
    };

    let controller = match MotionController::new(tuning) {
        Ok(controller) => controller,
        Err(e) => {
            error!("Invalid motion tuning: {}, using defaults", e);
            MotionController::default()
        }
    };

    let tuning = controller.tuning();
    let size = Vec2::new(tuning.collider_width, tuning.collider_height);
    let gravity_scale = controller.derived().gravity_scale;

    info!(
        "Spawning player: max_speed={}, jump_force={:.2}, gravity_scale={:.2}",
        tuning.move_max_speed,
        controller.derived().jump_force,
        gravity_scale
    );

    commands.spawn((
        (Player, controller),
        // Rendering
        Sprite {
            color: Color::srgb(0.9, 0.9, 0.9),
            custom_size: Some(size),
            ..default()
        },
        Transform::from_xyz(0.0, 1.0, 0.0),
        // Physics
        (
            RigidBody::Dynamic,
            Collider::rectangle(size.x, size.y),
            LockedAxes::ROTATION_LOCKED,
            LinearVelocity::default(),
            GravityScale(gravity_scale),
            Friction::new(0.0),
            CollisionLayers::new(GameLayer::Player, [GameLayer::Ground, GameLayer::Wall]),
        ),
    ));
}
