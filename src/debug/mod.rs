//! Dev overlay: contact probe visualization.
//!
//! Draws the inflated probe box and the current tick's contact points, plus a
//! box tint while grounded. Toggled with F3.

use bevy::prelude::*;

use crate::motion::{MotionController, Player};

#[derive(Resource, Debug, Default)]
pub struct DebugOverlay {
    pub visible: bool,
}

pub struct DebugPlugin;

impl Plugin for DebugPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(DebugOverlay { visible: true })
            .add_systems(Update, (toggle_overlay, draw_probe_gizmos).chain());
    }
}

fn toggle_overlay(keyboard: Res<ButtonInput<KeyCode>>, mut overlay: ResMut<DebugOverlay>) {
    if keyboard.just_pressed(KeyCode::F3) {
        overlay.visible = !overlay.visible;
        info!("Debug overlay: {}", overlay.visible);
    }
}

fn draw_probe_gizmos(
    overlay: Res<DebugOverlay>,
    mut gizmos: Gizmos,
    query: Query<(&Transform, &MotionController), With<Player>>,
) {
    if !overlay.visible {
        return;
    }

    for (transform, controller) in &query {
        let tuning = controller.tuning();
        let size = Vec2::new(
            tuning.collider_width + tuning.probe_size_offset,
            tuning.collider_height + tuning.probe_size_offset,
        );
        let color = if controller.contacts().grounded {
            Color::srgb(0.2, 0.9, 0.3)
        } else {
            Color::srgb(0.9, 0.2, 0.2)
        };
        gizmos.rect_2d(transform.translation.truncate(), size, color);

        for sample in controller.contact_samples() {
            gizmos.circle_2d(sample.point, 0.05, Color::srgb(0.2, 0.9, 0.3));
            gizmos.line_2d(
                sample.point,
                sample.point + sample.normal * 0.3,
                Color::srgb(0.9, 0.9, 0.2),
            );
        }
    }
}
