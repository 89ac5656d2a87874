#[cfg(feature = "dev-tools")]
mod debug;
mod motion;

use avian2d::prelude::*;
use bevy::prelude::*;

use crate::motion::WORLD_GRAVITY_Y;

fn main() {
    let mut app = App::new();
    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(Window {
            title: "Platforge".to_string(),
            resolution: (1280, 720).into(),
            resizable: true,
            ..default()
        }),
        ..default()
    }))
    .add_plugins(PhysicsPlugins::default())
    .insert_resource(Gravity(Vec2::new(0.0, WORLD_GRAVITY_Y)))
    .insert_resource(Time::<Fixed>::from_hz(50.0))
    .add_plugins(motion::MotionPlugin)
    .add_systems(Startup, setup_camera);

    #[cfg(feature = "dev-tools")]
    app.add_plugins(debug::DebugPlugin);

    app.run();
}

fn setup_camera(mut commands: Commands) {
    // World units are meters; zoom the 2D camera out accordingly.
    commands.spawn((
        Camera2d,
        Projection::from(OrthographicProjection {
            scale: 0.015,
            ..OrthographicProjection::default_2d()
        }),
    ));
}
