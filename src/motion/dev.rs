//! Motion domain: sandbox room for exercising the controller.

use avian2d::prelude::*;
use bevy::prelude::*;

use crate::motion::{GameLayer, Ground, Wall};

pub(crate) fn spawn_demo_room(mut commands: Commands) {
    let wall_color = Color::srgb(0.3, 0.3, 0.4);
    let ground_color = Color::srgb(0.4, 0.5, 0.4);
    let platform_color = Color::srgb(0.5, 0.4, 0.3);

    let ground_layers = CollisionLayers::new(GameLayer::Ground, [GameLayer::Player]);
    let wall_layers = CollisionLayers::new(GameLayer::Wall, [GameLayer::Player]);

    // Ground
    commands.spawn((
        Ground,
        Sprite {
            color: ground_color,
            custom_size: Some(Vec2::new(24.0, 1.0)),
            ..default()
        },
        Transform::from_xyz(0.0, -4.0, 0.0),
        RigidBody::Static,
        Collider::rectangle(24.0, 1.0),
        ground_layers,
    ));

    // Left wall
    commands.spawn((
        Wall,
        Sprite {
            color: wall_color,
            custom_size: Some(Vec2::new(1.0, 14.0)),
            ..default()
        },
        Transform::from_xyz(-12.5, 2.5, 0.0),
        RigidBody::Static,
        Collider::rectangle(1.0, 14.0),
        wall_layers,
    ));

    // Right wall
    commands.spawn((
        Wall,
        Sprite {
            color: wall_color,
            custom_size: Some(Vec2::new(1.0, 14.0)),
            ..default()
        },
        Transform::from_xyz(12.5, 2.5, 0.0),
        RigidBody::Static,
        Collider::rectangle(1.0, 14.0),
        wall_layers,
    ));

    // Platform - left side
    commands.spawn((
        Ground,
        Sprite {
            color: platform_color,
            custom_size: Some(Vec2::new(4.0, 0.5)),
            ..default()
        },
        Transform::from_xyz(-7.0, -1.5, 0.0),
        RigidBody::Static,
        Collider::rectangle(4.0, 0.5),
        ground_layers,
    ));

    // Platform - right side, higher
    commands.spawn((
        Ground,
        Sprite {
            color: platform_color,
            custom_size: Some(Vec2::new(4.0, 0.5)),
            ..default()
        },
        Transform::from_xyz(7.0, 0.5, 0.0),
        RigidBody::Static,
        Collider::rectangle(4.0, 0.5),
        ground_layers,
    ));

    // Platform - center, highest
    commands.spawn((
        Ground,
        Sprite {
            color: platform_color,
            custom_size: Some(Vec2::new(3.0, 0.5)),
            ..default()
        },
        Transform::from_xyz(0.0, 2.5, 0.0),
        RigidBody::Static,
        Collider::rectangle(3.0, 0.5),
        ground_layers,
    ));
}
