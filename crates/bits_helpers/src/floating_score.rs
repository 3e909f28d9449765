use core::time::Duration;

use bevy::prelude::*;

use crate::FONT;

/// How far a popup rises over its lifetime, in world units.
const RISE_DISTANCE: f32 = 50.0;

#[derive(Component)]
pub struct FloatingScore {
    timer: Timer,
    origin: Vec2,
}

/// Spawns a world-space score popup (e.g. "+10") that rises and shrinks away.
pub fn spawn_floating_score(
    commands: &mut Commands,
    position: Vec2,
    text: &str,
    color: Srgba,
    asset_server: &AssetServer,
) {
    commands.spawn((
        Text2d::new(text),
        TextFont {
            font: asset_server.load(FONT),
            font_size: 24.0,
            ..default()
        },
        TextColor(Color::Srgba(color)),
        Transform::from_translation(position.extend(10.0)),
        FloatingScore {
            timer: Timer::new(Duration::from_secs(1), TimerMode::Once),
            origin: position,
        },
    ));
}

pub fn animate_floating_scores(
    mut commands: Commands,
    time: Res<Time>,
    mut query: Query<(Entity, &mut Transform, &mut FloatingScore)>,
) {
    for (entity, mut transform, mut floating_score) in &mut query {
        floating_score.timer.tick(time.delta());
        let progress = floating_score.timer.fraction();

        transform.translation.y = RISE_DISTANCE.mul_add(progress, floating_score.origin.y);
        transform.scale = Vec3::splat(1.0 - progress);

        if floating_score.timer.finished() {
            commands.entity(entity).despawn();
        }
    }
}

pub fn cleanup_floating_scores(mut commands: Commands, query: Query<Entity, With<FloatingScore>>) {
    for entity in &query {
        commands.entity(entity).despawn();
    }
}
