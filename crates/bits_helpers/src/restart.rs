use bevy::prelude::*;
use bevy::state::state::FreelyMutableState;

use crate::FONT;

#[derive(Component)]
pub struct RestartButton;

#[derive(Component)]
pub struct CleanupMarker;

/// A resource that knows how to put itself back to a fresh game.
pub trait Restartable: Resource {
    fn reset(&mut self);
    fn initial_state() -> Self::State;
    type State: States + FreelyMutableState;
}

pub fn handle_restart<T: Restartable>(
    mut next_state: ResMut<NextState<T::State>>,
    mut restartable: ResMut<T>,
    interaction_query: Query<&Interaction, (Changed<Interaction>, With<RestartButton>)>,
) {
    if interaction_query
        .iter()
        .any(|interaction| *interaction == Interaction::Pressed)
    {
        info!("Restart requested");
        restartable.reset();
        next_state.set(T::initial_state());
    }
}

/// Spawns a labelled UI button tagged with [`RestartButton`] as a child of `parent`.
pub fn spawn_restart_button(parent: &mut ChildBuilder, asset_server: &AssetServer, label: &str) {
    parent
        .spawn((
            Button,
            Node {
                width: Val::Px(160.0),
                height: Val::Px(56.0),
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                ..default()
            },
            BackgroundColor::from(Color::WHITE),
            RestartButton,
        ))
        .with_children(|button| {
            button.spawn((
                Text::new(label),
                TextFont {
                    font: asset_server.load(FONT),
                    font_size: 32.0,
                    ..default()
                },
                TextColor(Color::BLACK),
            ));
        });
}

pub fn cleanup_marked_entities(mut commands: Commands, query: Query<Entity, With<CleanupMarker>>) {
    for entity in &query {
        commands.entity(entity).despawn_recursive();
    }
}
