use bevy::prelude::*;
use bits_helpers::FONT;
use bits_helpers::restart::{CleanupMarker, spawn_restart_button};

use crate::session::GameSession;

/// Final score and a RETRY button over the frozen board.
pub fn spawn_game_over_screen(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    session: Option<Res<GameSession>>,
) {
    let score = session.map_or(0, |session| session.score());

    commands
        .spawn((
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                flex_direction: FlexDirection::Column,
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                row_gap: Val::Px(24.0),
                ..default()
            },
            BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.7)),
            CleanupMarker,
        ))
        .with_children(|parent| {
            parent.spawn((
                Text::new(format!("GAMEOVER score: {score}")),
                TextFont {
                    font: asset_server.load(FONT),
                    font_size: 36.0,
                    ..default()
                },
                TextColor(Color::WHITE),
                TextLayout::new_with_justify(JustifyText::Center),
            ));
            spawn_restart_button(parent, &asset_server, "RETRY");
        });
}
