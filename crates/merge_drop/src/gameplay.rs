use bevy::prelude::*;
use bits_helpers::floating_score::spawn_floating_score;
use bits_helpers::input::{
    CarriedTouches, just_committed_world_position, pointer_world_position,
};
use bits_helpers::{FONT, send_bit_message};
use ribbit_bits::{BitMessage, BitResult};

use crate::core::{GameEntity, GameState, Playfield, ScoreDisplay, SessionGeneration, config};
use crate::physics::RapierWorld;
use crate::session::{GameSession, SessionEvent};
use crate::tiers;

pub fn cleanup_game(mut commands: Commands, query: Query<Entity, With<GameEntity>>) {
    for entity in &query {
        commands.entity(entity).despawn_recursive();
    }
    commands.remove_resource::<GameSession>();
}

/// Starts a new round: game-over line, score text and a session holding the
/// first pending piece.
pub fn start_session(
    mut commands: Commands,
    mut generation: ResMut<SessionGeneration>,
    playfield: Res<Playfield>,
    asset_server: Res<AssetServer>,
    mut physics: RapierWorld,
) {
    generation.0 += 1;

    let line_y = playfield.to_world(Vec2::new(0.0, playfield.game_over_line)).y;
    commands.spawn((
        Sprite::from_color(config::GAME_OVER_LINE_COLOR, Vec2::new(playfield.width, 2.0)),
        Transform::from_xyz(0.0, line_y, -1.0),
        GameEntity,
    ));

    commands.spawn((
        Text::new("score: 0"),
        TextFont {
            font: asset_server.load(FONT),
            font_size: 28.0,
            ..default()
        },
        TextColor(Color::WHITE),
        Node {
            position_type: PositionType::Absolute,
            top: Val::Px(12.0),
            left: Val::Px(12.0),
            ..default()
        },
        ScoreDisplay,
        GameEntity,
    ));

    let session = GameSession::new(generation.0, *playfield, &mut physics);
    info!("Round {} started", generation.0);
    commands.insert_resource(session);
}

/// Remembers the touch that opened the round so its release does not drop.
pub fn capture_carried_touches(mut commands: Commands, touch_input: Res<Touches>) {
    commands.insert_resource(CarriedTouches::capture(&touch_input));
}

/// Keeps the pending piece under the pointer.
pub fn follow_cursor(
    touch_input: Res<Touches>,
    windows: Query<&Window>,
    camera: Query<(&Camera, &GlobalTransform)>,
    playfield: Res<Playfield>,
    mut session: ResMut<GameSession>,
    mut physics: RapierWorld,
) {
    let Some(world_position) = pointer_world_position(&touch_input, &windows, &camera) else {
        return;
    };
    let x = playfield.to_playfield(world_position).x;
    session.follow_cursor(x, &mut physics);
}

/// Click or touch release drops the pending piece where the pointer is.
pub fn handle_drop_input(
    mouse_input: Res<ButtonInput<MouseButton>>,
    touch_input: Res<Touches>,
    windows: Query<&Window>,
    camera: Query<(&Camera, &GlobalTransform)>,
    playfield: Res<Playfield>,
    mut carried: ResMut<CarriedTouches>,
    mut session: ResMut<GameSession>,
    mut physics: RapierWorld,
) {
    if carried.take_released(&touch_input) {
        debug!("Ignoring the release of the tap that started the round");
        return;
    }
    let Some(world_position) =
        just_committed_world_position(&mouse_input, &touch_input, &windows, &camera)
    else {
        return;
    };

    session.follow_cursor(playfield.to_playfield(world_position).x, &mut physics);
    match session.release(&mut physics) {
        Ok(body) => info!("Dropped {body}"),
        Err(err) => debug!("Drop ignored: {err}"),
    }
}

pub fn update_score_display(
    session: Res<GameSession>,
    mut query: Query<&mut Text, With<ScoreDisplay>>,
) {
    if !session.is_changed() {
        return;
    }
    for mut text in &mut query {
        **text = format!("score: {}", session.score());
    }
}

pub fn spawn_merge_popups(
    mut commands: Commands,
    mut events: EventReader<SessionEvent>,
    playfield: Res<Playfield>,
    asset_server: Res<AssetServer>,
) {
    for event in events.read() {
        match *event {
            SessionEvent::Landed { body } => debug!("{body} landed"),
            SessionEvent::Merged {
                tier,
                position,
                points,
                promoted,
            } => {
                info!("Tier {tier} merged for {points} points, promoted to {promoted:?}");
                let color = tiers::tier_at(tier)
                    .map_or(Srgba::WHITE, |spec| spec.color().to_srgba());
                spawn_floating_score(
                    &mut commands,
                    playfield.to_world(position),
                    &format!("+{points}"),
                    color,
                    &asset_server,
                );
            }
            SessionEvent::GameOver { .. } => {}
        }
    }
}

/// Reports the final score to the platform and shows the game over screen.
pub fn end_round_on_game_over(
    mut events: EventReader<SessionEvent>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    for event in events.read() {
        if let SessionEvent::GameOver { final_score } = *event {
            info!("Game over with {final_score} points");
            send_bit_message(BitMessage::End(BitResult::HighestScore(
                final_score.into(),
            )));
            next_state.set(GameState::GameOver);
        }
    }
}

#[cfg(test)]
mod tests {
    use bevy::input::InputPlugin;
    use bevy::input::touch::{TouchInput, TouchPhase};
    use bevy::state::app::StatesPlugin;
    use bits_helpers::drain_bit_messages;

    use super::*;

    fn send_touch(app: &mut App, phase: TouchPhase) {
        app.world_mut().send_event(TouchInput {
            phase,
            position: Vec2::new(180.0, 320.0),
            window: Entity::PLACEHOLDER,
            force: None,
            id: 0,
        });
        app.update();
    }

    fn release_is_swallowed(app: &mut App) -> bool {
        app.world_mut()
            .resource_scope(|world, mut carried: Mut<CarriedTouches>| {
                carried.take_released(world.resource::<Touches>())
            })
    }

    #[test]
    fn tap_that_starts_the_round_does_not_drop() {
        let mut app = App::new();
        app.add_plugins((InputPlugin, StatesPlugin))
            .insert_state(GameState::Welcome)
            .add_systems(OnEnter(GameState::Playing), capture_carried_touches);

        send_touch(&mut app, TouchPhase::Started);
        app.world_mut()
            .resource_mut::<NextState<GameState>>()
            .set(GameState::Playing);
        app.update();
        send_touch(&mut app, TouchPhase::Ended);

        assert!(
            release_is_swallowed(&mut app),
            "the release that finishes the welcome tap is not a drop"
        );

        send_touch(&mut app, TouchPhase::Started);
        send_touch(&mut app, TouchPhase::Ended);
        assert!(
            !release_is_swallowed(&mut app),
            "the next tap in the round drops normally"
        );
    }

    #[test]
    fn game_over_reports_the_score_and_leaves_play() {
        let mut app = App::new();
        app.add_plugins(StatesPlugin)
            .insert_state(GameState::Playing)
            .add_event::<SessionEvent>()
            .add_systems(Update, end_round_on_game_over);

        app.world_mut()
            .send_event(SessionEvent::GameOver { final_score: 70 });
        app.update();
        app.update();

        let messages = drain_bit_messages();
        assert!(
            messages
                .iter()
                .any(|message| matches!(message, BitMessage::End(BitResult::HighestScore(_)))),
            "the platform hears about the end of the round: {messages:?}"
        );
        assert_eq!(
            app.world().resource::<State<GameState>>().get(),
            &GameState::GameOver,
            "game over screen is shown"
        );
    }

    #[test]
    fn merges_alone_keep_the_round_going() {
        let mut app = App::new();
        app.add_plugins(StatesPlugin)
            .insert_state(GameState::Playing)
            .add_event::<SessionEvent>()
            .add_systems(Update, end_round_on_game_over);

        app.world_mut().send_event(SessionEvent::Merged {
            tier: 0,
            position: Vec2::new(100.0, 400.0),
            points: 10,
            promoted: None,
        });
        app.update();
        app.update();

        assert_eq!(
            app.world().resource::<State<GameState>>().get(),
            &GameState::Playing,
            "still playing"
        );
    }
}
