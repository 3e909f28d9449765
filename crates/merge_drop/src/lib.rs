use bevy::prelude::*;
use bits_helpers::floating_score::{animate_floating_scores, cleanup_floating_scores};
use bits_helpers::input::CarriedTouches;
use bits_helpers::restart::{cleanup_marked_entities, handle_restart};
use bits_helpers::welcome_screen::despawn_welcome_screen;

pub mod core;
pub mod game_over;
pub mod gameplay;
pub mod physics;
pub mod ribbit;
pub mod session;
pub mod tiers;
pub mod welcome;

use core::{GameState, SessionGeneration, config};

use game_over::spawn_game_over_screen;
use gameplay::{
    capture_carried_touches, cleanup_game, end_round_on_game_over, follow_cursor,
    handle_drop_input, spawn_merge_popups, start_session, update_score_display,
};
use physics::{PhysicsPlugin, spawn_boundaries};
use ribbit::MergeDrop;
use session::{GameSession, SettleQueue};
use welcome::{handle_welcome_input, spawn_welcome_screen};

pub fn run() {
    let mut app = bits_helpers::get_default_app::<MergeDrop>(
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
    );
    app.add_plugins(PhysicsPlugin)
        .init_state::<GameState>()
        .init_resource::<SessionGeneration>()
        .init_resource::<CarriedTouches>()
        .insert_resource(ClearColor(config::BACKGROUND_COLOR))
        .add_systems(Startup, setup_camera)
        // Welcome state
        .add_systems(
            OnEnter(GameState::Welcome),
            (cleanup_game, cleanup_floating_scores, spawn_welcome_screen),
        )
        .add_systems(
            Update,
            handle_welcome_input.run_if(in_state(GameState::Welcome)),
        )
        .add_systems(OnExit(GameState::Welcome), despawn_welcome_screen)
        // Playing state
        .add_systems(
            OnEnter(GameState::Playing),
            (
                (cleanup_game, cleanup_floating_scores),
                spawn_boundaries,
                start_session,
                capture_carried_touches,
            )
                .chain(),
        )
        .add_systems(
            Update,
            (
                follow_cursor,
                handle_drop_input,
                update_score_display,
                spawn_merge_popups,
                end_round_on_game_over,
            )
                .chain()
                .run_if(in_state(GameState::Playing))
                .run_if(resource_exists::<GameSession>),
        )
        .add_systems(Update, animate_floating_scores)
        // Game over state
        .add_systems(OnEnter(GameState::GameOver), spawn_game_over_screen)
        .add_systems(
            Update,
            handle_restart::<SettleQueue>.run_if(in_state(GameState::GameOver)),
        )
        .add_systems(OnExit(GameState::GameOver), cleanup_marked_entities);

    app.run();
}

fn setup_camera(mut commands: Commands) {
    commands.spawn(Camera2d);
}
