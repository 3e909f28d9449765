use bevy::prelude::*;
use bits_helpers::input::just_pressed_world_position;
use bits_helpers::welcome_screen::WelcomeScreen;

use crate::core::GameState;
use crate::tiers::TIERS;

pub fn spawn_welcome_screen(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
) {
    let [smallest, ..] = TIERS;
    WelcomeScreen {
        action: "Merge!",
        hint: Some("Drop pieces, match two of a kind"),
        shape: Circle::new(smallest.radius()).into(),
        shape_color: smallest.color(),
    }
    .spawn(&mut commands, &asset_server, &mut meshes, &mut materials);
}

pub fn handle_welcome_input(
    mouse_input: Res<ButtonInput<MouseButton>>,
    touch_input: Res<Touches>,
    windows: Query<&Window>,
    camera: Query<(&Camera, &GlobalTransform)>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    if just_pressed_world_position(&mouse_input, &touch_input, &windows, &camera).is_some() {
        next_state.set(GameState::Playing);
    }
}
