use bevy::prelude::*;
use bits_helpers::restart::Restartable;
use bits_helpers::{WINDOW_HEIGHT, WINDOW_WIDTH};

use crate::session::SettleQueue;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Default, States)]
pub enum GameState {
    #[default]
    Welcome,
    Playing,
    GameOver,
}

/// What a physics body is, as far as the merge rules care.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyKind {
    Piece,
    Boundary,
}

/// Drawn diameter of a piece body, reported back to the resolver.
#[derive(Component, Clone, Copy, Debug)]
pub struct PieceBody {
    pub diameter: f32,
}

/// Everything spawned for a round. Despawned before the next one starts.
#[derive(Component)]
pub struct GameEntity;

#[derive(Component)]
pub struct ScoreDisplay;

/// Incremented every time a round starts, so that work scheduled by an older
/// round can recognise itself as stale.
#[derive(Resource, Default, Debug)]
pub struct SessionGeneration(pub u64);

/// The RETRY button cancels everything the finished round still had queued.
impl Restartable for SettleQueue {
    fn reset(&mut self) {
        self.clear();
    }

    fn initial_state() -> Self::State {
        GameState::Playing
    }

    type State = GameState;
}

/// Dimensions of the playfield and the conversion between playfield and world
/// space.
///
/// Playfield coordinates put the origin at the top-left corner with y growing
/// downward, which is how the merge rules are expressed ("above the line"
/// means a smaller y). Bevy world space is centred with y growing upward.
#[derive(Resource, Clone, Copy, Debug, PartialEq)]
pub struct Playfield {
    pub width: f32,
    pub height: f32,
    pub game_over_line: f32,
    pub spawn_point: Vec2,
}

impl Default for Playfield {
    fn default() -> Self {
        Self {
            width: WINDOW_WIDTH,
            height: WINDOW_HEIGHT,
            game_over_line: config::GAME_OVER_LINE_Y,
            spawn_point: Vec2::new(WINDOW_WIDTH / 2.0, config::SPAWN_Y),
        }
    }
}

impl Playfield {
    pub fn to_world(&self, position: Vec2) -> Vec2 {
        Vec2::new(position.x - self.width / 2.0, self.height / 2.0 - position.y)
    }

    pub fn to_playfield(&self, position: Vec2) -> Vec2 {
        Vec2::new(position.x + self.width / 2.0, self.height / 2.0 - position.y)
    }

    /// Flips a playfield-space vector (y down) into world space (y up).
    pub const fn vector_to_world(vector: Vec2) -> Vec2 {
        Vec2::new(vector.x, -vector.y)
    }

    pub fn is_above_game_over_line(&self, y: f32) -> bool {
        y < self.game_over_line
    }

    /// Keeps a piece of the given radius fully between the side walls.
    pub fn clamp_aim_x(&self, x: f32, radius: f32) -> f32 {
        if radius * 2.0 >= self.width {
            return self.width / 2.0;
        }
        x.clamp(radius, self.width - radius)
    }
}

pub mod config {
    use core::time::Duration;

    use bevy::prelude::*;

    /// Height of the aim line where pending pieces wait.
    pub const SPAWN_Y: f32 = 100.0;
    /// A mismatched contact involving the last drop above this height loses.
    pub const GAME_OVER_LINE_Y: f32 = 150.0;

    pub const PIXELS_PER_METER: f32 = 100.0;
    pub const WALL_THICKNESS: f32 = 20.0;

    pub const PIECE_RESTITUTION: f32 = 0.5;
    /// Softer bounce while a piece is pinned to the aim line.
    pub const AIMING_RESTITUTION: f32 = 0.2;
    pub const PIECE_FRICTION: f32 = 0.3;

    // Impulses are in playfield space: positive y pushes down.
    pub const DROP_IMPULSE: Vec2 = Vec2::new(0.0, 5.0);
    pub const PROMOTION_IMPULSE: Vec2 = Vec2::new(0.0, -50.0);
    pub const SETTLE_IMPULSE: Vec2 = Vec2::new(0.0, 5.0);

    /// Gives the physics step time to drop merged bodies before the board is
    /// nudged.
    pub const SETTLE_DELAY: Duration = Duration::from_millis(20);

    pub const GAME_OVER_LINE_COLOR: Color = Color::srgb(0.2, 0.4, 1.0);
    pub const BACKGROUND_COLOR: Color = Color::srgb(0.08, 0.08, 0.1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_and_playfield_axes() {
        let playfield = Playfield::default();

        assert_eq!(
            playfield.to_world(Vec2::ZERO),
            Vec2::new(-WINDOW_WIDTH / 2.0, WINDOW_HEIGHT / 2.0),
            "playfield origin is the top-left corner"
        );
        assert_eq!(
            playfield.to_playfield(Vec2::ZERO),
            Vec2::new(WINDOW_WIDTH / 2.0, WINDOW_HEIGHT / 2.0),
            "world origin is the centre"
        );
        assert_eq!(
            Playfield::vector_to_world(config::DROP_IMPULSE).y,
            -config::DROP_IMPULSE.y,
            "downward in playfield is negative y in world"
        );
    }

    #[test]
    fn line_and_aim_limits() {
        let playfield = Playfield::default();

        assert!(playfield.is_above_game_over_line(140.0), "140 sits above 150");
        assert!(!playfield.is_above_game_over_line(150.0), "on the line is safe");
        assert_eq!(playfield.clamp_aim_x(-30.0, 25.0), 25.0, "left wall");
        assert_eq!(
            playfield.clamp_aim_x(1000.0, 25.0),
            WINDOW_WIDTH - 25.0,
            "right wall"
        );
        assert_eq!(
            playfield.clamp_aim_x(10.0, WINDOW_WIDTH),
            WINDOW_WIDTH / 2.0,
            "too wide to move"
        );
    }
}
