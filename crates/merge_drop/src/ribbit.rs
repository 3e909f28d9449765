use bevy::log::info;
use bevy::prelude::{NextState, World};
use bits_helpers::RibbitMessageHandler;
use ribbit_bits::{BitDuration, BitResult};

use crate::core::GameState;
use crate::session::{GameSession, SettleQueue};

#[derive(Default, Clone, Copy)]
pub struct MergeDrop;

impl RibbitMessageHandler for MergeDrop {
    fn restart(world: &mut World) {
        info!("Restarting Merge Drop");
        if let Some(mut settle) = world.get_resource_mut::<SettleQueue>() {
            settle.clear();
        }
        let mut next_state = world.resource_mut::<NextState<GameState>>();
        next_state.set(GameState::Welcome);
    }

    fn end(world: &mut World) -> BitResult {
        info!("Ending Merge Drop");
        let score = world
            .get_resource_mut::<GameSession>()
            .map_or(0, |mut session| {
                session.end();
                session.score()
            });
        let mut next_state = world.resource_mut::<NextState<GameState>>();
        next_state.set(GameState::GameOver);
        BitResult::HighestScore(score.into())
    }

    fn duration(_world: &mut World) -> BitDuration {
        BitDuration::max_duration() // Round lasts until a piece stacks over the line
    }
}

#[cfg(test)]
mod tests {
    use bevy::prelude::*;
    use bevy::state::app::StatesPlugin;
    use bits_helpers::respond_to_ribbit_message;
    use ribbit_bits::{BitMessage, RibbitMessage};

    use super::*;
    use crate::core::Playfield;
    use crate::session::tests::FakeWorld;

    fn app_in_state(state: GameState) -> App {
        let mut app = App::new();
        app.add_plugins(StatesPlugin)
            .insert_state(state)
            .init_resource::<SettleQueue>();
        app
    }

    #[test]
    fn end_stops_the_round_and_reports_the_score() {
        let mut app = app_in_state(GameState::Playing);
        let session = GameSession::new(1, Playfield::default(), &mut FakeWorld::default());
        app.insert_resource(session);

        let reply = respond_to_ribbit_message::<MergeDrop>(RibbitMessage::End, app.world_mut());
        app.update();

        assert!(
            matches!(reply, Some(BitMessage::End(BitResult::HighestScore(_)))),
            "end replies with the score"
        );
        assert!(
            app.world().resource::<GameSession>().is_over(),
            "session stops accepting drops"
        );
        assert_eq!(
            app.world().resource::<State<GameState>>().get(),
            &GameState::GameOver,
            "game over screen is shown"
        );
    }

    #[test]
    fn restart_cancels_pending_settles() {
        let mut app = app_in_state(GameState::GameOver);
        app.world_mut().resource_mut::<SettleQueue>().schedule(3);

        let reply = respond_to_ribbit_message::<MergeDrop>(RibbitMessage::Restart, app.world_mut());
        app.update();

        assert!(reply.is_none(), "restart has no reply");
        assert!(
            app.world().resource::<SettleQueue>().is_empty(),
            "old round's nudges are gone"
        );
        assert_eq!(
            app.world().resource::<State<GameState>>().get(),
            &GameState::Welcome,
            "back to the title screen"
        );
    }
}
