use bevy::input::touch::Touch;
use bevy::prelude::*;

fn screen_to_world(
    position: Vec2,
    camera: &Query<(&Camera, &GlobalTransform)>,
) -> Option<Vec2> {
    let (camera, camera_transform) = camera.get_single().ok()?;

    camera
        .viewport_to_world(camera_transform, position)
        .map(|ray| ray.origin.truncate())
        .ok()
}

fn cursor_position(windows: &Query<&Window>) -> Option<Vec2> {
    windows.get_single().ok()?.cursor_position()
}

pub fn just_pressed_screen_position(
    button_input: &Res<ButtonInput<MouseButton>>,
    touch_input: &Res<Touches>,
    windows: &Query<&Window>,
) -> Option<Vec2> {
    if button_input.just_pressed(MouseButton::Left) {
        cursor_position(windows)
    } else {
        touch_input.iter_just_pressed().next().map(|touch| touch.position())
    }
}

pub fn just_pressed_world_position(
    button_input: &Res<ButtonInput<MouseButton>>,
    touch_input: &Res<Touches>,
    windows: &Query<&Window>,
    camera: &Query<(&Camera, &GlobalTransform)>,
) -> Option<Vec2> {
    let position = just_pressed_screen_position(button_input, touch_input, windows)?;
    screen_to_world(position, camera)
}

/// Where the player is pointing right now: the first active touch, or the
/// mouse cursor while it hovers the window.
pub fn pointer_world_position(
    touch_input: &Res<Touches>,
    windows: &Query<&Window>,
    camera: &Query<(&Camera, &GlobalTransform)>,
) -> Option<Vec2> {
    let position = touch_input
        .iter()
        .next()
        .map(|touch| touch.position())
        .or_else(|| cursor_position(windows))?;
    screen_to_world(position, camera)
}

/// A single "commit" gesture across devices.
///
/// Mouse players commit on press. Touch players commit on release so they can
/// drag to aim first.
pub fn just_committed_world_position(
    button_input: &Res<ButtonInput<MouseButton>>,
    touch_input: &Res<Touches>,
    windows: &Query<&Window>,
    camera: &Query<(&Camera, &GlobalTransform)>,
) -> Option<Vec2> {
    let position = if button_input.just_pressed(MouseButton::Left) {
        cursor_position(windows)
    } else {
        touch_input.iter_just_released().next().map(|touch| touch.position())
    }?;
    screen_to_world(position, camera)
}

/// Touches that were already down when a screen opened.
///
/// A tap that starts a round on press still ends with a release once the round
/// is showing. That release finishes the old gesture, so a screen that commits
/// on release skips it.
#[derive(Resource, Default, Debug)]
pub struct CarriedTouches(Vec<u64>);

impl CarriedTouches {
    pub fn capture(touch_input: &Touches) -> Self {
        Self(
            touch_input
                .iter()
                .chain(touch_input.iter_just_released())
                .map(Touch::id)
                .collect(),
        )
    }

    /// Forgets carried touches that ended this frame. Returns whether one of
    /// them was released.
    pub fn take_released(&mut self, touch_input: &Touches) -> bool {
        let released = self
            .0
            .iter()
            .any(|id| touch_input.just_released(*id));
        self.0.retain(|id| touch_input.get_pressed(*id).is_some());
        released
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use bevy::input::InputPlugin;
    use bevy::input::touch::{TouchInput, TouchPhase};

    use super::*;

    fn send_touch(app: &mut App, id: u64, phase: TouchPhase) {
        app.world_mut().send_event(TouchInput {
            phase,
            position: Vec2::new(180.0, 320.0),
            window: Entity::PLACEHOLDER,
            force: None,
            id,
        });
        app.update();
    }

    fn app() -> App {
        let mut app = App::new();
        app.add_plugins(InputPlugin);
        app
    }

    #[test]
    fn release_of_a_carried_touch_is_taken_once() {
        let mut app = app();
        send_touch(&mut app, 1, TouchPhase::Started);

        let mut carried = CarriedTouches::capture(app.world().resource::<Touches>());
        assert!(!carried.is_empty(), "held touch is carried");

        send_touch(&mut app, 1, TouchPhase::Ended);
        let touches = app.world().resource::<Touches>();
        assert!(carried.take_released(touches), "its release is swallowed");
        assert!(carried.is_empty(), "and forgotten");
        assert!(!carried.take_released(touches), "only once");
    }

    #[test]
    fn new_touches_are_not_carried() {
        let mut app = app();
        let mut carried = CarriedTouches::capture(app.world().resource::<Touches>());

        send_touch(&mut app, 2, TouchPhase::Started);
        send_touch(&mut app, 2, TouchPhase::Ended);

        assert!(
            !carried.take_released(app.world().resource::<Touches>()),
            "a tap made after capture is a fresh gesture"
        );
    }
}
