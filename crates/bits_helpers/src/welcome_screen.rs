use bevy::prelude::*;

use crate::{FONT, WINDOW_HEIGHT, WINDOW_WIDTH};

#[derive(Component)]
pub struct WelcomeScreenElement;

/// Title card shown before a bit starts: an instruction, a sample shape and a
/// "Tap to start" prompt.
pub struct WelcomeScreen<'a> {
    pub action: &'a str,
    pub hint: Option<&'a str>,
    pub shape: Mesh,
    pub shape_color: Color,
}

fn centered_text(
    text: &str,
    font: Handle<Font>,
    font_size: f32,
    placement: Node,
) -> (Text, TextFont, TextColor, TextLayout, Node, WelcomeScreenElement) {
    (
        Text::new(text),
        TextFont {
            font,
            font_size,
            ..default()
        },
        TextColor(Color::WHITE),
        TextLayout::new_with_justify(JustifyText::Center),
        Node {
            position_type: PositionType::Absolute,
            width: Val::Percent(100.0),
            align_items: AlignItems::Center,
            justify_content: JustifyContent::Center,
            ..placement
        },
        WelcomeScreenElement,
    )
}

impl WelcomeScreen<'_> {
    pub fn spawn(
        self,
        commands: &mut Commands,
        asset_server: &AssetServer,
        meshes: &mut Assets<Mesh>,
        materials: &mut Assets<ColorMaterial>,
    ) {
        let font: Handle<Font> = asset_server.load(FONT);

        commands.spawn((
            Sprite::from_color(Color::BLACK, Vec2::new(WINDOW_WIDTH, WINDOW_HEIGHT)),
            WelcomeScreenElement,
        ));

        commands.spawn(centered_text(
            self.action,
            font.clone(),
            40.0,
            Node {
                top: Val::Percent(20.0),
                ..default()
            },
        ));

        if let Some(hint) = self.hint {
            commands.spawn(centered_text(
                hint,
                font.clone(),
                20.0,
                Node {
                    top: Val::Percent(32.0),
                    ..default()
                },
            ));
        }

        commands.spawn((
            Mesh2d(meshes.add(self.shape)),
            MeshMaterial2d(materials.add(ColorMaterial::from(self.shape_color))),
            Transform::from_xyz(0.0, 0.0, 1.0),
            WelcomeScreenElement,
        ));

        commands.spawn(centered_text(
            "Tap to start",
            font,
            30.0,
            Node {
                bottom: Val::Percent(25.0),
                ..default()
            },
        ));
    }
}

pub fn despawn_welcome_screen(
    mut commands: Commands,
    welcome_elements: Query<Entity, With<WelcomeScreenElement>>,
) {
    for entity in &welcome_elements {
        commands.entity(entity).despawn_recursive();
    }
}
