use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

use crate::core::{BodyKind, GameEntity, GameState, PieceBody, Playfield, config};
use crate::session::{GameSession, PhysicsWorld, SessionEvent, SettleQueue};
use crate::tiers::{self, TIERS};

pub struct PhysicsPlugin;

impl Plugin for PhysicsPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(RapierPhysicsPlugin::<NoUserData>::pixels_per_meter(
            config::PIXELS_PER_METER,
        ))
        .init_resource::<Playfield>()
        .init_resource::<SettleQueue>()
        .add_event::<SessionEvent>()
        .add_systems(Startup, load_piece_assets)
        .add_systems(
            Update,
            (resolve_collision_batch, run_settle_queue)
                .chain()
                .run_if(in_state(GameState::Playing))
                .run_if(resource_exists::<GameSession>),
        );
    }
}

/// Mesh and material per tier, shared by every piece of that tier.
#[derive(Resource)]
pub struct PieceAssets {
    meshes: Vec<Handle<Mesh>>,
    materials: Vec<Handle<ColorMaterial>>,
}

impl PieceAssets {
    fn for_tier(&self, tier: usize) -> Option<(Handle<Mesh>, Handle<ColorMaterial>)> {
        Some((
            self.meshes.get(tier)?.clone(),
            self.materials.get(tier)?.clone(),
        ))
    }
}

fn load_piece_assets(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
) {
    commands.insert_resource(PieceAssets {
        meshes: TIERS
            .iter()
            .map(|tier| meshes.add(Circle::new(tier.radius())))
            .collect(),
        materials: TIERS
            .iter()
            .map(|tier| materials.add(ColorMaterial::from(tier.color())))
            .collect(),
    });
}

/// [`PhysicsWorld`] backed by Rapier components.
///
/// Mutations go through `Commands`, so they land at the next sync point, before
/// the physics step that follows.
#[derive(SystemParam)]
pub struct RapierWorld<'w, 's> {
    commands: Commands<'w, 's>,
    playfield: Res<'w, Playfield>,
    assets: Res<'w, PieceAssets>,
    bodies: Query<
        'w,
        's,
        (
            &'static Transform,
            &'static BodyKind,
            Option<&'static PieceBody>,
            Option<&'static RigidBody>,
        ),
    >,
}

const fn rigid_body(is_static: bool) -> RigidBody {
    if is_static {
        RigidBody::KinematicPositionBased
    } else {
        RigidBody::Dynamic
    }
}

fn piece_restitution(is_static: bool) -> Restitution {
    Restitution::coefficient(if is_static {
        config::AIMING_RESTITUTION
    } else {
        config::PIECE_RESTITUTION
    })
}

impl PhysicsWorld for RapierWorld<'_, '_> {
    fn create_body(
        &mut self,
        position: Vec2,
        radius: f32,
        is_static: bool,
        is_sensor: bool,
    ) -> Entity {
        let diameter = radius * 2.0;
        let translation = self.playfield.to_world(position).extend(0.0);

        let mut body = self.commands.spawn((
            Transform::from_translation(translation),
            BodyKind::Piece,
            PieceBody { diameter },
            GameEntity,
            rigid_body(is_static),
            Collider::ball(radius),
            piece_restitution(is_static),
            Friction::coefficient(config::PIECE_FRICTION),
            ActiveEvents::COLLISION_EVENTS,
            ExternalImpulse::default(),
        ));
        if is_sensor {
            body.insert(Sensor);
        }
        if let Some((mesh, material)) = tiers::tier_matching_size(diameter)
            .and_then(|tier| self.assets.for_tier(tier))
        {
            body.insert((Mesh2d(mesh), MeshMaterial2d(material)));
        }
        body.id()
    }

    fn set_static(&mut self, body: Entity, is_static: bool) {
        if let Some(mut entity) = self.commands.get_entity(body) {
            entity.try_insert((rigid_body(is_static), piece_restitution(is_static)));
        }
    }

    fn set_sensor(&mut self, body: Entity, is_sensor: bool) {
        let Some(mut entity) = self.commands.get_entity(body) else {
            return;
        };
        if is_sensor {
            entity.try_insert(Sensor);
        } else {
            entity.remove::<Sensor>();
        }
    }

    fn set_position(&mut self, body: Entity, position: Vec2) {
        let translation = self.playfield.to_world(position).extend(0.0);
        if let Some(mut entity) = self.commands.get_entity(body) {
            entity.try_insert(Transform::from_translation(translation));
        }
    }

    fn apply_impulse(&mut self, body: Entity, impulse: Vec2) {
        if let Some(mut entity) = self.commands.get_entity(body) {
            entity.try_insert(ExternalImpulse {
                impulse: Playfield::vector_to_world(impulse),
                torque_impulse: 0.0,
            });
        }
    }

    fn destroy_body(&mut self, body: Entity) {
        if let Some(entity) = self.commands.get_entity(body) {
            entity.despawn_recursive();
        }
    }

    fn position(&self, body: Entity) -> Option<Vec2> {
        let (transform, ..) = self.bodies.get(body).ok()?;
        Some(self.playfield.to_playfield(transform.translation.truncate()))
    }

    fn display_size(&self, body: Entity) -> Option<f32> {
        let (_, _, piece, _) = self.bodies.get(body).ok()?;
        piece.map(|piece| piece.diameter)
    }

    fn is_static(&self, body: Entity) -> bool {
        self.bodies
            .get(body)
            .is_ok_and(|(_, _, _, rigid_body)| rigid_body != Some(&RigidBody::Dynamic))
    }

    fn kind(&self, body: Entity) -> Option<BodyKind> {
        self.bodies.get(body).ok().map(|(_, kind, ..)| *kind)
    }
}

/// Floor, ceiling and side walls matching the playfield.
pub fn spawn_boundaries(mut commands: Commands, playfield: Res<Playfield>) {
    let half_width = playfield.width / 2.0;
    let half_height = playfield.height / 2.0;
    let half_thickness = config::WALL_THICKNESS / 2.0;

    let walls = [
        // Floor and ceiling
        (
            Vec2::new(0.0, -half_height - half_thickness),
            Vec2::new(half_width + config::WALL_THICKNESS, half_thickness),
        ),
        (
            Vec2::new(0.0, half_height + half_thickness),
            Vec2::new(half_width + config::WALL_THICKNESS, half_thickness),
        ),
        // Left and right
        (
            Vec2::new(-half_width - half_thickness, 0.0),
            Vec2::new(half_thickness, half_height + config::WALL_THICKNESS),
        ),
        (
            Vec2::new(half_width + half_thickness, 0.0),
            Vec2::new(half_thickness, half_height + config::WALL_THICKNESS),
        ),
    ];

    for (center, half_extents) in walls {
        commands.spawn((
            Transform::from_translation(center.extend(0.0)),
            Collider::cuboid(half_extents.x, half_extents.y),
            RigidBody::Fixed,
            BodyKind::Boundary,
            GameEntity,
        ));
    }
}

/// Feeds this frame's contact starts to the session as one batch.
fn resolve_collision_batch(
    mut collision_events: EventReader<CollisionEvent>,
    mut session: ResMut<GameSession>,
    mut settle: ResMut<SettleQueue>,
    mut physics: RapierWorld,
    mut session_events: EventWriter<SessionEvent>,
) {
    let pairs: Vec<(Entity, Entity)> = collision_events
        .read()
        .filter_map(|event| match event {
            CollisionEvent::Started(a, b, _) => Some((*a, *b)),
            CollisionEvent::Stopped(..) => None,
        })
        .collect();
    if pairs.is_empty() {
        return;
    }

    session.sync_positions(&physics);
    for event in session.resolve_collisions(&pairs, &mut physics, &mut settle) {
        session_events.send(event);
    }
}

fn run_settle_queue(
    time: Res<Time>,
    session: Res<GameSession>,
    mut settle: ResMut<SettleQueue>,
    mut physics: RapierWorld,
) {
    for _ in 0..settle.tick(time.delta(), &session) {
        session.settle_board(&mut physics);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn released_pieces_bounce_harder_than_aiming_ones() {
        assert_eq!(
            piece_restitution(true).coefficient,
            config::AIMING_RESTITUTION,
            "aiming bounce"
        );
        assert_eq!(
            piece_restitution(false).coefficient,
            config::PIECE_RESTITUTION,
            "released bounce"
        );
        assert_eq!(
            rigid_body(true),
            RigidBody::KinematicPositionBased,
            "aiming pieces follow the cursor"
        );
        assert_eq!(rigid_body(false), RigidBody::Dynamic, "released pieces fall");
    }
}
