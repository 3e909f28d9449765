//! The merge/spawn/game-over rules of a round.
//!
//! [`GameSession`] owns all mutable round state and talks to the physics
//! simulation only through [`PhysicsWorld`], so the rules run the same against
//! Rapier in game and against an in-memory world in tests.

use core::time::Duration;
use std::collections::HashMap;

use bevy::prelude::*;
use thiserror::Error;

use crate::core::{BodyKind, Playfield, config};
use crate::tiers::{self, TierSpec};

/// Body commands and queries the rules need from the physics simulation.
///
/// Positions and impulses are in playfield space (see [`Playfield`]).
pub trait PhysicsWorld {
    fn create_body(
        &mut self,
        position: Vec2,
        radius: f32,
        is_static: bool,
        is_sensor: bool,
    ) -> Entity;
    fn set_static(&mut self, body: Entity, is_static: bool);
    fn set_sensor(&mut self, body: Entity, is_sensor: bool);
    fn set_position(&mut self, body: Entity, position: Vec2);
    fn apply_impulse(&mut self, body: Entity, impulse: Vec2);
    fn destroy_body(&mut self, body: Entity);

    fn position(&self, body: Entity) -> Option<Vec2>;
    fn display_size(&self, body: Entity) -> Option<f32>;
    fn is_static(&self, body: Entity) -> bool;
    fn kind(&self, body: Entity) -> Option<BodyKind>;
}

/// A piece is alive for as long as the session tracks it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Piece {
    pub body: Entity,
    pub tier: usize,
    pub position: Vec2,
    pub is_aiming: bool,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropError {
    #[error("the round is over")]
    GameOver,
    #[error("the previous piece has not landed yet")]
    NotReady,
    #[error("there is no piece to drop")]
    NoPendingPiece,
}

/// Observable results of resolving a collision batch.
#[derive(Event, Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// The last dropped piece touched something
    Landed { body: Entity },
    Merged {
        tier: usize,
        position: Vec2,
        points: u32,
        promoted: Option<Entity>,
    },
    GameOver { final_score: u32 },
}

#[derive(Clone, Copy, Debug)]
struct ScheduledSettle {
    generation: u64,
    remaining: Duration,
}

/// Post-merge nudges waiting for their delay to elapse.
///
/// Each entry remembers which round scheduled it and is thrown away once that
/// round is over or replaced.
#[derive(Resource, Default, Debug)]
pub struct SettleQueue {
    scheduled: Vec<ScheduledSettle>,
}

impl SettleQueue {
    pub fn schedule(&mut self, generation: u64) {
        self.scheduled.push(ScheduledSettle {
            generation,
            remaining: config::SETTLE_DELAY,
        });
    }

    pub fn clear(&mut self) {
        self.scheduled.clear();
    }

    pub fn len(&self) -> usize {
        self.scheduled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scheduled.is_empty()
    }

    /// Advances every entry by `delta` and returns how many of `session`'s
    /// nudges are now due. Entries from other rounds are dropped, and so is
    /// everything when the round is already over.
    pub fn tick(&mut self, delta: Duration, session: &GameSession) -> usize {
        if session.is_over() {
            self.scheduled.clear();
            return 0;
        }

        let generation = session.generation();
        self.scheduled.retain(|entry| entry.generation == generation);

        let mut due = 0;
        self.scheduled.retain_mut(|entry| {
            entry.remaining = entry.remaining.saturating_sub(delta);
            if entry.remaining.is_zero() {
                due += 1;
                false
            } else {
                true
            }
        });
        due
    }
}

#[derive(Resource, Debug)]
pub struct GameSession {
    generation: u64,
    playfield: Playfield,
    rng: fastrand::Rng,
    score: u32,
    is_over: bool,
    drop_ready: bool,
    pending: Option<Piece>,
    last_dropped: Option<Entity>,
    board: HashMap<Entity, Piece>,
}

impl GameSession {
    /// Starts a round: empty board, score zero, and a smallest-tier piece
    /// waiting at the spawn point.
    pub fn new(generation: u64, playfield: Playfield, world: &mut impl PhysicsWorld) -> Self {
        Self::with_rng(generation, playfield, fastrand::Rng::new(), world)
    }

    pub fn with_rng(
        generation: u64,
        playfield: Playfield,
        rng: fastrand::Rng,
        world: &mut impl PhysicsWorld,
    ) -> Self {
        let mut session = Self {
            generation,
            playfield,
            rng,
            score: 0,
            is_over: false,
            drop_ready: true,
            pending: None,
            last_dropped: None,
            board: HashMap::new(),
        };
        session.pending = session.create_pending_piece(0, world);
        session
    }

    pub const fn generation(&self) -> u64 {
        self.generation
    }

    pub const fn score(&self) -> u32 {
        self.score
    }

    pub const fn is_over(&self) -> bool {
        self.is_over
    }

    pub const fn drop_ready(&self) -> bool {
        self.drop_ready
    }

    pub const fn pending(&self) -> Option<&Piece> {
        self.pending.as_ref()
    }

    pub const fn last_dropped(&self) -> Option<Entity> {
        self.last_dropped
    }

    pub fn board_len(&self) -> usize {
        self.board.len()
    }

    pub fn piece(&self, body: Entity) -> Option<&Piece> {
        self.board
            .get(&body)
            .or_else(|| self.pending.as_ref().filter(|pending| pending.body == body))
    }

    /// Ends the round without a losing contact, e.g. when the platform stops
    /// the bit.
    pub fn end(&mut self) {
        self.is_over = true;
    }

    /// Creates a piece pinned to the aim cursor. It is drawn but neither falls
    /// nor collides until released.
    fn create_pending_piece(&mut self, tier: usize, world: &mut impl PhysicsWorld) -> Option<Piece> {
        let Some(spec) = tiers::tier_at(tier) else {
            warn!("No tier {tier} to spawn");
            return None;
        };
        let position = self.playfield.spawn_point;
        let body = world.create_body(position, spec.radius(), true, true);
        Some(Piece {
            body,
            tier,
            position,
            is_aiming: true,
        })
    }

    /// Creates a promoted piece and releases it straight onto the board.
    fn create_promoted_piece(
        &mut self,
        tier: usize,
        position: Vec2,
        world: &mut impl PhysicsWorld,
    ) -> Option<Entity> {
        let spec = tiers::tier_at(tier)?;
        let body = world.create_body(position, spec.radius(), false, false);
        world.apply_impulse(body, config::PROMOTION_IMPULSE);
        self.board.insert(
            body,
            Piece {
                body,
                tier,
                position,
                is_aiming: false,
            },
        );
        Some(body)
    }

    /// Keeps the pending piece under the pointer. `x` is in playfield space.
    pub fn follow_cursor(&mut self, x: f32, world: &mut impl PhysicsWorld) {
        let Some(pending) = self.pending.as_mut().filter(|pending| pending.is_aiming) else {
            return;
        };
        let radius = tiers::tier_at(pending.tier).map_or(0.0, |spec| spec.radius());
        let x = self.playfield.clamp_aim_x(x, radius);
        if (pending.position.x - x).abs() < f32::EPSILON {
            return;
        }
        pending.position.x = x;
        world.set_position(pending.body, pending.position);
    }

    /// Drops the pending piece and lines up the next one.
    pub fn release(&mut self, world: &mut impl PhysicsWorld) -> Result<Entity, DropError> {
        if self.is_over {
            return Err(DropError::GameOver);
        }
        if !self.drop_ready {
            return Err(DropError::NotReady);
        }
        let Some(mut piece) = self.pending.take() else {
            return Err(DropError::NoPendingPiece);
        };

        self.drop_ready = false;
        piece.is_aiming = false;
        world.set_sensor(piece.body, false);
        world.set_static(piece.body, false);
        world.apply_impulse(piece.body, config::DROP_IMPULSE);
        self.board.insert(piece.body, piece);
        self.last_dropped = Some(piece.body);

        let next_tier = tiers::random_drop_tier(&mut self.rng);
        self.pending = self.create_pending_piece(next_tier, world);

        debug!(
            "Dropped tier {} piece at x={:.0}, next is tier {next_tier}",
            piece.tier, piece.position.x
        );
        Ok(piece.body)
    }

    /// Copies the simulated position of every board piece into its record.
    pub fn sync_positions(&mut self, world: &impl PhysicsWorld) {
        for piece in self.board.values_mut() {
            if let Some(position) = world.position(piece.body) {
                piece.position = position;
            }
        }
    }

    fn is_aiming_body(&self, body: Entity) -> bool {
        self.pending.is_some_and(|pending| pending.body == body)
    }

    fn is_live_piece(&self, body: Entity, world: &impl PhysicsWorld) -> bool {
        world.kind(body) == Some(BodyKind::Piece) && self.piece(body).is_some()
    }

    fn is_pinned(&self, body: Entity, world: &impl PhysicsWorld) -> bool {
        self.piece(body).is_none_or(|piece| piece.is_aiming) || world.is_static(body)
    }

    fn current_position(&self, body: Entity, world: &impl PhysicsWorld) -> Option<Vec2> {
        world
            .position(body)
            .or_else(|| self.piece(body).map(|piece| piece.position))
    }

    /// Applies the merge rules to one physics step's worth of contact pairs.
    ///
    /// Pairs are handled in the order given. A piece merged away earlier in the
    /// batch is no longer on the board, so later pairs naming it are skipped.
    pub fn resolve_collisions(
        &mut self,
        pairs: &[(Entity, Entity)],
        world: &mut impl PhysicsWorld,
        settle: &mut SettleQueue,
    ) -> Vec<SessionEvent> {
        let mut events = Vec::new();

        for &(a, b) in pairs {
            if self.is_over {
                break;
            }
            if a == b {
                continue;
            }

            self.detect_landing(a, b, &mut events);

            if !self.is_live_piece(a, world) || !self.is_live_piece(b, world) {
                continue;
            }
            if self.is_pinned(a, world) || self.is_pinned(b, world) {
                continue;
            }

            let tier_a = world.display_size(a).and_then(tiers::tier_matching_size);
            let tier_b = world.display_size(b).and_then(tiers::tier_matching_size);
            match (tier_a, tier_b) {
                (Some(tier_a), Some(tier_b)) if tier_a == tier_b => {
                    self.merge(a, b, tier_a, world, settle, &mut events);
                }
                _ => self.check_game_over(a, b, world, &mut events),
            }
        }

        events
    }

    fn detect_landing(&mut self, a: Entity, b: Entity, events: &mut Vec<SessionEvent>) {
        if self.is_aiming_body(a) || self.is_aiming_body(b) {
            return;
        }
        let Some(last) = self.last_dropped.filter(|last| *last == a || *last == b) else {
            return;
        };
        if !self.drop_ready {
            events.push(SessionEvent::Landed { body: last });
        }
        self.drop_ready = true;
    }

    fn check_game_over(
        &mut self,
        a: Entity,
        b: Entity,
        world: &impl PhysicsWorld,
        events: &mut Vec<SessionEvent>,
    ) {
        let Some(last) = self.last_dropped.filter(|last| *last == a || *last == b) else {
            return;
        };
        let Some(position) = self.current_position(last, world) else {
            return;
        };
        if !self.playfield.is_above_game_over_line(position.y) {
            return;
        }

        self.is_over = true;
        info!(
            "Game over: piece settled at y={:.0} above the line, final score {}",
            position.y, self.score
        );
        events.push(SessionEvent::GameOver {
            final_score: self.score,
        });
    }

    fn merge(
        &mut self,
        a: Entity,
        b: Entity,
        tier: usize,
        world: &mut impl PhysicsWorld,
        settle: &mut SettleQueue,
        events: &mut Vec<SessionEvent>,
    ) {
        let (Some(position_a), Some(position_b)) = (
            self.current_position(a, world),
            self.current_position(b, world),
        ) else {
            return;
        };
        let points = tiers::tier_at(tier).map_or(0, |spec: TierSpec| spec.score);

        self.drop_ready = true;
        self.score += points;
        for body in [a, b] {
            self.board.remove(&body);
            world.destroy_body(body);
        }
        settle.schedule(self.generation);

        let midpoint = (position_a + position_b) / 2.0;
        let promoted = if tiers::is_final_tier(tier) {
            None
        } else {
            self.create_promoted_piece(tier + 1, midpoint, world)
        };

        debug!("Merged two tier {tier} pieces for {points} points");
        events.push(SessionEvent::Merged {
            tier,
            position: midpoint,
            points,
            promoted,
        });
    }

    /// Pushes resting pieces down so none are left hanging where a merged
    /// piece used to support them. The last drop and the aiming piece are left
    /// alone.
    pub fn settle_board(&self, world: &mut impl PhysicsWorld) {
        for piece in self.board.values() {
            if piece.is_aiming || Some(piece.body) == self.last_dropped {
                continue;
            }
            world.apply_impulse(piece.body, config::SETTLE_IMPULSE);
        }
    }
}
