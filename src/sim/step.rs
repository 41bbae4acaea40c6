/// The step function: advances the world by one frame of `dt` seconds.
///
/// Processing order (later stages read what earlier ones wrote):
///   1. Players: timers, movement, then human input or AI decision
///   2. Bombs: fuses, detonation and blast propagation
///   3. Explosions: lifetimes, expired ones dropped
///   4. Collisions: blast damage, then power-up pickup
///   5. Win / lose check
///
/// Timers are plain countdowns on measured real time. `dt` is clamped
/// to `max_frame_delta` so a stalled terminal cannot fast-forward fuses.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::ai::{AiAction, ArenaView};
use crate::domain::bomb::{BlastShape, Bomb, Explosion, Orientation};
use crate::domain::entity::FrameInput;
use crate::domain::grid::Dir;
use crate::domain::player::Hit;
use crate::domain::tile::{PowerUpKind, TileKind};
use super::event::GameEvent;
use super::world::{Phase, WorldState};

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut WorldState, input: FrameInput, dt: f32) -> Vec<GameEvent> {
    if world.phase != Phase::Playing { return vec![]; }

    let dt = dt.clamp(0.0, world.config.timing.max_frame_delta);
    let mut events: Vec<GameEvent> = Vec::new();
    world.match_time += dt;

    update_players(world, input, dt, &mut events);
    update_bombs(world, dt, &mut events);
    update_explosions(world, dt);
    resolve_blast_hits(world, &mut events);
    resolve_power_ups(world, &mut events);
    resolve_end(world, &mut events);

    events
}

// ══════════════════════════════════════════════════════════════
// Players
// ══════════════════════════════════════════════════════════════

fn update_players(world: &mut WorldState, input: FrameInput, dt: f32, events: &mut Vec<GameEvent>) {
    let tuning = world.ai_tuning();

    for i in 0..world.players.len() {
        if world.players[i].is_dead() { continue; }
        world.players[i].update(dt);

        if !world.players[i].is_ai() {
            if input.place_bomb {
                try_place_bomb(world, i, events);
            }
            if let Some(dir) = input.movement {
                if world.players[i].mover.attempt_dir(dir, &world.grid) {
                    events.push(GameEvent::PlayerMoved { player: world.players[i].id });
                }
            }
            continue;
        }

        // The brain is taken out so the view can borrow every player.
        let Some(mut brain) = world.players[i].brain.take() else { continue };
        let actions = {
            let view = ArenaView {
                grid: &world.grid,
                players: &world.players,
                bombs: &world.bombs,
                danger_threshold: tuning.danger_threshold,
            };
            brain.think(&world.players[i], &view, &tuning, dt, &mut world.rng)
        };
        world.players[i].brain = Some(brain);

        for action in actions {
            match action {
                AiAction::PlaceBomb => try_place_bomb(world, i, events),
                AiAction::Move(dir) => {
                    world.players[i].mover.attempt_dir(dir, &world.grid);
                }
            }
        }
    }
}

fn try_place_bomb(world: &mut WorldState, idx: usize, events: &mut Vec<GameEvent>) {
    let fuse = world.config.timing.bomb_fuse;
    let player = &mut world.players[idx];
    if let Some(bomb) = player.place_bomb(&world.bombs, fuse) {
        tracing::debug!(player = player.id, row = bomb.pos.row, col = bomb.pos.col, "bomb placed");
        events.push(GameEvent::BombPlaced { player: player.id, pos: bomb.pos });
        world.bombs.push(bomb);
    }
}

// ══════════════════════════════════════════════════════════════
// Bombs
// ══════════════════════════════════════════════════════════════

/// Tick every fuse once. A bomb that runs out is removed and resolved.
/// Bombs ignited by that blast are not resolved here; they go off when
/// their own tick comes round (later this pass, or next frame).
fn update_bombs(world: &mut WorldState, dt: f32, events: &mut Vec<GameEvent>) {
    let mut i = 0;
    while i < world.bombs.len() {
        if world.bombs[i].tick(dt) {
            let bomb = world.bombs.remove(i);
            detonate(world, bomb, events);
        } else {
            i += 1;
        }
    }
}

/// Resolve one bomb that has already left the live set.
pub fn detonate(world: &mut WorldState, bomb: Bomb, events: &mut Vec<GameEvent>) {
    if let Some(owner) = world.player_mut(bomb.owner) {
        owner.bomb_returned();
    }

    let lifetime = world.config.timing.explosion_lifetime;
    world.explosions.push(Explosion::new(bomb.pos, BlastShape::Center, lifetime));
    events.push(GameEvent::Detonated { pos: bomb.pos, owner: bomb.owner });
    tracing::debug!(owner = bomb.owner, row = bomb.pos.row, col = bomb.pos.col, range = bomb.range, "detonated");

    let range = bomb.range as i32;
    for dir in Dir::ALL {
        let orient = Orientation::from(dir);
        for n in 1..=range {
            let pos = bomb.pos.offset(dir, n);
            // Out of bounds reads as Solid.
            let kind = world.grid.kind(pos);
            if kind == TileKind::Solid { break; }

            let block = kind == TileKind::Breakable;
            let shape = if block || n == range { BlastShape::End(orient) } else { BlastShape::Arm(orient) };
            world.explosions.push(Explosion::new(pos, shape, lifetime));

            for other in world.bombs.iter_mut().filter(|b| b.pos == pos) {
                if other.timer > 0.0 {
                    other.ignite();
                    events.push(GameEvent::ChainIgnited { pos });
                }
            }

            if block {
                let drop = roll_power_up(&mut world.rng, world.config.arena.powerup_chance);
                if world.grid.break_block(pos, drop) {
                    events.push(GameEvent::BlockBroken { pos, drop });
                }
                break;
            }
        }
    }
}

fn roll_power_up<R: Rng + ?Sized>(rng: &mut R, chance: f64) -> Option<PowerUpKind> {
    if !rng.gen_bool(chance.clamp(0.0, 1.0)) {
        return None;
    }
    PowerUpKind::ALL.choose(rng).copied()
}

// ══════════════════════════════════════════════════════════════
// Explosions
// ══════════════════════════════════════════════════════════════

fn update_explosions(world: &mut WorldState, dt: f32) {
    for e in &mut world.explosions {
        e.tick(dt);
    }
    world.explosions.retain(|e| e.is_live());
}

// ══════════════════════════════════════════════════════════════
// Collisions
// ══════════════════════════════════════════════════════════════

fn resolve_blast_hits(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    for i in 0..world.players.len() {
        let p = &world.players[i];
        if p.is_dead() || !world.is_hazard(p.occupied_tile()) { continue; }

        let player = &mut world.players[i];
        match player.take_damage() {
            Hit::Immune => {}
            Hit::Wounded => {
                tracing::info!(player = player.id, lives = player.lives, "player hit");
                events.push(GameEvent::PlayerHit { player: player.id, lives: player.lives });
            }
            Hit::Killed => {
                tracing::info!(player = player.id, "player died");
                events.push(GameEvent::PlayerHit { player: player.id, lives: 0 });
                events.push(GameEvent::PlayerDied { player: player.id });
            }
        }
    }
}

fn resolve_power_ups(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    for player in &mut world.players {
        if player.is_dead() { continue; }
        if let Some(kind) = world.grid.take_power_up(player.occupied_tile()) {
            player.apply_power_up(kind);
            events.push(GameEvent::PowerUpCollected { player: player.id, kind });
        }
    }
}

// ══════════════════════════════════════════════════════════════
// End condition
// ══════════════════════════════════════════════════════════════

fn resolve_end(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if world.living_humans() == 0 {
        world.phase = Phase::GameOverLose;
        events.push(GameEvent::MatchLost);
        tracing::info!(time = world.match_time, "match lost");
    } else if world.living_ais() == 0 && world.humans_spawned > 0 {
        world.phase = Phase::GameOverWin;
        events.push(GameEvent::MatchWon);
        tracing::info!(time = world.match_time, "match won");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::TilePos;
    use crate::domain::player::PlayerKind;

    const IDLE: FrameInput = FrameInput { movement: None, place_bomb: false };

    fn shapes_at(world: &WorldState, pos: TilePos) -> Vec<BlastShape> {
        world.explosions.iter().filter(|e| e.pos == pos).map(|e| e.shape).collect()
    }

    fn arena_9x9() -> WorldState {
        WorldState::from_rows(&[
            "#########",
            "#       #",
            "# # # # #",
            "#       #",
            "# # # # #",
            "#       #",
            "# # # # #",
            "#       #",
            "#########",
        ])
    }

    #[test]
    fn blast_stops_before_solid() {
        // Bomb at (5,5) with a wall right next to it on the right.
        let mut w = WorldState::from_rows(&[
            "###########",
            "#         #",
            "#         #",
            "#         #",
            "#         #",
            "#     #   #",
            "#         #",
            "#         #",
            "#         #",
            "#         #",
            "###########",
        ]);
        let mut events = vec![];
        detonate(&mut w, Bomb::new(TilePos::new(5, 5), 0, 2, 3.0), &mut events);

        assert_eq!(shapes_at(&w, TilePos::new(5, 5)), vec![BlastShape::Center]);
        assert!(shapes_at(&w, TilePos::new(5, 6)).is_empty());
        assert!(shapes_at(&w, TilePos::new(5, 7)).is_empty());
        // Other directions get the full two tiles.
        assert_eq!(shapes_at(&w, TilePos::new(4, 5)), vec![BlastShape::Arm(Orientation::Vertical)]);
        assert_eq!(shapes_at(&w, TilePos::new(3, 5)), vec![BlastShape::End(Orientation::Vertical)]);
        assert_eq!(shapes_at(&w, TilePos::new(5, 3)), vec![BlastShape::End(Orientation::Horizontal)]);
        assert_eq!(shapes_at(&w, TilePos::new(7, 5)), vec![BlastShape::End(Orientation::Vertical)]);
        assert_eq!(w.explosions.len(), 7);
    }

    #[test]
    fn block_absorbs_the_blast() {
        let mut w = WorldState::from_rows(&[
            "#######",
            "#  ++ #",
            "#######",
        ]);
        w.config.arena.powerup_chance = 0.0;
        let mut events = vec![];
        detonate(&mut w, Bomb::new(TilePos::new(1, 2), 0, 3, 3.0), &mut events);

        assert_eq!(shapes_at(&w, TilePos::new(1, 3)), vec![BlastShape::End(Orientation::Horizontal)]);
        assert!(shapes_at(&w, TilePos::new(1, 4)).is_empty());
        assert_eq!(w.grid.kind(TilePos::new(1, 3)), TileKind::Empty);
        assert_eq!(w.grid.kind(TilePos::new(1, 4)), TileKind::Breakable);
        assert!(events.contains(&GameEvent::BlockBroken { pos: TilePos::new(1, 3), drop: None }));
        // Left arm is cut by the border after one tile.
        assert_eq!(shapes_at(&w, TilePos::new(1, 1)), vec![BlastShape::Arm(Orientation::Horizontal)]);
    }

    #[test]
    fn broken_block_always_drops_when_chance_is_one() {
        let mut w = WorldState::from_rows(&[
            "#####",
            "# + #",
            "#####",
        ]);
        w.config.arena.powerup_chance = 1.0;
        let mut events = vec![];
        detonate(&mut w, Bomb::new(TilePos::new(1, 1), 0, 2, 3.0), &mut events);
        let tile = w.grid.get(TilePos::new(1, 2)).expect("in bounds");
        assert_eq!(tile.kind, TileKind::Empty);
        assert!(tile.power_up.is_some());
    }

    #[test]
    fn owner_gets_the_bomb_back() {
        let mut w = arena_9x9();
        let id = w.add_player(PlayerKind::Human, TilePos::new(1, 1));
        w.add_player(PlayerKind::Ai, TilePos::new(7, 7));

        let place = FrameInput { movement: None, place_bomb: true };
        let events = step(&mut w, place, 0.016);
        assert!(events.contains(&GameEvent::BombPlaced { player: id, pos: TilePos::new(1, 1) }));
        assert_eq!(w.players[0].bombs_in_flight, 1);

        // Capacity 1: a second press does nothing while the bomb is live.
        step(&mut w, place, 0.016);
        assert_eq!(w.bombs.len(), 1);
        assert!(!w.players[0].can_place_bomb(&w.bombs));

        w.bombs[0].ignite();
        step(&mut w, IDLE, 0.016);
        assert!(w.bombs.is_empty());
        assert_eq!(w.players[0].bombs_in_flight, 0);
        assert!(w.players[0].has_spare_bomb());
    }

    #[test]
    fn ai_bombs_a_human_in_clear_line() {
        let mut w = arena_9x9();
        w.add_player(PlayerKind::Human, TilePos::new(1, 1));
        let ai = w.add_player(PlayerKind::Ai, TilePos::new(1, 3));

        let events = step(&mut w, IDLE, 0.016);
        assert!(events.contains(&GameEvent::BombPlaced { player: ai, pos: TilePos::new(1, 3) }));
        assert_eq!(w.bombs.len(), 1);
        assert_eq!(w.bombs[0].owner, ai);
        assert_eq!(w.players[ai].bombs_in_flight, 1);

        let brain = w.players[ai].brain.as_ref().expect("brain is put back");
        assert!(brain.cooldown > 0.0);
        // Retreats off the bomb in the same frame.
        assert!(w.players[ai].mover.moving);
        assert_eq!(w.players[ai].mover.target, TilePos::new(2, 3));
    }

    #[test]
    fn range_upgrade_does_not_widen_a_placed_bomb() {
        let mut w = arena_9x9();
        let id = w.add_player(PlayerKind::Human, TilePos::new(1, 1));
        w.add_player(PlayerKind::Ai, TilePos::new(7, 7));

        step(&mut w, FrameInput { movement: None, place_bomb: true }, 0.016);
        w.players[id].apply_power_up(PowerUpKind::Range);
        assert_eq!(w.players[id].bomb_range, 3);

        let bomb = w.bombs.remove(0);
        let mut events = vec![];
        detonate(&mut w, bomb, &mut events);
        assert_eq!(shapes_at(&w, TilePos::new(1, 3)), vec![BlastShape::End(Orientation::Horizontal)]);
        assert!(shapes_at(&w, TilePos::new(1, 4)).is_empty());
        assert_eq!(shapes_at(&w, TilePos::new(3, 1)), vec![BlastShape::End(Orientation::Vertical)]);
        assert!(shapes_at(&w, TilePos::new(4, 1)).is_empty());
    }

    #[test]
    fn chain_reaction_waits_for_the_next_update() {
        let mut w = arena_9x9();
        w.add_player(PlayerKind::Human, TilePos::new(7, 1));
        w.add_player(PlayerKind::Ai, TilePos::new(1, 1));
        w.add_player(PlayerKind::Ai, TilePos::new(1, 7));

        // Second bomb sits earlier in the list than the first.
        w.bombs.push(Bomb::new(TilePos::new(3, 4), 2, 1, 3.0));
        w.bombs.push(Bomb::new(TilePos::new(3, 3), 1, 1, 0.01));
        w.players[1].bombs_in_flight = 1;
        w.players[2].bombs_in_flight = 1;

        let events = step(&mut w, IDLE, 0.02);
        assert!(events.contains(&GameEvent::ChainIgnited { pos: TilePos::new(3, 4) }));
        assert_eq!(w.bombs.len(), 1);
        assert_eq!(w.bombs[0].timer, 0.0);
        assert_eq!(w.players[2].bombs_in_flight, 1);

        let events = step(&mut w, IDLE, 0.001);
        assert!(events.contains(&GameEvent::Detonated { pos: TilePos::new(3, 4), owner: 2 }));
        assert!(w.bombs.is_empty());
        assert_eq!(w.players[2].bombs_in_flight, 0);
    }

    #[test]
    fn direct_detonation_does_not_recurse() {
        let mut w = arena_9x9();
        w.bombs.push(Bomb::new(TilePos::new(1, 3), 0, 2, 3.0));
        let mut events = vec![];
        detonate(&mut w, Bomb::new(TilePos::new(1, 1), 0, 2, 3.0), &mut events);
        assert_eq!(w.bombs.len(), 1);
        assert_eq!(w.bombs[0].timer, 0.0);
        assert!(shapes_at(&w, TilePos::new(1, 4)).is_empty());
    }

    #[test]
    fn blast_wounds_then_immunity_protects() {
        let mut w = arena_9x9();
        w.add_player(PlayerKind::Human, TilePos::new(1, 1));
        w.add_player(PlayerKind::Ai, TilePos::new(7, 7));
        w.explosions.push(Explosion::new(TilePos::new(1, 1), BlastShape::Center, 0.5));

        let events = step(&mut w, IDLE, 0.016);
        assert!(events.contains(&GameEvent::PlayerHit { player: 0, lives: 2 }));
        let events = step(&mut w, IDLE, 0.016);
        assert!(!events.iter().any(|e| matches!(e, GameEvent::PlayerHit { .. })));
        assert_eq!(w.players[0].lives, 2);
        assert_eq!(w.phase, Phase::Playing);
    }

    #[test]
    fn last_human_dying_loses_the_match() {
        let mut w = arena_9x9();
        w.add_player(PlayerKind::Human, TilePos::new(1, 1));
        w.add_player(PlayerKind::Ai, TilePos::new(7, 7));
        w.players[0].lives = 1;
        w.explosions.push(Explosion::new(TilePos::new(1, 1), BlastShape::Center, 0.5));

        let events = step(&mut w, IDLE, 0.016);
        assert!(events.contains(&GameEvent::PlayerDied { player: 0 }));
        assert!(events.contains(&GameEvent::MatchLost));
        assert_eq!(w.phase, Phase::GameOverLose);
        // Dead players stay in the list.
        assert_eq!(w.players.len(), 2);
        assert!(step(&mut w, IDLE, 0.016).is_empty());
    }

    #[test]
    fn last_ai_dying_wins_the_match() {
        let mut w = arena_9x9();
        w.add_player(PlayerKind::Human, TilePos::new(1, 1));
        w.add_player(PlayerKind::Ai, TilePos::new(7, 7));
        w.players[1].lives = 1;
        w.explosions.push(Explosion::new(TilePos::new(7, 7), BlastShape::Center, 0.5));

        let events = step(&mut w, IDLE, 0.016);
        assert!(events.contains(&GameEvent::MatchWon));
        assert_eq!(w.phase, Phase::GameOverWin);
    }

    #[test]
    fn lose_is_checked_before_win() {
        let mut w = arena_9x9();
        w.add_player(PlayerKind::Human, TilePos::new(1, 1));
        w.add_player(PlayerKind::Ai, TilePos::new(1, 3));
        w.players[0].lives = 1;
        w.players[1].lives = 1;
        w.explosions.push(Explosion::new(TilePos::new(1, 1), BlastShape::Center, 0.5));
        w.explosions.push(Explosion::new(TilePos::new(1, 3), BlastShape::Center, 0.5));

        step(&mut w, IDLE, 0.016);
        assert_eq!(w.phase, Phase::GameOverLose);
    }

    #[test]
    fn stepping_onto_a_power_up_collects_it() {
        let mut w = WorldState::from_rows(&[
            "#####",
            "# r #",
            "#   #",
            "#####",
        ]);
        w.add_player(PlayerKind::Human, TilePos::new(1, 1));
        w.add_player(PlayerKind::Ai, TilePos::new(2, 3));

        let right = FrameInput { movement: Some(Dir::Right), place_bomb: false };
        let events = step(&mut w, right, 0.016);
        assert!(events.contains(&GameEvent::PlayerMoved { player: 0 }));
        let mut collected = false;
        for _ in 0..30 {
            let events = step(&mut w, IDLE, 0.05);
            if events.iter().any(|e| matches!(e, GameEvent::PowerUpCollected { player: 0, kind: PowerUpKind::Range })) {
                collected = true;
                break;
            }
        }
        assert!(collected);
        assert_eq!(w.players[0].bomb_range, 3);
        assert_eq!(w.grid.get(TilePos::new(1, 2)).and_then(|t| t.power_up), None);
    }

    #[test]
    fn large_delta_is_clamped() {
        let mut w = arena_9x9();
        w.add_player(PlayerKind::Human, TilePos::new(1, 1));
        w.add_player(PlayerKind::Ai, TilePos::new(7, 7));
        w.bombs.push(Bomb::new(TilePos::new(5, 5), 1, 1, 3.0));
        step(&mut w, IDLE, 10.0);
        assert_eq!(w.bombs.len(), 1);
        assert!((w.bombs[0].timer - 2.9).abs() < 1e-4);
    }

    #[test]
    fn nothing_happens_outside_play() {
        let mut w = arena_9x9();
        w.phase = Phase::Title;
        w.bombs.push(Bomb::new(TilePos::new(1, 1), 0, 1, 0.01));
        assert!(step(&mut w, IDLE, 0.05).is_empty());
        assert_eq!(w.bombs.len(), 1);
    }
}
