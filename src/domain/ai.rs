/// AI opponent: a per-frame mode classifier over a danger-aware BFS.
///
/// Modes, re-evaluated every frame in priority order:
///   1. **Evade**: standing in the blast line of a bomb whose fuse is
///      past `danger_threshold`. Step to the first safe Empty neighbour.
///   2. **BombAndRetreat**: a live human is close, a bomb is spare,
///      the cooldown is over, and a straight unobstructed line within
///      range reaches them. Drop a bomb, then evade in the same frame.
///   3. **Chase**: follow a safe BFS path to the human's current tile.
///   4. **Explore**: when Chase finds no path, bomb an adjacent block, walk
///      toward a random block, or take a random legal step.
///
/// The brain never mutates the arena. It returns `AiAction`s which the
/// step pipeline applies, so it only ever sees a read-only `ArenaView`.

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand::Rng;

use super::bomb::Bomb;
use super::grid::{Dir, Grid, TilePos};
use super::player::Player;
use super::tile::TileKind;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum AiMode {
    Evade,
    BombAndRetreat,
    #[default]
    Chase,
    Explore,
}

/// Tunables lifted from the `[ai]` config section.
#[derive(Clone, Copy, Debug)]
pub struct AiTuning {
    pub danger_threshold: f32,
    pub offense_distance: i32,
    pub bomb_cooldown: f32,
}

/// Read-only arena snapshot for one decision.
pub struct ArenaView<'a> {
    pub grid: &'a Grid,
    pub players: &'a [Player],
    pub bombs: &'a [Bomb],
    pub danger_threshold: f32,
}

impl ArenaView<'_> {
    #[inline]
    pub fn in_danger(&self, pos: TilePos) -> bool {
        in_danger(self.bombs, self.danger_threshold, pos)
    }

    #[inline]
    fn is_safe_floor(&self, pos: TilePos) -> bool {
        self.grid.is_walkable(pos) && !self.in_danger(pos)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AiAction {
    PlaceBomb,
    Move(Dir),
}

#[derive(Clone, Debug, Default)]
pub struct AiBrain {
    pub mode: AiMode,
    /// Cached route; leading tiles are consumed as the AI walks it.
    pub path: Vec<TilePos>,
    /// Seconds until the next bomb may be placed.
    pub cooldown: f32,
    /// Id of the human being hunted. Re-resolved every frame.
    pub target: Option<usize>,
}

impl AiBrain {
    pub fn new() -> Self {
        AiBrain::default()
    }

    /// Run one decision cycle for player `me`.
    pub fn think<R: Rng + ?Sized>(
        &mut self,
        me: &Player,
        view: &ArenaView,
        tuning: &AiTuning,
        dt: f32,
        rng: &mut R,
    ) -> Vec<AiAction> {
        self.cooldown = (self.cooldown - dt).max(0.0);
        if me.is_dead() {
            return vec![];
        }

        let here = me.tile();
        let target_tile = self.acquire_target(view).map(|t| t.tile());
        self.mode = self.classify(me, target_tile, view, tuning);

        match self.mode {
            AiMode::Evade => evade_dir(view, here).map(AiAction::Move).into_iter().collect(),
            AiMode::BombAndRetreat => {
                if me.can_place_bomb(view.bombs) {
                    self.cooldown = tuning.bomb_cooldown;
                    let mut actions = vec![AiAction::PlaceBomb];
                    actions.extend(evade_dir(view, here).map(AiAction::Move));
                    actions
                } else {
                    self.chase(me, target_tile, view, tuning, rng)
                }
            }
            AiMode::Chase | AiMode::Explore => self.chase(me, target_tile, view, tuning, rng),
        }
    }

    /// Keep the current target while it lives; otherwise pick the first
    /// living human.
    fn acquire_target<'a>(&mut self, view: &ArenaView<'a>) -> Option<&'a Player> {
        let players: &'a [Player] = view.players;
        let current = self
            .target
            .and_then(|id| players.iter().find(|p| p.id == id))
            .filter(|p| p.is_alive() && !p.is_ai());
        let chosen = current.or_else(|| players.iter().find(|p| p.is_alive() && !p.is_ai()));
        let new_id = chosen.map(|p| p.id);
        if new_id != self.target {
            self.path.clear();
        }
        self.target = new_id;
        chosen
    }

    fn classify(
        &self,
        me: &Player,
        target: Option<TilePos>,
        view: &ArenaView,
        tuning: &AiTuning,
    ) -> AiMode {
        let here = me.tile();
        if view.in_danger(here) {
            return AiMode::Evade;
        }
        if let Some(t) = target {
            let close = (t.row - here.row).abs() <= tuning.offense_distance
                && (t.col - here.col).abs() <= tuning.offense_distance;
            if close
                && me.has_spare_bomb()
                && self.cooldown <= 0.0
                && can_blast_reach(view.grid, here, t, me.bomb_range)
            {
                return AiMode::BombAndRetreat;
            }
            return AiMode::Chase;
        }
        AiMode::Explore
    }

    fn chase<R: Rng + ?Sized>(
        &mut self,
        me: &Player,
        target: Option<TilePos>,
        view: &ArenaView,
        tuning: &AiTuning,
        rng: &mut R,
    ) -> Vec<AiAction> {
        let Some(goal) = target else {
            self.mode = AiMode::Explore;
            return self.explore(me, view, tuning, rng);
        };
        let here = me.tile();

        if self.path.last() != Some(&goal) {
            let fresh = safe_path(view, here, goal);
            if fresh.is_empty() {
                self.mode = AiMode::Explore;
                return self.explore(me, view, tuning, rng);
            }
            self.path = fresh;
        }

        self.next_step(view, here).map(AiAction::Move).into_iter().collect()
    }

    fn explore<R: Rng + ?Sized>(
        &mut self,
        me: &Player,
        view: &ArenaView,
        tuning: &AiTuning,
        rng: &mut R,
    ) -> Vec<AiAction> {
        let here = me.tile();

        let block_adjacent = Dir::ALL
            .iter()
            .any(|&d| view.grid.kind(here.step(d)) == TileKind::Breakable);
        if block_adjacent && self.cooldown <= 0.0 && me.can_place_bomb(view.bombs) {
            self.cooldown = tuning.bomb_cooldown;
            self.path.clear();
            let mut actions = vec![AiAction::PlaceBomb];
            actions.extend(evade_dir(view, here).map(AiAction::Move));
            return actions;
        }

        if self.path.is_empty() {
            self.path = path_to_random_block(view, here, rng);
        }
        if let Some(dir) = self.next_step(view, here) {
            return vec![AiAction::Move(dir)];
        }

        let legal: Vec<Dir> = Dir::ALL
            .into_iter()
            .filter(|&d| view.grid.is_walkable(here.step(d)))
            .collect();
        legal.choose(rng).map(|&d| vec![AiAction::Move(d)]).unwrap_or_default()
    }

    /// Consume the cached path up to `here` and return the direction of
    /// the next tile. Drops the path if it no longer starts next to us or
    /// the next tile has become dangerous.
    fn next_step(&mut self, view: &ArenaView, here: TilePos) -> Option<Dir> {
        if let Some(i) = self.path.iter().position(|&p| p == here) {
            self.path.drain(..=i);
        }
        let next = *self.path.first()?;
        match here.dir_to(next) {
            Some(dir) if !view.in_danger(next) => Some(dir),
            _ => {
                self.path.clear();
                None
            }
        }
    }
}

// ── Danger and line-of-sight ──

/// Is `pos` in the straight-line blast reach of a bomb whose fuse is at
/// least `threshold` burnt? Walls are ignored: this is a prediction.
pub fn in_danger(bombs: &[Bomb], threshold: f32, pos: TilePos) -> bool {
    bombs.iter().any(|b| {
        b.elapsed_fraction() >= threshold
            && (b.pos.row == pos.row || b.pos.col == pos.col)
            && b.pos.manhattan(pos) <= b.range as i32
    })
}

/// Could a bomb dropped at `from` with `range` reach `to`? Same row or
/// column, within range, and no Solid tile strictly between. Breakable
/// blocks do not count as cover here.
pub fn can_blast_reach(grid: &Grid, from: TilePos, to: TilePos, range: u32) -> bool {
    if from.row != to.row && from.col != to.col {
        return false;
    }
    let dist = from.manhattan(to);
    if dist > range as i32 {
        return false;
    }
    let dir = match ((to.row - from.row).signum(), (to.col - from.col).signum()) {
        (-1, _) => Dir::Up,
        (1, _) => Dir::Down,
        (_, -1) => Dir::Left,
        (_, 1) => Dir::Right,
        _ => return true, // same tile
    };
    (1..dist).all(|i| grid.kind(from.offset(dir, i)) != TileKind::Solid)
}

/// First Empty cardinal neighbour (up, down, left, right) outside every
/// danger zone. `None` leaves the AI where it is.
pub fn evade_dir(view: &ArenaView, here: TilePos) -> Option<Dir> {
    Dir::ALL.into_iter().find(|&d| view.is_safe_floor(here.step(d)))
}

// ── Pathfinding ──

/// Breadth-first shortest path over Empty, non-dangerous tiles.
///
/// Returns the route including `from`, or an empty vec when `to` cannot
/// be reached. `from == to` yields `[from]`. Neighbours are expanded in
/// `Dir::ALL` order, which fixes tie-breaking between equal routes.
pub fn safe_path(view: &ArenaView, from: TilePos, to: TilePos) -> Vec<TilePos> {
    if from == to {
        return vec![from];
    }
    let grid = view.grid;
    if !grid.in_bounds(from) || !grid.in_bounds(to) {
        return vec![];
    }

    let idx = |p: TilePos| p.row as usize * grid.cols + p.col as usize;
    let mut parent: Vec<Option<TilePos>> = vec![None; grid.rows * grid.cols];
    let mut visited = vec![false; grid.rows * grid.cols];
    visited[idx(from)] = true;

    let mut queue: VecDeque<TilePos> = VecDeque::with_capacity(64);
    queue.push_back(from);

    while let Some(cur) = queue.pop_front() {
        for dir in Dir::ALL {
            let next = cur.step(dir);
            if !view.is_safe_floor(next) || visited[idx(next)] {
                continue;
            }
            visited[idx(next)] = true;
            parent[idx(next)] = Some(cur);
            if next == to {
                let mut route = vec![to];
                let mut at = to;
                while let Some(prev) = parent[idx(at)] {
                    route.push(prev);
                    at = prev;
                }
                route.reverse();
                return route;
            }
            queue.push_back(next);
        }
    }

    vec![]
}

/// Pick a random Breakable block and route to the closest reachable
/// floor tile beside it. Empty when there are no blocks or none is
/// reachable.
fn path_to_random_block<R: Rng + ?Sized>(view: &ArenaView, here: TilePos, rng: &mut R) -> Vec<TilePos> {
    let blocks: Vec<TilePos> = view
        .grid
        .positions()
        .filter(|&p| view.grid.kind(p) == TileKind::Breakable)
        .collect();
    let Some(&block) = blocks.choose(rng) else {
        return vec![];
    };
    Dir::ALL
        .into_iter()
        .map(|d| block.step(d))
        .filter(|&n| view.grid.is_walkable(n))
        .map(|n| safe_path(view, here, n))
        .filter(|p| !p.is_empty())
        .min_by_key(|p| p.len())
        .unwrap_or_default()
}
