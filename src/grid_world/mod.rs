//! # Grid World
//!
//! A stochastic tile world read from a text grid. Moves can slip sideways or
//! bounce back depending on the terrain, slopes pull the agent downhill, and
//! treasure tiles can be collected on the way to the goal.
//!
//! ## State space
//!
//! Every distinct set of collected treasures gets its own full copy of the
//! grid (a *layer*), keyed by the treasure hash. Each non-impassable tile of
//! every layer is one state. States are stored in a flat arena whose order is
//! the canonical state index:
//!
//! 1. layers by ascending hash,
//! 2. tiles in reading order, impassable tiles skipped,
//! 3. with the start tile of layer 0 moved to index 0.
//!
//! Neighbors and actions are computed once, when the world is built.
//!
//! ## Example
//!
//! ```rust
//! use gridmdp::config::WorldConfig;
//! use gridmdp::grid_world::GridWorld;
//! use gridmdp::mdp::Mdp;
//!
//! let world = GridWorld::parse("3,1\nSTG\n", &WorldConfig::default()).unwrap();
//! assert_eq!(world.layer_count(), 2);
//! assert_eq!(world.num_states(), 6);
//! ```

pub mod render;
pub mod tile;
pub mod treasure;

pub use tile::{movement_probabilities, pickup_attempt_probabilities, Steepness, TileKind};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::WorldConfig;
use crate::error::{MdpError, Result};
use crate::mdp::{Action, ActionKind, Direction, Mdp, Outcome, StateId};

/// Number of action slots a grid world state can use: four moves plus one
/// treasure action.
pub const ACTION_SLOTS: usize = 5;

/// Probability that a treasure pickup succeeds.
pub const PICKUP_SUCCESS: f64 = 0.8;

/// One state of the grid world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridTile {
    pub x: usize,
    pub y: usize,
    pub kind: TileKind,
    pub treasure_hash: usize,
    pub reward: f64,
}

#[derive(Clone, Debug)]
pub struct GridWorld {
    width: usize,
    height: usize,
    /// Parsed terrain in reading order, treasure ids assigned
    template: Vec<TileKind>,
    treasure_count: usize,
    /// Per layer, the state occupying each cell (`None` for impassable)
    layers: Vec<Vec<Option<StateId>>>,
    tiles: Vec<GridTile>,
    actions: Vec<Vec<Action>>,
    neighbors: Vec<Vec<StateId>>,
    has_start: bool,
    config: WorldConfig,
}

impl GridWorld {
    /// Read and build a world from a grid file.
    pub fn from_file<P: AsRef<Path>>(path: P, config: &WorldConfig) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, config)
    }

    /// Build a world from grid text (`width,height` header then rows).
    pub fn parse(text: &str, config: &WorldConfig) -> Result<Self> {
        config.validate()?;
        let (width, height, template) = parse_grid(text)?;
        Self::from_template(width, height, template, config)
    }

    fn from_template(
        width: usize,
        height: usize,
        template: Vec<TileKind>,
        config: &WorldConfig,
    ) -> Result<Self> {
        let treasure_count = template
            .iter()
            .filter(|k| matches!(k, TileKind::Treasure(_)))
            .count();
        let layer_count = treasure::layer_count(treasure_count)?;

        // Canonical order first, then ids follow from positions in it.
        let passable: Vec<usize> = (0..template.len())
            .filter(|&cell| template[cell] != TileKind::Impassable)
            .collect();
        let mut order: Vec<(usize, usize)> = (0..layer_count)
            .flat_map(|hash| passable.iter().map(move |&cell| (hash, cell)))
            .collect();
        let start_cell = template.iter().position(|&k| k == TileKind::Start);
        if let Some(cell) = start_cell {
            if let Some(pos) = order.iter().position(|&entry| entry == (0, cell)) {
                let start = order.remove(pos);
                order.insert(0, start);
            }
        } else {
            warn!("grid has no start tile; state 0 is the first open tile of layer 0");
        }

        let mut layers = vec![vec![None; template.len()]; layer_count];
        let mut tiles = Vec::with_capacity(order.len());
        for (id, &(hash, cell)) in order.iter().enumerate() {
            let kind = template[cell];
            layers[hash][cell] = Some(id);
            tiles.push(GridTile {
                x: cell % width,
                y: cell / width,
                kind,
                treasure_hash: hash,
                reward: tile_reward(kind, hash, config),
            });
        }

        let mut world = GridWorld {
            width,
            height,
            template,
            treasure_count,
            layers,
            tiles,
            actions: Vec::new(),
            neighbors: Vec::new(),
            has_start: start_cell.is_some(),
            config: config.clone(),
        };

        let mut actions = Vec::with_capacity(world.tiles.len());
        let mut neighbors = Vec::with_capacity(world.tiles.len());
        for id in 0..world.tiles.len() {
            neighbors.push(world.build_neighbors(id));
            actions.push(world.build_actions(id)?);
        }
        world.actions = actions;
        world.neighbors = neighbors;

        info!(
            "built {}x{} grid world: {} treasures, {} layers, {} states",
            width,
            height,
            treasure_count,
            layer_count,
            world.tiles.len()
        );
        Ok(world)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn treasure_count(&self) -> usize {
        self.treasure_count
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Terrain of a cell as parsed, independent of any layer.
    pub fn terrain(&self, x: usize, y: usize) -> Option<TileKind> {
        if x < self.width && y < self.height {
            Some(self.template[y * self.width + x])
        } else {
            None
        }
    }

    /// All states in canonical order.
    pub fn all_states(&self) -> &[GridTile] {
        &self.tiles
    }

    pub fn tile(&self, state: StateId) -> &GridTile {
        &self.tiles[state]
    }

    /// State at `(x, y)` in the layer with the given treasure hash.
    pub fn state_at(&self, hash: usize, x: usize, y: usize) -> Option<StateId> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.layers.get(hash)?[y * self.width + x]
    }

    pub fn goal_states(&self) -> Vec<StateId> {
        self.tiles
            .iter()
            .enumerate()
            .filter(|(_, t)| t.kind == TileKind::Goal)
            .map(|(id, _)| id)
            .collect()
    }

    fn step(&self, state: StateId, dir: Direction) -> Option<StateId> {
        let tile = &self.tiles[state];
        let (dx, dy) = dir.offset();
        let x = tile.x.checked_add_signed(dx)?;
        let y = tile.y.checked_add_signed(dy)?;
        self.state_at(tile.treasure_hash, x, y)
    }

    fn build_neighbors(&self, state: StateId) -> Vec<StateId> {
        if self.tiles[state].kind.is_terminal() {
            return Vec::new();
        }
        [Direction::North, Direction::South, Direction::West, Direction::East]
            .into_iter()
            .filter_map(|dir| self.step(state, dir))
            .collect()
    }

    fn build_actions(&self, state: StateId) -> Result<Vec<Action>> {
        let tile = &self.tiles[state];
        if tile.kind.is_terminal() {
            return Ok(Vec::new());
        }
        let or_self = |dir: Direction| self.step(state, dir).unwrap_or(state);

        let mut actions = Vec::with_capacity(ACTION_SLOTS);
        for dir in Direction::ALL {
            let probs = movement_probabilities(dir, tile.kind);
            let targets = [dir, dir.left(), dir.right(), dir.opposite()].map(or_self);
            let outcomes = probs
                .iter()
                .zip(targets)
                .map(|(&p, target)| Outcome::new(p, target))
                .collect();
            actions.push(Action::new(ActionKind::Move(dir), outcomes));
        }

        let collectible = match tile.kind {
            TileKind::Treasure(id) if !treasure::is_collected(tile.treasure_hash, id) => Some(id),
            _ => None,
        };
        if let Some(id) = collectible {
            let next_hash = treasure::collect(tile.treasure_hash, id);
            let next = self.state_at(next_hash, tile.x, tile.y).ok_or_else(|| {
                MdpError::invalid_parameter(
                    "treasure".to_string(),
                    format!("layer {} has no tile at ({}, {})", next_hash, tile.x, tile.y),
                )
            })?;
            actions.push(Action::new(
                ActionKind::CollectTreasure(id),
                vec![
                    Outcome::new(PICKUP_SUCCESS, next),
                    Outcome::new(1.0 - PICKUP_SUCCESS, state),
                ],
            ));
        } else if self.config.include_fake_pickup {
            let outcomes = pickup_attempt_probabilities(tile.kind)
                .into_iter()
                .map(|(p, dir)| Outcome::new(p, dir.map_or(state, or_self)))
                .collect();
            actions.push(Action::new(ActionKind::AttemptPickup, outcomes));
        }

        for action in &actions {
            action.validate(state)?;
        }
        Ok(actions)
    }

    /// Heuristic initial Q-values: `0.1` for the action that heads toward the
    /// first goal (collecting treasure wins when available), `-0.1` for the
    /// rest.
    pub fn goal_directed_q_values(&self, state: StateId) -> Vec<f64> {
        let actions = &self.actions[state];
        if actions.is_empty() {
            return Vec::new();
        }
        let Some(goal) = self.tiles.iter().find(|t| t.kind == TileKind::Goal) else {
            return vec![0.0; actions.len()];
        };
        let tile = &self.tiles[state];
        let dx = goal.x as isize - tile.x as isize;
        let dy = goal.y as isize - tile.y as isize;

        let collect = actions
            .iter()
            .find(|a| matches!(a.kind, ActionKind::CollectTreasure(_)));
        let best = if let Some(action) = collect {
            action.kind.clone()
        } else if dx.abs() >= dy.abs() {
            ActionKind::Move(if dx > 0 { Direction::East } else { Direction::West })
        } else {
            ActionKind::Move(if dy < 0 { Direction::North } else { Direction::South })
        };

        actions
            .iter()
            .map(|a| if a.kind == best { 0.1 } else { -0.1 })
            .collect()
    }
}

impl Mdp for GridWorld {
    fn num_states(&self) -> usize {
        self.tiles.len()
    }

    fn actions(&self, state: StateId) -> &[Action] {
        &self.actions[state]
    }

    fn reward(&self, state: StateId) -> f64 {
        self.tiles[state].reward
    }

    fn neighbors(&self, state: StateId) -> &[StateId] {
        &self.neighbors[state]
    }

    fn start_state(&self) -> StateId {
        if !self.has_start {
            debug!("start_state requested on a grid without a start tile");
        }
        0
    }
}

fn tile_reward(kind: TileKind, hash: usize, config: &WorldConfig) -> f64 {
    match kind {
        TileKind::Goal => {
            config.goal_reward + config.goal_reward * treasure::captured_count(hash) as f64
        }
        TileKind::Trap => config.trap_reward,
        TileKind::Pit => config.pit_reward,
        _ => config.normal_reward,
    }
}

/// Parse grid text into its dimensions and reading-order terrain, numbering
/// treasure tiles as they appear.
fn parse_grid(text: &str) -> Result<(usize, usize, Vec<TileKind>)> {
    let mut lines = text.lines();
    let header = lines
        .next()
        .ok_or_else(|| MdpError::malformed_grid(1, "empty grid file"))?;
    let dims: Vec<&str> = header.split(',').map(str::trim).collect();
    if dims.len() != 2 {
        return Err(MdpError::malformed_grid(
            1,
            format!("expected 'width,height', found '{}'", header),
        ));
    }
    let parse_dim = |s: &str, name: &str| -> Result<usize> {
        match s.parse::<usize>() {
            Ok(v) if v > 0 => Ok(v),
            _ => Err(MdpError::malformed_grid(
                1,
                format!("{} '{}' is not a positive integer", name, s),
            )),
        }
    };
    let width = parse_dim(dims[0], "width")?;
    let height = parse_dim(dims[1], "height")?;
    if width.checked_mul(height).is_none() {
        return Err(MdpError::malformed_grid(
            1,
            format!("{}x{} grid is too large", width, height),
        ));
    }

    let mut template = Vec::new();
    let mut next_treasure = 0;
    let mut start_seen = false;
    for y in 0..height {
        let line_no = y + 2;
        let row = lines.next().ok_or_else(|| {
            MdpError::malformed_grid(line_no, format!("expected {} rows, found {}", height, y))
        })?;
        let codes: Vec<char> = row.chars().collect();
        if codes.len() != width {
            return Err(MdpError::malformed_grid(
                line_no,
                format!("expected {} tiles, found {}", width, codes.len()),
            ));
        }
        for (x, &c) in codes.iter().enumerate() {
            let kind = match TileKind::from_char(c) {
                Some(TileKind::Treasure(_)) => {
                    next_treasure += 1;
                    TileKind::Treasure(next_treasure - 1)
                }
                Some(TileKind::Start) if start_seen => {
                    return Err(MdpError::malformed_grid(line_no, "more than one start tile"));
                }
                Some(kind) => kind,
                None => return Err(MdpError::UnknownTerrain { code: c, x, y }),
            };
            start_seen |= kind == TileKind::Start;
            template.push(kind);
        }
    }

    if let Some((offset, _)) = lines.enumerate().find(|(_, l)| !l.trim().is_empty()) {
        return Err(MdpError::malformed_grid(
            height + 2 + offset,
            format!("unexpected row beyond height {}", height),
        ));
    }

    debug!("parsed {}x{} grid with {} treasures", width, height, next_treasure);
    Ok((width, height, template))
}
