//! Terrain codes and the movement distributions they induce.
//!
//! Each direction has a table of `[forward, left, right, back]`
//! probabilities per terrain kind; slopes bias moves toward their downhill
//! side.

use serde::{Deserialize, Serialize};

use crate::mdp::Direction;

/// Number of terrain codes below the first treasure code.
pub const TREASURE_CODE: usize = 14;

/// Terrain of a single grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    Impassable,
    Normal,
    Goal,
    Trap,
    Pit,
    Start,
    WestLightSlope,
    WestSteepSlope,
    EastLightSlope,
    EastSteepSlope,
    NorthLightSlope,
    NorthSteepSlope,
    SouthLightSlope,
    SouthSteepSlope,
    /// Treasure with its reading-order id
    Treasure(usize),
}

/// How strongly a slope pulls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Steepness {
    Light,
    Steep,
}

impl TileKind {
    /// Parse a grid character. Treasure tiles come back with id 0; the grid
    /// parser numbers them.
    pub fn from_char(c: char) -> Option<TileKind> {
        let kind = match c {
            '#' => TileKind::Impassable,
            'O' => TileKind::Normal,
            'G' => TileKind::Goal,
            'U' => TileKind::Trap,
            'P' => TileKind::Pit,
            'S' => TileKind::Start,
            '(' => TileKind::WestLightSlope,
            '<' => TileKind::WestSteepSlope,
            ')' => TileKind::EastLightSlope,
            '>' => TileKind::EastSteepSlope,
            '^' => TileKind::NorthLightSlope,
            'A' => TileKind::NorthSteepSlope,
            'v' => TileKind::SouthLightSlope,
            'V' => TileKind::SouthSteepSlope,
            'T' => TileKind::Treasure(0),
            _ => return None,
        };
        Some(kind)
    }

    pub fn to_char(self) -> char {
        match self {
            TileKind::Impassable => '#',
            TileKind::Normal => 'O',
            TileKind::Goal => 'G',
            TileKind::Trap => 'U',
            TileKind::Pit => 'P',
            TileKind::Start => 'S',
            TileKind::WestLightSlope => '(',
            TileKind::WestSteepSlope => '<',
            TileKind::EastLightSlope => ')',
            TileKind::EastSteepSlope => '>',
            TileKind::NorthLightSlope => '^',
            TileKind::NorthSteepSlope => 'A',
            TileKind::SouthLightSlope => 'v',
            TileKind::SouthSteepSlope => 'V',
            TileKind::Treasure(_) => 'T',
        }
    }

    /// Numeric type code; treasure codes are offset by the treasure id.
    pub fn code(self) -> usize {
        match self {
            TileKind::Impassable => 0,
            TileKind::Normal => 1,
            TileKind::Goal => 2,
            TileKind::Trap => 3,
            TileKind::Pit => 4,
            TileKind::Start => 5,
            TileKind::WestLightSlope => 6,
            TileKind::WestSteepSlope => 7,
            TileKind::EastLightSlope => 8,
            TileKind::EastSteepSlope => 9,
            TileKind::NorthLightSlope => 10,
            TileKind::NorthSteepSlope => 11,
            TileKind::SouthLightSlope => 12,
            TileKind::SouthSteepSlope => 13,
            TileKind::Treasure(id) => TREASURE_CODE + id,
        }
    }

    /// Tiles without actions. Impassable tiles are never states at all.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TileKind::Impassable | TileKind::Goal | TileKind::Trap | TileKind::Pit
        )
    }

    /// Terrain used for movement probabilities; treasure moves like normal
    /// ground whether or not it has been collected.
    pub fn movement_kind(self) -> TileKind {
        match self {
            TileKind::Treasure(_) => TileKind::Normal,
            kind => kind,
        }
    }

    pub fn slope(self) -> Option<(Direction, Steepness)> {
        match self {
            TileKind::WestLightSlope => Some((Direction::West, Steepness::Light)),
            TileKind::WestSteepSlope => Some((Direction::West, Steepness::Steep)),
            TileKind::EastLightSlope => Some((Direction::East, Steepness::Light)),
            TileKind::EastSteepSlope => Some((Direction::East, Steepness::Steep)),
            TileKind::NorthLightSlope => Some((Direction::North, Steepness::Light)),
            TileKind::NorthSteepSlope => Some((Direction::North, Steepness::Steep)),
            TileKind::SouthLightSlope => Some((Direction::South, Steepness::Light)),
            TileKind::SouthSteepSlope => Some((Direction::South, Steepness::Steep)),
            _ => None,
        }
    }
}

// Rows are indexed by `TileKind::code()` of the movement kind; columns are
// [forward, left deviation, right deviation, bounce back]. Impassable, goal,
// trap and pit rows are never read because those tiles have no actions.
const NORTH_PROBS: [[f64; 4]; TREASURE_CODE] = [
    [0.0, 0.0, 0.0, 0.0],
    [0.8, 0.1, 0.1, 0.0],
    [0.0, 0.0, 0.0, 0.0],
    [0.0, 0.0, 0.0, 0.0],
    [0.0, 0.0, 0.0, 0.0],
    [0.8, 0.1, 0.1, 0.0],
    [0.75, 0.2, 0.05, 0.0],
    [0.4, 0.6, 0.0, 0.0],
    [0.75, 0.05, 0.2, 0.0],
    [0.4, 0.0, 0.6, 0.0],
    [0.98, 0.01, 0.01, 0.0],
    [1.0, 0.0, 0.0, 0.0],
    [0.6, 0.15, 0.15, 0.1],
    [0.1, 0.1, 0.1, 0.7],
];

const EAST_PROBS: [[f64; 4]; TREASURE_CODE] = [
    [0.0, 0.0, 0.0, 0.0],
    [0.8, 0.1, 0.1, 0.0],
    [0.0, 0.0, 0.0, 0.0],
    [0.0, 0.0, 0.0, 0.0],
    [0.0, 0.0, 0.0, 0.0],
    [0.8, 0.1, 0.1, 0.0],
    [0.6, 0.15, 0.15, 0.1],
    [0.1, 0.1, 0.1, 0.7],
    [0.98, 0.01, 0.01, 0.0],
    [1.0, 0.0, 0.0, 0.0],
    [0.75, 0.2, 0.05, 0.0],
    [0.4, 0.6, 0.0, 0.0],
    [0.75, 0.05, 0.2, 0.0],
    [0.4, 0.0, 0.6, 0.0],
];

const SOUTH_PROBS: [[f64; 4]; TREASURE_CODE] = [
    [0.0, 0.0, 0.0, 0.0],
    [0.8, 0.1, 0.1, 0.0],
    [0.0, 0.0, 0.0, 0.0],
    [0.0, 0.0, 0.0, 0.0],
    [0.0, 0.0, 0.0, 0.0],
    [0.8, 0.1, 0.1, 0.0],
    [0.75, 0.05, 0.2, 0.0],
    [0.4, 0.0, 0.6, 0.0],
    [0.75, 0.2, 0.05, 0.0],
    [0.4, 0.6, 0.0, 0.0],
    [0.6, 0.15, 0.15, 0.1],
    [0.1, 0.1, 0.1, 0.7],
    [0.98, 0.01, 0.01, 0.0],
    [1.0, 0.0, 0.0, 0.0],
];

const WEST_PROBS: [[f64; 4]; TREASURE_CODE] = [
    [0.0, 0.0, 0.0, 0.0],
    [0.8, 0.1, 0.1, 0.0],
    [0.0, 0.0, 0.0, 0.0],
    [0.0, 0.0, 0.0, 0.0],
    [0.0, 0.0, 0.0, 0.0],
    [0.8, 0.1, 0.1, 0.0],
    [0.98, 0.01, 0.01, 0.0],
    [1.0, 0.0, 0.0, 0.0],
    [0.6, 0.15, 0.15, 0.1],
    [0.1, 0.1, 0.1, 0.7],
    [0.75, 0.05, 0.2, 0.0],
    [0.4, 0.0, 0.6, 0.0],
    [0.75, 0.2, 0.05, 0.0],
    [0.4, 0.6, 0.0, 0.0],
];

/// `[forward, left, right, back]` probabilities for moving `direction` from
/// a tile of the given kind.
pub fn movement_probabilities(direction: Direction, kind: TileKind) -> [f64; 4] {
    let table = match direction {
        Direction::North => &NORTH_PROBS,
        Direction::East => &EAST_PROBS,
        Direction::South => &SOUTH_PROBS,
        Direction::West => &WEST_PROBS,
    };
    table[kind.movement_kind().code()]
}

/// Where a pickup attempt on a tile without collectible treasure ends up.
///
/// Entries are `(probability, direction)`, with `None` meaning the tile
/// itself.
pub fn pickup_attempt_probabilities(kind: TileKind) -> Vec<(f64, Option<Direction>)> {
    match kind.movement_kind().slope() {
        Some((dir, Steepness::Steep)) => vec![(1.0, Some(dir))],
        Some((dir, Steepness::Light)) => vec![(0.2, Some(dir)), (0.8, None)],
        None => vec![
            (0.8, None),
            (0.05, Some(Direction::North)),
            (0.05, Some(Direction::East)),
            (0.05, Some(Direction::South)),
            (0.05, Some(Direction::West)),
        ],
    }
}
