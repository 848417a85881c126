use std::collections::HashMap;
use std::fmt;

use crate::config::GameConfig;

use super::{Position, TeamId};

/// Who holds a cell.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(from = "String", into = "String")
)]
pub enum CellOwner {
    #[default]
    Neutral,
    Team(TeamId),
}

impl CellOwner {
    pub fn is_neutral(&self) -> bool {
        matches!(self, Self::Neutral)
    }

    pub fn team(&self) -> Option<&TeamId> {
        match self {
            Self::Neutral => None,
            Self::Team(id) => Some(id),
        }
    }

    pub fn is_team(&self, team: &TeamId) -> bool {
        self.team() == Some(team)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Neutral => GameConfig::NEUTRAL_OWNER,
            Self::Team(id) => id.as_str(),
        }
    }
}

impl From<String> for CellOwner {
    fn from(value: String) -> Self {
        if value == GameConfig::NEUTRAL_OWNER {
            Self::Neutral
        } else {
            Self::Team(TeamId(value))
        }
    }
}

impl From<CellOwner> for String {
    fn from(owner: CellOwner) -> Self {
        match owner {
            CellOwner::Neutral => GameConfig::NEUTRAL_OWNER.to_string(),
            CellOwner::Team(id) => id.0,
        }
    }
}

impl fmt::Display for CellOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ownership record of a single grid coordinate.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cell {
    #[cfg_attr(feature = "serde", serde(rename = "ownerId"))]
    pub owner: CellOwner,
    pub color: String,
}

impl Cell {
    pub fn neutral() -> Self {
        Self {
            owner: CellOwner::Neutral,
            color: GameConfig::NEUTRAL_COLOR.to_string(),
        }
    }

    pub fn owned_by(team: TeamId, color: impl Into<String>) -> Self {
        Self {
            owner: CellOwner::Team(team),
            color: color.into(),
        }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Ownership map over a fixed `width × height` playfield.
///
/// Every coordinate logically holds a cell. Entries are keyed by position and
/// a missing entry reads as neutral, so the map stays valid even when a
/// restored snapshot only carries claimed cells.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Grid {
    width: u32,
    height: u32,
    cells: HashMap<Position, Cell>,
}

impl Grid {
    /// Creates a grid with every coordinate explicitly neutral.
    pub fn new(width: u32, height: u32) -> Self {
        let mut grid = Self {
            width,
            height,
            cells: HashMap::with_capacity(width as usize * height as usize),
        };
        grid.reset();
        grid
    }

    /// Returns true if `position` lies inside `[0,width) × [0,height)`.
    pub fn contains(&self, position: Position) -> bool {
        position.x >= 0
            && position.y >= 0
            && (position.x as u32) < self.width
            && (position.y as u32) < self.height
    }

    /// Reads a cell, neutral when nothing was ever stored there.
    pub fn get(&self, position: Position) -> Cell {
        self.cells.get(&position).cloned().unwrap_or_default()
    }

    /// Owner of a cell without cloning its color.
    pub fn owner(&self, position: Position) -> CellOwner {
        self.cells
            .get(&position)
            .map(|cell| cell.owner.clone())
            .unwrap_or_default()
    }

    /// Overwrites a cell. Bounds are the caller's responsibility.
    pub fn set(&mut self, position: Position, cell: Cell) {
        self.cells.insert(position, cell);
    }

    /// Overwrites every coordinate with a neutral cell.
    pub fn reset(&mut self) {
        self.cells.clear();
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                self.cells.insert(Position::new(x, y), Cell::neutral());
            }
        }
    }

    /// Iterates every coordinate of the playfield in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.height as i32)
            .flat_map(move |y| (0..self.width as i32).map(move |x| Position::new(x, y)))
    }

    /// Iterates `(position, cell)` for the whole playfield, neutral included.
    pub fn iter(&self) -> impl Iterator<Item = (Position, Cell)> + '_ {
        self.positions().map(|position| (position, self.get(position)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_grid_is_all_neutral() {
        let grid = Grid::new(4, 3);
        assert_eq!(grid.iter().count(), 12);
        assert!(grid.iter().all(|(_, cell)| cell == Cell::neutral()));
    }

    #[test]
    fn missing_entries_read_as_neutral() {
        let grid = Grid::default();
        assert_eq!(grid.get(Position::new(7, 7)), Cell::neutral());
    }

    #[test]
    fn reset_clears_claims() {
        let mut grid = Grid::new(3, 3);
        let team = TeamId::from("Nullwave");
        grid.set(Position::new(1, 1), Cell::owned_by(team.clone(), "#00bcd4"));
        assert!(grid.owner(Position::new(1, 1)).is_team(&team));

        grid.reset();
        assert!(grid.owner(Position::new(1, 1)).is_neutral());
    }

    #[test]
    fn bounds_check() {
        let grid = Grid::new(40, 25);
        assert!(grid.contains(Position::new(0, 0)));
        assert!(grid.contains(Position::new(39, 24)));
        assert!(!grid.contains(Position::new(40, 0)));
        assert!(!grid.contains(Position::new(0, 25)));
        assert!(!grid.contains(Position::new(-1, 3)));
    }
}
