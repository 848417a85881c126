pub mod common;
pub mod grid;
pub mod round;
pub mod team;

pub use common::{ParsePositionError, Position, Timestamp};
pub use grid::{Cell, CellOwner, Grid};
pub use round::RoundState;
pub use team::{Player, PlayerId, Team, TeamId};
