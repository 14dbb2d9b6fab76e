//! Error types for board setup, move submission and the game registry.

use thiserror::Error;

use crate::board::Player;
use crate::geometry::PointId;

/// A topology that cannot be turned into a playable board.
///
/// These indicate an authoring defect in the board geometry. They abort board
/// setup and never occur during play.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TopologyError {
    #[error("invalid path: empty")]
    EmptyPath,

    #[error("isolated node is not a corridor")]
    IsolatedTriangleCorner,

    #[error("invalid path: length 2 path is not two triangle corners")]
    ShortPathNotCorners,

    #[error("invalid path: corridor {corridor} does not align with the path built so far")]
    Misaligned { corridor: usize },

    #[error("invalid path: triangle corner {point} lies in the middle of the corridor")]
    CornerInMiddle { point: PointId },

    #[error("invalid path: no corridor segment")]
    NoCorridorSegment,

    #[error("adjacency of point {point} refers to unknown point {neighbor}")]
    UnknownNeighbor { point: PointId, neighbor: PointId },

    #[error("expected {expected} adjacency rows, got {got}")]
    AdjacencyLength { expected: usize, got: usize },

    #[error("initial occupancy refers to unknown point {point}")]
    UnknownOccupant { point: PointId },
}

/// A rejected move. The board is left untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MoveError {
    #[error("point {0} does not exist")]
    UnknownPoint(PointId),

    #[error("point {0} is already occupied")]
    Occupied(PointId),

    #[error("point {0} captures nothing")]
    NoCapture(PointId),

    #[error("game is over")]
    GameOver,

    #[error("it is not this seat's turn")]
    NotYourTurn,

    #[error("seat is played by the computer")]
    SeatIsComputer,
}

/// Failures while driving turns through a [`crate::coordinator::TurnCoordinator`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TurnError {
    #[error(transparent)]
    Move(#[from] MoveError),

    #[error("search worker for {0} hung up")]
    WorkerLost(Player),
}

/// Failures reported by [`crate::registry::GameRegistry`].
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RegistryError {
    #[error("game {0} not found")]
    UnknownGame(u32),

    #[error("game {0} cannot be joined")]
    NotJoinable(u32),

    #[error("game {0} is waiting for an opponent")]
    Waiting(u32),

    #[error(transparent)]
    Move(#[from] MoveError),

    #[error(transparent)]
    Turn(#[from] TurnError),

    #[error(transparent)]
    Topology(#[from] TopologyError),
}
