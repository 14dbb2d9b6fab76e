//! Othello on boards that are not grids.
//!
//! A board is a set of points in the plane with an adjacency relation. Rows,
//! columns and diagonals do not exist on such a board, so captures run along
//! *corridors*: straight runs of adjacent points inferred from the geometry,
//! spliced through triangular junctions where three corridors meet.
//!
//! ## Modules
//!
//! - [`constants`] - Tolerances and search defaults
//! - [`geometry`] - Corridor resolution from points and adjacency
//! - [`topology`] - Junction splicing and the shared board topology
//! - [`board`] - Occupancy, captures, legal moves
//! - [`search`] - Iterative deepening alpha-beta with a time budget
//! - [`coordinator`] - Turn alternation between search workers and humans
//! - [`registry`] - Live games keyed by id
//! - [`error`] - Error types
//!
//! ## Example
//!
//! ```
//! use nongrid_othello::board::{Board, Player};
//! use nongrid_othello::search::{SearchConfig, search};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // A 4x4 lattice with the usual centre
//! let mut board = Board::grid(4)?;
//! assert_eq!(board.possible_moves(), vec![2, 7, 8, 13]);
//!
//! // Black plays, then White looks three plies ahead
//! board.make_move(2)?;
//! let config = SearchConfig::default().with_max_depth(3);
//! let best = search(&board, Player::White, &config);
//! assert!(best.is_some_and(|r| board.is_legal(r.to)));
//! # Ok(())
//! # }
//! ```

pub mod board;
pub mod constants;
pub mod coordinator;
pub mod error;
pub mod geometry;
pub mod registry;
pub mod search;
pub mod topology;
