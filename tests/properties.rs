//! Property tests for captures, legal moves and corridor post-processing.

use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};

use proptest::prelude::*;

use nongrid_othello::board::{Board, Player};
use nongrid_othello::geometry::{Point, cull_short, normalize, resolve_slope};
use nongrid_othello::topology::Topology;

const SIDE: usize = 5;

fn lattice() -> Arc<Topology> {
    static TOPOLOGY: OnceLock<Arc<Topology>> = OnceLock::new();
    Arc::clone(TOPOLOGY.get_or_init(|| Arc::new(Topology::grid(SIDE).unwrap())))
}

/// Arbitrary occupancy of a 5x5 lattice with either side to move.
fn arbitrary_board() -> impl Strategy<Value = Board> {
    (prop::collection::vec(0u8..3, SIDE * SIDE), any::<bool>()).prop_map(|(cells, white)| {
        let mut board = Board::new(lattice());
        for (id, cell) in cells.into_iter().enumerate() {
            let player = match cell {
                1 => Player::Black,
                2 => Player::White,
                _ => continue,
            };
            board.place(id, player).unwrap();
        }
        board.set_turn(usize::from(white));
        board
    })
}

/// Distinct integer points in a small square.
fn arbitrary_points() -> impl Strategy<Value = Vec<Point>> {
    prop::collection::btree_set((0i32..6, 0i32..6), 0..16).prop_map(|set: BTreeSet<(i32, i32)>| {
        set.into_iter()
            .map(|(x, y)| Point::new(f64::from(x), f64::from(y)))
            .collect()
    })
}

fn captures_somewhere(board: &Board, to: usize) -> bool {
    let player = board.to_move();
    let mut scratch = board.clone();
    board.topology().corridors().iter().any(|corridor| {
        corridor
            .iter()
            .position(|&id| id == to)
            .is_some_and(|i| {
                scratch.capture_backwards(corridor, i, player, false)
                    || scratch.capture_forwards(corridor, i, player, false)
            })
    })
}

proptest! {
    /// Scanning forwards from `i` is scanning backwards on the reversed
    /// corridor from the mirrored index.
    #[test]
    fn prop_capture_symmetry(mut board in arbitrary_board(), black in any::<bool>()) {
        let player = if black { Player::Black } else { Player::White };
        let topology = lattice();
        for corridor in topology.corridors() {
            let reversed = corridor.reversed();
            let n = corridor.len();
            for i in 0..n {
                prop_assert_eq!(
                    board.capture_forwards(corridor, i, player, false),
                    board.capture_backwards(&reversed, n - 1 - i, player, false),
                    "corridor {:?} index {}", corridor, i
                );
            }
        }
    }

    /// Every listed move is empty and captures; every empty capturing point is listed.
    #[test]
    fn prop_possible_moves_sound_and_complete(board in arbitrary_board()) {
        let moves = board.possible_moves();
        for id in 0..board.len() {
            let expected = board.get(id).is_none() && captures_somewhere(&board, id);
            prop_assert_eq!(moves.contains(&id), expected, "point {}", id);
        }
    }

    #[test]
    fn prop_played_point_not_relisted(board in arbitrary_board()) {
        for to in board.possible_moves() {
            let mut next = board.clone();
            next.make_move(to).unwrap();
            prop_assert!(!next.possible_moves().contains(&to));
            prop_assert_eq!(next.get(to), Some(board.to_move()));
        }
    }

    /// The mover gains the placed disc plus every flip; the opponent loses the flips.
    #[test]
    fn prop_flips_balance_scores(board in arbitrary_board()) {
        let player = board.to_move();
        let before = board.scores();
        for to in board.possible_moves() {
            let mut next = board.clone();
            let flipped = next.make_move(to).unwrap();
            prop_assert!(flipped >= 1);
            let after = next.scores();
            prop_assert_eq!(after.of(player), before.of(player) + flipped + 1);
            prop_assert_eq!(after.of(player.opponent()), before.of(player.opponent()) - flipped);
        }
    }

    /// An illegal destination leaves the board exactly as it was.
    #[test]
    fn prop_rejected_move_is_noop(board in arbitrary_board(), to in 0usize..SIDE * SIDE + 3) {
        prop_assume!(!board.is_legal(to));
        let mut next = board.clone();
        prop_assert!(next.make_move(to).is_err());
        prop_assert_eq!(next.cells(), board.cells());
        prop_assert_eq!(next.turn(), board.turn());
    }

    #[test]
    fn prop_cull_short_idempotent(points in arbitrary_points()) {
        let once = cull_short(resolve_slope(&points, 0.0));
        let twice = cull_short(once.clone());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_resolved_corridors_are_straight(points in arbitrary_points()) {
        for corridor in normalize(resolve_slope(&points, 0.0)) {
            prop_assert!(!corridor.has_duplicates(), "{:?}", corridor);
            prop_assert!(corridor.is_straight(&points), "{:?}", corridor);
        }
    }
}
