//! Occupancy, captures and move application over a resolved topology.
//!
//! A [`Board`] is an occupancy vector plus a shared [`Topology`]. Cloning a
//! board copies the occupancy and bumps a reference count, so the search can
//! afford one clone per explored node.
//!
//! Captures run along corridors. Placing a disc at position `i` of a corridor
//! captures backwards when `i - 1, i - 2, ...` holds a run of opponent discs
//! closed by one of the mover's own, and forwards symmetrically. A move is
//! legal when it captures along at least one corridor in one direction.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{MoveError, TopologyError};
use crate::geometry::PointId;
use crate::topology::{Topology, TopologySpec, grid_spec};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Player {
    Black,
    White,
}

impl Player {
    pub fn opponent(self) -> Self {
        match self {
            Player::Black => Player::White,
            Player::White => Player::Black,
        }
    }

    /// Black moves on even turns, White on odd ones.
    pub fn on_turn(turn: usize) -> Self {
        if turn % 2 == 0 {
            Player::Black
        } else {
            Player::White
        }
    }

    fn symbol(self) -> char {
        match self {
            Player::Black => 'X',
            Player::White => 'O',
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Player::Black => "black",
            Player::White => "white",
        })
    }
}

/// Disc counts per player.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scores {
    pub black: usize,
    pub white: usize,
}

impl Scores {
    pub fn of(&self, player: Player) -> usize {
        match player {
            Player::Black => self.black,
            Player::White => self.white,
        }
    }

    /// The player with more discs, `None` on a tie.
    pub fn leader(&self) -> Option<Player> {
        match self.black.cmp(&self.white) {
            std::cmp::Ordering::Greater => Some(Player::Black),
            std::cmp::Ordering::Less => Some(Player::White),
            std::cmp::Ordering::Equal => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Scan {
    Backwards,
    Forwards,
}

#[derive(Clone)]
pub struct Board {
    cells: Vec<Option<Player>>,
    topology: Arc<Topology>,
    turn: usize,
}

impl Board {
    /// An empty board with Black to move.
    pub fn new(topology: Arc<Topology>) -> Self {
        Self {
            cells: vec![None; topology.len()],
            topology,
            turn: 0,
        }
    }

    /// Resolve `spec` and seed its starting discs.
    pub fn from_spec(spec: &TopologySpec) -> Result<Self, TopologyError> {
        let mut board = Self::new(Arc::new(Topology::resolve(spec)?));
        board.seed(spec)?;
        Ok(board)
    }

    /// An `n`×`n` lattice with the usual four discs in the centre.
    pub fn grid(n: usize) -> Result<Self, TopologyError> {
        Self::from_spec(&grid_spec(n))
    }

    fn seed(&mut self, spec: &TopologySpec) -> Result<(), TopologyError> {
        for (ids, player) in [(&spec.black, Player::Black), (&spec.white, Player::White)] {
            for &point in ids {
                self.place(point, player)
                    .map_err(|_| TopologyError::UnknownOccupant { point })?;
            }
        }
        Ok(())
    }

    pub fn topology(&self) -> &Arc<Topology> {
        &self.topology
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, id: PointId) -> Option<Player> {
        self.cells.get(id).copied().flatten()
    }

    pub fn cells(&self) -> &[Option<Player>] {
        &self.cells
    }

    pub fn turn(&self) -> usize {
        self.turn
    }

    pub fn set_turn(&mut self, turn: usize) {
        self.turn = turn;
    }

    pub fn to_move(&self) -> Player {
        Player::on_turn(self.turn)
    }

    /// Put a disc down without capturing or advancing the turn.
    pub fn place(&mut self, id: PointId, player: Player) -> Result<(), MoveError> {
        let cell = self.cells.get_mut(id).ok_or(MoveError::UnknownPoint(id))?;
        *cell = Some(player);
        Ok(())
    }

    /// Length of the opponent run captured by `player` from `ids[index]`.
    fn run_length(&self, ids: &[PointId], index: usize, player: Player, scan: Scan) -> Option<usize> {
        let opponent = player.opponent();
        let mut run = 0;
        let mut i = index;
        loop {
            i = match scan {
                Scan::Backwards => i.checked_sub(1)?,
                Scan::Forwards => i + 1,
            };
            match self.get(*ids.get(i)?) {
                Some(p) if p == opponent => run += 1,
                Some(_) if run > 0 => return Some(run),
                _ => return None,
            }
        }
    }

    fn flip_run(&mut self, ids: &[PointId], index: usize, run: usize, player: Player, scan: Scan) -> usize {
        let mut flipped = 0;
        for step in 1..=run {
            let i = match scan {
                Scan::Backwards => index - step,
                Scan::Forwards => index + step,
            };
            let cell = &mut self.cells[ids[i]];
            if *cell != Some(player) {
                flipped += 1;
            }
            *cell = Some(player);
        }
        self.cells[ids[index]] = Some(player);
        flipped
    }

    fn capture(&mut self, ids: &[PointId], index: usize, player: Player, apply: bool, scan: Scan) -> bool {
        match self.run_length(ids, index, player, scan) {
            Some(run) => {
                if apply {
                    self.flip_run(ids, index, run, player, scan);
                }
                true
            }
            None => false,
        }
    }

    /// Probe, and with `apply` perform, a capture from `ids[index]` towards
    /// the start of `ids`. On success the run and the anchor become `player`.
    pub fn capture_backwards(&mut self, ids: &[PointId], index: usize, player: Player, apply: bool) -> bool {
        self.capture(ids, index, player, apply, Scan::Backwards)
    }

    /// Mirror of [`Board::capture_backwards`] towards the end of `ids`.
    pub fn capture_forwards(&mut self, ids: &[PointId], index: usize, player: Player, apply: bool) -> bool {
        self.capture(ids, index, player, apply, Scan::Forwards)
    }

    fn captures_from(&self, to: PointId, player: Player) -> impl Iterator<Item = (usize, usize, usize, Scan)> + '_ {
        let corridors = self.topology.corridors();
        self.topology.memberships(to).iter().flat_map(move |&(c, pos)| {
            [Scan::Backwards, Scan::Forwards].into_iter().filter_map(move |scan| {
                self.run_length(corridors[c].ids(), pos, player, scan)
                    .map(|run| (c, pos, run, scan))
            })
        })
    }

    /// True when the side to move may place a disc at `to`.
    pub fn is_legal(&self, to: PointId) -> bool {
        to < self.len() && self.cells[to].is_none() && self.captures_from(to, self.to_move()).next().is_some()
    }

    /// Legal destinations for the side to move, ascending, each listed once.
    pub fn possible_moves(&self) -> Vec<PointId> {
        (0..self.len()).filter(|&id| self.is_legal(id)).collect()
    }

    /// Place a disc for the side to move at `to`, flip every captured run and
    /// pass the turn. Returns the number of discs flipped.
    ///
    /// All captures are found before any is applied, so one flip cannot hide or
    /// fabricate another. A rejected move leaves the board untouched.
    pub fn make_move(&mut self, to: PointId) -> Result<usize, MoveError> {
        if to >= self.len() {
            return Err(MoveError::UnknownPoint(to));
        }
        if self.cells[to].is_some() {
            return Err(MoveError::Occupied(to));
        }
        let player = self.to_move();
        let captures: Vec<_> = self.captures_from(to, player).collect();
        if captures.is_empty() {
            return Err(MoveError::NoCapture(to));
        }

        let topology = Arc::clone(&self.topology);
        let corridors = topology.corridors();
        let mut flipped = 0;
        for (c, pos, run, scan) in captures {
            flipped += self.flip_run(corridors[c].ids(), pos, run, player, scan);
        }
        self.turn += 1;
        tracing::trace!(%player, to, flipped, "move applied");
        Ok(flipped)
    }

    /// `me`'s discs minus the opponent's.
    pub fn eval(&self, me: Player) -> i32 {
        let scores = self.scores();
        scores.of(me) as i32 - scores.of(me.opponent()) as i32
    }

    pub fn scores(&self) -> Scores {
        self.cells.iter().flatten().fold(Scores::default(), |mut s, p| {
            match p {
                Player::Black => s.black += 1,
                Player::White => s.white += 1,
            }
            s
        })
    }

    /// The side to move has nothing to play. There are no passes.
    pub fn game_over(&self) -> bool {
        !(0..self.len()).any(|id| self.is_legal(id))
    }

    /// One deferred move per legal destination, in [`Board::possible_moves`] order.
    pub fn candidates(&self) -> Vec<PendingMove<'_>> {
        self.possible_moves()
            .into_iter()
            .map(|to| PendingMove { board: self, to })
            .collect()
    }

    /// Rows of an `n`-wide lattice whose ids run row by row.
    pub fn render_grid(&self, n: usize) -> String {
        let mut out = String::new();
        for row in self.cells.chunks(n.max(1)) {
            let line: Vec<String> = row.iter().map(|c| symbol(*c).to_string()).collect();
            out.push_str(&line.join(" "));
            out.push('\n');
        }
        out
    }

    /// One line per corridor: its ids and their occupants.
    pub fn describe_corridors(&self) -> String {
        let mut out = String::new();
        for (c, corridor) in self.topology.corridors().iter().enumerate() {
            let cells: Vec<String> = corridor
                .iter()
                .map(|&id| format!("{id}{}", symbol(self.get(id))))
                .collect();
            out.push_str(&format!("{c:>3}: {}\n", cells.join(" ")));
        }
        out
    }
}

fn symbol(cell: Option<Player>) -> char {
    cell.map_or('.', Player::symbol)
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Board")
            .field("turn", &self.turn)
            .field("cells", &self.cells)
            .field("corridors", &self.topology.corridors().len())
            .finish()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scores = self.scores();
        writeln!(
            f,
            "{} to move, turn {} (X {} / O {})",
            self.to_move(),
            self.turn,
            scores.black,
            scores.white
        )?;
        for (id, cell) in self.cells.iter().enumerate() {
            write!(f, "{id}{} ", symbol(*cell))?;
            if id % 10 == 9 {
                writeln!(f)?;
            }
        }
        writeln!(f)
    }
}

/// A move that has been found legal but not yet played.
///
/// Applying it clones the board, so a search only pays for the branches it
/// actually explores.
#[derive(Clone, Copy)]
pub struct PendingMove<'a> {
    board: &'a Board,
    pub to: PointId,
}

impl PendingMove<'_> {
    pub fn apply(&self) -> Result<Board, MoveError> {
        let mut next = self.board.clone();
        next.make_move(self.to)?;
        Ok(next)
    }
}
