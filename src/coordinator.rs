//! Turn alternation between search workers and external players.
//!
//! Each computer seat runs a worker thread connected to the coordinator by two
//! zero-capacity channels: a [`Signal`] inbound and a [`Reply`] outbound. A
//! send on either completes only when the other side receives, so the
//! coordinator and a worker hand the board back and forth like a token. The
//! coordinator never signals again before it has the previous reply in hand,
//! which is all the mutual exclusion the board needs.
//!
//! A worker that finds no move in time keeps retrying, so a [`StopHandle`]
//! can release it from another thread while the coordinator waits on it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};
use std::thread::{self, JoinHandle};

use serde::Serialize;

use crate::board::{Board, Player, Scores};
use crate::error::{MoveError, TurnError};
use crate::geometry::PointId;
use crate::search::{SearchConfig, search};

/// Coordinator to worker.
#[derive(Debug)]
pub enum Signal {
    /// Find and play a move on this board.
    Continue(Board),
    /// Leave the worker loop without moving.
    Stop,
}

/// Worker to coordinator.
#[derive(Debug)]
pub enum Reply {
    Moved {
        board: Board,
        to: PointId,
        flipped: usize,
        value: i32,
        depth: usize,
    },
    /// The board arrived with nothing to play; handed back unchanged.
    Finished(Board),
    /// Stopped mid-turn before moving; the worker has left its loop.
    Stopped(Board),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    WaitingForSignal = 0,
    Searching = 1,
    Applying = 2,
    Done = 3,
}

/// A [`WorkerState`] readable from the coordinator thread.
#[derive(Debug)]
struct StateCell(AtomicU8);

impl StateCell {
    fn new(state: WorkerState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    fn set(&self, state: WorkerState) {
        self.0.store(state as u8, Ordering::Release);
    }

    fn get(&self) -> WorkerState {
        match self.0.load(Ordering::Acquire) {
            0 => WorkerState::WaitingForSignal,
            1 => WorkerState::Searching,
            2 => WorkerState::Applying,
            _ => WorkerState::Done,
        }
    }
}

fn worker_loop(
    player: Player,
    config: SearchConfig,
    signals: Receiver<Signal>,
    replies: SyncSender<Reply>,
    state: Arc<StateCell>,
    stopped: Arc<AtomicBool>,
) {
    loop {
        state.set(WorkerState::WaitingForSignal);
        let board = match signals.recv() {
            Ok(Signal::Continue(board)) => board,
            Ok(Signal::Stop) | Err(_) => break,
        };

        state.set(WorkerState::Searching);
        let reply = loop {
            if stopped.load(Ordering::Acquire) {
                break Reply::Stopped(board);
            }
            if board.game_over() {
                break Reply::Finished(board);
            }
            let Some(result) = search(&board, player, &config) else {
                tracing::debug!(%player, "no move within budget, retrying");
                thread::sleep(config.retry_delay);
                continue;
            };

            state.set(WorkerState::Applying);
            let mut next = board.clone();
            match next.make_move(result.to) {
                Ok(flipped) => {
                    break Reply::Moved {
                        board: next,
                        to: result.to,
                        flipped,
                        value: result.value,
                        depth: result.depth,
                    };
                }
                Err(err) => {
                    tracing::warn!(%player, %err, to = result.to, "searched move rejected");
                    state.set(WorkerState::Searching);
                    thread::sleep(config.retry_delay);
                }
            }
        };

        let leaving = matches!(reply, Reply::Stopped(_));
        if replies.send(reply).is_err() || leaving {
            break;
        }
    }
    state.set(WorkerState::Done);
    tracing::debug!(%player, "search worker stopped");
}

/// The coordinator's end of one computer seat.
#[derive(Debug)]
struct AiWorker {
    signals: SyncSender<Signal>,
    replies: Receiver<Reply>,
    state: Arc<StateCell>,
    stopped: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl AiWorker {
    fn spawn(player: Player, config: SearchConfig) -> Self {
        let (signal_tx, signal_rx) = sync_channel(0);
        let (reply_tx, reply_rx) = sync_channel(0);
        let state = Arc::new(StateCell::new(WorkerState::WaitingForSignal));
        let stopped = Arc::new(AtomicBool::new(false));
        let (worker_state, worker_stopped) = (Arc::clone(&state), Arc::clone(&stopped));
        let handle = thread::spawn(move || {
            worker_loop(player, config, signal_rx, reply_tx, worker_state, worker_stopped)
        });
        Self {
            signals: signal_tx,
            replies: reply_rx,
            state,
            stopped,
            handle: Some(handle),
        }
    }

    fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.stopped.store(true, Ordering::Release);
        // A worker that already left its loop has dropped its receiver.
        let _ = self.signals.send(Signal::Stop);
        if handle.join().is_err() {
            tracing::warn!("search worker panicked");
        }
    }
}

/// Releases a game's computer seats from any thread, including one stuck
/// retrying while the coordinator waits for its reply. The interrupted
/// [`TurnCoordinator::advance`] returns `Ok(None)` with the board unchanged,
/// and later turns for that seat fail with [`TurnError::WorkerLost`].
#[derive(Clone, Debug, Default)]
pub struct StopHandle {
    flags: Vec<Arc<AtomicBool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        for flag in &self.flags {
            flag.store(true, Ordering::Release);
        }
    }
}

/// Who plays a colour.
#[derive(Clone, Debug)]
pub enum SeatKind {
    /// Moves arrive through [`TurnCoordinator::submit`].
    Human,
    Computer(SearchConfig),
}

#[derive(Debug)]
enum Seat {
    Human,
    Computer(AiWorker),
}

/// What a client needs after any move: who played where, and the resulting
/// position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MoveReport {
    pub player: Player,
    pub to: PointId,
    pub flipped: usize,
    pub occupancy: Vec<Option<Player>>,
    pub legal_moves: Vec<PointId>,
    pub game_over: bool,
    pub scores: Scores,
}

impl MoveReport {
    fn after(board: &Board, player: Player, to: PointId, flipped: usize) -> Self {
        Self {
            player,
            to,
            flipped,
            occupancy: board.cells().to_vec(),
            legal_moves: board.possible_moves(),
            game_over: board.game_over(),
            scores: board.scores(),
        }
    }
}

/// Owns the authoritative board and alternates turns between seats.
#[derive(Debug)]
pub struct TurnCoordinator {
    board: Board,
    seats: [Seat; 2],
}

fn seat_index(player: Player) -> usize {
    match player {
        Player::Black => 0,
        Player::White => 1,
    }
}

impl TurnCoordinator {
    /// Start a game on `board`, spawning one worker per computer seat.
    pub fn new(board: Board, black: SeatKind, white: SeatKind) -> Self {
        let seat = |kind: SeatKind, player| match kind {
            SeatKind::Human => Seat::Human,
            SeatKind::Computer(config) => Seat::Computer(AiWorker::spawn(player, config)),
        };
        Self {
            board,
            seats: [seat(black, Player::Black), seat(white, Player::White)],
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn to_move(&self) -> Player {
        self.board.to_move()
    }

    pub fn is_computer(&self, player: Player) -> bool {
        matches!(self.seats[seat_index(player)], Seat::Computer(_))
    }

    /// State of `player`'s worker, `None` for a human seat.
    pub fn worker_state(&self, player: Player) -> Option<WorkerState> {
        match &self.seats[seat_index(player)] {
            Seat::Human => None,
            Seat::Computer(worker) => Some(worker.state.get()),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        let flags = self
            .seats
            .iter()
            .filter_map(|seat| match seat {
                Seat::Human => None,
                Seat::Computer(worker) => Some(Arc::clone(&worker.stopped)),
            })
            .collect();
        StopHandle { flags }
    }

    /// Play a human move for `player`.
    pub fn submit(&mut self, player: Player, to: PointId) -> Result<MoveReport, TurnError> {
        if self.board.game_over() {
            return Err(MoveError::GameOver.into());
        }
        if self.is_computer(player) {
            return Err(MoveError::SeatIsComputer.into());
        }
        if player != self.to_move() {
            return Err(MoveError::NotYourTurn.into());
        }
        let flipped = self.board.make_move(to)?;
        tracing::info!(%player, to, flipped, "move played");
        Ok(MoveReport::after(&self.board, player, to, flipped))
    }

    /// Let the computer play if it is to move. `Ok(None)` when the side to
    /// move is human or the game is over.
    pub fn advance(&mut self) -> Result<Option<MoveReport>, TurnError> {
        let player = self.to_move();
        if self.board.game_over() {
            return Ok(None);
        }
        let Seat::Computer(worker) = &self.seats[seat_index(player)] else {
            return Ok(None);
        };

        worker
            .signals
            .send(Signal::Continue(self.board.clone()))
            .map_err(|_| TurnError::WorkerLost(player))?;
        let reply = worker.replies.recv().map_err(|_| TurnError::WorkerLost(player))?;

        match reply {
            Reply::Moved {
                board,
                to,
                flipped,
                value,
                depth,
            } => {
                self.board = board;
                tracing::info!(%player, to, flipped, value, depth, "computer moved");
                Ok(Some(MoveReport::after(&self.board, player, to, flipped)))
            }
            Reply::Finished(board) => {
                self.board = board;
                Ok(None)
            }
            Reply::Stopped(board) => {
                self.board = board;
                tracing::info!(%player, "computer seat stopped mid-turn");
                Ok(None)
            }
        }
    }

    /// Advance until a human is to move or the game ends.
    pub fn run_until_human(&mut self) -> Result<Vec<MoveReport>, TurnError> {
        let mut reports = Vec::new();
        while let Some(report) = self.advance()? {
            reports.push(report);
        }
        Ok(reports)
    }

    /// Play the game to the end, asking `external` for every human move.
    /// Stops early when `external` returns `None`.
    pub fn play_out<F>(&mut self, mut external: F) -> Result<Vec<MoveReport>, TurnError>
    where
        F: FnMut(&Board) -> Option<PointId>,
    {
        let mut reports = Vec::new();
        while !self.board.game_over() {
            let player = self.to_move();
            if self.is_computer(player) {
                match self.advance()? {
                    Some(report) => reports.push(report),
                    None => break,
                }
            } else {
                let Some(to) = external(&self.board) else {
                    break;
                };
                reports.push(self.submit(player, to)?);
            }
        }
        Ok(reports)
    }

    /// Release every worker. Idempotent.
    pub fn stop(&mut self) {
        for seat in &mut self.seats {
            if let Seat::Computer(worker) = seat {
                worker.stop();
            }
        }
    }
}

impl Drop for TurnCoordinator {
    fn drop(&mut self) {
        self.stop();
    }
}
