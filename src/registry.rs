//! Live games keyed by id.
//!
//! The registry is the surface a transport layer talks to: it turns raw
//! topology into games, seats players and forwards their moves. Every game
//! sits behind its own mutex, so a slow computer reply in one game never
//! blocks requests for another. The map lock is only held to look games up,
//! never while waiting on a game.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::board::{Board, Player, Scores};
use crate::coordinator::{MoveReport, SeatKind, StopHandle, TurnCoordinator};
use crate::error::{MoveError, RegistryError};
use crate::geometry::PointId;
use crate::search::SearchConfig;
use crate::topology::TopologySpec;

pub type GameId = u32;

/// Position snapshot sent on creation and join.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GameView {
    pub id: GameId,
    pub plan: String,
    pub to_move: Player,
    pub occupancy: Vec<Option<Player>>,
    pub legal_moves: Vec<PointId>,
    pub game_over: bool,
    pub scores: Scores,
}

struct Game {
    coordinator: TurnCoordinator,
    plan: String,
    white_joined: bool,
}

impl Game {
    fn view(&self, id: GameId) -> GameView {
        let board = self.coordinator.board();
        GameView {
            id,
            plan: self.plan.clone(),
            to_move: board.to_move(),
            occupancy: board.cells().to_vec(),
            legal_moves: board.possible_moves(),
            game_over: board.game_over(),
            scores: board.scores(),
        }
    }

    fn open(&self) -> bool {
        !self.white_joined
    }
}

/// A game plus what can be read or done without waiting for it.
struct Entry {
    game: Mutex<Game>,
    vs_computer: bool,
    stop: StopHandle,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct GameRegistry {
    games: Mutex<HashMap<GameId, Arc<Entry>>>,
    search: SearchConfig,
}

impl GameRegistry {
    /// `search` configures the computer seat of every game vs the computer.
    pub fn new(search: SearchConfig) -> Self {
        Self {
            games: Mutex::new(HashMap::new()),
            search,
        }
    }

    fn entry(&self, id: GameId) -> Result<Arc<Entry>, RegistryError> {
        lock(&self.games)
            .get(&id)
            .cloned()
            .ok_or(RegistryError::UnknownGame(id))
    }

    /// Create a game on `spec`. The creator plays Black; with `vs_computer`
    /// the computer takes White at once.
    pub fn new_game(&self, spec: &TopologySpec, vs_computer: bool) -> Result<GameView, RegistryError> {
        let board = Board::from_spec(spec)?;
        let white = if vs_computer {
            SeatKind::Computer(self.search.clone())
        } else {
            SeatKind::Human
        };
        let coordinator = TurnCoordinator::new(board, SeatKind::Human, white);
        let stop = coordinator.stop_handle();
        let game = Game {
            coordinator,
            plan: spec.plan.clone(),
            white_joined: vs_computer,
        };

        let mut games = lock(&self.games);
        let id = games.keys().max().map_or(0, |&max| max + 1);
        let view = game.view(id);
        games.insert(
            id,
            Arc::new(Entry {
                game: Mutex::new(game),
                vs_computer,
                stop,
            }),
        );
        tracing::info!(id, vs_computer, points = view.occupancy.len(), "game created");
        Ok(view)
    }

    /// Seat a second human as White.
    pub fn join(&self, id: GameId) -> Result<GameView, RegistryError> {
        let entry = self.entry(id)?;
        let mut game = lock(&entry.game);
        if !game.open() {
            return Err(RegistryError::NotJoinable(id));
        }
        game.white_joined = true;
        tracing::info!(id, "game joined");
        Ok(game.view(id))
    }

    /// Games still waiting for a second human, ascending.
    pub fn open_games(&self) -> Vec<GameId> {
        let humans: Vec<(GameId, Arc<Entry>)> = lock(&self.games)
            .iter()
            .filter(|(_, entry)| !entry.vs_computer)
            .map(|(&id, entry)| (id, Arc::clone(entry)))
            .collect();
        let mut ids: Vec<GameId> = humans
            .into_iter()
            .filter(|(_, entry)| lock(&entry.game).open())
            .map(|(id, _)| id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn view(&self, id: GameId) -> Result<GameView, RegistryError> {
        let entry = self.entry(id)?;
        let game = lock(&entry.game);
        Ok(game.view(id))
    }

    /// Play `player`'s move, then any computer replies it triggers.
    pub fn submit_move(
        &self,
        id: GameId,
        player: Player,
        to: PointId,
    ) -> Result<Vec<MoveReport>, RegistryError> {
        let entry = self.entry(id)?;
        let mut game = lock(&entry.game);
        if !game.white_joined {
            return Err(RegistryError::Waiting(id));
        }
        if game.coordinator.is_computer(player) {
            return Err(MoveError::SeatIsComputer.into());
        }
        let mut reports = vec![game.coordinator.submit(player, to)?];
        reports.extend(game.coordinator.run_until_human()?);
        Ok(reports)
    }

    /// `player` gives up. The game is removed and the winner returned.
    pub fn concede(&self, id: GameId, player: Player) -> Result<Player, RegistryError> {
        let entry = lock(&self.games)
            .remove(&id)
            .ok_or(RegistryError::UnknownGame(id))?;
        // A computer reply in flight holds the game until its seat lets go.
        entry.stop.stop();
        lock(&entry.game).coordinator.stop();
        let winner = player.opponent();
        tracing::info!(id, %player, %winner, "game conceded");
        Ok(winner)
    }

    pub fn len(&self) -> usize {
        lock(&self.games).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.games).is_empty()
    }
}

impl Default for GameRegistry {
    fn default() -> Self {
        Self::new(SearchConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::error::TurnError;
    use crate::topology::grid_spec;

    fn registry() -> GameRegistry {
        GameRegistry::new(SearchConfig::default().without_cutoff().with_max_depth(2))
    }

    #[test]
    fn test_ids_follow_the_largest() {
        let registry = registry();
        assert_eq!(registry.new_game(&grid_spec(4), false).unwrap().id, 0);
        assert_eq!(registry.new_game(&grid_spec(4), false).unwrap().id, 1);
        registry.concede(0, Player::Black).unwrap();
        assert_eq!(registry.new_game(&grid_spec(4), false).unwrap().id, 2);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_join_and_open_games() {
        let registry = registry();
        let human = registry.new_game(&grid_spec(4), false).unwrap();
        let computer = registry.new_game(&grid_spec(4), true).unwrap();
        assert_eq!(registry.open_games(), vec![human.id]);
        assert!(matches!(
            registry.join(computer.id),
            Err(RegistryError::NotJoinable(_))
        ));

        let view = registry.join(human.id).unwrap();
        assert_eq!(view.plan, "grid 4x4");
        assert_eq!(view.legal_moves, vec![2, 7, 8, 13]);
        assert!(registry.open_games().is_empty());
        assert!(matches!(registry.join(human.id), Err(RegistryError::NotJoinable(_))));
    }

    #[test]
    fn test_moves_need_an_opponent() {
        let registry = registry();
        let id = registry.new_game(&grid_spec(4), false).unwrap().id;
        assert!(matches!(
            registry.submit_move(id, Player::Black, 2),
            Err(RegistryError::Waiting(_))
        ));
        registry.join(id).unwrap();
        let reports = registry.submit_move(id, Player::Black, 2).unwrap();
        assert_eq!(reports.len(), 1);
        assert!(matches!(
            registry.submit_move(id, Player::Black, 7),
            Err(RegistryError::Turn(TurnError::Move(MoveError::NotYourTurn)))
        ));
    }

    #[test]
    fn test_computer_answers() {
        let registry = registry();
        let id = registry.new_game(&grid_spec(4), true).unwrap().id;
        let reports = registry.submit_move(id, Player::Black, 8).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[1].player, Player::White);
        assert_eq!(registry.view(id).unwrap().to_move, Player::Black);
        assert!(matches!(
            registry.submit_move(id, Player::White, 0),
            Err(RegistryError::Move(MoveError::SeatIsComputer))
        ));
    }

    #[test]
    fn test_illegal_move_rejected_without_change() {
        let registry = registry();
        let id = registry.new_game(&grid_spec(4), true).unwrap().id;
        let before = registry.view(id).unwrap();
        assert!(matches!(
            registry.submit_move(id, Player::Black, 0),
            Err(RegistryError::Turn(TurnError::Move(MoveError::NoCapture(0))))
        ));
        assert_eq!(registry.view(id).unwrap(), before);
    }

    #[test]
    fn test_concede_removes_game() {
        let registry = registry();
        let id = registry.new_game(&grid_spec(4), true).unwrap().id;
        assert_eq!(registry.concede(id, Player::Black).unwrap(), Player::White);
        assert!(registry.is_empty());
        assert!(matches!(registry.view(id), Err(RegistryError::UnknownGame(_))));
        assert!(matches!(
            registry.concede(id, Player::Black),
            Err(RegistryError::UnknownGame(_))
        ));
    }

    #[test]
    fn test_bad_topology_rejected() {
        let registry = registry();
        let mut spec = grid_spec(4);
        spec.black.push(40);
        assert!(matches!(
            registry.new_game(&spec, false),
            Err(RegistryError::Topology(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_busy_game_does_not_block_others() {
        let registry = Arc::new(registry());
        registry.new_game(&grid_spec(4), true).unwrap();
        registry.new_game(&grid_spec(4), false).unwrap();
        registry.new_game(&grid_spec(4), false).unwrap();

        // Game 0 is mid-reply and game 1 is held by some other request.
        let computer = registry.entry(0).unwrap();
        let human = registry.entry(1).unwrap();
        let computer_busy = lock(&computer.game);
        let human_busy = lock(&human.game);

        let (open_tx, open_rx) = mpsc::channel();
        let lister = Arc::clone(&registry);
        thread::spawn(move || open_tx.send(lister.open_games()).unwrap());
        thread::sleep(Duration::from_millis(50));

        let (view_tx, view_rx) = mpsc::channel();
        let viewer = Arc::clone(&registry);
        thread::spawn(move || {
            let view = viewer.view(2).unwrap();
            let created = viewer.new_game(&grid_spec(4), false).unwrap();
            view_tx.send((view.id, created.id)).unwrap();
        });
        assert_eq!(view_rx.recv_timeout(Duration::from_secs(5)).unwrap(), (2, 3));

        drop(human_busy);
        let open = open_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(open == vec![1, 2] || open == vec![1, 2, 3], "{open:?}");
        drop(computer_busy);
    }

    #[test]
    fn test_concede_releases_a_computer_without_moves() {
        let starved = SearchConfig::default()
            .with_budget(Duration::ZERO)
            .with_retry_delay(Duration::from_millis(5));
        let registry = Arc::new(GameRegistry::new(starved));
        let id = registry.new_game(&grid_spec(4), true).unwrap().id;

        let player = Arc::clone(&registry);
        let mover = thread::spawn(move || player.submit_move(id, Player::Black, 2));
        thread::sleep(Duration::from_millis(50));

        let (tx, rx) = mpsc::channel();
        let quitter = Arc::clone(&registry);
        thread::spawn(move || tx.send(quitter.concede(id, Player::Black)).unwrap());
        let winner = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(winner.unwrap(), Player::White);

        // Only the human move can have been played.
        if let Ok(reports) = mover.join().unwrap() {
            assert_eq!(reports.len(), 1);
            assert_eq!(reports[0].player, Player::Black);
        }
        assert!(registry.is_empty());
    }
}
