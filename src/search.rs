//! Time-bounded iterative deepening alpha-beta search.
//!
//! The search evaluates every node from the fixed perspective of one player,
//! `me`. Depth parity alone decides whether a node maximizes or minimizes,
//! whichever side the board says is to move.
//!
//! A depth is either finished within the budget or thrown away whole: an
//! expired [`Deadline`] makes the in-flight pass return
//! [`Outcome::Incomplete`], which propagates to the root without any partial
//! value leaking into the result.

use std::time::{Duration, Instant};

use crate::board::{Board, Player};
use crate::constants::{DEFAULT_BUDGET_MS, DEFAULT_MAX_DEPTH, RETRY_DELAY_MS};
use crate::geometry::PointId;

/// Search limits for one seat.
///
/// ```
/// use std::time::Duration;
/// use nongrid_othello::search::SearchConfig;
///
/// let config = SearchConfig::default()
///     .with_max_depth(4)
///     .with_budget(Duration::from_millis(250));
/// assert_eq!(config.max_depth, 4);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchConfig {
    pub max_depth: usize,
    /// Wall-clock budget per invocation; `None` searches to `max_depth`.
    pub budget: Option<Duration>,
    /// Pause before a worker retries after finding nothing in time.
    pub retry_delay: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            budget: Some(Duration::from_millis(DEFAULT_BUDGET_MS)),
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
        }
    }
}

impl SearchConfig {
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Disable the time cutoff. Deterministic, for tests and analysis.
    pub fn without_cutoff(mut self) -> Self {
        self.budget = None;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }
}

/// Wall-clock cutoff measured from the start of a search.
#[derive(Clone, Copy, Debug)]
pub struct Deadline {
    start: Instant,
    budget: Option<Duration>,
}

impl Deadline {
    pub fn start(budget: Option<Duration>) -> Self {
        Self {
            start: Instant::now(),
            budget,
        }
    }

    pub fn expired(&self) -> bool {
        self.budget.is_some_and(|b| self.start.elapsed() >= b)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Complete {
        value: i32,
        /// Best move at this node; `None` at leaves and terminal positions.
        best: Option<PointId>,
        /// Every line explored reached the end of the game, so searching
        /// deeper cannot change the value.
        exact: bool,
    },
    /// The deadline passed mid-pass. Carries no value.
    Incomplete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchResult {
    pub to: PointId,
    pub value: i32,
    /// Deepest fully completed pass.
    pub depth: usize,
}

/// One bounded alpha-beta pass of `depth` plies below `board`.
pub fn alpha_beta(
    board: &Board,
    me: Player,
    depth: usize,
    mut alpha: i32,
    mut beta: i32,
    maximizing: bool,
    deadline: &Deadline,
) -> Outcome {
    if depth == 0 {
        return Outcome::Complete {
            value: board.eval(me),
            best: None,
            exact: false,
        };
    }
    if deadline.expired() {
        return Outcome::Incomplete;
    }

    let candidates = board.candidates();
    if candidates.is_empty() {
        return Outcome::Complete {
            value: board.eval(me),
            best: None,
            exact: true,
        };
    }

    let mut value = if maximizing { i32::MIN } else { i32::MAX };
    let mut best = None;
    let mut exact = true;

    for pending in candidates {
        let child = match pending.apply() {
            Ok(child) => child,
            Err(err) => {
                tracing::warn!(to = pending.to, %err, "candidate move failed to apply, skipped");
                continue;
            }
        };
        let (v, child_exact) = match alpha_beta(&child, me, depth - 1, alpha, beta, !maximizing, deadline) {
            Outcome::Complete { value, exact, .. } => (value, exact),
            Outcome::Incomplete => return Outcome::Incomplete,
        };
        exact &= child_exact;

        if maximizing {
            if v > value || best.is_none() {
                value = v;
                best = Some(pending.to);
            }
            if value >= beta {
                break;
            }
            alpha = alpha.max(value);
        } else {
            if v < value || best.is_none() {
                value = v;
                best = Some(pending.to);
            }
            if value <= alpha {
                break;
            }
            beta = beta.min(value);
        }
    }

    Outcome::Complete { value, best, exact }
}

/// Best move for `me` on `board`, deepening one ply at a time until the
/// budget runs out, `config.max_depth` is reached, or the game tree is
/// exhausted.
///
/// Returns `None` when the position has no moves or the budget expired
/// before depth 1 completed. A depth that finishes after the deadline is
/// discarded like one that did not finish.
pub fn search(board: &Board, me: Player, config: &SearchConfig) -> Option<SearchResult> {
    let deadline = Deadline::start(config.budget);
    let mut result = None;

    for depth in 1..=config.max_depth {
        match alpha_beta(board, me, depth, i32::MIN, i32::MAX, true, &deadline) {
            Outcome::Incomplete => {
                tracing::debug!(depth, "search depth abandoned at deadline");
                break;
            }
            Outcome::Complete { best: None, .. } => break,
            Outcome::Complete { value, best: Some(to), exact } => {
                if deadline.expired() {
                    tracing::debug!(depth, "search depth finished late, discarded");
                    break;
                }
                tracing::trace!(depth, to, value, exact, "search depth complete");
                result = Some(SearchResult { to, value, depth });
                if exact {
                    break;
                }
            }
        }
    }

    if let Some(r) = &result {
        tracing::debug!(%me, to = r.to, value = r.value, depth = r.depth, "search finished");
    }
    result
}
