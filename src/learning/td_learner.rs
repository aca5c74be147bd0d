//! TD(0) learner over afterstates.
//!
//! The learner keeps the afterstate produced by the previous move of the
//! episode. Each later move supplies the next afterstate and the reward
//! that led to it; the weights touched by the previous afterstate are
//! moved toward `reward + V(next)`.
//!
//! # Algorithm
//!
//! ```text
//! first move:       previous := next                       (no update)
//! later moves:      delta := V(next) - V(previous) + reward
//!                   previous.weights += alpha * delta
//!                   previous := next
//! no legal move:    delta := -V(previous)
//!                   previous.weights += alpha * delta
//! ```
//!
//! Every (pattern, symmetry) entry of the previous afterstate receives the
//! full `alpha * delta`, so a single update moves `V(previous)` by up to
//! `8 * patterns * alpha * delta`.

use crate::board::{Board, Reward};
use crate::evaluator::Evaluator;

/// Statistics accumulated over TD updates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TDUpdateStats {
    /// Updates applied, terminal ones included
    pub updates: u64,
    /// Terminal updates applied
    pub terminal_updates: u64,
    /// Sum of |delta| over all updates
    pub total_abs_td_error: f64,
    /// Largest |delta| seen
    pub max_abs_td_error: f32,
}

impl TDUpdateStats {
    /// Average |delta| (0.0 before the first update)
    pub fn avg_abs_td_error(&self) -> f64 {
        if self.updates == 0 {
            0.0
        } else {
            self.total_abs_td_error / self.updates as f64
        }
    }

    fn record(&mut self, delta: f32, terminal: bool) {
        self.updates += 1;
        if terminal {
            self.terminal_updates += 1;
        }
        let magnitude = delta.abs();
        self.total_abs_td_error += f64::from(magnitude);
        if magnitude > self.max_abs_td_error {
            self.max_abs_td_error = magnitude;
        }
    }
}

/// Online TD(0) learner.
///
/// # Example
///
/// ```
/// use threes_td::board::{Board, Direction};
/// use threes_td::evaluator::Evaluator;
/// use threes_td::learning::TDLearner;
/// use threes_td::pattern::row_and_column_patterns;
///
/// let mut evaluator = Evaluator::new(row_and_column_patterns());
/// let mut learner = TDLearner::new(0.1 / 32.0);
///
/// let mut cells = [0u8; 16];
/// cells[0] = 1;
/// cells[1] = 2;
/// let mut board = Board::from_cells(cells);
///
/// learner.open_episode();
/// let reward = board.slide(Direction::Right).unwrap();
/// assert_eq!(learner.observe(&mut evaluator, board, reward), None);
///
/// let reward = board.slide(Direction::Left).unwrap();
/// assert!(learner.observe(&mut evaluator, board, reward).is_some());
/// ```
#[derive(Debug, Clone)]
pub struct TDLearner {
    /// Learning rate
    alpha: f32,
    /// Afterstate of the previous move in this episode
    previous: Option<Board>,
    stats: TDUpdateStats,
}

impl TDLearner {
    /// Create a learner with learning rate `alpha`.
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha,
            previous: None,
            stats: TDUpdateStats::default(),
        }
    }

    #[inline]
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Forget the previous afterstate.
    pub fn open_episode(&mut self) {
        self.previous = None;
    }

    /// Afterstate recorded by the last observed move, if any
    #[inline]
    pub fn previous(&self) -> Option<&Board> {
        self.previous.as_ref()
    }

    /// Record the afterstate `next` reached with `reward`.
    ///
    /// # Returns
    ///
    /// The TD error applied to the previous afterstate, or `None` on the
    /// first move of the episode.
    pub fn observe(&mut self, evaluator: &mut Evaluator, next: Board, reward: Reward) -> Option<f32> {
        let delta = self.previous.map(|previous| {
            let delta = evaluator.evaluate(&next) - evaluator.evaluate(&previous) + reward as f32;
            evaluator.adjust(&previous, self.alpha * delta);
            self.stats.record(delta, false);
            delta
        });
        self.previous = Some(next);
        delta
    }

    /// Apply the terminal update: the previous afterstate is followed by
    /// no legal move, so its target value is 0.
    ///
    /// # Returns
    ///
    /// The TD error applied, or `None` when nothing was recorded.
    pub fn terminal(&mut self, evaluator: &mut Evaluator) -> Option<f32> {
        let previous = self.previous.take()?;
        let delta = -evaluator.evaluate(&previous);
        evaluator.adjust(&previous, self.alpha * delta);
        self.stats.record(delta, true);
        Some(delta)
    }

    #[inline]
    pub fn stats(&self) -> &TDUpdateStats {
        &self.stats
    }

    /// Return the accumulated statistics and start a fresh count.
    pub fn take_stats(&mut self) -> TDUpdateStats {
        std::mem::take(&mut self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Direction;
    use crate::pattern::{row_and_column_patterns, Pattern};

    fn single_row_evaluator() -> Evaluator {
        Evaluator::new(vec![Pattern::new(0, &[0, 1, 2, 3]).unwrap()])
    }

    /// All tiles distinct, so the 8 border readings hit 8 distinct entries
    fn distinct_board() -> Board {
        Board::from_cells([1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 0])
    }

    #[test]
    fn test_first_move_only_records() {
        let mut evaluator = single_row_evaluator();
        let mut learner = TDLearner::new(0.5);

        assert!(learner.previous().is_none());
        assert_eq!(learner.observe(&mut evaluator, distinct_board(), 10), None);
        assert_eq!(learner.previous(), Some(&distinct_board()));
        assert!(evaluator.network().table(0).as_slice().iter().all(|&w| w == 0.0));
        assert_eq!(learner.stats().updates, 0);
    }

    #[test]
    fn test_update_scales_by_eight() {
        let mut evaluator = single_row_evaluator();
        let mut learner = TDLearner::new(0.5);
        let prev = distinct_board();
        let next = Board::new();

        learner.observe(&mut evaluator, prev, 0);
        let delta = learner.observe(&mut evaluator, next, 6).unwrap();

        // V(next) = V(prev) = 0 beforehand
        assert_eq!(delta, 6.0);
        assert_eq!(evaluator.evaluate(&prev), 8.0 * 0.5 * 6.0);
        // next was never updated
        assert_eq!(evaluator.evaluate(&next), 0.0);
        assert_eq!(learner.previous(), Some(&next));
    }

    #[test]
    fn test_delta_uses_current_values() {
        let mut evaluator = single_row_evaluator();
        let mut learner = TDLearner::new(0.25);
        let prev = distinct_board();
        let mut next = distinct_board();
        next.slide(Direction::Right).unwrap();

        evaluator.adjust(&prev, 1.0);
        evaluator.adjust(&next, 0.5);
        let v_prev = evaluator.evaluate(&prev);
        let v_next = evaluator.evaluate(&next);

        learner.observe(&mut evaluator, prev, 0);
        let delta = learner.observe(&mut evaluator, next, 3).unwrap();
        assert!((delta - (v_next - v_prev + 3.0)).abs() < 1e-5);
    }

    #[test]
    fn test_terminal_update() {
        let mut evaluator = single_row_evaluator();
        let mut learner = TDLearner::new(0.5);
        let prev = distinct_board();
        evaluator.adjust(&prev, 1.0);
        assert_eq!(evaluator.evaluate(&prev), 8.0);

        learner.observe(&mut evaluator, prev, 0);
        let delta = learner.terminal(&mut evaluator).unwrap();

        assert_eq!(delta, -8.0);
        // 8.0 + 8 * 0.5 * -8.0
        assert_eq!(evaluator.evaluate(&prev), -24.0);
        assert!(learner.previous().is_none());
        assert_eq!(learner.stats().terminal_updates, 1);

        // Nothing left to update
        assert_eq!(learner.terminal(&mut evaluator), None);
    }

    #[test]
    fn test_open_episode_resets_previous() {
        let mut evaluator = single_row_evaluator();
        let mut learner = TDLearner::new(0.5);
        learner.observe(&mut evaluator, distinct_board(), 0);

        learner.open_episode();
        assert!(learner.previous().is_none());
        assert_eq!(learner.observe(&mut evaluator, Board::new(), 3), None);
        assert_eq!(learner.terminal(&mut evaluator), Some(0.0));
    }

    #[test]
    fn test_zero_alpha_leaves_weights() {
        let mut evaluator = Evaluator::new(row_and_column_patterns());
        let mut learner = TDLearner::new(0.0);
        learner.observe(&mut evaluator, distinct_board(), 0);
        learner.observe(&mut evaluator, Board::new(), 9);
        learner.terminal(&mut evaluator);

        assert_eq!(evaluator.evaluate(&distinct_board()), 0.0);
        assert_eq!(learner.stats().updates, 2);
    }

    #[test]
    fn test_stats_accumulate() {
        let mut evaluator = single_row_evaluator();
        let mut learner = TDLearner::new(0.0);
        learner.observe(&mut evaluator, Board::new(), 0);
        learner.observe(&mut evaluator, distinct_board(), 3);
        learner.observe(&mut evaluator, Board::new(), 1);

        let stats = learner.take_stats();
        assert_eq!(stats.updates, 2);
        assert_eq!(stats.max_abs_td_error, 3.0);
        assert_eq!(stats.avg_abs_td_error(), 2.0);
        assert_eq!(learner.stats(), &TDUpdateStats::default());
        assert_eq!(TDUpdateStats::default().avg_abs_td_error(), 0.0);
    }
}
