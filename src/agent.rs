//! Agents: the slider that plays moves and the placer that drops tiles

use std::fmt;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::board::{Board, Direction, Reward};
use crate::config::{AgentConfig, PatternSource, StrategyKind};
use crate::evaluator::{Evaluator, WeightNetwork};
use crate::learning::{checkpoint, LearningError, TDLearner};
use crate::pattern::{load_patterns, row_and_column_patterns, six_tuple_patterns, Pattern};
use crate::search::{greedy_action, ActionSelector};

/// What an agent does on its turn
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Slide every tile toward a direction
    Slide(Direction),
    /// Drop `tile` on `cell` and announce `hint` as the next tile
    Place {
        cell: usize,
        tile: u8,
        hint: Option<u8>,
    },
    /// No legal action; ends the episode
    None,
}

impl Action {
    /// Apply the action to `board`.
    ///
    /// # Returns
    ///
    /// The reward, or `None` if the action is illegal on `board` (the
    /// board is left untouched) or is `Action::None`.
    pub fn apply(self, board: &mut Board) -> Option<Reward> {
        match self {
            Action::Slide(direction) => board.slide(direction),
            Action::Place { cell, tile, hint } => board.place(cell, tile, hint),
            Action::None => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Slide(direction) => write!(f, "slide {}", direction),
            Action::Place { cell, tile, hint } => match hint {
                Some(hint) => write!(f, "place {} at {} (hint {})", tile, cell, hint),
                None => write!(f, "place {} at {}", tile, cell),
            },
            Action::None => f.write_str("none"),
        }
    }
}

/// Anything that takes turns in an episode
pub trait Agent {
    fn open_episode(&mut self) {}
    fn close_episode(&mut self) {}
    fn take_action(&mut self, board: &Board) -> Action;
    fn name(&self) -> &str;
    fn role(&self) -> &str;
}

/// Slider decision rule
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// First legal direction of a freshly shuffled order
    Random,
    /// Largest summed slide reward over `depth` plies
    Greedy { depth: usize },
    /// n-tuple value function trained online with TD(0)
    TemporalDifference { expectimax: bool },
}

impl Strategy {
    fn from_config(config: &AgentConfig) -> Self {
        match config.strategy {
            StrategyKind::Random => Strategy::Random,
            StrategyKind::Greedy => Strategy::Greedy {
                depth: config.depth,
            },
            StrategyKind::TemporalDifference => Strategy::TemporalDifference {
                expectimax: config.expectimax,
            },
        }
    }
}

/// Value function, its learner and the move selector of a TD slider
#[derive(Debug)]
struct TdState {
    evaluator: Evaluator,
    learner: TDLearner,
    selector: ActionSelector,
}

/// Player agent
#[derive(Debug)]
pub struct Slider {
    config: AgentConfig,
    strategy: Strategy,
    rng: StdRng,
    order: [Direction; 4],
    td: Option<TdState>,
}

impl Slider {
    /// Build a slider from validated arguments.
    ///
    /// A TD slider loads its patterns, then creates its weights from `init`
    /// (or sized by the patterns) unless `load` names a snapshot, which
    /// replaces them.
    ///
    /// # Errors
    ///
    /// `LearningError` if the pattern file or snapshot cannot be read, or
    /// the weights do not fit the patterns.
    pub fn new(config: AgentConfig) -> Result<Self, LearningError> {
        let strategy = Strategy::from_config(&config);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let td = match strategy {
            Strategy::TemporalDifference { expectimax } => Some(TdState {
                evaluator: build_evaluator(&config)?,
                learner: TDLearner::new(config.alpha),
                selector: ActionSelector::new(expectimax),
            }),
            _ => {
                if config.init.is_some() || config.load.is_some() || config.save.is_some() {
                    log::warn!(
                        "{}: weight arguments ignored by the {} strategy",
                        config.name,
                        config.strategy
                    );
                }
                None
            }
        };

        log::info!("{}: {:?}", config.name, strategy);
        Ok(Self {
            config,
            strategy,
            rng,
            order: Direction::ALL,
            td,
        })
    }

    #[inline]
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Value function of a TD slider
    pub fn evaluator(&self) -> Option<&Evaluator> {
        self.td.as_ref().map(|td| &td.evaluator)
    }

    /// Learner of a TD slider
    pub fn learner(&self) -> Option<&TDLearner> {
        self.td.as_ref().map(|td| &td.learner)
    }

    /// Write the weights to the configured `save` path.
    ///
    /// # Returns
    ///
    /// The snapshot size, or `None` if there is nothing to save.
    pub fn save_weights(&self) -> Result<Option<u64>, LearningError> {
        match (&self.td, &self.config.save) {
            (Some(td), Some(path)) => {
                checkpoint::save_network(path, td.evaluator.network()).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Finish with the slider, saving the weights when configured.
    pub fn shutdown(self) -> Result<(), LearningError> {
        if let Some(td) = &self.td {
            let stats = td.learner.stats();
            log::info!(
                "{}: {} TD updates ({} terminal), avg |delta| {:.4}, max |delta| {:.4}",
                self.config.name,
                stats.updates,
                stats.terminal_updates,
                stats.avg_abs_td_error(),
                stats.max_abs_td_error
            );
        }
        self.save_weights()?;
        Ok(())
    }

    fn random_action(&mut self, board: &Board) -> Action {
        self.order.shuffle(&mut self.rng);
        self.order
            .iter()
            .copied()
            .find(|&direction| {
                let mut after = *board;
                after.slide(direction).is_some()
            })
            .map_or(Action::None, Action::Slide)
    }
}

impl Agent for Slider {
    fn open_episode(&mut self) {
        if let Some(td) = self.td.as_mut() {
            td.learner.open_episode();
        }
    }

    fn take_action(&mut self, board: &Board) -> Action {
        match self.strategy {
            Strategy::Random => self.random_action(board),
            Strategy::Greedy { depth } => {
                greedy_action(board, depth).map_or(Action::None, Action::Slide)
            }
            Strategy::TemporalDifference { .. } => {
                let Some(td) = self.td.as_mut() else {
                    return Action::None;
                };
                match td.selector.best_move(&td.evaluator, board) {
                    Some(best) => {
                        td.learner.observe(&mut td.evaluator, best.after, best.reward);
                        Action::Slide(best.direction)
                    }
                    None => {
                        td.learner.terminal(&mut td.evaluator);
                        Action::None
                    }
                }
            }
        }
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn role(&self) -> &str {
        &self.config.role
    }
}

fn build_evaluator(config: &AgentConfig) -> Result<Evaluator, LearningError> {
    let patterns: Vec<Pattern> = match &config.patterns {
        PatternSource::Rows => row_and_column_patterns(),
        PatternSource::Six => six_tuple_patterns(),
        PatternSource::File(path) => load_patterns(path)?,
    };

    let network = match (&config.load, &config.init) {
        (Some(path), _) => checkpoint::load_network(path)?,
        (None, Some(sizes)) => WeightNetwork::with_sizes(sizes),
        (None, None) => WeightNetwork::for_patterns(&patterns),
    };

    log::debug!(
        "{} patterns, {} weight tables ({} bytes)",
        patterns.len(),
        network.len(),
        network.memory_usage()
    );
    Evaluator::with_network(patterns, network)
}

/// Environment agent: drops the hint tile on a random empty cell of the
/// region exposed by the last slide and draws the next hint from the bag.
#[derive(Debug)]
pub struct RandomPlacer {
    config: AgentConfig,
    rng: StdRng,
}

impl RandomPlacer {
    pub fn new(config: AgentConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { config, rng }
    }
}

impl Agent for RandomPlacer {
    fn take_action(&mut self, board: &Board) -> Action {
        let mut cells = board.last_region().cells().to_vec();
        cells.shuffle(&mut self.rng);
        let Some(cell) = cells.into_iter().find(|&cell| board.cell(cell) == 0) else {
            return Action::None;
        };

        let mut bag: Vec<u8> = (1..=3u8)
            .flat_map(|tile| std::iter::repeat_n(tile, board.bag_count(tile)))
            .collect();
        bag.shuffle(&mut self.rng);

        let tile = match board.hint().or_else(|| bag.pop()) {
            Some(tile) => tile,
            None => self.rng.random_range(1..=3),
        };
        // An emptied bag refills with one of each
        let hint = bag.pop().unwrap_or_else(|| self.rng.random_range(1..=3));

        Action::Place {
            cell,
            tile,
            hint: Some(hint),
        }
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn role(&self) -> &str {
        &self.config.role
    }
}
