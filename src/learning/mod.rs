//! Online TD(0) learning for the n-tuple value function
//!
//! The learner adjusts the weights touched by the previous afterstate after
//! every move, using the reward and the value of the next afterstate as the
//! target. Weights are persisted as a flat little-endian snapshot.
//!
//! # Architecture
//!
//! ```text
//! play_episode
//!     |-- Slider (Strategy::TemporalDifference)
//!     |       |-- ActionSelector (1-ply + expectimax bonus)
//!     |       |-- TDLearner
//!     |       |-- Evaluator (exclusively owned)
//!     |-- RandomPlacer
//!     |-- TrainingStatistics
//! checkpoint (load at construction, save at shutdown)
//! ```
//!
//! # Example
//!
//! ```
//! use threes_td::agent::{Agent, RandomPlacer, Slider};
//! use threes_td::config::AgentConfig;
//! use threes_td::learning::play_episode;
//!
//! let mut slider = Slider::new(AgentConfig::parse("seed=1 patterns=rows").unwrap()).unwrap();
//! let mut placer = RandomPlacer::new(AgentConfig::parse("seed=2").unwrap());
//! let result = play_episode(&mut slider, &mut placer);
//! assert!(result.moves > 0);
//! ```

use crate::config::ConfigError;
use crate::pattern::PatternError;
use thiserror::Error;

// Submodules
pub mod checkpoint;
pub mod logger;
pub mod self_play;
pub mod td_learner;

// Re-export public types
pub use checkpoint::{load_network, read_network, save_network, write_network, MAX_TABLE_ENTRIES};
pub use error::LearningError;
pub use logger::{BlockSummary, EpisodeRecord, TrainingStatistics};
pub use self_play::{play_episode, EpisodeResult, INITIAL_PLACEMENTS};
pub use td_learner::{TDLearner, TDUpdateStats};

/// Error types for the learning module
mod error {
    use super::*;

    /// Learning system error type
    ///
    /// | Variant | Recovery |
    /// |---------|----------|
    /// | `Io` | Fatal, reported by the binary |
    /// | `InvalidCheckpoint` | Fatal, the snapshot is corrupt or truncated |
    /// | `NetworkMismatch` | Fatal, snapshot and patterns disagree |
    /// | `Config` | Fatal, fix the agent arguments |
    /// | `Pattern` | Fatal, fix the pattern file |
    #[derive(Error, Debug)]
    pub enum LearningError {
        /// I/O errors while reading or writing a snapshot
        #[error("I/O error: {0}")]
        Io(#[from] std::io::Error),

        /// Snapshot is truncated, oversized or otherwise malformed
        #[error("Invalid checkpoint: {0}")]
        InvalidCheckpoint(String),

        /// Weight network does not fit the configured patterns
        #[error("Weight network does not fit patterns: {0}")]
        NetworkMismatch(String),

        /// Invalid agent arguments
        #[error("Configuration error: {0}")]
        Config(#[from] ConfigError),

        /// Pattern table could not be built or loaded
        #[error("Pattern error: {0}")]
        Pattern(#[from] PatternError),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let learning_err: LearningError = io_err.into();

        match learning_err {
            LearningError::Io(_) => {}
            _ => panic!("Expected Io variant"),
        }
    }

    #[test]
    fn test_pattern_error_conversion() {
        let learning_err: LearningError = PatternError::Empty.into();
        assert!(matches!(learning_err, LearningError::Pattern(_)));
    }

    #[test]
    fn test_config_error_conversion() {
        let config_err = ConfigError::UnknownKey("lambda".to_string());
        let learning_err: LearningError = config_err.into();
        assert!(matches!(learning_err, LearningError::Config(_)));
        assert!(learning_err.to_string().contains("lambda"));
    }

    #[test]
    fn test_invalid_checkpoint_error() {
        let err = LearningError::InvalidCheckpoint("truncated table 3".to_string());
        assert!(err.to_string().contains("checkpoint"));
        assert!(err.to_string().contains("truncated table 3"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<LearningError>();
        assert_sync::<LearningError>();
    }
}
