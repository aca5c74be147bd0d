//! Integration tests for the complete training flow.
//!
//! - Episodes driven by the slider and the random placer
//! - TD updates during play and the terminal update
//! - Weight snapshot save/load round trips through the agent lifecycle
//! - Fatal persistence and configuration errors

use std::fs;

use tempfile::tempdir;

use threes_td::agent::{RandomPlacer, Slider, Strategy};
use threes_td::config::AgentConfig;
use threes_td::evaluator::{WeightNetwork, WeightTable};
use threes_td::learning::*;

fn slider(args: &str) -> Slider {
    Slider::new(AgentConfig::slider(args).unwrap()).unwrap()
}

fn placer(seed: u64) -> RandomPlacer {
    RandomPlacer::new(AgentConfig::placer(&format!("seed={}", seed)).unwrap())
}

#[test]
fn test_training_run_saves_and_reloads_weights() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("weights.bin");

    let mut trainer = slider(&format!("seed=1 alpha=0.01 save={}", path.display()));
    let mut env = placer(2);
    let mut finals = Vec::new();
    for _ in 0..20 {
        finals.push(play_episode(&mut trainer, &mut env).final_board);
    }

    let trained = trainer.evaluator().unwrap().clone();
    assert!(
        trained
            .network()
            .tables()
            .iter()
            .any(|t| t.as_slice().iter().any(|&w| w != 0.0)),
        "training should move some weights"
    );
    trainer.shutdown().unwrap();
    assert!(path.exists());

    let restored = slider(&format!("load={}", path.display()));
    let restored_eval = restored.evaluator().unwrap();
    assert_eq!(restored_eval.network(), trained.network());

    for board in &finals {
        assert_eq!(restored_eval.evaluate(board), trained.evaluate(board));
    }
}

#[test]
fn test_snapshot_bytes_survive_load_and_save() {
    let temp_dir = tempdir().unwrap();
    let first = temp_dir.path().join("first.bin");
    let second = temp_dir.path().join("second.bin");

    let mut trainer = slider(&format!("seed=3 save={}", first.display()));
    let mut env = placer(4);
    for _ in 0..5 {
        play_episode(&mut trainer, &mut env);
    }
    trainer.shutdown().unwrap();

    // Load, play nothing, save elsewhere
    let relay = slider(&format!(
        "load={} save={}",
        first.display(),
        second.display()
    ));
    relay.shutdown().unwrap();

    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}

#[test]
fn test_zero_alpha_td_matches_one_step_greedy() {
    let mut td = slider("alpha=0");
    let mut greedy = slider("strategy=greedy depth=1");
    assert_eq!(greedy.strategy(), Strategy::Greedy { depth: 1 });

    for seed in 0..5 {
        let a = play_episode(&mut td, &mut placer(seed));
        let b = play_episode(&mut greedy, &mut placer(seed));
        assert_eq!(a.final_board, b.final_board, "seed {}", seed);
        assert_eq!(a.moves, b.moves);
    }
}

#[test]
fn test_learning_updates_per_episode() {
    let mut trainer = slider("seed=5");
    let mut env = placer(6);

    let mut total_moves = 0u64;
    for episode in 1..=3 {
        let result = play_episode(&mut trainer, &mut env);
        total_moves += result.moves as u64;

        let stats = trainer.learner().unwrap().stats();
        // One update per move: the first move only records, the terminal
        // update closes the episode
        assert_eq!(stats.updates, total_moves);
        assert_eq!(stats.terminal_updates, episode);
    }
}

#[test]
fn test_statistics_over_episodes() {
    let mut trainer = slider("strategy=random seed=7");
    let mut env = placer(8);
    let mut stats = TrainingStatistics::new(6, 3);
    let mut summaries = Vec::new();

    while !stats.is_finished() {
        let result = play_episode(&mut trainer, &mut env);
        if let Some(summary) = stats.push(EpisodeRecord::from(&result)) {
            summaries.push(summary);
        }
    }

    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[1].episodes_completed, 6);
    for summary in &summaries {
        assert_eq!(summary.block_size, 3);
        assert!(summary.avg_score <= f64::from(summary.max_score));
        let (_, reached, _) = summary.tile_rates[0];
        assert_eq!(reached, 1.0);
    }
}

#[test]
fn test_pattern_file_argument() {
    let temp_dir = tempdir().unwrap();
    let csv = temp_dir.path().join("tuples.csv");
    fs::write(&csv, "id,cells\nT1,A1 B1 C1\nT2,A1 B2\n").unwrap();

    let agent = slider(&format!("patterns={}", csv.display()));
    let evaluator = agent.evaluator().unwrap();
    assert_eq!(evaluator.patterns().len(), 2);
    assert_eq!(evaluator.network().sizes(), vec![4096, 256]);

    let missing = Slider::new(
        AgentConfig::slider(&format!("patterns={}", temp_dir.path().join("no.csv").display()))
            .unwrap(),
    );
    assert!(matches!(missing, Err(LearningError::Pattern(_))));
}

#[test]
fn test_snapshot_must_fit_patterns() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("small.bin");
    save_network(&path, &WeightNetwork::with_sizes(&[16, 16])).unwrap();

    let result = Slider::new(AgentConfig::slider(&format!("load={}", path.display())).unwrap());
    assert!(matches!(result, Err(LearningError::NetworkMismatch(_))));
}

#[test]
fn test_corrupt_snapshot_is_fatal() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("corrupt.bin");

    let mut network = WeightNetwork::new();
    network.push(WeightTable::from_weights(vec![1.0; 100]));
    save_network(&path, &network).unwrap();
    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() - 2]).unwrap();

    assert!(matches!(
        load_network(&path),
        Err(LearningError::InvalidCheckpoint(_))
    ));
    assert!(Slider::new(AgentConfig::slider(&format!("load={}", path.display())).unwrap()).is_err());
}

#[test]
fn test_unwritable_save_path_is_fatal() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("missing_dir").join("weights.bin");
    let agent = slider(&format!("save={}", path.display()));
    assert!(matches!(agent.shutdown(), Err(LearningError::Io(_))));
}
