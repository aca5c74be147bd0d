//! エピソード実行モジュール
//!
//! スライダー（プレイヤー）とプレーサー（環境）を交互に動かし、
//! 1エピソードを最後までプレイする。
//!
//! # 概要
//!
//! - 初期配置: プレーサーが `INITIAL_PLACEMENTS` 枚のタイルを置く
//! - 以降: スライダーのスライドとプレーサーの配置を交互に繰り返す
//! - 終了: スライダーが `Action::None` を返した時点（TD学習の終端更新もここで行われる）

use std::time::{Duration, Instant};

use crate::agent::{Action, Agent};
use crate::board::{Board, Reward};

/// エピソード開始時に置くタイル数
pub const INITIAL_PLACEMENTS: usize = 9;

/// エピソード結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodeResult {
    /// 最終盤面のスコア
    pub score: Reward,
    /// スライド報酬の合計
    pub total_reward: Reward,
    /// 最終盤面の最大ランク
    pub max_rank: u8,
    /// スライド回数
    pub moves: usize,
    /// 配置回数（初期配置を含む）
    pub placements: usize,
    /// 経過時間
    pub elapsed: Duration,
    /// 最終盤面
    pub final_board: Board,
}

/// 1エピソードをプレイする
///
/// # Arguments
///
/// * `slider` - スライド方向を選ぶエージェント
/// * `placer` - タイルを置く環境エージェント
///
/// # Returns
///
/// エピソード結果
///
/// # Examples
///
/// ```
/// use threes_td::agent::{RandomPlacer, Slider};
/// use threes_td::config::AgentConfig;
/// use threes_td::learning::play_episode;
///
/// let mut slider = Slider::new(AgentConfig::slider("strategy=greedy").unwrap()).unwrap();
/// let mut placer = RandomPlacer::new(AgentConfig::placer("seed=1").unwrap());
///
/// let result = play_episode(&mut slider, &mut placer);
/// assert_eq!(result.score, result.final_board.score());
/// ```
pub fn play_episode<S, P>(slider: &mut S, placer: &mut P) -> EpisodeResult
where
    S: Agent + ?Sized,
    P: Agent + ?Sized,
{
    let start_time = Instant::now();
    let mut board = Board::new();
    let mut moves = 0;
    let mut placements = 0;
    let mut total_reward: Reward = 0;

    slider.open_episode();
    placer.open_episode();

    // 初期配置
    let mut running = true;
    for _ in 0..INITIAL_PLACEMENTS {
        if !apply_action(placer, &mut board) {
            running = false;
            break;
        }
        placements += 1;
    }

    while running {
        let action = slider.take_action(&board);
        match action.apply(&mut board) {
            Some(reward) => {
                total_reward += reward;
                moves += 1;
            }
            None => {
                // Action::None以外は不正手
                if action != Action::None {
                    log::warn!("{}: illegal action {}", slider.name(), action);
                }
                break;
            }
        }

        if !apply_action(placer, &mut board) {
            break;
        }
        placements += 1;
    }

    slider.close_episode();
    placer.close_episode();

    let result = EpisodeResult {
        score: board.score(),
        total_reward,
        max_rank: board.max_rank(),
        moves,
        placements,
        elapsed: start_time.elapsed(),
        final_board: board,
    };
    log::debug!(
        "episode finished: score {}, max rank {}, {} moves",
        result.score,
        result.max_rank,
        result.moves
    );
    result
}

/// 配置アクションを適用し、成功したかを返す
fn apply_action<P: Agent + ?Sized>(placer: &mut P, board: &mut Board) -> bool {
    let action = placer.take_action(board);
    if action.apply(board).is_some() {
        return true;
    }
    if action != Action::None {
        log::warn!("{}: illegal action {}", placer.name(), action);
    }
    false
}
