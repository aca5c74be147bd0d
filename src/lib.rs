//! threes-td - Threes!のn-tupleネットワークTD学習エージェント
//!
//! 盤面表現、パターン特徴量（8対称展開）、1手評価 + expectimaxによる行動選択、
//! TD(0)によるオンライン学習、重みの保存と読み込み

pub mod agent;
pub mod board;
pub mod config;
pub mod evaluator;
pub mod learning;
pub mod pattern;
pub mod search;
