//! 行動選択モジュール
//!
//! 1手先の評価（報酬 + 事後盤面の評価値）による方向選択と、
//! タイル配置に対する1段のexpectimaxボーナス、貪欲法の先読みを実装する。

use crate::board::{Board, Direction, PlacementRegion, Reward};
use crate::evaluator::Evaluator;

/// 1方向の評価結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveEvaluation {
    /// スライド方向
    pub direction: Direction,
    /// スライドで得た報酬
    pub reward: Reward,
    /// スライド後の盤面（事後状態）
    pub after: Board,
    /// 報酬 + 評価値（+ expectimaxボーナス）
    pub score: f32,
}

/// TD戦略の行動選択器
///
/// 評価関数への参照は呼び出しごとに受け取る。選択器自身は
/// expectimaxの有効・無効のみを保持する。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionSelector {
    expectimax: bool,
}

impl ActionSelector {
    /// 新しい選択器を作成
    ///
    /// # Arguments
    ///
    /// * `expectimax` - trueならexpectimaxボーナスをスコアに加算する
    pub fn new(expectimax: bool) -> Self {
        Self { expectimax }
    }

    /// expectimaxボーナスが有効か
    #[inline]
    pub fn expectimax(&self) -> bool {
        self.expectimax
    }

    /// 最善手の評価結果を返す
    ///
    /// Up, Right, Down, Leftの順に盤面のコピー上でスライドを試し、
    /// 不正手をスキップして `reward + V(after) [+ bonus]` が最大の方向を選ぶ。
    /// 同点の場合は先に評価した方向を残す。
    ///
    /// # Returns
    ///
    /// 合法手がなければNone
    pub fn best_move(&self, evaluator: &Evaluator, board: &Board) -> Option<MoveEvaluation> {
        let mut best: Option<MoveEvaluation> = None;

        for direction in Direction::ALL {
            let mut after = *board;
            let Some(reward) = after.slide(direction) else {
                continue;
            };

            let mut score = reward as f32 + evaluator.evaluate(&after);
            if self.expectimax {
                score += expectimax_bonus(evaluator, &after, direction);
            }

            // 厳密に大きい場合のみ更新（同点は先勝ち）
            if best.is_none_or(|b| score > b.score) {
                best = Some(MoveEvaluation {
                    direction,
                    reward,
                    after,
                    score,
                });
            }
        }

        best
    }

    /// 最善の方向を返す
    ///
    /// # Examples
    ///
    /// ```
    /// use threes_td::board::{Board, Direction};
    /// use threes_td::evaluator::Evaluator;
    /// use threes_td::pattern::row_and_column_patterns;
    /// use threes_td::search::ActionSelector;
    ///
    /// let evaluator = Evaluator::new(row_and_column_patterns());
    /// let mut cells = [0u8; 16];
    /// cells[0] = 3;
    /// cells[1] = 3;
    /// let board = Board::from_cells(cells);
    ///
    /// let selector = ActionSelector::new(false);
    /// assert_eq!(selector.select_action(&evaluator, &board), Some(Direction::Left));
    /// ```
    pub fn select_action(&self, evaluator: &Evaluator, board: &Board) -> Option<Direction> {
        self.best_move(evaluator, board).map(|m| m.direction)
    }
}

/// タイル配置に対する1段のexpectimaxボーナス
///
/// 直前のスライドと反対側の辺の空きマスそれぞれにヒントタイルを置き、
/// 続く4方向のうち最良の `reward + V(next)` を求めて平均する。
/// 後続の合法手がない候補は平均から除外する。
///
/// # Arguments
///
/// * `evaluator` - 評価関数
/// * `after` - スライド後の盤面
/// * `direction` - 直前のスライド方向
///
/// # Returns
///
/// 評価できた候補の平均。候補がない、またはヒントが不明なら0.0
pub fn expectimax_bonus(evaluator: &Evaluator, after: &Board, direction: Direction) -> f32 {
    let Some(tile) = after.hint() else {
        return 0.0;
    };

    let mut total = 0.0f32;
    let mut evaluated = 0usize;

    for &cell in PlacementRegion::after_slide(direction).cells() {
        if after.cell(cell) != 0 {
            continue;
        }

        let mut placed = *after;
        if placed.place(cell, tile, None).is_none() {
            continue;
        }

        let best = Direction::ALL
            .iter()
            .filter_map(|&next_dir| {
                let mut next = placed;
                next.slide(next_dir)
                    .map(|reward| reward as f32 + evaluator.evaluate(&next))
            })
            .fold(None, |acc: Option<f32>, v| Some(acc.map_or(v, |a| a.max(v))));

        if let Some(value) = best {
            total += value;
            evaluated += 1;
        }
    }

    if evaluated == 0 {
        0.0
    } else {
        total / evaluated as f32
    }
}

/// 貪欲法による方向選択
///
/// `depth` 手先（1-3）までのスライド報酬の合計が最大になる最初の方向を選ぶ。
/// 途中で合法手がなくなった系列はそこで打ち切る。
///
/// # Returns
///
/// 合法手がなければNone
pub fn greedy_action(board: &Board, depth: usize) -> Option<Direction> {
    let mut best: Option<(Direction, Reward)> = None;

    for direction in Direction::ALL {
        let mut after = *board;
        let Some(reward) = after.slide(direction) else {
            continue;
        };
        let total = reward + greedy_value(&after, depth.saturating_sub(1));

        if best.is_none_or(|(_, r)| total > r) {
            best = Some((direction, total));
        }
    }

    best.map(|(direction, _)| direction)
}

/// 残り `depth` 手で得られる報酬合計の最大値
///
/// 合法なスライドの直後は逆方向のスライドが必ず合法なので、先読みの途中で
/// 手詰まりになることはない。合法手のない盤面を直接渡した場合のみ0を返す。
fn greedy_value(board: &Board, depth: usize) -> Reward {
    if depth == 0 {
        return 0;
    }

    Direction::ALL
        .iter()
        .filter_map(|&direction| {
            let mut after = *board;
            after
                .slide(direction)
                .map(|reward| reward + greedy_value(&after, depth - 1))
        })
        .max()
        .unwrap_or(0)
}
