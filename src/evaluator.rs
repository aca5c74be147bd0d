//! 重みテーブル管理とn-tuple評価関数
//!
//! パターンごとに特徴インデックスで引く密な重みテーブルを1つ持つ。
//! 盤面の評価値は、8つの対称像それぞれで各パターンが選ぶエントリの合計。
//! 学習はそれと全く同じエントリに加算する。

use crate::board::Board;
use crate::learning::LearningError;
use crate::pattern::{symmetric_feature_index, Pattern, NUM_SYMMETRIES};

/// 1パターン分の密な重みテーブル
#[derive(Clone, Debug, PartialEq)]
pub struct WeightTable {
    weights: Box<[f32]>,
}

impl WeightTable {
    /// `size` 個の0で初期化したテーブル
    pub fn new(size: usize) -> Self {
        Self {
            weights: vec![0.0f32; size].into_boxed_slice(),
        }
    }

    /// 与えた重みを持つテーブル
    pub fn from_weights(weights: Vec<f32>) -> Self {
        Self {
            weights: weights.into_boxed_slice(),
        }
    }

    /// エントリ数
    #[inline]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// `index` の重み
    ///
    /// # Panics
    ///
    /// `index` が範囲外の場合
    #[inline]
    pub fn get(&self, index: usize) -> f32 {
        self.weights[index]
    }

    /// `index` の重みを上書き
    #[inline]
    pub fn set(&mut self, index: usize, value: f32) {
        self.weights[index] = value;
    }

    /// `index` の重みに `delta` を加算
    #[inline]
    pub fn add(&mut self, index: usize, delta: f32) {
        self.weights[index] += delta;
    }

    /// インデックス順の全重み
    pub fn as_slice(&self) -> &[f32] {
        &self.weights
    }
}

/// パターンごとに1つずつ並べた重みテーブル列
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WeightNetwork {
    tables: Vec<WeightTable>,
}

impl WeightNetwork {
    /// テーブルを持たないネットワーク
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定サイズの0初期化テーブル
    ///
    /// # Examples
    ///
    /// ```
    /// use threes_td::evaluator::WeightNetwork;
    ///
    /// let network = WeightNetwork::with_sizes(&[65536, 65536]);
    /// assert_eq!(network.len(), 2);
    /// assert_eq!(network.sizes(), vec![65536, 65536]);
    /// ```
    pub fn with_sizes(sizes: &[usize]) -> Self {
        Self {
            tables: sizes.iter().map(|&size| WeightTable::new(size)).collect(),
        }
    }

    /// `patterns` に合わせたサイズの0初期化テーブル
    pub fn for_patterns(patterns: &[Pattern]) -> Self {
        Self {
            tables: patterns
                .iter()
                .map(|pattern| WeightTable::new(pattern.table_size()))
                .collect(),
        }
    }

    /// テーブルを追加
    pub fn push(&mut self, table: WeightTable) {
        self.tables.push(table);
    }

    /// テーブル数
    #[inline]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    #[inline]
    pub fn tables(&self) -> &[WeightTable] {
        &self.tables
    }

    #[inline]
    pub fn table(&self, id: usize) -> &WeightTable {
        &self.tables[id]
    }

    #[inline]
    pub fn table_mut(&mut self, id: usize) -> &mut WeightTable {
        &mut self.tables[id]
    }

    /// 各テーブルのエントリ数
    pub fn sizes(&self) -> Vec<usize> {
        self.tables.iter().map(WeightTable::len).collect()
    }

    /// 重みのメモリ使用量（バイト）
    pub fn memory_usage(&self) -> usize {
        self.tables
            .iter()
            .map(|table| table.len() * std::mem::size_of::<f32>())
            .sum()
    }
}

/// n-tuple評価関数
///
/// パターン集合と、それが引く重みネットワークを所有する。
///
/// # Examples
///
/// ```
/// use threes_td::board::Board;
/// use threes_td::evaluator::Evaluator;
/// use threes_td::pattern::row_and_column_patterns;
///
/// let evaluator = Evaluator::new(row_and_column_patterns());
/// assert_eq!(evaluator.evaluate(&Board::new()), 0.0);
/// ```
#[derive(Clone, Debug)]
pub struct Evaluator {
    patterns: Vec<Pattern>,
    network: WeightNetwork,
}

impl Evaluator {
    /// `patterns` に合わせた0初期化ネットワークで評価関数を作成
    pub fn new(patterns: Vec<Pattern>) -> Self {
        let network = WeightNetwork::for_patterns(&patterns);
        Self { patterns, network }
    }

    /// 既存のネットワークから評価関数を作成
    ///
    /// # Errors
    ///
    /// テーブル数がパターン数と一致しない、またはテーブルが
    /// パターンの特徴インデックスを収められない場合は
    /// `LearningError::NetworkMismatch`
    pub fn with_network(
        patterns: Vec<Pattern>,
        network: WeightNetwork,
    ) -> Result<Self, LearningError> {
        if network.len() != patterns.len() {
            return Err(LearningError::NetworkMismatch(format!(
                "{} tables for {} patterns",
                network.len(),
                patterns.len()
            )));
        }
        for (pattern, table) in patterns.iter().zip(network.tables()) {
            if table.len() < pattern.table_size() {
                return Err(LearningError::NetworkMismatch(format!(
                    "table {} has {} entries, pattern {:?} needs {}",
                    pattern.id,
                    table.len(),
                    pattern.cells(),
                    pattern.table_size()
                )));
            }
        }
        Ok(Self { patterns, network })
    }

    /// `board` の評価値
    ///
    /// 8つの対称変換と全パターンについて、選ばれた重みを合計する。
    pub fn evaluate(&self, board: &Board) -> f32 {
        let mut sum = 0.0f32;
        for symmetry in 0..NUM_SYMMETRIES {
            for (pattern, table) in self.patterns.iter().zip(self.network.tables()) {
                sum += table.get(symmetric_feature_index(board, pattern, symmetry));
            }
        }
        sum
    }

    /// [`Evaluator::evaluate`] が `board` について合計する全ての重みに `amount` を加算
    pub fn adjust(&mut self, board: &Board, amount: f32) {
        for symmetry in 0..NUM_SYMMETRIES {
            for (pattern_id, pattern) in self.patterns.iter().enumerate() {
                let index = symmetric_feature_index(board, pattern, symmetry);
                self.network.table_mut(pattern_id).add(index, amount);
            }
        }
    }

    #[inline]
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    #[inline]
    pub fn network(&self) -> &WeightNetwork {
        &self.network
    }

    #[inline]
    pub fn network_mut(&mut self) -> &mut WeightNetwork {
        &mut self.network
    }

    /// パターンを手放し、ネットワークを返す
    pub fn into_network(self) -> WeightNetwork {
        self.network
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{transform, Symmetry};
    use crate::pattern::{row_and_column_patterns, Pattern};

    fn distinct_board() -> Board {
        Board::from_cells([1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 0])
    }

    // ========== WeightTable / WeightNetwork ==========

    #[test]
    fn test_weight_table_basics() {
        let mut table = WeightTable::new(4);
        assert_eq!(table.len(), 4);
        assert!(!table.is_empty());
        assert_eq!(table.as_slice(), &[0.0; 4]);

        table.set(1, 2.5);
        table.add(1, 0.5);
        table.add(3, -1.0);
        assert_eq!(table.get(1), 3.0);
        assert_eq!(table.get(3), -1.0);
    }

    #[test]
    fn test_network_sizes_and_memory() {
        let network = WeightNetwork::with_sizes(&[16, 256]);
        assert_eq!(network.len(), 2);
        assert_eq!(network.sizes(), vec![16, 256]);
        assert_eq!(network.memory_usage(), (16 + 256) * 4);
        assert!(WeightNetwork::new().is_empty());
    }

    #[test]
    fn test_network_for_patterns() {
        let patterns = row_and_column_patterns();
        let network = WeightNetwork::for_patterns(&patterns);
        assert_eq!(network.sizes(), vec![65536; 8]);
    }

    // ========== 評価関数の生成 ==========

    #[test]
    fn test_with_network_rejects_wrong_count() {
        let patterns = row_and_column_patterns();
        let network = WeightNetwork::with_sizes(&[65536; 7]);
        assert!(matches!(
            Evaluator::with_network(patterns, network),
            Err(LearningError::NetworkMismatch(_))
        ));
    }

    #[test]
    fn test_with_network_rejects_small_table() {
        let patterns = vec![Pattern::new(0, &[0, 1, 2]).unwrap()];
        let network = WeightNetwork::with_sizes(&[4095]);
        assert!(Evaluator::with_network(patterns.clone(), network).is_err());

        // 大きすぎるテーブルは受け入れる
        let network = WeightNetwork::with_sizes(&[65536]);
        assert!(Evaluator::with_network(patterns, network).is_ok());
    }

    // ========== 評価 ==========

    #[test]
    fn test_zero_network_evaluates_to_zero() {
        let evaluator = Evaluator::new(row_and_column_patterns());
        assert_eq!(evaluator.evaluate(&Board::new()), 0.0);
        assert_eq!(evaluator.evaluate(&distinct_board()), 0.0);
    }

    #[test]
    fn test_adjust_distinct_entries_scales_by_eight() {
        // 全マスが異なる盤面では、辺の4-tupleは8通りの異なる辺を読む。
        // 対称変換ごとに別々のエントリに当たる
        let patterns = vec![Pattern::new(0, &[0, 1, 2, 3]).unwrap()];
        let mut evaluator = Evaluator::new(patterns);
        let board = distinct_board();

        evaluator.adjust(&board, 0.25);
        assert_eq!(evaluator.evaluate(&board), 8.0 * 0.25);

        let touched = evaluator
            .network()
            .table(0)
            .as_slice()
            .iter()
            .filter(|&&w| w != 0.0)
            .count();
        assert_eq!(touched, 8);
    }

    #[test]
    fn test_adjust_colliding_entries() {
        // 空の盤面ではどの対称変換もインデックス0を選ぶ
        let patterns = vec![Pattern::new(0, &[0, 1, 2, 3]).unwrap()];
        let mut evaluator = Evaluator::new(patterns);
        let board = Board::new();

        evaluator.adjust(&board, 0.5);
        assert_eq!(evaluator.network().table(0).get(0), 8.0 * 0.5);
        assert_eq!(evaluator.evaluate(&board), 8.0 * 8.0 * 0.5);
    }

    #[test]
    fn test_value_is_symmetry_invariant() {
        let mut evaluator = Evaluator::new(row_and_column_patterns());
        let board = distinct_board();
        let other = Board::from_cells([3, 3, 1, 2, 0, 4, 0, 1, 5, 0, 2, 0, 1, 0, 0, 6]);
        evaluator.adjust(&board, 1.0);
        evaluator.adjust(&other, -0.5);

        for target in [board, other] {
            let reference = evaluator.evaluate(&target);
            for symmetry in Symmetry::ALL {
                let image = transform(&target, symmetry);
                assert!(
                    (evaluator.evaluate(&image) - reference).abs() < 1e-4,
                    "value changed under {:?}",
                    symmetry
                );
            }
        }
    }

    #[test]
    fn test_into_network_keeps_weights() {
        let mut evaluator = Evaluator::new(vec![Pattern::new(0, &[5]).unwrap()]);
        evaluator.adjust(&Board::new(), 1.0);
        let network = evaluator.into_network();
        assert_eq!(network.table(0).get(0), 8.0);
    }
}
