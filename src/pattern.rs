//! n-tupleパターン定義と特徴インデックス
//!
//! パターンは盤面のマスを順に並べたもの。各マスのタイルランクを
//! [`RADIX`] 進数として結合した値が、重みテーブル上のインデックスになる。
//!
//! パターン集合は単なる値で、組み込みの集合か
//! [`load_patterns`] で読み込んだCSVファイルから作る。

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::board::{Board, Symmetry, MAX_RANK, NUM_CELLS};

/// 特徴エンコードの基数（[`MAX_RANK`] までの全ランクを表せる）
pub const RADIX: usize = 16;

/// パターンの最大マス数（6-tupleのテーブルは16^6エントリ、64 MiB）
pub const MAX_TUPLE_LEN: usize = 6;

/// パターンごとに評価する対称変換の数
pub const NUM_SYMMETRIES: usize = 8;

const _: () = assert!((MAX_RANK as usize) < RADIX);

/// パターン定義のエラー
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PatternError {
    /// パターンファイルの読み込み失敗
    #[error("Failed to load patterns: {0}")]
    LoadError(String),

    /// 4×4盤面の範囲外のマス
    #[error("Invalid pattern position: {0}")]
    InvalidPosition(u8),

    /// 空、または [`MAX_TUPLE_LEN`] を超えるパターン
    #[error("Invalid pattern length: {0} (expected 1-{max})", max = MAX_TUPLE_LEN)]
    InvalidLength(usize),

    /// 同じマスの重複
    #[error("Duplicate cell {0} in pattern")]
    DuplicateCell(u8),

    /// パターン集合が空
    #[error("Pattern set is empty")]
    Empty,

    /// I/Oエラー
    #[error("I/O error: {0}")]
    IoError(String),

    /// CSV解析エラー
    #[error("CSV parse error: {0}")]
    CsvError(String),
}

/// パターン（特徴タプル）
///
/// 固定長配列で保持し、ヒープ確保のない `Copy` 構造体にする。
/// `symmetric_cells[s]` は対称変換 `Symmetry::ALL[s]` 後の盤面で読むマスを
/// 変換前の盤面のマスで表したもので、評価時に変換後の盤面を作らずに済む。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pattern {
    /// パターンID（集合内の位置）
    pub id: u8,
    /// マス数
    pub k: u8,
    /// エンコード順のマス（先頭 `k` 個が有効）
    pub cells: [u8; MAX_TUPLE_LEN],
    /// 対称変換ごとに事前計算したマス
    pub symmetric_cells: [[u8; MAX_TUPLE_LEN]; NUM_SYMMETRIES],
}

/// パターンファイルのCSV行
#[derive(Debug, Deserialize)]
struct PatternCsv {
    id: String,
    cells: String,
}

impl Pattern {
    /// マスのリストからパターンを作成
    ///
    /// # Errors
    ///
    /// - `PatternError::InvalidLength` - 空、または長すぎるパターン
    /// - `PatternError::InvalidPosition` - 0-15の範囲外のマス
    /// - `PatternError::DuplicateCell` - 同じマスが2回現れる
    ///
    /// # Examples
    ///
    /// ```
    /// use threes_td::pattern::Pattern;
    ///
    /// let pattern = Pattern::new(0, &[0, 1, 2, 3]).unwrap();
    /// assert_eq!(pattern.table_size(), 65536);
    /// assert!(Pattern::new(1, &[0, 16]).is_err());
    /// ```
    pub fn new(id: u8, cells: &[u8]) -> Result<Self, PatternError> {
        if cells.is_empty() || cells.len() > MAX_TUPLE_LEN {
            return Err(PatternError::InvalidLength(cells.len()));
        }
        for (i, &cell) in cells.iter().enumerate() {
            if cell as usize >= NUM_CELLS {
                return Err(PatternError::InvalidPosition(cell));
            }
            if cells[..i].contains(&cell) {
                return Err(PatternError::DuplicateCell(cell));
            }
        }

        Ok(Self::build(id, cells))
    }

    /// 検証済みのマスからパターンを組み立てる
    fn build(id: u8, cells: &[u8]) -> Self {
        let mut cell_array = [0u8; MAX_TUPLE_LEN];
        cell_array[..cells.len()].copy_from_slice(cells);

        let mut symmetric_cells = [[0u8; MAX_TUPLE_LEN]; NUM_SYMMETRIES];
        for (slot, symmetry) in symmetric_cells.iter_mut().zip(Symmetry::ALL) {
            for (i, &cell) in cells.iter().enumerate() {
                slot[i] = symmetry.source_cell(cell as usize) as u8;
            }
        }

        Self {
            id,
            k: cells.len() as u8,
            cells: cell_array,
            symmetric_cells,
        }
    }

    /// エンコード順の有効なマス
    #[inline]
    pub fn cells(&self) -> &[u8] {
        &self.cells[..self.k as usize]
    }

    /// パターンに必要な重みエントリ数（RADIX^k）
    #[inline]
    pub fn table_size(&self) -> usize {
        RADIX.pow(self.k as u32)
    }
}

#[inline]
fn encode(board: &Board, cells: &[u8]) -> usize {
    let mut index = 0usize;
    for &cell in cells {
        let rank = board.cell(cell as usize) as usize;
        assert!(rank < RADIX, "tile rank {} exceeds feature radix", rank);
        index = index * RADIX + rank;
    }
    index
}

/// `board` 上の `pattern` の混合基数インデックス
///
/// パターンの順にマスを読む: `index = index * RADIX + rank`
///
/// # Examples
///
/// ```
/// use threes_td::board::Board;
/// use threes_td::pattern::{feature_index, Pattern};
///
/// let mut cells = [0u8; 16];
/// cells[0] = 1;
/// cells[1] = 2;
/// let board = Board::from_cells(cells);
/// let pattern = Pattern::new(0, &[0, 1, 2]).unwrap();
///
/// assert_eq!(feature_index(&board, &pattern), 1 * 256 + 2 * 16);
/// ```
#[inline]
pub fn feature_index(board: &Board, pattern: &Pattern) -> usize {
    encode(board, pattern.cells())
}

/// [`Symmetry::ALL`] の `symmetry` 番目による `board` の像での `pattern` のインデックス
///
/// 事前計算したマスを通して読むため、
/// `feature_index(&transform(board, Symmetry::ALL[symmetry]), pattern)` と等しい。
#[inline]
pub fn symmetric_feature_index(board: &Board, pattern: &Pattern, symmetry: usize) -> usize {
    encode(board, &pattern.symmetric_cells[symmetry][..pattern.k as usize])
}

/// 組み込み集合: 4行と4列の4-tuple
pub fn row_and_column_patterns() -> Vec<Pattern> {
    const TUPLES: [[u8; 4]; 8] = [
        [0, 1, 2, 3],
        [4, 5, 6, 7],
        [8, 9, 10, 11],
        [12, 13, 14, 15],
        [0, 4, 8, 12],
        [1, 5, 9, 13],
        [2, 6, 10, 14],
        [3, 7, 11, 15],
    ];
    build_set(&TUPLES)
}

/// 組み込み集合: 2048のn-tupleネットワークで定番の6-tuple 4つ
pub fn six_tuple_patterns() -> Vec<Pattern> {
    const TUPLES: [[u8; 6]; 4] = [
        [0, 1, 2, 3, 4, 5],
        [4, 5, 6, 7, 8, 9],
        [0, 1, 2, 4, 5, 6],
        [4, 5, 6, 8, 9, 10],
    ];
    build_set(&TUPLES)
}

fn build_set<const N: usize>(tuples: &[[u8; N]]) -> Vec<Pattern> {
    tuples
        .iter()
        .enumerate()
        .map(|(id, cells)| Pattern::build(id as u8, cells))
        .collect()
}

/// 座標文字列（"A1"-"D4"）をマス番号に変換
///
/// 列A-D、行1-4。A1 = 0, D1 = 3, A4 = 12, D4 = 15
///
/// # Examples
///
/// ```
/// use threes_td::pattern::coord_to_cell;
///
/// assert_eq!(coord_to_cell("A1").unwrap(), 0);
/// assert_eq!(coord_to_cell("c2").unwrap(), 6);
/// assert_eq!(coord_to_cell("D4").unwrap(), 15);
/// ```
pub fn coord_to_cell(coord: &str) -> Result<u8, PatternError> {
    let coord = coord.trim();
    let bytes = coord.as_bytes();
    if bytes.len() != 2 {
        return Err(PatternError::LoadError(format!(
            "Invalid coordinate format: {}",
            coord
        )));
    }

    let col = match bytes[0] {
        b'A'..=b'D' => bytes[0] - b'A',
        b'a'..=b'd' => bytes[0] - b'a',
        other => {
            return Err(PatternError::LoadError(format!(
                "Invalid column: {}",
                other as char
            )))
        }
    };
    let row = match bytes[1] {
        b'1'..=b'4' => bytes[1] - b'1',
        other => {
            return Err(PatternError::LoadError(format!(
                "Invalid row: {}",
                other as char
            )))
        }
    };

    Ok(row * 4 + col)
}

/// CSVファイルからパターン集合を読み込む
///
/// # CSVフォーマット
///
/// ```csv
/// id,cells
/// T01,A1 B1 C1 D1
/// T02,A2 B2 C2 D2
/// ```
///
/// パターンはファイルの順序を保ち、IDはその順に0..nを振り直す。
///
/// # Errors
///
/// - `PatternError::IoError` - ファイルが存在しない
/// - `PatternError::CsvError` - 不正な行
/// - `PatternError::Empty` - パターンが1つもない
/// - [`coord_to_cell`] または [`Pattern::new`] のエラー
pub fn load_patterns<P: AsRef<Path>>(path: P) -> Result<Vec<Pattern>, PatternError> {
    let path_ref = path.as_ref();
    if !path_ref.exists() {
        return Err(PatternError::IoError(format!(
            "File not found: {}",
            path_ref.display()
        )));
    }

    let mut reader = csv::Reader::from_path(path_ref)
        .map_err(|e| PatternError::CsvError(format!("Failed to open CSV: {}", e)))?;

    let mut patterns = Vec::new();
    for (idx, result) in reader.deserialize().enumerate() {
        let record: PatternCsv = result.map_err(|e| {
            PatternError::CsvError(format!("Failed to parse CSV at line {}: {}", idx + 2, e))
        })?;

        let cells = record
            .cells
            .split_whitespace()
            .map(coord_to_cell)
            .collect::<Result<Vec<u8>, PatternError>>()?;

        let id = u8::try_from(patterns.len()).map_err(|_| {
            PatternError::LoadError(format!("Too many patterns at {}", record.id))
        })?;
        patterns.push(Pattern::new(id, &cells)?);
    }

    if patterns.is_empty() {
        return Err(PatternError::Empty);
    }
    log::debug!(
        "Loaded {} patterns from {}",
        patterns.len(),
        path_ref.display()
    );

    Ok(patterns)
}
