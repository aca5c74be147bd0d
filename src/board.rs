//! Threes!盤面表現
//!
//! 4×4のタイルランクに加えて、環境がタイルを置くために必要な情報
//! （直前のスライド方向、タイルの袋、次のタイルのヒント）を保持する。
//!
//! # タイルランク
//!
//! | ランク | タイルの値 |
//! |--------|------------|
//! | 0 | 空 |
//! | 1 | 1 |
//! | 2 | 2 |
//! | r ≥ 3 | 3·2^(r-3) |
//!
//! マスは行優先で番号付けする: A1=0, B1=1, ..., D4=15

use std::fmt;

/// 盤面の一辺
pub const BOARD_SIZE: usize = 4;

/// マス数
pub const NUM_CELLS: usize = BOARD_SIZE * BOARD_SIZE;

/// 盤面に置ける最大ランク（3·2^12 = 12288）
///
/// このランク同士は合成しないため、全マスの値は
/// [`crate::pattern::RADIX`] 未満に収まる。
pub const MAX_RANK: u8 = 15;

/// スライド・配置で得られる報酬
pub type Reward = u32;

/// スライド方向
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Direction {
    Up = 0,
    Right = 1,
    Down = 2,
    Left = 3,
}

impl Direction {
    /// 選択順に並べた全方向
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    /// 方向のオペコード（0-3）
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Up => "up",
            Direction::Right => "right",
            Direction::Down => "down",
            Direction::Left => "left",
        };
        f.write_str(name)
    }
}

/// 環境が次のタイルを置けるマスの集合
///
/// スライド後、新しいタイルは移動方向と反対側の辺から入る。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlacementRegion {
    BottomRow,
    LeftColumn,
    TopRow,
    RightColumn,
    /// エピソード最初のスライド前
    Anywhere,
}

const BOTTOM_ROW: [usize; 4] = [12, 13, 14, 15];
const LEFT_COLUMN: [usize; 4] = [0, 4, 8, 12];
const TOP_ROW: [usize; 4] = [0, 1, 2, 3];
const RIGHT_COLUMN: [usize; 4] = [3, 7, 11, 15];
const ALL_CELLS: [usize; NUM_CELLS] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15];

impl PlacementRegion {
    /// `direction` へのスライドで空く領域
    #[inline]
    pub fn after_slide(direction: Direction) -> Self {
        match direction {
            Direction::Up => PlacementRegion::BottomRow,
            Direction::Right => PlacementRegion::LeftColumn,
            Direction::Down => PlacementRegion::TopRow,
            Direction::Left => PlacementRegion::RightColumn,
        }
    }

    /// 領域ID（0-4）
    ///
    /// 0-3はその領域を空けたスライドのオペコードと一致する。
    #[inline]
    pub fn index(self) -> usize {
        match self {
            PlacementRegion::BottomRow => 0,
            PlacementRegion::LeftColumn => 1,
            PlacementRegion::TopRow => 2,
            PlacementRegion::RightColumn => 3,
            PlacementRegion::Anywhere => 4,
        }
    }

    /// 領域に含まれるマス
    #[inline]
    pub fn cells(self) -> &'static [usize] {
        match self {
            PlacementRegion::BottomRow => &BOTTOM_ROW,
            PlacementRegion::LeftColumn => &LEFT_COLUMN,
            PlacementRegion::TopRow => &TOP_ROW,
            PlacementRegion::RightColumn => &RIGHT_COLUMN,
            PlacementRegion::Anywhere => &ALL_CELLS,
        }
    }
}

/// 盤面の8つの対称変換の1つ
///
/// 水平反転（任意）の後に時計回り `rotation × 90°` の回転を適用する。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Symmetry {
    rotation: u8,
    mirrored: bool,
}

impl Symmetry {
    /// 対称変換群を固定の列挙順で並べたもの
    ///
    /// 評価と学習はどちらもこの配列を走査するため、
    /// 盤面の評価で合計するエントリと更新するエントリは完全に一致する。
    pub const ALL: [Symmetry; 8] = [
        Symmetry::new(0, false),
        Symmetry::new(1, false),
        Symmetry::new(2, false),
        Symmetry::new(3, false),
        Symmetry::new(0, true),
        Symmetry::new(1, true),
        Symmetry::new(2, true),
        Symmetry::new(3, true),
    ];

    /// 対称変換を作成（`rotation` は4を法とする）
    pub const fn new(rotation: u8, mirrored: bool) -> Self {
        Self {
            rotation: rotation % 4,
            mirrored,
        }
    }

    /// 変換後の `cell` に移るタイルの、元の盤面でのマス
    ///
    /// # Examples
    ///
    /// ```
    /// use threes_td::board::Symmetry;
    ///
    /// // 時計回り90°でA1のタイルはD1へ移る
    /// assert_eq!(Symmetry::new(1, false).source_cell(3), 0);
    /// // A1の鏡像はD1
    /// assert_eq!(Symmetry::new(0, true).source_cell(0), 3);
    /// ```
    #[inline]
    pub fn source_cell(self, cell: usize) -> usize {
        let mut row = cell / BOARD_SIZE;
        let mut col = cell % BOARD_SIZE;
        for _ in 0..self.rotation {
            let source_row = BOARD_SIZE - 1 - col;
            col = row;
            row = source_row;
        }
        if self.mirrored {
            col = BOARD_SIZE - 1 - col;
        }
        row * BOARD_SIZE + col
    }
}

/// `symmetry` による `board` の像を返す
///
/// 動くのはタイルのみ。袋、ヒント、配置領域はそのままコピーする。
///
/// # Examples
///
/// ```
/// use threes_td::board::{transform, Board, Symmetry};
///
/// let mut cells = [0u8; 16];
/// cells[0] = 3;
/// let board = Board::from_cells(cells);
///
/// let turned = transform(&board, Symmetry::new(1, false));
/// assert_eq!(turned.cell(3), 3);
/// assert_eq!(turned.cell(0), 0);
/// ```
pub fn transform(board: &Board, symmetry: Symmetry) -> Board {
    let mut out = *board;
    for (cell, slot) in out.cells.iter_mut().enumerate() {
        *slot = board.cells[symmetry.source_cell(cell)];
    }
    out
}

/// 各ラインのマス（タイルが寄る辺から順に並べる）
const SLIDE_LINES: [[[usize; 4]; 4]; 4] = [
    // up
    [[0, 4, 8, 12], [1, 5, 9, 13], [2, 6, 10, 14], [3, 7, 11, 15]],
    // right
    [[3, 2, 1, 0], [7, 6, 5, 4], [11, 10, 9, 8], [15, 14, 13, 12]],
    // down
    [[12, 8, 4, 0], [13, 9, 5, 1], [14, 10, 6, 2], [15, 11, 7, 3]],
    // left
    [[0, 1, 2, 3], [4, 5, 6, 7], [8, 9, 10, 11], [12, 13, 14, 15]],
];

/// 補充直後の袋に入る基本タイル（1, 2, 3）の枚数
const BAG_FILL: u8 = 1;

/// Threes!の盤面
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Board {
    cells: [u8; NUM_CELLS],
    /// 袋に残る基本タイル数（ランクで添字付け、0番は未使用）
    bag: [u8; 4],
    hint: Option<u8>,
    last: PlacementRegion,
}

impl Board {
    /// 空の盤面（袋は満杯、ヒントなし）
    pub fn new() -> Self {
        Self {
            cells: [0; NUM_CELLS],
            bag: [0, BAG_FILL, BAG_FILL, BAG_FILL],
            hint: None,
            last: PlacementRegion::Anywhere,
        }
    }

    /// 指定したタイルランクを持つ盤面（それ以外は初期状態）
    ///
    /// # Panics
    ///
    /// ランクが [`MAX_RANK`] を超える場合
    pub fn from_cells(cells: [u8; NUM_CELLS]) -> Self {
        assert!(
            cells.iter().all(|&rank| rank <= MAX_RANK),
            "tile rank must be at most {}",
            MAX_RANK
        );
        Self {
            cells,
            ..Self::new()
        }
    }

    /// `cell` のタイルランク
    #[inline]
    pub fn cell(&self, cell: usize) -> u8 {
        self.cells[cell]
    }

    /// 行優先の全タイルランク
    #[inline]
    pub fn cells(&self) -> &[u8; NUM_CELLS] {
        &self.cells
    }

    /// 空きマス数
    pub fn empty_cells(&self) -> usize {
        self.cells.iter().filter(|&&rank| rank == 0).count()
    }

    /// 盤面上の最大ランク
    pub fn max_rank(&self) -> u8 {
        self.cells.iter().copied().max().unwrap_or(0)
    }

    /// 次のタイルを置ける領域
    #[inline]
    pub fn last_region(&self) -> PlacementRegion {
        self.last
    }

    /// 袋に残る基本タイル `tile`（1-3）の枚数
    pub fn bag_count(&self, tile: u8) -> usize {
        match tile {
            1..=3 => self.bag[tile as usize] as usize,
            _ => 0,
        }
    }

    /// 次に置かれるタイルのヒント
    #[inline]
    pub fn hint(&self) -> Option<u8> {
        self.hint
    }

    /// 盤面スコア: ランクr ≥ 3のタイルはそれぞれ3^(r-2)点
    pub fn score(&self) -> Reward {
        self.cells.iter().map(|&rank| tile_score(rank)).sum()
    }

    /// 全タイルを `direction` へ1マス寄せる
    ///
    /// # Returns
    ///
    /// 増えたスコア。何も動かなければNone（不正手、盤面は変更しない）
    ///
    /// # Examples
    ///
    /// ```
    /// use threes_td::board::{Board, Direction};
    ///
    /// let mut cells = [0u8; 16];
    /// cells[0] = 1;
    /// cells[1] = 2;
    /// let mut board = Board::from_cells(cells);
    ///
    /// assert_eq!(board.slide(Direction::Left), Some(3));
    /// assert_eq!(board.cell(0), 3);
    /// assert_eq!(board.slide(Direction::Left), None);
    /// ```
    pub fn slide(&mut self, direction: Direction) -> Option<Reward> {
        let before = self.score();
        let mut moved = false;

        for line in &SLIDE_LINES[direction.index()] {
            for k in 1..line.len() {
                let from = line[k];
                let to = line[k - 1];
                let tile = self.cells[from];
                if tile == 0 {
                    continue;
                }

                let target = self.cells[to];
                if target == 0 {
                    self.cells[to] = tile;
                    self.cells[from] = 0;
                    moved = true;
                } else if let Some(merged) = merge(target, tile) {
                    self.cells[to] = merged;
                    self.cells[from] = 0;
                    moved = true;
                }
            }
        }

        if !moved {
            return None;
        }
        self.last = PlacementRegion::after_slide(direction);
        Some(self.score() - before)
    }

    /// `cell` に `tile` を置き、次のタイルとして `hint` を告知する
    ///
    /// ヒントは袋から引く。保留中のヒントがなければ `tile` も袋から引く。
    /// 袋が空になったら補充する。
    ///
    /// # Returns
    ///
    /// マスが埋まっている・範囲外、またはタイルやヒントのランクが不正なら
    /// None（盤面は変更しない）
    pub fn place(&mut self, cell: usize, tile: u8, hint: Option<u8>) -> Option<Reward> {
        if cell >= NUM_CELLS || self.cells[cell] != 0 {
            return None;
        }
        if tile == 0 || tile > MAX_RANK {
            return None;
        }
        if matches!(hint, Some(h) if !(1..=3).contains(&h)) {
            return None;
        }

        if self.hint.is_none() {
            self.draw_from_bag(tile);
        }
        if let Some(next) = hint {
            self.draw_from_bag(next);
        }
        self.cells[cell] = tile;
        self.hint = hint;
        Some(0)
    }

    /// タイルを時計回りに90°回転
    pub fn rotate_clockwise(&mut self) {
        *self = transform(self, Symmetry::new(1, false));
    }

    /// タイルを左右反転
    pub fn reflect_horizontal(&mut self) {
        *self = transform(self, Symmetry::new(0, true));
    }

    fn draw_from_bag(&mut self, tile: u8) {
        if (1..=3).contains(&tile) {
            let slot = &mut self.bag[tile as usize];
            *slot = slot.saturating_sub(1);
        }
        if self.bag[1..].iter().all(|&count| count == 0) {
            self.bag = [0, BAG_FILL, BAG_FILL, BAG_FILL];
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Board")
            .field("cells", &self.cells)
            .field("bag", &&self.bag[1..])
            .field("hint", &self.hint)
            .field("last", &self.last)
            .finish()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(BOARD_SIZE) {
            for &rank in row {
                write!(f, "{:>6}", tile_value(rank))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// タイルランクの額面
#[inline]
pub fn tile_value(rank: u8) -> u32 {
    match rank {
        0..=2 => rank as u32,
        _ => 3 << (rank - 3),
    }
}

/// タイルランクのスコア寄与
#[inline]
pub fn tile_score(rank: u8) -> Reward {
    match rank {
        0..=2 => 0,
        _ => 3u32.pow((rank - 2) as u32),
    }
}

/// `moving` が `target` の上へスライドしたときの合成結果
#[inline]
fn merge(target: u8, moving: u8) -> Option<u8> {
    if target + moving == 3 && target * moving == 2 {
        Some(3)
    } else if target == moving && target >= 3 && target < MAX_RANK {
        Some(target + 1)
    } else {
        None
    }
}
