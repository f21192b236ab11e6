//! Board engine: grid, group search, removal, gravity, column compaction, scoring.

use crate::error::{InvalidConfiguration, NoOp};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, trace};

pub const DEFAULT_ROWS: usize = 10;
pub const DEFAULT_COLS: usize = 10;
pub const DEFAULT_COLORS: u8 = 6;

/// Smallest group a selection may remove.
pub const MIN_GROUP: usize = 2;

/// Orthogonal neighbours in visiting order: up, down, left, right.
const NEIGHBOURS_4: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Single cell: either empty or a tile of a given colour index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Tile(u8),
}

impl Cell {
    pub fn color(self) -> Option<u8> {
        match self {
            Self::Tile(c) => Some(c),
            Self::Empty => None,
        }
    }

    pub fn is_empty(self) -> bool {
        self == Self::Empty
    }
}

/// Board dimensions and colour count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardConfig {
    pub rows: usize,
    pub cols: usize,
    pub colors: u8,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            colors: DEFAULT_COLORS,
        }
    }
}

impl BoardConfig {
    pub fn validate(&self) -> Result<(), InvalidConfiguration> {
        if self.rows == 0 {
            return Err(InvalidConfiguration::ZeroRows);
        }
        if self.cols == 0 {
            return Err(InvalidConfiguration::ZeroCols);
        }
        if self.colors == 0 {
            return Err(InvalidConfiguration::ZeroColors);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Playing,
    GameOver,
}

/// Outcome of one successful selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveResult {
    /// Removed cells, in the coordinates they had before gravity.
    pub group: Vec<(usize, usize)>,
    pub color: u8,
    /// Points earned by this move alone.
    pub points: u64,
    pub score: u64,
    pub combo: u32,
    pub game_over: bool,
}

/// Points for removing `size` tiles; `combo` is the value after this move's increment.
pub fn points_for(size: usize, combo: u32) -> u64 {
    let size = size as u64;
    size * size * 5 + u64::from(combo) * 2
}

/// Grid plus score state. The only way to change either is `select` or `reset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardEngine {
    rows: usize,
    cols: usize,
    colors: u8,
    /// cells[row][col]; row 0 is top.
    cells: Vec<Vec<Cell>>,
    score: u64,
    combo: u32,
    phase: Phase,
}

impl BoardEngine {
    /// Deal a board with every cell coloured uniformly at random from `rng`.
    pub fn new<R: Rng>(config: BoardConfig, rng: &mut R) -> Result<Self, InvalidConfiguration> {
        config.validate()?;
        let mut cells = Vec::with_capacity(config.rows);
        for _ in 0..config.rows {
            let mut row = Vec::with_capacity(config.cols);
            for _ in 0..config.cols {
                row.push(Cell::Tile(rng.random_range(0..config.colors)));
            }
            cells.push(row);
        }
        Ok(Self::start(config, cells))
    }

    /// Deal a reproducible board from a seed.
    pub fn seeded(config: BoardConfig, seed: u64) -> Result<Self, InvalidConfiguration> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::new(config, &mut rng)
    }

    /// Build a board from an explicit layout; `None` is an empty cell.
    pub fn from_rows(colors: u8, layout: &[Vec<Option<u8>>]) -> Result<Self, InvalidConfiguration> {
        let rows = layout.len();
        let cols = layout.first().map_or(0, Vec::len);
        if rows == 0 || cols == 0 {
            return Err(InvalidConfiguration::EmptyLayout);
        }
        let config = BoardConfig { rows, cols, colors };
        config.validate()?;
        let mut cells = Vec::with_capacity(rows);
        for (r, line) in layout.iter().enumerate() {
            if line.len() != cols {
                return Err(InvalidConfiguration::RaggedLayout {
                    row: r,
                    expected: cols,
                    found: line.len(),
                });
            }
            let mut row = Vec::with_capacity(cols);
            for (c, value) in line.iter().enumerate() {
                row.push(match *value {
                    Some(color) if color >= colors => {
                        return Err(InvalidConfiguration::ColorOutOfRange {
                            row: r,
                            col: c,
                            color,
                            colors,
                        });
                    }
                    Some(color) => Cell::Tile(color),
                    None => Cell::Empty,
                });
            }
            cells.push(row);
        }
        Ok(Self::start(config, cells))
    }

    fn start(config: BoardConfig, cells: Vec<Vec<Cell>>) -> Self {
        let mut engine = Self {
            rows: config.rows,
            cols: config.cols,
            colors: config.colors,
            cells,
            score: 0,
            combo: 0,
            phase: Phase::Playing,
        };
        // A dealt board can already be dead.
        if !engine.has_move() {
            engine.phase = Phase::GameOver;
        }
        info!(
            rows = config.rows,
            cols = config.cols,
            colors = config.colors,
            game_over = engine.is_terminal(),
            "board dealt"
        );
        engine
    }

    /// Deal a fresh game in place. On error the current game is left as it was.
    pub fn reset<R: Rng>(&mut self, config: BoardConfig, rng: &mut R) -> Result<(), InvalidConfiguration> {
        *self = Self::new(config, rng)?;
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn color_count(&self) -> u8 {
        self.colors
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Cached; only `select` and `reset` recompute it.
    pub fn is_terminal(&self) -> bool {
        self.phase == Phase::GameOver
    }

    pub fn cell_at(&self, row: usize, col: usize) -> Cell {
        self.check_bounds(row, col);
        self.cells[row][col]
    }

    pub fn tiles_remaining(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|cell| !cell.is_empty())
            .count()
    }

    #[track_caller]
    fn check_bounds(&self, row: usize, col: usize) {
        assert!(
            row < self.rows && col < self.cols,
            "cell ({row}, {col}) is outside the {}x{} board",
            self.rows,
            self.cols
        );
    }

    fn neighbour(&self, row: usize, col: usize, dr: isize, dc: isize) -> Option<(usize, usize)> {
        let r = row.checked_add_signed(dr)?;
        let c = col.checked_add_signed(dc)?;
        (r < self.rows && c < self.cols).then_some((r, c))
    }

    /// Connected same-colour cells containing (row, col), in depth-first visiting order.
    /// Empty for an empty cell. Panics if (row, col) is off the board.
    pub fn find_group(&self, row: usize, col: usize) -> Vec<(usize, usize)> {
        self.check_bounds(row, col);
        let Cell::Tile(color) = self.cells[row][col] else {
            return Vec::new();
        };
        let mut visited = vec![vec![false; self.cols]; self.rows];
        let mut group = Vec::new();
        let mut stack = vec![(row, col)];
        while let Some((r, c)) = stack.pop() {
            if visited[r][c] {
                continue;
            }
            visited[r][c] = true;
            group.push((r, c));
            // Pushed in reverse so they pop up, down, left, right.
            for &(dr, dc) in NEIGHBOURS_4.iter().rev() {
                if let Some((nr, nc)) = self.neighbour(r, c, dr, dc) {
                    if !visited[nr][nc] && self.cells[nr][nc] == Cell::Tile(color) {
                        stack.push((nr, nc));
                    }
                }
            }
        }
        group
    }

    /// The group a selection at (row, col) would remove, or why nothing would happen.
    pub fn removable_group(&self, row: usize, col: usize) -> Result<Vec<(usize, usize)>, NoOp> {
        self.check_bounds(row, col);
        if self.is_terminal() {
            return Err(NoOp::GameOver);
        }
        if self.cells[row][col].is_empty() {
            return Err(NoOp::EmptyCell);
        }
        let group = self.find_group(row, col);
        if group.len() < MIN_GROUP {
            return Err(NoOp::LoneTile);
        }
        Ok(group)
    }

    /// Remove the group at (row, col), score it, let tiles fall and close empty columns.
    /// Returns `Err(NoOp)` with the board untouched when there is nothing to remove.
    pub fn select(&mut self, row: usize, col: usize) -> Result<MoveResult, NoOp> {
        let group = match self.removable_group(row, col) {
            Ok(group) => group,
            Err(reason) => {
                trace!(row, col, %reason, "selection ignored");
                return Err(reason);
            }
        };
        let color = self.cells[row][col].color().unwrap_or_default();

        for &(r, c) in &group {
            self.cells[r][c] = Cell::Empty;
        }
        self.combo += 1;
        let points = points_for(group.len(), self.combo);
        self.score += points;

        self.apply_gravity();
        self.compact_columns();

        if !self.has_move() {
            self.phase = Phase::GameOver;
            info!(
                score = self.score,
                tiles_left = self.tiles_remaining(),
                "no moves left"
            );
        }
        debug!(
            row,
            col,
            size = group.len(),
            points,
            score = self.score,
            combo = self.combo,
            "group removed"
        );

        Ok(MoveResult {
            group,
            color,
            points,
            score: self.score,
            combo: self.combo,
            game_over: self.is_terminal(),
        })
    }

    /// Per column, slide tiles to the bottom keeping their order.
    fn apply_gravity(&mut self) {
        for col in 0..self.cols {
            let mut write = self.rows;
            for row in (0..self.rows).rev() {
                if self.cells[row][col].is_empty() {
                    continue;
                }
                write -= 1;
                if write != row {
                    self.cells[write][col] = self.cells[row][col];
                    self.cells[row][col] = Cell::Empty;
                }
            }
        }
    }

    /// Slide non-empty columns to the left keeping their order.
    fn compact_columns(&mut self) {
        let mut write = 0;
        for col in 0..self.cols {
            if self.column_is_empty(col) {
                continue;
            }
            if write != col {
                for row in &mut self.cells {
                    row[write] = row[col];
                    row[col] = Cell::Empty;
                }
            }
            write += 1;
        }
    }

    fn column_is_empty(&self, col: usize) -> bool {
        self.cells.iter().all(|row| row[col].is_empty())
    }

    /// True while some pair of orthogonal neighbours shares a colour,
    /// i.e. while a group of at least `MIN_GROUP` tiles exists.
    pub fn has_move(&self) -> bool {
        for row in 0..self.rows {
            for col in 0..self.cols {
                let cell = self.cells[row][col];
                if cell.is_empty() {
                    continue;
                }
                if col + 1 < self.cols && self.cells[row][col + 1] == cell {
                    return true;
                }
                if row + 1 < self.rows && self.cells[row + 1][col] == cell {
                    return true;
                }
            }
        }
        false
    }
}
