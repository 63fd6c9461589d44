//! Board state and incremental stone-group tracking.
//!
//! This module provides the rules layer of the engine, including:
//! - Stone placement with capture resolution and per-color capture counters
//! - Connected groups (blocks) maintained incrementally with their liberties
//! - Simple ko detection and cheap per-point legality tests
//! - Capture-difference scoring against komi
//!
//! Blocks live in a slab-style arena addressed by handle, and every occupied
//! cell maps to the handle of its block. Placing one stone only touches the
//! blocks around it, so legality checks and captures never have to flood-fill
//! the grid.

use std::collections::HashSet;
use std::fmt;

use crate::constants::{MAX_BOARD_DIM, MIN_BOARD_DIM};

/// Stone color. Empty intersections are represented as `None` in the grid.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Color {
    Black,
    White,
}

impl Color {
    /// The other color.
    pub fn opponent(self) -> Color {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    fn index(self) -> usize {
        match self {
            Color::Black => 0,
            Color::White => 1,
        }
    }

    fn glyph(self) -> char {
        match self {
            Color::Black => 'X',
            Color::White => 'O',
        }
    }
}

/// A board intersection as `(row, column)`, both zero-based.
pub type Pos = (usize, usize);

/// A move in a game or simulation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Move {
    Play(Pos),
    Pass,
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::Play((row, col)) => write!(f, "({row},{col})"),
            Move::Pass => write!(f, "pass"),
        }
    }
}

/// Handle into the board's block arena.
type BlockId = usize;

/// A maximal 4-connected group of same-colored stones and its liberty set.
#[derive(Clone, Debug)]
pub struct Block {
    color: Color,
    stones: Vec<Pos>,
    liberties: HashSet<Pos>,
}

impl Block {
    fn new(color: Color, stone: Pos, liberties: HashSet<Pos>) -> Block {
        Block {
            color,
            stones: vec![stone],
            liberties,
        }
    }

    pub fn color(&self) -> Color {
        self.color
    }

    /// Member stones, in placement order.
    pub fn stones(&self) -> &[Pos] {
        &self.stones
    }

    pub fn liberty_count(&self) -> usize {
        self.liberties.len()
    }

    /// Liberty points, in no particular order.
    pub fn liberties(&self) -> impl Iterator<Item = Pos> + '_ {
        self.liberties.iter().copied()
    }

    pub fn has_liberty(&self, pos: Pos) -> bool {
        self.liberties.contains(&pos)
    }

    /// True when one more opposing stone would capture this block.
    pub fn in_atari(&self) -> bool {
        self.liberties.len() == 1
    }

    /// The last remaining liberty of a block in atari.
    pub fn sole_liberty(&self) -> Option<Pos> {
        if self.in_atari() {
            self.liberties.iter().copied().next()
        } else {
            None
        }
    }

    fn is_captured(&self) -> bool {
        self.liberties.is_empty()
    }
}

/// Stones removed from the board by a single placement, grouped by color.
///
/// Opposing stones land here when their block runs out of liberties; the
/// mover's own stones land here when a permitted suicide removes them.
/// Both lists are sorted for stable comparison.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Captured {
    pub black: Vec<Pos>,
    pub white: Vec<Pos>,
}

impl Captured {
    pub fn of(&self, color: Color) -> &[Pos] {
        match color {
            Color::Black => &self.black,
            Color::White => &self.white,
        }
    }

    pub fn total(&self) -> usize {
        self.black.len() + self.white.len()
    }

    pub fn is_empty(&self) -> bool {
        self.black.is_empty() && self.white.is_empty()
    }

    fn extend(&mut self, color: Color, stones: impl IntoIterator<Item = Pos>) {
        match color {
            Color::Black => self.black.extend(stones),
            Color::White => self.white.extend(stones),
        }
    }
}

/// A rectangular Go board with incremental block bookkeeping.
#[derive(Clone)]
pub struct Board {
    rows: usize,
    cols: usize,
    komi: f32,
    /// Stone occupancy per cell, row-major with row 0 first.
    cells: Vec<Option<Color>>,
    /// Block handle per cell; `Some` exactly where `cells` holds a stone.
    block_map: Vec<Option<BlockId>>,
    /// Block arena. Freed slots are recycled through `free_blocks`.
    blocks: Vec<Option<Block>>,
    free_blocks: Vec<BlockId>,
    /// Stones captured by each color, indexed by `Color::index`.
    captures: [u32; 2],
    /// Barred immediate ko recapture: the point and the color barred from
    /// playing it. Valid only until the next placement.
    ko: Option<(Pos, Color)>,
}

impl Board {
    /// Create an empty `rows` x `cols` board.
    ///
    /// Dimensions outside `MIN_BOARD_DIM..=MAX_BOARD_DIM` are a caller error.
    pub fn new(rows: usize, cols: usize, komi: f32) -> Board {
        assert!(
            (MIN_BOARD_DIM..=MAX_BOARD_DIM).contains(&rows)
                && (MIN_BOARD_DIM..=MAX_BOARD_DIM).contains(&cols),
            "board dimensions {rows}x{cols} outside {MIN_BOARD_DIM}..={MAX_BOARD_DIM}"
        );
        Board {
            rows,
            cols,
            komi,
            cells: vec![None; rows * cols],
            block_map: vec![None; rows * cols],
            blocks: Vec::new(),
            free_blocks: Vec::new(),
            captures: [0, 0],
            ko: None,
        }
    }

    /// Clear all stones, captures and ko, keeping dimensions and komi.
    pub fn reset(&mut self) {
        self.cells.fill(None);
        self.block_map.fill(None);
        self.blocks.clear();
        self.free_blocks.clear();
        self.captures = [0, 0];
        self.ko = None;
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of intersections.
    pub fn size(&self) -> usize {
        self.rows * self.cols
    }

    pub fn komi(&self) -> f32 {
        self.komi
    }

    pub fn set_komi(&mut self, komi: f32) {
        self.komi = komi;
    }

    /// Stones captured so far by `color`.
    pub fn captures(&self, color: Color) -> u32 {
        self.captures[color.index()]
    }

    /// The currently barred ko recapture, if any.
    pub fn ko(&self) -> Option<(Pos, Color)> {
        self.ko
    }

    /// Drop the ko bar without placing a stone. A pass ends the one-move
    /// window in which the recapture is forbidden.
    pub(crate) fn clear_ko(&mut self) {
        self.ko = None;
    }

    /// The stone at `(row, col)`, or `None` for an empty cell.
    pub fn get(&self, row: usize, col: usize) -> Option<Color> {
        self.cells[self.idx(row, col)]
    }

    /// The block owning the stone at `(row, col)`, if the cell is occupied.
    pub fn block_at(&self, row: usize, col: usize) -> Option<&Block> {
        self.block_map[self.idx(row, col)].and_then(|id| self.blocks[id].as_ref())
    }

    /// All live blocks, in arena order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> + '_ {
        self.blocks.iter().filter_map(Option::as_ref)
    }

    fn idx(&self, row: usize, col: usize) -> usize {
        assert!(
            row < self.rows && col < self.cols,
            "({row},{col}) is off the board"
        );
        row * self.cols + col
    }

    /// Up to four orthogonal neighbors of a point, clipped to the board.
    fn neighbors(&self, row: usize, col: usize) -> impl Iterator<Item = Pos> + use<> {
        let (rows, cols) = (self.rows, self.cols);
        [
            (row.wrapping_sub(1), col),
            (row, col.wrapping_sub(1)),
            (row + 1, col),
            (row, col + 1),
        ]
        .into_iter()
        .filter(move |&(r, c)| r < rows && c < cols)
    }

    /// Empty intersections in row-major order.
    pub fn empty_positions(&self) -> impl Iterator<Item = Pos> + '_ {
        let cols = self.cols;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_none())
            .map(move |(i, _)| (i / cols, i % cols))
    }

    /// Legal placements for `color` in row-major order.
    pub fn legal_moves(
        &self,
        color: Color,
        suicide_allowed: bool,
    ) -> impl Iterator<Item = Pos> + '_ {
        self.empty_positions()
            .filter(move |&(row, col)| self.is_legal(color, row, col, suicide_allowed))
    }

    /// Cheap legality test for placing `color` at `(row, col)`.
    ///
    /// A placement is legal when the point is empty, is not the barred ko
    /// recapture, and at least one neighbor offers an out: an empty point, an
    /// opposing block in atari (immediate capture), or a friendly block that
    /// either keeps a liberty afterwards or may be sacrificed when suicide is
    /// permitted. Playing a lone stone into a dead point is never legal.
    pub fn is_legal(&self, color: Color, row: usize, col: usize, suicide_allowed: bool) -> bool {
        if self.cells[self.idx(row, col)].is_some() {
            return false;
        }
        if self.ko == Some(((row, col), color)) {
            return false;
        }
        let opp = color.opponent();
        for (nr, nc) in self.neighbors(row, col) {
            match self.cells[self.idx(nr, nc)] {
                None => return true,
                Some(c) => {
                    let Some(block) = self.block_at(nr, nc) else {
                        continue;
                    };
                    if c == opp && block.in_atari() {
                        return true;
                    }
                    if c == color && (suicide_allowed || !block.in_atari()) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Place a stone for `color` and resolve all rule effects.
    ///
    /// Effects run in order: the stone joins or forms a block, opposing
    /// blocks left without liberties are captured, a liberty-less own block
    /// is then removed as suicide, and finally the ko point is recomputed.
    /// Returns every stone taken off the board, grouped by color.
    ///
    /// Placing on an occupied cell or outside the grid is a caller error and
    /// panics. Legality under the ko and suicide rules is the caller's
    /// concern; see [`Board::is_legal`].
    pub fn place(&mut self, color: Color, row: usize, col: usize) -> Captured {
        let i = self.idx(row, col);
        assert!(
            self.cells[i].is_none(),
            "cell ({row},{col}) is already occupied"
        );
        let opp = color.opponent();

        self.add_stone(color, (row, col));

        // Opposing neighbor blocks that just lost their final liberty die.
        let mut captured = Captured::default();
        let mut dead: Vec<BlockId> = Vec::new();
        for (nr, nc) in self.neighbors(row, col) {
            let ni = self.idx(nr, nc);
            if self.cells[ni] == Some(opp) {
                if let Some(id) = self.block_map[ni] {
                    if !dead.contains(&id) && self.blocks[id].as_ref().is_some_and(Block::is_captured)
                    {
                        dead.push(id);
                    }
                }
            }
        }
        for &id in &dead {
            let stones = self.remove_block(id);
            self.captures[color.index()] += stones.len() as u32;
            captured.extend(opp, stones);
        }

        // Nothing captured and no liberties left: the placement completed a
        // suicide, and the mover's block comes off crediting the opponent.
        if captured.is_empty() {
            if let Some(id) = self.block_map[i] {
                if self.blocks[id].as_ref().is_some_and(Block::is_captured) {
                    let stones = self.remove_block(id);
                    self.captures[opp.index()] += stones.len() as u32;
                    captured.extend(color, stones);
                }
            }
        }

        // A lone stone that captured exactly one stone and sits on its last
        // liberty sets up the ko: the captured point is barred to the
        // opponent for one move.
        self.ko = None;
        let taken = captured.of(opp);
        if taken.len() == 1 {
            if let Some(block) = self.block_at(row, col) {
                if block.stones.len() == 1 && block.in_atari() {
                    self.ko = Some((taken[0], opp));
                }
            }
        }

        captured.black.sort_unstable();
        captured.white.sort_unstable();
        captured
    }

    /// Resolve the placement on a scratch copy, reporting what it would
    /// capture without touching this board.
    pub fn try_place(&self, color: Color, row: usize, col: usize) -> Captured {
        let mut scratch = self.clone();
        scratch.place(color, row, col)
    }

    /// Write the stone into the grid and attach it to a block: a fresh one
    /// when no same-colored neighbor exists, otherwise the largest adjacent
    /// friendly block, which absorbs any others. Opposing neighbors lose
    /// this point as a liberty.
    fn add_stone(&mut self, color: Color, pos: Pos) {
        let (row, col) = pos;
        let i = self.idx(row, col);
        self.cells[i] = Some(color);

        let mut friends: Vec<BlockId> = Vec::new();
        let mut empty_neighbors: HashSet<Pos> = HashSet::new();
        for (nr, nc) in self.neighbors(row, col) {
            let ni = self.idx(nr, nc);
            match self.cells[ni] {
                None => {
                    empty_neighbors.insert((nr, nc));
                }
                Some(c) => {
                    let Some(id) = self.block_map[ni] else { continue };
                    if c == color {
                        if !friends.contains(&id) {
                            friends.push(id);
                        }
                    } else if let Some(block) = self.blocks[id].as_mut() {
                        block.liberties.remove(&pos);
                    }
                }
            }
        }

        let id = match friends.split_first() {
            None => self.alloc_block(Block::new(color, pos, empty_neighbors)),
            Some((&first, rest)) => {
                // The largest friendly block survives and absorbs the rest.
                let mut survivor = first;
                for &id in rest {
                    if self.block_len(id) > self.block_len(survivor) {
                        survivor = id;
                    }
                }
                for &id in &friends {
                    if id != survivor {
                        self.merge_blocks(survivor, id);
                    }
                }
                let block = self.blocks[survivor].as_mut().unwrap();
                block.stones.push(pos);
                block.liberties.remove(&pos);
                block.liberties.extend(empty_neighbors);
                survivor
            }
        };
        self.block_map[i] = Some(id);
    }

    fn block_len(&self, id: BlockId) -> usize {
        self.blocks[id].as_ref().map_or(0, |b| b.stones.len())
    }

    fn alloc_block(&mut self, block: Block) -> BlockId {
        match self.free_blocks.pop() {
            Some(id) => {
                self.blocks[id] = Some(block);
                id
            }
            None => {
                self.blocks.push(Some(block));
                self.blocks.len() - 1
            }
        }
    }

    /// Fold block `from` into `into`, rebinding every member cell.
    fn merge_blocks(&mut self, into: BlockId, from: BlockId) {
        let Some(donor) = self.blocks[from].take() else {
            return;
        };
        self.free_blocks.push(from);
        for &(r, c) in &donor.stones {
            let i = self.idx(r, c);
            self.block_map[i] = Some(into);
        }
        if let Some(block) = self.blocks[into].as_mut() {
            block.stones.extend(donor.stones);
            block.liberties.extend(donor.liberties);
        }
    }

    /// Take a block off the board. Every removed stone becomes a liberty of
    /// the surviving blocks around it. Returns the removed stones.
    fn remove_block(&mut self, id: BlockId) -> Vec<Pos> {
        let Some(block) = self.blocks[id].take() else {
            return Vec::new();
        };
        self.free_blocks.push(id);
        for &(r, c) in &block.stones {
            let i = self.idx(r, c);
            self.cells[i] = None;
            self.block_map[i] = None;
        }
        for &(r, c) in &block.stones {
            for (nr, nc) in self.neighbors(r, c) {
                let ni = self.idx(nr, nc);
                if let Some(nid) = self.block_map[ni] {
                    if let Some(neighbor) = self.blocks[nid].as_mut() {
                        neighbor.liberties.insert((r, c));
                    }
                }
            }
        }
        block.stones
    }

    /// Capture-difference score from `color`'s point of view: Black's
    /// captures minus White's captures minus komi, negated for White.
    pub fn score(&self, color: Color) -> f64 {
        let black = f64::from(self.captures[Color::Black.index()])
            - f64::from(self.captures[Color::White.index()])
            - f64::from(self.komi);
        match color {
            Color::Black => black,
            Color::White => -black,
        }
    }

    /// Compact fingerprint of the grid: one character per cell (`X`, `O` or
    /// `.`), row-major with row 0 first. Ko and capture counters are not
    /// part of the key.
    pub fn state_key(&self) -> String {
        self.cells
            .iter()
            .map(|cell| match cell {
                Some(color) => color.glyph(),
                None => '.',
            })
            .collect()
    }

    /// Set up a whole position from one character row per board row
    /// (`X` Black, `O` White, `.` empty), `rows[0]` being board row 0.
    ///
    /// The board is reset first and the stones are replayed in row-major
    /// order, so the layout must be reachable without intermediate captures.
    /// Capture counters and ko are cleared afterwards.
    pub fn set_config(&mut self, rows: &[&str]) {
        assert_eq!(rows.len(), self.rows, "expected {} rows", self.rows);
        self.reset();
        for (row, line) in rows.iter().enumerate() {
            assert_eq!(
                line.len(),
                self.cols,
                "row {row} must have {} cells",
                self.cols
            );
            for (col, ch) in line.chars().enumerate() {
                match ch {
                    'X' => {
                        self.place(Color::Black, row, col);
                    }
                    'O' => {
                        self.place(Color::White, row, col);
                    }
                    '.' => {}
                    other => panic!("unknown cell character '{other}'"),
                }
            }
        }
        self.captures = [0, 0];
        self.ko = None;
    }
}

impl fmt::Display for Board {
    /// Renders the grid with the highest row first, followed by the capture
    /// counters.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in (0..self.rows).rev() {
            for col in 0..self.cols {
                let ch = match self.get(row, col) {
                    Some(color) => color.glyph(),
                    None => '.',
                };
                write!(f, "{ch}")?;
            }
            writeln!(f)?;
        }
        writeln!(f, "Black: {}", self.captures[Color::Black.index()])?;
        writeln!(f, "White: {}", self.captures[Color::White.index()])
    }
}
