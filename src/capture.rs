//! Player for the capture game: first side to a fixed number of captures
//! wins.
//!
//! The variant changes two things relative to the plain game. Simulations
//! end the moment either capture counter reaches the target, and a move
//! request checks the real counters first: once the opponent has reached
//! the target the game is lost and the engine resigns without searching.
//! Everything else is delegated to the plain [`Player`].

use anyhow::Result;

use crate::board::{Board, Color};
use crate::constants::{DEFAULT_CAPTURE_TARGET, DEFAULT_PLAYOUTS};
use crate::mcts::WinRule;
use crate::player::{Action, Player};

/// A playing engine for the capture variant.
pub struct CapturePlayer {
    base: Player,
    target: u32,
}

impl Default for CapturePlayer {
    fn default() -> Self {
        Self::first_capture(DEFAULT_PLAYOUTS)
    }
}

impl CapturePlayer {
    /// Create a player where `target` captures decide the game.
    pub fn new(target: u32, playouts: usize) -> CapturePlayer {
        CapturePlayer {
            base: Player::with_rule(playouts, WinRule::CaptureTarget(target)),
            target,
        }
    }

    /// Create a player for the common variant where the first capture wins.
    pub fn first_capture(playouts: usize) -> CapturePlayer {
        Self::new(DEFAULT_CAPTURE_TARGET, playouts)
    }

    /// Captures needed to win.
    pub fn target(&self) -> u32 {
        self.target
    }

    /// Start a fresh game. See [`Player::new_game`].
    pub fn new_game(
        &mut self,
        rows: usize,
        cols: usize,
        komi: f32,
        suicide_allowed: bool,
        pass_allowed: bool,
    ) -> Result<()> {
        self.base.new_game(rows, cols, komi, suicide_allowed, pass_allowed)
    }

    /// Restart the current game. See [`Player::reset_game`].
    pub fn reset_game(&mut self) {
        self.base.reset_game();
    }

    pub fn set_komi(&mut self, komi: f32) {
        self.base.set_komi(komi);
    }

    /// Fix the rollout seed for reproducible searches.
    pub fn set_seed(&mut self, seed: u64) {
        self.base.set_seed(seed);
    }

    /// Keep or drop the search tree between moves.
    pub fn set_reuse_tree(&mut self, reuse: bool) {
        self.base.set_reuse_tree(reuse);
    }

    /// The live board.
    pub fn board(&self) -> &Board {
        self.base.board()
    }

    /// The board and capture counters rendered for a user.
    pub fn show_board(&self) -> String {
        self.base.show_board()
    }

    /// Commit an outside stone. See [`Player::place_move`].
    pub fn place_move(&mut self, color: Color, row: usize, col: usize) -> bool {
        self.base.place_move(color, row, col)
    }

    /// Commit an outside pass. See [`Player::place_pass`].
    pub fn place_pass(&mut self, color: Color) {
        self.base.place_pass(color);
    }

    /// Search and commit the engine's move for `color`.
    ///
    /// Resigns outright when the opponent has already captured enough.
    /// Otherwise the search runs with a komi-shifted win threshold: from
    /// Black's side a raw outcome above komi counts as a win, from White's
    /// side one above negated komi.
    pub fn gen_move(&mut self, color: Color) -> Action {
        if self.board().captures(color.opponent()) >= self.target {
            return Action::Resign;
        }
        let komi = f64::from(self.board().komi());
        let threshold = match color {
            Color::Black => komi,
            Color::White => -komi,
        };
        self.base.gen_move_threshold(color, threshold)
    }
}
