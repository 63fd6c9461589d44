//! Game-facing player for the plain capture-scoring game.
//!
//! A [`Player`] owns everything a live game needs: the board, the
//! fingerprint history of every position reached, and a search tree that
//! follows the game move by move. Opponent moves are committed through
//! [`Player::place_move`] and [`Player::place_pass`]; the engine's own
//! moves come from [`Player::gen_move`], which searches, filters the
//! ranked candidates against the game rules, and commits the winner.

use std::collections::HashSet;

use anyhow::{Result, ensure};

use crate::board::{Board, Color, Move, Pos};
use crate::constants::{
    DEFAULT_KOMI, DEFAULT_PLAYOUTS, DEFAULT_SIZE, EXPLORATION, MAX_BOARD_DIM, MIN_BOARD_DIM,
};
use crate::mcts::{SearchTree, WinRule};

/// Engine reply to a move request.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Play(Pos),
    Pass,
    Resign,
}

/// A playing engine for the plain game.
pub struct Player {
    /// Live game board.
    board: Board,
    /// Fingerprints of every position the real game has been in, the
    /// starting position included.
    visited: HashSet<String>,
    /// Searcher reused across move requests.
    tree: SearchTree,
    playouts: usize,
    win_rule: WinRule,
    suicide_allowed: bool,
    pass_allowed: bool,
    /// When set, the tree follows committed moves instead of being rebuilt
    /// from scratch for every request. On by default.
    reuse_tree: bool,
    seed: Option<u64>,
}

impl Default for Player {
    fn default() -> Self {
        Self::new(DEFAULT_PLAYOUTS)
    }
}

impl Player {
    /// Create a player running `playouts` simulations per move request.
    ///
    /// Starts with a default game: 19x19 board, default komi, suicide
    /// forbidden, passing allowed. Use [`Player::new_game`] to change any
    /// of that.
    pub fn new(playouts: usize) -> Player {
        Self::with_rule(playouts, WinRule::ScoreOnly)
    }

    /// Create a player whose simulations apply `win_rule`. Rule variants
    /// build on this.
    pub(crate) fn with_rule(playouts: usize, win_rule: WinRule) -> Player {
        let board = Board::new(DEFAULT_SIZE, DEFAULT_SIZE, DEFAULT_KOMI);
        let mut visited = HashSet::new();
        visited.insert(board.state_key());
        Player {
            board,
            visited,
            tree: SearchTree::new(playouts, EXPLORATION, win_rule, false),
            playouts,
            win_rule,
            suicide_allowed: false,
            pass_allowed: true,
            reuse_tree: true,
            seed: None,
        }
    }

    /// Start a fresh game on a `rows` x `cols` board.
    ///
    /// Both dimensions must lie within `MIN_BOARD_DIM..=MAX_BOARD_DIM` and
    /// komi must be finite; anything else is refused and the current game
    /// stays as it was.
    pub fn new_game(
        &mut self,
        rows: usize,
        cols: usize,
        komi: f32,
        suicide_allowed: bool,
        pass_allowed: bool,
    ) -> Result<()> {
        ensure!(
            (MIN_BOARD_DIM..=MAX_BOARD_DIM).contains(&rows),
            "rows must be between {MIN_BOARD_DIM} and {MAX_BOARD_DIM}, got {rows}"
        );
        ensure!(
            (MIN_BOARD_DIM..=MAX_BOARD_DIM).contains(&cols),
            "columns must be between {MIN_BOARD_DIM} and {MAX_BOARD_DIM}, got {cols}"
        );
        ensure!(komi.is_finite(), "komi must be finite, got {komi}");
        self.board = Board::new(rows, cols, komi);
        self.suicide_allowed = suicide_allowed;
        self.pass_allowed = pass_allowed;
        self.start_tracking();
        Ok(())
    }

    /// Restart the current game: same dimensions, komi and rules, with an
    /// empty board, fresh history and fresh tree.
    pub fn reset_game(&mut self) {
        self.board.reset();
        self.start_tracking();
    }

    fn start_tracking(&mut self) {
        self.visited.clear();
        self.visited.insert(self.board.state_key());
        self.tree = match self.seed {
            Some(seed) => SearchTree::with_seed(
                self.playouts,
                EXPLORATION,
                self.win_rule,
                self.suicide_allowed,
                seed,
            ),
            None => SearchTree::new(
                self.playouts,
                EXPLORATION,
                self.win_rule,
                self.suicide_allowed,
            ),
        };
    }

    /// Fix the rollout seed for reproducible searches. Applies to the
    /// current tree and to every game started afterwards.
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = Some(seed);
        self.tree.reseed(seed);
    }

    /// Keep or drop the search tree between moves. Reuse is on by default;
    /// with it off, every move request searches from scratch.
    pub fn set_reuse_tree(&mut self, reuse: bool) {
        self.reuse_tree = reuse;
        if !reuse {
            self.tree.reset();
        }
    }

    pub fn set_komi(&mut self, komi: f32) {
        self.board.set_komi(komi);
    }

    /// The live board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// The board and capture counters rendered for a user.
    pub fn show_board(&self) -> String {
        self.board.to_string()
    }

    /// Print the current root's candidate statistics to stderr.
    pub fn dump_search(&self) {
        self.tree.dump_candidates();
    }

    /// Commit an outside stone (opponent or scripted) to the live game.
    ///
    /// Only occupancy is checked: placing on a taken cell is refused with
    /// `false`. Anything else is accepted as played, resolved on the
    /// board, recorded in the history, and followed by the tree.
    pub fn place_move(&mut self, color: Color, row: usize, col: usize) -> bool {
        if self.board.get(row, col).is_some() {
            return false;
        }
        self.board.place(color, row, col);
        self.visited.insert(self.board.state_key());
        self.advance(color, Move::Play((row, col)));
        true
    }

    /// Commit an outside pass: the grid is untouched, but the ko bar
    /// lapses and the tree follows.
    pub fn place_pass(&mut self, color: Color) {
        self.board.clear_ko();
        self.advance(color, Move::Pass);
    }

    /// Search and commit the engine's move for `color`.
    ///
    /// Candidates come back ranked from the search and the first
    /// acceptable one is committed: a pass only when passing is permitted,
    /// and a placement only when the position it creates has never
    /// occurred in this game. With no acceptable candidate left, the
    /// engine resigns and the game state stays untouched.
    pub fn gen_move(&mut self, color: Color) -> Action {
        self.gen_move_threshold(color, 0.0)
    }

    /// Candidate walk shared with the rule variants: a raw simulation
    /// outcome strictly above `threshold` counts as a win when values are
    /// backed up the tree.
    pub(crate) fn gen_move_threshold(&mut self, color: Color, threshold: f64) -> Action {
        let ranked = self.tree.search(&self.board, &self.visited, color, &move |x| {
            if x > threshold { 1.0 } else { 0.0 }
        });
        for mv in ranked {
            match mv {
                Move::Pass => {
                    if self.pass_allowed {
                        self.board.clear_ko();
                        self.advance(color, Move::Pass);
                        return Action::Pass;
                    }
                }
                Move::Play((row, col)) => {
                    let mut next = self.board.clone();
                    next.place(color, row, col);
                    let state = next.state_key();
                    if self.visited.contains(&state) {
                        continue;
                    }
                    self.board = next;
                    self.visited.insert(state);
                    self.advance(color, mv);
                    return Action::Play((row, col));
                }
            }
        }
        Action::Resign
    }

    fn advance(&mut self, color: Color, mv: Move) {
        if self.reuse_tree {
            self.tree.move_root(color, mv);
        } else {
            self.tree.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_game_validates_configuration() {
        let mut player = Player::new(10);
        assert!(player.new_game(1, 5, 0.0, false, true).is_err());
        assert!(player.new_game(5, 26, 0.0, false, true).is_err());
        assert!(player.new_game(3, 3, f32::NAN, false, true).is_err());
        assert!(player.new_game(2, 25, 0.0, false, true).is_ok());
    }

    #[test]
    fn test_failed_new_game_keeps_current_game() {
        let mut player = Player::new(10);
        player.new_game(3, 3, 1.5, false, true).unwrap();
        player.place_move(Color::Black, 1, 1);

        assert!(player.new_game(30, 30, 0.0, false, true).is_err());
        assert_eq!(player.board().get(1, 1), Some(Color::Black));
        assert_eq!(player.board().komi(), 1.5);
    }

    #[test]
    fn test_place_move_rejects_occupied_only() {
        let mut player = Player::new(10);
        player.new_game(3, 3, 0.0, false, true).unwrap();

        assert!(player.place_move(Color::Black, 0, 0));
        assert!(!player.place_move(Color::White, 0, 0), "occupied cell");
        // Alternation is not this layer's business.
        assert!(player.place_move(Color::Black, 2, 2));
    }

    #[test]
    fn test_reset_game_keeps_dimensions_and_komi() {
        let mut player = Player::new(10);
        player.new_game(4, 5, 2.5, true, false).unwrap();
        player.place_move(Color::Black, 0, 0);
        player.reset_game();

        assert_eq!(player.board().rows(), 4);
        assert_eq!(player.board().cols(), 5);
        assert_eq!(player.board().komi(), 2.5);
        assert_eq!(player.board().get(0, 0), None);
    }

    #[test]
    fn test_place_pass_lifts_ko_bar() {
        let mut player = Player::new(10);
        player.new_game(3, 3, 0.0, false, true).unwrap();
        for (color, row, col) in [
            (Color::Black, 2, 2),
            (Color::White, 2, 1),
            (Color::Black, 1, 1),
            (Color::White, 1, 0),
            (Color::Black, 2, 0),
        ] {
            assert!(player.place_move(color, row, col));
        }
        assert_eq!(player.board().ko(), Some(((2, 1), Color::White)));

        player.place_pass(Color::White);
        assert_eq!(player.board().ko(), None, "a pass ends the ko window");
    }
}
