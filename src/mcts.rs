//! Monte Carlo tree search over whole-game playouts.
//!
//! This module implements UCT search in the shape the engine needs:
//! - Selection by UCT value over all currently legal moves plus pass
//! - Lazy expansion, growing the tree by at most one node per simulation
//! - Rollouts with a light capture-first default policy
//! - Backpropagation of a mapped outcome along the simulated path
//!
//! Simulations run on throwaway copies of the live board and position
//! history, so a game in progress is never disturbed. Between searches the
//! tree can follow the real game move by move, keeping the statistics
//! gathered below the new root.

use std::collections::{HashMap, HashSet};

use crate::board::{Board, Color, Move, Pos};
use crate::constants::GAME_LEN_FACTOR;

/// Terminal rule applied inside simulations.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WinRule {
    /// Simulated games end on repetition or when the move budget runs out.
    ScoreOnly,
    /// Capture game: the first color whose capture counter reaches the
    /// target wins outright.
    CaptureTarget(u32),
}

/// A node of the search tree, holding accumulated statistics for the side
/// to move in the position it stands for.
struct Node {
    /// Color to move at this node.
    color: Color,
    /// Sum of backed-up values.
    total: f64,
    /// Number of times a simulation passed through this node.
    count: u32,
    /// Explored continuations, keyed by the move that reaches them.
    children: HashMap<Move, Node>,
}

impl Node {
    fn new(color: Color) -> Node {
        Node {
            color,
            total: 0.0,
            count: 0,
            children: HashMap::new(),
        }
    }

    /// Mean backed-up value. Every node reachable through `children` has
    /// been updated at least once, so the division is well defined.
    fn value(&self) -> f64 {
        self.total / f64::from(self.count)
    }

    fn update(&mut self, value: f64) {
        self.total += value;
        self.count += 1;
    }
}

/// Reusable UCT searcher.
///
/// The searcher owns its tree and random generator; the board, position
/// history and outcome mapping are handed in per search, so one searcher
/// can follow a whole game.
pub struct SearchTree {
    root: Option<Node>,
    playouts: usize,
    exploration: f64,
    win_rule: WinRule,
    suicide_allowed: bool,
    rng: fastrand::Rng,
}

impl SearchTree {
    /// Create a searcher with a randomly seeded rollout generator.
    pub fn new(
        playouts: usize,
        exploration: f64,
        win_rule: WinRule,
        suicide_allowed: bool,
    ) -> SearchTree {
        Self::from_rng(
            playouts,
            exploration,
            win_rule,
            suicide_allowed,
            fastrand::Rng::new(),
        )
    }

    /// Create a searcher whose rollouts are reproducible for a given seed.
    pub fn with_seed(
        playouts: usize,
        exploration: f64,
        win_rule: WinRule,
        suicide_allowed: bool,
        seed: u64,
    ) -> SearchTree {
        Self::from_rng(
            playouts,
            exploration,
            win_rule,
            suicide_allowed,
            fastrand::Rng::with_seed(seed),
        )
    }

    fn from_rng(
        playouts: usize,
        exploration: f64,
        win_rule: WinRule,
        suicide_allowed: bool,
        rng: fastrand::Rng,
    ) -> SearchTree {
        SearchTree {
            root: None,
            playouts,
            exploration,
            win_rule,
            suicide_allowed,
            rng,
        }
    }

    /// Reseed the rollout generator in place.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = fastrand::Rng::with_seed(seed);
    }

    /// Visit count of the current root, if a tree is loaded.
    pub fn root_visits(&self) -> Option<u32> {
        self.root.as_ref().map(|node| node.count)
    }

    /// Run the configured number of playouts for `color` to move on `board`
    /// and return every candidate move, ranked best first by mean value.
    ///
    /// `visited` holds the fingerprints of all positions of the real game;
    /// `score` maps a raw simulation outcome to the value backed up the
    /// tree. An existing tree is reused when its root is `color`'s turn,
    /// otherwise the search starts over from scratch.
    pub fn search(
        &mut self,
        board: &Board,
        visited: &HashSet<String>,
        color: Color,
        score: &dyn Fn(f64) -> f64,
    ) -> Vec<Move> {
        let mut root = match self.root.take() {
            Some(node) if node.color == color => node,
            _ => Node::new(color),
        };
        for _ in 0..self.playouts {
            self.simulate(&mut root, board, visited, score);
        }
        let ranked = ranked_moves(&root, board, self.suicide_allowed);
        self.root = Some(root);
        ranked
    }

    /// Make the child reached by `mv` the new root, keeping its subtree,
    /// provided the tree is positioned at `color`'s turn. Any other shape
    /// discards the tree and the next search starts fresh.
    pub fn move_root(&mut self, color: Color, mv: Move) {
        self.root = match self.root.take() {
            Some(mut node) if node.color == color => node.children.remove(&mv),
            _ => None,
        };
    }

    /// Throw the whole tree away.
    pub fn reset(&mut self) {
        self.root = None;
    }

    /// Print per-candidate statistics of the current root to stderr.
    pub fn dump_candidates(&self) {
        if let Some(root) = &self.root {
            for (mv, child) in &root.children {
                eprintln!("move {mv} n={} value={:.3}", child.count, child.value());
            }
        }
    }

    /// Play one simulated game: descend the tree while visited nodes last,
    /// roll out with the default policy, then back the mapped outcome up
    /// the path. Grows the tree by at most one node.
    fn simulate(
        &mut self,
        root: &mut Node,
        board: &Board,
        visited: &HashSet<String>,
        score: &dyn Fn(f64) -> f64,
    ) {
        let mut sim_board = board.clone();
        let mut sim_visited = visited.clone();
        let root_color = root.color;

        // Tree phase. A pass only descends; it touches neither the grid nor
        // the history, so the repetition rule cannot fire on it here.
        let mut path: Vec<Move> = Vec::new();
        let mut outcome: Option<f64> = None;
        let mut node = &mut *root;
        while node.count > 0 && outcome.is_none() {
            let mv = select_move(
                node,
                &sim_board,
                root_color,
                self.exploration,
                self.suicide_allowed,
            );
            path.push(mv);
            if let Move::Play(_) = mv {
                outcome = self.sim_move(&mut sim_board, node.color, mv, &mut sim_visited, root_color);
            }
            let child_color = node.color.opponent();
            node = node
                .children
                .entry(mv)
                .or_insert_with(|| Node::new(child_color));
        }
        let leaf_color = node.color;

        // Rollout phase.
        if outcome.is_none() {
            let max_states = sim_board.size() * GAME_LEN_FACTOR;
            let mut color = leaf_color;
            while outcome.is_none() && sim_visited.len() < max_states {
                let mv = self.default_move(&sim_board, color);
                outcome = self.sim_move(&mut sim_board, color, mv, &mut sim_visited, root_color);
                color = color.opponent();
            }
        }
        let outcome = outcome.unwrap_or_else(|| sim_board.score(root_color));

        // Backpropagation.
        let value = score(outcome);
        root.update(value);
        let mut node = &mut *root;
        for &mv in &path {
            node = node
                .children
                .get_mut(&mv)
                .expect("child on simulation path");
            node.update(value);
        }
    }

    /// Apply one simulated move and test the terminal rules.
    ///
    /// A repeated position ends the line against the color that caused it,
    /// and under a capture target either counter reaching the target
    /// decides the game, mover checked first. Decisive outcomes are worth
    /// the whole board area, signed from the root color's point of view.
    /// A pass leaves the grid alone but lifts the ko bar.
    fn sim_move(
        &self,
        board: &mut Board,
        color: Color,
        mv: Move,
        visited: &mut HashSet<String>,
        root_color: Color,
    ) -> Option<f64> {
        match mv {
            Move::Play((row, col)) => {
                board.place(color, row, col);
            }
            Move::Pass => board.clear_ko(),
        }
        let state = board.state_key();
        if visited.contains(&state) {
            return Some(decisive(board, color != root_color));
        }
        if let WinRule::CaptureTarget(target) = self.win_rule {
            if board.captures(color) >= target {
                return Some(decisive(board, color == root_color));
            }
            let opp = color.opponent();
            if board.captures(opp) >= target {
                return Some(decisive(board, opp == root_color));
            }
        }
        visited.insert(state);
        None
    }

    /// Rollout policy: capture an opposing block in atari when possible,
    /// otherwise play a uniformly random legal move, otherwise pass.
    fn default_move(&mut self, board: &Board, color: Color) -> Move {
        if let Some(pos) = self.forcing_capture(board, color) {
            return Move::Play(pos);
        }
        let legal: Vec<Pos> = board.legal_moves(color, self.suicide_allowed).collect();
        if legal.is_empty() {
            Move::Pass
        } else {
            Move::Play(legal[self.rng.usize(..legal.len())])
        }
    }

    /// The sole liberty of the first opposing block in atari whose capture
    /// is currently legal. Blocks are scanned in arena order, which keeps
    /// the choice deterministic.
    fn forcing_capture(&self, board: &Board, color: Color) -> Option<Pos> {
        let opp = color.opponent();
        for block in board.blocks() {
            if block.color() == opp && block.in_atari() {
                if let Some((row, col)) = block.sole_liberty() {
                    if board.is_legal(color, row, col, self.suicide_allowed) {
                        return Some((row, col));
                    }
                }
            }
        }
        None
    }
}

/// Decisive simulation outcome worth the whole board, positive when it
/// favors the root color.
fn decisive(board: &Board, favors_root: bool) -> f64 {
    let area = board.size() as f64;
    if favors_root { area } else { -area }
}

/// All placements currently legal for `color`, in row-major order, plus
/// pass, which is always a candidate.
fn candidate_moves(
    board: &Board,
    color: Color,
    suicide_allowed: bool,
) -> impl Iterator<Item = Move> + '_ {
    board
        .legal_moves(color, suicide_allowed)
        .map(Move::Play)
        .chain(std::iter::once(Move::Pass))
}

/// Pick the next move during descent by UCT value.
///
/// Visited children score their mean value (sign-flipped when this node
/// moves against the root color) plus the exploration term; unvisited
/// candidates get the exploration term alone. Candidates are scanned in
/// row-major order with pass last and the first maximum wins, keeping
/// selection deterministic for a given tree.
fn select_move(
    node: &Node,
    board: &Board,
    root_color: Color,
    exploration: f64,
    suicide_allowed: bool,
) -> Move {
    let ln_visits = f64::from(node.count + 1).ln();
    let mut best = (Move::Pass, f64::NEG_INFINITY);
    for mv in candidate_moves(board, node.color, suicide_allowed) {
        let urgency = match node.children.get(&mv) {
            Some(child) if child.count > 0 => {
                let mut value = child.value();
                if node.color != root_color {
                    value = -value;
                }
                value + exploration * (ln_visits / f64::from(child.count + 1)).sqrt()
            }
            _ => exploration * ln_visits.sqrt(),
        };
        if urgency > best.1 {
            best = (mv, urgency);
        }
    }
    best.0
}

/// Rank all candidates of the root by mean value alone, best first.
/// Unvisited candidates count as zero. The sort is stable, so ties keep
/// row-major order with pass last.
fn ranked_moves(root: &Node, board: &Board, suicide_allowed: bool) -> Vec<Move> {
    let mut scored: Vec<(Move, f64)> = candidate_moves(board, root.color, suicide_allowed)
        .map(|mv| {
            let value = match root.children.get(&mv) {
                Some(child) if child.count > 0 => child.value(),
                _ => 0.0,
            };
            (mv, value)
        })
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().map(|(mv, _)| mv).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_visited() -> HashSet<String> {
        HashSet::new()
    }

    #[test]
    fn test_select_prefers_unvisited_moves() {
        let board = Board::new(2, 2, 0.0);
        let mut root = Node::new(Color::Black);
        root.count = 5;
        // One explored child with a poor mean; everything else unvisited.
        let mut child = Node::new(Color::White);
        child.total = 0.0;
        child.count = 3;
        root.children.insert(Move::Play((0, 0)), child);

        let picked = select_move(&root, &board, Color::Black, 1.0, false);
        assert_eq!(
            picked,
            Move::Play((0, 1)),
            "first unvisited candidate in row-major order should win"
        );
    }

    #[test]
    fn test_select_flips_sign_at_opponent_nodes() {
        let board = Board::new(2, 2, 0.0);
        // White to move at this node while Black owns the root: a child that
        // is great for Black must look bad here.
        let mut node = Node::new(Color::White);
        node.count = 10;
        let mut good_for_black = Node::new(Color::Black);
        good_for_black.total = 9.0;
        good_for_black.count = 9;
        node.children.insert(Move::Play((0, 0)), good_for_black);
        let mut even = Node::new(Color::Black);
        even.total = 0.0;
        even.count = 9;
        node.children.insert(Move::Play((0, 1)), even);
        for mv in [Move::Play((1, 0)), Move::Play((1, 1)), Move::Pass] {
            let mut child = Node::new(Color::Black);
            child.total = 0.0;
            child.count = 9;
            node.children.insert(mv, child);
        }

        let picked = select_move(&node, &board, Color::Black, 0.0, false);
        assert_ne!(
            picked,
            Move::Play((0, 0)),
            "White must not pick the move whose mean favors Black"
        );
        assert_eq!(picked, Move::Play((0, 1)));
    }

    #[test]
    fn test_ranked_moves_sorts_by_mean_with_stable_ties() {
        let board = Board::new(2, 2, 0.0);
        let mut root = Node::new(Color::Black);
        root.count = 30;
        for (mv, total, count) in [
            (Move::Play((0, 0)), 2.0, 10),
            (Move::Play((1, 1)), 8.0, 10),
            (Move::Pass, 5.0, 10),
        ] {
            let mut child = Node::new(Color::White);
            child.total = total;
            child.count = count;
            root.children.insert(mv, child);
        }

        let ranked = ranked_moves(&root, &board, false);
        assert_eq!(ranked[0], Move::Play((1, 1)));
        assert_eq!(ranked[1], Move::Pass);
        assert_eq!(ranked[2], Move::Play((0, 0)));
        // The two unvisited candidates keep their row-major order.
        assert_eq!(ranked[3], Move::Play((0, 1)));
        assert_eq!(ranked[4], Move::Play((1, 0)));
    }

    #[test]
    fn test_repetition_ends_simulation_against_the_mover() {
        let board = Board::new(2, 2, 0.0);
        // Every position one Black stone away is already in the history, so
        // whatever the rollout opens with repeats immediately and the root
        // color takes the loss.
        let visited: HashSet<String> = ["X...", ".X..", "..X.", "...X"]
            .into_iter()
            .map(String::from)
            .collect();
        let mut tree = SearchTree::with_seed(1, 1.0, WinRule::ScoreOnly, false, 11);
        tree.search(&board, &visited, Color::Black, &|x| x);

        let root = tree.root.as_ref().unwrap();
        assert_eq!(root.count, 1);
        assert_eq!(root.total, -4.0, "loss is worth the board area");
    }

    #[test]
    fn test_capture_target_decides_simulation() {
        let mut board = Board::new(3, 3, 0.0);
        board.set_config(&[".X.", "XOX", "..."]);
        // The default policy must take the forced capture at (2,1), which
        // reaches the one-capture target and wins for the root on the spot.
        let mut tree = SearchTree::with_seed(1, 1.0, WinRule::CaptureTarget(1), false, 11);
        tree.search(&board, &empty_visited(), Color::Black, &|x| x);

        let root = tree.root.as_ref().unwrap();
        assert_eq!(root.count, 1);
        assert_eq!(root.total, 9.0, "win is worth the board area");
    }

    #[test]
    fn test_search_updates_root_once_per_playout() {
        let board = Board::new(3, 3, 0.0);
        let mut tree = SearchTree::with_seed(40, 1.0, WinRule::ScoreOnly, false, 3);
        let ranked = tree.search(&board, &empty_visited(), Color::Black, &|x| {
            if x > 0.0 { 1.0 } else { 0.0 }
        });

        assert_eq!(tree.root_visits(), Some(40));
        assert_eq!(ranked.len(), 10, "nine placements plus pass");
        assert!(ranked.contains(&Move::Pass));
    }

    #[test]
    fn test_move_root_keeps_subtree_statistics() {
        let board = Board::new(3, 3, 0.0);
        let mut tree = SearchTree::with_seed(60, 1.0, WinRule::ScoreOnly, false, 5);
        let ranked = tree.search(&board, &empty_visited(), Color::Black, &|x| {
            if x > 0.0 { 1.0 } else { 0.0 }
        });
        let best = ranked[0];

        tree.move_root(Color::Black, best);
        let visits = tree.root_visits().expect("best move was explored");
        assert!(visits > 0, "the advanced root keeps its visit count");
        assert_eq!(tree.root.as_ref().unwrap().color, Color::White);
    }

    #[test]
    fn test_move_root_discards_on_mismatch() {
        let board = Board::new(3, 3, 0.0);
        let mut tree = SearchTree::with_seed(10, 1.0, WinRule::ScoreOnly, false, 5);
        tree.search(&board, &empty_visited(), Color::Black, &|x| x);

        // Wrong color: the whole tree goes.
        tree.move_root(Color::White, Move::Pass);
        assert_eq!(tree.root_visits(), None);
    }

    #[test]
    fn test_seeded_searches_agree() {
        let board = Board::new(3, 3, 0.0);
        let win = |x: f64| if x > 0.0 { 1.0 } else { 0.0 };

        let mut first = SearchTree::with_seed(200, 1.0, WinRule::ScoreOnly, false, 77);
        let mut second = SearchTree::with_seed(200, 1.0, WinRule::ScoreOnly, false, 77);
        let a = first.search(&board, &empty_visited(), Color::Black, &win);
        let b = second.search(&board, &empty_visited(), Color::Black, &win);
        assert_eq!(a, b, "same seed and budget must reproduce the ranking");
    }
}
