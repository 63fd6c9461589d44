//! Tenuki: a Monte Carlo playing engine for Go-like capture games.
//!
//! The engine keeps a dynamically sized board with incremental group and
//! liberty tracking, searches with UCT over whole-game playouts, and wraps
//! both behind players that manage a live game, including the capture
//! variant where a fixed number of captures wins.
//!
//! ## Modules
//!
//! - [`constants`] - Board limits and engine parameters
//! - [`board`] - Board state, blocks, captures, ko and scoring
//! - [`mcts`] - UCT tree search over whole-game playouts
//! - [`player`] - Live-game player for the plain game
//! - [`capture`] - Player for the capture variant
//!
//! ## Example
//!
//! ```
//! use tenuki::board::Color;
//! use tenuki::player::{Action, Player};
//!
//! // A small game with a modest search budget.
//! let mut player = Player::new(100);
//! player.new_game(5, 5, 0.5, false, true).unwrap();
//!
//! // The opponent opens; the engine answers.
//! player.place_move(Color::Black, 2, 2);
//! match player.gen_move(Color::White) {
//!     Action::Play((row, col)) => println!("reply at ({row}, {col})"),
//!     Action::Pass => println!("pass"),
//!     Action::Resign => println!("resign"),
//! }
//! ```

pub mod board;
pub mod capture;
pub mod constants;
pub mod mcts;
pub mod player;
