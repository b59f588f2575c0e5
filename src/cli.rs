/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use clap::Parser;
use uci_parser::UciCommand;

/// A command to be sent to the engine.
///
/// UCI commands arrive through the [`EngineCommand::Uci`] variant; everything
/// else is the REPL surface for poking at the engine directly.
#[derive(Debug, Clone, Parser)]
#[command(multicall = true, about, rename_all = "lower")]
pub enum EngineCommand {
    /// Print a visual representation of the current board state.
    #[command(alias = "d")]
    Display,

    /// Print an evaluation of the current position.
    Eval,

    /// Quit the engine.
    #[command(alias = "quit")]
    Exit,

    /// Generate and print a FEN string for the current position.
    Fen,

    /// Display information about the transposition table.
    #[command(aliases = ["tt", "ttable"])]
    HashInfo,

    /// Apply the provided move to the game, if it is legal.
    MakeMove {
        /// The move to apply, in long algebraic notation (e.g. `e2e4`, `e7e8q`).
        mv_string: String,
    },

    /// Show all legal moves in the current position.
    ///
    /// If `square` is provided, only moves originating there are shown.
    Moves { square: Option<String> },

    /// Perform a perft on the current position at the supplied depth,
    /// printing the total node count.
    Perft { depth: usize },

    /// Perform a split perft on the current position at the supplied depth.
    #[command(alias = "sperft")]
    Splitperft { depth: usize },

    /// Execute a UCI command on the engine.
    ///
    /// Not part of the REPL grammar; constructed by the input handler when a
    /// line parses as UCI.
    #[command(skip)]
    Uci { cmd: UciCommand },
}
