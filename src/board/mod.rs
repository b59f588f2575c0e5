/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

/// Legal and pseudo-legal move generation.
mod movegen;

/// The [`Move`] type, move lists, and long-algebraic notation.
mod moves;

/// Perft: move-generation validation by exhaustive tree counting.
mod perft;

/// Pieces, piece kinds, and colors.
mod piece;

/// The [`Position`]: board state, FEN I/O, and reversible make/unmake.
mod position;

/// Pseudo-random number generation for hashing and the opening book.
mod prng;

/// Files, ranks, and squares.
mod square;

/// Position hashing for the transposition table and opening book.
mod zobrist;

pub use moves::*;
pub use perft::*;
pub use piece::*;
pub use position::*;
pub use prng::*;
pub use square::*;
pub use zobrist::*;
