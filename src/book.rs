/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::time::{SystemTime, UNIX_EPOCH};

use crate::{Move, Position, XoShiRo, ZobristKey};

/// Book lines: a position (as FEN) and the replies worth playing from it.
///
/// Clocks in these FENs are irrelevant; positions are matched by their
/// placement / side / castling / en-passant identity only.
const BOOK_LINES: &[(&str, &[&str])] = &[
    (
        // Starting position
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        &["e2e4", "d2d4", "g1f3", "c2c4"],
    ),
    (
        // 1. e4
        "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1",
        &["e7e5", "c7c5", "e7e6", "c7c6"],
    ),
    (
        // 1. d4
        "rnbqkbnr/pppppppp/8/8/3P4/8/PPP1PPPP/RNBQKBNR b KQkq d3 0 1",
        &["d7d5", "g8f6"],
    ),
    (
        // 1. Nf3
        "rnbqkbnr/pppppppp/8/8/8/5N2/PPPPPPPP/RNBQKB1R b KQkq - 1 1",
        &["g8f6", "d7d5", "c7c5"],
    ),
    (
        // 1. c4
        "rnbqkbnr/pppppppp/8/8/2P5/8/PP1PPPPP/RNBQKBNR b KQkq c3 0 1",
        &["e7e5", "g8f6", "c7c5"],
    ),
    (
        // 1. e4 e5
        "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 2",
        &["g1f3"],
    ),
    (
        // 1. e4 c5
        "rnbqkbnr/pp1ppppp/8/2p5/4P3/8/PPPP1PPP/RNBQKBNR w KQkq c6 0 2",
        &["g1f3", "b1c3"],
    ),
    (
        // 1. e4 e6
        "rnbqkbnr/pppp1ppp/4p3/8/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2",
        &["d2d4"],
    ),
    (
        // 1. e4 c6
        "rnbqkbnr/pp1ppppp/2p5/8/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2",
        &["d2d4"],
    ),
    (
        // 1. d4 d5
        "rnbqkbnr/ppp1pppp/8/3p4/3P4/8/PPP1PPPP/RNBQKBNR w KQkq d6 0 2",
        &["c2c4", "g1f3"],
    ),
    (
        // 1. d4 Nf6
        "rnbqkb1r/pppppppp/5n2/8/3P4/8/PPP1PPPP/RNBQKBNR w KQkq - 1 2",
        &["c2c4", "g1f3"],
    ),
];

/// A small, static [opening book](https://www.chessprogramming.org/Opening_Book).
///
/// Maps the identity keys of a handful of early positions to candidate
/// replies. The driver consults the book before any search; a hit skips the
/// search entirely.
pub struct OpeningBook {
    entries: Vec<(ZobristKey, &'static [&'static str])>,
    prng: XoShiRo,
}

impl OpeningBook {
    /// Build the book, hashing each line's position.
    pub fn new() -> Self {
        let entries = BOOK_LINES
            .iter()
            .filter_map(|(fen, replies)| {
                // Book FENs are compile-time constants; a malformed one is
                // simply skipped
                let position = Position::from_fen(fen).ok()?;
                Some((position.key(), *replies))
            })
            .collect();

        // Seed from the wall clock so repeated games vary their openings
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0x9E37_79B9_7F4A_7C15, |d| d.as_nanos() as u64);

        Self {
            entries,
            prng: XoShiRo::from_seeds([
                nanos | 1,
                nanos.rotate_left(17) | 1,
                nanos.rotate_left(31) | 1,
                nanos.rotate_left(47) | 1,
            ]),
        }
    }

    /// Look up `position` in the book and pick one of its candidate replies.
    ///
    /// Every candidate is validated against the legal move generator before
    /// being trusted; returns `None` on a miss.
    pub fn pick(&mut self, position: &mut Position) -> Option<Move> {
        let key = position.key();
        let replies = self
            .entries
            .iter()
            .find(|(entry_key, _)| *entry_key == key)
            .map(|(_, replies)| *replies)?;

        let legal: Vec<Move> = replies
            .iter()
            .filter_map(|reply| Move::from_uci(position, reply).ok())
            .collect();

        if legal.is_empty() {
            return None;
        }

        Some(legal[self.prng.get_next() as usize % legal.len()])
    }
}

impl Default for OpeningBook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FEN_STARTPOS;

    #[test]
    fn test_every_book_line_parses_and_is_legal() {
        for (fen, replies) in BOOK_LINES {
            let mut position = Position::from_fen(fen).expect(fen);
            for reply in *replies {
                assert!(
                    Move::from_uci(&mut position, reply).is_ok(),
                    "book reply {reply} is illegal in {fen}"
                );
            }
        }
    }

    #[test]
    fn test_book_hits_startpos() {
        let mut book = OpeningBook::new();
        let mut position = Position::from_fen(FEN_STARTPOS).unwrap();

        let mv = book.pick(&mut position).expect("startpos must be in book");
        let text = mv.to_string();
        assert!(["e2e4", "d2d4", "g1f3", "c2c4"].contains(&text.as_str()));
    }

    #[test]
    fn test_book_matches_independent_of_clocks() {
        let mut book = OpeningBook::new();
        // Same placement as after 1. e4, but with nonsense clocks
        let mut position = Position::from_fen(
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 7 33",
        )
        .unwrap();

        assert!(book.pick(&mut position).is_some());
    }

    #[test]
    fn test_book_misses_unknown_positions() {
        let mut book = OpeningBook::new();
        let mut position =
            Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();

        assert!(book.pick(&mut position).is_none());
    }
}
