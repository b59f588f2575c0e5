/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt::Write;

use crate::Position;

/// Counts the leaf nodes of the legal-move tree at `depth` from `position`.
///
/// See [CPW](https://www.chessprogramming.org/Perft) for reference values;
/// perft is the canonical way to validate a move generator.
pub fn perft(position: &mut Position, depth: usize) -> u64 {
    if depth == 0 {
        return 1;
    }

    let moves = position.get_legal_moves();

    // At the horizon, the number of leaves is just the number of moves
    if depth == 1 {
        return moves.len() as u64;
    }

    let mut nodes = 0;
    for mv in moves {
        position.make_move(mv);
        nodes += perft(position, depth - 1);
        position.unmake_move();
    }

    nodes
}

/// Like [`perft`], but lists the per-move subtotals for the root's moves,
/// followed by the total. Useful for diffing against another engine.
pub fn splitperft(position: &mut Position, depth: usize) -> String {
    let mut out = String::new();
    let mut nodes = 0;

    if depth > 0 {
        for mv in position.get_legal_moves() {
            position.make_move(mv);
            let subtotal = perft(position, depth - 1);
            position.unmake_move();

            nodes += subtotal;
            let _ = writeln!(out, "{mv}: {subtotal}");
        }
    }

    let _ = write!(out, "\n{nodes}");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FEN_KIWIPETE, FEN_STARTPOS};

    #[test]
    fn test_startpos_shallow_perft() {
        let mut pos = Position::from_fen(FEN_STARTPOS).unwrap();
        assert_eq!(perft(&mut pos, 1), 20);
        assert_eq!(perft(&mut pos, 2), 400);
    }

    #[test]
    fn test_kiwipete_shallow_perft() {
        let mut pos = Position::from_fen(FEN_KIWIPETE).unwrap();
        assert_eq!(perft(&mut pos, 1), 48);
        assert_eq!(perft(&mut pos, 2), 2039);
    }

    #[test]
    fn test_perft_leaves_position_untouched() {
        let mut pos = Position::from_fen(FEN_KIWIPETE).unwrap();
        let before = pos.clone();
        perft(&mut pos, 3);
        assert_eq!(pos, before);
    }
}
