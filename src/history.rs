/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::{Move, Square, MAX_PLY};

/// Cap on a single history score; when any entry climbs past this, the whole
/// table decays so old successes fade.
const MAX_HISTORY: i32 = 1_000_000;

/// Stores bonuses for quiet moves that caused beta-cutoffs during search,
/// indexed by the move's origin and destination squares.
///
/// See [CPW](https://www.chessprogramming.org/History_Heuristic) for more.
#[derive(Debug)]
pub struct HistoryTable([[i32; Square::COUNT]; Square::COUNT]);

impl HistoryTable {
    /// Fetch the score for the move from `from` to `to`.
    #[inline(always)]
    pub fn get(&self, mv: &Move) -> i32 {
        self.0[mv.from.index()][mv.to.index()]
    }

    /// Credit a quiet move that caused a beta-cutoff at `depth` remaining.
    ///
    /// The bonus grows quadratically with depth, so cutoffs near the root
    /// dominate those at the leaves.
    pub fn update(&mut self, mv: &Move, depth: u8) {
        let slot = &mut self.0[mv.from.index()][mv.to.index()];
        *slot += depth as i32 * depth as i32;

        if *slot > MAX_HISTORY {
            self.decay();
        }
    }

    /// Scale every score down to three quarters of its value.
    fn decay(&mut self) {
        for from in self.0.iter_mut() {
            for score in from.iter_mut() {
                *score = *score * 3 / 4;
            }
        }
    }
}

impl Default for HistoryTable {
    #[inline(always)]
    fn default() -> Self {
        Self([[0; Square::COUNT]; Square::COUNT])
    }
}

/// Two [killer-move](https://www.chessprogramming.org/Killer_Move) slots per
/// search ply: quiet moves that caused a beta-cutoff at the same distance
/// from the root, tried early when they reappear in sibling nodes.
#[derive(Debug)]
pub struct KillerTable([[Option<Move>; 2]; MAX_PLY]);

impl KillerTable {
    /// Record a quiet move that caused a beta-cutoff at `ply`.
    ///
    /// A new killer shifts the previous one into the second slot; a move
    /// already in the first slot is left alone.
    pub fn store(&mut self, ply: i32, mv: Move) {
        let slots = &mut self.0[ply as usize % MAX_PLY];

        if slots[0].map_or(true, |killer| !killer.is_same_as(&mv)) {
            slots[1] = slots[0];
            slots[0] = Some(mv);
        }
    }

    /// Returns `true` if `mv` occupies either killer slot for `ply`.
    #[inline(always)]
    pub fn is_killer(&self, ply: i32, mv: &Move) -> bool {
        self.0[ply as usize % MAX_PLY]
            .iter()
            .flatten()
            .any(|killer| killer.is_same_as(mv))
    }
}

impl Default for KillerTable {
    #[inline(always)]
    fn default() -> Self {
        Self([[None; 2]; MAX_PLY])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Piece, Square};

    fn quiet(from: Square, to: Square) -> Move {
        Move::new(from, to, Piece::WHITE_ROOK, None)
    }

    #[test]
    fn test_history_grows_quadratically() {
        let mut history = HistoryTable::default();
        let mv = quiet(Square::A1, Square::A8);

        history.update(&mv, 3);
        assert_eq!(history.get(&mv), 9);

        history.update(&mv, 5);
        assert_eq!(history.get(&mv), 34);
    }

    #[test]
    fn test_history_decays_when_saturated() {
        let mut history = HistoryTable::default();
        let hot = quiet(Square::A1, Square::A8);
        let warm = quiet(Square::B1, Square::B8);

        history.update(&warm, 100); // 10_000

        // Hammer one move until its score trips the decay, which scales
        // every entry in the table
        while history.get(&warm) == 10_000 {
            history.update(&hot, 200); // +40_000 per cutoff
        }

        assert!(history.get(&hot) <= MAX_HISTORY);
        assert_eq!(history.get(&warm), 7_500);
    }

    #[test]
    fn test_killers_shift() {
        let mut killers = KillerTable::default();
        let first = quiet(Square::A1, Square::A8);
        let second = quiet(Square::B1, Square::B8);

        killers.store(3, first);
        assert!(killers.is_killer(3, &first));
        assert!(!killers.is_killer(2, &first));

        killers.store(3, second);
        assert!(killers.is_killer(3, &second));
        // The old killer survives in the second slot
        assert!(killers.is_killer(3, &first));

        // Re-storing the current killer does not evict the runner-up
        killers.store(3, second);
        assert!(killers.is_killer(3, &first));
    }
}
