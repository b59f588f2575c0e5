/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use arrayvec::ArrayVec;

use crate::{Move, MoveList, MAX_NUM_MOVES};

/// Yields moves from best to worst by an incremental selection sort.
///
/// Search frequently cuts off after the first move or two, so sorting the
/// whole list up front wastes work; the picker only finds the next-best
/// move when it is actually asked for one.
pub struct MovePicker {
    moves: MoveList,
    scores: ArrayVec<i32, MAX_NUM_MOVES>,
    current: usize,
}

impl MovePicker {
    /// Create a picker over `moves`, scoring each with `score_fn`.
    pub fn new(moves: MoveList, score_fn: impl Fn(&Move) -> i32) -> Self {
        let mut scores = ArrayVec::new();

        for mv in moves.iter() {
            scores.push(score_fn(mv));
        }

        Self {
            moves,
            scores,
            current: 0,
        }
    }
}

impl Iterator for MovePicker {
    type Item = Move;

    fn next(&mut self) -> Option<Self::Item> {
        // No more moves left
        if self.current >= self.moves.len() {
            return None;
        }

        // Find the index of the highest remaining score
        let mut best_index = self.current;
        for i in (self.current + 1)..self.moves.len() {
            if self.scores[i] > self.scores[best_index] {
                best_index = i;
            }
        }

        // Swap it to the front of the unsearched region
        if best_index != self.current {
            self.moves.swap(self.current, best_index);
            self.scores.swap(self.current, best_index);
        }

        let mv = self.moves[self.current];
        self.current += 1;

        Some(mv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Piece, Square};

    #[test]
    fn test_picker_yields_in_descending_score_order() {
        let mut moves = MoveList::new();
        for (i, to) in [Square::A8, Square::B8, Square::C8, Square::D8]
            .into_iter()
            .enumerate()
        {
            moves.push(Move::new(
                Square::from_index(i as u8),
                to,
                Piece::WHITE_ROOK,
                None,
            ));
        }

        // Score by destination file, reversed
        let picker = MovePicker::new(moves, |mv| -(mv.to.index() as i32));
        let picked: Vec<_> = picker.map(|mv| mv.to).collect();

        assert_eq!(picked, [Square::A8, Square::B8, Square::C8, Square::D8]);
    }

    #[test]
    fn test_picker_on_empty_list() {
        let mut picker = MovePicker::new(MoveList::new(), |_| 0);
        assert!(picker.next().is_none());
    }
}
