/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::{Color, File, PieceKind, Position, Psqt, Rank, Score, Square};

/// Sum of [`PieceKind::phase_weight`] with all pieces on the board.
///
/// A phase of 24 is the pure middle-game; 0 is the pure endgame.
pub const MAX_PHASE: i32 = 24;

/// Bonus for holding both bishops.
const BISHOP_PAIR_BONUS: i32 = 50;

/// Penalty per extra pawn stacked on a file.
const DOUBLED_PAWN_PENALTY: i32 = -15;

/// Penalty per pawn with no friendly pawn on either adjacent file.
const ISOLATED_PAWN_PENALTY: i32 = -15;

/// Bonus for a passed pawn, indexed by its rank as seen from its own side.
const PASSED_PAWN_BONUS: [i32; Rank::COUNT] = [0, 5, 10, 20, 40, 60, 100, 200];

/// Bonus for a rook on a file with no pawns at all.
const ROOK_OPEN_FILE_BONUS: i32 = 25;

/// Bonus for a rook on a file with no friendly pawns but at least one enemy pawn.
const ROOK_SEMI_OPEN_FILE_BONUS: i32 = 15;

/// Bonus for a rook on its seventh rank.
const ROOK_ON_SEVENTH_BONUS: i32 = 30;

/// Weight per point of legal-move-count difference.
const MOBILITY_WEIGHT: i32 = 3;

/// Encapsulates the logic of scoring a chess position.
///
/// Internally, a high score is good for White and a low score is good for
/// Black; the final result is negated as needed so that the returned score is
/// always from the side-to-move's perspective, as negamax requires.
///
/// The evaluator borrows the position mutably because the mobility term
/// counts legal moves for both players; the position is restored exactly
/// before the evaluator returns.
pub struct Evaluator<'a> {
    position: &'a mut Position,
}

impl<'a> Evaluator<'a> {
    #[inline(always)]
    pub fn new(position: &'a mut Position) -> Self {
        Self { position }
    }

    /// Evaluate this position from the side-to-move's perspective.
    ///
    /// A positive number is good for the side-to-move, a negative number is
    /// good for the opponent, and 0 is considered equal.
    pub fn eval(mut self) -> Score {
        let mut mg = 0;
        let mut eg = 0;
        let mut phase = 0;

        // Per-color pawn counts by file, and bishop counts, gathered during
        // the material scan and consumed by the structural terms below
        let mut pawns_on_file = [[0i32; File::COUNT]; Color::COUNT];
        let mut bishops = [0; Color::COUNT];

        for square in Square::iter() {
            let Some(piece) = self.position.piece_at(square) else {
                continue;
            };

            let (mg_value, eg_value) = Psqt::evals(piece, square);
            let sign = piece.color.sign();
            mg += sign * mg_value;
            eg += sign * eg_value;
            phase += piece.kind.phase_weight();

            match piece.kind {
                PieceKind::Pawn => {
                    pawns_on_file[piece.color.index()][square.file().index()] += 1;
                }
                PieceKind::Bishop => bishops[piece.color.index()] += 1,
                _ => {}
            }
        }

        // Interpolate between the tables; promotions can push the raw phase
        // past the all-pieces maximum
        let phase = phase.min(MAX_PHASE);
        let mut score = (mg * phase + eg * (MAX_PHASE - phase)) / MAX_PHASE;

        for color in [Color::White, Color::Black] {
            let sign = color.sign();

            if bishops[color.index()] >= 2 {
                score += sign * BISHOP_PAIR_BONUS;
            }

            score += sign * pawn_file_terms(&pawns_on_file, color);
        }

        score += self.piece_placement_terms(&pawns_on_file);
        score += self.mobility();

        // Flip the White-positive total to the side-to-move's perspective
        Score::new(score * self.position.side_to_move().sign())
    }

    /// Passed-pawn and rook-placement terms, which depend on where pieces
    /// stand rather than only on file counts. White-positive.
    fn piece_placement_terms(&self, pawns_on_file: &[[i32; File::COUNT]; Color::COUNT]) -> i32 {
        let mut score = 0;

        for square in Square::iter() {
            let Some(piece) = self.position.piece_at(square) else {
                continue;
            };
            let color = piece.color;
            let sign = color.sign();

            match piece.kind {
                PieceKind::Pawn => {
                    if self.is_passed(square, color) {
                        score += sign * PASSED_PAWN_BONUS[square.relative_rank(color).index()];
                    }
                }

                PieceKind::Rook => {
                    let file = square.file().index();
                    let own = pawns_on_file[color.index()][file];
                    let enemy = pawns_on_file[color.opponent().index()][file];

                    if own == 0 && enemy == 0 {
                        score += sign * ROOK_OPEN_FILE_BONUS;
                    } else if own == 0 {
                        score += sign * ROOK_SEMI_OPEN_FILE_BONUS;
                    }

                    if square.relative_rank(color) == Rank::SEVENTH {
                        score += sign * ROOK_ON_SEVENTH_BONUS;
                    }
                }

                _ => {}
            }
        }

        score
    }

    /// A pawn is passed iff no enemy pawn exists on its own or an adjacent
    /// file, strictly ahead of it from its side's perspective.
    fn is_passed(&self, square: Square, color: Color) -> bool {
        let enemy_pawn = crate::Piece::new(color.opponent(), PieceKind::Pawn);
        let dir = color.pawn_direction();

        let mut front = square;
        while let Some(ahead) = front.offset(dir) {
            for delta in [-1i8, 0, 1] {
                let Some(guard) = ahead.offset(delta) else {
                    continue;
                };
                if ahead.file_distance(guard) <= 1 && self.position.piece_at(guard) == Some(enemy_pawn)
                {
                    return false;
                }
            }
            front = ahead;
        }

        true
    }

    /// Legal-move-count difference, weighted. White-positive.
    ///
    /// Both players are counted by flipping the side to move and flipping it
    /// back, leaving the position untouched.
    fn mobility(&mut self) -> i32 {
        let stm = self.position.side_to_move();

        let own = self.position.count_legal_moves() as i32;
        self.position.toggle_side_to_move();
        let enemy = self.position.count_legal_moves() as i32;
        self.position.toggle_side_to_move();

        MOBILITY_WEIGHT * (own - enemy) * stm.sign()
    }
}

/// Doubled and isolated pawn penalties for `color`, from its own perspective
/// (more positive is better for `color`).
fn pawn_file_terms(pawns_on_file: &[[i32; File::COUNT]; Color::COUNT], color: Color) -> i32 {
    let own = &pawns_on_file[color.index()];
    let mut score = 0;

    for file in 0..File::COUNT {
        let count = own[file];
        if count == 0 {
            continue;
        }

        score += DOUBLED_PAWN_PENALTY * (count - 1);

        let left = file.checked_sub(1).map_or(0, |f| own[f]);
        let right = own.get(file + 1).copied().unwrap_or(0);
        if left == 0 && right == 0 {
            score += ISOLATED_PAWN_PENALTY * count;
        }
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FEN_STARTPOS;

    fn eval_fen(fen: &str) -> Score {
        let mut pos = Position::from_fen(fen).unwrap();
        Evaluator::new(&mut pos).eval()
    }

    #[test]
    fn test_mirrored_position_is_balanced() {
        // Black's pieces stand on the point-mirror (63 - sq) of White's, so
        // every term cancels exactly
        assert_eq!(eval_fen("3k3r/8/8/8/8/8/8/R3K3 w - - 0 1"), Score::DRAW);
    }

    #[test]
    fn test_startpos_is_roughly_balanced() {
        let score = eval_fen(FEN_STARTPOS);
        assert!(score.abs() < Score::new(150), "startpos scored {score}");
    }

    #[test]
    fn test_eval_does_not_mutate_position() {
        let mut pos =
            Position::from_fen("rnbqkbnr/ppp1pppp/8/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 3")
                .unwrap();
        let before = pos.clone();

        let _ = Evaluator::new(&mut pos).eval();
        assert_eq!(pos, before);
    }

    #[test]
    fn test_eval_is_antisymmetric_under_side_flip() {
        // Identical positions, differing only in whose turn it is
        for fen in [
            "r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4",
            "8/5pk1/6p1/8/3N4/8/5PPP/6K1 w - - 0 1",
        ] {
            let white_view = eval_fen(fen);
            let black_view = eval_fen(&fen.replacen(" w ", " b ", 1));
            assert_eq!(white_view, -black_view, "{fen}");
        }
    }

    #[test]
    fn test_material_advantage_dominates() {
        // White is up a queen
        let score = eval_fen("3k4/8/8/8/8/8/8/3QK3 w - - 0 1");
        assert!(score > Score::new(700));

        // Same position from Black's point of view
        let score = eval_fen("3k4/8/8/8/8/8/8/3QK3 b - - 0 1");
        assert!(score < Score::new(-700));
    }

    #[test]
    fn test_passed_pawn_is_rewarded() {
        // Identical except White's e-pawn is passed in the first position
        let passed = eval_fen("4k3/8/8/4P3/8/8/8/4K3 w - - 0 1");
        let blocked = eval_fen("4k3/4p3/8/4P3/8/8/8/4K3 w - - 0 1");
        assert!(passed > blocked);
    }

    #[test]
    fn test_doubled_pawns_are_penalized() {
        let healthy = eval_fen("4k3/8/8/8/8/4P3/3P4/4K3 w - - 0 1");
        let doubled = eval_fen("4k3/8/8/8/8/3P4/3P4/4K3 w - - 0 1");
        assert!(healthy > doubled);
    }

    #[test]
    fn test_rook_prefers_open_file() {
        // The rook on an open file vs locked behind its own pawn
        let open = eval_fen("4k3/8/8/8/8/8/4P3/R3K3 w - - 0 1");
        let closed = eval_fen("4k3/8/8/8/8/8/P7/R3K3 w - - 0 1");
        assert!(open > closed);
    }
}
