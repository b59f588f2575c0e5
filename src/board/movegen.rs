/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use super::position::{DIAGONAL_DELTAS, KING_DELTAS, KNIGHT_DELTAS, ORTHOGONAL_DELTAS};
use crate::{Color, Move, MoveList, Piece, PieceKind, Position, Rank, Square};

/// Queens slide along every ray a bishop or rook can.
const QUEEN_DELTAS: [i8; 8] = [1, -1, 8, -8, 7, 9, -7, -9];

impl Position {
    /// Generates all legal moves for the side to move.
    ///
    /// Generation is pseudo-legal-then-filter: each candidate is played on the
    /// board, rejected if it leaves the mover's king attacked, and unplayed.
    pub fn get_legal_moves(&mut self) -> MoveList {
        let color = self.side_to_move();
        let mut moves = self.get_pseudo_legal_moves();

        moves.retain(|&mut mv| {
            self.make_move(mv);
            let legal = !self.is_in_check(color);
            self.unmake_move();
            legal
        });

        moves
    }

    /// Counts the legal moves available to the side to move.
    ///
    /// Used by the evaluator's mobility term; the side to move is flipped by
    /// the caller to count both players.
    pub fn count_legal_moves(&mut self) -> usize {
        self.get_legal_moves().len()
    }

    /// Generates all pseudo-legal moves for the side to move: moves respecting
    /// piece geometry and blockers that may still leave the own king in check.
    pub fn get_pseudo_legal_moves(&self) -> MoveList {
        let color = self.side_to_move();
        let mut moves = MoveList::new();

        for from in Square::iter() {
            let Some(piece) = self.piece_at(from) else {
                continue;
            };
            if piece.color != color {
                continue;
            }

            match piece.kind {
                PieceKind::Pawn => self.pawn_moves(from, piece, &mut moves),
                PieceKind::Knight => self.step_moves(from, piece, KNIGHT_DELTAS, 2, &mut moves),
                PieceKind::King => self.step_moves(from, piece, KING_DELTAS, 1, &mut moves),
                PieceKind::Bishop => self.slider_moves(from, piece, &DIAGONAL_DELTAS, &mut moves),
                PieceKind::Rook => self.slider_moves(from, piece, &ORTHOGONAL_DELTAS, &mut moves),
                PieceKind::Queen => self.slider_moves(from, piece, &QUEEN_DELTAS, &mut moves),
            }
        }

        self.castling_moves(color, &mut moves);

        moves
    }

    /// Single-step movers (knights and kings). `max_file_step` rejects moves
    /// that wrap around the board edge.
    fn step_moves(
        &self,
        from: Square,
        piece: Piece,
        deltas: [i8; 8],
        max_file_step: u8,
        moves: &mut MoveList,
    ) {
        for delta in deltas {
            let Some(to) = from.offset(delta) else {
                continue;
            };
            if from.file_distance(to) > max_file_step {
                continue;
            }

            match self.piece_at(to) {
                None => moves.push(Move::new(from, to, piece, None)),
                Some(occupant) if occupant.color != piece.color => {
                    moves.push(Move::new(from, to, piece, Some(occupant)));
                }
                Some(_) => {}
            }
        }
    }

    /// Sliding movers walk each ray until blocked, including the blocker's
    /// square if it holds an enemy piece.
    fn slider_moves(&self, from: Square, piece: Piece, deltas: &[i8], moves: &mut MoveList) {
        for &delta in deltas {
            let mut current = from;
            while let Some(to) = current.offset(delta) {
                if current.file_distance(to) > 1 {
                    break;
                }

                match self.piece_at(to) {
                    None => {
                        moves.push(Move::new(from, to, piece, None));
                        current = to;
                    }
                    Some(occupant) => {
                        if occupant.color != piece.color {
                            moves.push(Move::new(from, to, piece, Some(occupant)));
                        }
                        break;
                    }
                }
            }
        }
    }

    fn pawn_moves(&self, from: Square, piece: Piece, moves: &mut MoveList) {
        let color = piece.color;
        let dir = color.pawn_direction();

        // Single push, and double push from the starting rank
        if let Some(to) = from.offset(dir) {
            if self.piece_at(to).is_none() {
                push_pawn_move(Move::new(from, to, piece, None), moves);

                if from.rank() == Rank::pawn_rank(color) {
                    if let Some(double) = to.offset(dir) {
                        if self.piece_at(double).is_none() {
                            moves.push(Move::new(from, double, piece, None));
                        }
                    }
                }
            }
        }

        // Diagonal captures, including en passant
        for delta in [dir - 1, dir + 1] {
            let Some(to) = from.offset(delta) else {
                continue;
            };
            if from.file_distance(to) != 1 {
                continue;
            }

            match self.piece_at(to) {
                Some(occupant) if occupant.color != color => {
                    push_pawn_move(Move::new(from, to, piece, Some(occupant)), moves);
                }
                None if Some(to) == self.ep_square() => {
                    moves.push(Move {
                        captured: Some(Piece::new(color.opponent(), PieceKind::Pawn)),
                        is_en_passant: true,
                        ..Move::new(from, to, piece, None)
                    });
                }
                _ => {}
            }
        }
    }

    /// Castling: the king must not be in check, the path between king and rook
    /// must be empty, and no square the king crosses or lands on may be
    /// attacked.
    fn castling_moves(&self, color: Color, moves: &mut MoveList) {
        let (home, kingside, queenside, queenside_gap) = match color {
            Color::White => (Square::E1, [Square::F1, Square::G1], [Square::D1, Square::C1], Square::B1),
            Color::Black => (Square::E8, [Square::F8, Square::G8], [Square::D8, Square::C8], Square::B8),
        };

        // Rights without a king on its home square can only come from a
        // nonsensical FEN; there is nothing to generate
        if self.king_square(color) != home || self.in_check() {
            return;
        }

        let enemy = color.opponent();
        let king = Piece::new(color, PieceKind::King);

        if self.castling_rights().kingside(color)
            && kingside.iter().all(|&sq| self.piece_at(sq).is_none())
            && !kingside.iter().any(|&sq| self.is_attacked(sq, enemy))
        {
            moves.push(Move {
                is_castle: true,
                ..Move::new(home, kingside[1], king, None)
            });
        }

        if self.castling_rights().queenside(color)
            && self.piece_at(queenside_gap).is_none()
            && queenside.iter().all(|&sq| self.piece_at(sq).is_none())
            && !queenside.iter().any(|&sq| self.is_attacked(sq, enemy))
        {
            moves.push(Move {
                is_castle: true,
                ..Move::new(home, queenside[1], king, None)
            });
        }
    }
}

/// Pushes a pawn move, expanding it into all four promotions when it reaches
/// the final rank.
fn push_pawn_move(mv: Move, moves: &mut MoveList) {
    if mv.to.rank() == Rank::EIGHTH || mv.to.rank() == Rank::FIRST {
        for kind in PieceKind::PROMOTIONS {
            moves.push(Move {
                promotion: Some(kind),
                ..mv
            });
        }
    } else {
        moves.push(mv);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FEN_KIWIPETE, FEN_STARTPOS};

    fn legal_move_count(fen: &str) -> usize {
        Position::from_fen(fen).unwrap().get_legal_moves().len()
    }

    #[test]
    fn test_startpos_has_twenty_moves() {
        assert_eq!(legal_move_count(FEN_STARTPOS), 20);
    }

    #[test]
    fn test_kiwipete_has_fortyeight_moves() {
        assert_eq!(legal_move_count(FEN_KIWIPETE), 48);
    }

    #[test]
    fn test_en_passant_is_generated() {
        let mut pos =
            Position::from_fen("rnbqkbnr/ppp1pppp/8/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 3")
                .unwrap();

        let ep = pos
            .get_legal_moves()
            .into_iter()
            .find(|mv| mv.is_en_passant)
            .expect("e5d6 en passant should be legal");

        assert_eq!(ep.to_string(), "e5d6");
        assert_eq!(ep.captured, Some(Piece::BLACK_PAWN));
    }

    #[test]
    fn test_pinned_en_passant_is_rejected() {
        // Capturing en passant would expose the white king along the 5th rank
        let mut pos = Position::from_fen("8/8/8/KPp4r/8/8/6k1/8 w - c6 0 2").unwrap();

        assert!(pos
            .get_legal_moves()
            .into_iter()
            .all(|mv| !mv.is_en_passant));
    }

    #[test]
    fn test_castling_through_attack_is_illegal() {
        // A rook on f8 covers f1, so white may not castle kingside
        let mut pos = Position::from_fen("r4rk1/8/8/8/8/8/8/R3K2R w KQ - 0 1").unwrap();
        let moves = pos.get_legal_moves();

        assert!(!moves.iter().any(|mv| mv.to_string() == "e1g1"));
        // Queenside is unaffected
        assert!(moves.iter().any(|mv| mv.to_string() == "e1c1"));
    }

    #[test]
    fn test_castling_blocked_by_piece() {
        let mut pos = Position::from_fen("4k3/8/8/8/8/8/8/R2QK2R w KQ - 0 1").unwrap();
        let moves = pos.get_legal_moves();

        assert!(moves.iter().any(|mv| mv.to_string() == "e1g1"));
        assert!(!moves.iter().any(|mv| mv.to_string() == "e1c1"));
    }

    #[test]
    fn test_castling_illegal_while_in_check() {
        let mut pos = Position::from_fen("4k3/8/8/8/8/8/4r3/R3K2R w KQ - 0 1").unwrap();

        assert!(pos.get_legal_moves().iter().all(|mv| !mv.is_castle));
    }

    #[test]
    fn test_promotions_expand_to_four_moves() {
        let mut pos = Position::from_fen("8/P6k/8/8/8/8/8/K7 w - - 0 1").unwrap();

        let promotions: Vec<_> = pos
            .get_legal_moves()
            .into_iter()
            .filter(|mv| mv.promotion.is_some())
            .collect();

        assert_eq!(promotions.len(), 4);
    }

    #[test]
    fn test_stalemate_has_no_moves_and_no_check() {
        let mut pos = Position::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();

        assert!(pos.get_legal_moves().is_empty());
        assert!(!pos.in_check());
    }

    #[test]
    fn test_moves_never_leave_own_king_in_check() {
        let mut pos = Position::from_fen(FEN_KIWIPETE).unwrap();
        let color = pos.side_to_move();

        for mv in pos.get_legal_moves() {
            pos.make_move(mv);
            assert!(!pos.is_in_check(color), "{mv} leaves the king en prise");
            pos.unmake_move();
        }
    }
}
