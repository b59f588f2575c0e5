/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use anyhow::{anyhow, bail, Result};
use arrayvec::ArrayVec;

use crate::{Piece, PieceKind, Position, Square};

/// Maximum number of legal moves possible in a single chess position.
pub const MAX_NUM_MOVES: usize = 218;

/// A list of moves, bounded by the maximum number possible in one position.
pub type MoveList = ArrayVec<Move, MAX_NUM_MOVES>;

/// A single chess move.
///
/// Carries everything make/unmake needs besides the restorable position
/// state (castling rights, en passant target, halfmove clock), which the
/// undo stack saves separately.
///
/// For an en passant capture, `captured` is the enemy pawn, *not* the
/// contents of `to` (which is empty).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub piece: Piece,
    pub captured: Option<Piece>,
    pub promotion: Option<PieceKind>,
    pub is_en_passant: bool,
    pub is_castle: bool,
}

impl Move {
    /// Construct a quiet move (or simple capture) of `piece` from `from` to `to`.
    #[inline(always)]
    pub const fn new(from: Square, to: Square, piece: Piece, captured: Option<Piece>) -> Self {
        Self {
            from,
            to,
            piece,
            captured,
            promotion: None,
            is_en_passant: false,
            is_castle: false,
        }
    }

    #[inline(always)]
    pub const fn is_capture(&self) -> bool {
        self.captured.is_some()
    }

    /// A quiet move is neither a capture nor a promotion.
    #[inline(always)]
    pub const fn is_quiet(&self) -> bool {
        self.captured.is_none() && self.promotion.is_none()
    }

    /// Returns `true` if this is a pawn double-push (the only move that sets
    /// an en passant target).
    #[inline(always)]
    pub const fn is_double_push(&self) -> bool {
        matches!(self.piece.kind, PieceKind::Pawn) && self.from.0.abs_diff(self.to.0) == 16
    }

    /// Returns `true` if `self` and `other` describe the same `from`/`to`
    /// (and promotion, when present).
    ///
    /// Used to match moves coming from the transposition table or killer
    /// slots, which may have been recorded for a different occupancy.
    #[inline(always)]
    pub fn is_same_as(&self, other: &Self) -> bool {
        self.from == other.from && self.to == other.to && self.promotion == other.promotion
    }

    /// Resolves long-algebraic move text (`e2e4`, `e7e8q`) against the legal
    /// moves of `position`.
    ///
    /// Fails if the text is malformed or if no legal move matches.
    pub fn from_uci(position: &mut Position, mv_str: &str) -> Result<Self> {
        if !mv_str.is_ascii() || (mv_str.len() != 4 && mv_str.len() != 5) {
            bail!("invalid move text {mv_str:?}; expected <from><to>[qrbn]");
        }

        let from = mv_str[0..2].parse::<Square>()?;
        let to = mv_str[2..4].parse::<Square>()?;
        let promotion = mv_str
            .chars()
            .nth(4)
            .map(PieceKind::from_promotion_char)
            .transpose()?;

        position
            .get_legal_moves()
            .into_iter()
            .find(|mv| mv.from == from && mv.to == to && mv.promotion == promotion)
            .ok_or_else(|| anyhow!("move {mv_str:?} is not legal in the current position"))
    }
}

impl fmt::Display for Move {
    /// Formats this move in long algebraic notation: `<from><to>[promotion]`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(kind) = self.promotion {
            write!(f, "{}", kind.char())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Color, FEN_STARTPOS};

    #[test]
    fn test_move_display() {
        let mv = Move::new(
            Square::E1,
            Square::from_index(28),
            Piece::new(Color::White, PieceKind::Rook),
            None,
        );
        assert_eq!(mv.to_string(), "e1e4");

        let promo = Move {
            promotion: Some(PieceKind::Queen),
            ..Move::new(
                Square::from_index(52),
                Square::E8,
                Piece::WHITE_PAWN,
                None,
            )
        };
        assert_eq!(promo.to_string(), "e7e8q");
    }

    #[test]
    fn test_from_uci_resolves_legal_moves() {
        let mut pos = Position::from_fen(FEN_STARTPOS).unwrap();
        let mv = Move::from_uci(&mut pos, "e2e4").unwrap();
        assert_eq!(mv.piece.kind, PieceKind::Pawn);
        assert!(mv.is_double_push());

        assert!(Move::from_uci(&mut pos, "e2e5").is_err());
        assert!(Move::from_uci(&mut pos, "xyzw").is_err());
        assert!(Move::from_uci(&mut pos, "e2").is_err());
    }
}
