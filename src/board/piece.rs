/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use anyhow::{bail, Result};

/// The color of a player or piece.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Color {
    #[default]
    White = 0,
    Black = 1,
}

impl Color {
    pub const COUNT: usize = 2;

    #[inline(always)]
    pub const fn index(&self) -> usize {
        *self as usize
    }

    #[inline(always)]
    pub const fn opponent(&self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    #[inline(always)]
    pub const fn is_white(&self) -> bool {
        matches!(self, Self::White)
    }

    /// The direction (in board indices) that `self`'s pawns advance.
    #[inline(always)]
    pub const fn pawn_direction(&self) -> i8 {
        match self {
            Self::White => 8,
            Self::Black => -8,
        }
    }

    /// `+1` for White, `-1` for Black; used to orient White-positive scores.
    #[inline(always)]
    pub const fn sign(&self) -> i32 {
        match self {
            Self::White => 1,
            Self::Black => -1,
        }
    }

    #[inline(always)]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Black => "black",
        }
    }

    /// Parses the FEN active-color field (`w` | `b`).
    pub fn from_fen(s: &str) -> Result<Self> {
        match s {
            "w" => Ok(Self::White),
            "b" => Ok(Self::Black),
            _ => bail!("invalid active color {s:?}; expected \"w\" or \"b\""),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", if self.is_white() { 'w' } else { 'b' })
    }
}

/// The kind of a chess piece, independent of its color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum PieceKind {
    Pawn = 0,
    Knight = 1,
    Bishop = 2,
    Rook = 3,
    Queen = 4,
    King = 5,
}

impl PieceKind {
    pub const COUNT: usize = 6;

    /// All piece kinds, in ascending order of value.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Pawn,
        Self::Knight,
        Self::Bishop,
        Self::Rook,
        Self::Queen,
        Self::King,
    ];

    /// Kinds a pawn may promote to.
    pub const PROMOTIONS: [Self; 4] = [Self::Queen, Self::Rook, Self::Bishop, Self::Knight];

    #[inline(always)]
    pub const fn index(&self) -> usize {
        *self as usize
    }

    /// Material value of this kind, in centipawns.
    ///
    /// Values from <https://www.chessprogramming.org/Simplified_Evaluation_Function>.
    #[inline(always)]
    pub const fn value(&self) -> i32 {
        match self {
            Self::Pawn => 100,
            Self::Knight => 320,
            Self::Bishop => 330,
            Self::Rook => 500,
            Self::Queen => 900,
            Self::King => 20_000,
        }
    }

    /// Contribution of this kind to the game-phase sum (max 24 with all pieces).
    #[inline(always)]
    pub const fn phase_weight(&self) -> i32 {
        match self {
            Self::Knight | Self::Bishop => 1,
            Self::Rook => 2,
            Self::Queen => 4,
            Self::Pawn | Self::King => 0,
        }
    }

    /// Lowercase character for this kind, as used in FEN and promotion suffixes.
    #[inline(always)]
    pub const fn char(&self) -> char {
        match self {
            Self::Pawn => 'p',
            Self::Knight => 'n',
            Self::Bishop => 'b',
            Self::Rook => 'r',
            Self::Queen => 'q',
            Self::King => 'k',
        }
    }

    /// Parses a promotion suffix character (`q` | `r` | `b` | `n`).
    pub fn from_promotion_char(c: char) -> Result<Self> {
        match c {
            'q' => Ok(Self::Queen),
            'r' => Ok(Self::Rook),
            'b' => Ok(Self::Bishop),
            'n' => Ok(Self::Knight),
            _ => bail!("invalid promotion character {c:?}"),
        }
    }

    #[inline(always)]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Pawn => "pawn",
            Self::Knight => "knight",
            Self::Bishop => "bishop",
            Self::Rook => "rook",
            Self::Queen => "queen",
            Self::King => "king",
        }
    }
}

/// A chess piece: a [`PieceKind`] belonging to a [`Color`].
///
/// An empty square is represented as `Option::<Piece>::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Piece {
    pub color: Color,
    pub kind: PieceKind,
}

impl Piece {
    pub const COUNT: usize = PieceKind::COUNT * Color::COUNT;

    pub const WHITE_PAWN: Self = Self::new(Color::White, PieceKind::Pawn);
    pub const WHITE_ROOK: Self = Self::new(Color::White, PieceKind::Rook);
    pub const WHITE_KING: Self = Self::new(Color::White, PieceKind::King);
    pub const BLACK_PAWN: Self = Self::new(Color::Black, PieceKind::Pawn);
    pub const BLACK_ROOK: Self = Self::new(Color::Black, PieceKind::Rook);
    pub const BLACK_KING: Self = Self::new(Color::Black, PieceKind::King);

    #[inline(always)]
    pub const fn new(color: Color, kind: PieceKind) -> Self {
        Self { color, kind }
    }

    /// A dense index in `0..12`, suitable for table lookups.
    #[inline(always)]
    pub const fn index(&self) -> usize {
        self.color.index() * PieceKind::COUNT + self.kind.index()
    }

    #[inline(always)]
    pub const fn is_white(&self) -> bool {
        self.color.is_white()
    }

    /// FEN character for this piece: uppercase for White, lowercase for Black.
    #[inline(always)]
    pub const fn char(&self) -> char {
        let c = self.kind.char();
        if self.is_white() {
            c.to_ascii_uppercase()
        } else {
            c
        }
    }

    /// Parses a FEN piece character (`PNBRQK` | `pnbrqk`).
    pub fn from_fen_char(c: char) -> Result<Self> {
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };

        let kind = match c.to_ascii_lowercase() {
            'p' => PieceKind::Pawn,
            'n' => PieceKind::Knight,
            'b' => PieceKind::Bishop,
            'r' => PieceKind::Rook,
            'q' => PieceKind::Queen,
            'k' => PieceKind::King,
            _ => bail!("invalid piece character {c:?}"),
        };

        Ok(Self::new(color, kind))
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.char())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fen_chars_roundtrip() {
        for color in [Color::White, Color::Black] {
            for kind in PieceKind::ALL {
                let piece = Piece::new(color, kind);
                assert_eq!(Piece::from_fen_char(piece.char()).unwrap(), piece);
            }
        }
    }

    #[test]
    fn test_piece_indices_are_dense() {
        let mut seen = [false; Piece::COUNT];
        for color in [Color::White, Color::Black] {
            for kind in PieceKind::ALL {
                seen[Piece::new(color, kind).index()] = true;
            }
        }
        assert!(seen.iter().all(|&s| s));
    }
}
