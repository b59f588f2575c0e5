/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use anyhow::{anyhow, bail, Result};

use crate::{Color, File, Move, Piece, PieceKind, Rank, Square, ZobristKey};

/// FEN string for the starting position of chess.
pub const FEN_STARTPOS: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// FEN string for the "Kiwipete" position, a move-generation stress test.
pub const FEN_KIWIPETE: &str =
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

/// The four independent castling permissions, as a bitset.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct CastlingRights(u8);

/// Rights removed when a move touches each square, applied to both the origin
/// and destination of every move.
///
/// This covers king moves, rook moves, rook captures, and anything else that
/// arrives on a corner or king home square.
const RIGHTS_MASK: [u8; Square::COUNT] = {
    let mut mask = [0b1111; Square::COUNT];
    mask[Square::A1.index()] = !CastlingRights::WHITE_QUEENSIDE & 0b1111;
    mask[Square::E1.index()] =
        !(CastlingRights::WHITE_KINGSIDE | CastlingRights::WHITE_QUEENSIDE) & 0b1111;
    mask[Square::H1.index()] = !CastlingRights::WHITE_KINGSIDE & 0b1111;
    mask[Square::A8.index()] = !CastlingRights::BLACK_QUEENSIDE & 0b1111;
    mask[Square::E8.index()] =
        !(CastlingRights::BLACK_KINGSIDE | CastlingRights::BLACK_QUEENSIDE) & 0b1111;
    mask[Square::H8.index()] = !CastlingRights::BLACK_KINGSIDE & 0b1111;
    mask
};

impl CastlingRights {
    const WHITE_KINGSIDE: u8 = 0b0001;
    const WHITE_QUEENSIDE: u8 = 0b0010;
    const BLACK_KINGSIDE: u8 = 0b0100;
    const BLACK_QUEENSIDE: u8 = 0b1000;

    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(0b1111);

    #[inline(always)]
    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Returns `true` if `color` may still castle kingside.
    #[inline(always)]
    pub const fn kingside(&self, color: Color) -> bool {
        let flag = match color {
            Color::White => Self::WHITE_KINGSIDE,
            Color::Black => Self::BLACK_KINGSIDE,
        };
        self.0 & flag != 0
    }

    /// Returns `true` if `color` may still castle queenside.
    #[inline(always)]
    pub const fn queenside(&self, color: Color) -> bool {
        let flag = match color {
            Color::White => Self::WHITE_QUEENSIDE,
            Color::Black => Self::BLACK_QUEENSIDE,
        };
        self.0 & flag != 0
    }

    /// Remove any rights associated with a move between `from` and `to`.
    #[inline(always)]
    pub fn update_for(&mut self, from: Square, to: Square) {
        self.0 &= RIGHTS_MASK[from.index()] & RIGHTS_MASK[to.index()];
    }

    /// Parses the FEN castling field (a subset of `KQkq`, or `-`).
    pub fn from_fen(s: &str) -> Result<Self> {
        if s == "-" {
            return Ok(Self::NONE);
        }

        let mut rights = Self::NONE;
        for c in s.chars() {
            let flag = match c {
                'K' => Self::WHITE_KINGSIDE,
                'Q' => Self::WHITE_QUEENSIDE,
                'k' => Self::BLACK_KINGSIDE,
                'q' => Self::BLACK_QUEENSIDE,
                _ => bail!("invalid castling character {c:?}"),
            };

            if rights.0 & flag != 0 {
                bail!("duplicate castling character {c:?}");
            }
            rights.0 |= flag;
        }

        Ok(rights)
    }
}

impl fmt::Display for CastlingRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return write!(f, "-");
        }

        for (flag, c) in [
            (Self::WHITE_KINGSIDE, 'K'),
            (Self::WHITE_QUEENSIDE, 'Q'),
            (Self::BLACK_KINGSIDE, 'k'),
            (Self::BLACK_QUEENSIDE, 'q'),
        ] {
            if self.0 & flag != 0 {
                write!(f, "{c}")?;
            }
        }
        Ok(())
    }
}

/// State saved before a move so that [`Position::unmake_move`] can restore the
/// position bit-identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Undo {
    mv: Move,
    castling: CastlingRights,
    en_passant: Option<Square>,
    halfmove: u16,
    key: ZobristKey,
}

/// A complete chess position.
///
/// The board is square-centric: 64 optionally-occupied squares, with the side
/// to move, castling rights, en passant target, clocks, cached king squares,
/// an incrementally-maintained [`ZobristKey`], and the undo stack that makes
/// every [`Position::make_move`] reversible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    squares: [Option<Piece>; Square::COUNT],
    side_to_move: Color,
    castling: CastlingRights,
    en_passant: Option<Square>,
    halfmove: u16,
    fullmove: u16,
    king_sq: [Square; Color::COUNT],
    key: ZobristKey,
    history: Vec<Undo>,
}

impl Position {
    /// Parses a position from the six whitespace-separated FEN fields.
    ///
    /// Parsing is strict: every field must be present and well-formed, each
    /// rank must describe exactly eight files, and each side must have exactly
    /// one king.
    pub fn from_fen(fen: &str) -> Result<Self> {
        let mut parts = fen.split_whitespace();

        let placement = parts.next().ok_or_else(|| anyhow!("empty FEN string"))?;
        let color = parts
            .next()
            .ok_or_else(|| anyhow!("FEN {fen:?} is missing the active color"))?;
        let castling = parts
            .next()
            .ok_or_else(|| anyhow!("FEN {fen:?} is missing castling rights"))?;
        let en_passant = parts
            .next()
            .ok_or_else(|| anyhow!("FEN {fen:?} is missing the en passant target"))?;
        let halfmove = parts
            .next()
            .ok_or_else(|| anyhow!("FEN {fen:?} is missing the halfmove clock"))?;
        let fullmove = parts
            .next()
            .ok_or_else(|| anyhow!("FEN {fen:?} is missing the fullmove number"))?;

        if parts.next().is_some() {
            bail!("FEN {fen:?} has trailing fields");
        }

        let mut squares = [None; Square::COUNT];
        let mut kings = [None; Color::COUNT];

        let ranks: Vec<&str> = placement.split('/').collect();
        if ranks.len() != 8 {
            bail!("FEN placement must contain 8 ranks, found {}", ranks.len());
        }

        // FEN lists ranks 8 down to 1
        for (i, rank_str) in ranks.iter().enumerate() {
            let rank = Rank::new(7 - i as u8);
            let mut file = 0u8;

            for c in rank_str.chars() {
                if let Some(run) = c.to_digit(10) {
                    if !(1..=8).contains(&run) {
                        bail!("invalid empty-square run {c:?} in FEN rank {rank}");
                    }
                    file += run as u8;
                    continue;
                }

                if file >= 8 {
                    bail!("rank {rank} in FEN {fen:?} describes more than 8 files");
                }

                let piece = Piece::from_fen_char(c)?;
                let square = Square::new(File::new(file), rank);

                if piece.kind == PieceKind::King {
                    let slot = &mut kings[piece.color.index()];
                    if slot.is_some() {
                        bail!("FEN {fen:?} has more than one {} king", piece.color.name());
                    }
                    *slot = Some(square);
                }

                squares[square.index()] = Some(piece);
                file += 1;
            }

            if file != 8 {
                bail!("rank {rank} in FEN {fen:?} describes fewer than 8 files");
            }
        }

        let white_king = kings[Color::White.index()]
            .ok_or_else(|| anyhow!("FEN {fen:?} has no white king"))?;
        let black_king = kings[Color::Black.index()]
            .ok_or_else(|| anyhow!("FEN {fen:?} has no black king"))?;

        let en_passant = match en_passant {
            "-" => None,
            s => Some(s.parse::<Square>()?),
        };

        let mut pos = Self {
            squares,
            side_to_move: Color::from_fen(color)?,
            castling: CastlingRights::from_fen(castling)?,
            en_passant,
            halfmove: halfmove
                .parse()
                .map_err(|_| anyhow!("invalid halfmove clock {halfmove:?}"))?,
            fullmove: fullmove
                .parse()
                .map_err(|_| anyhow!("invalid fullmove number {fullmove:?}"))?,
            king_sq: [white_king, black_king],
            key: ZobristKey::default(),
            history: Vec::with_capacity(128),
        };

        pos.key = ZobristKey::new(&pos);
        Ok(pos)
    }

    /// Emits this position as a canonical FEN string.
    pub fn to_fen(&self) -> String {
        let mut placement = String::with_capacity(72);

        for rank in Rank::iter().rev() {
            let mut empty_run = 0;
            for file in File::iter() {
                match self.piece_at(Square::new(file, rank)) {
                    Some(piece) => {
                        if empty_run > 0 {
                            placement.push((b'0' + empty_run) as char);
                            empty_run = 0;
                        }
                        placement.push(piece.char());
                    }
                    None => empty_run += 1,
                }
            }
            if empty_run > 0 {
                placement.push((b'0' + empty_run) as char);
            }
            if rank != Rank::FIRST {
                placement.push('/');
            }
        }

        let en_passant = self
            .en_passant
            .map_or(String::from("-"), |sq| sq.to_string());

        format!(
            "{placement} {} {} {en_passant} {} {}",
            self.side_to_move, self.castling, self.halfmove, self.fullmove
        )
    }

    #[inline(always)]
    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.squares[square.index()]
    }

    #[inline(always)]
    pub const fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    #[inline(always)]
    pub const fn castling_rights(&self) -> CastlingRights {
        self.castling
    }

    #[inline(always)]
    pub const fn ep_square(&self) -> Option<Square> {
        self.en_passant
    }

    #[inline(always)]
    pub const fn halfmove(&self) -> u16 {
        self.halfmove
    }

    #[inline(always)]
    pub const fn fullmove(&self) -> u16 {
        self.fullmove
    }

    /// The cached square of `color`'s king.
    #[inline(always)]
    pub const fn king_square(&self, color: Color) -> Square {
        self.king_sq[color.index()]
    }

    #[inline(always)]
    pub const fn key(&self) -> ZobristKey {
        self.key
    }

    /// Plays `mv` on the board, pushing an undo record.
    ///
    /// The move must have come from this position's move generator (or been
    /// validated against it); this function does not re-check legality.
    pub fn make_move(&mut self, mv: Move) {
        self.history.push(Undo {
            mv,
            castling: self.castling,
            en_passant: self.en_passant,
            halfmove: self.halfmove,
            key: self.key,
        });

        let color = mv.piece.color;

        // Clocks: the halfmove clock resets on any irreversible move
        if mv.piece.kind == PieceKind::Pawn || mv.is_capture() {
            self.halfmove = 0;
        } else {
            self.halfmove += 1;
        }
        if !color.is_white() {
            self.fullmove += 1;
        }

        // Any move invalidates the previous en passant target
        self.key.hash_optional_ep_square(self.en_passant);
        self.en_passant = None;

        // Lift the moving piece
        self.squares[mv.from.index()] = None;
        self.key.hash_piece(mv.from, mv.piece);

        // Remove the victim; for en passant it sits behind the destination,
        // on the mover's own rank
        if let Some(victim) = mv.captured {
            let victim_sq = if mv.is_en_passant {
                Square::new(mv.to.file(), mv.from.rank())
            } else {
                mv.to
            };
            self.squares[victim_sq.index()] = None;
            self.key.hash_piece(victim_sq, victim);
        }

        // Place the moving piece (or its promotion) on the destination
        let placed = match mv.promotion {
            Some(kind) => Piece::new(color, kind),
            None => mv.piece,
        };
        self.squares[mv.to.index()] = Some(placed);
        self.key.hash_piece(mv.to, placed);

        // Castling also relocates the rook
        if mv.is_castle {
            let (rook_from, rook_to) = rook_castle_squares(mv.to);
            let rook = Piece::new(color, PieceKind::Rook);
            self.squares[rook_from.index()] = None;
            self.squares[rook_to.index()] = Some(rook);
            self.key.hash_piece(rook_from, rook);
            self.key.hash_piece(rook_to, rook);
        }

        // A double push exposes the skipped square to en passant
        if mv.is_double_push() {
            let skipped = Square::from_index((mv.from.0 + mv.to.0) / 2);
            self.en_passant = Some(skipped);
            self.key.hash_optional_ep_square(self.en_passant);
        }

        // Touching a king or rook home square burns the associated rights
        self.key.hash_castling_rights(self.castling);
        self.castling.update_for(mv.from, mv.to);
        self.key.hash_castling_rights(self.castling);

        if mv.piece.kind == PieceKind::King {
            self.king_sq[color.index()] = mv.to;
        }

        self.key.hash_side_to_move(self.side_to_move);
        self.side_to_move = self.side_to_move.opponent();
        self.key.hash_side_to_move(self.side_to_move);

        debug_assert_eq!(
            self.piece_at(self.king_square(color)).map(|p| p.kind),
            Some(PieceKind::King),
            "king cache drifted after {mv}"
        );
    }

    /// Reverses the most recent [`Position::make_move`].
    ///
    /// Does nothing if no move has been made.
    pub fn unmake_move(&mut self) {
        let Some(undo) = self.history.pop() else {
            return;
        };

        let mv = undo.mv;
        let color = mv.piece.color;

        self.side_to_move = color;
        if !color.is_white() {
            self.fullmove -= 1;
        }

        // Take back the moved piece (or its promotion)
        self.squares[mv.to.index()] = None;
        self.squares[mv.from.index()] = Some(mv.piece);

        if let Some(victim) = mv.captured {
            let victim_sq = if mv.is_en_passant {
                Square::new(mv.to.file(), mv.from.rank())
            } else {
                mv.to
            };
            self.squares[victim_sq.index()] = Some(victim);
        }

        if mv.is_castle {
            let (rook_from, rook_to) = rook_castle_squares(mv.to);
            let rook = Piece::new(color, PieceKind::Rook);
            self.squares[rook_to.index()] = None;
            self.squares[rook_from.index()] = Some(rook);
        }

        if mv.piece.kind == PieceKind::King {
            self.king_sq[color.index()] = mv.from;
        }

        self.castling = undo.castling;
        self.en_passant = undo.en_passant;
        self.halfmove = undo.halfmove;
        self.key = undo.key;
    }

    /// Passes the turn: flips the side to move and clears the en passant
    /// target, returning the state [`Position::unmake_nullmove`] needs.
    pub fn make_nullmove(&mut self) -> Option<Square> {
        let saved = self.en_passant;

        self.key.hash_optional_ep_square(saved);
        self.en_passant = None;

        self.key.hash_side_to_move(self.side_to_move);
        self.side_to_move = self.side_to_move.opponent();
        self.key.hash_side_to_move(self.side_to_move);

        saved
    }

    /// Reverses a [`Position::make_nullmove`].
    pub fn unmake_nullmove(&mut self, saved: Option<Square>) {
        self.key.hash_side_to_move(self.side_to_move);
        self.side_to_move = self.side_to_move.opponent();
        self.key.hash_side_to_move(self.side_to_move);

        self.en_passant = saved;
        self.key.hash_optional_ep_square(saved);
    }

    /// Flips the side to move without touching anything else.
    ///
    /// Calling this twice restores the position exactly.
    pub fn toggle_side_to_move(&mut self) {
        self.key.hash_side_to_move(self.side_to_move);
        self.side_to_move = self.side_to_move.opponent();
        self.key.hash_side_to_move(self.side_to_move);
    }

    /// Resolves and plays the provided move text, failing if it is malformed
    /// or not legal in the current position.
    pub fn make_move_uci(&mut self, mv_str: &str) -> Result<()> {
        let mv = Move::from_uci(self, mv_str)?;
        self.make_move(mv);
        Ok(())
    }

    /// Returns `true` if `square` is attacked by any piece of `attacker`.
    pub fn is_attacked(&self, square: Square, attacker: Color) -> bool {
        // Pawns attack diagonally forward, so look one step backward from
        // the target along the attacker's push direction
        let back = -attacker.pawn_direction();
        for delta in [back - 1, back + 1] {
            if let Some(origin) = square.offset(delta) {
                if origin.file_distance(square) == 1
                    && self.piece_at(origin) == Some(Piece::new(attacker, PieceKind::Pawn))
                {
                    return true;
                }
            }
        }

        for delta in KNIGHT_DELTAS {
            if let Some(origin) = square.offset(delta) {
                if origin.file_distance(square) <= 2
                    && self.piece_at(origin) == Some(Piece::new(attacker, PieceKind::Knight))
                {
                    return true;
                }
            }
        }

        for delta in KING_DELTAS {
            if let Some(origin) = square.offset(delta) {
                if origin.file_distance(square) <= 1
                    && self.piece_at(origin) == Some(Piece::new(attacker, PieceKind::King))
                {
                    return true;
                }
            }
        }

        // Sliders: the first occupant of each ray attacks iff its kind
        // matches the ray's family
        self.ray_attacked(square, attacker, DIAGONAL_DELTAS, PieceKind::Bishop)
            || self.ray_attacked(square, attacker, ORTHOGONAL_DELTAS, PieceKind::Rook)
    }

    fn ray_attacked(
        &self,
        square: Square,
        attacker: Color,
        deltas: [i8; 4],
        family: PieceKind,
    ) -> bool {
        for delta in deltas {
            let mut current = square;
            while let Some(next) = current.offset(delta) {
                if current.file_distance(next) > 1 {
                    break;
                }

                if let Some(piece) = self.piece_at(next) {
                    if piece.color == attacker
                        && (piece.kind == family || piece.kind == PieceKind::Queen)
                    {
                        return true;
                    }
                    break;
                }

                current = next;
            }
        }

        false
    }

    /// Returns `true` if `color`'s king is attacked.
    #[inline(always)]
    pub fn is_in_check(&self, color: Color) -> bool {
        self.is_attacked(self.king_square(color), color.opponent())
    }

    /// Returns `true` if the side to move is in check.
    #[inline(always)]
    pub fn in_check(&self) -> bool {
        self.is_in_check(self.side_to_move)
    }

    /// Returns `true` if `color` has at least one piece besides its king and
    /// pawns. Guards null-move pruning against zugzwang-prone endgames.
    pub fn has_non_pawn_material(&self, color: Color) -> bool {
        self.squares.iter().flatten().any(|piece| {
            piece.color == color && !matches!(piece.kind, PieceKind::Pawn | PieceKind::King)
        })
    }

    /// Fifty-move rule: 100 plies without a pawn move or capture.
    #[inline(always)]
    pub const fn can_draw_by_fifty(&self) -> bool {
        self.halfmove >= 100
    }

    /// Returns `true` for material combinations that cannot deliver mate:
    /// K vs K, K+minor vs K, and K+B vs K+B with same-complex bishops.
    pub fn can_draw_by_insufficient_material(&self) -> bool {
        let mut others = [None; 2];
        let mut count = 0;

        for square in Square::iter() {
            if let Some(piece) = self.piece_at(square) {
                if piece.kind == PieceKind::King {
                    continue;
                }
                if count == others.len() {
                    // Three or more non-king pieces is always "sufficient" here
                    return false;
                }
                others[count] = Some((piece, square));
                count += 1;
            }
        }

        match (others[0], others[1]) {
            // K vs K
            (None, _) => true,

            // K + minor vs K
            (Some((piece, _)), None) => {
                matches!(piece.kind, PieceKind::Knight | PieceKind::Bishop)
            }

            // K+B vs K+B, drawn only with both bishops on the same color complex
            (Some((a, a_sq)), Some((b, b_sq))) => {
                a.kind == PieceKind::Bishop
                    && b.kind == PieceKind::Bishop
                    && a.color != b.color
                    && a_sq.is_light() == b_sq.is_light()
            }
        }
    }
}

impl Default for Position {
    /// The standard starting position.
    fn default() -> Self {
        // The startpos FEN is a compile-time constant and always parses
        Self::from_fen(FEN_STARTPOS).expect("startpos FEN is valid")
    }
}

impl fmt::Display for Position {
    /// Prints a bordered diagram of the board with the FEN below it.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in Rank::iter().rev() {
            write!(f, "{rank} |")?;
            for file in File::iter() {
                let c = self
                    .piece_at(Square::new(file, rank))
                    .map_or('.', |piece| piece.char());
                write!(f, " {c}")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "  +----------------")?;
        write!(f, "   ")?;
        for file in File::iter() {
            write!(f, " {file}")?;
        }
        writeln!(f)?;
        write!(f, "\nFen: {}", self.to_fen())
    }
}

/// The rook's origin and destination for a castle landing the king on `king_to`.
#[inline(always)]
const fn rook_castle_squares(king_to: Square) -> (Square, Square) {
    match king_to {
        Square::G1 => (Square::H1, Square::F1),
        Square::C1 => (Square::A1, Square::D1),
        Square::G8 => (Square::H8, Square::F8),
        _ => (Square::A8, Square::D8),
    }
}

/// Knight move deltas on a rank-major board.
pub(crate) const KNIGHT_DELTAS: [i8; 8] = [15, 17, 10, 6, -15, -17, -10, -6];

/// King move deltas (one step in all eight directions).
pub(crate) const KING_DELTAS: [i8; 8] = [1, -1, 8, -8, 7, 9, -7, -9];

/// Bishop ray deltas.
pub(crate) const DIAGONAL_DELTAS: [i8; 4] = [7, 9, -7, -9];

/// Rook ray deltas.
pub(crate) const ORTHOGONAL_DELTAS: [i8; 4] = [1, -1, 8, -8];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::XoShiRo;

    #[test]
    fn test_fen_roundtrip() {
        for fen in [
            FEN_STARTPOS,
            FEN_KIWIPETE,
            "rnbqkbnr/ppp1pppp/8/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 3",
            "7k/5Q2/6K1/8/8/8/8/8 b - - 0 1",
            "4k3/8/8/8/8/8/8/4K2R w K - 10 42",
        ] {
            let pos = Position::from_fen(fen).unwrap();
            assert_eq!(pos.to_fen(), fen);
        }
    }

    #[test]
    fn test_fen_rejects_malformed_input() {
        // Missing fields
        assert!(Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq").is_err());
        // Rank does not sum to 8
        assert!(
            Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPP/RNBQKBNR w KQkq - 0 1").is_err()
        );
        // Bad piece char
        assert!(
            Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPX/RNBQKBNR w KQkq - 0 1").is_err()
        );
        // Two white kings
        assert!(Position::from_fen("4k3/8/8/8/8/8/8/3KK3 w - - 0 1").is_err());
        // No black king
        assert!(Position::from_fen("8/8/8/8/8/8/8/4K3 w - - 0 1").is_err());
        // Bad en passant square
        assert!(
            Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq e9 0 1").is_err()
        );
    }

    #[test]
    fn test_make_unmake_restores_position() {
        let mut pos = Position::from_fen(FEN_KIWIPETE).unwrap();
        let before = pos.clone();

        for mv in pos.clone().get_legal_moves() {
            pos.make_move(mv);
            pos.unmake_move();
            assert_eq!(pos, before, "make/unmake of {mv} did not restore state");
        }
    }

    #[test]
    fn test_make_unmake_random_walk() {
        // Walk a few hundred plies of pseudo-random legal moves, then unwind
        // them all; the position must be restored exactly at every step.
        let mut prng = XoShiRo::new();
        let mut pos = Position::default();
        let mut snapshots = Vec::new();

        for _ in 0..300 {
            let moves = pos.get_legal_moves();
            if moves.is_empty() {
                break;
            }
            snapshots.push(pos.clone());
            let mv = moves[prng.get_next() as usize % moves.len()];
            pos.make_move(mv);
        }

        while let Some(expected) = snapshots.pop() {
            pos.unmake_move();
            assert_eq!(pos, expected);
        }
    }

    #[test]
    fn test_en_passant_capture_removes_pawn() {
        let mut pos =
            Position::from_fen("rnbqkbnr/ppp1pppp/8/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 3")
                .unwrap();

        pos.make_move_uci("e5d6").unwrap();

        // The captured pawn on d5 is gone, and the capturer sits on d6
        assert_eq!(pos.piece_at("d5".parse().unwrap()), None);
        assert_eq!(
            pos.piece_at("d6".parse().unwrap()),
            Some(Piece::WHITE_PAWN)
        );
    }

    #[test]
    fn test_castling_moves_rook() {
        let mut pos = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();

        pos.make_move_uci("e1g1").unwrap();
        assert_eq!(pos.piece_at(Square::F1), Some(Piece::WHITE_ROOK));
        assert_eq!(pos.piece_at(Square::G1), Some(Piece::WHITE_KING));
        assert_eq!(pos.piece_at(Square::H1), None);

        // White's rights are gone, Black's remain
        assert!(!pos.castling_rights().kingside(Color::White));
        assert!(!pos.castling_rights().queenside(Color::White));
        assert!(pos.castling_rights().kingside(Color::Black));
    }

    #[test]
    fn test_rook_capture_burns_castling_rights() {
        // Capturing the rook on its home square must clear the right for it
        let mut pos = Position::from_fen("r3k2r/8/8/8/8/8/6q1/R3K2R b KQkq - 0 1").unwrap();
        pos.make_move_uci("g2h1").unwrap();
        assert!(!pos.castling_rights().kingside(Color::White));
        assert!(pos.castling_rights().queenside(Color::White));
    }

    #[test]
    fn test_insufficient_material() {
        for fen in [
            "4k3/8/8/8/8/8/8/4K3 w - - 0 1",
            "4k3/8/8/8/8/8/8/2B1K3 w - - 0 1",
            "4k3/8/8/8/8/8/8/2N1K3 w - - 0 1",
            // Both bishops on dark squares
            "2b1k3/8/8/8/8/8/8/2B1K3 w - - 0 1",
        ] {
            let pos = Position::from_fen(fen).unwrap();
            assert!(pos.can_draw_by_insufficient_material(), "{fen}");
        }

        for fen in [
            FEN_STARTPOS,
            "4k3/8/8/8/8/8/8/3RK3 w - - 0 1",
            "4k3/8/8/8/8/8/8/2P1K3 w - - 0 1",
            // Bishops on opposite complexes can still mate
            "1b2k3/8/8/8/8/8/8/2B1K3 w - - 0 1",
            // Same-complex bishops, but a third piece is on the board
            "4k3/8/8/8/8/8/8/B1b3KR w - - 0 1",
        ] {
            let pos = Position::from_fen(fen).unwrap();
            assert!(!pos.can_draw_by_insufficient_material(), "{fen}");
        }
    }

    #[test]
    fn test_toggle_side_to_move_is_involutive() {
        let mut pos = Position::from_fen(FEN_KIWIPETE).unwrap();
        let before = pos.clone();

        pos.toggle_side_to_move();
        assert_ne!(pos.side_to_move(), before.side_to_move());
        pos.toggle_side_to_move();
        assert_eq!(pos, before);
    }

    #[test]
    fn test_nullmove_roundtrip() {
        let mut pos =
            Position::from_fen("rnbqkbnr/ppp1pppp/8/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 3")
                .unwrap();
        let before = pos.clone();

        let saved = pos.make_nullmove();
        assert_eq!(pos.ep_square(), None);
        assert_eq!(pos.side_to_move(), Color::Black);

        pos.unmake_nullmove(saved);
        assert_eq!(pos, before);
    }
}
