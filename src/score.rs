/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use uci_parser::UciScore;

/// A numerical representation of the evaluation of a position / move, in units
/// of ["centipawns"](https://www.chessprogramming.org/Score).
///
/// Scores are always from the perspective of the side to move.
#[derive(Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Score(i32);

impl Score {
    /// Largest possible score ever achievable.
    pub const INF: Self = Self(30_000);

    /// Score of mate in the current position.
    pub const MATE: Self = Self(20_000);

    /// Score of a draw.
    pub const DRAW: Self = Self(0);

    /// Scores at or above this magnitude indicate a forced mate rather than a
    /// material advantage.
    pub const MATE_THRESHOLD: Self = Self(19_000);

    /// Constructs a new [`Score`] instance.
    #[inline(always)]
    pub const fn new(score: i32) -> Self {
        Self(score)
    }

    /// Return the inner `i32` of this score.
    #[inline(always)]
    pub const fn inner(&self) -> i32 {
        self.0
    }

    /// The score of being mated `ply` halfmoves into the search.
    ///
    /// Offsetting by `ply` makes shorter mates score higher than longer ones.
    #[inline(always)]
    pub const fn mated_in(ply: i32) -> Self {
        Self(-Self::MATE.0 + ply)
    }

    /// Returns `true` if the score indicates a forced mate (for either side).
    #[inline(always)]
    pub fn is_mate(&self) -> bool {
        self.abs() > Self::MATE_THRESHOLD
    }

    /// Returns the number of plies (half moves) this score is from mate.
    #[inline(always)]
    pub const fn plies_to_mate(&self) -> i32 {
        Self::MATE.0 - self.0.abs()
    }

    /// Returns the number of moves (full moves) this score is from mate.
    #[inline(always)]
    pub const fn moves_to_mate(&self) -> i32 {
        let plies = self.plies_to_mate();

        // If this score is in favor of the side-to-move, it will be positive,
        // so we add 1 (because we need to make the current move in order for
        // its score to take effect). Otherwise, the score is for our opponent,
        // so we negate it.
        let relative_to_side = if self.0 > 0 { plies + 1 } else { -plies };

        // Divide by 2 to obtain the number of moves (1 move = 2 ply)
        relative_to_side / 2
    }

    /// Normalize the score to the provided ply.
    ///
    /// Mate scores fetched from the transposition table are made relative to
    /// the probing node's distance from the root.
    #[inline(always)]
    pub fn relative(self, ply: i32) -> Self {
        if self.is_mate() {
            if self > Self::DRAW {
                self - ply
            } else {
                self + ply
            }
        } else {
            self
        }
    }

    /// De-normalize the score from the provided ply.
    ///
    /// Mate scores entering the transposition table are made relative to the
    /// root (0 ply), so they remain meaningful at any probing depth.
    #[inline(always)]
    pub fn absolute(self, ply: i32) -> Self {
        if self.is_mate() {
            if self > Self::DRAW {
                self + ply
            } else {
                self - ply
            }
        } else {
            self
        }
    }

    /// Returns the absolute value of this [`Score`].
    #[inline(always)]
    pub const fn abs(self) -> Self {
        Self(self.0.abs())
    }

    /// Converts this [`Score`] into a [`UciScore`], determining whether it is
    /// a centipawns score or a mate score.
    ///
    /// Used when sending the `info score` message.
    #[inline(always)]
    pub fn into_uci(self) -> UciScore {
        if self.is_mate() {
            UciScore::mate(self.moves_to_mate())
        } else {
            UciScore::cp(self.0)
        }
    }
}

macro_rules! impl_binary_op {
    ($trait:tt, $fn:ident) => {
        impl std::ops::$trait for Score {
            type Output = Self;

            #[inline(always)]
            fn $fn(self, rhs: Self) -> Self::Output {
                Self(self.0.$fn(rhs.0))
            }
        }

        impl std::ops::$trait<i32> for Score {
            type Output = Self;

            #[inline(always)]
            fn $fn(self, rhs: i32) -> Self::Output {
                Self(self.0.$fn(rhs))
            }
        }
    };
}

macro_rules! impl_binary_op_assign {
    ($trait:tt, $fn:ident) => {
        impl std::ops::$trait for Score {
            #[inline(always)]
            fn $fn(&mut self, rhs: Self) {
                self.0.$fn(rhs.0);
            }
        }

        impl std::ops::$trait<i32> for Score {
            #[inline(always)]
            fn $fn(&mut self, rhs: i32) {
                self.0.$fn(rhs);
            }
        }
    };
}

impl_binary_op!(Add, add);
impl_binary_op!(Sub, sub);
impl_binary_op!(Mul, mul);
impl_binary_op!(Div, div);

impl_binary_op_assign!(AddAssign, add_assign);
impl_binary_op_assign!(SubAssign, sub_assign);

impl std::ops::Neg for Score {
    type Output = Self;

    #[inline(always)]
    fn neg(self) -> Self::Output {
        Self(self.0.neg())
    }
}

impl PartialEq<i32> for Score {
    #[inline(always)]
    fn eq(&self, other: &i32) -> bool {
        self.0.eq(other)
    }
}

impl PartialOrd<i32> for Score {
    #[inline(always)]
    fn partial_cmp(&self, other: &i32) -> Option<std::cmp::Ordering> {
        self.0.partial_cmp(other)
    }
}

impl fmt::Display for Score {
    #[inline(always)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Debug for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_mate() {
            write!(f, "{} (mate in {} plies)", self.0, self.plies_to_mate())
        } else {
            write!(f, "{}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mate_scores() {
        let mated_now = Score::mated_in(0);
        assert_eq!(mated_now, -Score::MATE);
        assert!(mated_now.is_mate());

        let mate_in_three_plies = -Score::mated_in(3);
        assert!(mate_in_three_plies.is_mate());
        assert_eq!(mate_in_three_plies.plies_to_mate(), 3);
        assert_eq!(mate_in_three_plies.moves_to_mate(), 2);

        // A material score is not a mate score
        assert!(!Score::new(900).is_mate());
        assert!(!Score::new(-18_999).is_mate());
    }

    #[test]
    fn test_relative_absolute_roundtrip() {
        let ply = 5;

        let our_mate = Score::MATE - 3;
        assert_eq!(our_mate.absolute(ply).relative(ply), our_mate);

        let their_mate = -(Score::MATE - 3);
        assert_eq!(their_mate.absolute(ply).relative(ply), their_mate);

        // Non-mate scores pass through untouched
        assert_eq!(Score::new(123).absolute(ply), Score::new(123));
        assert_eq!(Score::new(123).relative(ply), Score::new(123));
    }

    #[test]
    fn test_shorter_mates_score_higher() {
        assert!(-Score::mated_in(2) > -Score::mated_in(4));
        assert!(Score::mated_in(2) < Score::mated_in(4));
    }
}
