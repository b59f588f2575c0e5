/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

/// Number of nodes searched between polls of the abort conditions.
macro_rules! abort_poll_interval {
    () => {
        1_000
    };
}
pub(crate) use abort_poll_interval;

/// Fraction of the time budget after which a new iteration is not started,
/// as (numerator, denominator).
///
/// An iteration started with less than a quarter of the budget left is
/// unlikely to finish.
macro_rules! soft_limit_fraction {
    () => {
        (3, 4)
    };
}
pub(crate) use soft_limit_fraction;

/// Divisor applied to the remaining clock time when `go` supplies only
/// `wtime`/`btime`.
macro_rules! clock_time_divisor {
    () => {
        30
    };
}
pub(crate) use clock_time_divisor;

/// Cap, in milliseconds, on the budget derived from the remaining clock.
macro_rules! max_clock_budget_ms {
    () => {
        5_000
    };
}
pub(crate) use max_clock_budget_ms;

/// Minimum depth at which null move pruning can be applied.
macro_rules! min_nmp_depth {
    () => {
        3
    };
}
pub(crate) use min_nmp_depth;

/// Depth reduction for the null-move search.
macro_rules! nmp_reduction {
    () => {
        3
    };
}
pub(crate) use nmp_reduction;

/// Minimum depth at which to apply late move reductions.
macro_rules! min_lmr_depth {
    () => {
        3
    };
}
pub(crate) use min_lmr_depth;

/// Number of moves searched at full depth before late move reductions kick in.
macro_rules! min_lmr_moves {
    () => {
        4
    };
}
pub(crate) use min_lmr_moves;

/// Depth reduction for a late move's preliminary search.
macro_rules! lmr_reduction {
    () => {
        2
    };
}
pub(crate) use lmr_reduction;

/// Move-ordering score for the transposition table's best move.
macro_rules! tt_move_score {
    () => {
        2_000_000
    };
}
pub(crate) use tt_move_score;

/// Base move-ordering score for captures, refined by MVV-LVA.
macro_rules! capture_base_score {
    () => {
        1_000_000
    };
}
pub(crate) use capture_base_score;

/// Base move-ordering score for non-capture promotions.
macro_rules! promotion_base_score {
    () => {
        900_000
    };
}
pub(crate) use promotion_base_score;

/// Move-ordering score for a killer-slot match.
macro_rules! killer_move_score {
    () => {
        800_000
    };
}
pub(crate) use killer_move_score;
