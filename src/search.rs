/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
    fmt,
    marker::PhantomData,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use uci_parser::{UciInfo, UciResponse, UciSearchOptions};

use crate::{
    tune, Bound, Evaluator, HistoryTable, KillerTable, Move, MovePicker, Position, Score, TTable,
    TTableEntry,
};

/// Maximum depth that can be searched.
pub const MAX_DEPTH: u8 = 64;

/// Upper bound on the distance from the root, including quiescence plies.
pub const MAX_PLY: usize = 128;

/// The level of logging to print during a search.
///
/// Monomorphizing over a marker type keeps logging decisions out of the hot
/// path entirely.
pub trait LogLevel {
    /// Print `info` lines and the final `bestmove`.
    const INFO: bool;

    /// Print additional diagnostics as `info string` lines.
    const DEBUG: bool;
}

/// Print nothing. Used for internal searches and tests.
pub struct LogNone;
impl LogLevel for LogNone {
    const INFO: bool = false;
    const DEBUG: bool = false;
}

/// Print standard UCI output.
pub struct LogInfo;
impl LogLevel for LogInfo {
    const INFO: bool = true;
    const DEBUG: bool = false;
}

/// Print standard UCI output plus diagnostics.
pub struct LogDebug;
impl LogLevel for LogDebug {
    const INFO: bool = true;
    const DEBUG: bool = true;
}

/// The result of a search: the best move found, its score, and counters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchResult {
    /// Best move found during the search.
    ///
    /// `None` only when the side to move has no legal moves.
    pub bestmove: Option<Move>,

    /// Evaluation of the position after `bestmove` is made.
    pub score: Score,

    /// Number of nodes searched.
    pub nodes: u64,

    /// Number of static evaluations performed.
    pub evals: u64,

    /// Depth of the last completed iteration.
    pub depth: u8,

    /// Wall-clock time the search consumed.
    pub elapsed: Duration,
}

impl Default for SearchResult {
    /// A default search result should initialize to a *very bad* score,
    /// since there isn't a move to play.
    #[inline(always)]
    fn default() -> Self {
        Self {
            bestmove: None,
            score: -Score::INF,
            nodes: 0,
            evals: 0,
            depth: 0,
            elapsed: Duration::ZERO,
        }
    }
}

/// Configuration variables for executing a [`Search`].
#[derive(Debug, Clone, Copy)]
pub struct SearchConfig {
    /// Maximum depth to execute the search.
    pub max_depth: u8,

    /// Start time of the search.
    pub starttime: Instant,

    /// Hard limit on search time; when exceeded, the search aborts at the
    /// next poll.
    pub time_limit: Duration,

    /// Soft limit on search time.
    ///
    /// When an iteration concludes past this point, no deeper iteration is
    /// started, since it would be unlikely to finish.
    pub soft_limit: Duration,
}

impl SearchConfig {
    /// Constructs a new [`SearchConfig`] from the provided UCI options and
    /// position.
    ///
    /// The [`Position`] determines whose clock applies. When only clock times
    /// are given, the budget is `min(remaining / 30, 5000)` milliseconds.
    pub fn new(options: UciSearchOptions, position: &Position) -> Self {
        let mut config = Self::default();

        if let Some(depth) = options.depth {
            config.max_depth = (depth as u8).min(MAX_DEPTH);
        }

        if let Some(movetime) = options.movetime {
            config.set_time_limit(movetime);
        } else {
            let remaining = if position.side_to_move().is_white() {
                options.wtime
            } else {
                options.btime
            };

            if let Some(remaining) = remaining {
                let budget = (remaining / tune::clock_time_divisor!())
                    .min(Duration::from_millis(tune::max_clock_budget_ms!()));
                config.set_time_limit(budget);
            }
        }

        config
    }

    /// Constructs a [`SearchConfig`] from a raw time budget and depth cap.
    pub fn from_limits(time_limit_ms: u64, max_depth: u8) -> Self {
        let mut config = Self {
            max_depth: max_depth.min(MAX_DEPTH),
            ..Self::default()
        };
        config.set_time_limit(Duration::from_millis(time_limit_ms));
        config
    }

    /// Sets the hard time limit, deriving the soft limit from it.
    fn set_time_limit(&mut self, limit: Duration) {
        let (numerator, denominator) = tune::soft_limit_fraction!();
        self.time_limit = limit;
        self.soft_limit = limit / denominator * numerator;
    }
}

impl Default for SearchConfig {
    /// A default [`SearchConfig`] permits an "infinite" search.
    #[inline(always)]
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
            starttime: Instant::now(),
            time_limit: Duration::MAX,
            soft_limit: Duration::MAX,
        }
    }
}

/// Executes a search on a chess position.
///
/// The search drives [negamax](https://www.chessprogramming.org/Negamax)
/// within iterative deepening, pruning with the transposition table,
/// null moves, and late move reductions, and resolving captures through
/// quiescence before trusting the static evaluation.
pub struct Search<'a, Log> {
    /// Number of nodes searched.
    nodes: u64,

    /// Number of static evaluations performed.
    evals: u64,

    /// Sticky abort flag; set when time runs out or the search is stopped
    /// externally. Unwinding frames return a neutral score without further
    /// state mutation.
    aborted: bool,

    /// An atomic flag shared with the engine thread; cleared by `stop`.
    is_searching: Arc<AtomicBool>,

    /// Configuration variables for this instance of the search.
    config: SearchConfig,

    /// Transposition table used to cache information during search.
    ///
    /// The table persists across searches; killer and history tables do not.
    ttable: &'a mut TTable,

    /// Scores for quiet moves that caused beta-cutoffs, by from/to square.
    history: HistoryTable,

    /// Quiet cutoff moves per ply.
    killers: KillerTable,

    /// Marker for the level of logging to print.
    log: PhantomData<Log>,
}

impl<'a, Log: LogLevel> Search<'a, Log> {
    /// Construct a new [`Search`] instance to execute.
    pub fn new(
        is_searching: Arc<AtomicBool>,
        config: SearchConfig,
        ttable: &'a mut TTable,
    ) -> Self {
        Self {
            nodes: 0,
            evals: 0,
            aborted: false,
            is_searching,
            config,
            ttable,
            history: HistoryTable::default(),
            killers: KillerTable::default(),
            log: PhantomData,
        }
    }

    /// Start the search on the supplied [`Position`], returning a
    /// [`SearchResult`].
    ///
    /// This is the entrypoint of the search; it runs iterative deepening and
    /// concludes by sending the `bestmove` message.
    pub fn start(mut self, game: &mut Position) -> SearchResult {
        if Log::DEBUG {
            self.send_string(format!("Starting search on {:?}", game.to_fen()));

            let limit = self.config.time_limit;
            if limit < Duration::MAX {
                self.send_string(format!("Time limit := {}ms", limit.as_millis()));
            }
            if self.config.max_depth < MAX_DEPTH {
                self.send_string(format!("Max depth := {}", self.config.max_depth));
            }
        }

        let res = self.iterative_deepening(game);

        // Search has ended; send bestmove
        if Log::INFO {
            self.send_response(UciResponse::BestMove {
                bestmove: res.bestmove.map(|mv| mv.to_string()),
                ponder: None,
            });
        }

        // Search has concluded, alert other thread(s) that we are no longer searching
        self.is_searching.store(false, Ordering::Relaxed);

        res
    }

    /// Performs [iterative deepening](https://www.chessprogramming.org/Iterative_Deepening)
    /// on the search's position.
    ///
    /// Each iteration searches one ply deeper than the last, reusing the
    /// previous iteration's transposition entries for move ordering. The
    /// results of an iteration that was aborted mid-search are discarded, and
    /// the previous depth's best move is kept.
    fn iterative_deepening(&mut self, game: &mut Position) -> SearchResult {
        // Initialize `bestmove` to the first legal move available, so that
        // even a search cancelled instantly has something sensible to play
        let mut result = SearchResult {
            bestmove: game.get_legal_moves().first().copied(),
            ..Default::default()
        };

        for depth in 1..=self.config.max_depth {
            if !self.is_searching.load(Ordering::Relaxed) {
                break;
            }

            let (bestmove, score) = self.root_search(game, depth);

            // A cancelled iteration cannot be trusted; fall back to the
            // previous depth's result
            if self.aborted {
                if Log::DEBUG {
                    self.send_string(format!(
                        "Search cancelled during depth {depth}; keeping result from depth {}",
                        result.depth
                    ));
                }
                break;
            }

            result.bestmove = bestmove;
            result.score = score;
            result.depth = depth;

            if Log::INFO {
                self.send_end_of_search_info(&result);
            }

            // No bestmove means the game is over on the board
            if bestmove.is_none() {
                break;
            }

            // A forced mate will not improve with a deeper search
            if score.is_mate() {
                break;
            }

            // Don't start an iteration that is unlikely to finish
            if self.config.starttime.elapsed() >= self.config.soft_limit {
                break;
            }
        }

        result.nodes = self.nodes;
        result.evals = self.evals;
        result.elapsed = self.config.starttime.elapsed();

        result
    }

    /// Searches the root of the tree at `depth`, returning the best move and
    /// its score.
    ///
    /// Stalemate yields a draw score with no move; checkmate yields a mated
    /// score with no move.
    fn root_search(&mut self, game: &mut Position, depth: u8) -> (Option<Move>, Score) {
        let moves = game.get_legal_moves();
        if moves.is_empty() {
            let score = if game.in_check() {
                -Score::MATE
            } else {
                Score::DRAW
            };
            return (None, score);
        }

        let tt_move = self.ttable.get(&game.key()).and_then(|entry| entry.bestmove);
        let picker = MovePicker::new(moves, |mv| self.score_move(mv, tt_move, 0));

        let original_alpha = -Score::INF;
        let mut alpha = original_alpha;
        let beta = Score::INF;
        let mut best = -Score::INF;
        let mut bestmove = None;

        for mv in picker {
            game.make_move(mv);
            let score = -self.negamax(game, depth as i32 - 1, 1, -beta, -alpha);
            game.unmake_move();

            if self.aborted {
                return (bestmove, best);
            }

            if score > best {
                best = score;
                if score > alpha {
                    alpha = score;
                    bestmove = Some(mv);
                }
            }
        }

        self.ttable.store(
            game.key(),
            TTableEntry {
                depth,
                score: best.absolute(0),
                bound: Bound::new(best, original_alpha, beta),
                bestmove,
                age: 0,
            },
        );

        (bestmove, best)
    }

    /// Primary location of search logic.
    ///
    /// Uses the [negamax](https://www.chessprogramming.org/Negamax) algorithm:
    /// the score of a position is the negation of the best score its opponent
    /// can achieve from the positions one move away.
    fn negamax(
        &mut self,
        game: &mut Position,
        depth: i32,
        ply: i32,
        mut alpha: Score,
        beta: Score,
    ) -> Score {
        /****************************************************************************************************
         * Abort poll: the only suspension point in the search. Once the flag
         * is set, every unwinding frame returns a neutral score.
         ****************************************************************************************************/
        self.nodes += 1;
        if self.nodes % tune::abort_poll_interval!() == 0 {
            self.check_abort();
        }
        if self.aborted {
            return Score::DRAW;
        }

        /****************************************************************************************************
         * Quiescence Search: https://www.chessprogramming.org/Quiescence_Search
         *
         * To avoid the horizon effect, don't stop searching at a depth of 0;
         * resolve capture chains until the position is quiet.
         ****************************************************************************************************/
        if depth <= 0 {
            return self.quiescence(game, ply, alpha, beta);
        }

        // Draws detected during search: fifty-move rule and dead material
        if game.can_draw_by_fifty() || game.can_draw_by_insufficient_material() {
            return Score::DRAW;
        }

        /****************************************************************************************************
         * TT Cutoffs: https://www.chessprogramming.org/Transposition_Table#Transposition_Table_Cutoffs
         ****************************************************************************************************/
        if let Some(score) = self
            .ttable
            .probe(game.key(), depth as u8, ply, alpha, beta)
        {
            return score;
        }

        let in_check = game.in_check();

        // If there are no legal moves, it's either mate or a draw.
        let moves = game.get_legal_moves();
        if moves.is_empty() {
            return if in_check {
                // Offset by ply to prefer earlier mates
                Score::mated_in(ply)
            } else {
                Score::DRAW
            };
        }

        /****************************************************************************************************
         * Null Move Pruning: https://www.chessprogramming.org/Null_Move_Pruning
         *
         * If giving the opponent two moves in a row still leaves us above
         * beta, the branch is not worth searching in full. Suppressed in
         * check (the null move would be illegal) and without non-pawn
         * material (zugzwang breaks the "a move always helps" assumption).
         ****************************************************************************************************/
        if depth >= tune::min_nmp_depth!()
            && !in_check
            && game.has_non_pawn_material(game.side_to_move())
        {
            let saved = game.make_nullmove();
            let score = -self.negamax(
                game,
                depth - tune::nmp_reduction!(),
                ply + 1,
                -beta,
                -beta + 1,
            );
            game.unmake_nullmove(saved);

            if self.aborted {
                return Score::DRAW;
            }
            if score >= beta {
                return beta;
            }
        }

        // Sort moves so that we look at "promising" ones first
        let tt_move = self.ttable.get(&game.key()).and_then(|entry| entry.bestmove);
        let picker = MovePicker::new(moves, |mv| self.score_move(mv, tt_move, ply));

        let original_alpha = alpha;
        let mut best = -Score::INF;
        let mut bestmove = None;

        /****************************************************************************************************
         * Primary move loop
         ****************************************************************************************************/
        for (i, mv) in picker.enumerate() {
            game.make_move(mv);

            /****************************************************************************************************
             * Late Move Reductions: https://www.chessprogramming.org/Late_Move_Reductions
             *
             * With good move ordering, late quiet moves rarely matter; search
             * them shallower with a null window, and re-search in full only
             * when one surprises us by raising alpha.
             ****************************************************************************************************/
            let reduce = i >= tune::min_lmr_moves!()
                && depth >= tune::min_lmr_depth!()
                && mv.is_quiet()
                && !game.in_check();

            let mut score;
            if reduce {
                score = -self.negamax(
                    game,
                    depth - tune::lmr_reduction!(),
                    ply + 1,
                    -alpha - 1,
                    -alpha,
                );

                if score > alpha && !self.aborted {
                    score = -self.negamax(game, depth - 1, ply + 1, -beta, -alpha);
                }
            } else {
                score = -self.negamax(game, depth - 1, ply + 1, -beta, -alpha);
            }

            game.unmake_move();

            if self.aborted {
                return Score::DRAW;
            }

            if score > best {
                best = score;

                if score > alpha {
                    alpha = score;
                    bestmove = Some(mv);
                }
            }

            // Fail high
            if alpha >= beta {
                /****************************************************************************************************
                 * Killer & History Heuristics
                 *
                 * A quiet move that refutes this line will likely refute its
                 * siblings too; remember it for ordering.
                 ****************************************************************************************************/
                if mv.is_quiet() {
                    self.killers.store(ply, mv);
                    self.history.update(&mv, depth as u8);
                }
                break;
            }
        }

        // Save this node to the TTable
        self.ttable.store(
            game.key(),
            TTableEntry {
                depth: depth as u8,
                score: best.absolute(ply),
                bound: Bound::new(best, original_alpha, beta),
                bestmove,
                age: 0,
            },
        );

        best
    }

    /// Quiescence Search (QSearch)
    ///
    /// A search over only captures and capture-chains, so that the static
    /// evaluation is applied to "quiet" positions only. Called when
    /// [`Search::negamax`] reaches a depth of 0; recursion is bounded only by
    /// the exhaustion of captures.
    fn quiescence(&mut self, game: &mut Position, ply: i32, mut alpha: Score, beta: Score) -> Score {
        self.check_abort();
        if self.aborted {
            return Score::DRAW;
        }

        // Evaluate the current position, to serve as our baseline
        self.evals += 1;
        let stand_pat = Evaluator::new(game).eval();

        // Beta cutoff; this position is "too good" and our opponent would
        // never let us reach it
        if stand_pat >= beta {
            return beta;
        }
        if stand_pat > alpha {
            alpha = stand_pat;
        }

        // Only capture-chains are explored here. Mates can't be detected
        // without looking at all moves, so an empty list just stands pat.
        let mut captures = game.get_legal_moves();
        captures.retain(|mv| mv.is_capture());

        let picker = MovePicker::new(captures, |mv| self.score_move(mv, None, ply));

        for mv in picker {
            self.nodes += 1;

            game.make_move(mv);
            let score = -self.quiescence(game, ply + 1, -beta, -alpha);
            game.unmake_move();

            if self.aborted {
                return Score::DRAW;
            }

            if score >= beta {
                return beta;
            }
            if score > alpha {
                alpha = score;
            }
        }

        alpha
    }

    /// Applies a score to the provided move for ordering during search.
    ///
    /// The ladder, best first: the TT's best move; captures by
    /// [MVV-LVA](https://www.chessprogramming.org/MVV-LVA); non-capture
    /// promotions; killer-slot matches; the history score.
    fn score_move(&self, mv: &Move, tt_move: Option<Move>, ply: i32) -> i32 {
        if tt_move.is_some_and(|tt_mv| tt_mv.is_same_as(mv)) {
            return tune::tt_move_score!();
        }

        // Capturing a high-value piece with a low-value piece is a good idea
        if let Some(victim) = mv.captured {
            return tune::capture_base_score!() + 10 * victim.kind.value() - mv.piece.kind.value();
        }

        if let Some(kind) = mv.promotion {
            return tune::promotion_base_score!() + kind.value();
        }

        if self.killers.is_killer(ply, mv) {
            return tune::killer_move_score!();
        }

        self.history.get(mv)
    }

    /// Checks whether the search must end: either the time budget is spent or
    /// an external `stop` cleared the searching flag.
    ///
    /// Once set, the abort flag is sticky; every unwinding frame sees it.
    #[inline(always)]
    fn check_abort(&mut self) {
        if self.config.starttime.elapsed() >= self.config.time_limit
            || !self.is_searching.load(Ordering::Relaxed)
        {
            self.aborted = true;
        }
    }

    /// Sends a [`UciResponse`] to `stdout`.
    #[inline(always)]
    fn send_response<T: fmt::Display>(&self, response: UciResponse<T>) {
        println!("{response}");
    }

    /// Sends UCI info about the conclusion of a search iteration.
    fn send_end_of_search_info(&self, result: &SearchResult) {
        let elapsed = self.config.starttime.elapsed();

        let info = UciInfo::new()
            .depth(result.depth)
            .nodes(self.nodes)
            .score(result.score.into_uci())
            .nps((self.nodes as f32 / elapsed.as_secs_f32()).trunc())
            .time(elapsed.as_millis());

        self.send_response(UciResponse::info(info));
    }

    /// Helper to send a [`UciInfo`] containing only a `string` message to `stdout`.
    #[inline(always)]
    fn send_string<T: fmt::Display>(&self, string: T) {
        self.send_response(UciResponse::info_string(string));
    }
}
