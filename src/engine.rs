/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
    fmt, io,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{channel, Receiver, Sender},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
};

use anyhow::{bail, Context, Result};
use clap::Parser;
use uci_parser::{UciCommand, UciInfo, UciOption, UciParseError, UciResponse};

use crate::{
    perft, splitperft, EngineCommand, Evaluator, LogDebug, LogInfo, LogLevel, LogNone, Move,
    OpeningBook, Position, Search, SearchConfig, SearchResult, Square, TTable,
};

/// Counters reported by [`Engine::stats`] for the most recent search.
#[derive(Debug, Default, Clone, Copy)]
pub struct EngineStats {
    /// Static evaluations performed.
    pub evaluations: u64,

    /// Wall-clock milliseconds the search consumed.
    pub time_elapsed_ms: u128,

    /// Nodes visited.
    pub nodes: u64,

    /// Entries currently stored in the transposition table.
    pub tt_size: usize,
}

/// The newt chess engine.
///
/// Owns the game state, the transposition table, and the opening book, and
/// runs the event loop that the UCI adapter and REPL commands feed into.
pub struct Engine {
    /// The current state of the chess board, as known to the engine.
    ///
    /// This is modified whenever moves are played or new positions are given,
    /// and is reset whenever the engine is told to start a new game.
    game: Position,

    /// One half of a channel, responsible for sending commands to the engine to execute.
    sender: Sender<EngineCommand>,

    /// One half of a channel, responsible for receiving commands for the engine to execute.
    receiver: Receiver<EngineCommand>,

    /// Atomic flag to determine whether a search is currently running.
    is_searching: Arc<AtomicBool>,

    /// Handle to the currently-running search thread, if one exists.
    search_thread: Option<JoinHandle<SearchResult>>,

    /// Transposition table used to cache information found during search.
    ttable: Arc<Mutex<TTable>>,

    /// Opening book, consulted before any search.
    book: OpeningBook,

    /// Result of the most recent completed search.
    last_result: Option<SearchResult>,

    /// Whether to display extra information during execution.
    debug: bool,
}

impl Engine {
    /// Constructs a new [`Engine`] instance to be executed with [`Engine::run`].
    pub fn new() -> Self {
        let (sender, receiver) = channel();

        Self {
            game: Position::default(),
            sender,
            receiver,
            is_searching: Arc::default(),
            search_thread: None,
            ttable: Arc::default(),
            book: OpeningBook::new(),
            last_result: None,
            debug: false,
        }
    }

    /// Returns a string of the engine's name and current version.
    #[inline(always)]
    pub fn name(&self) -> String {
        format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }

    /// Sends an [`EngineCommand`] to the engine to be executed.
    pub fn send_command(&self, command: EngineCommand) {
        // Safe unwrap: the corresponding receiver lives as long as the engine
        self.sender
            .send(command)
            .expect("failed to send a command to the engine");
    }

    /// Entrypoint of the engine.
    ///
    /// Spawns a thread that reads `stdin`, then executes commands in the
    /// order received until `quit`/`exit`.
    pub fn run(&mut self) -> Result<()> {
        let sender = self.sender.clone();
        thread::spawn(|| {
            if let Err(err) = input_handler(sender) {
                eprintln!("Input handler thread stopping after fatal error: {err:#}");
            }
        });

        while let Ok(cmd) = self.receiver.recv() {
            match cmd {
                EngineCommand::Display => println!("{}", self.game),

                EngineCommand::Eval => println!("{}", self.static_eval()),

                EngineCommand::Exit => break,

                EngineCommand::Fen => println!("{}", self.game.to_fen()),

                EngineCommand::HashInfo => self.hash_info(),

                EngineCommand::MakeMove { mv_string } => {
                    if !self.apply_move_text(&mv_string) {
                        eprintln!("{mv_string:?} is not legal in the current position");
                    }
                }

                EngineCommand::Moves { square } => match self.moves(square.as_deref()) {
                    Ok(list) => println!("{list}"),
                    Err(e) => eprintln!("{e:#}"),
                },

                EngineCommand::Perft { depth } => {
                    println!("{}", perft(&mut self.game, depth));
                }

                EngineCommand::Splitperft { depth } => {
                    println!("{}", splitperft(&mut self.game, depth));
                }

                EngineCommand::Uci { cmd } => {
                    // The UCI spec states to continue execution if an error occurs
                    if let Err(e) = self.handle_uci_command(cmd) {
                        eprintln!("Error: {e:#}");
                    }
                }
            }
        }

        // Wind down any search still running so its thread can exit cleanly
        let _ = self.stop_search();

        Ok(())
    }

    /// Handle the execution of a single [`UciCommand`].
    fn handle_uci_command(&mut self, uci: UciCommand) -> Result<()> {
        use UciCommand::*;
        match uci {
            Uci => self.uci(),

            Debug(status) => self.debug = status,

            IsReady => println!("{}", UciResponse::<&str>::ReadyOk),

            SetOption { name, value } => self.set_option(&name, value)?,

            UciNewGame => self.new_game(),

            Position { fen, moves } => self.position(fen, moves)?,

            Go(options) => {
                let config = SearchConfig::new(options, &self.game);
                self.go(config);
            }

            Stop => self.set_is_searching(false),

            Quit => self.send_command(EngineCommand::Exit),

            _ => bail!("{} does not support UCI command {uci:?}", self.name()),
        }

        Ok(())
    }

    /// Called when the engine receives the `uci` command.
    ///
    /// Prints the engine's identification banner and lists all UCI options.
    fn uci(&self) {
        println!("id name {}\nid author {}\n", self.name(), "the newt authors");

        for opt in self.options() {
            println!("{}", UciResponse::Option(opt));
        }

        println!("{}", UciResponse::<&str>::UciOk)
    }

    /// Convenience function to return an iterator over all UCI options this engine supports.
    fn options(&self) -> impl Iterator<Item = UciOption<&str>> {
        [
            UciOption::button("Clear Hash"),
            UciOption::spin(
                "Hash",
                TTable::DEFAULT_SIZE as i32,
                TTable::MIN_SIZE as i32,
                TTable::MAX_SIZE as i32,
            ),
            UciOption::spin("Threads", 1, 1, 1),
        ]
        .into_iter()
    }

    /// Handles the `setoption` command, setting option `name` to `value`.
    ///
    /// Returns an error if `name` isn't a valid option or `value` is not a
    /// valid value for that option.
    fn set_option(&mut self, name: &str, value: Option<String>) -> Result<()> {
        match name {
            "Clear Hash" => self.ttable().clear(),

            "Hash" => {
                let Some(value) = value.as_ref() else {
                    bail!("usage: setoption name {name} value <value>");
                };

                let Ok(mb) = value.parse() else {
                    bail!("expected integer, got {value:?}");
                };

                if !(TTable::MIN_SIZE..=TTable::MAX_SIZE).contains(&mb) {
                    bail!(
                        "Hash must be between {}mb and {}mb",
                        TTable::MIN_SIZE,
                        TTable::MAX_SIZE
                    );
                }

                *self.ttable() = TTable::new(mb);
            }

            "Threads" => bail!("{} supports only 1 thread", self.name()),

            _ => bail!("Unrecognized option {name:?}"),
        }

        if self.debug {
            Self::send_string(format!("Option {name} set"));
        }

        Ok(())
    }

    /// Resets the engine's internal game state for a new game.
    ///
    /// Loads the starting position, clears the transposition table, and
    /// cancels any ongoing search, ignoring its result.
    pub fn new_game(&mut self) {
        self.set_is_searching(false);
        self.search_thread = None;
        self.ttable().clear();
        self.last_result = None;
        self.game = Position::default();
    }

    /// Sets the position to the supplied FEN (or the starting position), then
    /// applies `moves` one-by-one.
    ///
    /// On any failure the engine's position is left untouched.
    fn position<T: AsRef<str>>(
        &mut self,
        fen: Option<T>,
        moves: impl IntoIterator<Item = T>,
    ) -> Result<()> {
        let mut game = if let Some(fen) = fen {
            Position::from_fen(fen.as_ref())?
        } else {
            Position::default()
        };

        for mv_str in moves {
            game.make_move_uci(mv_str.as_ref())
                .with_context(|| format!("while applying move {:?}", mv_str.as_ref()))?;
        }

        self.game = game;
        Ok(())
    }

    /// Executes the `go` flow: consult the opening book, and fall back to a
    /// threaded search on a miss.
    fn go(&mut self, config: SearchConfig) {
        if let Some(mv) = self.book.pick(&mut self.game) {
            if self.debug {
                Self::send_string(format!("Book hit: {mv}"));
            }
            println!(
                "{}",
                UciResponse::BestMove {
                    bestmove: Some(mv.to_string()),
                    ponder: None,
                }
            );
            return;
        }

        self.search_thread = if self.debug {
            self.start_search::<LogDebug>(config)
        } else {
            self.start_search::<LogInfo>(config)
        };
    }

    /// Starts a search on the current position, given the parameters in `config`.
    fn start_search<Log: LogLevel + Send + 'static>(
        &mut self,
        config: SearchConfig,
    ) -> Option<JoinHandle<SearchResult>> {
        // Cannot start a search if one is already running
        if self.is_searching() {
            Self::send_string("A search is already running");
            return None;
        }
        self.set_is_searching(true);

        let is_searching = Arc::clone(&self.is_searching);
        let ttable = Arc::clone(&self.ttable);
        let mut game = self.game.clone();

        let handle = thread::spawn(move || {
            // Hold the table for the duration of the search so only the
            // search thread may modify it
            let mut ttable = ttable
                .lock()
                .expect("failed to acquire transposition table at the start of search");

            Search::<Log>::new(is_searching, config, &mut ttable).start(&mut game)
        });

        Some(handle)
    }

    /// Awaits the current search thread, blocking until it finishes and
    /// recording its result.
    fn stop_search(&mut self) -> Option<SearchResult> {
        self.set_is_searching(false);

        let handle = self.search_thread.take()?;
        let res = handle.join().ok()?;

        self.last_result = Some(res.clone());
        Some(res)
    }

    /// Display info about the transposition table.
    fn hash_info(&self) {
        let ttable = self.ttable();

        let size = ttable.size();
        let num = ttable.num_entries();
        let cap = ttable.capacity();
        let percent = num as f32 / cap as f32 * 100.0;
        println!("TT info: {size}mb @ {num}/{cap} entries ({percent:.2}% full)");
    }

    /// Executes the `moves` command, returning all legal moves, optionally
    /// from a single square, joined by comma-space.
    fn moves(&mut self, square: Option<&str>) -> Result<String> {
        let square = square.map(|s| s.parse::<Square>()).transpose()?;

        let moves: Vec<String> = self
            .game
            .get_legal_moves()
            .into_iter()
            .filter(|mv| square.map_or(true, |sq| mv.from == sq))
            .map(|mv| mv.to_string())
            .collect();

        if moves.is_empty() {
            Ok(String::from("(none)"))
        } else {
            Ok(moves.join(", "))
        }
    }

    /// Loads the position described by `fen`, failing without touching the
    /// current position if the text is malformed.
    pub fn load_position(&mut self, fen: &str) -> Result<()> {
        self.game = Position::from_fen(fen)?;
        Ok(())
    }

    /// Applies the provided move text to the current position.
    ///
    /// Returns `false`, leaving the position unchanged, if the text is
    /// malformed or the move is not legal.
    pub fn apply_move_text(&mut self, mv_str: &str) -> bool {
        self.game.make_move_uci(mv_str).is_ok()
    }

    /// Computes the best move for the current position under the given time
    /// and depth budget, blocking until the search completes.
    ///
    /// Consults the opening book first. Returns `None` only when the side to
    /// move has no legal moves.
    pub fn best_move(&mut self, time_limit_ms: u64, max_depth: u8) -> Option<String> {
        if let Some(mv) = self.book.pick(&mut self.game) {
            return Some(mv.to_string());
        }

        self.set_is_searching(true);
        let is_searching = Arc::clone(&self.is_searching);
        let config = SearchConfig::from_limits(time_limit_ms, max_depth);

        // Borrow the table through a local clone of the Arc so the position
        // can be borrowed mutably alongside it
        let ttable = Arc::clone(&self.ttable);
        let mut ttable = ttable
            .lock()
            .expect("failed to acquire transposition table at the start of search");

        let res = Search::<LogNone>::new(is_searching, config, &mut ttable).start(&mut self.game);
        drop(ttable);

        let bestmove = res.bestmove.map(|mv: Move| mv.to_string());
        self.last_result = Some(res);

        bestmove
    }

    /// Statically evaluates the current position, in centipawns, from the
    /// side-to-move's perspective.
    pub fn static_eval(&mut self) -> i32 {
        Evaluator::new(&mut self.game).eval().inner()
    }

    /// Counters from the most recent search, plus the current table size.
    pub fn stats(&self) -> EngineStats {
        let mut stats = EngineStats {
            tt_size: self.ttable().num_entries(),
            ..Default::default()
        };

        if let Some(res) = &self.last_result {
            stats.evaluations = res.evals;
            stats.nodes = res.nodes;
            stats.time_elapsed_ms = res.elapsed.as_millis();
        }

        stats
    }

    /// Sets the search flag to signal that the engine is starting/stopping a search.
    #[inline(always)]
    fn set_is_searching(&mut self, status: bool) {
        self.is_searching.store(status, Ordering::Relaxed);
    }

    /// Returns `true` if the engine is currently executing a search.
    #[inline(always)]
    fn is_searching(&self) -> bool {
        self.is_searching.load(Ordering::Relaxed)
    }

    /// Helper to send a [`UciInfo`] containing only a `string` message to `stdout`.
    #[inline(always)]
    fn send_string<T: fmt::Display>(info: T) {
        let resp = UciResponse::<String>::Info(Box::new(UciInfo::new().string(info)));
        println!("{resp}");
    }

    /// Helper function to fetch the TTable, panicking if impossible.
    #[inline(always)]
    fn ttable(&self) -> std::sync::MutexGuard<'_, TTable> {
        self.ttable
            .lock()
            .expect("a thread holding the transposition table panicked")
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Loops endlessly awaiting input on `stdin`, sending all successfully-parsed
/// commands through the supplied `sender`.
fn input_handler(sender: Sender<EngineCommand>) -> Result<()> {
    let mut buffer = String::with_capacity(2048);

    loop {
        // Clear the buffer, read input, and trim the trailing newline
        buffer.clear();
        let bytes = io::stdin()
            .read_line(&mut buffer)
            .context("failed to read line from stdin")?;

        // For ctrl + d
        if 0 == bytes {
            sender
                .send(EngineCommand::Exit)
                .context("failed to send 'exit' after empty input")?;

            bail!("engine received input of 0 bytes and is quitting");
        }

        let buf = buffer.trim();

        // Ignore empty lines
        if buf.is_empty() {
            continue;
        }

        // Attempt to parse the input as a UCI command first, since that is
        // the primary use case of the engine
        match UciCommand::new(buf) {
            Ok(cmd) => sender
                .send(EngineCommand::Uci { cmd })
                .context("failed to send UCI command to engine")?,

            // If it's not a UCI command, check if it's an engine-specific command
            Err(UciParseError::UnrecognizedCommand { cmd: _ }) => {
                match EngineCommand::try_parse_from(buf.split_ascii_whitespace()) {
                    Ok(cmd) => sender
                        .send(cmd)
                        .context("failed to send command to engine")?,

                    // If it wasn't a custom command either, print the error
                    Err(err) => eprintln!("{err}"),
                }
            }

            // If it was a malformed UCI command, print a usage message
            Err(uci_err) => eprintln!("{uci_err:#}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Score, FEN_STARTPOS};

    #[test]
    fn test_contract_reset_and_load() {
        let mut engine = Engine::new();
        assert_eq!(engine.game.to_fen(), FEN_STARTPOS);

        engine
            .load_position("4k3/8/8/8/8/8/8/4K2R w K - 0 1")
            .unwrap();
        assert_eq!(engine.game.to_fen(), "4k3/8/8/8/8/8/8/4K2R w K - 0 1");

        // A malformed FEN leaves the position untouched
        assert!(engine.load_position("not a position").is_err());
        assert_eq!(engine.game.to_fen(), "4k3/8/8/8/8/8/8/4K2R w K - 0 1");

        engine.new_game();
        assert_eq!(engine.game.to_fen(), FEN_STARTPOS);
    }

    #[test]
    fn test_contract_apply_move_text() {
        let mut engine = Engine::new();

        assert!(engine.apply_move_text("e2e4"));
        assert!(engine.apply_move_text("e7e5"));

        // Illegal and malformed moves return false without mutating
        let fen = engine.game.to_fen();
        assert!(!engine.apply_move_text("e2e4"));
        assert!(!engine.apply_move_text("zzzz"));
        assert_eq!(engine.game.to_fen(), fen);
    }

    #[test]
    fn test_contract_best_move_and_stats() {
        let mut engine = Engine::new();

        // Out of book: a tactical position where search must run
        engine
            .load_position("6k1/5ppp/8/8/8/8/5PPP/4R1K1 w - - 0 1")
            .unwrap();

        let best = engine.best_move(1_000, 3).expect("a move must be found");
        assert_eq!(best, "e1e8");

        let stats = engine.stats();
        assert!(stats.nodes > 0);
        assert!(stats.evaluations > 0);
        assert!(stats.tt_size > 0);
    }

    #[test]
    fn test_contract_best_move_none_when_game_over() {
        let mut engine = Engine::new();
        engine
            .load_position("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1")
            .unwrap();

        assert!(engine.best_move(100, 3).is_none());
    }

    #[test]
    fn test_contract_static_eval() {
        let mut engine = Engine::new();
        engine
            .load_position("3k4/8/8/8/8/8/8/3QK3 w - - 0 1")
            .unwrap();

        assert!(engine.static_eval() > Score::new(700).inner());
    }

    #[test]
    fn test_best_move_uses_book_at_startpos() {
        let mut engine = Engine::new();
        let best = engine.best_move(50, 2).unwrap();
        assert!(["e2e4", "d2d4", "g1f3", "c2c4"].contains(&best.as_str()));
    }
}
