/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::collections::HashMap;

use crate::{Move, Score, ZobristKey};

/// Number of bytes in a megabyte
const BYTES_IN_MB: usize = 1024 * 1024;

/// What a stored score tells us about the true value of its node.
///
/// See [CPW](https://www.chessprogramming.org/Node_Types) for more.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub enum Bound {
    /// The score is exact.
    Exact,

    /// The score is at most alpha (an upper bound).
    Upper,

    /// The score is at least beta (a lower bound).
    Lower,
}

impl Bound {
    /// Classifies `score` against the window it was searched with:
    ///
    /// ```text
    /// if score <= alpha:      UPPER
    /// else if score >= beta:  LOWER
    /// else:                   EXACT
    /// ```
    #[inline(always)]
    pub fn new(score: Score, alpha: Score, beta: Score) -> Self {
        if score <= alpha {
            Self::Upper
        } else if score >= beta {
            Self::Lower
        } else {
            Self::Exact
        }
    }
}

/// An entry in the transposition table.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct TTableEntry {
    /// Depth of the search that produced this entry.
    pub depth: u8,

    /// Score found for this position, ply-absolute for mate scores.
    pub score: Score,

    /// How to interpret `score`.
    pub bound: Bound,

    /// Best move found for this position, if any move improved alpha.
    pub bestmove: Option<Move>,

    /// Searches this entry has survived; older entries are evicted first.
    pub age: u8,
}

/// Transposition Table.
///
/// A bounded map from position identity (see [`ZobristKey`]) to previous
/// search results. When an insert would exceed the capacity, the worse-ranked
/// half of the entries, by `depth - 2 * age`, is evicted, and every surviving
/// entry grows one search older.
#[derive(Debug)]
pub struct TTable {
    entries: HashMap<ZobristKey, TTableEntry>,
    capacity: usize,
}

impl TTable {
    /// Default size of the Transposition Table, in megabytes.
    ///
    /// Chosen to hold roughly a million entries.
    pub const DEFAULT_SIZE: usize = 48;

    /// Minimum size of the Transposition Table, in megabytes.
    pub const MIN_SIZE: usize = 1;

    /// Maximum size of the Transposition Table, in megabytes.
    pub const MAX_SIZE: usize = 1_024;

    /// Create a new [`TTable`] that is approximately `size` megabytes.
    #[inline(always)]
    pub fn new(size: usize) -> Self {
        Self::from_capacity(
            (size * BYTES_IN_MB) / (size_of::<TTableEntry>() + size_of::<ZobristKey>()),
        )
    }

    /// Create a new [`TTable`] that can hold `capacity` entries.
    #[inline(always)]
    pub fn from_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Removes all entries from this [`TTable`].
    #[inline(always)]
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns the number of entries currently stored.
    #[inline(always)]
    pub fn num_entries(&self) -> usize {
        self.entries.len()
    }

    /// Returns the number of entries that can be stored before eviction.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the size of this [`TTable`], in megabytes.
    #[inline(always)]
    pub fn size(&self) -> usize {
        self.capacity * (size_of::<TTableEntry>() + size_of::<ZobristKey>()) / BYTES_IN_MB
    }

    /// Fetch the entry for `key`, if one exists.
    #[inline(always)]
    pub fn get(&self, key: &ZobristKey) -> Option<&TTableEntry> {
        self.entries.get(key)
    }

    /// Store `entry` at `key`, evicting stale entries if the table is full.
    pub fn store(&mut self, key: ZobristKey, entry: TTableEntry) {
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&key) {
            self.prune();
        }

        self.entries.insert(key, entry);
    }

    /// Evicts the worse-ranked half of the entries, ranked by `depth - 2 * age`,
    /// then increments the age of every survivor.
    fn prune(&mut self) {
        let mut ranks: Vec<i32> = self.entries.values().map(rank).collect();
        ranks.sort_unstable();
        let cutoff = ranks[ranks.len() / 2];

        self.entries.retain(|_, entry| rank(entry) >= cutoff);

        // Ranks can collide, so the retain above may keep more than half;
        // that only delays the next prune, it never overflows the map
        for entry in self.entries.values_mut() {
            entry.age = entry.age.saturating_add(1);
        }
    }

    /// Probes the [`TTable`] for an entry at `key`, returning a score to
    /// cut off with, if appropriate.
    ///
    /// A stored score may short-circuit the search if and only if the entry
    /// came from a depth of at least `depth`, and:
    ///   1. the entry is exact, or
    ///   2. the entry is an upper bound with score `<= alpha`, or
    ///   3. the entry is a lower bound with score `>= beta`.
    #[inline(always)]
    pub fn probe(
        &self,
        key: ZobristKey,
        depth: u8,
        ply: i32,
        alpha: Score,
        beta: Score,
    ) -> Option<Score> {
        let entry = self.get(&key)?;

        // Can only cut off if the existing entry came from a greater depth.
        if entry.depth < depth {
            return None;
        }

        // Adjust mate scores to be relative to the current ply
        let score = entry.score.relative(ply);

        match entry.bound {
            Bound::Exact => Some(score),
            Bound::Upper if score <= alpha => Some(alpha),
            Bound::Lower if score >= beta => Some(beta),
            _ => None,
        }
    }
}

impl Default for TTable {
    #[inline(always)]
    fn default() -> Self {
        Self::new(Self::DEFAULT_SIZE)
    }
}

/// Eviction rank: deep, recent entries are worth keeping.
#[inline(always)]
fn rank(entry: &TTableEntry) -> i32 {
    entry.depth as i32 - 2 * entry.age as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Position, FEN_KIWIPETE, FEN_STARTPOS};

    fn entry(depth: u8, age: u8) -> TTableEntry {
        TTableEntry {
            depth,
            score: Score::DRAW,
            bound: Bound::Exact,
            bestmove: None,
            age,
        }
    }

    #[test]
    fn test_store_and_get() {
        let key1 = Position::from_fen(FEN_STARTPOS).unwrap().key();
        let key2 = Position::from_fen(FEN_KIWIPETE).unwrap().key();

        let mut tt = TTable::from_capacity(16);
        assert_eq!(tt.num_entries(), 0);

        tt.store(key1, entry(3, 0));
        assert_eq!(tt.num_entries(), 1);
        assert!(tt.get(&key1).is_some());
        assert!(tt.get(&key2).is_none());

        // Re-storing the same key overwrites rather than grows
        tt.store(key1, entry(5, 0));
        assert_eq!(tt.num_entries(), 1);
        assert_eq!(tt.get(&key1).unwrap().depth, 5);
    }

    #[test]
    fn test_prune_evicts_shallow_and_old() {
        let mut tt = TTable::from_capacity(4);

        // Fill the table via distinct keys from a walk of the start position
        let mut pos = Position::from_fen(FEN_STARTPOS).unwrap();
        let mut keys = vec![pos.key()];
        for mv_str in ["e2e4", "e7e5", "g1f3", "b8c6"] {
            pos.make_move_uci(mv_str).unwrap();
            keys.push(pos.key());
        }

        // Ranks: depth - 2 * age
        tt.store(keys[0], entry(8, 0)); // rank 8
        tt.store(keys[1], entry(6, 0)); // rank 6
        tt.store(keys[2], entry(2, 0)); // rank 2
        tt.store(keys[3], entry(8, 4)); // rank 0

        // A fifth insert forces a prune of the worse-ranked half
        tt.store(keys[4], entry(1, 0));

        assert!(tt.get(&keys[0]).is_some());
        assert!(tt.get(&keys[1]).is_some());
        assert!(tt.get(&keys[2]).is_none());
        assert!(tt.get(&keys[3]).is_none());
        assert!(tt.get(&keys[4]).is_some());

        // Survivors aged by the prune; the new entry did not
        assert_eq!(tt.get(&keys[0]).unwrap().age, 1);
        assert_eq!(tt.get(&keys[4]).unwrap().age, 0);
    }

    #[test]
    fn test_probe_bound_semantics() {
        let key = Position::from_fen(FEN_STARTPOS).unwrap().key();
        let mut tt = TTable::from_capacity(16);

        let alpha = Score::new(-50);
        let beta = Score::new(50);

        // Exact scores always cut
        tt.store(
            key,
            TTableEntry {
                score: Score::new(10),
                ..entry(5, 0)
            },
        );
        assert_eq!(tt.probe(key, 5, 0, alpha, beta), Some(Score::new(10)));

        // Shallower entries never cut
        assert_eq!(tt.probe(key, 6, 0, alpha, beta), None);

        // Upper bounds cut to alpha only when at or below alpha
        tt.store(
            key,
            TTableEntry {
                score: Score::new(-100),
                bound: Bound::Upper,
                ..entry(5, 0)
            },
        );
        assert_eq!(tt.probe(key, 5, 0, alpha, beta), Some(alpha));

        tt.store(
            key,
            TTableEntry {
                score: Score::new(0),
                bound: Bound::Upper,
                ..entry(5, 0)
            },
        );
        assert_eq!(tt.probe(key, 5, 0, alpha, beta), None);

        // Lower bounds cut to beta only when at or above beta
        tt.store(
            key,
            TTableEntry {
                score: Score::new(100),
                bound: Bound::Lower,
                ..entry(5, 0)
            },
        );
        assert_eq!(tt.probe(key, 5, 0, alpha, beta), Some(beta));
    }
}
