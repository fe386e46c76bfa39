//! The ranked skip list: structure, insertion, deletion and traversal.

use std::fmt;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::{debug, trace};

use crate::arena::{Arena, EntryRef, Link, Node};
use crate::collector::VectorCollector;
use crate::config::{DuplicatePolicy, IndexConfig};
use crate::error::{IndexError, Result};
use crate::level::{random_level, MAX_LEVEL};
use crate::stats::QueryStats;

/// One stored `(score, id)` pair.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Entry {
    pub id: i64,
    pub score: f64,
}

impl Entry {
    pub fn new(id: i64, score: f64) -> Self {
        Self { id, score }
    }

    #[inline]
    pub(crate) fn of(node: &Node) -> Self {
        Self {
            id: node.id,
            score: node.score,
        }
    }
}

/// Per level, the last node strictly before a key, and the level-0 rank of
/// that node.
struct Predecessors {
    update: [Link; MAX_LEVEL],
    rank: [usize; MAX_LEVEL],
}

// =============================================================================
// RankIndex
// =============================================================================

/// Ordered index of `(score, id)` pairs backed by a probabilistic skip list.
///
/// Entries are kept ascending by score, then by id. Insert and delete run in
/// expected `O(log n)`; range queries in `O(log n + k)`. Every forward link
/// carries a span, so rank lookups are logarithmic too.
///
/// The index is not internally synchronized: mutation takes `&mut self` and
/// queries take `&self`. Wrap it in [`SharedIndex`](crate::SharedIndex) to
/// share it between threads.
pub struct RankIndex<R = StdRng> {
    pub(crate) arena: Arena,
    pub(crate) tail: Link,
    pub(crate) length: usize,
    pub(crate) level: usize,
    rng: R,
    pub(crate) config: IndexConfig,
    pub(crate) vector: VectorCollector,
    pub(crate) stats: Arc<QueryStats>,
}

impl RankIndex<StdRng> {
    /// Empty index with the default configuration and an entropy-seeded RNG.
    pub fn new() -> Self {
        Self::from_parts(
            Arena::new(),
            StdRng::from_entropy(),
            IndexConfig::default(),
        )
    }

    pub fn with_config(config: IndexConfig) -> Result<Self> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }
}

impl<R: RngCore> RankIndex<R> {
    /// Empty index drawing node levels from `rng`. `config.seed` is ignored.
    pub fn with_rng(config: IndexConfig, rng: R) -> Result<Self> {
        config.validate()?;
        let arena = Arena::with_header(config.initial_capacity)?;
        Ok(Self::from_parts(arena, rng, config))
    }

    /// Insert `(score, id)`, returning a handle to the new entry.
    ///
    /// Under [`DuplicatePolicy::Allow`] an existing identical pair is kept and
    /// the new entry is placed before it. On error nothing is linked.
    pub fn insert(&mut self, score: f64, id: i64) -> Result<EntryRef> {
        if score.is_nan() {
            return Err(IndexError::InvalidScore { id });
        }

        let Predecessors {
            mut update,
            mut rank,
        } = self.predecessors(score, id);

        if self.config.duplicates == DuplicatePolicy::Reject {
            let next = self.arena[update[0]].forward(0);
            if !next.is_nil() && self.arena[next].matches(score, id) {
                return Err(IndexError::Duplicate { score, id });
            }
        }

        let height = random_level(&mut self.rng);
        let x = self.arena.alloc(Node::new(score, id, height))?;

        if height > self.level {
            trace!(from = self.level, to = height, "raising index level");
            for i in self.level..height {
                rank[i] = 0;
                update[i] = Link::HEADER;
                self.arena[Link::HEADER].levels[i].span = self.length;
            }
            self.level = height;
        }

        for i in 0..height {
            let prev = self.arena[update[i]].levels[i];
            let walked = rank[0] - rank[i];

            let own = &mut self.arena[x].levels[i];
            own.forward = prev.forward;
            own.span = prev.span - walked;

            let before = &mut self.arena[update[i]].levels[i];
            before.forward = x;
            before.span = walked + 1;
        }

        // Links above the new node's height now pass over one more entry.
        for i in height..self.level {
            self.arena[update[i]].levels[i].span += 1;
        }

        self.arena[x].backward = if update[0] == Link::HEADER {
            Link::NIL
        } else {
            update[0]
        };
        let next = self.arena[x].forward(0);
        if next.is_nil() {
            self.tail = x;
        } else {
            self.arena[next].backward = x;
        }

        self.length += 1;
        Ok(self.arena.handle(x))
    }

    /// Remove the first entry equal to `(score, id)`. Returns whether one was
    /// found.
    pub fn delete(&mut self, score: f64, id: i64) -> bool {
        let preds = self.predecessors(score, id);
        let x = self.arena[preds.update[0]].forward(0);
        if x.is_nil() || !self.arena[x].matches(score, id) {
            return false;
        }
        self.unlink(x, &preds.update);
        self.arena.release(x);
        true
    }

    /// Move the entry `(score, id)` to `new_score`.
    ///
    /// Returns `Ok(None)` when no such entry exists. The score is rewritten in
    /// place when the entry keeps its position; otherwise the moved entry is
    /// inserted before the old one is removed, so a failed insert leaves the
    /// old entry untouched.
    pub fn update_score(&mut self, score: f64, id: i64, new_score: f64) -> Result<Option<EntryRef>> {
        if new_score.is_nan() {
            return Err(IndexError::InvalidScore { id });
        }

        let preds = self.predecessors(score, id);
        let x = self.arena[preds.update[0]].forward(0);
        if x.is_nil() || !self.arena[x].matches(score, id) {
            return Ok(None);
        }
        // Equal scores keep the position; the write still lands for `-0.0`.
        if new_score == score {
            self.arena[x].score = new_score;
            return Ok(Some(self.arena.handle(x)));
        }

        let node = &self.arena[x];
        let after_prev = node.backward.is_nil() || self.arena[node.backward].precedes(new_score, id);
        let next = node.forward(0);
        let before_next = next.is_nil() || {
            let n = &self.arena[next];
            !n.precedes(new_score, id) && !n.matches(new_score, id)
        };
        if after_prev && before_next {
            self.arena[x].score = new_score;
            return Ok(Some(self.arena.handle(x)));
        }

        let moved = self.insert(new_score, id)?;
        let removed = self.delete(score, id);
        debug_assert!(removed, "old entry vanished during update");
        Ok(Some(moved))
    }

    /// Remove every entry. Configuration, RNG state and counters are kept.
    pub fn clear(&mut self) {
        debug!(entries = self.length, "clearing rank index");
        self.arena.release_all();
        let header = &mut self.arena[Link::HEADER];
        for l in header.levels.iter_mut() {
            l.forward = Link::NIL;
            l.span = 0;
        }
        self.tail = Link::NIL;
        self.length = 0;
        self.level = 1;
    }
}

impl<R> RankIndex<R> {
    fn from_parts(arena: Arena, rng: R, config: IndexConfig) -> Self {
        let vector = VectorCollector::detect();
        debug!(
            max_level = MAX_LEVEL,
            capability = %vector.capability(),
            scan = ?config.scan,
            duplicates = ?config.duplicates,
            "created rank index"
        );
        Self {
            arena,
            tail: Link::NIL,
            length: 0,
            level: 1,
            rng,
            config,
            vector,
            stats: Arc::new(QueryStats::new()),
        }
    }

    /// Report range-query counters into `stats` instead of a private set.
    pub fn with_stats(mut self, stats: Arc<QueryStats>) -> Self {
        self.stats = stats;
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.length
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Number of levels currently in use, at least 1.
    #[inline]
    pub fn level(&self) -> usize {
        self.level
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn stats(&self) -> &Arc<QueryStats> {
        &self.stats
    }

    pub fn memory_usage(&self) -> usize {
        std::mem::size_of::<Self>() + self.arena.memory_usage()
    }

    /// Resolve a handle returned by `insert`. Stale handles give `None`.
    pub fn get(&self, entry: EntryRef) -> Option<Entry> {
        self.arena
            .resolve(entry)
            .map(|link| Entry::of(&self.arena[link]))
    }

    pub fn contains(&self, score: f64, id: i64) -> bool {
        self.first_match(score, id).is_some()
    }

    /// 1-based position of the first entry equal to `(score, id)`.
    pub fn rank(&self, score: f64, id: i64) -> Option<usize> {
        let preds = self.predecessors(score, id);
        let x = self.arena[preds.update[0]].forward(0);
        (!x.is_nil() && self.arena[x].matches(score, id)).then(|| preds.rank[0] + 1)
    }

    /// Entry at 1-based position `rank`.
    pub fn get_by_rank(&self, rank: usize) -> Option<Entry> {
        if rank == 0 || rank > self.length {
            return None;
        }
        let mut x = Link::HEADER;
        let mut traversed = 0usize;
        for i in (0..self.level).rev() {
            loop {
                let l = self.arena[x].levels[i];
                if l.forward.is_nil() || traversed + l.span > rank {
                    break;
                }
                traversed += l.span;
                x = l.forward;
            }
            if traversed == rank {
                return Some(Entry::of(&self.arena[x]));
            }
        }
        None
    }

    pub fn first(&self) -> Option<Entry> {
        self.iter().next()
    }

    /// Highest entry, read through the tail link.
    pub fn last(&self) -> Option<Entry> {
        (!self.tail.is_nil()).then(|| Entry::of(&self.arena[self.tail]))
    }

    /// All entries in ascending order. Reverse with `.rev()`.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            arena: &self.arena,
            front: self.arena[Link::HEADER].forward(0),
            back: self.tail,
            remaining: self.length,
        }
    }

    /// Up to `n` highest entries, highest first.
    pub fn top_n(&self, n: usize) -> Vec<Entry> {
        self.iter().rev().take(n).collect()
    }

    /// Up to `n` lowest entries, lowest first.
    pub fn bottom_n(&self, n: usize) -> Vec<Entry> {
        self.iter().take(n).collect()
    }

    fn first_match(&self, score: f64, id: i64) -> Option<Link> {
        let preds = self.predecessors(score, id);
        let x = self.arena[preds.update[0]].forward(0);
        (!x.is_nil() && self.arena[x].matches(score, id)).then_some(x)
    }

    fn predecessors(&self, score: f64, id: i64) -> Predecessors {
        let mut update = [Link::HEADER; MAX_LEVEL];
        let mut rank = [0usize; MAX_LEVEL];
        let mut x = Link::HEADER;

        for i in (0..self.level).rev() {
            rank[i] = if i == self.level - 1 { 0 } else { rank[i + 1] };
            loop {
                let l = self.arena[x].levels[i];
                if l.forward.is_nil() || !self.arena[l.forward].precedes(score, id) {
                    break;
                }
                rank[i] += l.span;
                x = l.forward;
            }
            update[i] = x;
        }

        Predecessors { update, rank }
    }

    /// Detach `x` from every level; the slot is left for the caller to release.
    fn unlink(&mut self, x: Link, update: &[Link; MAX_LEVEL]) {
        for i in 0..self.level {
            if self.arena[update[i]].forward(i) == x {
                let own = self.arena[x].levels[i];
                let before = &mut self.arena[update[i]].levels[i];
                before.span = before.span + own.span - 1;
                before.forward = own.forward;
            } else {
                self.arena[update[i]].levels[i].span -= 1;
            }
        }

        let (next, prev) = (self.arena[x].forward(0), self.arena[x].backward);
        if next.is_nil() {
            self.tail = prev;
        } else {
            self.arena[next].backward = prev;
        }

        let before = self.level;
        while self.level > 1 && self.arena[Link::HEADER].forward(self.level - 1).is_nil() {
            self.level -= 1;
        }
        if self.level != before {
            trace!(from = before, to = self.level, "lowering index level");
        }

        self.length -= 1;
    }
}

impl Default for RankIndex<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

/// A clone shares its diagnostics counters with the index it came from.
impl<R: Clone> Clone for RankIndex<R> {
    fn clone(&self) -> Self {
        Self {
            arena: self.arena.clone(),
            tail: self.tail,
            length: self.length,
            level: self.level,
            rng: self.rng.clone(),
            config: self.config.clone(),
            vector: self.vector,
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<R> fmt::Debug for RankIndex<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|e| (e.id, e.score)))
            .finish()
    }
}

impl<'a, R> IntoIterator for &'a RankIndex<R> {
    type Item = Entry;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

// =============================================================================
// Iteration
// =============================================================================

/// Double-ended iterator over an index: forward links from the front,
/// backward links from the back.
pub struct Iter<'a> {
    arena: &'a Arena,
    front: Link,
    back: Link,
    remaining: usize,
}

impl Iterator for Iter<'_> {
    type Item = Entry;

    fn next(&mut self) -> Option<Entry> {
        if self.remaining == 0 {
            return None;
        }
        let node = &self.arena[self.front];
        self.front = node.forward(0);
        self.remaining -= 1;
        Some(Entry::of(node))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl DoubleEndedIterator for Iter<'_> {
    fn next_back(&mut self) -> Option<Entry> {
        if self.remaining == 0 {
            return None;
        }
        let node = &self.arena[self.back];
        self.back = node.backward;
        self.remaining -= 1;
        Some(Entry::of(node))
    }
}

impl ExactSizeIterator for Iter<'_> {}
