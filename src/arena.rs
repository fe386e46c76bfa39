//! Slot arena owning every node of an index.
//!
//! Links between nodes are `u32` slot numbers rather than references, so a
//! node can be reached from several forward links and one backward link while
//! the arena remains its only owner. Released slots are recycled through a
//! free list; a per-slot generation keeps stale [`EntryRef`]s from resolving to
//! a node that later reused the slot.

use std::ops::{Index, IndexMut};

use smallvec::{smallvec, SmallVec};

use crate::error::{IndexError, Result};
use crate::level::MAX_LEVEL;

/// Number of addressable slots. `u32::MAX` itself is [`Link::NIL`].
pub(crate) const MAX_SLOTS: usize = u32::MAX as usize;

// =============================================================================
// Links
// =============================================================================

/// Slot number of a node, or NIL.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) struct Link(u32);

impl Link {
    pub(crate) const NIL: Link = Link(u32::MAX);
    /// The header sentinel always occupies slot 0.
    pub(crate) const HEADER: Link = Link(0);

    #[inline]
    pub(crate) fn is_nil(self) -> bool {
        self == Self::NIL
    }

    #[inline]
    fn slot(self) -> usize {
        debug_assert!(!self.is_nil(), "dereferenced NIL link");
        self.0 as usize
    }
}

/// Stable handle to an entry returned by [`RankIndex::insert`](crate::RankIndex::insert).
///
/// Handles are invalidated by deleting the entry; a stale handle resolves to
/// `None` even after its slot has been reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct EntryRef {
    slot: u32,
    generation: u32,
}

// =============================================================================
// Nodes
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Level {
    pub(crate) forward: Link,
    /// Level-0 steps covered by `forward` (0 when `forward` is NIL at the top).
    pub(crate) span: usize,
}

impl Level {
    const EMPTY: Level = Level {
        forward: Link::NIL,
        span: 0,
    };
}

#[derive(Clone, Debug)]
pub(crate) struct Node {
    pub(crate) score: f64,
    pub(crate) id: i64,
    pub(crate) backward: Link,
    pub(crate) levels: SmallVec<[Level; 2]>,
}

impl Node {
    pub(crate) fn new(score: f64, id: i64, height: usize) -> Self {
        debug_assert!((1..=MAX_LEVEL).contains(&height));
        Self {
            score,
            id,
            backward: Link::NIL,
            levels: smallvec![Level::EMPTY; height],
        }
    }

    fn header() -> Self {
        Self::new(0.0, 0, MAX_LEVEL)
    }

    #[inline]
    pub(crate) fn height(&self) -> usize {
        self.levels.len()
    }

    #[inline]
    pub(crate) fn forward(&self, level: usize) -> Link {
        self.levels[level].forward
    }

    /// Whether this node sorts strictly before `(score, id)`.
    #[inline]
    pub(crate) fn precedes(&self, score: f64, id: i64) -> bool {
        self.score < score || (self.score == score && self.id < id)
    }

    #[inline]
    pub(crate) fn matches(&self, score: f64, id: i64) -> bool {
        self.score == score && self.id == id
    }
}

// =============================================================================
// Arena
// =============================================================================

#[derive(Clone, Debug)]
struct Slot {
    /// Odd while the slot holds a live node.
    generation: u32,
    node: Node,
}

impl Slot {
    #[inline]
    fn is_live(&self) -> bool {
        self.generation & 1 == 1
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Arena {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl Arena {
    pub(crate) fn new() -> Self {
        Self {
            slots: vec![Slot {
                generation: 1,
                node: Node::header(),
            }],
            free: Vec::new(),
        }
    }

    /// Create an arena holding only the header, with room for `capacity`
    /// further nodes.
    pub(crate) fn with_header(capacity: usize) -> Result<Self> {
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity.saturating_add(1))
            .map_err(IndexError::alloc("node slots", capacity.saturating_add(1)))?;
        slots.push(Slot {
            generation: 1,
            node: Node::header(),
        });
        Ok(Self {
            slots,
            free: Vec::new(),
        })
    }

    /// Take ownership of `node`, returning its link.
    ///
    /// Fails without side effects when no slot can be provided.
    pub(crate) fn alloc(&mut self, node: Node) -> Result<Link> {
        if let Some(slot) = self.free.pop() {
            let s = &mut self.slots[slot as usize];
            debug_assert!(!s.is_live());
            s.generation = s.generation.wrapping_add(1);
            s.node = node;
            return Ok(Link(slot));
        }

        if self.slots.len() >= MAX_SLOTS {
            return Err(IndexError::CapacityExhausted { max: MAX_SLOTS - 1 });
        }
        self.slots
            .try_reserve(1)
            .map_err(IndexError::alloc("node slots", 1))?;
        // The free list is empty here; size it so `release` never allocates.
        self.free
            .try_reserve(self.slots.len())
            .map_err(IndexError::alloc("free slots", self.slots.len()))?;

        let link = Link(self.slots.len() as u32);
        self.slots.push(Slot {
            generation: 1,
            node,
        });
        Ok(link)
    }

    /// Drop the node at `link` and recycle its slot.
    pub(crate) fn release(&mut self, link: Link) {
        debug_assert_ne!(link, Link::HEADER, "the header is never released");
        let s = &mut self.slots[link.slot()];
        debug_assert!(s.is_live());
        s.generation = s.generation.wrapping_add(1);
        // Spilled level storage is returned now rather than on reuse.
        s.node.levels = SmallVec::new();
        self.free.push(link.0);
    }

    /// Release every node except the header.
    ///
    /// Slots are kept so their generations survive; handles taken before the
    /// reset stay stale after the slots are reused.
    pub(crate) fn release_all(&mut self) {
        self.free.clear();
        for (slot, s) in self.slots.iter_mut().enumerate().skip(1).rev() {
            if s.is_live() {
                s.generation = s.generation.wrapping_add(1);
                s.node.levels = SmallVec::new();
            }
            // Capacity for every slot was reserved as it was pushed.
            self.free.push(slot as u32);
        }
    }

    pub(crate) fn handle(&self, link: Link) -> EntryRef {
        EntryRef {
            slot: link.0,
            generation: self.slots[link.slot()].generation,
        }
    }

    pub(crate) fn resolve(&self, handle: EntryRef) -> Option<Link> {
        if handle.slot == Link::HEADER.0 {
            return None;
        }
        let s = self.slots.get(handle.slot as usize)?;
        (s.is_live() && s.generation == handle.generation).then_some(Link(handle.slot))
    }

    /// Bytes held by slots, spilled level arrays and the free list.
    pub(crate) fn memory_usage(&self) -> usize {
        let spilled: usize = self
            .slots
            .iter()
            .filter(|s| s.node.levels.spilled())
            .map(|s| s.node.levels.capacity() * std::mem::size_of::<Level>())
            .sum();
        self.slots.capacity() * std::mem::size_of::<Slot>()
            + spilled
            + self.free.capacity() * std::mem::size_of::<u32>()
    }
}

impl Index<Link> for Arena {
    type Output = Node;

    #[inline]
    fn index(&self, link: Link) -> &Node {
        &self.slots[link.slot()].node
    }
}

impl IndexMut<Link> for Arena {
    #[inline]
    fn index_mut(&mut self, link: Link) -> &mut Node {
        &mut self.slots[link.slot()].node
    }
}
