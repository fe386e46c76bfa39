//! Range collectors: the scalar walk and the lane-batched scan.
//!
//! Both receive a [`Cursor`] positioned at the first entry whose score is not
//! below `min` and append entries while they satisfy `min <= score <= max`,
//! stopping at the first one that does not. Because the predicate and the stop
//! rule are shared, the two produce identical output for the same cursor.

use crate::arena::{Arena, Link};
use crate::index::Entry;
use crate::simd::{self, VectorCapability};

/// Inclusive range predicate shared by every path.
#[inline]
pub(crate) fn in_range(score: f64, min: f64, max: f64) -> bool {
    score >= min && score <= max
}

/// Ascending level-0 walk over an index, starting at some entry.
pub struct Cursor<'a> {
    arena: &'a Arena,
    next: Link,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(arena: &'a Arena, start: Link) -> Self {
        Self { arena, next: start }
    }
}

impl Iterator for Cursor<'_> {
    type Item = Entry;

    #[inline]
    fn next(&mut self) -> Option<Entry> {
        if self.next.is_nil() {
            return None;
        }
        let node = &self.arena[self.next];
        self.next = node.forward(0);
        Some(Entry::of(node))
    }
}

/// A strategy for gathering the in-range run that starts at a cursor.
pub trait RangeCollector {
    /// Entries compared per step; 1 for an entry-by-entry walk.
    fn lanes(&self) -> usize;

    fn is_vectorized(&self) -> bool {
        self.lanes() > 1
    }

    /// Append every leading entry of `cursor` within `[min, max]` to `out`.
    fn collect_from(&self, cursor: Cursor<'_>, min: f64, max: f64, out: &mut Vec<Entry>);
}

/// Plain forward walk with one comparison pair per entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarCollector;

impl RangeCollector for ScalarCollector {
    fn lanes(&self) -> usize {
        1
    }

    fn collect_from(&self, cursor: Cursor<'_>, min: f64, max: f64, out: &mut Vec<Entry>) {
        out.extend(cursor.take_while(|e| in_range(e.score, min, max)));
    }
}

/// Batched scan comparing a full vector of scores per instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorCollector {
    capability: VectorCapability,
}

impl VectorCollector {
    /// Use the best unit on this CPU, or emulated lanes when there is none.
    pub fn detect() -> Self {
        let capability = match VectorCapability::detect() {
            VectorCapability::None => VectorCapability::Portable,
            cap => cap,
        };
        Self { capability }
    }

    /// Use a specific capability; `None` if this CPU cannot run it or it has
    /// no lanes to batch.
    pub fn with_capability(capability: VectorCapability) -> Option<Self> {
        (capability != VectorCapability::None && capability.is_supported())
            .then_some(Self { capability })
    }

    pub fn capability(&self) -> VectorCapability {
        self.capability
    }
}

impl Default for VectorCollector {
    fn default() -> Self {
        Self::detect()
    }
}

impl RangeCollector for VectorCollector {
    fn lanes(&self) -> usize {
        self.capability.lanes()
    }

    fn collect_from(&self, cursor: Cursor<'_>, min: f64, max: f64, out: &mut Vec<Entry>) {
        match self.capability {
            #[cfg(target_arch = "x86_64")]
            VectorCapability::Avx => collect_batched::<4, _>(cursor, min, max, out, |s, lo, hi| {
                // SAFETY: AVX support was checked when this collector was built.
                unsafe { simd::range_mask_avx(s, lo, hi) }
            }),
            #[cfg(target_arch = "x86_64")]
            VectorCapability::Sse2 => collect_batched::<2, _>(cursor, min, max, out, |s, lo, hi| {
                // SAFETY: SSE2 is part of the x86_64 baseline.
                unsafe { simd::range_mask_sse2(s, lo, hi) }
            }),
            #[cfg(target_arch = "aarch64")]
            VectorCapability::Neon => collect_batched::<2, _>(cursor, min, max, out, |s, lo, hi| {
                // SAFETY: NEON support was checked when this collector was built.
                unsafe { simd::range_mask_neon(s, lo, hi) }
            }),
            _ => collect_batched::<2, _>(cursor, min, max, out, simd::range_mask_portable::<2>),
        }
    }
}

/// Gather `N` entries at a time, resolve the batch with one mask, and append
/// the in-range prefix. A short final batch is resolved lane by lane.
#[inline]
fn collect_batched<const N: usize, F>(
    mut cursor: Cursor<'_>,
    min: f64,
    max: f64,
    out: &mut Vec<Entry>,
    mask_of: F,
) where
    F: Fn(&[f64; N], f64, f64) -> u32,
{
    let mut scores = [0.0f64; N];
    let mut batch = [Entry::default(); N];

    loop {
        let mut filled = 0;
        while filled < N {
            match cursor.next() {
                Some(e) => {
                    scores[filled] = e.score;
                    batch[filled] = e;
                    filled += 1;
                }
                None => break,
            }
        }

        if filled < N {
            out.extend(
                batch[..filled]
                    .iter()
                    .take_while(|e| in_range(e.score, min, max)),
            );
            return;
        }

        let mask = mask_of(&scores, min, max);
        let accepted = mask.trailing_ones() as usize;
        debug_assert!(accepted <= N);
        out.extend_from_slice(&batch[..accepted]);
        if accepted < N {
            return;
        }
    }
}
