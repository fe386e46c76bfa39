//! Range-query usage counters and the diagnostics report.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::simd::VectorCapability;

/// Cumulative counters for `collect` calls.
///
/// Increments are relaxed atomics. Indexes sharing one `QueryStats` from
/// several threads get approximate totals; nothing reads these for
/// correctness.
#[derive(Debug, Default)]
pub struct QueryStats {
    vectorized_calls: AtomicU64,
    scalar_calls: AtomicU64,
    vectorized_elements: AtomicU64,
}

impl QueryStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// One vectorized collect returning `elements` entries.
    pub fn record_vectorized(&self, elements: usize) {
        self.vectorized_calls.fetch_add(1, Ordering::Relaxed);
        self.vectorized_elements
            .fetch_add(elements as u64, Ordering::Relaxed);
    }

    pub fn record_scalar(&self) {
        self.scalar_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn vectorized_calls(&self) -> u64 {
        self.vectorized_calls.load(Ordering::Relaxed)
    }

    pub fn scalar_calls(&self) -> u64 {
        self.scalar_calls.load(Ordering::Relaxed)
    }

    pub fn vectorized_elements(&self) -> u64 {
        self.vectorized_elements.load(Ordering::Relaxed)
    }

    /// Zero all counters.
    pub fn reset(&self) {
        self.vectorized_calls.store(0, Ordering::Relaxed);
        self.scalar_calls.store(0, Ordering::Relaxed);
        self.vectorized_elements.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time view of the vector unit and the range-query counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct DiagnosticsReport {
    pub vector_available: bool,
    pub capability: VectorCapability,
    /// f64 lanes per comparison; 1 without a vector unit.
    pub lane_width: usize,
    pub vectorized_calls: u64,
    pub scalar_calls: u64,
    pub vectorized_elements: u64,
}

impl DiagnosticsReport {
    pub(crate) fn new(capability: VectorCapability, stats: &QueryStats) -> Self {
        Self {
            vector_available: capability.is_hardware(),
            capability,
            lane_width: capability.lanes(),
            vectorized_calls: stats.vectorized_calls(),
            scalar_calls: stats.scalar_calls(),
            vectorized_elements: stats.vectorized_elements(),
        }
    }
}

impl fmt::Display for DiagnosticsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.vector_available {
            writeln!(
                f,
                "vector unit: {} ({} x f64 lanes)",
                self.capability, self.lane_width
            )?;
        } else {
            writeln!(f, "vector unit: unavailable (scalar fallback)")?;
        }
        write!(
            f,
            "range scans: {} vectorized ({} entries), {} scalar",
            self.vectorized_calls, self.vectorized_elements, self.scalar_calls
        )
    }
}
