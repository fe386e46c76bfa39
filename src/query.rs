//! Inclusive score-range queries over a [`RankIndex`].

use tracing::{info, trace};

use crate::arena::Link;
use crate::collector::{in_range, Cursor, RangeCollector, ScalarCollector, VectorCollector};
use crate::config::ScanStrategy;
use crate::error::{IndexError, Result};
use crate::index::{Entry, RankIndex};
use crate::simd::VectorCapability;
use crate::stats::DiagnosticsReport;

impl<R> RankIndex<R> {
    /// Number of entries with `min <= score <= max`.
    pub fn count(&self, min: f64, max: f64) -> usize {
        self.cursor_at(min)
            .take_while(|e| in_range(e.score, min, max))
            .count()
    }

    /// Entries with `min <= score <= max`, ascending.
    ///
    /// The batched path is taken when the index was configured for it, or, under
    /// [`ScanStrategy::Auto`], when a vector unit is present and the result
    /// fills at least two batches. Both paths return the same entries.
    pub fn collect(&self, min: f64, max: f64) -> Result<Vec<Entry>> {
        let count = self.count(min, max);
        let vectorize = match self.config.scan {
            ScanStrategy::Scalar => false,
            ScanStrategy::Vectorized => true,
            ScanStrategy::Auto => {
                self.vector.capability().is_hardware() && count >= 2 * self.vector.lanes()
            }
        };
        if vectorize {
            self.collect_counted(&self.vector, min, max, count)
        } else {
            self.collect_counted(&ScalarCollector, min, max, count)
        }
    }

    /// [`collect`](Self::collect) forced onto the entry-by-entry walk.
    pub fn collect_scalar(&self, min: f64, max: f64) -> Result<Vec<Entry>> {
        self.collect_with(&ScalarCollector, min, max)
    }

    /// [`collect`](Self::collect) forced onto the batched scan.
    pub fn collect_vectorized(&self, min: f64, max: f64) -> Result<Vec<Entry>> {
        self.collect_with(&self.vector, min, max)
    }

    /// [`collect`](Self::collect) through an explicit collector.
    pub fn collect_with<C>(&self, collector: &C, min: f64, max: f64) -> Result<Vec<Entry>>
    where
        C: RangeCollector + ?Sized,
    {
        let count = self.count(min, max);
        self.collect_counted(collector, min, max, count)
    }

    /// Vector unit in use and the cumulative range-scan counters.
    pub fn report_diagnostics(&self) -> DiagnosticsReport {
        let capability = match self.vector.capability() {
            cap if cap.is_hardware() => cap,
            _ => VectorCapability::None,
        };
        let report = DiagnosticsReport::new(capability, &self.stats);
        info!(
            vector_available = report.vector_available,
            capability = %report.capability,
            lane_width = report.lane_width,
            vectorized_calls = report.vectorized_calls,
            scalar_calls = report.scalar_calls,
            vectorized_elements = report.vectorized_elements,
            "range query diagnostics"
        );
        report
    }

    /// The batched collector this index uses.
    pub fn vector_collector(&self) -> VectorCollector {
        self.vector
    }

    fn collect_counted<C>(&self, collector: &C, min: f64, max: f64, count: usize) -> Result<Vec<Entry>>
    where
        C: RangeCollector + ?Sized,
    {
        let mut out = Vec::new();
        out.try_reserve_exact(count)
            .map_err(IndexError::alloc("range entries", count))?;

        // `count` only sizes the buffer; a collector may return fewer or more.
        collector.collect_from(self.cursor_at(min), min, max, &mut out);

        if collector.is_vectorized() {
            self.stats.record_vectorized(out.len());
        } else {
            self.stats.record_scalar();
        }
        trace!(
            min,
            max,
            entries = out.len(),
            lanes = collector.lanes(),
            "range collected"
        );
        Ok(out)
    }

    /// Cursor at the first entry whose score is not below `min`.
    fn cursor_at(&self, min: f64) -> Cursor<'_> {
        let mut x = Link::HEADER;
        for i in (0..self.level).rev() {
            loop {
                let next = self.arena[x].forward(i);
                if next.is_nil() || !(self.arena[next].score < min) {
                    break;
                }
                x = next;
            }
        }
        Cursor::new(&self.arena, self.arena[x].forward(0))
    }
}
