//! A [`RankIndex`] behind a reader-writer lock.
//!
//! The index itself is unsynchronized. `SharedIndex` supplies the external
//! mutual exclusion: mutations hold the write lock for their whole duration,
//! queries share the read lock.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use rand::rngs::StdRng;
use rand::RngCore;

use crate::arena::EntryRef;
use crate::config::IndexConfig;
use crate::error::Result;
use crate::index::{Entry, RankIndex};
use crate::stats::DiagnosticsReport;

pub struct SharedIndex<R = StdRng> {
    inner: RwLock<RankIndex<R>>,
}

impl SharedIndex<StdRng> {
    pub fn new() -> Self {
        Self::from_index(RankIndex::new())
    }

    pub fn with_config(config: IndexConfig) -> Result<Self> {
        RankIndex::with_config(config).map(Self::from_index)
    }
}

impl<R> SharedIndex<R> {
    pub fn from_index(index: RankIndex<R>) -> Self {
        Self {
            inner: RwLock::new(index),
        }
    }

    pub fn into_inner(self) -> RankIndex<R> {
        self.inner.into_inner()
    }

    /// Hold the read lock across several queries.
    pub fn read(&self) -> RwLockReadGuard<'_, RankIndex<R>> {
        self.inner.read()
    }

    /// Hold the write lock across several mutations.
    pub fn write(&self) -> RwLockWriteGuard<'_, RankIndex<R>> {
        self.inner.write()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn count(&self, min: f64, max: f64) -> usize {
        self.inner.read().count(min, max)
    }

    pub fn collect(&self, min: f64, max: f64) -> Result<Vec<Entry>> {
        self.inner.read().collect(min, max)
    }

    pub fn top_n(&self, n: usize) -> Vec<Entry> {
        self.inner.read().top_n(n)
    }

    pub fn report_diagnostics(&self) -> DiagnosticsReport {
        self.inner.read().report_diagnostics()
    }
}

impl<R: RngCore> SharedIndex<R> {
    pub fn insert(&self, score: f64, id: i64) -> Result<EntryRef> {
        self.inner.write().insert(score, id)
    }

    pub fn delete(&self, score: f64, id: i64) -> bool {
        self.inner.write().delete(score, id)
    }

    pub fn update_score(&self, score: f64, id: i64, new_score: f64) -> Result<Option<EntryRef>> {
        self.inner.write().update_score(score, id, new_score)
    }
}

impl Default for SharedIndex<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_concurrent_writers_and_readers() {
        let shared = Arc::new(SharedIndex::with_config(IndexConfig::new().seed(3)).unwrap());

        let writers: Vec<_> = (0..4i64)
            .map(|w| {
                let shared = Arc::clone(&shared);
                std::thread::spawn(move || {
                    for i in 0..250i64 {
                        let id = w * 1000 + i;
                        shared.insert(i as f64, id).unwrap();
                    }
                })
            })
            .collect();
        let reader = {
            let shared = Arc::clone(&shared);
            std::thread::spawn(move || {
                for _ in 0..100 {
                    let n = shared.count(0.0, 1000.0);
                    let got = shared.collect(0.0, 1000.0).unwrap();
                    // Each call takes its own snapshot; both stay sorted.
                    assert!(n <= 1000);
                    assert!(got.windows(2).all(|w| w[0].score <= w[1].score));
                }
            })
        };

        for w in writers {
            w.join().unwrap();
        }
        reader.join().unwrap();

        assert_eq!(shared.len(), 1000);
        assert_eq!(shared.count(0.0, 249.0), 1000);
        assert_eq!(shared.count(100.0, 100.0), 4);
    }

    #[test]
    fn test_guards_and_into_inner() {
        let shared = SharedIndex::new();
        {
            let mut w = shared.write();
            w.insert(1.0, 1).unwrap();
            w.insert(2.0, 2).unwrap();
        }
        assert_eq!(shared.read().rank(2.0, 2), Some(2));
        assert!(shared.delete(1.0, 1));
        assert!(shared.update_score(2.0, 2, 5.0).unwrap().is_some());
        let index = shared.into_inner();
        assert_eq!(index.first(), Some(Entry::new(2, 5.0)));
    }
}
