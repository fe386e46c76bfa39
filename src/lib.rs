//! # rank-index
//!
//! A ranked ordered index of `(score, id)` pairs built on a probabilistic skip
//! list, with vectorized range scans.
//!
//! Entries are ordered by `f64` score, ties broken by `i64` id. Every forward
//! link records how many entries it skips, so positions (ranks) are available
//! in logarithmic time alongside the usual insert, delete and range queries.
//! Range collection compares several scores per instruction when the CPU has a
//! usable vector unit (AVX, SSE2 or NEON) and falls back to a scalar walk
//! otherwise; both produce the same result.
//!
//! ## Example
//!
//! ```rust
//! use rank_index::{Entry, RankIndex};
//!
//! let mut index = RankIndex::new();
//! index.insert(10.0, 1).unwrap();
//! index.insert(20.0, 2).unwrap();
//! index.insert(15.0, 3).unwrap();
//!
//! assert_eq!(index.count(12.0, 20.0), 2);
//! assert_eq!(
//!     index.collect(12.0, 20.0).unwrap(),
//!     vec![Entry::new(3, 15.0), Entry::new(2, 20.0)]
//! );
//! assert_eq!(index.top_n(1), vec![Entry::new(2, 20.0)]);
//! assert!(index.delete(15.0, 3));
//! ```

#![deny(unsafe_op_in_unsafe_fn)]

mod arena;
pub mod collector;
pub mod config;
pub mod error;
mod index;
pub mod level;
mod query;
mod shared;
pub mod simd;
pub mod stats;

pub use arena::EntryRef;
pub use collector::{Cursor, RangeCollector, ScalarCollector, VectorCollector};
pub use config::{DuplicatePolicy, IndexConfig, ScanStrategy};
pub use error::{IndexError, Result};
pub use index::{Entry, Iter, RankIndex};
pub use level::MAX_LEVEL;
pub use shared::SharedIndex;
pub use simd::VectorCapability;
pub use stats::{DiagnosticsReport, QueryStats};

#[cfg(test)]
mod proptests;
