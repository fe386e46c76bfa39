//! Index configuration.

#[cfg(feature = "serde")]
use serde::Deserialize;

use crate::arena::MAX_SLOTS;
use crate::error::{IndexError, Result};

/// What `insert` does when the exact `(score, id)` pair is already stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(rename_all = "snake_case"))]
pub enum DuplicatePolicy {
    /// Store another node with the same keys. `delete` removes the first one.
    #[default]
    Allow,
    /// Fail the insert with [`IndexError::Duplicate`].
    Reject,
}

/// Which range-collection path `collect` takes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(rename_all = "snake_case"))]
pub enum ScanStrategy {
    /// Vectorized when a vector unit is present and the result holds at least
    /// two full batches, scalar otherwise.
    #[default]
    Auto,
    /// Always walk entry by entry.
    Scalar,
    /// Always batch, falling back to emulated lanes when no vector unit exists.
    Vectorized,
}

/// Configuration for a [`RankIndex`](crate::RankIndex).
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(default))]
pub struct IndexConfig {
    /// Duplicate-key handling. Default: allow.
    pub duplicates: DuplicatePolicy,

    /// Range-collection path selection. Default: auto.
    pub scan: ScanStrategy,

    /// Seed for level generation. Default: seeded from OS entropy.
    pub seed: Option<u64>,

    /// Node slots reserved up front. Default: 0.
    pub initial_capacity: usize,
}

impl IndexConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn duplicates(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }

    pub fn scan(mut self, strategy: ScanStrategy) -> Self {
        self.scan = strategy;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Reject settings the arena cannot honor.
    pub fn validate(&self) -> Result<()> {
        // One slot is always taken by the header.
        if self.initial_capacity >= MAX_SLOTS {
            return Err(IndexError::InvalidConfig(format!(
                "initial_capacity {} exceeds the addressable {} entries",
                self.initial_capacity,
                MAX_SLOTS - 1
            )));
        }
        Ok(())
    }
}
