//! Error type shared by every fallible index operation.

use std::collections::TryReserveError;

/// Errors surfaced by [`RankIndex`](crate::RankIndex) operations.
///
/// A failed operation never leaves a partial splice behind: the index stays
/// structurally valid and usable after any of these.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IndexError {
    #[error("allocation failed while reserving {requested} {what}")]
    AllocationFailed { what: &'static str, requested: usize },

    #[error("index capacity exhausted: at most {max} entries can be addressed")]
    CapacityExhausted { max: usize },

    #[error("score for identifier {id} is NaN")]
    InvalidScore { id: i64 },

    #[error("entry (score={score}, id={id}) is already present")]
    Duplicate { score: f64, id: i64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl IndexError {
    pub(crate) fn alloc(what: &'static str, requested: usize) -> impl FnOnce(TryReserveError) -> Self {
        move |_| IndexError::AllocationFailed { what, requested }
    }
}

pub type Result<T> = std::result::Result<T, IndexError>;
