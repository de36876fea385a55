//! Error types for the practice engine.

use thiserror::Error;

use crate::practice_engine::arena::Division;

/// Failures while reading or writing the persisted progress record.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A session transition that was rejected, or a store write that failed underneath it.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("{division} requires a rating of {required} (current: {rating})")]
    DivisionLocked {
        division: Division,
        required: i32,
        rating: i32,
    },

    #[error("cannot {action} while {phase}")]
    WrongPhase {
        action: &'static str,
        phase: &'static str,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}
