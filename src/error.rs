/*
 * Error Module
 *
 * Errors raised while configuring or (re)allocating a flock. None of these
 * are fatal to the process: each one is scoped to the flock that produced it,
 * and that flock keeps running on its last valid state.
 */

use std::collections::TryReserveError;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FlockError>;

#[derive(Debug, Error)]
pub enum FlockError {
    /// The requested parameters can never produce a valid flock
    /// (zero instances, zero cell size, degenerate bounds, non-finite weights).
    #[error("invalid configuration for flock `{flock}`: {reason}")]
    InvalidConfiguration { flock: String, reason: String },

    /// Buffer sizing for the flock exceeds what can be allocated or indexed.
    #[error("cannot allocate {requested} {buffer} slots for flock `{flock}`")]
    AllocationFailure {
        flock: String,
        buffer: &'static str,
        requested: usize,
        #[source]
        source: Option<TryReserveError>,
    },

    #[error("failed to read scene file: {0}")]
    SceneIo(#[from] std::io::Error),

    #[error("failed to parse scene file: {0}")]
    SceneParse(#[from] serde_json::Error),
}

impl FlockError {
    pub(crate) fn invalid(flock: &str, reason: impl Into<String>) -> Self {
        FlockError::InvalidConfiguration {
            flock: flock.to_owned(),
            reason: reason.into(),
        }
    }

    pub(crate) fn allocation(
        flock: &str,
        buffer: &'static str,
        requested: usize,
        source: Option<TryReserveError>,
    ) -> Self {
        FlockError::AllocationFailure {
            flock: flock.to_owned(),
            buffer,
            requested,
            source,
        }
    }

    /// Name of the flock this error is scoped to, if any.
    pub fn flock(&self) -> Option<&str> {
        match self {
            FlockError::InvalidConfiguration { flock, .. }
            | FlockError::AllocationFailure { flock, .. } => Some(flock),
            FlockError::SceneIo(_) | FlockError::SceneParse(_) => None,
        }
    }
}
