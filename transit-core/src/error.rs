//! Error types for transit-core

use thiserror::Error;

use crate::validation::ValidationErrors;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid route: {0}")]
    InvalidRoute(String),

    #[error("Invalid fare segment {from} -> {to}: {reason}")]
    InvalidSegment {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Checkpoint {checkpoint} is not on route {route}")]
    UnknownCheckpoint { route: String, checkpoint: String },

    #[error("Invalid QR payload: {0}")]
    InvalidQrPayload(String),

    #[error(transparent)]
    Validation(#[from] ValidationErrors),
}
