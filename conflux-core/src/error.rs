//! Error types for CONFLUX operations

use thiserror::Error;

/// Type-name and identifier validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Type names contain unsupported characters: {names:?}")]
    ReservedDelimiter { names: Vec<String> },

    #[error("Entity id {id:?} is reserved for internal bookkeeping")]
    ReservedId { id: String },
}

/// Agent classification errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("At least one authoritative or informative type must be declared")]
    NoDeclaredTypes,

    #[error("Types declared both authoritative and informative: {names:?}")]
    Overlapping { names: Vec<String> },

    #[error("On-demand type {type_name:?} is already declared")]
    OnDemandCollision { type_name: String },
}

/// Stored-data corruption detected on read.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CorruptionError {
    #[error("Relationship {name:?} on entity {id:?} has no source attribution")]
    UnattributedRelationship { id: String, name: String },
}

/// Backing store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store lock poisoned")]
    LockPoisoned,

    #[error("Backend failure: {reason}")]
    Backend { reason: String },

    #[error("Invalid identifier glob {glob:?}: {reason}")]
    InvalidGlob { glob: String, reason: String },
}

/// Master error type for all CONFLUX errors.
#[derive(Debug, Clone, Error)]
pub enum ConfluxError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Classification error: {0}")]
    Classification(#[from] ClassificationError),

    #[error("Corruption error: {0}")]
    Corruption(#[from] CorruptionError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type alias for CONFLUX operations.
pub type ConfluxResult<T> = Result<T, ConfluxError>;

// =============================================================================
// TESTS
// =============================================================================
