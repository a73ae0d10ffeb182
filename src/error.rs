//! Error types for IU construction.
//!
//! Payload setters never fail; only identifier allocation and configuration loading can.

use thiserror::Error;

use crate::ids::{CreatorId, IuId};

/// Errors raised while building incremental units.
#[derive(Debug, Error)]
pub enum IuError {
    /// The identifier was already issued in the creator's namespace.
    #[error("invalid identifier {iuid} for creator {creator}: already issued")]
    InvalidIdentifier { creator: CreatorId, iuid: IuId },

    /// The creator's namespace has no identifiers left.
    #[error("identifier namespace of creator {0} is exhausted")]
    IdentifiersExhausted(CreatorId),

    /// A producer configuration could not be parsed.
    #[error("invalid producer configuration: {0}")]
    InvalidConfig(#[from] serde_json::Error),
}

/// Result type for IU operations.
pub type IuResult<T> = Result<T, IuError>;
