//! # Structured Error Handling
//!
//! Error types for the export pipeline. Pre-stream errors (unsupported type,
//! bad filter) are rejected before any body byte is written; mid-stream errors
//! terminate the byte stream and leave the client with a truncated document.

use thiserror::Error;

use crate::object_type::{Feature, ObjectType};

#[derive(Debug, Error)]
pub enum ExportError {
    /// Request token does not map to any known object type. Rejected before I/O.
    #[error("unsupported object type token: {0}")]
    UnsupportedType(String),

    /// Object type does not support the requested feature (sets, apply rules, ...).
    #[error("{object_type} does not support {feature:?}")]
    UnsupportedFeature {
        object_type: ObjectType,
        feature: Feature,
    },

    /// Malformed filter expression. Rejected before query execution.
    #[error("invalid filter expression: {0}")]
    FilterSyntax(String),

    /// Cursor open/advance or prefetch failure. Fatal mid-stream.
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    /// Row references a related object absent from the relation cache.
    /// Fatal in strict mode only; lenient mode degrades to a null field.
    #[error("dangling {relation} reference: {reference}")]
    DanglingReference {
        relation: ObjectType,
        reference: String,
    },

    /// A stored column cannot be represented as JSON. Fatal to the stream.
    #[error("cannot serialize column {column}: {reason}")]
    Serialization { column: String, reason: String },

    /// The transport rejected a write or flush (client gone, channel closed).
    #[error("transport error: {0}")]
    Transport(String),

    /// Emitter state machine misuse; Closed is terminal.
    #[error("emitter used after close")]
    EmitterClosed,

    /// Caller-triggered cancellation between rows.
    #[error("export cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, ExportError>;
