//! Error types for probe document handling

use thiserror::Error;

/// Errors raised while decoding or validating a probe document
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The property bag of a processor does not deserialize into the
    /// typed struct for its processor type
    #[error("malformed properties for processor '{processor}': {source}")]
    MalformedProperties {
        processor: String,
        #[source]
        source: serde_json::Error,
    },

    /// A `state_range` shape this engine does not support: only a single
    /// `max` entry under the `true` state is accepted
    #[error("unsupported state_range for processor '{processor}': {reason}")]
    UnsupportedStateRange { processor: String, reason: String },

    /// A range with both bounds absent selects everything and is almost
    /// certainly a wiring mistake
    #[error("empty range for processor '{processor}': at least one of min/max is required")]
    EmptyRange { processor: String },

    /// Document-level JSON decode failure
    #[error("invalid probe document: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Result alias for document operations
pub type DocumentResult<T> = std::result::Result<T, DocumentError>;
