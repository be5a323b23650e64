//! Engine error taxonomy
//!
//! Link errors are fatal for the probe document (it is rejected before
//! instantiation). Evaluation errors are fatal for the running instance.
//! Collector errors are scoped to a single tick: the affected feed
//! yields no samples and downstream stateful processors hold state.

use probe_model::DocumentError;
use thiserror::Error;

/// Errors raised while linking a probe document into an execution plan
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("duplicate processor name '{name}'")]
    DuplicateProcessor { name: String },

    #[error("stream '{stream}' is produced by both '{first}' and '{second}'")]
    DuplicateStream {
        stream: String,
        first: String,
        second: String,
    },

    #[error("processor '{processor}' input '{role}' reads stream '{stream}' which no processor produces")]
    UnresolvedStream {
        processor: String,
        role: String,
        stream: String,
    },

    #[error("processor graph contains a cycle through: {}", members.join(", "))]
    CyclicGraph { members: Vec<String> },

    #[error(transparent)]
    InvalidProperties(#[from] DocumentError),
}

/// Errors raised while evaluating a linked probe
#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error("processor '{processor}' has no input wired for role '{role}'")]
    MissingInput { processor: String, role: String },

    #[error("processor '{processor}' has no output wired for role '{role}'")]
    MissingOutput { processor: String, role: String },

    #[error("processor '{processor}' was linked as '{expected}' but received mismatched properties")]
    BehaviorMismatch {
        processor: String,
        expected: &'static str,
    },
}

/// Errors raised by an external collector feed
#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("collector feed timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("collector feed unavailable: {0}")]
    Unavailable(String),

    #[error("no feed registered for collector '{processor}'")]
    UnknownFeed { processor: String },
}

/// Umbrella error for probe lifecycle operations
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

pub type LinkResult<T> = std::result::Result<T, LinkError>;
pub type EvalResult<T> = std::result::Result<T, EvaluationError>;
pub type EngineResult<T> = std::result::Result<T, EngineError>;
