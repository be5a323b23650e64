//! Probe document model
//!
//! This crate defines the wire-format probe document exchanged with the
//! orchestration system, the typed property structs parsed out of each
//! processor's untyped property bag, and the builder functions that
//! assemble the stock probes.
//!
//! A probe document is an ordered list of processor declarations plus a
//! label. The field names `name`, `type`, `inputs`, `outputs`,
//! `properties`, and `stages` are part of the wire contract and are
//! preserved exactly through serde.

pub mod builders;
pub mod document;
pub mod error;
pub mod properties;

pub use document::{ProbeDocument, ProcessorDecl, ProcessorType, Stage};
pub use error::{DocumentError, DocumentResult};
pub use properties::{
    AccumulateProps, GenericDataCollectorProps, GenericGraphCollectorProps, GroupByProps,
    HeadroomProps, IfCounterProps, InRangeProps, MatchProps, PeriodicAverageProps, RangeBounds,
    RangeCheckProps, ServiceDataCollectorProps, SetComparisonProps, StateRange, SystemPair,
    TimeInStateProps, TypedProperties,
};
