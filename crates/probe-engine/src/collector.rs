//! External collector feeds
//!
//! Collector processors have no inputs; their samples come from the
//! telemetry plane. The engine drives them through the async
//! [`Collector`] trait, one `collect` call per collector processor per
//! tick, bounded by the runtime's per-collector timeout. The
//! `graph_query` selection predicate is opaque to the engine and is
//! handed through unevaluated.

use crate::error::CollectorError;
use crate::sample::Sample;
use async_trait::async_trait;
use dashmap::DashMap;
use probe_model::{ProcessorType, TypedProperties};

/// What a feed needs to know to produce samples for one collector
/// processor
#[derive(Debug, Clone)]
pub struct CollectorSpec {
    /// Name of the collector processor
    pub processor: String,
    pub processor_type: ProcessorType,
    /// Typed collector properties (always one of the collector variants)
    pub properties: TypedProperties,
}

impl CollectorSpec {
    /// The opaque topology selection predicate
    pub fn graph_query(&self) -> Option<&str> {
        match &self.properties {
            TypedProperties::IfCounter(p) => Some(&p.graph_query),
            TypedProperties::ServiceDataCollector(p) => Some(&p.graph_query),
            TypedProperties::GenericDataCollector(p) => Some(&p.graph_query),
            TypedProperties::GenericGraphCollector(p) => Some(&p.graph_query),
            _ => None,
        }
    }
}

/// Source of raw samples for collector processors
#[async_trait]
pub trait Collector: Send + Sync {
    async fn collect(&self, spec: &CollectorSpec) -> Result<Vec<Sample>, CollectorError>;
}

/// In-memory feed keyed by collector processor name; used by tests and
/// by replay tooling
#[derive(Debug, Default)]
pub struct StaticCollector {
    feeds: DashMap<String, Vec<Sample>>,
}

impl StaticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the samples the named collector will yield on the next
    /// ticks
    pub fn set(&self, processor: &str, samples: Vec<Sample>) {
        self.feeds.insert(processor.to_string(), samples);
    }

    /// Remove the feed entirely; subsequent collects fail with
    /// [`CollectorError::UnknownFeed`]
    pub fn clear(&self, processor: &str) {
        self.feeds.remove(processor);
    }
}

#[async_trait]
impl Collector for StaticCollector {
    async fn collect(&self, spec: &CollectorSpec) -> Result<Vec<Sample>, CollectorError> {
        self.feeds
            .get(&spec.processor)
            .map(|samples| samples.clone())
            .ok_or_else(|| CollectorError::UnknownFeed {
                processor: spec.processor.clone(),
            })
    }
}
