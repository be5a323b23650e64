//! Telemetry probe evaluation engine
//!
//! Consumes the wire-format probe documents defined by `probe-model`
//! and runs them: the [`linker`] validates a document and orders its
//! processors, the [`runtime`] drives one instance tick by tick,
//! pulling raw samples through the async [`collector::Collector`] trait
//! and evaluating each processor behavior over the [`registry`] of
//! latest samples and the [`state`] windows.
//!
//! ```no_run
//! use probe_engine::{ProbeRuntime, StaticCollector, StaticPathProvider};
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let doc = probe_model::builders::ecmp_imbalance_probe(
//!     "ecmp imbalance", 120, 600, 300, 1e6, 100, 2.0, 100,
//! );
//! let feed = Arc::new(StaticCollector::new());
//! let mut runtime = ProbeRuntime::new(&doc, feed, Arc::new(StaticPathProvider::new()))?;
//! let report = runtime.tick(chrono::Utc::now()).await?;
//! println!("{} anomalies", report.anomalies.len());
//! # Ok(())
//! # }
//! ```

pub mod collector;
pub mod error;
pub mod linker;
pub mod processors;
pub mod registry;
pub mod runtime;
pub mod sample;
pub mod state;
pub mod topology;

pub use collector::{Collector, CollectorSpec, StaticCollector};
pub use error::{
    CollectorError, EngineError, EngineResult, EvalResult, EvaluationError, LinkError, LinkResult,
};
pub use linker::{link, ExecutionPlan, PlanStep};
pub use registry::StreamRegistry;
pub use runtime::{AnomalyEvent, ProbeRuntime, RuntimeConfig, TickReport};
pub use sample::{Dimensions, Sample, SeriesPoint, Value};
pub use state::{WindowSpec, WindowedStateStore};
pub use topology::{PathProvider, StaticPathProvider, TopologyLink, TopologyPath};
