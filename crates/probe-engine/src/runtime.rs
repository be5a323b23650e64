//! Probe runtime
//!
//! Owns one linked probe instance: its stream registry, windowed state,
//! behavior instances, and the collector driving its external feeds.
//! `tick` runs one evaluation pass: collector feeds are pulled first
//! (each bounded by the configured timeout; a failed feed publishes
//! nothing and downstream stateful processors hold state), then the
//! plan executes in topological order, publishing each emission before
//! its consumers run.

use crate::collector::{Collector, CollectorSpec};
use crate::error::{EngineResult, EvalResult, EvaluationError};
use crate::linker::{link, ExecutionPlan};
use crate::processors::{build_behavior, Behavior, TickContext};
use crate::registry::StreamRegistry;
use crate::sample::Dimensions;
use crate::state::WindowedStateStore;
use crate::topology::PathProvider;
use chrono::{DateTime, Utc};
use probe_model::ProbeDocument;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Tunables of one probe instance
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Bound on each collector feed call per tick
    pub collector_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            collector_timeout: Duration::from_secs(10),
        }
    }
}

/// A raised or cleared anomaly, stamped with its origin
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyEvent {
    pub id: Uuid,
    pub probe: String,
    pub processor: String,
    pub dimensions: Dimensions,
    pub raised: bool,
    pub timestamp: DateTime<Utc>,
}

/// What one tick did
#[derive(Debug, Default)]
pub struct TickReport {
    pub published_samples: usize,
    pub anomalies: Vec<AnomalyEvent>,
    /// Collector processors whose feed failed or timed out this tick
    pub failed_collectors: Vec<String>,
}

enum StepDriver {
    /// External feed publishing to the named stream
    Collector(CollectorSpec, String),
    Behavior(Box<dyn Behavior>),
}

pub struct ProbeRuntime {
    plan: ExecutionPlan,
    drivers: Vec<StepDriver>,
    registry: StreamRegistry,
    store: WindowedStateStore,
    collector: Arc<dyn Collector>,
    config: RuntimeConfig,
}

impl ProbeRuntime {
    pub fn new(
        doc: &ProbeDocument,
        collector: Arc<dyn Collector>,
        paths: Arc<dyn PathProvider>,
    ) -> EngineResult<Self> {
        Self::with_config(doc, collector, paths, RuntimeConfig::default())
    }

    pub fn with_config(
        doc: &ProbeDocument,
        collector: Arc<dyn Collector>,
        paths: Arc<dyn PathProvider>,
        config: RuntimeConfig,
    ) -> EngineResult<Self> {
        let plan = link(doc)?;

        let mut drivers = Vec::with_capacity(plan.steps.len());
        for step in &plan.steps {
            match build_behavior(step, Arc::clone(&paths)) {
                Some(behavior) => drivers.push(StepDriver::Behavior(behavior)),
                None => {
                    let stream = step.outputs.get("out").cloned().ok_or_else(|| {
                        EvaluationError::MissingOutput {
                            processor: step.name.clone(),
                            role: "out".to_string(),
                        }
                    })?;
                    drivers.push(StepDriver::Collector(
                        CollectorSpec {
                            processor: step.name.clone(),
                            processor_type: step.processor_type,
                            properties: step.properties.clone(),
                        },
                        stream,
                    ));
                }
            }
        }

        info!(probe = %plan.label, steps = plan.steps.len(), "probe instantiated");

        Ok(Self {
            plan,
            drivers,
            registry: StreamRegistry::new(),
            store: WindowedStateStore::new(),
            collector,
            config,
        })
    }

    pub fn label(&self) -> &str {
        &self.plan.label
    }

    pub fn plan(&self) -> &ExecutionPlan {
        &self.plan
    }

    pub fn registry(&self) -> &StreamRegistry {
        &self.registry
    }

    /// Run one evaluation pass at logical time `now`
    pub async fn tick(&mut self, now: DateTime<Utc>) -> EvalResult<TickReport> {
        let mut report = TickReport::default();

        for (step, driver) in self.plan.steps.iter().zip(self.drivers.iter_mut()) {
            match driver {
                StepDriver::Collector(spec, stream) => {
                    let collected = tokio::time::timeout(
                        self.config.collector_timeout,
                        self.collector.collect(spec),
                    )
                    .await;
                    match collected {
                        Ok(Ok(samples)) => {
                            report.published_samples +=
                                self.registry.publish_all(stream, samples);
                        }
                        Ok(Err(err)) => {
                            warn!(probe = %self.plan.label, processor = %step.name, %err, "collector feed failed");
                            report.failed_collectors.push(step.name.clone());
                        }
                        Err(_) => {
                            warn!(probe = %self.plan.label, processor = %step.name, "collector feed timed out");
                            report.failed_collectors.push(step.name.clone());
                        }
                    }
                }
                StepDriver::Behavior(behavior) => {
                    let ctx = TickContext {
                        step,
                        registry: &self.registry,
                        store: &self.store,
                        now,
                    };
                    let emission = behavior.evaluate(&ctx)?;
                    for (role, samples) in emission.samples {
                        // Roles left unwired in the document are simply
                        // not published.
                        if let Some(stream) = step.outputs.get(&role) {
                            report.published_samples +=
                                self.registry.publish_all(stream, samples);
                        }
                    }
                    for signal in emission.anomalies {
                        let event = AnomalyEvent {
                            id: Uuid::new_v4(),
                            probe: self.plan.label.clone(),
                            processor: step.name.clone(),
                            dimensions: signal.dimensions,
                            raised: signal.raised,
                            timestamp: now,
                        };
                        info!(
                            probe = %event.probe,
                            processor = %event.processor,
                            dimensions = %event.dimensions,
                            raised = event.raised,
                            "anomaly edge"
                        );
                        report.anomalies.push(event);
                    }
                }
            }
        }

        debug!(
            probe = %self.plan.label,
            published = report.published_samples,
            anomalies = report.anomalies.len(),
            failed = report.failed_collectors.len(),
            "tick complete"
        );
        Ok(report)
    }
}
