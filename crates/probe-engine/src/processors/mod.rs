//! Processor behaviors
//!
//! One [`Behavior`] instance per non-collector step of an execution
//! plan. A behavior reads the latest samples of its input streams from
//! the registry, updates whatever per-dimension state it keeps, and
//! returns the samples to publish this tick, keyed by output role.
//!
//! Stateful behaviors (averaging, windowing, state machines, edge
//! detection) deduplicate held registry values by input timestamp, so a
//! sample re-read on a later tick is never accumulated twice.

mod accumulate;
mod anomaly;
mod arith;
mod average;
mod headroom;
mod matching;
mod range;
mod sets;
mod stddev;
mod time_in_state;

pub use anomaly::EdgeDetector;

use crate::error::{EvalResult, EvaluationError};
use crate::linker::PlanStep;
use crate::registry::StreamRegistry;
use crate::sample::{Dimensions, Sample};
use crate::state::WindowedStateStore;
use crate::topology::PathProvider;
use chrono::{DateTime, Utc};
use probe_model::TypedProperties;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Everything a behavior may consult during one tick
pub struct TickContext<'a> {
    pub step: &'a PlanStep,
    pub registry: &'a StreamRegistry,
    pub store: &'a WindowedStateStore,
    pub now: DateTime<Utc>,
}

impl TickContext<'_> {
    /// Latest samples of the input stream wired to `role`
    pub fn input(&self, role: &str) -> EvalResult<Vec<Sample>> {
        let stream = self.step.inputs.get(role).ok_or_else(|| {
            EvaluationError::MissingInput {
                processor: self.step.name.clone(),
                role: role.to_string(),
            }
        })?;
        Ok(self.registry.current(stream))
    }
}

/// An anomaly edge observed by a behavior; the runtime stamps it with
/// an id and the probe/processor identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnomalySignal {
    pub dimensions: Dimensions,
    pub raised: bool,
}

/// What a behavior produced this tick
#[derive(Debug, Default)]
pub struct Emission {
    /// Output role -> samples to publish
    pub samples: BTreeMap<String, Vec<Sample>>,
    pub anomalies: Vec<AnomalySignal>,
}

impl Emission {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn single(role: &str, samples: Vec<Sample>) -> Self {
        let mut out = Self::default();
        out.samples.insert(role.to_string(), samples);
        out
    }

    pub fn push(&mut self, role: &str, sample: Sample) {
        self.samples.entry(role.to_string()).or_default().push(sample);
    }

    pub fn sample_count(&self) -> usize {
        self.samples.values().map(Vec::len).sum()
    }
}

/// One processor's per-tick evaluation
pub trait Behavior: Send {
    fn evaluate(&mut self, ctx: &TickContext<'_>) -> EvalResult<Emission>;
}

/// Instantiate the behavior for a plan step; `None` for collector steps,
/// which are driven by the runtime's feed loop instead
pub fn build_behavior(
    step: &PlanStep,
    paths: Arc<dyn PathProvider>,
) -> Option<Box<dyn Behavior>> {
    match &step.properties {
        TypedProperties::IfCounter(_)
        | TypedProperties::ServiceDataCollector(_)
        | TypedProperties::GenericDataCollector(_)
        | TypedProperties::GenericGraphCollector(_) => None,
        TypedProperties::PeriodicAverage(props) => {
            Some(Box::new(average::PeriodicAverage::new(*props)))
        }
        TypedProperties::Accumulate(props) => {
            Some(Box::new(accumulate::Accumulate::new(&step.name, props)))
        }
        TypedProperties::Sum(props) => Some(Box::new(arith::Sum::new(props.clone()))),
        TypedProperties::Subtract => Some(Box::new(arith::Subtract)),
        TypedProperties::StdDev(props) => Some(Box::new(stddev::StdDev::new(props.clone()))),
        TypedProperties::InRange(props) => Some(Box::new(range::InRange::new(props.clone()))),
        TypedProperties::RangeCheck(props) => {
            Some(Box::new(range::RangeCheck::new(props.clone())))
        }
        TypedProperties::TimeInState(props) => {
            Some(Box::new(time_in_state::TimeInState::new(props.clone())))
        }
        TypedProperties::Anomaly => Some(Box::new(anomaly::Anomaly::default())),
        TypedProperties::MatchPerc(props) => {
            Some(Box::new(matching::Matching::percentage(props.clone())))
        }
        TypedProperties::MatchCount(props) => {
            Some(Box::new(matching::Matching::count(props.clone())))
        }
        TypedProperties::SetComparison(props) => {
            Some(Box::new(sets::SetComparison::new(props.clone())))
        }
        TypedProperties::SetCount(props) => Some(Box::new(sets::SetCount::new(props.clone()))),
        TypedProperties::Headroom(props) => {
            Some(Box::new(headroom::Headroom::new(props.clone(), paths)))
        }
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use probe_model::ProcessorType;

    /// A minimal plan step wired as `in -> "in_stream"`, `out ->
    /// "out_stream"` unless roles are overridden
    pub fn step(
        processor_type: ProcessorType,
        properties: TypedProperties,
        inputs: &[(&str, &str)],
        outputs: &[(&str, &str)],
    ) -> PlanStep {
        PlanStep {
            index: 0,
            name: "under test".to_string(),
            processor_type,
            properties,
            inputs: inputs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            outputs: outputs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}
