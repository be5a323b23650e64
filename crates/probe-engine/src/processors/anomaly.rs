//! Rising-edge anomaly detection
//!
//! Emits exactly one event per transition of a boolean series: a raise
//! on false→true (an absent series counts as false), a clear on
//! true→false. Held registry values repeat the previous state and never
//! produce a second event.

use super::{AnomalySignal, Behavior, Emission, TickContext};
use crate::error::EvalResult;
use crate::sample::{Dimensions, Sample};
use std::collections::HashMap;

/// Per-dimension transition tracker shared by the anomaly and
/// range-check behaviors
#[derive(Debug, Default)]
pub struct EdgeDetector {
    last: HashMap<Dimensions, bool>,
}

impl EdgeDetector {
    /// Record the current state; returns the new state only when it
    /// differs from the previous one (absent counts as false)
    pub fn observe(&mut self, dimensions: &Dimensions, state: bool) -> Option<bool> {
        let previous = self
            .last
            .insert(dimensions.clone(), state)
            .unwrap_or(false);
        (previous != state).then_some(state)
    }
}

#[derive(Default)]
pub struct Anomaly {
    edges: EdgeDetector,
}

impl Behavior for Anomaly {
    fn evaluate(&mut self, ctx: &TickContext<'_>) -> EvalResult<Emission> {
        let mut emission = Emission::none();
        for sample in ctx.input("in")? {
            let Some(state) = sample.value.as_bool() else {
                continue;
            };
            if let Some(raised) = self.edges.observe(&sample.dimensions, state) {
                emission.push("out", Sample::new(sample.dimensions.clone(), raised, ctx.now));
                emission.anomalies.push(AnomalySignal {
                    dimensions: sample.dimensions,
                    raised,
                });
            }
        }
        Ok(emission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::testutil::step;
    use crate::registry::StreamRegistry;
    use crate::state::WindowedStateStore;
    use chrono::{DateTime, TimeZone, Utc};
    use probe_model::{ProcessorType, TypedProperties};

    fn at(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, secs).unwrap()
    }

    #[test]
    fn test_fires_once_per_rising_edge() {
        let registry = StreamRegistry::new();
        let store = WindowedStateStore::new();
        let step = step(
            ProcessorType::Anomaly,
            TypedProperties::Anomaly,
            &[("in", "condition")],
            &[("out", "events")],
        );
        let mut anomaly = Anomaly::default();
        let dims = Dimensions::from_pairs([("system_id", "leaf1")]);

        let mut raised = 0;
        let mut cleared = 0;
        for (i, state) in [false, true, true, false, true].into_iter().enumerate() {
            registry.publish("condition", Sample::new(dims.clone(), state, at(i as u32)));
            let ctx = TickContext {
                step: &step,
                registry: &registry,
                store: &store,
                now: at(i as u32),
            };
            for signal in anomaly.evaluate(&ctx).unwrap().anomalies {
                if signal.raised {
                    raised += 1;
                } else {
                    cleared += 1;
                }
            }
        }

        // [false, true, true, false, true]: raises at indices 1 and 4,
        // one clear at index 3.
        assert_eq!(raised, 2);
        assert_eq!(cleared, 1);
    }

    #[test]
    fn test_absent_series_counts_as_false() {
        let mut edges = EdgeDetector::default();
        let dims = Dimensions::none();
        assert_eq!(edges.observe(&dims, false), None);
        assert_eq!(edges.observe(&dims, true), Some(true));
        assert_eq!(edges.observe(&dims, true), None);
        assert_eq!(edges.observe(&dims, false), Some(false));
    }

    #[test]
    fn test_non_boolean_input_ignored() {
        let registry = StreamRegistry::new();
        let store = WindowedStateStore::new();
        let step = step(
            ProcessorType::Anomaly,
            TypedProperties::Anomaly,
            &[("in", "condition")],
            &[("out", "events")],
        );
        registry.publish("condition", Sample::new(Dimensions::none(), 3.0, at(0)));
        let mut anomaly = Anomaly::default();
        let ctx = TickContext {
            step: &step,
            registry: &registry,
            store: &store,
            now: at(0),
        };
        let emission = anomaly.evaluate(&ctx).unwrap();
        assert_eq!(emission.sample_count(), 0);
        assert!(emission.anomalies.is_empty());
    }
}
