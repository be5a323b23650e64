//! History windows
//!
//! Appends each new input observation to the windowed state store and
//! re-emits the full ordered window contents every tick, one series
//! sample per dimension tuple. Count and duration bounds come from the
//! processor's `max_samples` / `total_duration` properties.

use super::{Behavior, Emission, TickContext};
use crate::error::EvalResult;
use crate::sample::{Sample, SeriesPoint, Value};
use crate::state::WindowSpec;
use probe_model::AccumulateProps;

pub struct Accumulate {
    owner: String,
    spec: WindowSpec,
}

impl Accumulate {
    pub fn new(name: &str, props: &AccumulateProps) -> Self {
        Self {
            owner: name.to_string(),
            spec: WindowSpec::from(props),
        }
    }
}

impl Behavior for Accumulate {
    fn evaluate(&mut self, ctx: &TickContext<'_>) -> EvalResult<Emission> {
        for sample in ctx.input("in")? {
            let fresh = ctx
                .store
                .last_timestamp(&self.owner, &sample.dimensions)
                .map_or(true, |last| sample.timestamp > last);
            if !fresh {
                continue;
            }
            ctx.store.append(
                &self.owner,
                &sample.dimensions,
                SeriesPoint {
                    timestamp: sample.timestamp,
                    value: sample.value.clone(),
                },
                self.spec,
            );
        }
        ctx.store.prune(&self.owner, self.spec, ctx.now);

        let mut emission = Emission::none();
        for dims in ctx.store.dimensions(&self.owner) {
            let snapshot = ctx.store.snapshot(&self.owner, &dims);
            emission.push("out", Sample::new(dims, Value::Series(snapshot), ctx.now));
        }
        Ok(emission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::testutil::step;
    use crate::registry::StreamRegistry;
    use crate::sample::Dimensions;
    use crate::state::WindowedStateStore;
    use chrono::{DateTime, TimeZone, Utc};
    use probe_model::{ProcessorType, TypedProperties};

    fn at(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, secs).unwrap()
    }

    fn harness(props: AccumulateProps) -> (crate::linker::PlanStep, Accumulate) {
        let step = step(
            ProcessorType::Accumulate,
            TypedProperties::Accumulate(props),
            &[("in", "raw")],
            &[("out", "history")],
        );
        (step, Accumulate::new("under test", &props))
    }

    fn series_len(sample: &Sample) -> usize {
        match &sample.value {
            Value::Series(points) => points.len(),
            other => panic!("expected a series, got {other:?}"),
        }
    }

    #[test]
    fn test_count_bound_keeps_newest() {
        let registry = StreamRegistry::new();
        let store = WindowedStateStore::new();
        let (step, mut window) = harness(AccumulateProps {
            total_duration: 0,
            max_samples: 3,
        });
        let dims = Dimensions::none();

        let mut last = Emission::none();
        for i in 0..4u32 {
            registry.publish("raw", Sample::new(dims.clone(), i as f64, at(i)));
            let ctx = TickContext {
                step: &step,
                registry: &registry,
                store: &store,
                now: at(i),
            };
            last = window.evaluate(&ctx).unwrap();
        }

        let out = &last.samples["out"];
        assert_eq!(out.len(), 1);
        assert_eq!(series_len(&out[0]), 3);
        match &out[0].value {
            Value::Series(points) => {
                assert_eq!(points[0].value, Value::Number(1.0));
                assert_eq!(points[2].value, Value::Number(3.0));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_duration_bound_expires_old_points() {
        let registry = StreamRegistry::new();
        let store = WindowedStateStore::new();
        let (step, mut window) = harness(AccumulateProps {
            total_duration: 10,
            max_samples: 100,
        });
        let dims = Dimensions::none();

        registry.publish("raw", Sample::new(dims.clone(), 1.0, at(0)));
        let ctx = TickContext {
            step: &step,
            registry: &registry,
            store: &store,
            now: at(0),
        };
        window.evaluate(&ctx).unwrap();

        // No new input, clock past the duration bound: the old point
        // must expire from the snapshot.
        let ctx = TickContext {
            step: &step,
            registry: &registry,
            store: &store,
            now: at(11),
        };
        let emission = window.evaluate(&ctx).unwrap();
        assert_eq!(series_len(&emission.samples["out"][0]), 0);
    }

    #[test]
    fn test_held_registry_value_appended_once() {
        let registry = StreamRegistry::new();
        let store = WindowedStateStore::new();
        let (step, mut window) = harness(AccumulateProps {
            total_duration: 0,
            max_samples: 10,
        });
        let dims = Dimensions::none();

        registry.publish("raw", Sample::new(dims.clone(), 1.0, at(0)));
        for now in [0u32, 1, 2] {
            let ctx = TickContext {
                step: &step,
                registry: &registry,
                store: &store,
                now: at(now),
            };
            let emission = window.evaluate(&ctx).unwrap();
            assert_eq!(series_len(&emission.samples["out"][0]), 1);
        }
    }
}
