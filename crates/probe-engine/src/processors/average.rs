//! Periodic averaging
//!
//! Accumulates numeric inputs per dimension tuple and emits the mean
//! once per `period`, resetting the accumulator after each emission.
//! Between emissions nothing is published; the registry keeps the last
//! emitted average visible to downstream consumers.

use super::{Behavior, Emission, TickContext};
use crate::error::EvalResult;
use crate::sample::{Dimensions, Sample};
use chrono::{DateTime, Duration, Utc};
use probe_model::PeriodicAverageProps;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct Accumulator {
    sum: f64,
    count: u64,
    window_start: Option<DateTime<Utc>>,
    last_seen: Option<DateTime<Utc>>,
}

pub struct PeriodicAverage {
    period: Duration,
    state: HashMap<Dimensions, Accumulator>,
}

impl PeriodicAverage {
    pub fn new(props: PeriodicAverageProps) -> Self {
        Self {
            period: Duration::seconds(props.period as i64),
            state: HashMap::new(),
        }
    }
}

impl Behavior for PeriodicAverage {
    fn evaluate(&mut self, ctx: &TickContext<'_>) -> EvalResult<Emission> {
        for sample in ctx.input("in")? {
            let Some(value) = sample.value.as_f64() else {
                continue;
            };
            let acc = self.state.entry(sample.dimensions.clone()).or_default();
            // Held registry values carry an old timestamp; count each
            // observation once.
            if acc.last_seen.is_some_and(|seen| sample.timestamp <= seen) {
                continue;
            }
            acc.last_seen = Some(sample.timestamp);
            acc.window_start.get_or_insert(sample.timestamp);
            acc.sum += value;
            acc.count += 1;
        }

        let mut emission = Emission::none();
        for (dims, acc) in &mut self.state {
            let Some(start) = acc.window_start else {
                continue;
            };
            if ctx.now - start < self.period {
                continue;
            }
            if acc.count > 0 {
                let mean = acc.sum / acc.count as f64;
                emission.push("out", Sample::new(dims.clone(), mean, ctx.now));
            }
            acc.sum = 0.0;
            acc.count = 0;
            acc.window_start = Some(ctx.now);
        }
        Ok(emission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::testutil::step;
    use crate::registry::StreamRegistry;
    use crate::sample::Value;
    use crate::state::WindowedStateStore;
    use chrono::TimeZone;
    use probe_model::{ProcessorType, TypedProperties};

    fn at(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, secs).unwrap()
    }

    fn behavior(period: u64) -> PeriodicAverage {
        PeriodicAverage::new(PeriodicAverageProps { period })
    }

    #[test]
    fn test_emits_mean_at_period_boundary_and_resets() {
        let registry = StreamRegistry::new();
        let store = WindowedStateStore::new();
        let step = step(
            ProcessorType::PeriodicAverage,
            TypedProperties::PeriodicAverage(PeriodicAverageProps { period: 10 }),
            &[("in", "raw")],
            &[("out", "avg")],
        );
        let mut avg = behavior(10);
        let dims = Dimensions::from_pairs([("system_id", "leaf1")]);

        for (secs, value) in [(0u32, 10.0), (4, 20.0), (8, 30.0)] {
            registry.publish("raw", Sample::new(dims.clone(), value, at(secs)));
            let ctx = TickContext {
                step: &step,
                registry: &registry,
                store: &store,
                now: at(secs),
            };
            let emission = avg.evaluate(&ctx).unwrap();
            assert_eq!(emission.sample_count(), 0, "no emission before the period");
        }

        registry.publish("raw", Sample::new(dims.clone(), 40.0, at(10)));
        let ctx = TickContext {
            step: &step,
            registry: &registry,
            store: &store,
            now: at(10),
        };
        let emission = avg.evaluate(&ctx).unwrap();
        let out = &emission.samples["out"];
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].value, Value::Number(25.0)); // mean of 10,20,30,40

        // The accumulator restarts; a held registry value is not
        // double-counted.
        let ctx = TickContext {
            step: &step,
            registry: &registry,
            store: &store,
            now: at(15),
        };
        assert_eq!(avg.evaluate(&ctx).unwrap().sample_count(), 0);

        registry.publish("raw", Sample::new(dims.clone(), 100.0, at(18)));
        let ctx = TickContext {
            step: &step,
            registry: &registry,
            store: &store,
            now: at(20),
        };
        let emission = avg.evaluate(&ctx).unwrap();
        assert_eq!(emission.samples["out"][0].value, Value::Number(100.0));
    }

    #[test]
    fn test_dimensions_average_independently() {
        let registry = StreamRegistry::new();
        let store = WindowedStateStore::new();
        let step = step(
            ProcessorType::PeriodicAverage,
            TypedProperties::PeriodicAverage(PeriodicAverageProps { period: 5 }),
            &[("in", "raw")],
            &[("out", "avg")],
        );
        let mut avg = behavior(5);
        let a = Dimensions::from_pairs([("system_id", "leaf1")]);
        let b = Dimensions::from_pairs([("system_id", "leaf2")]);

        registry.publish("raw", Sample::new(a.clone(), 10.0, at(0)));
        registry.publish("raw", Sample::new(b.clone(), 50.0, at(0)));
        let ctx = TickContext {
            step: &step,
            registry: &registry,
            store: &store,
            now: at(5),
        };
        let emission = avg.evaluate(&ctx).unwrap();
        let out = &emission.samples["out"];
        assert_eq!(out.len(), 2);
        assert!(out
            .iter()
            .any(|s| s.dimensions == a && s.value == Value::Number(10.0)));
        assert!(out
            .iter()
            .any(|s| s.dimensions == b && s.value == Value::Number(50.0)));
    }
}
