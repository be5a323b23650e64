//! Grouped standard deviation
//!
//! Population standard deviation of the latest value of every input
//! series, grouped by the `group_by` projection. Welford's single-pass
//! update keeps the computation stable for large counter values.

use super::{Behavior, Emission, TickContext};
use crate::error::EvalResult;
use crate::sample::{Dimensions, Sample};
use probe_model::GroupByProps;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
struct Welford {
    count: u64,
    mean: f64,
    m2: f64,
}

impl Welford {
    fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    fn population_std_dev(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        (self.m2 / self.count as f64).sqrt()
    }
}

pub struct StdDev {
    props: GroupByProps,
}

impl StdDev {
    pub fn new(props: GroupByProps) -> Self {
        Self { props }
    }
}

impl Behavior for StdDev {
    fn evaluate(&mut self, ctx: &TickContext<'_>) -> EvalResult<Emission> {
        let mut groups: BTreeMap<Dimensions, Welford> = BTreeMap::new();
        for sample in ctx.input("in")? {
            let Some(value) = sample.value.as_f64() else {
                continue;
            };
            groups
                .entry(sample.dimensions.project(&self.props.group_by))
                .or_default()
                .push(value);
        }

        let mut emission = Emission::none();
        for (dims, stats) in groups {
            emission.push(
                "out",
                Sample::new(dims, stats.population_std_dev(), ctx.now),
            );
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
    fn test_population_std_dev_per_group() {
        let registry = StreamRegistry::new();
        let store = WindowedStateStore::new();
        let props = GroupByProps {
            group_by: vec!["system_id".to_string()],
        };
        let step = step(
            ProcessorType::StdDev,
            TypedProperties::StdDev(props.clone()),
            &[("in", "traffic")],
            &[("out", "imbalance")],
        );
        for (sys, iface, value) in [
            ("A", "swp1", 10.0),
            ("A", "swp2", 20.0),
            ("B", "swp1", 5.0),
        ] {
            registry.publish(
                "traffic",
                Sample::new(
                    Dimensions::from_pairs([("system_id", sys), ("interface", iface)]),
                    value,
                    at(0),
                ),
            );
        }

        let mut std_dev = StdDev::new(props);
        let ctx = TickContext {
            step: &step,
            registry: &registry,
            store: &store,
            now: at(1),
        };
        let emission = std_dev.evaluate(&ctx).unwrap();
        let out = &emission.samples["out"];
        assert_eq!(out.len(), 2);

        let a = Dimensions::from_pairs([("system_id", "A")]);
        let b = Dimensions::from_pairs([("system_id", "B")]);
        let value_of = |dims: &Dimensions| {
            out.iter()
                .find(|s| &s.dimensions == dims)
                .and_then(|s| s.value.as_f64())
                .unwrap()
        };
        // Population std-dev of [10, 20] is 5; a single member has zero
        // spread.
        assert!((value_of(&a) - 5.0).abs() < 1e-9);
        assert!((value_of(&b)).abs() < 1e-9);
    }

    #[test]
    fn test_uniform_values_have_zero_spread() {
        let mut stats = Welford::default();
        for _ in 0..5 {
            stats.push(7.0);
        }
        assert_eq!(stats.population_std_dev(), 0.0);
    }

    #[test]
    fn test_empty_input_emits_nothing() {
        let registry = StreamRegistry::new();
        let store = WindowedStateStore::new();
        let props = GroupByProps { group_by: vec![] };
        let step = step(
            ProcessorType::StdDev,
            TypedProperties::StdDev(props.clone()),
            &[("in", "traffic")],
            &[("out", "imbalance")],
        );
        let mut std_dev = StdDev::new(props);
        let ctx = TickContext {
            step: &step,
            registry: &registry,
            store: &store,
            now: at(0),
        };
        assert_eq!(std_dev.evaluate(&ctx).unwrap().sample_count(), 0);
    }
}
