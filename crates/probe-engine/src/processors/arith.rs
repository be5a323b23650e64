//! Grouped sums and stream subtraction
//!
//! Both behaviors are stateless: they recompute from the latest known
//! value of every input series each tick, so a series that published
//! nothing this tick contributes its held value.

use super::{Behavior, Emission, TickContext};
use crate::error::EvalResult;
use crate::sample::{Dimensions, Sample};
use probe_model::GroupByProps;
use std::collections::BTreeMap;

/// Sum of input values grouped by the `group_by` projection; an empty
/// projection yields a single global sum
pub struct Sum {
    props: GroupByProps,
}

impl Sum {
    pub fn new(props: GroupByProps) -> Self {
        Self { props }
    }
}

impl Behavior for Sum {
    fn evaluate(&mut self, ctx: &TickContext<'_>) -> EvalResult<Emission> {
        let mut totals: BTreeMap<Dimensions, f64> = BTreeMap::new();
        for sample in ctx.input("in")? {
            let Some(value) = sample.value.as_f64() else {
                continue;
            };
            let group = sample.dimensions.project(&self.props.group_by);
            *totals.entry(group).or_insert(0.0) += value;
        }

        let mut emission = Emission::none();
        for (dims, total) in totals {
            emission.push("out", Sample::new(dims, total, ctx.now));
        }
        Ok(emission)
    }
}

/// `minuend - subtrahend` matched by identical dimension tuple; tuples
/// present on only one side are dropped
pub struct Subtract;

impl Behavior for Subtract {
    fn evaluate(&mut self, ctx: &TickContext<'_>) -> EvalResult<Emission> {
        let subtrahends: BTreeMap<Dimensions, f64> = ctx
            .input("subtrahend")?
            .into_iter()
            .filter_map(|s| s.value.as_f64().map(|v| (s.dimensions, v)))
            .collect();

        let mut emission = Emission::none();
        for sample in ctx.input("minuend")? {
            let Some(minuend) = sample.value.as_f64() else {
                continue;
            };
            let Some(subtrahend) = subtrahends.get(&sample.dimensions) else {
                continue;
            };
            emission.push(
                "out",
                Sample::new(sample.dimensions, minuend - subtrahend, ctx.now),
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
    use crate::sample::Value;
    use crate::state::WindowedStateStore;
    use chrono::{DateTime, TimeZone, Utc};
    use probe_model::{ProcessorType, TypedProperties};

    fn at(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, secs).unwrap()
    }

    #[test]
    fn test_global_sum() {
        let registry = StreamRegistry::new();
        let store = WindowedStateStore::new();
        let props = GroupByProps { group_by: vec![] };
        let step = step(
            ProcessorType::Sum,
            TypedProperties::Sum(props.clone()),
            &[("in", "traffic")],
            &[("out", "total")],
        );
        for (sys, value) in [("leaf1", 10.0), ("leaf2", 20.0), ("leaf3", 5.0)] {
            registry.publish(
                "traffic",
                Sample::new(Dimensions::from_pairs([("system_id", sys)]), value, at(0)),
            );
        }

        let mut sum = Sum::new(props);
        let ctx = TickContext {
            step: &step,
            registry: &registry,
            store: &store,
            now: at(1),
        };
        let emission = sum.evaluate(&ctx).unwrap();
        let out = &emission.samples["out"];
        assert_eq!(out.len(), 1);
        assert!(out[0].dimensions.is_empty());
        assert_eq!(out[0].value, Value::Number(35.0));
    }

    #[test]
    fn test_grouped_sum_projects_dimensions() {
        let registry = StreamRegistry::new();
        let store = WindowedStateStore::new();
        let props = GroupByProps {
            group_by: vec!["system_id".to_string()],
        };
        let step = step(
            ProcessorType::Sum,
            TypedProperties::Sum(props.clone()),
            &[("in", "traffic")],
            &[("out", "per_device")],
        );
        for (sys, iface, value) in [
            ("leaf1", "swp1", 10.0),
            ("leaf1", "swp2", 15.0),
            ("leaf2", "swp1", 20.0),
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

        let mut sum = Sum::new(props);
        let ctx = TickContext {
            step: &step,
            registry: &registry,
            store: &store,
            now: at(1),
        };
        let emission = sum.evaluate(&ctx).unwrap();
        let out = &emission.samples["out"];
        assert_eq!(out.len(), 2);
        let leaf1 = Dimensions::from_pairs([("system_id", "leaf1")]);
        assert!(out
            .iter()
            .any(|s| s.dimensions == leaf1 && s.value == Value::Number(25.0)));
    }

    #[test]
    fn test_subtract_drops_unmatched_tuples() {
        let registry = StreamRegistry::new();
        let store = WindowedStateStore::new();
        let step = step(
            ProcessorType::Subtract,
            TypedProperties::Subtract,
            &[("minuend", "total_in"), ("subtrahend", "total_out")],
            &[("out", "difference")],
        );
        registry.publish("total_in", Sample::new(Dimensions::none(), 100.0, at(0)));
        registry.publish("total_out", Sample::new(Dimensions::none(), 30.0, at(0)));
        registry.publish(
            "total_in",
            Sample::new(Dimensions::from_pairs([("pod", "1")]), 50.0, at(0)),
        );

        let mut subtract = Subtract;
        let ctx = TickContext {
            step: &step,
            registry: &registry,
            store: &store,
            now: at(1),
        };
        let emission = subtract.evaluate(&ctx).unwrap();
        let out = &emission.samples["out"];
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].value, Value::Number(70.0));
    }
}
