//! Set algebra over dimension tuples
//!
//! `set_comparison` projects the dimension tuples of its two input
//! streams onto `significant_keys` and emits the two differences and
//! the intersection as set-valued samples. `set_count` emits the
//! cardinality of set-valued inputs, optionally partitioned by a
//! `group_by` projection of the members.

use super::{Behavior, Emission, TickContext};
use crate::error::EvalResult;
use crate::sample::{Dimensions, Sample, Value};
use probe_model::{GroupByProps, SetComparisonProps};
use std::collections::{BTreeMap, BTreeSet};

pub struct SetComparison {
    props: SetComparisonProps,
}

impl SetComparison {
    pub fn new(props: SetComparisonProps) -> Self {
        Self { props }
    }

    fn project(&self, samples: Vec<Sample>) -> BTreeSet<Dimensions> {
        samples
            .into_iter()
            .map(|s| s.dimensions.project(&self.props.significant_keys))
            .collect()
    }
}

impl Behavior for SetComparison {
    fn evaluate(&mut self, ctx: &TickContext<'_>) -> EvalResult<Emission> {
        let a = self.project(ctx.input("A")?);
        let b = self.project(ctx.input("B")?);

        let only_a: BTreeSet<Dimensions> = a.difference(&b).cloned().collect();
        let only_b: BTreeSet<Dimensions> = b.difference(&a).cloned().collect();
        let common: BTreeSet<Dimensions> = a.intersection(&b).cloned().collect();

        let mut emission = Emission::none();
        for (role, members) in [("A - B", only_a), ("B - A", only_b), ("A & B", common)] {
            emission.push(
                role,
                Sample::new(Dimensions::none(), Value::Set(members), ctx.now),
            );
        }
        Ok(emission)
    }
}

pub struct SetCount {
    props: GroupByProps,
}

impl SetCount {
    pub fn new(props: GroupByProps) -> Self {
        Self { props }
    }
}

impl Behavior for SetCount {
    fn evaluate(&mut self, ctx: &TickContext<'_>) -> EvalResult<Emission> {
        let mut counts: BTreeMap<Dimensions, usize> = BTreeMap::new();
        let mut saw_set = false;
        for sample in ctx.input("in")? {
            let Value::Set(members) = &sample.value else {
                continue;
            };
            saw_set = true;
            for member in members {
                *counts
                    .entry(member.project(&self.props.group_by))
                    .or_insert(0) += 1;
            }
        }

        let mut emission = Emission::none();
        // An observed empty set still reports zero for the global group.
        if saw_set && counts.is_empty() && self.props.group_by.is_empty() {
            counts.insert(Dimensions::none(), 0);
        }
        for (dims, count) in counts {
            emission.push("out", Sample::new(dims, count as f64, ctx.now));
        }
        Ok(emission)
    }
}
