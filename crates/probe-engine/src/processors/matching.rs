//! Reference-state matching
//!
//! Per `group_by` group, compares the discrete rendering of every input
//! series' latest value against `reference_state` and emits either the
//! percentage (`match_perc`) or the count (`match_count`) of matching
//! members.

use super::{Behavior, Emission, TickContext};
use crate::error::EvalResult;
use crate::sample::{Dimensions, Sample};
use probe_model::MatchProps;
use std::collections::BTreeMap;

enum Mode {
    Percentage,
    Count,
}

pub struct Matching {
    props: MatchProps,
    mode: Mode,
}

impl Matching {
    pub fn percentage(props: MatchProps) -> Self {
        Self {
            props,
            mode: Mode::Percentage,
        }
    }

    pub fn count(props: MatchProps) -> Self {
        Self {
            props,
            mode: Mode::Count,
        }
    }
}

#[derive(Debug, Default)]
struct Tally {
    matched: usize,
    total: usize,
}

impl Behavior for Matching {
    fn evaluate(&mut self, ctx: &TickContext<'_>) -> EvalResult<Emission> {
        let mut groups: BTreeMap<Dimensions, Tally> = BTreeMap::new();
        for sample in ctx.input("in")? {
            let Some(rendered) = sample.value.discrete() else {
                continue;
            };
            let tally = groups
                .entry(sample.dimensions.project(&self.props.group_by))
                .or_default();
            tally.total += 1;
            if rendered == self.props.reference_state {
                tally.matched += 1;
            }
        }

        let mut emission = Emission::none();
        for (dims, tally) in groups {
            let value = match self.mode {
                Mode::Count => tally.matched as f64,
                Mode::Percentage => 100.0 * tally.matched as f64 / tally.total as f64,
            };
            emission.push("out", Sample::new(dims, value, ctx.now));
        }
        Ok(emission)
    }
}
