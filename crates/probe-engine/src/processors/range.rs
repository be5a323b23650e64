//! Range classification
//!
//! `in_range` emits true iff the selected value lies within the
//! inclusive configured bounds; an absent bound is unbounded on that
//! side. The optional `property` selector reads a named field of a
//! composite value (e.g. `sample_count` of a history series) instead of
//! the value itself.
//!
//! `range_check` is the same classification with the downstream anomaly
//! step folded in: when `raise_anomaly` is set, transitions of the
//! boolean result raise and clear anomaly events directly.

use super::{AnomalySignal, Behavior, EdgeDetector, Emission, TickContext};
use crate::error::EvalResult;
use crate::sample::{Sample, Value};
use probe_model::{InRangeProps, RangeBounds, RangeCheckProps};

fn select(value: &Value, property: Option<&str>) -> Option<f64> {
    match property {
        Some(field) => value.field(field),
        None => value.as_f64(),
    }
}

fn classify(
    ctx: &TickContext<'_>,
    range: &RangeBounds,
    property: Option<&str>,
) -> EvalResult<Vec<Sample>> {
    let mut out = Vec::new();
    for sample in ctx.input("in")? {
        let Some(value) = select(&sample.value, property) else {
            continue;
        };
        out.push(Sample::new(
            sample.dimensions,
            range.contains(value),
            ctx.now,
        ));
    }
    Ok(out)
}

pub struct InRange {
    props: InRangeProps,
}

impl InRange {
    pub fn new(props: InRangeProps) -> Self {
        Self { props }
    }
}

impl Behavior for InRange {
    fn evaluate(&mut self, ctx: &TickContext<'_>) -> EvalResult<Emission> {
        let samples = classify(ctx, &self.props.range, self.props.property.as_deref())?;
        Ok(Emission::single("out", samples))
    }
}

pub struct RangeCheck {
    props: RangeCheckProps,
    edges: EdgeDetector,
}

impl RangeCheck {
    pub fn new(props: RangeCheckProps) -> Self {
        Self {
            props,
            edges: EdgeDetector::default(),
        }
    }
}

impl Behavior for RangeCheck {
    fn evaluate(&mut self, ctx: &TickContext<'_>) -> EvalResult<Emission> {
        let samples = classify(ctx, &self.props.range, self.props.property.as_deref())?;

        let mut emission = Emission::none();
        for sample in samples {
            if self.props.raise_anomaly {
                if let Some(state) = sample.value.as_bool() {
                    if let Some(raised) = self.edges.observe(&sample.dimensions, state) {
                        emission.anomalies.push(AnomalySignal {
                            dimensions: sample.dimensions.clone(),
                            raised,
                        });
                    }
                }
            }
            emission.push("out", sample);
        }
        Ok(emission)
    }
}
