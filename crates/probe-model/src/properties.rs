//! Typed processor properties
//!
//! Each processor type carries its own strongly-typed property struct,
//! deserialized once from the wire document's untyped property bag. This
//! keeps stringly-typed lookups out of the engine: a malformed bag is
//! rejected at validation time, before the probe is instantiated.
//!
//! Collector types accept arbitrary extra string-valued keys; these are
//! node-property aliases (e.g. `system_id: "system.system_id"`) resolved
//! by the external topology service and captured here as a flattened map.

use crate::document::{ProcessorDecl, ProcessorType};
use crate::error::{DocumentError, DocumentResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An inclusive numeric range; an absent bound is unbounded on that side
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RangeBounds {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

impl RangeBounds {
    /// True iff `value` lies within the inclusive bounds
    pub fn contains(&self, value: f64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }

    /// True iff both bounds are absent
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Properties for `if_counter` collectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfCounterProps {
    pub counter_type: String,
    pub graph_query: String,
    /// Node-property aliases copied onto each emitted sample's dimensions
    #[serde(flatten)]
    pub aliases: BTreeMap<String, String>,
}

/// Properties for `service_data_collector` collectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDataCollectorProps {
    pub service_name: String,
    pub key: String,
    pub graph_query: String,
    #[serde(flatten)]
    pub aliases: BTreeMap<String, String>,
}

/// Properties for `generic_data_collector` collectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericDataCollectorProps {
    pub service_name: String,
    pub data_type: String,
    pub key: String,
    pub graph_query: String,
    #[serde(flatten)]
    pub aliases: BTreeMap<String, String>,
}

/// Properties for `generic_graph_collector` collectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericGraphCollectorProps {
    pub graph_query: String,
    /// Expression for the emitted value, evaluated by the collector
    pub value: String,
    pub data_type: String,
    #[serde(flatten)]
    pub aliases: BTreeMap<String, String>,
}

/// Properties for `periodic_average`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PeriodicAverageProps {
    /// Averaging period in seconds
    pub period: u64,
}

/// Properties for `accumulate`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccumulateProps {
    /// Duration bound in seconds; 0 means count-bounded only
    pub total_duration: u64,
    /// Ring-buffer capacity
    pub max_samples: usize,
}

/// Properties for processors that only group (`sum`, `std_dev`,
/// `set_count`)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupByProps {
    #[serde(default)]
    pub group_by: Vec<String>,
}

/// Properties for `in_range`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InRangeProps {
    pub range: RangeBounds,
    /// Optional named field of a composite input (e.g. `sample_count`)
    /// checked instead of the raw value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
}

/// Properties for `range_check`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RangeCheckProps {
    pub range: RangeBounds,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    /// When true the processor raises the anomaly itself, collapsing the
    /// usual in_range -> anomaly pair
    #[serde(default)]
    pub raise_anomaly: bool,
}

/// The per-state range table of `time_in_state`
///
/// Only the shape `{'true': [{'max': threshold}]}` is supported; multiple
/// entries or `min` bounds are rejected at validation time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StateRange {
    #[serde(rename = "true", default)]
    pub true_state: Vec<RangeBounds>,
    #[serde(rename = "false", default, skip_serializing_if = "Vec::is_empty")]
    pub false_state: Vec<RangeBounds>,
}

/// Properties for `time_in_state`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeInStateProps {
    /// Sliding window length in seconds
    pub time_window: u64,
    pub state_range: StateRange,
}

impl TimeInStateProps {
    /// The sustained-true threshold in seconds, if the state range has
    /// the supported single-`max` shape
    pub fn threshold_secs(&self) -> Option<f64> {
        match self.state_range.true_state.as_slice() {
            [entry] => entry.max,
            _ => None,
        }
    }
}

/// Properties for `match_perc` / `match_count`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchProps {
    /// The value to compare inputs against, as discrete text
    /// (`"true"`/`"false"` for boolean streams)
    pub reference_state: String,
    #[serde(default)]
    pub group_by: Vec<String>,
}

/// Properties for `set_comparison`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetComparisonProps {
    /// Dimension labels forming the projection under which the two input
    /// sets are compared
    pub significant_keys: Vec<String>,
}

/// One endpoint pair for headroom computation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemPair {
    pub src_system: String,
    pub dst_system: String,
}

/// Properties for `headroom`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeadroomProps {
    pub pairs: Vec<SystemPair>,
}

/// The validated, typed view of a processor's property bag
#[derive(Debug, Clone, PartialEq)]
pub enum TypedProperties {
    IfCounter(IfCounterProps),
    ServiceDataCollector(ServiceDataCollectorProps),
    GenericDataCollector(GenericDataCollectorProps),
    GenericGraphCollector(GenericGraphCollectorProps),
    PeriodicAverage(PeriodicAverageProps),
    Accumulate(AccumulateProps),
    Sum(GroupByProps),
    Subtract,
    StdDev(GroupByProps),
    InRange(InRangeProps),
    TimeInState(TimeInStateProps),
    Anomaly,
    MatchPerc(MatchProps),
    MatchCount(MatchProps),
    SetComparison(SetComparisonProps),
    SetCount(GroupByProps),
    RangeCheck(RangeCheckProps),
    Headroom(HeadroomProps),
}

impl TypedProperties {
    /// Parse and validate the property bag of `decl` according to its
    /// type tag
    pub fn parse(decl: &ProcessorDecl) -> DocumentResult<Self> {
        let bag = serde_json::Value::Object(decl.properties.clone());
        let malformed = |source| DocumentError::MalformedProperties {
            processor: decl.name.clone(),
            source,
        };

        let typed = match decl.processor_type {
            ProcessorType::IfCounter => {
                TypedProperties::IfCounter(serde_json::from_value(bag).map_err(malformed)?)
            }
            ProcessorType::ServiceDataCollector => TypedProperties::ServiceDataCollector(
                serde_json::from_value(bag).map_err(malformed)?,
            ),
            ProcessorType::GenericDataCollector => TypedProperties::GenericDataCollector(
                serde_json::from_value(bag).map_err(malformed)?,
            ),
            ProcessorType::GenericGraphCollector => TypedProperties::GenericGraphCollector(
                serde_json::from_value(bag).map_err(malformed)?,
            ),
            ProcessorType::PeriodicAverage => {
                TypedProperties::PeriodicAverage(serde_json::from_value(bag).map_err(malformed)?)
            }
            ProcessorType::Accumulate => {
                TypedProperties::Accumulate(serde_json::from_value(bag).map_err(malformed)?)
            }
            ProcessorType::Sum => {
                TypedProperties::Sum(serde_json::from_value(bag).map_err(malformed)?)
            }
            ProcessorType::Subtract => TypedProperties::Subtract,
            ProcessorType::StdDev => {
                TypedProperties::StdDev(serde_json::from_value(bag).map_err(malformed)?)
            }
            ProcessorType::InRange => {
                let props: InRangeProps = serde_json::from_value(bag).map_err(malformed)?;
                if props.range.is_empty() {
                    return Err(DocumentError::EmptyRange {
                        processor: decl.name.clone(),
                    });
                }
                TypedProperties::InRange(props)
            }
            ProcessorType::TimeInState => {
                let props: TimeInStateProps = serde_json::from_value(bag).map_err(malformed)?;
                validate_state_range(&decl.name, &props)?;
                TypedProperties::TimeInState(props)
            }
            ProcessorType::Anomaly => TypedProperties::Anomaly,
            ProcessorType::MatchPerc => {
                TypedProperties::MatchPerc(serde_json::from_value(bag).map_err(malformed)?)
            }
            ProcessorType::MatchCount => {
                TypedProperties::MatchCount(serde_json::from_value(bag).map_err(malformed)?)
            }
            ProcessorType::SetComparison => {
                TypedProperties::SetComparison(serde_json::from_value(bag).map_err(malformed)?)
            }
            ProcessorType::SetCount => {
                TypedProperties::SetCount(serde_json::from_value(bag).map_err(malformed)?)
            }
            ProcessorType::RangeCheck => {
                let props: RangeCheckProps = serde_json::from_value(bag).map_err(malformed)?;
                if props.range.is_empty() {
                    return Err(DocumentError::EmptyRange {
                        processor: decl.name.clone(),
                    });
                }
                TypedProperties::RangeCheck(props)
            }
            ProcessorType::Headroom => {
                TypedProperties::Headroom(serde_json::from_value(bag).map_err(malformed)?)
            }
        };

        Ok(typed)
    }
}

fn validate_state_range(processor: &str, props: &TimeInStateProps) -> DocumentResult<()> {
    let unsupported = |reason: &str| DocumentError::UnsupportedStateRange {
        processor: processor.to_string(),
        reason: reason.to_string(),
    };

    if !props.state_range.false_state.is_empty() {
        return Err(unsupported("ranges on the 'false' state are not supported"));
    }
    match props.state_range.true_state.as_slice() {
        [] => Err(unsupported("no range entry for the 'true' state")),
        [entry] => {
            if entry.min.is_some() {
                return Err(unsupported("'min' bounds are not supported"));
            }
            if entry.max.is_none() {
                return Err(unsupported("the 'true' entry requires a 'max' threshold"));
            }
            Ok(())
        }
        _ => Err(unsupported("multiple range entries for the 'true' state")),
    }
}
