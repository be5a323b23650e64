//! Wire-format probe document types
//!
//! These structs round-trip the exact JSON shape accepted by the
//! orchestration system: a probe is a label plus an ordered list of
//! processor declarations, each with a name, a type tag, role-keyed
//! input/output stream mappings, an untyped property bag, and a list of
//! unit-annotated display stages.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A complete probe document: the unit of deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeDocument {
    /// Descriptive name for the probe
    pub label: String,
    /// Ordered processor declarations; declaration order breaks ties in
    /// the execution plan
    pub processors: Vec<ProcessorDecl>,
}

impl ProbeDocument {
    /// Create an empty probe document with the given label
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            processors: Vec::new(),
        }
    }

    /// Look up a processor declaration by name
    pub fn processor(&self, name: &str) -> Option<&ProcessorDecl> {
        self.processors.iter().find(|p| p.name == name)
    }
}

/// One processor declaration inside a probe document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorDecl {
    /// Unique name within the probe
    pub name: String,
    /// Behavior selector
    #[serde(rename = "type")]
    pub processor_type: ProcessorType,
    /// Input role -> stream key
    #[serde(default)]
    pub inputs: BTreeMap<String, String>,
    /// Output role -> stream key
    #[serde(default)]
    pub outputs: BTreeMap<String, String>,
    /// Untyped property bag; parsed into a typed struct at link time
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
    /// Display stages (unit metadata only, no runtime meaning)
    #[serde(default)]
    pub stages: Vec<Stage>,
}

impl ProcessorDecl {
    /// Create a declaration with empty inputs/outputs/properties/stages
    pub fn new(name: impl Into<String>, processor_type: ProcessorType) -> Self {
        Self {
            name: name.into(),
            processor_type,
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
            properties: serde_json::Map::new(),
            stages: Vec::new(),
        }
    }
}

/// A named, unit-annotated output channel used for display metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    pub units: String,
}

impl Stage {
    pub fn new(name: impl Into<String>, units: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            units: units.into(),
        }
    }
}

/// The processor type tag, one variant per behavior
///
/// The snake_case wire names are part of the external contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorType {
    IfCounter,
    PeriodicAverage,
    Accumulate,
    Sum,
    Subtract,
    StdDev,
    InRange,
    TimeInState,
    Anomaly,
    MatchPerc,
    MatchCount,
    SetComparison,
    SetCount,
    RangeCheck,
    Headroom,
    GenericDataCollector,
    GenericGraphCollector,
    ServiceDataCollector,
}

impl ProcessorType {
    /// Collector types take no inputs; their samples come from an
    /// external feed
    pub fn is_collector(&self) -> bool {
        matches!(
            self,
            ProcessorType::IfCounter
                | ProcessorType::GenericDataCollector
                | ProcessorType::GenericGraphCollector
                | ProcessorType::ServiceDataCollector
        )
    }

    /// Wire name of this type
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessorType::IfCounter => "if_counter",
            ProcessorType::PeriodicAverage => "periodic_average",
            ProcessorType::Accumulate => "accumulate",
            ProcessorType::Sum => "sum",
            ProcessorType::Subtract => "subtract",
            ProcessorType::StdDev => "std_dev",
            ProcessorType::InRange => "in_range",
            ProcessorType::TimeInState => "time_in_state",
            ProcessorType::Anomaly => "anomaly",
            ProcessorType::MatchPerc => "match_perc",
            ProcessorType::MatchCount => "match_count",
            ProcessorType::SetComparison => "set_comparison",
            ProcessorType::SetCount => "set_count",
            ProcessorType::RangeCheck => "range_check",
            ProcessorType::Headroom => "headroom",
            ProcessorType::GenericDataCollector => "generic_data_collector",
            ProcessorType::GenericGraphCollector => "generic_graph_collector",
            ProcessorType::ServiceDataCollector => "service_data_collector",
        }
    }
}

impl fmt::Display for ProcessorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
