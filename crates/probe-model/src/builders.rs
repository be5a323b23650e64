//! Stock probe builders
//!
//! Each function assembles a complete [`ProbeDocument`] for one of the
//! shipped network-telemetry probes. The builders perform document
//! assembly only; the topology selection predicates (`graph_query`) are
//! opaque strings interpreted by the external graph-query service.

use crate::document::{ProbeDocument, ProcessorDecl, ProcessorType, Stage};
use serde_json::json;
use std::collections::BTreeMap;

/// A (system label, interface name) reference used by the
/// `specific_*` probe variants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceRef {
    pub system_label: String,
    pub interface_name: String,
}

impl InterfaceRef {
    pub fn new(system_label: impl Into<String>, interface_name: impl Into<String>) -> Self {
        Self {
            system_label: system_label.into(),
            interface_name: interface_name.into(),
        }
    }
}

fn processor(
    name: &str,
    processor_type: ProcessorType,
    inputs: &[(&str, &str)],
    outputs: &[(&str, &str)],
    properties: serde_json::Value,
    stages: &[(&str, &str)],
) -> ProcessorDecl {
    let to_map = |pairs: &[(&str, &str)]| {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>()
    };
    ProcessorDecl {
        name: name.to_string(),
        processor_type,
        inputs: to_map(inputs),
        outputs: to_map(outputs),
        properties: match properties {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        },
        stages: stages.iter().map(|(n, u)| Stage::new(*n, *u)).collect(),
    }
}

/// Predicate selecting fabric interfaces for the `specific_*` probes,
/// restricted to the given interface references
fn specific_interface_predicate(base: &str, interfaces: &[InterfaceRef]) -> String {
    let mut tuples = String::from("[");
    for intf in interfaces {
        tuples.push_str(&format!(
            "('{}','{}'),",
            intf.system_label, intf.interface_name
        ));
    }
    tuples.push(']');
    format!(
        "{base}.where(lambda system, iface: (system.label, iface.if_name) in {tuples})"
    )
}

/// Probe measuring total east/west traffic: total server-generated
/// traffic minus the traffic leaving through external routers.
pub fn eastwest_traffic_probe(
    label: &str,
    average_period: u64,
    history_sample_count: usize,
) -> ProbeDocument {
    let server_facing_interface_query = concat!(
        "node(\"system\", name=\"system\", system_id=not_none(), role=\"leaf\").",
        "out(\"hosted_interfaces\").",
        "node(\"interface\", name=\"iface\", if_name=not_none()).",
        "out(\"link\").",
        "node(\"link\", link_type=\"ethernet\").",
        "in_(\"link\").",
        "node(\"interface\").",
        "in_(\"hosted_interfaces\").",
        "node(\"system\", system_type=\"server\")"
    );
    let external_router_facing_interface_query = concat!(
        "node(\"system\", name=\"system\", system_id=not_none()).",
        "out(\"hosted_interfaces\").",
        "node(\"interface\", name=\"iface\", if_name=not_none()).",
        "out(\"link\").",
        "node(\"link\", link_type=\"ethernet\", role=\"to_external_router\")"
    );

    ProbeDocument {
        label: label.to_string(),
        processors: vec![
            processor(
                "leaf server traffic counters",
                ProcessorType::IfCounter,
                &[],
                &[("out", "server_traffic_counters")],
                json!({
                    "system_id": "system.system_id",
                    "interface": "iface.if_name",
                    "counter_type": "rx_bytes",
                    "graph_query": server_facing_interface_query,
                }),
                &[("out", "Bps")],
            ),
            processor(
                "server traffic average",
                ProcessorType::PeriodicAverage,
                &[("in", "server_traffic_counters")],
                &[("out", "server_traffic_avg")],
                json!({"period": average_period}),
                &[("out", "Bps")],
            ),
            processor(
                "external router south-north link traffic",
                ProcessorType::IfCounter,
                &[],
                &[("out", "ext_router_interface_traffic")],
                json!({
                    "system_id": "system.system_id",
                    "interface": "iface.if_name",
                    "counter_type": "tx_bytes",
                    "graph_query": external_router_facing_interface_query,
                }),
                &[("out", "Bps")],
            ),
            processor(
                "external router south-north links traffic average",
                ProcessorType::PeriodicAverage,
                &[("in", "ext_router_interface_traffic")],
                &[("out", "ext_router_interface_traffic_avg")],
                json!({"period": average_period}),
                &[("out", "Bps")],
            ),
            processor(
                "total server traffic",
                ProcessorType::Sum,
                &[("in", "server_traffic_avg")],
                &[("out", "total_server_traffic")],
                json!({"group_by": []}),
                &[("out", "Bps")],
            ),
            processor(
                "server generated traffic average",
                ProcessorType::PeriodicAverage,
                &[("in", "total_server_traffic")],
                &[("out", "total_server_generated_traffic_average")],
                json!({"period": average_period}),
                &[("out", "Bps")],
            ),
            processor(
                "total server traffic history",
                ProcessorType::Accumulate,
                &[("in", "total_server_generated_traffic_average")],
                &[("out", "total_server_traffic_history")],
                json!({"total_duration": 0, "max_samples": history_sample_count}),
                &[("out", "Bps")],
            ),
            processor(
                "south-north traffic",
                ProcessorType::Sum,
                &[("in", "ext_router_interface_traffic_avg")],
                &[("out", "total_outgoing_traffic")],
                json!({"group_by": []}),
                &[("out", "Bps")],
            ),
            processor(
                "outgoing_traffic_average",
                ProcessorType::PeriodicAverage,
                &[("in", "total_outgoing_traffic")],
                &[("out", "total_outgoing_traffic_average")],
                json!({"period": average_period}),
                &[("out", "Bps")],
            ),
            processor(
                "south-north traffic history",
                ProcessorType::Accumulate,
                &[("in", "total_outgoing_traffic_average")],
                &[("out", "total_outgoing_traffic_timeseries")],
                json!({"total_duration": 0, "max_samples": history_sample_count}),
                &[("out", "Bps")],
            ),
            processor(
                "east-west traffic",
                ProcessorType::Subtract,
                &[
                    ("minuend", "total_server_generated_traffic_average"),
                    ("subtrahend", "total_outgoing_traffic_average"),
                ],
                &[("out", "eastwest_traffic")],
                json!({}),
                &[("out", "Bps")],
            ),
            processor(
                "east-west traffic history",
                ProcessorType::Accumulate,
                &[("in", "eastwest_traffic")],
                &[("out", "eastwest_traffic_history")],
                json!({"total_duration": 0, "max_samples": history_sample_count}),
                &[("out", "Bps")],
            ),
        ],
    }
}

/// Probe flagging fabric interfaces whose counters run hot or cold for a
/// sustained share of recent history.
#[allow(clippy::too_many_arguments)]
pub fn hotcold_ifcounter_probe(
    label: &str,
    if_counter: &str,
    counter_min: f64,
    counter_max: f64,
    max_hot_interface_percentage: f64,
    max_cold_interface_percentage: f64,
    average_period: u64,
    duration: u64,
    threshold_duration: u64,
    anomaly_history_count: usize,
) -> ProbeDocument {
    let nodes_query = concat!(
        "node(\"system\", name=\"system\", deploy_mode=\"deploy\", role=\"leaf\").",
        "out(\"hosted_interfaces\").",
        "node(\"interface\", name=\"iface\", if_name=not_none()).",
        "out(\"link\").",
        "node(\"link\", name=\"link\", link_type=\"ethernet\").",
        "in_(\"link\").",
        "node(\"interface\").",
        "in_(\"hosted_interfaces\").",
        "node(\"system\", name=\"dst_system\", deploy_mode=\"deploy\", role=\"spine\")"
    );

    hotcold_processors(
        label,
        nodes_query,
        "leaf",
        if_counter,
        counter_min,
        counter_max,
        max_hot_interface_percentage,
        max_cold_interface_percentage,
        average_period,
        duration,
        threshold_duration,
        anomaly_history_count,
    )
}

/// Variant of [`hotcold_ifcounter_probe`] restricted to an explicit list
/// of interfaces.
#[allow(clippy::too_many_arguments)]
pub fn specific_hotcold_ifcounter_probe(
    label: &str,
    interfaces: &[InterfaceRef],
    if_counter: &str,
    counter_min: f64,
    counter_max: f64,
    max_hot_interface_percentage: f64,
    max_cold_interface_percentage: f64,
    average_period: u64,
    duration: u64,
    threshold_duration: u64,
    anomaly_history_count: usize,
) -> ProbeDocument {
    let base = concat!(
        "node(\"system\", name=\"system\", system_id=not_none()).",
        "out(\"hosted_interfaces\").",
        "node(\"interface\", name=\"iface\", if_name=not_none()).",
        "out(\"link\").",
        "node(\"link\", name=\"link\", link_type=\"ethernet\")"
    );
    let nodes_query = specific_interface_predicate(base, interfaces);

    hotcold_processors(
        label,
        &nodes_query,
        "device",
        if_counter,
        counter_min,
        counter_max,
        max_hot_interface_percentage,
        max_cold_interface_percentage,
        average_period,
        duration,
        threshold_duration,
        anomaly_history_count,
    )
}

/// Shared pipeline of the hot/cold probes. `scope` only affects the
/// human-facing processor names and a few stream keys ("leaf" for the
/// fabric-wide variant, "device" for the specific-interface one).
#[allow(clippy::too_many_arguments)]
fn hotcold_processors(
    label: &str,
    nodes_query: &str,
    scope: &str,
    if_counter: &str,
    counter_min: f64,
    counter_max: f64,
    max_hot_interface_percentage: f64,
    max_cold_interface_percentage: f64,
    average_period: u64,
    duration: u64,
    threshold_duration: u64,
    anomaly_history_count: usize,
) -> ProbeDocument {
    let fabric = scope == "leaf";
    let traffic = if fabric { "leaf_int_traffic" } else { "int_traffic" };
    let avg = if fabric { "leaf_int_tx_avg" } else { "device_int_tx_avg" };
    let hot = if fabric { "hot_leaf_int" } else { "if_counter_anomalous_hot" };
    let cold = if fabric { "cold_leaf_int" } else { "if_counter_anomalous_cold" };
    let hot_live = if fabric { "live_leaf_int_hot" } else { "live_device_int_hot" };
    let cold_live = if fabric { "live_leaf_int_cold" } else { "live_device_int_cold" };
    let accumulate = if fabric {
        "leaf_int_traffic_accumulate"
    } else {
        "int_traffic_accumulate"
    };
    let named = |suffix: &str| format!("{scope} {suffix}");

    ProbeDocument {
        label: label.to_string(),
        processors: vec![
            processor(
                &named("interface traffic"),
                ProcessorType::IfCounter,
                &[],
                &[("out", traffic)],
                json!({
                    "link_role": "link.role",
                    "system_id": "system.system_id",
                    "interface": "iface.if_name",
                    "counter_type": if_counter,
                    "graph_query": nodes_query,
                }),
                &[],
            ),
            processor(
                &named("interface tx avg"),
                ProcessorType::PeriodicAverage,
                &[("in", traffic)],
                &[("out", avg)],
                json!({"period": average_period}),
                &[("out", "Bps")],
            ),
            processor(
                &named("int traffic accumulate"),
                ProcessorType::Accumulate,
                &[("in", traffic)],
                &[("out", accumulate)],
                json!({"total_duration": duration, "max_samples": 1024}),
                &[],
            ),
            processor(
                &format!("live {scope} interface hot"),
                ProcessorType::InRange,
                &[("in", avg)],
                &[("out", hot_live)],
                json!({"range": {"max": counter_max}}),
                &[],
            ),
            processor(
                &format!("live {scope} interface cold"),
                ProcessorType::InRange,
                &[("in", avg)],
                &[("out", cold_live)],
                json!({"range": {"min": counter_min}}),
                &[],
            ),
            processor(
                if fabric { "sustained hot leaf interfaces" } else { "sustained hot interfaces" },
                ProcessorType::TimeInState,
                &[("in", hot_live)],
                &[("out", hot)],
                json!({
                    "time_window": duration,
                    "state_range": {"true": [{"max": threshold_duration}]},
                }),
                &[],
            ),
            processor(
                // The fabric-wide payload names this one in the singular.
                if fabric { "sustained cold leaf interface" } else { "sustained cold interfaces" },
                ProcessorType::TimeInState,
                &[("in", cold_live)],
                &[("out", cold)],
                json!({
                    "time_window": duration,
                    "state_range": {"true": [{"max": threshold_duration}]},
                }),
                &[],
            ),
            processor(
                // Both variants keep "leaf" here; the payloads share the
                // anomaly names verbatim.
                "anomaly hot leaf int traffic",
                ProcessorType::Anomaly,
                &[("in", hot)],
                &[("out", "anomaly_hot_int_traffic")],
                json!({}),
                &[],
            ),
            processor(
                "anomaly cold leaf int traffic",
                ProcessorType::Anomaly,
                &[("in", cold)],
                &[("out", "anomaly_cold_int_traffic")],
                json!({}),
                &[],
            ),
            processor(
                if fabric { "leaf int hot anomaly history" } else { "int hot anomaly history" },
                ProcessorType::Accumulate,
                &[("in", "anomaly_hot_int_traffic")],
                &[("out", "int_hot_accumulate_anomaly")],
                json!({"total_duration": 0, "max_samples": anomaly_history_count}),
                &[],
            ),
            processor(
                if fabric { "leaf int cold anomaly history" } else { "int cold anomaly history" },
                ProcessorType::Accumulate,
                &[("in", "anomaly_cold_int_traffic")],
                &[("out", "anomaly_cold_int_accumulate")],
                json!({"total_duration": 0, "max_samples": anomaly_history_count}),
                &[],
            ),
            processor(
                "interface sum per device",
                ProcessorType::Sum,
                &[("in", avg)],
                &[("out", "if_counter_sum_per_device")],
                json!({"group_by": ["system_id"]}),
                &[],
            ),
            processor(
                "interface sum per device per link role",
                ProcessorType::Sum,
                &[("in", avg)],
                &[("out", "if_counter_sum_per_device_per_role")],
                json!({"group_by": ["system_id", "link_role"]}),
                &[],
            ),
            processor(
                "system percent hot",
                ProcessorType::MatchPerc,
                &[("in", hot)],
                &[("out", "system_perc_hot")],
                json!({"reference_state": "true", "group_by": ["system_id"]}),
                &[],
            ),
            processor(
                // The specific-interface payload abbreviates this one.
                if fabric { "system percent cold" } else { "system perc cold" },
                ProcessorType::MatchPerc,
                &[("in", cold)],
                &[("out", "system_perc_cold")],
                json!({"reference_state": "true", "group_by": ["system_id"]}),
                &[],
            ),
            processor(
                "device hot",
                ProcessorType::InRange,
                &[("in", "system_perc_hot")],
                &[("out", "device_hot_anomalous")],
                json!({"range": {"max": max_hot_interface_percentage}}),
                &[],
            ),
            processor(
                "device cold",
                ProcessorType::InRange,
                &[("in", "system_perc_cold")],
                &[("out", "device_cold_anomalous")],
                json!({"range": {"max": max_cold_interface_percentage}}),
                &[],
            ),
            processor(
                "anomaly device hot",
                ProcessorType::Anomaly,
                &[("in", "device_hot_anomalous")],
                &[("out", "device_hot_anomaly")],
                json!({}),
                &[],
            ),
            processor(
                "anomaly device cold",
                ProcessorType::Anomaly,
                &[("in", "device_cold_anomalous")],
                &[("out", "device_cold_anomaly")],
                json!({}),
                &[],
            ),
            processor(
                "anomaly device hot history",
                ProcessorType::Accumulate,
                &[("in", "device_hot_anomaly")],
                &[("out", "device_hot_anomaly_timeseries")],
                json!({"total_duration": 0, "max_samples": anomaly_history_count}),
                &[],
            ),
            processor(
                "anomaly device cold history",
                ProcessorType::Accumulate,
                &[("in", "device_cold_anomaly")],
                &[("out", "device_cold_anomaly_timeseries")],
                json!({"total_duration": 0, "max_samples": anomaly_history_count}),
                &[],
            ),
        ],
    }
}

/// Minimal example probe: raise an anomaly whenever a leaf-spine
/// interface reports status down.
pub fn interface_status() -> ProbeDocument {
    let nodes_query = concat!(
        "node(\"system\", name=\"system\", system_id=not_none()).",
        "out(\"hosted_interfaces\").",
        "node(\"interface\", name=\"iface\", if_name=not_none()).",
        "out(\"link\").",
        "node(\"link\", role=\"spine_leaf\")"
    );

    ProbeDocument {
        label: "interface status anomalies".to_string(),
        processors: vec![
            processor(
                "collect leaf-spine interface status",
                ProcessorType::GenericDataCollector,
                &[],
                &[("out", "leaf_spine_if_status")],
                json!({
                    "service_name": "interface_iba",
                    "data_type": "ns",
                    "system_id": "system.system_id",
                    "key": "iface.if_name",
                    "graph_query": nodes_query,
                }),
                &[],
            ),
            processor(
                "leaf-spine down interfaces",
                ProcessorType::InRange,
                &[("in", "leaf_spine_if_status")],
                &[("out", "leaf_spine_if_down")],
                json!({"range": {"min": 1, "max": 1}}),
                &[],
            ),
            processor(
                "leaf-spine interface down anomaly",
                ProcessorType::Anomaly,
                &[("in", "leaf_spine_if_down")],
                &[("out", "leaf_spine_if_down_anomaly")],
                json!({}),
                &[],
            ),
        ],
    }
}

/// Probe comparing the VLANs the controller expects on each leaf against
/// the VLANs the virtual infrastructure actually carries.
pub fn underlay_virtual_infra_vlans_mismatch_probe(label: &str) -> ProbeDocument {
    let expectation_query = concat!(
        "node('system', system_type='switch', name='leaf',role='leaf')",
        ".out('hosted_vn_instances')",
        ".node('vn_instance').out('instantiates')",
        ".node('virtual_network', name='vn')"
    );
    let actual_query = concat!(
        "node('system', system_type='switch', name='leaf',role='leaf')",
        ".out('hosted_interfaces')",
        ".node('interface').out('link')",
        ".node('link').in_('link')",
        ".node('interface').in_('hosted_interfaces')",
        ".node('system').in_('is_realized_by')",
        ".node('hypervisor').out('has')",
        ".node('pnic').out('carries')",
        ".node('vnet', name='vn')"
    );

    ProbeDocument {
        label: label.to_string(),
        processors: vec![
            processor(
                "expected VLANs",
                ProcessorType::GenericGraphCollector,
                &[],
                &[("out", "expected_vlans")],
                json!({
                    "graph_query": expectation_query,
                    "leaf": "leaf.label",
                    "vlan": "vn.vn_id",
                    "value": "1",
                    "data_type": "ns",
                }),
                &[],
            ),
            processor(
                "hypervisor VLANs",
                ProcessorType::GenericGraphCollector,
                &[],
                &[("out", "hypervisor_vlans")],
                json!({
                    "graph_query": actual_query,
                    "leaf": "leaf.label",
                    "vlan": "str(vn.vlan)",
                    "value": "1",
                    "data_type": "ns",
                }),
                &[],
            ),
            processor(
                "expected vs hypervisor VLANs",
                ProcessorType::SetComparison,
                &[("A", "expected_vlans"), ("B", "hypervisor_vlans")],
                &[
                    ("A - B", "expected_only"),
                    ("B - A", "hypervisor_only"),
                    ("A & B", "common_vlans"),
                ],
                json!({"significant_keys": ["leaf", "vlan"]}),
                &[],
            ),
            processor(
                "count of VLANs only on hypervisors",
                ProcessorType::SetCount,
                &[("in", "hypervisor_only")],
                &[("out", "hypervisor_only_count")],
                json!({"group_by": []}),
                &[],
            ),
            processor(
                "additional VLANs on hypervisors",
                ProcessorType::RangeCheck,
                &[("in", "hypervisor_only_count")],
                &[("out", "hypervisor_only_out_of_range")],
                json!({"range": {"max": 0}, "raise_anomaly": true}),
                &[],
            ),
            processor(
                "count of VLANs only in the fabric",
                ProcessorType::SetCount,
                &[("in", "expected_only")],
                &[("out", "expected_only_count")],
                json!({"group_by": []}),
                &[],
            ),
            processor(
                "additional VLANs in the fabric",
                ProcessorType::RangeCheck,
                &[("in", "expected_only_count")],
                &[("out", "expected_only_out_of_range")],
                json!({"range": {"max": 0}, "raise_anomaly": true}),
                &[],
            ),
        ],
    }
}

/// Probe detecting sustained traffic imbalance across the ECMP links of
/// each leaf.
#[allow(clippy::too_many_arguments)]
pub fn ecmp_imbalance_probe(
    label: &str,
    average_period: u64,
    duration: u64,
    threshold_duration: u64,
    std_max: f64,
    anomaly_history_count: usize,
    max_systems_imbalanced: f64,
    system_imbalance_history_count: usize,
) -> ProbeDocument {
    let nodes_query = concat!(
        "node(\"system\", name=\"system\", deploy_mode=\"deploy\", role=\"leaf\").",
        "out(\"hosted_interfaces\").",
        "node(\"interface\", name=\"iface\", if_name=not_none()).",
        "out(\"link\").",
        "node(\"link\", link_type=\"ethernet\").",
        "in_(\"link\").",
        "node(\"interface\").",
        "in_(\"hosted_interfaces\").",
        "node(\"system\", role=\"spine\", deploy_mode=\"deploy\")"
    );

    ProbeDocument {
        label: label.to_string(),
        processors: vec![
            processor(
                "leaf fabric interface traffic",
                ProcessorType::IfCounter,
                &[],
                &[("out", "leaf_fabric_int_traffic")],
                json!({
                    "label": "system.label",
                    "system_id": "system.system_id",
                    "interface": "iface.if_name",
                    "counter_type": "tx_bytes",
                    "graph_query": nodes_query,
                }),
                &[("out", "Bps")],
            ),
            processor(
                "leaf fabric interface traffic average",
                ProcessorType::PeriodicAverage,
                &[("in", "leaf_fabric_int_traffic")],
                &[("out", "leaf_fab_int_tx_avg")],
                json!({"period": average_period}),
                &[("out", "Bps")],
            ),
            processor(
                "leaf fabric interface history",
                ProcessorType::Accumulate,
                &[("in", "leaf_fabric_int_traffic")],
                &[("out", "leaf_fab_int_time_series")],
                json!({"total_duration": duration, "max_samples": 1024}),
                &[("out", "Bps")],
            ),
            processor(
                "leaf fabric interface std-dev",
                ProcessorType::StdDev,
                &[("in", "leaf_fab_int_tx_avg")],
                &[("out", "leaf_fab_int_std_dev")],
                json!({"group_by": ["system_id", "label"]}),
                &[("out", "Bps")],
            ),
            processor(
                "live ecmp imbalance",
                ProcessorType::InRange,
                &[("in", "leaf_fab_int_std_dev")],
                &[("out", "live_ecmp_imbalance")],
                json!({"range": {"max": std_max}}),
                &[("out", "Bps")],
            ),
            processor(
                "sustained ecmp imbalance",
                ProcessorType::TimeInState,
                &[("in", "live_ecmp_imbalance")],
                &[("out", "system_tx_imbalance")],
                json!({
                    "time_window": duration,
                    "state_range": {"true": [{"max": threshold_duration}]},
                }),
                &[("out", "Bps")],
            ),
            processor(
                "ecmp imbalance anomaly",
                ProcessorType::Anomaly,
                &[("in", "system_tx_imbalance")],
                &[("out", "ecmp_imbalance_anomaly")],
                json!({}),
                &[],
            ),
            processor(
                "anomaly accumulate",
                ProcessorType::Accumulate,
                &[("in", "ecmp_imbalance_anomaly")],
                &[("out", "anomaly_accumulate")],
                json!({"total_duration": 0, "max_samples": anomaly_history_count}),
                &[],
            ),
            processor(
                "systems imbalanced count",
                ProcessorType::MatchCount,
                &[("in", "system_tx_imbalance")],
                &[("out", "system_imbalance_count")],
                json!({"reference_state": "true", "group_by": []}),
                &[],
            ),
            processor(
                "imbalanced system count out of range",
                ProcessorType::InRange,
                &[("in", "system_imbalance_count")],
                &[("out", "imbalanced_system_count_out_of_range")],
                json!({"range": {"max": max_systems_imbalanced}}),
                &[],
            ),
            processor(
                "imbalanced systems count out of range anomaly",
                ProcessorType::Anomaly,
                &[("in", "imbalanced_system_count_out_of_range")],
                &[("out", "system_tx_imbalance_count_anomaly")],
                json!({}),
                &[],
            ),
            processor(
                "imbalanced system count anomaly history",
                ProcessorType::Accumulate,
                &[("in", "system_imbalance_count")],
                &[("out", "imbalanced_system_count_history")],
                json!({
                    "total_duration": 0,
                    "max_samples": system_imbalance_history_count,
                }),
                &[],
            ),
        ],
    }
}

/// Probe computing remaining path capacity between two systems.
pub fn headroom_probe(label: &str, src_node_label: &str, dst_node_label: &str) -> ProbeDocument {
    let nodes_query = concat!(
        "node(\"system\", name=\"system\", system_id=not_none()).",
        "out(\"hosted_interfaces\").",
        "node(\"interface\", name=\"iface\", if_name=not_none())"
    );

    ProbeDocument {
        label: label.to_string(),
        processors: vec![
            processor(
                "device interface tx traffic",
                ProcessorType::IfCounter,
                &[],
                &[("out", "device_int_tx_traffic")],
                json!({
                    "system_id": "system.system_id",
                    "interface": "iface.if_name",
                    "counter_type": "tx_bytes",
                    "graph_query": nodes_query,
                }),
                &[("out", "Bps")],
            ),
            processor(
                "device interface rx traffic",
                ProcessorType::IfCounter,
                &[],
                &[("out", "device_int_rx_traffic")],
                json!({
                    "system_id": "system.system_id",
                    "interface": "iface.if_name",
                    "counter_type": "rx_bytes",
                    "graph_query": nodes_query,
                }),
                &[("out", "Bps")],
            ),
            processor(
                "headroom path data",
                ProcessorType::Headroom,
                &[
                    ("tx_bytes", "device_int_tx_traffic"),
                    ("rx_bytes", "device_int_rx_traffic"),
                ],
                &[
                    ("min_headroom", "min_headroom_stage"),
                    ("max_headroom", "max_headroom_stage"),
                    ("min_headroom_path", "min_headroom_path_stage"),
                    ("max_headroom_path", "max_headroom_path_stage"),
                    ("link_headroom", "link_headroom_stage"),
                ],
                json!({
                    "pairs": [{"src_system": src_node_label, "dst_system": dst_node_label}],
                }),
                &[
                    ("min_headroom", "Bps"),
                    ("max_headroom", "Bps"),
                    ("link_headroom", "Bps"),
                ],
            ),
        ],
    }
}

/// Probe raising anomalies for leaf fabric interfaces that flap more
/// than `threshold` times within `duration` seconds.
pub fn interface_flapping_probe(
    label: &str,
    threshold: f64,
    duration: u64,
    anomaly_history_count: usize,
    max_flapping_interfaces_percentage: f64,
) -> ProbeDocument {
    let nodes_query = concat!(
        "node(\"system\", name=\"system\", system_id=not_none(), role=\"leaf\").",
        "out(\"hosted_interfaces\").",
        "node(\"interface\", name=\"iface\", if_name=not_none()).",
        "out(\"link\").",
        "node(\"link\", link_type=\"ethernet\").",
        "in_(\"link\").",
        "node(\"interface\").",
        "in_(\"hosted_interfaces\").",
        "node(\"system\", role=\"spine\")"
    );

    flapping_processors(
        label,
        nodes_query,
        true,
        threshold,
        duration,
        anomaly_history_count,
        max_flapping_interfaces_percentage,
    )
}

/// Variant of [`interface_flapping_probe`] restricted to an explicit
/// list of interfaces.
pub fn specific_interface_flapping_probe(
    label: &str,
    interfaces: &[InterfaceRef],
    threshold: f64,
    duration: u64,
    anomaly_history_count: usize,
    max_flapping_interfaces_percentage: f64,
) -> ProbeDocument {
    let base = concat!(
        "node(\"system\", name=\"system\", system_id=not_none()).",
        "out(\"hosted_interfaces\").",
        "node(\"interface\", name=\"iface\", if_name=not_none())"
    );
    let nodes_query = specific_interface_predicate(base, interfaces);

    flapping_processors(
        label,
        &nodes_query,
        false,
        threshold,
        duration,
        anomaly_history_count,
        max_flapping_interfaces_percentage,
    )
}

fn flapping_processors(
    label: &str,
    nodes_query: &str,
    fabric: bool,
    threshold: f64,
    duration: u64,
    anomaly_history_count: usize,
    max_flapping_interfaces_percentage: f64,
) -> ProbeDocument {
    let scope = if fabric { "leaf fabric" } else { "device" };
    let status = if fabric { "leaf_if_status" } else { "device_if_status" };
    let history = if fabric {
        "leaf_fab_int_status_accumulate"
    } else {
        "device_if_status_history"
    };
    let flap_anomaly = if fabric {
        "leaf_fab_if_flap_anomaly"
    } else {
        "device_if_flap_anomaly"
    };
    let perc = if fabric {
        "flapping_fab_int_perc"
    } else {
        "flapping_device_int_perc"
    };

    ProbeDocument {
        label: label.to_string(),
        processors: vec![
            processor(
                // The collector names come straight from the payloads,
                // abbreviated one way for the fabric probe and
                // underscored for the specific-interface one.
                if fabric { "leaf fab int status" } else { "device_int_status" },
                ProcessorType::ServiceDataCollector,
                &[],
                &[("out", status)],
                json!({
                    "service_name": "interface",
                    "system_id": "system.system_id",
                    "key": "iface.if_name",
                    "graph_query": nodes_query,
                }),
                &[],
            ),
            processor(
                &format!("{scope} interface status history"),
                ProcessorType::Accumulate,
                &[("in", status)],
                &[("out", history)],
                json!({"total_duration": duration, "max_samples": 1024}),
                &[],
            ),
            processor(
                &format!("{scope} interface flapping"),
                ProcessorType::InRange,
                &[("in", history)],
                &[("out", "if_status_flapping")],
                json!({"range": {"max": threshold, "min": null}, "property": "sample_count"}),
                &[],
            ),
            processor(
                &format!("{scope} interface flapping anomaly"),
                ProcessorType::Anomaly,
                &[("in", "if_status_flapping")],
                &[("out", flap_anomaly)],
                json!({}),
                &[],
            ),
            processor(
                &format!("anomaly flap {scope} history"),
                ProcessorType::Accumulate,
                &[("in", flap_anomaly)],
                &[("out", "anomaly_accumulate")],
                json!({"total_duration": 0, "max_samples": anomaly_history_count}),
                &[],
            ),
            processor(
                "percentage flapping per device interfaces",
                ProcessorType::MatchPerc,
                &[("in", "if_status_flapping")],
                &[("out", perc)],
                json!({"reference_state": "true", "group_by": ["system_id"]}),
                &[],
            ),
            processor(
                "system anomalous flapping",
                ProcessorType::InRange,
                &[("in", perc)],
                &[("out", "system_flapping")],
                json!({"range": {"max": max_flapping_interfaces_percentage}}),
                &[],
            ),
            processor(
                "system anomaly",
                ProcessorType::Anomaly,
                &[("in", "system_flapping")],
                &[("out", "system_flapping_anomaly")],
                json!({}),
                &[],
            ),
            processor(
                if fabric {
                    "system anomaly accumulate"
                } else {
                    "system flapping anomaly accumulate"
                },
                ProcessorType::Accumulate,
                &[("in", "system_flapping_anomaly")],
                &[("out", "system_flapping_anomaly_accumulate")],
                json!({"total_duration": 0, "max_samples": anomaly_history_count}),
                &[],
            ),
        ],
    }
}

/// Probe detecting traffic imbalance across MLAG member links, leaf
/// port-channels, and rack-level port-channel aggregates.
pub fn mlag_imbalance_probe(label: &str, duration: u64, std_max: f64) -> ProbeDocument {
    let interface_query = concat!(
        "match(node(\"system\", name=\"leaf\", role=\"leaf\").",
        "in_(\"composed_of_systems\").",
        "node(\"redundancy_group\", name=\"rack\").",
        "out(\"hosted_interfaces\").",
        "node(\"interface\", name=\"mlag_interface\", if_type=\"port_channel\").",
        "out(\"composed_of\").",
        "node(\"interface\", name=\"leaf_port_channel\", if_type=\"port_channel\").",
        "out(\"composed_of\").",
        "node(\"interface\", name=\"leaf_interface\").",
        "out(\"link\").",
        "node(\"link\").",
        "in_(\"link\").",
        "node(\"interface\", name=\"server_interface\").",
        "in_(\"hosted_interfaces\").",
        "node(\"system\", name=\"server\", role=\"l2_server\"),",
        "node(\"system\", name=\"leaf\").",
        "out(\"hosted_interfaces\").",
        "node(\"interface\", name=\"leaf_interface\"))"
    );

    ProbeDocument {
        label: label.to_string(),
        processors: vec![
            processor(
                "mlag interface traffic",
                ProcessorType::IfCounter,
                &[],
                &[("out", "mlag_int_traffic")],
                json!({
                    "mlag_id": "mlag_interface.mlag_id",
                    "server": "server.label",
                    "leaf": "leaf.label",
                    "rack": "rack.label",
                    "system_id": "leaf.system_id",
                    "interface": "leaf_interface.if_name",
                    "counter_type": "tx_bytes",
                    "graph_query": interface_query,
                }),
                &[("out", "Bps")],
            ),
            processor(
                "mlag interface traffic history",
                ProcessorType::Accumulate,
                &[("in", "mlag_int_traffic")],
                &[("out", "mlag_int_traffic_history")],
                json!({"total_duration": duration, "max_samples": 100}),
                &[("out", "Bps")],
            ),
            processor(
                "mlag interface traffic average",
                ProcessorType::PeriodicAverage,
                &[("in", "mlag_int_traffic")],
                &[("out", "mlag_int_traffic_avg")],
                json!({"period": duration}),
                &[("out", "Bps")],
            ),
            processor(
                "mlag interface traffic imbalance",
                ProcessorType::StdDev,
                &[("in", "mlag_int_traffic_avg")],
                &[("out", "mlag_int_traffic_imbalance")],
                json!({"group_by": ["rack", "mlag_id"]}),
                &[("out", "Bps")],
            ),
            processor(
                "live mlag imbalance",
                ProcessorType::InRange,
                &[("in", "mlag_int_traffic_imbalance")],
                &[("out", "live_mlag_imbalance")],
                json!({"range": {"max": std_max, "min": null}}),
                &[],
            ),
            processor(
                "mlag interface imbalance anomaly",
                ProcessorType::Anomaly,
                &[("in", "live_mlag_imbalance")],
                &[("out", "mlag_int_imbalance_anomaly")],
                json!({}),
                &[],
            ),
            processor(
                "mlag imbalance per rack percent",
                ProcessorType::MatchPerc,
                &[("in", "live_mlag_imbalance")],
                &[("out", "mlag_imbalance_rack_perc")],
                json!({"reference_state": "true", "group_by": ["rack"]}),
                &[],
            ),
            processor(
                "port-channel interface std-dev",
                ProcessorType::StdDev,
                &[("in", "mlag_int_traffic_avg")],
                &[("out", "port_channel_int_std_dev")],
                json!({"group_by": ["rack", "mlag_id", "leaf"]}),
                &[("out", "Bps")],
            ),
            processor(
                "live port-channel imbalance",
                ProcessorType::InRange,
                &[("in", "port_channel_int_std_dev")],
                &[("out", "live_port_channel_imbalance")],
                json!({"range": {"max": std_max, "min": null}}),
                &[],
            ),
            processor(
                "port-channel imbalance anomaly",
                ProcessorType::Anomaly,
                &[("in", "live_port_channel_imbalance")],
                &[("out", "port_channel_links_anomaly")],
                json!({}),
                &[],
            ),
            processor(
                "port-channel imbalance per rack",
                ProcessorType::MatchPerc,
                &[("in", "live_port_channel_imbalance")],
                &[("out", "port_channel_imbalance_per_rack")],
                json!({"reference_state": "true", "group_by": ["rack"]}),
                &[],
            ),
            processor(
                "port-channel total traffic",
                ProcessorType::Sum,
                &[("in", "mlag_int_traffic_avg")],
                &[("out", "mlag_port_channel_total")],
                json!({"group_by": ["rack", "mlag_id", "leaf"]}),
                &[("out", "Bps")],
            ),
            processor(
                "mlag port-channel traffic std-dev",
                ProcessorType::StdDev,
                &[("in", "mlag_port_channel_total")],
                &[("out", "mlag_port_channel_imbalance")],
                json!({"group_by": ["rack", "mlag_id"]}),
                &[("out", "Bps")],
            ),
            processor(
                "live mlag port-channel imbalance",
                ProcessorType::InRange,
                &[("in", "mlag_port_channel_imbalance")],
                &[("out", "mlag_port_channel_imbalance_out_of_range")],
                json!({"range": {"max": std_max, "min": null}}),
                &[],
            ),
            processor(
                "mlag port-channel imbalance anomaly",
                ProcessorType::Anomaly,
                &[("in", "mlag_port_channel_imbalance_out_of_range")],
                &[("out", "mlag_port_channel_imbalance_anomaly")],
                json!({}),
                &[],
            ),
            processor(
                "mlag port-channel imbalance per rack",
                ProcessorType::MatchPerc,
                &[("in", "mlag_port_channel_imbalance_anomaly")],
                &[("out", "mlag_port_channel_imbalance_anomaly_per_rack")],
                json!({"reference_state": "true", "group_by": ["rack"]}),
                &[],
            ),
        ],
    }
}
