//! Topology paths for headroom computation
//!
//! The headroom processor needs link capacities and the candidate paths
//! between its configured system pairs. Both come from the blueprint
//! service, abstracted here behind [`PathProvider`] so the engine stays
//! independent of how paths are discovered.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One directed fabric link with its rated capacity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyLink {
    pub src_system: String,
    pub src_interface: String,
    pub dst_system: String,
    pub dst_interface: String,
    pub capacity_bps: f64,
}

/// An ordered sequence of links from a source system to a destination
/// system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyPath {
    pub links: Vec<TopologyLink>,
}

impl TopologyPath {
    /// Human-readable hop list, e.g. `leaf1:swp1>spine1:swp9>leaf3`
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for link in &self.links {
            if out.is_empty() {
                out.push_str(&link.src_system);
            }
            out.push(':');
            out.push_str(&link.src_interface);
            out.push('>');
            out.push_str(&link.dst_system);
        }
        out
    }
}

/// Source of candidate paths between system pairs
pub trait PathProvider: Send + Sync {
    /// All candidate paths from `src_system` to `dst_system`; empty when
    /// the pair is disconnected or unknown
    fn paths(&self, src_system: &str, dst_system: &str) -> Vec<TopologyPath>;
}

/// Fixed path table, used by tests and static deployments
#[derive(Debug, Default)]
pub struct StaticPathProvider {
    table: HashMap<(String, String), Vec<TopologyPath>>,
}

impl StaticPathProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, src_system: &str, dst_system: &str, paths: Vec<TopologyPath>) {
        self.table
            .insert((src_system.to_string(), dst_system.to_string()), paths);
    }
}

impl PathProvider for StaticPathProvider {
    fn paths(&self, src_system: &str, dst_system: &str) -> Vec<TopologyPath> {
        self.table
            .get(&(src_system.to_string(), dst_system.to_string()))
            .cloned()
            .unwrap_or_default()
    }
}
