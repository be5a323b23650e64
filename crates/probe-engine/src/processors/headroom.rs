//! Path headroom
//!
//! For every configured `(src_system, dst_system)` pair, walks the
//! candidate paths supplied by the [`PathProvider`], computes per-link
//! headroom as rated capacity minus the worst of the observed tx/rx
//! rates on the link's endpoints, and reduces to per-path headroom
//! (minimum over links). The pair-level outputs report the weakest and
//! strongest candidate path; per-link figures go to the `link_headroom`
//! breakdown stream.

use super::{Behavior, Emission, TickContext};
use crate::error::EvalResult;
use crate::sample::{Dimensions, Sample, Value};
use crate::topology::{PathProvider, TopologyLink, TopologyPath};
use probe_model::HeadroomProps;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

pub struct Headroom {
    props: HeadroomProps,
    paths: Arc<dyn PathProvider>,
}

impl Headroom {
    pub fn new(props: HeadroomProps, paths: Arc<dyn PathProvider>) -> Self {
        Self { props, paths }
    }
}

/// Observed rate per (system, interface), from one traffic stream
struct RateTable(HashMap<(String, String), f64>);

impl RateTable {
    fn from_samples(samples: Vec<Sample>) -> Self {
        let mut table = HashMap::new();
        for sample in samples {
            let (Some(system), Some(interface)) = (
                sample.dimensions.get("system_id"),
                sample.dimensions.get("interface"),
            ) else {
                continue;
            };
            if let Some(rate) = sample.value.as_f64() {
                table.insert((system.to_string(), interface.to_string()), rate);
            }
        }
        Self(table)
    }

    fn rate(&self, system: &str, interface: &str) -> Option<f64> {
        self.0.get(&(system.to_string(), interface.to_string())).copied()
    }
}

/// Capacity minus the worst observed direction; an unobserved direction
/// contributes nothing
fn link_headroom(link: &TopologyLink, tx: &RateTable, rx: &RateTable) -> f64 {
    let tx_rate = tx.rate(&link.src_system, &link.src_interface).unwrap_or(0.0);
    let rx_rate = rx.rate(&link.dst_system, &link.dst_interface).unwrap_or(0.0);
    link.capacity_bps - tx_rate.max(rx_rate)
}

fn path_headroom(path: &TopologyPath, tx: &RateTable, rx: &RateTable) -> f64 {
    path.links
        .iter()
        .map(|link| link_headroom(link, tx, rx))
        .fold(f64::INFINITY, f64::min)
}

impl Behavior for Headroom {
    fn evaluate(&mut self, ctx: &TickContext<'_>) -> EvalResult<Emission> {
        let tx = RateTable::from_samples(ctx.input("tx_bytes")?);
        let rx = RateTable::from_samples(ctx.input("rx_bytes")?);

        let mut emission = Emission::none();
        for pair in &self.props.pairs {
            let candidates = self.paths.paths(&pair.src_system, &pair.dst_system);
            if candidates.is_empty() {
                warn!(
                    src = %pair.src_system,
                    dst = %pair.dst_system,
                    "no candidate paths for headroom pair"
                );
                continue;
            }

            let pair_dims = Dimensions::from_pairs([
                ("src_system", pair.src_system.as_str()),
                ("dst_system", pair.dst_system.as_str()),
            ]);

            let mut best: Option<(f64, &TopologyPath)> = None;
            let mut worst: Option<(f64, &TopologyPath)> = None;
            for path in &candidates {
                let headroom = path_headroom(path, &tx, &rx);
                if best.map_or(true, |(h, _)| headroom > h) {
                    best = Some((headroom, path));
                }
                if worst.map_or(true, |(h, _)| headroom < h) {
                    worst = Some((headroom, path));
                }

                for link in &path.links {
                    let mut link_dims = pair_dims.clone();
                    link_dims.insert("link_src", format!("{}:{}", link.src_system, link.src_interface));
                    link_dims.insert("link_dst", format!("{}:{}", link.dst_system, link.dst_interface));
                    emission.push(
                        "link_headroom",
                        Sample::new(link_dims, link_headroom(link, &tx, &rx), ctx.now),
                    );
                }
            }

            if let (Some((min_h, min_path)), Some((max_h, max_path))) = (worst, best) {
                emission.push("min_headroom", Sample::new(pair_dims.clone(), min_h, ctx.now));
                emission.push("max_headroom", Sample::new(pair_dims.clone(), max_h, ctx.now));
                emission.push(
                    "min_headroom_path",
                    Sample::new(pair_dims.clone(), Value::Text(min_path.describe()), ctx.now),
                );
                emission.push(
                    "max_headroom_path",
                    Sample::new(pair_dims.clone(), Value::Text(max_path.describe()), ctx.now),
                );
            }
        }
        Ok(emission)
    }
}
