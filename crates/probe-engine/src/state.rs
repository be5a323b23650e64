//! Windowed state store
//!
//! Backs accumulating processors with a bounded history per (owner,
//! dimension tuple). A window is a FIFO ring bounded by `max_samples`
//! and, when a duration bound is configured, additionally by the age of
//! its points relative to the evaluation clock. Distinct dimension
//! tuples live under separate keys and never block each other.

use crate::sample::{Dimensions, SeriesPoint};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use probe_model::AccumulateProps;
use std::collections::{BTreeMap, VecDeque};

/// Bounds of one window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSpec {
    pub max_samples: usize,
    /// Age bound; `None` means count-bounded only
    pub total_duration: Option<Duration>,
}

impl WindowSpec {
    pub fn new(max_samples: usize, total_duration: Option<Duration>) -> Self {
        Self {
            max_samples,
            total_duration,
        }
    }
}

impl From<&AccumulateProps> for WindowSpec {
    fn from(props: &AccumulateProps) -> Self {
        let total_duration = match props.total_duration {
            0 => None,
            secs => Some(Duration::seconds(secs as i64)),
        };
        Self::new(props.max_samples, total_duration)
    }
}

#[derive(Debug, Default)]
struct WindowBuf {
    points: VecDeque<SeriesPoint>,
}

/// Per-owner, per-dimension bounded history. The outer map is keyed by
/// owner so per-owner sweeps (prune, dimension listing) touch only that
/// owner's windows.
#[derive(Debug, Default)]
pub struct WindowedStateStore {
    owners: DashMap<String, BTreeMap<Dimensions, WindowBuf>>,
}

impl WindowedStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one point, evicting the oldest when over `max_samples`
    pub fn append(&self, owner: &str, dimensions: &Dimensions, point: SeriesPoint, spec: WindowSpec) {
        let mut windows = self.owners.entry(owner.to_string()).or_default();
        let buf = windows.entry(dimensions.clone()).or_default();
        buf.points.push_back(point);
        while buf.points.len() > spec.max_samples {
            buf.points.pop_front();
        }
    }

    /// Evict points older than the duration bound, relative to `now`.
    /// No-op for count-only windows.
    pub fn prune(&self, owner: &str, spec: WindowSpec, now: DateTime<Utc>) {
        let Some(total_duration) = spec.total_duration else {
            return;
        };
        let horizon = now - total_duration;
        let Some(mut windows) = self.owners.get_mut(owner) else {
            return;
        };
        for buf in windows.values_mut() {
            while buf.points.front().is_some_and(|p| p.timestamp < horizon) {
                buf.points.pop_front();
            }
        }
    }

    /// The current window contents, oldest first
    pub fn snapshot(&self, owner: &str, dimensions: &Dimensions) -> Vec<SeriesPoint> {
        self.owners
            .get(owner)
            .and_then(|windows| {
                windows
                    .get(dimensions)
                    .map(|buf| buf.points.iter().cloned().collect())
            })
            .unwrap_or_default()
    }

    /// Timestamp of the most recently appended point, if any
    pub fn last_timestamp(&self, owner: &str, dimensions: &Dimensions) -> Option<DateTime<Utc>> {
        self.owners
            .get(owner)?
            .get(dimensions)?
            .points
            .back()
            .map(|p| p.timestamp)
    }

    /// Every dimension tuple the owner has appended under
    pub fn dimensions(&self, owner: &str) -> Vec<Dimensions> {
        self.owners
            .get(owner)
            .map(|windows| windows.keys().cloned().collect())
            .unwrap_or_default()
    }
}
