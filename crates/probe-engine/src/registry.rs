//! Stream registry
//!
//! Holds the latest sample per (stream key, dimension tuple). The
//! registry is owned by one probe runtime; readers may be concurrent,
//! writes to a given stream are serialized by the map shard lock.

use crate::sample::{Dimensions, Sample};
use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct StreamRegistry {
    streams: DashMap<String, std::collections::BTreeMap<Dimensions, Sample>>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `sample` as the latest observation of its series
    pub fn publish(&self, stream: &str, sample: Sample) {
        self.streams
            .entry(stream.to_string())
            .or_default()
            .insert(sample.dimensions.clone(), sample);
    }

    pub fn publish_all(&self, stream: &str, samples: impl IntoIterator<Item = Sample>) -> usize {
        let mut series = self.streams.entry(stream.to_string()).or_default();
        let mut published = 0;
        for sample in samples {
            series.insert(sample.dimensions.clone(), sample);
            published += 1;
        }
        published
    }

    /// The latest sample of every series on `stream`, in dimension order
    pub fn current(&self, stream: &str) -> Vec<Sample> {
        self.streams
            .get(stream)
            .map(|series| series.values().cloned().collect())
            .unwrap_or_default()
    }

    /// The latest sample of one series
    pub fn latest(&self, stream: &str, dimensions: &Dimensions) -> Option<Sample> {
        self.streams
            .get(stream)?
            .get(dimensions)
            .cloned()
    }

    /// Number of streams that have received at least one sample
    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::Value;
    use chrono::{TimeZone, Utc};

    fn at(secs: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, secs).unwrap()
    }

    #[test]
    fn test_latest_wins_per_series() {
        let registry = StreamRegistry::new();
        let dims = Dimensions::from_pairs([("system_id", "leaf1")]);
        registry.publish("traffic", Sample::new(dims.clone(), 10.0, at(0)));
        registry.publish("traffic", Sample::new(dims.clone(), 20.0, at(1)));

        let latest = registry.latest("traffic", &dims).unwrap();
        assert_eq!(latest.value, Value::Number(20.0));
        assert_eq!(registry.current("traffic").len(), 1);
    }

    #[test]
    fn test_series_are_independent() {
        let registry = StreamRegistry::new();
        registry.publish(
            "traffic",
            Sample::new(Dimensions::from_pairs([("system_id", "leaf1")]), 10.0, at(0)),
        );
        registry.publish(
            "traffic",
            Sample::new(Dimensions::from_pairs([("system_id", "leaf2")]), 7.0, at(0)),
        );
        assert_eq!(registry.current("traffic").len(), 2);
        assert!(registry.current("absent").is_empty());
    }
}
