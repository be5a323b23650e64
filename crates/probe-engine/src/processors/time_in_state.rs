//! Sustained-condition tracking
//!
//! Per dimension tuple, tracks how long a boolean input has been true
//! within a sliding `time_window`. The output turns true once the
//! accumulated true time inside the window reaches the threshold
//! (`state_range.true[0].max`) and resets to false the moment the input
//! goes false. A tick without a fresh input holds the current state.
//!
//! The window is kept as a deque of closed true-intervals; sliding the
//! window truncates or evicts intervals from the front, which keeps
//! re-truncation exact as time advances.

use super::{Behavior, Emission, TickContext};
use crate::error::EvalResult;
use crate::sample::{Dimensions, Sample};
use chrono::{DateTime, Duration, Utc};
use probe_model::TimeInStateProps;
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Default)]
struct Track {
    /// Closed intervals of observed true time, oldest first
    intervals: VecDeque<(DateTime<Utc>, DateTime<Utc>)>,
    /// Whether the most recent observation was true (extends the last
    /// interval instead of opening a new one)
    run_active: bool,
    last_seen: Option<DateTime<Utc>>,
    output: bool,
}

impl Track {
    fn accumulated(&self) -> Duration {
        self.intervals
            .iter()
            .fold(Duration::zero(), |acc, (start, end)| acc + (*end - *start))
    }

    fn slide(&mut self, horizon: DateTime<Utc>) {
        while let Some((start, end)) = self.intervals.front().copied() {
            if end <= horizon {
                self.intervals.pop_front();
            } else if start < horizon {
                self.intervals[0] = (horizon, end);
                break;
            } else {
                break;
            }
        }
    }
}

pub struct TimeInState {
    window: Duration,
    threshold: Duration,
    tracks: HashMap<Dimensions, Track>,
}

impl TimeInState {
    pub fn new(props: TimeInStateProps) -> Self {
        // Validation guarantees the single-max shape; a zero threshold
        // turns the processor into plain pass-through of the input.
        let threshold_secs = props.threshold_secs().unwrap_or(0.0);
        Self {
            window: Duration::seconds(props.time_window as i64),
            threshold: Duration::milliseconds((threshold_secs * 1000.0) as i64),
            tracks: HashMap::new(),
        }
    }

    fn observe(&mut self, dims: &Dimensions, state: bool, at: DateTime<Utc>) -> bool {
        let track = self.tracks.entry(dims.clone()).or_default();
        if track.last_seen.is_some_and(|seen| at <= seen) {
            return track.output;
        }
        track.last_seen = Some(at);

        if !state {
            // The condition broke: the run is over and the output resets
            // immediately.
            track.intervals.clear();
            track.run_active = false;
            track.output = false;
            return false;
        }

        if track.run_active {
            if let Some(last) = track.intervals.back_mut() {
                last.1 = at;
            }
        } else {
            track.intervals.push_back((at, at));
            track.run_active = true;
        }
        track.slide(at - self.window);
        track.output = track.accumulated() >= self.threshold;
        track.output
    }
}

impl Behavior for TimeInState {
    fn evaluate(&mut self, ctx: &TickContext<'_>) -> EvalResult<Emission> {
        let mut emission = Emission::none();
        for sample in ctx.input("in")? {
            let Some(state) = sample.value.as_bool() else {
                continue;
            };
            let output = self.observe(&sample.dimensions, state, sample.timestamp);
            emission.push("out", Sample::new(sample.dimensions, output, ctx.now));
        }
        Ok(emission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use probe_model::{RangeBounds, StateRange};

    fn at(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 1, 0).unwrap() + Duration::seconds(secs as i64)
    }

    fn tracker(time_window: u64, threshold: f64) -> TimeInState {
        TimeInState::new(TimeInStateProps {
            time_window,
            state_range: StateRange {
                true_state: vec![RangeBounds {
                    min: None,
                    max: Some(threshold),
                }],
                false_state: vec![],
            },
        })
    }

    #[test]
    fn test_flips_true_when_threshold_reached() {
        let mut tis = tracker(60, 30.0);
        let dims = Dimensions::none();

        // Continuously true from t=0: accumulated true time reaches the
        // 30s threshold exactly at t=30.
        for t in (0..30).step_by(10) {
            assert!(!tis.observe(&dims, true, at(t)), "premature at t={t}");
        }
        assert!(tis.observe(&dims, true, at(30)));
        assert!(tis.observe(&dims, true, at(40)));
    }

    #[test]
    fn test_resets_immediately_on_false() {
        let mut tis = tracker(60, 30.0);
        let dims = Dimensions::none();

        for t in (0..=30).step_by(10) {
            tis.observe(&dims, true, at(t));
        }
        assert!(tis.observe(&dims, true, at(35)));
        assert!(!tis.observe(&dims, false, at(36)));
        // A fresh run starts from zero.
        assert!(!tis.observe(&dims, true, at(40)));
        assert!(!tis.observe(&dims, true, at(60)));
        assert!(tis.observe(&dims, true, at(70)));
    }

    #[test]
    fn test_window_slide_truncates_old_true_time() {
        // Window 20s, threshold 15s: a run that started long ago only
        // counts the part inside the window.
        let mut tis = tracker(20, 15.0);
        let dims = Dimensions::none();

        for t in (0..=10).step_by(5) {
            tis.observe(&dims, true, at(t));
        }
        // At t=25 the window is [5, 25]; the run [0, 25] truncates to
        // [5, 25] = 20s of true time, over the threshold.
        assert!(tis.observe(&dims, true, at(25)));
    }

    #[test]
    fn test_held_sample_does_not_advance_state() {
        let mut tis = tracker(60, 30.0);
        let dims = Dimensions::none();
        tis.observe(&dims, true, at(0));
        let first = tis.observe(&dims, true, at(10));
        // Re-observing the same timestamp must not change anything.
        assert_eq!(tis.observe(&dims, true, at(10)), first);
    }

    #[test]
    fn test_dimensions_tracked_independently() {
        let mut tis = tracker(60, 10.0);
        let a = Dimensions::from_pairs([("system_id", "leaf1")]);
        let b = Dimensions::from_pairs([("system_id", "leaf2")]);

        tis.observe(&a, true, at(0));
        tis.observe(&b, false, at(0));
        assert!(tis.observe(&a, true, at(10)));
        assert!(!tis.observe(&b, true, at(10)));
    }
}
