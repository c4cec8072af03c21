//! Scripted pose streams.
//!
//! A replay script is a YAML timeline. Each entry has a session time `t` in
//! seconds and carries a pose measurement, an operator signal, or both:
//!
//! ```yaml
//! timeline:
//!   - { t: 0.0, roll: 22.0, annotate: tilt_right }
//!   - { t: 0.6, absent: true }
//!   - t: 1.0
//!     hand: { thumb_tip: [0.7, 0.5, 0.0], index_tip: [0.6, 0.5, 0.0], middle_tip: [0.5, 0.5, 0.0] }
//!   - { t: 2.0, condition: low_light }
//!   - { t: 9.0, stop: true }
//! ```
//!
//! The script splits into a [`ReplayPoseProvider`] for the measurements and
//! a [`ReplayOperatorInput`] that releases signals once their time is reached.

use crate::{
    gesture::GestureKind,
    performance::Condition,
    pose_frame::{HandLandmarks, PoseFrame},
    provider::{OperatorInput, OperatorSignal, PoseProvider},
    Error, Result,
};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;

/// Fingertips as `[x, y, z]` triples
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HandEntry {
    pub thumb_tip: [f64; 3],
    pub index_tip: [f64; 3],
    pub middle_tip: [f64; 3],
}

/// One timeline entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplayEntry {
    /// Seconds since session start
    pub t: f64,
    /// Head roll in degrees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll: Option<f64>,
    /// Hand landmarks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hand: Option<HandEntry>,
    /// No subject in this frame
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub absent: bool,
    /// Ground truth for instrumentation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotate: Option<GestureKind>,
    /// Condition label change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    /// Operator stop
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub stop: bool,
}

impl ReplayEntry {
    fn timestamp(&self) -> Duration {
        Duration::from_secs_f64(self.t)
    }

    fn frame(&self) -> Option<PoseFrame> {
        let timestamp = self.timestamp();
        if let Some(roll) = self.roll {
            Some(PoseFrame::head(timestamp, roll))
        } else if let Some(hand) = self.hand {
            Some(PoseFrame::hand(
                timestamp,
                HandLandmarks::new(hand.thumb_tip, hand.index_tip, hand.middle_tip),
            ))
        } else if self.absent {
            Some(PoseFrame::empty(timestamp))
        } else {
            None
        }
    }

    fn signals(&self) -> impl Iterator<Item = OperatorSignal> {
        let condition = self.condition.map(OperatorSignal::SetCondition);
        let annotate = self.annotate.map(OperatorSignal::GroundTruth);
        let stop = self.stop.then_some(OperatorSignal::Stop);
        condition.into_iter().chain(annotate).chain(stop)
    }
}

/// A parsed replay timeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayScript {
    pub timeline: Vec<ReplayEntry>,
}

impl ReplayScript {
    /// Load and validate a script file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Replay(format!("Failed to read {}: {e}", path.display())))?;
        let script = Self::from_yaml(&content)?;
        info!("Loaded replay script {} ({} entries)", path.display(), script.timeline.len());
        Ok(script)
    }

    /// Parse and validate a script
    pub fn from_yaml(content: &str) -> Result<Self> {
        let script: Self =
            serde_yaml::from_str(content).map_err(|e| Error::Replay(format!("Failed to parse script: {e}")))?;
        script.validate()?;
        Ok(script)
    }

    /// Entries must be time-ordered and carry exactly one kind of measurement, if any
    pub fn validate(&self) -> Result<()> {
        let mut previous = 0.0_f64;
        for (index, entry) in self.timeline.iter().enumerate() {
            if !entry.t.is_finite() || entry.t < 0.0 {
                return Err(Error::Replay(format!("Entry {index}: invalid time {}", entry.t)));
            }
            if entry.t < previous {
                return Err(Error::Replay(format!(
                    "Entry {index}: time {} goes back from {previous}",
                    entry.t
                )));
            }
            previous = entry.t;

            let measurements = usize::from(entry.roll.is_some()) + usize::from(entry.hand.is_some()) + usize::from(entry.absent);
            if measurements > 1 {
                return Err(Error::Replay(format!(
                    "Entry {index}: roll, hand and absent are mutually exclusive"
                )));
            }
            if measurements == 0 && entry.signals().next().is_none() {
                return Err(Error::Replay(format!("Entry {index} at {}s carries nothing", entry.t)));
            }
        }
        Ok(())
    }

    /// Split into a pose stream and an operator signal stream
    #[must_use]
    pub fn split(self, realtime: bool) -> (ReplayPoseProvider, ReplayOperatorInput) {
        let frames: VecDeque<PoseFrame> = self.timeline.iter().filter_map(ReplayEntry::frame).collect();
        let signals: VecDeque<(Duration, OperatorSignal)> = self
            .timeline
            .iter()
            .flat_map(|entry| {
                let timestamp = entry.timestamp();
                entry.signals().map(move |signal| (timestamp, signal))
            })
            .collect();

        (
            ReplayPoseProvider { frames, realtime },
            ReplayOperatorInput { signals },
        )
    }
}

/// Pose frames from a replay script
#[derive(Debug, Clone)]
pub struct ReplayPoseProvider {
    frames: VecDeque<PoseFrame>,
    realtime: bool,
}

impl ReplayPoseProvider {
    /// Frames not yet delivered
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl PoseProvider for ReplayPoseProvider {
    fn next_frame(&mut self) -> Result<Option<PoseFrame>> {
        Ok(self.frames.pop_front())
    }

    fn wants_pacing(&self) -> bool {
        self.realtime
    }

    fn name(&self) -> &str {
        "replay"
    }
}

/// Operator signals from a replay script
#[derive(Debug, Clone)]
pub struct ReplayOperatorInput {
    signals: VecDeque<(Duration, OperatorSignal)>,
}

impl OperatorInput for ReplayOperatorInput {
    fn poll(&mut self, now: Duration) -> Vec<OperatorSignal> {
        let mut due = Vec::new();
        while let Some(&(at, signal)) = self.signals.front() {
            if at > now {
                break;
            }
            due.push(signal);
            self.signals.pop_front();
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose_frame::Measurement;

    const SCRIPT: &str = r"
timeline:
  - { t: 0.0, roll: 22.0 }
  - { t: 0.5, absent: true, annotate: tilt_right }
  - t: 1.0
    hand: { thumb_tip: [0.7, 0.5, 0.0], index_tip: [0.6, 0.5, 0.0], middle_tip: [0.5, 0.5, 0.0] }
  - { t: 1.5, condition: backlit }
  - { t: 2.0, stop: true }
";

    #[test]
    fn test_script_splits_into_frames_and_signals() {
        let (mut provider, mut input) = ReplayScript::from_yaml(SCRIPT).unwrap().split(false);
        assert_eq!(provider.remaining(), 3);
        assert!(!provider.wants_pacing());

        let first = provider.next_frame().unwrap().unwrap();
        assert_eq!(first.measurement, Measurement::Head { roll_degrees: 22.0 });
        let second = provider.next_frame().unwrap().unwrap();
        assert_eq!(second.measurement, Measurement::NotDetected);
        let third = provider.next_frame().unwrap().unwrap();
        assert!(matches!(third.measurement, Measurement::Hand(_)));
        assert!(provider.next_frame().unwrap().is_none());

        assert!(input.poll(Duration::from_secs_f64(0.4)).is_empty());
        assert_eq!(
            input.poll(Duration::from_secs_f64(1.6)),
            vec![
                OperatorSignal::GroundTruth(GestureKind::TiltRight),
                OperatorSignal::SetCondition(Condition::Backlit)
            ]
        );
        assert_eq!(input.poll(Duration::from_secs(5)), vec![OperatorSignal::Stop]);
        assert!(input.poll(Duration::from_secs(6)).is_empty());
    }

    #[test]
    fn test_invalid_scripts_are_rejected() {
        let backwards = "timeline:\n  - { t: 1.0, roll: 0.0 }\n  - { t: 0.5, roll: 0.0 }\n";
        assert!(matches!(ReplayScript::from_yaml(backwards), Err(Error::Replay(_))));

        let ambiguous = "timeline:\n  - { t: 0.0, roll: 3.0, absent: true }\n";
        assert!(ReplayScript::from_yaml(ambiguous).is_err());

        let empty_entry = "timeline:\n  - { t: 0.0 }\n";
        assert!(ReplayScript::from_yaml(empty_entry).is_err());

        let unknown_field = "timeline:\n  - { t: 0.0, yaw: 3.0 }\n";
        assert!(ReplayScript::from_yaml(unknown_field).is_err());

        let unknown_gesture = "timeline:\n  - { t: 0.0, annotate: wave }\n";
        assert!(ReplayScript::from_yaml(unknown_gesture).is_err());
    }
}
