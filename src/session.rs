//! Gesture session: all per-session recognition state in one place.
//!
//! Each call to [`GestureSession::process_frame`] runs the full pipeline for
//! one frame, in this order:
//!
//! 1. age out stale sequence windows,
//! 2. classify the frame (after optional roll smoothing),
//! 3. pass the candidate through the cooldown gate,
//! 4. feed emitted primitives to the sequence detectors.
//!
//! When a compound gesture completes, its event replaces the primitive's
//! event for that frame. Every head frame also reports its smoothed roll to
//! the sequence detectors, so a held tilt is released only once the head
//! comes back toward level. Losing the subject releases it as well.

use crate::{
    classifier::PrimitiveClassifier,
    config::Config,
    debounce::DebounceGate,
    filters::{create_filter, NoFilter, RollFilter},
    gesture::{GestureEvent, GesturePrimitive},
    pose_frame::{Measurement, PoseFrame},
    sequence_detector::{RepeatPattern, SequenceDetector, SequenceState},
    Result,
};
use log::{debug, info};

/// Result of processing one frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameOutcome {
    /// Primitive the classifier produced, emitted or not
    pub primitive: Option<GesturePrimitive>,
    /// Event to dispatch
    pub event: Option<GestureEvent>,
    /// The primitive was held back by its cooldown
    pub suppressed: bool,
}

/// Recognition state for one detection session
pub struct GestureSession {
    classifier: PrimitiveClassifier,
    roll_filter: Box<dyn RollFilter>,
    debounce: DebounceGate,
    sequences: Vec<SequenceDetector>,
    frames: u64,
}

impl GestureSession {
    /// Assemble a session from its parts
    #[must_use]
    pub fn new(
        classifier: PrimitiveClassifier,
        roll_filter: Box<dyn RollFilter>,
        debounce: DebounceGate,
        sequences: Vec<SequenceDetector>,
    ) -> Self {
        Self {
            classifier,
            roll_filter,
            debounce,
            sequences,
            frames: 0,
        }
    }

    /// Session with the configured thresholds, cooldowns, filter and triple tilt pattern
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let roll_filter = create_filter(&config.classifier.roll_filter)?;
        info!(
            "Gesture session: tilt > {:.1} deg, triple tilt > {:.1} deg x{} within {:.1}s, roll filter {}",
            config.classifier.tilt_threshold_degrees,
            config.sequence.strict_tilt_threshold_degrees,
            config.sequence.repeat_count,
            config.sequence.window_secs,
            roll_filter.name()
        );

        Ok(Self::new(
            PrimitiveClassifier::from_config(&config.classifier),
            roll_filter,
            DebounceGate::from_config(&config.debounce),
            vec![SequenceDetector::new(RepeatPattern::triple_tilt(&config.sequence))],
        ))
    }

    /// Run the pipeline for one frame
    pub fn process_frame(&mut self, frame: &PoseFrame) -> FrameOutcome {
        self.frames += 1;
        let now = frame.timestamp;

        for sequence in &mut self.sequences {
            sequence.expire(now);
        }

        let Some(primitive) = self.classify(frame) else {
            return FrameOutcome::default();
        };

        if !self.debounce.should_emit(primitive.kind, now) {
            debug!(
                "{:?} suppressed, {:.2}s of cooldown left",
                primitive.kind,
                self.debounce.remaining(primitive.kind, now).as_secs_f64()
            );
            return FrameOutcome {
                primitive: Some(primitive),
                event: None,
                suppressed: true,
            };
        }
        self.debounce.record_fired(primitive.kind, now);

        let mut event = GestureEvent::new(primitive.kind, now);
        for sequence in &mut self.sequences {
            if let Some(compound) = sequence.observe(&primitive, now) {
                event = GestureEvent::new(compound, now);
                break;
            }
        }

        info!(
            "Gesture {} ({:.3}) at {:.2}s -> {}",
            event.gesture,
            primitive.magnitude,
            now.as_secs_f64(),
            event.command
        );

        FrameOutcome {
            primitive: Some(primitive),
            event: Some(event),
            suppressed: false,
        }
    }

    fn classify(&mut self, frame: &PoseFrame) -> Option<GesturePrimitive> {
        match &frame.measurement {
            Measurement::Head { roll_degrees } => {
                if !roll_degrees.is_finite() {
                    return None;
                }
                let smoothed = self.roll_filter.apply(*roll_degrees);
                for sequence in &mut self.sequences {
                    sequence.settle(smoothed.abs());
                }
                self.classifier.classify_roll(smoothed, frame.timestamp)
            }
            Measurement::Hand(hand) => self.classifier.classify_hand(hand, frame.timestamp),
            Measurement::NotDetected => {
                self.roll_filter.reset();
                for sequence in &mut self.sequences {
                    sequence.release();
                }
                None
            }
        }
    }

    /// Forget cooldowns, pending sequences and filter history
    pub fn reset(&mut self) {
        self.debounce.reset();
        self.roll_filter.reset();
        for sequence in &mut self.sequences {
            sequence.reset();
        }
    }

    /// State of every tracked compound pattern
    pub fn sequence_states(&self) -> impl Iterator<Item = SequenceState> + '_ {
        self.sequences.iter().map(SequenceDetector::state)
    }

    /// Frames processed so far
    #[must_use]
    pub const fn frames(&self) -> u64 {
        self.frames
    }
}

impl Default for GestureSession {
    fn default() -> Self {
        let config = Config::default();
        Self::new(
            PrimitiveClassifier::from_config(&config.classifier),
            Box::new(NoFilter),
            DebounceGate::from_config(&config.debounce),
            vec![SequenceDetector::new(RepeatPattern::triple_tilt(&config.sequence))],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::{Command, GestureKind, PrimitiveKind};
    use std::time::Duration;

    fn at(secs: f64) -> Duration {
        Duration::from_secs_f64(secs)
    }

    fn events(session: &mut GestureSession, frames: &[PoseFrame]) -> Vec<GestureEvent> {
        frames
            .iter()
            .filter_map(|frame| session.process_frame(frame).event)
            .collect()
    }

    #[test]
    fn test_held_tilt_fires_once() {
        let mut session = GestureSession::default();
        let frames: Vec<PoseFrame> = (0..10)
            .map(|i| PoseFrame::head(at(f64::from(i) / 30.0), 16.0))
            .collect();

        let emitted = events(&mut session, &frames);
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].gesture, GestureKind::TiltRight);
        assert_eq!(emitted[0].command, Command::Next);
    }

    #[test]
    fn test_suppressed_frames_report_their_primitive() {
        let mut session = GestureSession::default();
        session.process_frame(&PoseFrame::head(at(0.0), -17.0));
        let outcome = session.process_frame(&PoseFrame::head(at(0.1), -17.0));

        assert!(outcome.suppressed);
        assert!(outcome.event.is_none());
        assert_eq!(outcome.primitive.map(|p| p.kind), Some(PrimitiveKind::TiltLeft));
    }

    #[test]
    fn test_triple_tilt_replaces_third_navigation_event() {
        let mut session = GestureSession::default();
        let frames = [
            PoseFrame::head(at(0.0), 22.0),
            PoseFrame::head(at(0.6), -1.0),
            PoseFrame::head(at(1.2), 23.0),
            PoseFrame::head(at(1.8), -1.0),
            PoseFrame::head(at(2.4), 24.0),
        ];

        let kinds: Vec<GestureKind> = events(&mut session, &frames).iter().map(|e| e.gesture).collect();
        assert_eq!(
            kinds,
            vec![GestureKind::TiltRight, GestureKind::TiltRight, GestureKind::TripleTilt]
        );
        assert!(session.sequence_states().all(|state| state == SequenceState::Idle));
    }

    #[test]
    fn test_held_strong_tilt_is_not_a_triple_tilt() {
        let mut session = GestureSession::default();
        let frames: Vec<PoseFrame> = (0..64)
            .map(|i| PoseFrame::head(at(f64::from(i) / 30.0), 25.0))
            .collect();

        let kinds: Vec<GestureKind> = events(&mut session, &frames).iter().map(|e| e.gesture).collect();
        assert_eq!(kinds, vec![GestureKind::TiltRight; 3]);
        assert!(session
            .sequence_states()
            .all(|state| state == SequenceState::Accumulating(1)));
    }

    #[test]
    fn test_lost_subject_releases_held_tilt() {
        let mut session = GestureSession::default();
        let frames = [
            PoseFrame::head(at(0.0), 25.0),
            PoseFrame::empty(at(0.6)),
            PoseFrame::head(at(1.2), 25.0),
            PoseFrame::empty(at(1.8)),
            PoseFrame::head(at(2.4), 25.0),
        ];

        let last = events(&mut session, &frames).last().map(|e| e.gesture);
        assert_eq!(last, Some(GestureKind::TripleTilt));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = Config::default();
        config.sequence.window_secs = 1e20;
        assert!(GestureSession::from_config(&config).is_err());
    }

    #[test]
    fn test_smoothing_filter_resets_when_subject_is_lost() {
        let mut session = GestureSession::new(
            PrimitiveClassifier::default(),
            create_filter("moving_average:3").unwrap(),
            DebounceGate::default(),
            Vec::new(),
        );

        session.process_frame(&PoseFrame::head(at(0.0), 0.0));
        session.process_frame(&PoseFrame::head(at(0.1), 0.0));
        session.process_frame(&PoseFrame::empty(at(0.2)));
        // Without the reset the average would be 10 degrees
        let outcome = session.process_frame(&PoseFrame::head(at(0.3), 30.0));
        assert_eq!(outcome.primitive.map(|p| p.kind), Some(PrimitiveKind::TiltRight));
    }

    #[test]
    fn test_reset_clears_cooldowns() {
        let mut session = GestureSession::default();
        assert!(session.process_frame(&PoseFrame::head(at(0.0), 18.0)).event.is_some());
        session.reset();
        assert!(session.process_frame(&PoseFrame::head(at(0.1), 18.0)).event.is_some());
        assert_eq!(session.frames(), 2);
    }
}
