//! Frame-level gesture classification.
//!
//! Maps a single [`PoseFrame`] to at most one primitive gesture using fixed
//! geometric thresholds. The classifier holds only its thresholds, so the
//! same frame always yields the same answer.

use crate::{
    config::ClassifierConfig,
    gesture::{GesturePrimitive, PrimitiveKind},
    pose_frame::{HandLandmarks, Measurement, PoseFrame},
};
use std::time::Duration;

/// Threshold classifier for head roll and hand landmarks
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveClassifier {
    tilt_threshold_degrees: f64,
    pinch_threshold: f64,
    level_tolerance: f64,
}

impl PrimitiveClassifier {
    /// Create a classifier from explicit thresholds
    #[must_use]
    pub const fn new(tilt_threshold_degrees: f64, pinch_threshold: f64, level_tolerance: f64) -> Self {
        Self {
            tilt_threshold_degrees,
            pinch_threshold,
            level_tolerance,
        }
    }

    /// Create a classifier from configuration
    #[must_use]
    pub const fn from_config(config: &ClassifierConfig) -> Self {
        Self::new(
            config.tilt_threshold_degrees,
            config.pinch_threshold,
            config.level_tolerance,
        )
    }

    /// Classify one frame
    #[must_use]
    pub fn classify(&self, frame: &PoseFrame) -> Option<GesturePrimitive> {
        match &frame.measurement {
            Measurement::Head { roll_degrees } => self.classify_roll(*roll_degrees, frame.timestamp),
            Measurement::Hand(hand) => self.classify_hand(hand, frame.timestamp),
            Measurement::NotDetected => None,
        }
    }

    /// Tilt when |roll| exceeds the threshold, direction from its sign
    #[must_use]
    pub fn classify_roll(&self, roll_degrees: f64, timestamp: Duration) -> Option<GesturePrimitive> {
        if !roll_degrees.is_finite() || roll_degrees.abs() <= self.tilt_threshold_degrees {
            return None;
        }

        let kind = if roll_degrees > 0.0 {
            PrimitiveKind::TiltRight
        } else {
            PrimitiveKind::TiltLeft
        };

        Some(GesturePrimitive {
            kind,
            magnitude: roll_degrees.abs(),
            timestamp,
        })
    }

    /// Pinch takes precedence; otherwise a level hand with ordered fingertips swipes
    #[must_use]
    pub fn classify_hand(&self, hand: &HandLandmarks, timestamp: Duration) -> Option<GesturePrimitive> {
        let pinch_distance = hand.pinch_distance();
        if !pinch_distance.is_finite() {
            return None;
        }

        if pinch_distance < self.pinch_threshold {
            return Some(GesturePrimitive {
                kind: PrimitiveKind::Pinch,
                magnitude: pinch_distance,
                timestamp,
            });
        }

        if hand.vertical_spread() >= self.level_tolerance {
            return None;
        }

        let (thumb, index, middle) = (hand.thumb_tip.x, hand.index_tip.x, hand.middle_tip.x);
        let kind = if thumb > index && index > middle {
            PrimitiveKind::SwipeRight
        } else if thumb < index && index < middle {
            PrimitiveKind::SwipeLeft
        } else {
            return None;
        };

        Some(GesturePrimitive {
            kind,
            magnitude: hand.horizontal_extent(),
            timestamp,
        })
    }

    /// Navigation tilt threshold in degrees
    #[must_use]
    pub const fn tilt_threshold_degrees(&self) -> f64 {
        self.tilt_threshold_degrees
    }
}

impl Default for PrimitiveClassifier {
    fn default() -> Self {
        Self::from_config(&ClassifierConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: f64) -> Duration {
        Duration::from_secs_f64(secs)
    }

    #[test]
    fn test_roll_below_threshold_is_ignored() {
        let classifier = PrimitiveClassifier::default();
        for roll in [-15.0, -7.5, 0.0, 9.9, 15.0] {
            assert!(classifier.classify(&PoseFrame::head(at(0.0), roll)).is_none());
        }
    }

    #[test]
    fn test_roll_direction_follows_sign() {
        let classifier = PrimitiveClassifier::default();

        let right = classifier.classify(&PoseFrame::head(at(1.0), 16.0)).unwrap();
        assert_eq!(right.kind, PrimitiveKind::TiltRight);
        assert_eq!(right.magnitude, 16.0);
        assert_eq!(right.timestamp, at(1.0));

        let left = classifier.classify(&PoseFrame::head(at(1.0), -18.5)).unwrap();
        assert_eq!(left.kind, PrimitiveKind::TiltLeft);
        assert_eq!(left.magnitude, 18.5);
    }

    #[test]
    fn test_non_finite_roll_is_ignored() {
        let classifier = PrimitiveClassifier::default();
        assert!(classifier.classify_roll(f64::NAN, at(0.0)).is_none());
        assert!(classifier.classify_roll(f64::INFINITY, at(0.0)).is_none());
    }

    #[test]
    fn test_pinch_wins_over_swipe_ordering() {
        let classifier = PrimitiveClassifier::default();
        // Thumb right of index right of middle, but thumb and index touching
        let hand = HandLandmarks::new([0.52, 0.50, 0.0], [0.51, 0.50, 0.0], [0.40, 0.50, 0.0]);
        let primitive = classifier.classify_hand(&hand, at(0.0)).unwrap();
        assert_eq!(primitive.kind, PrimitiveKind::Pinch);
    }

    #[test]
    fn test_swipe_requires_level_hand() {
        let classifier = PrimitiveClassifier::default();

        let level = HandLandmarks::new([0.70, 0.50, 0.0], [0.60, 0.51, 0.0], [0.50, 0.52, 0.0]);
        assert_eq!(
            classifier.classify_hand(&level, at(0.0)).map(|p| p.kind),
            Some(PrimitiveKind::SwipeRight)
        );

        let mirrored = HandLandmarks::new([0.50, 0.50, 0.0], [0.60, 0.51, 0.0], [0.70, 0.52, 0.0]);
        assert_eq!(
            classifier.classify_hand(&mirrored, at(0.0)).map(|p| p.kind),
            Some(PrimitiveKind::SwipeLeft)
        );

        let upright = HandLandmarks::new([0.70, 0.60, 0.0], [0.60, 0.45, 0.0], [0.50, 0.40, 0.0]);
        assert!(classifier.classify_hand(&upright, at(0.0)).is_none());
    }

    #[test]
    fn test_unordered_fingertips_do_not_swipe() {
        let classifier = PrimitiveClassifier::default();
        let hand = HandLandmarks::new([0.60, 0.50, 0.0], [0.50, 0.50, 0.0], [0.70, 0.50, 0.0]);
        assert!(classifier.classify_hand(&hand, at(0.0)).is_none());
    }

    #[test]
    fn test_empty_frame_yields_nothing() {
        let classifier = PrimitiveClassifier::default();
        assert!(classifier.classify(&PoseFrame::empty(at(2.0))).is_none());
    }
}
