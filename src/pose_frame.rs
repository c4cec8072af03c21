//! Per-frame pose measurements.
//!
//! A [`PoseFrame`] is the only thing the gesture pipeline knows about the
//! outside world: a timestamp relative to session start plus whatever the
//! pose provider measured in that frame.

use nalgebra::{distance, Point2, Point3};
use std::time::Duration;

/// Input modality of a pose stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    /// Head roll from facial landmarks
    Head,
    /// Fingertip positions from hand landmarks
    Hand,
}

/// Fingertip positions in normalized landmark coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandLandmarks {
    /// Thumb tip
    pub thumb_tip: Point3<f64>,
    /// Index finger tip
    pub index_tip: Point3<f64>,
    /// Middle finger tip
    pub middle_tip: Point3<f64>,
}

impl HandLandmarks {
    /// Create landmarks from raw `[x, y, z]` triples
    #[must_use]
    pub fn new(thumb_tip: [f64; 3], index_tip: [f64; 3], middle_tip: [f64; 3]) -> Self {
        Self {
            thumb_tip: Point3::from(thumb_tip),
            index_tip: Point3::from(index_tip),
            middle_tip: Point3::from(middle_tip),
        }
    }

    /// 3-D distance between thumb tip and index tip
    #[must_use]
    pub fn pinch_distance(&self) -> f64 {
        distance(&self.thumb_tip, &self.index_tip)
    }

    /// Difference between the highest and lowest fingertip
    #[must_use]
    pub fn vertical_spread(&self) -> f64 {
        let ys = [self.thumb_tip.y, self.index_tip.y, self.middle_tip.y];
        let max = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = ys.iter().copied().fold(f64::INFINITY, f64::min);
        max - min
    }

    /// Horizontal extent from thumb to middle finger
    #[must_use]
    pub fn horizontal_extent(&self) -> f64 {
        (self.thumb_tip.x - self.middle_tip.x).abs()
    }
}

/// What the pose provider measured in one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measurement {
    /// Signed head roll in degrees
    Head {
        /// Positive when the head leans toward the image right
        roll_degrees: f64,
    },
    /// Hand landmarks of the single tracked hand
    Hand(HandLandmarks),
    /// The provider found no subject in this frame
    NotDetected,
}

/// Snapshot of one processed frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseFrame {
    /// Monotonic time since session start
    pub timestamp: Duration,
    /// Measured quantities
    pub measurement: Measurement,
}

impl PoseFrame {
    /// Head-pose frame
    #[must_use]
    pub const fn head(timestamp: Duration, roll_degrees: f64) -> Self {
        Self {
            timestamp,
            measurement: Measurement::Head { roll_degrees },
        }
    }

    /// Hand-pose frame
    #[must_use]
    pub const fn hand(timestamp: Duration, landmarks: HandLandmarks) -> Self {
        Self {
            timestamp,
            measurement: Measurement::Hand(landmarks),
        }
    }

    /// Frame in which nothing was detected
    #[must_use]
    pub const fn empty(timestamp: Duration) -> Self {
        Self {
            timestamp,
            measurement: Measurement::NotDetected,
        }
    }

    /// Modality of the measurement, if any
    #[must_use]
    pub const fn modality(&self) -> Option<Modality> {
        match self.measurement {
            Measurement::Head { .. } => Some(Modality::Head),
            Measurement::Hand(_) => Some(Modality::Hand),
            Measurement::NotDetected => None,
        }
    }
}

/// Roll angle of the line joining two eye corners, in degrees.
///
/// The points are ordered by image x first, so the result does not depend on
/// which eye is passed first. Image y grows downward: the angle is positive
/// when the image-right corner sits lower than the image-left one.
#[must_use]
pub fn roll_from_eye_corners(a: Point2<f64>, b: Point2<f64>) -> f64 {
    let (left, right) = if a.x <= b.x { (a, b) } else { (b, a) };
    let delta = right - left;
    delta.y.atan2(delta.x).to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_eyes_have_zero_roll() {
        let roll = roll_from_eye_corners(Point2::new(100.0, 200.0), Point2::new(180.0, 200.0));
        assert!(roll.abs() < 1e-10);
    }

    #[test]
    fn test_roll_sign_and_order_independence() {
        let a = Point2::new(100.0, 200.0);
        let b = Point2::new(200.0, 300.0);
        let roll = roll_from_eye_corners(a, b);
        assert!((roll - 45.0).abs() < 1e-9);
        assert!((roll_from_eye_corners(b, a) - roll).abs() < 1e-12);

        let raised = roll_from_eye_corners(Point2::new(100.0, 200.0), Point2::new(200.0, 100.0));
        assert!((raised + 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_hand_geometry() {
        let hand = HandLandmarks::new([0.50, 0.40, 0.0], [0.53, 0.44, 0.0], [0.60, 0.42, 0.0]);
        assert!((hand.pinch_distance() - 0.05).abs() < 1e-9);
        assert!((hand.vertical_spread() - 0.04).abs() < 1e-9);
        assert!((hand.horizontal_extent() - 0.10).abs() < 1e-9);
    }

    #[test]
    fn test_frame_modality() {
        let t = Duration::from_millis(10);
        assert_eq!(PoseFrame::head(t, 3.0).modality(), Some(Modality::Head));
        assert_eq!(PoseFrame::empty(t).modality(), None);
    }
}
