//! Gesture vocabulary: primitives, compounds and the commands they map to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Lateral direction of a tilt or swipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
}

/// Gestures classified from a single frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveKind {
    TiltRight,
    TiltLeft,
    Pinch,
    SwipeRight,
    SwipeLeft,
}

impl PrimitiveKind {
    /// Every primitive kind
    pub const ALL: [Self; 5] = [
        Self::TiltRight,
        Self::TiltLeft,
        Self::Pinch,
        Self::SwipeRight,
        Self::SwipeLeft,
    ];

    /// Direction of directional primitives
    #[must_use]
    pub const fn direction(self) -> Option<Direction> {
        match self {
            Self::TiltRight | Self::SwipeRight => Some(Direction::Right),
            Self::TiltLeft | Self::SwipeLeft => Some(Direction::Left),
            Self::Pinch => None,
        }
    }

    /// True for head tilts
    #[must_use]
    pub const fn is_tilt(self) -> bool {
        matches!(self, Self::TiltRight | Self::TiltLeft)
    }
}

/// Gestures recognized across several primitives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompoundKind {
    /// Repeated same-direction head tilts within a time window
    TripleTilt,
}

impl CompoundKind {
    /// Direction a primitive contributes to this pattern, if it belongs to it
    #[must_use]
    pub const fn member_direction(self, kind: PrimitiveKind) -> Option<Direction> {
        match self {
            Self::TripleTilt if kind.is_tilt() => kind.direction(),
            Self::TripleTilt => None,
        }
    }
}

/// Any recognized gesture, primitive or compound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureKind {
    TiltRight,
    TiltLeft,
    Pinch,
    SwipeRight,
    SwipeLeft,
    TripleTilt,
}

impl GestureKind {
    /// Every gesture kind, in report order
    pub const ALL: [Self; 6] = [
        Self::TiltRight,
        Self::TiltLeft,
        Self::Pinch,
        Self::SwipeRight,
        Self::SwipeLeft,
        Self::TripleTilt,
    ];

    /// Presentation command triggered by this gesture
    #[must_use]
    pub const fn command(self) -> Command {
        match self {
            Self::TiltRight | Self::SwipeRight => Command::Next,
            Self::TiltLeft | Self::SwipeLeft => Command::Previous,
            Self::Pinch | Self::TripleTilt => Command::Exit,
        }
    }

    /// Snake-case name used in configuration, replay scripts and reports
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TiltRight => "tilt_right",
            Self::TiltLeft => "tilt_left",
            Self::Pinch => "pinch",
            Self::SwipeRight => "swipe_right",
            Self::SwipeLeft => "swipe_left",
            Self::TripleTilt => "triple_tilt",
        }
    }
}

impl From<PrimitiveKind> for GestureKind {
    fn from(kind: PrimitiveKind) -> Self {
        match kind {
            PrimitiveKind::TiltRight => Self::TiltRight,
            PrimitiveKind::TiltLeft => Self::TiltLeft,
            PrimitiveKind::Pinch => Self::Pinch,
            PrimitiveKind::SwipeRight => Self::SwipeRight,
            PrimitiveKind::SwipeLeft => Self::SwipeLeft,
        }
    }
}

impl From<CompoundKind> for GestureKind {
    fn from(kind: CompoundKind) -> Self {
        match kind {
            CompoundKind::TripleTilt => Self::TripleTilt,
        }
    }
}

impl fmt::Display for GestureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GestureKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| crate::Error::InvalidInput(format!("Unknown gesture: {s}")))
    }
}

/// A primitive gesture candidate produced by the classifier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GesturePrimitive {
    /// Kind of primitive
    pub kind: PrimitiveKind,
    /// Triggering quantity: |roll| in degrees, pinch distance, or swipe extent
    pub magnitude: f64,
    /// Timestamp of the frame it was classified from
    pub timestamp: Duration,
}

/// Presentation command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Next,
    Previous,
    Exit,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Next => "next",
            Self::Previous => "previous",
            Self::Exit => "exit",
        };
        f.write_str(name)
    }
}

/// Recognized gesture ready for dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureEvent {
    /// Gesture that was recognized
    pub gesture: GestureKind,
    /// Command it maps to
    pub command: Command,
    /// Timestamp of the completing frame
    pub timestamp: Duration,
}

impl GestureEvent {
    /// Build the event for a gesture recognized at `timestamp`
    #[must_use]
    pub fn new(gesture: impl Into<GestureKind>, timestamp: Duration) -> Self {
        let gesture = gesture.into();
        Self {
            gesture,
            command: gesture.command(),
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_mapping() {
        assert_eq!(GestureKind::TiltRight.command(), Command::Next);
        assert_eq!(GestureKind::SwipeLeft.command(), Command::Previous);
        assert_eq!(GestureKind::Pinch.command(), Command::Exit);
        assert_eq!(GestureKind::TripleTilt.command(), Command::Exit);
    }

    #[test]
    fn test_triple_tilt_membership() {
        let pattern = CompoundKind::TripleTilt;
        assert_eq!(pattern.member_direction(PrimitiveKind::TiltLeft), Some(Direction::Left));
        assert_eq!(pattern.member_direction(PrimitiveKind::SwipeRight), None);
        assert_eq!(pattern.member_direction(PrimitiveKind::Pinch), None);
    }

    #[test]
    fn test_gesture_names_round_trip_through_from_str() {
        for kind in GestureKind::ALL {
            assert_eq!(kind.as_str().parse::<GestureKind>().unwrap(), kind);
        }
        assert!("wave".parse::<GestureKind>().is_err());
    }
}
