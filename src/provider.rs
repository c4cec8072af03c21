//! Pose provider and operator input interfaces.

use crate::{
    dispatcher::DispatchResult,
    gesture::GestureKind,
    performance::Condition,
    pose_frame::PoseFrame,
    session::FrameOutcome,
    Result,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Everything known about a frame once it has been processed, for display
#[derive(Debug, Clone, PartialEq)]
pub struct FrameStatus {
    pub frame: PoseFrame,
    pub outcome: FrameOutcome,
    pub dispatch: Option<DispatchResult>,
    /// Current condition label
    pub condition: Condition,
    /// Whether accuracy instrumentation is running
    pub instrumenting: bool,
}

/// Source of per-frame pose measurements
pub trait PoseProvider {
    /// Next frame; `Ok(None)` when the stream has ended
    fn next_frame(&mut self) -> Result<Option<PoseFrame>>;

    /// Show the processed frame; the default does nothing
    fn present(&mut self, _status: &FrameStatus) -> Result<()> {
        Ok(())
    }

    /// Whether the host loop should hold this source to the target frame rate
    fn wants_pacing(&self) -> bool {
        true
    }

    /// Short name for logs
    fn name(&self) -> &str;
}

/// Operator signals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorSignal {
    /// End the session
    Stop,
    /// The operator just performed this gesture
    GroundTruth(GestureKind),
    /// Label subsequent samples with this condition
    SetCondition(Condition),
}

/// Source of operator signals
pub trait OperatorInput {
    /// Signals that arrived up to session time `now`
    fn poll(&mut self, now: Duration) -> Vec<OperatorSignal>;
}

/// Operator input that never signals anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOperatorInput;

impl OperatorInput for NoOperatorInput {
    fn poll(&mut self, _now: Duration) -> Vec<OperatorSignal> {
        Vec::new()
    }
}

/// Map a key code to an operator signal.
///
/// `q`/Esc stop, `r`/`l`/`t` annotate tilt right, tilt left and triple tilt,
/// `1`-`5` select a condition label.
#[must_use]
pub fn signal_for_key(key: i32) -> Option<OperatorSignal> {
    const ESCAPE: i32 = 27;
    if key == ESCAPE {
        return Some(OperatorSignal::Stop);
    }

    let key = u8::try_from(key).ok()?.to_ascii_lowercase();
    match key {
        b'q' => Some(OperatorSignal::Stop),
        b'r' => Some(OperatorSignal::GroundTruth(GestureKind::TiltRight)),
        b'l' => Some(OperatorSignal::GroundTruth(GestureKind::TiltLeft)),
        b't' => Some(OperatorSignal::GroundTruth(GestureKind::TripleTilt)),
        b'1'..=b'5' => Condition::ALL
            .get(usize::from(key - b'1'))
            .copied()
            .map(OperatorSignal::SetCondition),
        _ => None,
    }
}

/// Operator input fed with raw key codes, e.g. from a display window
#[derive(Debug, Clone, Default)]
pub struct KeyboardInput {
    keys: Arc<Mutex<VecDeque<i32>>>,
}

impl KeyboardInput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a key press; clones share the queue
    pub fn push(&self, key: i32) {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner).push_back(key);
    }
}

impl OperatorInput for KeyboardInput {
    fn poll(&mut self, _now: Duration) -> Vec<OperatorSignal> {
        let mut keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        keys.drain(..).filter_map(signal_for_key).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_bindings() {
        assert_eq!(signal_for_key(27), Some(OperatorSignal::Stop));
        assert_eq!(signal_for_key(i32::from(b'Q')), Some(OperatorSignal::Stop));
        assert_eq!(
            signal_for_key(i32::from(b't')),
            Some(OperatorSignal::GroundTruth(GestureKind::TripleTilt))
        );
        assert_eq!(
            signal_for_key(i32::from(b'2')),
            Some(OperatorSignal::SetCondition(Condition::LowLight))
        );
        assert_eq!(
            signal_for_key(i32::from(b'5')),
            Some(OperatorSignal::SetCondition(Condition::Natural))
        );
        assert_eq!(signal_for_key(i32::from(b'6')), None);
        assert_eq!(signal_for_key(-1), None);
        assert_eq!(signal_for_key(0x10_0000), None);
    }

    #[test]
    fn test_keyboard_input_drains_queue() {
        let mut input = KeyboardInput::new();
        let feeder = input.clone();
        feeder.push(i32::from(b'r'));
        feeder.push(i32::from(b'x'));
        feeder.push(i32::from(b'q'));

        assert_eq!(
            input.poll(Duration::ZERO),
            vec![
                OperatorSignal::GroundTruth(GestureKind::TiltRight),
                OperatorSignal::Stop
            ]
        );
        assert!(input.poll(Duration::ZERO).is_empty());
    }
}
