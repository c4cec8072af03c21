//! Compound gesture recognition over a bounded window of primitives.
//!
//! A [`SequenceDetector`] tracks one repeat pattern (for example three
//! same-direction head tilts within three seconds). Entries only count when
//! they are stronger than a stricter magnitude threshold than plain
//! navigation uses and are spaced apart by a minimum interval. After an
//! accepted entry the detector latches that direction until the signal
//! settles back to the strict magnitude or below, so a single held tilt is
//! not mistaken for a repetition.
//!
//! States: `Idle -> Accumulating(1) -> ... -> Accumulating(n-1)`, then either
//! the pattern completes (event emitted, back to `Idle`) or the window ages
//! out (back to `Idle`).

use crate::{
    config::{seconds, SequenceConfig},
    gesture::{CompoundKind, Direction, GesturePrimitive},
};
use log::{debug, error};
use std::collections::VecDeque;
use std::time::Duration;

/// Parameters of an "n repeats in the same direction" pattern
#[derive(Debug, Clone, PartialEq)]
pub struct RepeatPattern {
    /// Compound gesture emitted on completion
    pub compound: CompoundKind,
    /// Number of same-direction entries required
    pub repeat_count: usize,
    /// Maximum span of a completing run, and idle time after which the window clears
    pub window_timeout: Duration,
    /// Minimum time between two accepted entries
    pub min_spacing: Duration,
    /// Magnitude an entry must exceed to be accepted
    pub min_magnitude: f64,
}

impl RepeatPattern {
    /// Triple tilt pattern from configuration
    #[must_use]
    pub fn triple_tilt(config: &SequenceConfig) -> Self {
        Self {
            compound: CompoundKind::TripleTilt,
            repeat_count: config.repeat_count,
            window_timeout: seconds(config.window_secs),
            min_spacing: seconds(config.min_spacing_secs),
            min_magnitude: config.strict_tilt_threshold_degrees,
        }
    }
}

/// Observable state of a detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceState {
    /// Window empty
    Idle,
    /// Window holds this many accepted entries
    Accumulating(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct SequenceEntry {
    direction: Direction,
    time: Duration,
}

/// Bounded, time-ordered window of qualifying primitives for one pattern
#[derive(Debug, Clone)]
pub struct SequenceDetector {
    pattern: RepeatPattern,
    window: VecDeque<SequenceEntry>,
    latched: Option<Direction>,
}

impl SequenceDetector {
    /// Create a detector for `pattern`
    #[must_use]
    pub fn new(pattern: RepeatPattern) -> Self {
        let capacity = pattern.repeat_count + 1;
        Self {
            pattern,
            window: VecDeque::with_capacity(capacity),
            latched: None,
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> SequenceState {
        match self.window.len() {
            0 => SequenceState::Idle,
            n => SequenceState::Accumulating(n),
        }
    }

    /// Clear the window if its newest entry is older than the timeout.
    ///
    /// Returns `true` when a pending sequence was abandoned.
    pub fn expire(&mut self, now: Duration) -> bool {
        let stale = self
            .window
            .back()
            .is_some_and(|newest| now.saturating_sub(newest.time) > self.pattern.window_timeout);

        if stale {
            debug!(
                "{:?} sequence timed out with {} pending entries",
                self.pattern.compound,
                self.window.len()
            );
            self.window.clear();
        }
        stale
    }

    /// Feed one primitive observed at `now`; returns the compound gesture when it completes
    pub fn observe(&mut self, primitive: &GesturePrimitive, now: Duration) -> Option<CompoundKind> {
        self.expire(now);

        let direction = self.pattern.compound.member_direction(primitive.kind)?;
        if primitive.magnitude <= self.pattern.min_magnitude {
            return None;
        }

        if let Some(&newest) = self.window.back() {
            debug_assert!(
                now >= newest.time,
                "sequence window out of order: {now:?} after {:?}",
                newest.time
            );
            if now < newest.time {
                error!(
                    "{:?} sequence window out of order ({:?} after {:?}), restarting",
                    self.pattern.compound, now, newest.time
                );
                self.window.clear();
            } else if now - newest.time < self.pattern.min_spacing {
                return None;
            }
        }

        if self.latched == Some(direction) {
            debug!(
                "{:?} ignoring {:?}, previous entry still held",
                self.pattern.compound, direction
            );
            return None;
        }
        self.latched = Some(direction);

        self.window.push_back(SequenceEntry {
            direction,
            time: now,
        });
        debug!(
            "{:?} accepted {:?} ({:.1}), window {}",
            self.pattern.compound,
            direction,
            primitive.magnitude,
            self.window.len()
        );

        if self.tail_completes() {
            self.window.clear();
            return Some(self.pattern.compound);
        }

        if self.window.len() > self.pattern.repeat_count {
            let keep = self.pattern.repeat_count.saturating_sub(1);
            let drop = self.window.len() - keep;
            self.window.drain(..drop);
        }

        None
    }

    /// Report the current signal magnitude, even on frames that produced no
    /// primitive. At or below the entry magnitude the held entry is released.
    pub fn settle(&mut self, magnitude: f64) {
        if magnitude <= self.pattern.min_magnitude {
            self.release();
        }
    }

    /// Accept the next qualifying entry regardless of direction
    pub fn release(&mut self) {
        self.latched = None;
    }

    /// Drop any pending entries
    pub fn reset(&mut self) {
        self.window.clear();
        self.latched = None;
    }

    fn tail_completes(&self) -> bool {
        let n = self.pattern.repeat_count;
        if n == 0 || self.window.len() < n {
            return false;
        }

        let mut tail = self.window.iter().skip(self.window.len() - n);
        let Some(first) = tail.next() else {
            return false;
        };
        let mut last = first;
        for entry in tail {
            if entry.direction != first.direction {
                return false;
            }
            last = entry;
        }

        last.time - first.time <= self.pattern.window_timeout
    }
}
