//! Per-gesture cooldown gate.
//!
//! A held pose keeps producing the same primitive every frame; the gate lets
//! the first one through and suppresses repeats of that kind until its
//! cooldown has elapsed.

use crate::{
    config::{seconds, DebounceConfig},
    gesture::PrimitiveKind,
};
use std::collections::HashMap;
use std::time::Duration;

/// Cooldown timers, one per primitive kind
#[derive(Debug, Clone)]
pub struct DebounceGate {
    cooldowns: HashMap<PrimitiveKind, Duration>,
    default_cooldown: Duration,
    last_fired: HashMap<PrimitiveKind, Duration>,
}

impl DebounceGate {
    /// Create a gate applying the same cooldown to every kind
    #[must_use]
    pub fn new(default_cooldown: Duration) -> Self {
        Self {
            cooldowns: HashMap::new(),
            default_cooldown,
            last_fired: HashMap::new(),
        }
    }

    /// Override the cooldown for one kind
    #[must_use]
    pub fn with_cooldown(mut self, kind: PrimitiveKind, cooldown: Duration) -> Self {
        self.cooldowns.insert(kind, cooldown);
        self
    }

    /// Create a gate from configuration
    #[must_use]
    pub fn from_config(config: &DebounceConfig) -> Self {
        let tilt = seconds(config.tilt_cooldown_secs);
        let swipe = seconds(config.swipe_cooldown_secs);
        let pinch = seconds(config.pinch_cooldown_secs);

        Self::new(tilt)
            .with_cooldown(PrimitiveKind::TiltRight, tilt)
            .with_cooldown(PrimitiveKind::TiltLeft, tilt)
            .with_cooldown(PrimitiveKind::SwipeRight, swipe)
            .with_cooldown(PrimitiveKind::SwipeLeft, swipe)
            .with_cooldown(PrimitiveKind::Pinch, pinch)
    }

    /// Cooldown applied to `kind`
    #[must_use]
    pub fn cooldown(&self, kind: PrimitiveKind) -> Duration {
        self.cooldowns.get(&kind).copied().unwrap_or(self.default_cooldown)
    }

    /// Whether `kind` may fire at `now`.
    ///
    /// A caller that emits on `true` must call [`record_fired`](Self::record_fired)
    /// for the same frame; [`try_fire`](Self::try_fire) does both.
    #[must_use]
    pub fn should_emit(&self, kind: PrimitiveKind, now: Duration) -> bool {
        match self.last_fired.get(&kind) {
            None => true,
            Some(&last) => now >= last && now - last >= self.cooldown(kind),
        }
    }

    /// Start the cooldown of `kind` at `now`
    pub fn record_fired(&mut self, kind: PrimitiveKind, now: Duration) {
        self.last_fired.insert(kind, now);
    }

    /// Check and record in one step; returns whether `kind` fired
    pub fn try_fire(&mut self, kind: PrimitiveKind, now: Duration) -> bool {
        if self.should_emit(kind, now) {
            self.record_fired(kind, now);
            true
        } else {
            false
        }
    }

    /// Time left before `kind` may fire again
    #[must_use]
    pub fn remaining(&self, kind: PrimitiveKind, now: Duration) -> Duration {
        self.last_fired.get(&kind).map_or(Duration::ZERO, |&last| {
            (last + self.cooldown(kind)).saturating_sub(now)
        })
    }

    /// Forget all cooldowns
    pub fn reset(&mut self) {
        self.last_fired.clear();
    }
}

impl Default for DebounceGate {
    fn default() -> Self {
        Self::from_config(&DebounceConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: f64) -> Duration {
        Duration::from_secs_f64(secs)
    }

    #[test]
    fn test_first_occurrence_always_fires() {
        let mut gate = DebounceGate::new(at(1.0));
        assert!(gate.try_fire(PrimitiveKind::TiltRight, at(0.0)));
    }

    #[test]
    fn test_repeat_within_cooldown_is_suppressed() {
        let mut gate = DebounceGate::new(at(1.0));
        assert!(gate.try_fire(PrimitiveKind::TiltRight, at(0.0)));
        assert!(!gate.try_fire(PrimitiveKind::TiltRight, at(0.5)));
        assert!(!gate.try_fire(PrimitiveKind::TiltRight, at(0.99)));
        assert!(gate.try_fire(PrimitiveKind::TiltRight, at(1.0)));
    }

    #[test]
    fn test_suppressed_attempts_do_not_extend_cooldown() {
        let mut gate = DebounceGate::new(at(1.0));
        gate.try_fire(PrimitiveKind::TiltLeft, at(0.0));
        for step in 1..10 {
            gate.try_fire(PrimitiveKind::TiltLeft, at(f64::from(step) * 0.1));
        }
        assert!(gate.should_emit(PrimitiveKind::TiltLeft, at(1.05)));
    }

    #[test]
    fn test_kinds_cool_down_independently() {
        let mut gate = DebounceGate::new(at(1.0)).with_cooldown(PrimitiveKind::Pinch, at(1.5));
        assert!(gate.try_fire(PrimitiveKind::TiltRight, at(0.0)));
        assert!(gate.try_fire(PrimitiveKind::TiltLeft, at(0.1)));
        assert!(gate.try_fire(PrimitiveKind::Pinch, at(0.2)));

        assert!(gate.should_emit(PrimitiveKind::TiltRight, at(1.2)));
        assert!(!gate.should_emit(PrimitiveKind::Pinch, at(1.2)));
        assert!(gate.should_emit(PrimitiveKind::Pinch, at(1.7)));
    }

    #[test]
    fn test_remaining_and_reset() {
        let mut gate = DebounceGate::new(at(1.0));
        gate.record_fired(PrimitiveKind::SwipeLeft, at(2.0));
        assert_eq!(gate.remaining(PrimitiveKind::SwipeLeft, at(2.25)), at(0.75));
        assert_eq!(gate.remaining(PrimitiveKind::SwipeRight, at(2.25)), Duration::ZERO);

        gate.reset();
        assert!(gate.should_emit(PrimitiveKind::SwipeLeft, at(2.3)));
    }

    #[test]
    fn test_config_cooldowns() {
        let gate = DebounceGate::default();
        assert_eq!(gate.cooldown(PrimitiveKind::TiltRight), at(1.0));
        assert_eq!(gate.cooldown(PrimitiveKind::Pinch), at(1.5));
    }
}
