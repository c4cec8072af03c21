//! Command dispatch with latency measurement.
//!
//! Dispatch never fails from the caller's point of view: every error from
//! the target, including a missing slide show, comes back as a
//! [`DispatchResult`] with `success == false` so the capture loop keeps
//! running. Nothing is retried.

use crate::{
    constants::MIN_DISPATCH_LATENCY_MICROS,
    gesture::{Command, GestureEvent},
    presentation_control::PresentationTarget,
    Error,
};
use log::{info, warn};
use std::time::{Duration, Instant};

/// Outcome of one dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResult {
    pub command: Command,
    pub success: bool,
    /// Wall time spent, never zero
    pub latency: Duration,
    /// Failure description
    pub error: Option<String>,
}

/// Running dispatch counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    /// Failures caused by no running slide show
    pub inactive_session: u64,
    pub max_latency: Duration,
}

/// Sends gesture commands to a presentation target
pub struct CommandDispatcher<T: PresentationTarget> {
    target: T,
    stats: DispatchStats,
}

impl<T: PresentationTarget> CommandDispatcher<T> {
    #[must_use]
    pub fn new(target: T) -> Self {
        info!("Dispatching commands to {} target", target.name());
        Self {
            target,
            stats: DispatchStats::default(),
        }
    }

    /// Execute the command of `event` if a slide show is running
    pub fn dispatch(&mut self, event: &GestureEvent) -> DispatchResult {
        let started = Instant::now();

        let outcome = match self.target.is_session_active() {
            Ok(true) => self.target.execute(event.command),
            Ok(false) => Err(Error::NoActiveSession),
            Err(e) => Err(e),
        };

        let latency = started
            .elapsed()
            .max(Duration::from_micros(MIN_DISPATCH_LATENCY_MICROS));

        self.stats.attempts += 1;
        self.stats.max_latency = self.stats.max_latency.max(latency);

        match outcome {
            Ok(()) => {
                self.stats.successes += 1;
                info!(
                    "{} -> {} in {:.3} ms",
                    event.gesture,
                    event.command,
                    latency.as_secs_f64() * 1000.0
                );
                DispatchResult {
                    command: event.command,
                    success: true,
                    latency,
                    error: None,
                }
            }
            Err(e) => {
                self.stats.failures += 1;
                if matches!(e, Error::NoActiveSession) {
                    self.stats.inactive_session += 1;
                }
                warn!("{} -> {} failed: {}", event.gesture, event.command, e);
                DispatchResult {
                    command: event.command,
                    success: false,
                    latency,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    #[must_use]
    pub const fn stats(&self) -> DispatchStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{gesture::GestureKind, presentation_control::ScriptedTarget};

    fn event(gesture: GestureKind) -> GestureEvent {
        GestureEvent::new(gesture, Duration::from_secs(1))
    }

    #[test]
    fn test_successful_dispatch() {
        let target = ScriptedTarget::new();
        let mut dispatcher = CommandDispatcher::new(target.clone());

        let result = dispatcher.dispatch(&event(GestureKind::SwipeLeft));
        assert!(result.success);
        assert_eq!(result.command, Command::Previous);
        assert!(result.latency >= Duration::from_micros(MIN_DISPATCH_LATENCY_MICROS));
        assert!(result.error.is_none());
        assert_eq!(target.executed(), vec![Command::Previous]);
    }

    #[test]
    fn test_inactive_session_skips_the_call() {
        let target = ScriptedTarget::inactive();
        let mut dispatcher = CommandDispatcher::new(target.clone());

        let result = dispatcher.dispatch(&event(GestureKind::TiltRight));
        assert!(!result.success);
        assert_eq!(target.attempts(), 0);
        assert_eq!(dispatcher.stats().inactive_session, 1);
        assert!(result.latency > Duration::ZERO);
    }

    #[test]
    fn test_target_errors_become_failed_results() {
        let target = ScriptedTarget::new();
        target.fail_next(1);
        let mut dispatcher = CommandDispatcher::new(target.clone());

        let failed = dispatcher.dispatch(&event(GestureKind::Pinch));
        assert!(!failed.success);
        assert!(failed.error.as_deref().is_some_and(|msg| msg.contains("scripted failure")));

        target.set_query_fails(true);
        assert!(!dispatcher.dispatch(&event(GestureKind::Pinch)).success);

        target.set_query_fails(false);
        assert!(dispatcher.dispatch(&event(GestureKind::Pinch)).success);

        let stats = dispatcher.stats();
        assert_eq!(stats.attempts, 3);
        assert_eq!(stats.failures, 2);
        assert_eq!(stats.successes, 1);
    }

    #[test]
    fn test_latency_includes_target_time() {
        let target = ScriptedTarget::new().with_delay(Duration::from_millis(5));
        let mut dispatcher = CommandDispatcher::new(target);

        let result = dispatcher.dispatch(&event(GestureKind::TiltLeft));
        assert!(result.latency >= Duration::from_millis(5));
        assert_eq!(dispatcher.stats().max_latency, result.latency);
    }
}
