//! Presentation control targets.
//!
//! A [`PresentationTarget`] executes the three slide show commands and
//! reports whether a slide show is currently running. The X11 backend lives
//! in [`crate::x11_target`]; this module holds the trait, a logging dry-run
//! target and a scriptable double used by tests and headless runs.

use crate::{gesture::Command, Error, Result};
use log::info;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Something that can drive a slide show
pub trait PresentationTarget: Send {
    /// Advance one slide
    fn next(&mut self) -> Result<()>;

    /// Go back one slide
    fn previous(&mut self) -> Result<()>;

    /// Leave the slide show
    fn exit(&mut self) -> Result<()>;

    /// Whether a slide show is running and can receive commands
    fn is_session_active(&self) -> Result<bool>;

    /// Short name for logs
    fn name(&self) -> &str;

    /// Execute `command`
    fn execute(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Next => self.next(),
            Command::Previous => self.previous(),
            Command::Exit => self.exit(),
        }
    }
}

impl PresentationTarget for Box<dyn PresentationTarget> {
    fn next(&mut self) -> Result<()> {
        (**self).next()
    }

    fn previous(&mut self) -> Result<()> {
        (**self).previous()
    }

    fn exit(&mut self) -> Result<()> {
        (**self).exit()
    }

    fn is_session_active(&self) -> Result<bool> {
        (**self).is_session_active()
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn execute(&mut self, command: Command) -> Result<()> {
        (**self).execute(command)
    }
}

/// Logs commands instead of executing them; always active
#[derive(Debug, Default)]
pub struct DryRunTarget {
    executed: usize,
}

impl DryRunTarget {
    #[must_use]
    pub const fn new() -> Self {
        Self { executed: 0 }
    }

    /// Commands logged so far
    #[must_use]
    pub const fn executed(&self) -> usize {
        self.executed
    }

    fn log(&mut self, command: Command) -> Result<()> {
        self.executed += 1;
        info!("[dry run] {command}");
        Ok(())
    }
}

impl PresentationTarget for DryRunTarget {
    fn next(&mut self) -> Result<()> {
        self.log(Command::Next)
    }

    fn previous(&mut self) -> Result<()> {
        self.log(Command::Previous)
    }

    fn exit(&mut self) -> Result<()> {
        self.log(Command::Exit)
    }

    fn is_session_active(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "dry-run"
    }
}

#[derive(Debug)]
struct ScriptedState {
    active: bool,
    failures_remaining: usize,
    query_fails: bool,
    delay: Duration,
    attempts: usize,
    executed: Vec<Command>,
}

/// Scriptable target double.
///
/// Clones share state, so a test can keep one handle while the dispatcher
/// owns another.
#[derive(Debug, Clone)]
pub struct ScriptedTarget {
    state: Arc<Mutex<ScriptedState>>,
}

impl ScriptedTarget {
    /// Active target that accepts every command
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ScriptedState {
                active: true,
                failures_remaining: 0,
                query_fails: false,
                delay: Duration::ZERO,
                attempts: 0,
                executed: Vec::new(),
            })),
        }
    }

    /// Target with no running slide show
    #[must_use]
    pub fn inactive() -> Self {
        let target = Self::new();
        target.set_session_active(false);
        target
    }

    /// Sleep this long inside every command
    #[must_use]
    pub fn with_delay(self, delay: Duration) -> Self {
        self.lock().delay = delay;
        self
    }

    pub fn set_session_active(&self, active: bool) {
        self.lock().active = active;
    }

    /// Make the next `count` commands fail
    pub fn fail_next(&self, count: usize) {
        self.lock().failures_remaining = count;
    }

    /// Make the session query itself fail
    pub fn set_query_fails(&self, fails: bool) {
        self.lock().query_fails = fails;
    }

    /// Commands that succeeded, in order
    #[must_use]
    pub fn executed(&self) -> Vec<Command> {
        self.lock().executed.clone()
    }

    /// Commands attempted, successful or not
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.lock().attempts
    }

    fn lock(&self) -> MutexGuard<'_, ScriptedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run(&self, command: Command) -> Result<()> {
        let delay = {
            let mut state = self.lock();
            state.attempts += 1;
            state.delay
        };
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let mut state = self.lock();
        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            return Err(Error::PresentationControl(format!("scripted failure for {command}")));
        }
        state.executed.push(command);
        Ok(())
    }
}

impl Default for ScriptedTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl PresentationTarget for ScriptedTarget {
    fn next(&mut self) -> Result<()> {
        self.run(Command::Next)
    }

    fn previous(&mut self) -> Result<()> {
        self.run(Command::Previous)
    }

    fn exit(&mut self) -> Result<()> {
        self.run(Command::Exit)
    }

    fn is_session_active(&self) -> Result<bool> {
        let state = self.lock();
        if state.query_fails {
            return Err(Error::PresentationControl("scripted query failure".to_string()));
        }
        Ok(state.active)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
