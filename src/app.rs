//! Host loop: pose provider -> gesture session -> dispatcher, once per frame.

use crate::{
    config::{seconds, Config, TargetBackend},
    constants::{MAX_CONSECUTIVE_PROVIDER_ERRORS, SESSION_STOP_GRACE_MILLIS},
    dispatcher::CommandDispatcher,
    error::{Error, Result},
    gesture::Command,
    performance::{Condition, PerformanceRecorder, PerformanceReport},
    presentation_control::{DryRunTarget, PresentationTarget},
    provider::{FrameStatus, OperatorInput, OperatorSignal, PoseProvider},
    replay::ReplayScript,
    session::GestureSession,
    x11_target::X11PresentationTarget,
};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

/// Where pose frames come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoseSource {
    /// Webcam or video file per the capture configuration
    Camera,
    /// Scripted timeline
    Replay {
        path: PathBuf,
        /// Pace replay frames at the target frame rate
        realtime: bool,
    },
}

/// Totals of one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSummary {
    pub frames: u64,
    pub events: u64,
    pub dispatch_failures: u64,
    /// Accuracy report when instrumentation was enabled
    pub report: Option<PerformanceReport>,
}

/// Fixed-rate frame pacing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePacer {
    frame_budget: Duration,
}

impl FramePacer {
    /// Pacer for `fps` frames per second
    #[must_use]
    pub fn new(fps: u32) -> Self {
        Self {
            frame_budget: Duration::from_secs(1) / fps.max(1),
        }
    }

    #[must_use]
    pub const fn frame_budget(&self) -> Duration {
        self.frame_budget
    }

    /// Sleep left in this frame after `processing` and an intentional `post_action` pause
    #[must_use]
    pub fn remaining(&self, processing: Duration, post_action: Duration) -> Duration {
        self.frame_budget.saturating_sub(processing.saturating_add(post_action))
    }

    /// Sleep out the rest of the frame, if anything is left
    pub fn pace(&self, processing: Duration, post_action: Duration) {
        let sleep = self.remaining(processing, post_action);
        if !sleep.is_zero() {
            thread::sleep(sleep);
        }
    }
}

/// Gesture control application
pub struct GestureControlApp {
    provider: Box<dyn PoseProvider>,
    input: Box<dyn OperatorInput>,
    session: GestureSession,
    dispatcher: CommandDispatcher<Box<dyn PresentationTarget>>,
    recorder: Option<PerformanceRecorder>,
    condition: Condition,
    pacer: Option<FramePacer>,
    post_action_delay: Duration,
    stop_on_exit: bool,
    stop: Arc<AtomicBool>,
}

impl GestureControlApp {
    /// Assemble the application from acquired collaborators
    pub fn new(
        config: &Config,
        provider: Box<dyn PoseProvider>,
        input: Box<dyn OperatorInput>,
        target: Box<dyn PresentationTarget>,
    ) -> Result<Self> {
        info!("Initializing gesture control with {} pose provider", provider.name());

        // Validates the whole configuration before anything is converted
        let session = GestureSession::from_config(config)?;
        let recorder = config.instrumentation.enabled.then(|| {
            info!(
                "Instrumentation enabled, condition {}",
                config.instrumentation.initial_condition
            );
            PerformanceRecorder::new(seconds(config.instrumentation.tolerance_secs))
        });
        let pacer = provider
            .wants_pacing()
            .then(|| FramePacer::new(config.session.target_fps));

        Ok(Self {
            provider,
            input,
            session,
            dispatcher: CommandDispatcher::new(target),
            recorder,
            condition: config.instrumentation.initial_condition,
            pacer,
            post_action_delay: config.session.post_action_delay(),
            stop_on_exit: config.session.stop_on_exit,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Share a cooperative stop flag checked once per frame
    #[must_use]
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    /// Current condition label
    #[must_use]
    pub const fn condition(&self) -> Condition {
        self.condition
    }

    /// Run until stopped, the stream ends, or an exit command succeeds
    pub fn run(&mut self) -> Result<SessionSummary> {
        info!("Starting gesture control loop");

        let mut summary = SessionSummary::default();
        let mut consecutive_errors = 0_u32;

        loop {
            if self.stop.load(Ordering::Relaxed) {
                info!("Stop requested");
                break;
            }

            let started = Instant::now();
            let frame = match self.provider.next_frame() {
                Ok(Some(frame)) => {
                    consecutive_errors = 0;
                    frame
                }
                Ok(None) => {
                    info!("End of pose stream");
                    break;
                }
                Err(e) => {
                    consecutive_errors += 1;
                    warn!("Pose provider error ({} in a row): {}", consecutive_errors, e);
                    if consecutive_errors > MAX_CONSECUTIVE_PROVIDER_ERRORS {
                        return Err(Error::PoseProvider(format!(
                            "giving up after {consecutive_errors} consecutive failures: {e}"
                        )));
                    }
                    if let Some(pacer) = &self.pacer {
                        pacer.pace(started.elapsed(), Duration::ZERO);
                    }
                    continue;
                }
            };
            summary.frames += 1;

            if self.handle_signals(frame.timestamp) {
                info!("Exit requested by operator");
                break;
            }

            let outcome = self.session.process_frame(&frame);

            let mut dispatch = None;
            if let Some(event) = outcome.event {
                summary.events += 1;
                let result = self.dispatcher.dispatch(&event);
                if !result.success {
                    summary.dispatch_failures += 1;
                }
                if let Some(recorder) = &mut self.recorder {
                    recorder.record(event.gesture, result.latency, self.condition, event.timestamp);
                }
                dispatch = Some(result);
            }

            let status = FrameStatus {
                frame,
                outcome,
                dispatch,
                condition: self.condition,
                instrumenting: self.recorder.is_some(),
            };
            if let Err(e) = self.provider.present(&status) {
                warn!("Failed to present frame: {}", e);
            }

            let acted = status.dispatch.as_ref().filter(|result| result.success);
            if self.stop_on_exit && acted.is_some_and(|result| result.command == Command::Exit) {
                info!("Presentation closed, ending session");
                break;
            }

            if let Some(pacer) = &self.pacer {
                let post_action = if acted.is_some() {
                    self.post_action_delay
                } else {
                    Duration::ZERO
                };
                if !post_action.is_zero() {
                    thread::sleep(post_action);
                }
                pacer.pace(started.elapsed().saturating_sub(post_action), post_action);
            }
        }

        summary.report = self.recorder.as_ref().map(PerformanceRecorder::summarize);
        let stats = self.dispatcher.stats();
        info!(
            "Session finished: {} frames, {} gestures, {} failed dispatches ({} without a slide show), slowest dispatch {:.3} ms",
            summary.frames,
            summary.events,
            summary.dispatch_failures,
            stats.inactive_session,
            stats.max_latency.as_secs_f64() * 1000.0
        );
        Ok(summary)
    }

    /// Apply pending operator signals; returns true on stop
    fn handle_signals(&mut self, now: Duration) -> bool {
        let mut stop = false;
        for signal in self.input.poll(now) {
            match signal {
                OperatorSignal::Stop => stop = true,
                OperatorSignal::SetCondition(condition) => {
                    info!("Condition set to {}", condition);
                    self.condition = condition;
                }
                OperatorSignal::GroundTruth(gesture) => match &mut self.recorder {
                    Some(recorder) => recorder.annotate_ground_truth(gesture, self.condition, now),
                    None => warn!("Ground truth {} ignored, instrumentation is off", gesture),
                },
            }
        }
        stop
    }
}

/// Acquire the configured collaborators and run one session.
///
/// Everything is built on the calling thread, so providers need not be `Send`.
pub fn build_and_run(config: &Config, source: &PoseSource, stop: Arc<AtomicBool>) -> Result<SessionSummary> {
    let (provider, input): (Box<dyn PoseProvider>, Box<dyn OperatorInput>) = match source {
        PoseSource::Replay { path, realtime } => {
            let (provider, input) = ReplayScript::from_file(path)?.split(*realtime);
            (Box::new(provider), Box::new(input))
        }
        PoseSource::Camera => open_camera(config)?,
    };

    let target: Box<dyn PresentationTarget> = match config.presentation.backend {
        TargetBackend::X11 => Box::new(X11PresentationTarget::new(&config.presentation)?),
        TargetBackend::DryRun => Box::new(DryRunTarget::new()),
    };

    GestureControlApp::new(config, provider, input, target)?
        .with_stop_flag(stop)
        .run()
}

#[cfg(feature = "camera")]
fn open_camera(config: &Config) -> Result<(Box<dyn PoseProvider>, Box<dyn OperatorInput>)> {
    let camera = crate::camera::CameraPoseProvider::new(&config.capture, config.session.gui)?;
    let keyboard = camera.keyboard();
    Ok((Box::new(camera), Box::new(keyboard)))
}

#[cfg(not(feature = "camera"))]
fn open_camera(_config: &Config) -> Result<(Box<dyn PoseProvider>, Box<dyn OperatorInput>)> {
    Err(Error::PoseProvider(
        "built without the `camera` feature, use a replay script".to_string(),
    ))
}

/// Run `launch` on a worker thread, giving up after `timeout`.
///
/// On timeout the stop flag passed to `launch` is raised and the worker gets
/// a short grace period to wind down; the call then fails with
/// [`Error::SessionTimeout`] either way.
pub fn run_bounded<F>(timeout: Duration, launch: F) -> Result<SessionSummary>
where
    F: FnOnce(Arc<AtomicBool>) -> Result<SessionSummary> + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let (sender, receiver) = mpsc::channel();

    let worker_stop = Arc::clone(&stop);
    let worker = thread::Builder::new()
        .name("gesture-session".to_string())
        .spawn(move || {
            // The receiver is gone once the session has been abandoned
            let _ = sender.send(launch(worker_stop));
        })?;

    match receiver.recv_timeout(timeout) {
        Ok(result) => {
            let _ = worker.join();
            result
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(Error::PoseProvider(
            "session worker exited without a result".to_string(),
        )),
        Err(mpsc::RecvTimeoutError::Timeout) => {
            warn!("Session exceeded {:?}, stopping", timeout);
            stop.store(true, Ordering::Relaxed);
            match receiver.recv_timeout(Duration::from_millis(SESSION_STOP_GRACE_MILLIS)) {
                Ok(_) => {
                    let _ = worker.join();
                    info!("Session stopped within the grace period");
                }
                Err(_) => warn!("Session did not stop, abandoning worker thread"),
            }
            Err(Error::SessionTimeout(timeout))
        }
    }
}
