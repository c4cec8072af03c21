//! Host loop tests driven by replay scripts

use pose_gesture_control::{
    app::{build_and_run, run_bounded, GestureControlApp, PoseSource, SessionSummary},
    config::{Config, TargetBackend},
    gesture::{Command, GestureKind},
    performance::Condition,
    presentation_control::{PresentationTarget, ScriptedTarget},
    pose_frame::PoseFrame,
    provider::{NoOperatorInput, PoseProvider},
    replay::ReplayScript,
    Error, Result,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

const INSTRUMENTED_RUN: &str = r"
timeline:
  - { t: 0.0, roll: 22.0 }
  - { t: 0.2, roll: 0.0, annotate: tilt_right }
  - { t: 1.5, roll: 0.0, condition: backlit }
  - { t: 2.0, roll: -22.0 }
  - { t: 2.1, roll: 0.0, annotate: tilt_right }
  - t: 3.5
    hand: { thumb_tip: [0.7, 0.5, 0.0], index_tip: [0.6, 0.5, 0.0], middle_tip: [0.5, 0.51, 0.0] }
  - t: 4.0
    hand: { thumb_tip: [0.5, 0.5, 0.0], index_tip: [0.51, 0.5, 0.0], middle_tip: [0.45, 0.6, 0.0] }
  - { t: 5.0, roll: 22.0 }
";

fn app_for(script: &str, config: &Config, target: &ScriptedTarget) -> Result<GestureControlApp> {
    let (provider, input) = ReplayScript::from_yaml(script)?.split(false);
    let target: Box<dyn PresentationTarget> = Box::new(target.clone());
    GestureControlApp::new(config, Box::new(provider), Box::new(input), target)
}

#[test]
fn test_instrumented_replay() -> Result<()> {
    let mut config = Config::default();
    config.instrumentation.enabled = true;
    let target = ScriptedTarget::new();

    let mut app = app_for(INSTRUMENTED_RUN, &config, &target)?;
    let summary = app.run()?;

    // The pinch at 4.0 exits the slide show and ends the session
    assert_eq!(summary.frames, 7);
    assert_eq!(summary.events, 4);
    assert_eq!(summary.dispatch_failures, 0);
    assert_eq!(
        target.executed(),
        vec![Command::Next, Command::Previous, Command::Next, Command::Exit]
    );
    assert_eq!(app.condition(), Condition::Backlit);

    let report = summary.report.expect("instrumentation report");
    assert_eq!(report.total_detections(), 4);

    let optimal = report.condition(Condition::Optimal).unwrap();
    assert_eq!(optimal.stats.detections, 1);
    assert_eq!(optimal.stats.correct, 1);
    assert!((optimal.stats.accuracy_percent() - 100.0).abs() < 1e-9);

    let backlit = report.condition(Condition::Backlit).unwrap();
    assert_eq!(backlit.ground_truth, 1);
    assert_eq!(backlit.stats.detections, 3);
    assert_eq!(backlit.stats.correct, 0);
    assert_eq!(backlit.stats.misclassified, 1);
    assert_eq!(backlit.stats.false_positives, 2);
    assert_eq!(
        backlit.gesture(GestureKind::TiltLeft).unwrap().stats.misclassified,
        1
    );

    let text = report.to_string();
    assert!(text.contains("optimal"));
    assert!(text.contains("backlit"));
    Ok(())
}

#[test]
fn test_replay_without_instrumentation_has_no_report() -> Result<()> {
    let config = Config::default();
    let target = ScriptedTarget::new();

    let summary = app_for(INSTRUMENTED_RUN, &config, &target)?.run()?;
    assert!(summary.report.is_none());
    assert_eq!(summary.events, 4);
    Ok(())
}

#[test]
fn test_failed_exit_keeps_session_running() -> Result<()> {
    let config = Config::default();
    let target = ScriptedTarget::inactive();

    let summary = app_for(INSTRUMENTED_RUN, &config, &target)?.run()?;

    // Every dispatch fails, so the stream runs to its end
    assert_eq!(summary.frames, 8);
    assert_eq!(summary.events, 5);
    assert_eq!(summary.dispatch_failures, 5);
    assert!(target.executed().is_empty());
    Ok(())
}

#[test]
fn test_exit_can_be_configured_not_to_stop() -> Result<()> {
    let mut config = Config::default();
    config.session.stop_on_exit = false;
    let target = ScriptedTarget::new();

    let summary = app_for(INSTRUMENTED_RUN, &config, &target)?.run()?;
    assert_eq!(summary.frames, 8);
    assert_eq!(target.executed().last(), Some(&Command::Next));
    Ok(())
}

#[test]
fn test_operator_stop_signal() -> Result<()> {
    let script = r"
timeline:
  - { t: 0.0, roll: 22.0 }
  - { t: 0.5, roll: 0.0, stop: true }
  - { t: 1.5, roll: -22.0 }
";
    let target = ScriptedTarget::new();
    let summary = app_for(script, &Config::default(), &target)?.run()?;

    assert_eq!(summary.frames, 2);
    assert_eq!(target.executed(), vec![Command::Next]);
    Ok(())
}

#[test]
fn test_stop_flag_is_checked_first() -> Result<()> {
    let stop = Arc::new(AtomicBool::new(true));
    let target = ScriptedTarget::new();

    let summary = app_for(INSTRUMENTED_RUN, &Config::default(), &target)?
        .with_stop_flag(stop)
        .run()?;
    assert_eq!(summary, SessionSummary::default());
    Ok(())
}

#[test]
fn test_build_and_run_from_file() -> Result<()> {
    let path = std::env::temp_dir().join(format!("gesture-replay-{}.yaml", std::process::id()));
    std::fs::write(&path, INSTRUMENTED_RUN)?;

    let mut config = Config::default();
    config.presentation.backend = TargetBackend::DryRun;
    let source = PoseSource::Replay {
        path: path.clone(),
        realtime: false,
    };

    let result = build_and_run(&config, &source, Arc::new(AtomicBool::new(false)));
    std::fs::remove_file(&path)?;

    let summary = result?;
    assert_eq!(summary.frames, 7);
    assert_eq!(summary.events, 4);
    Ok(())
}

#[test]
fn test_missing_replay_file_is_fatal() {
    let config = Config {
        presentation: pose_gesture_control::config::PresentationConfig {
            backend: TargetBackend::DryRun,
            ..Default::default()
        },
        ..Default::default()
    };
    let source = PoseSource::Replay {
        path: "/nonexistent/replay.yaml".into(),
        realtime: false,
    };

    assert!(build_and_run(&config, &source, Arc::new(AtomicBool::new(false))).is_err());
}

#[test]
fn test_app_with_no_operator_input() -> Result<()> {
    let (provider, _) = ReplayScript::from_yaml(INSTRUMENTED_RUN)?.split(false);
    let target = ScriptedTarget::new();
    let mut config = Config::default();
    config.instrumentation.enabled = true;

    let mut app = GestureControlApp::new(
        &config,
        Box::new(provider),
        Box::new(NoOperatorInput),
        Box::new(target),
    )?;
    let report = app.run()?.report.unwrap();

    // Without annotations nothing can be scored
    let optimal = report.condition(Condition::Optimal).unwrap();
    assert_eq!(optimal.stats.detections, 4);
    assert_eq!(optimal.stats.unscored, 4);
    assert_eq!(optimal.stats.accuracy_percent(), 0.0);
    Ok(())
}

#[test]
fn test_app_rejects_unrepresentable_durations() {
    let mut config = Config::default();
    config.sequence.window_secs = 1e20;
    let target = ScriptedTarget::new();
    assert!(matches!(
        app_for(INSTRUMENTED_RUN, &config, &target),
        Err(Error::ConfigError(_))
    ));

    let mut config = Config::default();
    config.debounce.tilt_cooldown_secs = -0.5;
    assert!(matches!(
        app_for(INSTRUMENTED_RUN, &config, &target),
        Err(Error::ConfigError(_))
    ));
}

#[test]
fn test_run_bounded_propagates_errors() {
    let result = run_bounded(Duration::from_secs(5), |_stop| Err(Error::NoActiveSession));
    assert!(matches!(result, Err(Error::NoActiveSession)));
}

/// Provider whose camera never delivers
struct BrokenCamera;

impl PoseProvider for BrokenCamera {
    fn next_frame(&mut self) -> Result<Option<PoseFrame>> {
        Err(Error::PoseProvider("device unplugged".to_string()))
    }

    fn wants_pacing(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "broken"
    }
}

#[test]
fn test_persistent_provider_errors_end_the_session() {
    let mut app = GestureControlApp::new(
        &Config::default(),
        Box::new(BrokenCamera),
        Box::new(NoOperatorInput),
        Box::new(ScriptedTarget::new()),
    )
    .unwrap();

    match app.run() {
        Err(Error::PoseProvider(msg)) => assert!(msg.contains("consecutive")),
        other => panic!("Expected PoseProvider error, got {other:?}"),
    }
}
