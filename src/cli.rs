//! Command line interface.

use crate::{
    app::PoseSource,
    config::{Config, TargetBackend},
    performance::Condition,
    Result,
};
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;

/// Control a slide show with head tilts and hand gestures
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Camera index to use
    #[arg(long)]
    pub cam: Option<i32>,

    /// Video file to process instead of the camera
    #[arg(short, long)]
    pub video: Option<PathBuf>,

    /// Replay a scripted pose timeline instead of capturing
    #[arg(short, long)]
    pub replay: Option<PathBuf>,

    /// Log commands instead of sending key events
    #[arg(long)]
    pub dry_run: bool,

    /// Only act when the active window title contains this text
    #[arg(short, long)]
    pub window_title: Option<String>,

    /// Record detections and print an accuracy report
    #[arg(short, long)]
    pub instrument: bool,

    /// Initial condition label (optimal, low_light, backlit, artificial, natural)
    #[arg(long)]
    pub condition: Option<Condition>,

    /// Do not open the camera window
    #[arg(long)]
    pub no_gui: bool,

    /// Pace replayed frames at the target frame rate
    #[arg(long)]
    pub realtime: bool,

    /// Abort the session after this many seconds
    #[arg(long)]
    pub session_timeout: Option<u64>,

    /// Print an example configuration and exit
    #[arg(long)]
    pub print_config: bool,

    /// Enable debug output
    #[arg(short, long)]
    pub debug: bool,
}

impl Args {
    /// Load the configuration file (defaults when absent or unreadable) and apply overrides
    pub fn resolve_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => {
                info!("Loading configuration from: {}", path.display());
                Config::from_file(path).unwrap_or_else(|e| {
                    warn!("Failed to load config file: {}. Using defaults.", e);
                    Config::default()
                })
            }
            None => Config::default(),
        };

        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Command line values take precedence over the file
    pub fn apply(&self, config: &mut Config) {
        if let Some(cam) = self.cam {
            config.capture.camera_index = cam;
        }
        if let Some(video) = &self.video {
            config.capture.video_file = Some(video.clone());
        }
        if self.dry_run {
            config.presentation.backend = TargetBackend::DryRun;
        }
        if let Some(title) = &self.window_title {
            config.presentation.window_title = Some(title.clone());
        }
        if self.instrument {
            config.instrumentation.enabled = true;
        }
        if let Some(condition) = self.condition {
            config.instrumentation.initial_condition = condition;
        }
        if self.no_gui {
            config.session.gui = false;
        }
        if let Some(timeout) = self.session_timeout {
            config.session.timeout_secs = timeout;
        }
    }

    /// Pose source selected on the command line
    #[must_use]
    pub fn pose_source(&self) -> PoseSource {
        match &self.replay {
            Some(path) => PoseSource::Replay {
                path: path.clone(),
                realtime: self.realtime,
            },
            None => PoseSource::Camera,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["pose-gesture-control"]).unwrap();
        assert!(args.config.is_none());
        assert!(!args.dry_run);
        assert_eq!(args.pose_source(), PoseSource::Camera);

        let config = args.resolve_config().unwrap();
        assert_eq!(config.presentation.backend, TargetBackend::X11);
        assert!(config.session.gui);
    }

    #[test]
    fn test_overrides() {
        let args = Args::try_parse_from([
            "pose-gesture-control",
            "--replay",
            "demo.yaml",
            "--realtime",
            "--dry-run",
            "--instrument",
            "--condition",
            "backlit",
            "--no-gui",
            "--session-timeout",
            "60",
            "--window-title",
            "Impress",
        ])
        .unwrap();

        assert_eq!(
            args.pose_source(),
            PoseSource::Replay {
                path: PathBuf::from("demo.yaml"),
                realtime: true
            }
        );

        let config = args.resolve_config().unwrap();
        assert_eq!(config.presentation.backend, TargetBackend::DryRun);
        assert_eq!(config.presentation.window_title.as_deref(), Some("Impress"));
        assert!(config.instrumentation.enabled);
        assert_eq!(config.instrumentation.initial_condition, Condition::Backlit);
        assert!(!config.session.gui);
        assert_eq!(config.session.timeout_secs, 60);
    }

    #[test]
    fn test_invalid_condition_is_rejected() {
        assert!(Args::try_parse_from(["pose-gesture-control", "--condition", "dusk"]).is_err());
    }

    #[test]
    fn test_zero_timeout_fails_validation() {
        let args = Args::try_parse_from(["pose-gesture-control", "--session-timeout", "0"]).unwrap();
        assert!(args.resolve_config().is_err());
    }
}
