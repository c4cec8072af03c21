//! Configuration management for the gesture control application

use crate::{
    constants::{
        DEFAULT_FPS, DEFAULT_GROUND_TRUTH_TOLERANCE_SECS, DEFAULT_LEVEL_TOLERANCE, DEFAULT_PINCH_COOLDOWN_SECS,
        DEFAULT_PINCH_THRESHOLD, DEFAULT_REPEAT_COUNT, DEFAULT_SEQUENCE_MIN_SPACING_SECS,
        DEFAULT_SEQUENCE_WINDOW_SECS, DEFAULT_SESSION_TIMEOUT_SECS, DEFAULT_STRICT_TILT_THRESHOLD_DEGREES,
        DEFAULT_SWIPE_COOLDOWN_SECS, DEFAULT_TILT_COOLDOWN_SECS, DEFAULT_TILT_THRESHOLD_DEGREES,
    },
    filters::create_filter,
    performance::Condition,
    x11_target::keysym_from_name,
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Frame classification thresholds
    pub classifier: ClassifierConfig,

    /// Per-gesture cooldowns
    pub debounce: DebounceConfig,

    /// Triple tilt pattern
    pub sequence: SequenceConfig,

    /// Pose provider settings
    pub capture: CaptureConfig,

    /// Presentation target settings
    pub presentation: PresentationConfig,

    /// Accuracy instrumentation
    pub instrumentation: InstrumentationConfig,

    /// Capture loop settings
    pub session: SessionConfig,
}

/// Primitive classifier thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Roll angle (degrees) a tilt must exceed
    pub tilt_threshold_degrees: f64,

    /// Thumb-index distance below which a pinch fires
    pub pinch_threshold: f64,

    /// Maximum fingertip vertical spread for a swipe
    pub level_tolerance: f64,

    /// Roll smoothing filter (`none`, `median:3`, `moving_average:5`, `exponential:0.5`)
    pub roll_filter: String,
}

/// Cooldowns in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebounceConfig {
    /// Head tilts
    pub tilt_cooldown_secs: f64,

    /// Hand swipes
    pub swipe_cooldown_secs: f64,

    /// Pinch
    pub pinch_cooldown_secs: f64,
}

/// Repeat pattern parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    /// Same-direction tilts needed
    pub repeat_count: usize,

    /// Roll angle (degrees) each counted tilt must exceed
    pub strict_tilt_threshold_degrees: f64,

    /// Window length in seconds
    pub window_secs: f64,

    /// Minimum spacing between counted tilts in seconds
    pub min_spacing_secs: f64,
}

/// Pose provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Webcam index
    pub camera_index: i32,

    /// Video file to read instead of the webcam
    pub video_file: Option<PathBuf>,

    /// Mirror frames horizontally
    pub mirror: bool,

    /// Minimum face detection confidence (0.0-1.0)
    pub face_confidence_threshold: f32,

    /// Subjects tracked per frame
    pub max_subjects: usize,

    /// Face ROI expansion factor before landmark detection
    pub face_expansion: f32,

    /// Path to face detection ONNX model
    pub face_detector_model: PathBuf,

    /// Path to facial landmarks ONNX model
    pub face_landmarks_model: PathBuf,
}

/// Presentation target backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetBackend {
    /// Synthetic key events on the X11 display
    X11,
    /// Log commands only
    DryRun,
}

/// Presentation target settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationConfig {
    /// Backend used to execute commands
    pub backend: TargetBackend,

    /// Substring the active window title must contain for a session to count as active
    pub window_title: Option<String>,

    /// Keys sent for each command
    pub keys: KeyBindings,
}

/// X11 key names per command
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    /// Next slide
    pub next: String,

    /// Previous slide
    pub previous: String,

    /// Leave the slide show
    pub exit: String,
}

/// Accuracy instrumentation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentationConfig {
    /// Record detections and print a report at the end of the session
    pub enabled: bool,

    /// Condition label attached to samples until changed
    pub initial_condition: Condition,

    /// Maximum distance in seconds between a detection and its ground truth
    pub tolerance_secs: f64,
}

/// Capture loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Target framerate
    pub target_fps: u32,

    /// Extra pause after a successful command, in seconds
    pub post_action_delay_secs: f64,

    /// Whole-session limit in seconds
    pub timeout_secs: u64,

    /// End the session once an exit command succeeds
    pub stop_on_exit: bool,

    /// Show the camera overlay window
    pub gui: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            tilt_threshold_degrees: DEFAULT_TILT_THRESHOLD_DEGREES,
            pinch_threshold: DEFAULT_PINCH_THRESHOLD,
            level_tolerance: DEFAULT_LEVEL_TOLERANCE,
            roll_filter: "none".to_string(),
        }
    }
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            tilt_cooldown_secs: DEFAULT_TILT_COOLDOWN_SECS,
            swipe_cooldown_secs: DEFAULT_SWIPE_COOLDOWN_SECS,
            pinch_cooldown_secs: DEFAULT_PINCH_COOLDOWN_SECS,
        }
    }
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            repeat_count: DEFAULT_REPEAT_COUNT,
            strict_tilt_threshold_degrees: DEFAULT_STRICT_TILT_THRESHOLD_DEGREES,
            window_secs: DEFAULT_SEQUENCE_WINDOW_SECS,
            min_spacing_secs: DEFAULT_SEQUENCE_MIN_SPACING_SECS,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            camera_index: 0,
            video_file: None,
            mirror: true,
            face_confidence_threshold: 0.5,
            max_subjects: 1,
            face_expansion: 0.2,
            face_detector_model: PathBuf::from("assets/face_detector.onnx"),
            face_landmarks_model: PathBuf::from("assets/face_landmarks.onnx"),
        }
    }
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            backend: TargetBackend::X11,
            window_title: None,
            keys: KeyBindings::default(),
        }
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            next: "Right".to_string(),
            previous: "Left".to_string(),
            exit: "Escape".to_string(),
        }
    }
}

impl Default for InstrumentationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            initial_condition: Condition::Optimal,
            tolerance_secs: DEFAULT_GROUND_TRUTH_TOLERANCE_SECS,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            target_fps: DEFAULT_FPS,
            post_action_delay_secs: 0.0,
            timeout_secs: DEFAULT_SESSION_TIMEOUT_SECS,
            stop_on_exit: true,
            gui: true,
        }
    }
}

impl SessionConfig {
    /// Whole-session limit
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Pause after a successful command
    #[must_use]
    pub fn post_action_delay(&self) -> Duration {
        seconds(self.post_action_delay_secs)
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        serde_yaml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }

    /// Serialize configuration to YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let classifier = &self.classifier;
        require_positive("Tilt threshold", classifier.tilt_threshold_degrees)?;
        require_positive("Pinch threshold", classifier.pinch_threshold)?;
        require_positive("Level tolerance", classifier.level_tolerance)?;
        create_filter(&classifier.roll_filter)
            .map_err(|e| Error::ConfigError(format!("Invalid roll filter: {e}")))?;

        require_seconds("Tilt cooldown", self.debounce.tilt_cooldown_secs)?;
        require_seconds("Swipe cooldown", self.debounce.swipe_cooldown_secs)?;
        require_seconds("Pinch cooldown", self.debounce.pinch_cooldown_secs)?;

        let sequence = &self.sequence;
        if sequence.repeat_count < 2 {
            return Err(Error::ConfigError("Repeat count must be at least 2".to_string()));
        }
        if sequence.strict_tilt_threshold_degrees <= classifier.tilt_threshold_degrees {
            return Err(Error::ConfigError(format!(
                "Strict tilt threshold ({}) must exceed the tilt threshold ({})",
                sequence.strict_tilt_threshold_degrees, classifier.tilt_threshold_degrees
            )));
        }
        require_positive("Sequence window", sequence.window_secs)?;
        require_seconds("Sequence window", sequence.window_secs)?;
        require_seconds("Sequence spacing", sequence.min_spacing_secs)?;

        if !(0.0..=1.0).contains(&self.capture.face_confidence_threshold) {
            return Err(Error::ConfigError(
                "Face confidence threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.capture.max_subjects != 1 {
            return Err(Error::ConfigError("Exactly one subject can be tracked".to_string()));
        }

        let keys = &self.presentation.keys;
        for name in [&keys.next, &keys.previous, &keys.exit] {
            if keysym_from_name(name).is_none() {
                return Err(Error::ConfigError(format!("Unknown key name: {name}")));
            }
        }

        require_positive("Ground truth tolerance", self.instrumentation.tolerance_secs)?;
        require_seconds("Ground truth tolerance", self.instrumentation.tolerance_secs)?;

        if self.session.target_fps == 0 {
            return Err(Error::ConfigError("Target FPS must be greater than 0".to_string()));
        }
        if self.session.timeout_secs == 0 {
            return Err(Error::ConfigError("Session timeout must be greater than 0".to_string()));
        }
        require_seconds("Post-action delay", self.session.post_action_delay_secs)?;

        Ok(())
    }
}

fn require_positive(what: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::ConfigError(format!("{what} must be a positive number, got {value}")))
    }
}

/// Accepts any value `Duration` can hold: finite, non-negative, not absurdly large
fn require_seconds(what: &str, value: f64) -> Result<()> {
    Duration::try_from_secs_f64(value)
        .map(|_| ())
        .map_err(|e| Error::ConfigError(format!("{what} is not a valid number of seconds ({value}): {e}")))
}

/// Seconds as a `Duration`, clamped to the representable range.
///
/// `Config::validate` rejects values that would need clamping.
#[must_use]
pub fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(if value > 0.0 { Duration::MAX } else { Duration::ZERO })
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Gesture Control Configuration

# Frame classification
classifier:
  tilt_threshold_degrees: 15.0
  pinch_threshold: 0.035
  level_tolerance: 0.05
  roll_filter: "none"

# Cooldowns (seconds)
debounce:
  tilt_cooldown_secs: 1.0
  swipe_cooldown_secs: 1.0
  pinch_cooldown_secs: 1.5

# Triple tilt to exit
sequence:
  repeat_count: 3
  strict_tilt_threshold_degrees: 20.0
  window_secs: 3.0
  min_spacing_secs: 0.5

# Webcam and models
capture:
  camera_index: 0
  mirror: true
  face_confidence_threshold: 0.5
  max_subjects: 1
  face_expansion: 0.2
  face_detector_model: "assets/face_detector.onnx"
  face_landmarks_model: "assets/face_landmarks.onnx"

# Slide show control
presentation:
  backend: x11
  window_title: "Impress"
  keys:
    next: "Right"
    previous: "Left"
    exit: "Escape"

# Accuracy instrumentation
instrumentation:
  enabled: false
  initial_condition: optimal
  tolerance_secs: 1.0

# Capture loop
session:
  target_fps: 30
  post_action_delay_secs: 0.0
  timeout_secs: 300
  stop_on_exit: true
  gui: true
"#;
