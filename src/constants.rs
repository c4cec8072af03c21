//! Constants used throughout the application

/// Default frames per second of the capture loop
pub const DEFAULT_FPS: u32 = 30;

/// Roll angle (degrees) above which a head tilt counts as navigation
pub const DEFAULT_TILT_THRESHOLD_DEGREES: f64 = 15.0;

/// Roll angle (degrees) a tilt must exceed to count toward a triple tilt
pub const DEFAULT_STRICT_TILT_THRESHOLD_DEGREES: f64 = 20.0;

/// Thumb-index distance (normalized landmark units) below which a pinch fires
pub const DEFAULT_PINCH_THRESHOLD: f64 = 0.035;

/// Maximum vertical spread of fingertips for a level, extended hand
pub const DEFAULT_LEVEL_TOLERANCE: f64 = 0.05;

/// Default cooldowns in seconds
pub const DEFAULT_TILT_COOLDOWN_SECS: f64 = 1.0;
pub const DEFAULT_SWIPE_COOLDOWN_SECS: f64 = 1.0;
pub const DEFAULT_PINCH_COOLDOWN_SECS: f64 = 1.5;

/// Triple tilt pattern defaults
pub const DEFAULT_REPEAT_COUNT: usize = 3;
pub const DEFAULT_SEQUENCE_WINDOW_SECS: f64 = 3.0;
pub const DEFAULT_SEQUENCE_MIN_SPACING_SECS: f64 = 0.5;

/// Ground truth matching tolerance in seconds
pub const DEFAULT_GROUND_TRUTH_TOLERANCE_SECS: f64 = 1.0;

/// Whole-session limit in seconds
pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 300;

/// Grace period granted to the capture loop after its session limit expires
pub const SESSION_STOP_GRACE_MILLIS: u64 = 2000;

/// Smallest latency ever reported for a dispatch, in microseconds
pub const MIN_DISPATCH_LATENCY_MICROS: u64 = 1;

/// Consecutive provider failures tolerated before the loop aborts
pub const MAX_CONSECUTIVE_PROVIDER_ERRORS: u32 = 30;

/// Number of facial landmarks for full face
pub const NUM_FACIAL_LANDMARKS: usize = 68;

/// Outer eye corners in the 68-point annotation scheme
pub const RIGHT_EYE_OUTER_CORNER: usize = 36;
pub const LEFT_EYE_OUTER_CORNER: usize = 45;

/// Image normalization constants for face detection
pub const IMAGE_NORMALIZATION_OFFSET: f32 = 127.5;
pub const IMAGE_NORMALIZATION_SCALE: f32 = 128.0;

/// Default window sizes for roll filters
pub const DEFAULT_MOVING_AVERAGE_WINDOW: usize = 5;
pub const DEFAULT_MEDIAN_WINDOW: usize = 5;

/// Default exponential smoothing factor
pub const DEFAULT_EXPONENTIAL_ALPHA: f64 = 0.5;

/// Exponential filter bounds
pub const EXPONENTIAL_ALPHA_MIN: f64 = 0.0;
pub const EXPONENTIAL_ALPHA_MAX: f64 = 1.0;
