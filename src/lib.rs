//! Gesture-driven presentation control.
//!
//! This library turns a stream of per-frame pose measurements (head roll or
//! hand fingertip positions) into debounced slide show commands:
//!
//! 1. [`classifier`] maps one [`pose_frame::PoseFrame`] to at most one primitive gesture
//! 2. [`debounce`] suppresses repeats of a primitive while it cools down
//! 3. [`sequence_detector`] recognizes three same-direction tilts as one exit gesture
//! 4. [`dispatcher`] sends the resulting command to a presentation target
//!
//! [`session::GestureSession`] owns all recognition state and runs these steps per
//! frame; [`performance`] optionally scores detections against operator ground truth.
//!
//! # Examples
//!
//! ```
//! use pose_gesture_control::{
//!     dispatcher::CommandDispatcher,
//!     gesture::Command,
//!     pose_frame::PoseFrame,
//!     presentation_control::ScriptedTarget,
//!     session::GestureSession,
//! };
//! use std::time::Duration;
//!
//! let target = ScriptedTarget::new();
//! let mut dispatcher = CommandDispatcher::new(target.clone());
//! let mut session = GestureSession::default();
//!
//! // A head held at 16 degrees for a third of a second advances one slide
//! for i in 0..10 {
//!     let frame = PoseFrame::head(Duration::from_millis(i * 33), 16.0);
//!     if let Some(event) = session.process_frame(&frame).event {
//!         dispatcher.dispatch(&event);
//!     }
//! }
//! assert_eq!(target.executed(), vec![Command::Next]);
//! ```

/// Per-frame pose measurements
pub mod pose_frame;

/// Gesture vocabulary and command mapping
pub mod gesture;

/// Frame-level gesture classification
pub mod classifier;

/// Per-gesture cooldown gate
pub mod debounce;

/// Compound gesture recognition
pub mod sequence_detector;

/// Roll smoothing filters
pub mod filters;

/// Per-session recognition pipeline
pub mod session;

/// Command dispatch to presentation targets
pub mod dispatcher;

/// Presentation target trait and test doubles
pub mod presentation_control;

/// X11 presentation target
pub mod x11_target;

/// Detection accuracy instrumentation
pub mod performance;

/// Pose provider and operator input interfaces
pub mod provider;

/// Scripted pose timelines
pub mod replay;

/// Webcam head-pose provider
#[cfg(feature = "camera")]
pub mod camera;

/// Face detection module for finding faces in images
#[cfg(feature = "camera")]
pub mod face_detection;

/// Facial landmark detection module for finding 68 key points
#[cfg(feature = "camera")]
pub mod mark_detection;

/// Main application module
pub mod app;

/// Command line interface
pub mod cli;

/// Error types and result handling
pub mod error;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
