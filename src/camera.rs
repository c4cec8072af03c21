//! Webcam head-pose provider.
//!
//! Reads frames with `OpenCV`, finds the most confident face, runs the
//! 68-point landmark model on a square crop around it and reports the roll
//! of the line through the two outer eye corners. An optional window shows
//! the frame with the detection and gesture overlay; key presses in that
//! window feed a [`KeyboardInput`].

use crate::{
    config::CaptureConfig,
    constants::{LEFT_EYE_OUTER_CORNER, RIGHT_EYE_OUTER_CORNER},
    face_detection::{refine_box, FaceDetector},
    mark_detection::MarkDetector,
    pose_frame::{roll_from_eye_corners, Measurement, PoseFrame},
    provider::{FrameStatus, KeyboardInput, PoseProvider},
    Error, Result,
};
use log::{debug, info};
use nalgebra::Point2;
use opencv::{
    core::{self, Mat, Point, Rect, Scalar},
    highgui, imgproc,
    prelude::*,
    videoio::{self, VideoCapture, CAP_PROP_BUFFERSIZE, CAP_PROP_POS_MSEC},
};
use std::time::{Duration, Instant};

const WINDOW_NAME: &str = "Gesture Control";

/// Last detection, kept for the overlay
#[derive(Debug, Clone, Copy)]
struct Tracked {
    face: Rect,
    corners: (Point2<f64>, Point2<f64>),
}

/// Head roll from a webcam or video file
pub struct CameraPoseProvider {
    capture: VideoCapture,
    from_file: bool,
    mirror: bool,
    face_expansion: f32,
    face_detector: FaceDetector,
    mark_detector: MarkDetector,
    gui: bool,
    keyboard: KeyboardInput,
    started: Instant,
    frame: Mat,
    tracked: Option<Tracked>,
}

impl CameraPoseProvider {
    /// Open the video source and load both models
    pub fn new(config: &CaptureConfig, gui: bool) -> Result<Self> {
        let (capture, from_file) = match &config.video_file {
            Some(path) => {
                info!("Opening video file: {}", path.display());
                let path = path
                    .to_str()
                    .ok_or_else(|| Error::InvalidInput(format!("Non UTF-8 video path: {}", path.display())))?;
                (VideoCapture::from_file(path, videoio::CAP_ANY)?, true)
            }
            None => {
                info!("Opening camera {}", config.camera_index);
                let mut capture = VideoCapture::new(config.camera_index, videoio::CAP_ANY)?;
                capture.set(CAP_PROP_BUFFERSIZE, 1.0)?;
                (capture, false)
            }
        };

        if !capture.is_opened()? {
            return Err(Error::PoseProvider("Failed to open video source".to_string()));
        }

        let face_detector = FaceDetector::new(&config.face_detector_model, config.face_confidence_threshold)?;
        let mark_detector = MarkDetector::new(&config.face_landmarks_model)?;

        if gui {
            highgui::named_window(WINDOW_NAME, highgui::WINDOW_NORMAL)?;
        }

        Ok(Self {
            capture,
            from_file,
            mirror: config.mirror,
            face_expansion: config.face_expansion,
            face_detector,
            mark_detector,
            gui,
            keyboard: KeyboardInput::new(),
            started: Instant::now(),
            frame: Mat::default(),
            tracked: None,
        })
    }

    /// Operator input fed by key presses in the display window
    #[must_use]
    pub fn keyboard(&self) -> KeyboardInput {
        self.keyboard.clone()
    }

    fn timestamp(&self) -> Result<Duration> {
        if self.from_file {
            let millis = self.capture.get(CAP_PROP_POS_MSEC)?;
            Ok(Duration::from_secs_f64(millis.max(0.0) / 1000.0))
        } else {
            Ok(self.started.elapsed())
        }
    }

    fn track(&self, frame: &Mat) -> Result<Option<Tracked>> {
        let Some(face) = self.face_detector.detect_best(frame)? else {
            return Ok(None);
        };

        let face = refine_box(face.bbox, frame.cols(), frame.rows(), self.face_expansion);
        if face.width <= 0 || face.height <= 0 {
            return Ok(None);
        }

        let crop = Mat::roi(frame, face)?.try_clone()?;
        let marks = self.mark_detector.detect(&crop)?;
        let (Some(right), Some(left)) = (marks.get(RIGHT_EYE_OUTER_CORNER), marks.get(LEFT_EYE_OUTER_CORNER)) else {
            return Ok(None);
        };

        let origin = Point2::new(f64::from(face.x), f64::from(face.y));
        Ok(Some(Tracked {
            face,
            corners: (origin + right.coords, origin + left.coords),
        }))
    }

    fn draw_overlay(&self, canvas: &mut Mat, status: &FrameStatus) -> Result<()> {
        let green = Scalar::new(0.0, 255.0, 0.0, 0.0);
        let yellow = Scalar::new(0.0, 255.0, 255.0, 0.0);
        let red = Scalar::new(0.0, 0.0, 255.0, 0.0);

        if let Some(tracked) = &self.tracked {
            imgproc::rectangle(canvas, tracked.face, green, 2, imgproc::LINE_8, 0)?;
            let (a, b) = tracked.corners;
            imgproc::line(
                canvas,
                Point::new(a.x as i32, a.y as i32),
                Point::new(b.x as i32, b.y as i32),
                yellow,
                2,
                imgproc::LINE_AA,
                0,
            )?;
        }

        let mut lines = Vec::new();
        match status.frame.measurement {
            Measurement::Head { roll_degrees } => lines.push(format!("roll {roll_degrees:+.1} deg")),
            Measurement::Hand(_) => lines.push("hand".to_string()),
            Measurement::NotDetected => lines.push("no face".to_string()),
        }
        if let Some(event) = status.outcome.event {
            lines.push(format!("{} -> {}", event.gesture, event.command));
        } else if status.outcome.suppressed {
            lines.push("cooling down".to_string());
        }
        if let Some(dispatch) = &status.dispatch {
            if !dispatch.success {
                lines.push(format!("dispatch failed: {}", dispatch.error.as_deref().unwrap_or("unknown")));
            }
        }
        if status.instrumenting {
            lines.push(format!("condition {}", status.condition));
        }

        for (row, text) in (1..).zip(&lines) {
            let color = if text.starts_with("dispatch failed") { red } else { green };
            imgproc::put_text(
                canvas,
                text,
                Point::new(10, 30 * row),
                imgproc::FONT_HERSHEY_SIMPLEX,
                0.8,
                color,
                2,
                imgproc::LINE_8,
                false,
            )?;
        }
        Ok(())
    }
}

impl PoseProvider for CameraPoseProvider {
    fn next_frame(&mut self) -> Result<Option<PoseFrame>> {
        let mut raw = Mat::default();
        if !self.capture.read(&mut raw)? || raw.empty() {
            if self.from_file {
                info!("End of video file reached");
                return Ok(None);
            }
            return Err(Error::PoseProvider("Failed to read frame from camera".to_string()));
        }

        if self.mirror {
            core::flip(&raw, &mut self.frame, 1)?;
        } else {
            self.frame = raw;
        }

        let timestamp = self.timestamp()?;
        self.tracked = self.track(&self.frame)?;

        Ok(Some(match &self.tracked {
            Some(tracked) => {
                let roll = roll_from_eye_corners(tracked.corners.0, tracked.corners.1);
                debug!("Roll {:+.1} deg at {:.2}s", roll, timestamp.as_secs_f64());
                PoseFrame::head(timestamp, roll)
            }
            None => PoseFrame::empty(timestamp),
        }))
    }

    fn present(&mut self, status: &FrameStatus) -> Result<()> {
        if !self.gui {
            return Ok(());
        }

        let mut canvas = self.frame.try_clone()?;
        self.draw_overlay(&mut canvas, status)?;
        highgui::imshow(WINDOW_NAME, &canvas)?;

        let key = highgui::wait_key(1)?;
        if key >= 0 {
            self.keyboard.push(key & 0xff);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        if self.from_file {
            "video"
        } else {
            "camera"
        }
    }
}

impl Drop for CameraPoseProvider {
    fn drop(&mut self) {
        if self.gui {
            let _ = highgui::destroy_window(WINDOW_NAME);
        }
        let _ = self.capture.release();
    }
}
