use crate::{constants::NUM_FACIAL_LANDMARKS, Error, Result};
use ndarray::Array4;
use nalgebra::Point2;
use opencv::core::{Mat, Size, Vec3b};
use opencv::imgproc::{self, InterpolationFlags};
use opencv::prelude::*;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::path::Path;

/// Default landmark detector input size
const DEFAULT_LANDMARK_INPUT_SIZE: i32 = 128;

/// 68-point facial landmark detector using `ONNX` Runtime
pub struct MarkDetector {
    session: Session,
    input_size: i32,
}

impl MarkDetector {
    /// Load the landmark model
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be loaded
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        log::info!("Loading landmark detector from {}", model_path.as_ref().display());

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(model_path)?;

        if session.outputs.is_empty() {
            return Err(Error::ModelError("Landmark model has no outputs".to_string()));
        }

        Ok(Self {
            session,
            input_size: DEFAULT_LANDMARK_INPUT_SIZE,
        })
    }

    /// Landmarks of a square face crop, in crop pixel coordinates
    ///
    /// # Errors
    ///
    /// Returns an error if preprocessing or inference fails, or the model
    /// returns fewer than 68 points
    pub fn detect(&self, face_image: &Mat) -> Result<Vec<Point2<f64>>> {
        let mut resized = Mat::default();
        imgproc::resize(
            face_image,
            &mut resized,
            Size::new(self.input_size, self.input_size),
            0.0,
            0.0,
            InterpolationFlags::INTER_LINEAR as i32,
        )?;

        let size = usize::try_from(self.input_size).map_err(|e| Error::InvalidInput(e.to_string()))?;
        let pixels = resized.data_typed::<Vec3b>()?;

        // NHWC, RGB, scaled to [0, 1]
        let tensor = Array4::from_shape_fn((1, size, size, 3), |(_, y, x, channel)| {
            f32::from(pixels[y * size + x][2 - channel]) / 255.0
        });

        let outputs = self.session.run(ort::inputs![Tensor::from_array(tensor)?]?)?;
        if outputs.is_empty() {
            return Err(Error::ModelError("No output from landmark model".to_string()));
        }
        let marks = outputs[0].try_extract_tensor::<f32>()?;
        let marks = marks
            .as_slice()
            .ok_or_else(|| Error::ModelError("Failed to get landmark data".to_string()))?;

        if marks.len() < NUM_FACIAL_LANDMARKS * 2 {
            return Err(Error::ModelError(format!(
                "Expected {} landmark values, got {}",
                NUM_FACIAL_LANDMARKS * 2,
                marks.len()
            )));
        }

        // Marks are normalized to the crop
        let width = f64::from(face_image.cols());
        let height = f64::from(face_image.rows());
        Ok(marks
            .chunks_exact(2)
            .take(NUM_FACIAL_LANDMARKS)
            .map(|xy| Point2::new(f64::from(xy[0]) * width, f64::from(xy[1]) * height))
            .collect())
    }
}
