use crate::{
    constants::{IMAGE_NORMALIZATION_OFFSET, IMAGE_NORMALIZATION_SCALE},
    Error, Result,
};
use log::{debug, info, warn};
use ndarray::Array4;
use opencv::core::{Mat, Rect, Scalar, Size, Vec3b, CV_8UC3};
use opencv::imgproc::{self, InterpolationFlags};
use opencv::prelude::*;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::{Tensor, ValueType};
use std::path::Path;

/// Default SCRFD input size
const DEFAULT_INPUT_SIZE: i32 = 640;

/// Face detection result
#[derive(Debug, Clone, Copy)]
pub struct FaceDetection {
    /// Bounding box in image pixels
    pub bbox: Rect,
    /// Confidence score of the detection
    pub score: f32,
}

/// SCRFD face detector on ONNX Runtime, reporting the single most confident face
pub struct FaceDetector {
    session: Session,
    input_size: (i32, i32),
    conf_threshold: f32,
    num_anchors: usize,
    strides: Vec<i32>,
    bbox_offset: usize,
}

impl FaceDetector {
    /// Load the detector model
    pub fn new<P: AsRef<Path>>(model_path: P, conf_threshold: f32) -> Result<Self> {
        info!("Loading face detector from {}", model_path.as_ref().display());

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(model_path)?;

        let input = session
            .inputs
            .first()
            .ok_or_else(|| Error::ModelError("Face detector has no inputs".to_string()))?;

        // [batch, channels, height, width]; dynamic dimensions (-1) fall back to the default size
        let dimensions = match &input.input_type {
            ValueType::Tensor { dimensions, .. } => dimensions.clone(),
            _ => Vec::new(),
        };
        let dimension = |index: usize| {
            dimensions
                .get(index)
                .copied()
                .filter(|&d| d > 0)
                .and_then(|d| i32::try_from(d).ok())
                .unwrap_or(DEFAULT_INPUT_SIZE)
        };
        let input_size = (dimension(3), dimension(2));

        let (bbox_offset, strides, num_anchors) = match session.outputs.len() {
            6 | 9 => (3, vec![8, 16, 32], 2),
            10 | 15 => (5, vec![8, 16, 32, 64, 128], 1),
            n => {
                warn!("Unknown face detector layout with {} outputs, assuming 3 strides", n);
                (3, vec![8, 16, 32], 2)
            }
        };

        Ok(Self {
            session,
            input_size,
            conf_threshold,
            num_anchors,
            strides,
            bbox_offset,
        })
    }

    /// Most confident face above the threshold, if any
    pub fn detect_best(&self, image: &Mat) -> Result<Option<FaceDetection>> {
        let (input_width, input_height) = self.input_size;
        let (img_width, img_height) = (image.cols(), image.rows());
        if img_width <= 0 || img_height <= 0 {
            return Ok(None);
        }

        // Letterbox: keep aspect ratio, pad right/bottom
        let ratio_img = img_height as f32 / img_width as f32;
        let ratio_model = input_height as f32 / input_width as f32;
        let (new_width, new_height) = if ratio_img > ratio_model {
            ((input_height as f32 / ratio_img) as i32, input_height)
        } else {
            (input_width, (input_width as f32 * ratio_img) as i32)
        };
        let det_scale = new_height as f32 / img_height as f32;

        let mut resized = Mat::default();
        imgproc::resize(
            image,
            &mut resized,
            Size::new(new_width, new_height),
            0.0,
            0.0,
            InterpolationFlags::INTER_LINEAR as i32,
        )?;

        let mut padded = Mat::new_rows_cols_with_default(input_height, input_width, CV_8UC3, Scalar::all(0.0))?;
        let mut roi = padded.roi_mut(Rect::new(0, 0, new_width, new_height))?;
        resized.copy_to(&mut roi)?;

        let tensor = Self::preprocess(&padded)?;
        let best = self.best_candidate(tensor)?;

        Ok(best.map(|(score, [x1, y1, x2, y2])| {
            let x1 = (x1 / det_scale).max(0.0) as i32;
            let y1 = (y1 / det_scale).max(0.0) as i32;
            let x2 = ((x2 / det_scale) as i32).min(img_width);
            let y2 = ((y2 / det_scale) as i32).min(img_height);
            debug!("Face at ({}, {})-({}, {}) score {:.2}", x1, y1, x2, y2, score);
            FaceDetection {
                bbox: Rect::new(x1, y1, (x2 - x1).max(1), (y2 - y1).max(1)),
                score,
            }
        }))
    }

    /// BGR bytes to normalized RGB NCHW floats
    fn preprocess(image: &Mat) -> Result<Array4<f32>> {
        let height = usize::try_from(image.rows()).map_err(|e| Error::InvalidInput(e.to_string()))?;
        let width = usize::try_from(image.cols()).map_err(|e| Error::InvalidInput(e.to_string()))?;
        let pixels = image.data_typed::<Vec3b>()?;

        Ok(Array4::from_shape_fn((1, 3, height, width), |(_, channel, y, x)| {
            // BGR storage, RGB tensor
            let value = pixels[y * width + x][2 - channel];
            (f32::from(value) - IMAGE_NORMALIZATION_OFFSET) / IMAGE_NORMALIZATION_SCALE
        }))
    }

    /// Highest score and its box (input-tensor pixels) across all strides
    fn best_candidate(&self, tensor: Array4<f32>) -> Result<Option<(f32, [f32; 4])>> {
        let (input_width, input_height) = self.input_size;
        let outputs = self.session.run(ort::inputs![Tensor::from_array(tensor)?]?)?;

        let mut best: Option<(f32, [f32; 4])> = None;
        for (index, &stride) in self.strides.iter().enumerate() {
            if index + self.bbox_offset >= outputs.len() {
                return Err(Error::ModelError(format!("Missing outputs for stride {stride}")));
            }

            let scores = outputs[index].try_extract_tensor::<f32>()?;
            let scores = scores
                .as_slice()
                .ok_or_else(|| Error::ModelError("Non-contiguous score output".to_string()))?;
            let distances = outputs[index + self.bbox_offset].try_extract_tensor::<f32>()?;
            let distances = distances
                .as_slice()
                .ok_or_else(|| Error::ModelError("Non-contiguous bbox output".to_string()))?;

            let grid_width = usize::try_from(input_width / stride).unwrap_or(0);
            let grid_height = usize::try_from(input_height / stride).unwrap_or(0);
            let anchors = grid_width * grid_height * self.num_anchors;

            for anchor in 0..anchors.min(scores.len()) {
                let score = scores[anchor];
                if score < self.conf_threshold || best.is_some_and(|(top, _)| top >= score) {
                    continue;
                }
                let Some(d) = distances.get(anchor * 4..anchor * 4 + 4) else {
                    break;
                };

                let cell = anchor / self.num_anchors;
                let cx = ((cell % grid_width) as i32 * stride) as f32;
                let cy = ((cell / grid_width) as i32 * stride) as f32;
                let s = stride as f32;
                best = Some((
                    score,
                    [cx - d[0] * s, cy - d[1] * s, cx + d[2] * s, cy + d[3] * s],
                ));
            }
        }

        Ok(best)
    }
}

/// Expand a face box by `shift` of its size on each side, square it and keep it inside the image
#[must_use]
pub fn refine_box(bbox: Rect, max_width: i32, max_height: i32, shift: f32) -> Rect {
    let x_shift = (bbox.width as f32 * shift) as i32;
    let y_shift = (bbox.height as f32 * shift) as i32;

    let x = (bbox.x - x_shift).max(0);
    let y = (bbox.y - y_shift).max(0);
    let width = (bbox.width + 2 * x_shift).min(max_width - x);
    let height = (bbox.height + 2 * y_shift).min(max_height - y);

    let side = width.max(height).min(max_width).min(max_height);
    let x = x.min(max_width - side).max(0);
    let y = y.min(max_height - side).max(0);

    Rect::new(x, y, side, side)
}
