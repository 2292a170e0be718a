use std::path::Path;

use anyhow::{Context, Result, anyhow};
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;

use super::common::{self, decode_landmark_rows, sigmoid, to_normalized};
use super::PoseEstimator;
use crate::types::{Frame, Landmark, POSE_LANDMARK_COUNT, PoseLandmarks};

const INPUT_SIZE: u32 = 256;
/// x, y, z, visibility, presence per landmark.
const LANDMARK_STRIDE: usize = 5;
/// Below this pose score the whole set is treated as absent.
const MIN_POSE_SCORE: f32 = 0.5;

/// ONNX body-landmark estimator, one subject, 33 points with visibility.
pub struct PoseLandmarker {
    session: Session,
}

impl PoseLandmarker {
    pub fn new(model_path: &Path) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(2)?
            .commit_from_file(model_path)
            .with_context(|| format!("failed to load ORT session from {}", model_path.display()))?;
        log::info!("pose landmarker ready using {}", model_path.display());
        Ok(Self { session })
    }
}

impl PoseEstimator for PoseLandmarker {
    fn detect(&mut self, frame: &Frame) -> Result<Option<PoseLandmarks>> {
        let (input, letterbox) = common::prepare_frame(frame, INPUT_SIZE)?;
        let tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .context("failed to run pose landmark session")?;

        if outputs.len() < 1 {
            return Err(anyhow!("pose model returned no outputs"));
        }

        // Second output, when present, is the pose presence score; an
        // absent subject is an expected per-frame condition.
        if outputs.len() > 1 {
            let score = outputs[1]
                .try_extract_array::<f32>()
                .ok()
                .and_then(|arr| arr.iter().next().copied())
                .unwrap_or(1.0);
            if score < MIN_POSE_SCORE {
                return Ok(None);
            }
        }

        let coords = outputs[0].try_extract_array::<f32>()?;
        let flat: Vec<f32> = coords.iter().copied().collect();
        let rows = decode_landmark_rows(&flat, POSE_LANDMARK_COUNT, LANDMARK_STRIDE)?;

        let mut points = [Landmark::default(); POSE_LANDMARK_COUNT];
        for (point, row) in points.iter_mut().zip(rows) {
            let (x, y) = to_normalized(row[0], row[1], &letterbox);
            // Raw visibility is a logit.
            *point = Landmark::new(x, y, sigmoid(row[3]));
        }

        Ok(Some(PoseLandmarks::new(points)))
    }
}
