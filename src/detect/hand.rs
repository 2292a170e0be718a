use std::path::Path;

use anyhow::{Context, Result, anyhow};
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;

use super::HandEstimator;
use super::common::{self, decode_landmark_rows, to_normalized};
use super::palm::{PalmDetector, PalmRegion};
use crate::types::{Frame, HAND_LANDMARK_COUNT, HandInstance, Handedness, Landmark};

const INPUT_SIZE: u32 = 224;
/// x, y, z per landmark.
const LANDMARK_STRIDE: usize = 3;
pub const MAX_HANDS: usize = 2;
/// Palm boxes cover the palm only; the crop is widened so extended fingers
/// stay inside it.
const CROP_EXPANSION: f32 = 2.4;

/// Pixel rectangle a crop was taken from, for mapping crop-space landmarks
/// back onto the full frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct CropRect {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

/// Two-stage hand estimator: a palm detector proposes up to two regions,
/// then the landmark model runs once per cropped region. Instances below
/// the configured confidence are dropped entirely, never surfaced
/// partially.
pub struct HandLandmarker {
    palm: PalmDetector,
    session: Session,
    min_confidence: f32,
}

impl HandLandmarker {
    pub fn new(palm_model: &Path, landmark_model: &Path, min_confidence: f32) -> Result<Self> {
        let palm = PalmDetector::new(palm_model)?;
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(2)?
            .commit_from_file(landmark_model)
            .with_context(|| {
                format!("failed to load ORT session from {}", landmark_model.display())
            })?;
        log::info!("hand landmarker ready using {}", landmark_model.display());
        Ok(Self {
            palm,
            session,
            min_confidence,
        })
    }

    /// Landmark one cropped region. `None` when the landmark model is not
    /// confident a hand is actually in the crop.
    fn landmark_crop(
        &mut self,
        crop: &Frame,
        rect: CropRect,
        frame_size: (u32, u32),
    ) -> Result<Option<HandInstance>> {
        let (input, letterbox) = common::prepare_frame(crop, INPUT_SIZE)?;
        let tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .context("failed to run hand landmark session")?;

        if outputs.len() == 0 {
            return Err(anyhow!("hand model returned no outputs"));
        }

        let confidence = if outputs.len() > 1 {
            outputs[1]
                .try_extract_array::<f32>()
                .ok()
                .and_then(|arr| arr.iter().next().copied())
                .unwrap_or(0.0)
        } else {
            0.0
        };
        if confidence < self.min_confidence {
            return Ok(None);
        }

        let handedness_score = if outputs.len() > 2 {
            outputs[2]
                .try_extract_array::<f32>()
                .ok()
                .and_then(|arr| arr.iter().next().copied())
                .unwrap_or(0.0)
        } else {
            0.0
        };

        let coords = outputs[0].try_extract_array::<f32>()?;
        let flat: Vec<f32> = coords.iter().copied().collect();
        let rows = decode_landmark_rows(&flat, HAND_LANDMARK_COUNT, LANDMARK_STRIDE)?;

        let mut landmarks = [Landmark::default(); HAND_LANDMARK_COUNT];
        for (point, row) in landmarks.iter_mut().zip(rows) {
            let (cx, cy) = to_normalized(row[0], row[1], &letterbox);
            let (x, y) = crop_to_frame(cx, cy, rect, frame_size);
            // Hand landmarks carry no per-point visibility.
            *point = Landmark::new(x, y, 1.0);
        }

        Ok(Some(HandInstance {
            landmarks,
            handedness: if handedness_score >= 0.5 {
                Handedness::Right
            } else {
                Handedness::Left
            },
            confidence: confidence.clamp(0.0, 1.0),
        }))
    }
}

impl HandEstimator for HandLandmarker {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<HandInstance>> {
        let regions = self.palm.detect(frame, MAX_HANDS)?;

        let mut instances = Vec::new();
        for region in &regions {
            let Some(rect) = crop_rect(region, frame.width, frame.height) else {
                continue;
            };
            let Some(crop) = frame.crop(rect.x, rect.y, rect.w, rect.h) else {
                continue;
            };
            if let Some(instance) =
                self.landmark_crop(&crop, rect, (frame.width, frame.height))?
            {
                instances.push(instance);
            }
        }
        Ok(instances)
    }
}

/// Square crop rectangle around a palm region, widened by `CROP_EXPANSION`
/// and clamped to the frame.
fn crop_rect(region: &PalmRegion, frame_w: u32, frame_h: u32) -> Option<CropRect> {
    let fw = frame_w as f32;
    let fh = frame_h as f32;

    let cx = (region.bbox[0] + region.bbox[2]) * 0.5 * fw;
    let cy = (region.bbox[1] + region.bbox[3]) * 0.5 * fh;
    let bw = (region.bbox[2] - region.bbox[0]).abs() * fw;
    let bh = (region.bbox[3] - region.bbox[1]).abs() * fh;
    let side = (bw.max(bh) * CROP_EXPANSION).max(1.0);

    let x0 = (cx - side * 0.5).round().max(0.0) as u32;
    let y0 = (cy - side * 0.5).round().max(0.0) as u32;
    let x1 = ((cx + side * 0.5).round() as i64).clamp(0, frame_w as i64) as u32;
    let y1 = ((cy + side * 0.5).round() as i64).clamp(0, frame_h as i64) as u32;
    if x1 <= x0 || y1 <= y0 || x0 >= frame_w || y0 >= frame_h {
        return None;
    }

    Some(CropRect {
        x: x0,
        y: y0,
        w: x1 - x0,
        h: y1 - y0,
    })
}

/// Map a point normalized within a crop back to coordinates normalized
/// within the full frame.
fn crop_to_frame(cx: f32, cy: f32, rect: CropRect, frame_size: (u32, u32)) -> (f32, f32) {
    let (frame_w, frame_h) = frame_size;
    let x = (rect.x as f32 + cx * rect.w as f32) / frame_w as f32;
    let y = (rect.y as f32 + cy * rect.h as f32) / frame_h as f32;
    (x, y)
}
