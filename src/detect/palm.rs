use std::cmp::Ordering;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;

use super::common::{self, Letterbox, sigmoid, to_normalized};
use crate::types::Frame;

const INPUT_SIZE: u32 = 192;
/// cx, cy, w, h plus seven palm keypoint pairs per anchor.
const BOX_FEATURES: usize = 18;
const SCORE_THRESHOLD: f32 = 0.5;
const NMS_THRESHOLD: f32 = 0.3;

/// Anchor grid of the 192x192 palm model: two boxes per cell on the 24x24
/// feature map, six on the 12x12.
pub const NUM_ANCHORS: usize = 24 * 24 * 2 + 12 * 12 * 6;

/// One palm proposal, box corners in normalized frame coordinates.
#[derive(Clone, Debug)]
pub struct PalmRegion {
    pub bbox: [f32; 4],
    pub score: f32,
}

/// Region-proposal stage ahead of the hand landmark model. Each surviving
/// region is cropped out of the frame and landmarked separately, which is
/// what allows more than one hand per frame.
pub struct PalmDetector {
    session: Session,
    anchors: Vec<(f32, f32)>,
}

impl PalmDetector {
    pub fn new(model_path: &Path) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(2)?
            .commit_from_file(model_path)
            .with_context(|| format!("failed to load ORT session from {}", model_path.display()))?;
        log::info!("palm detector ready using {}", model_path.display());
        Ok(Self {
            session,
            anchors: anchor_centers(),
        })
    }

    /// Non-overlapping palm proposals ordered by descending score. An empty
    /// result is a normal no-hands frame.
    pub fn detect(&mut self, frame: &Frame, max_regions: usize) -> Result<Vec<PalmRegion>> {
        let (input, letterbox) = common::prepare_frame(frame, INPUT_SIZE)?;
        let tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .context("failed to run palm detector session")?;

        if outputs.len() < 2 {
            return Err(anyhow!(
                "palm detector returned {} outputs, expected at least 2",
                outputs.len()
            ));
        }

        let boxes = outputs[0].try_extract_array::<f32>()?;
        let scores = outputs[1].try_extract_array::<f32>()?;
        let boxes: Vec<f32> = boxes.iter().copied().collect();
        let scores: Vec<f32> = scores.iter().copied().collect();

        Ok(decode_regions(
            &boxes,
            &scores,
            &self.anchors,
            &letterbox,
            max_regions,
        ))
    }
}

/// SSD anchor centers in normalized model coordinates, generated in the
/// model's output order.
fn anchor_centers() -> Vec<(f32, f32)> {
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);
    for &(boxes_per_cell, cells) in &[(2usize, 24usize), (6, 12)] {
        for y in 0..cells {
            for x in 0..cells {
                let cx = (x as f32 + 0.5) / cells as f32;
                let cy = (y as f32 + 0.5) / cells as f32;
                for _ in 0..boxes_per_cell {
                    anchors.push((cx, cy));
                }
            }
        }
    }
    anchors
}

/// Turn raw anchor-relative boxes into scored regions, suppress overlaps,
/// and keep at most `max_regions` of the highest-scoring survivors.
fn decode_regions(
    boxes: &[f32],
    scores: &[f32],
    anchors: &[(f32, f32)],
    letterbox: &Letterbox,
    max_regions: usize,
) -> Vec<PalmRegion> {
    let side = INPUT_SIZE as f32;

    let mut candidates = Vec::new();
    for (idx, &(ax, ay)) in anchors.iter().enumerate() {
        let Some(&raw_score) = scores.get(idx) else {
            break;
        };
        let score = sigmoid(raw_score);
        if score < SCORE_THRESHOLD {
            continue;
        }

        let offset = idx * BOX_FEATURES;
        let Some(row) = boxes.get(offset..offset + 4) else {
            break;
        };
        // Box deltas are in model pixels relative to the anchor center.
        let cx = row[0] + ax * side;
        let cy = row[1] + ay * side;
        let (w, h) = (row[2], row[3]);
        if w <= 0.0 || h <= 0.0 {
            continue;
        }

        let (x1, y1) = to_normalized(cx - w / 2.0, cy - h / 2.0, letterbox);
        let (x2, y2) = to_normalized(cx + w / 2.0, cy + h / 2.0, letterbox);
        candidates.push(PalmRegion {
            bbox: [x1, y1, x2, y2],
            score,
        });
    }

    let kept = nms(&candidates, NMS_THRESHOLD, max_regions);
    kept.into_iter()
        .filter_map(|idx| candidates.get(idx).cloned())
        .collect()
}

fn nms(candidates: &[PalmRegion], threshold: f32, top_k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|a, b| {
        candidates[*b]
            .score
            .partial_cmp(&candidates[*a].score)
            .unwrap_or(Ordering::Equal)
    });

    let mut keep: Vec<usize> = Vec::new();
    'outer: for &idx in &order {
        for &k in &keep {
            if iou(&candidates[idx].bbox, &candidates[k].bbox) >= threshold {
                continue 'outer;
            }
        }
        keep.push(idx);
        if keep.len() >= top_k {
            break;
        }
    }
    keep
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter <= 0.0 {
        return 0.0;
    }

    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union = area_a + area_b - inter;
    if union <= 0.0 { 0.0 } else { inter / union }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_letterbox(size: u32) -> Letterbox {
        Letterbox {
            scale: INPUT_SIZE as f32 / size as f32,
            pad_x: 0.0,
            pad_y: 0.0,
            orig_w: size,
            orig_h: size,
        }
    }

    fn region(x1: f32, y1: f32, x2: f32, y2: f32, score: f32) -> PalmRegion {
        PalmRegion {
            bbox: [x1, y1, x2, y2],
            score,
        }
    }

    #[test]
    fn anchor_grid_matches_model_output() {
        let anchors = anchor_centers();
        assert_eq!(anchors.len(), NUM_ANCHORS);
        // First cell of the 24x24 map, both boxes at its center.
        assert_eq!(anchors[0], (0.5 / 24.0, 0.5 / 24.0));
        assert_eq!(anchors[1], anchors[0]);
        assert!(
            anchors
                .iter()
                .all(|&(x, y)| x > 0.0 && x < 1.0 && y > 0.0 && y < 1.0)
        );
    }

    #[test]
    fn decode_yields_two_separated_palms() {
        let anchors = anchor_centers();
        let mut scores = vec![-20.0f32; NUM_ANCHORS];
        let mut boxes = vec![0.0f32; NUM_ANCHORS * BOX_FEATURES];

        // Two anchors far apart on the 24x24 map, both confidently scored.
        let left = 0; // near the top-left corner
        let right = 2 * 23; // last cell of the first row
        for &idx in &[left, right] {
            scores[idx] = 10.0;
            boxes[idx * BOX_FEATURES + 2] = 40.0;
            boxes[idx * BOX_FEATURES + 3] = 40.0;
        }

        let regions = decode_regions(&boxes, &scores, &anchors, &square_letterbox(192), 2);
        assert_eq!(regions.len(), 2);
        // Distinct horizontal positions, one per palm.
        let mut centers: Vec<f32> = regions
            .iter()
            .map(|r| (r.bbox[0] + r.bbox[2]) / 2.0)
            .collect();
        centers.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!(centers[0] < 0.2);
        assert!(centers[1] > 0.8);
    }

    #[test]
    fn decode_respects_region_cap() {
        let anchors = anchor_centers();
        let mut scores = vec![-20.0f32; NUM_ANCHORS];
        let mut boxes = vec![0.0f32; NUM_ANCHORS * BOX_FEATURES];

        // Three disjoint proposals on different rows.
        for &idx in &[0usize, 2 * 24 * 10, 2 * 24 * 20] {
            scores[idx] = 10.0;
            boxes[idx * BOX_FEATURES + 2] = 30.0;
            boxes[idx * BOX_FEATURES + 3] = 30.0;
        }

        let regions = decode_regions(&boxes, &scores, &anchors, &square_letterbox(192), 2);
        assert_eq!(regions.len(), 2);
    }

    #[test]
    fn decode_ignores_low_scores() {
        let anchors = anchor_centers();
        let scores = vec![-20.0f32; NUM_ANCHORS];
        let boxes = vec![0.0f32; NUM_ANCHORS * BOX_FEATURES];
        let regions = decode_regions(&boxes, &scores, &anchors, &square_letterbox(192), 2);
        assert!(regions.is_empty());
    }

    #[test]
    fn nms_suppresses_overlapping_boxes() {
        let candidates = vec![
            region(0.1, 0.1, 0.4, 0.4, 0.9),
            region(0.12, 0.12, 0.42, 0.42, 0.8),
            region(0.6, 0.6, 0.9, 0.9, 0.7),
        ];
        let kept = nms(&candidates, 0.3, 4);
        assert_eq!(kept, vec![0, 2]);
    }

    #[test]
    fn iou_of_disjoint_boxes_is_zero() {
        assert_eq!(iou(&[0.0, 0.0, 0.2, 0.2], &[0.5, 0.5, 0.9, 0.9]), 0.0);
        let same = [0.1, 0.1, 0.4, 0.4];
        assert!((iou(&same, &same) - 1.0).abs() < 1e-6);
    }
}
