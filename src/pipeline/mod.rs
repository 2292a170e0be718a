pub mod font;
pub mod overlay;
pub mod skeleton;

use std::collections::VecDeque;
use std::time::Instant;

use anyhow::Result;

use crate::detect::{HandEstimator, PoseEstimator};
use crate::types::Frame;

pub use overlay::DetectionStatus;

/// Per-frame snapshot of the feature toggles, taken once at the top of an
/// iteration so a toggle never changes behavior mid-frame.
#[derive(Clone, Copy, Debug)]
pub struct RenderToggles {
    pub pose: bool,
    pub hands: bool,
    pub mirror: bool,
    pub legend: bool,
}

/// Orchestrates one active frame: mirror, detection, skeleton compositing,
/// HUD. Detector calls are blocking; a stalled detector stalls the frame.
pub struct FramePipeline {
    pose: Box<dyn PoseEstimator>,
    hands: Box<dyn HandEstimator>,
}

impl FramePipeline {
    pub fn new(pose: Box<dyn PoseEstimator>, hands: Box<dyn HandEstimator>) -> Self {
        Self { pose, hands }
    }

    /// Process an active (non-paused) frame in place and report what was
    /// detected. Absent detections are normal results, not errors; only
    /// detector failures propagate.
    pub fn process(
        &mut self,
        frame: &mut Frame,
        toggles: RenderToggles,
        fps: f32,
    ) -> Result<DetectionStatus> {
        // The flip happens upstream of detection so landmark coordinates
        // are computed in the same orientation the viewer sees.
        if toggles.mirror {
            frame.mirror_horizontal();
        }

        let pose = if toggles.pose {
            self.pose.detect(frame)?
        } else {
            None
        };
        let hands = if toggles.hands {
            self.hands.detect(frame)?
        } else {
            Vec::new()
        };

        if let Some(pose) = pose.as_ref() {
            log::trace!("pose mean visibility {:.2}", pose.average_visibility());
        }
        for hand in &hands {
            log::trace!(
                "{} hand, confidence {:.2}",
                hand.handedness.label(),
                hand.confidence
            );
        }

        // Body behind, hands in front.
        if let Some(pose) = pose.as_ref() {
            skeleton::draw_pose_skeleton(frame, pose);
        }
        skeleton::draw_hands_skeleton(frame, &hands);

        let status = DetectionStatus {
            pose_detected: pose.is_some(),
            hands_detected: hands.len(),
        };
        overlay::draw_overlay(frame, fps, status, toggles.legend);
        Ok(status)
    }
}

/// Instantaneous FPS from consecutive frame timestamps, with a bounded
/// FIFO history kept only for the shutdown mean.
pub const FPS_HISTORY_CAPACITY: usize = 30;

#[derive(Debug, Default)]
pub struct FpsSampler {
    prev: Option<Instant>,
    current: f32,
    history: VecDeque<f32>,
}

impl FpsSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one frame boundary. The very first call has no previous
    /// timestamp and leaves the reading at 0.0.
    pub fn sample(&mut self, now: Instant) -> f32 {
        if let Some(prev) = self.prev {
            let dt = now.duration_since(prev).as_secs_f32();
            if dt > 0.0 {
                self.current = 1.0 / dt;
                if self.history.len() == FPS_HISTORY_CAPACITY {
                    self.history.pop_front();
                }
                self.history.push_back(self.current);
            }
        }
        self.prev = Some(now);
        self.current
    }

    /// Latest instantaneous sample, 0.0 before the first interval.
    pub fn current(&self) -> f32 {
        self.current
    }

    /// Mean over the retained history, for the shutdown summary.
    pub fn mean(&self) -> Option<f32> {
        if self.history.is_empty() {
            return None;
        }
        Some(self.history.iter().sum::<f32>() / self.history.len() as f32)
    }

    #[cfg(test)]
    fn history_len(&self) -> usize {
        self.history.len()
    }

    #[cfg(test)]
    fn oldest(&self) -> Option<f32> {
        self.history.front().copied()
    }
}
