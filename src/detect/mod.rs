mod common;
mod hand;
mod palm;
mod pose;

pub use hand::HandLandmarker;
pub use pose::PoseLandmarker;

use anyhow::Result;

use crate::types::{Frame, HandInstance, PoseLandmarks};

/// Single-subject body-pose source. Both estimator traits are invoked once
/// per frame from the pipeline loop and must tolerate a sustained 15-30 Hz
/// call rate; a frame with nothing in it is `Ok(None)`, never an error.
pub trait PoseEstimator {
    fn detect(&mut self, frame: &Frame) -> Result<Option<PoseLandmarks>>;
}

/// Multi-subject hand source, zero to two instances per frame in detector
/// order. Absence is an empty vec.
pub trait HandEstimator {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<HandInstance>>;
}
