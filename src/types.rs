pub const POSE_LANDMARK_COUNT: usize = 33;
pub const HAND_LANDMARK_COUNT: usize = 21;

/// RGB8 pixel buffer, `width * height * 3` bytes, row-major.
///
/// All rendering stages mutate the buffer in place; the draw order is
/// video -> body skeleton -> hand skeletons -> HUD.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub rgb: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            rgb: vec![0u8; width as usize * height as usize * 3],
            width,
            height,
        }
    }

    pub fn from_rgb(rgb: Vec<u8>, width: u32, height: u32) -> Option<Self> {
        if rgb.len() != width as usize * height as usize * 3 {
            return None;
        }
        Some(Self { rgb, width, height })
    }

    /// Copy out a sub-rectangle. `None` when the rectangle is empty or
    /// reaches past the frame.
    pub fn crop(&self, x: u32, y: u32, w: u32, h: u32) -> Option<Frame> {
        if w == 0 || h == 0 {
            return None;
        }
        let x_end = x.checked_add(w)?;
        let y_end = y.checked_add(h)?;
        if x_end > self.width || y_end > self.height {
            return None;
        }

        let mut rgb = Vec::with_capacity(w as usize * h as usize * 3);
        for row in y..y_end {
            let start = (row * self.width + x) as usize * 3;
            rgb.extend_from_slice(&self.rgb[start..start + w as usize * 3]);
        }
        Some(Frame {
            rgb,
            width: w,
            height: h,
        })
    }

    /// Horizontal flip in place. Applied before detection when mirror mode
    /// is on so the rendered landmarks stay geometrically consistent with
    /// the mirrored video.
    pub fn mirror_horizontal(&mut self) {
        let w = self.width as usize;
        for row in self.rgb.chunks_exact_mut(w * 3) {
            let (mut left, mut right) = (0usize, w.saturating_sub(1));
            while left < right {
                for c in 0..3 {
                    row.swap(left * 3 + c, right * 3 + c);
                }
                left += 1;
                right -= 1;
            }
        }
    }
}

/// A detected anatomical point in normalized frame coordinates.
///
/// `x`/`y` are relative to frame width/height and may fall slightly outside
/// [0, 1] when the point is just off-frame. `visibility` is 1.0 for sources
/// that have no such concept (hand landmarks).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub visibility: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, visibility: f32) -> Self {
        Self { x, y, visibility }
    }

    /// Map to integer pixel coordinates. Pure; out-of-range input simply
    /// yields off-canvas pixels that the draw primitives clip.
    pub fn to_pixel(&self, width: u32, height: u32) -> (i32, i32) {
        let px = (self.x * width as f32).round() as i32;
        let py = (self.y * height as f32).round() as i32;
        (px, py)
    }
}

impl Default for Landmark {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            visibility: 1.0,
        }
    }
}

/// The fixed 33-point body landmark set. Index position is the join key
/// against `POSE_CONNECTIONS`; index meaning never changes.
#[derive(Clone, Debug, PartialEq)]
pub struct PoseLandmarks {
    pub points: [Landmark; POSE_LANDMARK_COUNT],
}

impl PoseLandmarks {
    pub fn new(points: [Landmark; POSE_LANDMARK_COUNT]) -> Self {
        Self { points }
    }

    pub fn get(&self, index: PoseLandmarkIndex) -> &Landmark {
        &self.points[index as usize]
    }

    pub fn average_visibility(&self) -> f32 {
        let sum: f32 = self.points.iter().map(|p| p.visibility).sum();
        sum / POSE_LANDMARK_COUNT as f32
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn label(&self) -> &'static str {
        match self {
            Handedness::Left => "Left",
            Handedness::Right => "Right",
        }
    }
}

/// One detected hand: 21 landmarks plus the detector's side label and
/// confidence. Instance identity is positional within a frame; no
/// cross-frame tracking is implied.
#[derive(Clone, Debug, PartialEq)]
pub struct HandInstance {
    pub landmarks: [Landmark; HAND_LANDMARK_COUNT],
    pub handedness: Handedness,
    pub confidence: f32,
}

/// MediaPipe body landmark indices. The topology table is written in terms
/// of these rather than bare numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum PoseLandmarkIndex {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

/// Hand landmark indices, wrist plus four joints per finger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum HandLandmarkIndex {
    Wrist = 0,
    ThumbCmc = 1,
    ThumbMcp = 2,
    ThumbIp = 3,
    ThumbTip = 4,
    IndexMcp = 5,
    IndexPip = 6,
    IndexDip = 7,
    IndexTip = 8,
    MiddleMcp = 9,
    MiddlePip = 10,
    MiddleDip = 11,
    MiddleTip = 12,
    RingMcp = 13,
    RingPip = 14,
    RingDip = 15,
    RingTip = 16,
    PinkyMcp = 17,
    PinkyPip = 18,
    PinkyDip = 19,
    PinkyTip = 20,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_pixel_rounds_to_nearest() {
        let lm = Landmark::new(0.5, 0.25, 1.0);
        assert_eq!(lm.to_pixel(640, 480), (320, 120));

        // 0.499 * 100 = 49.9 rounds up rather than truncating.
        let lm = Landmark::new(0.499, 0.0, 1.0);
        assert_eq!(lm.to_pixel(100, 100).0, 50);
    }

    #[test]
    fn to_pixel_allows_off_canvas() {
        let lm = Landmark::new(-0.1, 1.2, 1.0);
        let (px, py) = lm.to_pixel(100, 100);
        assert_eq!(px, -10);
        assert_eq!(py, 120);
    }

    #[test]
    fn mirror_horizontal_swaps_rows() {
        let mut frame = Frame::new(3, 1);
        frame.rgb = vec![1, 1, 1, 2, 2, 2, 3, 3, 3];
        frame.mirror_horizontal();
        assert_eq!(frame.rgb, vec![3, 3, 3, 2, 2, 2, 1, 1, 1]);
    }

    #[test]
    fn mirror_horizontal_twice_is_identity() {
        let mut frame = Frame::new(4, 2);
        for (i, b) in frame.rgb.iter_mut().enumerate() {
            *b = i as u8;
        }
        let original = frame.clone();
        frame.mirror_horizontal();
        assert_ne!(frame, original);
        frame.mirror_horizontal();
        assert_eq!(frame, original);
    }

    #[test]
    fn crop_copies_the_rectangle() {
        let mut frame = Frame::new(4, 3);
        for (i, b) in frame.rgb.iter_mut().enumerate() {
            *b = i as u8;
        }
        let crop = frame.crop(1, 1, 2, 2).unwrap();
        assert_eq!(crop.width, 2);
        assert_eq!(crop.height, 2);
        // Row 1 starts at byte 12; pixel (1,1) at byte 15.
        assert_eq!(&crop.rgb[..6], &frame.rgb[15..21]);
        assert_eq!(&crop.rgb[6..], &frame.rgb[27..33]);
    }

    #[test]
    fn crop_rejects_out_of_bounds() {
        let frame = Frame::new(4, 3);
        assert!(frame.crop(3, 0, 2, 1).is_none());
        assert!(frame.crop(0, 0, 0, 1).is_none());
        assert!(frame.crop(0, 2, 4, 2).is_none());
    }

    #[test]
    fn from_rgb_rejects_wrong_length() {
        assert!(Frame::from_rgb(vec![0u8; 11], 2, 2).is_none());
        assert!(Frame::from_rgb(vec![0u8; 12], 2, 2).is_some());
    }

    #[test]
    fn pose_get_by_index() {
        let mut points = [Landmark::default(); POSE_LANDMARK_COUNT];
        points[PoseLandmarkIndex::LeftShoulder as usize] = Landmark::new(0.4, 0.3, 0.9);
        let pose = PoseLandmarks::new(points);
        let shoulder = pose.get(PoseLandmarkIndex::LeftShoulder);
        assert_eq!(shoulder.x, 0.4);
        assert_eq!(shoulder.visibility, 0.9);
    }
}
