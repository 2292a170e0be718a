use crate::types::{
    Frame, HandInstance, HandLandmarkIndex, Landmark, PoseLandmarkIndex, PoseLandmarks,
};

use HandLandmarkIndex::*;
use PoseLandmarkIndex::*;

/// Upper-body topology: torso box, both arms, and the wrist fan into the
/// coarse hand points of the pose model.
pub const POSE_CONNECTIONS: [(PoseLandmarkIndex, PoseLandmarkIndex); 14] = [
    // Torso
    (LeftShoulder, RightShoulder),
    (LeftShoulder, LeftHip),
    (RightShoulder, RightHip),
    (LeftHip, RightHip),
    // Arms
    (LeftShoulder, LeftElbow),
    (LeftElbow, LeftWrist),
    (RightShoulder, RightElbow),
    (RightElbow, RightWrist),
    // Wrist fan
    (LeftWrist, LeftPinky),
    (LeftWrist, LeftIndex),
    (LeftWrist, LeftThumb),
    (RightWrist, RightPinky),
    (RightWrist, RightIndex),
    (RightWrist, RightThumb),
];

/// Hand topology: four joints per finger chained from the wrist, plus the
/// knuckle bridge.
pub const HAND_CONNECTIONS: [(HandLandmarkIndex, HandLandmarkIndex); 23] = [
    // Thumb
    (Wrist, ThumbCmc),
    (ThumbCmc, ThumbMcp),
    (ThumbMcp, ThumbIp),
    (ThumbIp, ThumbTip),
    // Index
    (Wrist, IndexMcp),
    (IndexMcp, IndexPip),
    (IndexPip, IndexDip),
    (IndexDip, IndexTip),
    // Middle
    (Wrist, MiddleMcp),
    (MiddleMcp, MiddlePip),
    (MiddlePip, MiddleDip),
    (MiddleDip, MiddleTip),
    // Ring
    (Wrist, RingMcp),
    (RingMcp, RingPip),
    (RingPip, RingDip),
    (RingDip, RingTip),
    // Pinky
    (Wrist, PinkyMcp),
    (PinkyMcp, PinkyPip),
    (PinkyPip, PinkyDip),
    (PinkyDip, PinkyTip),
    // Knuckle bridge
    (IndexMcp, MiddleMcp),
    (MiddleMcp, RingMcp),
    (RingMcp, PinkyMcp),
];

/// Body edges and points below this visibility are not drawn at all;
/// a partially occluded limb is suppressed rather than drawn inaccurately.
pub const VISIBILITY_THRESHOLD: f32 = 0.5;

pub const POSE_COLOR: [u8; 3] = [0, 255, 0];
pub const HAND_COLOR: [u8; 3] = [0, 128, 255];
pub const LANDMARK_COLOR: [u8; 3] = [255, 0, 0];

const LINE_THICKNESS: i32 = 2;
const LANDMARK_RADIUS: i32 = 5;

/// Draw the body skeleton. Edges require both endpoints above the
/// visibility threshold; points are gated independently and get an outline
/// ring for legibility against arbitrary backgrounds.
pub fn draw_pose_skeleton(frame: &mut Frame, pose: &PoseLandmarks) {
    let (w, h) = (frame.width, frame.height);

    for &(a, b) in POSE_CONNECTIONS.iter() {
        let start = pose.get(a);
        let end = pose.get(b);
        if start.visibility > VISIBILITY_THRESHOLD && end.visibility > VISIBILITY_THRESHOLD {
            let p0 = start.to_pixel(w, h);
            let p1 = end.to_pixel(w, h);
            draw_line(frame, p0, p1, POSE_COLOR, LINE_THICKNESS);
        }
    }

    for point in pose.points.iter() {
        if point.visibility > VISIBILITY_THRESHOLD {
            draw_marker(frame, point, POSE_COLOR);
        }
    }
}

/// Draw every hand instance independently, in detection order. Hand
/// landmarks carry no discrete visibility, so nothing is gated here; an
/// empty slice leaves the frame untouched.
pub fn draw_hands_skeleton(frame: &mut Frame, hands: &[HandInstance]) {
    let (w, h) = (frame.width, frame.height);

    for hand in hands {
        for &(a, b) in HAND_CONNECTIONS.iter() {
            let p0 = hand.landmarks[a as usize].to_pixel(w, h);
            let p1 = hand.landmarks[b as usize].to_pixel(w, h);
            draw_line(frame, p0, p1, HAND_COLOR, LINE_THICKNESS);
        }

        for point in hand.landmarks.iter() {
            draw_marker(frame, point, HAND_COLOR);
        }
    }
}

fn draw_marker(frame: &mut Frame, point: &Landmark, ring_color: [u8; 3]) {
    let center = point.to_pixel(frame.width, frame.height);
    draw_circle(frame, center, LANDMARK_RADIUS, LANDMARK_COLOR);
    draw_ring(frame, center, LANDMARK_RADIUS + 2, ring_color);
}

/// Bresenham line with diamond-shaped thickening, clipped at the frame
/// edges.
pub fn draw_line(frame: &mut Frame, p0: (i32, i32), p1: (i32, i32), color: [u8; 3], thickness: i32) {
    let (mut x0, mut y0) = p0;
    let (x1, y1) = p1;
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let radius = (thickness.max(1) - 1) / 2;

    loop {
        put_pixel(frame, x0, y0, color);
        if radius > 0 {
            for ox in -radius..=radius {
                for oy in -radius..=radius {
                    if ox == 0 && oy == 0 {
                        continue;
                    }
                    if ox.abs() + oy.abs() <= radius {
                        put_pixel(frame, x0 + ox, y0 + oy, color);
                    }
                }
            }
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

pub fn draw_circle(frame: &mut Frame, center: (i32, i32), radius: i32, color: [u8; 3]) {
    let (cx, cy) = center;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put_pixel(frame, cx + dx, cy + dy, color);
            }
        }
    }
}

/// Two-pixel-wide circle outline.
fn draw_ring(frame: &mut Frame, center: (i32, i32), radius: i32, color: [u8; 3]) {
    let (cx, cy) = center;
    let inner = (radius - 1) * (radius - 1);
    let outer = (radius + 1) * (radius + 1);
    for dy in -radius - 1..=radius + 1 {
        for dx in -radius - 1..=radius + 1 {
            let d = dx * dx + dy * dy;
            if d >= inner && d <= outer {
                put_pixel(frame, cx + dx, cy + dy, color);
            }
        }
    }
}

pub fn put_pixel(frame: &mut Frame, x: i32, y: i32, color: [u8; 3]) {
    if x < 0 || y < 0 {
        return;
    }
    let (ux, uy) = (x as u32, y as u32);
    if ux >= frame.width || uy >= frame.height {
        return;
    }
    let idx = (uy * frame.width + ux) as usize * 3;
    frame.rgb[idx..idx + 3].copy_from_slice(&color);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HAND_LANDMARK_COUNT, Handedness, POSE_LANDMARK_COUNT};

    fn blank(width: u32, height: u32) -> Frame {
        Frame::new(width, height)
    }

    fn pose_with(points: &[(PoseLandmarkIndex, f32, f32, f32)]) -> PoseLandmarks {
        // Unlisted landmarks get zero visibility so they stay undrawn.
        let mut all = [Landmark::new(0.0, 0.0, 0.0); POSE_LANDMARK_COUNT];
        for &(idx, x, y, vis) in points {
            all[idx as usize] = Landmark::new(x, y, vis);
        }
        PoseLandmarks::new(all)
    }

    fn hand_at(x: f32, y: f32) -> HandInstance {
        HandInstance {
            landmarks: [Landmark::new(x, y, 1.0); HAND_LANDMARK_COUNT],
            handedness: Handedness::Left,
            confidence: 0.9,
        }
    }

    fn pixel(frame: &Frame, x: u32, y: u32) -> [u8; 3] {
        let idx = (y * frame.width + x) as usize * 3;
        [frame.rgb[idx], frame.rgb[idx + 1], frame.rgb[idx + 2]]
    }

    #[test]
    fn topology_indices_in_bounds() {
        for &(a, b) in POSE_CONNECTIONS.iter() {
            assert!((a as usize) < POSE_LANDMARK_COUNT);
            assert!((b as usize) < POSE_LANDMARK_COUNT);
        }
        for &(a, b) in HAND_CONNECTIONS.iter() {
            assert!((a as usize) < HAND_LANDMARK_COUNT);
            assert!((b as usize) < HAND_LANDMARK_COUNT);
        }
    }

    #[test]
    fn visible_arm_edge_is_drawn() {
        let mut frame = blank(100, 100);
        let pose = pose_with(&[
            (LeftShoulder, 0.2, 0.5, 0.9),
            (LeftElbow, 0.8, 0.5, 0.9),
        ]);
        draw_pose_skeleton(&mut frame, &pose);
        // Midpoint of the shoulder-elbow edge lies on the drawn line.
        assert_eq!(pixel(&frame, 50, 50), POSE_COLOR);
    }

    #[test]
    fn low_visibility_endpoint_suppresses_edge_but_not_other_point() {
        let mut frame = blank(100, 100);
        let pose = pose_with(&[
            (LeftShoulder, 0.2, 0.5, 0.9),
            (LeftElbow, 0.8, 0.5, 0.3),
        ]);
        draw_pose_skeleton(&mut frame, &pose);
        // No edge through the midpoint.
        assert_eq!(pixel(&frame, 50, 50), [0, 0, 0]);
        // The shoulder marker is still drawn (filled center is red).
        assert_eq!(pixel(&frame, 20, 50), LANDMARK_COLOR);
        // Nothing at the elbow.
        assert_eq!(pixel(&frame, 80, 50), [0, 0, 0]);
    }

    #[test]
    fn threshold_is_exclusive() {
        let mut frame = blank(100, 100);
        let pose = pose_with(&[
            (LeftShoulder, 0.2, 0.5, 0.5),
            (LeftElbow, 0.8, 0.5, 0.5),
        ]);
        draw_pose_skeleton(&mut frame, &pose);
        assert_eq!(frame, blank(100, 100));
    }

    #[test]
    fn empty_hand_list_is_pixel_identical_noop() {
        let mut frame = blank(64, 64);
        for (i, b) in frame.rgb.iter_mut().enumerate() {
            *b = (i % 251) as u8;
        }
        let before = frame.clone();
        draw_hands_skeleton(&mut frame, &[]);
        assert_eq!(frame, before);
    }

    #[test]
    fn hands_draw_without_visibility_gate() {
        let mut frame = blank(100, 100);
        let mut hand = hand_at(0.5, 0.5);
        for lm in hand.landmarks.iter_mut() {
            lm.visibility = 0.0;
        }
        draw_hands_skeleton(&mut frame, std::slice::from_ref(&hand));
        assert_ne!(frame, blank(100, 100));
    }

    #[test]
    fn two_hands_render_independently() {
        let left = hand_at(0.25, 0.5);
        let mut right = hand_at(0.75, 0.5);
        right.handedness = Handedness::Right;

        let mut both = blank(200, 100);
        draw_hands_skeleton(&mut both, &[left.clone(), right.clone()]);

        // Dropping one instance leaves the other's pixels unchanged.
        let mut only_left = blank(200, 100);
        draw_hands_skeleton(&mut only_left, std::slice::from_ref(&left));
        let cx = 50u32;
        let cy = 50u32;
        assert_eq!(pixel(&both, cx, cy), pixel(&only_left, cx, cy));
        assert_ne!(pixel(&only_left, cx, cy), [0, 0, 0]);

        // And the right half of the two-hand render is untouched by `left`.
        assert_eq!(pixel(&only_left, 150, 50), [0, 0, 0]);
        assert_ne!(pixel(&both, 150, 50), [0, 0, 0]);
    }

    #[test]
    fn off_canvas_points_clip_silently() {
        let mut frame = blank(32, 32);
        let hand = hand_at(2.0, 2.0);
        draw_hands_skeleton(&mut frame, std::slice::from_ref(&hand));
        // All landmarks map far off-canvas; buffer must be untouched and
        // nothing may panic.
        assert_eq!(frame, blank(32, 32));
    }

    #[test]
    fn put_pixel_clips_all_edges() {
        let mut frame = blank(8, 8);
        put_pixel(&mut frame, -1, 0, [255, 255, 255]);
        put_pixel(&mut frame, 0, -1, [255, 255, 255]);
        put_pixel(&mut frame, 8, 0, [255, 255, 255]);
        put_pixel(&mut frame, 0, 8, [255, 255, 255]);
        assert_eq!(frame, blank(8, 8));
        put_pixel(&mut frame, 7, 7, [255, 255, 255]);
        assert_eq!(pixel(&frame, 7, 7), [255, 255, 255]);
    }
}
