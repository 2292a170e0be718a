use crate::types::Frame;

use super::font::{self, draw_text};

const TEXT_COLOR: [u8; 3] = [255, 255, 255];
const POSITIVE_COLOR: [u8; 3] = [0, 255, 0];
const NEGATIVE_COLOR: [u8; 3] = [255, 64, 64];
const BANNER_COLOR: [u8; 3] = [255, 0, 0];

const MARGIN: i32 = 10;
const HUD_SCALE: usize = 2;
const LEGEND_SCALE: usize = 1;

pub const LEGEND_LINES: [&str; 7] = [
    "CONTROLS:",
    "ESC/Q - QUIT",
    "S - SCREENSHOT",
    "P - PAUSE",
    "H - TOGGLE HANDS",
    "B - TOGGLE POSE",
    "M - TOGGLE MIRROR",
];

/// Per-frame detection summary consumed by the HUD.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DetectionStatus {
    pub pose_detected: bool,
    pub hands_detected: usize,
}

/// Draw the full HUD: FPS top-left, detection status bottom-left, control
/// legend top-right. Always the last stage so it stays topmost regardless
/// of other toggles.
pub fn draw_overlay(frame: &mut Frame, fps: f32, status: DetectionStatus, show_legend: bool) {
    draw_fps(frame, fps);
    draw_detection_status(frame, status);
    if show_legend {
        draw_legend(frame);
    }
}

fn draw_fps(frame: &mut Frame, fps: f32) {
    let text = format!("FPS: {fps:.1}");
    let w = font::text_width(&text, HUD_SCALE) as i32;
    let h = font::line_height(HUD_SCALE) as i32;
    darken_rect(frame, MARGIN - 4, MARGIN - 4, w + 8, h + 8);
    draw_text(frame, MARGIN, MARGIN, &text, TEXT_COLOR, HUD_SCALE);
}

fn draw_detection_status(frame: &mut Frame, status: DetectionStatus) {
    let line = font::line_height(HUD_SCALE) as i32;
    let y0 = frame.height as i32 - 2 * line - MARGIN;

    let widest = font::text_width("POSE: OK", HUD_SCALE).max(font::text_width("HANDS: 0", HUD_SCALE));
    darken_rect(frame, MARGIN - 4, y0 - 4, widest as i32 + 8, 2 * line + 8);

    let (pose_text, pose_color) = if status.pose_detected {
        ("POSE: OK", POSITIVE_COLOR)
    } else {
        ("POSE: --", NEGATIVE_COLOR)
    };
    draw_text(frame, MARGIN, y0, pose_text, pose_color, HUD_SCALE);

    let hands_color = if status.hands_detected > 0 {
        POSITIVE_COLOR
    } else {
        NEGATIVE_COLOR
    };
    let hands_text = format!("HANDS: {}", status.hands_detected);
    draw_text(frame, MARGIN, y0 + line, &hands_text, hands_color, HUD_SCALE);
}

fn draw_legend(frame: &mut Frame) {
    let line = font::line_height(LEGEND_SCALE) as i32;
    let widest = LEGEND_LINES
        .iter()
        .map(|l| font::text_width(l, LEGEND_SCALE))
        .max()
        .unwrap_or(0) as i32;
    let x = frame.width as i32 - widest - MARGIN;
    darken_rect(
        frame,
        x - 4,
        MARGIN - 4,
        widest + 8,
        LEGEND_LINES.len() as i32 * line + 8,
    );

    let mut y = MARGIN;
    for text in LEGEND_LINES.iter() {
        draw_text(frame, x, y, text, TEXT_COLOR, LEGEND_SCALE);
        y += line;
    }
}

/// Centered banner shown instead of the skeleton layers while paused.
pub fn draw_paused_banner(frame: &mut Frame) {
    let text = "PAUSED - PRESS P TO RESUME";
    let scale = 2;
    let w = font::text_width(text, scale) as i32;
    let h = font::line_height(scale) as i32;
    let x = (frame.width as i32 - w) / 2;
    let y = frame.height as i32 / 2 - h / 2;
    darken_rect(frame, x - 8, y - 8, w + 16, h + 16);
    draw_text(frame, x, y, text, BANNER_COLOR, scale);
}

/// Halve the underlying pixels to give text a translucent dark backing.
fn darken_rect(frame: &mut Frame, x: i32, y: i32, w: i32, h: i32) {
    let x0 = x.max(0) as u32;
    let y0 = y.max(0) as u32;
    let x1 = ((x + w).max(0) as u32).min(frame.width);
    let y1 = ((y + h).max(0) as u32).min(frame.height);
    for py in y0..y1 {
        for px in x0..x1 {
            let idx = (py * frame.width + px) as usize * 3;
            for c in 0..3 {
                frame.rgb[idx + c] /= 2;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noisy_frame(width: u32, height: u32) -> Frame {
        let mut frame = Frame::new(width, height);
        for (i, b) in frame.rgb.iter_mut().enumerate() {
            *b = (i % 200) as u8 + 55;
        }
        frame
    }

    #[test]
    fn overlay_touches_corners_not_center() {
        let mut frame = noisy_frame(320, 240);
        let before = frame.clone();
        draw_overlay(
            &mut frame,
            24.5,
            DetectionStatus {
                pose_detected: true,
                hands_detected: 2,
            },
            true,
        );
        assert_ne!(frame, before);
        // The exact center carries no HUD element.
        let idx = (120 * 320 + 160) * 3;
        assert_eq!(frame.rgb[idx..idx + 3], before.rgb[idx..idx + 3]);
    }

    #[test]
    fn overlay_without_legend_leaves_top_right_alone() {
        let mut frame = noisy_frame(320, 240);
        let before = frame.clone();
        draw_overlay(&mut frame, 0.0, DetectionStatus::default(), false);
        let idx = (10 * 320 + 310) * 3;
        assert_eq!(frame.rgb[idx..idx + 3], before.rgb[idx..idx + 3]);
    }

    #[test]
    fn paused_banner_marks_center() {
        let mut frame = noisy_frame(320, 240);
        let before = frame.clone();
        draw_paused_banner(&mut frame);
        let idx = (120 * 320 + 160) * 3;
        assert_ne!(frame.rgb[idx..idx + 3], before.rgb[idx..idx + 3]);
    }

    #[test]
    fn darken_rect_clips_out_of_bounds() {
        let mut frame = noisy_frame(16, 16);
        darken_rect(&mut frame, -100, -100, 1000, 1000);
        // Whole frame darkened, no panic.
        assert!(frame.rgb.iter().all(|&b| b <= 127));
    }

    #[test]
    fn small_frames_do_not_panic() {
        let mut frame = Frame::new(20, 10);
        draw_overlay(&mut frame, 999.9, DetectionStatus::default(), true);
        draw_paused_banner(&mut frame);
    }
}
