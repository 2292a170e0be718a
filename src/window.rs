use anyhow::Result;
use minifb::{Key, KeyRepeat, Window, WindowOptions};

use crate::app::ControlEvent;
use crate::types::Frame;

const TARGET_FPS: usize = 60;

/// Display window plus key-event polling. Presenting a frame converts the
/// RGB buffer into minifb's packed 0RGB format; frames smaller or larger
/// than the window are cropped/padded rather than scaled.
pub struct DisplayWindow {
    window: Window,
    buffer: Vec<u32>,
    width: usize,
    height: usize,
}

impl DisplayWindow {
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self> {
        let mut window = Window::new(
            title,
            width,
            height,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )?;
        window.set_target_fps(TARGET_FPS);

        Ok(Self {
            window,
            buffer: vec![0u32; width * height],
            width,
            height,
        })
    }

    /// False once the user closes the window; treated as a quit event.
    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    pub fn present(&mut self, frame: &Frame) -> Result<()> {
        pack_frame(frame, &mut self.buffer, self.width, self.height);
        self.window
            .update_with_buffer(&self.buffer, self.width, self.height)?;
        Ok(())
    }

    /// Non-blocking poll; at most one control event per loop iteration.
    pub fn poll_event(&self) -> Option<ControlEvent> {
        self.window
            .get_keys_pressed(KeyRepeat::No)
            .into_iter()
            .find_map(map_key)
    }
}

/// Convert an RGB frame into the packed 0RGB window buffer. A frame that
/// does not cover the whole window gets the uncovered remainder cleared so
/// no pixels from an earlier, larger frame linger there.
fn pack_frame(frame: &Frame, buffer: &mut [u32], width: usize, height: usize) {
    let fw = frame.width as usize;
    let fh = frame.height as usize;
    if fw < width || fh < height {
        buffer.fill(0);
    }
    for y in 0..height.min(fh) {
        for x in 0..width.min(fw) {
            let idx = (y * fw + x) * 3;
            let r = frame.rgb[idx] as u32;
            let g = frame.rgb[idx + 1] as u32;
            let b = frame.rgb[idx + 2] as u32;
            buffer[y * width + x] = (r << 16) | (g << 8) | b;
        }
    }
}

fn map_key(key: Key) -> Option<ControlEvent> {
    match key {
        Key::Escape | Key::Q => Some(ControlEvent::Quit),
        Key::S => Some(ControlEvent::Screenshot),
        Key::P => Some(ControlEvent::TogglePause),
        Key::H => Some(ControlEvent::ToggleHands),
        Key::B => Some(ControlEvent::TogglePose),
        Key::M => Some(ControlEvent::ToggleMirror),
        _ => None,
    }
}
