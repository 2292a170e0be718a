use anyhow::{Result, anyhow};
use image::{RgbImage, imageops::FilterType};
use ndarray::Array4;

use crate::types::Frame;

/// Letterbox geometry needed to project model-space landmarks back onto the
/// original frame.
#[derive(Clone, Debug)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub orig_w: u32,
    pub orig_h: u32,
}

/// Resize the frame into a square `input_size` canvas with symmetric
/// padding and pack it as a normalized NHWC float tensor.
pub fn prepare_frame(frame: &Frame, input_size: u32) -> Result<(Array4<f32>, Letterbox)> {
    let Some(img) = RgbImage::from_raw(frame.width, frame.height, frame.rgb.clone()) else {
        return Err(anyhow!("failed to build RGB image from frame"));
    };

    let scale = input_size as f32 / (frame.width.max(frame.height) as f32);
    let new_w = (frame.width as f32 * scale).round().max(1.0) as u32;
    let new_h = (frame.height as f32 * scale).round().max(1.0) as u32;
    let resized = image::imageops::resize(&img, new_w, new_h, FilterType::CatmullRom);

    let pad_x = ((input_size as i64 - new_w as i64) / 2).max(0) as f32;
    let pad_y = ((input_size as i64 - new_h as i64) / 2).max(0) as f32;
    let mut canvas = RgbImage::from_pixel(input_size, input_size, image::Rgb([0u8, 0u8, 0u8]));
    for y in 0..new_h {
        for x in 0..new_w {
            let px = *resized.get_pixel(x, y);
            let lx = x + pad_x as u32;
            let ly = y + pad_y as u32;
            if lx < canvas.width() && ly < canvas.height() {
                canvas.put_pixel(lx, ly, px);
            }
        }
    }

    let size = input_size as usize;
    let mut input = Array4::<f32>::zeros((1, size, size, 3));
    for y in 0..input_size {
        for x in 0..input_size {
            let pixel = canvas.get_pixel(x, y).0;
            input[[0, y as usize, x as usize, 0]] = pixel[0] as f32 / 255.0;
            input[[0, y as usize, x as usize, 1]] = pixel[1] as f32 / 255.0;
            input[[0, y as usize, x as usize, 2]] = pixel[2] as f32 / 255.0;
        }
    }

    let letterbox = Letterbox {
        scale,
        pad_x,
        pad_y,
        orig_w: frame.width,
        orig_h: frame.height,
    };

    Ok((input, letterbox))
}

/// Slice a flat model output into fixed-stride landmark records.
pub fn decode_landmark_rows(flat: &[f32], count: usize, stride: usize) -> Result<Vec<&[f32]>> {
    if flat.len() < count * stride {
        return Err(anyhow!(
            "unexpected landmark tensor length: got {}, need {}",
            flat.len(),
            count * stride
        ));
    }
    Ok(flat.chunks_exact(stride).take(count).collect())
}

/// Undo the letterbox and express a model-space point as normalized frame
/// coordinates. Not clamped: points just outside the frame stay outside,
/// which the renderer clips.
pub fn to_normalized(x: f32, y: f32, letterbox: &Letterbox) -> (f32, f32) {
    let px = (x - letterbox.pad_x) / letterbox.scale;
    let py = (y - letterbox.pad_y) / letterbox.scale;
    (px / letterbox.orig_w as f32, py / letterbox.orig_h as f32)
}

pub fn sigmoid(v: f32) -> f32 {
    1.0 / (1.0 + (-v).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_frame_letterboxes_wide_input() {
        let frame = Frame::new(200, 100);
        let (input, letterbox) = prepare_frame(&frame, 64).unwrap();
        assert_eq!(input.shape(), &[1, 64, 64, 3]);
        assert_eq!(letterbox.scale, 64.0 / 200.0);
        assert_eq!(letterbox.pad_x, 0.0);
        assert_eq!(letterbox.pad_y, 16.0);
    }

    #[test]
    fn to_normalized_round_trips_center() {
        let letterbox = Letterbox {
            scale: 64.0 / 200.0,
            pad_x: 0.0,
            pad_y: 16.0,
            orig_w: 200,
            orig_h: 100,
        };
        // Center of the model input maps back to the frame center.
        let (nx, ny) = to_normalized(32.0, 32.0, &letterbox);
        assert!((nx - 0.5).abs() < 1e-5);
        assert!((ny - 0.5).abs() < 1e-5);
    }

    #[test]
    fn decode_landmark_rows_checks_length() {
        let flat = vec![0.0f32; 10];
        assert!(decode_landmark_rows(&flat, 4, 3).is_err());
        let rows = decode_landmark_rows(&flat, 3, 3).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].len(), 3);
    }

    #[test]
    fn sigmoid_is_monotonic_and_bounded() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!(sigmoid(10.0) > 0.99);
        assert!(sigmoid(-10.0) < 0.01);
    }
}
