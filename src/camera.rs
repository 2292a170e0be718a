use anyhow::Result;

use crate::types::Frame;

/// Blocking frame source driven by the main loop. A read error is fatal to
/// the loop; resource release happens on drop.
pub trait FrameSource {
    fn read_frame(&mut self) -> Result<Frame>;
    fn resolution(&self) -> (u32, u32);
}

#[cfg(feature = "camera-nokhwa")]
pub use self::nokhwa_camera::{NokhwaCamera, available_cameras};

#[cfg(feature = "camera-nokhwa")]
mod nokhwa_camera {
    use anyhow::{Context, Result, anyhow};
    use nokhwa::{
        Camera,
        pixel_format::RgbFormat,
        query,
        utils::{
            ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat,
            RequestedFormatType, Resolution,
        },
    };

    use super::FrameSource;
    use crate::types::Frame;

    pub fn available_cameras() -> Result<Vec<String>> {
        let cameras = query(ApiBackend::Auto)?;
        Ok(cameras
            .into_iter()
            .map(|info| format!("[{}] {}", info.index(), info.human_name()))
            .collect())
    }

    pub struct NokhwaCamera {
        camera: Camera,
        width: u32,
        height: u32,
    }

    impl NokhwaCamera {
        /// Open the device, preferring the requested resolution but
        /// accepting whatever format the driver actually grants.
        pub fn open(index: u32, width: u32, height: u32) -> Result<Self> {
            let index = CameraIndex::Index(index);
            let camera = build_camera(index, width, height)?;
            let resolution = camera.resolution();
            log::info!(
                "camera open at {}x{}",
                resolution.width(),
                resolution.height()
            );
            Ok(Self {
                camera,
                width: resolution.width(),
                height: resolution.height(),
            })
        }
    }

    fn build_camera(index: CameraIndex, width: u32, height: u32) -> Result<Camera> {
        let requested = [
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
                Resolution::new(width, height),
                FrameFormat::MJPEG,
                30,
            ))),
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::None),
        ];

        let mut last_err = None;
        for format in requested {
            match Camera::new(index.clone(), format) {
                Ok(mut camera) => match camera.open_stream() {
                    Ok(()) => return Ok(camera),
                    Err(err) => last_err = Some(err.into()),
                },
                Err(err) => last_err = Some(err.into()),
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("failed to open camera with any supported format")))
    }

    impl FrameSource for NokhwaCamera {
        fn read_frame(&mut self) -> Result<Frame> {
            let buffer = self.camera.frame().context("camera frame read failed")?;
            let decoded = buffer
                .decode_image::<RgbFormat>()
                .context("failed to decode camera frame")?;
            let (width, height) = decoded.dimensions();
            let rgb = decoded.into_raw();
            Frame::from_rgb(rgb, width, height)
                .ok_or_else(|| anyhow!("camera returned a malformed frame"))
        }

        fn resolution(&self) -> (u32, u32) {
            (self.width, self.height)
        }
    }
}
