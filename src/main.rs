mod app;
mod camera;
mod config;
mod detect;
mod model_download;
mod pipeline;
mod types;
mod window;

use anyhow::Result;

use config::Config;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("skelview {}", env!("CARGO_PKG_VERSION"));

    let config = Config::load_or_default("config.toml");
    run(&config)
}

#[cfg(feature = "camera-nokhwa")]
fn run(config: &Config) -> Result<()> {
    use std::path::Path;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    use app::{App, WINDOW_TITLE};
    use camera::{FrameSource, NokhwaCamera, available_cameras};
    use detect::{HandLandmarker, PoseLandmarker};
    use model_download::{ModelKind, ensure_model_ready};
    use pipeline::FramePipeline;
    use window::DisplayWindow;

    // Ctrl-C and SIGTERM drain through the normal shutdown path.
    let interrupt = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&interrupt))?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&interrupt))?;

    match available_cameras() {
        Ok(cameras) if cameras.is_empty() => log::warn!("no cameras detected"),
        Ok(cameras) => {
            for camera in &cameras {
                log::info!("camera {camera}");
            }
        }
        Err(err) => log::warn!("camera enumeration failed: {err:#}"),
    }

    let pose_model = Path::new(&config.detection.pose_model_path);
    let palm_model = Path::new(&config.detection.palm_model_path);
    let hand_model = Path::new(&config.detection.hand_model_path);
    ensure_model_ready(ModelKind::PoseLandmarker, pose_model)?;
    ensure_model_ready(ModelKind::PalmDetector, palm_model)?;
    ensure_model_ready(ModelKind::HandLandmarker, hand_model)?;

    let source = NokhwaCamera::open(config.camera.index, config.camera.width, config.camera.height)?;
    let (width, height) = source.resolution();

    let pipeline = FramePipeline::new(
        Box::new(PoseLandmarker::new(pose_model)?),
        Box::new(HandLandmarker::new(
            palm_model,
            hand_model,
            config.detection.hand_confidence,
        )?),
    );
    let window = DisplayWindow::new(WINDOW_TITLE, width as usize, height as usize)?;

    App::new(source, pipeline, window, config, interrupt).run()
}

#[cfg(not(feature = "camera-nokhwa"))]
fn run(_config: &Config) -> Result<()> {
    anyhow::bail!("built without a camera backend, enable the camera-nokhwa feature")
}
