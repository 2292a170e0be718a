use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use anyhow::{Context, Result, anyhow};

use crate::camera::FrameSource;
use crate::config::Config;
use crate::pipeline::{FpsSampler, FramePipeline, RenderToggles, overlay};
use crate::types::Frame;
use crate::window::DisplayWindow;

pub const WINDOW_TITLE: &str = "skelview";

/// Discrete input events, mapped 1:1 from key codes at the display
/// boundary. At most one is consumed per loop iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlEvent {
    Quit,
    Screenshot,
    TogglePause,
    TogglePose,
    ToggleHands,
    ToggleMirror,
}

/// All mutable application state, owned by the single loop thread and
/// changed only through `handle_event` and the FPS sampler. Toggles take
/// effect on the next frame, never the current one.
#[derive(Debug)]
pub struct AppState {
    pub running: bool,
    pub paused: bool,
    pub pose_enabled: bool,
    pub hands_enabled: bool,
    pub mirror_enabled: bool,
    pub legend_enabled: bool,
    pub frame_count: u64,
    pub fps: FpsSampler,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            running: true,
            paused: false,
            pose_enabled: config.detection.pose_enabled,
            hands_enabled: config.detection.hands_enabled,
            mirror_enabled: config.display.mirror,
            legend_enabled: config.display.show_legend,
            frame_count: 0,
            fps: FpsSampler::new(),
        }
    }

    /// Apply one state transition. Screenshot is a pure side effect and
    /// deliberately changes nothing here.
    pub fn handle_event(&mut self, event: ControlEvent) {
        match event {
            ControlEvent::Quit => {
                self.running = false;
                log::info!("quit requested");
            }
            ControlEvent::TogglePause => {
                self.paused = !self.paused;
                log::info!("{}", if self.paused { "paused" } else { "resumed" });
            }
            ControlEvent::TogglePose => {
                self.pose_enabled = !self.pose_enabled;
                log::info!(
                    "pose detection {}",
                    if self.pose_enabled { "enabled" } else { "disabled" }
                );
            }
            ControlEvent::ToggleHands => {
                self.hands_enabled = !self.hands_enabled;
                log::info!(
                    "hand detection {}",
                    if self.hands_enabled { "enabled" } else { "disabled" }
                );
            }
            ControlEvent::ToggleMirror => {
                self.mirror_enabled = !self.mirror_enabled;
                log::info!(
                    "mirror mode {}",
                    if self.mirror_enabled { "enabled" } else { "disabled" }
                );
            }
            ControlEvent::Screenshot => {}
        }
    }

    pub fn toggles(&self) -> RenderToggles {
        RenderToggles {
            pose: self.pose_enabled,
            hands: self.hands_enabled,
            mirror: self.mirror_enabled,
            legend: self.legend_enabled,
        }
    }
}

/// One frame through the active/paused branch of the controller. Paused
/// frames get a banner only: no detector runs and `frame_count` holds.
fn run_frame(
    state: &mut AppState,
    pipeline: &mut FramePipeline,
    frame: &mut Frame,
    fps: f32,
) -> Result<()> {
    if state.paused {
        overlay::draw_paused_banner(frame);
        return Ok(());
    }

    let status = pipeline.process(frame, state.toggles(), fps)?;
    state.frame_count += 1;

    if state.frame_count % 100 == 0 {
        log::debug!(
            "frame {} | fps {:.1} | pose {} | hands {}",
            state.frame_count,
            fps,
            if status.pose_detected { "+" } else { "-" },
            status.hands_detected,
        );
    }
    Ok(())
}

pub struct App<S: FrameSource> {
    source: S,
    pipeline: FramePipeline,
    window: DisplayWindow,
    state: AppState,
    interrupt: Arc<AtomicBool>,
    last_frame: Option<Frame>,
    screenshot_dir: PathBuf,
}

impl<S: FrameSource> App<S> {
    pub fn new(
        source: S,
        pipeline: FramePipeline,
        window: DisplayWindow,
        config: &Config,
        interrupt: Arc<AtomicBool>,
    ) -> Self {
        Self {
            source,
            pipeline,
            window,
            state: AppState::from_config(config),
            interrupt,
            last_frame: None,
            screenshot_dir: PathBuf::from(&config.display.screenshot_dir),
        }
    }

    /// Drive the loop until a quit event, a closed window, or a fatal
    /// error. The shutdown summary runs exactly once on every path;
    /// camera, detector, and window resources release on drop.
    pub fn run(mut self) -> Result<()> {
        log_controls();
        let result = self.main_loop();
        if let Err(err) = &result {
            log::error!("frame loop aborted: {err:#}");
        }
        self.shutdown_summary();
        result
    }

    fn main_loop(&mut self) -> Result<()> {
        while keep_running(&self.state, &self.interrupt) && self.window.is_open() {
            let mut frame = self.source.read_frame()?;
            self.state.fps.sample(Instant::now());
            let fps = self.state.fps.current();

            run_frame(&mut self.state, &mut self.pipeline, &mut frame, fps)?;

            // Retained only for screenshot capture; overwritten every frame.
            self.last_frame = Some(frame.clone());
            self.window.present(&frame)?;

            if let Some(event) = self.window.poll_event() {
                if event == ControlEvent::Screenshot {
                    self.capture_screenshot();
                }
                self.state.handle_event(event);
            }
        }
        if self.interrupt.load(Ordering::Relaxed) {
            log::info!("interrupt received, shutting down");
        }
        Ok(())
    }

    fn capture_screenshot(&self) {
        let Some(frame) = self.last_frame.as_ref() else {
            log::warn!("no frame available to capture");
            return;
        };
        match save_screenshot(frame, &self.screenshot_dir) {
            Ok(path) => log::info!("screenshot saved: {}", path.display()),
            Err(err) => log::error!("failed to save screenshot: {err:#}"),
        }
    }

    fn shutdown_summary(&self) {
        log::info!("frames processed: {}", self.state.frame_count);
        if let Some(mean) = self.state.fps.mean() {
            log::info!("mean fps: {mean:.2}");
        }
    }
}

/// Loop predicate shared with the signal handler: an interrupt drains the
/// loop through the same path as a quit event, so the shutdown summary and
/// resource release still run exactly once.
fn keep_running(state: &AppState, interrupt: &AtomicBool) -> bool {
    state.running && !interrupt.load(Ordering::Relaxed)
}

fn log_controls() {
    log::info!("controls: ESC/Q quit | S screenshot | P pause | H hands | B pose | M mirror");
}

/// Persist a frame as a timestamp-named PNG, creating the output directory
/// on first use.
pub fn save_screenshot(frame: &Frame, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create screenshot directory {}", dir.display()))?;

    let filename = format!(
        "screenshot_{}.png",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let path = dir.join(filename);

    let image = image::RgbImage::from_raw(frame.width, frame.height, frame.rgb.clone())
        .ok_or_else(|| anyhow!("frame buffer does not match its dimensions"))?;
    image
        .save(&path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}
