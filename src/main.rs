use anyhow::{Context, Result};
use clap::Parser;
use lumacam::analysis;
use lumacam::app::{CameraApp, ConsoleUi, UserInterface};
use lumacam::capture::{CameraProvider, WebcamProvider};
use lumacam::config::CameraConfig;
use lumacam::permission::{DevicePermissions, PermissionHost};
use lumacam::preview::V4L2Preview;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Input webcam device index
    #[arg(short, long)]
    input_device: Option<u32>,

    /// Capture resolution width
    #[arg(long)]
    capture_width: Option<u32>,

    /// Capture resolution height
    #[arg(long)]
    capture_height: Option<u32>,

    /// Target frames per second
    #[arg(long)]
    fps: Option<u32>,

    /// v4l2loopback device receiving the live preview
    #[arg(short, long)]
    preview_device: Option<PathBuf>,

    /// Preview resolution width
    #[arg(long)]
    preview_width: Option<u32>,

    /// Preview resolution height
    #[arg(long)]
    preview_height: Option<u32>,

    /// Press the shutter every N frames
    #[arg(long)]
    shutter_every: Option<u64>,

    /// Stop after this many frames (runs until interrupted otherwise)
    #[arg(long)]
    max_frames: Option<u64>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn apply(&self, config: &mut CameraConfig) {
        let camera = &mut config.camera;
        if let Some(index) = self.input_device {
            camera.index = index;
        }
        if let Some(width) = self.capture_width {
            camera.width = width;
        }
        if let Some(height) = self.capture_height {
            camera.height = height;
        }
        if let Some(fps) = self.fps {
            camera.fps = fps;
        }
        if let Some(device) = &self.preview_device {
            camera.preview_device = Some(device.clone());
        }
        if let Some(width) = self.preview_width {
            camera.preview_width = width;
        }
        if let Some(height) = self.preview_height {
            camera.preview_height = height;
        }
        if self.debug {
            config.logging.level = "debug".into();
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => CameraConfig::load(path).context("Failed to load configuration")?,
        None => CameraConfig::default(),
    };
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    // Initialize logging
    let log_level = config
        .logging
        .level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    tracing::info!("{} starting", config.app_name);
    tracing::info!("Capture: {}x{}", config.camera.width, config.camera.height);
    tracing::info!("Target FPS: {}", config.camera.fps);

    let fps = config.camera.fps;
    let preview = match &config.camera.preview_device {
        Some(device) => Some(
            V4L2Preview::new(device, config.camera.preview_width, config.camera.preview_height)
                .context("Failed to initialize v4l2loopback preview")?,
        ),
        None => {
            tracing::info!("No preview device, running headless");
            None
        }
    };

    let permissions = DevicePermissions::for_index(config.camera.index);
    let mut app = CameraApp::new(
        config,
        WebcamProvider,
        permissions,
        ConsoleUi::default(),
        analysis::create_default_analyzer(),
    )
    .context("Invalid configuration")?;
    if let Some(preview) = preview {
        app = app.with_preview(Box::new(preview));
    }

    app.on_create()?;

    if app.is_finished() {
        app.on_destroy();
        return Ok(());
    }
    if !app.has_session() {
        tracing::warn!("No camera available, nothing to do");
        app.on_destroy();
        return Ok(());
    }

    let result = run_loop(&mut app, fps, args.shutter_every, args.max_frames);
    app.on_destroy();
    result
}

fn run_loop<P, H, U>(
    app: &mut CameraApp<P, H, U>,
    target_fps: u32,
    shutter_every: Option<u64>,
    max_frames: Option<u64>,
) -> Result<()>
where
    P: CameraProvider,
    H: PermissionHost,
    U: UserInterface,
{
    let frame_duration = Duration::from_secs_f32(1.0 / target_fps as f32);
    let mut frame_count = 0u64;
    let mut analyzed_count = 0u64;
    let mut total_capture_time = Duration::ZERO;
    let mut total_preview_time = Duration::ZERO;

    tracing::info!("Starting frame loop");
    if let Some(every) = shutter_every {
        tracing::info!("Shutter every {} frames", every);
    }
    tracing::info!("Press Ctrl+C to stop");

    loop {
        let loop_start = Instant::now();

        let timings = app.on_frame().context("Failed to process frame")?;
        total_capture_time += timings.capture;
        total_preview_time += timings.preview;
        if timings.analyzed {
            analyzed_count += 1;
        }

        frame_count += 1;

        if let Some(every) = shutter_every.filter(|every| *every > 0) {
            if frame_count % every == 0 {
                app.take_photo();
            }
        }

        // Log stats every 30 frames
        if frame_count % 30 == 0 {
            let avg_capture_ms = total_capture_time.as_secs_f64() * 1000.0 / frame_count as f64;
            let avg_preview_ms = total_preview_time.as_secs_f64() * 1000.0 / frame_count as f64;

            tracing::info!(
                "Frame {}: capture={:.1}ms, preview={:.1}ms, analyzed={}",
                frame_count,
                avg_capture_ms,
                avg_preview_ms,
                analyzed_count
            );
        }

        if max_frames.is_some_and(|max| frame_count >= max) {
            tracing::info!("Reached {} frames, stopping", frame_count);
            return Ok(());
        }

        // Frame rate limiting
        let elapsed = loop_start.elapsed();
        if elapsed < frame_duration {
            std::thread::sleep(frame_duration - elapsed);
        }
    }
}
