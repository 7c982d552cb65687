use crate::analysis::{AnalysisWorker, Analyzer};
use crate::capture::{CameraProvider, CameraSession, CapturedPhoto, PhotoCapture};
use crate::color;
use crate::config::{CameraConfig, ConfigError};
use crate::frame::FrameGate;
use crate::permission::{PermissionHost, PermissionResponse};
use crate::preview::PreviewSink;
use anyhow::{Context, Result};
use std::time::{Duration, Instant};

pub const PERMISSION_DENIED_MESSAGE: &str = "please open camera permission";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDuration {
    Short,
    Long,
}

/// User-facing surface of the application
pub trait UserInterface {
    /// Show a transient message
    fn show_message(&mut self, text: &str, duration: MessageDuration);

    /// End the screen; nothing else happens afterwards
    fn finish(&mut self);
}

/// Messages on stdout, finishing just marks the flow as done
#[derive(Debug, Default)]
pub struct ConsoleUi {
    finished: bool,
}

impl ConsoleUi {
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl UserInterface for ConsoleUi {
    fn show_message(&mut self, text: &str, _duration: MessageDuration) {
        println!("{text}");
    }

    fn finish(&mut self) {
        self.finished = true;
    }
}

/// Time spent on one pass of the frame loop
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameTimings {
    pub capture: Duration,
    pub preview: Duration,
    /// Whether the frame went to the analysis worker
    pub analyzed: bool,
}

/// The camera screen: permission gate, camera binding, frame loop, shutter
pub struct CameraApp<P: CameraProvider, H, U> {
    config: CameraConfig,
    provider: P,
    permissions: H,
    ui: U,
    photos: PhotoCapture,
    gate: FrameGate,
    preview: Option<Box<dyn PreviewSink>>,
    analyzer: Option<Box<dyn Analyzer + Send>>,
    worker: Option<AnalysisWorker>,
    session: Option<P::Session>,
    finished: bool,
}

impl<P, H, U> CameraApp<P, H, U>
where
    P: CameraProvider,
    H: PermissionHost,
    U: UserInterface,
{
    pub fn new(
        config: CameraConfig,
        provider: P,
        permissions: H,
        ui: U,
        analyzer: Box<dyn Analyzer + Send>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let photos = PhotoCapture::new(&config);
        Ok(Self {
            config,
            provider,
            permissions,
            ui,
            photos,
            gate: FrameGate::new(),
            preview: None,
            analyzer: Some(analyzer),
            worker: None,
            session: None,
            finished: false,
        })
    }

    /// Attach a display-preview sink, fed on every frame
    pub fn with_preview(mut self, preview: Box<dyn PreviewSink>) -> Self {
        self.preview = Some(preview);
        self
    }

    /// Start the screen: storage, analysis worker, then the permission gate
    pub fn on_create(&mut self) -> Result<()> {
        let _span = tracing::info_span!("on_create", tag = %self.config.tag).entered();

        self.photos.output_directory();

        if let Some(analyzer) = self.analyzer.take() {
            let name = format!("{}-analysis", self.config.tag);
            let worker = AnalysisWorker::spawn(&name, analyzer)
                .context("Failed to spawn analysis worker")?;
            self.worker = Some(worker);
        }

        if self.required_permissions_granted() {
            self.start_camera();
        } else {
            tracing::info!("Requesting {:?}", self.config.required_permissions);
            let response = self
                .permissions
                .request(&self.config.required_permissions, self.config.request_code);
            self.on_permission_result(response);
        }

        Ok(())
    }

    pub fn on_permission_result(&mut self, response: PermissionResponse) {
        if response.request_code != self.config.request_code {
            tracing::debug!(
                "Ignoring permission result for request {}",
                response.request_code
            );
            return;
        }

        if !response.all_granted() || !self.required_permissions_granted() {
            tracing::warn!("Camera permission denied");
            self.ui
                .show_message(PERMISSION_DENIED_MESSAGE, MessageDuration::Short);
            self.ui.finish();
            self.finished = true;
            return;
        }

        if self.session.is_none() {
            self.start_camera();
        }
    }

    fn required_permissions_granted(&self) -> bool {
        self.config
            .required_permissions
            .iter()
            .all(|&permission| self.permissions.is_granted(permission))
    }

    /// Bind a fresh camera session; failures leave the app without one
    pub fn start_camera(&mut self) {
        // Unbind first so the device is free for the new session
        self.session = None;

        match self.provider.bind(&self.config.camera) {
            Ok(session) => {
                let (width, height) = session.resolution();
                tracing::info!("Camera session started at {}x{}", width, height);
                self.session = Some(session);
            }
            Err(e) => {
                tracing::error!("Start camera failed: {:#}", e);
            }
        }
    }

    /// Run one pass of the frame loop: capture, preview, analysis handoff
    pub fn on_frame(&mut self) -> Result<FrameTimings> {
        let mut timings = FrameTimings::default();
        let Some(session) = self.session.as_mut() else {
            return Ok(timings);
        };

        let capture_start = Instant::now();
        let image = session.next_frame()?;
        timings.capture = capture_start.elapsed();

        if let Some(preview) = self.preview.as_mut() {
            let preview_start = Instant::now();
            if let Err(e) = preview.write_frame(&image) {
                tracing::warn!("Preview write failed: {:#}", e);
            }
            timings.preview = preview_start.elapsed();
        }

        if let Some(worker) = &self.worker {
            let (width, height) = image.dimensions();
            match self
                .gate
                .acquire_with(width, height, || color::i420_planes(&image))
            {
                Some(frame) => timings.analyzed = worker.submit(frame),
                None => tracing::trace!("Previous frame still under analysis, skipping"),
            }
        }

        Ok(timings)
    }

    /// Shutter: capture a photo if a session is active
    pub fn take_photo(&mut self) -> Option<CapturedPhoto> {
        let photo = self.photos.take_photo(self.session.as_mut())?;
        self.ui.show_message(
            &format!("Photo saved to {}", photo.uri()),
            MessageDuration::Long,
        );
        Some(photo)
    }

    /// Tear down: retire the worker after its in-flight frame, drop the session
    pub fn on_destroy(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.shutdown();
        }
        self.session = None;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn frame_gate(&self) -> &FrameGate {
        &self.gate
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }
}

impl<P: CameraProvider, H, U> Drop for CameraApp<P, H, U> {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.shutdown();
        }
    }
}
