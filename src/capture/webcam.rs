use super::{CameraProvider, CameraSession, CaptureError, ImageCapture};
use crate::config::DeviceConfig;
use crate::storage;
use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;
use std::path::Path;

/// Binds webcam sessions through nokhwa
#[derive(Debug, Default)]
pub struct WebcamProvider;

impl CameraProvider for WebcamProvider {
    type Session = WebcamSession;

    fn bind(&mut self, device: &DeviceConfig) -> Result<WebcamSession> {
        WebcamSession::open(device.index, device.width, device.height, device.jpeg_quality)
    }
}

pub struct WebcamSession {
    camera: Camera,
    width: u32,
    height: u32,
    jpeg_quality: u8,
}

impl WebcamSession {
    pub fn open(device_index: u32, width: u32, height: u32, jpeg_quality: u8) -> Result<Self> {
        tracing::info!(
            "Initializing webcam {} at {}x{}",
            device_index,
            width,
            height
        );

        let index = CameraIndex::Index(device_index);
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution);

        let mut camera = Camera::new(index, requested).context("Failed to open camera")?;

        camera
            .open_stream()
            .context("Failed to open camera stream")?;

        tracing::info!("Webcam initialized successfully");

        Ok(Self {
            camera,
            width,
            height,
            jpeg_quality,
        })
    }
}

impl CameraSession for WebcamSession {
    fn next_frame(&mut self) -> Result<RgbImage> {
        let frame = self.camera.frame().context("Failed to capture frame")?;

        let decoded = frame
            .decode_image::<RgbFormat>()
            .context("Failed to decode frame")?;

        let (width, height) = (decoded.width(), decoded.height());
        RgbImage::from_raw(width, height, decoded.into_raw())
            .ok_or_else(|| anyhow!("Decoded frame does not fit {}x{}", width, height))
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl ImageCapture for WebcamSession {
    fn take_picture(&mut self, destination: &Path) -> Result<(), CaptureError> {
        let still = self
            .next_frame()
            .map_err(|e| CaptureError::Grab(format!("{e:#}")))?;

        storage::write_jpeg(destination, &still, self.jpeg_quality)
    }
}

impl Drop for WebcamSession {
    fn drop(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            tracing::warn!("Failed to stop camera stream: {}", e);
        }
    }
}
