mod photo;
mod webcam;

pub use photo::PhotoCapture;
pub use webcam::{WebcamProvider, WebcamSession};

use crate::config::DeviceConfig;
use anyhow::Result;
use image::RgbImage;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to grab a still frame: {0}")]
    Grab(String),
    #[error("failed to encode {path}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to write {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Capture-to-file sink of a camera session
pub trait ImageCapture {
    /// Capture one still image and write it to `destination`.
    ///
    /// `Ok` means the file is complete; on `Err` nothing is left at
    /// `destination`.
    fn take_picture(&mut self, destination: &Path) -> Result<(), CaptureError>;
}

/// A live camera binding: frame source plus still capture
pub trait CameraSession: ImageCapture {
    /// Pull the next frame from the stream
    fn next_frame(&mut self) -> Result<RgbImage>;

    /// Get the resolution of delivered frames
    fn resolution(&self) -> (u32, u32);
}

/// Binds camera sessions
pub trait CameraProvider {
    type Session: CameraSession;

    fn bind(&mut self, device: &DeviceConfig) -> Result<Self::Session>;
}

/// A photo written by a successful capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedPhoto {
    pub path: PathBuf,
    pub name: String,
}

impl CapturedPhoto {
    pub fn new(path: PathBuf, name: String) -> Self {
        Self { path, name }
    }

    pub fn uri(&self) -> String {
        format!("file://{}", self.path.display())
    }
}
