use super::PreviewSink;
use crate::color;
use anyhow::{Context, Result};
use image::RgbImage;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use v4l::video::Output;
use v4l::{Device, Format, FourCC};

/// Live preview written to a v4l2loopback device as YUYV
pub struct V4L2Preview {
    file: File,
    width: u32,
    height: u32,
}

impl V4L2Preview {
    pub fn new<P: AsRef<Path>>(device_path: P, width: u32, height: u32) -> Result<Self> {
        let path = device_path.as_ref();
        tracing::info!(
            "Opening v4l2loopback preview at {} ({}x{})",
            path.display(),
            width,
            height
        );

        // Announce the frame layout so readers of the loopback device agree on it
        let device = Device::with_path(path)
            .with_context(|| format!("Failed to open v4l2 device at {}", path.display()))?;
        let format = Format::new(width, height, FourCC::new(b"YUYV"));
        let applied = Output::set_format(&device, &format)
            .context("Failed to set YUYV output format")?;
        if (applied.width, applied.height) != (width, height) {
            tracing::warn!(
                "Loopback device negotiated {}x{} instead of {}x{}",
                applied.width,
                applied.height,
                width,
                height
            );
        }

        // v4l2loopback accepts raw frame data written to the device file
        let file = File::options()
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open v4l2loopback device at {}", path.display()))?;

        tracing::info!("Preview device opened successfully");

        Ok(Self {
            file,
            width,
            height,
        })
    }
}

impl PreviewSink for V4L2Preview {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        let yuyv = if frame.dimensions() != (self.width, self.height) {
            let resized = image::imageops::resize(
                frame,
                self.width,
                self.height,
                image::imageops::FilterType::Triangle,
            );
            color::rgb_to_yuyv(&resized)
        } else {
            color::rgb_to_yuyv(frame)
        };

        self.file
            .write_all(&yuyv)
            .context("Failed to write frame to v4l2loopback device")?;

        Ok(())
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
