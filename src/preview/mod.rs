mod loopback;

pub use loopback::V4L2Preview;

use anyhow::Result;
use image::RgbImage;

/// Trait for display-preview destinations
pub trait PreviewSink {
    /// Show a frame
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;

    /// Get the expected output resolution
    fn resolution(&self) -> (u32, u32);
}
