use super::types::{AnalysisError, Analyzer, LumaSample};
use crate::frame::Frame;

/// Arithmetic mean of the bytes, each read as an unsigned value.
///
/// Returns `None` for an empty slice instead of dividing by zero.
pub fn average_luma(pixels: &[u8]) -> Option<f64> {
    if pixels.is_empty() {
        return None;
    }
    let sum: u64 = pixels.iter().map(|&p| p as u64).sum();
    Some(sum as f64 / pixels.len() as f64)
}

/// Luminosity-sampling analyzer
///
/// Averages the first plane of each frame (the Y plane for YUV input) and
/// hands the result to a listener on the calling thread. The listener is a
/// plain closure; wrap a channel sender in one to move samples elsewhere.
///
/// Malformed frames are rejected before the listener runs:
///
/// * no planes at all: [`AnalysisError::MissingPlane`]
/// * plane 0 shorter than `row_stride * (height - 1) + pixel_stride * (width - 1) + 1`
///   bytes: [`AnalysisError::Truncated`]
/// * an empty plane 0 (zero-sized frame): [`AnalysisError::EmptyPlane`]
pub struct LuminosityAnalyzer<F> {
    listener: F,
}

impl<F> LuminosityAnalyzer<F>
where
    F: FnMut(LumaSample),
{
    pub fn new(listener: F) -> Self {
        Self { listener }
    }

    /// Copy plane 0 from its start into an owned buffer
    fn read_primary_plane(frame: &mut Frame) -> Result<Vec<u8>, AnalysisError> {
        let (width, height) = (frame.width(), frame.height());
        let plane = frame
            .planes_mut()
            .first_mut()
            .ok_or(AnalysisError::MissingPlane)?;

        let expected = plane.min_len(width, height);
        if plane.buffer.len() < expected {
            return Err(AnalysisError::Truncated {
                width,
                height,
                expected,
                actual: plane.buffer.len(),
            });
        }

        plane.buffer.rewind();
        Ok(plane.buffer.copy_remaining())
    }
}

impl<F> Analyzer for LuminosityAnalyzer<F>
where
    F: FnMut(LumaSample),
{
    fn analyze(&mut self, frame: &mut Frame) -> Result<LumaSample, AnalysisError> {
        let _span = tracing::trace_span!(
            "analyze",
            width = frame.width(),
            height = frame.height()
        )
        .entered();

        let data = Self::read_primary_plane(frame)?;
        let luma = average_luma(&data)
            .map(LumaSample::new)
            .ok_or(AnalysisError::EmptyPlane)?;

        (self.listener)(luma);

        Ok(luma)
    }

    fn name(&self) -> &str {
        "luminosity"
    }
}
