use crate::frame::Frame;
use std::fmt;

/// Average luminance of one frame's primary plane, in [0, 255]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct LumaSample(f64);

impl LumaSample {
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for LumaSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("frame has no image planes")]
    MissingPlane,
    #[error("plane 0 is empty, no luminance to average")]
    EmptyPlane,
    #[error("plane 0 holds {actual} bytes, {expected} needed for {width}x{height}")]
    Truncated {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// Trait for per-frame analyzers run on the analysis worker
///
/// Frames are delivered serially. The analyzer borrows the frame for the
/// duration of the call; releasing it is the caller's job.
pub trait Analyzer {
    /// Analyze one frame and return its luma
    fn analyze(&mut self, frame: &mut Frame) -> Result<LumaSample, AnalysisError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}

impl<A: Analyzer + ?Sized> Analyzer for Box<A> {
    fn analyze(&mut self, frame: &mut Frame) -> Result<LumaSample, AnalysisError> {
        (**self).analyze(frame)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Analyze a frame and release it on every exit path.
///
/// Takes ownership of the frame, so the release runs when this function
/// returns, whatever the outcome, and also while unwinding from a panic
/// inside the analyzer or its listener.
pub fn process_frame<A: Analyzer + ?Sized>(
    analyzer: &mut A,
    mut frame: Frame,
) -> Result<LumaSample, AnalysisError> {
    analyzer.analyze(&mut frame)
}
