//! Camera application core: a luminosity-sampling frame analyzer on a
//! dedicated worker, a still-photo orchestrator, and the permission and
//! lifecycle shell that wires them to a camera.

pub mod analysis;
pub mod app;
pub mod capture;
pub mod color;
pub mod config;
pub mod frame;
pub mod permission;
pub mod preview;
pub mod storage;

pub use analysis::{AnalysisError, Analyzer, LumaSample, LuminosityAnalyzer};
pub use app::CameraApp;
pub use config::CameraConfig;
pub use frame::{Frame, FrameGate, Plane};
