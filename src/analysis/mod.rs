mod luminosity;
pub mod types;
mod worker;

pub use luminosity::{average_luma, LuminosityAnalyzer};
pub use types::{process_frame, AnalysisError, Analyzer, LumaSample};
pub use worker::{AnalysisWorker, WorkerStats};

/// Create the default analyzer: luminosity sampling that logs every sample
pub fn create_default_analyzer() -> Box<dyn Analyzer + Send> {
    Box::new(LuminosityAnalyzer::new(|luma: LumaSample| {
        tracing::debug!(luma = luma.value(), "Average luminosity");
    }))
}
