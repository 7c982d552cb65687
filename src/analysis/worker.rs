use super::types::{process_frame, Analyzer};
use crate::frame::Frame;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const STATS_INTERVAL: u64 = 30;

/// Counters kept by the analysis worker
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WorkerStats {
    pub analyzed: u64,
    pub failed: u64,
    pub panicked: u64,
    pub total_time: Duration,
}

impl WorkerStats {
    pub fn frames(&self) -> u64 {
        self.analyzed + self.failed + self.panicked
    }

    fn average_ms(&self) -> f64 {
        match self.frames() {
            0 => 0.0,
            n => self.total_time.as_secs_f64() * 1000.0 / n as f64,
        }
    }
}

/// Dedicated single-threaded analysis executor
///
/// Frames are handed over through a one-slot channel and analyzed strictly
/// one after another on the worker thread. Shutdown closes the channel and
/// joins the thread, so a frame being analyzed finishes and is released
/// before the worker retires.
pub struct AnalysisWorker {
    sender: Option<SyncSender<Frame>>,
    handle: Option<JoinHandle<WorkerStats>>,
    name: String,
}

impl AnalysisWorker {
    pub fn spawn(name: &str, analyzer: Box<dyn Analyzer + Send>) -> std::io::Result<Self> {
        let (sender, receiver) = mpsc::sync_channel::<Frame>(1);

        tracing::info!("Spawning analysis worker {} ({})", name, analyzer.name());

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run_worker(analyzer, receiver))?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
            name: name.to_string(),
        })
    }

    /// Hand a frame to the worker without blocking.
    ///
    /// Returns `false` when the worker is busy or gone; the frame is
    /// released right away in that case.
    pub fn submit(&self, frame: Frame) -> bool {
        let Some(sender) = &self.sender else {
            return false;
        };

        match sender.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(frame)) => {
                tracing::trace!("Analysis worker busy, dropping frame");
                frame.release();
                false
            }
            Err(TrySendError::Disconnected(frame)) => {
                tracing::warn!("Analysis worker {} is gone, dropping frame", self.name);
                frame.release();
                false
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stop accepting frames, let the in-flight one finish, join the thread
    pub fn shutdown(mut self) -> WorkerStats {
        self.stop()
    }

    fn stop(&mut self) -> WorkerStats {
        drop(self.sender.take());

        let Some(handle) = self.handle.take() else {
            return WorkerStats::default();
        };

        match handle.join() {
            Ok(stats) => {
                tracing::info!(
                    "Analysis worker {} stopped: analyzed={}, failed={}, panicked={}, avg={:.2}ms",
                    self.name,
                    stats.analyzed,
                    stats.failed,
                    stats.panicked,
                    stats.average_ms()
                );
                stats
            }
            Err(_) => {
                tracing::error!("Analysis worker {} terminated abnormally", self.name);
                WorkerStats::default()
            }
        }
    }
}

impl Drop for AnalysisWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker(mut analyzer: Box<dyn Analyzer + Send>, receiver: Receiver<Frame>) -> WorkerStats {
    let mut stats = WorkerStats::default();

    for frame in receiver {
        let start = Instant::now();
        let outcome = catch_unwind(AssertUnwindSafe(|| process_frame(&mut analyzer, frame)));
        stats.total_time += start.elapsed();

        match outcome {
            Ok(Ok(luma)) => {
                stats.analyzed += 1;
                tracing::trace!(luma = luma.value(), "Frame analyzed");
            }
            Ok(Err(e)) => {
                stats.failed += 1;
                tracing::warn!(error = %e, "Frame analysis failed");
            }
            Err(_) => {
                stats.panicked += 1;
                tracing::error!("Frame analysis panicked, frame released");
            }
        }

        if stats.frames() % STATS_INTERVAL == 0 {
            tracing::debug!(
                "Analysis {}: analyzed={}, failed={}, avg={:.2}ms",
                stats.frames(),
                stats.analyzed,
                stats.failed,
                stats.average_ms()
            );
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{LumaSample, LuminosityAnalyzer};
    use crate::frame::{FrameGate, Plane};
    use std::sync::mpsc::channel;

    /// Spin until the gate hands out a frame, the worker frees it eventually
    fn acquire_blocking(gate: &FrameGate, width: u32, height: u32, planes: Vec<Plane>) -> Frame {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut planes = Some(planes);
        loop {
            if let Some(frame) = gate.acquire_with(width, height, || planes.take().unwrap()) {
                return frame;
            }
            assert!(Instant::now() < deadline, "frame was never released");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_listener_runs_on_worker_thread() {
        let (tx, rx) = channel();
        let analyzer = LuminosityAnalyzer::new(move |luma: LumaSample| {
            let name = thread::current().name().map(str::to_string);
            let _ = tx.send((luma.value(), name));
        });

        let worker = AnalysisWorker::spawn("luma-test", Box::new(analyzer)).unwrap();
        assert!(worker.submit(Frame::luma(2, 1, vec![0, 255])));

        let (luma, thread_name) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(luma, 127.5);
        assert_eq!(thread_name.as_deref(), Some("luma-test"));

        let stats = worker.shutdown();
        assert_eq!(stats.analyzed, 1);
    }

    #[test]
    fn test_hundred_frames_all_released() {
        let gate = FrameGate::new();
        let (tx, rx) = channel();
        let analyzer = LuminosityAnalyzer::new(move |luma: LumaSample| {
            let _ = tx.send(luma.value());
        });
        let worker = AnalysisWorker::spawn("luma-hundred", Box::new(analyzer)).unwrap();

        let mut submitted = 0;
        for i in 0..100u32 {
            let planes = if i % 4 == 0 {
                vec![Plane::packed(vec![1], 8)]
            } else {
                vec![Plane::packed(vec![i as u8; 4], 2)]
            };
            let frame = acquire_blocking(&gate, 2, 2, planes);
            if worker.submit(frame) {
                submitted += 1;
            }
        }

        let stats = worker.shutdown();
        assert_eq!(gate.issued(), 100);
        assert_eq!(gate.released(), 100);
        assert_eq!(stats.frames(), submitted);
        assert_eq!(stats.failed, 25);
        assert_eq!(rx.try_iter().count() as u64, stats.analyzed);
    }

    #[test]
    fn test_panicking_listener_still_releases() {
        let gate = FrameGate::new();
        let mut calls = 0u32;
        let analyzer = LuminosityAnalyzer::new(move |_luma: LumaSample| {
            calls += 1;
            if calls % 2 == 0 {
                panic!("listener failure");
            }
        });
        let worker = AnalysisWorker::spawn("luma-panic", Box::new(analyzer)).unwrap();

        for _ in 0..10 {
            let frame = acquire_blocking(&gate, 1, 1, vec![Plane::packed(vec![42], 1)]);
            assert!(worker.submit(frame));
        }

        let stats = worker.shutdown();
        assert_eq!(gate.released(), 10);
        assert_eq!(stats.analyzed, 5);
        assert_eq!(stats.panicked, 5);
    }

    #[test]
    fn test_shutdown_drains_in_flight_frame() {
        let gate = FrameGate::new();
        let (started_tx, started_rx) = channel();
        let analyzer = LuminosityAnalyzer::new(move |_luma: LumaSample| {
            let _ = started_tx.send(());
            thread::sleep(Duration::from_millis(50));
        });
        let worker = AnalysisWorker::spawn("luma-drain", Box::new(analyzer)).unwrap();

        let frame = gate.acquire(1, 1, vec![Plane::packed(vec![9], 1)]).unwrap();
        assert!(worker.submit(frame));
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        let stats = worker.shutdown();
        assert_eq!(stats.analyzed, 1);
        assert_eq!(gate.released(), 1);
        assert!(!gate.is_outstanding());
    }
}
