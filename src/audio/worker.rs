//! Spectrum worker: turns extracted windows into history rows off the capture thread.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle, Thread};
use std::time::Duration;

use crossbeam::queue::ArrayQueue;
use rustfft::num_complex::Complex32;

use super::fft::{FftTransform, SpectralTransform};
use super::overlap::Window;
use super::window::WindowTable;
use crate::error::{Error, Result};
use crate::params::SpectrumConfig;
use crate::spectrum::{SharedSpectrum, Vertex};

/// Longest the worker sleeps without checking its stop flag
const IDLE_PARK: Duration = Duration::from_millis(50);

/// One-slot, latest-wins handoff between the capture callback and the worker
///
/// Window buffers circulate between a pool of spares and the single `latest` slot, so
/// offering a window copies samples but never allocates. When the worker falls behind,
/// the unprocessed window is replaced and counted as dropped.
#[derive(Debug)]
pub struct WindowMailbox {
    latest: ArrayQueue<Vec<f32>>,
    spare: ArrayQueue<Vec<f32>>,
    dropped: AtomicU64,
    waker: OnceLock<Thread>,
}

impl WindowMailbox {
    pub fn new(window_len: usize, spare_windows: usize) -> Self {
        let spare = ArrayQueue::new(spare_windows.max(1));
        for _ in 0..spare_windows.max(1) {
            let _ = spare.push(vec![0.0; window_len]);
        }
        Self {
            latest: ArrayQueue::new(1),
            spare,
            dropped: AtomicU64::new(0),
            waker: OnceLock::new(),
        }
    }

    /// Hand a window to the worker; returns false if it had to be dropped
    pub fn offer(&self, window: Window<'_>) -> bool {
        let Some(mut buffer) = self.spare.pop() else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        };
        window.copy_to(&mut buffer);

        if let Some(stale) = self.latest.force_push(buffer) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            let _ = self.spare.push(stale);
        }
        if let Some(worker) = self.waker.get() {
            worker.unpark();
        }
        true
    }

    /// Newest unprocessed window, if any
    pub fn take(&self) -> Option<Vec<f32>> {
        self.latest.pop()
    }

    /// Return a processed buffer to the spare pool
    pub fn recycle(&self, buffer: Vec<f32>) {
        let _ = self.spare.push(buffer);
    }

    /// Windows discarded because the worker was behind
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn register_waker(&self, worker: Thread) {
        let _ = self.waker.set(worker);
    }
}

/// Window function, transform and scale mapping for one window at a time
pub struct SpectrumPipeline<T = FftTransform> {
    table: WindowTable,
    transform: T,
    windowed: Vec<f32>,
    bins: Vec<Complex32>,
    row: Vec<Vertex>,
}

impl SpectrumPipeline<FftTransform> {
    pub fn new(config: &SpectrumConfig) -> Self {
        Self::with_transform(
            WindowTable::new(config.window_function, config.window_size),
            FftTransform::new(config.window_size),
        )
    }
}

impl<T: SpectralTransform> SpectrumPipeline<T> {
    pub fn with_transform(table: WindowTable, transform: T) -> Self {
        debug_assert_eq!(table.len(), transform.window_len());
        let bins = transform.bin_count();
        Self {
            windowed: vec![0.0; transform.window_len()],
            bins: vec![Complex32::new(0.0, 0.0); bins],
            row: vec![Vertex::default(); bins],
            table,
            transform,
        }
    }

    /// Window, transform and publish one window as the newest history row
    pub fn process(&mut self, samples: &[f32], shared: &SharedSpectrum) -> Result<()> {
        self.table.apply(samples, &mut self.windowed);
        self.transform.process(&self.windowed, &mut self.bins);
        shared.publish(&self.bins, &mut self.row)
    }

    /// Bins of the last processed window
    pub fn last_bins(&self) -> &[Complex32] {
        &self.bins
    }
}

/// Long-lived thread draining the mailbox into the shared history
pub struct SpectrumWorker {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<Result<()>>>,
}

impl SpectrumWorker {
    pub fn spawn<T>(
        mut pipeline: SpectrumPipeline<T>,
        mailbox: Arc<WindowMailbox>,
        shared: SharedSpectrum,
    ) -> Result<Self>
    where
        T: SpectralTransform + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let inbox = Arc::clone(&mailbox);

        let handle = thread::Builder::new()
            .name("spectrum".to_string())
            .spawn(move || {
                let result = drain(&mut pipeline, &inbox, &shared, &stop_flag);
                if let Err(e) = &result {
                    log::error!("Spectrum worker failed: {}", e);
                }
                result
            })
            .map_err(|source| Error::Spawn {
                name: "spectrum",
                source,
            })?;

        mailbox.register_waker(handle.thread().clone());

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |handle| handle.is_finished())
    }

    /// Signal the worker and wait for it, returning the error that ended it, if any
    pub fn stop(&mut self) -> Result<()> {
        self.stop.store(true, Ordering::Release);
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        handle.thread().unpark();
        handle
            .join()
            .map_err(|_| Error::ThreadPanicked("spectrum"))?
    }
}

/// Process windows until `stop` is raised or a window fails
fn drain<T: SpectralTransform>(
    pipeline: &mut SpectrumPipeline<T>,
    inbox: &WindowMailbox,
    shared: &SharedSpectrum,
    stop: &AtomicBool,
) -> Result<()> {
    let mut processed = 0u64;
    while !stop.load(Ordering::Acquire) {
        match inbox.take() {
            Some(window) => {
                let result = pipeline.process(&window, shared);
                inbox.recycle(window);
                result?;
                processed += 1;
            }
            None => thread::park_timeout(IDLE_PARK),
        }
    }
    log::debug!(
        "Spectrum worker stopped after {} windows ({} dropped)",
        processed,
        inbox.dropped()
    );
    Ok(())
}

impl Drop for SpectrumWorker {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::error!("{}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::OverlapBuffer;
    use crate::error::ProtocolViolation;
    use crate::params::WindowFunction;
    use crate::spectrum::ScaleMap;
    use std::f32::consts::PI;
    use std::time::Instant;

    fn offer_samples(mailbox: &WindowMailbox, samples: &[f32]) -> bool {
        let mut buffer = OverlapBuffer::with_overlap(samples.len(), 0.0);
        buffer.push(samples);
        let window = buffer.try_extract_window().unwrap();
        mailbox.offer(window)
    }

    #[test]
    fn test_mailbox_keeps_newest_window() {
        let mailbox = WindowMailbox::new(4, 3);

        assert!(offer_samples(&mailbox, &[1.0; 4]));
        assert!(offer_samples(&mailbox, &[2.0; 4]));
        assert!(offer_samples(&mailbox, &[3.0; 4]));

        assert_eq!(mailbox.take(), Some(vec![3.0; 4]));
        assert_eq!(mailbox.take(), None);
        assert_eq!(mailbox.dropped(), 2);
    }

    #[test]
    fn test_mailbox_drops_when_no_spare_buffer() {
        let mailbox = WindowMailbox::new(2, 2);

        assert!(offer_samples(&mailbox, &[1.0; 2]));
        let held = mailbox.take().unwrap();
        assert!(offer_samples(&mailbox, &[2.0; 2]));
        let also_held = mailbox.take().unwrap();

        // Both buffers are out with the consumer
        assert!(!offer_samples(&mailbox, &[3.0; 2]));
        assert_eq!(mailbox.dropped(), 1);

        mailbox.recycle(held);
        mailbox.recycle(also_held);
        assert!(offer_samples(&mailbox, &[4.0; 2]));
        assert_eq!(mailbox.take(), Some(vec![4.0; 2]));
    }

    #[test]
    fn test_pipeline_publishes_one_row_per_window() {
        let config = SpectrumConfig {
            window_size: 256,
            history_rows: 4,
            window_function: WindowFunction::Rectangular,
            ..Default::default()
        };
        let shared = SharedSpectrum::new(config.layout(), ScaleMap::Identity);
        let mut pipeline = SpectrumPipeline::new(&config);
        let sine: Vec<f32> = (0..256)
            .map(|n| (2.0 * PI * 8.0 * n as f32 / 256.0).sin())
            .collect();

        pipeline.process(&sine, &shared).unwrap();
        pipeline.process(&sine, &shared).unwrap();

        let state = shared.lock();
        assert_eq!(state.history.row_count(), 2);
        let newest = state.history.row(3).unwrap();
        assert_eq!(newest.len(), 129);
        let magnitude = |v: &Vertex| v.position[0].hypot(v.position[1]);
        assert!((magnitude(&newest[8]) - 1.0).abs() < 1e-3);
        assert!((pipeline.last_bins()[8].norm() - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_worker_drains_mailbox_and_stops() {
        let config = SpectrumConfig {
            window_size: 64,
            history_rows: 8,
            ..Default::default()
        };
        let shared = SharedSpectrum::new(config.layout(), ScaleMap::Identity);
        let mailbox = Arc::new(WindowMailbox::new(64, 3));
        let mut worker =
            SpectrumWorker::spawn(SpectrumPipeline::new(&config), Arc::clone(&mailbox), shared.clone())
                .unwrap();

        assert!(offer_samples(&mailbox, &[0.5; 64]));

        let deadline = Instant::now() + Duration::from_secs(5);
        while shared.lock().history.row_count() == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(shared.lock().history.row_count(), 1);
        assert!(worker.stop().is_ok());
        assert!(worker.is_finished());
    }

    /// Transform whose rows do not fit the history layout
    struct MismatchedTransform;

    impl SpectralTransform for MismatchedTransform {
        fn window_len(&self) -> usize {
            64
        }

        fn bin_count(&self) -> usize {
            7
        }

        fn process(&mut self, _input: &[f32], output: &mut [Complex32]) {
            output.fill(Complex32::new(0.5, 0.0));
        }
    }

    #[test]
    fn test_worker_ends_on_row_length_violation() {
        let config = SpectrumConfig {
            window_size: 64,
            history_rows: 8,
            ..Default::default()
        };
        let shared = SharedSpectrum::new(config.layout(), ScaleMap::Identity);
        let mailbox = Arc::new(WindowMailbox::new(64, 3));
        let pipeline = SpectrumPipeline::with_transform(
            WindowTable::new(WindowFunction::Hann, 64),
            MismatchedTransform,
        );
        let mut worker =
            SpectrumWorker::spawn(pipeline, Arc::clone(&mailbox), shared.clone()).unwrap();

        assert!(offer_samples(&mailbox, &[0.5; 64]));

        let deadline = Instant::now() + Duration::from_secs(5);
        while !worker.is_finished() {
            assert!(Instant::now() < deadline, "worker kept running after a bad row");
            thread::sleep(Duration::from_millis(1));
        }

        assert_eq!(shared.lock().history.row_count(), 0);
        assert!(matches!(
            worker.stop(),
            Err(Error::Protocol(ProtocolViolation::RowLength {
                expected: 33,
                actual: 7
            }))
        ));
    }
}
