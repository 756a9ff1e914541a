//! Real-input spectral transform on top of rustfft.

use std::sync::Arc;

use rustfft::num_complex::Complex32;
use rustfft::{Fft, FftPlanner};

/// Fixed-length transform from L real samples to L/2 + 1 complex bins
///
/// Implementations plan once at construction and must be deterministic: the same input
/// always produces the same bins.
pub trait SpectralTransform: Send {
    /// Input length L
    fn window_len(&self) -> usize;

    /// Output length, DC through Nyquist
    fn bin_count(&self) -> usize {
        self.window_len() / 2 + 1
    }

    /// Transform one window
    ///
    /// # Panics
    /// If `input` is not `window_len()` long or `output` is not `bin_count()` long.
    fn process(&mut self, input: &[f32], output: &mut [Complex32]);
}

/// Forward FFT with preallocated working buffers
pub struct FftTransform {
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex32>,
    scratch: Vec<Complex32>,
    /// 2 / L, so a full-scale sine lands near 1.0
    normalization: f32,
}

impl FftTransform {
    pub fn new(window_len: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(window_len);
        let scratch_len = fft.get_inplace_scratch_len();
        Self {
            fft,
            buffer: vec![Complex32::new(0.0, 0.0); window_len],
            scratch: vec![Complex32::new(0.0, 0.0); scratch_len],
            normalization: 2.0 / window_len.max(1) as f32,
        }
    }
}

impl SpectralTransform for FftTransform {
    fn window_len(&self) -> usize {
        self.buffer.len()
    }

    fn process(&mut self, input: &[f32], output: &mut [Complex32]) {
        assert_eq!(input.len(), self.window_len(), "transform input length mismatch");
        assert_eq!(output.len(), self.bin_count(), "transform output length mismatch");

        for (slot, &sample) in self.buffer.iter_mut().zip(input) {
            *slot = Complex32::new(sample, 0.0);
        }
        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);

        for (bin, value) in output.iter_mut().zip(&self.buffer) {
            *bin = *value * self.normalization;
        }
    }
}

impl std::fmt::Debug for FftTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FftTransform")
            .field("window_len", &self.buffer.len())
            .finish()
    }
}
