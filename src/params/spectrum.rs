//! Spectrum analysis configuration and constants.

use crate::error::{Error, Result};
use crate::spectrum::HistoryLayout;

/// Smallest distance kept between the overlap ratio and 1.0 so windows always complete
pub const OVERLAP_EPSILON: f32 = 1e-4;

/// Window function applied to each analysis window before the transform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowFunction {
    /// Raised cosine, zero at both edges
    #[default]
    Hann,

    /// No tapering (all coefficients 1.0)
    Rectangular,
}

/// Spectrum analysis configuration
#[derive(Debug, Clone)]
pub struct SpectrumConfig {
    /// Analysis window length L (samples)
    /// Must be even so the Nyquist bin exists. Default 2048 (= 46ms @ 44.1kHz)
    pub window_size: usize,

    /// Overlap ratio r between consecutive windows, in [0, 1)
    /// 0.5 = every window reuses the newest half of the previous one
    pub overlap: f32,

    /// Number of spectrum rows H kept on screen
    pub history_rows: usize,

    /// Window function
    pub window_function: WindowFunction,

    /// Play the down-mixed input back through the default output device
    pub monitor: bool,

    /// Spare window buffers recycled between the capture callback and the worker
    /// One sits in the mailbox, one is processed, the rest absorb bursts
    pub spare_windows: usize,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            window_size: 2048,
            overlap: 0.5,
            history_rows: 64,
            window_function: WindowFunction::Hann,
            monitor: false,
            spare_windows: 3,
        }
    }
}

impl SpectrumConfig {
    /// Number of complex bins per transform (DC through Nyquist)
    pub fn bins(&self) -> usize {
        self.window_size / 2 + 1
    }

    /// New samples required between two windows, L·(1 − r), never below one
    pub fn hop(&self) -> usize {
        hop_for(self.window_size, self.overlap)
    }

    /// Layout of the vertex history this configuration produces
    pub fn layout(&self) -> HistoryLayout {
        HistoryLayout {
            rows: self.history_rows,
            row_len: self.bins(),
        }
    }

    /// Frequency spacing between adjacent bins (Hz)
    pub fn bin_resolution_hz(&self, sample_rate_hz: u32) -> f32 {
        sample_rate_hz as f32 / self.window_size as f32
    }

    /// Validate configuration (window size even and non-zero, etc.)
    pub fn validate(&self) -> Result<()> {
        if self.window_size < 2 || self.window_size % 2 != 0 {
            return Err(Error::Config(format!(
                "window size must be even and at least 2, got {}",
                self.window_size
            )));
        }
        if !self.overlap.is_finite() {
            return Err(Error::Config(format!(
                "overlap must be a number, got {}",
                self.overlap
            )));
        }
        if self.history_rows == 0 {
            return Err(Error::Config("history must hold at least one row".to_string()));
        }
        if self.spare_windows < 2 {
            return Err(Error::Config(format!(
                "need at least 2 spare window buffers, got {}",
                self.spare_windows
            )));
        }
        Ok(())
    }
}

/// Clamp an overlap ratio to [0, 1 - ε]; NaN becomes 0
pub fn clamp_overlap(overlap: f32) -> f32 {
    if overlap.is_nan() {
        return 0.0;
    }
    overlap.clamp(0.0, 1.0 - OVERLAP_EPSILON)
}

/// Hop length for a window of `window_size` samples at `overlap`
///
/// L·(1 − r) rounded to the nearest sample, computed in f64 so ratios like 0.53 that
/// f32 cannot hold exactly do not lose a sample.
pub fn hop_for(window_size: usize, overlap: f32) -> usize {
    let fresh = window_size as f64 * (1.0 - f64::from(clamp_overlap(overlap)));
    (fresh.round().max(1.0) as usize).min(window_size.max(1))
}

/// Audio constants (compile-time)
pub mod audio_constants {
    /// Largest mono block down-mixed at once inside the capture callback (frames)
    /// Longer device buffers are processed in several passes over the same scratch space
    pub const MAX_BLOCK_FRAMES: usize = 4096;

    /// Monitor passthrough latency budget (seconds of audio buffered)
    pub const MONITOR_BUFFER_SECS: f32 = 0.25;
}
