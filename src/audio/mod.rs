//! Live audio capture and FFT analysis.
//!
//! The capture callback down-mixes each device block to mono and feeds an
//! [`OverlapBuffer`]. Every completed window is copied into the [`WindowMailbox`] and the
//! spectrum worker turns it into a history row.

mod fft;
mod overlap;
mod system;
mod window;
mod worker;

pub use fft::{FftTransform, SpectralTransform};
pub use overlap::{OverlapBuffer, Window};
pub use system::AudioSystem;
pub use window::{hann_window, WindowTable};
pub use worker::{SpectrumPipeline, SpectrumWorker, WindowMailbox};
