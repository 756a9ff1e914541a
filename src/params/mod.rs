//! Parameter definitions with physical units and documented semantics.
//!
//! All tunables of the capture → spectrum → render pipeline live here with:
//! - Physical units (samples, Hz, pixels, milliseconds)
//! - Documented ranges and meanings
//! - A `validate()` per config struct, called once at startup

mod camera;
mod render;
mod spectrum;

// Re-export all types
pub use camera::CameraParams;
pub use render::{RasterMode, RenderConfig, SceneSelection, VisualStyle};
pub use spectrum::{
    audio_constants, clamp_overlap, hop_for, SpectrumConfig, WindowFunction, OVERLAP_EPSILON,
};
