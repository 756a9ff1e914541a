//! Audioscope library - live audio spectrum history rendered with wgpu

pub mod audio;
pub mod camera;
pub mod cli;
pub mod error;
pub mod params;
pub mod rendering;
pub mod spectrum;

pub use error::{Error, Result};
