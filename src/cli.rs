//! Command-line argument parsing.

use clap::Parser;

use crate::params::{
    RasterMode, RenderConfig, SceneSelection, SpectrumConfig, VisualStyle, WindowFunction,
};
use crate::spectrum::ScaleMap;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "audioscope")]
#[command(about = "Real-time 3D spectrum history of the default audio input", long_about = None)]
pub struct Args {
    /// Play the captured input back through the default output device
    #[arg(long)]
    pub monitor: bool,

    /// Overlap between consecutive analysis windows, in [0, 1)
    #[arg(long, value_name = "RATIO", default_value = "0.5")]
    pub overlap: f32,

    /// Analysis window length (samples, even)
    #[arg(long, value_name = "SAMPLES", default_value = "2048")]
    pub window_size: usize,

    /// Spectrum rows kept on screen
    #[arg(long, value_name = "ROWS", default_value = "64")]
    pub history: usize,

    /// Window function: hann (default), rectangular
    #[arg(long, value_name = "FUNCTION", default_value = "hann")]
    pub window_function: String,

    /// Vertex scale: identity (default), exponential, logarithmic
    #[arg(long, value_name = "SCALE", default_value = "identity")]
    pub scale: String,

    /// Visual style: surface (default), lines, points, circle, spiral
    #[arg(long, value_name = "STYLE", default_value = "surface")]
    pub style: String,

    /// Raster mode: fill (default), line, point
    #[arg(long, value_name = "MODE", default_value = "fill")]
    pub raster: String,

    /// Initial window width (pixels)
    #[arg(long, value_name = "PIXELS", default_value = "1000")]
    pub width: u32,

    /// Initial window height (pixels)
    #[arg(long, value_name = "PIXELS", default_value = "600")]
    pub height: u32,

    /// Frames the GPU may queue ahead of presentation
    #[arg(long, value_name = "FRAMES", default_value = "2")]
    pub frames_in_flight: u32,
}

impl Args {
    /// Spectrum configuration built from the analysis flags
    pub fn spectrum_config(&self) -> SpectrumConfig {
        SpectrumConfig {
            window_size: self.window_size,
            overlap: self.overlap,
            history_rows: self.history,
            window_function: self.parse_window_function(),
            monitor: self.monitor,
            ..SpectrumConfig::default()
        }
    }

    /// Render configuration built from the window and scene flags
    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            window_width: self.width,
            window_height: self.height,
            frames_in_flight: self.frames_in_flight,
            scene: SceneSelection {
                style: self.parse_style(),
                raster: self.parse_raster(),
            },
            ..RenderConfig::default()
        }
    }

    pub fn parse_window_function(&self) -> WindowFunction {
        match self.window_function.to_lowercase().as_str() {
            "hann" => WindowFunction::Hann,
            "rectangular" | "none" => WindowFunction::Rectangular,
            other => {
                log::warn!("Unknown window function '{}', using hann", other);
                WindowFunction::Hann
            }
        }
    }

    pub fn parse_scale(&self) -> ScaleMap {
        ScaleMap::parse(&self.scale).unwrap_or_else(|| {
            log::warn!("Unknown scale '{}', using identity", self.scale);
            ScaleMap::Identity
        })
    }

    pub fn parse_style(&self) -> VisualStyle {
        VisualStyle::parse(&self.style).unwrap_or_else(|| {
            log::warn!("Unknown style '{}', using surface", self.style);
            VisualStyle::Surface
        })
    }

    pub fn parse_raster(&self) -> RasterMode {
        RasterMode::parse(&self.raster).unwrap_or_else(|| {
            log::warn!("Unknown raster mode '{}', using fill", self.raster);
            RasterMode::Fill
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_config_defaults() {
        let args = Args::parse_from(["audioscope"]);
        let spectrum = args.spectrum_config();
        let render = args.render_config();

        assert_eq!(spectrum.window_size, 2048);
        assert_eq!(spectrum.overlap, 0.5);
        assert_eq!(spectrum.history_rows, 64);
        assert!(!spectrum.monitor);
        assert_eq!(args.parse_scale(), ScaleMap::Identity);
        assert_eq!(render.scene, SceneSelection::default());
        assert_eq!(render.window_width, 1000);
        assert_eq!(render.window_height, 600);
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::parse_from([
            "audioscope",
            "--monitor",
            "--overlap",
            "0.75",
            "--scale",
            "logarithmic",
            "--style",
            "lines",
            "--raster",
            "point",
        ]);

        assert!(args.spectrum_config().monitor);
        assert_eq!(args.spectrum_config().hop(), 512);
        assert_eq!(args.parse_scale(), ScaleMap::Logarithmic);
        assert_eq!(args.parse_style(), VisualStyle::Lines);
        assert_eq!(args.parse_raster(), RasterMode::Point);
    }

    #[test]
    fn test_unknown_names_fall_back() {
        let args = Args::parse_from(["audioscope", "--scale", "cubic", "--style", "mesh"]);

        assert_eq!(args.parse_scale(), ScaleMap::Identity);
        assert_eq!(args.parse_style(), VisualStyle::Surface);
    }
}
