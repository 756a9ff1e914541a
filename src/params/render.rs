//! Rendering and presentation configuration.

use std::time::Duration;

use crate::error::{Error, Result};

/// How primitives are rasterized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RasterMode {
    #[default]
    Fill,
    Line,
    Point,
}

impl RasterMode {
    pub const ALL: [RasterMode; 3] = [RasterMode::Fill, RasterMode::Line, RasterMode::Point];

    pub fn name(self) -> &'static str {
        match self {
            RasterMode::Fill => "fill",
            RasterMode::Line => "line",
            RasterMode::Point => "point",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.name().eq_ignore_ascii_case(name))
    }

    /// Next mode in cycling order (keyboard control)
    pub fn next(self) -> Self {
        match self {
            RasterMode::Fill => RasterMode::Line,
            RasterMode::Line => RasterMode::Point,
            RasterMode::Point => RasterMode::Fill,
        }
    }
}

/// Index topology the history grid is drawn with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisualStyle {
    /// Triangulated rows × bins grid
    #[default]
    Surface,

    /// One polyline per row
    Lines,

    /// Every bin as a point
    Points,

    /// Rows as concentric rings around a filled centre, newest outermost
    Circle,

    /// The flattened history as one ribbon winding outward
    Spiral,
}

impl VisualStyle {
    pub const ALL: [VisualStyle; 5] = [
        VisualStyle::Surface,
        VisualStyle::Lines,
        VisualStyle::Points,
        VisualStyle::Circle,
        VisualStyle::Spiral,
    ];

    pub fn name(self) -> &'static str {
        match self {
            VisualStyle::Surface => "surface",
            VisualStyle::Lines => "lines",
            VisualStyle::Points => "points",
            VisualStyle::Circle => "circle",
            VisualStyle::Spiral => "spiral",
        }
    }

    /// Value of the shader's `style` uniform
    pub fn shader_code(self) -> u32 {
        match self {
            VisualStyle::Surface => 0,
            VisualStyle::Lines => 1,
            VisualStyle::Points => 2,
            VisualStyle::Circle => 3,
            VisualStyle::Spiral => 4,
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|style| style.name().eq_ignore_ascii_case(name))
    }

    pub fn next(self) -> Self {
        match self {
            VisualStyle::Surface => VisualStyle::Lines,
            VisualStyle::Lines => VisualStyle::Points,
            VisualStyle::Points => VisualStyle::Circle,
            VisualStyle::Circle => VisualStyle::Spiral,
            VisualStyle::Spiral => VisualStyle::Surface,
        }
    }
}

/// Everything the scene command sequence depends on besides the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SceneSelection {
    pub style: VisualStyle,
    pub raster: RasterMode,
}

/// Rendering configuration
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Window width (pixels)
    pub window_width: u32,

    /// Window height (pixels)
    pub window_height: u32,

    /// Frames the GPU may work on ahead of presentation
    /// Surface image count (and frame slot count) is this plus one
    pub frames_in_flight: u32,

    /// Longest wait on a frame slot's in-flight guard (milliseconds)
    /// Exceeding it is a protocol violation, not a stall to ride out
    pub guard_timeout_ms: u64,

    /// Longest wait for a presentable surface image (milliseconds)
    pub acquire_timeout_ms: u64,

    /// Surface rebuild attempts (first try + retries at the last good size)
    pub max_recreate_attempts: u32,

    /// Initial scene selection
    pub scene: SceneSelection,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_width: 1000,
            window_height: 600,
            frames_in_flight: 2,
            guard_timeout_ms: 2000,
            acquire_timeout_ms: 2000,
            max_recreate_attempts: 3,
            scene: SceneSelection::default(),
        }
    }
}

impl RenderConfig {
    pub fn guard_timeout(&self) -> Duration {
        Duration::from_millis(self.guard_timeout_ms)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.frames_in_flight == 0 {
            return Err(Error::Config("need at least one frame in flight".to_string()));
        }
        if self.max_recreate_attempts == 0 {
            return Err(Error::Config(
                "need at least one surface rebuild attempt".to_string(),
            ));
        }
        if self.guard_timeout_ms == 0 || self.acquire_timeout_ms == 0 {
            return Err(Error::Config("timeouts must be non-zero".to_string()));
        }
        Ok(())
    }
}
