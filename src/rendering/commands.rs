//! Per-frame command composition.

use std::time::Instant;

use bytemuck::{Pod, Zeroable};

use super::backend::GraphicsBackend;
use super::swapchain::SurfaceResources;
use crate::camera::CameraSystem;
use crate::error::Result;
use crate::params::VisualStyle;
use crate::spectrum::SharedSpectrum;

/// Uniform buffer for the spectrum shader (transforms + history shape)
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Uniforms {
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    /// Points in the vertex buffer (rows × row length)
    pub vertex_count: u32,
    pub row_len: u32,
    /// Rows holding real data; the rest are leading zero rows
    pub row_count: u32,
    pub time: f32,
    /// `VisualStyle::shader_code` of the active style
    pub style: u32,
    pub _padding: [u32; 3],
}

/// Extra command sequences folded into each frame (e.g. a debug GUI)
pub trait OverlayRenderer<B: GraphicsBackend> {
    fn start_frame(&mut self);
    fn render(&mut self, frame_index: u64);
    fn command_buffers(&mut self, frame_index: u64) -> Vec<B::OverlayCommands>;
}

/// Overlay that draws nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOverlay;

impl<B: GraphicsBackend> OverlayRenderer<B> for NoOverlay {
    fn start_frame(&mut self) {}

    fn render(&mut self, _frame_index: u64) {}

    fn command_buffers(&mut self, _frame_index: u64) -> Vec<B::OverlayCommands> {
        Vec::new()
    }
}

/// Builds one frame's primary commands around the pre-recorded scene
pub struct CommandComposer<O> {
    overlay: O,
    camera: CameraSystem,
    started: Instant,
}

impl<O> CommandComposer<O> {
    pub fn new(overlay: O, camera: CameraSystem) -> Self {
        Self {
            overlay,
            camera,
            started: Instant::now(),
        }
    }

    /// Run the overlay, upload the history and uniforms, then record `image`'s commands
    pub fn compose<B>(
        &mut self,
        backend: &mut B,
        resources: &mut SurfaceResources<B>,
        image: usize,
        frame_index: u64,
        style: VisualStyle,
        shared: &SharedSpectrum,
    ) -> Result<()>
    where
        B: GraphicsBackend,
        O: OverlayRenderer<B>,
    {
        self.overlay.start_frame();
        self.overlay.render(frame_index);
        let overlay = self.overlay.command_buffers(frame_index);

        let (layout, row_count) = {
            let state = shared.lock();
            let (oldest, newest) = state.history.as_slices();
            backend.upload_vertices(oldest, newest);
            (state.history.layout(), state.history.row_count())
        };

        let time_s = self.started.elapsed().as_secs_f32();
        let uniforms = self
            .camera
            .uniforms(time_s, resources.extent, layout, row_count, style);
        backend.write_uniforms(image, &uniforms);

        backend.record_frame(resources, image, overlay)
    }
}
