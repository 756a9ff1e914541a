//! Graphics backend seam and per-frame synchronization slots.

use std::time::Duration;

use super::commands::Uniforms;
use super::swapchain::SurfaceResources;
use crate::error::Result;
use crate::params::SceneSelection;
use crate::spectrum::Vertex;

/// Surface size in physical pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A minimised window reports a zero dimension
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            return 1.0;
        }
        self.width as f32 / self.height as f32
    }
}

/// Outcome of asking the surface for the next image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    /// Image index ready for rendering
    Ready(usize),

    /// The surface no longer matches the window
    OutOfDate,

    /// No surface to acquire from (rebuild pending)
    NotReady,

    /// No image became available within the bound
    Timeout,
}

/// Outcome of queueing an image for presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Present {
    Presented,

    /// Shown, but the surface should be rebuilt
    Suboptimal,

    /// Shown or dropped; the surface must be rebuilt
    OutOfDate,
}

/// Everything the frame loop needs from a GPU API
///
/// Creation methods mirror the order surface resources are built in. Out-of-date
/// surfaces are reported through [`Acquire`] and [`Present`], never as errors.
pub trait GraphicsBackend: Sized {
    type Surface;
    type Images;
    type DepthBuffer;
    type RenderTarget;
    type Pipeline;
    type Framebuffers;
    type CommandBuffers;
    type Semaphore;
    type Fence;
    type OverlayCommands;

    fn create_surface(&mut self, extent: Extent) -> Result<Self::Surface>;
    fn create_images(&mut self, surface: &Self::Surface) -> Result<Self::Images>;
    fn image_count(&self, images: &Self::Images) -> usize;
    fn create_depth_buffer(&mut self, surface: &Self::Surface) -> Result<Self::DepthBuffer>;
    fn create_render_target(&mut self, surface: &Self::Surface) -> Result<Self::RenderTarget>;
    fn create_pipeline(
        &mut self,
        target: &Self::RenderTarget,
        selection: SceneSelection,
    ) -> Result<Self::Pipeline>;
    fn create_framebuffers(
        &mut self,
        images: &Self::Images,
        depth: &Self::DepthBuffer,
        target: &Self::RenderTarget,
    ) -> Result<Self::Framebuffers>;
    fn create_command_buffers(&mut self, count: usize) -> Result<Self::CommandBuffers>;

    /// Record the rarely-changing scene commands (draw of the history grid)
    fn record_scene(&mut self, resources: &mut SurfaceResources<Self>) -> Result<()>;

    /// Replace the index list drawn by the scene
    fn upload_indices(&mut self, indices: &[u32]) -> Result<()>;

    fn create_semaphore(&mut self) -> Result<Self::Semaphore>;
    fn create_fence(&mut self, signaled: bool) -> Result<Self::Fence>;

    /// Block until `fence` is signaled; false if `timeout` elapsed first
    fn wait_fence(&mut self, fence: &Self::Fence, timeout: Duration) -> Result<bool>;
    fn reset_fence(&mut self, fence: &Self::Fence);

    /// Wait for all submitted GPU work
    fn wait_idle(&mut self) -> Result<()>;

    /// Size of the window the surface presents to
    ///
    /// Only called while the scheduler is built, on the thread that owns the window;
    /// later sizes arrive through resize notifications.
    fn surface_extent(&self) -> Extent;

    fn acquire(
        &mut self,
        resources: &mut SurfaceResources<Self>,
        signal: &Self::Semaphore,
        timeout: Duration,
    ) -> Result<Acquire>;

    /// Upload the history as two runs that together form the vertex buffer
    fn upload_vertices(&mut self, oldest: &[Vertex], newest: &[Vertex]);
    fn write_uniforms(&mut self, image: usize, uniforms: &Uniforms);

    /// Record the per-frame primary commands for `image`
    fn record_frame(
        &mut self,
        resources: &mut SurfaceResources<Self>,
        image: usize,
        overlay: Vec<Self::OverlayCommands>,
    ) -> Result<()>;

    fn submit(
        &mut self,
        resources: &mut SurfaceResources<Self>,
        image: usize,
        wait: &Self::Semaphore,
        signal: &Self::Semaphore,
        fence: &Self::Fence,
    ) -> Result<()>;

    fn present(
        &mut self,
        resources: &mut SurfaceResources<Self>,
        image: usize,
        wait: &Self::Semaphore,
    ) -> Result<Present>;
}

/// Synchronization objects of one frame in flight
pub struct FrameSlot<B: GraphicsBackend> {
    pub image_ready: B::Semaphore,
    pub render_finished: B::Semaphore,
    /// Signaled when the GPU finished the last submission that used this slot
    pub in_flight: B::Fence,
}

impl<B: GraphicsBackend> FrameSlot<B> {
    fn new(backend: &mut B) -> Result<Self> {
        Ok(Self {
            image_ready: backend.create_semaphore()?,
            render_finished: backend.create_semaphore()?,
            in_flight: backend.create_fence(true)?,
        })
    }
}

/// Rotating array of frame slots, one per surface image
pub struct FrameSlots<B: GraphicsBackend> {
    slots: Vec<FrameSlot<B>>,
}

impl<B: GraphicsBackend> FrameSlots<B> {
    pub fn new(backend: &mut B, count: usize) -> Result<Self> {
        let slots = (0..count.max(1))
            .map(|_| FrameSlot::new(backend))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { slots })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> &FrameSlot<B> {
        &self.slots[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = &FrameSlot<B>> {
        self.slots.iter()
    }

    /// Swap the slot's guard for a fresh, signaled one
    ///
    /// Used when the slot's guard was reset but nothing was submitted to signal it.
    pub fn replace_guard(&mut self, backend: &mut B, index: usize) -> Result<()> {
        self.slots[index].in_flight = backend.create_fence(true)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extent_empty_and_aspect() {
        assert!(Extent::new(0, 600).is_empty());
        assert!(Extent::new(800, 0).is_empty());
        assert!(!Extent::new(800, 600).is_empty());

        assert!((Extent::new(1000, 500).aspect_ratio() - 2.0).abs() < 1e-6);
        assert_eq!(Extent::new(1000, 0).aspect_ratio(), 1.0);
    }
}
