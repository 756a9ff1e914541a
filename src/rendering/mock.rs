//! Scripted in-memory backend for scheduler and lifecycle tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::backend::{Acquire, Extent, GraphicsBackend, Present};
use super::commands::Uniforms;
use super::swapchain::SurfaceResources;
use crate::error::{Error, Result};
use crate::params::SceneSelection;
use crate::spectrum::Vertex;

/// Ordered log of backend calls and resource drops
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn log(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    /// First two words of every entry ("create surface 800x600" → "create surface")
    pub fn kinds(&self) -> Vec<String> {
        self.0
            .lock()
            .iter()
            .map(|entry| entry.split(' ').take(2).collect::<Vec<_>>().join(" "))
            .collect()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

/// Resource that records its own drop
#[derive(Debug)]
pub struct Tracked {
    kind: &'static str,
    journal: Journal,
}

impl Tracked {
    fn new(kind: &'static str, journal: &Journal) -> Self {
        Self {
            kind,
            journal: journal.clone(),
        }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.journal.log(format!("drop {}", self.kind));
    }
}

pub struct MockSurface {
    _tracked: Tracked,
    next_image: usize,
    image_count: usize,
}

pub struct MockImages {
    _tracked: Tracked,
    count: usize,
}

pub struct MockPipeline {
    _tracked: Tracked,
    pub selection: SceneSelection,
}

pub struct MockCommands {
    _tracked: Tracked,
    /// Images with a recorded, not yet submitted frame
    recorded: Vec<bool>,
}

#[derive(Debug, Clone)]
pub struct MockFence {
    pub id: u64,
    signaled: Arc<AtomicBool>,
}

impl MockFence {
    pub fn is_signaled(&self) -> bool {
        self.signaled.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockSemaphore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockOverlayCommands(pub u64);

/// Backend whose GPU completes every submission immediately
pub struct MockBackend {
    pub journal: Journal,
    pub window: Extent,
    pub image_count: usize,
    /// Acquire calls (0-based) that report an out-of-date surface
    pub out_of_date_on: Vec<u64>,
    /// Acquire calls (0-based) where no image arrives in time
    pub timeout_on: Vec<u64>,
    /// Present calls (0-based) that report a suboptimal surface
    pub suboptimal_on: Vec<u64>,
    /// Upcoming surface creations that fail
    pub failing_builds: u32,
    /// Leave submitted fences unsignaled (a hung GPU)
    pub hold_submissions: bool,
    pub indices: Vec<u32>,
    pub uploaded_points: usize,
    pub uniforms: Option<Uniforms>,
    pub overlay_seen: Vec<u64>,
    acquires: u64,
    presents: u64,
    next_fence: u64,
}

impl MockBackend {
    pub fn new(window: Extent) -> Self {
        Self {
            journal: Journal::default(),
            window,
            image_count: 3,
            out_of_date_on: Vec::new(),
            timeout_on: Vec::new(),
            suboptimal_on: Vec::new(),
            failing_builds: 0,
            hold_submissions: false,
            indices: Vec::new(),
            uploaded_points: 0,
            uniforms: None,
            overlay_seen: Vec::new(),
            acquires: 0,
            presents: 0,
            next_fence: 0,
        }
    }

    pub fn presents(&self) -> u64 {
        self.presents
    }
}

impl GraphicsBackend for MockBackend {
    type Surface = MockSurface;
    type Images = MockImages;
    type DepthBuffer = Tracked;
    type RenderTarget = Tracked;
    type Pipeline = MockPipeline;
    type Framebuffers = Tracked;
    type CommandBuffers = MockCommands;
    type Semaphore = MockSemaphore;
    type Fence = MockFence;
    type OverlayCommands = MockOverlayCommands;

    fn create_surface(&mut self, extent: Extent) -> Result<MockSurface> {
        if self.failing_builds > 0 {
            self.failing_builds -= 1;
            self.journal
                .log(format!("fail surface {}x{}", extent.width, extent.height));
            return Err(Error::Resource("surface creation refused".to_string()));
        }
        self.journal
            .log(format!("create surface {}x{}", extent.width, extent.height));
        Ok(MockSurface {
            _tracked: Tracked::new("surface", &self.journal),
            next_image: 0,
            image_count: self.image_count,
        })
    }

    fn create_images(&mut self, surface: &MockSurface) -> Result<MockImages> {
        self.journal.log("create images");
        Ok(MockImages {
            _tracked: Tracked::new("images", &self.journal),
            count: surface.image_count,
        })
    }

    fn image_count(&self, images: &MockImages) -> usize {
        images.count
    }

    fn create_depth_buffer(&mut self, _surface: &MockSurface) -> Result<Tracked> {
        self.journal.log("create depth");
        Ok(Tracked::new("depth", &self.journal))
    }

    fn create_render_target(&mut self, _surface: &MockSurface) -> Result<Tracked> {
        self.journal.log("create target");
        Ok(Tracked::new("target", &self.journal))
    }

    fn create_pipeline(
        &mut self,
        _target: &Tracked,
        selection: SceneSelection,
    ) -> Result<MockPipeline> {
        self.journal.log(format!(
            "create pipeline {}/{}",
            selection.style.name(),
            selection.raster.name()
        ));
        Ok(MockPipeline {
            _tracked: Tracked::new("pipeline", &self.journal),
            selection,
        })
    }

    fn create_framebuffers(
        &mut self,
        _images: &MockImages,
        _depth: &Tracked,
        _target: &Tracked,
    ) -> Result<Tracked> {
        self.journal.log("create framebuffers");
        Ok(Tracked::new("framebuffers", &self.journal))
    }

    fn create_command_buffers(&mut self, count: usize) -> Result<MockCommands> {
        self.journal.log(format!("create commands {}", count));
        Ok(MockCommands {
            _tracked: Tracked::new("commands", &self.journal),
            recorded: vec![false; count],
        })
    }

    fn record_scene(&mut self, resources: &mut SurfaceResources<Self>) -> Result<()> {
        self.journal.log(format!(
            "record scene {}",
            resources.pipeline.selection.style.name()
        ));
        Ok(())
    }

    fn upload_indices(&mut self, indices: &[u32]) -> Result<()> {
        self.journal.log(format!("upload indices {}", indices.len()));
        self.indices = indices.to_vec();
        Ok(())
    }

    fn create_semaphore(&mut self) -> Result<MockSemaphore> {
        Ok(MockSemaphore)
    }

    fn create_fence(&mut self, signaled: bool) -> Result<MockFence> {
        self.next_fence += 1;
        Ok(MockFence {
            id: self.next_fence,
            signaled: Arc::new(AtomicBool::new(signaled)),
        })
    }

    fn wait_fence(&mut self, fence: &MockFence, _timeout: Duration) -> Result<bool> {
        self.journal.log(format!("wait fence {}", fence.id));
        Ok(fence.is_signaled())
    }

    fn reset_fence(&mut self, fence: &MockFence) {
        fence.signaled.store(false, Ordering::SeqCst);
    }

    fn wait_idle(&mut self) -> Result<()> {
        self.journal.log("wait idle");
        Ok(())
    }

    fn surface_extent(&self) -> Extent {
        self.journal.log("query extent");
        self.window
    }

    fn acquire(
        &mut self,
        resources: &mut SurfaceResources<Self>,
        _signal: &MockSemaphore,
        _timeout: Duration,
    ) -> Result<Acquire> {
        let call = self.acquires;
        self.acquires += 1;
        if self.out_of_date_on.contains(&call) {
            return Ok(Acquire::OutOfDate);
        }
        if self.timeout_on.contains(&call) {
            return Ok(Acquire::Timeout);
        }
        let surface = &mut resources.surface;
        let image = surface.next_image;
        surface.next_image = (surface.next_image + 1) % surface.image_count;
        Ok(Acquire::Ready(image))
    }

    fn upload_vertices(&mut self, oldest: &[Vertex], newest: &[Vertex]) {
        self.uploaded_points = oldest.len() + newest.len();
    }

    fn write_uniforms(&mut self, _image: usize, uniforms: &Uniforms) {
        self.uniforms = Some(*uniforms);
    }

    fn record_frame(
        &mut self,
        resources: &mut SurfaceResources<Self>,
        image: usize,
        overlay: Vec<MockOverlayCommands>,
    ) -> Result<()> {
        self.overlay_seen
            .extend(overlay.into_iter().map(|MockOverlayCommands(frame)| frame));
        resources.commands.recorded[image] = true;
        Ok(())
    }

    fn submit(
        &mut self,
        resources: &mut SurfaceResources<Self>,
        image: usize,
        _wait: &MockSemaphore,
        _signal: &MockSemaphore,
        fence: &MockFence,
    ) -> Result<()> {
        if !std::mem::take(&mut resources.commands.recorded[image]) {
            return Err(crate::error::ProtocolViolation::NoAcquiredImage.into());
        }
        if !self.hold_submissions {
            fence.signaled.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    fn present(
        &mut self,
        _resources: &mut SurfaceResources<Self>,
        _image: usize,
        _wait: &MockSemaphore,
    ) -> Result<Present> {
        let call = self.presents;
        self.presents += 1;
        if self.suboptimal_on.contains(&call) {
            return Ok(Present::Suboptimal);
        }
        Ok(Present::Presented)
    }
}
