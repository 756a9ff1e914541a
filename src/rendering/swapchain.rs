//! Surface-dependent resources and their rebuild state machine.

use super::backend::{Acquire, Extent, FrameSlots, GraphicsBackend};
use crate::error::{Error, Result};
use crate::params::SceneSelection;

use std::time::Duration;

/// Whether frames may be acquired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapchainState {
    Valid,

    /// Resources are torn down; waiting for a usable surface size
    Recreating,
}

/// Every resource whose shape follows the surface
///
/// Fields are declared in teardown order, so a plain drop releases them the same way
/// [`SurfaceResources::release`] does.
pub struct SurfaceResources<B: GraphicsBackend> {
    pub commands: B::CommandBuffers,
    pub framebuffers: B::Framebuffers,
    pub pipeline: B::Pipeline,
    pub target: B::RenderTarget,
    pub depth: B::DepthBuffer,
    pub images: B::Images,
    pub surface: B::Surface,
    pub extent: Extent,
    pub image_count: usize,
}

impl<B: GraphicsBackend> SurfaceResources<B> {
    /// Build everything for `extent` and record the scene commands
    pub fn build(backend: &mut B, extent: Extent, selection: SceneSelection) -> Result<Self> {
        let surface = backend.create_surface(extent)?;
        let images = backend.create_images(&surface)?;
        let image_count = backend.image_count(&images);
        let depth = backend.create_depth_buffer(&surface)?;
        let target = backend.create_render_target(&surface)?;
        let pipeline = backend.create_pipeline(&target, selection)?;
        let framebuffers = backend.create_framebuffers(&images, &depth, &target)?;
        let commands = backend.create_command_buffers(image_count)?;

        let mut resources = Self {
            commands,
            framebuffers,
            pipeline,
            target,
            depth,
            images,
            surface,
            extent,
            image_count,
        };
        backend.record_scene(&mut resources)?;
        Ok(resources)
    }

    /// Release in teardown order
    pub fn release(self) {
        let Self {
            commands,
            framebuffers,
            pipeline,
            target,
            depth,
            images,
            surface,
            ..
        } = self;
        drop(commands);
        drop(framebuffers);
        drop(pipeline);
        drop(target);
        drop(depth);
        drop(images);
        drop(surface);
    }
}

/// Owner of the surface resources and the Valid/Recreating state
pub struct SwapchainLifecycle<B: GraphicsBackend> {
    resources: Option<SurfaceResources<B>>,
    state: SwapchainState,
    /// Size requested by a resize or presentation failure
    pending: Option<Extent>,
    last_good: Option<Extent>,
    selection: SceneSelection,
    max_attempts: u32,
    recreations: u64,
}

impl<B: GraphicsBackend> SwapchainLifecycle<B> {
    /// Initial build; any failure here is fatal
    ///
    /// A zero-sized surface leaves the lifecycle in `Recreating` until a resize arrives.
    pub fn create(
        backend: &mut B,
        extent: Extent,
        selection: SceneSelection,
        max_attempts: u32,
    ) -> Result<Self> {
        let mut lifecycle = Self {
            resources: None,
            state: SwapchainState::Recreating,
            pending: None,
            last_good: None,
            selection,
            max_attempts: max_attempts.max(1),
            recreations: 0,
        };
        if extent.is_empty() {
            log::debug!("Surface is zero-sized at startup, deferring creation");
            return Ok(lifecycle);
        }

        lifecycle.resources = Some(SurfaceResources::build(backend, extent, selection)?);
        lifecycle.state = SwapchainState::Valid;
        lifecycle.last_good = Some(extent);
        Ok(lifecycle)
    }

    pub fn state(&self) -> SwapchainState {
        self.state
    }

    pub fn is_valid(&self) -> bool {
        self.state == SwapchainState::Valid
    }

    pub fn resources(&self) -> Option<&SurfaceResources<B>> {
        self.resources.as_ref()
    }

    pub fn resources_mut(&mut self) -> Option<&mut SurfaceResources<B>> {
        self.resources.as_mut()
    }

    pub fn extent(&self) -> Option<Extent> {
        self.resources.as_ref().map(|resources| resources.extent)
    }

    pub fn image_count(&self) -> Option<usize> {
        self.resources.as_ref().map(|resources| resources.image_count)
    }

    pub fn selection(&self) -> SceneSelection {
        self.selection
    }

    /// Completed rebuilds since creation
    pub fn recreations(&self) -> u64 {
        self.recreations
    }

    /// Schedule a rebuild before the next frame; later requests replace earlier ones
    pub fn request_recreate(&mut self, extent: Extent) {
        self.pending = Some(extent);
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Run a scheduled rebuild, if any
    pub fn recreate_pending(
        &mut self,
        backend: &mut B,
        slots: &mut FrameSlots<B>,
    ) -> Result<SwapchainState> {
        match self.pending.take() {
            Some(extent) => self.recreate(backend, extent, slots, None),
            None => Ok(self.state),
        }
    }

    /// Tear down and rebuild every surface resource at `extent`
    ///
    /// `affected` names a slot whose guard was reset without a submission; it gets a
    /// fresh signaled guard. The slot array is rebuilt instead when the image count
    /// changes. Build failures are retried at the last good size until the attempt
    /// limit is reached.
    pub fn recreate(
        &mut self,
        backend: &mut B,
        extent: Extent,
        slots: &mut FrameSlots<B>,
        affected: Option<usize>,
    ) -> Result<SwapchainState> {
        backend.wait_idle()?;
        self.pending = None;
        self.state = SwapchainState::Recreating;
        if let Some(resources) = self.resources.take() {
            resources.release();
        }

        if extent.is_empty() {
            log::debug!("Surface is zero-sized, waiting for a resize");
            if let Some(index) = affected {
                slots.replace_guard(backend, index)?;
            }
            return Ok(self.state);
        }

        let mut size = extent;
        let mut attempts = 0;
        let resources = loop {
            attempts += 1;
            match SurfaceResources::build(backend, size, self.selection) {
                Ok(resources) => break resources,
                Err(e) if attempts >= self.max_attempts => {
                    return Err(Error::RecreateExhausted {
                        attempts,
                        last: e.to_string(),
                    });
                }
                Err(e) => {
                    size = self.last_good.unwrap_or(size);
                    log::warn!(
                        "Surface rebuild attempt {} failed ({}), retrying at {}x{}",
                        attempts,
                        e,
                        size.width,
                        size.height
                    );
                }
            }
        };

        let image_count = resources.image_count;
        self.resources = Some(resources);
        self.state = SwapchainState::Valid;
        self.last_good = Some(size);
        self.recreations += 1;

        if image_count != slots.len() {
            log::debug!(
                "Image count changed {} -> {}, rebuilding frame slots",
                slots.len(),
                image_count
            );
            *slots = FrameSlots::new(backend, image_count)?;
        } else if let Some(index) = affected {
            slots.replace_guard(backend, index)?;
        }

        log::debug!(
            "Surface rebuilt at {}x{} ({} images)",
            size.width,
            size.height,
            image_count
        );
        Ok(self.state)
    }

    /// Rebuild only the pipeline and the scene commands for a new selection
    ///
    /// Without a live surface the selection is stored and used by the next build.
    pub fn rebuild_scene(&mut self, backend: &mut B, selection: SceneSelection) -> Result<()> {
        self.selection = selection;
        let Some(resources) = self.resources.as_mut() else {
            return Ok(());
        };

        backend.wait_idle()?;
        resources.pipeline = backend.create_pipeline(&resources.target, selection)?;
        backend.record_scene(resources)
    }

    /// Ask the backend for the next image; `NotReady` while rebuilding
    pub fn acquire(
        &mut self,
        backend: &mut B,
        signal: &B::Semaphore,
        timeout: Duration,
    ) -> Result<Acquire> {
        match (self.state, self.resources.as_mut()) {
            (SwapchainState::Valid, Some(resources)) => backend.acquire(resources, signal, timeout),
            _ => Ok(Acquire::NotReady),
        }
    }

    /// Release every surface resource in teardown order
    pub fn teardown(&mut self, backend: &mut B) -> Result<()> {
        backend.wait_idle()?;
        self.state = SwapchainState::Recreating;
        self.pending = None;
        if let Some(resources) = self.resources.take() {
            resources.release();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::mock::MockBackend;

    fn valid_lifecycle(backend: &mut MockBackend) -> SwapchainLifecycle<MockBackend> {
        SwapchainLifecycle::create(backend, Extent::new(800, 600), SceneSelection::default(), 3)
            .unwrap()
    }

    fn build_order() -> Vec<&'static str> {
        vec![
            "create surface",
            "create images",
            "create depth",
            "create target",
            "create pipeline",
            "create framebuffers",
            "create commands",
            "record scene",
        ]
    }

    fn teardown_order() -> Vec<&'static str> {
        vec![
            "drop commands",
            "drop framebuffers",
            "drop pipeline",
            "drop target",
            "drop depth",
            "drop images",
            "drop surface",
        ]
    }

    #[test]
    fn test_create_builds_in_order() {
        let mut backend = MockBackend::new(Extent::new(800, 600));
        let lifecycle = valid_lifecycle(&mut backend);

        assert!(lifecycle.is_valid());
        assert_eq!(lifecycle.image_count(), Some(3));
        assert_eq!(backend.journal.kinds(), build_order());
    }

    #[test]
    fn test_recreate_tears_down_then_rebuilds_in_order() {
        let mut backend = MockBackend::new(Extent::new(800, 600));
        let mut lifecycle = valid_lifecycle(&mut backend);
        let mut slots = FrameSlots::new(&mut backend, 3).unwrap();
        backend.journal.clear();

        let state = lifecycle
            .recreate(&mut backend, Extent::new(1024, 768), &mut slots, None)
            .unwrap();

        assert_eq!(state, SwapchainState::Valid);
        let mut expected = vec!["wait idle"];
        expected.extend(teardown_order());
        expected.extend(build_order());
        assert_eq!(backend.journal.kinds(), expected);
        assert_eq!(lifecycle.extent(), Some(Extent::new(1024, 768)));
        assert_eq!(lifecycle.recreations(), 1);
    }

    #[test]
    fn test_recreate_is_idempotent() {
        let mut backend = MockBackend::new(Extent::new(800, 600));
        let mut lifecycle = valid_lifecycle(&mut backend);
        let mut slots = FrameSlots::new(&mut backend, 3).unwrap();

        lifecycle
            .recreate(&mut backend, Extent::new(640, 480), &mut slots, None)
            .unwrap();
        let first = (lifecycle.extent(), lifecycle.image_count(), slots.len());
        lifecycle
            .recreate(&mut backend, Extent::new(640, 480), &mut slots, None)
            .unwrap();
        let second = (lifecycle.extent(), lifecycle.image_count(), slots.len());

        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_extent_stays_recreating() {
        let mut backend = MockBackend::new(Extent::new(800, 600));
        let mut lifecycle = valid_lifecycle(&mut backend);
        let mut slots = FrameSlots::new(&mut backend, 3).unwrap();
        let semaphore = backend.create_semaphore().unwrap();

        let state = lifecycle
            .recreate(&mut backend, Extent::new(0, 0), &mut slots, None)
            .unwrap();

        assert_eq!(state, SwapchainState::Recreating);
        assert!(lifecycle.resources().is_none());
        let acquired = lifecycle
            .acquire(&mut backend, &semaphore, Duration::from_millis(10))
            .unwrap();
        assert_eq!(acquired, Acquire::NotReady);

        lifecycle.request_recreate(Extent::new(800, 600));
        assert_eq!(
            lifecycle.recreate_pending(&mut backend, &mut slots).unwrap(),
            SwapchainState::Valid
        );
    }

    #[test]
    fn test_rebuild_scene_touches_only_pipeline() {
        let mut backend = MockBackend::new(Extent::new(800, 600));
        let mut lifecycle = valid_lifecycle(&mut backend);
        backend.journal.clear();

        let selection = SceneSelection {
            raster: crate::params::RasterMode::Line,
            ..Default::default()
        };
        lifecycle.rebuild_scene(&mut backend, selection).unwrap();

        assert_eq!(
            backend.journal.kinds(),
            vec!["wait idle", "create pipeline", "drop pipeline", "record scene"]
        );
        assert_eq!(lifecycle.selection(), selection);
    }

    #[test]
    fn test_teardown_releases_in_order() {
        let mut backend = MockBackend::new(Extent::new(800, 600));
        let mut lifecycle = valid_lifecycle(&mut backend);
        backend.journal.clear();

        lifecycle.teardown(&mut backend).unwrap();

        let mut expected = vec!["wait idle"];
        expected.extend(teardown_order());
        assert_eq!(backend.journal.kinds(), expected);
        assert_eq!(lifecycle.state(), SwapchainState::Recreating);
    }
}
