//! The acquire → compose → submit → present loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam::channel::Receiver;

use super::backend::{Acquire, Extent, FrameSlots, GraphicsBackend, Present};
use super::commands::{CommandComposer, NoOverlay, OverlayRenderer};
use super::indices;
use super::swapchain::SwapchainLifecycle;
use super::thread::RenderControl;
use crate::camera::CameraSystem;
use crate::error::{ProtocolViolation, Result};
use crate::params::{CameraParams, RenderConfig, SceneSelection};
use crate::spectrum::{HistoryLayout, SharedSpectrum};

/// Pause between turns while no frame can be produced (minimised window)
const IDLE_BACKOFF: Duration = Duration::from_millis(16);

/// What one loop turn did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Frame `frame` was submitted and presented using `slot`
    Presented { frame: u64, slot: usize },

    /// Frame `frame` hit an out-of-date surface in `slot` and rebuilt it
    Recreated { frame: u64, slot: usize },

    /// No surface to render to; nothing advanced
    Skipped,
}

/// Drives frames over N rotating slots; frame k uses slot k mod N
pub struct FrameScheduler<B: GraphicsBackend, O = NoOverlay> {
    backend: B,
    lifecycle: SwapchainLifecycle<B>,
    slots: FrameSlots<B>,
    composer: CommandComposer<O>,
    slot: usize,
    frame: u64,
    guard_timeout: Duration,
    acquire_timeout: Duration,
    layout: HistoryLayout,
    /// Latest window size reported through `resize`
    window_extent: Extent,
}

impl<B, O> FrameScheduler<B, O>
where
    B: GraphicsBackend,
    O: OverlayRenderer<B>,
{
    pub fn new(
        mut backend: B,
        overlay: O,
        config: &RenderConfig,
        camera: CameraParams,
        layout: HistoryLayout,
    ) -> Result<Self> {
        backend.upload_indices(&indices::generate(config.scene.style, layout))?;

        let extent = backend.surface_extent();
        let lifecycle = SwapchainLifecycle::create(
            &mut backend,
            extent,
            config.scene,
            config.max_recreate_attempts,
        )?;
        let slot_count = lifecycle
            .image_count()
            .unwrap_or(config.frames_in_flight as usize + 1);
        let slots = FrameSlots::new(&mut backend, slot_count)?;

        log::info!(
            "Renderer: {}x{}, {} frame slots, {} / {}",
            extent.width,
            extent.height,
            slots.len(),
            config.scene.style.name(),
            config.scene.raster.name()
        );

        Ok(Self {
            backend,
            lifecycle,
            slots,
            composer: CommandComposer::new(overlay, CameraSystem::new(camera)),
            slot: 0,
            frame: 0,
            guard_timeout: config.guard_timeout(),
            acquire_timeout: config.acquire_timeout(),
            layout,
            window_extent: extent,
        })
    }

    /// Frames started so far (presented or recreated)
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Slot the next frame will use
    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn slots(&self) -> &FrameSlots<B> {
        &self.slots
    }

    pub fn lifecycle(&self) -> &SwapchainLifecycle<B> {
        &self.lifecycle
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Schedule a surface rebuild before the next frame
    ///
    /// `extent` also becomes the size used when the surface later goes out of date, so
    /// the render thread never has to query the window itself.
    pub fn resize(&mut self, extent: Extent) {
        self.window_extent = extent;
        self.lifecycle.request_recreate(extent);
    }

    /// One WaitForSlot → Acquire → Compose → Submit → Present → Advance pass
    pub fn turn(&mut self, shared: &SharedSpectrum) -> Result<TurnOutcome> {
        if self.lifecycle.has_pending() {
            self.lifecycle
                .recreate_pending(&mut self.backend, &mut self.slots)?;
            self.slot %= self.slots.len();
        }
        if !self.lifecycle.is_valid() {
            return Ok(TurnOutcome::Skipped);
        }

        let slot = self.slot;
        let frame = self.frame;

        let guard = &self.slots.get(slot).in_flight;
        if !self.backend.wait_fence(guard, self.guard_timeout)? {
            return Err(ProtocolViolation::GuardTimeout {
                slot,
                waited: self.guard_timeout,
            }
            .into());
        }
        self.backend.reset_fence(guard);

        let acquired = self.lifecycle.acquire(
            &mut self.backend,
            &self.slots.get(slot).image_ready,
            self.acquire_timeout,
        )?;
        let image = match acquired {
            Acquire::Ready(image) => image,
            Acquire::OutOfDate => {
                let extent = self.window_extent;
                log::debug!(
                    "Surface out of date at frame {}, rebuilding at {}x{}",
                    frame,
                    extent.width,
                    extent.height
                );
                self.lifecycle
                    .recreate(&mut self.backend, extent, &mut self.slots, Some(slot))?;
                self.advance();
                return Ok(TurnOutcome::Recreated { frame, slot });
            }
            Acquire::NotReady => {
                self.slots.replace_guard(&mut self.backend, slot)?;
                return Ok(TurnOutcome::Skipped);
            }
            Acquire::Timeout => {
                return Err(ProtocolViolation::AcquireTimeout {
                    waited: self.acquire_timeout,
                }
                .into());
            }
        };

        let style = self.lifecycle.selection().style;
        let resources = self
            .lifecycle
            .resources_mut()
            .ok_or(ProtocolViolation::NoAcquiredImage)?;
        self.composer
            .compose(&mut self.backend, resources, image, frame, style, shared)?;

        let frame_slot = self.slots.get(slot);
        self.backend.submit(
            resources,
            image,
            &frame_slot.image_ready,
            &frame_slot.render_finished,
            &frame_slot.in_flight,
        )?;
        let presented = self
            .backend
            .present(resources, image, &frame_slot.render_finished)?;
        self.advance();

        if presented != Present::Presented {
            log::debug!("Present reported {:?}, rebuilding before next frame", presented);
            self.lifecycle.request_recreate(self.window_extent);
        }

        Ok(TurnOutcome::Presented { frame, slot })
    }

    fn advance(&mut self) {
        self.frame += 1;
        self.slot = (self.slot + 1) % self.slots.len();
    }

    /// Switch visual style and/or raster mode
    pub fn select_scene(&mut self, selection: SceneSelection) -> Result<()> {
        let previous = self.lifecycle.selection();
        if selection == previous {
            return Ok(());
        }

        if selection.style != previous.style {
            self.backend.wait_idle()?;
            self.backend
                .upload_indices(&indices::generate(selection.style, self.layout))?;
        }
        self.lifecycle.rebuild_scene(&mut self.backend, selection)?;

        log::info!(
            "Scene: {} / {}",
            selection.style.name(),
            selection.raster.name()
        );
        Ok(())
    }

    /// Loop until `stop` is raised or a fatal error occurs, then release the surface
    pub fn run(
        &mut self,
        shared: &SharedSpectrum,
        stop: &AtomicBool,
        control: &Receiver<RenderControl>,
    ) -> Result<()> {
        let result = self.run_turns(shared, stop, control);
        let shutdown = self.shutdown();

        match result {
            Ok(()) => shutdown,
            Err(e) => {
                if let Err(shutdown_error) = shutdown {
                    log::error!("Shutdown after failure also failed: {}", shutdown_error);
                }
                Err(e)
            }
        }
    }

    fn run_turns(
        &mut self,
        shared: &SharedSpectrum,
        stop: &AtomicBool,
        control: &Receiver<RenderControl>,
    ) -> Result<()> {
        while !stop.load(Ordering::Acquire) {
            for message in control.try_iter() {
                match message {
                    RenderControl::Resize(extent) => self.resize(extent),
                    RenderControl::Select(selection) => self.select_scene(selection)?,
                }
            }

            if self.turn(shared)? == TurnOutcome::Skipped {
                thread::sleep(IDLE_BACKOFF);
            }
        }
        log::debug!("Render loop stopped after {} frames", self.frame);
        Ok(())
    }

    /// Await every slot's guard, then release the surface resources
    pub fn shutdown(&mut self) -> Result<()> {
        for (index, slot) in self.slots.iter().enumerate() {
            if !self.backend.wait_fence(&slot.in_flight, self.guard_timeout)? {
                log::warn!("Frame slot {} still in flight at shutdown", index);
            }
        }
        self.lifecycle.teardown(&mut self.backend)
    }
}
