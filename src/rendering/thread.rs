//! Dedicated render thread running the frame loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Sender};

use super::backend::{Extent, GraphicsBackend};
use super::commands::OverlayRenderer;
use super::frame::FrameScheduler;
use crate::error::{Error, Result};
use crate::params::SceneSelection;
use crate::spectrum::SharedSpectrum;

/// Requests from the window thread, applied between loop turns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderControl {
    /// The window changed size; rebuild the surface before the next frame
    Resize(Extent),

    /// Switch visual style or raster mode
    Select(SceneSelection),
}

/// Handle to the render thread
pub struct RenderThread {
    control: Sender<RenderControl>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<Result<()>>>,
}

impl RenderThread {
    pub fn spawn<B, O>(mut scheduler: FrameScheduler<B, O>, shared: SharedSpectrum) -> Result<Self>
    where
        B: GraphicsBackend + Send + 'static,
        O: OverlayRenderer<B> + Send + 'static,
        FrameScheduler<B, O>: Send,
    {
        let (control, inbox) = channel::unbounded();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("render".to_string())
            .spawn(move || {
                let result = scheduler.run(&shared, &stop_flag, &inbox);
                if let Err(e) = &result {
                    log::error!("Render loop failed: {}", e);
                }
                result
            })
            .map_err(|source| Error::Spawn {
                name: "render",
                source,
            })?;

        Ok(Self {
            control,
            stop,
            handle: Some(handle),
        })
    }

    pub fn resize(&self, extent: Extent) {
        let _ = self.control.send(RenderControl::Resize(extent));
    }

    pub fn select(&self, selection: SceneSelection) {
        let _ = self.control.send(RenderControl::Select(selection));
    }

    /// True once the loop has exited (stopped or failed)
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |handle| handle.is_finished())
    }

    /// Stop the loop at its next turn boundary and wait for surface release
    pub fn stop(&mut self) -> Result<()> {
        self.stop.store(true, Ordering::Release);
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| Error::ThreadPanicked("render"))?,
            None => Ok(()),
        }
    }
}

impl Drop for RenderThread {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::error!("{}", e);
        }
    }
}
