//! Frame scheduling, surface lifecycle and the wgpu backend.

mod backend;
mod commands;
mod frame;
mod gpu;
pub mod indices;
mod swapchain;
mod thread;

#[cfg(test)]
pub(crate) mod mock;

pub use backend::{Acquire, Extent, FrameSlot, FrameSlots, GraphicsBackend, Present};
pub use commands::{CommandComposer, NoOverlay, OverlayRenderer, Uniforms};
pub use frame::{FrameScheduler, TurnOutcome};
pub use gpu::{choose_present_mode, WgpuBackend};
pub use swapchain::{SurfaceResources, SwapchainLifecycle, SwapchainState};
pub use thread::{RenderControl, RenderThread};
