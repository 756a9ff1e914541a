//! wgpu implementation of the graphics backend.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use wgpu::util::DeviceExt;
use winit::window::Window;

use super::backend::{Acquire, Extent, GraphicsBackend, Present};
use super::commands::Uniforms;
use super::indices;
use super::swapchain::SurfaceResources;
use crate::error::{Error, ProtocolViolation, Result};
use crate::params::{RasterMode, RenderConfig, SceneSelection, VisualStyle};
use crate::spectrum::{HistoryLayout, Vertex};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Longest single sleep while polling a submission guard
const GUARD_POLL: Duration = Duration::from_millis(1);

/// Configured presentation surface plus the image acquired for the current frame
pub struct WgpuSwapchain {
    config: wgpu::SurfaceConfiguration,
    image_count: usize,
    next_image: usize,
    current: Option<wgpu::SurfaceTexture>,
    suboptimal: bool,
}

/// Presentable images of the surface (wgpu hands them out one at a time)
pub struct SurfaceImages {
    count: usize,
}

pub struct DepthTexture {
    texture: wgpu::Texture,
}

/// Attachment formats every pipeline and pass must agree on
pub struct RenderTargetDesc {
    color_format: wgpu::TextureFormat,
    depth_format: wgpu::TextureFormat,
}

pub struct ScenePipeline {
    pipeline: wgpu::RenderPipeline,
    selection: SceneSelection,
}

/// Per-surface attachments used by every frame's render pass
pub struct FrameAttachments {
    depth_view: wgpu::TextureView,
}

/// Recorded scene bundle plus per-image primary commands awaiting submission
pub struct FrameCommands {
    scene: Option<wgpu::RenderBundle>,
    pending: Vec<Vec<wgpu::CommandBuffer>>,
}

/// wgpu orders submissions on the queue, so there is nothing to signal
pub struct QueueOrdering;

/// Completion flag set from `Queue::on_submitted_work_done`
#[derive(Clone)]
pub struct SubmissionGuard {
    state: Arc<(Mutex<bool>, Condvar)>,
}

impl SubmissionGuard {
    fn new(signaled: bool) -> Self {
        Self {
            state: Arc::new((Mutex::new(signaled), Condvar::new())),
        }
    }

    fn signal(&self) {
        let (flag, condvar) = &*self.state;
        *flag.lock() = true;
        condvar.notify_all();
    }

    fn reset(&self) {
        *self.state.0.lock() = false;
    }

    fn is_signaled(&self) -> bool {
        *self.state.0.lock()
    }

    /// Sleep until signaled or `timeout` elapsed
    fn wait_for(&self, timeout: Duration) -> bool {
        let (flag, condvar) = &*self.state;
        let mut signaled = flag.lock();
        if !*signaled {
            condvar.wait_for(&mut signaled, timeout);
        }
        *signaled
    }
}

/// Rendering backend managing the wgpu device, buffers and shader
pub struct WgpuBackend {
    /// Window size when the backend was built; later sizes come from resize events
    initial_extent: Extent,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    features: wgpu::Features,
    format: wgpu::TextureFormat,
    alpha_mode: wgpu::CompositeAlphaMode,
    present_mode: wgpu::PresentMode,
    frame_latency: u32,
    shader: wgpu::ShaderModule,
    pipeline_layout: wgpu::PipelineLayout,
    bind_group: wgpu::BindGroup,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    index_capacity: usize,
    index_count: u32,
}

impl WgpuBackend {
    /// Create device, shader and buffers sized for `layout`
    pub async fn new(
        window: Arc<Window>,
        config: &RenderConfig,
        layout: HistoryLayout,
    ) -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let size = window.inner_size();
        let initial_extent = Extent::new(size.width, size.height);

        // Surface keeps the window alive through the Arc
        let surface = instance
            .create_surface(window)
            .map_err(|e| Error::Resource(format!("failed to create surface: {}", e)))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| Error::Resource("no suitable GPU adapter".to_string()))?;

        // Line/point rasterization only where the adapter has it
        let features = adapter.features()
            & (wgpu::Features::POLYGON_MODE_LINE | wgpu::Features::POLYGON_MODE_POINT);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Spectrum Device"),
                    required_features: features,
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .map_err(|e| Error::Resource(format!("failed to request device: {}", e)))?;
        device.on_uncaptured_error(Box::new(|e| log::error!("wgpu: {}", e)));

        let info = adapter.get_info();
        log::info!("GPU: {} ({:?})", info.name, info.backend);

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()
            .ok_or_else(|| Error::Resource("surface supports no formats".to_string()))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let present_mode = choose_present_mode(&caps.present_modes);
        log::info!("Surface: {:?}, {:?}", format, present_mode);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Spectrum Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("spectrum.wgsl").into()),
        });

        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("History Vertex Buffer"),
            size: (layout.points() * std::mem::size_of::<Vertex>()) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let index_capacity = indices::max_index_count(layout).max(1);
        let index_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Index Buffer"),
            size: (index_capacity * std::mem::size_of::<u32>()) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Uniform Buffer"),
            contents: bytemuck::bytes_of(&Uniforms::zeroed_for(layout)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Uniform Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Uniform Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Spectrum Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        Ok(Self {
            initial_extent,
            surface,
            device,
            queue,
            features,
            format,
            alpha_mode,
            present_mode,
            frame_latency: config.frames_in_flight.max(1),
            shader,
            pipeline_layout,
            bind_group,
            vertex_buffer,
            index_buffer,
            uniform_buffer,
            index_capacity,
            index_count: 0,
        })
    }

    /// Run `create` inside a validation error scope
    fn checked<T>(&self, what: &str, create: impl FnOnce(&wgpu::Device) -> T) -> Result<T> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = create(&self.device);
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(e) => Err(Error::Resource(format!("{}: {}", what, e))),
            None => Ok(value),
        }
    }

    fn polygon_mode(&self, raster: RasterMode) -> wgpu::PolygonMode {
        let (mode, feature) = match raster {
            RasterMode::Fill => return wgpu::PolygonMode::Fill,
            RasterMode::Line => (wgpu::PolygonMode::Line, wgpu::Features::POLYGON_MODE_LINE),
            RasterMode::Point => (wgpu::PolygonMode::Point, wgpu::Features::POLYGON_MODE_POINT),
        };
        if self.features.contains(feature) {
            mode
        } else {
            log::warn!("Adapter lacks {:?}, using fill", feature);
            wgpu::PolygonMode::Fill
        }
    }
}

/// FIFO when offered, then mailbox, then immediate
pub fn choose_present_mode(available: &[wgpu::PresentMode]) -> wgpu::PresentMode {
    [
        wgpu::PresentMode::Fifo,
        wgpu::PresentMode::Mailbox,
        wgpu::PresentMode::Immediate,
    ]
    .into_iter()
    .find(|mode| available.contains(mode))
    .or_else(|| available.first().copied())
    .unwrap_or(wgpu::PresentMode::Fifo)
}

fn topology(style: VisualStyle) -> wgpu::PrimitiveTopology {
    match style {
        VisualStyle::Surface | VisualStyle::Circle | VisualStyle::Spiral => {
            wgpu::PrimitiveTopology::TriangleList
        }
        VisualStyle::Lines => wgpu::PrimitiveTopology::LineList,
        VisualStyle::Points => wgpu::PrimitiveTopology::PointList,
    }
}

impl Uniforms {
    fn zeroed_for(layout: HistoryLayout) -> Self {
        Self {
            vertex_count: layout.points() as u32,
            row_len: layout.row_len as u32,
            ..<Self as bytemuck::Zeroable>::zeroed()
        }
    }
}

impl GraphicsBackend for WgpuBackend {
    type Surface = WgpuSwapchain;
    type Images = SurfaceImages;
    type DepthBuffer = DepthTexture;
    type RenderTarget = RenderTargetDesc;
    type Pipeline = ScenePipeline;
    type Framebuffers = FrameAttachments;
    type CommandBuffers = FrameCommands;
    type Semaphore = QueueOrdering;
    type Fence = SubmissionGuard;
    type OverlayCommands = wgpu::CommandBuffer;

    fn create_surface(&mut self, extent: Extent) -> Result<WgpuSwapchain> {
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: self.format,
            width: extent.width,
            height: extent.height,
            present_mode: self.present_mode,
            alpha_mode: self.alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: self.frame_latency,
        };
        let surface = &self.surface;
        self.checked("surface configuration", |device| {
            surface.configure(device, &config)
        })?;

        Ok(WgpuSwapchain {
            config,
            image_count: self.frame_latency as usize + 1,
            next_image: 0,
            current: None,
            suboptimal: false,
        })
    }

    fn create_images(&mut self, surface: &WgpuSwapchain) -> Result<SurfaceImages> {
        Ok(SurfaceImages {
            count: surface.image_count,
        })
    }

    fn image_count(&self, images: &SurfaceImages) -> usize {
        images.count
    }

    fn create_depth_buffer(&mut self, surface: &WgpuSwapchain) -> Result<DepthTexture> {
        let size = wgpu::Extent3d {
            width: surface.config.width,
            height: surface.config.height,
            depth_or_array_layers: 1,
        };
        let texture = self.checked("depth buffer", |device| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some("Depth Texture"),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: DEPTH_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
        })?;
        Ok(DepthTexture { texture })
    }

    fn create_render_target(&mut self, surface: &WgpuSwapchain) -> Result<RenderTargetDesc> {
        Ok(RenderTargetDesc {
            color_format: surface.config.format,
            depth_format: DEPTH_FORMAT,
        })
    }

    fn create_pipeline(
        &mut self,
        target: &RenderTargetDesc,
        selection: SceneSelection,
    ) -> Result<ScenePipeline> {
        let polygon_mode = self.polygon_mode(selection.raster);
        let shader = &self.shader;
        let layout = &self.pipeline_layout;

        let pipeline = self.checked("scene pipeline", |device| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Spectrum Pipeline"),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module: shader,
                    entry_point: Some("vs_main"),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &[wgpu::VertexAttribute {
                            offset: 0,
                            shader_location: 0,
                            format: wgpu::VertexFormat::Float32x2,
                        }],
                    }],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: target.color_format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: topology(selection.style),
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: target.depth_format,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })?;

        Ok(ScenePipeline {
            pipeline,
            selection,
        })
    }

    fn create_framebuffers(
        &mut self,
        _images: &SurfaceImages,
        depth: &DepthTexture,
        _target: &RenderTargetDesc,
    ) -> Result<FrameAttachments> {
        Ok(FrameAttachments {
            depth_view: depth
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default()),
        })
    }

    fn create_command_buffers(&mut self, count: usize) -> Result<FrameCommands> {
        Ok(FrameCommands {
            scene: None,
            pending: (0..count).map(|_| Vec::new()).collect(),
        })
    }

    fn record_scene(&mut self, resources: &mut SurfaceResources<Self>) -> Result<()> {
        let mut encoder =
            self.device
                .create_render_bundle_encoder(&wgpu::RenderBundleEncoderDescriptor {
                    label: Some("Scene Bundle Encoder"),
                    color_formats: &[Some(resources.target.color_format)],
                    depth_stencil: Some(wgpu::RenderBundleDepthStencil {
                        format: resources.target.depth_format,
                        depth_read_only: false,
                        stencil_read_only: true,
                    }),
                    sample_count: 1,
                    multiview: None,
                });

        encoder.set_pipeline(&resources.pipeline.pipeline);
        encoder.set_bind_group(0, &self.bind_group, &[]);
        encoder.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        encoder.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        encoder.draw_indexed(0..self.index_count, 0, 0..1);

        resources.commands.scene = Some(encoder.finish(&wgpu::RenderBundleDescriptor {
            label: Some(resources.pipeline.selection.style.name()),
        }));
        Ok(())
    }

    fn upload_indices(&mut self, indices: &[u32]) -> Result<()> {
        if indices.len() > self.index_capacity {
            return Err(Error::Resource(format!(
                "{} indices exceed the index buffer ({})",
                indices.len(),
                self.index_capacity
            )));
        }
        if !indices.is_empty() {
            self.queue
                .write_buffer(&self.index_buffer, 0, bytemuck::cast_slice(indices));
        }
        self.index_count = indices.len() as u32;
        Ok(())
    }

    fn create_semaphore(&mut self) -> Result<QueueOrdering> {
        Ok(QueueOrdering)
    }

    fn create_fence(&mut self, signaled: bool) -> Result<SubmissionGuard> {
        Ok(SubmissionGuard::new(signaled))
    }

    fn wait_fence(&mut self, fence: &SubmissionGuard, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if fence.is_signaled() {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            // Completion callbacks only run while the device is polled
            let _ = self.device.poll(wgpu::Maintain::Poll);
            if fence.wait_for(GUARD_POLL.min(deadline - now)) {
                return Ok(true);
            }
        }
    }

    fn reset_fence(&mut self, fence: &SubmissionGuard) {
        fence.reset();
    }

    fn wait_idle(&mut self) -> Result<()> {
        let _ = self.device.poll(wgpu::Maintain::Wait);
        Ok(())
    }

    fn surface_extent(&self) -> Extent {
        self.initial_extent
    }

    fn acquire(
        &mut self,
        resources: &mut SurfaceResources<Self>,
        _signal: &QueueOrdering,
        timeout: Duration,
    ) -> Result<Acquire> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.surface.get_current_texture() {
                Ok(texture) => {
                    let swapchain = &mut resources.surface;
                    let image = swapchain.next_image;
                    swapchain.next_image = (image + 1) % swapchain.image_count;
                    swapchain.suboptimal = texture.suboptimal;
                    swapchain.current = Some(texture);
                    return Ok(Acquire::Ready(image));
                }
                Err(wgpu::SurfaceError::Timeout) => {
                    if Instant::now() >= deadline {
                        return Ok(Acquire::Timeout);
                    }
                }
                Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                    return Ok(Acquire::OutOfDate);
                }
                Err(e) => {
                    return Err(Error::Resource(format!("surface acquire failed: {}", e)));
                }
            }
        }
    }

    fn upload_vertices(&mut self, oldest: &[Vertex], newest: &[Vertex]) {
        if !oldest.is_empty() {
            self.queue
                .write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(oldest));
        }
        if !newest.is_empty() {
            let offset = std::mem::size_of_val(oldest) as wgpu::BufferAddress;
            self.queue
                .write_buffer(&self.vertex_buffer, offset, bytemuck::cast_slice(newest));
        }
    }

    fn write_uniforms(&mut self, _image: usize, uniforms: &Uniforms) {
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
    }

    fn record_frame(
        &mut self,
        resources: &mut SurfaceResources<Self>,
        image: usize,
        overlay: Vec<wgpu::CommandBuffer>,
    ) -> Result<()> {
        let texture = resources
            .surface
            .current
            .as_ref()
            .ok_or(ProtocolViolation::NoAcquiredImage)?;
        let view = texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Spectrum Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &resources.framebuffers.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some(scene) = &resources.commands.scene {
                render_pass.execute_bundles(std::iter::once(scene));
            }
        }

        let pending = &mut resources.commands.pending[image];
        pending.clear();
        pending.push(encoder.finish());
        pending.extend(overlay);
        Ok(())
    }

    fn submit(
        &mut self,
        resources: &mut SurfaceResources<Self>,
        image: usize,
        _wait: &QueueOrdering,
        _signal: &QueueOrdering,
        fence: &SubmissionGuard,
    ) -> Result<()> {
        let buffers = std::mem::take(&mut resources.commands.pending[image]);
        if buffers.is_empty() {
            return Err(ProtocolViolation::NoAcquiredImage.into());
        }
        self.queue.submit(buffers);

        let guard = fence.clone();
        self.queue.on_submitted_work_done(move || guard.signal());
        Ok(())
    }

    fn present(
        &mut self,
        resources: &mut SurfaceResources<Self>,
        _image: usize,
        _wait: &QueueOrdering,
    ) -> Result<Present> {
        let swapchain = &mut resources.surface;
        let texture = swapchain
            .current
            .take()
            .ok_or(ProtocolViolation::NoAcquiredImage)?;
        texture.present();

        if std::mem::take(&mut swapchain.suboptimal) {
            Ok(Present::Suboptimal)
        } else {
            Ok(Present::Presented)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_present_mode_prefers_fifo() {
        use wgpu::PresentMode::*;

        assert_eq!(choose_present_mode(&[Immediate, Mailbox, Fifo]), Fifo);
        assert_eq!(choose_present_mode(&[Immediate, Mailbox]), Mailbox);
        assert_eq!(choose_present_mode(&[Immediate]), Immediate);
        assert_eq!(choose_present_mode(&[FifoRelaxed]), FifoRelaxed);
        assert_eq!(choose_present_mode(&[]), Fifo);
    }

    #[test]
    fn test_topology_follows_style() {
        assert_eq!(
            topology(VisualStyle::Surface),
            wgpu::PrimitiveTopology::TriangleList
        );
        assert_eq!(topology(VisualStyle::Lines), wgpu::PrimitiveTopology::LineList);
        assert_eq!(topology(VisualStyle::Points), wgpu::PrimitiveTopology::PointList);
        assert_eq!(topology(VisualStyle::Circle), wgpu::PrimitiveTopology::TriangleList);
        assert_eq!(topology(VisualStyle::Spiral), wgpu::PrimitiveTopology::TriangleList);
    }

    #[test]
    fn test_submission_guard_signal_and_reset() {
        let guard = SubmissionGuard::new(false);
        assert!(!guard.wait_for(Duration::from_millis(1)));

        let remote = guard.clone();
        std::thread::spawn(move || remote.signal()).join().unwrap();
        assert!(guard.wait_for(Duration::from_millis(1)));

        guard.reset();
        assert!(!guard.is_signaled());
    }
}
