// Scene host: render surface lifecycle and the per-frame loop.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, ensure, Context, Result};
use glam::Mat4;
use rand::{rngs::StdRng, SeedableRng};
use winit::{
    dpi::PhysicalSize,
    event::{ElementState, Event, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowBuilder},
};

use crate::camera::{CameraController, CameraMode};
use crate::config::TwinConfig;
use crate::scene::{self, Vertex};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

// Uniform buffer structure for the view-projection matrix
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
}

/// Cancellable frame scheduler. Gives teardown one observable cancellation
/// point: once cancelled, no further redraws are requested and any redraw
/// already in flight is dropped.
struct FrameLoop {
    active: bool,
}

impl FrameLoop {
    fn new() -> Self {
        Self { active: true }
    }

    fn is_active(&self) -> bool {
        self.active
    }

    /// Returns true only on the first call.
    fn cancel(&mut self) -> bool {
        std::mem::replace(&mut self.active, false)
    }
}

/// Maps a winit scroll event onto the controller's wheel axis. winit's sign
/// is inverted relative to the DOM deltaY the reference behavior was tuned
/// against, so scrolling down yields a positive (zoom-out) delta.
fn wheel_delta(delta: &MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => -y,
        MouseScrollDelta::PixelDelta(pos) => -(pos.y as f32) / 120.0,
    }
}

/// Resize guard: the surface and depth target are reconfigured only for a
/// non-zero size that differs from the current target dimensions, so a
/// repeated resize leaves them untouched.
fn needs_reconfigure(current: (u32, u32), new_size: (u32, u32)) -> bool {
    new_size.0 > 0 && new_size.1 > 0 && new_size != current
}

/// GPU-side state: surface, pipelines and the static scene buffers. Dropped
/// as a whole on unmount.
struct Gfx {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth_view: wgpu::TextureView,
    opaque_pipeline: wgpu::RenderPipeline,
    overlay_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    opaque_vertices: wgpu::Buffer,
    opaque_indices: wgpu::Buffer,
    opaque_index_count: u32,
    overlay_vertices: wgpu::Buffer,
    overlay_indices: wgpu::Buffer,
    overlay_index_count: u32,
}

/// Owns the render surface, the static scene and the per-frame loop, and
/// routes surface input into the camera controller.
pub struct SceneHost {
    window: Arc<Window>,
    gfx: Option<Gfx>,
    frames: FrameLoop,
    controller: CameraController,
    cursor: (f64, f64),
    start: Instant,
}

impl SceneHost {
    /// Creates the window, the GPU surface and the static scene. Fails fast
    /// on a zero-area surface or any resource-creation error; no partial
    /// scene is left behind.
    pub async fn mount(event_loop: &EventLoop<()>, config: TwinConfig) -> Result<Self> {
        let (width, height) = config.window_size;
        ensure!(width > 0 && height > 0, "mount surface has zero area");

        let window = Arc::new(
            WindowBuilder::new()
                .with_title("slope-twin")
                .with_inner_size(PhysicalSize::new(width, height))
                .build(event_loop)
                .context("failed to create window")?,
        );

        let size = window.inner_size();
        ensure!(
            size.width > 0 && size.height > 0,
            "mount surface has zero area"
        );

        let gfx = Gfx::new(window.clone(), &config, size).await?;
        let controller = CameraController::new(&config, size.width as f32 / size.height as f32);

        log::info!("scene mounted at {}x{}", size.width, size.height);

        Ok(Self {
            window,
            gfx: Some(gfx),
            frames: FrameLoop::new(),
            controller,
            cursor: (0.0, 0.0),
            start: Instant::now(),
        })
    }

    /// Play/pause control for the autonomous orbit.
    pub fn set_autonomous(&mut self, autonomous: bool) {
        self.controller.set_autonomous(autonomous);
    }

    /// Reset-view control: default pose, orbit resumed.
    pub fn reset(&mut self) {
        self.controller.reset();
    }

    /// Drives the event loop until the window closes.
    pub fn run(mut self, event_loop: EventLoop<()>) -> Result<()> {
        event_loop.run(move |event, target| {
            target.set_control_flow(ControlFlow::Poll);

            match event {
                Event::WindowEvent { window_id, event } if window_id == self.window.id() => {
                    self.window_event(event, target);
                }
                Event::AboutToWait => {
                    // Cooperative frame scheduling: one redraw per vsync'd
                    // present, none once the loop is cancelled.
                    if self.frames.is_active() {
                        self.window.request_redraw();
                    }
                }
                _ => {}
            }
        })?;
        Ok(())
    }

    fn window_event(&mut self, event: WindowEvent, target: &EventLoopWindowTarget<()>) {
        match event {
            WindowEvent::CloseRequested => {
                self.unmount();
                target.exit();
            }
            WindowEvent::Resized(new_size) => self.resize(new_size),
            WindowEvent::RedrawRequested => self.redraw(),
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => match state {
                ElementState::Pressed => self.controller.pointer_down(self.cursor.0, self.cursor.1),
                ElementState::Released => self.controller.pointer_up(),
            },
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x, position.y);
                self.controller.pointer_move(position.x, position.y);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.controller.wheel(wheel_delta(&delta));
            }
            WindowEvent::KeyboardInput { event, .. } => self.handle_keyboard_input(event),
            _ => {}
        }
    }

    fn handle_keyboard_input(&mut self, event: KeyEvent) {
        if event.state != ElementState::Pressed || event.repeat {
            return;
        }
        if let PhysicalKey::Code(keycode) = event.physical_key {
            match keycode {
                // Space mirrors the play/pause button, R the reset-view one.
                KeyCode::Space => {
                    let playing = self.controller.mode() == CameraMode::Autonomous;
                    self.set_autonomous(!playing);
                }
                KeyCode::KeyR => self.reset(),
                _ => {}
            }
        }
    }

    /// Updates the surface, depth target and camera aspect together, inside
    /// one run-to-completion handler, so a frame never observes mismatched
    /// dimensions. Zero-area and no-change resizes are ignored.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            log::warn!("ignoring zero-area resize");
            return;
        }
        let Some(gfx) = self.gfx.as_mut() else {
            return;
        };
        if !needs_reconfigure(
            (gfx.config.width, gfx.config.height),
            (new_size.width, new_size.height),
        ) {
            return;
        }

        gfx.resize(new_size);
        self.controller
            .set_aspect(new_size.width as f32 / new_size.height as f32);
        log::info!("resized to {}x{}", new_size.width, new_size.height);
    }

    fn redraw(&mut self) {
        // A redraw scheduled before unmount may still fire afterwards; the
        // torn-down state makes it a no-op.
        if !self.frames.is_active() {
            return;
        }
        let Some(gfx) = self.gfx.as_mut() else {
            return;
        };

        let elapsed_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        self.controller.tick(elapsed_ms);

        let uniforms = Uniforms {
            view_proj: self.controller.camera().view_projection().to_cols_array_2d(),
        };
        gfx.queue
            .write_buffer(&gfx.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        match gfx.render() {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost) | Err(wgpu::SurfaceError::Outdated) => {
                let size = self.window.inner_size();
                if size.width > 0 && size.height > 0 {
                    gfx.resize(size);
                }
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("out of GPU memory, tearing the scene down");
                self.unmount();
            }
            Err(e) => log::warn!("frame skipped: {e:?}"),
        }
    }

    /// Cancels the frame loop and releases the GPU resources. Idempotent:
    /// the second and later calls are no-ops.
    pub fn unmount(&mut self) {
        if !self.frames.cancel() {
            return;
        }
        self.gfx = None;
        log::info!("render surface released");
    }
}

impl Gfx {
    async fn new(window: Arc<Window>, config: &TwinConfig, size: PhysicalSize<u32>) -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("failed to create render surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow!("no suitable GPU adapter"))?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Scene Device"),
                    required_features: wgpu::Features::default(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .context("failed to acquire GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::Fifo, // Vsync drives the frame clock
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Uniform Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        // Opaque content writes depth; the translucent overlay blends on top
        // without writing it.
        let opaque_pipeline = make_pipeline(
            &device,
            &pipeline_layout,
            &shader_module,
            surface_format,
            None,
            true,
            "Opaque Pipeline",
        );
        let overlay_pipeline = make_pipeline(
            &device,
            &pipeline_layout,
            &shader_module,
            surface_format,
            Some(wgpu::BlendState::ALPHA_BLENDING),
            false,
            "Overlay Pipeline",
        );

        let depth_view = create_depth_view(&device, &surface_config);

        let mut rng = StdRng::seed_from_u64(config.equipment_seed);
        let geometry = scene::build_scene(config, &mut rng);

        use wgpu::util::DeviceExt;
        let make_buffer = |label: &str, contents: &[u8], usage| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage,
            })
        };
        let opaque_vertices = make_buffer(
            "Opaque Vertices",
            bytemuck::cast_slice(&geometry.opaque.vertices),
            wgpu::BufferUsages::VERTEX,
        );
        let opaque_indices = make_buffer(
            "Opaque Indices",
            bytemuck::cast_slice(&geometry.opaque.indices),
            wgpu::BufferUsages::INDEX,
        );
        let overlay_vertices = make_buffer(
            "Overlay Vertices",
            bytemuck::cast_slice(&geometry.overlay.vertices),
            wgpu::BufferUsages::VERTEX,
        );
        let overlay_indices = make_buffer(
            "Overlay Indices",
            bytemuck::cast_slice(&geometry.overlay.indices),
            wgpu::BufferUsages::INDEX,
        );

        let uniforms = Uniforms {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
        };
        let uniform_buffer = make_buffer(
            "Uniform Buffer",
            bytemuck::bytes_of(&uniforms),
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        );

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Uniform Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        Ok(Self {
            surface,
            device,
            queue,
            config: surface_config,
            depth_view,
            opaque_pipeline,
            overlay_pipeline,
            uniform_buffer,
            uniform_bind_group,
            opaque_index_count: geometry.opaque.indices.len() as u32,
            opaque_vertices,
            opaque_indices,
            overlay_index_count: geometry.overlay.indices.len() as u32,
            overlay_vertices,
            overlay_indices,
        })
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.depth_view = create_depth_view(&self.device, &self.config);
    }

    fn render(&mut self) -> std::result::Result<(), wgpu::SurfaceError> {
        let frame = self.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let [r, g, b, a] = scene::background();
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);

            render_pass.set_pipeline(&self.opaque_pipeline);
            render_pass.set_vertex_buffer(0, self.opaque_vertices.slice(..));
            render_pass.set_index_buffer(self.opaque_indices.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..self.opaque_index_count, 0, 0..1);

            render_pass.set_pipeline(&self.overlay_pipeline);
            render_pass.set_vertex_buffer(0, self.overlay_vertices.slice(..));
            render_pass.set_index_buffer(self.overlay_indices.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..self.overlay_index_count, 0, 0..1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}

fn create_depth_view(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth"),
        size: wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn make_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
    depth_write: bool,
    label: &str,
) -> wgpu::RenderPipeline {
    let vertex_buffer_layout = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: std::mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x4,
            },
        ],
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: "vs_main",
            buffers: &[vertex_buffer_layout],
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // The terrain is double-sided, same as the reference material.
            cull_mode: None,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: depth_write,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use winit::dpi::PhysicalPosition;

    #[test]
    fn frame_loop_cancels_exactly_once() {
        let mut frames = FrameLoop::new();
        assert!(frames.is_active());
        assert!(frames.cancel());
        assert!(!frames.is_active());
        // Second unmount is a no-op, not an error.
        assert!(!frames.cancel());
        assert!(!frames.is_active());
    }

    #[test]
    fn repeated_resize_leaves_target_dimensions_alone() {
        // A genuine size change reconfigures.
        assert!(needs_reconfigure((800, 600), (1024, 768)));
        // Re-delivering the same size does not.
        assert!(!needs_reconfigure((1024, 768), (1024, 768)));
    }

    #[test]
    fn zero_area_resizes_never_reconfigure() {
        assert!(!needs_reconfigure((800, 600), (0, 600)));
        assert!(!needs_reconfigure((800, 600), (800, 0)));
    }

    #[test]
    fn scroll_down_zooms_out() {
        // DOM deltaY > 0 (scroll down) is winit line delta y < 0.
        assert!(wheel_delta(&MouseScrollDelta::LineDelta(0.0, -1.0)) > 0.0);
        assert!(wheel_delta(&MouseScrollDelta::LineDelta(0.0, 1.0)) < 0.0);
    }

    #[test]
    fn pixel_deltas_are_normalized_to_notches() {
        let delta = wheel_delta(&MouseScrollDelta::PixelDelta(PhysicalPosition::new(
            0.0, -120.0,
        )));
        assert_abs_diff_eq!(delta, 1.0);
    }
}
