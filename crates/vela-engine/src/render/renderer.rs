//! Top-down debug view using wgpu.
//!
//! Draws the [`HeadlessRenderer`](super::HeadlessRenderer) draw list as flat
//! rectangles seen from above: world X maps to screen right and world −Z to
//! screen up. Each rectangle is the node's XZ footprint scaled and rotated by
//! its yaw. The view is centered on the camera target.

use std::sync::Arc;

use wgpu::util::DeviceExt;

use super::scene::{CameraView, DrawCommand};

// ---------------------------------------------------------------------------
// Vertex
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck_derive::Pod, bytemuck_derive::Zeroable)]
struct Vertex {
    position: [f32; 2],
    color: [f32; 4],
}

impl Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// `0xRRGGBB` to linear-ish RGBA.
fn rgba(color: u32) -> [f32; 4] {
    let channel = |shift: u32| ((color >> shift) & 0xff) as f32 / 255.0;
    [channel(16), channel(8), channel(0), 1.0]
}

// ---------------------------------------------------------------------------
// TopDownCamera
// ---------------------------------------------------------------------------

/// Orthographic camera looking straight down the Y axis.
#[derive(Debug, Clone, PartialEq)]
pub struct TopDownCamera {
    /// World X at the screen center.
    pub center_x: f32,
    /// World Z at the screen center.
    pub center_z: f32,
    /// World units visible from screen bottom to top.
    pub span: f32,
    /// Viewport width divided by height.
    pub aspect: f32,
}

impl Default for TopDownCamera {
    fn default() -> Self {
        Self {
            center_x: 0.0,
            center_z: 0.0,
            span: 40.0,
            aspect: 4.0 / 3.0,
        }
    }
}

impl TopDownCamera {
    /// Follow the 3D camera's target.
    pub fn track(&mut self, view: &CameraView) {
        self.center_x = view.target.x as f32;
        self.center_z = view.target.z as f32;
    }

    /// Column-major matrix mapping plane coordinates `(x, -z)` to clip space.
    pub fn view_projection(&self) -> [f32; 16] {
        let half_h = self.span / 2.0;
        let half_w = half_h * self.aspect;
        let sx = 1.0 / half_w;
        let sy = 1.0 / half_h;
        let tx = -self.center_x * sx;
        let ty = self.center_z * sy;
        [
            sx, 0.0, 0.0, 0.0, //
            0.0, sy, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            tx, ty, 0.0, 1.0,
        ]
    }
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

const MAX_QUADS: usize = 4096;
const VERTICES_PER_QUAD: usize = 6;
const MAX_VERTICES: usize = MAX_QUADS * VERTICES_PER_QUAD;

fn quad(cmd: &DrawCommand) -> [Vertex; VERTICES_PER_QUAD] {
    let half_w = (cmd.footprint.0 * cmd.scale.x / 2.0) as f32;
    let half_d = (cmd.footprint.1 * cmd.scale.z / 2.0) as f32;
    let (sin, cos) = (cmd.rotation.y as f32).sin_cos();
    let (cx, cy) = (cmd.position.x as f32, -cmd.position.z as f32);
    let color = rgba(cmd.color);

    // Yaw about +Y turns X toward −Z, which is screen up.
    let corner = |dx: f32, dz: f32| Vertex {
        position: [cx + dx * cos + dz * sin, cy + dx * sin - dz * cos],
        color,
    };
    let bl = corner(-half_w, half_d);
    let br = corner(half_w, half_d);
    let tr = corner(half_w, -half_d);
    let tl = corner(-half_w, -half_d);
    [bl, br, tr, bl, tr, tl]
}

fn build_vertices(commands: &[DrawCommand]) -> Vec<Vertex> {
    commands
        .iter()
        .take(MAX_QUADS)
        .flat_map(quad)
        .collect()
}

// ---------------------------------------------------------------------------
// DebugRenderer
// ---------------------------------------------------------------------------

/// wgpu surface plus one pipeline for flat quads.
pub struct DebugRenderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    render_pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    window: Arc<winit::window::Window>,
    pub camera: TopDownCamera,
}

impl DebugRenderer {
    /// Create the surface, device and pipeline for `window`.
    ///
    /// # Errors
    ///
    /// Returns an error if no suitable GPU adapter or device is available.
    pub async fn new(window: Arc<winit::window::Window>) -> Result<Self, anyhow::Error> {
        let size = window.inner_size();
        let width = size.width.max(1);
        let height = size.height.max(1);

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone())?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::LowPower,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow::anyhow!("no suitable GPU adapter found"))?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("vela_debug_renderer"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| anyhow::anyhow!("surface reports no texture formats"))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("top_down_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders.wgsl").into()),
        });

        let camera = TopDownCamera {
            aspect: width as f32 / height as f32,
            ..TopDownCamera::default()
        };
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("camera_uniform"),
            contents: bytemuck::cast_slice(&camera.view_projection()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("camera_bind_group_layout"),
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
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("camera_bind_group"),
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("top_down_pipeline_layout"),
            bind_group_layouts: &[&camera_layout],
            push_constant_ranges: &[],
        });
        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("top_down_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::desc()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("vertex_buffer"),
            size: (MAX_VERTICES * std::mem::size_of::<Vertex>()) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            surface,
            device,
            queue,
            config,
            render_pipeline,
            vertex_buffer,
            camera_buffer,
            camera_bind_group,
            window,
            camera,
        })
    }

    /// Draw one frame.
    ///
    /// # Errors
    ///
    /// Returns a [`wgpu::SurfaceError`] if the surface cannot provide an
    /// output texture (window minimized, surface lost).
    pub fn render(&mut self, commands: &[DrawCommand], view: &CameraView) -> Result<(), wgpu::SurfaceError> {
        self.camera.track(view);
        self.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&self.camera.view_projection()),
        );

        let vertices = build_vertices(commands);
        if !vertices.is_empty() {
            self.queue
                .write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&vertices));
        }

        let output = self.surface.get_current_texture()?;
        let target = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("top_down_encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("top_down_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.08,
                            g: 0.09,
                            b: 0.12,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.render_pipeline);
            pass.set_bind_group(0, &self.camera_bind_group, &[]);
            pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            if !vertices.is_empty() {
                pass.draw(0..vertices.len() as u32, 0..1);
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.camera.aspect = new_size.width as f32 / new_size.height as f32;
            self.surface.configure(&self.device, &self.config);
        }
    }

    pub fn window(&self) -> &winit::window::Window {
        &self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;
    use crate::render::scene::DrawSource;
    use vela_ecs::entity::EntityId;

    fn command(position: Vec3, yaw: f64) -> DrawCommand {
        DrawCommand {
            source: DrawSource::Mesh(EntityId::new(0, 0)),
            position,
            rotation: Vec3::new(0.0, yaw, 0.0),
            scale: Vec3::ONE,
            footprint: (2.0, 4.0),
            color: 0xff8000,
        }
    }

    #[test]
    fn color_unpacks_channels() {
        let c = rgba(0xff8000);
        assert_eq!(c[0], 1.0);
        assert!((c[1] - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(c[2], 0.0);
    }

    #[test]
    fn unrotated_quad_spans_footprint() {
        let v = quad(&command(Vec3::new(1.0, 0.0, -3.0), 0.0));
        let xs: Vec<f32> = v.iter().map(|p| p.position[0]).collect();
        let ys: Vec<f32> = v.iter().map(|p| p.position[1]).collect();
        let span = |s: &[f32]| s.iter().cloned().fold(f32::MIN, f32::max) - s.iter().cloned().fold(f32::MAX, f32::min);
        assert!((span(&xs) - 2.0).abs() < 1e-5);
        assert!((span(&ys) - 4.0).abs() < 1e-5);
        // −Z is up on screen.
        assert!(ys.iter().all(|y| *y > 0.0));
    }

    #[test]
    fn vertex_count_is_capped() {
        let cmds = vec![command(Vec3::ZERO, 0.0); MAX_QUADS + 10];
        assert_eq!(build_vertices(&cmds).len(), MAX_VERTICES);
    }

    #[test]
    fn camera_centers_target() {
        let mut cam = TopDownCamera::default();
        cam.track(&CameraView {
            target: Vec3::new(5.0, 0.0, -2.0),
            ..CameraView::default()
        });
        let m = cam.view_projection();
        // Plane point (5, 2) maps to clip origin.
        let x = m[0] * 5.0 + m[12];
        let y = m[5] * 2.0 + m[13];
        assert!(x.abs() < 1e-6 && y.abs() < 1e-6);
    }
}
