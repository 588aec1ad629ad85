// Animated pond scene: a small flock of fish with boids steering, a gold
// particle trail pool, and a twinkling starfield overlay. Fish and particles
// share one instanced pipeline; the whole flock is two draw calls.

mod engine;

use std::sync::Arc;

use bevy_ecs::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use winit::{
    event::{ElementState, Event as WinitEvent, KeyEvent, WindowEvent},
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use engine::assets;
use engine::boids::{self, Bounds};
use engine::camera::OrthoCamera;
use engine::config::SceneConfig;
use engine::input::PointerTracker;
use engine::lifecycle::Lifecycle;
use engine::mesh::{GpuVertex, RenderMesh, SceneInstance, uv_sphere};
use engine::overlay::{OverlayStats, StatusOverlay};
use engine::particles::ParticlePool;
use engine::renderer::{Renderer, StatusProbe};
use engine::starfield::Starfield;

// ============================================================================
// UNIFORM DATA (camera only)
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
}

// ============================================================================
// GEOMETRY UPLOAD
// ============================================================================

struct Geometry {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

fn upload_geometry(device: &wgpu::Device, mesh: &RenderMesh, label: &str) -> Geometry {
    use wgpu::util::DeviceExt;

    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: mesh.vertex_bytes(),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: mesh.index_bytes(),
        usage: wgpu::BufferUsages::INDEX,
    });

    Geometry {
        vertex_buffer,
        index_buffer,
        index_count: mesh.index_count(),
    }
}

// ============================================================================
// APPLICATION STATE
// ============================================================================

struct State {
    window: Arc<Window>,
    cfg: SceneConfig,
    lifecycle: Lifecycle,

    renderer: Renderer,
    status_probe: StatusProbe,
    camera: OrthoCamera,

    scene_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,

    // Fish geometry is optional: a configured model that fails to load
    // leaves the scene running with stars and no fish.
    fish_geometry: Option<Geometry>,
    fish_instance_buffer: wgpu::Buffer,
    fish_instance_count: u32,

    sphere_geometry: Geometry,
    particle_instance_buffer: wgpu::Buffer,

    world: World,
    pool: ParticlePool,
    starfield: Starfield,
    overlay: StatusOverlay,
    pointer: PointerTracker,
    rng: StdRng,

    frame_count: u32,
    last_fps_update: std::time::Instant,
    fps: u32,
}

impl State {
    async fn new(window: Arc<Window>, cfg: SceneConfig) -> anyhow::Result<Self> {
        use wgpu::util::DeviceExt;

        let mut renderer = Renderer::select(window.clone()).await?;
        renderer.set_clear_color(cfg.clear_color);
        log::info!("rendering on the {:?} path", renderer.kind());

        // Independent probe for the overlay readout; runs off-thread so the
        // overlay shows "checking" until it resolves.
        let status_probe = StatusProbe::spawn();

        let (width, height) = renderer.size();
        let camera = OrthoCamera::new(width, height);
        let mut rng = StdRng::from_entropy();

        let shader = renderer
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Scene Shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("shaders/scene.wgsl").into()),
            });

        let uniforms = Uniforms {
            view_proj: camera.view_projection().to_cols_array_2d(),
        };
        let uniform_buffer = renderer
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Uniform Buffer"),
                contents: bytemuck::cast_slice(&[uniforms]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });

        let uniform_bind_group_layout =
            renderer
                .device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
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
                    label: Some("uniform_bind_group_layout"),
                });

        let uniform_bind_group = renderer
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                layout: &uniform_bind_group_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                }],
                label: Some("uniform_bind_group"),
            });

        let pipeline_layout =
            renderer
                .device
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some("Scene Pipeline Layout"),
                    bind_group_layouts: &[&uniform_bind_group_layout],
                    push_constant_ranges: &[],
                });

        let scene_pipeline =
            renderer
                .device
                .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some("Scene Pipeline"),
                    layout: Some(&pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: &shader,
                        entry_point: Some("vs_main"),
                        buffers: &[GpuVertex::desc(), SceneInstance::desc()],
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: &shader,
                        entry_point: Some("fs_main"),
                        targets: &[Some(wgpu::ColorTargetState {
                            format: renderer.surface_format(),
                            blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                    }),
                    primitive: wgpu::PrimitiveState {
                        topology: wgpu::PrimitiveTopology::TriangleList,
                        strip_index_format: None,
                        front_face: wgpu::FrontFace::Ccw,
                        // Fish fins are two-sided
                        cull_mode: None,
                        polygon_mode: wgpu::PolygonMode::Fill,
                        unclipped_depth: false,
                        conservative: false,
                    },
                    depth_stencil: None,
                    multisample: wgpu::MultisampleState {
                        count: 1,
                        mask: !0,
                        alpha_to_coverage_enabled: false,
                    },
                    multiview: None,
                    cache: None,
                });

        // Fish: procedural mesh by default, OBJ override from config.
        // A configured model that fails to load means no fish are spawned.
        let fish_geometry = assets::resolve_fish_mesh(cfg.fish_model.as_deref())
            .map(|mesh| upload_geometry(&renderer.device, &mesh, "Fish Geometry"));

        let fish_instance_buffer = renderer.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Fish Instance Buffer"),
            size: (cfg.fish_count.max(1) * std::mem::size_of::<SceneInstance>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut world = World::new();
        if fish_geometry.is_some() {
            boids::spawn_fish(&mut world, &cfg, &mut rng);
            log::info!("spawned {} fish", cfg.fish_count);
        }

        // Particles render as small spheres; per-instance scale carries size.
        let sphere_geometry =
            upload_geometry(&renderer.device, &uv_sphere(1.0, 12, 8), "Particle Geometry");

        let pool = ParticlePool::new(cfg.particle_capacity);
        let particle_instance_buffer =
            renderer
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Particle Instance Buffer"),
                    contents: pool.instance_bytes(),
                    usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                });

        let starfield = Starfield::new(
            &renderer.device,
            renderer.surface_format(),
            cfg.star_count,
            width,
            height,
            &mut rng,
        );

        let overlay = StatusOverlay::new(&window, &renderer.device, renderer.surface_format());
        let pointer = PointerTracker::new(width, height);

        let mut lifecycle = Lifecycle::new();
        lifecycle.start();

        Ok(Self {
            window,
            cfg,
            lifecycle,
            renderer,
            status_probe,
            camera,
            scene_pipeline,
            uniform_buffer,
            uniform_bind_group,
            fish_geometry,
            fish_instance_buffer,
            fish_instance_count: 0,
            sphere_geometry,
            particle_instance_buffer,
            world,
            pool,
            starfield,
            overlay,
            pointer,
            rng,
            frame_count: 0,
            last_fps_update: std::time::Instant::now(),
            fps: 0,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.renderer.resize(width, height);
        self.camera.resize(width, height);
        self.starfield.resize(&self.renderer.queue, width, height);
    }

    /// One simulation tick: stars twinkle, fish steer and possibly shed
    /// particles, particles age. No-op outside the running phase.
    fn tick(&mut self) {
        if !self.lifecycle.may_tick() {
            return;
        }

        self.starfield.update(&self.renderer.queue);

        // The camera bounds are the world the fish live in.
        let (half_width, half_height) = self.camera.half_extents();
        let bounds = Bounds {
            half_width,
            half_height,
            depth_half: self.cfg.depth_half,
        };
        boids::step(
            &mut self.world,
            self.pointer.pointer_world(),
            bounds,
            &self.cfg,
            &mut self.pool,
            &mut self.rng,
        );
        self.pool.step();

        self.frame_count += 1;
        let now = std::time::Instant::now();
        if (now - self.last_fps_update).as_secs_f32() >= 1.0 {
            self.fps = self.frame_count;
            self.frame_count = 0;
            self.last_fps_update = now;
        }
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        if !self.lifecycle.may_tick() {
            return Ok(());
        }

        // All buffer writes happen before the render pass.
        if self.fish_geometry.is_some() {
            let instances = boids::fish_instances(&mut self.world, self.cfg.fish_scale);
            self.fish_instance_count = instances.len() as u32;
            if !instances.is_empty() {
                self.renderer.queue.write_buffer(
                    &self.fish_instance_buffer,
                    0,
                    bytemuck::cast_slice(&instances),
                );
            }
        }

        self.renderer.queue.write_buffer(
            &self.particle_instance_buffer,
            0,
            self.pool.instance_bytes(),
        );

        let uniforms = Uniforms {
            view_proj: self.camera.view_projection().to_cols_array_2d(),
        };
        self.renderer
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let output = self.renderer.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder =
            self.renderer
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Render Encoder"),
                });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.renderer.clear_color()),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            // Stars behind everything.
            self.starfield.draw(&mut render_pass);

            render_pass.set_pipeline(&self.scene_pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);

            if let Some(fish) = &self.fish_geometry {
                if self.fish_instance_count > 0 {
                    render_pass.set_vertex_buffer(0, fish.vertex_buffer.slice(..));
                    render_pass.set_vertex_buffer(1, self.fish_instance_buffer.slice(..));
                    render_pass
                        .set_index_buffer(fish.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    render_pass.draw_indexed(0..fish.index_count, 0, 0..self.fish_instance_count);
                }
            }

            // Whole pool every frame; dead slots are zero-scaled.
            render_pass.set_vertex_buffer(0, self.sphere_geometry.vertex_buffer.slice(..));
            render_pass.set_vertex_buffer(1, self.particle_instance_buffer.slice(..));
            render_pass.set_index_buffer(
                self.sphere_geometry.index_buffer.slice(..),
                wgpu::IndexFormat::Uint32,
            );
            render_pass.draw_indexed(
                0..self.sphere_geometry.index_count,
                0,
                0..self.pool.capacity() as u32,
            );
        }

        let (width, height) = self.renderer.size();
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [width, height],
            pixels_per_point: self.window.scale_factor() as f32,
        };
        let stats = OverlayStats {
            fps: self.fps,
            fish_count: self.fish_instance_count as usize,
            live_particles: self.pool.active(),
            resolution: (width, height),
        };
        let status = self.status_probe.poll();
        self.overlay.render(
            &self.renderer.device,
            &self.renderer.queue,
            &mut encoder,
            &self.window,
            &view,
            &screen_descriptor,
            status,
            &stats,
        );

        self.renderer.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    /// Stop ticking for good. Idempotent; GPU resources drop with the state.
    fn dispose(&mut self) {
        if self.lifecycle.dispose() {
            log::info!("scene disposed");
        }
    }
}

// ============================================================================
// MAIN
// ============================================================================

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cfg = SceneConfig::from_env();

    let event_loop = EventLoop::new()?;
    let window_attributes = Window::default_attributes()
        .with_title("Fishpond")
        .with_inner_size(winit::dpi::LogicalSize::new(
            cfg.window_width,
            cfg.window_height,
        ));
    let window = Arc::new(event_loop.create_window(window_attributes)?);

    let mut state = pollster::block_on(State::new(window.clone(), cfg))?;

    event_loop.run(move |event, control_flow| {
        match event {
            WinitEvent::WindowEvent {
                ref event,
                window_id,
            } if window_id == window.id() => {
                let response = state.overlay.handle_window_event(&window, event);
                state.pointer.process_unconsumed(event, response.consumed);

                match event {
                    WindowEvent::CloseRequested
                    | WindowEvent::KeyboardInput {
                        event:
                            KeyEvent {
                                state: ElementState::Pressed,
                                physical_key: PhysicalKey::Code(KeyCode::Escape),
                                ..
                            },
                        ..
                    } => {
                        state.dispose();
                        control_flow.exit();
                    }
                    WindowEvent::KeyboardInput {
                        event:
                            KeyEvent {
                                state: ElementState::Pressed,
                                physical_key: PhysicalKey::Code(KeyCode::F3),
                                repeat: false,
                                ..
                            },
                        ..
                    } => {
                        state.overlay.toggle_stats();
                    }
                    WindowEvent::Resized(physical_size) => {
                        state.resize(physical_size.width, physical_size.height);
                    }
                    WindowEvent::RedrawRequested => {
                        state.tick();
                        match state.render() {
                            Ok(()) => {}
                            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                                let (width, height) = state.renderer.size();
                                state.resize(width, height);
                            }
                            Err(wgpu::SurfaceError::OutOfMemory) => {
                                log::error!("out of GPU memory, shutting down");
                                state.dispose();
                                control_flow.exit();
                            }
                            Err(e) => log::warn!("surface error: {e:?}"),
                        }
                    }
                    _ => {}
                }
            }
            WinitEvent::AboutToWait => {
                // The redraw-request loop is the animation driver; it stops
                // the moment the scene is disposed.
                if state.lifecycle.may_tick() {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    })?;

    Ok(())
}
