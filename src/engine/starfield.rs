// Twinkling starfield backdrop.
//
// The stars are a 2D overlay in viewport pixel space, independent of the 3D
// scene: fixed positions, per-star oscillation phase, opacity recomputed
// every tick from base + sin(phase) * 0.1. Rendered as one instanced draw of
// a 1 px quad per star, first in the frame so everything else layers on top.
//
// The pure twinkle model (`TwinkleSet`) is separate from the GPU wrapper so
// the update math is testable without a device.

use glam::Vec2;
use rand::Rng;
use wgpu::util::DeviceExt;

/// Phase advance per tick (radians).
const TWINKLE_STEP: f32 = 0.02;
/// Oscillation amplitude around the base opacity.
const TWINKLE_AMPLITUDE: f32 = 0.1;
/// Star radius in pixels.
const STAR_RADIUS: f32 = 1.0;

// ============================================================================
// TWINKLE MODEL
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct Star {
    /// Fixed position in viewport pixels (top-left origin).
    pub position: Vec2,
    pub base_opacity: f32,
    pub phase: f32,
    /// Derived each tick; stored so the instance upload is a plain copy.
    pub opacity: f32,
}

pub struct TwinkleSet {
    stars: Vec<Star>,
}

impl TwinkleSet {
    /// Scatter `count` stars over the viewport with randomized base opacity
    /// (0.2..0.5) and phase. Positions never change afterwards.
    pub fn new<R: Rng>(count: usize, width: u32, height: u32, rng: &mut R) -> Self {
        let stars = (0..count)
            .map(|_| {
                let base = 0.2 + rng.r#gen::<f32>() * 0.3;
                Star {
                    position: Vec2::new(
                        rng.r#gen::<f32>() * width as f32,
                        rng.r#gen::<f32>() * height as f32,
                    ),
                    base_opacity: base,
                    phase: rng.r#gen::<f32>() * std::f32::consts::TAU,
                    opacity: base,
                }
            })
            .collect();
        Self { stars }
    }

    /// Advance every star's phase one tick and derive its current opacity.
    pub fn update(&mut self) {
        for star in &mut self.stars {
            star.phase += TWINKLE_STEP;
            star.opacity = star.base_opacity + star.phase.sin() * TWINKLE_AMPLITUDE;
        }
    }

    pub fn stars(&self) -> &[Star] {
        &self.stars
    }

    fn instances(&self) -> Vec<StarInstance> {
        self.stars
            .iter()
            .map(|s| StarInstance {
                center: s.position.to_array(),
                radius: STAR_RADIUS,
                opacity: s.opacity,
            })
            .collect()
    }
}

// ============================================================================
// GPU OVERLAY
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct StarInstance {
    center: [f32; 2],
    radius: f32,
    opacity: f32,
}

impl StarInstance {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<StarInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32,
                },
            ],
        }
    }
}

/// Viewport uniform for the pixel → NDC mapping.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct StarUniforms {
    viewport: [f32; 2],
    _padding: [f32; 2],
}

pub struct Starfield {
    twinkle: TwinkleSet,
    pipeline: wgpu::RenderPipeline,
    instance_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    count: u32,
}

impl Starfield {
    pub fn new<R: Rng>(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        count: usize,
        width: u32,
        height: u32,
        rng: &mut R,
    ) -> Self {
        let twinkle = TwinkleSet::new(count, width, height, rng);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Stars Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/stars.wgsl").into()),
        });

        let uniforms = StarUniforms {
            viewport: [width as f32, height as f32],
            _padding: [0.0; 2],
        };
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Star Uniform Buffer"),
            contents: bytemuck::cast_slice(&[uniforms]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
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
                label: Some("star_bind_group_layout"),
            });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some("star_bind_group"),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Star Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Star Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[StarInstance::desc()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
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

        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Star Instance Buffer"),
            size: (count.max(1) * std::mem::size_of::<StarInstance>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            twinkle,
            pipeline,
            instance_buffer,
            uniform_buffer,
            bind_group,
            count: count as u32,
        }
    }

    /// Advance the twinkle and push the refreshed instances to the GPU.
    pub fn update(&mut self, queue: &wgpu::Queue) {
        self.twinkle.update();
        if self.count > 0 {
            queue.write_buffer(
                &self.instance_buffer,
                0,
                bytemuck::cast_slice(&self.twinkle.instances()),
            );
        }
    }

    /// Keep the pixel → NDC mapping in sync with the surface.
    /// Star positions are fixed; stars past a shrunken edge go off-screen.
    pub fn resize(&self, queue: &wgpu::Queue, width: u32, height: u32) {
        let uniforms = StarUniforms {
            viewport: [width as f32, height as f32],
            _padding: [0.0; 2],
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));
    }

    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        if self.count == 0 {
            return;
        }
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.instance_buffer.slice(..));
        // 6 vertices = one quad, expanded in the vertex shader.
        render_pass.draw(0..6, 0..self.count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn stars_scatter_inside_the_viewport() {
        let mut rng = StdRng::seed_from_u64(11);
        let set = TwinkleSet::new(80, 1280, 720, &mut rng);
        assert_eq!(set.stars().len(), 80);
        for star in set.stars() {
            assert!((0.0..1280.0).contains(&star.position.x));
            assert!((0.0..720.0).contains(&star.position.y));
            assert!((0.2..=0.5).contains(&star.base_opacity));
        }
    }

    #[test]
    fn twinkle_follows_base_plus_sine_of_phase() {
        let mut rng = StdRng::seed_from_u64(12);
        let mut set = TwinkleSet::new(8, 640, 480, &mut rng);
        let before: Vec<(f32, f32)> = set
            .stars()
            .iter()
            .map(|s| (s.base_opacity, s.phase))
            .collect();

        set.update();

        for (star, (base, phase)) in set.stars().iter().zip(before) {
            let expected = base + (phase + TWINKLE_STEP).sin() * TWINKLE_AMPLITUDE;
            assert!((star.opacity - expected).abs() < 1e-6);
            // Base opacity and position never drift.
            assert_eq!(star.base_opacity, base);
        }
    }

    #[test]
    fn positions_survive_many_updates() {
        let mut rng = StdRng::seed_from_u64(13);
        let mut set = TwinkleSet::new(16, 800, 600, &mut rng);
        let positions: Vec<Vec2> = set.stars().iter().map(|s| s.position).collect();
        for _ in 0..500 {
            set.update();
        }
        for (star, pos) in set.stars().iter().zip(positions) {
            assert_eq!(star.position, pos);
        }
    }

    #[test]
    fn opacity_stays_within_the_twinkle_band() {
        let mut rng = StdRng::seed_from_u64(14);
        let mut set = TwinkleSet::new(32, 800, 600, &mut rng);
        for _ in 0..1000 {
            set.update();
            for star in set.stars() {
                assert!(star.opacity >= star.base_opacity - TWINKLE_AMPLITUDE - 1e-6);
                assert!(star.opacity <= star.base_opacity + TWINKLE_AMPLITUDE + 1e-6);
            }
        }
    }
}
