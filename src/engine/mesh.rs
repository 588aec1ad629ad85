// Mesh types and the two procedural meshes the scene needs:
// a stylized fish body (used when no OBJ model is configured) and a
// low-poly sphere shared by all particle instances.

use glam::Vec3;

// ============================================================================
// GPU VERTEX
// ============================================================================

/// GPU-ready vertex with position and normal:
///   @location(0) position: vec3<f32>
///   @location(1) normal:   vec3<f32>
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl GpuVertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GpuVertex>() as wgpu::BufferAddress,
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
            ],
        }
    }
}

// ============================================================================
// INSTANCE DATA
// ============================================================================

/// Per-instance data for the batched scene pipeline: a model matrix and an
/// RGBA color (alpha carries fade-out for particles, 1.0 for fish).
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SceneInstance {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
}

impl SceneInstance {
    /// Invisible slot: zero scale collapses the mesh to a point.
    pub fn hidden() -> Self {
        Self {
            model: glam::Mat4::from_scale(Vec3::ZERO).to_cols_array_2d(),
            color: [1.0, 1.0, 1.0, 0.0],
        }
    }

    pub fn new(model: glam::Mat4, color: Vec3, alpha: f32) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            color: [color.x, color.y, color.z, alpha],
        }
    }

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        const VEC4: u64 = std::mem::size_of::<[f32; 4]>() as u64;
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SceneInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                // Model matrix columns (locations 2-5)
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: VEC4,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: 2 * VEC4,
                    shader_location: 4,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: 3 * VEC4,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
                // RGBA color (location 6)
                wgpu::VertexAttribute {
                    offset: 4 * VEC4,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

// ============================================================================
// RENDER MESH
// ============================================================================

/// GPU-ready triangulated mesh with shared-vertex smooth normals.
/// Upload vertex_bytes() to a VERTEX buffer, index_bytes() to an INDEX buffer.
pub struct RenderMesh {
    pub vertices: Vec<GpuVertex>,
    pub indices: Vec<u32>,
}

impl RenderMesh {
    /// Build from raw positions + triangle indices, computing smooth
    /// (area-weighted) normals. The cross product is left unnormalized per
    /// triangle so its magnitude (2× area) weights the accumulation.
    pub fn from_positions(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        let mut normal_accum = vec![Vec3::ZERO; positions.len()];

        for tri in indices.chunks_exact(3) {
            let a = positions[tri[0] as usize];
            let b = positions[tri[1] as usize];
            let c = positions[tri[2] as usize];
            let weighted = (b - a).cross(c - a);
            normal_accum[tri[0] as usize] += weighted;
            normal_accum[tri[1] as usize] += weighted;
            normal_accum[tri[2] as usize] += weighted;
        }

        let vertices = positions
            .iter()
            .zip(normal_accum.iter())
            .map(|(pos, n)| GpuVertex {
                position: pos.to_array(),
                normal: n.normalize_or_zero().to_array(),
            })
            .collect();

        Self { vertices, indices }
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}

// ============================================================================
// PARTICLE SPHERE
// ============================================================================

/// Low-poly unit UV sphere. The reference scene uses 6 segments × 4 rings;
/// at gold-dust size anything finer is wasted vertices.
pub fn uv_sphere(radius: f32, segments: u32, rings: u32) -> RenderMesh {
    debug_assert!(segments >= 3 && rings >= 2);

    let mut positions = Vec::new();
    let mut indices = Vec::new();

    // Latitude rings from the north pole (inclusive poles).
    for ring in 0..=rings {
        let phi = std::f32::consts::PI * ring as f32 / rings as f32;
        for seg in 0..=segments {
            let theta = std::f32::consts::TAU * seg as f32 / segments as f32;
            positions.push(Vec3::new(
                radius * phi.sin() * theta.cos(),
                radius * phi.cos(),
                radius * phi.sin() * theta.sin(),
            ));
        }
    }

    let stride = segments + 1;
    for ring in 0..rings {
        for seg in 0..segments {
            let a = ring * stride + seg;
            let b = a + stride;
            indices.extend_from_slice(&[a, b, a + 1]);
            indices.extend_from_slice(&[a + 1, b, b + 1]);
        }
    }

    RenderMesh::from_positions(positions, indices)
}

// ============================================================================
// PROCEDURAL FISH
// ============================================================================

/// Body profile: (x along the fish axis, cross-section radius).
/// Nose at +X, tail peduncle at -X; the orientation code assumes +X forward.
const FISH_PROFILE: &[(f32, f32)] = &[
    (0.62, 0.10),
    (0.35, 0.20),
    (0.00, 0.26),
    (-0.35, 0.16),
    (-0.58, 0.06),
];

const FISH_SEGMENTS: u32 = 6;

/// Stylized fish: ringed body with a nose point and a flat two-sided tail fin.
/// Unit-ish scale — the scene applies the configured model scale on top.
pub fn fish_mesh() -> RenderMesh {
    let mut positions = Vec::new();
    let mut indices: Vec<u32> = Vec::new();

    let nose = positions.len() as u32;
    positions.push(Vec3::new(0.8, 0.0, 0.0));

    // Elliptical cross sections, laterally flattened like a real fish.
    let mut first_ring = 0;
    for (i, &(x, r)) in FISH_PROFILE.iter().enumerate() {
        let ring_start = positions.len() as u32;
        if i == 0 {
            first_ring = ring_start;
        }
        for seg in 0..FISH_SEGMENTS {
            let theta = std::f32::consts::TAU * seg as f32 / FISH_SEGMENTS as f32;
            positions.push(Vec3::new(x, r * theta.cos(), r * 0.55 * theta.sin()));
        }
        if i > 0 {
            let prev = ring_start - FISH_SEGMENTS;
            for seg in 0..FISH_SEGMENTS {
                let next = (seg + 1) % FISH_SEGMENTS;
                indices.extend_from_slice(&[prev + seg, ring_start + seg, prev + next]);
                indices.extend_from_slice(&[prev + next, ring_start + seg, ring_start + next]);
            }
        }
    }

    // Nose cap fan onto the first ring.
    for seg in 0..FISH_SEGMENTS {
        let next = (seg + 1) % FISH_SEGMENTS;
        indices.extend_from_slice(&[nose, first_ring + seg, first_ring + next]);
    }

    // Tail cap: collapse the last ring onto the peduncle tip.
    let last_ring = positions.len() as u32 - FISH_SEGMENTS;
    let tip = positions.len() as u32;
    positions.push(Vec3::new(-0.66, 0.0, 0.0));
    for seg in 0..FISH_SEGMENTS {
        let next = (seg + 1) % FISH_SEGMENTS;
        indices.extend_from_slice(&[last_ring + seg, tip, last_ring + next]);
    }

    // Flat vertical tail fin. Front and back faces get their own vertices
    // (opposite windings) so back-face culling never hides the fin and the
    // two sides keep opposing normals instead of cancelling out.
    let fin_shape = [
        Vec3::new(-0.62, 0.0, 0.0),
        Vec3::new(-0.95, 0.30, 0.0),
        Vec3::new(-1.0, 0.0, 0.0),
        Vec3::new(-0.95, -0.30, 0.0),
    ];
    let fin = positions.len() as u32;
    positions.extend_from_slice(&fin_shape);
    indices.extend_from_slice(&[fin, fin + 1, fin + 2]);
    indices.extend_from_slice(&[fin, fin + 2, fin + 3]);
    let back = positions.len() as u32;
    positions.extend_from_slice(&fin_shape);
    indices.extend_from_slice(&[back, back + 2, back + 1]);
    indices.extend_from_slice(&[back, back + 3, back + 2]);

    RenderMesh::from_positions(positions, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_well_formed(mesh: &RenderMesh) {
        assert!(!mesh.vertices.is_empty());
        assert_eq!(mesh.indices.len() % 3, 0);
        for &i in &mesh.indices {
            assert!((i as usize) < mesh.vertices.len(), "index out of range");
        }
    }

    #[test]
    fn sphere_is_well_formed_and_on_radius() {
        let mesh = uv_sphere(1.0, 6, 4);
        assert_well_formed(&mesh);
        for v in &mesh.vertices {
            let r = Vec3::from_array(v.position).length();
            assert!((r - 1.0).abs() < 1e-4, "vertex off the unit sphere: {r}");
        }
    }

    #[test]
    fn fish_mesh_is_well_formed() {
        let mesh = fish_mesh();
        assert_well_formed(&mesh);

        // Nose ahead of tail along +X.
        let xs: Vec<f32> = mesh.vertices.iter().map(|v| v.position[0]).collect();
        let max_x = xs.iter().cloned().fold(f32::MIN, f32::max);
        let min_x = xs.iter().cloned().fold(f32::MAX, f32::min);
        assert!(max_x > 0.5 && min_x < -0.5);
    }

    #[test]
    fn smooth_normals_are_unit_length() {
        let mesh = fish_mesh();
        for v in &mesh.vertices {
            let n = Vec3::from_array(v.normal).length();
            assert!((n - 1.0).abs() < 1e-3, "non-unit normal: {n}");
        }
    }
}
