// Fish model loading.
//
// The scene treats the model as an external asset: if a configured model
// cannot be loaded the failure is logged and the scene simply runs with no
// fish (stars and any residual particles still render). Only a minimal OBJ
// subset is understood — `v` positions and `f` faces (fan-triangulated);
// normals are recomputed, everything else is ignored.

use anyhow::{Context, bail};
use glam::Vec3;
use std::path::Path;

use super::mesh::{RenderMesh, fish_mesh};

/// Parse an OBJ file into a RenderMesh.
pub fn load_fish_obj(path: &Path) -> anyhow::Result<RenderMesh> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading fish model {}", path.display()))?;
    parse_obj(&text).with_context(|| format!("parsing fish model {}", path.display()))
}

/// Resolve the mesh the fish batch will use.
///
/// `None` model path → procedural fish (always available).
/// `Some` path that fails to load → `None`: the agent set stays empty.
pub fn resolve_fish_mesh(model: Option<&Path>) -> Option<RenderMesh> {
    match model {
        None => Some(fish_mesh()),
        Some(path) => match load_fish_obj(path) {
            Ok(mesh) => {
                log::info!(
                    "loaded fish model {} ({} vertices)",
                    path.display(),
                    mesh.vertices.len()
                );
                Some(mesh)
            }
            Err(err) => {
                log::error!("fish model unavailable, running without fish: {err:#}");
                None
            }
        },
    }
}

fn parse_obj(text: &str) -> anyhow::Result<RenderMesh> {
    let mut positions: Vec<Vec3> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        let mut fields = line.split_whitespace();
        match fields.next() {
            Some("v") => {
                let mut coord = || -> anyhow::Result<f32> {
                    fields
                        .next()
                        .with_context(|| format!("line {}: vertex missing coordinate", line_no + 1))?
                        .parse()
                        .with_context(|| format!("line {}: bad vertex coordinate", line_no + 1))
                };
                let (x, y, z) = (coord()?, coord()?, coord()?);
                positions.push(Vec3::new(x, y, z));
            }
            Some("f") => {
                let mut face: Vec<u32> = Vec::new();
                for field in fields {
                    // "i", "i/t", "i/t/n", "i//n" — only the position index matters.
                    let idx_str = field.split('/').next().unwrap_or(field);
                    let idx: i64 = idx_str
                        .parse()
                        .with_context(|| format!("line {}: bad face index", line_no + 1))?;
                    // OBJ indices are 1-based; negative indices count from the end.
                    let resolved = if idx > 0 {
                        idx - 1
                    } else {
                        positions.len() as i64 + idx
                    };
                    if resolved < 0 || resolved as usize >= positions.len() {
                        bail!("line {}: face index {} out of range", line_no + 1, idx);
                    }
                    face.push(resolved as u32);
                }
                if face.len() < 3 {
                    bail!("line {}: face with fewer than 3 vertices", line_no + 1);
                }
                for i in 1..face.len() - 1 {
                    indices.extend_from_slice(&[face[0], face[i], face[i + 1]]);
                }
            }
            // Comments, normals, texcoords, groups, materials: ignored.
            _ => {}
        }
    }

    if positions.is_empty() || indices.is_empty() {
        bail!("model contains no geometry");
    }
    Ok(RenderMesh::from_positions(positions, indices))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TETRA: &str = "\
# tiny tetrahedron
v 0 0 0
v 1 0 0
v 0 1 0
v 0 0 1
f 1 2 3
f 1 4 2
f 1 3 4
f 2 4 3
";

    #[test]
    fn parses_minimal_obj() {
        let mesh = parse_obj(TETRA).expect("parse");
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices.len(), 12);
    }

    #[test]
    fn quad_faces_fan_triangulate() {
        let obj = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";
        let mesh = parse_obj(obj).expect("parse");
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn slash_and_negative_indices_resolve() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1/1/1 2//2 -1\n";
        let mesh = parse_obj(obj).expect("parse");
        assert_eq!(mesh.indices, vec![0, 1, 2]);
    }

    #[test]
    fn rejects_out_of_range_and_empty_models() {
        assert!(parse_obj("v 0 0 0\nf 1 2 3\n").is_err());
        assert!(parse_obj("# nothing here\n").is_err());
        assert!(parse_obj("v 0 0 0\nv 1 0 0\nf 1 2\n").is_err());
    }

    #[test]
    fn missing_model_falls_back_to_empty_agent_set() {
        let missing = Path::new("/definitely/not/here.obj");
        assert!(resolve_fish_mesh(Some(missing)).is_none());
        assert!(resolve_fish_mesh(None).is_some());
    }
}
