//! Per-vertex tangent frames for assets that don't ship them.

use cgmath::{InnerSpace, Vector2, Vector3, Zero};

/// Computes unit tangents and bitangents from triangle edges and UV deltas.
///
/// Contributions from every triangle touching a vertex are summed and then
/// normalised. The bitangent is flipped to match top-left UV origin, so a
/// +Y-up normal map lights correctly. Triangles with degenerate UVs or
/// out-of-range indices contribute nothing; vertices without any usable
/// triangle keep zero vectors.
pub fn generate_tangents(
    positions: &[[f32; 3]],
    tex_coords: &[[f32; 2]],
    indices: &[u32],
) -> (Vec<[f32; 3]>, Vec<[f32; 3]>) {
    let count = positions.len();
    let mut tangents = vec![Vector3::<f32>::zero(); count];
    let mut bitangents = vec![Vector3::<f32>::zero(); count];

    for triangle in indices.chunks_exact(3) {
        let [a, b, c] = [triangle[0] as usize, triangle[1] as usize, triangle[2] as usize];
        if a >= count || b >= count || c >= count || tex_coords.len() < count {
            continue;
        }

        let pos0 = Vector3::from(positions[a]);
        let delta_pos1 = Vector3::from(positions[b]) - pos0;
        let delta_pos2 = Vector3::from(positions[c]) - pos0;

        let uv0 = Vector2::from(tex_coords[a]);
        let delta_uv1 = Vector2::from(tex_coords[b]) - uv0;
        let delta_uv2 = Vector2::from(tex_coords[c]) - uv0;

        let determinant = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
        if determinant.abs() <= f32::EPSILON {
            continue;
        }
        let r = 1.0 / determinant;
        let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;
        let bitangent = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * -r;

        for index in [a, b, c] {
            tangents[index] += tangent;
            bitangents[index] += bitangent;
        }
    }

    let finish = |vectors: Vec<Vector3<f32>>| -> Vec<[f32; 3]> {
        vectors
            .into_iter()
            .map(|v| {
                if v.magnitude2() > 0.0 {
                    v.normalize().into()
                } else {
                    [0.0; 3]
                }
            })
            .collect()
    };

    (finish(tangents), finish(bitangents))
}
