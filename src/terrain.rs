// Terrain generation for the mine slope mesh.

use glam::Vec3;

/// Deterministic slope height at plane coordinate (x, y).
///
/// This is the authored topology of the pit wall: a low-frequency ripple with
/// a linear grade along x.
pub fn slope_height(x: f32, y: f32) -> f32 {
    (x * 0.3).sin() * (y * 0.2).cos() * 2.0 + x * 0.2
}

/// A displaced grid mesh, authored flat in the XY plane with z carrying the
/// height. Immutable after construction; the scene bends it into the ground
/// plane when baking draw batches.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainMesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
}

/// Builds the slope mesh: a regular (ws+1) x (hs+1) vertex grid spanning
/// `width` x `depth` centered at the origin, displaced by [`slope_height`],
/// then smooth-shaded with averaged face normals.
///
/// Pure function: identical arguments produce bit-identical output.
pub fn build(width_segments: u32, height_segments: u32, width: f32, depth: f32) -> TerrainMesh {
    let cols = width_segments + 1;
    let rows = height_segments + 1;
    let mut positions = Vec::with_capacity((cols * rows) as usize);

    // Row 0 runs along the +y edge, matching the reference plane layout.
    for row in 0..rows {
        let y = depth / 2.0 - depth * row as f32 / height_segments as f32;
        for col in 0..cols {
            let x = -width / 2.0 + width * col as f32 / width_segments as f32;
            positions.push(Vec3::new(x, y, slope_height(x, y)));
        }
    }

    let mut indices = Vec::with_capacity((width_segments * height_segments * 6) as usize);
    for row in 0..height_segments {
        for col in 0..width_segments {
            let a = row * cols + col;
            let b = a + 1;
            let c = a + cols;
            let d = c + 1;
            // Two CCW triangles per cell, seen from +z.
            indices.extend_from_slice(&[a, c, b, b, c, d]);
        }
    }

    let normals = smooth_normals(&positions, &indices);

    TerrainMesh {
        positions,
        normals,
        indices,
    }
}

/// Per-vertex normals from averaging the face normals of adjacent triangles.
fn smooth_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut accum = vec![Vec3::ZERO; positions.len()];

    for tri in indices.chunks_exact(3) {
        let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        let face = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
        accum[a] += face;
        accum[b] += face;
        accum[c] += face;
    }

    accum
        .into_iter()
        .map(|n| n.normalize_or_zero())
        .collect()
}
