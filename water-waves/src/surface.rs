//! Vertex and index data for whoever draws the surface.
//!
//! `WaveField` itself knows nothing about vertex formats. These helpers copy
//! positions and normals out once per frame and derive texture coordinates
//! from the world XZ layout.

use crate::error::{Result, WaveError};
use crate::grid::Grid;
use crate::wavefield::WaveField;

/// Largest vertex count addressable by a 16-bit index buffer.
pub const MAX_U16_VERTICES: usize = u16::MAX as usize + 1;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct SurfaceVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Refill `out` with one vertex per grid point.
pub fn write_vertices(field: &WaveField, out: &mut Vec<SurfaceVertex>) {
    let width = field.width();
    let depth = field.depth();

    out.clear();
    out.reserve(field.vertex_count());
    out.extend(
        field
            .positions()
            .iter()
            .zip(field.normals())
            .map(|(p, n)| SurfaceVertex {
                position: p.as_vec3().to_array(),
                normal: n.as_vec3().to_array(),
                uv: [(0.5 + p.x / width) as f32, (0.5 - p.z / depth) as f32],
            }),
    );
}

/// Two triangles per grid quad, wound the same way for every quad.
pub fn triangle_indices(grid: &Grid) -> Result<Vec<u16>> {
    let vertex_count = grid.vertex_count();
    if vertex_count > MAX_U16_VERTICES {
        return Err(WaveError::IndexOverflow {
            vertex_count,
            limit: MAX_U16_VERTICES,
        });
    }

    let n = grid.cols;
    let mut indices = Vec::with_capacity(grid.triangle_count() * 3);
    for i in 0..grid.rows - 1 {
        for j in 0..n - 1 {
            let top_left = (i * n + j) as u16;
            let top_right = (i * n + j + 1) as u16;
            let bottom_left = ((i + 1) * n + j) as u16;
            let bottom_right = ((i + 1) * n + j + 1) as u16;

            indices.extend_from_slice(&[top_left, top_right, bottom_left]);
            indices.extend_from_slice(&[bottom_left, top_right, bottom_right]);
        }
    }
    Ok(indices)
}
