//! Chunk records and CPU-side heightfield mesh generation.

use std::fmt;

use crate::height_grid::{CellXZ, GridRect, HeightGrid};
use crate::mesh_buffer::BufferHandle;

/// Epsilon for near-zero length checks on normals.
const NORMAL_EPSILON: f32 = 1e-6;

/// Chunk grid coordinate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ChunkCoord {
    pub x: i32,
    pub z: i32,
}

impl ChunkCoord {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// CPU-side triangle mesh of a grid region.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChunkMesh {
    pub vertices: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl ChunkMesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// A fixed region of the grid tracked for dirtiness and uploaded as one buffer.
///
/// Spans `cells + 1` vertices per axis, so its last row/column duplicates the first
/// row/column of the next chunk.
#[derive(Clone, Debug)]
pub struct Chunk {
    pub coord: ChunkCoord,
    /// First vertex of the chunk in global grid indices
    pub vertex_offset: CellXZ,
    /// Cells covered along X and Z (the last chunk on an axis may be short)
    pub cells_x: u32,
    pub cells_z: u32,
    pub dirty: bool,
    pub(crate) buffer: Option<BufferHandle>,
    pub mesh: ChunkMesh,
}

impl Chunk {
    pub fn new(coord: ChunkCoord, vertex_offset: CellXZ, cells_x: u32, cells_z: u32) -> Self {
        Self {
            coord,
            vertex_offset,
            cells_x,
            cells_z,
            dirty: true,
            buffer: None,
            mesh: ChunkMesh::default(),
        }
    }

    pub fn has_buffer(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn buffer(&self) -> Option<BufferHandle> {
        self.buffer
    }

    /// Global vertex rectangle sampled by this chunk, border included.
    pub fn vertex_rect(&self) -> GridRect {
        GridRect::new(
            self.vertex_offset,
            CellXZ::new(
                self.vertex_offset.x + self.cells_x as i32,
                self.vertex_offset.z + self.cells_z as i32,
            ),
        )
    }
}

/// Central-difference normal at a grid vertex, clamped to the grid edges.
///
/// Depends only on global grid state, so vertices shared by two chunks get the
/// same normal in both.
pub fn vertex_normal(grid: &HeightGrid, x: i32, z: i32) -> [f32; 3] {
    let cell = grid.cell_size();
    let max_x = grid.resolution_x() as i32 - 1;
    let max_z = grid.resolution_z() as i32 - 1;

    let (x0, x1) = ((x - 1).max(0), (x + 1).min(max_x));
    let (z0, z1) = ((z - 1).max(0), (z + 1).min(max_z));
    let span_x = (x1 - x0).max(1) as f32 * cell;
    let span_z = (z1 - z0).max(1) as f32 * cell;

    let dhdx = (grid.height_clamped(x1, z) - grid.height_clamped(x0, z)) / span_x;
    let dhdz = (grid.height_clamped(x, z1) - grid.height_clamped(x, z0)) / span_z;

    let n = [-dhdx, 1.0, -dhdz];
    let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
    if len > NORMAL_EPSILON && len.is_finite() {
        [n[0] / len, n[1] / len, n[2] / len]
    } else {
        [0.0, 1.0, 0.0]
    }
}

/// Build the mesh for `cells_x` x `cells_z` cells starting at `offset`, sampling
/// `cells + 1` vertices per axis from the float heightmap.
///
/// Positions and UVs are global (world-space XZ, UV over the whole grid), which
/// keeps shared border vertices bit-identical between neighboring chunks.
pub fn build_region_mesh(
    grid: &HeightGrid,
    offset: CellXZ,
    cells_x: u32,
    cells_z: u32,
    optimize_indices: bool,
) -> ChunkMesh {
    let cell = grid.cell_size();
    let span_u = grid.tiles_x() as f32;
    let span_v = grid.tiles_z() as f32;
    let width = cells_x as usize + 1;
    let depth = cells_z as usize + 1;

    let mut mesh = ChunkMesh {
        vertices: Vec::with_capacity(width * depth),
        normals: Vec::with_capacity(width * depth),
        uvs: Vec::with_capacity(width * depth),
        indices: Vec::with_capacity(cells_x as usize * cells_z as usize * 6),
    };

    for lz in 0..depth as i32 {
        for lx in 0..width as i32 {
            let (x, z) = (offset.x + lx, offset.z + lz);
            let height = grid.height_clamped(x, z);
            mesh.vertices.push([x as f32 * cell, height, z as f32 * cell]);
            mesh.normals.push(vertex_normal(grid, x, z));
            mesh.uvs.push([x as f32 / span_u, z as f32 / span_v]);
        }
    }

    let w = width as u32;
    for lz in 0..cells_z {
        for lx in 0..cells_x {
            let i00 = lz * w + lx;
            let i10 = i00 + 1;
            let i01 = i00 + w;
            let i11 = i01 + 1;
            // Counter-clockwise seen from +Y
            mesh.indices.extend_from_slice(&[i00, i01, i10, i10, i01, i11]);
        }
    }

    if optimize_indices && !mesh.indices.is_empty() {
        mesh.indices = meshopt::optimize_vertex_cache(&mesh.indices, mesh.vertices.len());
    }

    mesh
}
