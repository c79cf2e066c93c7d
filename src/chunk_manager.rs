//! Fixed-capacity chunk layout with dirty tracking and incremental rebuilds.

use tracing::{debug, info, warn};

use crate::chunk::{build_region_mesh, Chunk, ChunkCoord, ChunkMesh};
use crate::config::ChunkConfig;
use crate::error::{TerrainError, TerrainResult};
use crate::height_grid::{CellXZ, HeightGrid};
use crate::mesh_buffer::{release_retired, BufferHandle, MeshBufferResource};
use crate::mesh_worker::{MeshBuildPool, MeshRequest};

/// Outcome of one [`ChunkManager::rebuild_dirty`] call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RebuildReport {
    /// Chunk meshes recomputed
    pub rebuilt: usize,
    /// Buffers created (first successful upload of a chunk)
    pub created: usize,
    /// Buffers updated in place
    pub updated: usize,
    /// Chunks whose upload failed; they stay dirty
    pub failed: Vec<ChunkCoord>,
    /// Buffers of chunks dropped by a re-layout, handed back to the resource
    pub released: usize,
}

impl RebuildReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn uploads(&self) -> usize {
        self.created + self.updated
    }
}

/// Grid dimensions a chunk layout was built for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Layout {
    resolution_x: u32,
    resolution_z: u32,
    chunks_x: i32,
    chunks_z: i32,
}

/// Owns the chunks of one terrain.
///
/// Chunks live in a flat vector indexed by `cz * chunks_x + cx`.
pub struct ChunkManager {
    config: ChunkConfig,
    chunks: Vec<Chunk>,
    layout: Option<Layout>,
    pool: Option<MeshBuildPool>,
    /// Buffers whose chunk no longer exists, released on the next rebuild
    retired: Vec<(ChunkCoord, BufferHandle)>,
}

impl ChunkManager {
    pub fn new(config: ChunkConfig) -> Self {
        let pool = config
            .parallel_rebuild
            .then(|| MeshBuildPool::new(config.worker_threads));
        Self {
            config: ChunkConfig {
                chunk_size: config.chunk_size.max(1),
                ..config
            },
            chunks: Vec::new(),
            layout: None,
            pool,
            retired: Vec::new(),
        }
    }

    /// Whether `grid` can be split into at most `max_chunks` chunks.
    pub fn layout_fits(config: &ChunkConfig, grid: &HeightGrid) -> bool {
        let (chunks_x, chunks_z) = chunk_counts(config.chunk_size.max(1), grid);
        chunks_x as usize * chunks_z as usize <= config.max_chunks
    }

    /// Buffers still waiting to be released.
    pub fn retired(&self) -> &[(ChunkCoord, BufferHandle)] {
        &self.retired
    }

    /// Hand the pending releases to another owner (when the manager is replaced).
    pub fn take_retired(&mut self) -> Vec<(ChunkCoord, BufferHandle)> {
        std::mem::take(&mut self.retired)
    }

    pub fn chunk_size(&self) -> u32 {
        self.config.chunk_size
    }

    pub fn is_initialized(&self) -> bool {
        self.layout.is_some()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        let layout = self.layout?;
        if coord.x < 0 || coord.z < 0 || coord.x >= layout.chunks_x || coord.z >= layout.chunks_z {
            return None;
        }
        self.chunks
            .get((coord.z * layout.chunks_x + coord.x) as usize)
    }

    pub fn dirty_count(&self) -> usize {
        self.chunks.iter().filter(|c| c.dirty).count()
    }

    /// Lay out chunks for `grid`.
    ///
    /// Returns false and leaves zero chunks when the layout would exceed
    /// `max_chunks`; the caller must remesh the whole grid instead. Re-initializing
    /// keeps the buffer handle of every chunk coordinate that survives, so those
    /// chunks are updated in place rather than recreated.
    pub fn initialize(&mut self, grid: &HeightGrid) -> bool {
        let cs = self.config.chunk_size;
        let (chunks_x, chunks_z) = chunk_counts(cs, grid);
        let count = chunks_x as usize * chunks_z as usize;

        if count > self.config.max_chunks {
            warn!(
                chunks_x,
                chunks_z,
                max_chunks = self.config.max_chunks,
                "chunk capacity exceeded, whole-grid remesh required"
            );
            let dropped = std::mem::take(&mut self.chunks);
            self.retire(dropped);
            self.layout = None;
            return false;
        }

        let previous = std::mem::take(&mut self.chunks);
        let mut chunks = Vec::with_capacity(count);
        for cz in 0..chunks_z {
            for cx in 0..chunks_x {
                let offset = CellXZ::new((cx * cs) as i32, (cz * cs) as i32);
                let cells_x = cs.min(grid.tiles_x() - cx * cs);
                let cells_z = cs.min(grid.tiles_z() - cz * cs);
                let coord = ChunkCoord::new(cx as i32, cz as i32);
                let mut chunk = Chunk::new(coord, offset, cells_x, cells_z);
                chunk.buffer = previous
                    .iter()
                    .find(|old| old.coord == coord)
                    .and_then(|old| old.buffer);
                chunks.push(chunk);
            }
        }
        let dropped = previous
            .into_iter()
            .filter(|old| old.coord.x >= chunks_x as i32 || old.coord.z >= chunks_z as i32)
            .collect();
        self.retire(dropped);

        self.chunks = chunks;
        self.layout = Some(Layout {
            resolution_x: grid.resolution_x(),
            resolution_z: grid.resolution_z(),
            chunks_x: chunks_x as i32,
            chunks_z: chunks_z as i32,
        });
        info!(chunks_x, chunks_z, chunk_size = cs, "chunk layout initialized");
        true
    }

    /// Flag every chunk whose vertices (border overlap included) intersect the
    /// inclusive vertex rectangle `min..=max`. Returns the number of chunks flagged.
    ///
    /// The rectangle is grown by one vertex first: a height change moves the
    /// central-difference normals of its neighbors.
    pub fn mark_dirty(&mut self, min: CellXZ, max: CellXZ) -> usize {
        let Some(layout) = self.layout else {
            return 0;
        };
        if min.x > max.x || min.z > max.z {
            return 0;
        }

        let cs = self.config.chunk_size as i32;
        let last_x = layout.resolution_x as i32 - 1;
        let last_z = layout.resolution_z as i32 - 1;
        let (min_x, max_x) = (min.x.saturating_sub(1).max(0), max.x.saturating_add(1).min(last_x));
        let (min_z, max_z) = (min.z.saturating_sub(1).max(0), max.z.saturating_add(1).min(last_z));
        if min_x > max_x || min_z > max_z {
            return 0;
        }

        // A vertex on a chunk boundary also belongs to the chunk before it
        let cx0 = (min_x - 1).max(0) / cs;
        let cz0 = (min_z - 1).max(0) / cs;
        let cx1 = (max_x / cs).min(layout.chunks_x - 1);
        let cz1 = (max_z / cs).min(layout.chunks_z - 1);

        let mut flagged = 0;
        for cz in cz0..=cz1 {
            for cx in cx0..=cx1 {
                let chunk = &mut self.chunks[(cz * layout.chunks_x + cx) as usize];
                chunk.dirty = true;
                flagged += 1;
            }
        }
        flagged
    }

    fn retire(&mut self, dropped: Vec<Chunk>) {
        let before = self.retired.len();
        self.retired
            .extend(dropped.into_iter().filter_map(|c| c.buffer.map(|b| (c.coord, b))));
        if self.retired.len() > before {
            debug!(count = self.retired.len() - before, "chunk buffers retired");
        }
    }

    pub fn mark_all_dirty(&mut self) {
        for chunk in &mut self.chunks {
            chunk.dirty = true;
        }
    }

    /// Rebuild every dirty chunk and push it to `resource`.
    ///
    /// Each chunk gets exactly one `create`; every later rebuild goes through
    /// `update_in_place`. A failed upload leaves the chunk dirty for the next call.
    /// Buffers retired by a re-layout are released first.
    pub fn rebuild_dirty<R: MeshBufferResource + ?Sized>(
        &mut self,
        grid: &HeightGrid,
        resource: &mut R,
    ) -> TerrainResult<RebuildReport> {
        let mut report = RebuildReport {
            released: release_retired(resource, &mut self.retired),
            ..Default::default()
        };
        let Some(layout) = self.layout else {
            return Ok(report);
        };
        if layout.resolution_x != grid.resolution_x() || layout.resolution_z != grid.resolution_z()
        {
            return Err(TerrainError::LayoutMismatch {
                expected_x: layout.resolution_x,
                expected_z: layout.resolution_z,
                actual_x: grid.resolution_x(),
                actual_z: grid.resolution_z(),
            });
        }

        let dirty: Vec<usize> = (0..self.chunks.len())
            .filter(|&i| self.chunks[i].dirty)
            .collect();
        if dirty.is_empty() {
            return Ok(report);
        }

        let optimize = self.config.optimize_indices;
        let meshes: Vec<ChunkMesh> = match &self.pool {
            Some(pool) => {
                let requests: Vec<MeshRequest> = dirty
                    .iter()
                    .map(|&i| {
                        let chunk = &self.chunks[i];
                        MeshRequest {
                            coord: chunk.coord,
                            vertex_offset: chunk.vertex_offset,
                            cells_x: chunk.cells_x,
                            cells_z: chunk.cells_z,
                        }
                    })
                    .collect();
                pool.build_batch(grid, &requests, optimize)
                    .into_iter()
                    .map(|result| result.mesh)
                    .collect()
            }
            None => dirty
                .iter()
                .map(|&i| {
                    let chunk = &self.chunks[i];
                    build_region_mesh(
                        grid,
                        chunk.vertex_offset,
                        chunk.cells_x,
                        chunk.cells_z,
                        optimize,
                    )
                })
                .collect(),
        };

        for (i, mesh) in dirty.into_iter().zip(meshes) {
            let chunk = &mut self.chunks[i];
            chunk.mesh = mesh;
            report.rebuilt += 1;

            let upload = match chunk.buffer {
                Some(handle) => resource
                    .update_in_place(handle, chunk.coord, &chunk.mesh)
                    .map(|()| false),
                None => resource.create(chunk.coord, &chunk.mesh).map(|handle| {
                    chunk.buffer = Some(handle);
                    true
                }),
            };

            match upload {
                Ok(created) => {
                    chunk.dirty = false;
                    if created {
                        report.created += 1;
                    } else {
                        report.updated += 1;
                    }
                    debug!(
                        coord = %chunk.coord,
                        vertices = chunk.mesh.vertex_count(),
                        created,
                        "chunk rebuilt"
                    );
                }
                Err(err) => {
                    warn!(coord = %chunk.coord, %err, "chunk upload failed, keeping it dirty");
                    report.failed.push(chunk.coord);
                }
            }
        }

        Ok(report)
    }
}

fn chunk_counts(chunk_size: u32, grid: &HeightGrid) -> (u32, u32) {
    (
        grid.tiles_x().div_ceil(chunk_size),
        grid.tiles_z().div_ceil(chunk_size),
    )
}
