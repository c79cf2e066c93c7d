//! Parallel chunk mesh build pool.
//!
//! Worker threads perform pure CPU mesh generation against a shared borrow of the
//! grid. Results are sent via crossbeam channels back to the calling thread, which
//! does all buffer uploads itself.

use crossbeam::channel::{bounded, Sender};
use tracing::warn;

use crate::chunk::{build_region_mesh, ChunkCoord, ChunkMesh};
use crate::height_grid::{CellXZ, HeightGrid};

/// Fraction of detected CPUs to use for mesh worker threads (numerator).
const THREAD_CPU_NUMERATOR: usize = 3;
/// Fraction of detected CPUs to use for mesh worker threads (denominator).
const THREAD_CPU_DENOMINATOR: usize = 4;
/// Minimum number of mesh worker threads.
const MIN_WORKER_THREADS: usize = 2;

/// One chunk region to mesh.
#[derive(Clone, Copy, Debug)]
pub struct MeshRequest {
    pub coord: ChunkCoord,
    pub vertex_offset: CellXZ,
    pub cells_x: u32,
    pub cells_z: u32,
}

/// Mesh built for a [`MeshRequest`].
#[derive(Debug)]
pub struct MeshResult {
    pub coord: ChunkCoord,
    pub mesh: ChunkMesh,
}

/// Worker pool for parallel mesh generation
pub struct MeshBuildPool {
    thread_count: usize,
    /// None when the dedicated pool could not be spawned; the global rayon pool is used instead
    pool: Option<rayon::ThreadPool>,
}

impl MeshBuildPool {
    pub fn new(num_threads: usize) -> Self {
        let detected_cpus = num_cpus::get();
        let threads = if num_threads == 0 {
            ((detected_cpus * THREAD_CPU_NUMERATOR) / THREAD_CPU_DENOMINATOR)
                .max(MIN_WORKER_THREADS)
        } else {
            num_threads
        };

        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("terrain-mesh-{i}"))
            .build()
        {
            Ok(pool) => Some(pool),
            Err(err) => {
                warn!(%err, "failed to spawn mesh build pool, using global rayon pool");
                None
            }
        };

        Self {
            thread_count: threads,
            pool,
        }
    }

    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Build every requested mesh in parallel. Results come back in request order.
    pub fn build_batch(
        &self,
        grid: &HeightGrid,
        requests: &[MeshRequest],
        optimize_indices: bool,
    ) -> Vec<MeshResult> {
        if requests.is_empty() {
            return Vec::new();
        }

        let (result_tx, result_rx) = bounded(requests.len());
        match &self.pool {
            Some(pool) => pool.scope(|scope| {
                spawn_builds(scope, grid, requests, optimize_indices, &result_tx)
            }),
            None => rayon::scope(|scope| {
                spawn_builds(scope, grid, requests, optimize_indices, &result_tx)
            }),
        }
        drop(result_tx);

        let mut results: Vec<(usize, MeshResult)> = result_rx.try_iter().collect();
        results.sort_unstable_by_key(|(slot, _)| *slot);
        results.into_iter().map(|(_, result)| result).collect()
    }
}

fn spawn_builds<'scope>(
    scope: &rayon::Scope<'scope>,
    grid: &'scope HeightGrid,
    requests: &'scope [MeshRequest],
    optimize_indices: bool,
    result_tx: &Sender<(usize, MeshResult)>,
) {
    for (slot, request) in requests.iter().enumerate() {
        let tx = result_tx.clone();
        scope.spawn(move |_| {
            let mesh = build_region_mesh(
                grid,
                request.vertex_offset,
                request.cells_x,
                request.cells_z,
                optimize_indices,
            );
            // Capacity equals the request count, so this never fills
            let _ = tx.try_send((
                slot,
                MeshResult {
                    coord: request.coord,
                    mesh,
                },
            ));
        });
    }
}

impl Default for MeshBuildPool {
    fn default() -> Self {
        Self::new(0)
    }
}
