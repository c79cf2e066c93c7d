//! Terrain editing session: grid, brushes, remeshing, cadence, and undo in one owner.
//!
//! The editor is the single logical owner of the [`HeightGrid`]. All brush calls and
//! rebuilds go through `&mut self`, which serializes them.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::brush::{BrushEngine, BrushSettings};
use crate::cadence::RebuildCadence;
use crate::chunk::{build_region_mesh, ChunkCoord, ChunkMesh};
use crate::chunk_manager::{ChunkManager, RebuildReport};
use crate::config::TerrainConfig;
use crate::error::TerrainResult;
use crate::height_grid::{
    CellXZ, GridRect, GridSnapshot, HeightGrid, LevelState, ModificationResult,
};
use crate::mesh_buffer::{release_retired, BufferHandle, MeshBufferResource};
use crate::tile_brush::{
    apply_ramp_path, apply_tile_level_delta_brush, apply_tile_set_level_brush,
    bake_heightmap_into_levels, enforce_cliff_constraints_with_margin, sync_heightmap_from_levels,
};
use crate::undo::UndoHistory;

/// Single mesh over the whole grid, used when the chunk layout exceeds capacity.
///
/// Follows the same discipline as a chunk: one `create`, then in-place updates.
#[derive(Debug, Default)]
pub struct WholeGridMesh {
    dirty: bool,
    buffer: Option<BufferHandle>,
    mesh: ChunkMesh,
}

impl WholeGridMesh {
    fn new() -> Self {
        Self {
            dirty: true,
            ..Default::default()
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn has_buffer(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn mesh(&self) -> &ChunkMesh {
        &self.mesh
    }

    fn rebuild<R: MeshBufferResource + ?Sized>(
        &mut self,
        grid: &HeightGrid,
        resource: &mut R,
        optimize_indices: bool,
    ) -> RebuildReport {
        let mut report = RebuildReport::default();
        if !self.dirty {
            return report;
        }

        let coord = ChunkCoord::default();
        self.mesh = build_region_mesh(
            grid,
            CellXZ::new(0, 0),
            grid.tiles_x(),
            grid.tiles_z(),
            optimize_indices,
        );
        report.rebuilt = 1;

        let upload = match self.buffer {
            Some(handle) => resource.update_in_place(handle, coord, &self.mesh).map(|()| None),
            None => resource.create(coord, &self.mesh).map(Some),
        };
        match upload {
            Ok(created) => {
                self.dirty = false;
                if let Some(handle) = created {
                    self.buffer = Some(handle);
                    report.created = 1;
                } else {
                    report.updated = 1;
                }
            }
            Err(err) => {
                warn!(%err, "whole-grid upload failed, keeping it dirty");
                report.failed.push(coord);
            }
        }
        report
    }
}

/// How the editor turns the grid into meshes.
pub enum Remesher {
    Chunked(ChunkManager),
    WholeGrid(WholeGridMesh),
}

impl Remesher {
    fn for_grid(config: &TerrainConfig, grid: &HeightGrid) -> Self {
        let mut chunks = ChunkManager::new(config.chunks.clone());
        if chunks.initialize(grid) {
            Remesher::Chunked(chunks)
        } else {
            info!(
                resolution_x = grid.resolution_x(),
                resolution_z = grid.resolution_z(),
                "using whole-grid remeshing"
            );
            Remesher::WholeGrid(WholeGridMesh::new())
        }
    }

    fn mark_dirty(&mut self, rect: GridRect) {
        match self {
            Remesher::Chunked(chunks) => {
                chunks.mark_dirty(rect.min, rect.max);
            }
            Remesher::WholeGrid(whole) => whole.dirty = true,
        }
    }

    fn mark_all_dirty(&mut self) {
        match self {
            Remesher::Chunked(chunks) => chunks.mark_all_dirty(),
            Remesher::WholeGrid(whole) => whole.dirty = true,
        }
    }

    pub fn is_chunked(&self) -> bool {
        matches!(self, Remesher::Chunked(_))
    }
}

pub struct TerrainEditor {
    config: TerrainConfig,
    grid: HeightGrid,
    brushes: BrushEngine,
    remesher: Remesher,
    cadence: RebuildCadence,
    history: UndoHistory,
    /// Buffers left over from a remesher that was replaced
    retired: Vec<(ChunkCoord, BufferHandle)>,
}

impl TerrainEditor {
    /// Flat terrain from a validated configuration.
    pub fn new(config: TerrainConfig) -> TerrainResult<Self> {
        config.validate()?;
        let grid = HeightGrid::new(&config.grid)?;
        Ok(Self::with_grid(config, grid))
    }

    /// Terrain loaded from persisted data (legacy float-only data is re-quantized).
    pub fn from_snapshot(config: TerrainConfig, snapshot: &GridSnapshot) -> TerrainResult<Self> {
        config.validate()?;
        let grid = HeightGrid::from_snapshot(snapshot)?;
        Ok(Self::with_grid(config, grid))
    }

    fn with_grid(config: TerrainConfig, grid: HeightGrid) -> Self {
        let remesher = Remesher::for_grid(&config, &grid);
        Self {
            brushes: BrushEngine::new(config.editing.noise_seed),
            cadence: RebuildCadence::new(config.editing.rebuild_hz),
            history: UndoHistory::new(config.editing.undo_depth),
            remesher,
            retired: Vec::new(),
            grid,
            config,
        }
    }

    pub fn grid(&self) -> &HeightGrid {
        &self.grid
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    pub fn remesher(&self) -> &Remesher {
        &self.remesher
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// One tick of a continuous brush. Edits stay in float space until the next
    /// discrete edit, stroke boundary, or snapshot bakes them into levels.
    pub fn apply_brush(
        &mut self,
        world_pos: [f32; 3],
        settings: &BrushSettings,
        delta_time: f32,
    ) -> ModificationResult {
        let result = self
            .brushes
            .apply_brush(&mut self.grid, world_pos, settings, delta_time);
        if result.modified {
            self.mark_dirty(&result);
        }
        result
    }

    /// Shift tile levels by `delta`, then enforce cliffs around the edit.
    ///
    /// The returned result covers the brush footprint and every vertex the cliff
    /// pass changed.
    pub fn apply_tile_level_delta(
        &mut self,
        local: [f32; 3],
        delta: i32,
        radius_tiles: i32,
    ) -> ModificationResult {
        self.discrete_edit(|grid| apply_tile_level_delta_brush(grid, local, delta, radius_tiles))
    }

    pub fn apply_tile_set_level(
        &mut self,
        local: [f32; 3],
        level: i32,
        radius_tiles: i32,
    ) -> ModificationResult {
        self.discrete_edit(|grid| apply_tile_set_level_brush(grid, local, level, radius_tiles))
    }

    pub fn apply_ramp(
        &mut self,
        start_local: [f32; 3],
        end_local: [f32; 3],
        width_tiles: i32,
    ) -> ModificationResult {
        self.discrete_edit(|grid| apply_ramp_path(grid, start_local, end_local, width_tiles))
    }

    fn discrete_edit(
        &mut self,
        edit: impl FnOnce(&mut HeightGrid) -> ModificationResult,
    ) -> ModificationResult {
        self.bake_pending();

        let mut result = edit(&mut self.grid);
        if !result.modified {
            return result;
        }

        if let Some(max_step) = self.config.editing.max_cliff_step {
            let cliffs = enforce_cliff_constraints_with_margin(
                &mut self.grid,
                result.min_affected,
                result.max_affected,
                max_step,
                self.config.editing.cliff_margin,
            );
            result.merge(&cliffs);
        }
        self.mark_dirty(&result);
        result
    }

    /// Commit pending continuous-brush edits into levels.
    fn bake_pending(&mut self) {
        if self.grid.pending_float_edits().is_none() {
            return;
        }
        let baked = bake_heightmap_into_levels(&mut self.grid, None);
        debug!(changed = baked.vertices_changed, "baked continuous brush edits");
        // Quantization moves heights, so the baked region needs remeshing too
        if let Some(rect) = baked.rect() {
            self.remesher.mark_dirty(rect);
        }
    }

    fn mark_dirty(&mut self, result: &ModificationResult) {
        if let Some(rect) = result.rect() {
            self.remesher.mark_dirty(rect);
        }
    }

    /// Record the pre-stroke state for undo. Call once when a stroke starts.
    pub fn begin_stroke(&mut self) {
        self.bake_pending();
        self.history.push(Arc::new(self.grid.capture_levels()));
    }

    /// Restore the state before the last stroke. Returns false when there is none.
    pub fn undo(&mut self) -> TerrainResult<bool> {
        self.bake_pending();
        let current = Arc::new(self.grid.capture_levels());
        let Some(previous) = self.history.undo(current) else {
            return Ok(false);
        };
        self.restore(&previous)?;
        info!(remaining = self.history.undo_count(), "undo");
        Ok(true)
    }

    pub fn redo(&mut self) -> TerrainResult<bool> {
        self.bake_pending();
        let current = Arc::new(self.grid.capture_levels());
        let Some(next) = self.history.redo(current) else {
            return Ok(false);
        };
        self.restore(&next)?;
        info!(remaining = self.history.redo_count(), "redo");
        Ok(true)
    }

    fn restore(&mut self, state: &LevelState) -> TerrainResult<()> {
        self.grid.restore_levels(state)?;
        sync_heightmap_from_levels(&mut self.grid, None);
        self.remesher.mark_all_dirty();
        Ok(())
    }

    /// Advance the rebuild cadence; rebuilds dirty meshes only when a tick is due.
    pub fn tick<R: MeshBufferResource + ?Sized>(
        &mut self,
        delta_time: f32,
        resource: &mut R,
    ) -> TerrainResult<Option<RebuildReport>> {
        if !self.cadence.tick(delta_time) {
            return Ok(None);
        }
        self.rebuild(resource).map(Some)
    }

    /// Rebuild dirty meshes now, regardless of cadence.
    pub fn flush<R: MeshBufferResource + ?Sized>(
        &mut self,
        resource: &mut R,
    ) -> TerrainResult<RebuildReport> {
        self.cadence.reset();
        self.rebuild(resource)
    }

    fn rebuild<R: MeshBufferResource + ?Sized>(
        &mut self,
        resource: &mut R,
    ) -> TerrainResult<RebuildReport> {
        let released = release_retired(resource, &mut self.retired);
        let mut report = match &mut self.remesher {
            Remesher::Chunked(chunks) => chunks.rebuild_dirty(&self.grid, resource)?,
            Remesher::WholeGrid(whole) => {
                whole.rebuild(&self.grid, resource, self.config.chunks.optimize_indices)
            }
        };
        report.released += released;
        Ok(report)
    }

    /// Persisted form of the grid, with continuous edits baked in first.
    pub fn snapshot(&mut self) -> GridSnapshot {
        self.bake_pending();
        self.grid.to_snapshot()
    }

    /// Replace the grid with loaded data and re-lay out the remesher.
    ///
    /// Undo history refers to the old grid and is cleared. Existing buffers are
    /// updated in place while the remeshing mode stays the same; switching between
    /// chunked and whole-grid meshing releases the old buffers on the next rebuild.
    pub fn load_snapshot(&mut self, snapshot: &GridSnapshot) -> TerrainResult<()> {
        let grid = HeightGrid::from_snapshot(snapshot)?;
        let fits = ChunkManager::layout_fits(&self.config.chunks, &grid);
        let replacement = match &mut self.remesher {
            Remesher::Chunked(chunks) => {
                chunks.initialize(&grid);
                if fits {
                    None
                } else {
                    self.retired.extend(chunks.take_retired());
                    Some(Remesher::WholeGrid(WholeGridMesh::new()))
                }
            }
            Remesher::WholeGrid(_) if !fits => None,
            Remesher::WholeGrid(whole) => {
                if let Some(handle) = whole.buffer.take() {
                    self.retired.push((ChunkCoord::default(), handle));
                }
                Some(Remesher::for_grid(&self.config, &grid))
            }
        };
        if let Some(remesher) = replacement {
            info!(chunked = remesher.is_chunked(), "remeshing mode changed on load");
            self.remesher = remesher;
        }
        self.remesher.mark_all_dirty();
        self.grid = grid;
        self.history.clear();
        Ok(())
    }
}
