//! Quantized height grid shared by the brushes and the chunk manager.
//!
//! `height_levels` is the source of truth; `heightmap` is a float cache derived
//! from it (`level * height_step`, clamped to the height bounds) and only kept in
//! sync through the explicit rectangle-based sync in `tile_brush`.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::GridDesc;
use crate::error::{TerrainError, TerrainResult};

/// A 2D vertex index on the grid (XZ plane)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct CellXZ {
    pub x: i32,
    pub z: i32,
}

impl CellXZ {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

/// Inclusive rectangle of vertex indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridRect {
    pub min: CellXZ,
    pub max: CellXZ,
}

impl GridRect {
    pub fn new(min: CellXZ, max: CellXZ) -> Self {
        Self { min, max }
    }

    pub fn from_cell(cell: CellXZ) -> Self {
        Self {
            min: cell,
            max: cell,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.z > self.max.z
    }

    pub fn contains(&self, cell: CellXZ) -> bool {
        cell.x >= self.min.x && cell.x <= self.max.x && cell.z >= self.min.z && cell.z <= self.max.z
    }

    pub fn expand(&self, margin: i32) -> Self {
        Self {
            min: CellXZ::new(
                self.min.x.saturating_sub(margin),
                self.min.z.saturating_sub(margin),
            ),
            max: CellXZ::new(
                self.max.x.saturating_add(margin),
                self.max.z.saturating_add(margin),
            ),
        }
    }

    pub fn union(&self, other: &GridRect) -> Self {
        Self {
            min: CellXZ::new(self.min.x.min(other.min.x), self.min.z.min(other.min.z)),
            max: CellXZ::new(self.max.x.max(other.max.x), self.max.z.max(other.max.z)),
        }
    }

    pub fn intersect(&self, other: &GridRect) -> Option<Self> {
        let rect = Self {
            min: CellXZ::new(self.min.x.max(other.min.x), self.min.z.max(other.min.z)),
            max: CellXZ::new(self.max.x.min(other.max.x), self.max.z.min(other.max.z)),
        };
        (!rect.is_empty()).then_some(rect)
    }

    /// Number of vertices covered.
    pub fn area(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        ((self.max.x - self.min.x + 1) as usize) * ((self.max.z - self.min.z + 1) as usize)
    }

    /// Iterate covered vertices row by row.
    pub fn cells(&self) -> impl Iterator<Item = CellXZ> {
        let (min, max) = (self.min, self.max);
        (min.z..=max.z).flat_map(move |z| (min.x..=max.x).map(move |x| CellXZ::new(x, z)))
    }
}

/// Outcome of a mutating grid operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModificationResult {
    pub modified: bool,
    /// Affected rectangle (inclusive); inverted when nothing was covered
    pub min_affected: CellXZ,
    pub max_affected: CellXZ,
    pub vertices_changed: usize,
}

impl Default for ModificationResult {
    fn default() -> Self {
        Self::none()
    }
}

impl ModificationResult {
    /// A result covering nothing.
    pub fn none() -> Self {
        Self {
            modified: false,
            min_affected: CellXZ::new(i32::MAX, i32::MAX),
            max_affected: CellXZ::new(i32::MIN, i32::MIN),
            vertices_changed: 0,
        }
    }

    /// An unmodified result covering `rect`.
    pub fn covering(rect: GridRect) -> Self {
        Self {
            modified: false,
            min_affected: rect.min,
            max_affected: rect.max,
            vertices_changed: 0,
        }
    }

    pub fn include(&mut self, cell: CellXZ) {
        self.min_affected.x = self.min_affected.x.min(cell.x);
        self.min_affected.z = self.min_affected.z.min(cell.z);
        self.max_affected.x = self.max_affected.x.max(cell.x);
        self.max_affected.z = self.max_affected.z.max(cell.z);
    }

    pub fn record_change(&mut self) {
        self.modified = true;
        self.vertices_changed += 1;
    }

    /// Combine two results: rectangles are unioned and change counts summed.
    pub fn merge(&mut self, other: &ModificationResult) {
        if let Some(rect) = other.rect() {
            self.include(rect.min);
            self.include(rect.max);
        }
        self.modified |= other.modified;
        self.vertices_changed += other.vertices_changed;
    }

    pub fn rect(&self) -> Option<GridRect> {
        let rect = GridRect::new(self.min_affected, self.max_affected);
        (!rect.is_empty()).then_some(rect)
    }
}

/// Levels and ramp mask captured for undo.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelState {
    pub levels: Vec<i16>,
    pub ramp_mask: Vec<u8>,
}

/// Persisted form of a grid, produced and consumed by the save/load layer.
///
/// Either `height_levels` (preferred) or a legacy float `heightmap` must be present.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub resolution: [i32; 2],
    pub size: f32,
    pub min_height: f32,
    pub max_height: f32,
    pub tile_size: f32,
    pub height_step: f32,
    pub tiles_x: i32,
    pub tiles_z: i32,
    #[serde(default)]
    pub height_levels: Option<Vec<i16>>,
    #[serde(default)]
    pub heightmap: Option<Vec<f32>>,
    #[serde(default)]
    pub ramp_mask: Option<Vec<u8>>,
}

#[derive(Clone, Debug)]
pub struct HeightGrid {
    resolution_x: u32,
    resolution_z: u32,
    world_size: f32,
    tile_size: f32,
    height_step: f32,
    min_height: f32,
    max_height: f32,
    height_levels: Vec<i16>,
    heightmap: Vec<f32>,
    ramp_mask: Vec<u8>,
    /// Region edited by continuous brushes and not yet baked into levels
    pending_float_edits: Option<GridRect>,
}

impl HeightGrid {
    /// Create a flat grid at the lowest representable level.
    pub fn new(desc: &GridDesc) -> TerrainResult<Self> {
        desc.validate()?;
        let count = desc.resolution_x as usize * desc.resolution_z as usize;
        let min_height = desc.min_height.max(0.0);
        let mut grid = Self {
            resolution_x: desc.resolution_x,
            resolution_z: desc.resolution_z,
            world_size: desc.world_size,
            tile_size: desc.tile_size,
            height_step: desc.height_step,
            min_height,
            max_height: desc.max_height,
            height_levels: vec![0; count],
            heightmap: vec![0.0; count],
            ramp_mask: vec![0; count],
            pending_float_edits: None,
        };
        let (lo, _) = grid.level_bounds();
        let base = lo.max(0) as i16;
        grid.height_levels.fill(base);
        let base_height = grid.level_to_height(base as i32);
        grid.heightmap.fill(base_height);
        Ok(grid)
    }

    /// Rebuild a grid from persisted data, migrating legacy float-only payloads.
    pub fn from_snapshot(snapshot: &GridSnapshot) -> TerrainResult<Self> {
        let [res_x, res_z] = snapshot.resolution;
        if res_x < 2 || res_z < 2 {
            return Err(TerrainError::InvalidConfig(format!(
                "snapshot resolution must be at least 2x2, got {res_x}x{res_z}"
            )));
        }
        let desc = GridDesc {
            resolution_x: res_x as u32,
            resolution_z: res_z as u32,
            world_size: snapshot.size,
            tile_size: snapshot.tile_size,
            height_step: snapshot.height_step,
            min_height: snapshot.min_height,
            max_height: snapshot.max_height,
        };
        let mut grid = Self::new(&desc)?;
        let count = grid.vertex_count();

        if snapshot.tiles_x != res_x - 1 || snapshot.tiles_z != res_z - 1 {
            warn!(
                tiles_x = snapshot.tiles_x,
                tiles_z = snapshot.tiles_z,
                "snapshot tile counts disagree with resolution, using resolution"
            );
        }

        let (lo, hi) = grid.level_bounds();
        if let Some(levels) = &snapshot.height_levels {
            check_len("height_levels", count, levels.len())?;
            for (dst, &src) in grid.height_levels.iter_mut().zip(levels) {
                *dst = (src as i32).clamp(lo, hi) as i16;
            }
        } else if let Some(heights) = &snapshot.heightmap {
            check_len("heightmap", count, heights.len())?;
            let step = grid.height_step;
            for (dst, &h) in grid.height_levels.iter_mut().zip(heights) {
                let level = if h.is_finite() { (h / step).round() as i32 } else { lo };
                *dst = level.clamp(lo, hi) as i16;
            }
        } else {
            return Err(TerrainError::InvalidConfig(
                "snapshot carries neither height_levels nor heightmap".to_string(),
            ));
        }

        if let Some(mask) = &snapshot.ramp_mask {
            check_len("ramp_mask", count, mask.len())?;
            grid.ramp_mask.copy_from_slice(mask);
        }

        for i in 0..count {
            grid.heightmap[i] = grid.level_to_height(grid.height_levels[i] as i32);
        }
        Ok(grid)
    }

    pub fn to_snapshot(&self) -> GridSnapshot {
        GridSnapshot {
            resolution: [self.resolution_x as i32, self.resolution_z as i32],
            size: self.world_size,
            min_height: self.min_height,
            max_height: self.max_height,
            tile_size: self.tile_size,
            height_step: self.height_step,
            tiles_x: self.tiles_x() as i32,
            tiles_z: self.tiles_z() as i32,
            height_levels: Some(self.height_levels.clone()),
            heightmap: None,
            ramp_mask: Some(self.ramp_mask.clone()),
        }
    }

    pub fn resolution_x(&self) -> u32 {
        self.resolution_x
    }

    pub fn resolution_z(&self) -> u32 {
        self.resolution_z
    }

    pub fn tiles_x(&self) -> u32 {
        self.resolution_x - 1
    }

    pub fn tiles_z(&self) -> u32 {
        self.resolution_z - 1
    }

    pub fn vertex_count(&self) -> usize {
        self.height_levels.len()
    }

    pub fn world_size(&self) -> f32 {
        self.world_size
    }

    /// World-space spacing between adjacent vertices (the grid is square).
    pub fn cell_size(&self) -> f32 {
        self.world_size / self.tiles_x() as f32
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn height_step(&self) -> f32 {
        self.height_step
    }

    pub fn min_height(&self) -> f32 {
        self.min_height
    }

    pub fn max_height(&self) -> f32 {
        self.max_height
    }

    pub fn heightmap(&self) -> &[f32] {
        &self.heightmap
    }

    pub fn height_levels(&self) -> &[i16] {
        &self.height_levels
    }

    pub fn ramp_mask(&self) -> &[u8] {
        &self.ramp_mask
    }

    /// Inclusive range of levels whose height stays inside the bounds.
    pub fn level_bounds(&self) -> (i32, i32) {
        let lo = (self.min_height / self.height_step).ceil();
        let hi = (self.max_height / self.height_step).floor();
        let lo = (lo as i32).clamp(i16::MIN as i32, i16::MAX as i32);
        let hi = (hi as i32).clamp(i16::MIN as i32, i16::MAX as i32);
        (lo, hi.max(lo))
    }

    pub fn level_to_height(&self, level: i32) -> f32 {
        (level as f32 * self.height_step).clamp(self.min_height, self.max_height)
    }

    pub fn full_rect(&self) -> GridRect {
        GridRect::new(
            CellXZ::new(0, 0),
            CellXZ::new(self.resolution_x as i32 - 1, self.resolution_z as i32 - 1),
        )
    }

    /// Restrict a rectangle to the grid, or None if it lies entirely outside.
    pub fn clip_rect(&self, rect: GridRect) -> Option<GridRect> {
        rect.intersect(&self.full_rect())
    }

    pub fn in_bounds(&self, x: i32, z: i32) -> bool {
        x >= 0 && z >= 0 && (x as u32) < self.resolution_x && (z as u32) < self.resolution_z
    }

    #[inline]
    pub fn index(&self, x: i32, z: i32) -> Option<usize> {
        self.in_bounds(x, z)
            .then(|| z as usize * self.resolution_x as usize + x as usize)
    }

    pub fn level(&self, x: i32, z: i32) -> Option<i16> {
        self.index(x, z).map(|i| self.height_levels[i])
    }

    pub fn height(&self, x: i32, z: i32) -> Option<f32> {
        self.index(x, z).map(|i| self.heightmap[i])
    }

    /// Height with coordinates clamped to the grid edges.
    #[inline]
    pub fn height_clamped(&self, x: i32, z: i32) -> f32 {
        let x = x.clamp(0, self.resolution_x as i32 - 1) as usize;
        let z = z.clamp(0, self.resolution_z as i32 - 1) as usize;
        self.heightmap[z * self.resolution_x as usize + x]
    }

    pub fn is_ramp(&self, x: i32, z: i32) -> bool {
        self.index(x, z).is_some_and(|i| self.ramp_mask[i] != 0)
    }

    pub fn pending_float_edits(&self) -> Option<GridRect> {
        self.pending_float_edits
    }

    pub(crate) fn note_float_edit(&mut self, rect: GridRect) {
        let Some(rect) = self.clip_rect(rect) else {
            return;
        };
        self.pending_float_edits = Some(match self.pending_float_edits {
            Some(existing) => existing.union(&rect),
            None => rect,
        });
    }

    pub(crate) fn clear_float_edits(&mut self) {
        self.pending_float_edits = None;
    }

    pub(crate) fn heightmap_mut(&mut self) -> &mut [f32] {
        &mut self.heightmap
    }

    /// Split borrow of levels, heightmap, and ramp mask.
    pub(crate) fn parts_mut(&mut self) -> (&mut [i16], &mut [f32], &mut [u8]) {
        (
            &mut self.height_levels,
            &mut self.heightmap,
            &mut self.ramp_mask,
        )
    }

    pub fn capture_levels(&self) -> LevelState {
        LevelState {
            levels: self.height_levels.clone(),
            ramp_mask: self.ramp_mask.clone(),
        }
    }

    /// Replace levels and ramp mask. The heightmap is left stale; callers resync.
    pub(crate) fn restore_levels(&mut self, state: &LevelState) -> TerrainResult<()> {
        check_len("levels", self.vertex_count(), state.levels.len())?;
        check_len("ramp_mask", self.vertex_count(), state.ramp_mask.len())?;
        self.height_levels.copy_from_slice(&state.levels);
        self.ramp_mask.copy_from_slice(&state.ramp_mask);
        Ok(())
    }
}

fn check_len(field: &'static str, expected: usize, actual: usize) -> TerrainResult<()> {
    if expected != actual {
        return Err(TerrainError::SnapshotMismatch {
            field,
            expected,
            actual,
        });
    }
    Ok(())
}
