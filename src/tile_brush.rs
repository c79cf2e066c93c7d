//! Discrete tile brushes operating on integer height levels.
//!
//! Every brush here edits `height_levels` (the source of truth) and finishes by
//! syncing the float heightmap over the rectangle it returns, so float-space
//! consumers never observe a half-applied edit.

use std::collections::{HashSet, VecDeque};

use tracing::{debug, warn};

use crate::config::DEFAULT_CLIFF_MARGIN;
use crate::height_grid::{CellXZ, GridRect, HeightGrid, ModificationResult};

/// 4-connected neighbor offsets.
const NEIGHBORS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Recompute `heightmap` from `height_levels` over `rect`, or the whole grid when `None`.
///
/// Unbaked continuous-brush edits inside the rectangle are overwritten.
pub fn sync_heightmap_from_levels(grid: &mut HeightGrid, rect: Option<GridRect>) {
    let rect = match rect {
        Some(rect) => match grid.clip_rect(rect) {
            Some(rect) => rect,
            None => return,
        },
        None => grid.full_rect(),
    };

    if let Some(pending) = grid.pending_float_edits() {
        if let Some(lost) = pending.intersect(&rect) {
            warn!(
                min = ?lost.min,
                max = ?lost.max,
                "level sync discards unbaked continuous brush edits"
            );
            if lost == pending {
                grid.clear_float_edits();
            }
        }
    }

    let res_x = grid.resolution_x() as usize;
    let heights: Vec<(usize, f32)> = rect
        .cells()
        .map(|cell| {
            let idx = cell.z as usize * res_x + cell.x as usize;
            (idx, grid.level_to_height(grid.height_levels()[idx] as i32))
        })
        .collect();
    let heightmap = grid.heightmap_mut();
    for (idx, height) in heights {
        heightmap[idx] = height;
    }
}

/// Quantize the float heightmap back into levels (`round(h / height_step)`) and resync.
///
/// With `rect = None` the pending continuous-brush region is baked, if any.
pub fn bake_heightmap_into_levels(
    grid: &mut HeightGrid,
    rect: Option<GridRect>,
) -> ModificationResult {
    let Some(rect) = rect.or(grid.pending_float_edits()).and_then(|r| grid.clip_rect(r)) else {
        return ModificationResult::none();
    };

    let (lo, hi) = grid.level_bounds();
    let step = grid.height_step();
    let res_x = grid.resolution_x() as usize;
    let mut result = ModificationResult::covering(rect);
    {
        let (levels, heightmap, _) = grid.parts_mut();
        for cell in rect.cells() {
            let idx = cell.z as usize * res_x + cell.x as usize;
            let level = (heightmap[idx] / step).round() as i32;
            let level = level.clamp(lo, hi) as i16;
            if level != levels[idx] {
                levels[idx] = level;
                result.record_change();
            }
        }
    }

    if grid.pending_float_edits().is_some_and(|p| p.intersect(&rect) == Some(p)) {
        grid.clear_float_edits();
    }
    sync_heightmap_from_levels(grid, Some(rect));
    result
}

/// Vertices covered by a tile brush centered on the tile under `local`.
///
/// `radius_tiles <= 1` selects exactly the 4 corners of that tile; larger radii
/// select every vertex within `radius_tiles` of the tile center.
fn tile_footprint(grid: &HeightGrid, local: [f32; 3], radius_tiles: i32) -> Option<Vec<CellXZ>> {
    let [x, _, z] = local;
    if !x.is_finite() || !z.is_finite() {
        return None;
    }
    let tile_size = grid.tile_size();
    let tx = ((x / tile_size).floor() as i32).clamp(0, grid.tiles_x() as i32 - 1);
    let tz = ((z / tile_size).floor() as i32).clamp(0, grid.tiles_z() as i32 - 1);

    if radius_tiles <= 1 {
        return Some(vec![
            CellXZ::new(tx, tz),
            CellXZ::new(tx + 1, tz),
            CellXZ::new(tx, tz + 1),
            CellXZ::new(tx + 1, tz + 1),
        ]);
    }

    // Any radius past the longer grid side already covers every vertex.
    let radius_tiles = radius_tiles.min(grid.tiles_x().max(grid.tiles_z()) as i32 + 1);
    let radius = radius_tiles as f32;
    let (cx, cz) = (tx as f32 + 0.5, tz as f32 + 0.5);
    let x0 = (tx - radius_tiles).max(0);
    let z0 = (tz - radius_tiles).max(0);
    let x1 = (tx + 1 + radius_tiles).min(grid.resolution_x() as i32 - 1);
    let z1 = (tz + 1 + radius_tiles).min(grid.resolution_z() as i32 - 1);
    let mut cells = Vec::new();
    for vz in z0..=z1 {
        for vx in x0..=x1 {
            let (dx, dz) = (vx as f32 - cx, vz as f32 - cz);
            if dx * dx + dz * dz <= radius * radius {
                cells.push(CellXZ::new(vx, vz));
            }
        }
    }
    Some(cells)
}

/// Set each footprint vertex to `f(old_level)` (clamped), then resync the footprint.
fn apply_level_fn(
    grid: &mut HeightGrid,
    cells: &[CellXZ],
    f: impl Fn(i32) -> i32,
) -> ModificationResult {
    let (lo, hi) = grid.level_bounds();
    let res_x = grid.resolution_x() as usize;
    let mut result = ModificationResult::none();
    {
        let (levels, _, _) = grid.parts_mut();
        for &cell in cells {
            result.include(cell);
            let idx = cell.z as usize * res_x + cell.x as usize;
            let old = levels[idx];
            let new = f(old as i32).clamp(lo, hi) as i16;
            if new != old {
                levels[idx] = new;
                result.record_change();
            }
        }
    }
    if let Some(rect) = result.rect() {
        sync_heightmap_from_levels(grid, Some(rect));
    }
    result
}

/// Shift the level of every covered vertex by `delta`.
///
/// `radius_tiles = 1` is the single-tile tool: exactly the 4 corners of one tile,
/// no falloff.
pub fn apply_tile_level_delta_brush(
    grid: &mut HeightGrid,
    local: [f32; 3],
    delta: i32,
    radius_tiles: i32,
) -> ModificationResult {
    let Some(cells) = tile_footprint(grid, local, radius_tiles) else {
        return ModificationResult::none();
    };
    let result = apply_level_fn(grid, &cells, |level| level.saturating_add(delta));
    debug!(delta, radius_tiles, changed = result.vertices_changed, "tile level delta");
    result
}

/// Force every covered vertex to an absolute level.
pub fn apply_tile_set_level_brush(
    grid: &mut HeightGrid,
    local: [f32; 3],
    level: i32,
    radius_tiles: i32,
) -> ModificationResult {
    let Some(cells) = tile_footprint(grid, local, radius_tiles) else {
        return ModificationResult::none();
    };
    let result = apply_level_fn(grid, &cells, |_| level);
    debug!(level, radius_tiles, changed = result.vertices_changed, "tile set level");
    result
}

fn nearest_vertex(grid: &HeightGrid, local: [f32; 3]) -> Option<CellXZ> {
    let [x, _, z] = local;
    if !x.is_finite() || !z.is_finite() {
        return None;
    }
    let tile_size = grid.tile_size();
    Some(CellXZ::new(
        ((x / tile_size).round() as i32).clamp(0, grid.resolution_x() as i32 - 1),
        ((z / tile_size).round() as i32).clamp(0, grid.resolution_z() as i32 - 1),
    ))
}

/// Carve a ramp: interpolate levels linearly from the start vertex's level to the
/// end vertex's level along the path, over a corridor of vertices within
/// `width_tiles / 2` of the centerline. Touched vertices are marked in the ramp mask.
pub fn apply_ramp_path(
    grid: &mut HeightGrid,
    start_local: [f32; 3],
    end_local: [f32; 3],
    width_tiles: i32,
) -> ModificationResult {
    let (Some(start), Some(end)) = (
        nearest_vertex(grid, start_local),
        nearest_vertex(grid, end_local),
    ) else {
        return ModificationResult::none();
    };
    let (dx, dz) = ((end.x - start.x) as f32, (end.z - start.z) as f32);
    let len_sq = dx * dx + dz * dz;
    if len_sq == 0.0 {
        return ModificationResult::covering(GridRect::from_cell(start));
    }

    let (lo, hi) = grid.level_bounds();
    let start_level = grid.level(start.x, start.z).unwrap_or(0) as f32;
    let end_level = grid.level(end.x, end.z).unwrap_or(0) as f32;
    let half_width = width_tiles.max(1) as f32 * 0.5;
    let len = len_sq.sqrt();

    let pad = half_width.ceil() as i32;
    let bounds = GridRect::new(
        CellXZ::new(start.x.min(end.x), start.z.min(end.z)),
        CellXZ::new(start.x.max(end.x), start.z.max(end.z)),
    )
    .expand(pad);
    let Some(bounds) = grid.clip_rect(bounds) else {
        return ModificationResult::none();
    };

    let res_x = grid.resolution_x() as usize;
    let mut result = ModificationResult::covering(bounds);
    {
        let (levels, _, ramp_mask) = grid.parts_mut();
        for cell in bounds.cells() {
            let (px, pz) = ((cell.x - start.x) as f32, (cell.z - start.z) as f32);
            let t = (px * dx + pz * dz) / len_sq;
            if !(0.0..=1.0).contains(&t) {
                continue;
            }
            let perpendicular = (px * dz - pz * dx).abs() / len;
            if perpendicular > half_width {
                continue;
            }

            let idx = cell.z as usize * res_x + cell.x as usize;
            let level = (start_level + (end_level - start_level) * t).round() as i32;
            let level = level.clamp(lo, hi) as i16;
            if levels[idx] != level || ramp_mask[idx] == 0 {
                levels[idx] = level;
                ramp_mask[idx] = 1;
                result.record_change();
            }
        }
    }

    sync_heightmap_from_levels(grid, Some(bounds));
    debug!(
        ?start,
        ?end,
        width_tiles,
        changed = result.vertices_changed,
        "carved ramp path"
    );
    result
}

/// Limit the level difference between grid-adjacent non-ramp vertices to `max_step`,
/// working outward from the edited rectangle. See [`enforce_cliff_constraints_with_margin`].
pub fn enforce_cliff_constraints(
    grid: &mut HeightGrid,
    min_affected: CellXZ,
    max_affected: CellXZ,
    max_step: i32,
) -> ModificationResult {
    enforce_cliff_constraints_with_margin(
        grid,
        min_affected,
        max_affected,
        max_step,
        DEFAULT_CLIFF_MARGIN,
    )
}

/// Two monotone passes, both transitive through a work list:
///
/// 1. spread: neighbors of the edited vertices lying more than `max_step` below
///    are raised to `level - max_step`, continuing outward from every raised vertex;
/// 2. clamp: over the rectangle expanded by `margin` (and anything reached from it),
///    the higher vertex of a violating pair is lowered to `lower + max_step`.
///
/// Ramp-masked vertices are neither moved nor used as constraints. The returned
/// rectangle covers the working rectangle and every changed vertex, and has been synced.
pub fn enforce_cliff_constraints_with_margin(
    grid: &mut HeightGrid,
    min_affected: CellXZ,
    max_affected: CellXZ,
    max_step: i32,
    margin: i32,
) -> ModificationResult {
    let Some(edited) = grid.clip_rect(GridRect::new(min_affected, max_affected)) else {
        return ModificationResult::none();
    };
    let working = grid
        .clip_rect(edited.expand(margin.max(0)))
        .unwrap_or(edited);
    let max_step = max_step.max(0);
    let res_x = grid.resolution_x() as i32;
    let res_z = grid.resolution_z() as i32;
    let index = |c: CellXZ| (c.z * res_x + c.x) as usize;
    let neighbors = move |c: CellXZ| {
        NEIGHBORS
            .iter()
            .map(move |&(dx, dz)| CellXZ::new(c.x + dx, c.z + dz))
            .filter(move |n| n.x >= 0 && n.z >= 0 && n.x < res_x && n.z < res_z)
    };

    let mut changed: HashSet<CellXZ> = HashSet::new();
    {
        let (levels, _, ramp_mask) = grid.parts_mut();
        let is_ramp = |c: CellXZ| ramp_mask[index(c)] != 0;

        // Spread
        let mut queue: VecDeque<CellXZ> = edited.cells().filter(|&c| !is_ramp(c)).collect();
        while let Some(cell) = queue.pop_front() {
            let floor = levels[index(cell)] as i32 - max_step;
            for n in neighbors(cell) {
                if is_ramp(n) {
                    continue;
                }
                let ni = index(n);
                if (levels[ni] as i32) < floor {
                    levels[ni] = floor as i16;
                    changed.insert(n);
                    queue.push_back(n);
                }
            }
        }

        // Clamp
        let mut queue: VecDeque<CellXZ> = working
            .cells()
            .chain(changed.iter().copied())
            .filter(|&c| !is_ramp(c))
            .collect();
        let mut queued: HashSet<CellXZ> = queue.iter().copied().collect();
        while let Some(cell) = queue.pop_front() {
            queued.remove(&cell);
            let lowest = neighbors(cell)
                .filter(|&n| !is_ramp(n))
                .map(|n| levels[index(n)] as i32)
                .min();
            let Some(lowest) = lowest else {
                continue;
            };
            let ci = index(cell);
            if levels[ci] as i32 > lowest + max_step {
                levels[ci] = (lowest + max_step) as i16;
                changed.insert(cell);
                for n in neighbors(cell) {
                    if !is_ramp(n) && queued.insert(n) {
                        queue.push_back(n);
                    }
                }
            }
        }
    }

    let mut result = ModificationResult::covering(working);
    for &cell in &changed {
        result.include(cell);
    }
    result.modified = !changed.is_empty();
    result.vertices_changed = changed.len();

    if let Some(rect) = result.rect() {
        sync_heightmap_from_levels(grid, Some(rect));
    }
    debug!(max_step, changed = result.vertices_changed, "enforced cliff constraints");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridDesc;

    fn test_grid() -> HeightGrid {
        HeightGrid::new(&GridDesc::default()).unwrap()
    }

    fn assert_synced(grid: &HeightGrid, rect: GridRect) {
        for cell in rect.cells() {
            let idx = grid.index(cell.x, cell.z).unwrap();
            let expected = (grid.height_levels()[idx] as f32 * grid.height_step())
                .clamp(grid.min_height(), grid.max_height());
            assert_eq!(grid.heightmap()[idx], expected, "Heightmap out of sync at {cell:?}");
        }
    }

    fn assert_cliffs_hold(grid: &HeightGrid, max_step: i32) {
        for z in 0..grid.resolution_z() as i32 {
            for x in 0..grid.resolution_x() as i32 {
                for (nx, nz) in [(x + 1, z), (x, z + 1)] {
                    let Some(b) = grid.level(nx, nz) else {
                        continue;
                    };
                    if grid.is_ramp(x, z) || grid.is_ramp(nx, nz) {
                        continue;
                    }
                    let a = grid.level(x, z).unwrap();
                    assert!(
                        (a as i32 - b as i32).abs() <= max_step,
                        "Cliff violation between ({x},{z})={a} and ({nx},{nz})={b}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_single_tile_delta_touches_four_corners() {
        let mut grid = test_grid();
        let result = apply_tile_level_delta_brush(&mut grid, [64.3, 0.0, 64.7], 3, 1);

        assert!(result.modified);
        assert_eq!(result.vertices_changed, 4);
        assert_eq!(result.min_affected, CellXZ::new(64, 64));
        assert_eq!(result.max_affected, CellXZ::new(65, 65));
        for (x, z) in [(64, 64), (65, 64), (64, 65), (65, 65)] {
            assert_eq!(grid.level(x, z), Some(3));
            assert_eq!(grid.height(x, z), Some(3.0));
        }
        let raised = grid.height_levels().iter().filter(|&&l| l != 0).count();
        assert_eq!(raised, 4, "Single tile brush must not touch anything else");
    }

    #[test]
    fn test_single_tile_at_grid_edge_is_clamped() {
        let mut grid = test_grid();
        let result = apply_tile_level_delta_brush(&mut grid, [500.0, 0.0, -20.0], 1, 1);
        assert_eq!(result.vertices_changed, 4);
        assert_eq!(result.min_affected, CellXZ::new(127, 0));
        assert_eq!(result.max_affected, CellXZ::new(128, 1));
    }

    #[test]
    fn test_delta_clamped_to_level_range() {
        let mut grid = test_grid();
        apply_tile_level_delta_brush(&mut grid, [10.0, 0.0, 10.0], 80, 1);
        assert_eq!(grid.level(10, 10), Some(50));
        assert_eq!(grid.height(10, 10), Some(50.0));

        let result = apply_tile_level_delta_brush(&mut grid, [10.0, 0.0, 10.0], 5, 1);
        assert!(!result.modified, "Already at the ceiling");

        apply_tile_level_delta_brush(&mut grid, [10.0, 0.0, 10.0], i32::MIN, 1);
        assert_eq!(grid.level(10, 10), Some(0), "No holes below ground");
    }

    #[test]
    fn test_wide_delta_brush_is_round() {
        let mut grid = test_grid();
        let result = apply_tile_level_delta_brush(&mut grid, [40.5, 0.0, 40.5], 2, 3);
        assert!(result.vertices_changed > 4);
        // Corners of the bounding square lie outside the radius
        assert_eq!(grid.level(37, 37), Some(0));
        assert_eq!(grid.level(40, 40), Some(2));
        assert_synced(&grid, result.rect().unwrap());
    }

    #[test]
    fn test_oversized_radius_covers_grid_once() {
        let mut grid = test_grid();
        let result = apply_tile_level_delta_brush(&mut grid, [64.0, 0.0, 64.0], 1, i32::MAX);
        assert_eq!(result.vertices_changed, grid.vertex_count());
        assert_eq!(result.min_affected, CellXZ::new(0, 0));
        assert_eq!(result.max_affected, CellXZ::new(128, 128));
        assert!(grid.height_levels().iter().all(|&l| l == 1));

        let result = apply_tile_set_level_brush(&mut grid, [0.0, 0.0, 0.0], 6, i32::MAX);
        assert_eq!(result.vertices_changed, grid.vertex_count());
        assert_eq!(grid.level(128, 128), Some(6));
        assert_synced(&grid, result.rect().unwrap());
    }

    #[test]
    fn test_oversized_ramp_width_is_clipped() {
        let mut grid = test_grid();
        let result = apply_ramp_path(&mut grid, [10.0, 0.0, 10.0], [30.0, 0.0, 10.0], i32::MAX);
        assert!(grid.is_ramp(20, 128), "Corridor reaches the far edge of the grid");
        assert!(!grid.is_ramp(0, 128), "Vertices before the path start are untouched");
        assert!(result.rect().is_some());
    }

    #[test]
    fn test_set_level_brush() {
        let mut grid = test_grid();
        apply_tile_level_delta_brush(&mut grid, [20.0, 0.0, 20.0], 9, 1);
        let result = apply_tile_set_level_brush(&mut grid, [20.0, 0.0, 20.0], 4, 1);
        assert_eq!(result.vertices_changed, 4);
        assert_eq!(grid.level(21, 21), Some(4));

        let again = apply_tile_set_level_brush(&mut grid, [20.0, 0.0, 20.0], 4, 1);
        assert!(!again.modified);
        assert_eq!(again.vertices_changed, 0);
    }

    #[test]
    fn test_ramp_interpolates_and_masks() {
        let mut grid = test_grid();
        apply_tile_set_level_brush(&mut grid, [30.0, 0.0, 10.0], 8, 1);
        // Start at level 0 vertex (10, 10), end at level 8 vertex (30, 10)
        let result = apply_ramp_path(&mut grid, [10.0, 0.0, 10.0], [30.0, 0.0, 10.0], 2);

        assert!(result.modified);
        assert_eq!(grid.level(10, 10), Some(0));
        assert_eq!(grid.level(20, 10), Some(4));
        assert_eq!(grid.level(30, 10), Some(8));
        assert_eq!(grid.level(20, 11), Some(4), "Corridor spans the width");
        assert!(grid.is_ramp(20, 9) && grid.is_ramp(20, 11));
        assert!(!grid.is_ramp(20, 12), "Outside the corridor");
        assert!(!grid.is_ramp(9, 10), "Before the path start");
        assert_synced(&grid, result.rect().unwrap());
    }

    #[test]
    fn test_degenerate_ramp_is_noop() {
        let mut grid = test_grid();
        let result = apply_ramp_path(&mut grid, [5.0, 0.0, 5.0], [5.2, 0.0, 4.9], 3);
        assert!(!result.modified);
        assert!(grid.ramp_mask().iter().all(|&m| m == 0));
    }

    #[test]
    fn test_cliff_spread_after_raise() {
        let mut grid = test_grid();
        let raise = apply_tile_level_delta_brush(&mut grid, [64.0, 0.0, 64.0], 3, 1);
        let cliffs =
            enforce_cliff_constraints(&mut grid, raise.min_affected, raise.max_affected, 1);

        assert!(cliffs.modified);
        assert_eq!(grid.level(64, 64), Some(3), "Edited vertices keep their level");
        assert_eq!(grid.level(63, 64), Some(2));
        assert_eq!(grid.level(66, 65), Some(2));
        assert_eq!(grid.level(62, 64), Some(1));
        assert_eq!(grid.level(61, 64), Some(0));
        assert_cliffs_hold(&grid, 1);
        assert_synced(&grid, cliffs.rect().unwrap());
    }

    #[test]
    fn test_cliff_clamp_after_lower() {
        let mut grid = test_grid();
        let plateau = apply_tile_set_level_brush(&mut grid, [64.0, 0.0, 64.0], 10, 8);
        enforce_cliff_constraints(&mut grid, plateau.min_affected, plateau.max_affected, 2);
        assert_cliffs_hold(&grid, 2);

        let dig = apply_tile_set_level_brush(&mut grid, [64.0, 0.0, 64.0], 0, 1);
        let cliffs = enforce_cliff_constraints(&mut grid, dig.min_affected, dig.max_affected, 2);

        assert!(cliffs.modified);
        assert_eq!(grid.level(64, 64), Some(0));
        assert_eq!(grid.level(63, 64), Some(2), "Higher neighbor clamped down to lower + step");
        assert_cliffs_hold(&grid, 2);
    }

    #[test]
    fn test_cliff_propagates_past_margin() {
        let mut grid = test_grid();
        let raise = apply_tile_level_delta_brush(&mut grid, [64.0, 0.0, 64.0], 12, 1);
        let cliffs = enforce_cliff_constraints_with_margin(
            &mut grid,
            raise.min_affected,
            raise.max_affected,
            1,
            1,
        );
        assert_eq!(grid.level(53, 64), Some(1), "Spread continues beyond the margin");
        assert!(cliffs.min_affected.x <= 53);
        assert_cliffs_hold(&grid, 1);
    }

    #[test]
    fn test_cliff_skips_ramp_vertices() {
        let mut grid = test_grid();
        apply_tile_set_level_brush(&mut grid, [40.0, 0.0, 20.0], 10, 1);
        apply_ramp_path(&mut grid, [20.0, 0.0, 20.0], [40.0, 0.0, 20.0], 1);
        let before: Vec<i16> = (20..=40).map(|x| grid.level(x, 20).unwrap()).collect();

        enforce_cliff_constraints(&mut grid, CellXZ::new(20, 20), CellXZ::new(40, 20), 0);

        let after: Vec<i16> = (20..=40).map(|x| grid.level(x, 20).unwrap()).collect();
        assert_eq!(before, after, "Ramp vertices are exempt");
        assert_cliffs_hold(&grid, 0);
    }

    #[test]
    fn test_sync_whole_grid() {
        let mut grid = test_grid();
        grid.parts_mut().0[100] = 7;
        sync_heightmap_from_levels(&mut grid, None);
        assert_eq!(grid.heightmap()[100], 7.0);
        assert_synced(&grid, grid.full_rect());
    }

    #[test]
    fn test_sync_discards_unbaked_float_edits() {
        let mut grid = test_grid();
        let rect = GridRect::new(CellXZ::new(0, 0), CellXZ::new(3, 3));
        grid.heightmap_mut()[0] = 2.4;
        grid.note_float_edit(rect);

        sync_heightmap_from_levels(&mut grid, Some(rect));
        assert_eq!(grid.heightmap()[0], 0.0);
        assert!(grid.pending_float_edits().is_none());
    }

    #[test]
    fn test_bake_commits_float_edits() {
        let mut grid = test_grid();
        let rect = GridRect::new(CellXZ::new(0, 0), CellXZ::new(3, 3));
        grid.heightmap_mut()[1] = 2.4;
        grid.heightmap_mut()[2] = 2.6;
        grid.note_float_edit(rect);

        let result = bake_heightmap_into_levels(&mut grid, None);

        assert_eq!(result.vertices_changed, 2);
        assert_eq!(grid.height_levels()[1], 2);
        assert_eq!(grid.height_levels()[2], 3);
        assert_eq!(grid.heightmap()[2], 3.0);
        assert!(grid.pending_float_edits().is_none());
    }
}
