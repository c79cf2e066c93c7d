//! Continuous (float-space) sculpting brushes.
//!
//! These brushes edit the float heightmap directly and are invoked once per
//! input tick while a button is held, so every input is clamped to keep a single
//! call from moving a vertex by more than a small bounded amount. They do not
//! touch the integer levels; edited regions are recorded on the grid until they
//! are baked (see `tile_brush::bake_heightmap_into_levels`).

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::falloff::{weight, FalloffKind};
use crate::height_grid::{CellXZ, GridRect, HeightGrid, ModificationResult};
use crate::noise_field::BrushNoise;

pub const MIN_STRENGTH: f32 = 0.01;
pub const MAX_STRENGTH: f32 = 5.0;
pub const MIN_RADIUS: f32 = 0.1;
pub const MAX_RADIUS: f32 = 20.0;
pub const MAX_DELTA_TIME: f32 = 0.1;
/// Hard ceiling on a single vertex's change per call, in world units.
pub const MAX_HEIGHT_CHANGE: f32 = 0.5;
/// Headroom kept below `max_height` for later smoothing and ramp passes.
pub const HEIGHT_SAFETY_MARGIN: f32 = 2.0;
/// Minimum change for a vertex to count toward `vertices_changed`.
const CHANGE_EPSILON: f32 = 1e-3;

/// Slow convergence keeps flatten from oscillating around the target.
const FLATTEN_RATE: f32 = 0.05;
const SMOOTH_RATE: f32 = 0.05;
const NOISE_AMPLITUDE: f32 = 0.02;
const ERODE_RATE: f32 = 0.5;
const DEPOSIT_RATE: f32 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BrushKind {
    #[default]
    Raise,
    Lower,
    Flatten,
    Smooth,
    Noise,
    Erode,
}

/// Per-invocation brush parameters
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BrushSettings {
    pub kind: BrushKind,
    pub falloff: FalloffKind,
    /// Radius in world units
    pub radius: f32,
    pub strength: f32,
    /// Flatten target in world units
    pub target_height: f32,
    /// Spatial frequency of the noise brush
    pub noise_scale: f32,
    /// Multiplier on the smoothing rate, in `[0, 1]`
    pub smooth_factor: f32,
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self {
            kind: BrushKind::Raise,
            falloff: FalloffKind::Smooth,
            radius: 5.0,
            strength: 1.0,
            target_height: 0.0,
            noise_scale: 0.1,
            smooth_factor: 1.0,
        }
    }
}

impl BrushSettings {
    pub fn new(kind: BrushKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    /// Copy with strength and radius forced into their safe ranges.
    pub fn clamped(&self) -> Self {
        Self {
            strength: finite_or(self.strength, MIN_STRENGTH).clamp(MIN_STRENGTH, MAX_STRENGTH),
            radius: finite_or(self.radius, MIN_RADIUS).clamp(MIN_RADIUS, MAX_RADIUS),
            target_height: finite_or(self.target_height, 0.0),
            noise_scale: finite_or(self.noise_scale, 0.0),
            smooth_factor: finite_or(self.smooth_factor, 0.0).clamp(0.0, 1.0),
            ..*self
        }
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Applies continuous brushes to a grid.
#[derive(Default)]
pub struct BrushEngine {
    noise: BrushNoise,
}

impl BrushEngine {
    pub fn new(noise_seed: u32) -> Self {
        Self {
            noise: BrushNoise::new(noise_seed),
        }
    }

    /// Apply one tick of a continuous brush centered at `world_pos` (only X/Z are used).
    ///
    /// The returned rectangle is the index rectangle covering the clamped radius.
    pub fn apply_brush(
        &self,
        grid: &mut HeightGrid,
        world_pos: [f32; 3],
        settings: &BrushSettings,
        delta_time: f32,
    ) -> ModificationResult {
        let settings = settings.clamped();
        let dt = finite_or(delta_time, 0.0).clamp(0.0, MAX_DELTA_TIME);
        let [wx, _, wz] = world_pos;
        if !wx.is_finite() || !wz.is_finite() {
            return ModificationResult::none();
        }

        let cell_size = grid.cell_size();
        let radius = settings.radius;
        let covered = GridRect::new(
            CellXZ::new(
                ((wx - radius) / cell_size).floor() as i32,
                ((wz - radius) / cell_size).floor() as i32,
            ),
            CellXZ::new(
                ((wx + radius) / cell_size).ceil() as i32,
                ((wz + radius) / cell_size).ceil() as i32,
            ),
        );
        let Some(rect) = grid.clip_rect(covered) else {
            return ModificationResult::none();
        };

        let averages = match settings.kind {
            BrushKind::Smooth => neighborhood_averages(grid, rect),
            _ => Vec::new(),
        };
        let ceiling = (grid.max_height() - HEIGHT_SAFETY_MARGIN).max(0.0);
        let target = settings.target_height.clamp(0.0, ceiling);

        let mut result = ModificationResult::covering(rect);
        let mut touched = false;

        for (n, cell) in rect.cells().enumerate() {
            let px = cell.x as f32 * cell_size;
            let pz = cell.z as f32 * cell_size;
            let distance = ((px - wx).powi(2) + (pz - wz).powi(2)).sqrt();
            if distance > radius {
                continue;
            }
            let falloff = weight(distance, radius, settings.falloff);
            if falloff <= 0.0 {
                continue;
            }
            let Some(idx) = grid.index(cell.x, cell.z) else {
                continue;
            };

            let current = grid.heightmap()[idx];
            let scaled = settings.strength * dt * falloff;
            let change = match settings.kind {
                BrushKind::Raise => scaled,
                BrushKind::Lower => {
                    if current - scaled < 0.0 {
                        -current.max(0.0)
                    } else {
                        -scaled
                    }
                }
                BrushKind::Flatten => (target - current) * scaled * FLATTEN_RATE,
                BrushKind::Smooth => {
                    (averages[n] - current) * SMOOTH_RATE * settings.smooth_factor * falloff
                }
                BrushKind::Noise => {
                    let sample = self
                        .noise
                        .sample(px * settings.noise_scale, pz * settings.noise_scale);
                    sample * NOISE_AMPLITUDE * scaled
                }
                BrushKind::Erode => {
                    if current > 0.0 {
                        -(scaled * ERODE_RATE).min(current)
                    } else {
                        scaled * DEPOSIT_RATE
                    }
                }
            };
            let change = finite_or(change, 0.0).clamp(-MAX_HEIGHT_CHANGE, MAX_HEIGHT_CHANGE);

            let updated = (current + change).clamp(0.0, ceiling);
            if updated != current {
                touched = true;
                grid.heightmap_mut()[idx] = updated;
            }
            if (updated - current).abs() > CHANGE_EPSILON {
                result.record_change();
            }
        }

        // Sub-epsilon changes are not counted but still need a remesh
        if touched {
            result.modified = true;
            grid.note_float_edit(rect);
        }
        debug!(
            kind = ?settings.kind,
            changed = result.vertices_changed,
            "applied continuous brush"
        );
        result
    }
}

/// Mean of each vertex's in-bounds 3x3 neighborhood, in `rect.cells()` order,
/// read before any vertex is modified.
fn neighborhood_averages(grid: &HeightGrid, rect: GridRect) -> Vec<f32> {
    rect.cells()
        .map(|cell| {
            let mut sum = 0.0;
            let mut count = 0;
            for dz in -1..=1 {
                for dx in -1..=1 {
                    if let Some(h) = grid.height(cell.x + dx, cell.z + dz) {
                        sum += h;
                        count += 1;
                    }
                }
            }
            sum / count as f32
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridDesc;

    fn test_grid() -> HeightGrid {
        HeightGrid::new(&GridDesc::default()).unwrap()
    }

    fn center_height(grid: &HeightGrid) -> f32 {
        grid.height(64, 64).unwrap()
    }

    #[test]
    fn test_settings_clamped() {
        let settings = BrushSettings {
            strength: 100.0,
            radius: 0.0,
            smooth_factor: 3.0,
            ..Default::default()
        }
        .clamped();
        assert_eq!(settings.strength, MAX_STRENGTH);
        assert_eq!(settings.radius, MIN_RADIUS);
        assert_eq!(settings.smooth_factor, 1.0);
    }

    #[test]
    fn test_raise_center_by_strength_dt() {
        let engine = BrushEngine::default();
        let mut grid = test_grid();
        let settings = BrushSettings {
            radius: 3.0,
            ..BrushSettings::new(BrushKind::Raise)
        };

        let result = engine.apply_brush(&mut grid, [64.0, 0.0, 64.0], &settings, 0.05);

        assert!(result.modified);
        assert!((center_height(&grid) - 0.05).abs() < 1e-6);
        assert_eq!(result.min_affected, CellXZ::new(61, 61));
        assert_eq!(result.max_affected, CellXZ::new(67, 67));
        assert_eq!(grid.height(67, 64), Some(0.0), "Rim vertex has zero falloff");
        assert!(grid.pending_float_edits().is_some());
    }

    #[test]
    fn test_single_call_change_is_bounded() {
        let engine = BrushEngine::default();
        let mut grid = test_grid();
        let settings = BrushSettings {
            strength: 1000.0,
            ..BrushSettings::new(BrushKind::Raise)
        };

        engine.apply_brush(&mut grid, [64.0, 0.0, 64.0], &settings, 10.0);

        // strength 5 * dt 0.1 = 0.5
        assert!(center_height(&grid) <= MAX_HEIGHT_CHANGE + 1e-6);
        assert!(center_height(&grid) > 0.49);
    }

    #[test]
    fn test_raise_stops_below_safety_margin() {
        let engine = BrushEngine::default();
        let mut grid = test_grid();
        let settings = BrushSettings {
            strength: 5.0,
            ..BrushSettings::new(BrushKind::Raise)
        };

        for _ in 0..200 {
            engine.apply_brush(&mut grid, [64.0, 0.0, 64.0], &settings, 0.1);
        }

        let ceiling = grid.max_height() - HEIGHT_SAFETY_MARGIN;
        assert!((center_height(&grid) - ceiling).abs() < 1e-4);
        assert!(grid.heightmap().iter().all(|&h| (0.0..=ceiling).contains(&h)));
    }

    #[test]
    fn test_lower_never_below_ground() {
        let engine = BrushEngine::default();
        let mut grid = test_grid();
        let idx = grid.index(64, 64).unwrap();
        grid.heightmap_mut()[idx] = 0.2;
        let settings = BrushSettings {
            strength: 5.0,
            ..BrushSettings::new(BrushKind::Lower)
        };

        let result = engine.apply_brush(&mut grid, [64.0, 0.0, 64.0], &settings, 0.1);

        assert_eq!(center_height(&grid), 0.0);
        assert_eq!(result.vertices_changed, 1, "Only the raised vertex can go down");
        assert!(grid.heightmap().iter().all(|&h| h >= 0.0));
    }

    #[test]
    fn test_flatten_approaches_target_without_overshoot() {
        let engine = BrushEngine::default();
        let mut grid = test_grid();
        let settings = BrushSettings {
            strength: 5.0,
            target_height: 10.0,
            ..BrushSettings::new(BrushKind::Flatten)
        };

        let mut previous = 0.0;
        for _ in 0..500 {
            engine.apply_brush(&mut grid, [64.0, 0.0, 64.0], &settings, 0.1);
            let h = center_height(&grid);
            assert!(h >= previous, "Flatten should move monotonically toward target");
            assert!(h <= 10.0, "Flatten must not overshoot");
            previous = h;
        }
        assert!(previous > 5.0);
    }

    #[test]
    fn test_smooth_reduces_spike() {
        let engine = BrushEngine::default();
        let mut grid = test_grid();
        let idx = grid.index(64, 64).unwrap();
        grid.heightmap_mut()[idx] = 8.0;
        let settings = BrushSettings {
            radius: 2.0,
            ..BrushSettings::new(BrushKind::Smooth)
        };

        engine.apply_brush(&mut grid, [64.0, 0.0, 64.0], &settings, 0.1);

        let h = center_height(&grid);
        // average = 8/9, move 5% of the way
        let expected = 8.0 + (8.0 / 9.0 - 8.0) * 0.05;
        assert!((h - expected).abs() < 1e-4, "got {h}, expected {expected}");
        assert!(grid.height(65, 64).unwrap() > 0.0, "Neighbors pulled up toward the average");
    }

    #[test]
    fn test_noise_is_deterministic_and_small() {
        let settings = BrushSettings {
            strength: 5.0,
            noise_scale: 0.37,
            ..BrushSettings::new(BrushKind::Noise)
        };
        let mut a = test_grid();
        let mut b = test_grid();
        BrushEngine::new(5).apply_brush(&mut a, [30.0, 0.0, 30.0], &settings, 0.1);
        BrushEngine::new(5).apply_brush(&mut b, [30.0, 0.0, 30.0], &settings, 0.1);

        assert_eq!(a.heightmap(), b.heightmap());
        assert!(a.heightmap().iter().all(|&h| (0.0..=0.01 + 1e-6).contains(&h)));
    }

    #[test]
    fn test_erode_lowers_and_deposits() {
        let engine = BrushEngine::default();
        let mut grid = test_grid();
        let idx = grid.index(64, 64).unwrap();
        grid.heightmap_mut()[idx] = 4.0;
        let settings = BrushSettings {
            radius: 1.5,
            ..BrushSettings::new(BrushKind::Erode)
        };

        engine.apply_brush(&mut grid, [64.0, 0.0, 64.0], &settings, 0.1);

        assert!(center_height(&grid) < 4.0);
        assert!(grid.height(65, 64).unwrap() > 0.0, "Ground-level vertices gain a little");
    }

    #[test]
    fn test_brush_outside_grid_is_noop() {
        let engine = BrushEngine::default();
        let mut grid = test_grid();
        let result = engine.apply_brush(
            &mut grid,
            [-500.0, 0.0, 900.0],
            &BrushSettings::default(),
            0.1,
        );
        assert!(!result.modified);
        assert!(result.rect().is_none());

        let nan = engine.apply_brush(&mut grid, [f32::NAN, 0.0, 1.0], &BrushSettings::default(), 0.1);
        assert!(!nan.modified);
    }

    #[test]
    fn test_zero_delta_time_changes_nothing() {
        let engine = BrushEngine::default();
        let mut grid = test_grid();
        let result = engine.apply_brush(
            &mut grid,
            [64.0, 0.0, 64.0],
            &BrushSettings::default(),
            -1.0,
        );
        assert!(!result.modified);
        assert!(grid.pending_float_edits().is_none());
    }
}
