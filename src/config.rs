//! Terrain configuration: grid description, chunking, and editing parameters.
//!
//! Every section has working defaults so an empty TOML document is valid.

use serde::{Deserialize, Serialize};

use crate::error::{TerrainError, TerrainResult};

/// Cells per chunk edge.
pub const DEFAULT_CHUNK_SIZE: u32 = 64;
/// Chunk count above which chunked remeshing is refused.
pub const DEFAULT_MAX_CHUNKS: usize = 16;
/// Rebuild cadence in ticks per second.
pub const DEFAULT_REBUILD_HZ: f32 = 20.0;
/// Cells the cliff pass expands the edited rectangle by.
pub const DEFAULT_CLIFF_MARGIN: i32 = 3;
pub const DEFAULT_UNDO_DEPTH: usize = 32;
/// Largest accepted `cliff_margin`.
pub const MAX_CLIFF_MARGIN: i32 = 64;
/// Relative slack allowed between `tile_size` and the vertex spacing.
const TILE_SIZE_TOLERANCE: f32 = 1e-4;

/// Shape and quantization of the height grid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridDesc {
    /// Vertex count along X (>= 2)
    pub resolution_x: u32,
    /// Vertex count along Z (>= 2)
    pub resolution_z: u32,
    /// World-space extent of the grid
    pub world_size: f32,
    /// World-space size of one tile; must equal `world_size / (resolution_x - 1)`
    pub tile_size: f32,
    /// World-space height of one integer level
    pub height_step: f32,
    pub min_height: f32,
    pub max_height: f32,
}

impl Default for GridDesc {
    fn default() -> Self {
        Self {
            resolution_x: 129,
            resolution_z: 129,
            world_size: 128.0,
            tile_size: 1.0,
            height_step: 1.0,
            min_height: 0.0,
            max_height: 50.0,
        }
    }
}

impl GridDesc {
    pub fn validate(&self) -> TerrainResult<()> {
        if self.resolution_x < 2 || self.resolution_z < 2 {
            return Err(TerrainError::InvalidConfig(format!(
                "grid resolution must be at least 2x2, got {}x{}",
                self.resolution_x, self.resolution_z
            )));
        }
        for (name, value) in [
            ("world_size", self.world_size),
            ("tile_size", self.tile_size),
            ("height_step", self.height_step),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(TerrainError::InvalidConfig(format!(
                    "{name} must be positive and finite, got {value}"
                )));
            }
        }
        let cell_size = self.world_size / (self.resolution_x - 1) as f32;
        if (self.tile_size - cell_size).abs() > cell_size * TILE_SIZE_TOLERANCE {
            return Err(TerrainError::InvalidConfig(format!(
                "tile_size {} does not match the vertex spacing {cell_size}",
                self.tile_size
            )));
        }
        if !self.min_height.is_finite() || !self.max_height.is_finite() {
            return Err(TerrainError::InvalidConfig(
                "height bounds must be finite".to_string(),
            ));
        }
        if self.max_height < self.min_height.max(0.0) {
            return Err(TerrainError::InvalidConfig(format!(
                "max_height {} is below min_height {}",
                self.max_height, self.min_height
            )));
        }
        Ok(())
    }
}

/// Chunking and remesh parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkConfig {
    /// Cells per chunk edge
    pub chunk_size: u32,
    /// Maximum number of chunks before falling back to whole-grid meshing
    pub max_chunks: usize,
    /// Build dirty chunk meshes on the worker pool
    pub parallel_rebuild: bool,
    /// Reorder chunk indices for vertex cache locality
    pub optimize_indices: bool,
    /// Worker thread count for parallel rebuilds (0 = derive from CPU count)
    pub worker_threads: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_chunks: DEFAULT_MAX_CHUNKS,
            parallel_rebuild: false,
            optimize_indices: false,
            worker_threads: 0,
        }
    }
}

/// Editing session parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditConfig {
    /// Maximum level difference between adjacent non-ramp vertices (None disables the cliff pass)
    pub max_cliff_step: Option<i32>,
    pub cliff_margin: i32,
    pub undo_depth: usize,
    pub rebuild_hz: f32,
    pub noise_seed: u32,
}

impl Default for EditConfig {
    fn default() -> Self {
        Self {
            max_cliff_step: Some(1),
            cliff_margin: DEFAULT_CLIFF_MARGIN,
            undo_depth: DEFAULT_UNDO_DEPTH,
            rebuild_hz: DEFAULT_REBUILD_HZ,
            noise_seed: 0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    pub grid: GridDesc,
    pub chunks: ChunkConfig,
    pub editing: EditConfig,
}

impl TerrainConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> TerrainResult<Self> {
        let config: TerrainConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> TerrainResult<()> {
        self.grid.validate()?;
        if self.chunks.chunk_size == 0 {
            return Err(TerrainError::InvalidConfig(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        if !self.editing.rebuild_hz.is_finite() || self.editing.rebuild_hz <= 0.0 {
            return Err(TerrainError::InvalidConfig(format!(
                "rebuild_hz must be positive, got {}",
                self.editing.rebuild_hz
            )));
        }
        if !(0..=MAX_CLIFF_MARGIN).contains(&self.editing.cliff_margin) {
            return Err(TerrainError::InvalidConfig(format!(
                "cliff_margin must be within 0..={MAX_CLIFF_MARGIN}, got {}",
                self.editing.cliff_margin
            )));
        }
        if let Some(step) = self.editing.max_cliff_step {
            if step < 0 {
                return Err(TerrainError::InvalidConfig(format!(
                    "max_cliff_step must not be negative, got {step}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = TerrainConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunks.chunk_size, 64);
        assert_eq!(config.chunks.max_chunks, 16);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = TerrainConfig::from_toml_str("").unwrap();
        assert_eq!(config, TerrainConfig::default());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = TerrainConfig::from_toml_str(
            r#"
            [grid]
            resolution_x = 65
            resolution_z = 33
            world_size = 64.0
            max_height = 20.0

            [editing]
            max_cliff_step = 2
            rebuild_hz = 10.0
            "#,
        )
        .unwrap();

        assert_eq!(config.grid.resolution_x, 65);
        assert_eq!(config.grid.resolution_z, 33);
        assert_eq!(config.grid.max_height, 20.0);
        assert_eq!(config.grid.tile_size, 1.0, "Unset fields keep defaults");
        assert_eq!(config.editing.max_cliff_step, Some(2));
        assert_eq!(config.editing.rebuild_hz, 10.0);
    }

    #[test]
    fn test_rejects_degenerate_grid() {
        let result = TerrainConfig::from_toml_str("[grid]\nresolution_x = 1\n");
        assert!(matches!(result, Err(TerrainError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_zero_height_step() {
        let mut config = TerrainConfig::default();
        config.grid.height_step = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_tile_size_off_vertex_spacing() {
        let mut config = TerrainConfig::default();
        config.grid.tile_size = 2.0;
        assert!(config.validate().is_err(), "129 vertices over 128 units is 1 unit per tile");

        config.grid.world_size = 256.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cliff_margin_is_bounded() {
        let mut config = TerrainConfig::default();
        config.editing.cliff_margin = i32::MAX;
        assert!(config.validate().is_err());
        config.editing.cliff_margin = -1;
        assert!(config.validate().is_err());
        config.editing.cliff_margin = MAX_CLIFF_MARGIN;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let result = TerrainConfig::from_toml_str("[grid\nresolution_x = ");
        assert!(matches!(result, Err(TerrainError::ConfigParse(_))));
    }
}
