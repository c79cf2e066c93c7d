//! Heightfield terrain editing with incremental, chunked remeshing.
//!
//! Integer height levels are the source of truth; a float heightmap is derived
//! from them for rendering. Brushes return the rectangle they touched, the chunk
//! manager marks overlapping chunks dirty, and a fixed-rate cadence rebuilds only
//! those chunks into an external mesh buffer resource.

pub mod brush;
pub mod cadence;
pub mod chunk;
pub mod chunk_manager;
pub mod config;
pub mod error;
pub mod falloff;
pub mod height_grid;
pub mod mesh_buffer;
pub mod mesh_worker;
pub mod noise_field;
pub mod terrain;
pub mod tile_brush;
pub mod undo;

pub use brush::{BrushEngine, BrushKind, BrushSettings};
pub use cadence::RebuildCadence;
pub use chunk::{build_region_mesh, Chunk, ChunkCoord, ChunkMesh};
pub use chunk_manager::{ChunkManager, RebuildReport};
pub use config::{ChunkConfig, EditConfig, GridDesc, TerrainConfig};
pub use error::{TerrainError, TerrainResult};
pub use falloff::{weight, FalloffKind};
pub use height_grid::{CellXZ, GridRect, GridSnapshot, HeightGrid, LevelState, ModificationResult};
pub use mesh_buffer::{BufferHandle, ChannelMeshBackend, MeshBufferResource, MeshUpload};
pub use mesh_worker::MeshBuildPool;
pub use noise_field::BrushNoise;
pub use terrain::{Remesher, TerrainEditor, WholeGridMesh};
pub use tile_brush::{
    apply_ramp_path, apply_tile_level_delta_brush, apply_tile_set_level_brush,
    bake_heightmap_into_levels, enforce_cliff_constraints, enforce_cliff_constraints_with_margin,
    sync_heightmap_from_levels,
};
pub use undo::UndoHistory;
