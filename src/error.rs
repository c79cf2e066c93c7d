//! Error type for the fallible (non-interactive) parts of the engine.
//!
//! Brush application never fails: it clamps. Errors only surface from
//! configuration, snapshot loading, and mesh buffer uploads.

use thiserror::Error;

use crate::chunk::ChunkCoord;

#[derive(Debug, Error)]
pub enum TerrainError {
    #[error("invalid terrain configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to parse terrain configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Snapshot arrays do not match the declared resolution.
    #[error("snapshot {field} has {actual} entries, expected {expected}")]
    SnapshotMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The mesh buffer collaborator rejected a create/update call.
    #[error("mesh upload failed for chunk {coord}: {reason}")]
    Upload { coord: ChunkCoord, reason: String },

    /// The grid handed to the chunk manager no longer matches the layout it was initialized for.
    #[error("chunk layout was built for a {expected_x}x{expected_z} grid, got {actual_x}x{actual_z}")]
    LayoutMismatch {
        expected_x: u32,
        expected_z: u32,
        actual_x: u32,
        actual_z: u32,
    },
}

pub type TerrainResult<T> = Result<T, TerrainError>;
