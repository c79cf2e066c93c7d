//! External mesh buffer resource seam.
//!
//! The chunk manager never talks to a renderer directly. It creates one buffer per
//! chunk through [`MeshBufferResource`] and afterwards only updates that buffer in
//! place, so a host never sees a chunk's buffer reallocated on edit.

use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};
use tracing::warn;

use crate::chunk::{ChunkCoord, ChunkMesh};
use crate::error::{TerrainError, TerrainResult};

/// Opaque handle to a buffer owned by the resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

/// Sink for chunk meshes (GPU buffers, scene nodes, a file, a test recorder).
pub trait MeshBufferResource {
    /// Allocate a buffer for a chunk that has none yet.
    fn create(&mut self, coord: ChunkCoord, mesh: &ChunkMesh) -> TerrainResult<BufferHandle>;

    /// Replace the contents of an existing buffer without reallocating its identity.
    fn update_in_place(
        &mut self,
        handle: BufferHandle,
        coord: ChunkCoord,
        mesh: &ChunkMesh,
    ) -> TerrainResult<()>;

    /// Free a buffer whose chunk no longer exists after a re-layout.
    fn release(&mut self, handle: BufferHandle, coord: ChunkCoord) -> TerrainResult<()>;
}

/// Release every retired buffer, keeping the ones the resource rejected for a retry.
///
/// Returns the number of buffers released.
pub(crate) fn release_retired<R: MeshBufferResource + ?Sized>(
    resource: &mut R,
    retired: &mut Vec<(ChunkCoord, BufferHandle)>,
) -> usize {
    let before = retired.len();
    retired.retain(|&(coord, handle)| match resource.release(handle, coord) {
        Ok(()) => false,
        Err(err) => {
            warn!(%coord, %err, "buffer release failed, retrying on next rebuild");
            true
        }
    });
    before - retired.len()
}

/// Message sent to the consumer of a [`ChannelMeshBackend`].
#[derive(Debug)]
pub enum MeshUpload {
    Create {
        handle: BufferHandle,
        coord: ChunkCoord,
        mesh: ChunkMesh,
    },
    Update {
        handle: BufferHandle,
        coord: ChunkCoord,
        mesh: ChunkMesh,
    },
    Release {
        handle: BufferHandle,
        coord: ChunkCoord,
    },
}

impl MeshUpload {
    pub fn handle(&self) -> BufferHandle {
        match self {
            MeshUpload::Create { handle, .. }
            | MeshUpload::Update { handle, .. }
            | MeshUpload::Release { handle, .. } => *handle,
        }
    }

    pub fn coord(&self) -> ChunkCoord {
        match self {
            MeshUpload::Create { coord, .. }
            | MeshUpload::Update { coord, .. }
            | MeshUpload::Release { coord, .. } => *coord,
        }
    }
}

/// Forwards uploads over a bounded crossbeam channel to a render thread.
///
/// Never blocks: a full or disconnected channel surfaces as
/// [`TerrainError::Upload`] and the chunk stays dirty for the next rebuild.
pub struct ChannelMeshBackend {
    tx: Sender<MeshUpload>,
    next_handle: u64,
}

impl ChannelMeshBackend {
    pub fn new(capacity: usize) -> (Self, Receiver<MeshUpload>) {
        let (tx, rx) = bounded(capacity.max(1));
        (Self { tx, next_handle: 1 }, rx)
    }

    fn send(&self, upload: MeshUpload) -> TerrainResult<()> {
        let coord = upload.coord();
        self.tx.try_send(upload).map_err(|err| {
            let reason = match err {
                TrySendError::Full(_) => "upload channel full",
                TrySendError::Disconnected(_) => "upload channel disconnected",
            };
            TerrainError::Upload {
                coord,
                reason: reason.to_string(),
            }
        })
    }
}

impl MeshBufferResource for ChannelMeshBackend {
    fn create(&mut self, coord: ChunkCoord, mesh: &ChunkMesh) -> TerrainResult<BufferHandle> {
        let handle = BufferHandle(self.next_handle);
        self.send(MeshUpload::Create {
            handle,
            coord,
            mesh: mesh.clone(),
        })?;
        self.next_handle += 1;
        Ok(handle)
    }

    fn update_in_place(
        &mut self,
        handle: BufferHandle,
        coord: ChunkCoord,
        mesh: &ChunkMesh,
    ) -> TerrainResult<()> {
        self.send(MeshUpload::Update {
            handle,
            coord,
            mesh: mesh.clone(),
        })
    }

    fn release(&mut self, handle: BufferHandle, coord: ChunkCoord) -> TerrainResult<()> {
        self.send(MeshUpload::Release { handle, coord })
    }
}

/// Test double that records every call and can be told to reject uploads.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingBackend {
    pub creates: Vec<(ChunkCoord, BufferHandle)>,
    pub updates: Vec<(ChunkCoord, BufferHandle)>,
    pub releases: Vec<(ChunkCoord, BufferHandle)>,
    pub fail_on: Option<ChunkCoord>,
    next_handle: u64,
}

#[cfg(test)]
impl RecordingBackend {
    /// Backend that rejects every upload for `coord`.
    pub fn failing_on(coord: ChunkCoord) -> Self {
        Self {
            fail_on: Some(coord),
            ..Default::default()
        }
    }

    pub fn uploads(&self) -> usize {
        self.creates.len() + self.updates.len()
    }

    fn check(&self, coord: ChunkCoord) -> TerrainResult<()> {
        if self.fail_on == Some(coord) {
            return Err(TerrainError::Upload {
                coord,
                reason: "rejected by test backend".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
impl MeshBufferResource for RecordingBackend {
    fn create(&mut self, coord: ChunkCoord, _mesh: &ChunkMesh) -> TerrainResult<BufferHandle> {
        self.check(coord)?;
        self.next_handle += 1;
        let handle = BufferHandle(self.next_handle);
        self.creates.push((coord, handle));
        Ok(handle)
    }

    fn update_in_place(
        &mut self,
        handle: BufferHandle,
        coord: ChunkCoord,
        _mesh: &ChunkMesh,
    ) -> TerrainResult<()> {
        self.check(coord)?;
        self.updates.push((coord, handle));
        Ok(())
    }

    fn release(&mut self, handle: BufferHandle, coord: ChunkCoord) -> TerrainResult<()> {
        self.check(coord)?;
        self.releases.push((coord, handle));
        Ok(())
    }
}
