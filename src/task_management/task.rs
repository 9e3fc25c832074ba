//! # Face Scan Stage
//!
//! The asynchronous pipeline stage that drives one worker through a chunk.
//!
//! ## Sequence
//! 1. `init` the worker with a copy of the chunk's block buffer
//! 2. for each requested type id: `any`, and only if that is `true`,
//!    `countFaces` followed by `getBlockFaces`
//! 3. `takeBuffer` to get the block buffer back
//!
//! Each step awaits the previous reply, so the worker never has more than one
//! request outstanding.

use cgmath::Point2;
use log::debug;

use super::protocol::{OffloadError, PredicateSpec};
use super::worker::ChunkWorker;
use crate::voxels::block::block_side::FaceMask;
use crate::voxels::block::Block;
use crate::voxels::chunk::Chunk;

/// Visible faces of one block type within one chunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkFaceScan {
    pub chunk_index: usize,
    pub position: Point2<i32>,
    pub block_type_id: u32,
    pub face_count: usize,
    /// One mask per block, indexed like the chunk's block array.
    pub face_masks: Vec<u8>,
}

impl ChunkFaceScan {
    /// Iterates `(block index, mask)` for blocks with at least one visible face.
    pub fn visible_blocks(&self) -> impl Iterator<Item = (usize, FaceMask)> + '_ {
        self.face_masks
            .iter()
            .enumerate()
            .filter(|(_, mask)| **mask != 0)
            .map(|(index, mask)| (index, FaceMask(*mask)))
    }
}

/// Everything one [`FaceScanTask`] produced.
#[derive(Debug)]
pub struct FaceScanResult {
    pub chunk_index: usize,
    pub position: Point2<i32>,
    /// Only the types present in the chunk, in request order.
    pub scans: Vec<ChunkFaceScan>,
    /// The block buffer handed back by the worker.
    pub blocks: Box<[Block]>,
}

impl FaceScanResult {
    /// Sum of visible faces over every scanned type.
    pub fn total_faces(&self) -> usize {
        self.scans.iter().map(|scan| scan.face_count).sum()
    }
}

/// A face scan of one chunk for a list of block types.
pub struct FaceScanTask {
    chunk_index: usize,
    position: Point2<i32>,
    blocks: Box<[Block]>,
    block_type_ids: Vec<u32>,
}

impl FaceScanTask {
    /// Copies the chunk's blocks so the buffer can be moved into a worker.
    pub fn new(chunk_index: usize, chunk: &Chunk, block_type_ids: &[u32]) -> Self {
        FaceScanTask {
            chunk_index,
            position: chunk.position(),
            blocks: chunk.blocks().into(),
            block_type_ids: block_type_ids.to_vec(),
        }
    }

    pub fn chunk_index(&self) -> usize {
        self.chunk_index
    }

    /// Runs the scan on `worker`. The first protocol failure aborts the task.
    pub async fn run(self, worker: &mut ChunkWorker) -> Result<FaceScanResult, OffloadError> {
        let FaceScanTask {
            chunk_index,
            position,
            blocks,
            block_type_ids,
        } = self;

        worker.init(blocks)?;

        let mut scans = Vec::new();
        for block_type_id in block_type_ids {
            let spec = PredicateSpec::type_id(block_type_id);
            if !worker.any(spec.clone()).await? {
                continue;
            }
            let face_count = worker.count_faces(spec.clone()).await?;
            let face_masks = worker.block_faces(spec).await?;
            debug!(
                "Chunk ({}, {}) type {}: {} faces",
                position.x, position.y, block_type_id, face_count
            );
            scans.push(ChunkFaceScan {
                chunk_index,
                position,
                block_type_id,
                face_count,
                face_masks,
            });
        }

        let blocks = worker.take_buffer().await?;
        Ok(FaceScanResult {
            chunk_index,
            position,
            scans,
            blocks,
        })
    }
}
