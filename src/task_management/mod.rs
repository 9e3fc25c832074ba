//! # Task Management
//!
//! Runs face-visibility scans outside the caller's thread.
//!
//! ## Components
//! - [`protocol`]: the request and response messages plus [`PredicateSpec`]
//! - [`worker::ChunkWorker`]: one background thread bound to one chunk buffer
//! - [`task::FaceScanTask`]: the async stage that walks a worker through a chunk
//! - [`WorkerPool`]: owns the workers and spreads chunks across them
//!
//! ## Platform-Specific Behavior
//! - **Native**: each worker is an OS thread from `std::thread`
//! - **Web**: each worker is a Web Worker started through `wasm_thread`
//!
//! ## Scheduling
//! Chunks are handed out round-robin, one chunk per worker at a time. A worker's
//! scan is a sequence of awaited requests, so each worker has at most
//! [`MAX_REQUESTS_IN_FLIGHT`] outstanding. The pool awaits a whole batch before
//! starting the next one.
//!
//! ```rust,no_run
//! use editsc_core::task_management::WorkerPool;
//! use editsc_core::voxels::world::World;
//!
//! let world = World::new();
//! let mut pool = WorkerPool::new(4).unwrap();
//! let results = pollster::block_on(pool.scan_world(&world, &[2, 8])).unwrap();
//! assert!(results.is_empty());
//! pool.shutdown();
//! ```

pub mod protocol;
pub mod task;
pub mod worker;

use futures::future::try_join_all;
use log::info;
use web_time::Instant;

use crate::voxels::chunk::Chunk;
use crate::voxels::world::World;
pub use protocol::{OffloadError, OffloadRequest, OffloadResponse, PredicateSpec};
use task::{FaceScanResult, FaceScanTask};
use worker::ChunkWorker;

/// Requests a single worker may have outstanding.
///
/// Replies are matched to requests by order alone, so this cannot be raised
/// without adding a correlation id to the protocol.
pub const MAX_REQUESTS_IN_FLIGHT: usize = 1;

/// A fixed set of chunk workers.
pub struct WorkerPool {
    workers: Vec<ChunkWorker>,
    current_worker: usize,
}

impl WorkerPool {
    /// Spawns `worker_count` workers (at least one).
    ///
    /// # Errors
    /// `SpawnFailed` if a thread cannot be started. Workers spawned before the
    /// failure are shut down when the partial pool is dropped.
    pub fn new(worker_count: usize) -> Result<Self, OffloadError> {
        let worker_count = worker_count.max(1);
        let mut workers = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            workers.push(ChunkWorker::spawn(id)?);
        }
        info!("Worker pool started with {} workers", worker_count);
        Ok(WorkerPool {
            workers,
            current_worker: 0,
        })
    }

    /// Number of workers.
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    fn next_worker(&mut self) -> usize {
        let worker = self.current_worker;
        self.current_worker = (self.current_worker + 1) % self.workers.len();
        worker
    }

    /// Scans one chunk on the next worker in round-robin order.
    pub async fn scan_chunk(
        &mut self,
        chunk_index: usize,
        chunk: &Chunk,
        block_type_ids: &[u32],
    ) -> Result<FaceScanResult, OffloadError> {
        let worker = self.next_worker();
        FaceScanTask::new(chunk_index, chunk, block_type_ids)
            .run(&mut self.workers[worker])
            .await
    }

    /// Scans every chunk of `world` for `block_type_ids`.
    ///
    /// Results come back in chunk order. The first failure aborts the scan.
    pub async fn scan_world(
        &mut self,
        world: &World,
        block_type_ids: &[u32],
    ) -> Result<Vec<FaceScanResult>, OffloadError> {
        let start = Instant::now();
        let worker_count = self.workers.len();
        let mut results = Vec::with_capacity(world.len());

        for (batch_index, batch) in world.chunks().chunks(worker_count).enumerate() {
            let first_chunk = batch_index * worker_count;
            let first_worker = self.current_worker;
            let (tail, head) = self.workers.split_at_mut(first_worker);
            let scans = head
                .iter_mut()
                .chain(tail.iter_mut())
                .zip(batch)
                .enumerate()
                .map(|(offset, (worker, chunk))| {
                    FaceScanTask::new(first_chunk + offset, chunk, block_type_ids).run(worker)
                });
            results.extend(try_join_all(scans).await?);
            self.current_worker = (first_worker + batch.len()) % worker_count;
        }

        let faces: usize = results.iter().map(FaceScanResult::total_faces).sum();
        info!(
            "Scanned {} chunks ({} visible faces) in {:?}",
            results.len(),
            faces,
            start.elapsed()
        );
        Ok(results)
    }

    /// Stops every worker and waits for their threads to exit.
    pub fn shutdown(self) {
        for worker in self.workers {
            worker.terminate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxels::block::Block;
    use crate::voxels::chunk::chunk_index::block_index;

    fn single_block_world(chunks: i32) -> World {
        let mut world = World::new();
        for x in 0..chunks {
            let mut chunk = Chunk::empty(x, 0);
            chunk.set_block(block_index(x as usize, 1, 0), Block::new(0x2));
            world.push_chunk(chunk);
        }
        world
    }

    #[test]
    fn pool_scans_every_chunk_in_order() {
        let world = single_block_world(5);
        let mut pool = WorkerPool::new(2).unwrap();
        let results = pollster::block_on(pool.scan_world(&world, &[2])).unwrap();

        assert_eq!(results.len(), 5);
        for (index, result) in results.iter().enumerate() {
            assert_eq!(result.chunk_index, index);
            assert_eq!(result.position.x, index as i32);
            assert_eq!(result.total_faces(), 6);
        }
        pool.shutdown();
    }

    #[test]
    fn round_robin_continues_across_calls() {
        let world = single_block_world(1);
        let mut pool = WorkerPool::new(3).unwrap();
        pollster::block_on(pool.scan_world(&world, &[2])).unwrap();
        assert_eq!(pool.current_worker, 1);
        pollster::block_on(pool.scan_chunk(0, &world.chunks()[0], &[2])).unwrap();
        assert_eq!(pool.current_worker, 2);
    }

    #[test]
    fn pool_recovers_from_an_abandoned_scan() {
        use futures::FutureExt;

        let world = single_block_world(4);
        let mut pool = WorkerPool::new(2).unwrap();
        let _ = pool.scan_world(&world, &[2, 3]).now_or_never();

        let results = pollster::block_on(pool.scan_world(&world, &[2])).unwrap();
        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|result| result.total_faces() == 6));
        pool.shutdown();
    }

    #[test]
    fn zero_workers_still_gives_one() {
        let pool = WorkerPool::new(0).unwrap();
        assert_eq!(pool.len(), 1);
    }
}
