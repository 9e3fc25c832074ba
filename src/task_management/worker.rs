//! # Chunk Worker
//!
//! A worker is a background thread bound to one chunk's block buffer. The caller
//! talks to it only through [`OffloadRequest`] and [`OffloadResponse`] messages.
//!
//! ## Protocol
//!
//! ```text
//! Idle --send(request)--> AwaitingResponse --recv()--> Idle
//! ```
//!
//! At most one request may be outstanding. Replies carry no correlation id and are
//! matched to requests purely by arrival order, so the handle refuses a second
//! request while one is in flight. `Init` has no reply and leaves the handle idle.
//!
//! The worker processes requests strictly in arrival order, each to completion.
//!
//! A reply future that is dropped before its reply arrives abandons that reply.
//! The next `send` takes the handle back to idle, and the abandoned reply is
//! discarded when it arrives, ahead of the reply to the new request.

use std::sync::mpsc::{channel, Receiver, Sender};

use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures::StreamExt;
use log::{debug, info, warn};

use super::protocol::{OffloadError, OffloadRequest, OffloadResponse, PredicateSpec};
use crate::voxels::block::Block;
use crate::voxels::chunk::BLOCKS_PER_CHUNK;
use crate::voxels::visibility;

#[cfg(target_family = "wasm")]
mod wasm_imports {
    pub use wasm_thread as thread;
    pub use wasm_thread::JoinHandle;
}

#[cfg(target_family = "wasm")]
use self::wasm_imports::*;

#[cfg(not(target_family = "wasm"))]
use std::thread::{self, JoinHandle};

/// Where a worker handle is in the request/response cycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProtocolState {
    /// No request is outstanding; a new one may be sent.
    Idle,
    /// A request was sent and its reply has not been received.
    AwaitingResponse,
}

/// The scan target held inside the worker thread.
#[derive(Default)]
pub(crate) struct WorkerState {
    blocks: Option<Box<[Block]>>,
    init_error: Option<OffloadError>,
}

impl WorkerState {
    /// Applies one request. Returns the reply, if the request has one.
    pub(crate) fn handle(&mut self, request: OffloadRequest) -> Option<OffloadResponse> {
        match request {
            OffloadRequest::Init(blocks) => {
                if blocks.len() == BLOCKS_PER_CHUNK {
                    self.blocks = Some(blocks);
                    self.init_error = None;
                } else {
                    warn!("Rejecting worker buffer of {} blocks", blocks.len());
                    self.blocks = None;
                    self.init_error = Some(OffloadError::BadBufferLength { len: blocks.len() });
                }
                None
            }
            OffloadRequest::Any(spec) => Some(self.scan(|blocks| {
                OffloadResponse::Any(visibility::any(blocks, spec.predicate()))
            })),
            OffloadRequest::Count(spec) => Some(self.scan(|blocks| {
                OffloadResponse::Count(visibility::count(blocks, spec.predicate()))
            })),
            OffloadRequest::CountFaces(spec) => Some(self.scan(|blocks| {
                OffloadResponse::FaceCount(visibility::count_faces(blocks, spec.predicate()))
            })),
            OffloadRequest::GetBlockFaces(spec) => Some(self.scan(|blocks| {
                OffloadResponse::BlockFaces(visibility::compute_face_masks(blocks, spec.predicate()))
            })),
            OffloadRequest::TakeBuffer => Some(match self.blocks.take() {
                Some(blocks) => OffloadResponse::Buffer(blocks),
                None => OffloadResponse::Error(self.failure()),
            }),
        }
    }

    fn failure(&self) -> OffloadError {
        self.init_error.clone().unwrap_or(OffloadError::NotInitialized)
    }

    fn scan<F>(&self, run: F) -> OffloadResponse
    where
        F: FnOnce(&[Block]) -> OffloadResponse,
    {
        match &self.blocks {
            Some(blocks) => run(blocks),
            None => OffloadResponse::Error(self.failure()),
        }
    }
}

fn run_worker(
    id: usize,
    requests: Receiver<OffloadRequest>,
    responses: UnboundedSender<OffloadResponse>,
) {
    let mut state = WorkerState::default();
    while let Ok(request) = requests.recv() {
        if let Some(response) = state.handle(request) {
            if responses.unbounded_send(response).is_err() {
                break;
            }
        }
    }
    debug!("Chunk worker {} stopped", id);
}

/// The caller's handle to one worker thread.
///
/// Dropping the handle closes the request channel; the thread exits once it has
/// finished the request it is working on. Use [`ChunkWorker::terminate`] to also
/// wait for that.
pub struct ChunkWorker {
    id: usize,
    request_sender: Option<Sender<OffloadRequest>>,
    response_receiver: UnboundedReceiver<OffloadResponse>,
    state: ProtocolState,
    pending: Option<&'static str>,
    /// A `recv` started waiting and has not finished.
    receiving: bool,
    /// Replies still to arrive for requests whose waiter was dropped.
    abandoned: usize,
    worker: Option<JoinHandle<()>>,
}

impl ChunkWorker {
    /// Starts a worker thread with no buffer installed.
    pub fn spawn(id: usize) -> Result<Self, OffloadError> {
        let (request_tx, request_rx) = channel::<OffloadRequest>();
        let (response_tx, response_rx) = unbounded::<OffloadResponse>();

        let worker = thread::Builder::new()
            .name(format!("chunk-worker-{}", id))
            .spawn(move || run_worker(id, request_rx, response_tx))
            .map_err(|error| OffloadError::SpawnFailed(error.to_string()))?;

        debug!("Chunk worker {} spawned", id);
        Ok(ChunkWorker {
            id,
            request_sender: Some(request_tx),
            response_receiver: response_rx,
            state: ProtocolState::Idle,
            pending: None,
            receiving: false,
            abandoned: 0,
            worker: Some(worker),
        })
    }

    /// The id given at spawn time.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Current protocol state.
    pub fn state(&self) -> ProtocolState {
        self.state
    }

    /// Sends a request without waiting for its reply.
    ///
    /// # Errors
    /// `RequestInFlight` if the previous request has not been answered yet,
    /// `WorkerDisconnected` if the worker thread is gone.
    pub fn send(&mut self, request: OffloadRequest) -> Result<(), OffloadError> {
        if self.state == ProtocolState::AwaitingResponse {
            if !self.receiving {
                return Err(OffloadError::RequestInFlight);
            }
            self.abandon_pending();
        }
        let kind = request.kind();
        let expects_reply = request.expects_reply();
        let sender = self
            .request_sender
            .as_ref()
            .ok_or(OffloadError::WorkerDisconnected)?;
        sender
            .send(request)
            .map_err(|_| OffloadError::WorkerDisconnected)?;

        debug!("Worker {} <- {}", self.id, kind);
        if expects_reply {
            self.state = ProtocolState::AwaitingResponse;
            self.pending = Some(kind);
        }
        Ok(())
    }

    /// Waits for the reply to the outstanding request.
    ///
    /// # Errors
    /// `NoRequestInFlight` if nothing was sent, `WorkerDisconnected` if the worker
    /// died before replying.
    pub async fn recv(&mut self) -> Result<OffloadResponse, OffloadError> {
        if self.state == ProtocolState::Idle {
            return Err(OffloadError::NoRequestInFlight);
        }
        self.receiving = true;
        let response = self.next_reply().await;
        self.receiving = false;
        self.state = ProtocolState::Idle;
        let kind = self.pending.take().unwrap_or("request");
        match response {
            Some(response) => {
                debug!("Worker {} -> {} reply", self.id, kind);
                Ok(response)
            }
            None => Err(OffloadError::WorkerDisconnected),
        }
    }

    fn abandon_pending(&mut self) {
        debug!(
            "Worker {}: abandoning {} reply",
            self.id,
            self.pending.unwrap_or("request")
        );
        self.abandoned += 1;
        self.receiving = false;
        self.pending = None;
        self.state = ProtocolState::Idle;
    }

    /// The next reply that belongs to a live request.
    async fn next_reply(&mut self) -> Option<OffloadResponse> {
        loop {
            let response = self.response_receiver.next().await?;
            if self.abandoned == 0 {
                return Some(response);
            }
            self.abandoned -= 1;
        }
    }

    /// Returns the reply if it has already arrived, without waiting.
    pub fn try_recv(&mut self) -> Result<Option<OffloadResponse>, OffloadError> {
        if self.state == ProtocolState::Idle {
            return Err(OffloadError::NoRequestInFlight);
        }
        loop {
            match self.response_receiver.try_next() {
                Ok(Some(_)) if self.abandoned > 0 => self.abandoned -= 1,
                Ok(Some(response)) => {
                    self.state = ProtocolState::Idle;
                    self.pending = None;
                    self.receiving = false;
                    return Ok(Some(response));
                }
                Ok(None) => {
                    self.state = ProtocolState::Idle;
                    self.pending = None;
                    self.receiving = false;
                    return Err(OffloadError::WorkerDisconnected);
                }
                Err(_) => return Ok(None),
            }
        }
    }

    /// Sends a request and waits for its reply.
    pub async fn request(&mut self, request: OffloadRequest) -> Result<OffloadResponse, OffloadError> {
        self.send(request)?;
        self.recv().await
    }

    /// Installs the buffer that following scans run over. The buffer is moved into
    /// the worker.
    pub fn init(&mut self, blocks: Box<[Block]>) -> Result<(), OffloadError> {
        self.send(OffloadRequest::Init(blocks))
    }

    /// Asks whether any block matches.
    pub async fn any(&mut self, spec: PredicateSpec) -> Result<bool, OffloadError> {
        match self.request(OffloadRequest::Any(spec)).await? {
            OffloadResponse::Any(found) => Ok(found),
            other => Err(unexpected(other, "any")),
        }
    }

    /// Counts matching blocks.
    pub async fn count(&mut self, spec: PredicateSpec) -> Result<usize, OffloadError> {
        match self.request(OffloadRequest::Count(spec)).await? {
            OffloadResponse::Count(count) => Ok(count),
            other => Err(unexpected(other, "count")),
        }
    }

    /// Counts the exposed faces of matching blocks.
    pub async fn count_faces(&mut self, spec: PredicateSpec) -> Result<usize, OffloadError> {
        match self.request(OffloadRequest::CountFaces(spec)).await? {
            OffloadResponse::FaceCount(faces) => Ok(faces),
            other => Err(unexpected(other, "countFaces")),
        }
    }

    /// Fetches the face mask of every block. The mask buffer is moved to the caller.
    pub async fn block_faces(&mut self, spec: PredicateSpec) -> Result<Vec<u8>, OffloadError> {
        match self.request(OffloadRequest::GetBlockFaces(spec)).await? {
            OffloadResponse::BlockFaces(masks) => Ok(masks),
            other => Err(unexpected(other, "getBlockFaces")),
        }
    }

    /// Takes the installed buffer back out of the worker.
    pub async fn take_buffer(&mut self) -> Result<Box<[Block]>, OffloadError> {
        match self.request(OffloadRequest::TakeBuffer).await? {
            OffloadResponse::Buffer(blocks) => Ok(blocks),
            other => Err(unexpected(other, "takeBuffer")),
        }
    }

    /// Closes the request channel and waits for the thread to exit.
    pub fn terminate(mut self) {
        self.request_sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Chunk worker {} panicked", self.id);
            }
        }
        info!("Chunk worker {} terminated", self.id);
    }
}

impl Drop for ChunkWorker {
    fn drop(&mut self) {
        self.request_sender.take();
    }
}

fn unexpected(response: OffloadResponse, request: &'static str) -> OffloadError {
    match response {
        OffloadResponse::Error(error) => error,
        _ => OffloadError::UnexpectedResponse { request },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxels::block::AIR;
    use crate::voxels::chunk::chunk_index::block_index;

    fn single_block_buffer() -> Box<[Block]> {
        let mut blocks = vec![AIR; BLOCKS_PER_CHUNK];
        blocks[block_index(0, 0, 0)] = Block::new(0x2);
        blocks.into_boxed_slice()
    }

    #[test]
    fn worker_answers_scans() {
        let mut worker = ChunkWorker::spawn(0).unwrap();
        worker.init(single_block_buffer()).unwrap();
        assert_eq!(worker.state(), ProtocolState::Idle);

        pollster::block_on(async {
            assert_eq!(worker.any(PredicateSpec::type_id(2)).await, Ok(true));
            assert_eq!(worker.any(PredicateSpec::type_id(99)).await, Ok(false));
            assert_eq!(worker.count(PredicateSpec::type_id(2)).await, Ok(1));
            assert_eq!(worker.count_faces(PredicateSpec::type_id(2)).await, Ok(6));

            let masks = worker.block_faces(PredicateSpec::type_id(2)).await.unwrap();
            assert_eq!(masks.len(), BLOCKS_PER_CHUNK);
            assert_eq!(masks[0], 0b11_1111);
            assert!(masks[1..].iter().all(|m| *m == 0));

            let buffer = worker.take_buffer().await.unwrap();
            assert_eq!(buffer, single_block_buffer());
            assert_eq!(
                worker.any(PredicateSpec::type_id(2)).await,
                Err(OffloadError::NotInitialized)
            );
        });
        worker.terminate();
    }

    #[test]
    fn scans_before_init_fail() {
        let mut worker = ChunkWorker::spawn(1).unwrap();
        let result = pollster::block_on(worker.count_faces(PredicateSpec::NotAir));
        assert_eq!(result, Err(OffloadError::NotInitialized));
        assert_eq!(worker.state(), ProtocolState::Idle);
    }

    #[test]
    fn init_failure_is_reported_on_next_request() {
        let mut worker = ChunkWorker::spawn(2).unwrap();
        worker.init(vec![AIR; 10].into_boxed_slice()).unwrap();
        pollster::block_on(async {
            assert_eq!(
                worker.any(PredicateSpec::NotAir).await,
                Err(OffloadError::BadBufferLength { len: 10 })
            );
            assert_eq!(
                worker.take_buffer().await,
                Err(OffloadError::BadBufferLength { len: 10 })
            );

            worker.init(single_block_buffer()).unwrap();
            assert_eq!(worker.any(PredicateSpec::NotAir).await, Ok(true));
        });
    }

    #[test]
    fn second_request_in_flight_is_refused() {
        let mut worker = ChunkWorker::spawn(3).unwrap();
        worker.init(single_block_buffer()).unwrap();

        worker.send(OffloadRequest::Count(PredicateSpec::NotAir)).unwrap();
        assert_eq!(worker.state(), ProtocolState::AwaitingResponse);
        assert_eq!(
            worker.send(OffloadRequest::Any(PredicateSpec::NotAir)),
            Err(OffloadError::RequestInFlight)
        );
        assert_eq!(
            worker.init(single_block_buffer()),
            Err(OffloadError::RequestInFlight)
        );

        let response = pollster::block_on(worker.recv());
        assert_eq!(response, Ok(OffloadResponse::Count(1)));
        assert_eq!(
            pollster::block_on(worker.recv()),
            Err(OffloadError::NoRequestInFlight)
        );
    }

    #[test]
    fn dropped_reply_future_does_not_block_the_worker() {
        use futures::FutureExt;

        let mut worker = ChunkWorker::spawn(4).unwrap();
        worker.init(single_block_buffer()).unwrap();

        let _ = worker.count(PredicateSpec::NotAir).now_or_never();
        assert_eq!(
            worker.send(OffloadRequest::Any(PredicateSpec::type_id(99))),
            Ok(())
        );
        assert_eq!(
            pollster::block_on(worker.recv()),
            Ok(OffloadResponse::Any(false))
        );
        assert_eq!(pollster::block_on(worker.count(PredicateSpec::NotAir)), Ok(1));
        assert_eq!(worker.state(), ProtocolState::Idle);
    }

    #[test]
    fn try_recv_skips_abandoned_replies() {
        use futures::FutureExt;

        let mut worker = ChunkWorker::spawn(5).unwrap();
        worker.init(single_block_buffer()).unwrap();
        let _ = worker.any(PredicateSpec::NotAir).now_or_never();

        worker.send(OffloadRequest::Count(PredicateSpec::type_id(2))).unwrap();
        let response = loop {
            if let Some(response) = worker.try_recv().unwrap() {
                break response;
            }
            std::thread::yield_now();
        };
        assert_eq!(response, OffloadResponse::Count(1));
    }

    #[test]
    fn disconnection_seen_by_try_recv_resets_the_handle() {
        let (request_tx, _request_rx) = channel::<OffloadRequest>();
        let (response_tx, response_rx) = unbounded::<OffloadResponse>();
        drop(response_tx);
        let mut worker = ChunkWorker {
            id: 9,
            request_sender: Some(request_tx),
            response_receiver: response_rx,
            state: ProtocolState::AwaitingResponse,
            pending: Some("any"),
            receiving: false,
            abandoned: 0,
            worker: None,
        };

        assert_eq!(worker.try_recv(), Err(OffloadError::WorkerDisconnected));
        assert_eq!(worker.state(), ProtocolState::Idle);
        assert_eq!(worker.pending, None);
    }

    #[test]
    fn worker_state_handles_requests_synchronously() {
        let mut state = WorkerState::default();
        assert_eq!(state.handle(OffloadRequest::Init(single_block_buffer())), None);
        assert_eq!(
            state.handle(OffloadRequest::CountFaces(PredicateSpec::type_id(2))),
            Some(OffloadResponse::FaceCount(6))
        );
        assert_eq!(
            state.handle(OffloadRequest::Count(PredicateSpec::type_id(0))),
            Some(OffloadResponse::Count(BLOCKS_PER_CHUNK - 1))
        );
    }
}
