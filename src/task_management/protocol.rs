//! # Offload Protocol Messages
//!
//! The closed set of messages exchanged between a caller and a [`ChunkWorker`].
//!
//! Requests carry a [`PredicateSpec`] rather than a closure: predicates have to
//! cross the worker boundary as plain data, and the worker rebuilds the matching
//! function locally. Large buffers (the block array sent with `Init`, the face
//! masks sent back) are moved through the channel, never copied.
//!
//! [`ChunkWorker`]: super::worker::ChunkWorker

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

use serde::{Deserialize, Serialize};

use crate::voxels::block::Block;

/// A serializable description of which blocks a scan selects.
///
/// Serialized with JSON this is `{"kind":"blockTypeId","blockTypeId":2}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PredicateSpec {
    /// Blocks whose type id equals `block_type_id`.
    #[serde(rename_all = "camelCase")]
    BlockTypeId { block_type_id: u32 },
    /// Blocks whose type id is any of `block_type_ids`.
    #[serde(rename_all = "camelCase")]
    AnyBlockTypeId { block_type_ids: Vec<u32> },
    /// Every block that is not air.
    NotAir,
}

impl PredicateSpec {
    /// Selects blocks of a single type id.
    pub fn type_id(block_type_id: u32) -> Self {
        PredicateSpec::BlockTypeId { block_type_id }
    }

    /// Evaluates the predicate against one block.
    pub fn matches(&self, block: Block) -> bool {
        match self {
            PredicateSpec::BlockTypeId { block_type_id } => block.matches(*block_type_id),
            PredicateSpec::AnyBlockTypeId { block_type_ids } => {
                block_type_ids.contains(&block.type_id())
            }
            PredicateSpec::NotAir => !block.is_air(),
        }
    }

    /// The predicate as a closure for the visibility functions.
    pub fn predicate(&self) -> impl Fn(Block) -> bool + '_ {
        move |block| self.matches(block)
    }
}

/// Caller to worker messages.
#[derive(Debug)]
pub enum OffloadRequest {
    /// Installs the block buffer the following requests scan. Has no reply; a
    /// failure is reported in place of the next reply instead.
    Init(Box<[Block]>),
    /// Replies [`OffloadResponse::Any`].
    Any(PredicateSpec),
    /// Replies [`OffloadResponse::Count`].
    Count(PredicateSpec),
    /// Replies [`OffloadResponse::FaceCount`].
    CountFaces(PredicateSpec),
    /// Replies [`OffloadResponse::BlockFaces`].
    GetBlockFaces(PredicateSpec),
    /// Hands the installed block buffer back; replies [`OffloadResponse::Buffer`].
    TakeBuffer,
}

impl OffloadRequest {
    /// Returns `true` for requests the worker answers.
    pub fn expects_reply(&self) -> bool {
        !matches!(self, OffloadRequest::Init(_))
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            OffloadRequest::Init(_) => "init",
            OffloadRequest::Any(_) => "any",
            OffloadRequest::Count(_) => "count",
            OffloadRequest::CountFaces(_) => "countFaces",
            OffloadRequest::GetBlockFaces(_) => "getBlockFaces",
            OffloadRequest::TakeBuffer => "takeBuffer",
        }
    }
}

/// Worker to caller messages.
#[derive(Debug, PartialEq, Eq)]
pub enum OffloadResponse {
    Any(bool),
    Count(usize),
    FaceCount(usize),
    /// One face mask per block, indexed like the block array.
    BlockFaces(Vec<u8>),
    Buffer(Box<[Block]>),
    /// The request could not be served. Distinct from every normal reply.
    Error(OffloadError),
}

/// Failures of the offload protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OffloadError {
    /// A scan was requested before any buffer was installed.
    NotInitialized,
    /// `Init` was given a buffer that is not one chunk long.
    BadBufferLength { len: usize },
    /// A request was sent while the previous one had not been answered.
    RequestInFlight,
    /// A reply was awaited but no request is outstanding.
    NoRequestInFlight,
    /// The worker thread is gone.
    WorkerDisconnected,
    /// The worker thread could not be started.
    SpawnFailed(String),
    /// The reply did not have the kind the request asked for.
    UnexpectedResponse { request: &'static str },
}

impl Display for OffloadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            OffloadError::NotInitialized => write!(f, "Worker has no block buffer installed"),
            OffloadError::BadBufferLength { len } => {
                write!(f, "Worker initialization failed: buffer holds {} blocks", len)
            }
            OffloadError::RequestInFlight => {
                write!(f, "A request is already waiting for its response")
            }
            OffloadError::NoRequestInFlight => write!(f, "No request is waiting for a response"),
            OffloadError::WorkerDisconnected => write!(f, "Worker disconnected"),
            OffloadError::SpawnFailed(msg) => write!(f, "Failed to start worker: {}", msg),
            OffloadError::UnexpectedResponse { request } => {
                write!(f, "Unexpected response to {} request", request)
            }
        }
    }
}

impl Error for OffloadError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicate_specs_serialize_as_tagged_objects() {
        let spec = PredicateSpec::type_id(2);
        let json = serde_json::to_string(&spec).unwrap();
        assert_eq!(json, r#"{"kind":"blockTypeId","blockTypeId":2}"#);
        let back: PredicateSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);

        let any: PredicateSpec =
            serde_json::from_str(r#"{"kind":"anyBlockTypeId","blockTypeIds":[1,8]}"#).unwrap();
        assert!(any.matches(Block::new(8)));
        assert!(!any.matches(Block::new(2)));
    }

    #[test]
    fn predicates_ignore_flag_bits() {
        let spec = PredicateSpec::type_id(8);
        assert!(spec.matches(Block::new((3 << 14) | (15 << 10) | 8)));
        assert!(!PredicateSpec::NotAir.matches(Block::new(0x400)));
        assert!(PredicateSpec::NotAir.matches(Block::new(1)));
    }

    #[test]
    fn only_init_is_fire_and_forget() {
        assert!(!OffloadRequest::Init(Vec::new().into_boxed_slice()).expects_reply());
        assert!(OffloadRequest::TakeBuffer.expects_reply());
        assert!(OffloadRequest::Any(PredicateSpec::NotAir).expects_reply());
    }
}
