//! # Voxels
//!
//! Block values, chunk storage, the binary world format and the face-visibility
//! engine. Everything here is synchronous; see
//! [`task_management`](crate::task_management) for running scans on workers.

pub mod block;
pub mod chunk;
pub mod codec;
pub mod error;
pub mod visibility;
pub mod world;
