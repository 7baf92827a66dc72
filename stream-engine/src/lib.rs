//! # Stream Engine
//!
//! `stream-engine` is the forward-only pull-transformation core. A
//! [`Producer`] performs one bounded unit of transformation work per call,
//! appending output to a [`ChunkQueueBuffer`]; a [`TransformEngine`] drives
//! the producer until a caller-requested byte count is satisfied or the
//! source is exhausted. The engine also exposes the transformed sequence
//! through [`std::io::Read`], so hosts consume it like any other stream.
//!
//! [`ReadTap`] is the pass-through observer used by archiving/auditing
//! collaborators to copy bytes as they are consumed.
//!
//! [`ChunkQueueBuffer`]: stream_buffer::ChunkQueueBuffer

pub mod engine;
pub mod tap;

pub use engine::{
    Produce, Producer, TransformEngine, TransformState, DEFAULT_BLOCK_SIZE,
};
pub use tap::ReadTap;
