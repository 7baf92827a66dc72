//! # Stream Buffer
//!
//! `stream-buffer` provides [`ChunkQueueBuffer`], the handoff point between
//! a transform producing bytes and the caller draining them. The producer
//! appends whole chunks; the consumer reads any number of bytes at a time.
//!
//! The buffer is single-producer/single-consumer and carries no internal
//! synchronization: the owning engine alternates append and read strictly
//! on one thread. Memory is bounded by the unread surplus only, so the
//! engine clears the buffer eagerly on close or failure.

use std::collections::VecDeque;

/// An unbounded FIFO of byte chunks with write/read semantics.
///
/// Chunks are immutable once enqueued; a chunk that is only partially
/// consumed is front-trimmed in place and kept at the front of the queue.
#[derive(Debug, Default)]
pub struct ChunkQueueBuffer {
    chunks: VecDeque<Vec<u8>>,
}

impl ChunkQueueBuffer {
    pub fn new() -> Self {
        Self {
            chunks: VecDeque::new(),
        }
    }

    /// Enqueue a copy of `bytes` behind all previously appended chunks.
    /// Empty appends are ignored. The caller is responsible for not
    /// growing the buffer without bound.
    pub fn append(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        self.chunks.push_back(bytes.to_vec());
    }

    /// Copy up to `dest.len()` buffered bytes into `dest`, consuming the
    /// oldest chunks first. Returns the number of bytes copied, which is
    /// 0 only when the buffer is empty. Never blocks.
    pub fn read(&mut self, dest: &mut [u8]) -> usize {
        let mut copied = 0;
        while copied < dest.len() {
            let chunk = match self.chunks.front_mut() {
                Some(chunk) => chunk,
                None => break,
            };
            let take = chunk.len().min(dest.len() - copied);
            dest[copied..copied + take].copy_from_slice(&chunk[..take]);
            copied += take;

            if take == chunk.len() {
                self.chunks.pop_front();
            } else {
                // Surplus bytes stay at the front as a shorter chunk.
                chunk.drain(..take);
            }
        }
        copied
    }

    /// Total buffered bytes. Recomputed on every call, never cached.
    pub fn len(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.iter().all(Vec::is_empty)
    }

    /// Drop all buffered chunks.
    pub fn clear(&mut self) {
        if !self.chunks.is_empty() {
            log::debug!(
                "buffer: discarding {} unread byte(s) in {} chunk(s)",
                self.len(),
                self.chunks.len()
            );
        }
        self.chunks.clear();
    }
}
