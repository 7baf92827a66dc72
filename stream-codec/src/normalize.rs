use std::io::Read;

use stream_buffer::ChunkQueueBuffer;
use stream_engine::{Produce, Producer, DEFAULT_BLOCK_SIZE};
use stream_error::{Result, StreamError};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::block::CharBlockReader;

/// The SUB control character, mapped to a plain space before
/// decomposition.
const SUB: char = '\u{1A}';

/// Strips diacritics block by block.
///
/// Each decoded block is canonically decomposed (NFD) and non-spacing
/// combining marks are dropped; the SUB control character becomes a
/// space. Decomposition is computed per block: a combining sequence
/// straddling a block boundary is not reassembled first, each side is
/// normalized on its own.
pub struct DiacriticsProducer<R> {
    blocks: CharBlockReader<R>,
}

impl<R: Read> DiacriticsProducer<R> {
    pub fn new(source: R) -> Result<Self> {
        Self::with_block_size(source, DEFAULT_BLOCK_SIZE)
    }

    pub fn with_block_size(source: R, block_size: usize) -> Result<Self> {
        if block_size == 0 {
            return Err(StreamError::Config(
                "block size must be positive".to_owned(),
            ));
        }
        Ok(Self {
            blocks: CharBlockReader::new(source, block_size),
        })
    }
}

impl<R: Read> Producer for DiacriticsProducer<R> {
    fn label(&self) -> &str {
        "diacritics"
    }

    fn produce_next(&mut self, out: &mut ChunkQueueBuffer) -> Result<Produce> {
        match self.blocks.next_block()? {
            None => Ok(Produce::Exhausted),
            Some(text) => {
                let stripped: String = text
                    .chars()
                    .map(|c| if c == SUB { ' ' } else { c })
                    .nfd()
                    .filter(|c| !is_combining_mark(*c))
                    .collect();
                out.append(stripped.as_bytes());
                Ok(Produce::Produced)
            }
        }
    }
}
