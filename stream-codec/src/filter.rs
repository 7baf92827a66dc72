use std::collections::HashSet;
use std::io::Read;

use stream_buffer::ChunkQueueBuffer;
use stream_engine::{Produce, Producer, DEFAULT_BLOCK_SIZE};
use stream_error::{Result, StreamError};

use crate::block::CharBlockReader;

/// Drops every character present in an excluded set, order-preserving.
///
/// The source's textual encoding is auto-detected (byte order mark, UTF-8
/// default); survivors are written as UTF-8.
pub struct CharFilterProducer<R> {
    blocks: CharBlockReader<R>,
    excluded: HashSet<char>,
}

impl<R: Read> CharFilterProducer<R> {
    pub fn new(source: R, excluded: HashSet<char>) -> Result<Self> {
        Self::with_block_size(source, excluded, DEFAULT_BLOCK_SIZE)
    }

    pub fn with_block_size(
        source: R,
        excluded: HashSet<char>,
        block_size: usize,
    ) -> Result<Self> {
        if block_size == 0 {
            return Err(StreamError::Config(
                "block size must be positive".to_owned(),
            ));
        }
        log::debug!(
            "char-filter: excluding {} character(s)",
            excluded.len()
        );
        Ok(Self {
            blocks: CharBlockReader::new(source, block_size),
            excluded,
        })
    }
}

impl<R: Read> Producer for CharFilterProducer<R> {
    fn label(&self) -> &str {
        "char-filter"
    }

    fn produce_next(&mut self, out: &mut ChunkQueueBuffer) -> Result<Produce> {
        match self.blocks.next_block()? {
            None => Ok(Produce::Exhausted),
            Some(text) => {
                let kept: String = text
                    .chars()
                    .filter(|c| !self.excluded.contains(c))
                    .collect();
                out.append(kept.as_bytes());
                Ok(Produce::Produced)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::io::{Cursor, Read};

    use stream_engine::Producer;

    use super::CharFilterProducer;

    fn filter(input: &str, excluded: &[char], block_size: usize) -> String {
        let excluded: HashSet<char> = excluded.iter().copied().collect();
        let producer = CharFilterProducer::with_block_size(
            Cursor::new(input.as_bytes().to_vec()),
            excluded,
            block_size,
        )
        .expect("failed to build filter");
        let mut out = String::new();
        producer
            .into_engine()
            .read_to_string(&mut out)
            .expect("filtering failed");
        out
    }

    #[test]
    fn drops_excluded_characters() {
        assert_eq!(filter("a,b\nc", &[',', '\n'], 4096), "abc");
    }

    #[test]
    fn survivors_keep_their_order() {
        assert_eq!(filter("1;2;3;4", &[';'], 4096), "1234");
    }

    #[test]
    fn empty_exclusion_set_passes_everything_through() {
        assert_eq!(filter("a,b\nc", &[], 4096), "a,b\nc");
    }

    #[test]
    fn non_ascii_characters_can_be_excluded() {
        assert_eq!(filter("naïve", &['ï'], 1), "nave");
    }
}
