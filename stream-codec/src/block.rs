use std::io::Read;

use encoding_rs::{CoderResult, Decoder, UTF_8};
use stream_error::Result;

/// Block-wise text decoding over a raw byte source.
///
/// The source's encoding is auto-detected from a leading byte order mark;
/// without one the source is treated as UTF-8 (malformed sequences decode
/// to the replacement character). Decoder state persists across blocks, so
/// a multi-byte character split over a block boundary decodes correctly.
pub(crate) struct CharBlockReader<R> {
    source: R,
    decoder: Decoder,
    block: Vec<u8>,
    flushed: bool,
}

impl<R: Read> CharBlockReader<R> {
    pub(crate) fn new(source: R, block_size: usize) -> Self {
        Self {
            source,
            // BOM sniffing switches the decoder to the encoding the BOM
            // names and strips the BOM itself.
            decoder: UTF_8.new_decoder(),
            block: vec![0u8; block_size],
            flushed: false,
        }
    }

    /// Decode the next block of characters. Returns `None` once the
    /// source is exhausted and the decoder has flushed.
    pub(crate) fn next_block(&mut self) -> Result<Option<String>> {
        if self.flushed {
            return Ok(None);
        }

        let copied = self.source.read(&mut self.block)?;
        let last = copied == 0;
        let text = decode_block(
            &mut self.decoder,
            &self.block[..copied],
            last,
        );

        if last {
            self.flushed = true;
            if text.is_empty() {
                return Ok(None);
            }
        }
        Ok(Some(text))
    }
}

/// Run one block through `decoder`, preserving its cross-call state.
pub(crate) fn decode_block(
    decoder: &mut Decoder,
    block: &[u8],
    last: bool,
) -> String {
    let mut text = String::new();
    let mut src = block;
    loop {
        let reserve = decoder
            .max_utf8_buffer_length(src.len())
            .unwrap_or(src.len() * 3 + 16);
        text.reserve(reserve);
        let (result, consumed, _replaced) =
            decoder.decode_to_string(src, &mut text, last);
        src = &src[consumed..];
        match result {
            CoderResult::InputEmpty => break,
            CoderResult::OutputFull => continue,
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::CharBlockReader;

    fn drain(reader: &mut CharBlockReader<Cursor<&[u8]>>) -> String {
        let mut all = String::new();
        while let Some(block) = reader.next_block().expect("decode failed") {
            all.push_str(&block);
        }
        all
    }

    #[test]
    fn defaults_to_utf8() {
        let mut reader =
            CharBlockReader::new(Cursor::new("héllo".as_bytes()), 4096);
        assert_eq!(drain(&mut reader), "héllo");
    }

    #[test]
    fn bom_switches_to_utf16() {
        // UTF-16LE BOM followed by "hi".
        let bytes: &[u8] = &[0xFF, 0xFE, b'h', 0x00, b'i', 0x00];
        let mut reader = CharBlockReader::new(Cursor::new(bytes), 4096);
        assert_eq!(drain(&mut reader), "hi");
    }

    #[test]
    fn one_byte_blocks_keep_multibyte_characters_whole() {
        let mut reader =
            CharBlockReader::new(Cursor::new("é".as_bytes()), 1);
        assert_eq!(drain(&mut reader), "é");
    }

    #[test]
    fn exhausted_reader_stays_exhausted() {
        let mut reader =
            CharBlockReader::new(Cursor::new(b"x" as &[u8]), 4096);
        drain(&mut reader);
        assert!(reader.next_block().unwrap().is_none());
    }
}
