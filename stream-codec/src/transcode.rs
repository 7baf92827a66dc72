use std::io::Read;

use encoding_rs::{CoderResult, Decoder, Encoder, Encoding};
use stream_buffer::ChunkQueueBuffer;
use stream_engine::{Produce, Producer, DEFAULT_BLOCK_SIZE};
use stream_error::{Result, StreamError};

use crate::block::decode_block;

/// Decode-then-re-encode between two character sets.
///
/// The decoder and encoder keep their boundary state across calls and are
/// never reset, so a multi-byte character split across raw block
/// boundaries is re-encoded intact. Characters the target encoding cannot
/// represent are replaced with numeric character references, matching the
/// encoder's standard fallback.
pub struct TranscodeProducer<R> {
    source: R,
    decoder: Decoder,
    encoder: Encoder,
    block: Vec<u8>,
    flushed: bool,
}

impl<R: Read> TranscodeProducer<R> {
    /// Build a transcoder with [`DEFAULT_BLOCK_SIZE`] raw blocks.
    pub fn new(source: R, from_label: &str, to_label: &str) -> Result<Self> {
        Self::with_block_size(source, from_label, to_label, DEFAULT_BLOCK_SIZE)
    }

    /// Build a transcoder pulling raw blocks of `block_size` bytes.
    ///
    /// Encoding labels are resolved per the WHATWG registry. Target
    /// encodings without an encoder (the UTF-16 family) are normalized to
    /// their output encoding, UTF-8.
    pub fn with_block_size(
        source: R,
        from_label: &str,
        to_label: &str,
        block_size: usize,
    ) -> Result<Self> {
        if block_size == 0 {
            return Err(StreamError::Config(
                "block size must be positive".to_owned(),
            ));
        }
        let from = resolve_label(from_label)?;
        let to = resolve_label(to_label)?.output_encoding();

        log::debug!(
            "transcode: {} -> {} in {} byte blocks",
            from.name(),
            to.name(),
            block_size
        );

        Ok(Self {
            source,
            decoder: from.new_decoder_with_bom_removal(),
            encoder: to.new_encoder(),
            block: vec![0u8; block_size],
            flushed: false,
        })
    }
}

fn resolve_label(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.as_bytes()).ok_or_else(|| {
        StreamError::Config(format!("unknown encoding label `{label}`"))
    })
}

impl<R: Read> Producer for TranscodeProducer<R> {
    fn label(&self) -> &str {
        "transcode"
    }

    fn produce_next(&mut self, out: &mut ChunkQueueBuffer) -> Result<Produce> {
        if self.flushed {
            return Ok(Produce::Exhausted);
        }

        let copied = self.source.read(&mut self.block)?;
        let last = copied == 0;

        let text =
            decode_block(&mut self.decoder, &self.block[..copied], last);

        let mut encoded = Vec::new();
        let mut src = text.as_str();
        loop {
            let reserve = self
                .encoder
                .max_buffer_length_from_utf8_if_no_unmappables(src.len())
                .unwrap_or(src.len() * 4 + 16);
            encoded.reserve(reserve);
            let (result, consumed, _had_unmappables) =
                self.encoder.encode_from_utf8_to_vec(src, &mut encoded, last);
            src = &src[consumed..];
            match result {
                CoderResult::InputEmpty => break,
                CoderResult::OutputFull => continue,
            }
        }
        out.append(&encoded);

        if last {
            self.flushed = true;
            Ok(Produce::Exhausted)
        } else {
            Ok(Produce::Produced)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use rstest::rstest;
    use stream_engine::Producer;
    use stream_error::StreamError;

    use super::TranscodeProducer;

    const CAFE_1252: &[u8] = &[0x63, 0x61, 0x66, 0xE9];

    fn transcode(
        bytes: &[u8],
        from: &str,
        to: &str,
        block_size: usize,
    ) -> Vec<u8> {
        let producer = TranscodeProducer::with_block_size(
            Cursor::new(bytes.to_vec()),
            from,
            to,
            block_size,
        )
        .expect("failed to build transcoder");
        let mut out = Vec::new();
        producer
            .into_engine()
            .read_to_end(&mut out)
            .expect("transcoding failed");
        out
    }

    #[test]
    fn windows1252_round_trip() {
        let utf8 = transcode(CAFE_1252, "windows-1252", "utf-8", 4096);
        assert_eq!(utf8, "café".as_bytes());

        let back = transcode(&utf8, "utf-8", "windows-1252", 4096);
        assert_eq!(back, CAFE_1252);
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(3)]
    #[case(4096)]
    fn output_does_not_depend_on_block_size(#[case] block_size: usize) {
        let utf8 =
            transcode(CAFE_1252, "windows-1252", "utf-8", block_size);
        assert_eq!(utf8, "café".as_bytes());
    }

    #[test]
    fn one_byte_blocks_never_corrupt_multibyte_input() {
        // A two-byte UTF-8 character must survive one-byte source blocks.
        let out = transcode("é".as_bytes(), "utf-8", "windows-1252", 1);
        assert_eq!(out, &[0xE9]);
    }

    #[test]
    fn utf16_target_normalizes_to_utf8() {
        let out = transcode(b"plain", "utf-8", "utf-16le", 4096);
        assert_eq!(out, b"plain");
    }

    #[test]
    fn unknown_label_is_a_configuration_error() {
        let err = TranscodeProducer::new(
            Cursor::new(Vec::<u8>::new()),
            "no-such-charset",
            "utf-8",
        )
        .err()
        .expect("label must not resolve");
        assert!(matches!(err, StreamError::Config(_)));
    }

    #[test]
    fn zero_block_size_is_a_configuration_error() {
        let err = TranscodeProducer::with_block_size(
            Cursor::new(Vec::<u8>::new()),
            "utf-8",
            "utf-8",
            0,
        )
        .err()
        .expect("zero block size must be rejected");
        assert!(matches!(err, StreamError::Config(_)));
    }
}
