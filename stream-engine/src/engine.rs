use std::io::{self, Read, Seek, SeekFrom};

use stream_buffer::ChunkQueueBuffer;
use stream_error::{Result, StreamError};

/// Default raw block size for transforms that pull fixed-size blocks.
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Where the engine is in the life of one transformation.
///
/// The progression is monotonic: `Running` until the producer reports
/// exhaustion, then `EndOfInputReached` while the buffered surplus drains,
/// then `Terminal`. `Terminal` is absorbing: the engine yields zero bytes
/// forever after.
#[derive(Eq, PartialEq, Clone, Copy, Debug)]
pub enum TransformState {
    Running,
    EndOfInputReached,
    Terminal,
}

/// Outcome of one produce call.
#[derive(Eq, PartialEq, Debug)]
pub enum Produce {
    /// Work was done; zero or more bytes were appended to the buffer.
    Produced,
    /// The source is exhausted and no further output will ever appear.
    Exhausted,
}

/// One concrete transform: the hook the engine drives.
pub trait Producer {
    /// Short identity used in logs and failure reports.
    fn label(&self) -> &str;

    /// Perform one bounded unit of work against the wrapped source,
    /// appending zero or more transformed bytes to `out`.
    fn produce_next(&mut self, out: &mut ChunkQueueBuffer) -> Result<Produce>;

    /// Called exactly once when the engine reaches end-of-stream with an
    /// empty buffer. Transforms that defer failures (schema validation)
    /// surface them here.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }

    /// Wrap this producer in a [`TransformEngine`].
    fn into_engine(self) -> TransformEngine<Self>
    where
        Self: Sized,
    {
        TransformEngine::new(self)
    }
}

/// The forward-only pull-transformation wrapper.
///
/// Exclusively owns its buffer and its producer (and through the producer,
/// the wrapped source). Dropping the engine releases the source; calling
/// [`TransformEngine::close`] additionally clears the buffered surplus
/// early.
pub struct TransformEngine<P: Producer> {
    producer: P,
    buffer: ChunkQueueBuffer,
    state: TransformState,
    position: u64,
    finish_pending: bool,
}

impl<P: Producer> TransformEngine<P> {
    pub fn new(producer: P) -> Self {
        Self {
            producer,
            buffer: ChunkQueueBuffer::new(),
            state: TransformState::Running,
            position: 0,
            finish_pending: false,
        }
    }

    pub fn state(&self) -> TransformState {
        self.state
    }

    /// Bytes returned to the caller so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Pull transformed bytes into `dest`.
    ///
    /// Returns exactly `dest.len()` bytes unless the transformed sequence
    /// ends first; a short count is never spurious. `Ok(0)` means
    /// end-of-stream.
    pub fn read_transformed(&mut self, dest: &mut [u8]) -> Result<usize> {
        if self.state == TransformState::Terminal {
            // A failure deferred past a non-empty read surfaces on the
            // first call that would otherwise return zero bytes.
            if self.finish_pending {
                self.finish_pending = false;
                self.producer
                    .finish()
                    .map_err(|e| e.in_transform(self.producer.label()))?;
            }
            return Ok(0);
        }

        let mut copied = 0;
        while copied < dest.len() && self.state != TransformState::Terminal {
            if self.state == TransformState::Running {
                match self.producer.produce_next(&mut self.buffer) {
                    Ok(Produce::Produced) => {}
                    Ok(Produce::Exhausted) => {
                        log::debug!(
                            "engine/{}: end of input reached",
                            self.producer.label()
                        );
                        self.state = TransformState::EndOfInputReached;
                    }
                    Err(err) => {
                        self.fail();
                        return Err(
                            err.in_transform(self.producer.label())
                        );
                    }
                }
            }

            let just_copied = self.buffer.read(&mut dest[copied..]);
            copied += just_copied;

            if self.state == TransformState::EndOfInputReached
                && just_copied == 0
            {
                self.state = TransformState::Terminal;
                if copied == 0 {
                    self.producer.finish().map_err(|e| {
                        e.in_transform(self.producer.label())
                    })?;
                } else {
                    self.finish_pending = true;
                }
            }
        }

        self.position += copied as u64;
        Ok(copied)
    }

    /// Release buffered chunks and pin the engine terminal. The wrapped
    /// source itself is released when the engine is dropped.
    pub fn close(&mut self) {
        log::debug!("engine/{}: closing", self.producer.label());
        self.buffer.clear();
        self.state = TransformState::Terminal;
        self.finish_pending = false;
    }

    fn fail(&mut self) {
        self.buffer.clear();
        self.state = TransformState::Terminal;
        self.finish_pending = false;
    }
}

/// Lower a [`StreamError`] into an [`io::Error`].
///
/// Source IO faults unwrap back to the original error; every other failure
/// travels as the inner error and can be recovered with
/// [`io::Error::get_ref`] and a downcast to [`StreamError`].
pub fn into_io_error(err: StreamError) -> io::Error {
    match err {
        StreamError::Io(io) => io,
        other => io::Error::new(io::ErrorKind::Other, other),
    }
}

impl<P: Producer> Read for TransformEngine<P> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_transformed(buf).map_err(into_io_error)
    }
}

impl<P: Producer> Seek for TransformEngine<P> {
    /// The engine is forward-only; seeking always fails.
    fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
        Err(into_io_error(StreamError::Unsupported(format!(
            "seek on forward-only transform `{}`",
            self.producer.label()
        ))))
    }
}
