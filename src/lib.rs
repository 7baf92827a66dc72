//! # streamlib
//!
//! A forward-only, memory-bounded stream transformation library. A
//! consumer pulls any number of bytes at a time from a lazily produced,
//! transformed byte sequence; the producer transforms incrementally and
//! never holds more than the currently unread surplus in memory.
//!
//! Every concrete transform is a [`Producer`] driven by a
//! [`TransformEngine`]:
//!
//! - [`TranscodeProducer`]: character-set transcoding;
//! - [`CharFilterProducer`]: character filtering;
//! - [`DiacriticsProducer`]: diacritics stripping;
//! - [`XmlTranslateProducer`]: node-by-node XML rewriting, optionally
//!   validating against a [`Schema`];
//! - [`ReadTap`]: a pass-through observer for archiving collaborators.
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::Read;
//!
//! use streamlib::{Producer, TranscodeProducer};
//!
//! # fn main() -> streamlib::Result<()> {
//! let source = File::open("message.txt")?;
//! let mut engine =
//!     TranscodeProducer::new(source, "windows-1252", "utf-8")?
//!         .into_engine();
//!
//! let mut transformed = Vec::new();
//! engine.read_to_end(&mut transformed)?;
//! # Ok(())
//! # }
//! ```

pub use stream_buffer::ChunkQueueBuffer;
pub use stream_codec::{
    CharFilterProducer, DiacriticsProducer, TranscodeProducer,
};
pub use stream_engine::{
    Produce, Producer, ReadTap, TransformEngine, TransformState,
    DEFAULT_BLOCK_SIZE,
};
pub use stream_error::{
    Result, Severity, StreamError, ValidationCategory, ValidationError,
};
pub use stream_xml::{Schema, XmlTranslateOptions, XmlTranslateProducer};
