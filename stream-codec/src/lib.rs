//! # Stream Codec
//!
//! `stream-codec` provides the character-level transforms of the streamlib
//! family, each implemented as a [`Producer`] for the pull engine:
//!
//! - [`TranscodeProducer`]: decode-then-re-encode between two character
//!   sets, with decoder/encoder state carried across calls so multi-byte
//!   characters split over block boundaries are never corrupted;
//! - [`CharFilterProducer`]: drops an excluded set of characters;
//! - [`DiacriticsProducer`]: strips combining marks after canonical
//!   decomposition and maps the SUB control character to a space.
//!
//! [`Producer`]: stream_engine::Producer

mod block;
pub mod filter;
pub mod normalize;
pub mod transcode;

pub use filter::CharFilterProducer;
pub use normalize::DiacriticsProducer;
pub use transcode::TranscodeProducer;
