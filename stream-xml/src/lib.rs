//! # Stream XML
//!
//! `stream-xml` translates XML documents node by node on top of the pull
//! engine. One produce call copies exactly one node, so the output is
//! well-formed at every yield point and memory stays bounded by the
//! unread surplus.
//!
//! [`XmlTranslateProducer`] is the plain copy (optionally terse: comments
//! and insignificant whitespace omitted); attaching a [`Schema`] turns it
//! into the validating copy, whose findings accumulate silently and
//! surface as one aggregate failure at end-of-stream.

pub mod schema;
pub mod translate;

pub use schema::Schema;
pub use translate::{XmlTranslateOptions, XmlTranslateProducer};
