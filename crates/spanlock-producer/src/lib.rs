//! The spanlock producer engine.
//!
//! Publishes time-sliced encrypted content. For every produced timestamp the
//! engine maintains one AES-128 content key per UTC hour, and for every node
//! of the configured data-type hierarchy it keeps the content key wrapped
//! under an E-KEY whose validity interval covers the timestamp, fetching
//! fresher E-KEYs from the fabric with exclude-based iteration when the
//! cached one has lapsed.

#![forbid(unsafe_code)]

mod key_request;
mod producer;

pub use key_request::{KeyInfo, KeyRequest};
pub use producer::{ContentKeyOutcome, Producer, ProducerConfig};
