//! The spanlock consumer engine.
//!
//! Fetches a content object and lazily resolves the chain of keys that
//! decrypts it: the content names its C-KEY, the C-KEY names the E-KEY it
//! was wrapped under, and the matching D-KEY (itself wrapped for this
//! consumer) unwraps the C-KEY. Every fetched layer is validated, decrypted
//! and memoized so later objects under the same hour or group key skip the
//! network entirely.

#![forbid(unsafe_code)]

mod consumer;

pub use consumer::{Consumed, Consumer, ConsumerConfig};
