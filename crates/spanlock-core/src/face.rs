//! The named-data fabric boundary.
//!
//! The engines never touch sockets; they express interests through a [`Face`]
//! and receive exactly one reply per call. Timeout scheduling is the face's
//! concern; the engines only decide what to do when a reply is `Timeout` or
//! `Nack` (retry, failover, give up).

use std::future::Future;

use spanlock_proto::{Data, Interest};

/// One reply to an expressed interest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaceReply {
    /// A data object that may satisfy the interest.
    Data(Data),
    /// The fabric cannot satisfy the interest on the current path.
    Nack,
    /// No response arrived within the fabric's deadline.
    Timeout,
}

/// Asynchronous request/response access to the named-data fabric.
///
/// Implementations must resolve every call with exactly one reply. Clones
/// share the underlying fabric so the engines can fan requests out from
/// concurrent futures.
pub trait Face: Clone + Send + Sync + 'static {
    /// Express one interest and await its reply.
    fn express_interest(&self, interest: &Interest) -> impl Future<Output = FaceReply> + Send;
}
