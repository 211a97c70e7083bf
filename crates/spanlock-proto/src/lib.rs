//! Spanlock wire model.
//!
//! Everything that crosses the named-data fabric boundary lives here:
//! hierarchical [`Name`]s built from opaque byte [`Component`]s, millisecond
//! [`Timestamp`]s that appear in names as ISO-8601 basic components, the
//! bit-exact TLV codec for the [`EncryptedContent`] wire struct, and the
//! packet model ([`Data`], [`Interest`], [`Exclude`], [`Link`]).
//!
//! The outer packet format is deliberately *not* wire-encoded: `Data` and
//! `Interest` cross the transport (`Face`) boundary as plain structs and only
//! `EncryptedContent` (and the names embedded in it) has a pinned byte
//! representation. The fabric owns everything else.

#![forbid(unsafe_code)]

pub mod encrypted_content;
pub mod error;
pub mod name;
pub mod packet;
pub mod time;
pub mod tlv;

pub use encrypted_content::{decode_d_key_content, EncryptAlgorithm, EncryptedContent};
pub use error::ProtocolError;
pub use name::{Component, Name};
pub use packet::{ChildSelector, Data, Exclude, Interest, Link};
pub use time::Timestamp;
