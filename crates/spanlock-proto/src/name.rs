//! Hierarchical names.
//!
//! A [`Name`] is an ordered sequence of opaque byte [`Component`]s with a
//! prefix relation. Names are cheap to clone (components share their backing
//! buffers) and immutable in spirit: the engines build derived names with the
//! consuming `append*` methods rather than mutating shared values.
//!
//! Component ordering is lexicographic on raw bytes; interest selector
//! matching relies on this order.

use std::fmt;

use bytes::{Bytes, BytesMut};

use crate::{
    error::ProtocolError,
    tlv::{write_tlv, TlvReader, TLV_NAME, TLV_NAME_COMPONENT},
};

/// One opaque name component.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Component(Bytes);

impl Component {
    /// Component over a static byte string. Used for the grammar constants.
    pub const fn from_static(bytes: &'static [u8]) -> Self {
        Self(Bytes::from_static(bytes))
    }

    /// Component over owned or shared bytes.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Raw bytes of this component.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for the zero-length component.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Component {
    fn from(s: &str) -> Self {
        Self(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for Component {
    fn from(s: String) -> Self {
        Self(Bytes::from(s.into_bytes()))
    }
}

impl From<Vec<u8>> for Component {
    fn from(v: Vec<u8>) -> Self {
        Self(Bytes::from(v))
    }
}

impl From<Bytes> for Component {
    fn from(b: Bytes) -> Self {
        Self(b)
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in self.0.iter() {
            if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~') {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "%{b:02X}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({self})")
    }
}

/// Grammar constants used in spanlock name templates.
pub mod component {
    use super::Component;

    /// Separates a key name from its audience in fetch names.
    pub const FOR: Component = Component::from_static(b"FOR");
    /// Root of the read-access (E-KEY/D-KEY) branch.
    pub const READ: Component = Component::from_static(b"READ");
    /// Root of the published-content branch.
    pub const SAMPLE: Component = Component::from_static(b"SAMPLE");
    /// Root of the access-management branch.
    pub const ACCESS: Component = Component::from_static(b"ACCESS");
    /// Marks an encrypt-key node or instance.
    pub const E_KEY: Component = Component::from_static(b"E-KEY");
    /// Marks a decrypt-key instance.
    pub const D_KEY: Component = Component::from_static(b"D-KEY");
    /// Marks a content-key object.
    pub const C_KEY: Component = Component::from_static(b"C-KEY");
}

/// Ordered sequence of components with a hierarchical prefix relation.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name {
    components: Vec<Component>,
}

impl Name {
    /// The empty name.
    pub fn new() -> Self {
        Self::default()
    }

    /// Name from a component list.
    pub fn from_components(components: Vec<Component>) -> Self {
        Self { components }
    }

    /// Parse a URI of the form `/a/b/c` with `%XX` escapes.
    ///
    /// Empty segments (leading, trailing, or doubled slashes) are ignored, so
    /// `/a/b`, `a/b` and `/a/b/` all parse to the same two-component name.
    ///
    /// # Errors
    ///
    /// `ProtocolError::InvalidUri` for malformed `%` escapes.
    pub fn from_uri(uri: &str) -> Result<Self, ProtocolError> {
        let mut components = Vec::new();
        for segment in uri.split('/') {
            if segment.is_empty() {
                continue;
            }
            components.push(Component::new(unescape(segment)?));
        }
        Ok(Self { components })
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// True for the empty name.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// All components in order.
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Component by index; negative indices count from the end.
    pub fn get(&self, index: isize) -> Option<&Component> {
        let resolved = self.resolve_index(index)?;
        self.components.get(resolved)
    }

    fn resolve_index(&self, index: isize) -> Option<usize> {
        if index >= 0 {
            Some(index as usize)
        } else {
            self.components.len().checked_sub(index.unsigned_abs())
        }
    }

    /// Append one component, consuming self for chaining.
    #[must_use]
    pub fn append(mut self, component: impl Into<Component>) -> Self {
        self.components.push(component.into());
        self
    }

    /// Append every component of `other`, consuming self for chaining.
    #[must_use]
    pub fn append_name(mut self, other: &Name) -> Self {
        self.components.extend_from_slice(&other.components);
        self
    }

    /// Append one component in place.
    pub fn push(&mut self, component: impl Into<Component>) {
        self.components.push(component.into());
    }

    /// Prefix of `count` components; negative `count` drops that many from
    /// the end (`prefix(-1)` is the parent name).
    #[must_use]
    pub fn prefix(&self, count: isize) -> Name {
        let keep = if count >= 0 {
            (count as usize).min(self.components.len())
        } else {
            self.components.len().saturating_sub(count.unsigned_abs())
        };
        Self {
            components: self.components[..keep].to_vec(),
        }
    }

    /// Suffix starting at `from`; negative `from` keeps that many trailing
    /// components (`sub_name(-2)` is the last two components).
    #[must_use]
    pub fn sub_name(&self, from: isize) -> Name {
        let start = if from >= 0 {
            (from as usize).min(self.components.len())
        } else {
            self.components.len().saturating_sub(from.unsigned_abs())
        };
        Self {
            components: self.components[start..].to_vec(),
        }
    }

    /// True when every component of `self` leads `other` in order.
    ///
    /// Every name is a prefix of itself; the empty name is a prefix of
    /// everything.
    pub fn is_prefix_of(&self, other: &Name) -> bool {
        other.components.len() >= self.components.len()
            && self
                .components
                .iter()
                .zip(&other.components)
                .all(|(a, b)| a == b)
    }

    /// TLV encoding of this name (`Name` element of `NameComponent`s).
    ///
    /// Used for key-locator emission and as the canonical byte key in the
    /// persistent stores.
    pub fn encode(&self) -> Bytes {
        let mut inner = Vec::new();
        for c in &self.components {
            write_tlv(&mut inner, TLV_NAME_COMPONENT, c.as_bytes());
        }
        let mut out = BytesMut::new();
        write_tlv(&mut out, TLV_NAME, &inner);
        out.freeze()
    }

    /// Decode a TLV `Name` element.
    ///
    /// # Errors
    ///
    /// `ProtocolError` on type mismatch, truncation, or trailing bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = TlvReader::new(bytes);
        let value = reader.read_expected(TLV_NAME)?;
        reader.finish()?;
        Self::decode_value(value)
    }

    /// Decode the inside of a `Name` element (the component list).
    pub(crate) fn decode_value(value: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = TlvReader::new(value);
        let mut components = Vec::new();
        while !reader.is_empty() {
            let raw = reader.read_expected(TLV_NAME_COMPONENT)?;
            components.push(Component::new(Bytes::copy_from_slice(raw)));
        }
        Ok(Self { components })
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return write!(f, "/");
        }
        for c in &self.components {
            write!(f, "/{c}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({self})")
    }
}

fn unescape(segment: &str) -> Result<Vec<u8>, ProtocolError> {
    let raw = segment.as_bytes();
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'%' {
            let hex = raw
                .get(i + 1..i + 3)
                .ok_or_else(|| ProtocolError::InvalidUri(segment.to_string()))?;
            let hex = std::str::from_utf8(hex)
                .map_err(|_| ProtocolError::InvalidUri(segment.to_string()))?;
            let byte = u8::from_str_radix(hex, 16)
                .map_err(|_| ProtocolError::InvalidUri(segment.to_string()))?;
            out.push(byte);
            i += 3;
        } else {
            out.push(raw[i]);
            i += 1;
        }
    }
    Ok(out)
}
