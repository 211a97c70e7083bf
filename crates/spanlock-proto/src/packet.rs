//! Packet model crossing the fabric boundary.
//!
//! `Data` and `Interest` are plain structs: the fabric transports them
//! in-process and only the content of a `Data` (an EncryptedContent TLV, or
//! raw key bits for E-KEY objects) has a pinned byte form. The selector types
//! (`Exclude`, `ChildSelector`, `Link`, selected delegation) model exactly
//! what the engines need for coverage search and failover.

use bytes::Bytes;

use crate::name::{Component, Name};

/// A named, signed content object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Data {
    /// Full name of the object.
    pub name: Name,
    /// Content bytes; interpretation depends on the name.
    pub content: Bytes,
    /// Detached signature over name and content. Empty when unsigned.
    pub signature: Bytes,
}

impl Data {
    /// Unsigned data object.
    pub fn new(name: Name, content: impl Into<Bytes>) -> Self {
        Self {
            name,
            content: content.into(),
            signature: Bytes::new(),
        }
    }

    /// True once a keychain has attached a signature.
    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty()
    }
}

/// Which sibling to prefer when several data objects match an interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildSelector {
    /// Smallest next component in lexicographic order.
    Leftmost,
    /// Largest next component in lexicographic order.
    Rightmost,
}

/// Range-based component filter applied to the component that follows the
/// interest name in a candidate data name.
///
/// The bounds are asymmetric on purpose, matching how the coverage search
/// uses them: `exclude_after(c)` drops components *strictly greater* than `c`
/// (so the newest E-KEY with timestamp `<= c` survives), while
/// `exclude_before(c)` drops components *less than or equal to* `c`
/// (advancing the cursor past an already-seen validity interval).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exclude {
    /// Components `> after` are excluded.
    after: Option<Component>,
    /// Components `<= before` are excluded.
    before: Option<Component>,
}

impl Exclude {
    /// Filter that excludes nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Exclude every component strictly greater than `bound`.
    pub fn exclude_after(&mut self, bound: Component) {
        self.after = Some(bound);
    }

    /// Exclude every component less than or equal to `bound`.
    pub fn exclude_before(&mut self, bound: Component) {
        self.before = Some(bound);
    }

    /// True when `component` falls in an excluded range.
    pub fn is_excluded(&self, component: &Component) -> bool {
        if let Some(after) = &self.after {
            if component > after {
                return true;
            }
        }
        if let Some(before) = &self.before {
            if component <= before {
                return true;
            }
        }
        false
    }

    /// True when no bound is set.
    pub fn is_empty(&self) -> bool {
        self.after.is_none() && self.before.is_none()
    }
}

/// Ordered list of delegation names used as a forwarding hint when the
/// primary path cannot satisfy a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Link {
    delegations: Vec<Name>,
}

impl Link {
    /// Link over an ordered delegation list.
    pub fn new(delegations: Vec<Name>) -> Self {
        Self { delegations }
    }

    /// Delegations in preference order.
    pub fn delegations(&self) -> &[Name] {
        &self.delegations
    }

    /// Number of delegations.
    pub fn len(&self) -> usize {
        self.delegations.len()
    }

    /// True when the link carries no delegations.
    pub fn is_empty(&self) -> bool {
        self.delegations.is_empty()
    }
}

/// A request for a data object by name, with optional selectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interest {
    /// Requested name (a prefix of acceptable data names).
    pub name: Name,
    /// Component filter on the position right after `name`.
    pub exclude: Exclude,
    /// Sibling preference when several objects match.
    pub child_selector: Option<ChildSelector>,
    /// Forwarding hint attached after a nack.
    pub link: Option<Link>,
    /// Index into the link's delegations currently in use.
    pub selected_delegation: Option<usize>,
}

impl Interest {
    /// Interest for `name` with no selectors.
    pub fn new(name: Name) -> Self {
        Self {
            name,
            exclude: Exclude::none(),
            child_selector: None,
            link: None,
            selected_delegation: None,
        }
    }

    /// Set the exclude filter, consuming self for chaining.
    #[must_use]
    pub fn with_exclude(mut self, exclude: Exclude) -> Self {
        self.exclude = exclude;
        self
    }

    /// Set the child selector, consuming self for chaining.
    #[must_use]
    pub fn with_child_selector(mut self, selector: ChildSelector) -> Self {
        self.child_selector = Some(selector);
        self
    }

    /// Attach a forwarding link.
    pub fn set_link(&mut self, link: Link) {
        self.link = Some(link);
    }

    /// Select a delegation index within the attached link.
    pub fn set_selected_delegation(&mut self, index: usize) {
        self.selected_delegation = Some(index);
    }

    /// True when `data` satisfies this interest: the interest name is a
    /// prefix of the data name and the component following the prefix (if
    /// any) passes the exclude filter.
    pub fn matches_data(&self, data: &Data) -> bool {
        if !self.name.is_prefix_of(&data.name) {
            return false;
        }
        match data.name.get(self.name.len() as isize) {
            Some(next) => !self.exclude.is_excluded(next),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(uri: &str) -> Name {
        Name::from_uri(uri).unwrap()
    }

    fn comp(s: &str) -> Component {
        Component::from(s)
    }

    #[test]
    fn exclude_after_keeps_bound() {
        let mut ex = Exclude::none();
        ex.exclude_after(comp("20150815T101700000"));

        assert!(!ex.is_excluded(&comp("20150815T101700000")));
        assert!(!ex.is_excluded(&comp("20150815T100000000")));
        assert!(ex.is_excluded(&comp("20150815T110000000")));
    }

    #[test]
    fn exclude_before_drops_bound() {
        let mut ex = Exclude::none();
        ex.exclude_before(comp("20150815T080000000"));

        assert!(ex.is_excluded(&comp("20150815T080000000")));
        assert!(ex.is_excluded(&comp("20150815T070000000")));
        assert!(!ex.is_excluded(&comp("20150815T090000000")));
    }

    #[test]
    fn combined_bounds_leave_a_window() {
        let mut ex = Exclude::none();
        ex.exclude_after(comp("20150815T101700000"));
        ex.exclude_before(comp("20150815T080000000"));

        assert!(ex.is_excluded(&comp("20150815T080000000")));
        assert!(!ex.is_excluded(&comp("20150815T090000000")));
        assert!(!ex.is_excluded(&comp("20150815T101700000")));
        assert!(ex.is_excluded(&comp("20150815T103000000")));
    }

    #[test]
    fn interest_matches_exact_name() {
        let interest = Interest::new(name("/a/b"));
        assert!(interest.matches_data(&Data::new(name("/a/b"), Bytes::new())));
        assert!(interest.matches_data(&Data::new(name("/a/b/c"), Bytes::new())));
        assert!(!interest.matches_data(&Data::new(name("/a/x"), Bytes::new())));
    }

    #[test]
    fn interest_exclude_applies_to_next_component() {
        let mut ex = Exclude::none();
        ex.exclude_after(comp("m"));
        let interest = Interest::new(name("/a")).with_exclude(ex);

        assert!(interest.matches_data(&Data::new(name("/a/k"), Bytes::new())));
        assert!(!interest.matches_data(&Data::new(name("/a/z"), Bytes::new())));
        // No next component: nothing for the filter to reject.
        assert!(interest.matches_data(&Data::new(name("/a"), Bytes::new())));
    }
}
