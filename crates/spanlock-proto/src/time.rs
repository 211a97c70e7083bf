//! Timestamps and hour timeslots.
//!
//! A [`Timestamp`] is a unix-epoch instant with millisecond resolution. In
//! names it appears as a single ISO-8601 basic component with millisecond
//! precision and no separators, e.g. `20150815T101700000`. Content keys are
//! bucketed by the hour-rounded form ([`Timestamp::hour_slot`]).

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::{error::ProtocolError, name::Component};

/// Milliseconds per content-key timeslot.
pub const MILLIS_PER_HOUR: u64 = 3_600_000;

/// Format string for the name-component form.
const ISO_BASIC_MILLIS: &str = "%Y%m%dT%H%M%S%3f";

/// Unix-epoch instant with millisecond resolution.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The unix epoch. Used as the sentinel validity interval that covers
    /// nothing.
    pub const EPOCH: Self = Self(0);

    /// Timestamp from unix milliseconds.
    pub const fn from_unix_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Unix milliseconds.
    pub const fn unix_millis(self) -> u64 {
        self.0
    }

    /// Round down to the start of the containing UTC hour.
    pub const fn hour_slot(self) -> Self {
        Self(self.0 / MILLIS_PER_HOUR * MILLIS_PER_HOUR)
    }

    /// ISO-8601 basic form with millisecond precision.
    pub fn to_iso(self) -> String {
        let dt = DateTime::<Utc>::from_timestamp_millis(self.0 as i64)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        dt.format(ISO_BASIC_MILLIS).to_string()
    }

    /// Parse the ISO-8601 basic form.
    ///
    /// # Errors
    ///
    /// `ProtocolError::InvalidTimestamp` on any deviation from the
    /// `YYYYMMDD'T'HHMMSSmmm` grammar or a pre-epoch instant.
    pub fn from_iso(s: &str) -> Result<Self, ProtocolError> {
        let naive = NaiveDateTime::parse_from_str(s, ISO_BASIC_MILLIS)
            .map_err(|e| ProtocolError::InvalidTimestamp(format!("{s}: {e}")))?;
        let millis = naive.and_utc().timestamp_millis();
        let millis = u64::try_from(millis)
            .map_err(|_| ProtocolError::InvalidTimestamp(format!("{s}: before unix epoch")))?;
        Ok(Self(millis))
    }

    /// Name-component form.
    pub fn to_component(self) -> Component {
        Component::from(self.to_iso())
    }

    /// Parse a name component.
    ///
    /// # Errors
    ///
    /// `ProtocolError::InvalidTimestamp` when the component is not UTF-8 or
    /// not a valid ISO-8601 basic timestamp.
    pub fn from_component(component: &Component) -> Result<Self, ProtocolError> {
        let s = std::str::from_utf8(component.as_bytes())
            .map_err(|_| ProtocolError::InvalidTimestamp(format!("{component}: not UTF-8")))?;
        Self::from_iso(s)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_iso())
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({} = {})", self.0, self.to_iso())
    }
}
