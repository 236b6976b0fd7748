//! Tagged counter values.
//!
//! A counter key holds either a plain count or an accumulated duration. Both
//! are stored as a raw `i64`; the [`ValueKind`] tag keeps them apart across
//! storage that has no native notion of either.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Discriminator persisted next to each raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// Plain integer count.
    Int,
    /// Duration measured in nanoseconds.
    #[serde(alias = "time.Duration")]
    Duration,
}

impl ValueKind {
    /// Tag written for plain integers.
    pub const INT_TAG: &'static str = "int";
    /// Tag written for durations.
    pub const DURATION_TAG: &'static str = "duration";
    /// Duration tag found in records written by earlier producers.
    pub const LEGACY_DURATION_TAG: &'static str = "time.Duration";

    /// The wire tag for this kind.
    pub const fn as_tag(&self) -> &'static str {
        match self {
            ValueKind::Int => Self::INT_TAG,
            ValueKind::Duration => Self::DURATION_TAG,
        }
    }

    /// Parse a wire tag. Legacy tags are accepted but never written.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            Self::INT_TAG => Some(ValueKind::Int),
            Self::DURATION_TAG | Self::LEGACY_DURATION_TAG => Some(ValueKind::Duration),
            _ => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl std::str::FromStr for ValueKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_tag(s).ok_or_else(|| CoreError::UnknownValueKind(s.to_string()))
    }
}

/// A counter value together with its numeric representation.
///
/// Arithmetic saturates at the `i64` bounds. Adding a delta always keeps the
/// kind of the value being added to, so a key that started life as a duration
/// stays a duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterValue {
    /// Plain integer count.
    Int(i64),
    /// Duration as a signed nanosecond count.
    DurationNanos(i64),
}

impl CounterValue {
    /// Rebuild a value from its raw stored form.
    pub const fn from_raw(kind: ValueKind, raw: i64) -> Self {
        match kind {
            ValueKind::Int => CounterValue::Int(raw),
            ValueKind::Duration => CounterValue::DurationNanos(raw),
        }
    }

    /// The kind tag for this value.
    pub const fn kind(&self) -> ValueKind {
        match self {
            CounterValue::Int(_) => ValueKind::Int,
            CounterValue::DurationNanos(_) => ValueKind::Duration,
        }
    }

    /// The raw integer written to storage.
    pub const fn raw(&self) -> i64 {
        match self {
            CounterValue::Int(v) | CounterValue::DurationNanos(v) => *v,
        }
    }

    /// Whether the raw value is zero.
    pub const fn is_zero(&self) -> bool {
        self.raw() == 0
    }

    /// Add `delta`, keeping this value's kind.
    pub fn saturating_add(self, delta: CounterValue) -> Self {
        Self::from_raw(self.kind(), self.raw().saturating_add(delta.raw()))
    }

    /// The value as a [`Duration`], if it is a non-negative duration.
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            CounterValue::DurationNanos(n) if *n >= 0 => Some(Duration::from_nanos(*n as u64)),
            _ => None,
        }
    }

    /// The value as a plain integer, if it is one.
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            CounterValue::Int(v) => Some(*v),
            CounterValue::DurationNanos(_) => None,
        }
    }
}

impl From<i64> for CounterValue {
    fn from(v: i64) -> Self {
        CounterValue::Int(v)
    }
}

impl From<i32> for CounterValue {
    fn from(v: i32) -> Self {
        CounterValue::Int(v.into())
    }
}

impl From<Duration> for CounterValue {
    fn from(d: Duration) -> Self {
        CounterValue::DurationNanos(i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
    }
}

impl fmt::Display for CounterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CounterValue::Int(v) => write!(f, "{}", v),
            CounterValue::DurationNanos(n) => write!(f, "{}ns", n),
        }
    }
}
