//! Timestamp and time base handling.

use crate::rational::{Rational, Rounding};
use std::cmp::Ordering;
use std::fmt;

/// A time base defining the duration of one timestamp tick.
///
/// Common time bases:
/// - 1/90000 for MPEG-TS
/// - 1/1000 for milliseconds
/// - 1/30 for a fixed 30 fps encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeBase(pub Rational);

impl TimeBase {
    /// Create a new time base from numerator and denominator.
    pub fn new(num: i64, den: i64) -> Self {
        Self(Rational::new(num, den))
    }

    /// Standard MPEG time base (1/90000).
    pub const MPEG: Self = Self(Rational { num: 1, den: 90000 });

    /// Millisecond time base (1/1000).
    pub const MILLISECONDS: Self = Self(Rational { num: 1, den: 1000 });

    /// Second time base (1/1).
    pub const SECONDS: Self = Self(Rational { num: 1, den: 1 });

    /// Convert a tick count from this time base to another, rounding to
    /// the nearest tick with ties away from zero.
    pub fn convert(&self, value: i64, target: TimeBase) -> i64 {
        self.0.rescale(value, target.0)
    }

    /// Convert a tick count with an explicit rounding policy.
    pub fn convert_rnd(&self, value: i64, target: TimeBase, rounding: Rounding) -> i64 {
        self.0.rescale_rnd(value, target.0, rounding)
    }

    /// Convert to seconds as f64.
    pub fn to_seconds(&self, value: i64) -> f64 {
        value as f64 * self.0.to_f64()
    }

    /// Get the time base as a rational.
    pub fn as_rational(&self) -> Rational {
        self.0
    }
}

impl Default for TimeBase {
    fn default() -> Self {
        Self::MILLISECONDS
    }
}

impl From<Rational> for TimeBase {
    fn from(r: Rational) -> Self {
        Self(r)
    }
}

/// A timestamp with an associated time base.
///
/// `Timestamp::NONE` is the "unknown" sentinel: rescaling it is a no-op and
/// arithmetic on it never fabricates a numeric value.
#[derive(Debug, Clone, Copy)]
pub struct Timestamp {
    /// The raw timestamp value.
    pub value: i64,
    /// The time base for interpreting the value.
    pub time_base: TimeBase,
}

impl Timestamp {
    /// Value representing an unknown timestamp.
    pub const NONE: i64 = i64::MIN;

    /// Create a new timestamp.
    pub fn new(value: i64, time_base: TimeBase) -> Self {
        Self { value, time_base }
    }

    /// Create an unknown timestamp.
    pub fn none() -> Self {
        Self {
            value: Self::NONE,
            time_base: TimeBase::default(),
        }
    }

    /// Check if this timestamp is known.
    pub fn is_valid(&self) -> bool {
        self.value != Self::NONE
    }

    /// Convert to a different time base.
    ///
    /// The unknown sentinel passes through unchanged.
    pub fn rescale(&self, target: TimeBase) -> Self {
        if !self.is_valid() {
            return Self::none();
        }
        Self {
            value: self.time_base.convert(self.value, target),
            time_base: target,
        }
    }

    /// Convert to seconds, or `None` if unknown.
    pub fn to_seconds(&self) -> Option<f64> {
        if self.is_valid() {
            Some(self.time_base.to_seconds(self.value))
        } else {
            None
        }
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::none()
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        if !self.is_valid() || !other.is_valid() {
            return !self.is_valid() && !other.is_valid();
        }
        // Compare in the higher precision time base
        let tb = if self.time_base.0.den > other.time_base.0.den {
            self.time_base
        } else {
            other.time_base
        };
        self.rescale(tb).value == other.rescale(tb).value
    }
}

impl Eq for Timestamp {}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        if !self.is_valid() {
            return if !other.is_valid() {
                Ordering::Equal
            } else {
                Ordering::Less
            };
        }
        if !other.is_valid() {
            return Ordering::Greater;
        }

        let tb = if self.time_base.0.den > other.time_base.0.den {
            self.time_base
        } else {
            other.time_base
        };
        self.rescale(tb).value.cmp(&other.rescale(tb).value)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(secs) = self.to_seconds() {
            let hours = (secs / 3600.0) as u32;
            let mins = ((secs % 3600.0) / 60.0) as u32;
            let secs = secs % 60.0;
            write!(f, "{:02}:{:02}:{:06.3}", hours, mins, secs)
        } else {
            write!(f, "NONE")
        }
    }
}

/// A duration with an associated time base.
///
/// Durations are never "unknown" in this pipeline, so rescaling applies
/// plain nearest rounding with no sentinel handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Duration {
    /// The raw duration value.
    pub value: i64,
    /// The time base for interpreting the value.
    pub time_base: TimeBase,
}

impl Duration {
    /// Create a new duration.
    pub fn new(value: i64, time_base: TimeBase) -> Self {
        Self { value, time_base }
    }

    /// Create a zero duration.
    pub fn zero() -> Self {
        Self {
            value: 0,
            time_base: TimeBase::default(),
        }
    }

    /// Check if this duration is zero.
    pub fn is_zero(&self) -> bool {
        self.value == 0
    }

    /// Convert to a different time base.
    pub fn rescale(&self, target: TimeBase) -> Self {
        Self {
            value: self.time_base.convert(self.value, target),
            time_base: target,
        }
    }

    /// Convert to seconds.
    pub fn to_seconds(&self) -> f64 {
        self.time_base.to_seconds(self.value)
    }
}

impl Default for Duration {
    fn default() -> Self {
        Self::zero()
    }
}
