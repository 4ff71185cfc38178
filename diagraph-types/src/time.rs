//! Deterministic timestamps for graph evaluation.

use core::ops::Add;
use std::time::Duration;

/// A point in time, measured from an arbitrary caller-chosen epoch.
///
/// The graph never reads the wall clock: every tick receives its timestamp
/// from the caller, which makes the whole propagation step a pure function of
/// `(timestamp, report batch)` and keeps timeline tests reproducible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timestamp(Duration);

impl Timestamp {
    /// The epoch itself.
    pub const ZERO: Timestamp = Timestamp(Duration::ZERO);

    /// Create a timestamp from fractional seconds since the epoch.
    pub fn from_secs_f64(secs: f64) -> Self {
        Timestamp(Duration::from_secs_f64(secs))
    }

    /// Create a timestamp from milliseconds since the epoch.
    pub fn from_millis(millis: u64) -> Self {
        Timestamp(Duration::from_millis(millis))
    }

    /// Milliseconds since the epoch.
    pub fn as_millis(&self) -> u64 {
        self.0.as_millis() as u64
    }

    /// Fractional seconds since the epoch.
    pub fn as_secs_f64(&self) -> f64 {
        self.0.as_secs_f64()
    }

    /// Time elapsed since `earlier`, or zero if `earlier` is in the future.
    pub fn saturating_since(&self, earlier: Timestamp) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0 + rhs)
    }
}
