//! Unix-second timestamps used throughout verification age checks.

use std::ops::Add;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Seconds since the Unix epoch, serialized as a JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnixTimestamp(u64);

impl UnixTimestamp {
    /// Wraps a raw seconds-since-epoch value.
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// The current wall-clock time.
    ///
    /// # Panics
    ///
    /// Panics if the system clock is set before the Unix epoch.
    #[must_use]
    pub fn now() -> Self {
        let secs = SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock before unix epoch").as_secs();
        Self(secs)
    }

    /// The raw seconds-since-epoch value.
    #[must_use]
    pub const fn as_secs(self) -> u64 {
        self.0
    }

    /// Milliseconds since the Unix epoch, for receipt timestamps.
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0 * 1000
    }

    /// Seconds elapsed since `earlier`, saturating at zero if `earlier` is
    /// in the future.
    #[must_use]
    pub fn since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<u64> for UnixTimestamp {
    type Output = Self;

    fn add(self, rhs: u64) -> Self {
        Self(self.0 + rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn since_saturates_at_zero() {
        let earlier = UnixTimestamp::from_secs(100);
        let later = UnixTimestamp::from_secs(50);
        assert_eq!(later.since(earlier), 0);
    }

    #[test]
    fn since_computes_elapsed_seconds() {
        let earlier = UnixTimestamp::from_secs(100);
        let later = UnixTimestamp::from_secs(410);
        assert_eq!(later.since(earlier), 310);
    }
}
