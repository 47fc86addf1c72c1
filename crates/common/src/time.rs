//! Second-resolution chain time

use core::fmt;
use core::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// Seconds since the Unix epoch, as carried in block headers
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimePointSec(pub u32);

impl TimePointSec {
    pub const MAX: TimePointSec = TimePointSec(u32::MAX);

    pub const fn from_secs(secs: u32) -> Self {
        Self(secs)
    }

    pub const fn secs(self) -> u32 {
        self.0
    }

    pub fn saturating_add(self, secs: u32) -> Self {
        Self(self.0.saturating_add(secs))
    }
}

impl Add<u32> for TimePointSec {
    type Output = TimePointSec;

    fn add(self, secs: u32) -> TimePointSec {
        self.saturating_add(secs)
    }
}

/// Signed distance in seconds between two instants
impl Sub for TimePointSec {
    type Output = i64;

    fn sub(self, rhs: TimePointSec) -> i64 {
        self.0 as i64 - rhs.0 as i64
    }
}

impl fmt::Display for TimePointSec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}
