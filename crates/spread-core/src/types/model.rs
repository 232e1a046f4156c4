//! Model identity and initialization-cycle cadence.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::{Deserialize, Serialize};

use super::UnknownVariant;

/// Closed set of supported NWP models.
///
/// Variants are declared in lexical order of their names so the derived
/// `Ord` matches name order (pairwise metrics rely on this).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ModelId {
    Aigfs,
    Ecmwf,
    Gfs,
    Hrrr,
    Nam,
    Rrfs,
}

impl ModelId {
    pub const ALL: [ModelId; 6] = [
        Self::Aigfs,
        Self::Ecmwf,
        Self::Gfs,
        Self::Hrrr,
        Self::Nam,
        Self::Rrfs,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aigfs => "AIGFS",
            Self::Ecmwf => "ECMWF",
            Self::Gfs => "GFS",
            Self::Hrrr => "HRRR",
            Self::Nam => "NAM",
            Self::Rrfs => "RRFS",
        }
    }

    /// Publication cadence used to pick the newest available cycle.
    pub fn cycle_policy(self) -> CyclePolicy {
        match self {
            Self::Aigfs => CyclePolicy {
                interval_hours: 12,
                delay_hours: 5,
            },
            Self::Ecmwf => CyclePolicy {
                interval_hours: 6,
                delay_hours: 9,
            },
            Self::Gfs | Self::Hrrr | Self::Nam | Self::Rrfs => CyclePolicy {
                interval_hours: 6,
                delay_hours: 5,
            },
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelId {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVariant::new("model", s))
    }
}

/// How often a model is initialized and how long until a cycle is published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CyclePolicy {
    /// Hours between cycles. Divides 24.
    pub interval_hours: u32,
    /// Hours after init time before the cycle is reliably available.
    pub delay_hours: u32,
}

/// Most recent init time expected to be available at `now`.
///
/// Subtracts the publication delay, then floors to a multiple of the
/// cycle interval with minutes and seconds zeroed.
pub fn latest_cycle(now: DateTime<Utc>, policy: CyclePolicy) -> DateTime<Utc> {
    let target = now - Duration::hours(i64::from(policy.delay_hours));
    let interval = Duration::hours(i64::from(policy.interval_hours.max(1)));
    // Truncation is relative to the Unix epoch, which is aligned to 00Z.
    target.duration_trunc(interval).unwrap_or(target)
}
