//! Tracked forecast variables.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::UnknownVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Variable {
    /// Total precipitation.
    #[serde(rename = "precip")]
    Precip,
    /// 10 m wind speed.
    #[serde(rename = "wind_speed")]
    WindSpeed,
    /// Mean sea-level pressure.
    #[serde(rename = "mslp")]
    Mslp,
    /// 500 hPa geopotential height.
    #[serde(rename = "hgt_500")]
    Hgt500,
}

impl Variable {
    pub const ALL: [Variable; 4] = [Self::Precip, Self::WindSpeed, Self::Mslp, Self::Hgt500];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Precip => "precip",
            Self::WindSpeed => "wind_speed",
            Self::Mslp => "mslp",
            Self::Hgt500 => "hgt_500",
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variable {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s.trim())
            .ok_or_else(|| UnknownVariant::new("variable", s))
    }
}
