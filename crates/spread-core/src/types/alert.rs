//! Alert rule vocabulary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::UnknownVariant;

/// Which divergence statistic a rule watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertMetric {
    Spread,
    Rmse,
    Bias,
}

impl AlertMetric {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Spread => "spread",
            Self::Rmse => "rmse",
            Self::Bias => "bias",
        }
    }

    /// Pick this metric out of a (spread, rmse, bias) triple.
    pub fn select(self, spread: f64, rmse: f64, bias: f64) -> f64 {
        match self {
            Self::Spread => spread,
            Self::Rmse => rmse,
            Self::Bias => bias,
        }
    }
}

impl fmt::Display for AlertMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertMetric {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spread" => Ok(Self::Spread),
            "rmse" => Ok(Self::Rmse),
            "bias" => Ok(Self::Bias),
            other => Err(UnknownVariant::new("alert metric", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    #[default]
    Gt,
    Lt,
}

impl Comparison {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gt => "gt",
            Self::Lt => "lt",
        }
    }

    /// Strict comparison of `value` against `threshold`. NaN never passes.
    pub fn passes(self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Gt => value > threshold,
            Self::Lt => value < threshold,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Comparison {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gt" => Ok(Self::Gt),
            "lt" => Ok(Self::Lt),
            other => Err(UnknownVariant::new("comparison", other)),
        }
    }
}
